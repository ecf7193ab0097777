/// Picks the lowest unused seat number, starting at 1. Pure function over
/// the snapshot of booked seats read inside the active transaction; the
/// transaction boundary, not this function, is what makes the assignment
/// safe under concurrency.
///
/// O(n log n) in the number of booked seats. Fine at train capacities; a
/// free-list would be the upgrade path if capacities ever grow past that.
pub fn next_seat(booked: &[i32]) -> i32 {
    let mut seats: Vec<i32> = booked.to_vec();
    seats.sort_unstable();

    let mut candidate = 1;
    for seat in seats {
        if seat == candidate {
            candidate += 1;
        } else if seat > candidate {
            break;
        }
        // seat < candidate only on duplicates or non-positive input; skip.
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_train_assigns_seat_one() {
        assert_eq!(next_seat(&[]), 1);
    }

    #[test]
    fn fills_the_lowest_gap() {
        assert_eq!(next_seat(&[1, 2, 4]), 3);
    }

    #[test]
    fn gap_in_the_middle_of_sparse_seats() {
        assert_eq!(next_seat(&[1, 3]), 2);
    }

    #[test]
    fn dense_prefix_appends_at_the_end() {
        assert_eq!(next_seat(&[1, 2, 3]), 4);
    }

    #[test]
    fn unsorted_input_is_handled() {
        assert_eq!(next_seat(&[4, 1, 2]), 3);
    }

    #[test]
    fn deterministic_over_a_fixed_snapshot() {
        let booked = [2, 5, 1];
        let first = next_seat(&booked);
        for _ in 0..10 {
            assert_eq!(next_seat(&booked), first);
        }
    }
}
