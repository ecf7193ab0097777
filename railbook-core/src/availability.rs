/// Remaining capacity: declared total minus current booking count, floored
/// at zero. Must be evaluated against the same snapshot the write will run
/// in; the coordinator guarantees that by calling it inside the open
/// transaction.
pub fn available_seats(total_seats: i32, booked_count: usize) -> u32 {
    let total = i64::from(total_seats.max(0));
    let booked = booked_count as i64;
    (total - booked).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_train_has_full_capacity() {
        assert_eq!(available_seats(72, 0), 72);
    }

    #[test]
    fn counts_down_with_bookings() {
        assert_eq!(available_seats(5, 3), 2);
    }

    #[test]
    fn full_train_has_zero() {
        assert_eq!(available_seats(5, 5), 0);
    }

    #[test]
    fn saturates_instead_of_going_negative() {
        // Overbooked state can only arise from data loaded outside the
        // engine; report zero rather than wrapping.
        assert_eq!(available_seats(5, 7), 0);
    }
}
