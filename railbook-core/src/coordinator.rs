use tracing::{debug, warn};
use uuid::Uuid;

use crate::availability::available_seats;
use crate::booking::Booking;
use crate::seat::next_seat;
use crate::store::{BookingStore, StoreError};
use crate::{BookingError, BookingResult};

/// How many times a single `create_booking` call will re-run its transaction
/// after the store reports a conflicting concurrent write. The row lock
/// taken by `train_for_update` makes conflicts rare; this bound exists for
/// backends where the unique seat index is the only serialization point.
pub const MAX_CONFLICT_RETRIES: u32 = 3;

/// Runs one booking attempt end to end: open a transaction, re-check
/// availability, pick the lowest free seat, insert, commit. Any failure or
/// a full train rolls the whole attempt back; the caller never observes a
/// partial booking.
///
/// A `NoSeatsAvailable` outcome is final for this attempt, not a queue
/// position. Only store-reported write conflicts are retried, and only up
/// to `MAX_CONFLICT_RETRIES` before surfacing `ConflictRetryExhausted`.
pub async fn create_booking<S: BookingStore + ?Sized>(
    store: &S,
    train_id: Uuid,
    user_id: Uuid,
) -> BookingResult<Booking> {
    for attempt in 0..MAX_CONFLICT_RETRIES {
        match book_once(store, train_id, user_id).await {
            Err(BookingError::Store(StoreError::Conflict)) => {
                warn!(%train_id, attempt, "booking conflicted with a concurrent writer, retrying");
            }
            outcome => return outcome,
        }
    }
    Err(BookingError::ConflictRetryExhausted)
}

/// One pass of the Started → Validated → SeatChosen → Committed state
/// machine. Every early return before `commit` rolls the transaction back.
async fn book_once<S: BookingStore + ?Sized>(
    store: &S,
    train_id: Uuid,
    user_id: Uuid,
) -> BookingResult<Booking> {
    // Started
    let mut txn = store.begin().await?;

    // Validated: the train row is locked from here until commit/rollback.
    let train = match txn.train_for_update(train_id).await {
        Ok(Some(train)) => train,
        Ok(None) => {
            // Rollback is best effort on every abort path: the domain
            // outcome is what the caller must see.
            let _ = txn.rollback().await;
            return Err(BookingError::TrainNotFound);
        }
        Err(e) => {
            let _ = txn.rollback().await;
            return Err(e.into());
        }
    };

    let booked = match txn.booked_seats(train_id).await {
        Ok(seats) => seats,
        Err(e) => {
            let _ = txn.rollback().await;
            return Err(e.into());
        }
    };

    if available_seats(train.total_seats, booked.len()) == 0 {
        let _ = txn.rollback().await;
        return Err(BookingError::NoSeatsAvailable);
    }

    // SeatChosen: lowest free seat over the snapshot we just read.
    let seat = next_seat(&booked);
    let booking = Booking::new(user_id, train_id, seat);

    if let Err(e) = txn.insert_booking(&booking).await {
        let _ = txn.rollback().await;
        return Err(e.into());
    }

    // Committed
    if let Err(e) = txn.commit().await {
        return Err(e.into());
    }

    debug!(%train_id, %user_id, seat, "booking committed");
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SeatTxn, StoreResult};
    use crate::train::Train;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Store double for a backend whose only serialization point is the
    /// unique seat index: every insert conflicts while `conflicts` is
    /// positive. Rollback failures are injectable to check they never mask
    /// the domain outcome.
    struct FlakyStore {
        train: Train,
        conflicts: Arc<AtomicU32>,
        fail_rollback: bool,
    }

    impl FlakyStore {
        fn new(total_seats: i32, conflicts: u32) -> Self {
            Self {
                train: Train {
                    id: Uuid::new_v4(),
                    train_number: "12951".to_string(),
                    train_name: "Mumbai Rajdhani".to_string(),
                    source: "Mumbai".to_string(),
                    destination: "Delhi".to_string(),
                    total_seats,
                },
                conflicts: Arc::new(AtomicU32::new(conflicts)),
                fail_rollback: false,
            }
        }
    }

    struct FlakyTxn {
        train: Train,
        conflicts: Arc<AtomicU32>,
        fail_rollback: bool,
    }

    #[async_trait]
    impl SeatTxn for FlakyTxn {
        async fn train_for_update(&mut self, train_id: Uuid) -> StoreResult<Option<Train>> {
            Ok((self.train.id == train_id).then(|| self.train.clone()))
        }

        async fn booked_seats(&mut self, _train_id: Uuid) -> StoreResult<Vec<i32>> {
            Ok(Vec::new())
        }

        async fn insert_booking(&mut self, _booking: &Booking) -> StoreResult<()> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Conflict);
            }
            Ok(())
        }

        async fn commit(self: Box<Self>) -> StoreResult<()> {
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> StoreResult<()> {
            if self.fail_rollback {
                return Err(StoreError::Unavailable("rollback failed".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BookingStore for FlakyStore {
        async fn begin(&self) -> StoreResult<Box<dyn SeatTxn>> {
            Ok(Box::new(FlakyTxn {
                train: self.train.clone(),
                conflicts: Arc::clone(&self.conflicts),
                fail_rollback: self.fail_rollback,
            }))
        }
    }

    #[tokio::test]
    async fn transient_conflict_is_retried_to_success() {
        let store = FlakyStore::new(10, 1);

        let booking = create_booking(&store, store.train.id, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(booking.seat_number, 1);
        // The one conflicting attempt was consumed, then the retry landed.
        assert_eq!(store.conflicts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistent_conflict_exhausts_the_retry_budget() {
        let store = FlakyStore::new(10, u32::MAX);

        let err = create_booking(&store, store.train.id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::ConflictRetryExhausted));
        // Exactly MAX_CONFLICT_RETRIES transactions were attempted.
        assert_eq!(
            u32::MAX - store.conflicts.load(Ordering::SeqCst),
            MAX_CONFLICT_RETRIES
        );
    }

    #[tokio::test]
    async fn rollback_failure_does_not_mask_train_not_found() {
        let mut store = FlakyStore::new(10, 0);
        store.fail_rollback = true;

        let err = create_booking(&store, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::TrainNotFound));
    }

    #[tokio::test]
    async fn rollback_failure_does_not_mask_no_seats_available() {
        let mut store = FlakyStore::new(0, 0);
        store.fail_rollback = true;

        let err = create_booking(&store, store.train.id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::NoSeatsAvailable));
    }
}
