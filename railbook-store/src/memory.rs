use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use railbook_core::booking::{Booking, BookingDetails};
use railbook_core::store::{
    BookingQueries, BookingStore, SeatTxn, StoreError, StoreResult, TrainStore, User, UserStore,
};
use railbook_core::train::{NewTrain, Train, TrainAvailability};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    trains: HashMap<Uuid, Train>,
    bookings: HashMap<Uuid, Booking>,
}

impl Tables {
    fn seats_for(&self, train_id: Uuid) -> Vec<i32> {
        let mut seats: Vec<i32> = self
            .bookings
            .values()
            .filter(|b| b.train_id == train_id)
            .map(|b| b.seat_number)
            .collect();
        seats.sort_unstable();
        seats
    }
}

/// In-memory storage with the same transactional contract as `PgStore`.
/// A booking transaction holds an owned lock over all tables until commit
/// or rollback, so concurrent attempts serialize exactly as they do behind
/// the Postgres row lock. Writes are staged and only become visible on
/// commit; dropping a transaction discards them.
///
/// Used by the test suites and for running the API without a database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next transaction's commit fail with `Unavailable`,
    /// discarding its staged writes. Failure injection for rollback tests.
    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Committed booking count for a train, bypassing any transaction.
    pub async fn booking_count(&self, train_id: Uuid) -> usize {
        self.tables.lock().await.seats_for(train_id).len()
    }
}

struct MemoryTxn {
    guard: OwnedMutexGuard<Tables>,
    staged: Vec<Booking>,
    fail_commit: bool,
}

#[async_trait]
impl SeatTxn for MemoryTxn {
    async fn train_for_update(&mut self, train_id: Uuid) -> StoreResult<Option<Train>> {
        Ok(self.guard.trains.get(&train_id).cloned())
    }

    async fn booked_seats(&mut self, train_id: Uuid) -> StoreResult<Vec<i32>> {
        let mut seats = self.guard.seats_for(train_id);
        seats.extend(
            self.staged
                .iter()
                .filter(|b| b.train_id == train_id)
                .map(|b| b.seat_number),
        );
        seats.sort_unstable();
        Ok(seats)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        let taken = self
            .guard
            .bookings
            .values()
            .chain(self.staged.iter())
            .any(|b| b.train_id == booking.train_id && b.seat_number == booking.seat_number);
        if taken {
            return Err(StoreError::Conflict);
        }
        self.staged.push(booking.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        if self.fail_commit {
            // Staged writes die with the transaction.
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        let staged = std::mem::take(&mut self.staged);
        for booking in staged {
            self.guard.bookings.insert(booking.id, booking);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn SeatTxn>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        Ok(Box::new(MemoryTxn {
            guard,
            staged: Vec::new(),
            fail_commit: self.fail_commit.swap(false, Ordering::SeqCst),
        }))
    }
}

#[async_trait]
impl TrainStore for MemoryStore {
    async fn create_train(&self, train: NewTrain) -> StoreResult<Train> {
        let mut tables = self.tables.lock().await;
        if tables
            .trains
            .values()
            .any(|t| t.train_number == train.train_number)
        {
            return Err(StoreError::Conflict);
        }
        let train = Train {
            id: Uuid::new_v4(),
            train_number: train.train_number,
            train_name: train.train_name,
            source: train.source,
            destination: train.destination,
            total_seats: train.total_seats,
        };
        tables.trains.insert(train.id, train.clone());
        Ok(train)
    }

    async fn find_trains(
        &self,
        source: &str,
        destination: &str,
    ) -> StoreResult<Vec<TrainAvailability>> {
        let tables = self.tables.lock().await;
        let mut results: Vec<TrainAvailability> = tables
            .trains
            .values()
            .filter(|t| {
                t.source.eq_ignore_ascii_case(source)
                    && t.destination.eq_ignore_ascii_case(destination)
            })
            .map(|t| TrainAvailability {
                train: t.clone(),
                available_seats: railbook_core::availability::available_seats(
                    t.total_seats,
                    tables.seats_for(t.id).len(),
                ),
            })
            .collect();
        results.sort_by(|a, b| a.train.train_number.cmp(&b.train.train_number));
        Ok(results)
    }
}

#[async_trait]
impl BookingQueries for MemoryStore {
    async fn booking_for_user(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BookingDetails>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .get(&booking_id)
            .filter(|b| b.user_id == user_id)
            .and_then(|b| {
                tables.trains.get(&b.train_id).map(|t| BookingDetails {
                    booking: b.clone(),
                    train_number: t.train_number.clone(),
                    train_name: t.train_name.clone(),
                    source: t.source.clone(),
                    destination: t.destination.clone(),
                })
            }))
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>> {
        let tables = self.tables.lock().await;
        let mut details: Vec<BookingDetails> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| {
                tables.trains.get(&b.train_id).map(|t| BookingDetails {
                    booking: b.clone(),
                    train_number: t.train_number.clone(),
                    train_name: t.train_name.clone(),
                    source: t.source.clone(),
                    destination: t.destination.clone(),
                })
            })
            .collect();
        details.sort_by(|a, b| b.booking.booking_date.cmp(&a.booking.booking_date));
        Ok(details)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }
}
