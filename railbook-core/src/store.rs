use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::booking::{Booking, BookingDetails};
use crate::train::{NewTrain, Train, TrainAvailability};

/// Storage-layer failures, kept coarse on purpose: the coordinator only
/// distinguishes "a concurrent writer beat us" from "the store is broken".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conflicting write was detected (unique-constraint violation or an
    /// equivalent serialization failure). Retryable.
    #[error("conflicting concurrent write")]
    Conflict,
    /// The store could not serve the request at all. Not retryable here.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One booking attempt's transaction. All reads observe the snapshot the
/// eventual write will run in; dropping the value without `commit` must
/// leave zero observable trace.
#[async_trait]
pub trait SeatTxn: Send {
    /// Loads the train and takes whatever exclusive claim the backend needs
    /// so that a concurrent attempt on the same train serializes behind
    /// this transaction (`SELECT ... FOR UPDATE` in Postgres).
    async fn train_for_update(&mut self, train_id: Uuid) -> StoreResult<Option<Train>>;

    /// Seat numbers currently held for the train, within this transaction.
    async fn booked_seats(&mut self, train_id: Uuid) -> StoreResult<Vec<i32>>;

    /// Stages the booking row. A duplicate `(train_id, seat_number)` pair
    /// surfaces as `StoreError::Conflict`.
    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// The transaction boundary the coordinator runs against. The store's
/// isolation is the sole enforcement point for the capacity and
/// seat-uniqueness invariants.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn SeatTxn>>;
}

/// Train registration and route search. No allocation logic lives here.
#[async_trait]
pub trait TrainStore: Send + Sync {
    /// Registers a train. Duplicate `train_number` is a `Conflict`.
    async fn create_train(&self, train: NewTrain) -> StoreResult<Train>;

    /// Case-insensitive route match, each train paired with its remaining
    /// capacity.
    async fn find_trains(
        &self,
        source: &str,
        destination: &str,
    ) -> StoreResult<Vec<TrainAvailability>>;
}

/// Read-side booking lookups, always scoped to the owning user.
#[async_trait]
pub trait BookingQueries: Send + Sync {
    async fn booking_for_user(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BookingDetails>>;

    /// All of a user's bookings, most recent first.
    async fn bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>>;
}

/// A registered account. The hash is opaque to the store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates an account. Duplicate username is a `Conflict`.
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
}

/// Everything the API layer needs from one storage backend.
pub trait Store: BookingStore + TrainStore + BookingQueries + UserStore {}

impl<T: BookingStore + TrainStore + BookingQueries + UserStore> Store for T {}
