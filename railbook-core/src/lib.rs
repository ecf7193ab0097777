pub mod availability;
pub mod booking;
pub mod coordinator;
pub mod seat;
pub mod store;
pub mod train;

use store::StoreError;

/// Outcome taxonomy for a single booking attempt. Each variant maps to a
/// distinct caller-visible response (retry vs. give up vs. "sold out").
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("train not found")]
    TrainNotFound,
    #[error("no seats available")]
    NoSeatsAvailable,
    #[error("concurrent booking conflict, retries exhausted")]
    ConflictRetryExhausted,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type BookingResult<T> = Result<T, BookingError>;
