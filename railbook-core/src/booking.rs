use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A confirmed seat grant. Immutable once created; the only lifecycle event
/// is creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub train_id: Uuid,
    pub seat_number: i32,
    pub booking_date: DateTime<Utc>,
}

impl Booking {
    pub fn new(user_id: Uuid, train_id: Uuid, seat_number: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            train_id,
            seat_number,
            booking_date: Utc::now(),
        }
    }
}

/// A booking joined with its train's route fields, as returned by the
/// read-side lookups.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub train_number: String,
    pub train_name: String,
    pub source: String,
    pub destination: String,
}

/// Request body for the booking endpoint; the user comes from the verified
/// token, never from the body.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub train_id: Uuid,
}
