use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered train. Immutable after creation except by administrative
/// update, which is out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub id: Uuid,
    pub train_number: String,
    pub train_name: String,
    pub source: String,
    pub destination: String,
    pub total_seats: i32,
}

/// Admin-supplied fields for registering a train.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrain {
    pub train_number: String,
    pub train_name: String,
    pub source: String,
    pub destination: String,
    pub total_seats: i32,
}

impl NewTrain {
    /// Capacity must admit at least one booking.
    pub fn validate(&self) -> Result<(), String> {
        if self.train_number.trim().is_empty() {
            return Err("train_number is required".to_string());
        }
        if self.train_name.trim().is_empty() {
            return Err("train_name is required".to_string());
        }
        if self.source.trim().is_empty() || self.destination.trim().is_empty() {
            return Err("source and destination are required".to_string());
        }
        if self.total_seats < 1 {
            return Err("total_seats must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Search result row: a train together with its remaining capacity.
#[derive(Debug, Clone, Serialize)]
pub struct TrainAvailability {
    #[serde(flatten)]
    pub train: Train,
    pub available_seats: u32,
}
