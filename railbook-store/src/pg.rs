use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use railbook_core::booking::{Booking, BookingDetails};
use railbook_core::store::{
    BookingQueries, BookingStore, SeatTxn, StoreError, StoreResult, TrainStore, User, UserStore,
};
use railbook_core::train::{NewTrain, Train, TrainAvailability};

/// Postgres-backed storage. Booking attempts serialize per train via a
/// `SELECT ... FOR UPDATE` row lock held for the life of the transaction;
/// the unique index on `(train_id, seat_number)` is the last-resort
/// backstop should that lock ever be bypassed.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // Unique violation or a serialization failure: a concurrent writer
        // got there first, the attempt can be retried.
        if db.is_unique_violation() || db.code().as_deref() == Some("40001") {
            return StoreError::Conflict;
        }
    }
    StoreError::Unavailable(e.to_string())
}

#[derive(sqlx::FromRow)]
struct TrainRow {
    id: Uuid,
    train_number: String,
    train_name: String,
    source: String,
    destination: String,
    total_seats: i32,
}

impl From<TrainRow> for Train {
    fn from(row: TrainRow) -> Self {
        Train {
            id: row.id,
            train_number: row.train_number,
            train_name: row.train_name,
            source: row.source,
            destination: row.destination,
            total_seats: row.total_seats,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrainSearchRow {
    id: Uuid,
    train_number: String,
    train_name: String,
    source: String,
    destination: String,
    total_seats: i32,
    available_seats: i64,
}

#[derive(sqlx::FromRow)]
struct BookingDetailsRow {
    id: Uuid,
    user_id: Uuid,
    train_id: Uuid,
    seat_number: i32,
    booking_date: DateTime<Utc>,
    train_number: String,
    train_name: String,
    source: String,
    destination: String,
}

impl From<BookingDetailsRow> for BookingDetails {
    fn from(row: BookingDetailsRow) -> Self {
        BookingDetails {
            booking: Booking {
                id: row.id,
                user_id: row.user_id,
                train_id: row.train_id,
                seat_number: row.seat_number,
                booking_date: row.booking_date,
            },
            train_number: row.train_number,
            train_name: row.train_name,
            source: row.source,
            destination: row.destination,
        }
    }
}

struct PgTxn {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SeatTxn for PgTxn {
    async fn train_for_update(&mut self, train_id: Uuid) -> StoreResult<Option<Train>> {
        let row = sqlx::query_as::<_, TrainRow>(
            r#"
            SELECT id, train_number, train_name, source, destination, total_seats
            FROM trains
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(train_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_err)?;

        Ok(row.map(Train::from))
    }

    async fn booked_seats(&mut self, train_id: Uuid) -> StoreResult<Vec<i32>> {
        sqlx::query_scalar::<_, i32>(
            r#"
            SELECT seat_number
            FROM bookings
            WHERE train_id = $1
            ORDER BY seat_number
            "#,
        )
        .bind(train_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, train_id, seat_number, booking_date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.train_id)
        .bind(booking.seat_number)
        .bind(booking.booking_date)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_err)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_err)
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn SeatTxn>> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(Box::new(PgTxn { tx }))
    }
}

#[async_trait]
impl TrainStore for PgStore {
    async fn create_train(&self, train: NewTrain) -> StoreResult<Train> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO trains (id, train_number, train_name, source, destination, total_seats)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&train.train_number)
        .bind(&train.train_name)
        .bind(&train.source)
        .bind(&train.destination)
        .bind(train.total_seats)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(Train {
            id,
            train_number: train.train_number,
            train_name: train.train_name,
            source: train.source,
            destination: train.destination,
            total_seats: train.total_seats,
        })
    }

    async fn find_trains(
        &self,
        source: &str,
        destination: &str,
    ) -> StoreResult<Vec<TrainAvailability>> {
        let rows = sqlx::query_as::<_, TrainSearchRow>(
            r#"
            SELECT
                t.id, t.train_number, t.train_name, t.source, t.destination, t.total_seats,
                t.total_seats::bigint - COUNT(b.id) AS available_seats
            FROM trains t
            LEFT JOIN bookings b ON b.train_id = t.id
            WHERE LOWER(t.source) = LOWER($1)
              AND LOWER(t.destination) = LOWER($2)
            GROUP BY t.id
            ORDER BY t.train_number
            "#,
        )
        .bind(source)
        .bind(destination)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| TrainAvailability {
                train: Train {
                    id: row.id,
                    train_number: row.train_number,
                    train_name: row.train_name,
                    source: row.source,
                    destination: row.destination,
                    total_seats: row.total_seats,
                },
                available_seats: row.available_seats.max(0) as u32,
            })
            .collect())
    }
}

#[async_trait]
impl BookingQueries for PgStore {
    async fn booking_for_user(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BookingDetails>> {
        let row = sqlx::query_as::<_, BookingDetailsRow>(
            r#"
            SELECT
                b.id, b.user_id, b.train_id, b.seat_number, b.booking_date,
                t.train_number, t.train_name, t.source, t.destination
            FROM bookings b
            JOIN trains t ON t.id = b.train_id
            WHERE b.id = $1 AND b.user_id = $2
            "#,
        )
        .bind(booking_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(BookingDetails::from))
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetailsRow>(
            r#"
            SELECT
                b.id, b.user_id, b.train_id, b.seat_number, b.booking_date,
                t.train_number, t.train_name, t.source, t.destination
            FROM bookings b
            JOIN trains t ON t.id = b.train_id
            WHERE b.user_id = $1
            ORDER BY b.booking_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(BookingDetails::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|u| User {
            id: u.id,
            username: u.username,
            password_hash: u.password_hash,
        }))
    }
}
