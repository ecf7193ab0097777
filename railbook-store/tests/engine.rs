use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use uuid::Uuid;

use railbook_core::booking::Booking;
use railbook_core::coordinator::create_booking;
use railbook_core::store::{BookingStore, StoreError, TrainStore};
use railbook_core::train::NewTrain;
use railbook_core::BookingError;
use railbook_store::MemoryStore;

async fn train_with_capacity(store: &MemoryStore, number: &str, total_seats: i32) -> Uuid {
    store
        .create_train(NewTrain {
            train_number: number.to_string(),
            train_name: format!("Express {}", number),
            source: "Chennai".to_string(),
            destination: "Bangalore".to_string(),
            total_seats,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn first_booking_gets_seat_one() {
    let store = MemoryStore::new();
    let train_id = train_with_capacity(&store, "1", 1).await;

    let booking = create_booking(&store, train_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(booking.seat_number, 1);
    assert_eq!(booking.train_id, train_id);
}

#[tokio::test]
async fn full_train_rejects_with_no_seats() {
    let store = MemoryStore::new();
    let train_id = train_with_capacity(&store, "2", 1).await;

    create_booking(&store, train_id, Uuid::new_v4()).await.unwrap();
    let err = create_booking(&store, train_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NoSeatsAvailable));
    assert_eq!(store.booking_count(train_id).await, 1);
}

#[tokio::test]
async fn gap_below_highest_seat_is_filled_first() {
    let store = MemoryStore::new();
    let train_id = train_with_capacity(&store, "3", 3).await;

    // Seed seats {1, 3} directly through the transaction boundary.
    let mut txn = store.begin().await.unwrap();
    txn.insert_booking(&Booking::new(Uuid::new_v4(), train_id, 1))
        .await
        .unwrap();
    txn.insert_booking(&Booking::new(Uuid::new_v4(), train_id, 3))
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let booking = create_booking(&store, train_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(booking.seat_number, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_attempts_never_oversell() {
    let store = Arc::new(MemoryStore::new());
    let train_id = train_with_capacity(&store, "4", 5).await;

    let mut attempts = JoinSet::new();
    for _ in 0..10 {
        let store = Arc::clone(&store);
        attempts.spawn(async move { create_booking(store.as_ref(), train_id, Uuid::new_v4()).await });
    }

    let mut seats = BTreeSet::new();
    let mut rejected = 0;
    while let Some(result) = attempts.join_next().await {
        match result.unwrap() {
            Ok(booking) => {
                // Seat uniqueness: every granted seat is new.
                assert!(seats.insert(booking.seat_number));
            }
            Err(BookingError::NoSeatsAvailable) => rejected += 1,
            Err(other) => panic!("unexpected booking error: {other}"),
        }
    }

    assert_eq!(seats, BTreeSet::from([1, 2, 3, 4, 5]));
    assert_eq!(rejected, 5);
    assert_eq!(store.booking_count(train_id).await, 5);
}

#[tokio::test]
async fn unknown_train_writes_nothing() {
    let store = MemoryStore::new();
    let missing = Uuid::new_v4();

    let err = create_booking(&store, missing, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::TrainNotFound));
    assert_eq!(store.booking_count(missing).await, 0);
}

#[tokio::test]
async fn failed_commit_rolls_back_completely() {
    let store = MemoryStore::new();
    let train_id = train_with_capacity(&store, "5", 3).await;

    create_booking(&store, train_id, Uuid::new_v4()).await.unwrap();

    store.fail_next_commit();
    let err = create_booking(&store, train_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::Store(StoreError::Unavailable(_))
    ));

    // Availability is exactly what it was before the failed attempt, and
    // the dropped seat number is handed out again.
    assert_eq!(store.booking_count(train_id).await, 1);
    let booking = create_booking(&store, train_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(booking.seat_number, 2);
}

#[tokio::test]
async fn each_user_can_hold_many_seats() {
    let store = MemoryStore::new();
    let train_id = train_with_capacity(&store, "6", 3).await;
    let user = Uuid::new_v4();

    let first = create_booking(&store, train_id, user).await.unwrap();
    let second = create_booking(&store, train_id, user).await.unwrap();
    assert_eq!((first.seat_number, second.seat_number), (1, 2));
}
