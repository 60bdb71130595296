//! Booking service
//!
//! Room reservations: request validation, pricing, clash detection and the
//! admin status workflow.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::repositories::{BookingRepository, RoomRepository};
use crate::models::{Booking, BookingStatus, CreateBookingInput, Room, User};
use crate::services::validation::{is_valid_email, non_blank};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Room not found")]
    RoomNotFound,

    #[error("Booking not found")]
    NotFound,

    /// The requested slot overlaps an existing pending or confirmed booking
    #[error("The room is already booked for part of that time")]
    Conflict,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Price of a booking: every started hour is charged in full
pub fn price_cents(start: DateTime<Utc>, end: DateTime<Utc>, hourly_rate_cents: i64) -> i64 {
    let seconds = (end - start).num_seconds().max(0);
    let hours = (seconds + 3599) / 3600;
    hours * hourly_rate_cents
}

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    rooms: Arc<dyn RoomRepository>,
}

impl BookingService {
    pub fn new(bookings: Arc<dyn BookingRepository>, rooms: Arc<dyn RoomRepository>) -> Self {
        Self { bookings, rooms }
    }

    /// Create a pending booking for `user`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an empty/inverted/past slot, bad contact
    ///   details or an attendee count outside `1..=capacity`
    /// - `RoomNotFound` if the room does not exist
    /// - `Conflict` if the slot overlaps a non-cancelled booking
    pub async fn create(&self, user: &User, input: CreateBookingInput) -> Result<Booking, BookingError> {
        self.create_at(user, input, Utc::now()).await
    }

    async fn create_at(
        &self,
        user: &User,
        input: CreateBookingInput,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(BookingError::ValidationError("Name is required".to_string()));
        }
        if !is_valid_email(&input.email) {
            return Err(BookingError::ValidationError("Invalid email format".to_string()));
        }
        if input.end_time <= input.start_time {
            return Err(BookingError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }
        if input.start_time <= now {
            return Err(BookingError::ValidationError(
                "Bookings must start in the future".to_string(),
            ));
        }

        let room = self
            .rooms
            .get_by_id(input.room_id)
            .await?
            .ok_or(BookingError::RoomNotFound)?;
        check_attendees(&room, input.attendees)?;

        let clashes = self
            .bookings
            .find_overlapping(room.id, input.start_time, input.end_time)
            .await?;
        if !clashes.is_empty() {
            return Err(BookingError::Conflict);
        }

        let booking = Booking {
            id: 0,
            room_id: room.id,
            user_id: Some(user.id),
            name,
            email: input.email.trim().to_string(),
            phone: non_blank(input.phone),
            event_type: non_blank(input.event_type),
            start_time: input.start_time,
            end_time: input.end_time,
            attendees: input.attendees,
            notes: non_blank(input.notes),
            status: BookingStatus::Pending,
            total_cents: price_cents(input.start_time, input.end_time, room.hourly_rate_cents),
            created_at: now,
        };

        let created = self.bookings.create(&booking).await?;
        tracing::info!(
            booking_id = created.id,
            room_id = room.id,
            total_cents = created.total_cents,
            "Booking requested"
        );
        Ok(created)
    }

    /// Bookings belonging to `user_id`
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.list_by_user(user_id).await?)
    }

    pub async fn list(
        &self,
        status: Option<BookingStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Booking>, i64), BookingError> {
        Ok(self.bookings.list(status, page, per_page).await?)
    }

    /// Admin status change.
    ///
    /// Re-activating a cancelled booking re-checks the slot, since another
    /// booking may have taken it meanwhile.
    pub async fn set_status(&self, id: i64, status: BookingStatus) -> Result<Booking, BookingError> {
        let booking = self.bookings.get_by_id(id).await?.ok_or(BookingError::NotFound)?;

        if !booking.status.holds_slot() && status.holds_slot() {
            let clashes = self
                .bookings
                .find_overlapping(booking.room_id, booking.start_time, booking.end_time)
                .await?;
            if clashes.iter().any(|b| b.id != booking.id) {
                return Err(BookingError::Conflict);
            }
        }

        self.bookings
            .update_status(id, status)
            .await?
            .ok_or(BookingError::NotFound)
    }

    /// Let the owner cancel their own booking
    pub async fn cancel_own(&self, user: &User, id: i64) -> Result<Booking, BookingError> {
        let booking = self.bookings.get_by_id(id).await?.ok_or(BookingError::NotFound)?;
        if booking.user_id != Some(user.id) {
            return Err(BookingError::NotFound);
        }
        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }
        if booking.start_time <= Utc::now() {
            return Err(BookingError::Forbidden(
                "Bookings that have started cannot be cancelled".to_string(),
            ));
        }

        self.bookings
            .update_status(id, BookingStatus::Cancelled)
            .await?
            .ok_or(BookingError::NotFound)
    }

    pub async fn count_by_status(&self, status: BookingStatus) -> Result<i64, BookingError> {
        Ok(self.bookings.count_by_status(status).await?)
    }
}

fn check_attendees(room: &Room, attendees: i64) -> Result<(), BookingError> {
    if attendees < 1 {
        return Err(BookingError::ValidationError(
            "At least one attendee is required".to_string(),
        ));
    }
    if attendees > room.capacity {
        return Err(BookingError::ValidationError(format!(
            "{} holds at most {} people",
            room.name, room.capacity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxBookingRepository, SqlxRoomRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        service: BookingService,
        member: User,
        room_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        pool.execute("INSERT INTO users (id, name, email, password_hash) VALUES (1, 'M', 'm@example.org', 'h')")
            .await
            .unwrap();
        pool.execute("INSERT INTO rooms (id, name, capacity, hourly_rate_cents) VALUES (1, 'Hall', 40, 2500)")
            .await
            .unwrap();

        let mut member = User::new("M".into(), "m@example.org".into(), "h".into(), UserRole::Member);
        member.id = 1;

        Fixture {
            service: BookingService::new(
                SqlxBookingRepository::boxed(pool.clone()),
                SqlxRoomRepository::boxed(pool),
            ),
            member,
            room_id: 1,
        }
    }

    fn request(room_id: i64, start: DateTime<Utc>, hours: i64, attendees: i64) -> CreateBookingInput {
        CreateBookingInput {
            room_id,
            name: "Morgan".into(),
            email: "morgan@example.org".into(),
            phone: Some("  ".into()),
            event_type: Some("Birthday".into()),
            start_time: start,
            end_time: start + Duration::hours(hours),
            attendees,
            notes: None,
        }
    }

    fn tomorrow_at(hour: u32) -> DateTime<Utc> {
        let day = (Utc::now() + Duration::days(1)).date_naive();
        Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
    }

    #[test]
    fn test_price_rounds_up_started_hours() {
        let start = Utc.with_ymd_and_hms(2031, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(price_cents(start, start + Duration::hours(2), 2500), 5000);
        assert_eq!(price_cents(start, start + Duration::minutes(61), 2500), 5000);
        assert_eq!(price_cents(start, start + Duration::minutes(1), 2500), 2500);
        assert_eq!(price_cents(start, start, 2500), 0);
    }

    #[tokio::test]
    async fn test_create_prices_and_cleans() {
        let fx = setup().await;
        let booking = fx
            .service
            .create(&fx.member, request(fx.room_id, tomorrow_at(10), 3, 20))
            .await
            .unwrap();

        assert_eq!(booking.total_cents, 7500);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.phone, None);
        assert_eq!(booking.user_id, Some(fx.member.id));
    }

    #[tokio::test]
    async fn test_overlap_is_conflict_adjacent_is_fine() {
        let fx = setup().await;
        fx.service
            .create(&fx.member, request(fx.room_id, tomorrow_at(10), 2, 10))
            .await
            .unwrap();

        let clash = fx
            .service
            .create(&fx.member, request(fx.room_id, tomorrow_at(11), 2, 10))
            .await;
        assert!(matches!(clash, Err(BookingError::Conflict)));

        fx.service
            .create(&fx.member, request(fx.room_id, tomorrow_at(12), 1, 10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_slot_and_reactivation_rechecks() {
        let fx = setup().await;
        let first = fx
            .service
            .create(&fx.member, request(fx.room_id, tomorrow_at(9), 2, 10))
            .await
            .unwrap();
        fx.service.cancel_own(&fx.member, first.id).await.unwrap();

        fx.service
            .create(&fx.member, request(fx.room_id, tomorrow_at(9), 2, 10))
            .await
            .unwrap();

        assert!(matches!(
            fx.service.set_status(first.id, BookingStatus::Confirmed).await,
            Err(BookingError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_validation_rules() {
        let fx = setup().await;
        let past = Utc::now() - Duration::hours(3);

        let cases = vec![
            request(fx.room_id, past, 1, 10),
            request(fx.room_id, tomorrow_at(10), 0, 10),
            request(fx.room_id, tomorrow_at(10), 1, 0),
            request(fx.room_id, tomorrow_at(10), 1, 41),
        ];
        for case in cases {
            assert!(matches!(
                fx.service.create(&fx.member, case).await,
                Err(BookingError::ValidationError(_))
            ));
        }

        assert!(matches!(
            fx.service.create(&fx.member, request(99, tomorrow_at(10), 1, 5)).await,
            Err(BookingError::RoomNotFound)
        ));
    }

    #[tokio::test]
    async fn test_admin_status_and_listing() {
        let fx = setup().await;
        let booking = fx
            .service
            .create(&fx.member, request(fx.room_id, tomorrow_at(15), 1, 5))
            .await
            .unwrap();

        let confirmed = fx.service.set_status(booking.id, BookingStatus::Confirmed).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(fx.service.count_by_status(BookingStatus::Confirmed).await.unwrap(), 1);
        assert_eq!(fx.service.list_for_user(fx.member.id).await.unwrap().len(), 1);

        assert!(matches!(
            fx.service.set_status(999, BookingStatus::Confirmed).await,
            Err(BookingError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_cannot_cancel_someone_elses_booking() {
        let fx = setup().await;
        let booking = fx
            .service
            .create(&fx.member, request(fx.room_id, tomorrow_at(16), 1, 5))
            .await
            .unwrap();

        let mut stranger = fx.member.clone();
        stranger.id = 2;
        assert!(matches!(
            fx.service.cancel_own(&stranger, booking.id).await,
            Err(BookingError::NotFound)
        ));
    }
}
