//! Booking repository
//!
//! Room reservations, including the lookup used to detect clashing slots.

use crate::db::DynDatabasePool;
use crate::models::{Booking, BookingStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<Booking>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Booking>>;

    /// Bookings made by a user, most recent slot first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Booking>>;

    /// All bookings, optionally filtered by status, paginated
    async fn list(
        &self,
        status: Option<BookingStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Booking>, i64)>;

    /// Non-cancelled bookings of `room_id` whose slot intersects `[start, end)`
    async fn find_overlapping(
        &self,
        room_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    async fn update_status(&self, id: i64, status: BookingStatus) -> Result<Option<Booking>>;

    async fn count_by_status(&self, status: BookingStatus) -> Result<i64>;
}

pub struct SqlxBookingRepository {
    pool: DynDatabasePool,
}

impl SqlxBookingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookingRepository> {
        Arc::new(Self::new(pool))
    }
}

const BOOKING_COLUMNS: &str = "id, room_id, user_id, name, email, phone, event_type, \
     start_time, end_time, attendees, notes, status, total_cents, created_at";

#[async_trait]
impl BookingRepository for SqlxBookingRepository {
    async fn create(&self, booking: &Booking) -> Result<Booking> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (room_id, user_id, name, email, phone, event_type,
                                  start_time, end_time, attendees, notes, status, total_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.room_id)
        .bind(booking.user_id)
        .bind(&booking.name)
        .bind(&booking.email)
        .bind(&booking.phone)
        .bind(&booking.event_type)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.attendees)
        .bind(&booking.notes)
        .bind(booking.status.to_string())
        .bind(booking.total_cents)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create booking")?;

        Ok(Booking {
            id: result.last_insert_rowid(),
            created_at: now,
            ..booking.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {} FROM bookings WHERE id = ?", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get booking")?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE user_id = ? ORDER BY start_time DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list user bookings")?;

        rows.iter().map(row_to_booking).collect()
    }

    async fn list(
        &self,
        status: Option<BookingStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Booking>, i64)> {
        let per_page = per_page.clamp(1, 100);
        let offset = (page.max(1) - 1) * per_page;
        let status = status.map(|s| s.to_string());

        // `? IS NULL` lets one statement serve both the filtered and unfiltered listing
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE (? IS NULL OR status = ?) \
             ORDER BY start_time DESC, id DESC LIMIT ? OFFSET ?",
            BOOKING_COLUMNS
        ))
        .bind(&status)
        .bind(&status)
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list bookings")?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE (? IS NULL OR status = ?)")
                .bind(&status)
                .bind(&status)
                .fetch_one(self.pool.sqlite())
                .await
                .context("Failed to count bookings")?;

        let bookings = rows.iter().map(row_to_booking).collect::<Result<Vec<_>>>()?;
        Ok((bookings, total))
    }

    async fn find_overlapping(
        &self,
        room_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE room_id = ? AND status != 'cancelled'",
            BOOKING_COLUMNS
        ))
        .bind(room_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to query room bookings")?;

        // Interval test runs on decoded timestamps rather than stored text
        let bookings = rows.iter().map(row_to_booking).collect::<Result<Vec<_>>>()?;
        Ok(bookings
            .into_iter()
            .filter(|b| b.status.holds_slot() && b.overlaps(start, end))
            .collect())
    }

    async fn update_status(&self, id: i64, status: BookingStatus) -> Result<Option<Booking>> {
        let result = sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update booking status")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn count_by_status(&self, status: BookingStatus) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE status = ?")
            .bind(status.to_string())
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count bookings")?;
        Ok(count)
    }
}

fn row_to_booking(row: &SqliteRow) -> Result<Booking> {
    let status: String = row.get("status");

    Ok(Booking {
        id: row.get("id"),
        room_id: row.get("room_id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        event_type: row.get("event_type"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        attendees: row.get("attendees"),
        notes: row.get("notes"),
        status: BookingStatus::from_str(&status)?,
        total_cents: row.get("total_cents"),
        created_at: row.get("created_at"),
    })
}
