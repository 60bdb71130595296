//! Data models
//!
//! Database entities and the input types the API deserializes into them:
//! User, Session, Room, Booking, Event, ContactMessage, NewsletterSubscriber,
//! Newsletter, Donation and SiteImage.

mod booking;
mod contact;
mod donation;
mod event;
mod newsletter;
mod room;
mod session;
mod site_image;
mod user;

pub use booking::{Booking, BookingStatus, CreateBookingInput};
pub use contact::{ContactInput, ContactMessage};
pub use donation::{CreateDonationInput, Donation, DonationsTotal};
pub use event::{Event, EventInput};
pub use newsletter::{Newsletter, NewsletterSubscriber};
pub use room::{Room, RoomInput};
pub use session::Session;
pub use site_image::SiteImage;
pub use user::{User, UserRole};

/// A page of results plus the total row count
#[derive(Debug, Clone, serde::Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        Self { items, total, page, per_page }
    }

    pub fn total_pages(&self) -> i64 {
        if self.per_page <= 0 {
            return 0;
        }
        (self.total + self.per_page - 1) / self.per_page
    }
}
