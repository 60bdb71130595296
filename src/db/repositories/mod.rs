//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod booking;
pub mod contact;
pub mod donation;
pub mod event;
pub mod newsletter;
pub mod room;
pub mod session;
pub mod settings;
pub mod site_image;
pub mod user;

pub use booking::{BookingRepository, SqlxBookingRepository};
pub use contact::{ContactMessageRepository, SqlxContactMessageRepository};
pub use donation::{DonationRepository, SqlxDonationRepository};
pub use event::{EventRepository, SqlxEventRepository};
pub use newsletter::{NewsletterRepository, SqlxNewsletterRepository};
pub use room::{RoomRepository, SqlxRoomRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use site_image::{SiteImageRepository, SqlxSiteImageRepository};
pub use user::{SqlxUserRepository, UserRepository};
