//! Services layer - Business logic
//!
//! Each service owns the rules for one area of the site (accounts, rooms and
//! bookings, events, the contact form, the newsletter, donations, site
//! images) and coordinates its repositories with the query cache.

pub mod booking;
pub mod contact;
pub mod donation;
pub mod email;
pub mod event;
pub mod newsletter;
pub mod password;
pub mod rate_limiter;
pub mod room;
pub mod settings;
pub mod site_image;
pub mod upload;
pub mod user;
pub mod validation;

pub use booking::{BookingError, BookingService};
pub use contact::{ContactError, ContactService, PendingAttachment};
pub use donation::{DonationError, DonationService};
pub use email::EmailService;
pub use event::{EventError, EventService};
pub use newsletter::{render_markdown, NewsletterError, NewsletterService, SubscribeOutcome};
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use room::{RoomError, RoomService};
pub use settings::{SettingsService, SettingsServiceError, SiteSettings};
pub use site_image::{SiteImageError, SiteImageService};
pub use upload::{StoredFile, UploadError, UploadService};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
