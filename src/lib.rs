//! Commonroom - website and back-office for a community center
//!
//! Public pages, room bookings, events, a contact form with attachments,
//! a newsletter, donations and an admin back-office, served by one axum app.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
