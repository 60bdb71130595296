//! Database layer
//!
//! SQLite storage for the community center: a pooled connection
//! (`DatabasePool`), versioned schema migrations and one repository per
//! entity.
//!
//! # Usage
//!
//! ```ignore
//! use commonroom::config::DatabaseConfig;
//! use commonroom::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
