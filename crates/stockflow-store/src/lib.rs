//! # StockFlow Store
//!
//! Repository ports and store implementations.
//!
//! The engine talks to persistence exclusively through the [`ports`] traits;
//! two implementations are provided:
//!
//! - [`MemoryStore`]: `RwLock`-backed maps for tests and static deployments
//! - [`PgStore`]: PostgreSQL via SQLx with runtime-bound queries
//!
//! # Example
//!
//! ```ignore
//! use stockflow_store::{init_db_pool, PgStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = init_db_pool().await;
//!     let store = PgStore::new(pool);
//! }
//! ```

use std::env;

pub mod memory;
pub mod ports;
pub mod postgres;

pub use memory::MemoryStore;
pub use ports::{
    NotificationStore, PermissionStore, PreferenceMutation, PreferenceStore, RoleStore,
    TemplateStore,
};
pub use postgres::PgStore;

/// Initializes a PostgreSQL connection pool from `DATABASE_URL`.
///
/// The returned pool is cheaply cloneable and should be created once at
/// startup.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection fails.
pub async fn init_db_pool() -> sqlx::PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    sqlx::PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
