pub mod auth;
pub mod chat;
pub mod db;
pub mod error;
pub mod messages;
pub mod presence;
pub mod rooms;
pub mod session;
pub mod users;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use chat::channels::Channels;
use presence::{Presence, Typing};

pub use error::{AppError, AppResult};

/// Everything a handler or a live connection needs. Constructed once at
/// startup; the registries live exactly as long as the server process.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub presence: Arc<Presence>,
    pub typing: Arc<Typing>,
    pub channels: Arc<Channels>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            presence: Arc::new(Presence::default()),
            typing: Arc::new(Typing::default()),
            channels: Arc::new(Channels::default()),
        }
    }
}
