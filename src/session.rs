use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, AppError, AppResult, AppState};

pub const USER_ID: &str = "user_id";

/// The authenticated caller, resolved from the session cookie.
///
/// This is the single credential check for the whole server: every protected
/// HTTP handler and the websocket upgrade take it as an extractor, so an
/// absent, expired, or tampered cookie is rejected the same way everywhere.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Resolve the session to the identity it is bound to.
pub async fn verify(session: &Session, db_pool: &SqlitePool) -> AppResult<CurrentUser> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Err(AppError::Unauthenticated);
    };

    let row: Option<(String, String)> =
        sqlx::query_as("SELECT id,username FROM users WHERE id=?")
            .bind(&user_id)
            .fetch_optional(db_pool)
            .await?;

    // a live cookie for a since-deleted user is still unauthenticated
    let Some((id, username)) = row else {
        return Err(AppError::Unauthenticated);
    };

    Ok(CurrentUser { id: db::parse_id(&id)?, username })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthenticated)?;
        verify(&session, &state.db_pool).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::testutil::{insert_user, test_pool};

    fn fresh_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn verify_resolves_a_bound_session() {
        let pool = test_pool().await;
        let alice = insert_user(&pool, "alice").await;

        let session = fresh_session();
        session.insert(USER_ID, alice.to_string()).await.unwrap();

        let user = verify(&session, &pool).await.unwrap();
        assert_eq!(user.id, alice);
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn verify_rejects_an_unbound_session() {
        let pool = test_pool().await;

        let err = verify(&fresh_session(), &pool).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn verify_rejects_a_session_for_a_missing_user() {
        let pool = test_pool().await;

        let session = fresh_session();
        session.insert(USER_ID, Uuid::now_v7().to_string()).await.unwrap();

        let err = verify(&session, &pool).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
