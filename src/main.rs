use anyhow::Context;
use axum::{routing::get, Router};
use palaver::{auth, chat, db, messages, rooms, users, AppState};
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let database_url = dotenv::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db_pool = db::connect(&database_url).await?;
    db::MIGRATOR.run(&db_pool).await?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(30)));

    let app_state = AppState::new(db_pool);

    let app = Router::new()
        .merge(auth::router())
        .nest("/api/rooms", rooms::router())
        .nest("/api/messages", messages::router())
        .route("/api/users", get(users::list_users))
        .route("/ws", get(chat::ws::chat_ws))
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server running");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}
