use axum::extract::FromRef;
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use uuid::Uuid;

/// Session keys used by the legacy session-based scheme
pub const SESSION_KEY_USER_ID: &str = "user_id";

/// Creates the session layer for the legacy end-user scheme.
///
/// Cookies are only marked secure when the site is served over HTTPS.
pub async fn create_session_layer(
    pool: PgPool,
    _session_secret: &[u8],
    base_url: &str,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    // Create the session store backed by PostgreSQL
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(base_url.starts_with("https://"))
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok(session_layer)
}

/// Reads the session identity, if any. Nothing in the current flows
/// writes `SESSION_KEY_USER_ID`, so callers always see `None`; the
/// bearer-token scheme is the one that actually authenticates.
pub async fn session_user_id(session: &Session) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.get::<Uuid>(SESSION_KEY_USER_ID).await
}

/// Application state shared by all routers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: crate::config::Config,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
