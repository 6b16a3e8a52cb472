use anyhow::{Context, Result};
use cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

/// Cookie name the session token is stored under.
pub const TOKEN_COOKIE: &str = "asset_repo_token";

/// Lifetime applied by [`CredentialStore::set`].
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Persists the opaque session token. An expired token reads as absent.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;

    fn set_with_ttl(&self, token: &str, ttl: Duration) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn set(&self, token: &str) -> Result<()> {
        self.set_with_ttl(token, Duration::days(TOKEN_TTL_DAYS))
    }
}

fn session_cookie(token: &str, expires: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .expires(expires)
        .build()
}

fn live_value(cookie: &Cookie<'_>) -> Option<String> {
    if cookie.name() != TOKEN_COOKIE || cookie.value().is_empty() {
        return None;
    }
    match cookie.expires_datetime() {
        Some(expires) if expires <= OffsetDateTime::now_utc() => None,
        _ => Some(cookie.value().to_string()),
    }
}

/// Stores the token as a single `Set-Cookie`-formatted line in a file.
pub struct CookieCredentialStore {
    path: PathBuf,
}

impl CookieCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for CookieCredentialStore {
    fn get(&self) -> Option<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Could not read session cookie");
                return None;
            }
        };

        match Cookie::parse_encoded(raw.trim().to_string()) {
            Ok(cookie) => live_value(&cookie),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Ignoring malformed session cookie");
                None
            }
        }
    }

    fn set_with_ttl(&self, token: &str, ttl: Duration) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let cookie = session_cookie(token, OffsetDateTime::now_utc() + ttl);
        std::fs::write(&self.path, format!("{}\n", cookie.encoded()))
            .with_context(|| format!("Failed to write session cookie to {}", self.path.display()))?;
        debug!(path = ?self.path, "Session cookie stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session cookie {}", self.path.display())),
        }
    }
}

/// Process-local store, used by tests and short-lived sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    cookie: Mutex<Option<Cookie<'static>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.cookie.lock().as_ref().and_then(live_value)
    }

    fn set_with_ttl(&self, token: &str, ttl: Duration) -> Result<()> {
        *self.cookie.lock() = Some(session_cookie(token, OffsetDateTime::now_utc() + ttl));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.cookie.lock() = None;
        Ok(())
    }
}
