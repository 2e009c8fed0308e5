//! Persisted operator identity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::Session;
use storage::Storage;
use tokio::sync::Mutex;
use tracing::warn;

/// Local entry key the session is persisted under.
pub const SESSION_ENTRY_KEY: &str = "user";

/// Singleton session persistence.
///
/// `load` never fails: unreadable or malformed state is reported as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Option<Session>;
    async fn set(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

fn decode_session(raw: &str) -> Option<Session> {
    match serde_json::from_str::<Session>(raw) {
        Ok(session) => Some(session),
        Err(err) => {
            warn!("ignoring malformed persisted session: {err}");
            None
        }
    }
}

fn encode_session(session: &Session) -> Result<String> {
    serde_json::to_string(session).context("failed to serialize session")
}

pub struct DurableSessionStore {
    store: Storage,
}

impl DurableSessionStore {
    pub fn new(store: Storage) -> Self {
        Self { store }
    }

    pub async fn open(database_url: &str) -> Result<Self> {
        let store = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize session storage at '{database_url}'"))?;
        store
            .health_check()
            .await
            .with_context(|| format!("session storage at '{database_url}' is not usable"))?;
        Ok(Self::new(store))
    }
}

#[async_trait]
impl SessionStore for DurableSessionStore {
    async fn load(&self) -> Option<Session> {
        match self.store.load_local_entry(SESSION_ENTRY_KEY).await {
            Ok(raw) => raw.as_deref().and_then(decode_session),
            Err(err) => {
                warn!("session storage unreadable, treating as signed out: {err:#}");
                None
            }
        }
    }

    async fn set(&self, session: &Session) -> Result<()> {
        let raw = encode_session(session)?;
        self.store.save_local_entry(SESSION_ENTRY_KEY, &raw).await
    }

    async fn clear(&self) -> Result<()> {
        self.store.remove_local_entry(SESSION_ENTRY_KEY).await?;
        Ok(())
    }
}

/// Keeps the serialized entry in memory, so it goes through the same
/// decode path as the durable store.
#[derive(Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub async fn raw(&self) -> Option<String> {
        self.raw.lock().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Option<Session> {
        self.raw.lock().await.as_deref().and_then(decode_session)
    }

    async fn set(&self, session: &Session) -> Result<()> {
        let raw = encode_session(session)?;
        *self.raw.lock().await = Some(raw);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.raw.lock().await.take();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
