//! Optimistic mutation and reconciliation between the record cache and the
//! registry.
//!
//! The controller owns the list view's replica, the edit view's draft and the
//! view generation. Its state lock is never held across a registry call, so
//! responses are applied in short critical sections in whatever order they
//! resolve.
//!
//! Each view entry bumps the generation. A response that resolves after its
//! view was left is discarded instead of replacing the cache, populating a
//! draft or scheduling a navigation for a view that is gone. List responses
//! are additionally superseded by any later-issued list request.
//!
//! Delete commits locally on the registry's success response and falls back
//! to a full [`SyncController::refresh`] on any failure. A duplicate delete of
//! the same id therefore converges: the second call fails server-side and its
//! refresh restores server truth.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{Session, UserId, UserRecord},
    protocol::{Credentials, LoginResponse, RecordUpdate, Registration},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    cache::RecordCache,
    error::{RegistryClientError, SyncError},
    messages,
    navigation::Route,
    registry::RegistryApi,
    session::SessionStore,
};

pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Human checkpoint before a destructive call.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Approves every prompt.
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Delays between a success notice and the navigation that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub login_redirect: Duration,
    pub update_redirect: Duration,
    pub register_redirect: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            login_redirect: Duration::from_millis(1000),
            update_redirect: Duration::from_millis(1500),
            register_redirect: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    List,
    Edit(UserId),
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    Notice(Notice),
    NavigationScheduled { to: Route, delay: Duration },
    SessionChanged(Option<Session>),
    RecordsChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: UserId,
    pub fields: RecordUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    pub records: Vec<UserRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Declined,
}

#[derive(Default)]
struct ControllerState {
    cache: RecordCache,
    loading: bool,
    list_error: Option<String>,
    draft: Option<EditDraft>,
    view: Option<View>,
    generation: u64,
    list_requests: u64,
}

pub struct SyncController {
    registry: Arc<dyn RegistryApi>,
    sessions: Arc<dyn SessionStore>,
    confirm: Arc<dyn Confirm>,
    timings: SyncTimings,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncController {
    pub fn new(
        registry: Arc<dyn RegistryApi>,
        sessions: Arc<dyn SessionStore>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            registry,
            sessions,
            confirm,
            timings: SyncTimings::default(),
            inner: Mutex::new(ControllerState::default()),
            events,
        }
    }

    pub fn with_timings(mut self, timings: SyncTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> Option<Session> {
        self.sessions.load().await
    }

    /// Marks `view` as displayed and returns its generation.
    pub async fn enter(&self, view: View) -> u64 {
        let mut guard = self.inner.lock().await;
        guard.generation += 1;
        guard.view = Some(view);
        guard.draft = None;
        debug!(?view, generation = guard.generation, "entered view");
        guard.generation
    }

    pub async fn current_view(&self) -> Option<View> {
        self.inner.lock().await.view
    }

    pub async fn records(&self) -> Vec<UserRecord> {
        self.inner.lock().await.cache.records().to_vec()
    }

    pub async fn list_snapshot(&self) -> ListSnapshot {
        let guard = self.inner.lock().await;
        ListSnapshot {
            records: guard.cache.records().to_vec(),
            loading: guard.loading,
            error: guard.list_error.clone(),
        }
    }

    pub async fn draft(&self) -> Option<EditDraft> {
        self.inner.lock().await.draft.clone()
    }

    /// List view mount: enter the view, then load it.
    pub async fn mount_list(&self) -> SyncResult<()> {
        self.enter(View::List).await;
        self.refresh().await
    }

    /// Replaces the cache with the registry's full list.
    pub async fn refresh(&self) -> SyncResult<()> {
        let (request, generation) = {
            let mut guard = self.inner.lock().await;
            guard.list_requests += 1;
            guard.loading = true;
            (guard.list_requests, guard.generation)
        };

        let result = self.registry.list().await;

        let mut guard = self.inner.lock().await;
        if guard.list_requests != request {
            debug!(request, latest = guard.list_requests, "discarding superseded list response");
            return Ok(());
        }
        guard.loading = false;
        if guard.generation != generation {
            debug!(request, "discarding list response for a view that was left");
            return Ok(());
        }

        match result {
            Ok(records) => {
                guard.cache.replace_all(records);
                guard.list_error = None;
                let count = guard.cache.len();
                drop(guard);
                debug!(count, "record cache refreshed");
                self.publish(SyncEvent::RecordsChanged);
                Ok(())
            }
            Err(err) => {
                let message = failure_message(&err, messages::LIST_FAILED);
                guard.list_error = Some(message.clone());
                drop(guard);
                warn!("failed to refresh record cache: {err}");
                self.notify(NoticeLevel::Error, &message);
                Err(SyncError::registry(message, err))
            }
        }
    }

    /// Optimistic delete: commit on success, reconcile on failure.
    pub async fn remove(&self, id: UserId) -> SyncResult<RemoveOutcome> {
        if let Some(session) = self.sessions.load().await {
            if session.id == id {
                warn!(user_id = id.0, "refusing to delete the signed-in user");
                self.notify(NoticeLevel::Warning, messages::SELF_DELETION);
                return Err(SyncError::SelfDeletion);
            }
        }

        if !self.confirm.confirm(messages::DELETE_CONFIRMATION) {
            debug!(user_id = id.0, "delete declined at confirmation");
            return Ok(RemoveOutcome::Declined);
        }

        match self.registry.delete(id).await {
            Ok(()) => {
                let removed = self.inner.lock().await.cache.remove(id).is_some();
                info!(user_id = id.0, removed, "registry record deleted");
                self.publish(SyncEvent::RecordsChanged);
                self.notify(NoticeLevel::Success, messages::DELETE_SUCCEEDED);
                Ok(RemoveOutcome::Removed)
            }
            Err(err) => {
                let message = delete_failure_message(&err);
                warn!(user_id = id.0, "delete failed, reconciling with registry: {err}");
                self.notify(NoticeLevel::Error, &message);
                // The refresh reports its own failure.
                let _ = self.refresh().await;
                Err(SyncError::registry(message, err))
            }
        }
    }

    /// Edit view mount: load the record into a fresh draft.
    pub async fn begin_edit(&self, id: UserId) -> SyncResult<EditDraft> {
        let generation = self.enter(View::Edit(id)).await;

        match self.registry.get(id).await {
            Ok(record) => {
                let draft = EditDraft {
                    id,
                    fields: RecordUpdate::from(&record),
                };
                let mut guard = self.inner.lock().await;
                if guard.generation == generation {
                    guard.draft = Some(draft.clone());
                } else {
                    debug!(user_id = id.0, "discarding record for an edit view that was left");
                }
                Ok(draft)
            }
            Err(err) => {
                let message = failure_message(&err, messages::RECORD_NOT_FOUND);
                warn!(user_id = id.0, "failed to load record for editing: {err}");
                self.notify(NoticeLevel::Error, &message);
                self.schedule_navigation(generation, Route::Home, Duration::ZERO)
                    .await;
                Err(SyncError::registry(message, err))
            }
        }
    }

    pub async fn edit_draft<F>(&self, edit: F) -> SyncResult<EditDraft>
    where
        F: FnOnce(&mut RecordUpdate) + Send,
    {
        let mut guard = self.inner.lock().await;
        let draft = guard.draft.as_mut().ok_or(SyncError::MissingDraft)?;
        edit(&mut draft.fields);
        Ok(draft.clone())
    }

    /// Sends the loaded draft as the record's full new state.
    pub async fn submit_edit(&self) -> SyncResult<()> {
        let (draft, generation) = {
            let guard = self.inner.lock().await;
            (guard.draft.clone(), guard.generation)
        };
        let draft = draft.ok_or(SyncError::MissingDraft)?;
        self.send_update(draft.id, &draft.fields, generation).await
    }

    /// Stores `payload` as the draft for `id` and submits it.
    pub async fn update(&self, id: UserId, payload: RecordUpdate) -> SyncResult<()> {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.draft = Some(EditDraft {
                id,
                fields: payload.clone(),
            });
            guard.generation
        };
        self.send_update(id, &payload, generation).await
    }

    async fn send_update(
        &self,
        id: UserId,
        payload: &RecordUpdate,
        generation: u64,
    ) -> SyncResult<()> {
        match self.registry.update(id, payload).await {
            Ok(()) => {
                info!(user_id = id.0, "registry record updated");
                self.notify(NoticeLevel::Success, messages::UPDATE_SUCCEEDED);
                self.schedule_navigation(generation, Route::Home, self.timings.update_redirect)
                    .await;
                Ok(())
            }
            Err(err) => {
                let message = failure_message(&err, messages::UPDATE_FAILED);
                warn!(user_id = id.0, "update failed: {err}");
                self.notify(NoticeLevel::Error, &message);
                Err(SyncError::registry(message, err))
            }
        }
    }

    /// Registration. Never signs the new user in.
    pub async fn create(&self, payload: Registration) -> SyncResult<Option<UserId>> {
        let generation = self.inner.lock().await.generation;

        match self.registry.create(&payload).await {
            Ok(response) => {
                let created = response.created_id();
                info!(user_id = created.map(|id| id.0), "registered new user");
                self.notify(NoticeLevel::Success, messages::REGISTER_SUCCEEDED);
                self.schedule_navigation(generation, Route::Login, self.timings.register_redirect)
                    .await;
                Ok(created)
            }
            Err(err) => {
                let message = failure_message(&err, messages::REGISTER_FAILED);
                warn!("registration failed: {err}");
                self.notify(NoticeLevel::Error, &message);
                Err(SyncError::registry(message, err))
            }
        }
    }

    /// Login. Persists the returned identity before announcing it.
    pub async fn authenticate(&self, email: &str, password: &str) -> SyncResult<Session> {
        let generation = self.inner.lock().await.generation;
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        let LoginResponse { usuario } = match self.registry.login(&credentials).await {
            Ok(response) => response,
            Err(err) => {
                let message = failure_message(&err, messages::INVALID_CREDENTIALS);
                warn!("login failed: {err}");
                self.notify(NoticeLevel::Error, &message);
                return Err(SyncError::registry(message, err));
            }
        };

        if let Err(err) = self.sessions.set(&usuario).await {
            error!("failed to persist session: {err:#}");
            self.notify(NoticeLevel::Error, messages::SESSION_SAVE_FAILED);
            return Err(SyncError::SessionPersistence(err));
        }

        info!(user_id = usuario.id.0, "operator signed in");
        self.publish(SyncEvent::SessionChanged(Some(usuario.clone())));
        self.notify(NoticeLevel::Success, messages::LOGIN_SUCCEEDED);
        self.schedule_navigation(generation, Route::Home, self.timings.login_redirect)
            .await;
        Ok(usuario)
    }

    pub async fn logout(&self) -> SyncResult<()> {
        if let Err(err) = self.sessions.clear().await {
            error!("failed to clear session: {err:#}");
            self.notify(NoticeLevel::Error, messages::SESSION_CLEAR_FAILED);
            return Err(SyncError::SessionPersistence(err));
        }

        info!("operator signed out");
        self.publish(SyncEvent::SessionChanged(None));
        self.notify(NoticeLevel::Info, messages::LOGGED_OUT);
        self.publish(SyncEvent::NavigationScheduled {
            to: Route::Login,
            delay: Duration::ZERO,
        });
        Ok(())
    }

    async fn schedule_navigation(&self, generation: u64, to: Route, delay: Duration) {
        let current = self.inner.lock().await.generation;
        if current != generation {
            debug!(%to, "skipping navigation requested by a view that was left");
            return;
        }
        self.publish(SyncEvent::NavigationScheduled { to, delay });
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.publish(SyncEvent::Notice(Notice {
            level,
            message: message.to_string(),
        }));
    }

    fn publish(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

/// Transport failures get the fixed connection message; registry rejections
/// use the server's message when it sent one.
fn failure_message(err: &RegistryClientError, fallback: &str) -> String {
    if err.is_network() {
        return messages::CONNECTION_FAILED.to_string();
    }
    err.server_message().unwrap_or(fallback).to_string()
}

fn delete_failure_message(err: &RegistryClientError) -> String {
    if err.is_foreign_key_constraint() {
        messages::DELETE_BLOCKED_BY_DEPENDENTS.to_string()
    } else {
        err.server_message()
            .unwrap_or(messages::DELETE_FAILED)
            .to_string()
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
