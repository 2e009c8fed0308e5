pub mod cache;
pub mod controller;
pub mod error;
pub mod messages;
pub mod navigation;
pub mod registry;
pub mod session;

pub use cache::RecordCache;
pub use controller::{
    AlwaysConfirm, Confirm, EditDraft, ListSnapshot, Notice, NoticeLevel, RemoveOutcome,
    SyncController, SyncEvent, SyncResult, SyncTimings, View,
};
pub use error::{RegistryClientError, SyncError};
pub use navigation::{AuthState, NavItem, NavigationGuard, Route};
pub use registry::{HttpRegistryClient, RegistryApi, RegistryResult};
pub use session::{DurableSessionStore, MemorySessionStore, SessionStore, SESSION_ENTRY_KEY};
