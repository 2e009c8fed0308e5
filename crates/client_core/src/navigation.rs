//! Session-gated navigation.

use std::fmt;

use shared::domain::{Session, UserId};

use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Edit(UserId),
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            "" | "/" => Some(Self::Home),
            "/login" => Some(Self::Login),
            "/registro" => Some(Self::Register),
            other => other
                .strip_prefix("/editar/")
                .and_then(|id| id.parse::<i64>().ok())
                .map(|id| Self::Edit(UserId(id))),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Register => "/registro".to_string(),
            Self::Edit(id) => format!("/editar/{}", id.0),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavItem {
    Home,
    Logout,
    Login,
    Register,
}

impl NavItem {
    /// `None` for logout, which is an action rather than a destination.
    pub fn route(&self) -> Option<Route> {
        match self {
            Self::Home => Some(Route::Home),
            Self::Login => Some(Route::Login),
            Self::Register => Some(Route::Register),
            Self::Logout => None,
        }
    }
}

const AUTHENTICATED_ITEMS: &[NavItem] = &[NavItem::Home, NavItem::Logout];
const ANONYMOUS_ITEMS: &[NavItem] = &[NavItem::Login, NavItem::Register];

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticated(Session),
}

/// Two-state guard: anonymous until a login succeeds, authenticated until
/// the operator logs out.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationGuard {
    state: AuthState,
}

impl NavigationGuard {
    pub fn anonymous() -> Self {
        Self {
            state: AuthState::Anonymous,
        }
    }

    pub fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(session) => Self {
                state: AuthState::Authenticated(session),
            },
            None => Self::anonymous(),
        }
    }

    pub async fn load(store: &dyn SessionStore) -> Self {
        Self::from_session(store.load().await)
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            AuthState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn visible_items(&self) -> &'static [NavItem] {
        if self.is_authenticated() {
            AUTHENTICATED_ITEMS
        } else {
            ANONYMOUS_ITEMS
        }
    }

    pub fn is_visible(&self, item: NavItem) -> bool {
        self.visible_items().contains(&item)
    }

    /// Every route can be entered directly, including any record's edit view.
    pub fn can_enter(&self, _route: Route) -> bool {
        true
    }

    pub fn authenticate(&mut self, session: Session) {
        self.state = AuthState::Authenticated(session);
    }

    pub fn logout(&mut self) {
        self.state = AuthState::Anonymous;
    }

    /// Follows a session change published by the controller.
    pub fn apply(&mut self, session: Option<Session>) {
        match session {
            Some(session) => self.authenticate(session),
            None => self.logout(),
        }
    }
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
