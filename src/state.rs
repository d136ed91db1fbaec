//! View State
//!
//! Process-wide record of the active top-level view and admin tab.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;

/// Top-level screens of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Landing,
    Login,
    Dashboard,
    Reports,
    Admin,
}

impl View {
    pub fn id(&self) -> &'static str {
        match self {
            View::Landing => "landing",
            View::Login => "login",
            View::Dashboard => "dashboard",
            View::Reports => "reports",
            View::Admin => "admin",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "landing" => Some(View::Landing),
            "login" => Some(View::Login),
            "dashboard" => Some(View::Dashboard),
            "reports" => Some(View::Reports),
            "admin" => Some(View::Admin),
            _ => None,
        }
    }

    /// Landing and login are reachable without a session
    pub fn is_auth(&self) -> bool {
        matches!(self, View::Landing | View::Login)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Tabs of the admin panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminTab {
    #[default]
    Fleet,
    Bikes,
    Users,
    Alerts,
    Controls,
}

impl AdminTab {
    pub const ALL: [AdminTab; 5] = [
        AdminTab::Fleet,
        AdminTab::Bikes,
        AdminTab::Users,
        AdminTab::Alerts,
        AdminTab::Controls,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AdminTab::Fleet => "fleet",
            AdminTab::Bikes => "bikes",
            AdminTab::Users => "users",
            AdminTab::Alerts => "alerts",
            AdminTab::Controls => "controls",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminTab::Fleet => "Fleet Overview",
            AdminTab::Bikes => "Bike Management",
            AdminTab::Users => "User Management",
            AdminTab::Alerts => "Alert Management",
            AdminTab::Controls => "Remote Controls",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.id() == id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    active_view: View,
    active_admin_tab: AdminTab,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            active_view: View::Landing,
            active_admin_tab: AdminTab::default(),
        }
    }
}

/// Shared, lock-protected view state
#[derive(Debug, Default)]
pub struct ViewState {
    inner: RwLock<Snapshot>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_view(&self) -> View {
        self.inner.read().active_view
    }

    pub fn set_active_view(&self, view: View) {
        self.inner.write().active_view = view;
    }

    pub fn active_admin_tab(&self) -> AdminTab {
        self.inner.read().active_admin_tab
    }

    pub fn set_active_admin_tab(&self, tab: AdminTab) {
        self.inner.write().active_admin_tab = tab;
    }

    /// Send the user to the login view unless an auth view is already
    /// showing. Returns true when the view changed.
    pub fn force_login(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.active_view.is_auth() {
            return false;
        }
        inner.active_view = View::Login;
        true
    }

    pub fn reset(&self) {
        *self.inner.write() = Snapshot::default();
    }
}
