//! View Router
//!
//! Records the active view, keeps the navigation menu in sync, drops the
//! previous view's realtime listeners and runs the matching loader.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::realtime::RealtimeChannel;
use crate::session::{Role, SessionStore};
use crate::state::{View, ViewState};
use crate::views::{AdminView, DashboardView, Notice, ReportsView, Screen};

struct MenuEntry {
    view: View,
    label: &'static str,
    roles: &'static [Role],
}

const MENU: [MenuEntry; 3] = [
    MenuEntry {
        view: View::Dashboard,
        label: "Dashboard",
        roles: &[Role::Rider, Role::Admin],
    },
    MenuEntry {
        view: View::Reports,
        label: "Reports",
        roles: &[Role::Rider, Role::Admin],
    },
    MenuEntry {
        view: View::Admin,
        label: "Admin Panel",
        roles: &[Role::Admin],
    },
];

/// One entry of the navigation menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub id: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Menu entries visible to `role`, with `active` marked
pub fn menu_for(role: Option<Role>, active: View) -> Vec<NavItem> {
    MENU.iter()
        .filter(|entry| role.is_some_and(|r| entry.roles.contains(&r)))
        .map(|entry| NavItem {
            id: entry.view.id(),
            label: entry.label,
            active: entry.view == active,
        })
        .collect()
}

pub struct ViewRouter {
    session: Arc<SessionStore>,
    view_state: Arc<ViewState>,
    realtime: Arc<RealtimeChannel>,
    dashboard: DashboardView,
    reports: ReportsView,
    admin: AdminView,
    menu: RwLock<Vec<NavItem>>,
}

impl ViewRouter {
    pub fn new(
        session: Arc<SessionStore>,
        view_state: Arc<ViewState>,
        realtime: Arc<RealtimeChannel>,
        dashboard: DashboardView,
        reports: ReportsView,
        admin: AdminView,
    ) -> Self {
        Self {
            session,
            view_state,
            realtime,
            dashboard,
            reports,
            admin,
            menu: RwLock::new(Vec::new()),
        }
    }

    /// Build the menu for the signed-in role with the dashboard active
    pub fn setup_navigation(&self) -> Vec<NavItem> {
        let menu = menu_for(self.session.role(), View::Dashboard);
        *self.menu.write() = menu.clone();
        menu
    }

    pub fn nav_menu(&self) -> Vec<NavItem> {
        self.menu.read().clone()
    }

    pub fn dashboard(&self) -> &DashboardView {
        &self.dashboard
    }

    pub fn admin(&self) -> &AdminView {
        &self.admin
    }

    /// Show the view named `view_id`. Unknown ids show the dashboard.
    pub async fn navigate(&self, view_id: &str) -> Screen {
        let view = match View::parse(view_id) {
            Some(view @ (View::Dashboard | View::Reports | View::Admin)) => view,
            _ => {
                tracing::debug!(view_id, "Unknown view, showing dashboard");
                View::Dashboard
            }
        };

        self.view_state.set_active_view(view);
        for item in self.menu.write().iter_mut() {
            item.active = item.id == view.id();
        }
        self.realtime.clear_listeners();
        if view != View::Dashboard {
            self.dashboard.stop();
        }
        tracing::debug!(view = %view, "Navigating");

        let screen = match view {
            View::Admin => {
                if self.session.role() != Some(Role::Admin) {
                    tracing::warn!(role = ?self.session.role(), "Admin view denied");
                    return Screen::AccessDenied(Notice::error(
                        "Admin access required to view this page",
                    ));
                }
                Screen::Admin(self.admin.load().await)
            }
            View::Reports => Screen::Reports(self.reports.load().await),
            _ => Screen::Dashboard(self.dashboard.load().await),
        };

        // A 401 during loading sends the user back to sign in
        if self.view_state.active_view() == View::Login {
            self.dashboard.stop();
            self.realtime.clear_listeners();
            return Screen::Login;
        }
        screen
    }

    /// Stop background work of the current view
    pub fn stop(&self) {
        self.dashboard.stop();
        self.realtime.clear_listeners();
    }
}
