//! View Renderers
//!
//! Each view fetches through the gateway and returns a display model.
//! Rendering to text or JSON is left to the caller.
//!
//! - **auth**: sign-in / sign-up forms
//! - **dashboard**: ride counters and live helmet status
//! - **reports**: summary, attempt distribution, rides over time
//! - **admin**: fleet management and remote commands
//! - **display**: shared display building blocks

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod display;
pub mod reports;

use serde::Serialize;
use std::fmt;

pub use admin::{AdminScreen, AdminView, BikeForm, MutationOutcome, PairingForm};
pub use auth::{AuthView, LoginForm, RegisterForm};
pub use dashboard::{DashboardScreen, DashboardView};
pub use display::Notice;
pub use reports::{ReportsScreen, ReportsView};

/// What the router hands back after a navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "screen", rename_all = "snake_case")]
pub enum Screen {
    Dashboard(DashboardScreen),
    Reports(ReportsScreen),
    Admin(AdminScreen),
    /// Admin view requested without the admin role
    AccessDenied(Notice),
    /// The session is gone; the user has to sign in again
    Login,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Dashboard(screen) => write!(f, "{}", screen),
            Screen::Reports(screen) => write!(f, "{}", screen),
            Screen::Admin(screen) => write!(f, "{}", screen),
            Screen::AccessDenied(notice) => writeln!(f, "{}", notice),
            Screen::Login => writeln!(f, "Please sign in to continue."),
        }
    }
}
