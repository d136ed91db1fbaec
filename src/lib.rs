//! # Smart Helmet
//!
//! Fleet console for the Smart Helmet Safety System: bikes, helmets,
//! riders and safety alerts.
//!
//! ## Features
//!
//! - **Session**: bearer token and profile kept in durable slots
//! - **Fleet API**: typed client for auth, analytics, bikes, users, alerts
//!   and remote ignition control
//! - **Realtime**: WebSocket channel for live helmet status and alerts
//! - **Views**: dashboard, reports and admin panel rendered as display models
//!
//! ## Modules
//!
//! - [`session`]: `SessionStore` and its storage slots
//! - [`api`]: `ApiGateway` over the fleet REST API
//! - [`realtime`]: `RealtimeChannel` with typed listeners
//! - [`router`]: `ViewRouter` and the role-filtered menu
//! - [`views`]: per-view loaders and display models
//! - [`app`]: the application shell tying it together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smarthelmet::{App, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::from_config(Config::load_default())?;
//!
//!     let screen = app.login("alice", "secret").await?;
//!     println!("{}", screen);
//!
//!     let reports = app.router().navigate("reports").await;
//!     println!("{}", reports);
//!
//!     app.logout();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod realtime;
pub mod router;
pub mod session;
pub mod state;
pub mod views;

#[cfg(test)]
mod testing;

pub use api::{AlertFilter, ApiError, ApiGateway, ApiResult, ErrorKind};

pub use app::{App, AppError};

pub use config::{Config, ConfigError, LoggingConfig};

pub use realtime::{
    AlertEvent, ConnectionState, RealtimeChannel, RealtimeError, ServerEvent, StatusEvent,
};

pub use router::{NavItem, ViewRouter};

pub use session::{
    FileSlotStorage, MemorySlotStorage, Role, Session, SessionStore, SlotStorage, UserProfile,
};

pub use state::{AdminTab, View, ViewState};

pub use views::Screen;
