//! Application Shell
//!
//! Owns one of each component and drives the console lifecycle:
//! restore session, sign in, show the app, sign out.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::api::ApiGateway;
use crate::config::Config;
use crate::realtime::RealtimeChannel;
use crate::router::ViewRouter;
use crate::session::{FileSlotStorage, SessionStorageError, SessionStore, SlotStorage};
use crate::state::{View, ViewState};
use crate::views::{
    AdminView, AuthView, DashboardView, LoginForm, RegisterForm, ReportsView, Screen,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to set up HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to store session: {0}")]
    Session(#[from] SessionStorageError),

    /// Form was rejected; the message is meant for the user
    #[error("{0}")]
    Rejected(String),
}

pub struct App {
    config: Config,
    session: Arc<SessionStore>,
    view_state: Arc<ViewState>,
    gateway: Arc<ApiGateway>,
    realtime: Arc<RealtimeChannel>,
    auth: AuthView,
    router: ViewRouter,
}

impl App {
    pub fn new(config: Config, storage: impl SlotStorage + 'static) -> Result<Self, AppError> {
        let session = Arc::new(SessionStore::new(storage));
        let view_state = Arc::new(ViewState::new());
        let realtime = Arc::new(RealtimeChannel::new(config.realtime.url.clone()));
        let gateway = Arc::new(ApiGateway::new(
            &config.api,
            config.dashboard.bike_id.clone(),
            Arc::clone(&session),
            Arc::clone(&view_state),
        )?);

        let router = ViewRouter::new(
            Arc::clone(&session),
            Arc::clone(&view_state),
            Arc::clone(&realtime),
            DashboardView::new(
                Arc::clone(&gateway),
                Arc::clone(&realtime),
                config.dashboard.clone(),
            ),
            ReportsView::new(Arc::clone(&gateway), config.dashboard.bike_id.clone()),
            AdminView::new(Arc::clone(&gateway), Arc::clone(&view_state)),
        );

        Ok(Self {
            auth: AuthView::new(Arc::clone(&gateway)),
            config,
            session,
            view_state,
            gateway,
            realtime,
            router,
        })
    }

    /// Build an app whose session lives in `config.session.dir`
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let dir = PathBuf::from(&config.session.dir);
        Self::new(config, FileSlotStorage::new(dir))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub fn realtime(&self) -> &RealtimeChannel {
        &self.realtime
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    /// Load the persisted session without showing anything
    pub fn restore_session(&self) -> bool {
        self.session.init()
    }

    /// Start-up: show the app for a restored session, the sign-in form
    /// otherwise
    pub async fn start(&self) -> Screen {
        if self.restore_session() {
            self.show_app().await
        } else {
            self.show_login()
        }
    }

    pub fn show_login(&self) -> Screen {
        self.view_state.set_active_view(View::Login);
        Screen::Login
    }

    /// Connect realtime, subscribe the configured bike, build the menu and
    /// open the dashboard. A realtime failure is logged and does not stop
    /// the app.
    pub async fn show_app(&self) -> Screen {
        if self.config.realtime.enabled {
            match self.realtime.connect().await {
                Ok(()) => {
                    self.realtime.subscribe(&self.config.dashboard.bike_id);
                }
                Err(e) => tracing::warn!(error = %e, "Realtime updates unavailable"),
            }
        }

        self.router.setup_navigation();
        self.router.navigate(View::Dashboard.id()).await
    }

    /// Sign in, store the session and show the app
    pub async fn login(&self, username: &str, password: &str) -> Result<Screen, AppError> {
        self.show_login();

        let mut form = LoginForm::new(username, password);
        let Some(login) = self.auth.sign_in(&mut form).await else {
            let message = form
                .error
                .unwrap_or_else(|| "Login failed. Please check your credentials.".to_string());
            return Err(AppError::Rejected(message));
        };

        self.session.save(&login.token, login.user)?;
        Ok(self.show_app().await)
    }

    /// Create an account. Returns the success message; does not sign in.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<String, AppError> {
        let mut form = RegisterForm::new(username, password, confirm_password);
        let mut login = LoginForm::default();

        if self.auth.sign_up(&mut form, &mut login).await {
            Ok(form.success.unwrap_or_default())
        } else {
            Err(AppError::Rejected(form.error.unwrap_or_default()))
        }
    }

    /// Forget the session, close realtime and return to the landing view
    pub fn logout(&self) {
        self.session.clear();
        self.router.stop();
        self.realtime.disconnect();
        self.view_state.reset();
        tracing::info!("Signed out");
    }
}
