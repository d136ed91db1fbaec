//! Fleet API Gateway
//!
//! HTTP client for the fleet REST API. Every operation attaches the
//! session headers, interprets the response the same way and returns an
//! `ApiResult`; transport and decoding failures never escape as panics.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::dto::{
    AlertFilter, AlertRecord, BikeRecord, Credentials, DashboardEnvelope, DashboardSummary,
    FleetOverview, IgnitionRequest, IgnitionResponse, LoginResponse, NewBike, PairRequest,
    PairResponse, RegisterResponse, RidePoint, TimeseriesEnvelope, UserRecord,
};
use super::error::{ApiError, ApiResult};
use crate::config::ApiConfig;
use crate::session::SessionStore;
use crate::state::ViewState;

/// Gateway to the remote fleet service
pub struct ApiGateway {
    client: Client,
    base_url: String,
    default_bike_id: String,
    session: Arc<SessionStore>,
    view_state: Arc<ViewState>,
}

impl ApiGateway {
    /// Create a gateway.
    ///
    /// `default_bike_id` is used by the analytics calls when no bike is
    /// given.
    pub fn new(
        config: &ApiConfig,
        default_bike_id: impl Into<String>,
        session: Arc<SessionStore>,
        view_state: Arc<ViewState>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_bike_id: default_bike_id.into(),
            session,
            view_state,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_bike_id(&self) -> &str {
        &self.default_bike_id
    }

    // ============ Authentication ============

    /// Sign in. The caller stores the returned session.
    pub async fn authenticate(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&Credentials { username, password });
        self.send(request, "POST", "/api/auth/login").await
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, username: &str, password: &str) -> ApiResult<RegisterResponse> {
        let request = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&Credentials { username, password });
        self.send(request, "POST", "/api/auth/register").await
    }

    // ============ Analytics ============

    /// Ride counters for a bike (the configured bike when `None`)
    pub async fn fetch_dashboard_summary(
        &self,
        bike_id: Option<&str>,
    ) -> ApiResult<DashboardSummary> {
        let bike_id = bike_id.unwrap_or(&self.default_bike_id);
        let path = format!(
            "/api/analytics/dashboard?bikeId={}",
            urlencoding::encode(bike_id)
        );
        let envelope: DashboardEnvelope = self.get(&path).await?;
        Ok(envelope.summary)
    }

    pub async fn fetch_fleet_overview(&self) -> ApiResult<FleetOverview> {
        self.get("/api/analytics/fleet").await
    }

    /// Rides of the last `days` days, oldest first
    pub async fn fetch_timeseries(
        &self,
        bike_id: Option<&str>,
        days: u32,
    ) -> ApiResult<Vec<RidePoint>> {
        let bike_id = bike_id.unwrap_or(&self.default_bike_id);
        let path = format!(
            "/api/analytics/timeseries?bikeId={}&days={}",
            urlencoding::encode(bike_id),
            days
        );
        let envelope: TimeseriesEnvelope = self.get(&path).await?;
        Ok(envelope.timeseries)
    }

    // ============ Bikes & Users ============

    pub async fn list_bikes(&self) -> ApiResult<Vec<BikeRecord>> {
        self.get("/api/bikes").await
    }

    pub async fn create_bike(&self, bike: &NewBike) -> ApiResult<BikeRecord> {
        self.post("/api/bikes", bike).await
    }

    pub async fn list_users(&self) -> ApiResult<Vec<UserRecord>> {
        self.get("/api/users").await
    }

    // ============ Admin Commands ============

    pub async fn set_ignition_block(
        &self,
        bike_id: &str,
        blocked: bool,
    ) -> ApiResult<IgnitionResponse> {
        let path = format!("/api/admin/bike/{}/ignition", urlencoding::encode(bike_id));
        self.post(&path, &IgnitionRequest { block: blocked }).await
    }

    pub async fn pair_helmet(&self, bike_id: &str, helmet_id: &str) -> ApiResult<PairResponse> {
        self.post("/api/admin/pair", &PairRequest { bike_id, helmet_id })
            .await
    }

    // ============ Alerts ============

    pub async fn list_alerts(&self, filter: &AlertFilter) -> ApiResult<Vec<AlertRecord>> {
        let path = format!("/api/alerts?{}", filter.to_query());
        self.get(&path).await
    }

    // ============ Plumbing ============

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self
            .client
            .get(self.url(path))
            .headers(self.session.auth_headers());
        self.send(request, "GET", path).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let request = self
            .client
            .post(self.url(path))
            .headers(self.session.auth_headers())
            .json(body);
        self.send(request, "POST", path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> ApiResult<T> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(method, path, error = %e, "Request could not be sent");
                return Err(ApiError::from(e));
            }
        };

        let status = response.status();
        tracing::debug!(method, path, status = status.as_u16(), "Response received");

        let result = self.interpret(response).await;
        if let Err(e) = &result {
            tracing::warn!(
                method,
                path,
                status = status.as_u16(),
                kind = %e.kind,
                "API call failed: {}",
                e.message
            );
        }
        result
    }

    /// Turn a raw response into a typed payload or an `ApiError`
    async fn interpret<T: DeserializeOwned>(&self, response: Response) -> ApiResult<T> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if let Some(err) = markup_error(status, &content_type) {
            return Err(err);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session();
            return Err(ApiError::session_expired());
        }

        let body = response.bytes().await.map_err(ApiError::from)?;
        let value = decode_body(status, &body)?;

        serde_json::from_value(value).map_err(|e| {
            tracing::debug!(error = %e, "Payload does not match the expected shape");
            ApiError::malformed_response().with_status(status.as_u16())
        })
    }

    fn expire_session(&self) {
        self.session.clear();
        if self.view_state.force_login() {
            tracing::info!("Session expired, returning to login");
        } else {
            tracing::debug!("Session rejected while on an auth view");
        }
    }
}

/// HTML instead of JSON means a misbehaving server or proxy
fn markup_error(status: StatusCode, content_type: &str) -> Option<ApiError> {
    if !content_type.contains("text/html") {
        return None;
    }

    let mut message =
        "Server returned an HTML page. The server might be down or misconfigured.".to_string();
    if let Some(reason) = status.canonical_reason() {
        message.push_str(&format!(" Status: {} {}", status.as_u16(), reason));
    }
    Some(ApiError::server_unreachable(message).with_status(status.as_u16()))
}

/// Decode JSON, then reject non-success statuses
fn decode_body(status: StatusCode, body: &[u8]) -> ApiResult<Value> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::malformed_response().with_status(status.as_u16()))?;

    if !status.is_success() {
        let code = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| code.clone())
            .unwrap_or_else(|| format!("Server returned status {}", status.as_u16()));

        return Err(ApiError::request_failed(status.as_u16(), message).with_code(code));
    }

    Ok(value)
}
