//! Fleet API Gateway
//!
//! Client side of the fleet REST API.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/auth/login`
//! - `POST /api/auth/register`
//!
//! ## Analytics
//! - `GET /api/analytics/dashboard?bikeId=`
//! - `GET /api/analytics/fleet`
//! - `GET /api/analytics/timeseries?bikeId=&days=`
//!
//! ## Bikes & Users
//! - `GET /api/bikes`, `POST /api/bikes`
//! - `GET /api/users`
//!
//! ## Admin
//! - `POST /api/admin/bike/{bikeId}/ignition`
//! - `POST /api/admin/pair`
//!
//! ## Alerts
//! - `GET /api/alerts?{query}`
//!
//! # Response handling
//!
//! 1. HTML content type → `server_unreachable`
//! 2. 401 → session cleared, view forced to login → `session_expired`
//! 3. Undecodable body → `malformed_response`
//! 4. Other non-2xx → `request_failed`
//! 5. Otherwise the decoded payload

mod client;
pub mod dto;
mod error;

pub use client::ApiGateway;
pub use dto::{
    AlertFilter, AlertRecord, BikeRecord, BikeStats, DashboardSummary, FleetOverview,
    IgnitionResponse, LoginResponse, NewBike, Owner, PairResponse, RegisterResponse,
    RegisteredUser, RidePoint, UserRecord,
};
pub use error::{ApiError, ApiResult, ErrorKind};
