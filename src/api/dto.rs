//! Data Transfer Objects
//!
//! Request and response types for the fleet API endpoints.
//! Field names follow the server's camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::session::UserProfile;

// ============================================
// AUTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful sign-in
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Account created by `/api/auth/register`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user: Option<RegisteredUser>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================
// ANALYTICS DTOs
// ============================================

/// Ride and attempt counters for one bike (or the whole fleet)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub total_rides: u64,
    pub successful_rides: u64,
    pub helmet_attempts: u64,
    pub alcohol_attempts: u64,
    pub helmet_violations: u64,
    pub alcohol_detections: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardEnvelope {
    #[serde(default)]
    pub summary: DashboardSummary,
}

/// Fleet-wide bike list with per-bike stats
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FleetOverview {
    pub total_bikes: u64,
    pub active_bikes: u64,
    pub bikes: Vec<BikeRecord>,
}

impl FleetOverview {
    /// Unresolved alerts summed over every bike
    pub fn active_alerts(&self) -> u64 {
        self.bikes.iter().map(|b| b.stats.active_alerts).sum()
    }
}

/// One ride in the time series
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RidePoint {
    pub date: String,
    #[serde(default)]
    pub helmet_worn: bool,
    #[serde(default)]
    pub alcohol_detected: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimeseriesEnvelope {
    #[serde(default)]
    pub timeseries: Vec<RidePoint>,
}

// ============================================
// BIKE DTOs
// ============================================

/// Per-bike ride statistics
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BikeStats {
    pub total_rides: u64,
    pub successful_rides: u64,
    pub success_rate: f64,
    pub active_alerts: u64,
}

/// Bike owner, populated by the server or left as a raw id
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Owner {
    Populated {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
    Id(String),
}

impl Owner {
    pub fn username(&self) -> Option<&str> {
        match self {
            Owner::Populated { username, .. } => username.as_deref(),
            Owner::Id(_) => None,
        }
    }
}

/// A bike as the server reports it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeRecord {
    pub bike_id: String,
    #[serde(default)]
    pub bike_name: Option<String>,
    #[serde(default)]
    pub bike_model: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    /// `None` while no helmet is paired
    #[serde(default)]
    pub helmet_id: Option<String>,
    #[serde(default, rename = "ownerId")]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub ignition_blocked: bool,
    #[serde(default)]
    pub stats: BikeStats,
}

impl BikeRecord {
    /// Name if set, id otherwise
    pub fn display_name(&self) -> &str {
        self.bike_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.bike_id)
    }

    pub fn paired_helmet(&self) -> Option<&str> {
        self.helmet_id.as_deref().filter(|h| !h.is_empty())
    }
}

/// Fields of the "Add New Bike" form
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBike {
    pub bike_id: String,
    #[serde(default)]
    pub bike_name: String,
    #[serde(default)]
    pub bike_model: String,
    #[serde(default)]
    pub registration_number: String,
}

// ============================================
// ADMIN DTOs
// ============================================

#[derive(Debug, Serialize)]
pub(crate) struct IgnitionRequest {
    pub block: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnitionResponse {
    #[serde(default)]
    pub bike_id: String,
    #[serde(default)]
    pub ignition_blocked: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PairRequest<'a> {
    pub bike_id: &'a str,
    pub helmet_id: &'a str,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResponse {
    #[serde(default)]
    pub bike_id: String,
    #[serde(default)]
    pub helmet_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================
// USER DTOs
// ============================================

/// A registered user as listed for admins
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
    /// Server timestamp, RFC 3339 or RFC 2822
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_role() -> String {
    "rider".to_string()
}

// ============================================
// ALERT DTOs
// ============================================

/// A stored safety alert
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub bike_id: Option<String>,
    #[serde(rename = "type", default)]
    pub alert_type: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

/// Query parameters for `GET /api/alerts`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub bike_id: Option<String>,
    pub limit: Option<u32>,
    /// Additional raw parameters, passed through unchanged
    pub extra: Vec<(String, String)>,
}

impl AlertFilter {
    pub fn for_bike(bike_id: impl Into<String>) -> Self {
        Self {
            bike_id: Some(bike_id.into()),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Percent-encoded query string, without the leading `?`
    pub fn to_query(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(bike_id) = &self.bike_id {
            pairs.push(("bikeId".to_string(), bike_id.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs.extend(self.extra.iter().cloned());

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bike_record_from_fleet_json() {
        let json = r#"{
            "_id": "65a",
            "bikeId": "BIKE123",
            "bikeName": "Red Scooter",
            "helmetId": null,
            "ownerId": {"username": "alice"},
            "isActive": true,
            "ignitionBlocked": false,
            "stats": {"totalRides": 10, "successfulRides": 8, "successRate": 80.0, "activeAlerts": 2}
        }"#;
        let bike: BikeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(bike.display_name(), "Red Scooter");
        assert_eq!(bike.paired_helmet(), None);
        assert_eq!(bike.owner.as_ref().and_then(Owner::username), Some("alice"));
        assert_eq!(bike.stats.success_rate, 80.0);
    }

    #[test]
    fn test_bike_record_minimal() {
        let bike: BikeRecord =
            serde_json::from_str(r#"{"bikeId": "B2", "bikeName": "", "ownerId": "u9"}"#).unwrap();
        assert_eq!(bike.display_name(), "B2");
        assert_eq!(bike.owner, Some(Owner::Id("u9".to_string())));
        assert!(!bike.is_active);
        assert_eq!(bike.stats, BikeStats::default());
    }

    #[test]
    fn test_new_bike_serializes_camel_case() {
        let bike = NewBike {
            bike_id: "B7".to_string(),
            registration_number: "KA-01".to_string(),
            ..NewBike::default()
        };
        let json = serde_json::to_value(&bike).unwrap();
        assert_eq!(json["bikeId"], "B7");
        assert_eq!(json["registrationNumber"], "KA-01");
    }

    #[test]
    fn test_alert_filter_query() {
        let filter = AlertFilter::for_bike("BIKE 1").limit(20).param("type", "alcohol&helmet");
        assert_eq!(
            filter.to_query(),
            "bikeId=BIKE%201&limit=20&type=alcohol%26helmet"
        );
        assert_eq!(AlertFilter::default().to_query(), "");
    }

    #[test]
    fn test_fleet_active_alerts() {
        let fleet: FleetOverview = serde_json::from_str(
            r#"{"totalBikes": 2, "activeBikes": 1, "bikes": [
                {"bikeId": "A", "stats": {"activeAlerts": 2}},
                {"bikeId": "B", "stats": {"activeAlerts": 3}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(fleet.active_alerts(), 5);
    }
}
