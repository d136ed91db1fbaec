//! Reports View
//!
//! Summary statistics, the ignition attempt distribution and daily ride
//! counts for the configured bike.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::display::{EmptyState, StatCard, Tone};
use crate::api::{ApiGateway, DashboardSummary, RidePoint};

/// Days of history requested for "Rides Over Time"
pub const REPORT_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: u64,
    pub tone: Tone,
}

/// Rides grouped by calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRides {
    pub date: String,
    pub rides: u32,
    pub helmet_worn: u32,
    pub alcohol_detected: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RidesOverTime {
    Days(Vec<DailyRides>),
    Empty(EmptyState),
}

/// Rendered reports page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportsScreen {
    pub bike_id: String,
    /// `None` when the summary could not be loaded
    pub summary: Option<Vec<StatCard>>,
    pub chart: Vec<Bar>,
    pub rides_over_time: RidesOverTime,
}

impl fmt::Display for ReportsScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reports & Analytics ({})", self.bike_id)?;
        writeln!(f)?;

        writeln!(f, "Rides Over Time")?;
        match &self.rides_over_time {
            RidesOverTime::Days(days) => {
                for day in days {
                    writeln!(
                        f,
                        "  {}  rides {:>3}  helmet {:>3}  alcohol {:>3}",
                        day.date, day.rides, day.helmet_worn, day.alcohol_detected
                    )?;
                }
            }
            RidesOverTime::Empty(empty) => writeln!(f, "{}", empty)?,
        }
        writeln!(f)?;

        if let Some(summary) = &self.summary {
            writeln!(f, "Ignition Attempt Distribution")?;
            let widest = self.chart.iter().map(|b| b.value).max().unwrap_or(0);
            for bar in &self.chart {
                writeln!(
                    f,
                    "  {:<17} {:<20} {}",
                    bar.label,
                    "#".repeat(scaled(bar.value, widest, 20)),
                    bar.value
                )?;
            }
            writeln!(f)?;

            writeln!(f, "Summary Statistics")?;
            for row in summary {
                writeln!(f, "  {:<18} {:>5}", row.label, row.value)?;
            }
        }
        Ok(())
    }
}

fn scaled(value: u64, max: u64, width: usize) -> usize {
    if max == 0 {
        return 0;
    }
    ((value as f64 / max as f64) * width as f64).round() as usize
}

pub fn summary_rows(summary: &DashboardSummary) -> Vec<StatCard> {
    vec![
        StatCard::new("Total Attempts", summary.total_rides, Tone::Neutral),
        StatCard::new("Successful", summary.successful_rides, Tone::Success),
        StatCard::new("Helmet Violations", summary.helmet_violations, Tone::Warning),
        StatCard::new("Alcohol Detections", summary.alcohol_detections, Tone::Danger),
    ]
}

pub fn attempt_chart(summary: &DashboardSummary) -> Vec<Bar> {
    let bar = |label: &str, value: u64, tone: Tone| Bar {
        label: label.to_string(),
        value,
        tone,
    };
    vec![
        bar("Helmet Attempts", summary.helmet_attempts, Tone::Warning),
        bar("Alcohol Attempts", summary.alcohol_attempts, Tone::Danger),
        bar("Successful Rides", summary.successful_rides, Tone::Success),
    ]
}

/// Group rides by the date part of their timestamp, oldest day first
pub fn group_by_day(points: &[RidePoint]) -> Vec<DailyRides> {
    let mut days: BTreeMap<&str, DailyRides> = BTreeMap::new();
    for point in points {
        let date = point.date.get(..10).unwrap_or(point.date.as_str());
        let day = days.entry(date).or_insert_with(|| DailyRides {
            date: date.to_string(),
            rides: 0,
            helmet_worn: 0,
            alcohol_detected: 0,
        });
        day.rides += 1;
        day.helmet_worn += u32::from(point.helmet_worn);
        day.alcohol_detected += u32::from(point.alcohol_detected);
    }
    days.into_values().collect()
}

pub struct ReportsView {
    gateway: Arc<ApiGateway>,
    bike_id: String,
}

impl ReportsView {
    pub fn new(gateway: Arc<ApiGateway>, bike_id: impl Into<String>) -> Self {
        Self {
            gateway,
            bike_id: bike_id.into(),
        }
    }

    /// Fetch the summary and the ride history concurrently and render.
    /// Failures are logged; the affected section renders empty.
    pub async fn load(&self) -> ReportsScreen {
        let bike_id = Some(self.bike_id.as_str());
        let (summary, history) = tokio::join!(
            self.gateway.fetch_dashboard_summary(bike_id),
            self.gateway.fetch_timeseries(bike_id, REPORT_DAYS),
        );

        let summary = summary
            .map_err(|e| tracing::warn!(kind = %e.kind, "Failed to load reports data: {}", e.message))
            .ok();
        let history = history
            .map_err(|e| tracing::warn!(kind = %e.kind, "Failed to load ride history: {}", e.message))
            .unwrap_or_default();

        let days = group_by_day(&history);
        ReportsScreen {
            bike_id: self.bike_id.clone(),
            chart: summary.as_ref().map(attempt_chart).unwrap_or_default(),
            summary: summary.as_ref().map(summary_rows),
            rides_over_time: if days.is_empty() {
                RidesOverTime::Empty(EmptyState::new("No ride data available"))
            } else {
                RidesOverTime::Days(days)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::{MemorySlotStorage, Role, SessionStore, UserProfile};
    use crate::state::ViewState;
    use crate::testing::MockFleet;

    fn point(date: &str, helmet: bool, alcohol: bool) -> RidePoint {
        RidePoint {
            date: date.to_string(),
            helmet_worn: helmet,
            alcohol_detected: alcohol,
        }
    }

    fn view(base_url: &str) -> ReportsView {
        let session = Arc::new(SessionStore::new(MemorySlotStorage::new()));
        session
            .save("abc", UserProfile::new("u1", "alice", Role::Rider))
            .unwrap();
        let api = ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
        };
        let gateway =
            ApiGateway::new(&api, "BIKE123", session, Arc::new(ViewState::new())).unwrap();
        ReportsView::new(Arc::new(gateway), "BIKE123")
    }

    #[test]
    fn test_group_by_day() {
        let days = group_by_day(&[
            point("2024-03-02T09:05:00", true, true),
            point("2024-03-01T08:15:00", true, false),
            point("2024-03-01T18:40:00", false, false),
            point("bad", false, false),
        ]);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, "2024-03-01");
        assert_eq!(days[0].rides, 2);
        assert_eq!(days[0].helmet_worn, 1);
        assert_eq!(days[1].alcohol_detected, 1);
        assert_eq!(days[2].date, "bad");
    }

    #[test]
    fn test_chart_order() {
        let summary = DashboardSummary {
            helmet_attempts: 3,
            alcohol_attempts: 1,
            successful_rides: 20,
            ..DashboardSummary::default()
        };
        let chart = attempt_chart(&summary);
        let labels: Vec<&str> = chart.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Helmet Attempts", "Alcohol Attempts", "Successful Rides"]);
        assert_eq!(scaled(20, 20, 20), 20);
        assert_eq!(scaled(0, 0, 20), 0);
    }

    #[tokio::test]
    async fn test_load() {
        let fleet = MockFleet::start().await;
        let screen = view(&fleet.base_url).load().await;

        let summary = screen.summary.as_ref().unwrap();
        assert_eq!(summary[0].label, "Total Attempts");
        assert_eq!(summary[0].value, "24");
        match &screen.rides_over_time {
            RidesOverTime::Days(days) => assert_eq!(days.len(), 2),
            other => panic!("Expected ride days, got {:?}", other),
        }
        assert!(fleet
            .requests()
            .contains(&"GET /api/analytics/timeseries?bikeId=BIKE123&days=7".to_string()));
        assert!(screen.to_string().contains("Summary Statistics"));
    }

    #[tokio::test]
    async fn test_load_with_unreachable_server() {
        let screen = view("http://127.0.0.1:1").load().await;
        assert!(screen.summary.is_none());
        assert!(screen.chart.is_empty());
        assert_eq!(
            screen.rides_over_time,
            RidesOverTime::Empty(EmptyState::new("No ride data available"))
        );
    }
}
