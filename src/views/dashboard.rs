//! Dashboard View
//!
//! Ride counters for the configured bike plus a live helmet status panel
//! fed by the realtime channel (or by the local simulator).

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::display::{write_cards, Badge, EmptyState, StatCard, Tone};
use crate::api::{ApiGateway, DashboardSummary};
use crate::config::DashboardConfig;
use crate::realtime::{AlcoholState, HelmetState, RealtimeChannel, StatusEvent};

/// Battery level the simulator starts from and resets to
pub const SIMULATED_BATTERY_FULL: u8 = 85;
/// Battery level at which the simulator resets
pub const SIMULATED_BATTERY_FLOOR: u8 = 10;

/// Last known helmet status; `None` fields mean no data yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LiveStatus {
    pub helmet: Option<HelmetState>,
    pub alcohol: Option<AlcoholState>,
    pub battery: Option<u8>,
}

impl LiveStatus {
    pub fn apply(&mut self, event: &StatusEvent) {
        self.helmet = Some(event.helmet_state);
        self.alcohol = Some(event.alcohol_state);
        self.battery = Some(event.battery_percent);
    }

    /// Starting point of the simulator
    pub fn simulated() -> Self {
        Self {
            helmet: Some(HelmetState::Worn),
            alcohol: Some(AlcoholState::Clear),
            battery: Some(SIMULATED_BATTERY_FULL),
        }
    }

    fn toggle_helmet(&mut self) {
        self.helmet = Some(match self.helmet {
            Some(HelmetState::Worn) => HelmetState::NotWorn,
            _ => HelmetState::Worn,
        });
    }

    fn drain_battery(&mut self) {
        let level = self
            .battery
            .unwrap_or(SIMULATED_BATTERY_FULL)
            .saturating_sub(1)
            .max(SIMULATED_BATTERY_FLOOR);
        self.battery = Some(if level <= SIMULATED_BATTERY_FLOOR {
            SIMULATED_BATTERY_FULL
        } else {
            level
        });
    }
}

/// Colour band of a battery level
pub fn battery_tone(percent: u8) -> Tone {
    match percent.min(100) {
        0..=19 => Tone::Danger,
        20..=49 => Tone::Warning,
        _ => Tone::Success,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPanel {
    pub helmet: Badge,
    pub alcohol: Badge,
    pub battery_percent: Option<u8>,
    pub battery_tone: Tone,
}

impl StatusPanel {
    pub fn from_status(status: &LiveStatus) -> Self {
        let helmet = match status.helmet {
            Some(HelmetState::Worn) => Badge::new("WORN", Tone::Success),
            Some(HelmetState::NotWorn) => Badge::new("NOT WORN", Tone::Danger),
            None => Badge::new("NO DATA", Tone::Info),
        };
        let alcohol = match status.alcohol {
            Some(AlcoholState::Clear) => Badge::new("Clear ✓", Tone::Success),
            Some(AlcoholState::Detected) => Badge::new("Detected ✗", Tone::Danger),
            None => Badge::new("-", Tone::Neutral),
        };
        let battery_percent = status.battery.map(|b| b.min(100));

        Self {
            helmet,
            alcohol,
            battery_percent,
            battery_tone: battery_percent.map(battery_tone).unwrap_or(Tone::Neutral),
        }
    }
}

impl fmt::Display for StatusPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Helmet Status")?;
        writeln!(f, "  Helmet:  {}", self.helmet)?;
        writeln!(f, "  Alcohol: {}", self.alcohol)?;
        match self.battery_percent {
            Some(percent) => writeln!(f, "  Battery: {}%", percent),
            None => writeln!(f, "  Battery: 0%"),
        }
    }
}

/// Rendered dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardScreen {
    pub bike_id: String,
    pub stats: Vec<StatCard>,
    pub status: StatusPanel,
    pub bike: EmptyState,
}

impl fmt::Display for DashboardScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dashboard ({})", self.bike_id)?;
        write_cards(f, &self.stats)?;
        writeln!(f)?;
        write!(f, "{}", self.status)?;
        writeln!(f)?;
        writeln!(f, "Bike Status")?;
        writeln!(f, "{}", self.bike)
    }
}

pub fn stat_cards(summary: &DashboardSummary) -> Vec<StatCard> {
    vec![
        StatCard::new("Total Rides", summary.total_rides, Tone::Info),
        StatCard::new("Successful Rides", summary.successful_rides, Tone::Success),
        StatCard::new("Helmet Violations", summary.helmet_violations, Tone::Warning),
        StatCard::new("Alcohol Detections", summary.alcohol_detections, Tone::Danger),
    ]
}

pub struct DashboardView {
    gateway: Arc<ApiGateway>,
    realtime: Arc<RealtimeChannel>,
    config: DashboardConfig,
    summary: RwLock<DashboardSummary>,
    status: Arc<RwLock<LiveStatus>>,
    simulator: Mutex<Option<JoinHandle<()>>>,
}

impl DashboardView {
    pub fn new(
        gateway: Arc<ApiGateway>,
        realtime: Arc<RealtimeChannel>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            gateway,
            realtime,
            config,
            summary: RwLock::new(DashboardSummary::default()),
            status: Arc::new(RwLock::new(LiveStatus::default())),
            simulator: Mutex::new(None),
        }
    }

    /// Load the view: start the simulator (when enabled), fetch the
    /// counters and listen for status events.
    pub async fn load(&self) -> DashboardScreen {
        if self.config.simulate_status {
            self.start_simulator();
        }

        self.refresh_stats().await;

        let status = Arc::clone(&self.status);
        self.realtime.on_status(move |event| {
            status.write().apply(event);
        });

        self.screen()
    }

    /// Re-fetch the counters. Failures are logged and the previous
    /// counters stay on screen.
    pub async fn refresh_stats(&self) -> bool {
        match self
            .gateway
            .fetch_dashboard_summary(Some(&self.config.bike_id))
            .await
        {
            Ok(summary) => {
                *self.summary.write() = summary;
                true
            }
            Err(e) => {
                tracing::warn!(
                    bike_id = %self.config.bike_id,
                    kind = %e.kind,
                    "Failed to load dashboard stats: {}",
                    e.message
                );
                false
            }
        }
    }

    pub fn screen(&self) -> DashboardScreen {
        DashboardScreen {
            bike_id: self.config.bike_id.clone(),
            stats: stat_cards(&self.summary.read()),
            status: StatusPanel::from_status(&self.status.read()),
            bike: EmptyState::new("No bike configured")
                .with_hint("Connect your bike to see real-time status"),
        }
    }

    pub fn live_status(&self) -> LiveStatus {
        *self.status.read()
    }

    pub fn is_simulating(&self) -> bool {
        self.simulator
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// (Re)start the status simulator. A previous simulator is aborted.
    fn start_simulator(&self) {
        self.stop();
        *self.status.write() = LiveStatus::simulated();

        let status = Arc::clone(&self.status);
        let toggle_every = Duration::from_secs(self.config.helmet_toggle_secs.max(1));
        let drain_every = Duration::from_secs(self.config.battery_drain_secs.max(1));

        let task = tokio::spawn(async move {
            let mut toggle = interval_at(Instant::now() + toggle_every, toggle_every);
            let mut drain = interval_at(Instant::now() + drain_every, drain_every);
            loop {
                tokio::select! {
                    _ = toggle.tick() => status.write().toggle_helmet(),
                    _ = drain.tick() => status.write().drain_battery(),
                }
            }
        });

        tracing::debug!(bike_id = %self.config.bike_id, "Status simulator started");
        *self.simulator.lock() = Some(task);
    }

    /// Stop the simulator, if running
    pub fn stop(&self) {
        if let Some(task) = self.simulator.lock().take() {
            task.abort();
            tracing::debug!("Status simulator stopped");
        }
    }
}

impl Drop for DashboardView {
    fn drop(&mut self) {
        self.stop();
    }
}
