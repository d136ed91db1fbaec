//! Admin View
//!
//! Fleet management panel: stats, five tabs and the three mutating
//! commands (create bike, ignition control, helmet pairing).
//!
//! Every mutation validates locally, calls the gateway, and on success
//! re-fetches the whole admin dataset before re-rendering. Nothing is
//! updated optimistically.

use chrono::{DateTime, NaiveDateTime};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::display::{
    write_cards, Action, Badge, Cell, EmptyState, Intent, Notice, StatCard, Table, Tone,
    PLACEHOLDER,
};
use crate::api::{ApiGateway, BikeRecord, FleetOverview, NewBike, Owner, UserRecord};
use crate::state::{AdminTab, ViewState};

/// Data behind every admin tab
#[derive(Debug, Clone, Default)]
pub struct AdminData {
    /// `None` until the fleet overview loads
    pub fleet: Option<FleetOverview>,
    pub bikes: Vec<BikeRecord>,
    pub users: Vec<UserRecord>,
}

/// "Add New Bike" form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BikeForm {
    pub bike_id: String,
    pub bike_name: String,
    pub bike_model: String,
    pub registration_number: String,
}

impl BikeForm {
    pub fn new(bike_id: impl Into<String>) -> Self {
        Self {
            bike_id: bike_id.into(),
            ..Self::default()
        }
    }

    fn to_request(&self) -> NewBike {
        NewBike {
            bike_id: self.bike_id.trim().to_string(),
            bike_name: self.bike_name.trim().to_string(),
            bike_model: self.bike_model.trim().to_string(),
            registration_number: self.registration_number.trim().to_string(),
        }
    }
}

/// "Helmet Pairing" form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingForm {
    pub bike_id: String,
    pub helmet_id: String,
}

impl PairingForm {
    pub fn new(bike_id: impl Into<String>, helmet_id: impl Into<String>) -> Self {
        Self {
            bike_id: bike_id.into(),
            helmet_id: helmet_id.into(),
        }
    }
}

/// Result of an admin command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Local validation failed; nothing was sent
    Rejected { notice: Notice },
    /// The server refused; the form is untouched
    Failed { notice: Notice },
    /// Applied and re-fetched
    Applied { notice: Notice, screen: AdminScreen },
}

impl MutationOutcome {
    pub fn notice(&self) -> &Notice {
        match self {
            MutationOutcome::Rejected { notice }
            | MutationOutcome::Failed { notice }
            | MutationOutcome::Applied { notice, .. } => notice,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabItem {
    pub id: &'static str,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetCard {
    pub title: String,
    pub badges: Vec<Badge>,
    pub bike_id: String,
    pub model: String,
    pub helmet: String,
    pub owner: String,
    pub success_rate: f64,
    pub rides: u64,
    pub alerts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IgnitionCard {
    pub title: String,
    pub status: Badge,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tab", rename_all = "snake_case")]
pub enum TabContent {
    Fleet { cards: Vec<FleetCard> },
    NoFleet { empty: EmptyState },
    Bikes { table: Table },
    Users { table: Table },
    Alerts { empty: EmptyState },
    Controls {
        /// Choices of the pairing bike selector
        bike_options: Vec<String>,
        cards: Vec<IgnitionCard>,
    },
}

/// Rendered admin panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminScreen {
    /// Empty until the fleet overview loads
    pub stats: Vec<StatCard>,
    pub tabs: Vec<TabItem>,
    pub active_tab: AdminTab,
    pub content: TabContent,
}

impl fmt::Display for AdminScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Admin Dashboard")?;
        write_cards(f, &self.stats)?;
        writeln!(f)?;

        let tabs: Vec<String> = self
            .tabs
            .iter()
            .map(|t| {
                if t.active {
                    format!("[{}]", t.label)
                } else {
                    t.label.to_string()
                }
            })
            .collect();
        writeln!(f, "{}", tabs.join(" | "))?;
        writeln!(f)?;

        match &self.content {
            TabContent::Fleet { cards } => {
                writeln!(f, "Fleet Status")?;
                for card in cards {
                    let badges: Vec<String> = card.badges.iter().map(Badge::to_string).collect();
                    writeln!(f, "  {} {}", card.title, badges.join(" "))?;
                    writeln!(
                        f,
                        "    Bike ID: {}  Model: {}  Helmet ID: {}  Owner: {}",
                        card.bike_id, card.model, card.helmet, card.owner
                    )?;
                    writeln!(
                        f,
                        "    Success Rate: {}%  Rides: {}  Alerts: {}",
                        card.success_rate, card.rides, card.alerts
                    )?;
                }
                Ok(())
            }
            TabContent::NoFleet { empty } | TabContent::Alerts { empty } => writeln!(f, "{}", empty),
            TabContent::Bikes { table } | TabContent::Users { table } => write!(f, "{}", table),
            TabContent::Controls {
                bike_options,
                cards,
            } => {
                writeln!(f, "Helmet Pairing")?;
                for option in bike_options {
                    writeln!(f, "  {}", option)?;
                }
                writeln!(f)?;
                writeln!(f, "Ignition Control")?;
                for card in cards {
                    let actions = Cell::Actions(card.actions.clone()).plain();
                    writeln!(f, "  {} {} {}", card.title, card.status, actions)?;
                }
                Ok(())
            }
        }
    }
}

pub fn stat_cards(data: &AdminData) -> Vec<StatCard> {
    let Some(fleet) = &data.fleet else {
        return Vec::new();
    };
    vec![
        StatCard::new("Total Bikes", fleet.total_bikes, Tone::Info),
        StatCard::new("Active Bikes", fleet.active_bikes, Tone::Success),
        StatCard::new("Total Users", data.users.len(), Tone::Purple),
        StatCard::new("Active Alerts", fleet.active_alerts(), Tone::Danger),
    ]
}

fn helmet_label(bike: &BikeRecord) -> String {
    bike.paired_helmet().unwrap_or("Not paired").to_string()
}

fn ignition_action(bike_id: &str, block: bool) -> Intent {
    Intent::SetIgnition {
        bike_id: bike_id.to_string(),
        block,
    }
}

/// Join date as `YYYY-MM-DD`; the server sends RFC 3339, RFC 2822 or a
/// naive ISO timestamp
pub fn joined_date(created_at: Option<&str>) -> String {
    let Some(raw) = created_at.filter(|s| !s.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

fn fleet_tab(data: &AdminData) -> TabContent {
    let Some(fleet) = &data.fleet else {
        return TabContent::NoFleet {
            empty: EmptyState::new("No fleet data available"),
        };
    };

    let cards = fleet
        .bikes
        .iter()
        .map(|bike| {
            let mut badges = vec![Badge::activity(bike.is_active)];
            if bike.ignition_blocked {
                badges.push(Badge::new("Blocked", Tone::Danger));
            }
            FleetCard {
                title: bike.display_name().to_string(),
                badges,
                bike_id: bike.bike_id.clone(),
                model: bike
                    .bike_model
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                helmet: helmet_label(bike),
                owner: bike
                    .owner
                    .as_ref()
                    .and_then(Owner::username)
                    .unwrap_or(PLACEHOLDER)
                    .to_string(),
                success_rate: bike.stats.success_rate,
                rides: bike.stats.total_rides,
                alerts: bike.stats.active_alerts,
            }
        })
        .collect();

    TabContent::Fleet { cards }
}

fn bikes_tab(data: &AdminData) -> TabContent {
    let mut table = Table::new(
        "Existing Bikes",
        &["Bike ID", "Name", "Model", "Helmet", "Status", "Actions"],
    );
    for bike in &data.bikes {
        let action = if bike.ignition_blocked {
            Action::new("Unlock", ignition_action(&bike.bike_id, false), Tone::Success)
        } else {
            Action::new("Lock", ignition_action(&bike.bike_id, true), Tone::Danger)
        };
        table.push(vec![
            Cell::text(&bike.bike_id),
            Cell::or_dash(bike.bike_name.as_deref()),
            Cell::or_dash(bike.bike_model.as_deref()),
            Cell::text(helmet_label(bike)),
            Cell::Badge(Badge::activity(bike.is_active)),
            Cell::Actions(vec![action]),
        ]);
    }
    TabContent::Bikes { table }
}

fn users_tab(data: &AdminData) -> TabContent {
    let mut table = Table::new(
        "Registered Users",
        &["Username", "Email", "Phone", "Role", "Status", "Joined"],
    );
    for user in &data.users {
        let role_tone = if user.role == "admin" {
            Tone::Purple
        } else {
            Tone::Info
        };
        table.push(vec![
            Cell::text(&user.username),
            Cell::or_dash(user.email.as_deref()),
            Cell::or_dash(user.phone.as_deref()),
            Cell::Badge(Badge::new(&user.role, role_tone)),
            Cell::Badge(Badge::activity(user.is_active)),
            Cell::text(joined_date(user.created_at.as_deref())),
        ]);
    }
    TabContent::Users { table }
}

fn controls_tab(data: &AdminData) -> TabContent {
    let bike_options = data
        .bikes
        .iter()
        .map(|bike| format!("{} - {}", bike.bike_id, bike.display_name()))
        .collect();

    let cards = data
        .bikes
        .iter()
        .map(|bike| {
            let status = if bike.ignition_blocked {
                Badge::new("Blocked", Tone::Danger)
            } else {
                Badge::new("Allowed", Tone::Success)
            };
            IgnitionCard {
                title: bike.display_name().to_string(),
                status,
                actions: vec![
                    Action::new("Block", ignition_action(&bike.bike_id, true), Tone::Danger)
                        .enabled(!bike.ignition_blocked),
                    Action::new("Allow", ignition_action(&bike.bike_id, false), Tone::Success)
                        .enabled(bike.ignition_blocked),
                ],
            }
        })
        .collect();

    TabContent::Controls {
        bike_options,
        cards,
    }
}

/// Render one tab of `data`
pub fn render(data: &AdminData, active_tab: AdminTab) -> AdminScreen {
    let content = match active_tab {
        AdminTab::Fleet => fleet_tab(data),
        AdminTab::Bikes => bikes_tab(data),
        AdminTab::Users => users_tab(data),
        AdminTab::Alerts => TabContent::Alerts {
            empty: EmptyState::new("Alert notifications have been disabled"),
        },
        AdminTab::Controls => controls_tab(data),
    };

    AdminScreen {
        stats: stat_cards(data),
        tabs: AdminTab::ALL
            .iter()
            .map(|tab| TabItem {
                id: tab.id(),
                label: tab.label(),
                active: *tab == active_tab,
            })
            .collect(),
        active_tab,
        content,
    }
}

pub struct AdminView {
    gateway: Arc<ApiGateway>,
    view_state: Arc<ViewState>,
    data: RwLock<AdminData>,
}

impl AdminView {
    pub fn new(gateway: Arc<ApiGateway>, view_state: Arc<ViewState>) -> Self {
        Self {
            gateway,
            view_state,
            data: RwLock::new(AdminData::default()),
        }
    }

    /// Fetch the dataset and render the active tab
    pub async fn load(&self) -> AdminScreen {
        self.reload().await;
        self.screen()
    }

    /// Fetch fleet overview, bikes and users concurrently.
    ///
    /// A failed fetch is logged and its part of the dataset is emptied.
    pub async fn reload(&self) {
        let (fleet, bikes, users) = tokio::join!(
            self.gateway.fetch_fleet_overview(),
            self.gateway.list_bikes(),
            self.gateway.list_users(),
        );

        let fleet = fleet
            .map_err(|e| tracing::warn!(kind = %e.kind, "Failed to load fleet overview: {}", e.message))
            .ok();
        let bikes = bikes
            .map_err(|e| tracing::warn!(kind = %e.kind, "Failed to load bikes: {}", e.message))
            .unwrap_or_default();
        let users = users
            .map_err(|e| tracing::warn!(kind = %e.kind, "Failed to load users: {}", e.message))
            .unwrap_or_default();

        tracing::debug!(bikes = bikes.len(), users = users.len(), "Admin data loaded");
        *self.data.write() = AdminData {
            fleet,
            bikes,
            users,
        };
    }

    pub fn data(&self) -> AdminData {
        self.data.read().clone()
    }

    pub fn screen(&self) -> AdminScreen {
        render(&self.data.read(), self.view_state.active_admin_tab())
    }

    /// Make `tab` active and render it from the data already loaded
    pub fn switch_tab(&self, tab: AdminTab) -> AdminScreen {
        self.view_state.set_active_admin_tab(tab);
        self.screen()
    }

    pub async fn create_bike(&self, form: &mut BikeForm) -> MutationOutcome {
        let request = form.to_request();
        if request.bike_id.is_empty() {
            return MutationOutcome::Rejected {
                notice: Notice::error("Bike ID is required"),
            };
        }

        match self.gateway.create_bike(&request).await {
            Ok(bike) => {
                tracing::info!(bike_id = %bike.bike_id, "Bike created");
                *form = BikeForm::default();
                self.applied("Bike created successfully").await
            }
            Err(e) => MutationOutcome::Failed {
                notice: Notice::error(format!("Failed to create bike: {}", e.message)),
            },
        }
    }

    pub async fn set_ignition(&self, bike_id: &str, block: bool) -> MutationOutcome {
        if bike_id.trim().is_empty() {
            return MutationOutcome::Rejected {
                notice: Notice::error("Bike ID is required"),
            };
        }

        match self.gateway.set_ignition_block(bike_id, block).await {
            Ok(_) => {
                tracing::info!(bike_id, block, "Ignition updated");
                let verb = if block { "blocked" } else { "unblocked" };
                self.applied(&format!("Ignition {} for bike {}", verb, bike_id))
                    .await
            }
            Err(e) => MutationOutcome::Failed {
                notice: Notice::error(format!("Failed to control ignition: {}", e.message)),
            },
        }
    }

    pub async fn pair_helmet(&self, form: &mut PairingForm) -> MutationOutcome {
        let bike_id = form.bike_id.trim().to_string();
        let helmet_id = form.helmet_id.trim().to_string();
        if bike_id.is_empty() || helmet_id.is_empty() {
            return MutationOutcome::Rejected {
                notice: Notice::error("Please select bike and enter helmet ID"),
            };
        }

        match self.gateway.pair_helmet(&bike_id, &helmet_id).await {
            Ok(_) => {
                tracing::info!(bike_id = %bike_id, helmet_id = %helmet_id, "Helmet paired");
                *form = PairingForm::default();
                self.applied("Helmet paired successfully").await
            }
            Err(e) => MutationOutcome::Failed {
                notice: Notice::error(format!("Failed to pair helmet: {}", e.message)),
            },
        }
    }

    async fn applied(&self, message: &str) -> MutationOutcome {
        self.reload().await;
        MutationOutcome::Applied {
            notice: Notice::success(message),
            screen: self.screen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::{MemorySlotStorage, Role, SessionStore, UserProfile};
    use crate::testing::MockFleet;

    fn view(base_url: &str) -> AdminView {
        let session = Arc::new(SessionStore::new(MemorySlotStorage::new()));
        session
            .save("admin-token", UserProfile::new("u0", "root", Role::Admin))
            .unwrap();
        let view_state = Arc::new(ViewState::new());
        let api = ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
        };
        let gateway =
            ApiGateway::new(&api, "BIKE123", session, Arc::clone(&view_state)).unwrap();
        AdminView::new(Arc::new(gateway), view_state)
    }

    fn bikes_table(screen: &AdminScreen) -> &Table {
        match &screen.content {
            TabContent::Bikes { table } => table,
            other => panic!("Expected bikes tab, got {:?}", other),
        }
    }

    #[test]
    fn test_joined_date_formats() {
        assert_eq!(joined_date(Some("2024-01-15T10:30:00")), "2024-01-15");
        assert_eq!(joined_date(Some("2024-01-15T10:30:00.123456")), "2024-01-15");
        assert_eq!(joined_date(Some("2024-01-15T10:30:00+05:30")), "2024-01-15");
        assert_eq!(joined_date(Some("Mon, 01 Jan 2024 00:00:00 GMT")), "2024-01-01");
        assert_eq!(joined_date(None), "-");
        assert_eq!(joined_date(Some("yesterday")), "yesterday");
    }

    #[test]
    fn test_render_without_data() {
        let screen = render(&AdminData::default(), AdminTab::Fleet);
        assert!(screen.stats.is_empty());
        assert_eq!(
            screen.content,
            TabContent::NoFleet {
                empty: EmptyState::new("No fleet data available")
            }
        );
        assert_eq!(screen.tabs.len(), 5);
        assert!(screen.tabs[0].active);

        let screen = render(&AdminData::default(), AdminTab::Alerts);
        assert_eq!(
            screen.content,
            TabContent::Alerts {
                empty: EmptyState::new("Alert notifications have been disabled")
            }
        );
    }

    #[tokio::test]
    async fn test_load_fleet_tab() {
        let fleet = MockFleet::start().await;
        let admin = view(&fleet.base_url);

        let screen = admin.load().await;
        assert_eq!(screen.active_tab, AdminTab::Fleet);
        assert_eq!(screen.stats[0].value, "2");
        assert_eq!(screen.stats[1].value, "1");
        assert_eq!(screen.stats[2].value, "2");
        assert_eq!(screen.stats[3].value, "2");

        match &screen.content {
            TabContent::Fleet { cards } => {
                assert_eq!(cards[0].title, "Red Scooter");
                assert_eq!(cards[0].helmet, "Not paired");
                assert_eq!(cards[0].owner, "alice");
                assert_eq!(cards[1].model, "-");
            }
            other => panic!("Expected fleet tab, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_bike_with_empty_id_sends_nothing() {
        let fleet = MockFleet::start().await;
        let admin = view(&fleet.base_url);

        let mut form = BikeForm {
            bike_id: "  ".to_string(),
            bike_name: "Ghost".to_string(),
            ..BikeForm::default()
        };
        let outcome = admin.create_bike(&mut form).await;
        assert_eq!(
            outcome,
            MutationOutcome::Rejected {
                notice: Notice::error("Bike ID is required")
            }
        );
        assert_eq!(form.bike_name, "Ghost");
        assert!(fleet.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_bike_refetches() {
        let fleet = MockFleet::start().await;
        let admin = view(&fleet.base_url);
        admin.switch_tab(AdminTab::Bikes);

        let mut form = BikeForm::new("BIKE789");
        let outcome = admin.create_bike(&mut form).await;
        assert!(outcome.is_applied());
        assert_eq!(form, BikeForm::default());
        match outcome {
            MutationOutcome::Applied { screen, .. } => {
                assert!(bikes_table(&screen).row("BIKE789").is_some());
            }
            other => panic!("Expected applied, got {:?}", other),
        }

        // Duplicate id: server refuses, form keeps its content
        let mut form = BikeForm::new("BIKE789");
        let outcome = admin.create_bike(&mut form).await;
        assert!(outcome.notice().is_error());
        assert_eq!(
            outcome.notice().message,
            "Failed to create bike: Bike ID already exists"
        );
        assert_eq!(form.bike_id, "BIKE789");
    }

    #[tokio::test]
    async fn test_block_ignition_shows_in_bikes_table() {
        let fleet = MockFleet::start().await;
        let admin = view(&fleet.base_url);
        admin.load().await;
        let screen = admin.switch_tab(AdminTab::Bikes);

        let row = bikes_table(&screen).row("BIKE123").unwrap();
        assert_eq!(row[5].plain(), "<Lock>");

        let outcome = admin.set_ignition("BIKE123", true).await;
        assert_eq!(
            outcome.notice(),
            &Notice::success("Ignition blocked for bike BIKE123")
        );
        let MutationOutcome::Applied { screen, .. } = outcome else {
            panic!("Expected applied");
        };
        let row = bikes_table(&screen).row("BIKE123").unwrap();
        assert_eq!(
            row[5],
            Cell::Actions(vec![Action::new(
                "Unlock",
                ignition_action("BIKE123", false),
                Tone::Success
            )])
        );
        assert!(admin.data().bikes.iter().any(|b| b.bike_id == "BIKE123" && b.ignition_blocked));

        let controls = admin.switch_tab(AdminTab::Controls);
        assert!(controls.to_string().contains("Red Scooter [Blocked] (Block) <Allow>"));
    }

    #[tokio::test]
    async fn test_ignition_for_unknown_bike_fails() {
        let fleet = MockFleet::start().await;
        let admin = view(&fleet.base_url);

        let outcome = admin.set_ignition("NOPE", true).await;
        assert_eq!(
            outcome,
            MutationOutcome::Failed {
                notice: Notice::error("Failed to control ignition: Bike not found")
            }
        );
    }

    #[tokio::test]
    async fn test_pair_helmet() {
        let fleet = MockFleet::start().await;
        let admin = view(&fleet.base_url);

        let mut form = PairingForm::new("BIKE123", "");
        let outcome = admin.pair_helmet(&mut form).await;
        assert_eq!(
            outcome.notice().message,
            "Please select bike and enter helmet ID"
        );
        assert!(fleet.requests().is_empty());

        let mut form = PairingForm::new("BIKE123", "HELMET9");
        let outcome = admin.pair_helmet(&mut form).await;
        assert!(outcome.is_applied());
        assert_eq!(form, PairingForm::default());
        let bike = admin
            .data()
            .bikes
            .into_iter()
            .find(|b| b.bike_id == "BIKE123")
            .unwrap();
        assert_eq!(bike.paired_helmet(), Some("HELMET9"));
    }
}
