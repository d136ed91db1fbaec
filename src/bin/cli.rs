//! helmetctl
//!
//! Command-line console for the Smart Helmet fleet:
//! - Sign in / out and register accounts
//! - Show the dashboard, reports and admin panel
//! - Run admin commands (bikes, ignition, helmet pairing)
//! - Follow live helmet status and alerts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smarthelmet::views::dashboard::{LiveStatus, StatusPanel};
use smarthelmet::views::display::{Cell, Table};
use smarthelmet::views::{BikeForm, MutationOutcome, PairingForm};
use smarthelmet::{AdminTab, AlertFilter, App, AppError, Config, Screen, View};

#[derive(Parser)]
#[command(name = "helmetctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Smart Helmet fleet console")]
#[command(long_about = "helmetctl talks to the Smart Helmet fleet API.\nMonitor rides, manage bikes and helmets, and follow live safety alerts.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        username: String,
        #[arg(short, long)]
        password: String,
    },

    /// Create an account
    Register {
        username: String,
        #[arg(short, long)]
        password: String,
        /// Password confirmation (default: same as --password)
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user and menu
    Whoami,

    /// Ride counters and helmet status
    Dashboard {
        /// Bike to show (default: configured bike)
        #[arg(short, long)]
        bike: Option<String>,
    },

    /// Ride summary and rides over time
    Reports {
        /// Bike to show (default: configured bike)
        #[arg(short, long)]
        bike: Option<String>,
    },

    /// Admin panel (fleet, bikes, users, alerts, controls)
    Admin {
        /// Tab to show
        #[arg(default_value = "fleet")]
        tab: String,
    },

    /// Register a bike
    CreateBike {
        bike_id: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        model: String,
        #[arg(long, default_value = "")]
        registration: String,
    },

    /// Block or allow a bike's ignition
    Ignition {
        bike_id: String,
        #[arg(long, conflicts_with = "allow", required_unless_present = "allow")]
        block: bool,
        #[arg(long)]
        allow: bool,
    },

    /// Pair a helmet with a bike
    Pair { bike_id: String, helmet_id: String },

    /// List stored alerts
    Alerts {
        #[arg(short, long)]
        bike: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Follow live status and alerts until Ctrl-C
    Watch {
        /// Bike to follow (default: configured bike)
        #[arg(short, long)]
        bike: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::load_default(),
    };
    init_tracing(&config);

    if let Commands::Dashboard { bike: Some(bike) } | Commands::Reports { bike: Some(bike) } =
        &cli.command
    {
        config.dashboard.bike_id = bike.clone();
    }

    let app = App::from_config(config).context("Failed to start console")?;
    let format = cli.format;

    match cli.command {
        Commands::Login { username, password } => match app.login(&username, &password).await {
            Ok(screen) => {
                if format == OutputFormat::Table {
                    println!("Signed in as {}", username);
                    println!();
                }
                emit(format, &screen)?;
                app.realtime().disconnect();
            }
            Err(AppError::Rejected(message)) => bail!(message),
            Err(e) => return Err(e).context("Sign-in failed"),
        },

        Commands::Register {
            username,
            password,
            confirm,
        } => {
            let confirm = confirm.unwrap_or_else(|| password.clone());
            match app.register(&username, &password, &confirm).await {
                Ok(message) => {
                    println!("{}", message);
                    println!("  helmetctl login {} --password <password>", username.trim());
                }
                Err(AppError::Rejected(message)) => bail!(message),
                Err(e) => return Err(e).context("Registration failed"),
            }
        }

        Commands::Logout => {
            app.restore_session();
            app.logout();
            println!("Signed out.");
        }

        Commands::Whoami => {
            require_session(&app)?;
            let menu = app.router().setup_navigation();
            match format {
                OutputFormat::Json => {
                    let body = serde_json::json!({
                        "user": app.session().profile(),
                        "menu": menu,
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                OutputFormat::Table => {
                    if let Some(profile) = app.session().profile() {
                        println!("{} ({})", profile.username, profile.role);
                    }
                    let labels: Vec<&str> = menu.iter().map(|item| item.label).collect();
                    println!("Menu: {}", labels.join(" | "));
                }
            }
        }

        Commands::Dashboard { .. } => show(&app, format, View::Dashboard.id()).await?,

        Commands::Reports { .. } => show(&app, format, View::Reports.id()).await?,

        Commands::Admin { tab } => {
            let tab = AdminTab::parse(&tab).with_context(|| {
                let known: Vec<&str> = AdminTab::ALL.iter().map(|t| t.id()).collect();
                format!("Unknown tab '{}'. Expected one of: {}", tab, known.join(", "))
            })?;
            require_session(&app)?;
            app.view_state().set_active_admin_tab(tab);
            let screen = navigate(&app, View::Admin.id()).await?;
            emit(format, &screen)?;
        }

        Commands::CreateBike {
            bike_id,
            name,
            model,
            registration,
        } => {
            enter_admin(&app).await?;
            let mut form = BikeForm {
                bike_name: name,
                bike_model: model,
                registration_number: registration,
                ..BikeForm::new(bike_id)
            };
            let outcome = app.router().admin().create_bike(&mut form).await;
            report(format, &outcome)?;
        }

        Commands::Ignition {
            bike_id, block, ..
        } => {
            enter_admin(&app).await?;
            let outcome = app.router().admin().set_ignition(&bike_id, block).await;
            report(format, &outcome)?;
        }

        Commands::Pair { bike_id, helmet_id } => {
            enter_admin(&app).await?;
            let mut form = PairingForm::new(bike_id, helmet_id);
            let outcome = app.router().admin().pair_helmet(&mut form).await;
            report(format, &outcome)?;
        }

        Commands::Alerts { bike, limit } => {
            require_session(&app)?;
            let mut filter = match bike {
                Some(bike) => AlertFilter::for_bike(bike),
                None => AlertFilter::default(),
            };
            if let Some(limit) = limit {
                filter = filter.limit(limit);
            }

            let alerts = app
                .gateway()
                .list_alerts(&filter)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load alerts: {}", e.message))?;

            let mut table = Table::new(
                format!("Alerts ({})", alerts.len()),
                &["Time", "Bike", "Type", "Message", "Resolved"],
            );
            for alert in &alerts {
                table.push(vec![
                    Cell::or_dash(alert.timestamp.as_deref()),
                    Cell::or_dash(alert.bike_id.as_deref()),
                    Cell::text(alert.alert_type.as_str()),
                    Cell::or_dash(alert.message.as_deref()),
                    Cell::text(if alert.resolved { "yes" } else { "no" }),
                ]);
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&alerts)?),
                OutputFormat::Table => print!("{}", table),
            }
        }

        Commands::Watch { bike } => {
            require_session(&app)?;
            let bike = bike.unwrap_or_else(|| app.config().dashboard.bike_id.clone());

            app.realtime()
                .connect()
                .await
                .with_context(|| format!("Cannot reach realtime server at {}", app.realtime().url()))?;
            app.realtime().subscribe(&bike);

            app.realtime().on_status(move |event| match format {
                OutputFormat::Json => {
                    if let Ok(line) = serde_json::to_string(event) {
                        println!("{}", line);
                    }
                }
                OutputFormat::Table => {
                    let mut live = LiveStatus::default();
                    live.apply(event);
                    print!("{}", StatusPanel::from_status(&live));
                }
            });
            app.realtime().on_alert(move |event| match format {
                OutputFormat::Json => {
                    if let Ok(line) = serde_json::to_string(event) {
                        println!("{}", line);
                    }
                }
                OutputFormat::Table => println!(
                    "ALERT [{}] {}: {}",
                    event.bike_id.as_deref().unwrap_or("-"),
                    event.alert_type,
                    event.message.as_deref().unwrap_or("-"),
                ),
            });

            eprintln!("Watching {} (Ctrl-C to stop)", bike);
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;

            app.realtime().unsubscribe(&bike);
            app.realtime().disconnect();
        }

        Commands::Config { output } => write_default_config(output.as_ref())?,
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("smarthelmet={level},helmetctl={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn write_default_config(output: Option<&PathBuf>) -> Result<()> {
    let config = smarthelmet::config::generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
            std::fs::write(path, &config)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", config),
    }
    Ok(())
}

fn require_session(app: &App) -> Result<()> {
    if !app.restore_session() {
        bail!("Not signed in. Run: helmetctl login <username> --password <password>");
    }
    Ok(())
}

/// Navigate and turn a bounce to sign-in into an error
async fn navigate(app: &App, view_id: &str) -> Result<Screen> {
    app.router().setup_navigation();
    match app.router().navigate(view_id).await {
        Screen::Login => bail!("Session expired. Please sign in again."),
        Screen::AccessDenied(notice) => bail!(notice.message),
        screen => Ok(screen),
    }
}

async fn show(app: &App, format: OutputFormat, view_id: &str) -> Result<()> {
    require_session(app)?;
    let screen = navigate(app, view_id).await?;
    app.router().stop();
    emit(format, &screen)
}

async fn enter_admin(app: &App) -> Result<()> {
    require_session(app)?;
    navigate(app, View::Admin.id()).await?;
    Ok(())
}

fn report(format: OutputFormat, outcome: &MutationOutcome) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Table => {
            println!("{}", outcome.notice());
            if let MutationOutcome::Applied { screen, .. } = outcome {
                println!();
                print!("{}", screen);
            }
        }
    }
    if outcome.notice().is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn emit<T: Serialize + Display>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => print!("{}", value),
    }
    Ok(())
}
