use std::time::Duration;

use anyhow::{bail, Result};
use breezy_auth::AuthManager;
use breezy_core::{Config, Theme, UnitSystem};
use breezy_services::{
    send_active_alerts, send_welcome_email, subscribe_to_weather_alerts, Dashboard,
    FirestoreUserStore, LocalStore, PhoneVerifier, ToastKind, UserDataStore, UserRef,
    UserSettings,
};
use breezy_weather::{
    moon_phase_display, AirQualityLevel, AlertSeverity, ConfiguredGeolocator, ForecastSource,
    WeatherProvider, WeatherService, WeatherView,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "breezy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weather dashboard with cached forecasts, favorites and synced settings")]
struct Cli {
    /// Show values in this unit system for this run only
    #[arg(long, global = true)]
    units: Option<UnitSystem>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current conditions and forecast for a place
    Weather {
        /// City name, postcode or "lat,lon"; defaults to the configured location
        location: Option<String>,
    },
    /// Weather at the device's position
    Here,
    /// Switch between metric and imperial and remember the choice
    ToggleUnits,
    /// Manage favorite locations
    Favorites {
        #[command(subcommand)]
        action: Option<FavoriteAction>,
    },
    /// Recent searches
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with Google in the browser
    Google,
    Logout,
    /// Send a password reset email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Show settings, or update the ones given
    Settings {
        #[arg(long)]
        unit_system: Option<UnitSystem>,
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Phone number verification
    Phone {
        #[command(subcommand)]
        action: PhoneAction,
    },
    /// Weather alert subscriptions
    Alerts {
        #[command(subcommand)]
        action: AlertAction,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    List,
    Add { location: String },
    Remove { location: String },
}

#[derive(Subcommand)]
enum PhoneAction {
    /// Send a verification code
    Send { number: String },
    /// Confirm the code that was sent
    Verify { number: String, code: String },
}

#[derive(Subcommand)]
enum AlertAction {
    /// Replace the list of locations to receive alerts for
    Subscribe { locations: Vec<String> },
    /// Send the active alerts for a location
    Send {
        location: String,
        /// Minimum severity: minor, moderate or severe
        #[arg(long, default_value = "moderate")]
        min_severity: String,
    },
}

type App = Dashboard<WeatherProvider, FirestoreUserStore>;

fn build_dashboard(config: &Config) -> Result<App> {
    let provider = WeatherProvider::from_config(&config.weather)?;
    let weather = WeatherService::new(
        provider,
        Duration::from_secs(config.weather.cache_ttl_secs),
    );
    let users = FirestoreUserStore::from_config(&config.firebase)?;
    let local = LocalStore::new(config.local_db_path())?;
    Ok(Dashboard::new(weather, users, local, &config.ui)?)
}

fn print_toasts<S: ForecastSource, U: UserDataStore>(dashboard: &mut Dashboard<S, U>) {
    for toast in dashboard.take_toasts() {
        match toast.kind {
            ToastKind::Success => println!("✓ {}", toast.message),
            ToastKind::Info => println!("• {}", toast.message),
            ToastKind::Error => eprintln!("✗ {}", toast.message),
        }
    }
}

fn print_view(view: &WeatherView, app: &App) {
    let l = &view.labels;
    let c = &view.current;

    println!("{}  ({})", view.place, view.local_time);
    println!(
        "  {:.1}{} feels like {:.1}{}, {}",
        c.temperature, l.temperature, c.feels_like, l.temperature, c.condition
    );
    println!(
        "  Wind {:.1} {} {} (gusts {:.1}), humidity {}%",
        c.wind_speed, l.speed, c.wind_dir, c.wind_gust, c.humidity
    );
    println!(
        "  Visibility {:.1} {} ({}), pressure {:.1} {}",
        c.visibility,
        l.distance,
        c.visibility_level.label(),
        c.pressure,
        l.pressure
    );
    println!("  UV {:.0} ({}): {}", c.uv, c.uv_level.label(), c.uv_level.advice());

    if let Some(data) = app.weather() {
        if let Some(aq) = &data.current.air_quality {
            let aqi = aq.us_aqi();
            println!("  Air quality {} ({})", aqi, AirQualityLevel::from_aqi(aqi).label());
        }
        if let Some(today) = data.today() {
            let (glyph, description) = moon_phase_display(&today.astro.moon_phase);
            println!("  Moon {} {}", glyph, description);
        }
        for alert in data.alert_list() {
            println!("  ⚠ {} [{}]", alert.headline, alert.severity);
        }
    }

    println!();
    for day in &view.days {
        println!(
            "  {}  {:>5.1} / {:<5.1}{}  {:>3}% rain  {}",
            day.date, day.high, day.low, l.temperature, day.chance_of_rain, day.condition
        );
    }
}

fn show_weather(app: &App) {
    match app.view() {
        Some(view) => print_view(&view, app),
        None => println!("No weather loaded"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    breezy_core::init()?;

    let cli = Cli::parse();
    let (config, _) = Config::load_validated()?;

    let auth = AuthManager::from_config(&config);
    let mut app = build_dashboard(&config)?;

    match auth.current_session().await {
        Ok(Some(session)) => {
            tracing::debug!("Restored session for {}", session.uid);
            app.sign_in(UserRef::from(&session)).await;
        }
        Ok(None) => tracing::debug!("No saved session"),
        Err(e) => eprintln!("{}", e),
    }

    match cli.command {
        Command::Weather { location } => {
            let location = location.unwrap_or_else(|| config.weather.default_location.clone());
            app.search(&location).await;
            render(&app, cli.units);
        }
        Command::Here => {
            let geolocator = ConfiguredGeolocator::from_config(&config.location);
            let timeout = Duration::from_secs(config.location.timeout_secs);
            app.search_current_location(&geolocator, timeout).await;
            render(&app, cli.units);
        }
        Command::ToggleUnits => {
            let units = app.toggle_units().await;
            println!("Units: {}", units.as_str());
        }
        Command::Favorites { action } => match action.unwrap_or(FavoriteAction::List) {
            FavoriteAction::List => {
                if app.favorites().is_empty() {
                    println!("No favorite locations yet");
                }
                for favorite in app.favorites() {
                    println!("{}", favorite);
                }
            }
            FavoriteAction::Add { location } => {
                app.add_favorite(&location).await;
            }
            FavoriteAction::Remove { location } => {
                app.remove_favorite(&location).await;
            }
        },
        Command::History { clear } => {
            if clear {
                if app.clear_history() {
                    println!("Search history cleared");
                }
            } else {
                for query in app.history() {
                    println!("{}", query);
                }
            }
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            let session = auth.register(&email, &password).await?;
            send_welcome_email(&session.email, name.as_deref().unwrap_or("there"));
            app.sign_in(UserRef::from(&session)).await;
            println!("Account created. Welcome to Breezy!");
        }
        Command::Login { email, password } => {
            let session = auth.login(&email, &password).await?;
            app.sign_in(UserRef::from(&session)).await;
            println!("Signed in as {}", session.email);
        }
        Command::Google => {
            let session = auth.sign_in_with_google().await?;
            app.sign_in(UserRef::from(&session)).await;
            println!("Signed in as {}", session.email);
        }
        Command::Logout => {
            auth.logout()?;
            app.sign_out();
            println!("Logged out successfully");
        }
        Command::ResetPassword { email } => {
            auth.send_password_reset(&email).await?;
            println!("Password reset email sent to {}", email);
        }
        Command::Settings {
            unit_system,
            theme,
            notifications,
            email,
        } => {
            let patch = UserSettings {
                unit_system,
                theme,
                notification_enabled: notifications,
                email,
                ..UserSettings::default()
            };
            if patch.is_empty() {
                println!("Units: {}", app.unit_system().as_str());
                println!("Theme: {:?}", app.theme());
                let settings = app.settings();
                if let Some(enabled) = settings.notification_enabled {
                    println!("Notifications: {}", enabled);
                }
                if let Some(email) = &settings.email {
                    println!("Email: {}", email);
                }
                println!("Phone verified: {}", settings.phone_verified.unwrap_or(false));
            } else {
                app.save_settings(&patch).await;
            }
        }
        Command::Phone { action } => {
            let user = signed_in(&app)?;
            let verifier = PhoneVerifier::default();
            match action {
                PhoneAction::Send { number } => {
                    let phone = verifier.send_code(app.users(), &user, &number).await?;
                    println!("Verification code sent to {}", phone);
                }
                PhoneAction::Verify { number, code } => {
                    if verifier.verify(app.users(), &user, &number, &code).await? {
                        println!("Phone number verified");
                    } else {
                        bail!("Invalid or expired verification code");
                    }
                }
            }
        }
        Command::Alerts { action } => {
            let user = signed_in(&app)?;
            match action {
                AlertAction::Subscribe { locations } => {
                    subscribe_to_weather_alerts(app.users(), &user, &locations).await?;
                    println!("Subscribed to alerts for {} locations", locations.len());
                }
                AlertAction::Send {
                    location,
                    min_severity,
                } => {
                    if app.search(&location).await {
                        if let Some(data) = app.weather().cloned() {
                            let min = AlertSeverity::parse(&min_severity);
                            let sent = send_active_alerts(app.users(), &user, &data, min).await?;
                            println!("Sent {} alerts", sent);
                        }
                    }
                }
            }
        }
    }

    print_toasts(&mut app);
    Ok(())
}

fn render(app: &App, units: Option<UnitSystem>) {
    match units {
        Some(units) => match app.weather() {
            Some(data) => print_view(&WeatherView::derive(data, units), app),
            None => println!("No weather loaded"),
        },
        None => show_weather(app),
    }
}

fn signed_in(app: &App) -> Result<UserRef> {
    match app.user() {
        Some(user) => Ok(user.clone()),
        None => bail!("Please sign in first"),
    }
}
