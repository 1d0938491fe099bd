use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use std::{fmt, process::ExitCode, sync::Arc};
use tracing::debug;
use weather_core::{
    Config, FetchState, IpGeolocator, OpenWeatherProvider, UnitSystem, WeatherQuery,
    WeatherSession,
};

use crate::{consent::ConsentGeolocator, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a city or your location")]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Unit system: metric or imperial. Defaults to the configured one.
    #[arg(short, long, global = true)]
    pub units: Option<UnitSystem>,

    /// OpenWeather API key, overriding config file and OPENWEATHER_API_KEY.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default units.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name, optionally with country code, e.g. "Paris, FR".
        city: String,
    },

    /// Show current weather at the given coordinates.
    #[command(allow_negative_numbers = true)]
    Coords {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },

    /// Show current weather at your approximate location.
    Here {
        /// Skip the confirmation before looking up your location.
        #[arg(short, long)]
        yes: bool,
    },

    /// Search, toggle units and locate in a loop.
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search,
    Locate,
    ToggleUnits(UnitSystem),
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Search => f.write_str("Search a city"),
            Action::Locate => f.write_str("Use my location"),
            Action::ToggleUnits(target) => write!(f, "Switch to {target} units"),
            Action::Quit => f.write_str("Quit"),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let mut config = Config::load_with_env()?;
        if let Some(key) = &self.api_key {
            config.set_api_key(key.as_str());
        }
        let units = self.units.unwrap_or(config.units);

        match self.command {
            Command::Configure => {
                configure(config)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Show { city } => {
                let mut session = new_session(&config, units, false)?;
                let pending = session
                    .submit_city(&city)
                    .ok_or_else(|| anyhow!("City name must not be empty"))?;
                session.settle(pending).await;
                Ok(print_outcome(&session))
            }
            Command::Coords { lat, lon } => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(anyhow!(
                        "Invalid coordinates: latitude must be -90 to 90, longitude -180 to 180"
                    ));
                }
                let mut session = new_session(&config, units, false)?;
                let pending = session.submit(WeatherQuery::coordinates(lat, lon));
                session.settle(pending).await;
                Ok(print_outcome(&session))
            }
            Command::Here { yes } => {
                let mut session = new_session(&config, units, yes)?;
                let pending = session.locate();
                session.settle(pending).await;
                Ok(print_outcome(&session))
            }
            Command::Interactive => {
                let mut session = new_session(&config, units, false)?;
                interactive(&mut session).await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn new_session(
    config: &Config,
    units: UnitSystem,
    assume_yes: bool,
) -> anyhow::Result<WeatherSession> {
    let provider = OpenWeatherProvider::from_config(config)
        .context("Failed to initialize the weather client")?;
    let geolocator = ConsentGeolocator::new(
        IpGeolocator::new(config.geolocation_timeout()),
        assume_yes,
    );

    debug!(?provider, %units, "session ready");

    Ok(WeatherSession::new(Arc::new(provider), units).with_geolocator(Arc::new(geolocator)))
}

fn print_outcome(session: &WeatherSession) -> ExitCode {
    println!("{}", render::session(session));
    match session.state() {
        FetchState::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Get one at https://home.openweathermap.org/api_keys")
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    let starting = match config.units {
        UnitSystem::Metric => 0,
        UnitSystem::Imperial => 1,
    };
    let units = Select::new("Default units:", vec![UnitSystem::Metric, UnitSystem::Imperial])
        .with_starting_cursor(starting)
        .prompt()
        .context("Failed to read default units")?;

    config.set_api_key(api_key.trim());
    config.units = units;
    let path = config.save()?;

    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn interactive(session: &mut WeatherSession) -> anyhow::Result<()> {
    println!("{}", render::session(session));

    loop {
        let actions = vec![
            Action::Search,
            Action::Locate,
            Action::ToggleUnits(session.units().toggled()),
            Action::Quit,
        ];

        let action = match Select::new("What next?", actions).prompt() {
            Ok(action) => action,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read action"),
        };

        let pending = match action {
            Action::Search => {
                let mut prompt = Text::new("City:");
                if let Some(label) = session.query_label() {
                    prompt = prompt.with_placeholder(label);
                }
                match prompt.prompt() {
                    Ok(city) => session.submit_city(&city),
                    Err(InquireError::OperationCanceled) => None,
                    Err(err) => return Err(err).context("Failed to read city"),
                }
            }
            Action::Locate => Some(session.locate()),
            Action::ToggleUnits(_) => {
                let pending = session.toggle_units();
                println!("Units: {}", session.units());
                pending
            }
            Action::Quit => break,
        };

        if let Some(pending) = pending {
            println!("{}", render::session(session));
            session.settle(pending).await;
            println!("{}", render::session(session));
        }
    }

    Ok(())
}
