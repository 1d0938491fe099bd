//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather current-conditions client and its HTTP seam
//! - Icon selection from condition code and temperature
//! - The fetch session that owns the single displayed result
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geolocation;
pub mod icon;
pub mod model;
pub mod provider;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::{ErrorKind, WeatherError};
pub use geolocation::{Geolocator, IpGeolocator};
pub use icon::{IconId, select_icon};
pub use model::{Coordinates, FetchState, UnitSystem, WeatherQuery, WeatherResult};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use session::{CompletedFetch, PendingFetch, RequestSeq, WeatherSession};
pub use transport::{HttpReply, HttpTransport, ReqwestTransport};
