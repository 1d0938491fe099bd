use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::WeatherError,
    model::{UnitSystem, WeatherQuery, WeatherResult},
};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// A source of current weather conditions.
///
/// One call is one attempt: implementations must not retry.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(
        &self,
        query: &WeatherQuery,
        units: UnitSystem,
    ) -> Result<WeatherResult, WeatherError>;
}
