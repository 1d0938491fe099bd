//! Where the user is, when they ask for "weather here".

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{
    error::WeatherError,
    model::Coordinates,
    transport::{HttpTransport, ReqwestTransport},
};

#[cfg(test)]
use mockall::automock;

pub const IP_API_URL: &str = "http://ip-api.com/json";

/// Host capability that reports the current position.
///
/// Implementations report [`WeatherError::LocationUnavailable`] when they cannot
/// produce a position at all and [`WeatherError::LocationDenied`] when the user
/// declined or the lookup timed out.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, WeatherError>;
}

/// Approximate position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpGeolocator<T = ReqwestTransport> {
    url: String,
    timeout: Option<Duration>,
    transport: T,
}

impl IpGeolocator {
    /// `None` waits as long as the transport does.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_transport(ReqwestTransport::new(), timeout)
    }
}

impl<T: HttpTransport> IpGeolocator<T> {
    pub fn with_transport(transport: T, timeout: Option<Duration>) -> Self {
        Self {
            url: IP_API_URL.to_string(),
            timeout,
            transport,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[async_trait]
impl<T: HttpTransport> Geolocator for IpGeolocator<T> {
    #[instrument(skip_all)]
    async fn current_position(&self) -> Result<Coordinates, WeatherError> {
        debug!(url = %self.url, "looking up position from IP");
        let params = [("fields".to_string(), "status,message,lat,lon".to_string())];

        let lookup = self.transport.get(&self.url, &params);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, lookup).await,
            None => Ok(lookup.await),
        };
        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(error = %err, "IP geolocation lookup failed");
                return Err(WeatherError::LocationUnavailable);
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "IP geolocation lookup timed out");
                return Err(WeatherError::LocationDenied);
            }
        };

        if !reply.is_success() {
            warn!(status = reply.status, "IP geolocation service refused the lookup");
            return Err(WeatherError::LocationUnavailable);
        }

        let parsed: IpApiResponse =
            serde_json::from_str(&reply.body).map_err(|_| WeatherError::LocationUnavailable)?;

        match (parsed.status.as_str(), parsed.lat, parsed.lon) {
            ("success", Some(lat), Some(lon)) => {
                debug!(lat, lon, "resolved position from IP");
                Ok(Coordinates { lat, lon })
            }
            _ => {
                warn!(message = ?parsed.message, "IP geolocation returned no position");
                Err(WeatherError::LocationUnavailable)
            }
        }
    }
}
