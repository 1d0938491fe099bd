//! Asks before sending the user's IP address to a geolocation service.

use async_trait::async_trait;
use inquire::{Confirm, InquireError};
use tokio::task::JoinError;
use tracing::{info, warn};
use weather_core::{Coordinates, Geolocator, WeatherError};

/// Blocking yes/no question run off the async runtime.
type ConsentPrompt = fn() -> Result<bool, InquireError>;

/// Wraps a geolocator with a yes/no prompt. Declining (or being unable to ask)
/// is reported as [`WeatherError::LocationDenied`].
pub struct ConsentGeolocator<G> {
    inner: G,
    assume_yes: bool,
    prompt: ConsentPrompt,
}

impl<G: Geolocator> ConsentGeolocator<G> {
    pub fn new(inner: G, assume_yes: bool) -> Self {
        Self {
            inner,
            assume_yes,
            prompt: confirm_lookup,
        }
    }

    #[cfg(test)]
    fn with_prompt(mut self, prompt: ConsentPrompt) -> Self {
        self.prompt = prompt;
        self
    }
}

#[async_trait]
impl<G: Geolocator> Geolocator for ConsentGeolocator<G> {
    async fn current_position(&self) -> Result<Coordinates, WeatherError> {
        if !self.assume_yes {
            let answer = tokio::task::spawn_blocking(self.prompt).await;
            if !consent_from_answer(answer)? {
                info!("user declined location lookup");
                return Err(WeatherError::LocationDenied);
            }
        }
        self.inner.current_position().await
    }
}

fn confirm_lookup() -> Result<bool, InquireError> {
    Confirm::new("Look up your approximate location from your IP address?")
        .with_default(true)
        .with_help_message("Sends a request to ip-api.com. Pass --yes to skip this question.")
        .prompt()
}

/// `Ok(false)` when the user said no or could not be asked at all.
fn consent_from_answer(
    answer: Result<Result<bool, InquireError>, JoinError>,
) -> Result<bool, WeatherError> {
    match answer {
        Ok(Ok(yes)) => Ok(yes),
        Ok(Err(
            InquireError::NotTTY
            | InquireError::OperationCanceled
            | InquireError::OperationInterrupted,
        )) => Ok(false),
        Ok(Err(err)) => {
            warn!(error = %err, "could not ask for location consent");
            Err(WeatherError::LocationUnavailable)
        }
        Err(err) => {
            warn!(error = %err, "consent prompt task failed");
            Err(WeatherError::LocationUnavailable)
        }
    }
}
