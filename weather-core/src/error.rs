use thiserror::Error;

/// Why a single lookup failed. None of these are fatal; the user can always retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error(
        "No API key configured.\n\
         Hint: run `weather configure` or set OPENWEATHER_API_KEY."
    )]
    MissingCredential,

    #[error("API key invalid or not yet activated")]
    Unauthorized,

    #[error("City not found")]
    NotFound,

    #[error("Too many requests to the weather service, try again later")]
    RateLimited,

    #[error("Weather service rejected the request because of its own configuration (code 500000)")]
    ProviderMisconfigured,

    #[error("Weather service returned an incomplete response")]
    MalformedResponse,

    #[error("Location is not available on this device")]
    LocationUnavailable,

    #[error("Location access was denied or timed out")]
    LocationDenied,

    #[error("{0}")]
    Unknown(String),
}

/// Fieldless discriminant of [`WeatherError`], handy for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingCredential,
    Unauthorized,
    NotFound,
    RateLimited,
    ProviderMisconfigured,
    MalformedResponse,
    LocationUnavailable,
    LocationDenied,
    Unknown,
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::MissingCredential => ErrorKind::MissingCredential,
            WeatherError::Unauthorized => ErrorKind::Unauthorized,
            WeatherError::NotFound => ErrorKind::NotFound,
            WeatherError::RateLimited => ErrorKind::RateLimited,
            WeatherError::ProviderMisconfigured => ErrorKind::ProviderMisconfigured,
            WeatherError::MalformedResponse => ErrorKind::MalformedResponse,
            WeatherError::LocationUnavailable => ErrorKind::LocationUnavailable,
            WeatherError::LocationDenied => ErrorKind::LocationDenied,
            WeatherError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}
