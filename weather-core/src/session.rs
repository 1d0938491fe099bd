//! Fetch orchestration around a single [`FetchState`].
//!
//! Every user action that needs the network returns a [`PendingFetch`]: a
//! self-contained request tagged with a sequence number. The caller drives it
//! to completion and hands the [`CompletedFetch`] back to the session, which
//! applies it only if no newer request has been issued since. This keeps the
//! session usable while requests are in flight and makes the displayed state
//! always follow the most recently *issued* request.

use std::{fmt, sync::Arc};
use tracing::debug;

use crate::{
    error::WeatherError,
    geolocation::Geolocator,
    model::{FetchState, UnitSystem, WeatherQuery, WeatherResult},
    provider::WeatherProvider,
};

/// Monotonically increasing request number, unique within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestSeq(u64);

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Job {
    Query(WeatherQuery),
    Locate(Option<Arc<dyn Geolocator>>),
}

/// An issued request that has not run yet.
pub struct PendingFetch {
    seq: RequestSeq,
    units: UnitSystem,
    job: Job,
    provider: Arc<dyn WeatherProvider>,
}

impl PendingFetch {
    pub fn seq(&self) -> RequestSeq {
        self.seq
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// The query being fetched, or `None` while the position is still unknown.
    pub fn query(&self) -> Option<&WeatherQuery> {
        match &self.job {
            Job::Query(query) => Some(query),
            Job::Locate(_) => None,
        }
    }

    /// Perform the request. Exactly one provider call at most, never retried.
    pub async fn run(self) -> CompletedFetch {
        let PendingFetch { seq, units, job, provider } = self;

        let (query, located, outcome) = match job {
            Job::Query(query) => {
                let outcome = provider.current(&query, units).await;
                (Some(query), false, outcome)
            }
            Job::Locate(None) => (None, true, Err(WeatherError::LocationUnavailable)),
            Job::Locate(Some(geolocator)) => match geolocator.current_position().await {
                Ok(position) => {
                    let query = WeatherQuery::from(position);
                    let outcome = provider.current(&query, units).await;
                    (Some(query), true, outcome)
                }
                Err(err) => (None, true, Err(err)),
            },
        };

        CompletedFetch { seq, query, located, outcome }
    }
}

impl fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("seq", &self.seq)
            .field("units", &self.units)
            .field("query", &self.query())
            .finish_non_exhaustive()
    }
}

/// Outcome of a [`PendingFetch`], waiting to be applied to its session.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedFetch {
    seq: RequestSeq,
    query: Option<WeatherQuery>,
    located: bool,
    outcome: Result<WeatherResult, WeatherError>,
}

impl CompletedFetch {
    pub fn seq(&self) -> RequestSeq {
        self.seq
    }

    pub fn outcome(&self) -> &Result<WeatherResult, WeatherError> {
        &self.outcome
    }

    /// Resolved place name of a successful geolocation lookup.
    pub fn place_name(&self) -> Option<&str> {
        match (&self.outcome, self.located) {
            (Ok(result), true) => Some(result.location.as_str()),
            _ => None,
        }
    }
}

/// Owner of the one [`FetchState`] the UI renders.
pub struct WeatherSession {
    provider: Arc<dyn WeatherProvider>,
    geolocator: Option<Arc<dyn Geolocator>>,
    units: UnitSystem,
    query: Option<WeatherQuery>,
    query_label: Option<String>,
    state: FetchState,
    latest: RequestSeq,
}

impl WeatherSession {
    pub fn new(provider: Arc<dyn WeatherProvider>, units: UnitSystem) -> Self {
        Self {
            provider,
            geolocator: None,
            units,
            query: None,
            query_label: None,
            state: FetchState::Idle,
            latest: RequestSeq::default(),
        }
    }

    /// Enable "weather here". Without a geolocator, [`Self::locate`] fails with
    /// [`WeatherError::LocationUnavailable`].
    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = Some(geolocator);
        self
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// The query that unit changes re-fetch.
    pub fn query(&self) -> Option<&WeatherQuery> {
        self.query.as_ref()
    }

    /// Text describing the active query: the city as typed, or the place name
    /// resolved from the user's position.
    pub fn query_label(&self) -> Option<&str> {
        self.query_label.as_deref()
    }

    pub fn latest_seq(&self) -> RequestSeq {
        self.latest
    }

    pub fn submit(&mut self, query: WeatherQuery) -> PendingFetch {
        self.query_label = Some(query.to_string());
        self.query = Some(query.clone());
        self.begin(Job::Query(query))
    }

    /// Submit a city name as typed. Blank input is ignored.
    pub fn submit_city(&mut self, name: &str) -> Option<PendingFetch> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(self.submit(WeatherQuery::city(name)))
    }

    /// Look up the user's position, then the weather there.
    pub fn locate(&mut self) -> PendingFetch {
        // the place is unknown until the lookup resolves
        self.query_label = None;
        let geolocator = self.geolocator.clone();
        self.begin(Job::Locate(geolocator))
    }

    pub fn toggle_units(&mut self) -> Option<PendingFetch> {
        self.set_units(self.units.toggled())
    }

    /// Change the unit system. While a result is shown, the same query is
    /// fetched again in the new units; otherwise only the preference changes.
    pub fn set_units(&mut self, units: UnitSystem) -> Option<PendingFetch> {
        if units == self.units {
            return None;
        }
        self.units = units;

        if !matches!(self.state, FetchState::Success(_)) {
            return None;
        }
        let query = self.query.clone()?;
        Some(self.begin(Job::Query(query)))
    }

    /// Apply a finished request. Returns `false` if a newer request has been
    /// issued since, in which case the state is left untouched.
    pub fn complete(&mut self, done: CompletedFetch) -> bool {
        if done.seq != self.latest {
            debug!(stale = %done.seq, latest = %self.latest, "discarding superseded response");
            return false;
        }

        match done.outcome {
            Ok(result) => {
                if done.located {
                    self.query = done.query;
                    self.query_label = Some(result.location.clone());
                }
                self.state = FetchState::Success(result);
            }
            Err(err) => {
                debug!(seq = %done.seq, error = %err, "request failed");
                if done.located && self.query_label.is_none() {
                    self.query_label = self.query.as_ref().map(ToString::to_string);
                }
                self.state = FetchState::Failed(err);
            }
        }

        true
    }

    /// Run a pending request to completion and apply it.
    pub async fn settle(&mut self, pending: PendingFetch) -> &FetchState {
        let done = pending.run().await;
        self.complete(done);
        &self.state
    }

    fn begin(&mut self, job: Job) -> PendingFetch {
        self.latest = RequestSeq(self.latest.0 + 1);
        self.state = FetchState::Loading;
        debug!(seq = %self.latest, units = %self.units, "request issued");

        PendingFetch {
            seq: self.latest,
            units: self.units,
            job,
            provider: Arc::clone(&self.provider),
        }
    }
}

impl fmt::Debug for WeatherSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherSession")
            .field("provider", &self.provider)
            .field("has_geolocator", &self.geolocator.is_some())
            .field("units", &self.units)
            .field("query", &self.query)
            .field("state", &self.state)
            .field("latest", &self.latest)
            .finish()
    }
}
