//! Refresh orchestration.
//!
//! At most one refresh is live at a time. Issuing a new one cancels the
//! previous token, and every continuation re-checks that its token is still
//! the current one before touching shared state, so an older operation that
//! completes late can never overwrite a newer result.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::bucket::TimeBucket;
use crate::cache::{BoundedCache, FORECAST_CACHE_CAP};
use crate::client::WfsClient;
use crate::error::WeatherError;
use crate::geocode::PlaceResolver;
use crate::location::{LocationProvider, LocationRequest};
use crate::request::GetFeatureRequest;
use crate::types::{AltitudeLevel, CacheKey, Coordinate, Forecast};

/// Receives finished forecasts and human-readable progress states.
///
/// This is the renderer boundary: the data layer is done once it has handed
/// over a `Forecast` and the bucket it is valid for.
pub trait ForecastSink: Send + Sync {
    fn status(&self, status: &str);
    fn forecast(&self, forecast: &Forecast, bucket: &TimeBucket);
    fn place(&self, _label: &str) {}
}

/// Fetch parameters resolved from configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub levels: Vec<AltitudeLevel>,
    pub granularity_minutes: u32,
    pub location_request: LocationRequest,
}

struct RequestToken {
    generation: u64,
    token: CancellationToken,
}

pub struct Orchestrator {
    client: WfsClient,
    locator: Arc<dyn LocationProvider>,
    places: Option<PlaceResolver>,
    sink: Arc<dyn ForecastSink>,
    config: FetchConfig,
    cache: Mutex<BoundedCache<CacheKey, Forecast>>,
    current: Mutex<Option<RequestToken>>,
    generation: AtomicU64,
    last_applied: Mutex<Option<TimeBucket>>,
}

impl Orchestrator {
    pub fn new(
        client: WfsClient,
        locator: Arc<dyn LocationProvider>,
        places: Option<PlaceResolver>,
        sink: Arc<dyn ForecastSink>,
        config: FetchConfig,
    ) -> Self {
        Self {
            client,
            locator,
            places,
            sink,
            config,
            cache: Mutex::new(BoundedCache::new(FORECAST_CACHE_CAP)),
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
            last_applied: Mutex::new(None),
        }
    }

    /// Run one refresh cycle.
    ///
    /// A cycle superseded by a newer `refresh` abandons silently and
    /// returns `Ok`; all other failures are reported to the sink as a
    /// kind-specific status and returned. Failed results are never cached.
    pub async fn refresh(&self) -> Result<(), WeatherError> {
        let token = self.begin();
        match self.run(&token).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(generation = token.generation, "Refresh superseded");
                Ok(())
            }
            Err(e) => {
                self.sink.status(&e.status_message());
                Err(e)
            }
        }
    }

    /// Refresh unless the bucket for "now" was already applied.
    pub async fn refresh_if_stale(&self) -> Result<(), WeatherError> {
        let bucket = TimeBucket::truncate(Utc::now(), self.config.granularity_minutes);
        if self.last_applied.lock().as_ref() == Some(&bucket) {
            tracing::debug!(bucket = %bucket, "Current bucket already applied, skipping refresh");
            return Ok(());
        }
        self.refresh().await
    }

    async fn run(&self, token: &RequestToken) -> Result<(), WeatherError> {
        self.sink.status("Geolocating");
        let position = self
            .guarded(token, async {
                self.locator
                    .current_position(self.config.location_request)
                    .await
                    .map_err(WeatherError::from)
            })
            .await?;

        let coordinate = Coordinate::from_degrees(position.latitude, position.longitude);
        let bucket = TimeBucket::truncate(Utc::now(), self.config.granularity_minutes);
        let key = CacheKey {
            bucket,
            coordinate,
        };

        let cached = self.cache.lock().get(&key).cloned();
        if let Some(forecast) = cached {
            tracing::debug!(bucket = %key.bucket, "Serving forecast from cache");
            self.apply(token, &key, forecast, true).await;
            return Ok(());
        }

        self.sink.status("Loading data");
        let request = GetFeatureRequest::build(
            &key.bucket,
            coordinate,
            &self.config.levels,
            self.config.granularity_minutes,
        );
        let forecast = self.guarded(token, self.client.fetch(&request)).await?;

        self.apply(token, &key, forecast, false).await;
        Ok(())
    }

    /// Install a fresh token as current, cancelling any live predecessor.
    fn begin(&self) -> RequestToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.token.cancel();
        }
        *current = Some(RequestToken {
            generation,
            token: token.clone(),
        });

        RequestToken { generation, token }
    }

    fn is_current(&self, token: &RequestToken) -> bool {
        self.current
            .lock()
            .as_ref()
            .map_or(false, |c| c.generation == token.generation)
    }

    /// Clear the current-token pointer if it still holds this token.
    fn finish(&self, token: &RequestToken) {
        let mut current = self.current.lock();
        if current
            .as_ref()
            .map_or(false, |c| c.generation == token.generation)
        {
            *current = None;
        }
    }

    /// Apply a result: store, hand to the sink, then best-effort resolve
    /// the place label. No-op when the token has been superseded.
    async fn apply(&self, token: &RequestToken, key: &CacheKey, forecast: Forecast, from_cache: bool) {
        if !self.is_current(token) {
            return;
        }
        if !from_cache {
            self.cache.lock().put(key.clone(), forecast.clone());
        }
        self.finish(token);
        *self.last_applied.lock() = Some(key.bucket.clone());
        self.sink.forecast(&forecast, &key.bucket);

        if let Some(places) = &self.places {
            if let Some(label) = places.resolve(key.coordinate).await {
                // Stale labels are suppressed once a newer refresh starts.
                if self.generation.load(Ordering::SeqCst) == token.generation {
                    self.sink.place(&label);
                }
            }
        }
    }

    /// Race a suspension point against this token's cancellation; a
    /// superseded operation drops the inner future (best-effort transport
    /// abort) and re-checks after completion.
    async fn guarded<T>(
        &self,
        token: &RequestToken,
        fut: impl Future<Output = Result<T, WeatherError>>,
    ) -> Result<T, WeatherError> {
        tokio::select! {
            biased;
            _ = token.token.cancelled() => Err(WeatherError::Cancelled),
            result = fut => {
                if token.token.is_cancelled() {
                    Err(WeatherError::Cancelled)
                } else {
                    result
                }
            }
        }
    }
}
