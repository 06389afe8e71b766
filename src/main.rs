use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use aloft_core::Config;
use aloft_weather::{
    param, AltitudeLevel, FetchConfig, FixedLocation, Forecast, ForecastSink, LocationRequest,
    Orchestrator, ParameterMap, PlaceResolver, RefreshScheduler, TimeBucket, WeatherService,
    WfsClient,
};

/// Terminal renderer: prints the forecast as a table, top level first.
struct TableSink;

fn cell(map: &ParameterMap, name: &str) -> String {
    map.get(name)
        .map_or_else(|| "-".to_string(), |v| format!("{:.0}", v))
}

impl ForecastSink for TableSink {
    fn status(&self, status: &str) {
        println!("{}", status);
    }

    fn forecast(&self, forecast: &Forecast, bucket: &TimeBucket) {
        println!("Forecast for {}", bucket);
        println!(
            "{:>6}  {:>5}  {:>5}  {:>4}  {:>6}  {:>5}",
            "height", "temp", "wind", "dir", "cloud", "gust"
        );
        for (level, map) in forecast.levels.iter().rev() {
            let cloud = if map.contains_key(param::LOW_CLOUD_COVER) {
                cell(map, param::LOW_CLOUD_COVER)
            } else {
                cell(map, param::MEDIUM_CLOUD_COVER)
            };
            println!(
                "{:>6}  {:>5}  {:>5}  {:>4}  {:>6}  {:>5}",
                level.as_meters(),
                cell(map, param::TEMPERATURE),
                cell(map, param::WIND_SPEED_MS),
                cell(map, param::WIND_DIRECTION),
                cloud,
                cell(map, param::WIND_GUST),
            );
        }
    }

    fn place(&self, label: &str) {
        println!("Location: {}", label);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    aloft_core::init()?;

    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let (latitude, longitude) = match (config.location.latitude, config.location.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => bail!("No location configured; set location.latitude and location.longitude"),
    };

    let client = WfsClient::new(&config.weather.endpoint_url)?;
    let places = PlaceResolver::new(&config.weather.geocode_url)?;
    let locator = Arc::new(FixedLocation::new(latitude, longitude));
    let sink = Arc::new(TableSink);

    let fetch = FetchConfig {
        levels: config
            .weather
            .levels
            .iter()
            .map(|m| AltitudeLevel::meters(*m))
            .collect(),
        granularity_minutes: config.weather.granularity_minutes,
        location_request: LocationRequest {
            maximum_age: Duration::from_secs(config.location.maximum_age_secs),
            high_accuracy: config.location.high_accuracy,
        },
    };

    let orchestrator = Arc::new(Orchestrator::new(client, locator, Some(places), sink, fetch));
    let scheduler = RefreshScheduler::new(
        config.weather.granularity_minutes,
        config.weather.jitter_secs,
    );
    let service = WeatherService::new(orchestrator, scheduler);

    service.start();
    tracing::info!("Aloft started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    service.stop().await;

    Ok(())
}
