use std::collections::BTreeMap;
use std::sync::Arc;

use time::{Date, Duration};

use crate::db::{parse_iso_date, ClimateData, Error, TemperatureStats};

/// The fixed query surface, in the order it is advertised on the index page.
const ROUTES: &[&str] = &[
    "/api/v1.0/precipitation",
    "/api/v1.0/stations",
    "/api/v1.0/tobs",
    "/api/v1.0/{start}",
    "/api/v1.0/{start}/{end}",
];

/// Static enumeration of the five answerable endpoint shapes.
pub fn list_routes() -> &'static [&'static str] {
    ROUTES
}

/// The 365-day span ending at `end`, as `(window_start, window_end)`.
///
/// Fixed 365-day offset, never a calendar-year offset, so the window width
/// is identical across leap years.
pub fn year_window(end: Date) -> (Date, Date) {
    (end.saturating_sub(Duration::days(365)), end)
}

/// Facade over the climate dataset answering the five fixed query shapes.
///
/// Holds no state beyond the data-source handle; every operation is a pure
/// function of the stored data and its parameters.
#[derive(Clone)]
pub struct ClimateQueryService {
    db: Arc<dyn ClimateData>,
}

impl ClimateQueryService {
    pub fn new(db: Arc<dyn ClimateData>) -> Self {
        Self { db }
    }

    /// Precipitation by date for the 365 days ending at the latest recorded
    /// date.
    pub async fn precipitation(&self) -> Result<BTreeMap<String, Option<f64>>, Error> {
        let latest = self.db.latest_date().await?;
        let (window_start, _) = year_window(latest);
        self.db.precipitation_series(window_start).await
    }

    /// Station ids referenced by the measurement table, in scan order.
    pub async fn stations(&self) -> Result<Vec<String>, Error> {
        let ids = self.db.station_ids().await?;
        if ids.is_empty() {
            return Err(Error::EmptyDataset);
        }
        Ok(ids)
    }

    /// Temperature observations from the most active station over the last
    /// recorded year. An active station with no observations in the window
    /// yields an empty series, not an error.
    pub async fn temperature_observations(&self) -> Result<Vec<f64>, Error> {
        let latest = self.db.latest_date().await?;
        let (window_start, _) = year_window(latest);
        let station = self.db.most_active_station().await?;
        self.db.temperature_series(&station, window_start).await
    }

    /// Min/avg/max temperature for all measurements on or after `start`.
    pub async fn temperature_stats_from(&self, start: &str) -> Result<TemperatureStats, Error> {
        let start = parse_iso_date(start)?;
        self.db.temperature_stats(start, None).await
    }

    /// Min/avg/max temperature for all measurements between `start` and
    /// `end` inclusive. An inverted range is rejected up front rather than
    /// silently matching nothing.
    pub async fn temperature_stats_range(
        &self,
        start: &str,
        end: &str,
    ) -> Result<TemperatureStats, Error> {
        let start = parse_iso_date(start)?;
        let end = parse_iso_date(end)?;
        if end < start {
            return Err(Error::InvalidRange { start, end });
        }
        self.db.temperature_stats(start, Some(end)).await
    }
}
