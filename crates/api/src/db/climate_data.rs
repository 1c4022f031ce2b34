use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};
use utoipa::ToSchema;

/// Calendar-date format used throughout the dataset (`YYYY-MM-DD`).
///
/// ISO form guarantees that lexical order on the stored text column equals
/// chronological order, so date filters bind plain strings.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no measurements recorded in the dataset")]
    EmptyDataset,
    #[error("no measurements match the requested date filter")]
    EmptyResultSet,
    #[error("end date {end} precedes start date {start}")]
    InvalidRange { start: Date, end: Date },
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDateFormat(String),
    #[error("failed to query sqlite: {0}")]
    Query(#[from] sqlx::Error),
    #[error("failed to parse stored date: {0}")]
    DateParse(#[from] time::error::Parse),
    #[error("failed to format date: {0}")]
    DateFormat(#[from] time::error::Format),
}

/// Parse a caller-supplied date path parameter.
///
/// Malformed input becomes [`Error::InvalidDateFormat`] instead of flowing
/// into a filter predicate as an opaque string.
pub fn parse_iso_date(input: &str) -> Result<Date, Error> {
    Date::parse(input, DATE_FORMAT).map_err(|_| Error::InvalidDateFormat(input.to_string()))
}

/// One daily observation row from the `measurement` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Measurement {
    pub station: String,
    pub date: String,
    pub prcp: Option<f64>,
    pub tobs: f64,
}

/// Min/avg/max temperature over a date-filtered subset of measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl TemperatureStats {
    /// The wire shape is a bare `[min, avg, max]` array.
    pub fn as_triple(&self) -> [f64; 3] {
        [self.min, self.avg, self.max]
    }
}

#[async_trait]
pub trait ClimateData: Send + Sync {
    /// Maximum `measurement.date` across all rows.
    async fn latest_date(&self) -> Result<Date, Error>;
    /// Station id with the highest measurement count.
    async fn most_active_station(&self) -> Result<String, Error>;
    /// Station ids referenced by `measurement`, in scan order, undeduplicated.
    async fn station_ids(&self) -> Result<Vec<String>, Error>;
    /// Date-keyed precipitation values for all rows with `date >= date_gte`.
    async fn precipitation_series(
        &self,
        date_gte: Date,
    ) -> Result<BTreeMap<String, Option<f64>>, Error>;
    /// Raw temperature observations for one station with `date >= date_gte`,
    /// in scan order.
    async fn temperature_series(&self, station_id: &str, date_gte: Date)
        -> Result<Vec<f64>, Error>;
    /// Min/avg/max temperature over `date >= date_gte` and, when given,
    /// `date <= date_lte`.
    async fn temperature_stats(
        &self,
        date_gte: Date,
        date_lte: Option<Date>,
    ) -> Result<TemperatureStats, Error>;
}

/// [`ClimateData`] backed by the read-only SQLite pool.
pub struct ClimateAccess {
    pool: SqlitePool,
}

impl ClimateAccess {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClimateData for ClimateAccess {
    async fn latest_date(&self) -> Result<Date, Error> {
        let latest: Option<String> = sqlx::query_scalar("SELECT MAX(date) FROM measurement")
            .fetch_one(&self.pool)
            .await?;

        let raw = latest.ok_or(Error::EmptyDataset)?;
        Ok(Date::parse(&raw, DATE_FORMAT)?)
    }

    async fn most_active_station(&self) -> Result<String, Error> {
        // Ties resolve to whichever group the store yields first; callers
        // must not read meaning into the winner beyond determinism.
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT station, COUNT(station) AS observations
             FROM measurement
             GROUP BY station
             ORDER BY observations DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let (station, observations) = row.ok_or(Error::EmptyDataset)?;
        debug!(
            "most active station: {} ({} observations)",
            station, observations
        );
        Ok(station)
    }

    async fn station_ids(&self) -> Result<Vec<String>, Error> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT station FROM measurement")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn precipitation_series(
        &self,
        date_gte: Date,
    ) -> Result<BTreeMap<String, Option<f64>>, Error> {
        let start = date_gte.format(DATE_FORMAT)?;
        let rows: Vec<Measurement> = sqlx::query_as(
            "SELECT station, date, prcp, tobs FROM measurement WHERE date >= ?",
        )
        .bind(&start)
        .fetch_all(&self.pool)
        .await?;

        // When several stations report the same date, the later row in scan
        // order overwrites the earlier one. Inherited upstream behavior,
        // kept for compatibility (see DESIGN.md).
        let mut series = BTreeMap::new();
        for row in rows {
            series.insert(row.date, row.prcp);
        }
        Ok(series)
    }

    async fn temperature_series(
        &self,
        station_id: &str,
        date_gte: Date,
    ) -> Result<Vec<f64>, Error> {
        let start = date_gte.format(DATE_FORMAT)?;
        let observations: Vec<f64> = sqlx::query_scalar(
            "SELECT tobs FROM measurement WHERE station = ? AND date >= ?",
        )
        .bind(station_id)
        .bind(&start)
        .fetch_all(&self.pool)
        .await?;
        Ok(observations)
    }

    async fn temperature_stats(
        &self,
        date_gte: Date,
        date_lte: Option<Date>,
    ) -> Result<TemperatureStats, Error> {
        let start = date_gte.format(DATE_FORMAT)?;

        let (min, avg, max, matched): (Option<f64>, Option<f64>, Option<f64>, i64) =
            match date_lte {
                Some(end) => {
                    sqlx::query_as(
                        "SELECT MIN(tobs), AVG(tobs), MAX(tobs), COUNT(tobs)
                         FROM measurement WHERE date >= ? AND date <= ?",
                    )
                    .bind(&start)
                    .bind(end.format(DATE_FORMAT)?)
                    .fetch_one(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as(
                        "SELECT MIN(tobs), AVG(tobs), MAX(tobs), COUNT(tobs)
                         FROM measurement WHERE date >= ?",
                    )
                    .bind(&start)
                    .fetch_one(&self.pool)
                    .await?
                }
            };

        // The average of zero rows is undefined; signal it instead of
        // handing back NULL-turned-zero aggregates.
        if matched == 0 {
            return Err(Error::EmptyResultSet);
        }

        Ok(TemperatureStats {
            min: min.ok_or(Error::EmptyResultSet)?,
            avg: avg.ok_or(Error::EmptyResultSet)?,
            max: max.ok_or(Error::EmptyResultSet)?,
        })
    }
}
