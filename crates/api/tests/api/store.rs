use climate_api::{ClimateAccess, ClimateData, Error};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tempfile::TempDir;
use time::macros::date;

/// One seed row for the measurement table: (station, date, prcp, tobs)
type SeedRow = (&'static str, &'static str, Option<f64>, f64);

/// Create a throwaway SQLite dataset with the two-table schema and the
/// given measurement rows, in insertion order.
async fn seed_store(rows: &[SeedRow]) -> (TempDir, ClimateAccess) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("climate.sqlite");

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .expect("invalid sqlite options")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open sqlite pool");

    sqlx::query(
        "CREATE TABLE measurement (
            id INTEGER PRIMARY KEY,
            station TEXT NOT NULL,
            date TEXT NOT NULL,
            prcp REAL,
            tobs REAL NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .expect("failed to create measurement table");

    sqlx::query(
        "CREATE TABLE station (
            id INTEGER PRIMARY KEY,
            station TEXT NOT NULL,
            name TEXT,
            latitude REAL,
            longitude REAL,
            elevation REAL
        )",
    )
    .execute(&pool)
    .await
    .expect("failed to create station table");

    for (station, day, prcp, tobs) in rows {
        sqlx::query("INSERT INTO measurement (station, date, prcp, tobs) VALUES (?, ?, ?, ?)")
            .bind(station)
            .bind(day)
            .bind(prcp)
            .bind(tobs)
            .execute(&pool)
            .await
            .expect("failed to insert measurement");
    }

    (dir, ClimateAccess::new(pool))
}

/// Test that the latest date is the maximum over all rows regardless of
/// insertion order
#[tokio::test]
async fn latest_date_is_the_maximum_recorded() {
    let (_dir, store) = seed_store(&[
        ("A", "2017-03-01", Some(0.1), 70.0),
        ("B", "2017-08-23", None, 75.0),
        ("A", "2016-12-31", Some(0.0), 65.0),
    ])
    .await;

    assert_eq!(store.latest_date().await.unwrap(), date!(2017 - 08 - 23));
}

/// Test that an empty measurement table reports an empty dataset
#[tokio::test]
async fn latest_date_on_empty_table_is_empty_dataset() {
    let (_dir, store) = seed_store(&[]).await;

    assert!(matches!(
        store.latest_date().await,
        Err(Error::EmptyDataset)
    ));
}

/// Test that the most active station wins by measurement count
#[tokio::test]
async fn most_active_station_wins_by_count() {
    let mut rows: Vec<SeedRow> = Vec::new();
    for day in ["2017-01-01", "2017-01-02", "2017-01-03", "2017-01-04"] {
        rows.push(("USC00519281", day, Some(0.02), 71.0));
    }
    rows.push(("USC00513117", "2017-01-01", None, 73.0));
    rows.push(("USC00513117", "2017-01-02", None, 74.0));

    let (_dir, store) = seed_store(&rows).await;

    assert_eq!(store.most_active_station().await.unwrap(), "USC00519281");
}

/// Test that an empty table has no most active station
#[tokio::test]
async fn most_active_station_on_empty_table_is_empty_dataset() {
    let (_dir, store) = seed_store(&[]).await;

    assert!(matches!(
        store.most_active_station().await,
        Err(Error::EmptyDataset)
    ));
}

/// Test that the precipitation series filters by start date and keeps the
/// later row when two stations share a date
#[tokio::test]
async fn precipitation_series_filters_and_keeps_last_row_per_date() {
    let (_dir, store) = seed_store(&[
        ("A", "2016-12-31", Some(0.5), 68.0),
        ("A", "2017-01-01", Some(0.1), 70.0),
        ("B", "2017-01-01", Some(0.3), 72.0),
        ("A", "2017-01-02", None, 71.0),
    ])
    .await;

    let series = store
        .precipitation_series(date!(2017 - 01 - 01))
        .await
        .unwrap();

    assert_eq!(series.len(), 2);
    // Shared date resolves to the later row in scan order
    assert_eq!(series.get("2017-01-01"), Some(&Some(0.3)));
    assert_eq!(series.get("2017-01-02"), Some(&None));
    assert!(!series.contains_key("2016-12-31"));
}

/// Test that the temperature series is scoped to one station and the
/// start date, in scan order
#[tokio::test]
async fn temperature_series_scopes_station_and_start_date() {
    let (_dir, store) = seed_store(&[
        ("A", "2016-12-31", None, 60.0),
        ("A", "2017-01-01", None, 64.0),
        ("B", "2017-01-01", None, 99.0),
        ("A", "2017-01-02", None, 62.0),
    ])
    .await;

    let series = store
        .temperature_series("A", date!(2017 - 01 - 01))
        .await
        .unwrap();

    assert_eq!(series, vec![64.0, 62.0]);
}

/// Test that temperature stats aggregate across all stations and satisfy
/// min <= avg <= max
#[tokio::test]
async fn temperature_stats_combine_stations() {
    let (_dir, store) = seed_store(&[
        ("A", "2017-06-01", None, 60.0),
        ("A", "2017-06-02", None, 80.0),
        ("B", "2017-06-02", None, 70.0),
    ])
    .await;

    let stats = store
        .temperature_stats(date!(2017 - 06 - 01), None)
        .await
        .unwrap();

    assert_eq!(stats.min, 60.0);
    assert_eq!(stats.max, 80.0);
    assert_eq!(stats.avg, 70.0);
    assert!(stats.min <= stats.avg && stats.avg <= stats.max);
}

/// Test that a closed range excludes rows on either side of the bounds
#[tokio::test]
async fn closed_range_stats_exclude_rows_outside_bounds() {
    let (_dir, store) = seed_store(&[
        ("A", "2017-05-31", None, 40.0),
        ("A", "2017-06-01", None, 60.0),
        ("A", "2017-06-30", None, 75.0),
        ("A", "2017-07-01", None, 95.0),
    ])
    .await;

    let stats = store
        .temperature_stats(date!(2017 - 06 - 01), Some(date!(2017 - 06 - 30)))
        .await
        .unwrap();

    assert_eq!(stats.min, 60.0);
    assert_eq!(stats.max, 75.0);
    assert_eq!(stats.avg, 67.5);
}

/// Test that a well-formed filter matching nothing is an empty result set
#[tokio::test]
async fn stats_beyond_the_data_are_an_empty_result_set() {
    let (_dir, store) = seed_store(&[("A", "2017-06-01", None, 60.0)]).await;

    assert!(matches!(
        store.temperature_stats(date!(2050 - 01 - 01), None).await,
        Err(Error::EmptyResultSet)
    ));
}

/// Test that repeated identical queries against an unchanged dataset give
/// identical results
#[tokio::test]
async fn queries_are_idempotent_against_an_unchanged_dataset() {
    let (_dir, store) = seed_store(&[
        ("A", "2017-06-01", Some(0.2), 60.0),
        ("B", "2017-06-02", None, 80.0),
    ])
    .await;

    let first = store
        .precipitation_series(date!(2017 - 06 - 01))
        .await
        .unwrap();
    let second = store
        .precipitation_series(date!(2017 - 06 - 01))
        .await
        .unwrap();
    assert_eq!(first, second);

    assert_eq!(
        store.most_active_station().await.unwrap(),
        store.most_active_station().await.unwrap()
    );
}
