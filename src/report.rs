//! End-to-end analysis over both catalogs.
//!
//! Loads and cleans each market, then builds the tables used to pick app
//! profiles: genre shares, Google Play category and install-bucket shares,
//! average App Store rating count per genre and average Google Play
//! installs per category.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::clean::{CleanSummary, clean};
use crate::config::{Config, Field, Market, MarketConfig};
use crate::dataset::Dataset;
use crate::stats::{GroupAverage, Numeric, TableEntry, display_table, group_averages};

/// A ranked frequency table with what it was built from.
#[derive(Debug, Serialize)]
pub struct NamedTable {
    pub market: Market,
    pub column: String,
    pub entries: Vec<TableEntry>,
}

/// Per-group averages with what they were built from.
#[derive(Debug, Serialize)]
pub struct NamedAverages {
    pub market: Market,
    pub group_by: String,
    pub value: String,
    pub groups: Vec<GroupAverage>,
}

/// Cleaning outcome for one market.
#[derive(Debug, Serialize)]
pub struct MarketSummary {
    pub market: Market,
    pub rows: CleanSummary,
}

/// Full analysis result, serialized as the `report --json` document.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub cleaning: Vec<MarketSummary>,
    pub tables: Vec<NamedTable>,
    pub averages: Vec<NamedAverages>,
}

/// Loads the raw catalog of `market`.
pub fn load_market(market: Market, config: &MarketConfig) -> Result<Dataset> {
    Dataset::load(&market.to_string(), &config.path)
}

/// Loads and cleans the catalog of `market`.
pub fn load_clean(market: Market, config: &MarketConfig) -> Result<(Dataset, CleanSummary)> {
    let raw = load_market(market, config)?;
    clean(market, raw, config)
}

/// Ranked frequency table of `field` in a cleaned dataset.
pub fn field_table(
    market: Market,
    dataset: &Dataset,
    config: &MarketConfig,
    field: Field,
) -> Result<NamedTable> {
    let index = config.columns.position(market, field)?;
    Ok(NamedTable {
        market,
        column: dataset.column_name(index).to_string(),
        entries: display_table(dataset, index)?,
    })
}

/// Averages used to compare genres or categories by popularity: rating
/// count per genre on the App Store, installs per category on Google Play.
pub fn popularity_averages(
    market: Market,
    dataset: &Dataset,
    config: &MarketConfig,
) -> Result<NamedAverages> {
    let columns = &config.columns;
    let (key, value, numeric) = match market {
        Market::AppStore => (
            columns.position(market, Field::Genre)?,
            columns.position(market, Field::RatingCount)?,
            Numeric::Plain,
        ),
        Market::GooglePlay => (
            columns.position(market, Field::Category)?,
            columns.position(market, Field::Installs)?,
            Numeric::Installs,
        ),
    };
    Ok(NamedAverages {
        market,
        group_by: dataset.column_name(key).to_string(),
        value: dataset.column_name(value).to_string(),
        groups: group_averages(dataset, key, value, numeric)?,
    })
}

/// Builds the report from already cleaned datasets.
pub fn build_report(
    config: &Config,
    google_play: (&Dataset, CleanSummary),
    app_store: (&Dataset, CleanSummary),
) -> Result<Report> {
    let (android, android_summary) = google_play;
    let (ios, ios_summary) = app_store;
    let gp = config.market(Market::GooglePlay);
    let ios_config = config.market(Market::AppStore);

    let tables = vec![
        field_table(Market::AppStore, ios, ios_config, Field::Genre)?,
        field_table(Market::GooglePlay, android, gp, Field::Genre)?,
        field_table(Market::GooglePlay, android, gp, Field::Category)?,
        field_table(Market::GooglePlay, android, gp, Field::Installs)?,
    ];
    let averages = vec![
        popularity_averages(Market::AppStore, ios, ios_config)?,
        popularity_averages(Market::GooglePlay, android, gp)?,
    ];

    Ok(Report {
        generated_at: Utc::now(),
        cleaning: vec![
            MarketSummary {
                market: Market::GooglePlay,
                rows: android_summary,
            },
            MarketSummary {
                market: Market::AppStore,
                rows: ios_summary,
            },
        ],
        tables,
        averages,
    })
}

/// Loads, cleans and analyzes both markets.
#[tracing::instrument(skip(config))]
pub fn run(config: &Config) -> Result<Report> {
    let (android, android_summary) =
        load_clean(Market::GooglePlay, config.market(Market::GooglePlay))?;
    let (ios, ios_summary) = load_clean(Market::AppStore, config.market(Market::AppStore))?;

    let report = build_report(
        config,
        (&android, android_summary),
        (&ios, ios_summary),
    )?;
    info!(
        tables = report.tables.len(),
        averages = report.averages.len(),
        "Report built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn app_store() -> Dataset {
        let mut header = row(&["id", "track_name", "size_bytes", "currency", "price"]);
        header.extend(row(&[
            "rating_count_tot",
            "rating_count_ver",
            "user_rating",
            "user_rating_ver",
            "ver",
            "cont_rating",
            "prime_genre",
        ]));
        let app = |name: &str, ratings: &str, genre: &str| {
            row(&["1", name, "100", "USD", "0.0", ratings, "0", "4.5", "4.5", "1.0", "4+", genre])
        };
        Dataset::new(
            "App Store",
            header,
            vec![app("A", "100", "Games"), app("B", "300", "Games"), app("C", "50", "Music")],
        )
    }

    #[test]
    fn test_field_table_uses_header_name() {
        let config = MarketConfig::app_store();
        let table = field_table(Market::AppStore, &app_store(), &config, Field::Genre).unwrap();
        assert_eq!(table.column, "prime_genre");
        assert_eq!(table.entries[0].value, "Games");
    }

    #[test]
    fn test_app_store_popularity_averages() {
        let config = MarketConfig::app_store();
        let averages = popularity_averages(Market::AppStore, &app_store(), &config).unwrap();
        assert_eq!(averages.group_by, "prime_genre");
        assert_eq!(averages.value, "rating_count_tot");
        assert_eq!(averages.groups[0].key, "Games");
        assert_eq!(averages.groups[0].average, 200.0);
        assert_eq!(averages.groups[1].average, 50.0);
    }

    #[test]
    fn test_field_table_missing_field_fails() {
        let config = MarketConfig::app_store();
        assert!(field_table(Market::AppStore, &app_store(), &config, Field::Category).is_err());
    }
}
