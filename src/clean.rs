//! Cleaning stages applied to a catalog before any analysis.
//!
//! The pipeline drops known-defective rows, collapses duplicate entries of
//! the same app, keeps apps with mostly-English names and finally keeps
//! only free apps. Each stage takes a [`Dataset`] and returns a new one.

use crate::config::{Field, Market, MarketConfig};
use crate::dataset::{Dataset, Row};
use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Names with more than this many non-ASCII characters are treated as
/// non-English.
pub const MAX_NON_ASCII: usize = 3;

/// Duplicate statistics over one key column.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct DuplicateReport {
    /// Number of distinct key values.
    pub unique: usize,
    /// Key of every row whose key was already seen, in row order.
    pub duplicates: Vec<String>,
}

/// Row counts after each cleaning stage.
#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CleanSummary {
    pub loaded: usize,
    pub after_row_removal: usize,
    pub after_dedup: usize,
    pub after_language: usize,
    pub after_price: usize,
}

/// Counts the distinct and repeated values of `key`.
pub fn find_duplicates(dataset: &Dataset, key: usize) -> Result<DuplicateReport> {
    let mut seen = HashSet::new();
    let mut report = DuplicateReport::default();

    for row in 0..dataset.len() {
        let name = dataset.field(row, key)?;
        if seen.contains(name) {
            report.duplicates.push(name.to_string());
        } else {
            seen.insert(name);
        }
    }
    report.unique = seen.len();

    debug!(
        dataset = %dataset.label,
        unique = report.unique,
        duplicates = report.duplicates.len(),
        "Duplicate scan"
    );
    Ok(report)
}

/// Every row whose `key` field equals `value`.
pub fn rows_with_key<'a>(dataset: &'a Dataset, key: usize, value: &str) -> Vec<&'a Row> {
    dataset
        .rows
        .iter()
        .filter(|row| row.get(key).is_some_and(|v| v == value))
        .collect()
}

/// Highest `score` seen for each distinct `key`.
pub fn max_by_key(dataset: &Dataset, key: usize, score: usize) -> Result<HashMap<String, f64>> {
    let mut max: HashMap<String, f64> = HashMap::new();
    for index in 0..dataset.len() {
        let name = dataset.field(index, key)?;
        let value = dataset.number(index, score)?;
        max.entry(name.to_string())
            .and_modify(|best| {
                if value > *best {
                    *best = value;
                }
            })
            .or_insert(value);
    }
    Ok(max)
}

/// Keeps one row per `key`: the first row, in dataset order, whose `score`
/// equals the maximum recorded for that key.
pub fn dedupe_by_max(dataset: &Dataset, key: usize, score: usize) -> Result<Dataset> {
    let max = max_by_key(dataset, key, score)?;

    let mut added = HashSet::new();
    let mut kept = Vec::with_capacity(max.len());
    for (index, row) in dataset.rows.iter().enumerate() {
        let name = dataset.field(index, key)?;
        let value = dataset.number(index, score)?;
        if max.get(name) == Some(&value) && !added.contains(name) {
            added.insert(name.to_string());
            kept.push(row.clone());
        }
    }

    info!(
        dataset = %dataset.label,
        before = dataset.len(),
        after = kept.len(),
        "Deduplicated by maximum"
    );
    Ok(dataset.with_rows(kept))
}

/// True if `name` has at most [`MAX_NON_ASCII`] characters above code
/// point 127.
pub fn is_english(name: &str) -> bool {
    name.chars().filter(|c| !c.is_ascii()).count() <= MAX_NON_ASCII
}

/// Keeps rows whose `name` field passes [`is_english`].
pub fn filter_english(dataset: &Dataset, name: usize) -> Result<Dataset> {
    let mut kept = Vec::new();
    for (index, row) in dataset.rows.iter().enumerate() {
        if is_english(dataset.field(index, name)?) {
            kept.push(row.clone());
        }
    }
    Ok(dataset.with_rows(kept))
}

/// Keeps rows whose `price` field is exactly `free`.
///
/// The comparison is on the raw text: `"0"` and `"0.0"` are different.
pub fn filter_free(dataset: &Dataset, price: usize, free: &str) -> Result<Dataset> {
    let mut kept = Vec::new();
    for (index, row) in dataset.rows.iter().enumerate() {
        if dataset.field(index, price)? == free {
            kept.push(row.clone());
        }
    }
    Ok(dataset.with_rows(kept))
}

/// Runs every cleaning stage configured for `market`.
///
/// Defective rows are removed highest index first so earlier removals do
/// not shift later ones. Deduplication only runs when the market has a
/// reviews column.
#[tracing::instrument(skip(dataset, config), fields(rows = dataset.len()))]
pub fn clean(
    market: Market,
    dataset: Dataset,
    config: &MarketConfig,
) -> Result<(Dataset, CleanSummary)> {
    let columns = &config.columns;
    let mut summary = CleanSummary {
        loaded: dataset.len(),
        ..Default::default()
    };

    let mut defective = config.defective_rows.clone();
    defective.sort_unstable();
    defective.dedup();
    let mut dataset = dataset;
    for index in defective.into_iter().rev() {
        dataset = dataset.remove_row(index)?;
    }
    summary.after_row_removal = dataset.len();

    let name = columns.position(market, Field::Name)?;
    if let Some(reviews) = columns.reviews {
        dataset = dedupe_by_max(&dataset, name, reviews)?;
    }
    summary.after_dedup = dataset.len();

    let dataset = filter_english(&dataset, name)?;
    summary.after_language = dataset.len();

    let price = columns.position(market, Field::Price)?;
    let dataset = filter_free(&dataset, price, &config.free_price)?;
    summary.after_price = dataset.len();

    info!(
        %market,
        loaded = summary.loaded,
        after_row_removal = summary.after_row_removal,
        after_dedup = summary.after_dedup,
        after_language = summary.after_language,
        after_price = summary.after_price,
        "Cleaning complete"
    );
    Ok((dataset, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketConfig;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn apps(rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            "apps",
            row(&["App", "Reviews", "Price"]),
            rows.iter().map(|r| row(r)).collect(),
        )
    }

    #[test]
    fn test_is_english() {
        assert!(is_english("Instagram"));
        assert!(!is_english("爱奇艺PPS -《欢乐颂2》电视剧热播"));
        assert!(is_english("Docs To Go™ Free Office Suite"));
        assert!(is_english("Instachat 😜"));
    }

    #[test]
    fn test_is_english_scans_whole_name() {
        // Only the tail is non-ASCII, so a first-character check would pass it.
        assert!(!is_english("Weather 天气预报"));
        assert!(is_english("😜😜😜 fun"));
        assert!(!is_english("😜😜😜😜 fun"));
    }

    #[test]
    fn test_find_duplicates() {
        let dataset = apps(&[&["A", "1", "0"], &["B", "1", "0"], &["A", "2", "0"], &["A", "3", "0"]]);
        let report = find_duplicates(&dataset, 0).unwrap();
        assert_eq!(report.unique, 2);
        assert_eq!(report.duplicates, vec!["A", "A"]);
    }

    #[test]
    fn test_rows_with_key() {
        let dataset = apps(&[&["A", "1", "0"], &["B", "1", "0"], &["A", "2", "0"]]);
        let rows = rows_with_key(&dataset, 0, "A");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "2");
    }

    #[test]
    fn test_dedupe_keeps_max_reviews() {
        let dataset = apps(&[
            &["A", "10", "0"],
            &["B", "5", "0"],
            &["A", "30", "0"],
            &["A", "20", "0"],
        ]);
        let max = max_by_key(&dataset, 0, 1).unwrap();
        assert_eq!(max["A"], 30.0);
        assert_eq!(max["B"], 5.0);

        let clean = dedupe_by_max(&dataset, 0, 1).unwrap();
        assert_eq!(clean.rows, vec![row(&["B", "5", "0"]), row(&["A", "30", "0"])]);
    }

    #[test]
    fn test_dedupe_keeps_first_of_tied_maxima() {
        let dataset = apps(&[&["A", "7", "first"], &["A", "7", "second"], &["A", "3", "third"]]);
        let clean = dedupe_by_max(&dataset, 0, 1).unwrap();
        assert_eq!(clean.rows, vec![row(&["A", "7", "first"])]);
    }

    #[test]
    fn test_dedupe_rejects_non_numeric_reviews() {
        let dataset = apps(&[&["A", "7", "0"], &["B", "3.0M", "0"]]);
        let err = dedupe_by_max(&dataset, 0, 1).unwrap_err();
        assert!(format!("{err:#}").contains("row 1"));
    }

    #[test]
    fn test_short_row_error_names_row_and_column() {
        let dataset = apps(&[&["A", "1", "0"], &["B"]]);

        let err = filter_free(&dataset, 2, "0").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("apps row 1"), "{message}");
        assert!(message.contains("Price"), "{message}");

        let err = max_by_key(&dataset, 0, 1).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("apps row 1"), "{message}");
        assert!(message.contains("Reviews"), "{message}");
    }

    #[test]
    fn test_clean_reports_short_row_location() {
        let mut config = MarketConfig::app_store();
        config.columns.name = 1;
        config.columns.price = 2;

        let dataset = Dataset::new(
            "App Store",
            row(&["id", "track_name", "price"]),
            vec![row(&["1", "A", "0.0"]), row(&["2"])],
        );
        let err = clean(Market::AppStore, dataset, &config).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("App Store row 1"), "{message}");
        assert!(message.contains("track_name"), "{message}");
    }

    #[test]
    fn test_filter_free_is_exact() {
        let dataset = apps(&[&["A", "1", "0"], &["B", "1", "0.0"], &["C", "1", "$0.99"]]);
        let free = filter_free(&dataset, 2, "0").unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free.rows[0][0], "A");

        let free = filter_free(&dataset, 2, "0.0").unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free.rows[0][0], "B");
    }

    #[test]
    fn test_clean_pipeline() {
        let mut config = MarketConfig::google_play();
        config.columns.reviews = Some(1);
        config.columns.price = 2;
        config.defective_rows = vec![0];

        let dataset = apps(&[
            &["Broken row"],
            &["Instagram", "100", "0"],
            &["Instagram", "250", "0"],
            &["爱奇艺PPS -《欢乐颂2》电视剧热播", "80", "0"],
            &["Paid", "9", "$1.99"],
        ]);
        let (clean, summary) = clean(Market::GooglePlay, dataset, &config).unwrap();

        assert_eq!(clean.rows, vec![row(&["Instagram", "250", "0"])]);
        assert_eq!(
            summary,
            CleanSummary {
                loaded: 5,
                after_row_removal: 4,
                after_dedup: 3,
                after_language: 2,
                after_price: 1,
            }
        );
    }

    #[test]
    fn test_clean_without_reviews_column_skips_dedup() {
        let mut config = MarketConfig::app_store();
        config.columns.name = 0;
        config.columns.price = 2;

        let dataset = apps(&[&["A", "1", "0.0"], &["A", "2", "0.0"]]);
        let (clean, summary) = clean(Market::AppStore, dataset, &config).unwrap();
        assert_eq!(clean.len(), 2);
        assert_eq!(summary.after_dedup, 2);
    }
}
