//! Per-market dataset schema and cleaning settings.
//!
//! The two catalogs use different layouts. [`Columns`] holds the position of
//! every field the analysis reads, so the rest of the crate asks for a
//! [`Field`] instead of hardcoding an index. Defaults match the published
//! Google Play and App Store exports; a JSON file can replace them:
//!
//! ```json
//! {
//!   "google_play": {
//!     "path": "data/googleplaystore.csv",
//!     "columns": { "name": 0, "category": 1, "reviews": 3, "price": 7,
//!                  "installs": 5, "genre": 9, "rating_count": null },
//!     "free_price": "0",
//!     "defective_rows": [10472]
//!   },
//!   "app_store": { ... }
//! }
//! ```

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which catalog a dataset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    GooglePlay,
    AppStore,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::GooglePlay => f.write_str("Google Play"),
            Market::AppStore => f.write_str("App Store"),
        }
    }
}

/// Logical fields the analysis reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Field {
    Name,
    Category,
    Reviews,
    Price,
    Installs,
    Genre,
    RatingCount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Name => "name",
            Field::Category => "category",
            Field::Reviews => "reviews",
            Field::Price => "price",
            Field::Installs => "installs",
            Field::Genre => "genre",
            Field::RatingCount => "rating_count",
        };
        f.write_str(name)
    }
}

/// Position of each field in one market's rows. `None` means the market
/// has no such column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    pub name: usize,
    pub price: usize,
    pub genre: usize,
    pub category: Option<usize>,
    pub reviews: Option<usize>,
    pub installs: Option<usize>,
    pub rating_count: Option<usize>,
}

impl Columns {
    /// Position of `field`, or an error naming the market lacking it.
    pub fn position(&self, market: Market, field: Field) -> Result<usize> {
        let position = match field {
            Field::Name => Some(self.name),
            Field::Price => Some(self.price),
            Field::Genre => Some(self.genre),
            Field::Category => self.category,
            Field::Reviews => self.reviews,
            Field::Installs => self.installs,
            Field::RatingCount => self.rating_count,
        };
        position.with_context(|| format!("{market} data has no {field} column"))
    }
}

/// Everything needed to load and clean one market's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub path: PathBuf,
    pub columns: Columns,
    /// Exact price literal of a free app in this export.
    pub free_price: String,
    /// 0-based data row indices known to be malformed, dropped before
    /// anything else.
    #[serde(default)]
    pub defective_rows: Vec<usize>,
}

impl MarketConfig {
    pub fn google_play() -> Self {
        Self {
            path: PathBuf::from("googleplaystore.csv"),
            columns: Columns {
                name: 0,
                category: Some(1),
                reviews: Some(3),
                installs: Some(5),
                price: 7,
                genre: 9,
                rating_count: None,
            },
            free_price: "0".to_string(),
            // Row with the category column missing, every later field shifted.
            defective_rows: vec![10472],
        }
    }

    pub fn app_store() -> Self {
        Self {
            path: PathBuf::from("AppleStore.csv"),
            columns: Columns {
                name: 1,
                category: None,
                reviews: None,
                installs: None,
                price: 4,
                genre: 11,
                rating_count: Some(5),
            },
            free_price: "0.0".to_string(),
            defective_rows: Vec::new(),
        }
    }
}

/// Configuration for both markets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub google_play: MarketConfig,
    pub app_store: MarketConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_play: MarketConfig::google_play(),
            app_store: MarketConfig::app_store(),
        }
    }
}

impl Config {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config = serde_json::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }

    pub fn market(&self, market: Market) -> &MarketConfig {
        match market {
            Market::GooglePlay => &self.google_play,
            Market::AppStore => &self.app_store,
        }
    }

    pub fn market_mut(&mut self, market: Market) -> &mut MarketConfig {
        match market {
            Market::GooglePlay => &mut self.google_play,
            Market::AppStore => &mut self.app_store,
        }
    }
}
