use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::dataset::{Dataset, field_of, parse_number};

/// Share of rows, in percent, holding each distinct value of a column.
pub type FrequencyTable = HashMap<String, f64>;

/// One line of a ranked frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    pub value: String,
    pub percentage: f64,
}

/// Mean of a numeric column over the rows sharing one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub key: String,
    pub average: f64,
    pub count: usize,
}

/// How a numeric field is read before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Numeric {
    /// Plain decimal text, e.g. `"2974676"`.
    #[default]
    Plain,
    /// Install bucket text, e.g. `"1,000,000+"`.
    Installs,
}

impl Numeric {
    pub fn parse(self, raw: &str) -> Result<f64> {
        match self {
            Numeric::Plain => parse_number(raw),
            Numeric::Installs => normalize_installs(raw),
        }
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Reads an install bucket such as `"10,000+"` as its lower bound.
pub fn normalize_installs(raw: &str) -> Result<f64> {
    let digits: String = raw.chars().filter(|c| *c != ',' && *c != '+').collect();
    parse_number(&digits).with_context(|| format!("invalid install count {raw:?}"))
}

/// Builds the frequency table of column `index`.
///
/// An empty dataset gives an empty table.
pub fn freq_table(dataset: &Dataset, index: usize) -> Result<FrequencyTable> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (row, record) in dataset.rows.iter().enumerate() {
        let value = field_of(record, index).with_context(|| {
            format!(
                "{} row {row}: column {index} ({})",
                dataset.label,
                dataset.column_name(index)
            )
        })?;
        *counts.entry(value).or_default() += 1;
    }

    let total = dataset.len();
    Ok(counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), pct(count, total)))
        .collect())
}

/// Orders a table by decreasing percentage, ties broken by decreasing
/// value.
pub fn rank(table: &FrequencyTable) -> Vec<TableEntry> {
    let mut entries: Vec<TableEntry> = table
        .iter()
        .map(|(value, percentage)| TableEntry {
            value: value.clone(),
            percentage: *percentage,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then_with(|| b.value.cmp(&a.value))
    });
    entries
}

/// Frequency table of column `index`, ranked.
pub fn display_table(dataset: &Dataset, index: usize) -> Result<Vec<TableEntry>> {
    Ok(rank(&freq_table(dataset, index)?))
}

/// Averages column `value` per distinct value of column `key`.
///
/// Groups are listed in the order their key first appears.
pub fn group_averages(
    dataset: &Dataset,
    key: usize,
    value: usize,
    numeric: Numeric,
) -> Result<Vec<GroupAverage>> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();

    for row in 0..dataset.len() {
        let group = dataset.field(row, key)?;
        let raw = dataset.field(row, value)?;
        let number = numeric.parse(raw).with_context(|| {
            format!(
                "{} row {row}: column {value} ({})",
                dataset.label,
                dataset.column_name(value)
            )
        })?;

        let slot = *slots.entry(group).or_insert_with(|| {
            groups.push((group, 0.0, 0));
            groups.len() - 1
        });
        let (_, total, count) = &mut groups[slot];
        *total += number;
        *count += 1;
    }

    groups
        .into_iter()
        .map(|(key, total, count)| -> Result<GroupAverage> {
            Ok(GroupAverage {
                key: key.to_string(),
                average: mean(total, count, key)?,
                count,
            })
        })
        .collect()
}

/// Averages column `value` over the rows whose `key` field equals `group`.
///
/// # Errors
///
/// Fails if no row has that key, or on an unparsable value.
pub fn average_for_key(
    dataset: &Dataset,
    key: usize,
    value: usize,
    numeric: Numeric,
    group: &str,
) -> Result<GroupAverage> {
    let mut total = 0.0;
    let mut count = 0;
    for row in 0..dataset.len() {
        if dataset.field(row, key)? != group {
            continue;
        }
        let raw = dataset.field(row, value)?;
        total += numeric.parse(raw).with_context(|| {
            format!(
                "{} row {row}: column {value} ({})",
                dataset.label,
                dataset.column_name(value)
            )
        })?;
        count += 1;
    }
    Ok(GroupAverage {
        key: group.to_string(),
        average: mean(total, count, group)?,
        count,
    })
}

fn mean(total: f64, count: usize, key: &str) -> Result<f64> {
    ensure!(count > 0, "no rows for key {key:?}");
    Ok(total / count as f64)
}

/// Sorts averages from highest to lowest, ties by key.
pub fn sort_by_average(averages: &mut [GroupAverage]) {
    averages.sort_by(|a, b| match b.average.total_cmp(&a.average) {
        Ordering::Equal => a.key.cmp(&b.key),
        other => other,
    });
}
