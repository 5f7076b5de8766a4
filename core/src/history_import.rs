use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result, bail};

use crate::service::Tracker;

/// A single row parsed from a meal-history CSV export.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub date: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
}

/// Summary of what a history import would do / did.
#[derive(Debug, Clone)]
pub struct HistoryImportSummary {
    pub rows_parsed: usize,
    pub meals_added: usize,
    pub dates_spanned: usize,
    pub templates_touched: usize,
}

/// Parse a meal-history CSV export from any reader.
///
/// Expected header: `Date,Name,Calories,Protein (g)` — a bare `Protein`
/// column is accepted too, and the protein column as a whole is optional.
pub fn parse_history_csv<R: Read>(reader: R) -> Result<Vec<HistoryRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    for name in ["Date", "Name", "Calories"] {
        if col(name).is_none() {
            bail!("Missing required column: {name}");
        }
    }

    let idx_date = col("Date").context("Missing 'Date' column")?;
    let idx_name = col("Name").context("Missing 'Name' column")?;
    let idx_cal = col("Calories").context("Missing 'Calories' column")?;
    let idx_protein = col("Protein (g)").or_else(|| col("Protein"));

    let mut rows = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;

        let date = record.get(idx_date).unwrap_or("").trim().to_string();
        let name = record.get(idx_name).unwrap_or("").trim().to_string();

        if date.is_empty() || name.is_empty() {
            continue; // skip blank rows
        }

        let parse_f64 = |idx: Option<usize>| -> f64 {
            idx.and_then(|i| record.get(i))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        rows.push(HistoryRow {
            date,
            name,
            calories: parse_f64(Some(idx_cal)),
            protein: parse_f64(idx_protein),
        });
    }

    Ok(rows)
}

/// Normalize an exported date to YYYY-MM-DD format.
///
/// Exports carry `YYYY-MM-DD`, `M/D/YYYY`, or `D/M/YYYY`.
fn normalize_date(raw: &str) -> Result<String> {
    if chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return Ok(raw.to_string());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Ok(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Ok(d.format("%Y-%m-%d").to_string());
    }
    bail!("Cannot parse date: '{raw}'")
}

/// Import parsed history rows through the tracker, so head-ordering and
/// template upserts apply as if each meal had been logged by hand.
///
/// Returns a `HistoryImportSummary`. When `dry_run` is true, nothing is
/// written.
pub fn import_history(
    tracker: &mut Tracker,
    rows: &[HistoryRow],
    dry_run: bool,
) -> Result<HistoryImportSummary> {
    let mut meals_added: usize = 0;
    let mut dates: HashSet<String> = HashSet::new();
    let mut names: HashSet<String> = HashSet::new();

    for row in rows {
        let date = normalize_date(&row.date)?;
        dates.insert(date.clone());
        names.insert(row.name.to_lowercase());

        if dry_run {
            meals_added += 1;
        } else if tracker
            .add_meal(&date, &row.name, row.calories, row.protein)
            .is_some()
        {
            meals_added += 1;
        }
    }

    Ok(HistoryImportSummary {
        rows_parsed: rows.len(),
        meals_added,
        dates_spanned: dates.len(),
        templates_touched: names.len(),
    })
}
