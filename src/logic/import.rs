//! Bulk player import from CSV text.
//!
//! Accepted row shape: `steam_id,name[,elo]`. A leading header row is
//! skipped when its first cell is not numeric. Bad rows are reported
//! per line and never abort the rest of the file.

use crate::app::App;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub steam_id: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

pub fn import_players_csv(app: &mut App, text: &str) -> ImportReport {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut report = ImportReport::default();
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.skipped.push(SkippedRow {
                    line,
                    steam_id: String::new(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let steam_id = record.get(0).unwrap_or("").to_string();
        if line == 1 && !steam_id.chars().all(|c| c.is_ascii_digit()) {
            // Header row.
            continue;
        }
        let name = record.get(1).unwrap_or("").to_string();
        let elo = match record.get(2) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    report.skipped.push(SkippedRow {
                        line,
                        steam_id,
                        reason: format!("elo '{raw}' is not a number"),
                    });
                    continue;
                }
            },
        };
        match app.create_player(&steam_id, &name, None, elo) {
            Ok(_) => report.imported += 1,
            Err(e) => report.skipped.push(SkippedRow {
                line,
                steam_id,
                reason: e.to_string(),
            }),
        }
    }
    log::info!(
        "player import: {} added, {} rows skipped",
        report.imported,
        report.skipped.len()
    );
    report
}
