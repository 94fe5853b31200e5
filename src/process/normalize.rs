// src/process/normalize.rs

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::process::{
    date_parser::{day_string, local_midnight_millis, parse_coverage_date},
    reader::RawRow,
    utils::{clean_str, non_empty},
};
use crate::report::RunStats;

/// Source column names.
pub mod columns {
    pub const TITLE: &str = "Title";
    pub const DOCUMENT_ID: &str = "Document ID";
    pub const REACH: &str = "Reach";
    pub const AVE: &str = "AVE";
    pub const AUTHOR_NAME: &str = "Author Name";
    pub const SOURCE_NAME: &str = "Source Name";
    pub const DATE: &str = "Date";
    pub const URL: &str = "URL";
}

/// Field names in the remote table.
pub mod fields {
    pub const TITLE: &str = "Title/Coverage";
    pub const DOCUMENT_ID: &str = "Document ID";
    pub const REACH: &str = "Reach";
    pub const AVE: &str = "AVE";
    pub const AUTHOR_NAME: &str = "Author Name";
    pub const SOURCE_NAME: &str = "Source Name";
    pub const DATE: &str = "Date";
    pub const URL: &str = "URL/Link";
}

/// A source row mapped onto the remote schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub document_id: String,
    pub title: String,
    pub source_name: String,
    pub author_name: Option<String>,
    pub reach: String,
    pub ave: String,
    pub url: Option<String>,
    pub date_epoch_ms: Option<i64>,
}

impl NormalizedRecord {
    /// Remote field map. Optional fields are left out rather than sent empty.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(fields::TITLE.into(), json!(self.title));
        map.insert(fields::DOCUMENT_ID.into(), json!(self.document_id));
        map.insert(fields::REACH.into(), json!(self.reach));
        map.insert(fields::AVE.into(), json!(self.ave));
        map.insert(fields::SOURCE_NAME.into(), json!(self.source_name));
        if let Some(url) = &self.url {
            map.insert(fields::URL.into(), json!({ "link": url, "text": url }));
        }
        if let Some(author) = &self.author_name {
            map.insert(fields::AUTHOR_NAME.into(), json!(author));
        }
        if let Some(ms) = self.date_epoch_ms {
            map.insert(fields::DATE.into(), json!(ms));
        }
        map
    }
}

/// What became of one source row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    /// Blank structural line: no title and no document id.
    Skipped,
    Duplicate(String),
    New {
        record: NormalizedRecord,
        day: Option<NaiveDate>,
    },
}

fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("")
}

/// Classify one row against the existing-id snapshot.
pub fn classify(row: &RawRow, existing: &HashSet<String>) -> Classified {
    let title = field(row, columns::TITLE).trim().to_string();
    let document_id = clean_str(field(row, columns::DOCUMENT_ID));

    if title.is_empty() && document_id.is_empty() {
        return Classified::Skipped;
    }
    if existing.contains(&document_id) {
        return Classified::Duplicate(document_id);
    }

    let raw_date = field(row, columns::DATE).trim();
    let day = parse_coverage_date(raw_date);
    if day.is_none() && !raw_date.is_empty() {
        warn!(document_id = %document_id, date = raw_date, "unparseable date, leaving it out");
    }

    let record = NormalizedRecord {
        title,
        source_name: field(row, columns::SOURCE_NAME).trim().to_string(),
        author_name: non_empty(field(row, columns::AUTHOR_NAME)),
        reach: field(row, columns::REACH).trim().to_string(),
        ave: field(row, columns::AVE).trim().to_string(),
        url: non_empty(field(row, columns::URL)),
        date_epoch_ms: day.and_then(local_midnight_millis),
        document_id,
    };
    Classified::New { record, day }
}

/// Run every source row through [`classify`], folding the counts and the
/// date range into `stats`. Returns the new records in source order.
#[instrument(level = "info", skip_all, fields(known_ids = existing.len()))]
pub fn classify_rows<I>(
    rows: I,
    existing: &HashSet<String>,
    stats: &mut RunStats,
) -> Result<Vec<NormalizedRecord>>
where
    I: IntoIterator<Item = Result<RawRow>>,
{
    let mut new_records = Vec::new();

    for row in rows {
        match classify(&row?, existing) {
            Classified::Skipped => {}
            Classified::Duplicate(id) => {
                debug!(document_id = %id, "already present");
                stats.duplicate_count += 1;
            }
            Classified::New { record, day } => {
                if let Some(day) = day {
                    stats.date_range.observe(&day_string(day));
                }
                new_records.push(record);
            }
        }
    }

    stats.new_count = new_records.len();
    stats.total_in_source = stats.duplicate_count + stats.new_count;
    info!(
        total = stats.total_in_source,
        duplicates = stats.duplicate_count,
        new = stats.new_count,
        "source filtered"
    );
    Ok(new_records)
}
