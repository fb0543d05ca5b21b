use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct RosterRecord {
    pub(crate) entrant_id: String,
    pub(crate) display_name: Option<String>,
    pub(crate) handle: Option<String>,
    pub(crate) item_id: String,
    pub(crate) submitted_at: Option<DateTime<Utc>>,
    pub(crate) duration_secs: Option<u32>,
    pub(crate) views: i64,
    pub(crate) likes: i64,
    pub(crate) comments: i64,
    pub(crate) shares: i64,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<RosterRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<RosterRow>() {
        let row = record?;
        let submitted_at = row.submitted_timestamp();

        records.push(RosterRecord {
            entrant_id: row.entrant_id,
            display_name: row.display_name,
            handle: row.handle,
            item_id: row.item_id,
            submitted_at,
            duration_secs: row.duration_secs,
            views: row.views,
            likes: row.likes,
            comments: row.comments,
            shares: row.shares,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Entrant ID")]
    entrant_id: String,
    #[serde(
        rename = "Display Name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    display_name: Option<String>,
    #[serde(
        rename = "Handle",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    handle: Option<String>,
    #[serde(rename = "Item ID")]
    item_id: String,
    #[serde(
        rename = "Submitted At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    submitted_at: Option<String>,
    #[serde(rename = "Duration Secs", default)]
    duration_secs: Option<u32>,
    #[serde(rename = "Views")]
    views: i64,
    #[serde(rename = "Likes")]
    likes: i64,
    #[serde(rename = "Comments")]
    comments: i64,
    #[serde(rename = "Shares")]
    shares: i64,
}

impl RosterRow {
    fn submitted_timestamp(&self) -> Option<DateTime<Utc>> {
        self.submitted_at.as_deref().and_then(parse_timestamp)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|text| !text.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight));
    }

    None
}

#[cfg(test)]
pub(crate) fn parse_timestamp_for_tests(value: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(value)
}
