//! Note row type and Core Data timestamp conversion.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Seconds between the Unix epoch and the Core Data reference date
/// (2001-01-01T00:00:00Z). Note-store timestamps are stored relative to
/// the latter.
pub const CORE_DATA_EPOCH_OFFSET: i64 = 978_307_200;

/// Convert a Core Data timestamp (seconds since 2001-01-01T00:00:00Z,
/// fractional seconds dropped) to a UTC instant.
pub fn core_data_to_utc(seconds: f64) -> DateTime<Utc> {
    Utc.timestamp_opt(CORE_DATA_EPOCH_OFFSET + seconds as i64, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(CORE_DATA_EPOCH_OFFSET, 0).unwrap())
}

/// A single row of the note table. Read-only: the core never writes
/// back to the store.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub subtitle: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub trashed: bool,
}

impl Note {
    /// Text used for embedding: title and content joined, so short notes
    /// with descriptive titles still index well.
    pub fn index_text(&self) -> String {
        match self.content.as_deref() {
            Some(body) if !body.is_empty() => format!("{}\n{}", self.title, body),
            _ => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_zero_is_reference_date() {
        let dt = core_data_to_utc(0.0);
        assert_eq!(dt.to_rfc3339(), "2001-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_epoch_offset_conversion() {
        // 2021-01-01T00:00:00Z is 631152000 seconds after the reference date
        let dt = core_data_to_utc(631_152_000.0);
        assert_eq!(dt.to_rfc3339(), "2021-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_index_text_prefers_body() {
        let note = Note {
            id: "n1".into(),
            title: "Title".into(),
            content: Some("Body text".into()),
            subtitle: None,
            created: core_data_to_utc(0.0),
            modified: core_data_to_utc(0.0),
            trashed: false,
        };
        assert_eq!(note.index_text(), "Title\nBody text");

        let bare = Note {
            content: None,
            ..note.clone()
        };
        assert_eq!(bare.index_text(), "Title");
    }
}
