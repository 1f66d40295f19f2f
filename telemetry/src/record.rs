use crate::reading::{parse_reading, Reading};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

/// A single reading as it is stored in the database, before any decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Opaque key the store assigned to the record.
    pub key: String,

    /// Seconds since the UNIX epoch, as reported by the sensor hub.
    pub timestamp: f64,

    /// Delimited `label:value` sub-fields joined by `", "`.
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct RecordBody {
    value: String,
    timestamp: f64,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot is not a JSON object")]
    NotAnObject,
}

/// The set of records currently held in the store, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<RawRecord>,

    /// Entries of the snapshot that did not have the shape of a record.
    dropped: usize,
}

impl RecordSet {
    pub fn new(mut records: Vec<RawRecord>) -> Self {
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            records,
            dropped: 0,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    /// Builds a record set from a store snapshot.
    ///
    /// An empty store is returned as `null`, which is treated as having no records.
    /// Entries that do not have the expected shape are skipped.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SnapshotError> {
        let map = match value {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(map) => map,
            _ => return Err(SnapshotError::NotAnObject),
        };

        let mut records = Vec::with_capacity(map.len());
        let mut dropped = 0;

        for (key, body) in map {
            match serde_json::from_value::<RecordBody>(body) {
                Ok(body) => records.push(RawRecord {
                    key,
                    timestamp: body.timestamp,
                    value: body.value,
                }),
                Err(e) => {
                    warn!("Skipping record {key} with unexpected shape: {e}");
                    dropped += 1;
                }
            }
        }

        Ok(Self {
            dropped,
            ..Self::new(records)
        })
    }

    /// Number of records in the set, not counting the dropped ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of snapshot entries that were not records at all.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a RawRecord;
    type IntoIter = std::slice::Iter<'a, RawRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub readings: Vec<Reading>,

    /// Number of records that could not be parsed.
    pub skipped: usize,
}

/// Parses every record, dropping the ones that are malformed.
///
/// Entries already dropped while reading the snapshot count as skipped.
pub fn decode_all(records: &RecordSet) -> Decoded {
    let mut decoded = Decoded {
        skipped: records.dropped(),
        ..Default::default()
    };

    for raw in records {
        match parse_reading(raw) {
            Ok(reading) => decoded.readings.push(reading),
            Err(e) => {
                warn!("Dropping record {}: {e}", raw.key);
                debug!("Dropped record value: {:?}", raw.value);
                decoded.skipped += 1;
            }
        }
    }

    decoded
}
