pub mod alert;
pub mod export;
pub mod processor;
pub mod reading;
pub mod record;
pub mod severity;
pub mod zone;

pub use self::{
    alert::AlertState,
    export::{export_file_name, render_csv, to_csv_rows, CsvExport, CsvRow},
    processor::{Snapshot, TelemetryProcessor},
    reading::{parse_reading, Node, NodeStatus, ParseError, Reading},
    record::{decode_all, Decoded, RawRecord, RecordSet, SnapshotError},
    severity::{classify_severity, SeverityBand},
    zone::{filter_by_date, TargetZone, ZoneError},
};
