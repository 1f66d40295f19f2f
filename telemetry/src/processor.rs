use crate::{
    alert::AlertState,
    export::{export_file_name, render_csv, to_csv_rows, CsvExport, CsvRow},
    reading::Reading,
    record::{decode_all, RecordSet},
    severity::SeverityBand,
    zone::{filter_by_date, TargetZone},
};
use chrono::NaiveDate;
use log::{debug, info, warn};

/// Result of processing one poll of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Readings taken on the requested day, in store order.
    pub readings: Vec<Reading>,

    /// Most recent reading in the store, regardless of day.
    pub latest: Option<Reading>,

    /// Classification of the most recent reading.
    pub band: Option<SeverityBand>,

    /// Set when the most recent reading has just entered the danger band.
    pub should_alert: bool,

    /// Records that were dropped because they could not be decoded.
    pub skipped: usize,
}

impl Snapshot {
    /// No data to show at all, as opposed to no data for the current day.
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }

    pub fn rows(&self, zone: &TargetZone) -> Vec<CsvRow> {
        to_csv_rows(&self.readings, zone)
    }

    /// CSV history of the readings in this snapshot, which were all taken on `date`.
    pub fn export(&self, date: NaiveDate, zone: &TargetZone) -> CsvExport {
        build_export(self.rows(zone), date)
    }
}

/// Turns store snapshots into readings, keeping alert state between polls.
#[derive(Debug, Clone, Default)]
pub struct TelemetryProcessor {
    zone: TargetZone,
    alert: AlertState,
}

impl TelemetryProcessor {
    pub fn new(zone: TargetZone) -> Self {
        Self {
            zone,
            alert: AlertState::new(),
        }
    }

    pub fn zone(&self) -> &TargetZone {
        &self.zone
    }

    pub fn alert_state(&self) -> &AlertState {
        &self.alert
    }

    /// Processes a poll of the store, classifying the latest reading and keeping `today`'s.
    pub fn process(&mut self, records: &RecordSet, today: NaiveDate) -> Snapshot {
        let decoded = decode_all(records);

        if decoded.skipped > 0 {
            warn!(
                "{} of {} records could not be decoded",
                decoded.skipped,
                records.len() + records.dropped()
            );
        }

        let Some(latest) = decoded.readings.last().cloned() else {
            debug!("No readings available");
            return Snapshot {
                skipped: decoded.skipped,
                ..Default::default()
            };
        };

        let band = latest.severity_band();
        let should_alert = self.alert.update(band);

        let readings = filter_by_date(&decoded.readings, today, &self.zone);
        debug!(
            "{} readings for {today}, latest {} is {band}",
            readings.len(),
            latest.key
        );

        Snapshot {
            readings,
            latest: Some(latest),
            band: Some(band),
            should_alert,
            skipped: decoded.skipped,
        }
    }

    /// Builds the CSV history for `date`, independent of the alert state.
    pub fn export(&self, records: &RecordSet, date: NaiveDate) -> CsvExport {
        let decoded = decode_all(records);
        let readings = filter_by_date(&decoded.readings, date, &self.zone);

        build_export(to_csv_rows(&readings, &self.zone), date)
    }
}

fn build_export(rows: Vec<CsvRow>, date: NaiveDate) -> CsvExport {
    info!("Exporting {} readings for {date}", rows.len());

    CsvExport {
        file_name: export_file_name(date),
        contents: render_csv(&rows),
        rows: rows.len(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::RawRecord;

    // 2023-11-14 22:13:20 UTC
    const T0: f64 = 1_700_000_000.0;

    fn record(key: &str, timestamp: f64, severity: &str) -> RawRecord {
        RawRecord {
            key: key.to_string(),
            timestamp,
            value: format!(
                "Compass:N, Nodeone:1, AvgTemp:23.5C, Angle:45, FireSeverity:{severity}%, Nodetwo:0, Centralhub:1"
            ),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, d).unwrap()
    }

    #[test]
    fn empty_store_is_no_data() {
        let mut processor = TelemetryProcessor::default();
        let snapshot = processor.process(&RecordSet::default(), day(14));

        assert!(snapshot.is_empty());
        assert!(snapshot.readings.is_empty());
        assert_eq!(snapshot.band, None);
        assert!(!snapshot.should_alert);
        assert_eq!(processor.alert_state(), &AlertState::new());
    }

    #[test]
    fn only_malformed_records_is_no_data() {
        let mut processor = TelemetryProcessor::default();
        let records = RecordSet::new(vec![RawRecord {
            key: "a".to_string(),
            timestamp: T0,
            value: "rubbish".to_string(),
        }]);

        let snapshot = processor.process(&records, day(14));
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.skipped, 1);
    }

    #[test]
    fn badly_shaped_entries_are_skipped() {
        let mut processor = TelemetryProcessor::default();
        let records = RecordSet::from_json_str(
            r#"{
                "a": { "timestamp": 1700000000, "value": "Compass:N, AvgTemp:23.5C, Angle:45, FireSeverity:10%, Nodeone:1" },
                "b": { "value": "Compass:N, AvgTemp:23.5C, Angle:45, FireSeverity:10%, Nodeone:1" },
                "c": { "timestamp": "1700000000", "value": "Compass:N, AvgTemp:23.5C, Angle:45, FireSeverity:10%, Nodeone:1" }
            }"#,
        )
        .unwrap();

        let snapshot = processor.process(&records, day(14));
        assert_eq!(snapshot.readings.len(), 1);
        assert_eq!(snapshot.skipped, 2);
    }

    #[test]
    fn latest_reading_is_classified() {
        let mut processor = TelemetryProcessor::default();
        let records = RecordSet::new(vec![
            record("b", T0 + 5.0, "85"),
            record("a", T0, "10"),
            record("c", T0 + 10.0, "bad"),
        ]);

        let snapshot = processor.process(&records, day(14));
        assert_eq!(snapshot.readings.len(), 2);
        assert_eq!(snapshot.latest.as_ref().unwrap().key, "b");
        assert_eq!(snapshot.band, Some(SeverityBand::Danger));
        assert!(snapshot.should_alert);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.rows(processor.zone()).len(), 2);

        let export = snapshot.export(day(14), processor.zone());
        assert_eq!(export.file_name, "logged_history_2023-11-14.csv");
        assert_eq!(export.rows, 2);
        assert_eq!(export.contents.lines().count(), 3);
    }

    #[test]
    fn alert_is_raised_once_per_danger_run() {
        let mut processor = TelemetryProcessor::default();
        let mut records = vec![record("a", T0, "20")];

        let mut alerts = Vec::new();
        for (i, severity) in ["90", "95", "60", "81"].iter().enumerate() {
            alerts.push(
                processor
                    .process(&RecordSet::new(records.clone()), day(14))
                    .should_alert,
            );
            records.push(record(&format!("b{i}"), T0 + i as f64, severity));
        }
        alerts.push(
            processor
                .process(&RecordSet::new(records), day(14))
                .should_alert,
        );

        assert_eq!(alerts, [false, true, false, false, true]);
    }

    #[test]
    fn other_days_are_filtered_but_latest_is_kept() {
        let mut processor = TelemetryProcessor::default();
        let records = RecordSet::new(vec![record("a", T0, "10")]);

        let snapshot = processor.process(&records, day(15));
        assert!(!snapshot.is_empty());
        assert!(snapshot.readings.is_empty());
        assert_eq!(snapshot.band, Some(SeverityBand::Safe));
    }

    #[test]
    fn export_selected_day() {
        let processor = TelemetryProcessor::new("+05:30".parse().unwrap());
        let records = RecordSet::new(vec![
            record("a", T0 - 86_400.0, "10"),
            record("b", T0, "20"),
        ]);

        let export = processor.export(&records, day(15));
        assert_eq!(export.file_name, "logged_history_2023-11-15.csv");
        assert_eq!(export.rows, 1);
        assert_eq!(
            export.contents,
            "Timestamp,Average Temperature,Compass,Angle,Fire Severity\n\
             2023-11-15 03:43:20 AM,23.5,N,45,20\n"
        );
    }
}
