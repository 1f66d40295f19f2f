use crate::{reading::Reading, zone::TargetZone};
use chrono::NaiveDate;

/// Timestamp format expected by spreadsheets consuming the exported history.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

pub const CSV_HEADER: [&str; 5] = [
    "Timestamp",
    "Average Temperature",
    "Compass",
    "Angle",
    "Fire Severity",
];

/// One flattened reading, in export column order.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub timestamp: String,
    pub average_temperature: f64,
    pub compass: String,
    pub angle: f64,
    pub fire_severity: f64,
}

impl CsvRow {
    pub fn columns(&self) -> [String; 5] {
        [
            self.timestamp.clone(),
            self.average_temperature.to_string(),
            self.compass.clone(),
            self.angle.to_string(),
            self.fire_severity.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
    pub rows: usize,
}

pub fn to_csv_rows(readings: &[Reading], zone: &TargetZone) -> Vec<CsvRow> {
    readings
        .iter()
        .map(|r| CsvRow {
            timestamp: zone
                .localise(&r.timestamp)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            average_temperature: r.average_temperature,
            compass: r.compass.clone(),
            angle: r.angle,
            fire_severity: r.fire_severity,
        })
        .collect()
}

pub fn render_csv(rows: &[CsvRow]) -> String {
    let mut out = String::new();

    write_line(&mut out, CSV_HEADER.iter().copied());
    for row in rows {
        write_line(&mut out, row.columns().iter().map(String::as_str));
    }

    out
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("logged_history_{}.csv", date.format("%Y-%m-%d"))
}

fn write_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }

        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reading::NodeStatus;
    use chrono::DateTime;

    fn reading(timestamp: i64, compass: &str) -> Reading {
        Reading {
            key: "k".to_string(),
            timestamp: DateTime::from_timestamp(timestamp, 0).unwrap(),
            average_temperature: 23.5,
            compass: compass.to_string(),
            angle: 45.0,
            fire_severity: 85.0,
            node_one: NodeStatus::Online,
            node_two: NodeStatus::Offline,
            central_hub: NodeStatus::Unknown,
        }
    }

    fn split_csv_line(line: &str) -> Vec<String> {
        let mut fields = vec![String::new()];
        let mut quoted = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, quoted) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    chars.next();
                    fields.last_mut().unwrap().push('"');
                }
                ('"', _) => quoted = !quoted,
                (',', false) => fields.push(String::new()),
                (c, _) => fields.last_mut().unwrap().push(c),
            }
        }

        fields
    }

    #[test]
    fn timestamp_format() {
        let zone = TargetZone::utc();

        // 2023-11-14 22:13:20 UTC
        let rows = to_csv_rows(&[reading(1_700_000_000, "N")], &zone);
        assert_eq!(rows[0].timestamp, "2023-11-14 10:13:20 PM");

        // 2023-11-15 03:43:20 at +05:30
        let zone: TargetZone = "+05:30".parse().unwrap();
        let rows = to_csv_rows(&[reading(1_700_000_000, "N")], &zone);
        assert_eq!(rows[0].timestamp, "2023-11-15 03:43:20 AM");
    }

    #[test]
    fn render() {
        let rows = to_csv_rows(&[reading(1_700_000_000, "N")], &TargetZone::utc());

        assert_eq!(
            render_csv(&rows),
            "Timestamp,Average Temperature,Compass,Angle,Fire Severity\n\
             2023-11-14 10:13:20 PM,23.5,N,45,85\n"
        );
    }

    #[test]
    fn render_empty() {
        assert_eq!(
            render_csv(&[]),
            "Timestamp,Average Temperature,Compass,Angle,Fire Severity\n"
        );
    }

    #[test]
    fn rows_survive_csv_text() {
        let readings = [
            reading(1_700_000_000, "N"),
            reading(1_700_000_005, "North, by \"West\""),
        ];
        let rows = to_csv_rows(&readings, &TargetZone::utc());
        let text = render_csv(&rows);

        let mut lines = text.lines();
        assert_eq!(split_csv_line(lines.next().unwrap()), CSV_HEADER);

        for row in &rows {
            assert_eq!(split_csv_line(lines.next().unwrap()), row.columns());
        }
        assert!(lines.next().is_none());
    }

    #[test]
    fn quoted_fields() {
        let rows = to_csv_rows(&[reading(1_700_000_000, "N, \"NE\"")], &TargetZone::utc());

        assert_eq!(
            render_csv(&rows).lines().nth(1),
            Some("2023-11-14 10:13:20 PM,23.5,\"N, \"\"NE\"\"\",45,85")
        );
    }

    #[test]
    fn file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "logged_history_2024-03-07.csv");
    }
}
