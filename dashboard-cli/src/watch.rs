use crate::{source::Source, Error, Runner};
use clap::Parser;
use firewatch_telemetry::{Node, Snapshot, TargetZone, TelemetryProcessor};
use log::{info, warn};
use std::time::Duration;
use strum::IntoEnumIterator;

#[derive(Parser)]
pub(super) struct Cli {
    /// Poll the database every n milliseconds
    #[arg(long, default_value_t = 5000)]
    interval: u64,

    /// Stop after this many polls
    #[arg(long, default_value = None)]
    count: Option<usize>,
}

impl Runner for Cli {
    async fn run(&self, source: Source, zone: TargetZone) -> Result<(), Error> {
        let mut processor = TelemetryProcessor::new(zone);
        let mut ticker = tokio::time::interval(Duration::from_millis(self.interval));
        let mut polls = 0;

        loop {
            ticker.tick().await;

            match source.fetch().await {
                Ok(records) => {
                    let snapshot = processor.process(&records, zone.today());
                    report(&snapshot, &zone);
                }
                Err(e) => warn!("Poll failed: {e}"),
            }

            polls += 1;
            if self.count.is_some_and(|count| polls >= count) {
                break Ok(());
            }
        }
    }
}

fn report(snapshot: &Snapshot, zone: &TargetZone) {
    let (Some(latest), Some(band)) = (&snapshot.latest, snapshot.band) else {
        info!("No data");
        return;
    };

    let nodes = Node::iter()
        .map(|node| format!("{node}={}", latest.node(node)))
        .collect::<Vec<_>>()
        .join(", ");

    info!(
        "{}: {}°C, compass {}, angle {}°, fire severity {}% ({band}), {nodes} [{} today]",
        zone.localise(&latest.timestamp).format("%Y-%m-%d %H:%M:%S"),
        latest.average_temperature,
        latest.compass,
        latest.angle,
        latest.fire_severity,
        snapshot.readings.len(),
    );

    if snapshot.should_alert {
        warn!(
            "ALERT: fire severity {}% is in the {band} band",
            latest.fire_severity
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn stops_after_count_polls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "-N1": {{ "timestamp": 1700000000, "value": "Compass:N, AvgTemp:20C, Angle:0, FireSeverity:90%, Nodeone:1" }} }}"#
        )
        .unwrap();

        let cli = Cli {
            interval: 1,
            count: Some(2),
        };
        let source = Source::File(file.path().to_path_buf());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            cli.run(source, TargetZone::utc()),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn failed_polls_count_towards_stopping() {
        let cli = Cli {
            interval: 1,
            count: Some(3),
        };
        let source = Source::File("/definitely/not/here.json".into());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            cli.run(source, TargetZone::utc()),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[test]
    fn report_empty_snapshot() {
        report(&Snapshot::default(), &TargetZone::utc());
    }
}
