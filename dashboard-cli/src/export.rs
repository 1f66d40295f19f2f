use crate::{source::Source, Error, Runner};
use chrono::NaiveDate;
use clap::Parser;
use firewatch_telemetry::{CsvExport, TargetZone, TelemetryProcessor};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser)]
pub(super) struct Cli {
    /// Day to export as YYYY-MM-DD, today if not given
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Directory to write the CSV file to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

impl Runner for Cli {
    async fn run(&self, source: Source, zone: TargetZone) -> Result<(), Error> {
        let date = self.date.unwrap_or_else(|| zone.today());

        let records = source.fetch().await?;
        let export = TelemetryProcessor::new(zone).export(&records, date);

        if export.rows == 0 {
            warn!("No readings were taken on {date}");
        }

        let path = write_export(&export, &self.output_dir).await?;
        info!("Wrote {} readings to {}", export.rows, path.display());

        Ok(())
    }
}

pub(crate) async fn write_export(export: &CsvExport, dir: &Path) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(&export.file_name);
    tokio::fs::write(&path, &export.contents).await?;

    Ok(path)
}
