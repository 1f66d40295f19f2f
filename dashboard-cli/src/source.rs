use clap::Args;
use firewatch_telemetry::{RecordSet, SnapshotError};
use log::debug;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Args)]
pub(crate) struct SourceArgs {
    /// Base URL of the realtime database
    #[arg(long, env = "FIREWATCH_STORE_URL", global = true)]
    url: Option<String>,

    /// Location of the readings within the database
    #[arg(long, default_value = "readings", global = true)]
    path: String,

    /// Database secret or ID token
    #[arg(long, env = "FIREWATCH_STORE_AUTH", hide_env_values = true, global = true)]
    auth: Option<String>,

    /// Read readings from a JSON export of the database, takes precedence over the URL
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Database request timeout in milliseconds
    #[arg(long, default_value_t = 3000, global = true)]
    timeout: u64,
}

impl SourceArgs {
    pub(crate) fn build(&self) -> Result<Source, SourceError> {
        match (&self.url, &self.file) {
            (_, Some(file)) => Ok(Source::File(file.clone())),
            (Some(url), None) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_millis(self.timeout))
                    .build()?;

                Ok(Source::Http {
                    client,
                    url: collection_url(url, &self.path),
                    auth: self.auth.clone(),
                })
            }
            (None, None) => Err(SourceError::NotConfigured),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("No database URL or file given")]
    NotConfigured,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Where raw records are fetched from on every poll.
pub(crate) enum Source {
    Http {
        client: reqwest::Client,
        url: String,
        auth: Option<String>,
    },
    File(PathBuf),
}

impl Source {
    pub(crate) async fn fetch(&self) -> Result<RecordSet, SourceError> {
        let body = match self {
            Self::Http { client, url, auth } => {
                let mut request = client.get(url);
                if let Some(auth) = auth {
                    request = request.query(&[("auth", auth)]);
                }

                request.send().await?.error_for_status()?.text().await?
            }
            Self::File(path) => tokio::fs::read_to_string(path).await?,
        };

        let records = RecordSet::from_json_str(&body)?;
        debug!("Fetched {} records", records.len());

        Ok(records)
    }
}

/// REST endpoint of a location in the database.
fn collection_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}.json",
        base.trim_end_matches('/'),
        path.trim_matches('/')
    )
}
