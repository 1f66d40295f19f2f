use crate::severity::SeverityBand;
use log::{debug, info};

/// Tracks classifications between polls so that an alert is raised once when severity enters
/// the danger band, rather than on every poll while it stays there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    previous_band: Option<SeverityBand>,
    alert_raised_for_current_run: bool,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_band(&self) -> Option<SeverityBand> {
        self.previous_band
    }

    pub fn alert_raised_for_current_run(&self) -> bool {
        self.alert_raised_for_current_run
    }

    /// Records a new classification, returning `true` if an alert should be raised for it.
    #[must_use = "the alert decision is lost if the result is not checked"]
    pub fn update(&mut self, band: SeverityBand) -> bool {
        let danger = band == SeverityBand::Danger;

        let should_alert = danger
            && (self.previous_band != Some(SeverityBand::Danger)
                || !self.alert_raised_for_current_run);

        if self.previous_band != Some(band) {
            debug!("Severity band changed: {:?} -> {}", self.previous_band, band);
        }

        if should_alert {
            info!("Severity entered {band}, raising alert");
        }

        self.alert_raised_for_current_run = danger;
        self.previous_band = Some(band);

        should_alert
    }
}
