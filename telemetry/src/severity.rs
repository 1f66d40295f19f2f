use strum::{AsRefStr, Display, EnumIter};

/// Fire severity percentage above which a reading is no longer considered safe.
pub const WARNING_THRESHOLD: f64 = 50.0;

/// Fire severity percentage above which a reading is considered dangerous.
pub const DANGER_THRESHOLD: f64 = 80.0;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    AsRefStr,
    EnumIter,
)]
pub enum SeverityBand {
    Safe,
    Warning,
    Danger,
}

pub fn classify_severity(value: f64) -> SeverityBand {
    upper_threshold(value, WARNING_THRESHOLD, DANGER_THRESHOLD)
}

fn upper_threshold(value: f64, warn: f64, danger: f64) -> SeverityBand {
    if value > danger {
        SeverityBand::Danger
    } else if value > warn {
        SeverityBand::Warning
    } else {
        SeverityBand::Safe
    }
}
