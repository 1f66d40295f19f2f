use crate::{
    record::RawRecord,
    severity::{classify_severity, SeverityBand},
};
use chrono::{DateTime, Utc};
use strum::{Display, EnumIter};
use thiserror::Error;

/// Fewest sub-fields a record value may have and still be decoded.
pub const MIN_SUB_FIELDS: usize = 5;

const COMPASS_LABEL: &str = "compass";
const TEMPERATURE_LABEL: &str = "avgtemp";
const ANGLE_LABEL: &str = "angle";
const SEVERITY_LABEL: &str = "fireseverity";

/// Raw token a node reports when it is up.
const NODE_ONLINE_TOKEN: &str = "1";
const NODE_OFFLINE_TOKEN: &str = "0";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expected at least 5 sub-fields, found {0}")]
    TooFewFields(usize),

    #[error("Sub-field {0:?} has no ':' separator")]
    MissingSeparator(String),

    #[error("Required field {0} is missing")]
    MissingField(&'static str),

    #[error("Field {field} has non-numeric value {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Timestamp {0} is not representable")]
    InvalidTimestamp(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Node {
    #[strum(to_string = "Node 1")]
    NodeOne,
    #[strum(to_string = "Node 2")]
    NodeTwo,
    #[strum(to_string = "Central Hub")]
    CentralHub,
}

impl Node {
    fn label(&self) -> &'static str {
        match self {
            Self::NodeOne => "nodeone",
            Self::NodeTwo => "nodetwo",
            Self::CentralHub => "centralhub",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum NodeStatus {
    #[strum(to_string = "online")]
    Online,
    #[strum(to_string = "offline")]
    Offline,
    #[default]
    #[strum(to_string = "unknown")]
    Unknown,
}

impl NodeStatus {
    fn from_token(token: &str) -> Self {
        match token {
            NODE_ONLINE_TOKEN => Self::Online,
            NODE_OFFLINE_TOKEN => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn is_online(&self) -> bool {
        *self == Self::Online
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub key: String,
    pub timestamp: DateTime<Utc>,

    /// Degrees Celsius.
    pub average_temperature: f64,
    pub compass: String,

    /// Degrees.
    pub angle: f64,

    /// Percentage.
    pub fire_severity: f64,

    pub node_one: NodeStatus,
    pub node_two: NodeStatus,
    pub central_hub: NodeStatus,
}

impl Reading {
    pub fn node(&self, node: Node) -> NodeStatus {
        match node {
            Node::NodeOne => self.node_one,
            Node::NodeTwo => self.node_two,
            Node::CentralHub => self.central_hub,
        }
    }

    pub fn severity_band(&self) -> SeverityBand {
        classify_severity(self.fire_severity)
    }
}

type SubField<'a> = (&'a str, &'a str);

/// Decodes a stored record.
///
/// Sub-fields are located by a case-insensitive match on their label rather than by their
/// position, so the device is free to reorder them or add new ones.
pub fn parse_reading(raw: &RawRecord) -> Result<Reading, ParseError> {
    let parts: Vec<&str> = raw
        .value
        .split(", ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() < MIN_SUB_FIELDS {
        return Err(ParseError::TooFewFields(parts.len()));
    }

    let fields = parts
        .into_iter()
        .map(|part| {
            part.split_once(':')
                .map(|(label, value)| (label.trim(), value.trim()))
                .ok_or_else(|| ParseError::MissingSeparator(part.to_string()))
        })
        .collect::<Result<Vec<SubField>, _>>()?;

    let compass = find(&fields, COMPASS_LABEL).ok_or(ParseError::MissingField("Compass"))?;

    let average_temperature = find(&fields, TEMPERATURE_LABEL)
        .ok_or(ParseError::MissingField("AvgTemp"))
        .and_then(|v| {
            parse_number(
                "AvgTemp",
                v.trim_end_matches(|c: char| c.is_alphabetic() || c == '°'),
            )
        })?;

    let angle = find(&fields, ANGLE_LABEL)
        .ok_or(ParseError::MissingField("Angle"))
        .and_then(|v| parse_number("Angle", v))?;

    let fire_severity = find(&fields, SEVERITY_LABEL)
        .ok_or(ParseError::MissingField("FireSeverity"))
        .and_then(|v| parse_number("FireSeverity", v.trim_end_matches('%')))?;

    let node_status = |node: Node| {
        find(&fields, node.label())
            .map(NodeStatus::from_token)
            .unwrap_or_default()
    };

    Ok(Reading {
        key: raw.key.clone(),
        timestamp: parse_timestamp(raw.timestamp)?,
        average_temperature,
        compass: compass.to_string(),
        angle,
        fire_severity,
        node_one: node_status(Node::NodeOne),
        node_two: node_status(Node::NodeTwo),
        central_hub: node_status(Node::CentralHub),
    })
}

fn find<'a>(fields: &[SubField<'a>], label: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(l, _)| l.to_ascii_lowercase().contains(label))
        .map(|(_, v)| *v)
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ParseError> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_timestamp(seconds: f64) -> Result<DateTime<Utc>, ParseError> {
    if !seconds.is_finite() {
        return Err(ParseError::InvalidTimestamp(seconds));
    }

    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);

    DateTime::from_timestamp(whole as i64, nanos).ok_or(ParseError::InvalidTimestamp(seconds))
}
