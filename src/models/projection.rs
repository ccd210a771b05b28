//! Projection domain types
//!
//! A projection is one prop line for one player and stat. Only the fields the
//! line-movement tracker reasons about are typed; everything else the feed
//! sends rides along untouched in `extra` and `relationships`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Projection Status ==
/// Game state of the event a projection belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectionStatus {
    PreGame,
    InProgress,
    Final,
    Other(String),
}

impl From<String> for ProjectionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pre_game" => ProjectionStatus::PreGame,
            "in_progress" => ProjectionStatus::InProgress,
            "final" => ProjectionStatus::Final,
            _ => ProjectionStatus::Other(value),
        }
    }
}

impl From<ProjectionStatus> for String {
    fn from(status: ProjectionStatus) -> Self {
        match status {
            ProjectionStatus::PreGame => "pre_game".to_string(),
            ProjectionStatus::InProgress => "in_progress".to_string(),
            ProjectionStatus::Final => "final".to_string(),
            ProjectionStatus::Other(other) => other,
        }
    }
}

// == Line Movement ==
/// Direction a line has moved since it was first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Change of a line relative to its first observed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMovement {
    /// Line value when the projection was first observed
    pub original: f64,
    /// Latest observed line value
    pub current: f64,
    pub direction: Direction,
    /// `current - original`, signed
    pub difference: f64,
}

impl LineMovement {
    /// Returns the movement from `original` to `current`, or `None` when the
    /// two are exactly equal.
    pub fn between(original: f64, current: f64) -> Option<Self> {
        if current == original {
            return None;
        }

        let direction = if current > original {
            Direction::Up
        } else {
            Direction::Down
        };

        Some(Self {
            original,
            current,
            direction,
            difference: current - original,
        })
    }
}

// == Projection Attributes ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionAttributes {
    /// Current line value
    pub line_score: f64,
    #[serde(default)]
    pub stat_type: String,
    /// Scheduled start of the event
    pub start_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_movement: Option<LineMovement>,
    /// Remaining feed attributes, passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// == Projection ==
/// One prop line as delivered by the upstream feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub id: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub attributes: ProjectionAttributes,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub relationships: Value,
}

fn default_kind() -> String {
    "projection".to_string()
}

impl Projection {
    /// Parses and validates a single feed item.
    ///
    /// Returns a description of the problem for items that would poison the
    /// cache: undeserializable shapes, empty ids, non-finite lines.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        let projection: Projection =
            serde_json::from_value(value).map_err(|e| e.to_string())?;
        projection.validate()?;
        Ok(projection)
    }

    /// Checks the invariants the tracker relies on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("projection id is empty".to_string());
        }
        if !self.attributes.line_score.is_finite() {
            return Err(format!(
                "projection {} has non-finite line_score",
                self.id
            ));
        }
        Ok(())
    }

    pub fn line_score(&self) -> f64 {
        self.attributes.line_score
    }

    /// Event start as Unix milliseconds.
    pub fn start_time_ms(&self) -> i64 {
        self.attributes.start_time.timestamp_millis()
    }

    /// Returns a copy annotated with the given movement (or with none).
    pub fn with_movement(&self, movement: Option<LineMovement>) -> Self {
        let mut projection = self.clone();
        projection.attributes.line_movement = movement;
        projection
    }
}
