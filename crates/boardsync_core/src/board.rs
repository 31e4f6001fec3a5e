//! Board state: draw history, sticky notes and versioning.
//!
//! All types serialize to the camelCase JSON shape shared by the wire
//! protocol and the durable cache (`boardId`, `lineHist`, `noteList`,
//! `createdTimestamp`).

use crate::error::CoreResult;
use crate::types::{BoardId, VersionToken};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Drawing mode of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMode {
    /// Freehand stroke between two sampled points.
    #[default]
    Freehand,
    /// Straight line between two endpoints.
    Line,
    /// Rectangle spanned by two corners.
    Box,
    /// Circle within the given bounds.
    Circle,
}

// Renderers treat any unrecognized mode as freehand, so decoding does too.
impl<'de> Deserialize<'de> for LineMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(match text.as_str() {
            "line" => LineMode::Line,
            "box" => LineMode::Box,
            "circle" => LineMode::Circle,
            _ => LineMode::Freehand,
        })
    }
}

/// A single drawn line segment (or box/circle bounds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Client-assigned line id, unique within the board.
    pub id: u64,
    /// First endpoint / bounds corner.
    #[serde(default)]
    pub x0: f64,
    /// First endpoint / bounds corner.
    #[serde(default)]
    pub y0: f64,
    /// Second endpoint / bounds corner.
    #[serde(default)]
    pub x1: f64,
    /// Second endpoint / bounds corner.
    #[serde(default)]
    pub y1: f64,
    /// Stroke color.
    #[serde(default)]
    pub color: String,
    /// Stroke width in canvas units.
    #[serde(default)]
    pub width: f64,
    /// Drawing mode.
    #[serde(default)]
    pub mode: LineMode,
    /// Whether the line is hidden (erased without being removed).
    #[serde(default)]
    pub hidden: bool,
}

/// A sticky note.
///
/// Notes carry free-form fields (position, color, text, fold state and
/// whatever else the client attaches); updates are shallow-merged onto
/// the existing note, so unspecified fields survive partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note id, unique within the board.
    pub id: String,
    /// Remaining free-form fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Note {
    /// Creates an empty note with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Shallow-merges `patch` onto this note.
    ///
    /// Fields present in the patch overwrite; absent fields are kept.
    pub fn merge(&mut self, patch: &Note) {
        for (key, value) in &patch.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Returns the note's hidden flag, if set.
    #[must_use]
    pub fn hidden(&self) -> Option<bool> {
        self.fields.get("hidden").and_then(Value::as_bool)
    }

    /// Sets the hidden flag. Returns `true` if the stored value changed.
    pub fn set_hidden(&mut self, hidden: bool) -> bool {
        if self.hidden() == Some(hidden) {
            return false;
        }
        self.fields.insert("hidden".into(), Value::Bool(hidden));
        true
    }
}

/// A shared board: draw history, notes, version and creation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// The board's id.
    pub board_id: BoardId,
    /// Version token, regenerated on every accepted mutation.
    pub version: VersionToken,
    /// Draw history in draw order. Append-only except for in-place
    /// `hidden` toggles.
    #[serde(default)]
    pub line_hist: Vec<Line>,
    /// Sticky notes, keyed by note id.
    #[serde(default)]
    pub note_list: HashMap<String, Note>,
    /// Creation time in milliseconds since epoch. Set only on the
    /// explicit create path; lazily created boards have none and are
    /// excluded from recency listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<u64>,
    /// Advisory access-gate token, enforced client-side only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl Board {
    /// Creates an empty board with a fresh version and no creation
    /// timestamp (the lazy-create path).
    #[must_use]
    pub fn new(board_id: BoardId) -> Self {
        Self {
            board_id,
            version: VersionToken::new(),
            line_hist: Vec::new(),
            note_list: HashMap::new(),
            created_timestamp: None,
            pin: None,
        }
    }

    /// Regenerates the version token. Called on every accepted mutation.
    pub fn touch(&mut self) -> VersionToken {
        self.version = VersionToken::new();
        self.version
    }

    /// Serializes the board to its cache/wire JSON.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a board from its cache/wire JSON.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
