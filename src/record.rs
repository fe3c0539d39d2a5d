//! Typed map record built from a walk's assignments.

use serde::Serialize;

use crate::codec::{AssignmentMap, Value, ValueKind};
use crate::error::FieldError;

/// Metadata recovered from one map file. Serializes with the field names and
/// order downstream consumers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRecord {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "bOutdoor")]
    pub outdoor: bool,
    pub capabilities: u32,
    pub background_num: u32,
    pub ambiance_id: u32,
    pub music_id: u32,
    pub map_data: String,
    pub can_aggro: bool,
    pub can_use_object: bool,
    pub can_change_charac: bool,
}

/// Variable names the record needs, with the value type each must hold.
pub const REQUIRED_FIELDS: [(&str, ValueKind); 12] = [
    ("id", ValueKind::U32),
    ("width", ValueKind::U32),
    ("height", ValueKind::U32),
    ("bOutdoor", ValueKind::Bool),
    ("capabilities", ValueKind::U32),
    ("backgroundNum", ValueKind::U32),
    ("ambianceId", ValueKind::U32),
    ("musicId", ValueKind::U32),
    ("mapData", ValueKind::Str),
    ("canAggro", ValueKind::Bool),
    ("canUseObject", ValueKind::Bool),
    ("canChangeCharac", ValueKind::Bool),
];

struct Fields<'a>(&'a AssignmentMap);

fn wrong_type(name: &'static str, expected: ValueKind, actual: &Value) -> FieldError {
    FieldError::WrongType { name, expected, actual: actual.kind() }
}

impl<'a> Fields<'a> {
    fn get(&self, name: &'static str) -> Result<&'a Value, FieldError> {
        self.0.get(name).ok_or(FieldError::Missing(name))
    }

    fn u32(&self, name: &'static str) -> Result<u32, FieldError> {
        match self.get(name)? {
            Value::U32(v) => Ok(*v),
            other @ (Value::Bool(_) | Value::Str(_)) => Err(wrong_type(name, ValueKind::U32, other)),
        }
    }

    fn bool(&self, name: &'static str) -> Result<bool, FieldError> {
        match self.get(name)? {
            Value::Bool(v) => Ok(*v),
            other @ (Value::U32(_) | Value::Str(_)) => Err(wrong_type(name, ValueKind::Bool, other)),
        }
    }

    fn string(&self, name: &'static str) -> Result<String, FieldError> {
        match self.get(name)? {
            Value::Str(s) => Ok(s.clone()),
            other @ (Value::Bool(_) | Value::U32(_)) => Err(wrong_type(name, ValueKind::Str, other)),
        }
    }
}

impl MapRecord {
    /// Build a record, checking fields in declaration order. Pure.
    pub fn extract(assignments: &AssignmentMap) -> Result<Self, FieldError> {
        let f = Fields(assignments);
        Ok(Self {
            id: f.u32("id")?,
            width: f.u32("width")?,
            height: f.u32("height")?,
            outdoor: f.bool("bOutdoor")?,
            capabilities: f.u32("capabilities")?,
            background_num: f.u32("backgroundNum")?,
            ambiance_id: f.u32("ambianceId")?,
            music_id: f.u32("musicId")?,
            map_data: f.string("mapData")?,
            can_aggro: f.bool("canAggro")?,
            can_use_object: f.bool("canUseObject")?,
            can_change_charac: f.bool("canChangeCharac")?,
        })
    }
}
