//! Persistence field lists
//!
//! Every edit kind exposes a deterministic, ordered list of named fields.
//! The list is the only contract with the persistence layer: writing it out
//! and reading it back yields the same list, and feature references are
//! stored by stable id. Revisions use the same names to address the values
//! they exchange.

use crate::edit::{CircleObservation, Direction, EditKind, TextAnchor};
use crate::error::FieldError;
use crate::types::{EditSequence, EntityType, FeatureId};
use cadastre_geom::{Leg, LegShape, ObservedSpan, PathSpan, Position};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A persisted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Absent optional value
    Null,
    /// Flag
    Bool(bool),
    /// Number
    Float(f64),
    /// Text
    Text(String),
    /// Feature reference by id
    Feature(FeatureId),
    /// Edit reference by sequence number
    Sequence(EditSequence),
    /// Planar position
    Position(Position),
    /// Ordered list
    List(Vec<FieldValue>),
    /// Nested field list
    Object(Vec<Field>),
}

/// A named value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field value
    pub value: FieldValue,
}

impl Field {
    /// Create a field
    #[must_use]
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

fn field<T: FieldCodec>(name: &str, value: &T) -> Field {
    Field::new(name, value.to_value())
}

fn mismatch(name: &str, expected: &'static str) -> FieldError {
    FieldError::TypeMismatch {
        name: name.to_string(),
        expected,
    }
}

/// Conversion between a value and its persisted form
pub trait FieldCodec: Sized {
    /// Persisted form
    fn to_value(&self) -> FieldValue;

    /// Read back from persisted form; `name` is used in errors
    ///
    /// # Errors
    /// Returns error if the value has the wrong shape
    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError>;
}

macro_rules! scalar_codec {
    ($ty:ty, $variant:ident, $expected:literal) => {
        #[allow(clippy::clone_on_copy)]
        impl FieldCodec for $ty {
            fn to_value(&self) -> FieldValue {
                FieldValue::$variant(self.clone())
            }

            fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
                match value {
                    FieldValue::$variant(v) => Ok(v.clone()),
                    _ => Err(mismatch(name, $expected)),
                }
            }
        }
    };
}

scalar_codec!(bool, Bool, "a bool");
scalar_codec!(f64, Float, "a number");
scalar_codec!(String, Text, "text");
scalar_codec!(FeatureId, Feature, "a feature reference");
scalar_codec!(EditSequence, Sequence, "an edit reference");
scalar_codec!(Position, Position, "a position");

impl<T: FieldCodec> FieldCodec for Option<T> {
    fn to_value(&self) -> FieldValue {
        self.as_ref().map_or(FieldValue::Null, FieldCodec::to_value)
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_value(name, other).map(Some),
        }
    }
}

impl<T: FieldCodec> FieldCodec for Vec<T> {
    fn to_value(&self) -> FieldValue {
        FieldValue::List(self.iter().map(FieldCodec::to_value).collect())
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::List(items) => items.iter().map(|v| T::from_value(name, v)).collect(),
            _ => Err(mismatch(name, "a list")),
        }
    }
}

/// Reads named fields out of a field list
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    fields: &'a [Field],
}

impl<'a> FieldReader<'a> {
    /// Reader over a field list
    #[must_use]
    pub fn new(fields: &'a [Field]) -> Self {
        Self { fields }
    }

    /// Reader over a nested object value
    ///
    /// # Errors
    /// Returns error if the value is not an object
    pub fn object(name: &str, value: &'a FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Object(fields) => Ok(Self::new(fields)),
            _ => Err(mismatch(name, "an object")),
        }
    }

    /// Raw value of a field
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&'a FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Typed value of a field
    ///
    /// # Errors
    /// Returns error if the field is missing or has the wrong type
    pub fn get<T: FieldCodec>(&self, name: &str) -> Result<T, FieldError> {
        let value = self
            .value(name)
            .ok_or_else(|| FieldError::Missing(name.to_string()))?;
        T::from_value(name, value)
    }
}

impl FieldCodec for Direction {
    fn to_value(&self) -> FieldValue {
        FieldValue::Object(vec![
            field("from", &self.from),
            field("bearing", &self.bearing),
            field("offset", &self.offset),
        ])
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        let r = FieldReader::object(name, value)?;
        Ok(Self {
            from: r.get("from")?,
            bearing: r.get("bearing")?,
            offset: r.get("offset")?,
        })
    }
}

impl FieldCodec for CircleObservation {
    fn to_value(&self) -> FieldValue {
        FieldValue::Object(vec![
            field("center", &self.center),
            field("distance", &self.distance),
        ])
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        let r = FieldReader::object(name, value)?;
        Ok(Self {
            center: r.get("center")?,
            distance: r.get("distance")?,
        })
    }
}

impl FieldCodec for ObservedSpan {
    fn to_value(&self) -> FieldValue {
        FieldValue::Object(vec![field("length", &self.length), field("fixed", &self.fixed)])
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        let r = FieldReader::object(name, value)?;
        Ok(Self {
            length: r.get("length")?,
            fixed: r.get("fixed")?,
        })
    }
}

impl FieldCodec for PathSpan {
    fn to_value(&self) -> FieldValue {
        FieldValue::Object(vec![
            field("length", &self.length),
            field("fixed", &self.fixed),
            field("omit_point", &self.omit_point),
            field("miss_connect", &self.miss_connect),
        ])
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        let r = FieldReader::object(name, value)?;
        Ok(Self {
            length: r.get("length")?,
            fixed: r.get("fixed")?,
            omit_point: r.get("omit_point")?,
            miss_connect: r.get("miss_connect")?,
        })
    }
}

impl FieldCodec for Leg {
    fn to_value(&self) -> FieldValue {
        let (radius, clockwise) = match self.shape {
            LegShape::Straight => (None, false),
            LegShape::Arc { radius, clockwise } => (Some(radius), clockwise),
        };
        FieldValue::Object(vec![
            field("deflection", &self.deflection),
            field("radius", &radius),
            field("clockwise", &clockwise),
            field("spans", &self.spans),
        ])
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        let r = FieldReader::object(name, value)?;
        let shape = match r.get::<Option<f64>>("radius")? {
            None => LegShape::Straight,
            Some(radius) => LegShape::Arc {
                radius,
                clockwise: r.get("clockwise")?,
            },
        };
        Ok(Self {
            deflection: r.get("deflection")?,
            shape,
            spans: r.get("spans")?,
        })
    }
}

impl FieldCodec for TextAnchor {
    fn to_value(&self) -> FieldValue {
        let (point, position) = match self {
            Self::Fixed { position } => (None, Some(*position)),
            Self::Point { point } => (Some(*point), None),
        };
        FieldValue::Object(vec![field("point", &point), field("position", &position)])
    }

    fn from_value(name: &str, value: &FieldValue) -> Result<Self, FieldError> {
        let r = FieldReader::object(name, value)?;
        match r.get::<Option<FeatureId>>("point")? {
            Some(point) => Ok(Self::Point { point }),
            None => Ok(Self::Fixed {
                position: r.get("position")?,
            }),
        }
    }
}

impl EditKind {
    /// Ordered persistence field list
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        match self {
            Self::NewPoint { position } => vec![field("position", position)],
            Self::NewLine {
                start,
                end,
                center,
                clockwise,
            } => vec![
                field("start", start),
                field("end", end),
                field("center", center),
                field("clockwise", clockwise),
            ],
            Self::Radial {
                direction,
                distance,
                add_line,
            } => vec![
                field("direction", direction),
                field("distance", distance),
                field("add_line", add_line),
            ],
            Self::IntersectDirections { a, b, add_lines } => {
                vec![field("a", a), field("b", b), field("add_lines", add_lines)]
            }
            Self::IntersectDistances {
                a,
                b,
                use_default,
                add_lines,
            } => vec![
                field("a", a),
                field("b", b),
                field("use_default", use_default),
                field("add_lines", add_lines),
            ],
            Self::IntersectDirectionAndDistance {
                direction,
                circle,
                use_default,
            } => vec![
                field("direction", direction),
                field("circle", circle),
                field("use_default", use_default),
            ],
            Self::IntersectDirectionAndLine {
                direction,
                line,
                close_to,
                split,
            } => vec![
                field("direction", direction),
                field("line", line),
                field("close_to", close_to),
                field("split", split),
            ],
            Self::IntersectLines {
                a,
                b,
                close_to,
                split_a,
                split_b,
            } => vec![
                field("a", a),
                field("b", b),
                field("close_to", close_to),
                field("split_a", split_a),
                field("split_b", split_b),
            ],
            Self::Path { from, to, legs } => {
                vec![field("from", from), field("to", to), field("legs", legs)]
            }
            Self::SimpleLineSubdivision { line, distance } => {
                vec![field("line", line), field("distance", distance)]
            }
            Self::LineSubdivision { line, spans } => {
                vec![field("line", line), field("spans", spans)]
            }
            Self::AttachPoint {
                line,
                position_ratio,
                split,
            } => vec![
                field("line", line),
                field("position_ratio", position_ratio),
                field("split", split),
            ],
            Self::LineExtension {
                line,
                from_end,
                distance,
                add_line,
            } => vec![
                field("line", line),
                field("from_end", from_end),
                field("distance", distance),
                field("add_line", add_line),
            ],
            Self::NewText { text, anchor } => vec![field("text", text), field("anchor", anchor)],
            Self::MoveText { text, position } => {
                vec![field("text", text), field("position", position)]
            }
            Self::NewPolygon { boundary } => vec![field("boundary", boundary)],
            Self::TrimLines { lines } => vec![field("lines", lines)],
            Self::Deletion { features } => vec![field("features", features)],
            Self::Update { target, changes } => vec![
                field("target", target),
                Field::new("changes", FieldValue::Object(changes.clone())),
            ],
        }
    }

    /// Rebuild an edit kind from its tag and field list
    ///
    /// # Errors
    /// Returns error if the tag is unknown or a field is missing or mistyped
    pub fn from_fields(tag: &str, fields: &[Field]) -> Result<Self, FieldError> {
        let r = FieldReader::new(fields);
        Ok(match tag {
            "new_point" => Self::NewPoint {
                position: r.get("position")?,
            },
            "new_line" => Self::NewLine {
                start: r.get("start")?,
                end: r.get("end")?,
                center: r.get("center")?,
                clockwise: r.get("clockwise")?,
            },
            "radial" => Self::Radial {
                direction: r.get("direction")?,
                distance: r.get("distance")?,
                add_line: r.get("add_line")?,
            },
            "intersect_directions" => Self::IntersectDirections {
                a: r.get("a")?,
                b: r.get("b")?,
                add_lines: r.get("add_lines")?,
            },
            "intersect_distances" => Self::IntersectDistances {
                a: r.get("a")?,
                b: r.get("b")?,
                use_default: r.get("use_default")?,
                add_lines: r.get("add_lines")?,
            },
            "intersect_direction_and_distance" => Self::IntersectDirectionAndDistance {
                direction: r.get("direction")?,
                circle: r.get("circle")?,
                use_default: r.get("use_default")?,
            },
            "intersect_direction_and_line" => Self::IntersectDirectionAndLine {
                direction: r.get("direction")?,
                line: r.get("line")?,
                close_to: r.get("close_to")?,
                split: r.get("split")?,
            },
            "intersect_lines" => Self::IntersectLines {
                a: r.get("a")?,
                b: r.get("b")?,
                close_to: r.get("close_to")?,
                split_a: r.get("split_a")?,
                split_b: r.get("split_b")?,
            },
            "path" => Self::Path {
                from: r.get("from")?,
                to: r.get("to")?,
                legs: r.get("legs")?,
            },
            "simple_line_subdivision" => Self::SimpleLineSubdivision {
                line: r.get("line")?,
                distance: r.get("distance")?,
            },
            "line_subdivision" => Self::LineSubdivision {
                line: r.get("line")?,
                spans: r.get("spans")?,
            },
            "attach_point" => Self::AttachPoint {
                line: r.get("line")?,
                position_ratio: r.get("position_ratio")?,
                split: r.get("split")?,
            },
            "line_extension" => Self::LineExtension {
                line: r.get("line")?,
                from_end: r.get("from_end")?,
                distance: r.get("distance")?,
                add_line: r.get("add_line")?,
            },
            "new_text" => Self::NewText {
                text: r.get("text")?,
                anchor: r.get("anchor")?,
            },
            "move_text" => Self::MoveText {
                text: r.get("text")?,
                position: r.get("position")?,
            },
            "new_polygon" => Self::NewPolygon {
                boundary: r.get("boundary")?,
            },
            "trim_lines" => Self::TrimLines {
                lines: r.get("lines")?,
            },
            "deletion" => Self::Deletion {
                features: r.get("features")?,
            },
            "update" => {
                let changes = match r.value("changes") {
                    Some(FieldValue::Object(changes)) => changes.clone(),
                    Some(_) => return Err(mismatch("changes", "an object")),
                    None => return Err(FieldError::Missing("changes".into())),
                };
                Self::Update {
                    target: r.get("target")?,
                    changes,
                }
            }
            other => return Err(FieldError::UnknownTag(other.to_string())),
        })
    }

    /// Current value of a named field
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<FieldValue> {
        self.fields().into_iter().find(|f| f.name == name).map(|f| f.value)
    }

    /// Copy of this edit with one field replaced
    ///
    /// # Errors
    /// Returns error if there is no such field or the value has the wrong type
    pub fn with_field(&self, name: &str, value: FieldValue) -> Result<Self, FieldError> {
        let mut fields = self.fields();
        let slot = fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        slot.value = value;
        Self::from_fields(self.tag(), &fields)
    }
}

/// Persisted form of one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    /// Edit-sequence number
    pub sequence: EditSequence,
    /// Edit kind tag
    pub tag: String,
    /// Ordered field list of the edit as originally executed
    pub fields: Vec<Field>,
    /// Output name to created feature id
    pub outputs: IndexMap<String, FeatureId>,
    /// Entity tags of outputs that differ from the defaults
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub entities: IndexMap<String, EntityType>,
}

impl EditRecord {
    /// Rebuild the edit kind
    ///
    /// # Errors
    /// Returns error if the tag or fields are invalid
    pub fn kind(&self) -> Result<EditKind, FieldError> {
        EditKind::from_fields(&self.tag, &self.fields)
    }
}
