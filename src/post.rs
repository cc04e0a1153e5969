//! The post document and the casting of raw request JSON onto its schema.
//!
//! The schema is `{ title: string, body: string }` plus a store-generated
//! `_id`. Request bodies are not validated: [`PostFields::cast`] picks the
//! two schema paths out of whatever JSON arrived, coerces scalars to text,
//! drops every other key, and fails only when a path holds a value that has
//! no text form at all (an object or an array).

use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::store::StoreError;

// ── PostId ────────────────────────────────────────────────────────────────────

/// Store-generated identifier. On the wire it is the 24-character hex form
/// of a BSON `ObjectId`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PostId(ObjectId);

impl PostId {
    /// A fresh, process-unique id.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Casts a path parameter into an id. A string that is not 24 hex digits
    /// is a store failure, not a miss.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|_| StoreError::InvalidId { value: raw.to_owned() })
    }

    pub fn object_id(self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for PostId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl Serialize for PostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ObjectId::parse_str(&raw)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

// ── Post ──────────────────────────────────────────────────────────────────────

/// A persisted post as clients see it: `{"_id": "...", "title": ..., "body": ...}`.
///
/// Unset paths are left out of the JSON entirely.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: PostId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

// ── PostFields ────────────────────────────────────────────────────────────────

/// One schema path as supplied by a caller.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Field {
    /// Not mentioned; an update leaves the stored value alone.
    #[default]
    Absent,
    /// Explicitly `null`; an update clears the stored value.
    Null,
    Text(String),
}

impl Field {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Absent | Self::Null => None,
        }
    }
}

/// The schema paths extracted from a request body.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PostFields {
    pub title: Field,
    pub body: Field,
}

impl PostFields {
    pub const PATHS: [&'static str; 2] = ["title", "body"];

    /// Extracts `title` and `body` from `raw`.
    ///
    /// A body that is not a JSON object carries no fields.
    pub fn cast(raw: &Value) -> Result<Self, StoreError> {
        let Value::Object(map) = raw else {
            return Ok(Self::default());
        };
        Ok(Self {
            title: cast_path(map, "title")?,
            body: cast_path(map, "body")?,
        })
    }

    /// True when neither path was supplied.
    pub fn is_empty(&self) -> bool {
        self.title.is_absent() && self.body.is_absent()
    }

    /// A new post with these fields; absent and null paths are both unset.
    pub fn into_post(self, id: PostId) -> Post {
        Post {
            id,
            title: self.title.into_option(),
            body: self.body.into_option(),
        }
    }

    /// Merges the supplied paths into `post`, leaving absent ones untouched.
    pub fn apply_to(self, post: &mut Post) {
        if !self.title.is_absent() {
            post.title = self.title.into_option();
        }
        if !self.body.is_absent() {
            post.body = self.body.into_option();
        }
    }

    /// The supplied paths in a fixed order, for building store updates.
    pub fn supplied(&self) -> impl Iterator<Item = (&'static str, &Field)> {
        Self::PATHS
            .into_iter()
            .zip([&self.title, &self.body])
            .filter(|(_, field)| !field.is_absent())
    }
}

fn cast_path(map: &Map<String, Value>, path: &'static str) -> Result<Field, StoreError> {
    match map.get(path) {
        None => Ok(Field::Absent),
        Some(Value::Null) => Ok(Field::Null),
        Some(Value::String(text)) => Ok(Field::Text(text.clone())),
        Some(Value::Number(n)) => Ok(Field::Text(n.to_string())),
        Some(Value::Bool(b)) => Ok(Field::Text(b.to_string())),
        Some(value @ (Value::Array(_) | Value::Object(_))) => Err(StoreError::Cast {
            path,
            value: value.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn id_round_trips_through_hex() {
        let id = PostId::parse("65f1c2a4e13b7d0012ab34cd").unwrap();
        assert_eq!(id.to_string(), "65f1c2a4e13b7d0012ab34cd");
    }

    #[test]
    fn malformed_id_is_a_cast_error() {
        let err = PostId::parse("not-an-id").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { ref value } if value == "not-an-id"));
    }

    #[test]
    fn post_serializes_with_underscore_id_and_omits_unset_paths() {
        let id = PostId::parse("65f1c2a4e13b7d0012ab34cd").unwrap();
        let post = Post { id, title: Some("A".into()), body: None };
        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            json!({"_id": "65f1c2a4e13b7d0012ab34cd", "title": "A"})
        );
    }

    #[test]
    fn cast_keeps_schema_paths_and_drops_the_rest() {
        let fields = PostFields::cast(&json!({"title": "A", "author": "x"})).unwrap();
        assert_eq!(fields.title, Field::Text("A".into()));
        assert_eq!(fields.body, Field::Absent);
    }

    #[test]
    fn cast_coerces_scalars_to_text() {
        let fields = PostFields::cast(&json!({"title": 42, "body": true})).unwrap();
        assert_eq!(fields.title, Field::Text("42".into()));
        assert_eq!(fields.body, Field::Text("true".into()));
    }

    #[test]
    fn cast_rejects_structured_values() {
        let err = PostFields::cast(&json!({"body": {"nested": 1}})).unwrap_err();
        assert!(matches!(err, StoreError::Cast { path: "body", .. }));
    }

    #[test]
    fn non_object_bodies_carry_no_fields() {
        assert!(PostFields::cast(&json!(["title"])).unwrap().is_empty());
        assert!(PostFields::cast(&json!("title")).unwrap().is_empty());
    }

    #[test]
    fn apply_merges_only_supplied_paths() {
        let id = PostId::generate();
        let mut post = Post { id, title: Some("A".into()), body: Some("B".into()) };

        PostFields::cast(&json!({"title": "C"})).unwrap().apply_to(&mut post);
        assert_eq!(post, Post { id, title: Some("C".into()), body: Some("B".into()) });

        PostFields::cast(&json!({"body": null})).unwrap().apply_to(&mut post);
        assert_eq!(post, Post { id, title: Some("C".into()), body: None });
    }

    #[test]
    fn supplied_lists_present_paths_in_order() {
        let fields = PostFields::cast(&json!({"body": "B", "title": null})).unwrap();
        let paths: Vec<_> = fields.supplied().map(|(path, _)| path).collect();
        assert_eq!(paths, ["title", "body"]);
    }
}
