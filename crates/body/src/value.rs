//! Decoded body representation.
//!
//! Multipart requests may submit the same field name several times. Instead of
//! modelling that with a dynamic value type, repeated keys are tracked
//! explicitly through [`OneOrMany`]: a key submitted once stays a scalar, a
//! repeated key is promoted to an ordered list that grows in arrival order.
//! This shape is caller visible, so the promotion rule lives in exactly one
//! place ([`MultiMap::insert`]).

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::mem;
use std::path::PathBuf;

use bytes::Bytes;
use serde::Serialize;

/// A value that is a scalar until its key is seen again.
///
/// Serializes untagged: `One` as the plain value, `Many` as an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Appends `value`, promoting `One(a)` to `Many([a, value])`.
    pub fn push(&mut self, value: T) {
        match mem::replace(self, OneOrMany::Many(Vec::new())) {
            OneOrMany::One(first) => {
                let mut values = Vec::with_capacity(2);
                values.push(first);
                values.push(value);
                *self = OneOrMany::Many(values);
            }
            OneOrMany::Many(mut values) => {
                values.push(value);
                *self = OneOrMany::Many(values);
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first value in arrival order.
    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.first(),
        }
    }
}

/// A map applying the scalar-to-list promotion rule on repeated keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MultiMap<T> {
    entries: HashMap<String, OneOrMany<T>>,
}

impl<T> Default for MultiMap<T> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<T> MultiMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`: absent keys store a scalar, present keys
    /// are promoted to an ordered list preserving arrival order.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(value),
            Entry::Vacant(entry) => {
                entry.insert(OneOrMany::One(value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OneOrMany<T>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OneOrMany<T>)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Text fields of a multipart body.
pub type FieldMap = MultiMap<String>;

/// File attachments of a multipart body.
pub type FileMap = MultiMap<FileInfo>;

/// Descriptor of a file attachment spooled to disk.
///
/// Handed mutably to the `on_file_begin` hook before any bytes are written,
/// so the destination `path` can be rewritten.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    /// File name as declared by the client, if any.
    pub file_name: Option<String>,
    /// Declared media type of the part, if any.
    pub content_type: Option<String>,
    /// Where the file content was written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub size: u64,
}

/// The decoded payload of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    /// No configured content kind matched; no body bytes were consumed.
    Empty,
    Json(serde_json::Value),
    Form(serde_json::Value),
    Text(String),
    Multipart { fields: FieldMap, files: FileMap },
}

/// Decode result attached to the request, optionally carrying the raw
/// collected bytes when `include_unparsed` is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody {
    value: BodyValue,
    raw: Option<Bytes>,
}

impl ParsedBody {
    pub(crate) fn new(value: BodyValue, raw: Option<Bytes>) -> Self {
        Self { value, raw }
    }

    pub(crate) fn multipart(fields: FieldMap, files: FileMap) -> Self {
        Self { value: BodyValue::Multipart { fields, files }, raw: None }
    }

    /// The empty result used when no content kind applies.
    pub fn empty() -> Self {
        Self { value: BodyValue::Empty, raw: None }
    }

    pub fn value(&self) -> &BodyValue {
        &self.value
    }

    /// Raw body bytes, present only when `include_unparsed` was set and the
    /// body was not multipart.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    /// Decoded value for json and form bodies.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.value {
            BodyValue::Json(value) | BodyValue::Form(value) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            BodyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Field map of a multipart body.
    pub fn fields(&self) -> Option<&FieldMap> {
        match &self.value {
            BodyValue::Multipart { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// File map of a multipart body.
    pub fn files(&self) -> Option<&FileMap> {
        match &self.value {
            BodyValue::Multipart { files, .. } => Some(files),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.value, BodyValue::Empty)
    }
}
