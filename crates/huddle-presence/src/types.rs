// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence table data types.
//!
//! The table is keyed by `"<kind>:<id>"` and maps each connected actor to a
//! list of meta records, one per connected device/tab. A key with zero metas
//! must never exist: absence of the key is "offline".

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of actor a presence key refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PresenceKind {
    Customer,
    User,
}

/// A presence table key, serialized as `"customer:<id>"` / `"user:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresenceKey {
    pub kind: PresenceKind,
    pub id: String,
}

impl PresenceKey {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            kind: PresenceKind::Customer,
            id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: PresenceKind::User,
            id: id.into(),
        }
    }
}

impl fmt::Display for PresenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Error parsing a presence key from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid presence key `{0}`")]
pub struct ParsePresenceKeyError(pub String);

impl FromStr for PresenceKey {
    type Err = ParsePresenceKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ParsePresenceKeyError(s.to_string()))?;
        let kind = PresenceKind::from_str(kind)
            .map_err(|_| ParsePresenceKeyError(s.to_string()))?;
        if id.is_empty() {
            return Err(ParsePresenceKeyError(s.to_string()));
        }
        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }
}

impl Serialize for PresenceKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PresenceKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One connected device/tab for an actor.
///
/// Metas are distinguished by their opaque session reference; duplicate
/// field values across distinct sessions are legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceMeta {
    /// Opaque per-session reference assigned by the server on join.
    pub phx_ref: String,
    /// Connect timestamp in epoch seconds, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_at: Option<i64>,
}

impl PresenceMeta {
    pub fn new(phx_ref: impl Into<String>) -> Self {
        Self {
            phx_ref: phx_ref.into(),
            online_at: None,
        }
    }
}

/// An immutable presence table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresenceTable(pub BTreeMap<PresenceKey, Vec<PresenceMeta>>);

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the actor has at least one connected session.
    pub fn is_online(&self, key: &PresenceKey) -> bool {
        self.0.get(key).is_some_and(|metas| !metas.is_empty())
    }

    pub fn metas(&self, key: &PresenceKey) -> &[PresenceMeta] {
        self.0.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A presence diff: joins and leaves to apply against a table snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresenceDiff {
    #[serde(default)]
    pub joins: BTreeMap<PresenceKey, Vec<PresenceMeta>>,
    #[serde(default)]
    pub leaves: BTreeMap<PresenceKey, Vec<PresenceMeta>>,
}
