// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command items and resource references.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A relative, locale-aware, fallback-enabled media reference.
///
/// Semicolon-separated fallback list; a fallback starting with `*` is a
/// wildcard picked at random from matching app bundles. Absolute paths are
/// rejected at parse time so downstream code never sees one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef(String);

/// Error for a malformed resource reference.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidItem {
    #[error("absolute resource path {0:?} is not allowed")]
    AbsoluteResource(String),

    #[error("empty resource reference")]
    EmptyResource,

    #[error("command item needs audio or a choreography")]
    EmptyItem,
}

impl ResourceRef {
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidItem> {
        let s = s.into();
        if s.is_empty() || s.split(';').any(|f| f.is_empty()) {
            return Err(InvalidItem::EmptyResource);
        }
        if s.split(';').any(|f| f.starts_with('/') || f.trim_start_matches('*').starts_with('/')) {
            return Err(InvalidItem::AbsoluteResource(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fallback list, in probe order.
    pub fn fallbacks(&self) -> impl Iterator<Item = &str> {
        self.0.split(';')
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ResourceRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// One unit of playback: an audio list and/or a choreography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<ResourceRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choreography: Option<ResourceRef>,
}

impl CommandItem {
    /// At least one of audio / choreography must be present and non-empty.
    pub fn validate(&self) -> Result<(), InvalidItem> {
        let has_audio = self.audio.as_ref().is_some_and(|a| !a.is_empty());
        if !has_audio && self.choreography.is_none() {
            return Err(InvalidItem::EmptyItem);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
