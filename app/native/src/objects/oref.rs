//! Object references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building or parsing an [`ORef`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ORefError {
    /// The string is not of the form `otype:oid`.
    #[error("expected \"otype:oid\", got {0:?}")]
    Malformed(String),
    /// The type part is blank or not made of lowercase ASCII letters.
    #[error("invalid object type {0:?}")]
    InvalidType(String),
    /// The id part is blank.
    #[error("object id must not be blank")]
    EmptyId,
}

/// Typed reference to one backend object, serialized as `"otype:oid"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ORef {
    otype: String,
    oid: String,
}

impl ORef {
    /// Builds a reference, validating both parts.
    ///
    /// # Errors
    ///
    /// Returns [`ORefError::InvalidType`] unless `otype` is non-empty lowercase
    /// ASCII letters, and [`ORefError::EmptyId`] when `oid` is blank.
    pub fn new(otype: impl Into<String>, oid: impl Into<String>) -> Result<Self, ORefError> {
        let otype = otype.into();
        let oid = oid.into();

        if otype.is_empty() || !otype.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(ORefError::InvalidType(otype));
        }
        if oid.trim().is_empty() {
            return Err(ORefError::EmptyId);
        }

        Ok(Self { otype, oid })
    }

    #[must_use]
    pub fn otype(&self) -> &str { &self.otype }

    #[must_use]
    pub fn oid(&self) -> &str { &self.oid }
}

impl fmt::Display for ORef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.otype, self.oid)
    }
}

impl FromStr for ORef {
    type Err = ORefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(otype), Some(oid), None) => Self::new(otype, oid),
            _ => Err(ORefError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for ORef {
    type Error = ORefError;

    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<ORef> for String {
    fn from(oref: ORef) -> Self { oref.to_string() }
}
