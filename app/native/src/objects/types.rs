//! Backend object records and the typed models built on top of them.
//!
//! Every backend object shares the `{otype, oid, version, meta}` header and
//! carries type-specific fields. [`StarObj`] keeps the untyped form the cache
//! stores; the typed models convert to and from it through [`StarObject`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::oref::{ORef, ORefError};

/// Errors converting between [`StarObj`] and a typed model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The record has a different `otype` than the model expects.
    #[error("expected object type {expected:?}, got {found:?}")]
    TypeMismatch { expected: &'static str, found: String },
    /// The fields do not match the model.
    #[error("failed to convert {otype} object: {message}")]
    Conversion { otype: String, message: String },
}

/// A versioned backend object in its generic form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarObj {
    pub otype: String,
    pub oid: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StarObj {
    #[must_use]
    pub fn new(otype: impl Into<String>, oid: impl Into<String>, version: i64) -> Self {
        Self {
            otype: otype.into(),
            oid: oid.into(),
            version,
            meta: Map::new(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> { self.fields.get(name) }

    /// Returns a string field, if present and a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> { self.field(name)?.as_str() }

    /// An object is usable only with a non-blank type and id and a non-zero version.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.otype.trim().is_empty() && !self.oid.trim().is_empty() && self.version != 0
    }

    /// Returns the reference this object is stored under.
    ///
    /// # Errors
    ///
    /// Returns an [`ORefError`] if the type or id is not a valid reference part.
    pub fn oref(&self) -> Result<ORef, ORefError> { ORef::new(self.otype.clone(), self.oid.clone()) }

    /// Converts into a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::TypeMismatch`] if `otype` does not match `T`,
    /// or [`ObjectError::Conversion`] if the fields do not deserialize.
    pub fn to_typed<T: StarObject>(&self) -> Result<T, ObjectError> {
        if self.otype != T::OTYPE {
            return Err(ObjectError::TypeMismatch { expected: T::OTYPE, found: self.otype.clone() });
        }
        let value = serde_json::to_value(self).map_err(|err| self.conversion_error(&err))?;
        serde_json::from_value(value).map_err(|err| self.conversion_error(&err))
    }

    /// Builds the generic form of a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError::Conversion`] if the model does not serialize to a JSON object.
    pub fn from_typed<T: StarObject>(model: &T) -> Result<Self, ObjectError> {
        let conversion = |message: String| ObjectError::Conversion {
            otype: T::OTYPE.to_string(),
            message,
        };
        let mut value = serde_json::to_value(model).map_err(|err| conversion(err.to_string()))?;
        let Some(map) = value.as_object_mut() else {
            return Err(conversion("model is not a JSON object".to_string()));
        };
        map.insert("otype".to_string(), Value::from(T::OTYPE));
        serde_json::from_value(value).map_err(|err| conversion(err.to_string()))
    }

    fn conversion_error(&self, err: &serde_json::Error) -> ObjectError {
        ObjectError::Conversion { otype: self.otype.clone(), message: err.to_string() }
    }
}

/// A typed backend model.
pub trait StarObject: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The `otype` this model is stored under.
    const OTYPE: &'static str;

    fn oid(&self) -> &str;

    fn version(&self) -> i64;
}

macro_rules! star_object {
    ($ty:ty, $otype:literal) => {
        impl StarObject for $ty {
            const OTYPE: &'static str = $otype;

            fn oid(&self) -> &str { &self.oid }

            fn version(&self) -> i64 { self.version }
        }
    };
}

/// The connected client and the windows it owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub oid: String,
    pub version: i64,
    pub windowids: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A top-level window and the workspace it shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Window {
    pub oid: String,
    pub version: i64,
    pub workspaceid: String,
    pub pos: Point,
    pub winsize: WinSize,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A named set of tabs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub oid: String,
    pub version: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub tabids: Vec<String>,
    pub pinnedtabids: Vec<String>,
    pub activetabid: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Workspace {
    /// An unnamed, icon-less workspace that already holds more than one tab.
    ///
    /// Switching away from such a workspace would lose it, so a new window is
    /// opened instead.
    #[must_use]
    pub fn is_non_empty_unsaved(&self) -> bool {
        self.name.is_empty()
            && self.icon.is_empty()
            && (self.tabids.len() > 1 || self.pinnedtabids.len() > 1)
    }
}

/// A single tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tab {
    pub oid: String,
    pub version: i64,
    pub name: String,
    pub layoutstate: String,
    pub blockids: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// Block layout of one tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutState {
    pub oid: String,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rootnode: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focusednodeid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnifiednodeid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaforder: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pendingbackendactions: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

star_object!(Client, "client");
star_object!(Window, "window");
star_object!(Workspace, "workspace");
star_object!(Tab, "tab");
star_object!(LayoutState, "layout");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinSize {
    pub width: i32,
    pub height: i32,
}

/// Kind of a pushed object update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Update,
    Delete,
}

/// An object change pushed by the backend or returned alongside a service response.
///
/// The version used for ordering is the one carried by `obj`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarObjUpdate {
    pub updatetype: UpdateType,
    pub otype: String,
    pub oid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<StarObj>,
}

impl StarObjUpdate {
    /// An upsert of `obj`.
    #[must_use]
    pub fn update(obj: StarObj) -> Self {
        Self {
            updatetype: UpdateType::Update,
            otype: obj.otype.clone(),
            oid: obj.oid.clone(),
            obj: Some(obj),
        }
    }

    /// A deletion of `oref`.
    #[must_use]
    pub fn delete(oref: &ORef) -> Self {
        Self {
            updatetype: UpdateType::Delete,
            otype: oref.otype().to_string(),
            oid: oref.oid().to_string(),
            obj: None,
        }
    }
}

/// One row of the workspace list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceListEntry {
    pub workspaceid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windowid: Option<String>,
}

impl WorkspaceListEntry {
    /// Whether some window currently shows this workspace.
    #[must_use]
    pub fn has_window(&self) -> bool { self.windowid.as_deref().is_some_and(|id| !id.is_empty()) }
}

/// Result of closing a tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTabResult {
    #[serde(rename = "closewindow", default)]
    pub close_window: bool,
    #[serde(rename = "newactivetabid", default, skip_serializing_if = "Option::is_none")]
    pub new_active_tab_id: Option<String>,
}
