// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Caller bugs (duplicate child names, missing children, stale handles) are not represented
//! here; they panic. These types cover conditions a host is expected to recover from.

use alloc::string::String;

use thiserror::Error;

use crate::types::ElementId;

/// Errors reported by the registry and element lifecycle operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum OverlayError {
    /// An overlay with this name is already registered.
    #[error("overlay with the name '{0}' already exists")]
    DuplicateOverlay(String),
    /// No live overlay matches the given name or handle.
    #[error("overlay '{0}' not found")]
    UnknownOverlay(String),
    /// No factory is registered for the element type.
    #[error("no element factory registered for type '{0}'")]
    UnknownElementType(String),
    /// A template with this name is already registered.
    #[error("template with the name '{0}' already exists")]
    DuplicateTemplate(String),
    /// No template is registered under this name.
    #[error("template '{0}' not found")]
    UnknownTemplate(String),
    /// The element handle no longer refers to a live element.
    #[error("element {0:?} is not alive")]
    StaleElement(ElementId),
    /// Only containers may be attached directly to an overlay or receive children.
    #[error("element '{0}' is not a container")]
    NotAContainer(String),
    /// Overlay z-order must stay below 650.
    #[error("overlay z-order {0} is out of range (must be < 650)")]
    ZOrderOutOfRange(u16),
    /// A property could not be applied.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Errors reported when reading or writing an element property by name.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PropertyError {
    /// The element type has no property with this name.
    #[error("parameter '{0}' not recognized")]
    Unknown(String),
    /// The value could not be parsed for the property.
    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidValue {
        /// Property name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
    /// The material library has no material with this name.
    #[error("could not find material '{0}'")]
    MaterialNotFound(String),
}

/// Errors reported by an [`ElementKind`](crate::ElementKind) geometry rebuild.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// The element needs a material to build this geometry but has none.
    #[error("element '{0}' has no material")]
    MissingMaterial(String),
}
