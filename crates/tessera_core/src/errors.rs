//! Error Types
//!
//! This module defines the error type shared by every Tessera crate.
//!
//! # Overview
//!
//! [`TesseraError`] covers the failure kinds of the animation core:
//! - Lookups by name or handle that miss (`ItemNotFound`)
//! - Name or handle collisions on creation (`DuplicateItem`)
//! - Structurally invalid requests (`InvalidParams`)
//! - Out of range indices (`IndexOutOfBounds`)
//! - Mixed numeric kinds inside one numeric track (`NumericTypeMismatch`)
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, TesseraError>`.
//!
//! ```rust,ignore
//! use tessera_core::errors::{TesseraError, Result};
//!
//! fn find_track() -> Result<()> {
//!     Err(TesseraError::ItemNotFound("node track 99".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type for the Tessera engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TesseraError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// The requested track, animation, state, bone, pose or sub-mesh does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// An item with the same name or handle already exists in its owning collection.
    #[error("Duplicate item: {0}")]
    DuplicateItem(String),

    /// Index out of bounds.
    #[error("Index out of bounds: {context} (index: {index})")]
    IndexOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
    },

    // ========================================================================
    // Parameter Errors
    // ========================================================================
    /// The request is structurally invalid (wrong keyframe kind, missing
    /// vertex elements, unbound track target, ...).
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Two numeric values of different kinds were combined.
    #[error("Numeric type mismatch: expected {expected}, found {found}")]
    NumericTypeMismatch {
        /// Kind already established by the track or left operand
        expected: &'static str,
        /// Kind of the offending value
        found: &'static str,
    },
}

impl TesseraError {
    /// Shorthand for [`TesseraError::ItemNotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ItemNotFound(what.into())
    }

    /// Shorthand for [`TesseraError::InvalidParams`].
    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidParams(what.into())
    }

    /// Shorthand for [`TesseraError::IndexOutOfBounds`].
    pub fn out_of_bounds(context: impl Into<String>, index: usize) -> Self {
        Self::IndexOutOfBounds {
            context: context.into(),
            index,
        }
    }
}

/// Alias for `Result<T, TesseraError>`.
pub type Result<T> = std::result::Result<T, TesseraError>;
