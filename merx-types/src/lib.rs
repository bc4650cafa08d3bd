//! Core type definitions for merx.
//!
//! This crate defines the resource model shared by the client and the
//! reconciliation engine:
//! - Resource identifiers and kinds
//! - References (resolved id or symbolic key)
//! - Localized strings
//! - Categories, category drafts and their asset sub-entities
//! - Update actions (the wire form of a computed mutation)
//! - Custom objects (free-form JSON documents stored per container/key)
//!
//! Everything here is inert data: no I/O, no diffing logic. The engine
//! crates own the behavior.

mod actions;
mod category;
mod custom_object;
mod ids;
mod localized;
mod reference;

pub use actions::CategoryUpdateAction;
pub use category::{
    Asset, AssetDraft, AssetSource, Category, CategoryDraft, CustomFields, CustomFieldsDraft,
};
pub use custom_object::{CustomObject, CustomObjectDraft};
pub use ids::{ResourceId, ResourceKind};
pub use localized::LocalizedString;
pub use reference::Reference;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
}
