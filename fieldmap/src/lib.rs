//! Field mapping between block trees and flat structured records.
//!
//! - [`convert`] turns a block tree into an editor template array.
//! - [`extract`] reads the record declared by `metadata.formFieldNames` mappings.
//! - [`hydrate`] writes a record back into a copy of a tree.
//! - [`Orchestrator`] resolves a content item's record through its data type.

pub mod converter;
pub mod error;
pub mod extractor;
pub mod hydrator;
pub mod orchestrator;

pub use converter::{convert, convert_blocks};
pub use error::ResolveError;
pub use extractor::{extract, extract_blocks};
pub use hydrator::{hydrate, hydrate_blocks};
pub use orchestrator::{
    BlockParser, ContentId, ContentItem, ContentStore, DataType, DataTypeRegistration,
    JsonBlockParser, Orchestrator,
};
