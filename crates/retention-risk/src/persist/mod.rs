//! Model persistence.
//!
//! Saving is always explicit; nothing in the crate writes files on its own.
//!
//! # Format Structure
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (24 bytes, see FormatHeader)      │
//! ├──────────────────────────────────────────┤
//! │ Postcard-encoded Payload (variable)      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The payload is checksummed with CRC32; loading validates the header, the
//! checksum and then the tree structure before returning a model.

mod header;
mod native;
mod schema;

pub use header::{
    FormatFlags, FormatHeader, CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR, HEADER_SIZE, MAGIC,
};
pub use native::{
    decode_model, encode_model, load_model, save_model, save_report_json, write_atomic,
};
pub use schema::{
    ForestSchema, ModelMetaSchema, Payload, PayloadV1, PreprocessorSchema, TreeSchema,
};
