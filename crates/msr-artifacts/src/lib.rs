//! msr-artifacts
//!
//! Temporary on-disk artifacts handed to callers as byte streams. The backing
//! file is deleted when the stream is closed or dropped, however far the
//! caller got.

mod export;
mod scoped;

pub use export::{export_model, ModelExport, EXPORT_SCHEMA_VERSION};
pub use scoped::ScopedArtifact;
