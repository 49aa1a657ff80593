use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::scoped::ScopedArtifact;

pub const EXPORT_SCHEMA_VERSION: i32 = 1;

/// Snapshot of the configuration model as handed out by `export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExport {
    pub schema_version: i32,
    pub export_id: Uuid,
    pub config_hash: String,
    pub model: Value,
}

/// Writes the model under `dir` and returns it as a scoped artifact.
pub fn export_model(dir: &Path, config_hash: &str, model: Value) -> Result<ScopedArtifact> {
    let export = ModelExport {
        schema_version: EXPORT_SCHEMA_VERSION,
        export_id: Uuid::new_v4(),
        config_hash: config_hash.to_string(),
        model,
    };
    let json = serde_json::to_string_pretty(&export).context("serialize model export failed")?;
    ScopedArtifact::create_in(dir, "model-export", format!("{json}\n").as_bytes())
}
