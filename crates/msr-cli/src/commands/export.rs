use std::fs::File;
use std::io;

use anyhow::{Context, Result};
use msr_artifacts::export_model;

use super::{boot_in_memory, load};

pub fn export(config_paths: &[String], out: &str) -> Result<()> {
    let (loaded, settings) = load(config_paths)?;
    let controller = boot_in_memory(&settings)?;

    let staging = std::env::temp_dir().join("msr-exports");
    let mut artifact = export_model(&staging, &loaded.config_hash, controller.tree().to_json())?;
    let mut dest = File::create(out).with_context(|| format!("create export failed: {out}"))?;
    let bytes = io::copy(&mut artifact, &mut dest).context("copy export failed")?;
    artifact.close();

    println!("export_written={out}");
    println!("bytes={bytes}");
    println!("config_hash={}", loaded.config_hash);
    Ok(())
}
