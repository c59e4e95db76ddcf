//! Reading and writing the named config files of the metadata directory.
//!
//! YAML documents (manifest, release) get typed schemas at their call sites;
//! this module only deals with bytes on disk. The lines format backs the
//! profile files: one entry per line, blank lines and `#` comments ignored.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::Result;

const LINES_COMMENT: char = '#';

pub fn yaml_path(ctx: &Context, name: &str) -> PathBuf {
    ctx.meta_path().join(format!("{name}.yaml"))
}

pub fn lines_path(ctx: &Context, name: &str) -> PathBuf {
    ctx.meta_path().join(format!("{name}.txt"))
}

/// Load a YAML document, returning `None` when the file does not exist.
pub fn load_yaml<T: DeserializeOwned>(ctx: &Context, name: &str) -> Result<Option<T>> {
    let path = yaml_path(ctx, name);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(Some(yaml_serde::from_str(&text)?))
}

/// Save a YAML document, creating the metadata directory as needed.
///
/// The write goes through a sibling temp file and a rename so a crash never
/// leaves a half-written document behind.
pub fn save_yaml<T: Serialize>(ctx: &Context, name: &str, value: &T) -> Result<()> {
    let path = yaml_path(ctx, name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = yaml_serde::to_string(value)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

pub fn yaml_exists(ctx: &Context, name: &str) -> bool {
    yaml_path(ctx, name).exists()
}

pub fn delete_yaml(ctx: &Context, name: &str) -> Result<()> {
    std::fs::remove_file(yaml_path(ctx, name))?;
    Ok(())
}

/// Load a lines file, returning `None` when the file does not exist.
pub fn load_lines(ctx: &Context, name: &str) -> Result<Option<Vec<String>>> {
    let path = lines_path(ctx, name);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(LINES_COMMENT))
        .map(str::to_string)
        .collect();
    Ok(Some(lines))
}
