use anyhow::Context;
use serde::de::DeserializeOwned;
use sitetrack::{CellEdit, PlannedEntity};
use std::path::Path;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse '{}'", path.display()))
}

pub fn read_entities(path: &Path) -> anyhow::Result<Vec<PlannedEntity>> {
    read_json(path)
}

pub fn read_edits(path: &Path) -> anyhow::Result<Vec<CellEdit>> {
    read_json(path)
}
