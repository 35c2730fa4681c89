//! Keeps `schema/adminapi.sql` in sync with the transition history
use crate::locate_project_root;
use anyhow::{Context, Result};
use roombook_schema::{adminapi, db};
use std::path::PathBuf;
use unified_diff::diff;

const SCHEMA_SQL_PATH: &str = "schema/adminapi.sql";

fn render() -> Result<Vec<u8>> {
    let graph = adminapi::graph()?;

    let mut out = String::new();
    for rendered in db::render(&graph, adminapi::APP_LABEL)? {
        out.push_str(&format!("-- {}\n{}\n", rendered.migration_name(), rendered.sql));
    }

    Ok(out.into_bytes())
}

fn target_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => Ok(locate_project_root()?.join(SCHEMA_SQL_PATH)),
    }
}

pub fn generate_schema_sql(path: Option<PathBuf>) -> Result<()> {
    let target_file = target_path(path)?;
    let content = render()?;

    if target_file.exists() {
        log::info!("{} exists. Overwriting it.", target_file.display())
    } else if let Some(parent) = target_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&target_file, content)
        .with_context(|| format!("unable to write {}", target_file.display()))?;

    log::info!("Generated schema sql file: {}", target_file.display());

    Ok(())
}

pub fn verify_schema_sql(path: Option<PathBuf>) -> Result<()> {
    let target_file = target_path(path)?;
    let expected = render()?;

    log::info!("Verify {}:", target_file.display());
    let on_disk = std::fs::read(&target_file)
        .with_context(|| format!("unable to read {}", target_file.display()))?;

    if expected != on_disk {
        anyhow::bail!(
            "{} differs.\n{}",
            target_file.display(),
            String::from_utf8_lossy(&diff(&expected, "expected", &on_disk, "actual", 3)),
        );
    }

    Ok(())
}
