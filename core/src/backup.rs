//! Backup archives of config documents (gzip-compressed tar)

use crate::store::{ConfigStore, DOCUMENT_EXT};
use crate::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

/// Write every document in `store` into a new archive at `dest`.
///
/// Refuses to replace an existing archive unless `overwrite` is set.
/// Returns the names that were archived.
pub fn write_archive(store: &ConfigStore, dest: &Path, overwrite: bool) -> Result<Vec<String>> {
    if dest.exists() && !overwrite {
        return Err(Error::conflict(format!(
            "Backup archive {} already exists",
            dest.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let names = store.list()?;
    archive_documents(store, &names, dest)?;

    log::info!("Archived {} config(s) to {}", names.len(), dest.display());
    Ok(names)
}

/// Build the archive next to `dest` and move it into place; a failed build
/// leaves neither file behind
fn archive_documents(store: &ConfigStore, names: &[String], dest: &Path) -> Result<()> {
    let tmp = dest.with_extension("partial");
    if let Err(e) = build_archive(store, names, &tmp) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            log::warn!("Failed to remove partial archive {}: {}", tmp.display(), cleanup);
        }
        return Err(e);
    }
    fs::rename(&tmp, dest)?;
    Ok(())
}

fn build_archive(store: &ConfigStore, names: &[String], tmp: &Path) -> Result<()> {
    let file = File::create(tmp)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for name in names {
        let path = store.path_for(name);
        builder.append_path_with_name(&path, format!("{}.{}", name, DOCUMENT_EXT))?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Extract the documents in the archive at `src` into `store`.
///
/// Same-named documents are overwritten, others are left alone. Every entry
/// must be a plain `<name>.json` file at the archive root. Returns the
/// restored names.
pub fn extract_archive(src: &Path, store: &ConfigStore) -> Result<Vec<String>> {
    if !src.is_file() {
        return Err(Error::not_found(format!(
            "Backup archive {} does not exist",
            src.display()
        )));
    }

    let documents = read_documents(src)?;

    // Nothing is written until every entry has been checked
    let mut restored = Vec::with_capacity(documents.len());
    for (name, content) in documents {
        let dest = store.path_for(&name);
        let tmp: PathBuf = store.dir().join(format!(".{}.{}.tmp", name, DOCUMENT_EXT));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &dest)?;
        restored.push(name);
    }

    log::info!("Restored {} config(s) from {}", restored.len(), src.display());
    Ok(restored)
}

/// Every document in the archive, validated and parsed
fn read_documents(src: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(src)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut documents = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_path_buf();

        if !entry.header().entry_type().is_file() {
            log::debug!("Skipping non-file archive entry {}", entry_path.display());
            continue;
        }
        let name = document_name(&entry_path)?;
        crate::model::validate_config_name(&name)?;

        let mut content = String::new();
        std::io::Read::read_to_string(&mut entry, &mut content)?;
        crate::model::ConfigRecord::from_json(&name, &content)?;
        documents.push((name, content));
    }
    Ok(documents)
}

/// Config name for an archive entry, rejecting anything but `<name>.json`
fn document_name(entry_path: &Path) -> Result<String> {
    let mut components = entry_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    let file_name = match (components.next(), components.next()) {
        (Some(Component::Normal(file_name)), None) => file_name,
        _ => {
            return Err(Error::validation(format!(
                "Unexpected archive entry {}",
                entry_path.display()
            )))
        }
    };

    let file_name = Path::new(file_name);
    if file_name.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
        return Err(Error::validation(format!(
            "Archive entry {} is not a config document",
            entry_path.display()
        )));
    }
    file_name
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Invalid archive entry {}", entry_path.display())))
}
