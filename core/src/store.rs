//! Config document storage: one `<name>.json` file per server config

use crate::{Error, Result};
use crate::model::ConfigRecord;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of config documents
pub const DOCUMENT_EXT: &str = "json";

/// A record together with file metadata, for the detail view
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub record: ConfigRecord,
    pub path: PathBuf,
    pub modified: Option<DateTime<Local>>,
}

/// Directory of config documents
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Open the store, creating its directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::work_dir(&dir, e))?;
        let meta = fs::metadata(&dir).map_err(|e| Error::work_dir(&dir, e))?;
        if !meta.is_dir() {
            return Err(Error::work_dir(&dir, "not a directory"));
        }
        fs::read_dir(&dir).map_err(|e| Error::work_dir(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, DOCUMENT_EXT))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Persist a new record; fails if a document with this name exists
    pub fn create(&self, name: &str, record: &ConfigRecord) -> Result<ConfigRecord> {
        if self.exists(name) {
            return Err(Error::conflict(format!("Config '{}' already exists", name)));
        }
        let mut record = record.clone();
        record.name = name.to_string();
        self.write(&record)?;
        Ok(record)
    }

    pub fn read(&self, name: &str) -> Result<ConfigRecord> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(Error::not_found(format!("Config '{}' does not exist", name)));
        }
        let content = fs::read_to_string(&path)?;
        ConfigRecord::from_json(name, &content).map_err(|e| match e {
            Error::Json(inner) => {
                Error::Parse(format!("Config {} is not valid: {}", path.display(), inner))
            }
            other => other,
        })
    }

    /// Names of every stored config, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Move a document to a new name; content is untouched
    pub fn rename(&self, old: &str, new: &str) -> Result<ConfigRecord> {
        let from = self.path_for(old);
        let to = self.path_for(new);
        if !from.is_file() {
            return Err(Error::not_found(format!("Config '{}' does not exist", old)));
        }
        if to.exists() {
            return Err(Error::conflict(format!("Config '{}' already exists", new)));
        }
        fs::rename(&from, &to)?;
        self.read(new)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(Error::not_found(format!("Config '{}' does not exist", name)));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    pub fn summary(&self, name: &str) -> Result<ConfigSummary> {
        let record = self.read(name)?;
        let path = self.path_for(name);
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from);
        Ok(ConfigSummary {
            record,
            path,
            modified,
        })
    }

    /// Write the whole document through a sibling temp file and rename it
    /// into place, so an interrupted write never leaves a half document
    fn write(&self, record: &ConfigRecord) -> Result<()> {
        let path = self.path_for(&record.name);
        let tmp = self.dir.join(format!(".{}.{}.tmp", record.name, DOCUMENT_EXT));
        fs::write(&tmp, record.to_json()?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::tempdir;

    fn sample(port: u16) -> ConfigRecord {
        ConfigRecord::new("", port, "secret")
    }

    #[test]
    fn test_create_and_read() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("configs")).unwrap();

        let created = store.create("work", &sample(4000)).unwrap();
        assert_eq!(created.name, "work");

        let read = store.read("work").unwrap();
        assert_eq!(read, created);
        assert!(store.path_for("work").ends_with("work.json"));
    }

    #[test]
    fn test_create_conflict_keeps_original() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();

        store.create("work", &sample(4000)).unwrap();
        let err = store.create("work", &sample(5000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileConflict);
        assert_eq!(store.read("work").unwrap().server_port, 4000);
    }

    #[test]
    fn test_read_missing() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        assert_eq!(store.read("nope").unwrap_err().kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_list_skips_other_files() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        store.create("b", &sample(4001)).unwrap();
        store.create("a", &sample(4000)).unwrap();
        fs::write(dir.path().join("config.json.bak"), "{}").unwrap();
        fs::write(dir.path().join(".a.json.tmp"), "{}").unwrap();
        fs::create_dir(dir.path().join("sub.json")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_rename_preserves_content() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        let before = store.create("old", &sample(4000)).unwrap();

        let after = store.rename("old", "new").unwrap();
        assert_eq!(after.name, "new");
        assert_eq!(
            ConfigRecord {
                name: "old".to_string(),
                ..after
            },
            before
        );
        assert_eq!(store.read("old").unwrap_err().kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_rename_guards() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        store.create("a", &sample(4000)).unwrap();
        store.create("b", &sample(4001)).unwrap();

        assert_eq!(
            store.rename("missing", "c").unwrap_err().kind(),
            ErrorKind::FileNotFound
        );
        assert_eq!(store.rename("a", "b").unwrap_err().kind(), ErrorKind::FileConflict);
        assert_eq!(store.read("a").unwrap().server_port, 4000);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        store.create("work", &sample(4000)).unwrap();

        store.delete("work").unwrap();
        assert!(!store.exists("work"));
        assert_eq!(store.delete("work").unwrap_err().kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_summary_has_mtime() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        store.create("work", &sample(4000)).unwrap();

        let summary = store.summary("work").unwrap();
        assert_eq!(summary.record.server_port, 4000);
        assert!(summary.modified.is_some());
    }

    #[test]
    fn test_open_on_file_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "").unwrap();

        let err = ConfigStore::open(&file).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotEnterWorkDirectory);
    }
}
