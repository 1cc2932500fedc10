//! Per-user config files: `{base_dir}/config-{user_id}.json`.

use std::io;
use std::path::{Path, PathBuf};

use farmbot_std::fs::{CreateDirAll, ReadFile, RemoveFile, RenameFile, WriteFile};
use farmbot_types::{ConfigDocument, is_valid_key};
use tracing::{debug, info, instrument, warn};

use crate::error::{PanelError, Result};

/// Filesystem operations the config store needs.
pub trait ConfigFs: ReadFile + WriteFile + RenameFile + RemoveFile + CreateDirAll {}

impl<T: ReadFile + WriteFile + RenameFile + RemoveFile + CreateDirAll> ConfigFs for T {}

/// User ids become part of a file name, so they share the channel key alphabet.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if is_valid_key(user_id) {
        Ok(())
    } else {
        Err(PanelError::InvalidUserId(user_id.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore<F> {
    fs: F,
    base_dir: PathBuf,
}

impl<F: ConfigFs> ConfigStore<F> {
    pub fn new(fs: F, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.base_dir.join(format!("config-{user_id}.json")))
    }

    /// A missing file and malformed content are reported as different errors.
    #[instrument(name = "store.load", skip(self))]
    pub fn load(&self, user_id: &str) -> Result<ConfigDocument> {
        let path = self.path_for(user_id)?;
        let raw = self.fs.read_to_string(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PanelError::NotFound { path: path.clone() }
            } else {
                PanelError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let doc = ConfigDocument::parse(&raw).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Config file is not valid JSON");
            PanelError::document(path.display().to_string(), e)
        })?;
        debug!(path = %path.display(), keys = doc.len(), "Config loaded");
        Ok(doc)
    }

    /// Writes a uniquely named sibling temp file and renames it over the
    /// target, so readers see either the old or the new document and
    /// concurrent saves never share a temp file. Last rename wins.
    #[instrument(name = "store.save", skip(self, doc), fields(keys = doc.len()))]
    pub fn save(&self, user_id: &str, doc: &ConfigDocument) -> Result<()> {
        let path = self.path_for(user_id)?;
        let io_err = |e: io::Error| PanelError::Io {
            path: path.clone(),
            message: e.to_string(),
        };

        self.fs.create_dir_all(&self.base_dir).map_err(io_err)?;

        let contents = doc
            .to_pretty_string()
            .map_err(|e| PanelError::encode(path.display().to_string(), e))?;
        let tmp = self
            .base_dir
            .join(format!("config-{user_id}.json.{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = self
            .fs
            .write(&tmp, &contents)
            .and_then(|()| self.fs.rename(&tmp, &path))
        {
            if let Err(cleanup) = self.fs.remove_file(&tmp) {
                debug!(tmp = %tmp.display(), error = %cleanup, "Temp file not removed");
            }
            return Err(io_err(e));
        }

        info!(path = %path.display(), "Config saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmbot_std::{MemFs, SystemFs};
    use serde_json::json;

    fn store() -> (MemFs, ConfigStore<MemFs>) {
        let fs = MemFs::new();
        (fs.clone(), ConfigStore::new(fs, "/root/data"))
    }

    #[test]
    fn path_is_derived_from_user_id() {
        let (_, store) = store();
        assert_eq!(
            store.path_for("123456789").unwrap(),
            PathBuf::from("/root/data/config-123456789.json")
        );
    }

    #[test]
    fn traversal_in_user_id_is_rejected() {
        let (_, store) = store();
        assert!(matches!(
            store.path_for("../etc/passwd"),
            Err(PanelError::InvalidUserId(_))
        ));
        assert!(matches!(store.load(""), Err(PanelError::InvalidUserId(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_, store) = store();
        assert!(matches!(store.load("1"), Err(PanelError::NotFound { .. })));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let (fs, store) = store();
        fs.insert("/root/data/config-1.json", "{\"config_bot_auto_forest\": ");

        assert!(matches!(store.load("1"), Err(PanelError::Parse { .. })));
    }

    #[test]
    fn non_object_file_is_a_parse_error() {
        let (fs, store) = store();
        fs.insert("/root/data/config-1.json", "[]");

        assert!(matches!(store.load("1"), Err(PanelError::Parse { .. })));
    }

    #[test]
    fn save_creates_directory_and_writes_pretty_json() {
        let (fs, store) = store();
        let doc = ConfigDocument::parse(r#"{"config_bot_auto_craft_item_name": "масло"}"#).unwrap();

        store.save("1", &doc).unwrap();

        assert!(fs.dir_exists(Path::new("/root/data")));
        assert_eq!(
            fs.contents("/root/data/config-1.json").as_deref(),
            Some("{\n    \"config_bot_auto_craft_item_name\": \"масло\"\n}")
        );
        assert_eq!(fs.paths(), vec![PathBuf::from("/root/data/config-1.json")]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_, store) = store();
        let doc = ConfigDocument::parse(
            r#"{"config_bot_auto_forest": true, "config_bot_auto_forest_command": ["мулс"], "custom": {"nested": [1, 2]}}"#,
        )
        .unwrap();

        store.save("42", &doc).unwrap();

        assert_eq!(store.load("42").unwrap(), doc);
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let (fs, store) = store();
        fs.insert("/root/data/config-1.json", r#"{"a": 1}"#);
        fs.fail_writes(1);

        let err = store.save("1", &ConfigDocument::new()).unwrap_err();

        assert!(matches!(err, PanelError::Io { .. }));
        assert_eq!(fs.contents("/root/data/config-1.json").as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn failed_rename_keeps_previous_file() {
        let (fs, store) = store();
        fs.insert("/root/data/config-1.json", r#"{"a": 1}"#);
        fs.fail_renames(1);

        assert!(matches!(
            store.save("1", &ConfigDocument::new()),
            Err(PanelError::Io { .. })
        ));
        assert_eq!(fs.contents("/root/data/config-1.json").as_deref(), Some(r#"{"a": 1}"#));
        assert_eq!(fs.paths(), vec![PathBuf::from("/root/data/config-1.json")]);
    }

    #[test]
    fn concurrent_saves_of_one_user_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(SystemFs, dir.path());

        let errors: Vec<usize> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..2)
                .map(|worker| {
                    let store = &store;
                    scope.spawn(move || {
                        (0..200)
                            .filter(|round| {
                                let mut doc = ConfigDocument::new();
                                let count = worker * 1000 + round;
                                doc.set("config_bot_auto_craft_count", json!(count.to_string()));
                                store.save("1", &doc).is_err()
                            })
                            .count()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(errors, vec![0, 0]);
        assert!(store.load("1").unwrap().str("config_bot_auto_craft_count").is_some());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("config-1.json")]);
    }

    #[test]
    fn enabling_forest_changes_only_that_key() {
        let (fs, store) = store();
        fs.insert(
            "/root/data/config-7.json",
            r#"{"config_bot_auto_forest": false, "config_user_tz": "Asia/Tokyo", "custom": 3}"#,
        );

        let mut doc = store.load("7").unwrap();
        doc.set("config_bot_auto_forest", json!(true));
        store.save("7", &doc).unwrap();

        let saved = ConfigDocument::parse(&fs.contents("/root/data/config-7.json").unwrap()).unwrap();
        assert_eq!(
            saved,
            ConfigDocument::parse(
                r#"{"config_bot_auto_forest": true, "config_user_tz": "Asia/Tokyo", "custom": 3}"#
            )
            .unwrap()
        );
    }

    #[test]
    fn works_against_the_real_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("data");
        let store = ConfigStore::new(SystemFs, &base);
        let doc = ConfigDocument::parse(r#"{"config_user_tz": "Europe/Kiev"}"#).unwrap();

        store.save("5", &doc).unwrap();

        assert!(base.join("config-5.json").exists());
        assert_eq!(store.load("5").unwrap(), doc);
        assert!(matches!(store.load("6"), Err(PanelError::NotFound { .. })));
    }
}
