use crate::error::AppError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "storage.json";
pub const STORE_ENV_VAR: &str = "TASKFLOW_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntries {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Resolves the storage file: env var first, then the configured path, then
/// the per-user default.
pub fn store_path(configured: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskflow").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskflow")
            .join(STORE_FILE_NAME))
    }
}

/// File-backed key-value store. The whole file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    #[tracing::instrument]
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let entries = load_entries(path)?;
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened store");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), AppError> {
        save_entries(&self.path, &self.entries)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io_at(path, err))?;
    let stored: StoredEntries = serde_json::from_str(&content)
        .map_err(|err| AppError::invalid_data(format!("{}: {err}", path.display())))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored.entries)
}

fn save_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io_at(parent, err))?;
    }

    let stored = StoredEntries {
        schema_version: SCHEMA_VERSION,
        entries: entries.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io_at(path, err))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io_at(path, err))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{JsonFileStore, SCHEMA_VERSION};
    use crate::storage::KeyValueStore;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskflow-{nanos}-{file_name}"))
    }

    #[test]
    fn missing_file_opens_empty() {
        let path = temp_path("missing.json");
        let store = JsonFileStore::open(&path).unwrap();

        assert_eq!(store.get("taskflow_todos").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn set_persists_across_reopen() {
        let path = temp_path("reopen.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("taskflow_theme", "dark").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            reopened.get("taskflow_theme").unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn remove_drops_key_from_file() {
        let path = temp_path("remove.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("todos", "[\"a\"]").unwrap();
        store.set("taskflow_theme", "light").unwrap();
        store.remove("todos").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(reopened.get("todos").unwrap(), None);
        assert_eq!(
            reopened.get("taskflow_theme").unwrap().as_deref(),
            Some("light")
        );
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("private.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("taskflow_theme", "dark").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        fs::remove_file(&path).ok();

        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn rejects_invalid_json() {
        let path = temp_path("invalid.json");
        fs::write(&path, "{ nope").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn schema_version_must_match() {
        let path = temp_path("bad-schema.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"entries\": {{}}\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }
}
