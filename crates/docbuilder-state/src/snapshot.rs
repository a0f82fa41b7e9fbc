//! The versioned, atomically-persisted JSON snapshot.

use crate::models::{Build, ConfigurationBag, DaemonInfo, DaemonStatus, Repository, Schedule, Statistics};
use chrono::Utc;
use docbuilder_core::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current on-disk snapshot format. Loaders reject any other value.
pub const FORMAT_VERSION: &str = "1";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub format_version: String,
    pub version: String,
    pub start_time: chrono::DateTime<Utc>,
    pub last_update: chrono::DateTime<Utc>,
    pub status: DaemonStatus,
    pub repositories: BTreeMap<String, Repository>,
    pub builds: BTreeMap<String, Build>,
    pub schedules: BTreeMap<String, Schedule>,
    pub statistics: Statistics,
    pub configuration: ConfigurationBag,
}

impl Snapshot {
    /// A fresh, empty snapshot for a brand-new state store.
    pub fn empty(version: impl Into<String>) -> Self {
        let now = Utc::now();
        Snapshot {
            format_version: FORMAT_VERSION.to_string(),
            version: version.into(),
            start_time: now,
            last_update: now,
            status: DaemonStatus::Stopped,
            repositories: BTreeMap::new(),
            builds: BTreeMap::new(),
            schedules: BTreeMap::new(),
            statistics: Statistics::default(),
            configuration: ConfigurationBag::new(),
        }
    }

    pub fn daemon_info(&self) -> DaemonInfo {
        DaemonInfo {
            version: self.version.clone(),
            start_time: self.start_time,
            last_update: self.last_update,
            status: self.status,
        }
    }

    /// Load a snapshot from `path`. Returns `Ok(None)` if the file
    /// doesn't exist yet (a fresh store), `Err` on parse failure or an
    /// unrecognized `format_version`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
        let format_version = raw
            .get("format_version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::configuration("snapshot is missing required field format_version")
            })?;
        if format_version != FORMAT_VERSION {
            return Err(Error::configuration(format!(
                "unsupported snapshot format_version {format_version:?}, expected {FORMAT_VERSION:?}"
            )));
        }
        let snapshot: Snapshot = serde_json::from_value(raw)?;
        Ok(Some(snapshot))
    }

    /// Atomically persist this snapshot to `path`: write to a sibling
    /// temp file, fsync, then rename, so readers never observe a torn
    /// file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let tmp_path = temp_path_in(dir, path);
        let bytes = serde_json::to_vec_pretty(self)?;

        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(&bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

fn temp_path_in(dir: &Path, target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    dir.join(format!(".{file_name}.tmp-{}", std::process::id()))
}
