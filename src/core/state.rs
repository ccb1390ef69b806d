use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};

use crate::{config::WatchKey, error::StateStoreError};

/// Last commit acted on for one watch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateRecord {
    pub last_commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Durable `repo#branch -> last commit` map.
///
/// Every mutation rewrites the whole file through a sibling temp file and a
/// rename, so a reader sees either the previous or the new document.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    records: BTreeMap<String, StateRecord>,
}

pub fn get_state_path() -> PathBuf {
    let path = dirs::data_local_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    path.join("benchwatch").join("state.json")
}

impl StateStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub async fn open(path: &Path) -> Result<Self, StateStoreError> {
        let records = match fs::read_to_string(path).await {
            Ok(data) if data.trim().is_empty() => BTreeMap::new(),
            Ok(data) => {
                serde_json::from_str(&data).map_err(|source| StateStoreError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StateStoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, repo: &str, branch: &str) -> Option<&str> {
        self.records
            .get(&WatchKey::new(repo, branch).to_string())
            .map(|r| r.last_commit.as_str())
            .filter(|h| !h.is_empty())
    }

    pub async fn set(
        &mut self,
        repo: &str,
        branch: &str,
        hash: &str,
    ) -> Result<(), StateStoreError> {
        let key = WatchKey::new(repo, branch).to_string();
        let record = StateRecord {
            last_commit: hash.to_string(),
            updated_at: Some(Utc::now()),
        };
        let previous = self.records.insert(key.clone(), record);

        if let Err(e) = self.persist().await {
            // keep memory in line with what is on disk
            match previous {
                Some(p) => self.records.insert(key, p),
                None => self.records.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Drops the record for a watch. Returns whether one existed.
    pub async fn remove(&mut self, repo: &str, branch: &str) -> Result<bool, StateStoreError> {
        let key = WatchKey::new(repo, branch).to_string();
        match self.records.remove(&key) {
            Some(previous) => {
                if let Err(e) = self.persist().await {
                    self.records.insert(key, previous);
                    return Err(e);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &StateRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    async fn persist(&self) -> Result<(), StateStoreError> {
        let json = serde_json::to_string_pretty(&self.records)?;
        let write_err = |source: std::io::Error| StateStoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = self.tmp_path();
        let mut tmp = fs::File::create(&tmp_path).await.map_err(write_err)?;
        tmp.write_all(json.as_bytes()).await.map_err(write_err)?;
        tmp.sync_all().await.map_err(write_err)?;
        drop(tmp);

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}
