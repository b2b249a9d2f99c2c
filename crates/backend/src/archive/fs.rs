//! Filesystem-backed archive store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<archive_id>/metadata.json
//! <root>/<archive_id>/responses.jsonl   one {"key", "body"} object per line
//! ```
//!
//! Responses of an archive are indexed in memory on first retrieval, so a
//! replay reads each responses file once.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use harvest_core::ArchiveError;

use super::{ArchiveMetadata, ArchiveQuery, ArchiveStore};
use crate::backend::Request;

const METADATA_FILE: &str = "metadata.json";
const RESPONSES_FILE: &str = "responses.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse {
    key: String,
    body: String,
}

type ResponseIndex = HashMap<String, String>;

/// Archive store keeping one directory per archive.
#[derive(Debug)]
pub struct FsArchiveStore {
    root: PathBuf,
    /// Request key -> body, per archive id.
    indexes: RwLock<HashMap<String, ResponseIndex>>,
}

fn poisoned() -> ArchiveError {
    ArchiveError::Storage("response index lock poisoned".to_string())
}

impl FsArchiveStore {
    /// Open the store at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self, ArchiveError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            indexes: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn archive_dir(&self, archive_id: &str) -> Result<PathBuf, ArchiveError> {
        let dir = self.root.join(archive_id);
        if dir.join(METADATA_FILE).is_file() {
            Ok(dir)
        } else {
            Err(ArchiveError::ArchiveNotFound(archive_id.to_string()))
        }
    }

    fn read_metadata(path: &Path) -> Result<ArchiveMetadata, ArchiveError> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ArchiveError::Serialization(e.to_string()))
    }

    /// Read every stored response of an archive. The first response stored
    /// for a key wins.
    fn load_index(dir: &Path) -> Result<ResponseIndex, ArchiveError> {
        let file = File::open(dir.join(RESPONSES_FILE))?;
        let mut index = ResponseIndex::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: StoredResponse = serde_json::from_str(&line)
                .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
            index.entry(record.key).or_insert(record.body);
        }
        Ok(index)
    }

    fn cached(&self, archive_id: &str, key: &str) -> Result<Option<String>, ArchiveError> {
        let indexes = self.indexes.read().map_err(|_| poisoned())?;
        Ok(indexes
            .get(archive_id)
            .and_then(|index| index.get(key))
            .cloned())
    }
}

impl ArchiveStore for FsArchiveStore {
    fn create_archive(&self, metadata: &ArchiveMetadata) -> Result<(), ArchiveError> {
        let dir = self.root.join(&metadata.archive_id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ArchiveError::Storage(format!(
                    "archive already exists: {}",
                    metadata.archive_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
        fs::write(dir.join(METADATA_FILE), json)?;
        File::create(dir.join(RESPONSES_FILE))?;

        debug!(archive_id = %metadata.archive_id, root = %self.root.display(), "archive created");
        Ok(())
    }

    fn store(&self, archive_id: &str, request: &Request, body: &str) -> Result<(), ArchiveError> {
        let dir = self.archive_dir(archive_id)?;
        let record = StoredResponse {
            key: request.archive_key(),
            body: body.to_string(),
        };
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.join(RESPONSES_FILE))?;
        file.write_all(&line)?;

        let mut indexes = self.indexes.write().map_err(|_| poisoned())?;
        if let Some(index) = indexes.get_mut(archive_id) {
            index.entry(record.key).or_insert(record.body);
        }
        Ok(())
    }

    fn retrieve(&self, archive_id: &str, request: &Request) -> Result<String, ArchiveError> {
        let key = request.archive_key();
        if let Some(body) = self.cached(archive_id, &key)? {
            return Ok(body);
        }

        // Not indexed yet, or written through another handle since: reload.
        let dir = self.archive_dir(archive_id)?;
        let index = Self::load_index(&dir)?;
        let body = index.get(&key).cloned();

        let mut indexes = self.indexes.write().map_err(|_| poisoned())?;
        indexes.insert(archive_id.to_string(), index);
        drop(indexes);

        body.ok_or(ArchiveError::ResponseNotFound(key))
    }

    fn search(&self, query: &ArchiveQuery<'_>) -> Result<Vec<ArchiveMetadata>, ArchiveError> {
        let mut found = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path().join(METADATA_FILE);
            if !path.is_file() {
                continue;
            }
            match Self::read_metadata(&path) {
                Ok(metadata) if query.matches(&metadata) => found.push(metadata),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable archive");
                }
            }
        }

        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.archive_id.cmp(&b.archive_id))
        });
        Ok(found)
    }
}
