use std::collections::HashMap;
use std::sync::RwLock;

use harvest_core::ArchiveError;

use super::{ArchiveMetadata, ArchiveQuery, ArchiveStore};
use crate::backend::Request;

#[derive(Debug)]
struct Entry {
    metadata: ArchiveMetadata,
    responses: HashMap<String, String>,
}

/// In-memory archive store.
///
/// Intended for tests/dev. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct InMemoryArchiveStore {
    archives: RwLock<HashMap<String, Entry>>,
}

impl InMemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of responses captured in an archive.
    pub fn response_count(&self, archive_id: &str) -> usize {
        self.archives
            .read()
            .ok()
            .and_then(|archives| archives.get(archive_id).map(|e| e.responses.len()))
            .unwrap_or(0)
    }
}

fn poisoned() -> ArchiveError {
    ArchiveError::Storage("lock poisoned".to_string())
}

impl ArchiveStore for InMemoryArchiveStore {
    fn create_archive(&self, metadata: &ArchiveMetadata) -> Result<(), ArchiveError> {
        let mut archives = self.archives.write().map_err(|_| poisoned())?;
        if archives.contains_key(&metadata.archive_id) {
            return Err(ArchiveError::Storage(format!(
                "archive already exists: {}",
                metadata.archive_id
            )));
        }
        archives.insert(
            metadata.archive_id.clone(),
            Entry {
                metadata: metadata.clone(),
                responses: HashMap::new(),
            },
        );
        Ok(())
    }

    fn store(&self, archive_id: &str, request: &Request, body: &str) -> Result<(), ArchiveError> {
        let mut archives = self.archives.write().map_err(|_| poisoned())?;
        let entry = archives
            .get_mut(archive_id)
            .ok_or_else(|| ArchiveError::ArchiveNotFound(archive_id.to_string()))?;
        entry
            .responses
            .entry(request.archive_key())
            .or_insert_with(|| body.to_string());
        Ok(())
    }

    fn retrieve(&self, archive_id: &str, request: &Request) -> Result<String, ArchiveError> {
        let archives = self.archives.read().map_err(|_| poisoned())?;
        let entry = archives
            .get(archive_id)
            .ok_or_else(|| ArchiveError::ArchiveNotFound(archive_id.to_string()))?;
        let key = request.archive_key();
        match entry.responses.get(&key) {
            Some(body) => Ok(body.clone()),
            None => Err(ArchiveError::ResponseNotFound(key)),
        }
    }

    fn search(&self, query: &ArchiveQuery<'_>) -> Result<Vec<ArchiveMetadata>, ArchiveError> {
        let archives = self.archives.read().map_err(|_| poisoned())?;
        let mut found: Vec<_> = archives
            .values()
            .filter(|e| query.matches(&e.metadata))
            .map(|e| e.metadata.clone())
            .collect();

        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.archive_id.cmp(&b.archive_id))
        });
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use harvest_core::BackendArgs;

    fn metadata(id: &str, origin: &str, minutes_ago: i64) -> ArchiveMetadata {
        ArchiveMetadata {
            archive_id: id.to_string(),
            origin: origin.to_string(),
            backend_name: "archiving".to_string(),
            backend_version: "0.1.0".to_string(),
            category: "item".to_string(),
            backend_args: BackendArgs::new(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn query(origin: &str) -> ArchiveQuery<'_> {
        ArchiveQuery {
            origin,
            backend_name: "archiving",
            category: "item",
            archived_after: None,
        }
    }

    #[test]
    fn store_and_retrieve_by_request() {
        let store = InMemoryArchiveStore::new();
        store.create_archive(&metadata("a1", "o", 0)).unwrap();

        let request = Request::new("o").with_param("page", 1);
        store.store("a1", &request, "{\"id\": 1}").unwrap();

        assert_eq!(store.retrieve("a1", &request).unwrap(), "{\"id\": 1}");
        assert_eq!(store.response_count("a1"), 1);
    }

    #[test]
    fn first_captured_response_wins() {
        let store = InMemoryArchiveStore::new();
        store.create_archive(&metadata("a1", "o", 0)).unwrap();

        let request = Request::new("o");
        store.store("a1", &request, "first").unwrap();
        store.store("a1", &request, "second").unwrap();

        assert_eq!(store.retrieve("a1", &request).unwrap(), "first");
    }

    #[test]
    fn missing_response_and_archive_are_reported() {
        let store = InMemoryArchiveStore::new();
        store.create_archive(&metadata("a1", "o", 0)).unwrap();

        assert!(matches!(
            store.retrieve("a1", &Request::new("o")),
            Err(ArchiveError::ResponseNotFound(_))
        ));
        assert!(matches!(
            store.store("missing", &Request::new("o"), "x"),
            Err(ArchiveError::ArchiveNotFound(_))
        ));
    }

    #[test]
    fn search_returns_matching_archives_oldest_first() {
        let store = InMemoryArchiveStore::new();
        store.create_archive(&metadata("new", "o", 1)).unwrap();
        store.create_archive(&metadata("old", "o", 10)).unwrap();
        store.create_archive(&metadata("other", "p", 5)).unwrap();

        let ids: Vec<_> = store
            .search(&query("o"))
            .unwrap()
            .into_iter()
            .map(|m| m.archive_id)
            .collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[test]
    fn duplicate_archive_is_rejected() {
        let store = InMemoryArchiveStore::new();
        store.create_archive(&metadata("a1", "o", 0)).unwrap();
        assert!(store.create_archive(&metadata("a1", "o", 0)).is_err());
    }
}
