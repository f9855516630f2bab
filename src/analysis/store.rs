//! Persistence of analysed elements.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::types::{AnalysedElement, AnalysisResult, SentimentResponse};

/// One stored sentiment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentRecord {
    pub id: Uuid,
    pub application_id: i64,
    pub form_url: String,
    pub element_id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    pub input_text: String,
    pub overall_sentiment: String,
    pub score: f64,
    pub created: DateTime<Utc>,
}

impl SentimentRecord {
    fn from_element(application_id: i64, form_url: &str, element: &AnalysedElement) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id,
            form_url: form_url.to_string(),
            element_id: element.element_id.clone(),
            element_type: element.element_type.clone(),
            input_text: element.text.clone(),
            overall_sentiment: element.overall_sentiment.clone(),
            score: element.score,
            created: Utc::now(),
        }
    }
}

/// Concurrent map of sentiment records, written through to a JSON file.
#[derive(Clone)]
pub struct SentimentStore {
    inner: Arc<DashMap<Uuid, SentimentRecord>>,
    path: Option<PathBuf>,
    // Held from snapshot to rename.
    write_lock: Arc<Mutex<()>>,
}

impl SentimentStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            path: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the store at `path`, loading any records already there.
    pub fn open(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            inner: Arc::new(DashMap::new()),
            path: Some(path.clone()),
            write_lock: Arc::new(Mutex::new(())),
        };

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let records: Vec<SentimentRecord> = serde_json::from_reader(reader)?;
            for record in records {
                store.inner.insert(record.id, record);
            }
            tracing::info!(
                path = %path.display(),
                records = store.inner.len(),
                "Loaded sentiment store"
            );
        }
        Ok(store)
    }

    /// Record every element of an analysis and flush to disk.
    pub fn insert_response(&self, response: &SentimentResponse) -> AnalysisResult<Vec<Uuid>> {
        let ids = response
            .data
            .iter()
            .map(|element| {
                let record = SentimentRecord::from_element(
                    response.application_id,
                    &response.form_url,
                    element,
                );
                let id = record.id;
                self.inner.insert(id, record);
                id
            })
            .collect();
        self.save()?;
        Ok(ids)
    }

    /// Records of one application, oldest first.
    pub fn for_application(&self, application_id: i64) -> Vec<SentimentRecord> {
        let mut records: Vec<SentimentRecord> = self
            .inner
            .iter()
            .filter(|r| r.value().application_id == application_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.element_id.cmp(&b.element_id))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Write all records to the backing file, if any.
    ///
    /// Saves are serialized and replace the file by rename.
    pub fn save(&self) -> AnalysisResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Sorted by id.
        let ordered: BTreeMap<Uuid, SentimentRecord> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        let records: Vec<&SentimentRecord> = ordered.values().collect();

        let tmp = temp_path(path);
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &records)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), records = records.len(), "Saved sentiment store");
        Ok(())
    }
}

/// Sibling of `path` used as the staging file for a save.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(application_id: i64) -> SentimentResponse {
        SentimentResponse {
            application_id,
            form_url: "https://forms.example.com/form/1".into(),
            data: vec![AnalysedElement {
                element_id: "comments".into(),
                element_type: Some("textarea".into()),
                text: "Loved it".into(),
                overall_sentiment: "positive".into(),
                score: 0.93,
            }],
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SentimentStore::in_memory();
        assert!(store.is_empty());

        store.insert_response(&response(7)).unwrap();
        store.insert_response(&response(8)).unwrap();

        assert_eq!(store.len(), 2);
        let records = store.for_application(7);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input_text, "Loved it");
        assert_eq!(records[0].overall_sentiment, "positive");
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sentiment.json");

        let store = SentimentStore::open(&path).unwrap();
        let ids = store.insert_response(&response(3)).unwrap();
        assert_eq!(ids.len(), 1);

        let reopened = SentimentStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.for_application(3)[0].id, ids[0]);
    }

    #[test]
    fn test_concurrent_saves_keep_the_file_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentiment.json");
        let store = SentimentStore::open(&path).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for round in 0..25 {
                        store.insert_response(&response(worker * 100 + round)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = SentimentStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 200);
        assert_eq!(reopened.len(), store.len());
        assert!(!temp_path(&path).exists());
    }
}
