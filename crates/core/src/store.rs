//! Write-through JSON document collections.
//!
//! Every collection keeps its documents in memory behind a `RwLock` and mirrors each one to disk
//! as a single JSON file in a sharded directory:
//!
//! ```text
//! records/
//!   <collection>/
//!     <s1>/
//!       <s2>/
//!         <id>/
//!           record.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the document id. Writes go to a
//! temporary file that is renamed over the previous version, and the in-memory map is only
//! updated after the file is in place. All mutating operations hold the collection's write lock
//! for their full duration, so check-then-insert sequences (unique e-mail, display id
//! allocation, slot conflicts) are atomic within the process.

use crate::config::CoreConfig;
use crate::constants::RECORD_JSON_FILENAME;
use crate::models::{Account, Appointment, LabTest, Prescription, Report};
use crate::{HospitalError, HospitalResult, RecordId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// A record type stored in its own collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Directory name of the collection under `records/`.
    const COLLECTION: &'static str;
    /// Human-readable name used in "not found" errors.
    const KIND: &'static str;

    fn id(&self) -> &RecordId;
}

/// Read-only view of a collection handed to closures running under the write lock.
pub struct Snapshot<'a, T> {
    items: &'a HashMap<RecordId, T>,
}

impl<T> Snapshot<'_, T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn get(&self, id: &RecordId) -> Option<&T> {
        self.items.get(id)
    }

    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.items.values().any(pred)
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.items.values().filter(|d| pred(d)).count()
    }
}

pub struct Collection<T: Document> {
    dir: PathBuf,
    items: RwLock<HashMap<RecordId, T>>,
}

impl<T: Document> Collection<T> {
    /// Opens the collection under `records_dir`, loading every stored document.
    ///
    /// Files that cannot be parsed are logged and skipped, so one corrupt document does not
    /// take the service down.
    pub fn open(records_dir: &Path) -> HospitalResult<Self> {
        let dir = records_dir.join(T::COLLECTION);
        fs::create_dir_all(&dir).map_err(HospitalError::StorageDirCreation)?;

        let mut items = HashMap::new();
        for path in record_files(&dir) {
            let contents = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read record");
                    continue;
                }
            };
            match serde_json::from_str::<T>(&contents) {
                Ok(doc) => {
                    items.insert(doc.id().clone(), doc);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse record");
                }
            }
        }

        tracing::debug!(collection = T::COLLECTION, count = items.len(), "collection loaded");

        Ok(Self {
            dir,
            items: RwLock::new(items),
        })
    }

    pub fn get(&self, id: &RecordId) -> Option<T> {
        self.read().get(id).cloned()
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.read().values().filter(|d| pred(d)).cloned().collect()
    }

    pub fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.read().values().find(|d| pred(d)).cloned()
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.read().values().filter(|d| pred(d)).count()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a new document.
    pub fn insert(&self, doc: T) -> HospitalResult<T> {
        self.insert_with(|_| Ok(doc))
    }

    /// Builds and inserts a document while holding the write lock.
    ///
    /// `build` sees every existing document and may reject the insert; nothing is written when
    /// it returns an error.
    pub fn insert_with(
        &self,
        build: impl FnOnce(&Snapshot<'_, T>) -> HospitalResult<T>,
    ) -> HospitalResult<T> {
        let mut items = self.write();
        let doc = build(&Snapshot { items: &items })?;
        if items.contains_key(doc.id()) {
            return Err(HospitalError::Conflict(format!(
                "{} document {} already exists",
                T::COLLECTION,
                doc.id()
            )));
        }
        self.persist(&doc)?;
        items.insert(doc.id().clone(), doc.clone());
        Ok(doc)
    }

    /// Applies `change` to a copy of the document, persists it, then publishes it.
    pub fn update(
        &self,
        id: &RecordId,
        change: impl FnOnce(&mut T) -> HospitalResult<()>,
    ) -> HospitalResult<T> {
        self.update_checked(id, |_, doc| change(doc))
    }

    /// Like [`Collection::update`], with a view of the other documents for conflict checks.
    pub fn update_checked(
        &self,
        id: &RecordId,
        change: impl FnOnce(&Snapshot<'_, T>, &mut T) -> HospitalResult<()>,
    ) -> HospitalResult<T> {
        let mut items = self.write();
        let mut doc = items
            .get(id)
            .cloned()
            .ok_or(HospitalError::NotFound(T::KIND))?;
        change(&Snapshot { items: &items }, &mut doc)?;
        self.persist(&doc)?;
        items.insert(id.clone(), doc.clone());
        Ok(doc)
    }

    /// Removes a document from memory and disk.
    pub fn remove(&self, id: &RecordId) -> HospitalResult<T> {
        self.remove_with(id, |_, _| ())
    }

    /// Removes a document, then runs `after` with the remaining documents and the removed one
    /// before the write lock is released.
    pub fn remove_with(
        &self,
        id: &RecordId,
        after: impl FnOnce(&Snapshot<'_, T>, &T),
    ) -> HospitalResult<T> {
        let mut items = self.write();
        if !items.contains_key(id) {
            return Err(HospitalError::NotFound(T::KIND));
        }
        let doc_dir = id.sharded_dir(&self.dir);
        match fs::remove_dir_all(&doc_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(HospitalError::FileRemove(e)),
        }
        let doc = items.remove(id).ok_or(HospitalError::NotFound(T::KIND))?;
        after(&Snapshot { items: &items }, &doc);
        Ok(doc)
    }

    /// Runs `f` while holding the write lock, so no insert, update or removal interleaves.
    pub fn locked<R>(&self, f: impl FnOnce(&Snapshot<'_, T>) -> R) -> R {
        let items = self.write();
        f(&Snapshot { items: &items })
    }

    fn persist(&self, doc: &T) -> HospitalResult<()> {
        let doc_dir = doc.id().sharded_dir(&self.dir);
        fs::create_dir_all(&doc_dir).map_err(HospitalError::StorageDirCreation)?;

        let json = serde_json::to_vec_pretty(doc).map_err(HospitalError::Serialization)?;
        let target = doc_dir.join(RECORD_JSON_FILENAME);
        let tmp = doc_dir.join(format!("{RECORD_JSON_FILENAME}.tmp"));

        fs::write(&tmp, json).map_err(HospitalError::FileWrite)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(HospitalError::FileWrite(e));
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RecordId, T>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RecordId, T>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Walks `<dir>/<s1>/<s2>/<id>/record.json`, ignoring anything that does not fit the layout.
fn record_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let s1_iter = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(_) => return found,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };
        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for id_ent in id_iter.flatten() {
                let id_path = id_ent.path();
                let canonical = id_path
                    .file_name()
                    .and_then(|os| os.to_str())
                    .is_some_and(RecordId::is_canonical);
                if !canonical || !id_path.is_dir() {
                    continue;
                }

                let record_path = id_path.join(RECORD_JSON_FILENAME);
                if record_path.is_file() {
                    found.push(record_path);
                }
            }
        }
    }

    found
}

/// All collections of the hospital service.
pub struct Database {
    pub accounts: Collection<Account>,
    pub appointments: Collection<Appointment>,
    pub lab_tests: Collection<LabTest>,
    pub prescriptions: Collection<Prescription>,
    pub reports: Collection<Report>,
}

impl Database {
    pub fn open(cfg: &CoreConfig) -> HospitalResult<Self> {
        let records_dir = cfg.records_dir();
        Ok(Self {
            accounts: Collection::open(&records_dir)?,
            appointments: Collection::open(&records_dir)?,
            lab_tests: Collection::open(&records_dir)?,
            prescriptions: Collection::open(&records_dir)?,
            reports: Collection::open(&records_dir)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: RecordId,
        body: String,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";
        const KIND: &'static str = "Note";

        fn id(&self) -> &RecordId {
            &self.id
        }
    }

    fn note(body: &str) -> Note {
        Note {
            id: RecordId::new(),
            body: body.into(),
        }
    }

    #[test]
    fn documents_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let notes = Collection::<Note>::open(temp_dir.path()).unwrap();
        let saved = notes.insert(note("first")).unwrap();

        let path = saved
            .id
            .sharded_dir(&temp_dir.path().join("notes"))
            .join(RECORD_JSON_FILENAME);
        assert!(path.is_file(), "record file should be written");

        let reopened = Collection::<Note>::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get(&saved.id), Some(saved));
    }

    #[test]
    fn corrupt_files_are_skipped_on_open() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let notes = Collection::<Note>::open(temp_dir.path()).unwrap();
        notes.insert(note("good")).unwrap();

        let bad = RecordId::new().sharded_dir(&temp_dir.path().join("notes"));
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join(RECORD_JSON_FILENAME), "{not json").unwrap();

        let reopened = Collection::<Note>::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn insert_with_rejection_writes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let notes = Collection::<Note>::open(temp_dir.path()).unwrap();
        notes.insert(note("taken")).unwrap();

        let err = notes
            .insert_with(|snapshot| {
                if snapshot.any(|n| n.body == "taken") {
                    return Err(HospitalError::Conflict("duplicate".into()));
                }
                Ok(note("taken"))
            })
            .unwrap_err();

        assert!(matches!(err, HospitalError::Conflict(_)));
        assert_eq!(notes.len(), 1);
        assert_eq!(record_files(&temp_dir.path().join("notes")).len(), 1);
    }

    #[test]
    fn failed_update_leaves_document_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let notes = Collection::<Note>::open(temp_dir.path()).unwrap();
        let saved = notes.insert(note("original")).unwrap();

        let err = notes
            .update(&saved.id, |n| {
                n.body = "changed".into();
                Err(HospitalError::validation("body", "nope"))
            })
            .unwrap_err();
        assert!(matches!(err, HospitalError::Validation { .. }));
        assert_eq!(notes.get(&saved.id).unwrap().body, "original");

        let updated = notes
            .update(&saved.id, |n| {
                n.body = "changed".into();
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.body, "changed");
        let reopened = Collection::<Note>::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get(&saved.id).unwrap().body, "changed");
    }

    #[test]
    fn remove_with_sees_remaining_documents_under_the_lock() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let notes = Collection::<Note>::open(temp_dir.path()).unwrap();
        let first = notes.insert(note("same")).unwrap();
        notes.insert(note("same")).unwrap();

        let mut remaining_same = None;
        let removed = notes
            .remove_with(&first.id, |remaining, removed| {
                remaining_same = Some(remaining.count(|n| n.body == removed.body));
            })
            .unwrap();

        assert_eq!(removed.id, first.id);
        assert_eq!(remaining_same, Some(1));
        assert_eq!(notes.locked(|all| all.count(|_| true)), 1);
    }

    #[test]
    fn remove_deletes_record_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let notes = Collection::<Note>::open(temp_dir.path()).unwrap();
        let saved = notes.insert(note("bye")).unwrap();

        notes.remove(&saved.id).unwrap();
        assert!(notes.get(&saved.id).is_none());
        assert!(!saved.id.sharded_dir(&temp_dir.path().join("notes")).exists());
        assert!(matches!(
            notes.remove(&saved.id),
            Err(HospitalError::NotFound(_))
        ));
    }
}
