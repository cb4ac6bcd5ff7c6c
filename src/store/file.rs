use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::RecordStore;
use crate::error::{Result, StoreError};
use crate::id;
use crate::model::{Fields, Record};

type Document = BTreeMap<String, Vec<Record>>;

/// A JSON document on disk holding one array per collection:
///
/// ```json
/// { "books": [ { "id": "V1StGXR8", "title": "Dune" } ], "users": [] }
/// ```
///
/// The document is loaded once and kept in memory. Every mutation takes the
/// lock, applies the change, and rewrites the whole file before releasing,
/// so writers are serialised and memory never runs ahead of disk.
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonFileStore {
    pub async fn open(path: impl AsRef<Path>, collections: &[String]) -> AnyResult<Arc<Self>> {
        let path = path.as_ref().to_path_buf();

        let mut doc: Document = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Document::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", path.display(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "data file missing, creating it");
                Document::new()
            }
            Err(e) => anyhow::bail!("failed to read {}: {}", path.display(), e),
        };

        for name in collections {
            doc.entry(name.clone()).or_default();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        write_document(&path, &doc)
            .await
            .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;

        Ok(Arc::new(JsonFileStore {
            path,
            doc: Mutex::new(doc),
        }))
    }

    pub fn collection(self: &Arc<Self>, name: &str) -> FileCollection {
        FileCollection {
            store: Arc::clone(self),
            name: name.to_string(),
        }
    }

    async fn read<T>(&self, name: &str, f: impl FnOnce(&[Record]) -> T) -> T {
        let doc = self.doc.lock().await;
        f(doc.get(name).map(Vec::as_slice).unwrap_or_default())
    }

    /// Applies `f` to the named collection and persists the document. If the
    /// write fails the collection is restored to its previous contents.
    async fn mutate<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Vec<Record>) -> Result<T>,
    ) -> Result<T> {
        let mut doc = self.doc.lock().await;

        let collection = doc.entry(name.to_string()).or_default();
        let backup = collection.clone();
        let out = f(collection)?;

        if let Err(e) = write_document(&self.path, &doc).await {
            tracing::error!(collection = name, path = %self.path.display(), error = %e, "failed to persist data file, rolling back");
            doc.insert(name.to_string(), backup);
            return Err(e);
        }

        Ok(out)
    }
}

async fn write_document(path: &Path, doc: &Document) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(doc)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, &bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[derive(Clone)]
pub struct FileCollection {
    store: Arc<JsonFileStore>,
    name: String,
}

fn position(records: &[Record], id: &str) -> Result<usize> {
    records
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

#[async_trait]
impl RecordStore for FileCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<Vec<Record>> {
        Ok(self.store.read(&self.name, |records| records.to_vec()).await)
    }

    async fn get(&self, id: &str) -> Result<Record> {
        self.store
            .read(&self.name, |records| {
                records
                    .iter()
                    .find(|r| r.id == id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))
            })
            .await
    }

    async fn insert(&self, fields: Fields) -> Result<Record> {
        let record = Record::new(id::generate(), fields);
        let created = record.clone();
        self.store
            .mutate(&self.name, move |records| {
                records.push(record);
                Ok(())
            })
            .await?;
        Ok(created)
    }

    async fn replace_merge(&self, id: &str, fields: Fields) -> Result<Vec<Record>> {
        self.store
            .mutate(&self.name, |records| {
                let idx = position(records, id)?;
                records[idx].merge(fields);
                Ok(records.clone())
            })
            .await
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<Record> {
        self.store
            .mutate(&self.name, |records| {
                let idx = position(records, id)?;
                records[idx].merge(fields);
                Ok(records[idx].clone())
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<Record> {
        self.store
            .mutate(&self.name, |records| {
                let idx = position(records, id)?;
                Ok(records.remove(idx))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn on_disk(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_file_with_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        JsonFileStore::open(&path, &names(&["books", "users"]))
            .await
            .unwrap();

        assert_eq!(on_disk(&path).await, json!({"books": [], "users": []}));
    }

    #[tokio::test]
    async fn test_open_keeps_existing_records_and_adds_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"books":[{"id":"aaaaaaaa","title":"Dune"}]}"#).unwrap();

        let store = JsonFileStore::open(&path, &names(&["books", "users"]))
            .await
            .unwrap();
        let books = store.collection("books").list().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, "aaaaaaaa");
        assert_eq!(on_disk(&path).await["users"], json!([]));
    }

    #[tokio::test]
    async fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(JsonFileStore::open(&path, &names(&["books"])).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_persists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path, &names(&["books"])).await.unwrap();
        let books = store.collection("books");

        let a = books.insert(fields(json!({"title": "Dune"}))).await.unwrap();
        let b = books.insert(fields(json!({"title": "Emma"}))).await.unwrap();
        assert_ne!(a.id, b.id);

        let listed = books.list().await.unwrap();
        assert_eq!(listed, vec![a.clone(), b.clone()]);

        let disk = on_disk(&path).await;
        assert_eq!(disk["books"][0]["id"], json!(a.id));
        assert_eq!(disk["books"][1]["title"], json!("Emma"));
    }

    #[tokio::test]
    async fn test_reopen_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let created = {
            let store = JsonFileStore::open(&path, &names(&["users"])).await.unwrap();
            store
                .collection("users")
                .insert(fields(json!({"name": "ada"})))
                .await
                .unwrap()
        };

        let store = JsonFileStore::open(&path, &names(&["users"])).await.unwrap();
        assert_eq!(store.collection("users").get(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_replace_merge_returns_collection_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json"), &names(&["books"]))
            .await
            .unwrap();
        let books = store.collection("books");
        let first = books
            .insert(fields(json!({"title": "Dune", "author": "Herbert"})))
            .await
            .unwrap();
        let second = books.insert(fields(json!({"title": "Emma"}))).await.unwrap();

        let all = books
            .replace_merge(&first.id, fields(json!({"author": "F. Herbert"})))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].get("title"), Some(&json!("Dune")));
        assert_eq!(all[0].get("author"), Some(&json!("F. Herbert")));
        assert_eq!(all[1], second);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json"), &names(&["books"]))
            .await
            .unwrap();
        let books = store.collection("books");

        assert!(books.get("nope").await.unwrap_err().is_not_found());
        assert!(books.delete("nope").await.unwrap_err().is_not_found());
        assert!(
            books
                .replace_merge("nope", Fields::new())
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(books.update("nope", Fields::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json"), &names(&["books"]))
            .await
            .unwrap();
        let books = store.collection("books");
        let r = books.insert(fields(json!({"title": "Dune"}))).await.unwrap();

        assert_eq!(books.delete(&r.id).await.unwrap(), r);
        assert!(books.get(&r.id).await.unwrap_err().is_not_found());
        assert!(books.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json"), &names(&["books", "users"]))
            .await
            .unwrap();
        let b = store
            .collection("books")
            .insert(fields(json!({"title": "Dune"})))
            .await
            .unwrap();

        assert!(store.collection("users").list().await.unwrap().is_empty());
        assert!(store.collection("users").get(&b.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path, &names(&["books"])).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let books = store.collection("books");
            tasks.spawn(async move { books.insert(fields(json!({ "n": i }))).await });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap().unwrap();
        }

        assert_eq!(store.collection("books").list().await.unwrap().len(), 32);
        assert_eq!(on_disk(&path).await["books"].as_array().unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path, &names(&["books"])).await.unwrap();
        let books = store.collection("books");
        books.insert(fields(json!({"title": "Dune"}))).await.unwrap();

        // a directory squatting on the temp path makes the write fail
        std::fs::create_dir(dir.path().join("db.json.tmp")).unwrap();

        let err = books.insert(fields(json!({"title": "Emma"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        assert_eq!(books.list().await.unwrap().len(), 1);
    }
}
