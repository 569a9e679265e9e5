use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use tokio::{
    fs,
    io::AsyncWriteExt,
    sync::{Mutex, OnceCell, RwLock},
};
use tracing::{debug, error, info};

use crate::errors::ServiceError;
use crate::record::Record;
use crate::storage::collection_store::CollectionStore;

/// JSON file-backed record collection.
///
/// The file holds one object with a single field (`collection`) whose value
/// is the ordered record array. The collection is loaded on first access;
/// a failed load is retried on the next access. Mutations are serialized by
/// `write_gate` and published only after the file has been replaced.
pub struct JsonCollectionStore {
    file_path: PathBuf,
    collection: String,
    records: OnceCell<RwLock<Vec<Record>>>,
    write_gate: Mutex<()>,
}

impl JsonCollectionStore {
    /// Create a store for `path`. No I/O happens until first access.
    pub fn new<P: Into<PathBuf>>(path: P, collection: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            file_path: path.into(),
            collection: collection.into(),
            records: OnceCell::new(),
            write_gate: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load the collection now instead of on the first request; returns its size.
    pub async fn warm(&self) -> Result<usize, ServiceError> {
        let published = self.loaded().await?;
        let len = published.read().await.len();
        Ok(len)
    }

    /// Read and parse the file.
    /// `NotFound` when the file does not exist, `CorruptStore` when it cannot be parsed.
    pub async fn load(&self) -> Result<Vec<Record>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ServiceError::not_found(&format!("store file {}", self.file_path.display())));
            }
            Err(e) => {
                return Err(ServiceError::Io(format!("read {}: {e}", self.file_path.display())));
            }
        };
        parse_collection(&bytes, &self.collection)
    }

    /// Serialize `records` and atomically replace the file.
    /// This does not touch the in-memory collection; use `mutate` for that.
    pub async fn save(&self, records: &[Record]) -> Result<(), ServiceError> {
        let bytes = render_collection(records, &self.collection)?;
        atomic_write(&self.file_path, &bytes).await?;
        debug!(path = %self.file_path.display(), count = records.len(), "store saved");
        Ok(())
    }

    async fn loaded(&self) -> Result<&RwLock<Vec<Record>>, ServiceError> {
        self.records
            .get_or_try_init(|| async {
                let path = self.file_path.display();
                let records = match self.load().await {
                    Ok(records) => {
                        info!(%path, count = records.len(), "store loaded");
                        records
                    }
                    Err(ServiceError::NotFound(_)) => {
                        info!(%path, "store file missing; starting with an empty collection");
                        Vec::new()
                    }
                    Err(e) => {
                        error!(%path, error = %e, "store load failed");
                        return Err(e);
                    }
                };
                Ok(RwLock::new(records))
            })
            .await
    }
}

#[async_trait]
impl CollectionStore for JsonCollectionStore {
    async fn read<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&[Record]) -> T + Send,
        T: Send,
    {
        let published = self.loaded().await?;
        let records = published.read().await;
        Ok(f(&records))
    }

    async fn mutate<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Vec<Record>) -> Result<T, ServiceError> + Send,
        T: Send,
    {
        let _gate = self.write_gate.lock().await;
        let published = self.loaded().await?;
        let mut working = published.read().await.clone();
        let out = f(&mut working)?;
        if let Err(e) = self.save(&working).await {
            error!(path = %self.file_path.display(), error = %e, "store write failed; collection left unchanged");
            return Err(e);
        }
        *published.write().await = working;
        Ok(out)
    }
}

struct Document<'a> {
    collection: &'a str,
    records: &'a [Record],
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.collection, self.records)?;
        map.end()
    }
}

fn render_collection(records: &[Record], collection: &str) -> Result<Vec<u8>, ServiceError> {
    let mut bytes = serde_json::to_vec_pretty(&Document { collection, records })
        .map_err(|e| ServiceError::Io(format!("serialize collection: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn parse_collection(bytes: &[u8], collection: &str) -> Result<Vec<Record>, ServiceError> {
    let mut doc: Map<String, Value> =
        serde_json::from_slice(bytes).map_err(|e| ServiceError::CorruptStore(format!("invalid JSON document: {e}")))?;
    let items = doc
        .remove(collection)
        .ok_or_else(|| ServiceError::CorruptStore(format!("missing `{collection}` field")))?;
    let records: Vec<Record> =
        serde_json::from_value(items).map_err(|e| ServiceError::CorruptStore(format!("invalid record: {e}")))?;

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if record.id == 0 {
            return Err(ServiceError::CorruptStore("record id must be positive".into()));
        }
        if !seen.insert(record.id) {
            return Err(ServiceError::CorruptStore(format!("duplicate record id {}", record.id)));
        }
    }
    Ok(records)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write to a sibling temp file, sync it, then rename over `path`.
async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ServiceError::Io(format!("create directory {}: {e}", parent.display())))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = write_synced(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(ServiceError::Io(format!("write temp file {}: {e}", tmp.display())));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(ServiceError::Io(format!(
            "rename temp file {} -> {}: {e}",
            tmp.display(),
            path.display()
        )));
    }
    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tmp_store_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("product_store_{}", uuid::Uuid::new_v4()))
            .join(format!("{tag}.json"))
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    async fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn missing_file_is_not_found_and_reads_as_empty() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("missing");
        let store = JsonCollectionStore::new(&path, "products");

        assert!(matches!(store.load().await, Err(ServiceError::NotFound(_))));
        assert!(store.snapshot().await?.is_empty());
        // reading never creates the file
        assert!(fs::metadata(&path).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("round_trip");
        let store = JsonCollectionStore::new(&path, "products");
        let records = vec![
            record(json!({"id": 1, "name": "Soap", "price": 2.5})),
            record(json!({"id": 7, "name": "Towel", "tags": ["bath", "cotton"], "meta": {"color": null}})),
        ];

        store.save(&records).await?;
        assert_eq!(store.load().await?, records);

        let raw: Value = serde_json::from_slice(&fs::read(&path).await?)?;
        assert_eq!(raw["products"][1]["tags"], json!(["bath", "cotton"]));
        assert_eq!(raw.as_object().map(|o| o.len()), Some(1));
        assert!(fs::metadata(tmp_path(&path)).await.is_err());

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn custom_collection_field_name() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("items");
        let store = JsonCollectionStore::new(&path, "items");
        store.save(&[record(json!({"id": 1}))]).await?;

        let raw: Value = serde_json::from_slice(&fs::read(&path).await?)?;
        assert_eq!(raw, json!({"items": [{"id": 1}]}));

        let other = JsonCollectionStore::new(&path, "products");
        assert!(matches!(other.load().await, Err(ServiceError::CorruptStore(_))));
        cleanup(&path).await;
        Ok(())
    }

    #[test]
    fn parse_rejects_malformed_documents() {
        let cases: [&[u8]; 7] = [
            b"not json",
            b"[]",
            b"{\"other\": []}",
            b"{\"products\": {}}",
            b"{\"products\": [{\"name\": \"no id\"}]}",
            b"{\"products\": [{\"id\": 0}]}",
            b"{\"products\": [{\"id\": 1}, {\"id\": 1}]}",
        ];
        for bytes in cases {
            assert!(
                matches!(parse_collection(bytes, "products"), Err(ServiceError::CorruptStore(_))),
                "expected corrupt store for {}",
                String::from_utf8_lossy(bytes)
            );
        }
        assert!(parse_collection(b"{\"products\": []}", "products").unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_fails_access_until_repaired() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).await?;
        fs::write(&path, b"{ broken").await?;
        let store = JsonCollectionStore::new(&path, "products");

        assert!(matches!(store.snapshot().await, Err(ServiceError::CorruptStore(_))));
        let res = store.mutate(|records| { records.clear(); Ok(()) }).await;
        assert!(matches!(res, Err(ServiceError::CorruptStore(_))));
        // the corrupt file is left for operators to inspect
        assert_eq!(fs::read(&path).await?, b"{ broken");

        fs::write(&path, br#"{"products": [{"id": 3, "name": "Soap"}]}"#).await?;
        assert_eq!(store.warm().await?, 1);
        assert_eq!(store.snapshot().await?[0].id, 3);

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn mutate_persists_and_publishes() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("mutate");
        let store = JsonCollectionStore::new(&path, "products");

        let len = store
            .mutate(|records| {
                records.push(record(json!({"id": 1, "name": "Soap"})));
                records.push(record(json!({"id": 2, "name": "Towel"})));
                Ok(records.len())
            })
            .await?;
        assert_eq!(len, 2);
        assert_eq!(store.snapshot().await?.len(), 2);

        let reloaded = JsonCollectionStore::new(&path, "products");
        assert_eq!(reloaded.snapshot().await?, store.snapshot().await?);

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_closure_changes_nothing() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("closure_err");
        let store = JsonCollectionStore::new(&path, "products");

        let res: Result<(), _> = store
            .mutate(|records| {
                records.push(record(json!({"id": 1})));
                Err(ServiceError::not_found("record"))
            })
            .await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
        assert!(store.snapshot().await?.is_empty());
        assert!(fs::metadata(&path).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_and_disk_unchanged() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("write_fail");
        let store = JsonCollectionStore::new(&path, "products");
        store.mutate(|records| { records.push(record(json!({"id": 1, "name": "Soap"}))); Ok(()) }).await?;

        // Replace the file with a directory so the final rename fails.
        fs::remove_file(&path).await?;
        fs::create_dir(&path).await?;

        let res = store.mutate(|records| { records.push(record(json!({"id": 2, "name": "Towel"}))); Ok(()) }).await;
        assert!(matches!(res, Err(ServiceError::Io(_))));
        assert_eq!(store.snapshot().await?, vec![record(json!({"id": 1, "name": "Soap"}))]);
        assert!(fs::metadata(&path).await?.is_dir());
        assert!(fs::metadata(tmp_path(&path)).await.is_err());

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_mutations_do_not_lose_updates() -> Result<(), anyhow::Error> {
        let path = tmp_store_path("concurrent");
        let store = JsonCollectionStore::new(&path, "products");

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .mutate(move |records| {
                        let id = crate::storage::next_id(records)?;
                        records.push(record(json!({"id": id, "n": i})));
                        Ok(id)
                    })
                    .await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await??);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());

        let reloaded = JsonCollectionStore::new(&path, "products");
        assert_eq!(reloaded.snapshot().await?.len(), 16);

        cleanup(&path).await;
        Ok(())
    }
}
