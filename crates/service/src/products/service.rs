use std::sync::Arc;

use tracing::info;

use crate::errors::ServiceError;
use crate::record::{CreatePayload, Created, Fields, Record};
use crate::storage::{next_id, CollectionStore, JsonCollectionStore};

/// Product CRUD on top of an injected [`CollectionStore`].
///
/// Every mutation runs inside `CollectionStore::mutate`, so id assignment,
/// merge and delete each see the collection as left by the previous write.
pub struct ProductService<S = JsonCollectionStore> {
    store: Arc<S>,
}

fn not_found(id: u64) -> ServiceError {
    ServiceError::NotFound(format!("product {id} not found"))
}

impl<S: CollectionStore> ProductService<S> {
    pub fn new(store: Arc<S>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    /// Full collection in stored order.
    pub async fn list(&self) -> Result<Vec<Record>, ServiceError> {
        self.store.snapshot().await
    }

    pub async fn get(&self, id: u64) -> Result<Record, ServiceError> {
        self.store
            .read(|records| records.iter().find(|r| r.id == id).cloned())
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Assign ids and append. Ids are taken one at a time from the working
    /// collection, so a batch gets distinct increasing ids. Client ids are dropped.
    /// If the id space runs out part-way, nothing from the batch is kept.
    pub async fn create(&self, payload: CreatePayload) -> Result<Created, ServiceError> {
        if matches!(&payload, CreatePayload::Many(items) if items.is_empty()) {
            return Ok(Created::Many(Vec::new()));
        }
        let created = self
            .store
            .mutate(move |records| {
                let mut append = |fields: Fields| -> Result<Record, ServiceError> {
                    let record = Record::new(next_id(records)?, fields);
                    records.push(record.clone());
                    Ok(record)
                };
                Ok(match payload {
                    CreatePayload::One(fields) => Created::One(append(fields)?),
                    CreatePayload::Many(items) => {
                        Created::Many(items.into_iter().map(append).collect::<Result<_, _>>()?)
                    }
                })
            })
            .await?;
        let ids: Vec<u64> = created.records().iter().map(|r| r.id).collect();
        info!(count = ids.len(), ?ids, "created products");
        Ok(created)
    }

    /// Shallow-merge `patch` into the record; its `id` is never changed.
    pub async fn update(&self, id: u64, patch: Fields) -> Result<Record, ServiceError> {
        let updated = self
            .store
            .mutate(move |records| {
                let record = records.iter_mut().find(|r| r.id == id).ok_or_else(|| not_found(id))?;
                record.merge(patch);
                Ok(record.clone())
            })
            .await?;
        info!(id, "updated product");
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> Result<(), ServiceError> {
        self.store
            .mutate(move |records| {
                let pos = records.iter().position(|r| r.id == id).ok_or_else(|| not_found(id))?;
                records.remove(pos);
                Ok(())
            })
            .await?;
        info!(id, "deleted product");
        Ok(())
    }
}
