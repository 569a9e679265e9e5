use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::record::Record;

/// Owner of the canonical record collection.
///
/// Implementations must run every `mutate` call as one atomic
/// read-modify-write with respect to other mutations, and must only publish
/// the new collection once it has been persisted.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Run `f` against the published collection, in insertion order.
    async fn read<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&[Record]) -> T + Send,
        T: Send;

    /// Clone of the published collection.
    async fn snapshot(&self) -> Result<Vec<Record>, ServiceError> {
        self.read(|records| records.to_vec()).await
    }

    /// Apply `f` to a working copy of the collection, persist it, then publish it.
    /// If `f` or the write fails, the published collection is unchanged.
    async fn mutate<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Vec<Record>) -> Result<T, ServiceError> + Send,
        T: Send;
}

/// `1 + max(id)`, or `1` for an empty collection.
/// Fails once the largest id is `u64::MAX`; ids are never reused or wrapped.
pub fn next_id(records: &[Record]) -> Result<u64, ServiceError> {
    match records.iter().map(|r| r.id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| ServiceError::IdsExhausted(format!("largest id is {max}"))),
    }
}
