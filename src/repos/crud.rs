//! Generic CRUD repository contract.
//!
//! Semantics every implementation keeps:
//! - `find_by_id` on an absent key is `Ok(None)`, never an error
//! - `save` with no id generates one; with an id it inserts or replaces at that id
//! - `insert` never replaces: a taken key is a `Conflict`, decided atomically
//! - `delete_by_id` on an absent key is `Ok(false)`
//! - constraint violations surface as `RepoError::Conflict`
use async_trait::async_trait;

use crate::repos::error::RepoResult;

/// An entity with an optional (not yet assigned) key.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Send + Sync + 'static;

    fn id(&self) -> Option<Self::Id>;
}

#[async_trait]
pub trait CrudRepository<T: Entity>: Send + Sync {
    async fn find_by_id(&self, id: T::Id) -> RepoResult<Option<T>>;

    async fn exists_by_id(&self, id: T::Id) -> RepoResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// All rows, ordered by key.
    async fn find_all(&self) -> RepoResult<Vec<T>>;

    async fn find_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<T>>;

    async fn find_all_by_id(&self, ids: &[T::Id]) -> RepoResult<Vec<T>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(found) = self.find_by_id(*id).await? {
                out.push(found);
            }
        }
        Ok(out)
    }

    async fn count(&self) -> RepoResult<i64>;

    async fn save(&self, entity: T) -> RepoResult<T>;

    /// Create-only save.
    async fn insert(&self, entity: T) -> RepoResult<T>;

    async fn save_all(&self, entities: Vec<T>) -> RepoResult<Vec<T>> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            out.push(self.save(entity).await?);
        }
        Ok(out)
    }

    async fn delete_by_id(&self, id: T::Id) -> RepoResult<bool>;

    async fn delete_all(&self) -> RepoResult<u64>;
}
