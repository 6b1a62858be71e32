//! In-memory user store.
//!
//! Same contract as the Postgres store (unique user name / email, generated
//! keys that skip explicit ones) so it can stand in for it in development and
//! tests. Data is lost when the process exits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::repos::crud::{CrudRepository, Entity};
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::user_repo::{
    USER_EMAIL_CONSTRAINT, USER_KEY_CONSTRAINT, USER_NAME_CONSTRAINT, User, ensure_positive_key,
};

#[derive(Debug)]
struct Rows {
    by_id: BTreeMap<i32, User>,
    next_id: i32,
}

#[derive(Debug)]
pub struct MemoryUserRepository {
    rows: RwLock<Rows>,
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Rows {
                by_id: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Rows {
    fn check_unique(&self, user: &User, id: i32) -> RepoResult<()> {
        for (other_id, other) in &self.by_id {
            if *other_id == id {
                continue;
            }
            if other.user_name == user.user_name {
                return Err(RepoError::conflict(USER_NAME_CONSTRAINT));
            }
            if other.email == user.email {
                return Err(RepoError::conflict(USER_EMAIL_CONSTRAINT));
            }
        }
        Ok(())
    }

    /// Lowest free key at or above `next_id`, like an identity sequence.
    fn next_free_id(&mut self) -> RepoResult<i32> {
        while self.by_id.contains_key(&self.next_id) {
            self.next_id = self
                .next_id
                .checked_add(1)
                .ok_or(RepoError::KeysExhausted)?;
        }
        Ok(self.next_id)
    }

    fn save(&mut self, mut user: User) -> RepoResult<User> {
        let id = match user.id() {
            Some(id) => ensure_positive_key(id)?,
            None => self.next_free_id()?,
        };

        self.check_unique(&user, id)?;

        self.next_id = self.next_id.max(id.saturating_add(1));
        user.id = Some(id);
        self.by_id.insert(id, user.clone());
        Ok(user)
    }

    fn insert(&mut self, user: User) -> RepoResult<User> {
        if let Some(id) = user.id()
            && self.by_id.contains_key(&id)
        {
            return Err(RepoError::conflict(USER_KEY_CONSTRAINT));
        }
        self.save(user)
    }
}

#[async_trait]
impl CrudRepository<User> for MemoryUserRepository {
    async fn find_by_id(&self, id: i32) -> RepoResult<Option<User>> {
        Ok(self.rows.read().await.by_id.get(&id).cloned())
    }

    async fn find_all(&self) -> RepoResult<Vec<User>> {
        Ok(self.rows.read().await.by_id.values().cloned().collect())
    }

    async fn find_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<User>> {
        let rows = self.rows.read().await;
        Ok(rows
            .by_id
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> RepoResult<i64> {
        Ok(self.rows.read().await.by_id.len() as i64)
    }

    async fn save(&self, entity: User) -> RepoResult<User> {
        self.rows.write().await.save(entity)
    }

    async fn insert(&self, entity: User) -> RepoResult<User> {
        self.rows.write().await.insert(entity)
    }

    async fn save_all(&self, entities: Vec<User>) -> RepoResult<Vec<User>> {
        let mut rows = self.rows.write().await;

        // Stage on a copy so a conflict half-way leaves the store untouched.
        let mut staged = Rows {
            by_id: rows.by_id.clone(),
            next_id: rows.next_id,
        };
        let saved = entities
            .into_iter()
            .map(|user| staged.save(user))
            .collect::<RepoResult<Vec<_>>>()?;

        *rows = staged;
        Ok(saved)
    }

    async fn delete_by_id(&self, id: i32) -> RepoResult<bool> {
        Ok(self.rows.write().await.by_id.remove(&id).is_some())
    }

    async fn delete_all(&self) -> RepoResult<u64> {
        let mut rows = self.rows.write().await;
        let removed = rows.by_id.len() as u64;
        rows.by_id.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn alice() -> User {
        User::new("alice", "alice@example.com")
    }

    fn bob() -> User {
        User::new("bob", "bob@example.com")
    }

    #[tokio::test]
    async fn saved_with_key_7_is_found_by_7() {
        let repo = MemoryUserRepository::new();
        let saved = repo.save(alice().with_id(7)).await.unwrap();

        assert_eq!(saved.id, Some(7));
        assert_eq!(repo.find_by_id(7).await.unwrap(), Some(saved));
        assert_eq!(repo.find_by_id(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleted_key_is_gone() {
        let repo = MemoryUserRepository::new();
        repo.save(alice().with_id(7)).await.unwrap();

        assert!(repo.delete_by_id(7).await.unwrap());
        assert_eq!(repo.find_by_id(7).await.unwrap(), None);
        assert!(!repo.delete_by_id(7).await.unwrap());
    }

    #[tokio::test]
    async fn generated_keys_skip_explicit_ones() {
        let repo = MemoryUserRepository::new();
        repo.save(alice().with_id(1)).await.unwrap();
        repo.save(bob().with_id(2)).await.unwrap();

        let carol = repo
            .save(User::new("carol", "carol@example.com"))
            .await
            .unwrap();
        assert_eq!(carol.id, Some(3));
    }

    #[tokio::test]
    async fn generated_keys_stop_at_the_end_of_the_key_space() {
        let repo = MemoryUserRepository::new();
        repo.save(alice().with_id(i32::MAX)).await.unwrap();

        let err = repo.save(bob()).await.unwrap_err();

        assert!(matches!(err, RepoError::KeysExhausted));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn non_positive_keys_are_refused() {
        let repo = MemoryUserRepository::new();

        for id in [0, -1, i32::MIN] {
            let err = repo.save(alice().with_id(id)).await.unwrap_err();
            assert!(matches!(err, RepoError::InvalidKey(key) if key == i64::from(id)));
        }
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_never_replaces() {
        let repo = MemoryUserRepository::new();
        let first = repo.insert(alice().with_id(7)).await.unwrap();

        let err = repo.insert(bob().with_id(7)).await.unwrap_err();

        assert!(matches!(err, RepoError::Conflict { constraint } if constraint == USER_KEY_CONSTRAINT));
        assert_eq!(repo.find_by_id(7).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn concurrent_inserts_on_one_key_keep_exactly_one() {
        let repo = Arc::new(MemoryUserRepository::new());

        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.insert(User::new(format!("user{n}"), format!("user{n}@example.com")).with_id(7))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, RepoError::Conflict { .. })),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn saving_an_existing_key_replaces_it() {
        let repo = MemoryUserRepository::new();
        let saved = repo.save(alice()).await.unwrap();
        let id = saved.id.unwrap();

        repo.save(saved.with_full_name("Alice A.")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.full_name.as_deref(), Some("Alice A."));
    }

    #[tokio::test]
    async fn duplicate_user_name_conflicts() {
        let repo = MemoryUserRepository::new();
        repo.save(alice()).await.unwrap();

        let err = repo
            .save(User::new("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict { constraint } if constraint == USER_NAME_CONSTRAINT));
    }

    #[tokio::test]
    async fn save_all_is_all_or_nothing() {
        let repo = MemoryUserRepository::new();
        let err = repo
            .save_all(vec![alice(), bob(), User::new("alice", "again@example.com")])
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::Conflict { .. }));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn listing_is_ordered_by_key() {
        let repo = MemoryUserRepository::new();
        repo.save(bob().with_id(5)).await.unwrap();
        repo.save(alice().with_id(2)).await.unwrap();

        let ids: Vec<_> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![Some(2), Some(5)]);

        let page = repo.find_page(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, Some(5));

        let some = repo.find_all_by_id(&[5, 42]).await.unwrap();
        assert_eq!(some.len(), 1);
        assert!(repo.exists_by_id(2).await.unwrap());
    }
}
