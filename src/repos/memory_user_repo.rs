//! In-memory `UserStore` used by unit and router tests.
//!
//! Mirrors the PostgreSQL backend's semantics: unique names, empty refresh never matches,
//! `set_refresh` on an unknown id is NotFound.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::user_repo::{UserRow, UserStore};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<UserRow>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i32) -> Option<UserRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == user_id)
            .cloned()
    }

    pub fn set_roles(&self, user_id: i32, roles: &[i32]) {
        if let Some(row) = self.rows.lock().unwrap().iter_mut().find(|r| r.id == user_id) {
            row.roles = roles.to_vec();
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(
        &self,
        user_name: &str,
        password_hash: &str,
        roles: &[i32],
    ) -> RepoResult<i32> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.user_name == user_name) {
            return Err(RepoError::Conflict);
        }

        let id = rows.len() as i32 + 1;
        let now = Utc::now();
        rows.push(UserRow {
            id,
            user_name: user_name.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token: String::new(),
            roles: roles.to_vec(),
            created_at: now,
            updated_at: now,
        });

        Ok(id)
    }

    async fn find_by_name(&self, user_name: &str) -> RepoResult<UserRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_name == user_name)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_refresh(&self, refresh_token: &str) -> RepoResult<UserRow> {
        if refresh_token.is_empty() {
            return Err(RepoError::NotFound);
        }

        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.refresh_token == refresh_token)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn set_refresh(&self, user_id: i32, refresh_token: &str) -> RepoResult<i32> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == user_id)
            .ok_or(RepoError::NotFound)?;

        row.refresh_token = refresh_token.to_string();
        row.updated_at = Utc::now();

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_refresh_never_matches_a_fresh_user() {
        let store = MemoryUserStore::new();
        store.insert("alice", "hash", &[1]).await.unwrap();

        let res = store.find_by_refresh("").await;
        assert!(matches!(res, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict() {
        let store = MemoryUserStore::new();
        assert_eq!(store.insert("alice", "h1", &[]).await.unwrap(), 1);

        let res = store.insert("alice", "h2", &[]).await;
        assert!(matches!(res, Err(RepoError::Conflict)));
    }

    #[tokio::test]
    async fn set_refresh_binds_and_revokes() {
        let store = MemoryUserStore::new();
        let id = store.insert("alice", "hash", &[2]).await.unwrap();

        store.set_refresh(id, "tok").await.unwrap();
        assert_eq!(store.find_by_refresh("tok").await.unwrap().id, id);

        store.set_refresh(id, "").await.unwrap();
        assert!(matches!(
            store.find_by_refresh("tok").await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn set_refresh_unknown_user_is_not_found() {
        let store = MemoryUserStore::new();
        assert!(matches!(
            store.set_refresh(42, "tok").await,
            Err(RepoError::NotFound)
        ));
    }
}
