//! In-memory stores, used when no DATABASE_URL is configured. This is the
//! backing for local development and the integration test suite.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityStore, Report, ReportStore, Role, StoreError, User};
use crate::config::SeedConfig;

#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<Vec<User>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the initial admin account from config. Skipped when the seed
    /// password is empty (staging/production presets).
    pub fn with_seed_admin(seed: &SeedConfig) -> Result<Self, bcrypt::BcryptError> {
        if seed.admin_password.is_empty() {
            tracing::warn!("seed admin password is empty, starting with no accounts");
            return Ok(Self::new());
        }

        let password_hash = bcrypt::hash(&seed.admin_password, bcrypt::DEFAULT_COST)?;
        let admin = User {
            id: Uuid::new_v4(),
            username: seed.admin_username.clone(),
            name: seed.admin_name.clone(),
            role: Role::Admin,
            password_hash,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tracing::info!("seeded admin account '{}'", admin.username);
        Ok(Self {
            users: RwLock::new(vec![admin]),
        })
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.deleted_at.is_none())
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| u.deleted_at.is_none()).cloned().collect())
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.username == user.username && u.deleted_at.is_none())
        {
            return Err(StoreError::DuplicateUsername);
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        user.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn list(&self, author: Option<Uuid>) -> Result<Vec<Report>, StoreError> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .filter(|r| author.map_or(true, |a| r.author_id == a))
            .cloned()
            .collect())
    }

    async fn create(&self, report: Report) -> Result<Report, StoreError> {
        let mut reports = self.reports.write().await;
        reports.push(report.clone());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(username: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            name: username.to_string(),
            role,
            password_hash: "x".to_string(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn soft_deleted_user_no_longer_resolves() {
        let store = MemoryIdentityStore::new();
        let user = store.create(test_user("u1", Role::User)).await.unwrap();

        assert!(store.find_by_id(user.id).await.unwrap().is_some());
        store.soft_delete(user.id).await.unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert!(store.find_by_username("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = MemoryIdentityStore::new();
        store.create(test_user("u1", Role::User)).await.unwrap();

        match store.create(test_user("u1", Role::Admin)).await {
            Err(StoreError::DuplicateUsername) => {}
            other => panic!("expected DuplicateUsername, got {:?}", other.map(|u| u.username)),
        }
    }

    #[tokio::test]
    async fn username_freed_after_soft_delete() {
        let store = MemoryIdentityStore::new();
        let user = store.create(test_user("u1", Role::User)).await.unwrap();
        store.soft_delete(user.id).await.unwrap();

        assert!(store.create(test_user("u1", Role::User)).await.is_ok());
    }

    #[tokio::test]
    async fn report_listing_filters_by_author() {
        let store = MemoryReportStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for (author, title) in [(a, "morning count"), (b, "closing shift")] {
            store
                .create(Report {
                    id: Uuid::new_v4(),
                    author_id: author,
                    title: title.to_string(),
                    body: String::new(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.list(None).await.unwrap().len(), 2);
        let mine = store.list(Some(a)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "morning count");
    }
}
