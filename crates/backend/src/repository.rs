//! Repository traits for roles and users.
//!
//! Services and handlers depend on these traits rather than on a database
//! connection, so the authentication flow can run against Postgres in
//! production and against an in-memory store in tests.

use async_trait::async_trait;
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::AsyncPgConnection;
use shared_types::RoleName;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::StoreError;
use crate::models::{LoginUpdate, NewUser, Role, User};

pub type StoreResult<T> = Result<T, StoreError>;

/// Reference data: the family roles.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_name(&self, name: RoleName) -> StoreResult<Option<Role>>;

    /// Create the role if it is missing. Returns `true` when a row was written.
    async fn insert_if_absent(&self, name: RoleName, description: &str) -> StoreResult<bool>;

    async fn list_all(&self) -> StoreResult<Vec<Role>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>>;

    /// Insert a new user. Must fail with `StoreError::Duplicate` when the
    /// external id is already taken.
    async fn create(&self, new: NewUser) -> StoreResult<User>;

    /// Refresh profile fields and the last-login timestamp.
    async fn record_login(&self, id: Uuid, update: LoginUpdate) -> StoreResult<User>;

    async fn list_all(&self) -> StoreResult<Vec<User>>;
}

/// Postgres-backed repositories sharing one connection pool.
#[derive(Clone)]
pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StoreResult<Object<AsyncPgConnection>> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl RoleRepository for PgRepository {
    async fn find_by_name(&self, name: RoleName) -> StoreResult<Option<Role>> {
        let mut conn = self.conn().await?;
        db::roles::find_by_name(&mut conn, name).await
    }

    async fn insert_if_absent(&self, name: RoleName, description: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        db::roles::insert_if_absent(&mut conn, name, description).await
    }

    async fn list_all(&self) -> StoreResult<Vec<Role>> {
        let mut conn = self.conn().await?;
        db::roles::list_all(&mut conn).await
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        db::users::get_by_id(&mut conn, id).await
    }

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        db::users::get_by_google_id(&mut conn, google_id).await
    }

    async fn create(&self, new: NewUser) -> StoreResult<User> {
        let mut conn = self.conn().await?;
        db::users::create(&mut conn, &new).await
    }

    async fn record_login(&self, id: Uuid, update: LoginUpdate) -> StoreResult<User> {
        let mut conn = self.conn().await?;
        db::users::record_login(&mut conn, id, &update).await
    }

    async fn list_all(&self) -> StoreResult<Vec<User>> {
        let mut conn = self.conn().await?;
        db::users::list_all(&mut conn).await
    }
}
