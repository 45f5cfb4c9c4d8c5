// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared_types::{RoleName, UserInfo};
use uuid::Uuid;

use crate::error::StoreError;

/// Database representation of roles
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String, // "PARENT" | "CHILD"
    pub description: String,
}

/// Database representation of users
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub google_id: String,
    pub email: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub role_id: Uuid,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for new users
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUserRow<'a> {
    pub google_id: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub picture_url: Option<&'a str>,
    pub role_id: Uuid,
    pub last_login: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub name: RoleName,
    pub description: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = StoreError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let name = row
            .name
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("role {}: {}", row.id, e)))?;
        Ok(Role {
            id: row.id,
            name,
            description: row.description,
        })
    }
}

/// A user together with its resolved role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub google_id: String,
    pub email: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub role: Role,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_rows(user: UserRow, role: RoleRow) -> Result<Self, StoreError> {
        Ok(User {
            id: user.id,
            google_id: user.google_id,
            email: user.email,
            display_name: user.display_name,
            picture_url: user.picture_url,
            role: role.try_into()?,
            last_login: user.last_login,
            created_at: user.created_at,
        })
    }

    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            email: self.email.clone(),
            name: self.display_name.clone(),
            picture_url: self.picture_url.clone(),
            role: self.role.name,
        }
    }
}

/// Input for creating a user on first login
#[derive(Debug, Clone)]
pub struct NewUser {
    pub google_id: String,
    pub email: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub role_id: Uuid,
    pub last_login: DateTime<Utc>,
}

/// Profile fields refreshed on every login
#[derive(Debug, Clone)]
pub struct LoginUpdate {
    pub display_name: String,
    pub picture_url: Option<String>,
    pub last_login: DateTime<Utc>,
}
