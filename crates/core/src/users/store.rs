//! Persistence capability consumed by the identity manager.

use uuid::Uuid;

use super::model::{Group, User};
use crate::errors::DatabaseError;

/// Filters for listing users. Results are ordered by email.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Substring matched against email, first and last name. ASCII letters
    /// match in any case, other characters as typed.
    pub search: Option<String>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Storage for user records and their group memberships.
pub trait UserStore {
    fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    /// Overwrite every column of an existing record.
    fn update_user(&self, user: &User) -> Result<(), DatabaseError>;

    fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError>;

    fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, DatabaseError>;

    fn count_users(&self) -> Result<i64, DatabaseError>;

    /// Groups of a user, in membership insertion order.
    fn user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, DatabaseError>;

    /// Replace all memberships of a user.
    fn set_user_groups(&self, user_id: Uuid, group_ids: &[i64]) -> Result<(), DatabaseError>;

    /// `update_user` and `set_user_groups` as one unit: an unknown group
    /// leaves both the record and its memberships untouched.
    fn update_user_with_groups(&self, user: &User, group_ids: &[i64]) -> Result<(), DatabaseError>;
}
