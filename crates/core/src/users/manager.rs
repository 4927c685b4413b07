//! Validated constructors and lifecycle flows for user records.
//!
//! [`UserManager`] is the only way records should enter the store: both
//! [`create_user`](UserManager::create_user) and
//! [`create_superuser`](UserManager::create_superuser) funnel through the
//! same validation, and every write goes through [`save`](UserManager::save)
//! so the default-name derivation always runs.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::email::{normalize_email, validate_email};
use super::model::User;
use super::password::{unusable_password, PasswordHasher};
use super::store::UserStore;
use crate::errors::{DatabaseError, UserError, ValidationError};

/// Optional field overrides for the constructors.
///
/// `None` means "not passed"; for the capability flags this is distinct
/// from an explicit `Some(false)`.
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
    pub date_joined: Option<DateTime<Utc>>,
}

impl ExtraFields {
    fn apply(self, user: &mut User) {
        if let Some(first_name) = self.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(is_staff) = self.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_superuser) = self.is_superuser {
            user.is_superuser = is_superuser;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(date_joined) = self.date_joined {
            user.date_joined = date_joined;
        }
    }
}

/// Identity manager over a [`UserStore`] and a [`PasswordHasher`].
pub struct UserManager<'a, S: UserStore + ?Sized> {
    store: &'a S,
    hasher: &'a dyn PasswordHasher,
}

impl<'a, S: UserStore + ?Sized> UserManager<'a, S> {
    pub fn new(store: &'a S, hasher: &'a dyn PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Create and persist a regular user.
    ///
    /// The email is normalized before validation; a `None` password stores
    /// an unusable hash.
    pub fn create_user(
        &self,
        email: &str,
        password: Option<&str>,
        extra: ExtraFields,
    ) -> Result<User, UserError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        let email = normalize_email(email);
        validate_email(&email)?;

        if self.store.get_user_by_email(&email)?.is_some() {
            return Err(ValidationError::DuplicateEmail(email).into());
        }

        let mut user = User::new(email);
        extra.apply(&mut user);
        self.set_password(&mut user, password)?;

        user.derive_default_names();
        self.store
            .insert_user(&user)
            .map_err(|e| map_unique(e, &user.email))?;

        info!(
            user_id = %user.id,
            is_staff = user.is_staff,
            is_superuser = user.is_superuser,
            "user created"
        );
        Ok(user)
    }

    /// Create and persist a superuser.
    ///
    /// `is_staff`, `is_superuser` and `is_active` default to `true`; an
    /// explicit `false` for either of the first two is rejected.
    pub fn create_superuser(
        &self,
        email: &str,
        password: Option<&str>,
        mut extra: ExtraFields,
    ) -> Result<User, UserError> {
        if !*extra.is_staff.get_or_insert(true) {
            return Err(ValidationError::SuperuserNotStaff.into());
        }
        if !*extra.is_superuser.get_or_insert(true) {
            return Err(ValidationError::SuperuserFlagUnset.into());
        }
        extra.is_active.get_or_insert(true);

        self.create_user(email, password, extra)
    }

    /// Persist changes to an existing record, deriving empty names first.
    pub fn save(&self, user: &mut User) -> Result<(), UserError> {
        user.derive_default_names();
        self.store
            .update_user(user)
            .map_err(|e| map_unique(e, &user.email))?;
        debug!(user_id = %user.id, "user saved");
        Ok(())
    }

    /// [`save`](Self::save) plus a membership replace, committed together.
    pub fn save_with_groups(&self, user: &mut User, group_ids: &[i64]) -> Result<(), UserError> {
        user.derive_default_names();
        self.store
            .update_user_with_groups(user, group_ids)
            .map_err(|e| map_unique(e, &user.email))?;
        debug!(user_id = %user.id, groups = group_ids.len(), "user saved with groups");
        Ok(())
    }

    /// Change the login email of a record (normalized, validated, unique).
    pub fn change_email(&self, user: &mut User, email: &str) -> Result<(), UserError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        let email = normalize_email(email);
        validate_email(&email)?;
        if let Some(existing) = self.store.get_user_by_email(&email)? {
            if existing.id != user.id {
                return Err(ValidationError::DuplicateEmail(email).into());
            }
        }
        user.email = email;
        Ok(())
    }

    /// Hash and set a password on the record (not persisted until saved).
    pub fn set_password(&self, user: &mut User, raw: Option<&str>) -> Result<(), UserError> {
        user.password_hash = match raw {
            Some(raw) => self.hasher.hash(raw)?,
            None => unusable_password(),
        };
        Ok(())
    }

    pub fn check_password(&self, user: &User, raw: &str) -> bool {
        self.hasher.verify(raw, &user.password_hash)
    }

    /// Log in by email and password.
    ///
    /// Returns `None` for unknown emails, wrong passwords and inactive
    /// accounts alike. On success `last_login` is stamped and persisted.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, UserError> {
        let email = normalize_email(email);
        let Some(mut user) = self.store.get_user_by_email(&email)? else {
            debug!("authentication failed: unknown email");
            return Ok(None);
        };
        if !self.check_password(&user, password) {
            debug!(user_id = %user.id, "authentication failed: bad password");
            return Ok(None);
        }
        if !user.is_active {
            debug!(user_id = %user.id, "authentication failed: inactive account");
            return Ok(None);
        }

        user.last_login = Some(Utc::now());
        self.save(&mut user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Some(user))
    }

    pub fn get(&self, id: Uuid) -> Result<Option<User>, UserError> {
        Ok(self.store.get_user(id)?)
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self.store.get_user_by_email(&normalize_email(email))?)
    }

    pub fn delete(&self, user: &User) -> Result<(), UserError> {
        self.store.delete_user(user.id)?;
        info!(user_id = %user.id, "user deleted");
        Ok(())
    }

    /// Names of the groups the record belongs to, in store order.
    pub fn group_names(&self, user: &User) -> Result<Vec<String>, UserError> {
        Ok(self
            .store
            .user_groups(user.id)?
            .into_iter()
            .map(|g| g.name)
            .collect())
    }

    /// Replace the record's group memberships.
    pub fn set_groups(&self, user: &User, group_ids: &[i64]) -> Result<(), UserError> {
        self.store.set_user_groups(user.id, group_ids)?;
        Ok(())
    }
}

fn map_unique(err: DatabaseError, email: &str) -> UserError {
    if err.is_unique_violation() {
        ValidationError::DuplicateEmail(email.to_string()).into()
    } else {
        err.into()
    }
}
