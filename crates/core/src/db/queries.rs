//! Typed query helpers for the SiteKit tables.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::Database;
use crate::errors::DatabaseError;
use crate::users::{Group, User, UserQuery, UserStore};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, is_staff, \
                            is_superuser, is_active, date_joined, last_login";

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn get_opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        is_staff: row.get(5)?,
        is_superuser: row.get(6)?,
        is_active: row.get(7)?,
        date_joined: get_datetime(row, 8)?,
        last_login: get_opt_datetime(row, 9)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
///
/// The term keeps its case: SQLite's `LIKE` folds ASCII letters itself and
/// compares everything else as typed.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

impl Database {
    /// Create a group and return it with its assigned id.
    pub fn create_group(&self, name: &str) -> Result<Group, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO auth_groups (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, name, "inserted group");
        Ok(Group {
            id,
            name: name.to_string(),
        })
    }

    /// All groups ordered by name.
    pub fn list_groups(&self) -> Result<Vec<Group>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM auth_groups ORDER BY name")?;
        let groups = stmt
            .query_map([], group_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    pub fn get_group(&self, id: i64) -> Result<Option<Group>, DatabaseError> {
        let conn = self.conn();
        let group = conn
            .query_row(
                "SELECT id, name FROM auth_groups WHERE id = ?1",
                params![id],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, DatabaseError> {
        let conn = self.conn();
        let group = conn
            .query_row(
                "SELECT id, name FROM auth_groups WHERE name = ?1",
                params![name],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    pub fn delete_group(&self, id: i64) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM auth_groups WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "group".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Add a membership; adding an existing membership is a no-op.
    pub fn add_user_to_group(&self, user_id: Uuid, group_id: i64) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?1, ?2)",
            params![user_id.to_string(), group_id],
        )?;
        Ok(())
    }

    pub fn remove_user_from_group(&self, user_id: Uuid, group_id: i64) -> Result<(), DatabaseError> {
        self.conn().execute(
            "DELETE FROM user_groups WHERE user_id = ?1 AND group_id = ?2",
            params![user_id.to_string(), group_id],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

impl UserStore for Database {
    fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn().execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                USER_COLUMNS
            ),
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.is_staff,
                user.is_superuser,
                user.is_active,
                user.date_joined.to_rfc3339(),
                user.last_login.map(|t| t.to_rfc3339()),
            ],
        )?;
        debug!(user_id = %user.id, "inserted user row");
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        update_user_row(&self.conn(), user)
    }

    fn delete_user(&self, id: Uuid) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "user".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, DatabaseError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
            values.push(like_pattern(term.trim()).into());
            let n = values.len();
            clauses.push(format!(
                "(email LIKE ?{n} ESCAPE '\\' \
                  OR coalesce(first_name, '') LIKE ?{n} ESCAPE '\\' \
                  OR coalesce(last_name, '') LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if let Some(flag) = query.is_superuser {
            values.push((flag as i64).into());
            clauses.push(format!("is_superuser = ?{}", values.len()));
        }
        if let Some(flag) = query.is_active {
            values.push((flag as i64).into());
            clauses.push(format!("is_active = ?{}", values.len()));
        }

        let mut sql = format!("SELECT {} FROM users", USER_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY email");

        values.push(query.limit.map(i64::from).unwrap_or(-1).into());
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
        values.push(i64::from(query.offset.unwrap_or(0)).into());
        sql.push_str(&format!(" OFFSET ?{}", values.len()));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(values.iter()), user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn count_users(&self) -> Result<i64, DatabaseError> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT g.id, g.name FROM auth_groups g
             JOIN user_groups ug ON ug.group_id = g.id
             WHERE ug.user_id = ?1
             ORDER BY ug.id",
        )?;
        let groups = stmt
            .query_map(params![user_id.to_string()], group_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn set_user_groups(&self, user_id: Uuid, group_ids: &[i64]) -> Result<(), DatabaseError> {
        self.transaction(|conn| replace_memberships(conn, user_id, group_ids))
    }

    fn update_user_with_groups(&self, user: &User, group_ids: &[i64]) -> Result<(), DatabaseError> {
        self.transaction(|conn| {
            update_user_row(conn, user)?;
            replace_memberships(conn, user.id, group_ids)
        })
    }
}

fn update_user_row(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE users SET email = ?2, password_hash = ?3, first_name = ?4, last_name = ?5,
                is_staff = ?6, is_superuser = ?7, is_active = ?8, date_joined = ?9,
                last_login = ?10
         WHERE id = ?1",
        params![
            user.id.to_string(),
            user.email,
            user.password_hash,
            user.first_name,
            user.last_name,
            user.is_staff,
            user.is_superuser,
            user.is_active,
            user.date_joined.to_rfc3339(),
            user.last_login.map(|t| t.to_rfc3339()),
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity: "user".into(),
            id: user.id.to_string(),
        });
    }
    Ok(())
}

/// Replace every membership of `user_id`. Fails with `NotFound` on the
/// first unknown group; callers run this inside a transaction.
fn replace_memberships(conn: &Connection, user_id: Uuid, group_ids: &[i64]) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM user_groups WHERE user_id = ?1",
        params![user_id.to_string()],
    )?;
    for group_id in group_ids {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM auth_groups WHERE id = ?1)",
            params![group_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DatabaseError::NotFound {
                entity: "group".into(),
                id: group_id.to_string(),
            });
        }
        conn.execute(
            "INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?1, ?2)",
            params![user_id.to_string(), group_id],
        )?;
    }
    Ok(())
}
