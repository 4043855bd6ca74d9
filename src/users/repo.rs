use serde::Serialize;
use sqlx::{error::ErrorKind, FromRow, SqlitePool};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::users::dto::NewUser;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub email: String,
    pub forename: Option<String>,
    pub surname: Option<String>,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{field} must be unique")]
    UniqueViolation { field: String },

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl RepoError {
    fn classify(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.kind() == ErrorKind::UniqueViolation {
                let field = violated_column(db.message());
                debug!(%field, "unique constraint violated");
                return RepoError::UniqueViolation { field };
            }
        }
        RepoError::Storage(e)
    }
}

/// SQLite reports `UNIQUE constraint failed: users.email`; keep the column name.
fn violated_column(message: &str) -> String {
    let target = message.rsplit(": ").next().unwrap_or(message);
    target
        .rsplit('.')
        .next()
        .unwrap_or(target)
        .trim()
        .to_string()
}

impl User {
    #[instrument(skip(db))]
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, created, email, forename, surname
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    #[instrument(skip(db))]
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, created, email, forename, surname
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Inserts a new row. The store assigns the id.
    #[instrument(skip(db, new_user), fields(email = %new_user.email))]
    pub async fn insert(db: &SqlitePool, new_user: &NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (created, email, forename, surname)
            VALUES (?, ?, ?, ?)
            RETURNING id, created, email, forename, surname
            "#,
        )
        .bind(new_user.created)
        .bind(&new_user.email)
        .bind(&new_user.forename)
        .bind(&new_user.surname)
        .fetch_one(db)
        .await
        .map_err(RepoError::classify)
    }

    /// Writes the mutable fields back. `None` if the row is gone.
    #[instrument(skip(self, db), fields(id = self.id))]
    pub async fn save(&self, db: &SqlitePool) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET forename = ?, surname = ?
            WHERE id = ?
            RETURNING id, created, email, forename, surname
            "#,
        )
        .bind(&self.forename)
        .bind(&self.surname)
        .bind(self.id)
        .fetch_optional(db)
        .await
        .map_err(RepoError::classify)
    }

    #[instrument(skip(self, db), fields(id = self.id))]
    pub async fn delete(self, db: &SqlitePool) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(self.id)
            .execute(db)
            .await?;
        Ok(())
    }
}
