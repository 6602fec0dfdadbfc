use async_trait::async_trait;

use crate::models::{NewUserRecord, User, UserRecord};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    /// Unique constraint on `users.email` was hit.
    #[error("conflict")] Conflict,
    #[error("internal error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Returns at most one row; emails are unique.
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>>;
    async fn insert(&self, new: NewUserRecord) -> RepoResult<User>;
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use crate::models::Id;

    #[derive(Default)]
    struct State {
        users: HashMap<Id, UserRecord>,
        next_id: Id,
    }

    /// Process-local user table. Used by tests and for running without Postgres.
    #[derive(Clone, Default)]
    pub struct InMemUserRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemUserRepo {
        pub fn new() -> Self { Self::default() }

        pub fn len(&self) -> usize {
            self.state.read().map(|s| s.users.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool { self.len() == 0 }
    }

    fn poisoned<T>(_: T) -> RepoError { RepoError::Internal("user table lock poisoned".into()) }

    #[async_trait]
    impl UserRepo for InMemUserRepo {
        async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
            let s = self.state.read().map_err(poisoned)?;
            Ok(s.users.values().find(|u| u.email == email).cloned())
        }

        async fn insert(&self, new: NewUserRecord) -> RepoResult<User> {
            let mut s = self.state.write().map_err(poisoned)?;
            if s.users.values().any(|u| u.email == new.email) {
                return Err(RepoError::Conflict);
            }
            s.next_id += 1;
            let now = Utc::now();
            let record = UserRecord {
                id: s.next_id,
                name: new.name,
                email: new.email,
                password_hash: new.password_hash,
                role: new.role,
                created_at: now,
                updated_at: now,
            };
            s.users.insert(record.id, record.clone());
            Ok(record.into())
        }
    }
}

#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::{PgPool, Postgres, Pool};
    use std::time::Duration;

    use crate::auth::Role;
    use crate::models::Id;

    const UNIQUE_VIOLATION: &str = "23505";

    #[derive(sqlx::FromRow)]
    struct UserRow {
        id: Id,
        name: String,
        email: String,
        password: String,
        role: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl From<UserRow> for UserRecord {
        fn from(r: UserRow) -> Self {
            UserRecord {
                id: r.id,
                name: r.name,
                email: r.email,
                password_hash: r.password,
                role: Role::from_db(&r.role),
                created_at: r.created_at,
                updated_at: r.updated_at,
            }
        }
    }

    #[derive(Clone)]
    pub struct PgUserRepo { pool: Pool<Postgres> }

    impl PgUserRepo {
        pub fn new(pool: PgPool) -> Self { Self { pool } }

        /// Opens a pool against `url` and brings the schema up to date. A
        /// database that cannot be migrated is a startup error.
        pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::migrate::MigrateError> {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect_lazy(url)?;
            let repo = Self::new(pool);
            repo.migrate().await?;
            Ok(repo)
        }

        /// Applies the bundled `migrations/` to the connected database.
        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }
    }

    fn map_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => RepoError::Conflict,
            _ => RepoError::Internal(e.to_string()),
        }
    }

    #[async_trait]
    impl UserRepo for PgUserRepo {
        async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT id, name, email, password, role, created_at, updated_at FROM users WHERE email = $1 LIMIT 1",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
            Ok(row.map(UserRecord::from))
        }

        async fn insert(&self, new: NewUserRecord) -> RepoResult<User> {
            let row = sqlx::query_as::<_, UserRow>(
                "INSERT INTO users (name, email, password, role) VALUES ($1, $2, $3, $4) \
                 RETURNING id, name, email, password, role, created_at, updated_at",
            )
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
            Ok(UserRecord::from(row).into())
        }
    }
}
