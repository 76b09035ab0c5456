use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

mod drafts;

pub use drafts::{DraftStore, MalformedPersistedState};

/// Named text records kept on the local device.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load_record(&self, name: &str) -> Result<Option<String>>;
    async fn save_record(&self, name: &str, payload: &str) -> Result<()>;
    async fn delete_record(&self, name: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if is_in_memory(database_url) {
            // Every connection to an in-memory database sees its own empty schema.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_record_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM local_records ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("failed to list local records")?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("name").map_err(anyhow::Error::from))
            .collect()
    }
}

#[async_trait]
impl RecordStore for Storage {
    async fn load_record(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT payload FROM local_records WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load local record '{name}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn save_record(&self, name: &str, payload: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO local_records (name, payload, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET payload = excluded.payload, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(name)
        .bind(payload)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save local record '{name}'"))?;
        Ok(())
    }

    async fn delete_record(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM local_records WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete local record '{name}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
