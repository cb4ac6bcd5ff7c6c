use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use tokio::sync::Mutex;

use super::RecordStore;
use crate::config::App;
use crate::error::{Result, StoreError};
use crate::id;
use crate::model::{Fields, Record};

const MEMORY: &str = ":memory:";

const MIGRATIONS_TABLE: &str = include_str!("migrations/000_migrations_table.sql");

const MIGRATIONS: &[(&str, &str)] = &[("001_documents.sql", include_str!("migrations/001_documents.sql"))];

/// Document database backed by libsql. Every collection lives in the
/// `documents` table, tagged by its name, with the client fields kept as a
/// JSON body.
pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    write_lock: Mutex<()>,
    replica: bool,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub async fn new(cfg: &App, data_dir: &Path) -> AnyResult<Arc<Self>> {
        let db = match cfg.remote() {
            Some((url, token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let path = data_dir.join(cfg.get_db());
                Builder::new_synced_database(&path, url.to_string(), token.to_string())
                    .sync_interval(Duration::from_secs(cfg.sync_interval_seconds))
                    .build()
                    .await?
            }
            None if cfg.get_db() == MEMORY => Builder::new_local(MEMORY).build().await?,
            None => Builder::new_local(data_dir.join(cfg.get_db())).build().await?,
        };

        Self::from_libsql(db, cfg.remote().is_some()).await
    }

    pub async fn in_memory() -> AnyResult<Arc<Self>> {
        let db = Builder::new_local(MEMORY).build().await?;
        Self::from_libsql(db, false).await
    }

    async fn from_libsql(db: LibsqlDatabase, replica: bool) -> AnyResult<Arc<Self>> {
        let database = Database {
            conn: db.connect()?,
            db,
            write_lock: Mutex::new(()),
            replica,
        };
        database.sync().await?;

        let conn = &database.conn;
        conn.query("SELECT 1", ()).await?;

        Self::migrate(conn).await?;

        Ok(Arc::new(database))
    }

    pub async fn sync(&self) -> AnyResult<()> {
        if self.replica {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    pub fn collection(self: &Arc<Self>, name: &str) -> DbCollection {
        DbCollection {
            db: Arc::clone(self),
            name: name.to_string(),
        }
    }

    /// Applies every entry of `MIGRATIONS` not yet listed in `_migrations`,
    /// in order.
    async fn migrate(conn: &Connection) -> AnyResult<()> {
        conn.execute_batch(MIGRATIONS_TABLE).await?;

        for (name, sql) in MIGRATIONS {
            let mut applied = conn
                .query("SELECT 1 FROM _migrations WHERE name = ?", libsql::params![*name])
                .await?;
            if applied.next().await?.is_some() {
                tracing::debug!(migration = name, "already applied");
                continue;
            }

            tracing::info!(migration = name, "applying migration");
            conn.execute_batch(sql)
                .await
                .map_err(|e| anyhow::anyhow!("migration {name} failed: {e}"))?;
            conn.execute(
                "INSERT INTO _migrations (name, applied_at) VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                libsql::params![*name],
            )
            .await?;
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct DbCollection {
    db: Arc<Database>,
    name: String,
}

impl DbCollection {
    fn conn(&self) -> &Connection {
        self.db.connection()
    }

    fn row_to_record(row: &libsql::Row) -> Result<Record> {
        let id: String = row.get(0)?;
        let body: String = row.get(1)?;
        Ok(Record {
            id,
            fields: serde_json::from_str(&body)?,
        })
    }

    async fn find(&self, id: &str) -> Result<Option<Record>> {
        let query = "SELECT id, body FROM documents WHERE collection = ? AND id = ?";
        let mut rows = self
            .conn()
            .query(query, libsql::params![self.name.as_str(), id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Read-merge-write. Callers must hold the write lock.
    async fn merge_locked(&self, id: &str, fields: Fields) -> Result<Record> {
        let record = self
            .find(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .merged(fields);

        let body = serde_json::to_string(&record.fields)?;
        let query = "UPDATE documents SET body = ? WHERE collection = ? AND id = ?";
        let changed = self
            .conn()
            .execute(query, libsql::params![body, self.name.as_str(), id])
            .await?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok(record)
    }
}

#[async_trait]
impl RecordStore for DbCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<Vec<Record>> {
        let query = "SELECT id, body FROM documents WHERE collection = ? ORDER BY seq";
        let mut rows = self
            .conn()
            .query(query, libsql::params![self.name.as_str()])
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Record> {
        self.find(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, fields: Fields) -> Result<Record> {
        let record = Record::new(id::generate(), fields);
        let body = serde_json::to_string(&record.fields)?;

        let query = "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)";
        self.conn()
            .execute(
                query,
                libsql::params![self.name.as_str(), record.id.as_str(), body],
            )
            .await?;

        Ok(record)
    }

    async fn replace_merge(&self, id: &str, fields: Fields) -> Result<Vec<Record>> {
        let _guard = self.db.write_lock.lock().await;
        self.merge_locked(id, fields).await?;
        self.list().await
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<Record> {
        let _guard = self.db.write_lock.lock().await;
        self.merge_locked(id, fields).await
    }

    async fn delete(&self, id: &str) -> Result<Record> {
        let _guard = self.db.write_lock.lock().await;
        let query = "DELETE FROM documents WHERE collection = ? AND id = ? RETURNING id, body";
        let mut rows = self
            .conn()
            .query(query, libsql::params![self.name.as_str(), id])
            .await?;

        match rows.next().await? {
            Some(row) => Self::row_to_record(&row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
