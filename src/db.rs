use crate::config::Config;
use crate::model::{Namespace, User};
use crate::store::UserStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use tokio::sync::Mutex;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_users.sql", include_str!("migrations/001_users.sql")),
    ("002_credentials.sql", include_str!("migrations/002_credentials.sql")),
];

pub struct Database {
    _db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        Some(s) => {
            let parsed = DateTime::parse_from_rfc3339(&s)
                .map_err(|e| anyhow::anyhow!("invalid timestamp {:?}: {}", s, e))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

impl Database {
    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        Self::open(&path).await
    }

    pub async fn open(path: &Path) -> Result<Self> {
        tracing::info!("[db] opening user store at {:?}", path);
        let db = Builder::new_local(path).build().await?;

        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        Ok(Database {
            _db: db,
            conn,
            tx_lock: Mutex::new(()),
        })
    }

    /// Registers a user in the given namespace. Used by provisioning tooling;
    /// the notification path never creates users.
    pub async fn create_user(&self, namespace: Namespace, id: &str, verify_token: &str) -> Result<User> {
        let _guard = self.tx_lock.lock().await;
        let query = format!(
            "INSERT INTO {} (id, verify_token) VALUES (?, ?)",
            namespace.users_table()
        );
        self.conn
            .execute(&query, libsql::params![id, verify_token])
            .await
            .map_err(|e| anyhow::anyhow!("failed to create user {}: {}", id, e))?;

        Ok(User::new(id, verify_token))
    }

    /// Stores (or replaces) the upstream access token for a user.
    pub async fn store_credentials(
        &self,
        namespace: Namespace,
        user_id: &str,
        access_token: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.tx_lock.lock().await;
        let query = format!(
            r#"
            INSERT INTO {} (user_id, access_token, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token = excluded.access_token,
                expires_at = excluded.expires_at,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
            namespace.credentials_table()
        );
        let expires_at = expires_at.as_ref().map(format_timestamp);
        self.conn
            .execute(&query, libsql::params![user_id, access_token, expires_at])
            .await?;
        Ok(())
    }

    /// Returns the stored access token if there is one and it has not expired at `now`.
    pub async fn get_access_token(
        &self,
        namespace: Namespace,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let query = format!(
            "SELECT access_token, expires_at FROM {} WHERE user_id = ?",
            namespace.credentials_table()
        );
        let mut rows = self.conn.query(&query, libsql::params![user_id]).await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let token: String = row.get(0)?;
        let expires_at = parse_timestamp(row.get(1)?)?;
        match expires_at {
            Some(exp) if exp <= now => {
                tracing::info!("access token for {} expired at {}", user_id, exp);
                Ok(None)
            }
            _ => Ok(Some(token)),
        }
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            verify_token: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            location_update: parse_timestamp(row.get(4)?)?,
        })
    }
}

#[async_trait]
impl UserStore for Database {
    async fn get_user(&self, namespace: Namespace, id: &str) -> Result<Option<User>> {
        let query = format!(
            r#"
            SELECT id, verify_token, latitude, longitude, location_update
            FROM {} WHERE id = ?
            "#,
            namespace.users_table()
        );
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    async fn put_user(&self, namespace: Namespace, user: &User) -> Result<()> {
        let _guard = self.tx_lock.lock().await;
        let query = format!(
            r#"
            UPDATE {}
            SET verify_token = ?, latitude = ?, longitude = ?, location_update = ?
            WHERE id = ?
            "#,
            namespace.users_table()
        );
        let location_update = user.location_update.as_ref().map(format_timestamp);
        let updated = self
            .conn
            .execute(
                &query,
                libsql::params![
                    user.verify_token.clone(),
                    user.latitude,
                    user.longitude,
                    location_update,
                    user.id.clone()
                ],
            )
            .await?;

        if updated == 0 {
            anyhow::bail!("user {} not found in {} namespace", user.id, namespace.as_str());
        }
        Ok(())
    }
}
