//! SQLite-backed sync state.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;
use tracing::warn;

use super::traits::{ContinuationStorage, StateError};
use crate::auth::{AuthError, AuthToken, AuthTokenStorage};
use crate::model::ContinuationToken;

const CONTINUATION_KEY: &str = "continuation_token";
const AUTH_TOKEN_KEY: &str = "auth_token";

/// Continuation cursor and credentials in one small key/value table.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
    token_tx: watch::Sender<AuthToken>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `path`.
    pub fn new(path: &Path) -> Result<Self, StateError> {
        let conn = Connection::open(path).map_err(|e| StateError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StateError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StateError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StateError> {
        Self::initialize_schema(&conn)?;

        let token = match Self::read_value(&conn, AUTH_TOKEN_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Ignoring unreadable stored auth token: {}", e);
                AuthToken::empty()
            }),
            None => AuthToken::empty(),
        };
        let (token_tx, _rx) = watch::channel(token);

        Ok(Self {
            conn: Mutex::new(conn),
            token_tx,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StateError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sync_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }

    fn read_value(conn: &Connection, key: &str) -> Result<Option<String>, StateError> {
        conn.query_row(
            "SELECT value FROM sync_state WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StateError::Database(e.to_string()))
    }

    fn write_value(&self, key: &str, value: &str) -> Result<(), StateError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StateError::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO sync_state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(())
    }

    fn delete_value(&self, key: &str) -> Result<(), StateError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StateError::Database(e.to_string()))?;
        conn.execute("DELETE FROM sync_state WHERE key = ?", params![key])
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(())
    }
}

impl ContinuationStorage for SqliteStateStore {
    fn load(&self) -> Result<Option<ContinuationToken>, StateError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(Self::read_value(&conn, CONTINUATION_KEY)?.map(ContinuationToken::new))
    }

    fn save(&self, token: &ContinuationToken) -> Result<(), StateError> {
        self.write_value(CONTINUATION_KEY, token.as_str())
    }

    fn reset(&self) -> Result<(), StateError> {
        self.delete_value(CONTINUATION_KEY)
    }
}

impl AuthTokenStorage for SqliteStateStore {
    fn get(&self) -> AuthToken {
        self.token_tx.borrow().clone()
    }

    fn store(&self, token: AuthToken) -> Result<(), AuthError> {
        let json =
            serde_json::to_string(&token).map_err(|e| AuthError::Storage(e.to_string()))?;
        self.token_tx.send_replace(token);
        self.write_value(AUTH_TOKEN_KEY, &json)
            .map_err(|e| AuthError::Storage(e.to_string()))
    }

    fn subscribe(&self) -> watch::Receiver<AuthToken> {
        self.token_tx.subscribe()
    }
}
