/*
 * Responsibility
 * - ユーザー (アカウント) の読み込み: username → UserRecord
 * - account ファイル (app/accounts/<username>.json) と Postgres の 2 実装
 * - 見つからない場合は Ok(None)、I/O / DB エラーは RepoError
 */
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;

/// Stored identity: username, password hash and free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    username: String,
    #[serde(default)]
    password: String,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password_hash.into(),
            attributes: Map::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Stored password hash (hex SHA-256). Empty means the account cannot log in.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load_user(&self, username: &str) -> RepoResult<Option<UserRecord>>;
}

/// One JSON file per account, named after the lower-cased username.
#[derive(Debug, Clone)]
pub struct FileUserStore {
    dir: PathBuf,
}

impl FileUserStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn load_user(&self, username: &str) -> RepoResult<Option<UserRecord>> {
        let name = username.to_lowercase();
        if !is_safe_file_name(&name) {
            return Ok(None);
        }

        let path = self.dir.join(format!("{name}.json"));
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    username: String,
    password: Option<String>,
}

/// Accounts table lookup (`accounts(username, password)`).
#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn load_user(&self, username: &str) -> RepoResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT username, password
            FROM accounts
            WHERE lower(username) = lower($1)
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| UserRecord::new(r.username, r.password.unwrap_or_default())))
    }
}
