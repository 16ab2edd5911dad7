//! User records kept as a JSON document collection.
//!
//! ## Storage format
//!
//! The collection is a single pretty-printed JSON array in `<data_dir>/users.json`:
//!
//! ```json
//! [
//!   {
//!     "_id": "6f1c…",
//!     "first_name": "Ana",
//!     "last_name": "Gómez",
//!     "email": "ana@example.com",
//!     "age": 31,
//!     "password": "secreto"
//!   }
//! ]
//! ```
//!
//! A missing file is an empty collection. Every insert rewrites the file through a
//! temporary sibling and a rename so readers never observe a half-written array.
//!
//! **Security:** passwords are stored exactly as submitted. Treat the file as a secret.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub const USERS_FILE: &str = "users.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: Option<u32>,
    pub password: String,
}

impl User {
    /// Exact match against the stored plaintext password.
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

/// Fields submitted at registration, stored without transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    pub password: String,
}

/// Accepts a number, a numeric string, or anything else as no age at all.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAge {
        Number(u64),
        Text(String),
        Other(IgnoredAny),
    }

    let age = match Option::<RawAge>::deserialize(deserializer)? {
        Some(RawAge::Number(n)) => u32::try_from(n).ok(),
        Some(RawAge::Text(text)) => text.trim().parse().ok(),
        Some(RawAge::Other(_)) | None => None,
    };
    Ok(age)
}

impl NewUser {
    fn into_user(self) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            age: self.age,
            password: self.password,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with email {email} already exists")]
    Conflict { email: String },
    #[error("failed to read users file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid users file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to write users file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode users collection: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts the user unless one with the same email exists, in which case
    /// `StoreError::Conflict` is returned and the collection is left untouched.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
}

#[derive(Debug)]
pub struct DocumentStore {
    users: RwLock<Vec<User>>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open the collection stored under `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join(USERS_FILE);
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|source| StoreError::Write {
                path: data_dir.display().to_string(),
                source,
            })?;

        let users = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            users: RwLock::new(users),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, users: &[User]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_vec_pretty(users).map_err(StoreError::Encode)?;
        let tmp = path.with_extension("json.tmp");
        let write_err = |source| StoreError::Write {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::write(&tmp, content).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(write_err)
    }
}

#[async_trait]
impl UserStore for DocumentStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().await.clone())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict { email: user.email });
        }

        let user = user.into_user();
        users.push(user.clone());
        if let Err(err) = self.persist(&users).await {
            users.pop();
            return Err(err);
        }

        debug!(id = %user.id, total = users.len(), "user inserted");
        Ok(user)
    }
}
