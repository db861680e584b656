//! Staff and member accounts used for login.
//!
//! The studio's relational store owns the real account table; it plugs in by
//! implementing [`AccountDirectory`]. [`MemoryAccountDirectory`] backs local
//! development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::security::Identity;
use crate::security::crypto::{self, CryptoError};
use crate::security::validation::{is_valid_email, sanitize_email, sanitize_input};

/// Role given to self-registered accounts. Staff roles are assigned in the studio store.
pub const DEFAULT_ROLE_ID: &str = "member";
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("account store unavailable: {0}")]
    Storage(String),
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            role_id: self.role_id.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Registration input as received from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl NewAccount {
    /// Normalizes the email and name, rejecting anything that does not validate.
    pub fn normalized(self) -> Result<Self, AccountError> {
        let email = sanitize_email(&self.email);
        if !is_valid_email(&email) {
            return Err(AccountError::InvalidInput("Invalid email address".to_string()));
        }

        let full_name = sanitize_input(&self.full_name);
        if full_name.is_empty() {
            return Err(AccountError::InvalidInput("Full name is required".to_string()));
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AccountError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        Ok(Self {
            email,
            password: self.password,
            full_name,
        })
    }

    /// Hashes the password. Blocking: bcrypt at cost 12 takes a few hundred milliseconds.
    pub fn into_account(self) -> Result<Account, AccountError> {
        Ok(Account {
            id: crypto::generate_uuid().to_string(),
            email: self.email,
            password_hash: crypto::hash_password(&self.password)?,
            role_id: DEFAULT_ROLE_ID.to_string(),
            full_name: self.full_name,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Stores a new account; emails are unique.
    async fn insert(&self, account: Account) -> Result<Account, AccountError>;

    /// Looks up by already-normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    async fn count(&self) -> Result<usize, AccountError>;
}

#[derive(Debug, Default)]
pub struct MemoryAccountDirectory {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn insert(&self, account: Account) -> Result<Account, AccountError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(AccountError::DuplicateEmail);
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn count(&self) -> Result<usize, AccountError> {
        Ok(self.accounts.read().await.len())
    }
}
