// ============================================
// File: crates/keyline-server/src/services/accounts.rs
// ============================================
//! # Account Service
//!
//! ## Creation Reason
//! Backs the CREATE / LOGIN / VERIFY / UPDATE operations carried on the
//! secure channel.
//!
//! ## Main Functionality
//! - `AccountService`: storage-agnostic account operations
//! - `InMemoryAccounts`: `DashMap`-backed implementation
//! - `AccountPolicy`: username/password rules
//!
//! ## Account Lifecycle
//! ```text
//! CREATE ──► unverified ──(LOGIN → VERIFY)──► VERIFY with key ──► verified
//!                                                                   │
//!                                               LOGIN → SUCCESS ◄───┘
//!                                                   │
//!                                                 UPDATE
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Passwords are stored as Argon2id PHC strings; cost comes from
//!   `accounts.hash_memory_kib` / `accounts.hash_iterations`
//! - Hashing runs on the connection task; keep the cost in line with
//!   expected login rates
//! - Login preconditions (LOGIN/VERIFY result codes) are enforced by the
//!   per-connection dispatcher, not here
//!
//! ## Last Modified
//! v0.1.0 - Initial account service

use std::time::Instant;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use keyline_core::protocol::{CreateResult, LoginResult, UpdateResult, VerifyResult};

use crate::config::AccountsConfig;

// ============================================
// Constants
// ============================================

/// Random bytes in a verification key (hex encoded on the wire).
const VERIFICATION_KEY_SIZE: usize = 16;

// ============================================
// AccountError
// ============================================

/// Failure of the account store itself.
///
/// Every variant is reported to the peer as ERROR(DATABASE).
#[derive(Error, Debug)]
pub enum AccountError {
    /// Storage failed or refused the operation.
    #[error("Account store error: {reason}")]
    Database {
        /// What went wrong
        reason: String,
    },
}

impl AccountError {
    /// Creates a `Database` error.
    pub fn database(reason: impl Into<String>) -> Self {
        Self::Database {
            reason: reason.into(),
        }
    }
}

/// Result type for account operations.
pub type AccountResult<T> = std::result::Result<T, AccountError>;

// ============================================
// AccountService Trait
// ============================================

/// Outcome of CREATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// Result code for the peer.
    pub result: CreateResult,
    /// Key the new account must present to VERIFY.
    pub verification_key: Option<String>,
}

impl CreateOutcome {
    fn rejected(result: CreateResult) -> Self {
        Self {
            result,
            verification_key: None,
        }
    }
}

/// Account storage and credential checks.
///
/// Implementations must be shareable across connection tasks.
pub trait AccountService: Send + Sync {
    /// Registers a new unverified account.
    ///
    /// # Errors
    /// `AccountError::Database` if the store fails.
    fn create(&self, username: &str, password: &str) -> AccountResult<CreateOutcome>;

    /// Checks credentials. Returns `VERIFY` for a correct password on an
    /// unverified account.
    ///
    /// # Errors
    /// `AccountError::Database` if the store fails.
    fn login(&self, username: &str, password: &str) -> AccountResult<LoginResult>;

    /// Marks the account verified if `key` matches.
    ///
    /// # Errors
    /// `AccountError::Database` if the store fails.
    fn verify(&self, username: &str, key: &str) -> AccountResult<VerifyResult>;

    /// Stores profile data. Only `SUCCESS`, `VERIFY` or `NO_USER`.
    ///
    /// # Errors
    /// `AccountError::Database` if the store fails.
    fn update(&self, username: &str, data: &str) -> AccountResult<UpdateResult>;
}

// ============================================
// AccountPolicy
// ============================================

/// Username and password rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPolicy {
    username_len: (usize, usize),
    password_len: (usize, usize),
}

impl AccountPolicy {
    /// Builds a policy from configuration.
    #[must_use]
    pub const fn from_config(config: &AccountsConfig) -> Self {
        Self {
            username_len: (config.username_min, config.username_max),
            password_len: (config.password_min, config.password_max),
        }
    }

    /// Checks a candidate username/password pair.
    ///
    /// Characters are checked before lengths, username before password.
    #[must_use]
    pub fn check(&self, username: &str, password: &str) -> CreateResult {
        if !username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return CreateResult::UsernameChar;
        }
        if !(self.username_len.0..=self.username_len.1).contains(&username.len()) {
            return CreateResult::UsernameLength;
        }
        if !password.bytes().all(|b| b.is_ascii_graphic()) {
            return CreateResult::PasswordChar;
        }
        if !(self.password_len.0..=self.password_len.1).contains(&password.len()) {
            return CreateResult::PasswordLength;
        }
        CreateResult::Success
    }
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self::from_config(&AccountsConfig::default())
    }
}

// ============================================
// InMemoryAccounts
// ============================================

/// Account cap used when none is given.
pub const DEFAULT_MAX_ACCOUNTS: usize = 100_000;

struct Account {
    password_hash: String,
    verification_key: Zeroizing<String>,
    verified: bool,
    data: Option<String>,
    created_at: Instant,
}

impl Account {
    fn new(password_hash: String) -> Self {
        let mut key = Zeroizing::new([0u8; VERIFICATION_KEY_SIZE]);
        OsRng.fill_bytes(&mut key[..]);

        Self {
            password_hash,
            verification_key: Zeroizing::new(hex::encode(&key[..])),
            verified: false,
            data: None,
            created_at: Instant::now(),
        }
    }
}

/// Hashes a password into an Argon2id PHC string with a fresh salt.
fn hash_password(hasher: &Argon2<'_>, password: &str) -> AccountResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::database(format!("password hashing failed: {e}")))
}

/// Checks a password against a stored PHC string.
///
/// A stored hash that does not parse is a store failure, not a mismatch.
fn verify_password(hasher: &Argon2<'_>, password: &str, stored: &str) -> AccountResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AccountError::database(format!("stored password hash unreadable: {e}")))?;
    Ok(hasher.verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Argon2id with the configured cost, or the crate defaults if the cost
/// is out of range.
fn password_hasher(config: &AccountsConfig) -> Argon2<'static> {
    let params = Params::new(
        config.hash_memory_kib,
        config.hash_iterations,
        Params::DEFAULT_P_COST,
        None,
    )
    .unwrap_or_else(|e| {
        warn!(error = %e, "Invalid password hash cost, using defaults");
        Params::default()
    });
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Process-local account store.
///
/// # Example
/// ```
/// use keyline_server::services::accounts::{AccountService, InMemoryAccounts};
/// use keyline_core::protocol::{CreateResult, LoginResult};
///
/// let accounts = InMemoryAccounts::default();
/// let outcome = accounts.create("alice", "correct-horse").unwrap();
/// assert_eq!(outcome.result, CreateResult::Success);
/// assert_eq!(accounts.login("alice", "correct-horse").unwrap(), LoginResult::Verify);
/// ```
pub struct InMemoryAccounts {
    accounts: DashMap<String, Account>,
    policy: AccountPolicy,
    max_accounts: usize,
    hasher: Argon2<'static>,
}

impl InMemoryAccounts {
    /// Creates an empty store with policy, cap and hashing cost from
    /// configuration.
    #[must_use]
    pub fn from_config(config: &AccountsConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            policy: AccountPolicy::from_config(config),
            max_accounts: config.max_accounts,
            hasher: password_hasher(config),
        }
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if no accounts exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Stored profile data of an account.
    #[must_use]
    pub fn data(&self, username: &str) -> Option<String> {
        self.accounts.get(username).and_then(|a| a.data.clone())
    }

    /// Returns `true` if the account exists and is verified.
    #[must_use]
    pub fn is_verified(&self, username: &str) -> bool {
        self.accounts.get(username).is_some_and(|a| a.verified)
    }
}

impl Default for InMemoryAccounts {
    fn default() -> Self {
        Self::from_config(&AccountsConfig::default())
    }
}

impl AccountService for InMemoryAccounts {
    fn create(&self, username: &str, password: &str) -> AccountResult<CreateOutcome> {
        let verdict = self.policy.check(username, password);
        if verdict != CreateResult::Success {
            debug!(username, result = %verdict, "Account rejected by policy");
            return Ok(CreateOutcome::rejected(verdict));
        }

        if self.accounts.len() >= self.max_accounts {
            return Err(AccountError::database(format!(
                "account limit of {} reached",
                self.max_accounts
            )));
        }

        match self.accounts.entry(username.to_string()) {
            Entry::Occupied(_) => Ok(CreateOutcome::rejected(CreateResult::UsernameTaken)),
            Entry::Vacant(slot) => {
                let account = Account::new(hash_password(&self.hasher, password)?);
                let key = account.verification_key.to_string();
                slot.insert(account);
                info!(username, "Account created");
                Ok(CreateOutcome {
                    result: CreateResult::Success,
                    verification_key: Some(key),
                })
            }
        }
    }

    fn login(&self, username: &str, password: &str) -> AccountResult<LoginResult> {
        let Some((stored, verified)) = self
            .accounts
            .get(username)
            .map(|a| (a.password_hash.clone(), a.verified))
        else {
            return Ok(LoginResult::NoUser);
        };
        if !verify_password(&self.hasher, password, &stored)? {
            debug!(username, "Wrong password");
            return Ok(LoginResult::BadPassword);
        }
        if !verified {
            return Ok(LoginResult::Verify);
        }
        Ok(LoginResult::Success)
    }

    fn verify(&self, username: &str, key: &str) -> AccountResult<VerifyResult> {
        let Some(mut account) = self.accounts.get_mut(username) else {
            return Ok(VerifyResult::NoUser);
        };
        let matches: bool = account
            .verification_key
            .as_bytes()
            .ct_eq(key.as_bytes())
            .into();
        if !matches {
            return Ok(VerifyResult::BadKey);
        }
        if !account.verified {
            account.verified = true;
            info!(
                username,
                age_secs = account.created_at.elapsed().as_secs(),
                "Account verified"
            );
        }
        Ok(VerifyResult::Success)
    }

    fn update(&self, username: &str, data: &str) -> AccountResult<UpdateResult> {
        let Some(mut account) = self.accounts.get_mut(username) else {
            return Ok(UpdateResult::NoUser);
        };
        if !account.verified {
            return Ok(UpdateResult::Verify);
        }
        account.data = Some(data.to_string());
        debug!(username, len = data.len(), "Account data updated");
        Ok(UpdateResult::Success)
    }
}

impl std::fmt::Debug for InMemoryAccounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAccounts")
            .field("accounts", &self.len())
            .field("policy", &self.policy)
            .field("max_accounts", &self.max_accounts)
            .finish_non_exhaustive()
    }
}

/// A store with the smallest hashing cost, for tests that create many
/// accounts.
#[cfg(test)]
pub(crate) fn low_cost_accounts() -> InMemoryAccounts {
    InMemoryAccounts::from_config(&AccountsConfig {
        hash_memory_kib: 64,
        hash_iterations: 1,
        ..AccountsConfig::default()
    })
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn created(accounts: &InMemoryAccounts, user: &str, pass: &str) -> String {
        let outcome = accounts.create(user, pass).unwrap();
        assert_eq!(outcome.result, CreateResult::Success);
        outcome.verification_key.unwrap()
    }

    #[test]
    fn test_policy_order() {
        let policy = AccountPolicy::default();
        assert_eq!(policy.check("alice", "password1"), CreateResult::Success);
        assert_eq!(policy.check("al ice", "password1"), CreateResult::UsernameChar);
        assert_eq!(policy.check("al", "password1"), CreateResult::UsernameLength);
        assert_eq!(policy.check("alice", "pass word"), CreateResult::PasswordChar);
        assert_eq!(policy.check("alice", "short"), CreateResult::PasswordLength);
        // Character errors win over length errors
        assert_eq!(policy.check("a!", "x"), CreateResult::UsernameChar);
    }

    #[test]
    fn test_create_and_duplicate() {
        let accounts = low_cost_accounts();
        let key = created(&accounts, "alice", "password1");
        assert_eq!(key.len(), VERIFICATION_KEY_SIZE * 2);

        let again = accounts.create("alice", "password2").unwrap();
        assert_eq!(again.result, CreateResult::UsernameTaken);
        assert!(again.verification_key.is_none());
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn test_login_results() {
        let accounts = low_cost_accounts();
        let key = created(&accounts, "bob", "hunter22");

        assert_eq!(accounts.login("carol", "hunter22").unwrap(), LoginResult::NoUser);
        assert_eq!(accounts.login("bob", "hunter23").unwrap(), LoginResult::BadPassword);
        assert_eq!(accounts.login("bob", "hunter22").unwrap(), LoginResult::Verify);

        assert_eq!(accounts.verify("bob", &key).unwrap(), VerifyResult::Success);
        assert_eq!(accounts.login("bob", "hunter22").unwrap(), LoginResult::Success);
    }

    #[test]
    fn test_verify_results() {
        let accounts = low_cost_accounts();
        let key = created(&accounts, "dave", "password1");

        assert_eq!(accounts.verify("erin", &key).unwrap(), VerifyResult::NoUser);
        assert_eq!(accounts.verify("dave", "00").unwrap(), VerifyResult::BadKey);
        assert!(!accounts.is_verified("dave"));
        assert_eq!(accounts.verify("dave", &key).unwrap(), VerifyResult::Success);
        assert!(accounts.is_verified("dave"));
        // Idempotent
        assert_eq!(accounts.verify("dave", &key).unwrap(), VerifyResult::Success);
    }

    #[test]
    fn test_update_requires_verification() {
        let accounts = low_cost_accounts();
        let key = created(&accounts, "frank", "password1");

        assert_eq!(accounts.update("frank", "bio").unwrap(), UpdateResult::Verify);
        accounts.verify("frank", &key).unwrap();
        assert_eq!(accounts.update("frank", "bio,with,commas").unwrap(), UpdateResult::Success);
        assert_eq!(accounts.data("frank").as_deref(), Some("bio,with,commas"));
        assert_eq!(accounts.update("ghost", "x").unwrap(), UpdateResult::NoUser);
    }

    #[test]
    fn test_passwords_stored_as_argon2id() {
        let accounts = low_cost_accounts();
        created(&accounts, "same1", "password1");
        created(&accounts, "same2", "password1");
        let a = accounts.accounts.get("same1").unwrap().password_hash.clone();
        let b = accounts.accounts.get("same2").unwrap().password_hash.clone();

        assert!(a.starts_with("$argon2id$"));
        assert!(a.contains("m=64,t=1,p=1"));
        assert!(!a.contains("password1"));
        // Fresh salt per account
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password_against_stored_hash() {
        let config = AccountsConfig {
            hash_memory_kib: 64,
            hash_iterations: 1,
            ..AccountsConfig::default()
        };
        let hasher = password_hasher(&config);
        let stored = hash_password(&hasher, "hunter22").unwrap();

        assert!(verify_password(&hasher, "hunter22", &stored).unwrap());
        assert!(!verify_password(&hasher, "hunter23", &stored).unwrap());
        assert!(matches!(
            verify_password(&hasher, "hunter22", "not-a-phc-string"),
            Err(AccountError::Database { .. })
        ));
    }

    #[test]
    fn test_config_sets_cap_and_cost() {
        let config = AccountsConfig {
            max_accounts: 1,
            hash_memory_kib: 64,
            hash_iterations: 1,
            ..AccountsConfig::default()
        };
        let accounts = InMemoryAccounts::from_config(&config);
        created(&accounts, "first", "password1");
        assert!(matches!(
            accounts.create("second", "password1"),
            Err(AccountError::Database { .. })
        ));
    }
}
