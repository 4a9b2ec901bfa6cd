use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::history::RaceDb;

/// The locally signed-in typist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub email: Option<String>,
}

/// Where the signed-in account survives between runs.
pub trait AccountStore {
    fn load(&self) -> Result<Option<Account>>;
    fn save(&self, account: &Account) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileAccountStore {
    path: PathBuf,
}

impl FileAccountStore {
    pub fn new() -> Self {
        Self::with_path(AppDirs::account_path())
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for FileAccountStore {
    fn load(&self) -> Result<Option<Account>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, account: &Account) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(account)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Explicit session context for the signed-in user.
///
/// Nothing reads the account from ambient storage: callers `load()` once at
/// startup, pass the context to whatever needs it, and `save()`/`clear()` on
/// login and logout.
pub struct AccountContext<S: AccountStore> {
    store: S,
    current: Option<Account>,
}

impl<S: AccountStore> AccountContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Replaces the in-memory account with whatever the store holds.
    pub fn load(&mut self) -> Result<Option<&Account>> {
        self.current = self.store.load()?;
        Ok(self.current.as_ref())
    }

    pub fn save(&self) -> Result<()> {
        let account = self.current.as_ref().ok_or(Error::NotLoggedIn)?;
        self.store.save(account)
    }

    /// Signs out and forgets the persisted account.
    pub fn clear(&mut self) -> Result<()> {
        if let Some(account) = self.current.take() {
            info!(username = %account.username, "logged out");
        }
        self.store.clear()
    }

    pub fn current(&self) -> Option<&Account> {
        self.current.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.current.as_ref().map(|a| a.username.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Signs in as an existing user once `password` matches.
    pub fn login(&mut self, db: &RaceDb, username: &str, password: &str) -> Result<&Account> {
        let account = db.verify_credentials(username, password)?;
        info!(username, "logged in");
        self.current = Some(account);
        self.save()?;
        self.current.as_ref().ok_or(Error::NotLoggedIn)
    }

    /// Creates the user, then signs in as them.
    pub fn register(&mut self, db: &RaceDb, account: Account, password: &str) -> Result<&Account> {
        db.register_user(&account, password)?;
        self.login(db, &account.username, password)
    }
}

/// Keeps the account in memory only.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    account: std::cell::RefCell<Option<Account>>,
}

impl AccountStore for MemoryAccountStore {
    fn load(&self) -> Result<Option<Account>> {
        Ok(self.account.borrow().clone())
    }

    fn save(&self, account: &Account) -> Result<()> {
        *self.account.borrow_mut() = Some(account.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.account.borrow_mut() = None;
        Ok(())
    }
}
