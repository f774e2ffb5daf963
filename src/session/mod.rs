//! Per-process gate in front of locked notes.
//!
//! The password hash is a 32-bit rolling hash, bit-for-bit compatible with
//! hashes already stored under `memoPasswordHash`. It obfuscates the password
//! at rest; it does not protect it. Anyone with access to the store can brute-force it.

use anyhow::Result;
use thiserror::Error;

use crate::storage::{KeyValueStore, PASSWORD_HASH_KEY};

pub const MIN_PASSWORD_CHARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Locked,
    Unlocked,
}

/// What the caller has to collect before the session can unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockStep {
    /// No password stored yet: ask for a new one twice.
    SetPassword,
    /// Ask for the stored password.
    EnterPassword,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("password must be at least {MIN_PASSWORD_CHARS} characters")]
    TooShort,
    #[error("passwords do not match")]
    Mismatch,
    #[error("incorrect password")]
    WrongPassword,
    #[error("no password has been set")]
    NoPassword,
    #[error("canceled")]
    Cancelled,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Source of answers for the line-oriented unlock flow.
pub trait Prompter {
    /// `None` when the user backs out.
    fn prompt(&mut self, label: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct SessionLock {
    state: SessionState,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, SessionState::Unlocked)
    }

    pub fn lock(&mut self) {
        if self.is_unlocked() {
            tracing::info!("session locked");
        }
        self.state = SessionState::Locked;
    }

    pub fn begin_unlock(&self, store: &dyn KeyValueStore) -> Result<UnlockStep> {
        Ok(if password_is_set(store)? {
            UnlockStep::EnterPassword
        } else {
            UnlockStep::SetPassword
        })
    }

    pub fn unlock_with(
        &mut self,
        store: &dyn KeyValueStore,
        password: &str,
    ) -> Result<(), SessionError> {
        let Some(stored) = store.get(PASSWORD_HASH_KEY)? else {
            return Err(SessionError::NoPassword);
        };
        if rolling_hash(password) != stored {
            tracing::warn!("rejected session unlock attempt");
            return Err(SessionError::WrongPassword);
        }
        self.state = SessionState::Unlocked;
        tracing::info!("session unlocked");
        Ok(())
    }

    /// First-time setup: stores the password and unlocks in one go.
    pub fn set_password_and_unlock(
        &mut self,
        store: &dyn KeyValueStore,
        first: &str,
        confirm: &str,
    ) -> Result<(), SessionError> {
        set_password(store, first, confirm)?;
        self.state = SessionState::Unlocked;
        tracing::info!("session unlocked with new password");
        Ok(())
    }

    /// Runs the whole unlock flow, prompting for whatever is missing.
    pub fn unlock_interactive(
        &mut self,
        store: &dyn KeyValueStore,
        prompter: &mut dyn Prompter,
    ) -> Result<(), SessionError> {
        match self.begin_unlock(store)? {
            UnlockStep::SetPassword => {
                let (first, confirm) = prompt_new_password(prompter)?;
                self.set_password_and_unlock(store, &first, &confirm)
            }
            UnlockStep::EnterPassword => {
                let password = ask(prompter, "Password")?;
                self.unlock_with(store, &password)
            }
        }
    }
}

pub fn password_is_set(store: &dyn KeyValueStore) -> Result<bool> {
    Ok(store
        .get(PASSWORD_HASH_KEY)?
        .map(|hash| !hash.is_empty())
        .unwrap_or(false))
}

pub fn check_password(store: &dyn KeyValueStore, password: &str) -> Result<bool> {
    Ok(store.get(PASSWORD_HASH_KEY)?.as_deref() == Some(rolling_hash(password).as_str()))
}

pub fn set_password(
    store: &dyn KeyValueStore,
    first: &str,
    confirm: &str,
) -> Result<(), SessionError> {
    if first.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SessionError::TooShort);
    }
    if first != confirm {
        return Err(SessionError::Mismatch);
    }
    store.set(PASSWORD_HASH_KEY, &rolling_hash(first))?;
    tracing::info!("session password updated");
    Ok(())
}

/// Replaces the password; when one exists, `old` must match it.
pub fn change_password(
    store: &dyn KeyValueStore,
    old: Option<&str>,
    first: &str,
    confirm: &str,
) -> Result<(), SessionError> {
    if password_is_set(store)? {
        let old = old.ok_or(SessionError::WrongPassword)?;
        if !check_password(store, old)? {
            return Err(SessionError::WrongPassword);
        }
    }
    set_password(store, first, confirm)
}

pub fn change_password_interactive(
    store: &dyn KeyValueStore,
    prompter: &mut dyn Prompter,
) -> Result<(), SessionError> {
    let old = if password_is_set(store)? {
        let old = ask(prompter, "Current password")?;
        if !check_password(store, &old)? {
            return Err(SessionError::WrongPassword);
        }
        Some(old)
    } else {
        None
    };
    let (first, confirm) = prompt_new_password(prompter)?;
    change_password(store, old.as_deref(), &first, &confirm)
}

/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wraparound,
/// rendered as a signed decimal.
pub fn rolling_hash(input: &str) -> String {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    hash.to_string()
}

fn prompt_new_password(prompter: &mut dyn Prompter) -> Result<(String, String), SessionError> {
    let first = ask(
        prompter,
        &format!("New password ({MIN_PASSWORD_CHARS}+ characters)"),
    )?;
    if first.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SessionError::TooShort);
    }
    let confirm = ask(prompter, "Confirm password")?;
    Ok((first, confirm))
}

fn ask(prompter: &mut dyn Prompter, label: &str) -> Result<String, SessionError> {
    prompter
        .prompt(label)
        .filter(|answer| !answer.is_empty())
        .ok_or(SessionError::Cancelled)
}
