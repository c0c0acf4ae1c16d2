pub mod string;

pub use string::SecretString;

use keyring::Entry;
use sdk::errors::TourError;
use std::io::{self, Write};

/// Service name under which API keys live in the OS keychain.
pub const KEYCHAIN_SERVICE: &str = "tourguide";

/// Keychain entry holding the Anthropic API key.
pub const ANTHROPIC_KEY_NAME: &str = "anthropic_api_key";

/// SecretManager handles storage and retrieval of API keys.
///
/// Lookup order: the configured environment variable, then the OS keychain
/// (macOS Keychain, Windows Credential Manager, Linux Secret Service).
/// Resolution happens once per process and the resulting `SecretString` is
/// passed explicitly into the provider that needs it.
pub struct SecretManager {
    service_name: String,
}

impl SecretManager {
    /// Creates a new SecretManager with the given service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Resolve a secret without prompting.
    ///
    /// Returns `None` when neither the environment variable nor the keychain
    /// holds a non-empty value.
    pub fn resolve(&self, env_var: &str, key: &str) -> Option<SecretString> {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                tracing::debug!("Using secret '{}' from ${}", key, env_var);
                return Some(SecretString::new(value));
            }
        }

        match self.get_secret(key) {
            Ok(Some(secret)) => Some(secret),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Keychain lookup for '{}' failed: {}", key, e);
                None
            }
        }
    }

    /// Retrieves a secret from the OS keychain.
    ///
    /// # Errors
    /// Returns `TourError::Config` if keychain access fails for a reason
    /// other than a missing entry.
    pub fn get_secret(&self, key: &str) -> Result<Option<SecretString>, TourError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            TourError::Config(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) if !secret.trim().is_empty() => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(SecretString::new(secret.trim())))
            }
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(TourError::Config(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    pub fn set_secret(&self, key: &str, value: &SecretString) -> Result<(), TourError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            TourError::Config(format!("Failed to create keyring entry: {}", e))
        })?;

        entry.set_password(value.unsecure()).map_err(|e| {
            TourError::Config(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Removes a secret from the OS keychain. A missing entry is not an error.
    pub fn delete_secret(&self, key: &str) -> Result<(), TourError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            TourError::Config(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.delete_password() {
            Ok(()) => {
                tracing::info!("Deleted secret '{}' from keychain", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(TourError::Config(format!(
                "Failed to delete secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Prompts on stderr and reads one line from stdin.
    pub fn prompt_for_secret(&self, key: &str) -> Result<SecretString, TourError> {
        eprint!("Enter value for '{}': ", key);
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let secret = input.trim();
        if secret.is_empty() {
            return Err(TourError::Config(format!("No value entered for '{}'", key)));
        }

        Ok(SecretString::new(secret))
    }
}
