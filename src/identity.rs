use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Whether identities that differ only in letter case name the same
/// template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityCase {
    /// Keys are compared exactly as given (after trimming).
    #[default]
    Sensitive,
    /// Keys are lowercased before use.
    Insensitive,
}

/// Normalized key into the template store.
///
/// The only way to build one is [`Identity::parse`], so enrollment,
/// verification and purge all key the store the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn parse(raw: &str, case: IdentityCase) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidIdentity);
        }
        let key = match case {
            IdentityCase::Sensitive => trimmed.to_string(),
            IdentityCase::Insensitive => trimmed.to_lowercase(),
        };
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
