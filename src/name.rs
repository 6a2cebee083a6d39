//! The validated name shared by projects and categories.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A validated, non-empty name with surrounding whitespace removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Create a name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The name lowercased with Unicode rules, used to compare names
    /// regardless of letter case.
    pub fn folded(&self) -> String {
        fold_case(&self.0)
    }
}

/// Lowercase `text` with Unicode rules.
///
/// SQLite's `NOCASE` and `LIKE` only fold ASCII letters, so text that must
/// match regardless of case is folded before it reaches the database.
/// 'İ' lowercases to 'i' followed by a combining dot, the dot is dropped so
/// that it matches a plain 'i'.
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase().replace("i\u{307}", "i")
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
