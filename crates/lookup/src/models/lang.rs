//! Languages a catalogued book can be recorded in.
//!
//! The catalog only distinguishes the languages its sources report
//! reliably. Everything else is [`Language::Unknown`], which the reconciler
//! treats as "empty" and happily replaces with a later source's answer.

use super::sanitize;
use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Language {
    #[default]
    Unknown,
    Japanese,
    English,
}
impl Language {
    /// Symbolic name, as persisted in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Japanese => "Japanese",
            Self::English => "English",
        }
    }

    /// Maps an ISO-639 code (as reported by book APIs) onto a language.
    ///
    /// Unrecognised codes are not an error, they simply map to `Unknown`.
    ///
    /// ```
    /// use shelf_lookup::models::Language;
    /// assert_eq!(Language::from_iso("ja"), Language::Japanese);
    /// assert_eq!(Language::from_iso("eng"), Language::English);
    /// assert_eq!(Language::from_iso("fr"), Language::Unknown);
    /// ```
    pub fn from_iso(code: &str) -> Self {
        match sanitize(code).as_str() {
            "ja" | "jpn" => Self::Japanese,
            "en" | "eng" => Self::English,
            _ => Self::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl FromStr for Language {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "unknown" => Self::Unknown,
            "japanese" | "ja" | "jpn" | "jp" => Self::Japanese,
            "english" | "en" | "eng" => Self::English,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "language",
                value: s.to_string(),
            }),
        })
    }
}
impl TryFrom<String> for Language {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<Language> for &'static str {
    fn from(lang: Language) -> Self {
        lang.as_str()
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
