use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Sentinel recorded when a source positively reports that it has no
/// description for a book.
pub const NO_DESCRIPTION: &str = "NoDescription";

/// Book description (synopsis, blurb, or search snippet).
///
/// [`Missing`](Self::Missing) is the "no description available" sentinel,
/// distinct from an empty [`Text`](Self::Text), which is merely the zero
/// value a source leaves behind when it never looked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Description {
    Missing,
    Text(String),
}
impl Description {
    /// Returns `true` for both the sentinel and blank text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Missing => NO_DESCRIPTION,
            Self::Text(text) => text,
        }
    }
}
impl Default for Description {
    fn default() -> Self {
        Self::Text(String::new())
    }
}
impl From<String> for Description {
    fn from(value: String) -> Self {
        match value == NO_DESCRIPTION {
            true => Self::Missing,
            false => Self::Text(value),
        }
    }
}
impl From<&str> for Description {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}
impl From<Description> for String {
    fn from(description: Description) -> Self {
        match description {
            Description::Missing => NO_DESCRIPTION.to_string(),
            Description::Text(text) => text,
        }
    }
}

impl Display for Description {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
