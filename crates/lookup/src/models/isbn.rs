use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A normalized ISBN-10 or ISBN-13.
///
/// Normalization strips an optional `ISBN`/`ISBN-10`/`ISBN-13` label,
/// hyphens, whitespace and colons (barcode scanners and URL path parameters
/// both like to decorate the number), and upper-cases the ISBN-10 `X`
/// check character.
///
/// Check digits are deliberately *not* verified: the ISBN is the primary key
/// of the catalog, and printed books with a wrong check digit still need a
/// row. An ISBN-10 is never converted into its ISBN-13 form either; the
/// normalized input is the key.
///
/// ```
/// use shelf_lookup::models::Isbn;
/// let isbn: Isbn = "ISBN 978-4-09-193251-8".parse().unwrap();
/// assert_eq!(isbn.as_str(), "9784091932518");
/// assert!("12345".parse::<Isbn>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn normalize(input: &str) -> String {
        let trimmed = input.trim();
        let unlabelled = match trimmed.get(..4) {
            Some(label) if label.eq_ignore_ascii_case("isbn") => &trimmed[4..],
            _ => trimmed,
        };
        let unlabelled = unlabelled
            .strip_prefix("-13")
            .or_else(|| unlabelled.strip_prefix("-10"))
            .unwrap_or(unlabelled);
        unlabelled
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != ':')
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    fn is_well_formed(candidate: &str) -> bool {
        let bytes = candidate.as_bytes();
        match bytes.len() {
            10 => bytes[..9].iter().all(u8::is_ascii_digit) && (bytes[9].is_ascii_digit() || bytes[9] == b'X'),
            13 => bytes.iter().all(u8::is_ascii_digit),
            _ => false,
        }
    }
}

impl FromStr for Isbn {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = Self::normalize(s);
        if !Self::is_well_formed(&normalized) {
            exn::bail!(ErrorKind::InvalidIsbn(s.to_string()));
        }
        Ok(Self(normalized))
    }
}
impl TryFrom<String> for Isbn {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl TryFrom<&str> for Isbn {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}
impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Isbn {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("9784091932518", "9784091932518")]
    #[case("978-4-09-193251-8", "9784091932518")]
    #[case(" 978 4091 932518 ", "9784091932518")]
    #[case("ISBN 978-4-09-193251-8", "9784091932518")]
    #[case("ISBN-13: 9784091932518", "9784091932518")]
    #[case("isbn-10:4-09-193251-X", "409193251X")]
    #[case("409193251x", "409193251X")]
    #[case(":9784091932518", "9784091932518")]
    fn test_normalizes(#[case] input: &str, #[case] expected: &str) {
        let isbn = input.parse::<Isbn>().unwrap();
        assert_eq!(isbn.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("12345")]
    #[case("97840919325189")]
    #[case("978409193251X")]
    #[case("X091932518")]
    #[case("not-an-isbn")]
    fn test_rejects(#[case] input: &str) {
        let err = input.parse::<Isbn>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidIsbn(raw) if raw == input));
    }

    #[test]
    fn test_isbn10_is_not_upgraded() {
        let isbn = "4091932518".parse::<Isbn>().unwrap();
        assert_eq!(isbn.as_str().len(), 10);
        assert_eq!(isbn.to_string(), "4091932518");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let isbn: Isbn = serde_json::from_str(r#""978-4-09-193251-8""#).unwrap();
        assert_eq!(serde_json::to_string(&isbn).unwrap(), r#""9784091932518""#);
        assert!(serde_json::from_str::<Isbn>(r#""nope""#).is_err());
    }
}
