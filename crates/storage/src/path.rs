//! Storage path validation.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a relative storage path, returning it in normalized form.
///
/// `.` components, repeated and trailing separators are dropped and `..` is
/// resolved lexically. A path that resolves to nothing, climbs above the
/// storage root, carries a Windows prefix or contains a NUL byte is rejected
/// with [`InvalidPath`](crate::error::ErrorKind::InvalidPath). A leading `/`
/// is treated as the storage root.
///
/// ```
/// use std::path::Path;
/// use shelf_storage::validate_path;
/// assert!(validate_path("9784091932518.jpeg").is_ok());
/// assert!(validate_path("../9784091932518.jpeg").is_err());
/// assert_eq!(
///     validate_path("./covers/../9784091932518.png").unwrap(),
///     Path::new("9784091932518.png")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            // NUL passes through Path::components() on Unix, but truncates
            // the path in every syscall.
            Component::Normal(s) if s.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(s) => components.push(s),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                components.pop().ok_or_else(invalid)?;
            },
        }
    }
    match components.is_empty() {
        true => Err(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("9784091932518.jpeg", "9784091932518.jpeg")]
    #[case("covers/9784091932518", "covers/9784091932518")]
    #[case("covers//9784091932518", "covers/9784091932518")]
    #[case("./covers/./9784091932518", "covers/9784091932518")]
    #[case("covers/old/..", "covers")]
    #[case("covers/", "covers")]
    #[case("/9784091932518.png", "9784091932518.png")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("covers/../../escape")]
    #[case("a\0b")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
