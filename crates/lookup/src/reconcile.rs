use crate::error::{ErrorKind, Result};
use crate::models::{Info, Isbn};

/// Merge the answers of several metadata sources into one record.
///
/// `results` must be in configured source order (not in the order answers
/// arrived) so that merging is deterministic. The first successful answer is
/// the seed; every later one only fills fields the merged record is still
/// missing. Failed sources are logged and skipped.
///
/// The merged record always carries the requested `isbn`, and falls back to
/// the ISBN as its title if no source knew one.
///
/// Fails with [`NoMetadataFound`](ErrorKind::NoMetadataFound) if no source
/// succeeded.
///
/// ```
/// use shelf_lookup::{Description, Info, Isbn, reconcile};
///
/// let isbn: Isbn = "9784091932518".parse().unwrap();
/// let merged = reconcile(&isbn, [
///     ("a", Ok(Info::new(isbn.clone()).with_title("Foo"))),
///     ("b", Ok(Info::new(isbn.clone()).with_description("Bar"))),
/// ]).unwrap();
/// assert_eq!(merged.title, "Foo");
/// assert_eq!(merged.description, Description::from("Bar"));
/// ```
pub fn reconcile<N>(isbn: &Isbn, results: impl IntoIterator<Item = (N, Result<Info>)>) -> Result<Info>
where
    N: AsRef<str>,
{
    let mut merged: Option<Info> = None;
    for (source, result) in results {
        let info = match result {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(source = source.as_ref(), %isbn, error = ?err, "Metadata source failed; skipping");
                continue;
            },
        };
        match merged.as_mut() {
            None => merged = Some(info),
            Some(merged) => fill_gaps(merged, info),
        }
    }

    let Some(mut merged) = merged else {
        exn::bail!(ErrorKind::NoMetadataFound(isbn.clone()));
    };
    merged.isbn = isbn.clone();
    if merged.title.trim().is_empty() {
        merged.title = isbn.to_string();
    }
    Ok(merged)
}

fn fill_gaps(merged: &mut Info, other: Info) {
    if merged.title.trim().is_empty() && !other.title.trim().is_empty() {
        merged.title = other.title;
    }
    if merged.authors.is_empty() {
        merged.authors = other.authors;
    }
    // The sentinel is only a placeholder: real text from anyone replaces it.
    if merged.description.is_empty() && !other.description.is_empty() {
        merged.description = other.description;
    }
    if merged.published.is_none() {
        merged.published = other.published;
    }
    if merged.language.is_unknown() {
        merged.language = other.language;
    }
    if merged.image.source.is_none() {
        merged.image.source = other.image.source;
    }
}
