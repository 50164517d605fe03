//! Scripted metadata source for testing.

use super::MetadataSource;
use crate::error::{ErrorKind, Result};
use crate::models::{Info, Isbn};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Metadata source that always gives the same, pre-programmed answer.
///
/// The answered record always carries the ISBN that was asked for, so one
/// mock can serve lookups for several books.
///
/// # Examples
///
/// ```
/// use shelf_lookup::{Info, Isbn, MetadataSource, source::MockSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let isbn: Isbn = "9784091932518".parse()?;
/// let source = MockSource::new("a", Info::new(isbn.clone()).with_title("Foo"));
/// assert_eq!(source.get_info(&isbn).await?.title, "Foo");
/// assert_eq!(source.calls(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockSource {
    name: String,
    answer: std::result::Result<Info, ErrorKind>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(name: impl Into<String>, info: Info) -> Self {
        Self {
            name: name.into(),
            answer: Ok(info),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that fails every lookup with `kind`.
    pub fn failing(name: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            name: name.into(),
            answer: Err(kind),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering, to exercise lookup deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_info(&self, isbn: &Isbn) -> Result<Info> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            Ok(info) => Ok(Info {
                isbn: isbn.clone(),
                ..info.clone()
            }),
            Err(kind) => Err(exn::Exn::from(kind.clone())),
        }
    }
}
