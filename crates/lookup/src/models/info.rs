use super::{Description, Isbn, Language, PublishDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// The canonical record of a catalogued book.
///
/// Sources return partially-populated records: whatever they don't know is
/// left at its zero value (empty title, no authors, blank description, no
/// date, [`Language::Unknown`], no image). The reconciler decides which
/// source wins for each field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Primary key, across both the database and cover storage.
    pub isbn: Isbn,
    /// Display title. May be a ` / `-joined composite when a source returned
    /// several distinct editions for the same ISBN.
    pub title: String,
    /// Authors in the order the source listed them.
    pub authors: Vec<String>,
    pub description: Description,
    /// Year and month of publication, if known.
    pub published: Option<PublishDate>,
    pub language: Language,
    pub image: Image,
}
impl Info {
    /// An empty record for `isbn`, every other field at its zero value.
    pub fn new(isbn: Isbn) -> Self {
        Self {
            isbn,
            title: String::new(),
            authors: Vec::new(),
            description: Description::default(),
            published: None,
            language: Language::Unknown,
            image: Image::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_authors<A: Into<String>>(mut self, authors: impl IntoIterator<Item = A>) -> Self {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<Description>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_published(mut self, published: PublishDate) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_image_source(mut self, source: Url) -> Self {
        self.image.source = Some(source);
        self
    }
}
impl AsRef<Info> for Info {
    fn as_ref(&self) -> &Info {
        self
    }
}

/// Cover image of a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Where the cover was (or will be) downloaded from.
    pub source: Option<Url>,
    /// Where the downloaded cover lives in cover storage, relative to its
    /// root.
    ///
    /// Never persisted with the record: it is resolved from cover storage
    /// every time a record is read, so the storage layout can change without
    /// migrating any data.
    pub path: Option<PathBuf>,
}
