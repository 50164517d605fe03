use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use shelf_lookup::models::{Description, Image, Info, Isbn, Language, PublishDate};
use url::Url;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) isbn: String,
    pub(crate) title: String,
    /// `NULL` is the "no description" sentinel.
    pub(crate) description: Option<String>,
    pub(crate) published: Option<String>,
    pub(crate) language: String,
    pub(crate) image_source: Option<String>,
    /// JSON array of author names, in order.
    pub(crate) authors: String,
}
impl TryFrom<&Info> for BookRow {
    type Error = Error;
    fn try_from(info: &Info) -> Result<Self, Self::Error> {
        Ok(Self {
            isbn: info.isbn.to_string(),
            title: info.title.clone(),
            description: match &info.description {
                Description::Missing => None,
                Description::Text(text) => Some(text.clone()),
            },
            published: info.published.map(|date| date.to_string()),
            language: info.language.as_str().to_string(),
            image_source: info.image.source.as_ref().map(|url| url.to_string()),
            authors: serde_json::to_string(&info.authors).or_raise(|| ErrorKind::InvalidData("authors"))?,
        })
    }
}
impl TryFrom<BookRow> for Info {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            isbn: row.isbn.parse::<Isbn>().or_raise(|| ErrorKind::InvalidData("isbn"))?,
            title: row.title,
            authors: serde_json::from_str(&row.authors).or_raise(|| ErrorKind::InvalidData("authors"))?,
            description: row.description.map_or(Description::Missing, Description::Text),
            published: row
                .published
                .map(|date| date.parse::<PublishDate>().or_raise(|| ErrorKind::InvalidData("publish date")))
                .transpose()?,
            language: row.language.parse::<Language>().or_raise(|| ErrorKind::InvalidData("language"))?,
            image: Image {
                source: row
                    .image_source
                    .map(|url| Url::parse(&url).or_raise(|| ErrorKind::InvalidData("image source")))
                    .transpose()?,
                // Resolved from cover storage, never persisted.
                path: None,
            },
        })
    }
}
