//! National Diet Library (NDL Search) OpenSearch API.
//!
//! Answers are RSS 2.0 documents with Dublin Core (`dc:`) and NDL-specific
//! (`dcndl:`) extension elements. The catalogue only covers publications
//! deposited in Japan, so every hit is recorded as Japanese, and it has no
//! synopses at all.

use super::{MetadataSource, check_status, client};
use crate::error::{ErrorKind, Result};
use crate::models::{Description, Image, Info, Isbn, Language, PublishDate};
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use tracing::instrument;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://ndlsearch.ndl.go.jp";

pub struct Ndl {
    client: reqwest::Client,
    endpoint: String,
}

impl Ndl {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client(timeout)?,
            endpoint: endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Returns the thumbnail URL if NDL has a cover for the ISBN.
    ///
    /// Covers are optional, so any failure here just means "no cover".
    async fn thumbnail(&self, isbn: &Isbn) -> Option<Url> {
        let url = Url::parse(&format!("{}/thumbnail/{isbn}.jpg", self.endpoint)).ok()?;
        match self.client.head(url.clone()).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => Some(url),
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "No NDL thumbnail");
                None
            },
            Err(err) => {
                tracing::debug!(error = %err, "NDL thumbnail check failed");
                None
            },
        }
    }
}

#[async_trait]
impl MetadataSource for Ndl {
    fn name(&self) -> &str {
        "ndl"
    }

    #[instrument(skip(self), fields(isbn = %isbn))]
    async fn get_info(&self, isbn: &Isbn) -> Result<Info> {
        let response = self
            .client
            .get(format!("{}/api/opensearch", self.endpoint))
            .query(&[("isbn", isbn.as_str())])
            .send()
            .await
            .map_err(ErrorKind::http)?;
        check_status(&response)?;
        let body = response.text().await.map_err(ErrorKind::http)?;
        let rss: Rss = quick_xml::de::from_str(&body).or_raise(|| ErrorKind::InvalidResponse)?;
        tracing::debug!(items = rss.channel.items.len(), "NDL Search answered");

        let mut info = merge(isbn, rss.channel.items)?;
        if let Some(thumbnail) = self.thumbnail(isbn).await {
            info.image.source = Some(thumbnail);
        }
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

/// One catalogue record.
///
/// Elements are matched on their local name, so `<title>` and `<dc:title>`
/// both land in `title`, `<dc:creator>` in `creator` and so on.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Item {
    title: Vec<String>,
    creator: Vec<String>,
    volume: String,
    #[serde(rename = "pubDate")]
    pub_date: String,
}
impl Item {
    fn full_title(&self) -> String {
        let title = self.title.first().map_or("", |title| title.trim());
        format!("{title} {}", self.volume.trim())
    }

    fn published(&self) -> Option<PublishDate> {
        OffsetDateTime::parse(self.pub_date.trim(), &Rfc2822)
            .ok()
            .map(PublishDate::from)
    }
}

/// Merge every item into one record.
///
/// NDL lists each physical volume separately, so the title becomes the
/// union of the words of all titles, in the order they were first seen.
fn merge(isbn: &Isbn, items: Vec<Item>) -> Result<Info> {
    let Some(first) = items.first() else {
        exn::bail!(ErrorKind::NotFound);
    };

    let mut words: Vec<&str> = Vec::new();
    let titles: Vec<String> = items.iter().map(Item::full_title).collect();
    for word in titles.iter().flat_map(|title| title.split_whitespace()) {
        if !words.contains(&word) {
            words.push(word);
        }
    }

    Ok(Info {
        isbn: isbn.clone(),
        title: words.join(" "),
        authors: first.creator.iter().map(|c| c.trim().to_string()).collect(),
        description: Description::Missing,
        published: first.published(),
        language: Language::Japanese,
        image: Image::default(),
    })
}
