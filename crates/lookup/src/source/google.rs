//! Google Books volumes API.

use super::{MetadataSource, check_status, client};
use crate::error::{ErrorKind, Result};
use crate::models::{Description, Image, Info, Isbn, Language, PublishDate};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/books/v1";

pub struct GoogleBooks {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GoogleBooks {
    pub fn new(api_key: Option<String>, endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client(timeout)?,
            endpoint: endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl MetadataSource for GoogleBooks {
    fn name(&self) -> &str {
        "google"
    }

    #[instrument(skip(self), fields(isbn = %isbn))]
    async fn get_info(&self, isbn: &Isbn) -> Result<Info> {
        let mut query = vec![("q", format!("isbn:{isbn}"))];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }
        let response = self
            .client
            .get(format!("{}/volumes", self.endpoint))
            .query(&query)
            .send()
            .await
            .map_err(ErrorKind::http)?;
        check_status(&response)?;
        let volumes: Volumes = response.json().await.map_err(ErrorKind::http)?;
        tracing::debug!(volumes = volumes.items.len(), "Google Books answered");
        fold(isbn, volumes.items)
    }
}

#[derive(Debug, Deserialize)]
struct Volumes {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
    search_info: Option<SearchInfo>,
}
impl Volume {
    fn full_title(&self) -> String {
        format!("{} {}", self.volume_info.title, self.volume_info.subtitle)
            .trim()
            .to_string()
    }

    fn published(&self) -> Option<PublishDate> {
        self.volume_info.published_date.parse().ok()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VolumeInfo {
    title: String,
    subtitle: String,
    authors: Vec<String>,
    published_date: String,
    description: String,
    language: String,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchInfo {
    text_snippet: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageLinks {
    thumbnail: String,
}

/// Fold every volume returned for one ISBN into a single record.
///
/// Volumes whose titles overlap are editions of the same book, and the most
/// descriptive one becomes the primary. Volumes with unrelated titles (such
/// as the individual parts of a set sharing an ISBN) are appended to the
/// title, and the latest of their publish dates wins.
fn fold(isbn: &Isbn, volumes: Vec<Volume>) -> Result<Info> {
    let mut volumes = volumes.into_iter();
    let Some(mut primary) = volumes.next() else {
        exn::bail!(ErrorKind::NotFound);
    };
    let mut primary_title = primary.full_title();
    let mut alternates: Vec<String> = Vec::new();
    let mut latest_alternate: Option<PublishDate> = None;

    for volume in volumes {
        let title = volume.full_title();
        if primary_title.contains(&title) || title.contains(&primary_title) {
            if title.len() > primary_title.len() {
                primary = volume;
                primary_title = title;
            }
            continue;
        }
        latest_alternate = latest_alternate.max(volume.published());
        alternates.push(title);
    }

    let published = primary.published().max(latest_alternate);
    let title = std::iter::once(primary_title)
        .chain(alternates)
        .collect::<Vec<_>>()
        .join(" / ");
    let snippet = primary.search_info.map(|search| search.text_snippet);
    let VolumeInfo {
        authors,
        description,
        language,
        image_links,
        ..
    } = primary.volume_info;

    let description = match (description.trim().is_empty(), snippet) {
        (false, _) => Description::Text(description),
        (true, Some(snippet)) if !snippet.trim().is_empty() => Description::Text(snippet),
        _ => Description::Missing,
    };

    Ok(Info {
        isbn: isbn.clone(),
        title,
        authors,
        description,
        published,
        language: Language::from_iso(&language),
        image: Image {
            source: image_links.and_then(|links| Url::parse(&links.thumbnail).ok()),
            path: None,
        },
    })
}
