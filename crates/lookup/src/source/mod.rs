//! Book metadata sources.
//!
//! A source answers "what do you know about this ISBN?" with a partially
//! populated [`Info`]. Sources never see each other's answers; combining them
//! is the job of [`reconcile`](crate::reconcile).

mod google;
#[cfg(feature = "mock")]
mod mock;
mod ndl;

pub use self::google::GoogleBooks;
#[cfg(feature = "mock")]
pub use self::mock::MockSource;
pub use self::ndl::Ndl;
use crate::error::{ErrorKind, Result};
use crate::models::{Info, Isbn};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub type SourceHandle = Arc<dyn MetadataSource + Send + Sync>;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A book metadata provider, such as a public book search API.
///
/// # Examples
///
/// ```
/// use shelf_lookup::{Isbn, MetadataSource, error::Result};
///
/// async fn title_of(source: &dyn MetadataSource, isbn: &str) -> Result<String> {
///     let isbn: Isbn = isbn.parse()?;
///     Ok(source.get_info(&isbn).await?.title)
/// }
/// ```
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Name of the source, used for logging only.
    fn name(&self) -> &str;

    /// Look up a single book.
    ///
    /// Fields the source does not know are left at their zero value (see
    /// [`Info::new`]). Fails with [`NotFound`](ErrorKind::NotFound) when the
    /// source has no record of the ISBN, or with one of the transient kinds
    /// when the source could not be asked.
    async fn get_info(&self, isbn: &Isbn) -> Result<Info>;
}

/// HTTP client shared by the HTTP-backed sources.
fn client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ErrorKind::http)
}

fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        exn::bail!(ErrorKind::BadStatus(status.as_u16()));
    }
    Ok(())
}
