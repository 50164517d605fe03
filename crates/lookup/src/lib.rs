pub mod error;
pub mod models;
mod reconcile;
pub mod source;

pub use crate::models::{Description, Image, Info, Isbn, Language, PublishDate};
pub use crate::reconcile::reconcile;
pub use crate::source::{MetadataSource, SourceHandle};
