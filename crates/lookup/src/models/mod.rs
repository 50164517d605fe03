mod date;
mod description;
mod info;
mod isbn;
mod lang;

pub use self::date::PublishDate;
pub use self::description::{Description, NO_DESCRIPTION};
pub use self::info::{Image, Info};
pub use self::isbn::Isbn;
pub use self::lang::Language;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('-', "").replace('_', "").replace(' ', "")
}
