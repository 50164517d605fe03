use serde::{Deserialize, Serialize};
use shelf_lookup::Info;

/// Response to the read operations: the matching books and how many there
/// are. A book that doesn't exist is an empty listing, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub books: Vec<Info>,
    pub count: usize,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
impl From<Vec<Info>> for Listing {
    fn from(books: Vec<Info>) -> Self {
        Self {
            count: books.len(),
            books,
        }
    }
}
impl From<Option<Info>> for Listing {
    fn from(book: Option<Info>) -> Self {
        Self::from(Vec::from_iter(book))
    }
}
