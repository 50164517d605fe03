mod book;

pub(crate) use self::book::BookRow;
