use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::{Date, Month, OffsetDateTime};

/// Year and month a book was published.
///
/// Book sources rarely agree on a day (and often don't know one), so the
/// catalog never stores one. A book with no known date carries
/// `Option::<PublishDate>::None` rather than a sentinel such as the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublishDate {
    year: i32,
    // 1-12, kept numeric so ordering follows the calendar.
    month: u8,
}
impl PublishDate {
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month: u8::from(month) }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        Month::January.nth_next(self.month - 1)
    }

    fn parse_error(value: &str) -> Error {
        exn::Exn::from(ErrorKind::ParseError {
            field: "publish date",
            value: value.to_string(),
        })
    }
}

/// Accepts `YYYY`, `YYYY-MM` and `YYYY-MM-DD` (anything after the month is
/// ignored). A bare year is treated as January of that year.
///
/// ```
/// use shelf_lookup::models::PublishDate;
/// use time::Month;
/// assert_eq!("2021-04-15".parse::<PublishDate>().unwrap(), PublishDate::new(2021, Month::April));
/// assert_eq!("1996".parse::<PublishDate>().unwrap(), PublishDate::new(1996, Month::January));
/// assert!("".parse::<PublishDate>().is_err());
/// ```
impl FromStr for PublishDate {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '-');
        let year = parts.next().unwrap_or_default();
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Self::parse_error(s));
        }
        let year = year.parse::<i32>().map_err(|_| Self::parse_error(s))?;
        let month = match parts.next() {
            None => Month::January,
            Some(month) => {
                let number = month.parse::<u8>().map_err(|_| Self::parse_error(s))?;
                Month::try_from(number).map_err(|_| Self::parse_error(s))?
            },
        };
        Ok(Self::new(year, month))
    }
}
impl TryFrom<String> for PublishDate {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<PublishDate> for String {
    fn from(date: PublishDate) -> Self {
        date.to_string()
    }
}
impl From<Date> for PublishDate {
    fn from(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }
}
impl From<OffsetDateTime> for PublishDate {
    fn from(datetime: OffsetDateTime) -> Self {
        datetime.date().into()
    }
}

impl Display for PublishDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2021", 2021, Month::January)]
    #[case("2021-04", 2021, Month::April)]
    #[case("2021-4", 2021, Month::April)]
    #[case("2021-12-31", 2021, Month::December)]
    #[case(" 1996-01 ", 1996, Month::January)]
    fn test_parse(#[case] input: &str, #[case] year: i32, #[case] month: Month) {
        assert_eq!(input.parse::<PublishDate>().unwrap(), PublishDate::new(year, month));
    }

    #[rstest]
    #[case("")]
    #[case("21")]
    #[case("2021-13")]
    #[case("2021-00")]
    #[case("April 2021")]
    #[case("20210")]
    fn test_parse_rejects(#[case] input: &str) {
        let err = input.parse::<PublishDate>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: "publish date", .. }));
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(PublishDate::new(987, Month::March).to_string(), "0987-03");
        assert_eq!(PublishDate::new(2021, Month::November).to_string(), "2021-11");
    }

    #[test]
    fn test_ordering_follows_calendar() {
        assert!(PublishDate::new(2020, Month::December) < PublishDate::new(2021, Month::January));
        assert!(PublishDate::new(2021, Month::February) > PublishDate::new(2021, Month::January));
    }
}
