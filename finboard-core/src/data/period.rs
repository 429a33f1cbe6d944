//! Lookback period selectors ("1y", "6mo", "ytd", ...).

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    FiveYears,
    YearToDate,
    Max,
}

impl Period {
    /// Inclusive date range ending at `today`.
    pub fn range(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let back = |months: u32| {
            today
                .checked_sub_months(Months::new(months))
                .unwrap_or(NaiveDate::MIN)
        };
        let start = match self {
            Period::OneMonth => back(1),
            Period::ThreeMonths => back(3),
            Period::SixMonths => back(6),
            Period::OneYear => back(12),
            Period::TwoYears => back(24),
            Period::FiveYears => back(60),
            Period::YearToDate => {
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
            }
            // Yahoo's daily history does not go further back than 1970.
            Period::Max => NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN),
        };
        (start, today)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            other => Err(format!(
                "unknown period '{other}'. Valid: 1mo, 3mo, 6mo, 1y, 2y, 5y, ytd, max"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn one_year_back() {
        let (start, end) = Period::OneYear.range(d(2024, 6, 15));
        assert_eq!(start, d(2023, 6, 15));
        assert_eq!(end, d(2024, 6, 15));
    }

    #[test]
    fn month_end_clamps() {
        let (start, _) = Period::OneMonth.range(d(2024, 3, 31));
        assert_eq!(start, d(2024, 2, 29));
    }

    #[test]
    fn ytd_starts_january_first() {
        let (start, _) = Period::YearToDate.range(d(2024, 6, 15));
        assert_eq!(start, d(2024, 1, 1));
    }

    #[test]
    fn parse_and_display() {
        for p in ["1mo", "3mo", "6mo", "1y", "2y", "5y", "ytd", "max"] {
            assert_eq!(p.parse::<Period>().unwrap().to_string(), p);
        }
        assert!("10y".parse::<Period>().is_err());
    }
}
