use chrono::{Datelike, NaiveDate};

/// Australian financial year (runs 1 July to 30 June).
/// The year value is the ending year: 2025 means FY2024-25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// The financial year a date falls in.
    pub fn from_date(date: NaiveDate) -> Self {
        if date.month() >= 7 {
            FinancialYear(date.year() + 1)
        } else {
            FinancialYear(date.year())
        }
    }

    /// First day of the financial year (1 July of the previous year).
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 - 1, 7, 1).unwrap()
    }

    /// Last day of the financial year (30 June).
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 6, 30).unwrap()
    }

    /// Both boundary dates are inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// Display as "FY2024-25" format
    pub fn display(&self) -> String {
        format!("FY{}-{:02}", self.0 - 1, self.0 % 100)
    }
}

impl std::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn fy_from_date_before_july() {
        // 30 June 2025 is the last day of FY2024-25
        assert_eq!(FinancialYear::from_date(date("2025-06-30")), FinancialYear(2025));
    }

    #[test]
    fn fy_from_date_on_july_1() {
        // 1 July 2025 opens FY2025-26
        assert_eq!(FinancialYear::from_date(date("2025-07-01")), FinancialYear(2026));
    }

    #[test]
    fn fy_from_date_december() {
        assert_eq!(FinancialYear::from_date(date("2024-12-31")), FinancialYear(2025));
    }

    #[test]
    fn fy_from_date_january() {
        assert_eq!(FinancialYear::from_date(date("2025-01-15")), FinancialYear(2025));
    }

    #[test]
    fn fy_start_end_dates() {
        let fy = FinancialYear(2025);
        assert_eq!(fy.start_date(), date("2024-07-01"));
        assert_eq!(fy.end_date(), date("2025-06-30"));
    }

    #[test]
    fn fy_contains_is_inclusive() {
        let fy = FinancialYear(2025);
        assert!(fy.contains(date("2024-07-01")));
        assert!(fy.contains(date("2025-06-30")));
        assert!(!fy.contains(date("2024-06-30")));
        assert!(!fy.contains(date("2025-07-01")));
    }

    #[test]
    fn fy_display() {
        assert_eq!(FinancialYear(2024).display(), "FY2023-24");
        assert_eq!(FinancialYear(2025).display(), "FY2024-25");
        assert_eq!(FinancialYear(2031).display(), "FY2030-31");
    }
}
