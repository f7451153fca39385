use chrono::Datelike;

/// Aggregation granularity selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

/// Grouping key derived from a record date.
///
/// `year` is always the calendar year of the date. For `Weekly` the week is
/// the ISO 8601 week number, computed independently of `year`, so early
/// January dates may land in week 52/53 and late December dates in week 1
/// of the same calendar year.
///
/// Variants never mix inside one table, so the derived ordering sorts by
/// year first and then by month or week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodBucket {
    Weekly { year: i32, week: u32 },
    Monthly { year: i32, month: u32 },
    Yearly { year: i32 },
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Weekly, Period::Monthly, Period::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
            Period::Yearly => "Yearly",
        }
    }

    /// Maps a date onto the bucket it belongs to for this period.
    pub fn bucket_for(&self, date: chrono::NaiveDate) -> PeriodBucket {
        let year = date.year();
        match self {
            Period::Weekly => PeriodBucket::Weekly {
                year,
                week: date.iso_week().week(),
            },
            Period::Monthly => PeriodBucket::Monthly {
                year,
                month: date.month(),
            },
            Period::Yearly => PeriodBucket::Yearly { year },
        }
    }

    /// Column headers of a rendered aggregate table for this period.
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Period::Weekly => &["Year", "Week", "Avg_Ouverture", "Avg_Fermeture"],
            Period::Monthly => &["Year", "Month", "Avg_Ouverture", "Avg_Fermeture"],
            Period::Yearly => &["Year", "Avg_Ouverture", "Avg_Fermeture"],
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            _ => Err(format!(
                "Unknown period '{}'. Available: {}",
                s.trim(),
                Period::ALL.map(|p| p.as_str()).join(", ")
            )),
        }
    }
}

impl PeriodBucket {
    pub fn year(&self) -> i32 {
        match *self {
            PeriodBucket::Weekly { year, .. }
            | PeriodBucket::Monthly { year, .. }
            | PeriodBucket::Yearly { year } => year,
        }
    }

    /// Key cells as rendered in the output table: year, then month or week.
    pub fn key_fields(&self) -> Vec<String> {
        let year = self.year().to_string();
        match *self {
            PeriodBucket::Weekly { week, .. } => vec![year, week.to_string()],
            PeriodBucket::Monthly { month, .. } => vec![year, month.to_string()],
            PeriodBucket::Yearly { .. } => vec![year],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_period_case_insensitive() {
        assert_eq!("Weekly".parse::<Period>().unwrap(), Period::Weekly);
        assert_eq!("monthly".parse::<Period>().unwrap(), Period::Monthly);
        assert_eq!(" YEARLY ".parse::<Period>().unwrap(), Period::Yearly);
        assert!("daily".parse::<Period>().is_err());
    }

    #[test]
    fn test_display_matches_selector_labels() {
        let labels: Vec<String> = Period::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["Weekly", "Monthly", "Yearly"]);
    }

    #[test]
    fn test_weekly_bucket_keeps_calendar_year() {
        // 2023-01-01 is a Sunday in ISO week 52 of 2022.
        assert_eq!(
            Period::Weekly.bucket_for(date(2023, 1, 1)),
            PeriodBucket::Weekly { year: 2023, week: 52 }
        );
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        assert_eq!(
            Period::Weekly.bucket_for(date(2024, 12, 30)),
            PeriodBucket::Weekly { year: 2024, week: 1 }
        );
        assert_eq!(
            Period::Weekly.bucket_for(date(2023, 1, 10)),
            PeriodBucket::Weekly { year: 2023, week: 2 }
        );
    }

    #[test]
    fn test_monthly_and_yearly_buckets() {
        assert_eq!(
            Period::Monthly.bucket_for(date(2023, 7, 31)),
            PeriodBucket::Monthly { year: 2023, month: 7 }
        );
        assert_eq!(
            Period::Yearly.bucket_for(date(2023, 7, 31)),
            PeriodBucket::Yearly { year: 2023 }
        );
    }

    #[test]
    fn test_bucket_ordering_is_year_then_sub_period() {
        let mut buckets = vec![
            PeriodBucket::Monthly { year: 2024, month: 1 },
            PeriodBucket::Monthly { year: 2023, month: 12 },
            PeriodBucket::Monthly { year: 2023, month: 2 },
        ];
        buckets.sort();
        assert_eq!(
            buckets,
            vec![
                PeriodBucket::Monthly { year: 2023, month: 2 },
                PeriodBucket::Monthly { year: 2023, month: 12 },
                PeriodBucket::Monthly { year: 2024, month: 1 },
            ]
        );
    }

    #[test]
    fn test_key_fields_match_headers() {
        for period in Period::ALL {
            let bucket = period.bucket_for(date(2023, 3, 15));
            assert_eq!(bucket.key_fields().len() + 2, period.headers().len());
            assert_eq!(bucket.year(), 2023);
        }
        assert_eq!(
            PeriodBucket::Weekly { year: 2025, week: 1 }.key_fields(),
            vec!["2025", "1"]
        );
        assert_eq!(
            PeriodBucket::Monthly { year: 2023, month: 11 }.key_fields(),
            vec!["2023", "11"]
        );
        assert_eq!(PeriodBucket::Yearly { year: 2020 }.key_fields(), vec!["2020"]);
    }
}
