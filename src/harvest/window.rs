use chrono::{DateTime, Duration, Months, Utc};

/// Time bounds shared by every collector of one `collect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestWindow {
    pub now: DateTime<Utc>,
    pub six_months_ago: DateTime<Utc>,
    pub one_year_ago: DateTime<Utc>,
}

impl HarvestWindow {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            six_months_ago: months_before(now, 6),
            one_year_ago: months_before(now, 12),
        }
    }

    /// `since=` value for the commits API.
    pub fn since_param(&self) -> String {
        iso_timestamp(self.one_year_ago)
    }
}

fn months_before(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or_else(|| now - Duration::days(i64::from(months) * 30))
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Day-granular form used in search qualifiers such as `closed:>=`.
pub fn search_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
