//! Institution-local clock.
//!
//! This is the only place the real clock is read. Everything downstream
//! receives explicit dates and times so results stay reproducible.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parse a UTC offset written as `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "Invalid UTC offset".to_string());
    }

    raw.parse::<FixedOffset>()
        .map_err(|e| format!("Invalid UTC offset: {} ({})", raw, e))
}

/// Wall clock of the institution, at a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct InstitutionClock {
    offset: FixedOffset,
}

impl InstitutionClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current local date and time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Local moment for `date` at `time`.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<FixedOffset>> {
        self.offset.from_local_datetime(&date.and_time(time)).single()
    }

    /// Fill in whichever of `date` / `time` is missing from the real clock.
    pub fn resolve(
        &self,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> Option<DateTime<FixedOffset>> {
        let now = self.now();
        if date.is_none() && time.is_none() {
            return Some(now);
        }
        self.at(
            date.unwrap_or_else(|| now.date_naive()),
            time.unwrap_or_else(|| now.time()),
        )
    }
}
