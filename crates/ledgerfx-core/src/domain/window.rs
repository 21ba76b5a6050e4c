use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::error::ValidationError;

/// Earliest timestamp any trade can carry; used for last-price queries,
/// which scan from here to now.
const GENESIS_UNIX: i64 = 1_356_998_400; // 2013-01-01T00:00:00Z

/// Named relative time range ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedRange {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl NamedRange {
    pub const ALL: [Self; 5] = [Self::Hour, Self::Day, Self::Week, Self::Month, Self::Year];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Calendar ranges are approximated with fixed-length durations.
    pub const fn duration(self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::days(1),
            Self::Week => Duration::weeks(1),
            Self::Month => Duration::days(30),
            Self::Year => Duration::days(365),
        }
    }
}

impl Display for NamedRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamedRange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(ValidationError::InvalidRange {
                value: other.to_owned(),
            }),
        }
    }
}

/// Resolved half-open query window `[start, end)`.
///
/// Invariant: `start < end`. A window is live when its end equals "now"
/// at second granularity; live windows get short-TTL cache entries,
/// historical windows never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
    live: bool,
}

impl TimeWindow {
    /// Named relative range ending now.
    pub fn named(range: NamedRange) -> Self {
        Self::named_at(range, OffsetDateTime::now_utc())
    }

    pub fn named_at(range: NamedRange, now: OffsetDateTime) -> Self {
        Self {
            start: now - range.duration(),
            end: now,
            live: true,
        }
    }

    /// Resolves explicit request bounds.
    ///
    /// Both bounds given: order-independent, swapped if reversed, rejected
    /// if exactly equal. End only: the preceding 24 hours. Neither: the
    /// 24 hours ending now.
    pub fn resolve(
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Self::resolve_at(start_time, end_time, OffsetDateTime::now_utc())
    }

    pub fn resolve_at(
        start_time: Option<&str>,
        end_time: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Self, ValidationError> {
        let (start, end) = match (start_time, end_time) {
            (None, None) => (now - Duration::hours(24), now),
            (Some(start), Some(end)) => {
                (parse_time("startTime", start)?, parse_time("endTime", end)?)
            }
            (None, Some(end)) => {
                let end = parse_time("endTime", end)?;
                (end - Duration::hours(24), end)
            }
            (Some(_), None) => {
                return Err(ValidationError::InvalidTime {
                    field: "endTime",
                    value: "(missing)".to_owned(),
                });
            }
        };

        if start == end {
            return Err(ValidationError::EmptyWindow);
        }
        let (start, end) = if start > end { (end, start) } else { (start, end) };

        Ok(Self {
            start,
            end,
            live: end.unix_timestamp() == now.unix_timestamp(),
        })
    }

    /// Window ending at an optional snapshot time (default now), spanning
    /// the given lookback.
    pub fn snapshot(time: Option<&str>, lookback: Duration) -> Result<Self, ValidationError> {
        Self::snapshot_at(time, lookback, OffsetDateTime::now_utc())
    }

    pub fn snapshot_at(
        time: Option<&str>,
        lookback: Duration,
        now: OffsetDateTime,
    ) -> Result<Self, ValidationError> {
        let end = match time {
            Some(value) => parse_time("time", value)?,
            None => now,
        };
        Ok(Self {
            start: end - lookback,
            end,
            live: end.unix_timestamp() == now.unix_timestamp(),
        })
    }

    /// Epoch-to-now span used for last-price queries.
    pub fn since_genesis() -> Self {
        Self::since_genesis_at(OffsetDateTime::now_utc())
    }

    pub fn since_genesis_at(now: OffsetDateTime) -> Self {
        let start = OffsetDateTime::from_unix_timestamp(GENESIS_UNIX)
            .expect("genesis timestamp is in range");
        Self {
            start,
            end: now,
            live: true,
        }
    }

    pub const fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub const fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub const fn is_live(&self) -> bool {
        self.live
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).whole_seconds()
    }

    pub fn start_rfc3339(&self) -> String {
        format_rfc3339(self.start)
    }

    pub fn end_rfc3339(&self) -> String {
        format_rfc3339(self.end)
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<OffsetDateTime, ValidationError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(|parsed| parsed.to_offset(UtcOffset::UTC))
        .map_err(|_| ValidationError::InvalidTime {
            field,
            value: value.to_owned(),
        })
}

fn format_rfc3339(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .expect("UTC timestamps are RFC3339 formattable")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("in range")
    }

    #[test]
    fn parses_named_ranges() {
        let range = NamedRange::from_str("week").expect("must parse");
        assert_eq!(range, NamedRange::Week);

        let err = NamedRange::from_str("fortnight").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidRange { .. }));
    }

    #[test]
    fn defaults_to_the_preceding_24_hours() {
        let window = TimeWindow::resolve_at(None, None, now()).expect("must resolve");
        assert_eq!(window.duration_seconds(), 24 * 3600);
        assert!(window.is_live());
    }

    #[test]
    fn swaps_reversed_bounds() {
        let window = TimeWindow::resolve_at(
            Some("2024-01-02T00:00:00Z"),
            Some("2024-01-01T00:00:00Z"),
            now(),
        )
        .expect("must resolve");
        assert!(window.start() < window.end());
        assert_eq!(window.duration_seconds(), 24 * 3600);
        assert!(!window.is_live());
    }

    #[test]
    fn rejects_equal_bounds() {
        let err = TimeWindow::resolve_at(
            Some("2024-01-01T00:00:00Z"),
            Some("2024-01-01T00:00:00Z"),
            now(),
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::EmptyWindow));
    }

    #[test]
    fn rejects_unparseable_timestamps_with_the_offending_field() {
        let err = TimeWindow::resolve_at(Some("not a time"), Some("2024-01-01T00:00:00Z"), now())
            .expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::InvalidTime {
                field: "startTime",
                value: "not a time".to_owned(),
            }
        );
    }

    #[test]
    fn end_only_defaults_to_the_preceding_24_hours() {
        let window = TimeWindow::resolve_at(None, Some("2024-01-02T00:00:00Z"), now())
            .expect("must resolve");
        assert_eq!(window.duration_seconds(), 24 * 3600);
        assert_eq!(window.end_rfc3339(), "2024-01-02T00:00:00Z");
        assert!(!window.is_live());
    }

    #[test]
    fn live_is_detected_at_second_granularity() {
        let now = now();
        let window = TimeWindow::resolve_at(None, Some(&format_rfc3339(now)), now)
            .expect("must resolve");
        assert!(window.is_live());
    }

    #[test]
    fn named_range_window_ends_now() {
        let window = TimeWindow::named_at(NamedRange::Hour, now());
        assert_eq!(window.end(), now());
        assert_eq!(window.duration_seconds(), 3600);
        assert!(window.is_live());
    }

    #[test]
    fn genesis_window_is_live() {
        let window = TimeWindow::since_genesis_at(now());
        assert_eq!(window.start().unix_timestamp(), GENESIS_UNIX);
        assert!(window.is_live());
    }
}
