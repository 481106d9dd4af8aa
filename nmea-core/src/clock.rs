//! GPS-derived UTC clock.
//!
//! `TimeTracker` turns time-bearing sentences into a UTC instant,
//! last-writer-wins, and keeps the previous value when a sentence fails to
//! parse. `SharedClock` is the single-slot holder that hands the latest
//! instant from the ingestion loop to the time responder.
//!
//! | Formatter | Time field | Date                                  |
//! |-----------|------------|---------------------------------------|
//! | RMC       | 1          | field 9, `ddmmyy`, year = 2000 + `yy` |
//! | ZDA       | 1          | fields 2-4, day / month / `yyyy`      |
//! | GGA       | 1          | none: anchored to the caller's today  |
//!
//! GGA instants take the date from the host clock, not the receiver. Two
//! digit years are never windowed: `99` is 2099.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::checksum;
use crate::types::*;

const UNSET: i64 = i64::MIN;

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

fn two_digits(raw: &str, at: usize) -> Option<u32> {
    let digits = raw.get(at..at + 2)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parse `hhmmss[.sss]`. Fractional digits beyond milliseconds are dropped.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let err = || NmeaError::TimeParse {
        field: "time of day",
        raw: raw.to_string(),
    };

    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };
    if whole.len() != 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let hours = two_digits(whole, 0).ok_or_else(err)?;
    let minutes = two_digits(whole, 2).ok_or_else(err)?;
    let seconds = two_digits(whole, 4).ok_or_else(err)?;

    let mut millis = 0u32;
    for (i, b) in fraction.bytes().take(3).enumerate() {
        millis += u32::from(b - b'0') * 10u32.pow(2 - i as u32);
    }

    NaiveTime::from_hms_milli_opt(hours, minutes, seconds, millis).ok_or_else(err)
}

/// Parse `ddmmyy`; the year is 2000 + `yy`.
pub fn parse_date_ddmmyy(raw: &str) -> Result<NaiveDate> {
    let err = || NmeaError::TimeParse {
        field: "date",
        raw: raw.to_string(),
    };
    if raw.len() != 6 {
        return Err(err());
    }
    let day = two_digits(raw, 0).ok_or_else(err)?;
    let month = two_digits(raw, 2).ok_or_else(err)?;
    let year = two_digits(raw, 4).ok_or_else(err)? as i32 + 2000;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}

/// Parse ZDA day, month, and four-digit year fields.
fn parse_zda_date(day: &str, month: &str, year: &str) -> Result<NaiveDate> {
    let err = || NmeaError::TimeParse {
        field: "date",
        raw: format!("{day},{month},{year}"),
    };
    let day: u32 = day.parse().map_err(|_| err())?;
    let month: u32 = month.parse().map_err(|_| err())?;
    let year: i32 = year.parse().map_err(|_| err())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}

// ---------------------------------------------------------------------------
// Time extraction
// ---------------------------------------------------------------------------

/// Extract the UTC instant carried by a sentence.
///
/// `Ok(None)` for sentences that carry no time, or whose time field is empty
/// (receiver without a fix). `today` anchors sentences with no date field.
pub fn extract_time(sentence: &str, today: NaiveDate) -> Result<Option<DateTime<Utc>>> {
    let body = checksum::strip_checksum(sentence);
    let kind = match classify(address_of(body)) {
        Some(kind) if kind.info().time_bearing => kind,
        _ => return Ok(None),
    };

    let fields: Vec<&str> = body.split(',').collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    if field(1).is_empty() {
        return Ok(None);
    }
    let time = parse_time_of_day(field(1))?;

    let date = match kind {
        SentenceKind::Rmc if !field(9).is_empty() => parse_date_ddmmyy(field(9))?,
        SentenceKind::Zda if !field(2).is_empty() => parse_zda_date(field(2), field(3), field(4))?,
        _ => today,
    };

    Ok(Some(date.and_time(time).and_utc()))
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Latest satellite UTC instant, last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct TimeTracker {
    latest: Option<DateTime<Utc>>,
    pub updates: u64,
    pub parse_errors: u64,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sentence into the tracker.
    ///
    /// Returns the new instant when the sentence carried one. On a parse
    /// error the previous instant is kept and the error returned.
    pub fn update(&mut self, sentence: &str, today: NaiveDate) -> Result<Option<DateTime<Utc>>> {
        match extract_time(sentence, today) {
            Ok(Some(instant)) => {
                self.latest = Some(instant);
                self.updates += 1;
                Ok(Some(instant))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.parse_errors += 1;
                Err(e)
            }
        }
    }

    /// Like `update`, anchoring date-less sentences to the host's UTC date.
    pub fn update_now(&mut self, sentence: &str) -> Result<Option<DateTime<Utc>>> {
        self.update(sentence, Utc::now().date_naive())
    }

    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.latest
    }
}

// ---------------------------------------------------------------------------
// Shared clock
// ---------------------------------------------------------------------------

/// Single-slot, lock-free holder of the latest GPS instant.
///
/// One writer (ingestion) and any number of readers (the responder). The
/// instant is stored as Unix milliseconds in one atomic word, so a reader
/// never sees a torn value.
#[derive(Debug, Clone)]
pub struct SharedClock {
    millis: Arc<AtomicI64>,
}

impl SharedClock {
    pub fn new() -> Self {
        SharedClock {
            millis: Arc::new(AtomicI64::new(UNSET)),
        }
    }

    pub fn store(&self, instant: DateTime<Utc>) {
        self.millis.store(instant.timestamp_millis(), Ordering::Release);
    }

    /// Latest instant, or `None` before the first store.
    pub fn load(&self) -> Option<DateTime<Utc>> {
        match self.millis.load(Ordering::Acquire) {
            UNSET => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        SharedClock::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RMC: &str = "$GPRMC,235959,A,4807.038,N,01131.000,E,022.4,084.4,010124,003.1,W*6F";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("123519").unwrap(),
            NaiveTime::from_hms_opt(12, 35, 19).unwrap()
        );
        assert_eq!(
            parse_time_of_day("235959.50").unwrap(),
            NaiveTime::from_hms_milli_opt(23, 59, 59, 500).unwrap()
        );
        assert_eq!(
            parse_time_of_day("000000.1234").unwrap(),
            NaiveTime::from_hms_milli_opt(0, 0, 0, 123).unwrap()
        );
    }

    #[test]
    fn test_parse_time_of_day_invalid() {
        for raw in ["", "1235", "12351a", "250000", "126000", "123519.x", "+12351"] {
            assert!(
                matches!(parse_time_of_day(raw), Err(NmeaError::TimeParse { .. })),
                "should reject {raw:?}"
            );
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date_ddmmyy("010124").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(
            parse_date_ddmmyy("230394").unwrap(),
            NaiveDate::from_ymd_opt(2094, 3, 23).unwrap()
        );
        assert!(parse_date_ddmmyy("320124").is_err());
        assert!(parse_date_ddmmyy("0101").is_err());
    }

    #[test]
    fn test_rmc_date_and_time() {
        let instant = extract_time(RMC, today()).unwrap().unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_gga_anchors_to_today() {
        let instant = extract_time(GGA, today()).unwrap().unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 10, 16, 12, 35, 19).unwrap());
    }

    #[test]
    fn test_zda_full_date() {
        let zda = "$GPZDA,201530.00,04,07,2002,00,00*60";
        let instant = extract_time(zda, today()).unwrap().unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2002, 7, 4, 20, 15, 30).unwrap());
    }

    #[test]
    fn test_non_time_sentence() {
        let gsa = "$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39";
        assert_eq!(extract_time(gsa, today()).unwrap(), None);
        assert_eq!(extract_time("$PUBX,00,081350.00", today()).unwrap(), None);
    }

    #[test]
    fn test_empty_time_field() {
        assert_eq!(extract_time("$GPGGA,,,,,,0,00,,,M,,M,,", today()).unwrap(), None);
    }

    #[test]
    fn test_rmc_empty_date_anchors_today() {
        let instant = extract_time("$GPRMC,010203,V,,,,,,,,,", today()).unwrap().unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 10, 16, 1, 2, 3).unwrap());
    }

    #[test]
    fn test_tracker_unset() {
        let tracker = TimeTracker::new();
        assert!(tracker.current_time().is_none());
    }

    #[test]
    fn test_tracker_dated_then_undated() {
        let mut tracker = TimeTracker::new();
        let dated = tracker.update(RMC, today()).unwrap().unwrap();
        assert_eq!(dated, Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap());

        let next_day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let undated = tracker
            .update("$GPGGA,000001,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,", next_day)
            .unwrap()
            .unwrap();
        assert_eq!(undated, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 1).unwrap());
        assert_eq!(tracker.current_time(), Some(undated));
        // The earlier dated instant is a value, untouched by the later write
        assert_eq!(dated, Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap());

        // A dated sentence after an undated one wins again
        tracker.update(RMC, next_day).unwrap();
        assert_eq!(tracker.current_time(), Some(dated));
        assert_eq!(tracker.updates, 3);
    }

    #[test]
    fn test_tracker_keeps_previous_on_error() {
        let mut tracker = TimeTracker::new();
        tracker.update(RMC, today()).unwrap();
        let before = tracker.current_time();

        let err = tracker.update("$GPRMC,99xx99,A,,,,,,,010124,,", today());
        assert!(matches!(err, Err(NmeaError::TimeParse { .. })));
        assert_eq!(tracker.current_time(), before);
        assert_eq!(tracker.parse_errors, 1);

        let err = tracker.update("$GPRMC,120000,A,,,,,,,311324,,", today());
        assert!(err.is_err());
        assert_eq!(tracker.current_time(), before);
    }

    #[test]
    fn test_shared_clock() {
        let clock = SharedClock::new();
        assert!(clock.load().is_none());

        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let reader = clock.clone();
        clock.store(instant);
        assert_eq!(reader.load(), Some(instant));
    }

    #[test]
    fn test_shared_clock_millisecond_precision() {
        let clock = SharedClock::new();
        let instant = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 250)
            .unwrap()
            .and_utc();
        clock.store(instant);
        assert_eq!(clock.load(), Some(instant));
    }
}
