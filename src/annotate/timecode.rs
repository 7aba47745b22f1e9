//! SubRip timecodes (`HH:MM:SS,mmm`) to and from seconds.

use crate::error::{PipelineError, Result};

/// Parse an SRT timestamp "HH:MM:SS,mmm" into seconds.
///
/// Every field must be plain ASCII digits. The millisecond field holds one
/// to three digits and is read as thousandths of a second.
///
/// ```
/// use capburn::annotate::timecode::parse_timestamp;
///
/// assert_eq!(parse_timestamp("00:01:30,500").unwrap(), 90.5);
/// ```
pub fn parse_timestamp(text: &str) -> Result<f64> {
    let malformed = |reason| PipelineError::MalformedTimestamp {
        text: text.to_string(),
        reason,
    };

    let (clock, millis) = text
        .split_once(',')
        .ok_or_else(|| malformed("missing ',' before milliseconds"))?;

    let mut fields = clock.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed("expected HH:MM:SS before the comma"));
    };

    if millis.len() > 3 {
        return Err(malformed("milliseconds take at most three digits"));
    }

    let hours = parse_field(hours).ok_or_else(|| malformed("hours are not a number"))?;
    let minutes = parse_field(minutes).ok_or_else(|| malformed("minutes are not a number"))?;
    let seconds = parse_field(seconds).ok_or_else(|| malformed("seconds are not a number"))?;
    let millis = parse_field(millis).ok_or_else(|| malformed("milliseconds are not a number"))?;

    let total_ms = hours
        .checked_mul(3_600_000)
        .and_then(|h| h.checked_add(minutes.checked_mul(60_000)?))
        .and_then(|hm| hm.checked_add(seconds.checked_mul(1000)?))
        .and_then(|hms| hms.checked_add(millis))
        .ok_or_else(|| malformed("value out of range"))?;

    Ok(total_ms as f64 / 1000.0)
}

/// Unsigned decimal field; rejects signs, spaces and empty strings that
/// `str::parse` would otherwise accept or misreport.
fn parse_field(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm), rounding to the
/// nearest millisecond. Negative input clamps to zero.
pub fn format_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values() {
        assert_eq!(parse_timestamp("00:01:30,500").unwrap(), 90.5);
        assert_eq!(parse_timestamp("01:00:00,000").unwrap(), 3600.0);
        assert_eq!(parse_timestamp("00:00:00,000").unwrap(), 0.0);
        assert_eq!(parse_timestamp("00:00:04,500").unwrap(), 4.5);
    }

    #[test]
    fn test_short_millis_are_thousandths() {
        assert_eq!(parse_timestamp("00:00:01,5").unwrap(), 1.005);
    }

    #[test]
    fn test_monotonic_in_each_field() {
        let base = parse_timestamp("01:01:01,001").unwrap();
        for bumped in ["02:01:01,001", "01:02:01,001", "01:01:02,001", "01:01:01,002"] {
            assert!(parse_timestamp(bumped).unwrap() > base, "{bumped}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "00:01:30",
            "00:01:30.500",
            "01:30,500",
            "00:00:01:30,500",
            "00:-1:30,500",
            "+0:01:30,500",
            "00:01: 30,500",
            "aa:01:30,500",
            "00:01:30,",
            "00:01:30,5000",
        ] {
            let err = parse_timestamp(bad).unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedTimestamp { .. }),
                "{bad:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(61.0), "00:01:01,000");
        assert_eq!(format_timestamp(3661.5), "01:01:01,500");
        assert_eq!(format_timestamp(-2.0), "00:00:00,000");
    }

    #[test]
    fn test_format_then_parse_is_stable() {
        let secs = parse_timestamp("02:03:04,567").unwrap();
        assert_eq!(format_timestamp(secs), "02:03:04,567");
    }
}
