use std::sync::OnceLock;

use regex::Regex;

/// Anything at or below this many seconds is a candidate for the shorts shelf.
pub const SHORT_MAX_SECONDS: u64 = 60;

static ISO_DURATION: OnceLock<Regex> = OnceLock::new();

/// Parse an ISO-8601 time duration such as `PT1H2M3S` into whole seconds.
///
/// Only the hour/minute/second designators are honoured. Anything that does
/// not match yields 0.
pub fn parse_iso_duration(iso: &str) -> u64 {
    let re = ISO_DURATION.get_or_init(|| {
        Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
    });

    let Some(caps) = re.captures(iso) else {
        return 0;
    };

    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    part(1)
        .saturating_mul(3600)
        .saturating_add(part(2).saturating_mul(60))
        .saturating_add(part(3))
}

pub fn is_short_duration(iso: &str) -> bool {
    let seconds = parse_iso_duration(iso);
    seconds > 0 && seconds <= SHORT_MAX_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_component_combination() {
        assert_eq!(parse_iso_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso_duration("PT5M30S"), 330);
        assert_eq!(parse_iso_duration("PT45S"), 45);
        assert_eq!(parse_iso_duration("PT2H"), 7200);
        assert_eq!(parse_iso_duration("PT10M"), 600);
        assert_eq!(parse_iso_duration("PT1H30S"), 3630);
        assert_eq!(parse_iso_duration("PT0S"), 0);
    }

    #[test]
    fn malformed_input_is_zero() {
        assert_eq!(parse_iso_duration(""), 0);
        assert_eq!(parse_iso_duration("invalid"), 0);
        assert_eq!(parse_iso_duration("P1D"), 0);
    }

    #[test]
    fn huge_components_saturate() {
        assert_eq!(parse_iso_duration("PT5124095576030432H"), u64::MAX);
        assert_eq!(parse_iso_duration("PT18446744073709551615M1S"), u64::MAX);
        assert!(!is_short_duration("PT5124095576030432H"));
    }

    #[test]
    fn short_boundary() {
        assert!(is_short_duration("PT1S"));
        assert!(is_short_duration("PT45S"));
        assert!(is_short_duration("PT1M"));
        assert!(is_short_duration("PT60S"));
        assert!(!is_short_duration("PT61S"));
        assert!(!is_short_duration("PT1M1S"));
        assert!(!is_short_duration("PT0S"));
        assert!(!is_short_duration(""));
    }
}
