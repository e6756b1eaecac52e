//! Human-readable duration formatting and parsing

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Duration too large: {0}")]
    Overflow(String),
}

const UNITS: &[(&str, u64)] = &[
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

/// Duration wrapper with human-readable parsing ("500ms", "2s", "180d")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_days(days: u64) -> Self {
        Self(Duration::from_secs(days * 86_400))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Largest unit that divides the duration evenly
    pub fn to_human_readable(&self) -> String {
        let millis = self.0.as_millis();
        if millis == 0 {
            return "0s".to_string();
        }
        for &(unit, factor) in UNITS {
            let factor = u128::from(factor);
            if millis % factor == 0 {
                return format!("{}{}", millis / factor, unit);
            }
        }
        format!("{}ms", millis)
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<HumanDuration> for Duration {
    fn from(d: HumanDuration) -> Self {
        d.0
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_human_readable())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HumanDurationVisitor;

        impl<'de> serde::de::Visitor<'de> for HumanDurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"2s\", \"180d\") or seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(HumanDuration::from_secs(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(HumanDuration::from_secs)
                    .map_err(|_| E::custom(format!("negative duration: {}", v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<HumanDuration>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(HumanDurationVisitor)
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        // Bare numbers are seconds
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(HumanDuration::from_secs(secs));
        }

        let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(0) | None => return Err(ParseError::InvalidFormat(s.to_string())),
            Some(pos) => (&s[..pos], s[pos..].trim()),
        };

        let num: u64 = num_str.parse()?;

        let factor = match unit {
            "ms" => 1,
            "s" | "sec" | "secs" => 1_000,
            "m" | "min" | "mins" => 60_000,
            "h" | "hr" | "hrs" => 3_600_000,
            "d" | "day" | "days" => 86_400_000,
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        let millis = num
            .checked_mul(factor)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))?;
        Ok(HumanDuration(Duration::from_millis(millis)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Duration {
        s.parse::<HumanDuration>().unwrap().as_duration()
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse("500ms"), Duration::from_millis(500));
        assert_eq!(parse("2s"), Duration::from_secs(2));
        assert_eq!(parse("5m"), Duration::from_secs(300));
        assert_eq!(parse("12h"), Duration::from_secs(12 * 3600));
        assert_eq!(parse("180d"), Duration::from_secs(180 * 86_400));
        assert_eq!(parse(" 3 D "), Duration::from_secs(3 * 86_400));
    }

    #[test]
    fn test_bare_number_is_seconds() {
        assert_eq!(parse("30"), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            "d".parse::<HumanDuration>(),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "5w".parse::<HumanDuration>(),
            Err(ParseError::InvalidUnit(_))
        ));
        assert!(matches!(
            "99999999999999999d".parse::<HumanDuration>(),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(HumanDuration::from_days(180).to_human_readable(), "180d");
        assert_eq!(HumanDuration::from_secs(90).to_human_readable(), "90s");
        assert_eq!(HumanDuration::from_secs(7200).to_human_readable(), "2h");
        assert_eq!(
            HumanDuration(Duration::from_millis(1500)).to_human_readable(),
            "1500ms"
        );
        assert_eq!(HumanDuration(Duration::ZERO).to_human_readable(), "0s");
    }

    #[test]
    fn test_deserialize_string_and_number() {
        #[derive(Deserialize)]
        struct TestStruct {
            timeout: HumanDuration,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"timeout": "2s"}"#).unwrap();
        assert_eq!(parsed.timeout.as_duration(), Duration::from_secs(2));

        let parsed: TestStruct = serde_json::from_str(r#"{"timeout": 5}"#).unwrap();
        assert_eq!(parsed.timeout.as_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_serialize_round_trips_through_display() {
        let json = serde_json::to_string(&HumanDuration::from_days(30)).unwrap();
        assert_eq!(json, "\"30d\"");
    }
}
