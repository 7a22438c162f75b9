use crate::error::{EngineError, Result};
use core::fmt;
use serde::{Deserialize, Serialize};

/// A bucket width in milliseconds, parsed from strings like `"500ms"`, `"15m"`, `"4h"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    ms: i64,
}

impl fmt::Debug for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Period({}ms)", self.ms)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(i64, &str); 4] = [
            (86_400_000, "d"),
            (3_600_000, "h"),
            (60_000, "m"),
            (1_000, "s"),
        ];
        for (unit_ms, suffix) in UNITS {
            if self.ms % unit_ms == 0 {
                return write!(f, "{}{}", self.ms / unit_ms, suffix);
            }
        }
        write!(f, "{}ms", self.ms)
    }
}

impl Period {
    pub fn from_ms(ms: i64) -> Result<Self> {
        if ms <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "period must be > 0ms, got {ms}"
            )));
        }
        Ok(Self { ms })
    }

    pub fn as_ms(&self) -> i64 {
        self.ms
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |why: &str| EngineError::InvalidConfig(format!("period `{s}`: {why}"));
        let t = s.trim();
        if t.is_empty() {
            return Err(invalid("empty"));
        }
        let digits_end = t
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(t.len());
        if digits_end == 0 {
            return Err(invalid("missing number"));
        }
        let n: i64 = t[..digits_end]
            .parse()
            .map_err(|_| invalid("invalid number"))?;
        let mult = match t[digits_end..].trim().to_ascii_lowercase().as_str() {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid("unsupported unit (use ms/s/m/h/d)")),
        };
        let ms = n
            .checked_mul(mult)
            .ok_or_else(|| invalid("out of range"))?;
        Self::from_ms(ms)
    }

    /// Floors `ts_ms` to the start of its bucket; negative timestamps floor toward -inf.
    #[inline]
    pub fn bucket_start(&self, ts_ms: i64) -> i64 {
        ts_ms.div_euclid(self.ms) * self.ms
    }
}

impl TryFrom<String> for Period {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self> {
        Period::parse(&s)
    }
}

impl From<Period> for String {
    fn from(p: Period) -> String {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Period;

    #[test]
    fn parse_periods() {
        assert_eq!(Period::parse("15m").unwrap().as_ms(), 15 * 60_000);
        assert_eq!(Period::parse("4h").unwrap().as_ms(), 4 * 3_600_000);
        assert_eq!(Period::parse("1d").unwrap().as_ms(), 86_400_000);
        assert_eq!(Period::parse(" 500ms ").unwrap().as_ms(), 500);
        assert!(Period::parse("0s").is_err());
        assert!(Period::parse("m").is_err());
        assert!(Period::parse("5w").is_err());
    }

    #[test]
    fn bucket_start() {
        let p = Period::parse("15m").unwrap();
        assert_eq!(p.bucket_start(0), 0);
        assert_eq!(p.bucket_start(1), 0);
        assert_eq!(p.bucket_start(15 * 60_000), 15 * 60_000);
        assert_eq!(p.bucket_start(15 * 60_000 + 1), 15 * 60_000);
        assert_eq!(p.bucket_start(-1), -15 * 60_000);
    }

    #[test]
    fn display_and_serde() {
        assert_eq!(Period::parse("90s").unwrap().to_string(), "90s");
        assert_eq!(Period::parse("120m").unwrap().to_string(), "2h");
        assert_eq!(Period::parse("1500ms").unwrap().to_string(), "1500ms");
        let p: Period = serde_json::from_str(r#""5m""#).unwrap();
        assert_eq!(p.as_ms(), 300_000);
        assert_eq!(serde_json::to_string(&p).unwrap(), r#""5m""#);
        assert!(serde_json::from_str::<Period>(r#""-5m""#).is_err());
    }
}
