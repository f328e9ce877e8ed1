use serde::{Deserialize, Serialize};
use std::fmt;
use crate::ConfigError;

/// Binary (powers of 1024) units accepted in size strings
const SIZE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
const DISPLAY_UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Parse a human size string such as `"500GB"` or `"1.5 TB"` into bytes.
///
/// Units are binary and case-insensitive. A unit is mandatory.
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSize {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim().to_ascii_uppercase();

    if number.is_empty() {
        return Err(invalid("missing numeric part"));
    }
    if unit.is_empty() {
        return Err(invalid("missing unit (expected one of B, KB, MB, GB, TB, PB, EB)"));
    }

    let exponent = SIZE_UNITS
        .iter()
        .position(|u| *u == unit)
        .ok_or_else(|| invalid("unrecognized unit"))? as u32;

    if number.contains('.') {
        let value: f64 = number.parse().map_err(|_| invalid("numeric part is not a number"))?;
        let bytes = value * 1024f64.powi(exponent as i32);
        if !bytes.is_finite() || bytes >= u64::MAX as f64 {
            return Err(invalid("value is too large"));
        }
        Ok(bytes as u64)
    } else {
        let value: u64 = number.parse().map_err(|_| invalid("numeric part is not a number"))?;
        1024u64
            .checked_pow(exponent)
            .and_then(|multiplier| value.checked_mul(multiplier))
            .ok_or_else(|| invalid("value is too large"))
    }
}

/// Parse a day-count threshold. Accepts a bare integer or an integer with a `d` suffix.
pub fn parse_days(input: &str) -> Result<u32, ConfigError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_suffix('d')
        .or_else(|| trimmed.strip_suffix('D'))
        .unwrap_or(trimmed)
        .trim();

    digits.parse::<u32>().map_err(|_| ConfigError::InvalidThreshold {
        value: input.to_string(),
        reason: "expected a whole number of days".to_string(),
    })
}

/// Render a byte count with binary units and two decimals, e.g. `1.50 GB`
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut index = 0;
    while value >= 1024.0 && index < DISPLAY_UNITS.len() - 1 {
        value /= 1024.0;
        index += 1;
    }
    format!("{:.2} {}", value, DISPLAY_UNITS[index])
}

/// A size threshold parsed at load time. Keeps the original text for round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ByteSize {
    raw: String,
    bytes: u64,
}

impl ByteSize {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl TryFrom<String> for ByteSize {
    type Error = ConfigError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let bytes = parse_size(&raw)?;
        Ok(Self { raw, bytes })
    }
}

impl From<ByteSize> for String {
    fn from(size: ByteSize) -> Self {
        size.raw
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DayCountRepr {
    Number(i64),
    Text(String),
}

/// A threshold in whole days. TOML may give it as an integer or as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "DayCountRepr", into = "u32")]
pub struct DayCount(u32);

impl DayCount {
    pub fn new(days: u32) -> Self {
        Self(days)
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    pub fn as_duration(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

impl TryFrom<DayCountRepr> for DayCount {
    type Error = ConfigError;

    fn try_from(repr: DayCountRepr) -> Result<Self, Self::Error> {
        match repr {
            DayCountRepr::Number(n) => u32::try_from(n).map(DayCount).map_err(|_| {
                ConfigError::InvalidThreshold {
                    value: n.to_string(),
                    reason: "must be a non-negative number of days".to_string(),
                }
            }),
            DayCountRepr::Text(text) => parse_days(&text).map(DayCount),
        }
    }
}

impl From<DayCount> for u32 {
    fn from(days: DayCount) -> Self {
        days.0
    }
}
