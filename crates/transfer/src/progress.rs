//! Display helpers for sizes, speeds and time remaining.

use std::fmt;
use std::time::Duration;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
const SPEED_UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];

/// Estimated time remaining, rounded up into the largest fitting unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaBucket {
    Seconds(u64),
    Minutes(u64),
    Hours(u64),
}

impl EtaBucket {
    /// Buckets a remaining duration: under a minute counts seconds, under an
    /// hour counts minutes, anything longer counts hours. Always rounds up.
    pub fn from_duration(remaining: Duration) -> Self {
        let secs = remaining.as_secs_f64();
        if secs < 60.0 {
            Self::Seconds(secs.ceil() as u64)
        } else if secs < 3600.0 {
            Self::Minutes((secs / 60.0).ceil() as u64)
        } else {
            Self::Hours((secs / 3600.0).ceil() as u64)
        }
    }
}

impl fmt::Display for EtaBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(n) => write!(f, "{n}s remaining"),
            Self::Minutes(n) => write!(f, "{n}m remaining"),
            Self::Hours(n) => write!(f, "{n}h remaining"),
        }
    }
}

/// Formats an optional ETA, showing `Calculating...` until one is known.
pub fn format_eta(eta: Option<EtaBucket>) -> String {
    match eta {
        Some(bucket) => bucket.to_string(),
        None => "Calculating...".into(),
    }
}

/// `1536` becomes `"1.5 KB"`. Two decimals at most, trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }
    let (value, unit) = scale(bytes as f64, &SIZE_UNITS);
    format!("{} {unit}", trim_decimals(value, 2))
}

/// `1536.0` becomes `"1.5 KB/s"`. One decimal at most.
pub fn format_speed(bytes_per_second: f64) -> String {
    if bytes_per_second <= 0.0 || !bytes_per_second.is_finite() {
        return "0 B/s".into();
    }
    let (value, unit) = scale(bytes_per_second, &SPEED_UNITS);
    format!("{} {unit}", trim_decimals(value, 1))
}

fn scale(mut value: f64, units: &[&'static str; 4]) -> (f64, &'static str) {
    let mut exp = 0;
    while value >= 1024.0 && exp < units.len() - 1 {
        value /= 1024.0;
        exp += 1;
    }
    (value, units[exp])
}

fn trim_decimals(value: f64, places: usize) -> String {
    let s = format!("{value:.places$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
