//! Log level definitions
//!
//! Levels are ordered by decreasing severity: `Panic` is the most severe and
//! carries the lowest number. A level is enabled when it is less than or equal
//! to the configured threshold, so raising the threshold lets more through.

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Panic = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    #[default]
    Info = 4,
    Debug = 5,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL: [Level; 6] = [
        Level::Panic,
        Level::Fatal,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
    ];

    /// Whether `candidate` passes a logger configured at `configured`.
    #[inline]
    pub fn is_enabled(configured: Level, candidate: Level) -> bool {
        candidate <= configured
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Panic => "panic",
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }

    /// Numeric representation used for the logger's atomic threshold.
    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Panic,
            1 => Level::Fatal,
            2 => Level::Error,
            3 => Level::Warn,
            4 => Level::Info,
            _ => Level::Debug,
        }
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Debug => White,
            Level::Info => Cyan,
            Level::Warn => Yellow,
            Level::Error | Level::Fatal | Level::Panic => Red,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            _ => Err(LoggerError::config("Level", format!("unknown level '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_more_severe_levels_always_enabled() {
        assert!(Level::is_enabled(Level::Info, Level::Panic));
        assert!(Level::is_enabled(Level::Info, Level::Error));
        assert!(Level::is_enabled(Level::Info, Level::Info));
        assert!(!Level::is_enabled(Level::Info, Level::Debug));
        assert!(!Level::is_enabled(Level::Panic, Level::Fatal));
    }

    #[test]
    fn test_parse_accepts_warn_aliases() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
    }

    #[test]
    fn test_parse_unknown_level_is_configuration_error() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid configuration for Level: unknown level 'verbose'"
        );
    }

    #[test]
    fn test_u8_conversion_matches_discriminant() {
        for level in Level::ALL {
            assert_eq!(Level::from_u8(level.as_u8()), level);
        }
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Level::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        let level: Level = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(level, Level::Debug);
    }
}
