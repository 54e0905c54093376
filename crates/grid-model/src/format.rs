//! Output encoding parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use teaser_common::error::{TeaserError, TeaserResult};

/// Encodings the exporter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

/// Accepted format keys. Lookups lower-case the input first.
pub const FORMAT_TABLE: &[(&str, OutputFormat)] = &[
    ("jpg", OutputFormat::Jpeg),
    ("jpeg", OutputFormat::Jpeg),
    ("png", OutputFormat::Png),
    ("webp", OutputFormat::Webp),
];

impl OutputFormat {
    /// Look up a format key case-insensitively.
    pub fn from_key(key: &str) -> TeaserResult<Self> {
        let normalized = key.to_lowercase();
        FORMAT_TABLE
            .iter()
            .find(|(k, _)| *k == normalized)
            .map(|(_, format)| *format)
            .ok_or_else(|| TeaserError::unsupported_format(key))
    }

    /// The encoding identifier (MIME type).
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for OutputFormat {
    type Err = TeaserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
    }
}

/// Encoder quality in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct OutputQuality(f64);

impl OutputQuality {
    pub const MAX: OutputQuality = OutputQuality(1.0);

    pub fn new(value: f64) -> TeaserResult<Self> {
        // Also rejects NaN.
        if !(0.0..=1.0).contains(&value) {
            return Err(TeaserError::invalid_quality(format!(
                "{value} is outside [0, 1]"
            )));
        }
        Ok(Self(value))
    }

    /// Parse a numeric string such as `"0.75"`.
    pub fn parse(text: &str) -> TeaserResult<Self> {
        let value = text.trim().parse::<f64>().map_err(|_| {
            TeaserError::invalid_quality(format!("{text:?} is not a number"))
        })?;
        Self::new(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Quality as a 1..=100 percentage, the scale JPEG encoders take.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for OutputQuality {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for OutputQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OutputQuality {
    type Err = TeaserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<f64> for OutputQuality {
    type Error = TeaserError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for OutputQuality {
    type Error = TeaserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<OutputQuality> for f64 {
    fn from(value: OutputQuality) -> Self {
        value.0
    }
}
