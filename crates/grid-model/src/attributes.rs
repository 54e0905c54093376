//! Declarative settings, as they arrive from the host as name/value text.
//!
//! Parsing is kept separate from the compositor's setters: an attribute
//! string becomes an [`AttributeChange`] holding an already-validated value,
//! and only that structured value reaches the compositor.

use serde::{Deserialize, Serialize};

use teaser_common::config::TeaserDefaults;
use teaser_common::error::TeaserResult;

use crate::dimensions::GridDimensions;
use crate::format::{OutputFormat, OutputQuality};

pub const ATTR_DIMENSIONS: &str = "dimensions";
pub const ATTR_OUTPUT_FORMAT: &str = "output-format";
pub const ATTR_OUTPUT_QUALITY: &str = "output-quality";

/// A validated change to one declarative setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeChange {
    Dimensions(GridDimensions),
    OutputFormat(OutputFormat),
    OutputQuality(OutputQuality),
}

impl AttributeChange {
    /// Parse one attribute. Returns `Ok(None)` for names the grid does not
    /// observe; invalid values for known names are errors.
    pub fn parse(name: &str, value: &str) -> TeaserResult<Option<Self>> {
        let change = match name {
            ATTR_DIMENSIONS => Self::Dimensions(GridDimensions::parse(value)?),
            ATTR_OUTPUT_FORMAT => Self::OutputFormat(OutputFormat::from_key(value)?),
            ATTR_OUTPUT_QUALITY => Self::OutputQuality(OutputQuality::parse(value)?),
            _ => {
                tracing::debug!(attribute = name, "Ignoring unobserved attribute");
                return Ok(None);
            }
        };
        Ok(Some(change))
    }
}

/// The full set of declarative settings for one grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeaserAttributes {
    pub dimensions: GridDimensions,
    pub output_format: OutputFormat,
    pub output_quality: OutputQuality,
}

impl TeaserAttributes {
    /// Validate the textual defaults from the application config.
    pub fn from_defaults(defaults: &TeaserDefaults) -> TeaserResult<Self> {
        Ok(Self {
            dimensions: GridDimensions::parse(&defaults.dimensions)?,
            output_format: OutputFormat::from_key(&defaults.output_format)?,
            output_quality: OutputQuality::parse(&defaults.output_quality)?,
        })
    }

    /// Build from `(name, value)` pairs; unset attributes keep their defaults.
    pub fn from_pairs<'a, I>(pairs: I) -> TeaserResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut attributes = Self::default();
        for (name, value) in pairs {
            if let Some(change) = AttributeChange::parse(name, value)? {
                attributes.apply(change);
            }
        }
        Ok(attributes)
    }

    pub fn apply(&mut self, change: AttributeChange) {
        match change {
            AttributeChange::Dimensions(d) => self.dimensions = d,
            AttributeChange::OutputFormat(f) => self.output_format = f,
            AttributeChange::OutputQuality(q) => self.output_quality = q,
        }
    }

    /// The attribute changes that reproduce this configuration.
    pub fn changes(&self) -> [AttributeChange; 3] {
        [
            AttributeChange::Dimensions(self.dimensions),
            AttributeChange::OutputFormat(self.output_format),
            AttributeChange::OutputQuality(self.output_quality),
        ]
    }
}
