//! Grid shape: columns x rows.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use teaser_common::error::{TeaserError, TeaserResult};

/// Two ASCII-digit integers separated by `,` `;` `.` space `x` or `X`.
static DIMENSIONS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9]+)\s*[;,. xX]\s*([0-9]+)\s*$").expect("dimensions pattern is valid")
});

/// Upper bound on `columns * rows`. Every cell owns a region and is
/// repainted on each resize, so larger grids are refused up front.
pub const MAX_CELLS: usize = 4096;

const USAGE: &str = "expected two positive integers such as \"2,2\" or \"3x2\"";

/// A validated grid shape. Both sides are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridDimensions {
    columns: u32,
    rows: u32,
}

impl GridDimensions {
    pub fn new(columns: u32, rows: u32) -> TeaserResult<Self> {
        if columns == 0 || rows == 0 {
            return Err(TeaserError::invalid_geometry(format!(
                "{columns}x{rows} has an empty side; {USAGE}"
            )));
        }
        match (columns as usize).checked_mul(rows as usize) {
            Some(cells) if cells <= MAX_CELLS => {}
            _ => {
                return Err(TeaserError::invalid_geometry(format!(
                    "{columns}x{rows} exceeds the limit of {MAX_CELLS} cells"
                )))
            }
        }
        Ok(Self { columns, rows })
    }

    /// Parse the textual form used by the `dimensions` attribute.
    pub fn parse(text: &str) -> TeaserResult<Self> {
        let captures = DIMENSIONS_PATTERN.captures(text).ok_or_else(|| {
            TeaserError::invalid_geometry(format!("{text:?} is not a grid description; {USAGE}"))
        })?;

        let side = |i: usize| -> TeaserResult<u32> {
            captures[i].parse::<u32>().map_err(|_| {
                TeaserError::invalid_geometry(format!("{:?} is too large", &captures[i]))
            })
        };
        Self::new(side(1)?, side(2)?)
    }

    /// Build from a `[columns, rows]` sequence. Anything but two elements fails.
    pub fn from_slice(values: &[u32]) -> TeaserResult<Self> {
        match values {
            [columns, rows] => Self::new(*columns, *rows),
            _ => Err(TeaserError::invalid_geometry(format!(
                "got {} values; {USAGE}",
                values.len()
            ))),
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of regions a grid of this shape holds.
    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// `[columns, rows]`, the programmatic getter shape.
    pub fn to_array(&self) -> [u32; 2] {
        [self.columns, self.rows]
    }
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self {
            columns: 2,
            rows: 2,
        }
    }
}

impl fmt::Display for GridDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.columns, self.rows)
    }
}

impl FromStr for GridDimensions {
    type Err = TeaserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for GridDimensions {
    type Error = TeaserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for GridDimensions {
    type Error = TeaserError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GridDimensions> for String {
    fn from(value: GridDimensions) -> Self {
        value.to_string()
    }
}

impl TryFrom<&[u32]> for GridDimensions {
    type Error = TeaserError;

    fn try_from(value: &[u32]) -> Result<Self, Self::Error> {
        Self::from_slice(value)
    }
}

impl<const N: usize> TryFrom<[u32; N]> for GridDimensions {
    type Error = TeaserError;

    fn try_from(value: [u32; N]) -> Result<Self, Self::Error> {
        Self::from_slice(&value)
    }
}

impl TryFrom<Vec<u32>> for GridDimensions {
    type Error = TeaserError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_slice(&value)
    }
}

impl TryFrom<(u32, u32)> for GridDimensions {
    type Error = TeaserError;

    fn try_from((columns, rows): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(columns, rows)
    }
}
