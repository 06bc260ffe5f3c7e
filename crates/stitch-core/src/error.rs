use std::path::PathBuf;

use thiserror::Error;

use crate::model::Direction;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),

    #[error("Unknown filename pattern type: {0}")]
    UnknownFilenamePattern(String),

    #[error("Filename pattern contains a time field but no --time-slice was given")]
    MissingTimeSlice,

    #[error("no valid translations on axis {axis:?} to estimate overlap from")]
    NoTranslations { axis: Direction },

    #[error("non-finite overlap inferred on axis {axis:?}: {value}")]
    NonFiniteOverlap { axis: Direction, value: f32 },

    #[error("no seed tile found for global positioning (grid has no finite edges)")]
    NoSeedTile,

    #[error("global position traversal only reached {visited}/{total} tiles")]
    Disconnected { visited: usize, total: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tile {name} has shape {actual:?}, expected {expected:?} (all tiles must share one image shape)")]
    InconsistentTileShape {
        name: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, StitchError>;
