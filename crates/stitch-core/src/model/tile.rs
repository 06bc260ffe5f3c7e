use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ndarray::Array2;

use crate::error::Result;

use super::{Direction, Peak};

/// Lazy pixel source for a single tile. Implementors decode whatever is on
/// disk into a normalized grayscale `(H, W)` array.
pub trait PixelReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Array2<f32>>;
}

/// One acquired image at a grid cell, plus the edges PCE/SM/RF/GP attach to it.
pub struct Tile {
    pub r: usize,
    pub c: usize,
    pub name: String,
    path: PathBuf,
    reader: Arc<dyn PixelReader>,
    disable_cache: bool,
    cache: Mutex<Option<Array2<f32>>>,

    /// Translation from the left neighbor, `Some` only when `(r, c-1)` exists.
    pub west_translation: Option<Peak>,
    /// Translation from the top neighbor, `Some` only when `(r-1, c)` exists.
    pub north_translation: Option<Peak>,

    pub abs_x: i32,
    pub abs_y: i32,
}

impl Tile {
    pub fn new(
        r: usize,
        c: usize,
        name: String,
        path: PathBuf,
        reader: Arc<dyn PixelReader>,
        disable_cache: bool,
    ) -> Self {
        Self {
            r,
            c,
            name,
            path,
            reader,
            disable_cache,
            cache: Mutex::new(None),
            west_translation: None,
            north_translation: None,
            abs_x: 0,
            abs_y: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The edge Peak for the given axis (`north_translation` for Vertical,
    /// `west_translation` for Horizontal).
    pub fn peak(&self, axis: Direction) -> Option<Peak> {
        match axis {
            Direction::Vertical => self.north_translation,
            Direction::Horizontal => self.west_translation,
        }
    }

    pub fn set_peak(&mut self, axis: Direction, peak: Peak) {
        match axis {
            Direction::Vertical => self.north_translation = Some(peak),
            Direction::Horizontal => self.west_translation = Some(peak),
        }
    }

    /// Read this tile's pixels, either from the on-first-read cache or fresh
    /// from disk when `disable_cache` is set.
    pub fn pixels(&self) -> Result<Array2<f32>> {
        if self.disable_cache {
            return self.reader.read(&self.path);
        }
        let mut slot = self.cache.lock().expect("tile pixel cache poisoned");
        if let Some(data) = slot.as_ref() {
            return Ok(data.clone());
        }
        let data = self.reader.read(&self.path)?;
        *slot = Some(data.clone());
        Ok(data)
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("r", &self.r)
            .field("c", &self.c)
            .field("name", &self.name)
            .field("west_translation", &self.west_translation)
            .field("north_translation", &self.north_translation)
            .field("abs_x", &self.abs_x)
            .field("abs_y", &self.abs_y)
            .finish()
    }
}
