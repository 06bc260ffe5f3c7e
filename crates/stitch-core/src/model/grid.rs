use super::Tile;
use crate::error::{Result, StitchError};

/// Dense `H x W` container of tiles. Missing cells (sparse stage schedules)
/// are represented as `None`.
pub struct Grid {
    height: usize,
    width: usize,
    tiles: Vec<Option<Tile>>,
}

impl Grid {
    pub fn from_tiles(height: usize, width: usize, tiles: Vec<Option<Tile>>) -> Self {
        assert_eq!(tiles.len(), height * width, "tile vector size mismatch");
        Self {
            height,
            width,
            tiles,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn index(&self, r: usize, c: usize) -> Option<usize> {
        if r < self.height && c < self.width {
            Some(r * self.width + c)
        } else {
            None
        }
    }

    pub fn get(&self, r: usize, c: usize) -> Option<&Tile> {
        self.index(r, c).and_then(|i| self.tiles[i].as_ref())
    }

    pub fn get_mut(&mut self, r: usize, c: usize) -> Option<&mut Tile> {
        self.index(r, c).and_then(|i| self.tiles[i].as_mut())
    }

    /// The west neighbor of `(r, c)`, i.e. `(r, c-1)`.
    pub fn west_of(&self, r: usize, c: usize) -> Option<&Tile> {
        if c == 0 {
            return None;
        }
        self.get(r, c - 1)
    }

    /// The north neighbor of `(r, c)`, i.e. `(r-1, c)`.
    pub fn north_of(&self, r: usize, c: usize) -> Option<&Tile> {
        if r == 0 {
            return None;
        }
        self.get(r - 1, c)
    }

    /// Iterate tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter_map(|t| t.as_ref())
    }

    pub fn iter_coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height).flat_map(move |r| (0..self.width).map(move |c| (r, c)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared `(height, width)` of every tile's pixel buffer, read from
    /// the first present tile. Does not itself check the other tiles; call
    /// [`Grid::validate_shapes`] once up front to enforce the grid-wide
    /// invariant before any stage reads pixels.
    pub fn image_shape(&self) -> Result<(usize, usize)> {
        let tile = self
            .iter()
            .next()
            .expect("image_shape called on an empty grid");
        let data = tile.pixels()?;
        Ok(data.dim())
    }

    /// Reads every present tile once and confirms they all share the same
    /// pixel shape, the invariant spec section 3 requires once any tile has
    /// been read. Surfaces a named [`StitchError::InconsistentTileShape`]
    /// instead of letting a later stage index out of bounds.
    pub fn validate_shapes(&self) -> Result<(usize, usize)> {
        let mut expected: Option<(usize, usize)> = None;
        for tile in self.iter() {
            let shape = tile.pixels()?.dim();
            match expected {
                None => expected = Some(shape),
                Some(e) if e != shape => {
                    return Err(StitchError::InconsistentTileShape {
                        name: tile.name.clone(),
                        expected: e,
                        actual: shape,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(expected.expect("validate_shapes called on an empty grid"))
    }
}
