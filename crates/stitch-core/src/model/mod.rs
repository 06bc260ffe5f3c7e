mod grid;
mod tile;

pub use grid::Grid;
pub use tile::{PixelReader, Tile};

/// The two axes a Peak can describe. Never a bare string: `Vertical` is the
/// "north" edge (y-axis primary), `Horizontal` is the "west" edge (x-axis
/// primary).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Vertical,
    Horizontal,
}

impl Direction {
    pub fn edge_name(self) -> &'static str {
        match self {
            Direction::Vertical => "north",
            Direction::Horizontal => "west",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Vertical => write!(f, "VERTICAL"),
            Direction::Horizontal => write!(f, "HORIZONTAL"),
        }
    }
}

/// A translation candidate between two tiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Normalized cross-correlation in `[-1, 1]`, or NaN meaning "invalid".
    pub ncc: f32,
    /// Integer pixel offset from neighbor to self.
    pub x: i32,
    pub y: i32,
}

impl Peak {
    pub fn new(ncc: f32, x: i32, y: i32) -> Self {
        Self { ncc, x, y }
    }

    /// A Peak with no correlation information, placed at the origin.
    pub fn invalid() -> Self {
        Self {
            ncc: f32::NAN,
            x: 0,
            y: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.ncc.is_finite()
    }

    /// The component of `(x, y)` on the given axis's primary direction
    /// (y for Vertical, x for Horizontal).
    pub fn primary(&self, axis: Direction) -> i32 {
        match axis {
            Direction::Vertical => self.y,
            Direction::Horizontal => self.x,
        }
    }

    pub fn set_primary(&mut self, axis: Direction, value: i32) {
        match axis {
            Direction::Vertical => self.y = value,
            Direction::Horizontal => self.x = value,
        }
    }

    /// The component orthogonal to the axis's primary direction.
    pub fn orthogonal(&self, axis: Direction) -> i32 {
        match axis {
            Direction::Vertical => self.x,
            Direction::Horizontal => self.y,
        }
    }

    pub fn set_orthogonal(&mut self, axis: Direction, value: i32) {
        match axis {
            Direction::Vertical => self.x = value,
            Direction::Horizontal => self.y = value,
        }
    }
}
