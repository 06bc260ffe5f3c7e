//! Filename-pattern expansion: maps a grid cell to the tile filename that
//! was captured there.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternType {
    Sequential,
    RowCol,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridOrigin {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

/// Meander order used to assign a sequential acquisition index to a
/// `(row, col)` cell. Combing reverses direction every other line;
/// continuous always restarts each line from the same edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberingPattern {
    HorizontalCombing,
    VerticalCombing,
    HorizontalContinuous,
    VerticalContinuous,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilenamePattern {
    pub pattern: String,
    pub pattern_type: PatternType,
    pub grid_origin: GridOrigin,
    pub numbering_pattern: NumberingPattern,
    pub start_row: usize,
    pub start_col: usize,
    pub start_tile: usize,
}

impl FilenamePattern {
    /// Expand this pattern for grid cell `(r, c)` (0-based, upper-left
    /// origin internally) in a grid of `height x width`, with an optional
    /// time slice.
    pub fn expand(&self, r: usize, c: usize, height: usize, width: usize, time: Option<usize>) -> Result<String> {
        let (file_row, file_col) = origin_transform(self.grid_origin, r, c, height, width);
        match self.pattern_type {
            PatternType::Sequential => {
                let index = self.start_tile + meander_index(self.numbering_pattern, file_row, file_col, height, width);
                expand_tokens(&self.pattern, file_row + self.start_row, file_col + self.start_col, Some(index), time)
            }
            PatternType::RowCol => expand_tokens(
                &self.pattern,
                file_row + self.start_row,
                file_col + self.start_col,
                None,
                time,
            ),
        }
    }
}

/// Remap an internal (upper-left-origin) `(r, c)` to the row/col index the
/// filename pattern actually counts from, given the corner numbering starts.
fn origin_transform(origin: GridOrigin, r: usize, c: usize, height: usize, width: usize) -> (usize, usize) {
    match origin {
        GridOrigin::UpperLeft => (r, c),
        GridOrigin::UpperRight => (r, width - 1 - c),
        GridOrigin::LowerLeft => (height - 1 - r, c),
        GridOrigin::LowerRight => (height - 1 - r, width - 1 - c),
    }
}

/// The acquisition-order index a meander (serpentine) scan assigns to cell
/// `(file_row, file_col)`: combing reverses direction on every other
/// line, continuous always restarts a line from the same edge.
fn meander_index(pattern: NumberingPattern, file_row: usize, file_col: usize, height: usize, width: usize) -> usize {
    match pattern {
        NumberingPattern::HorizontalContinuous => file_row * width + file_col,
        NumberingPattern::HorizontalCombing => {
            let col = if file_row % 2 == 0 { file_col } else { width - 1 - file_col };
            file_row * width + col
        }
        NumberingPattern::VerticalContinuous => file_col * height + file_row,
        NumberingPattern::VerticalCombing => {
            let row = if file_col % 2 == 0 { file_row } else { height - 1 - file_row };
            file_col * height + row
        }
    }
}

/// Replace `{rrr}`, `{ccc}`, `{ppp}`, `{ttt}` runs with zero-padded decimal
/// values, padding width equal to the run length. Errors if a time field is
/// present but no time slice was supplied, or a `{ppp}` field is present but
/// no sequential index applies (`RowCol` patterns never compute one).
fn expand_tokens(pattern: &str, row: usize, col: usize, seq: Option<usize>, time: Option<usize>) -> Result<String> {
    let mut out = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i..].iter().position(|&c| c == '}') {
                let end = i + end;
                let token: String = chars[i + 1..end].iter().collect();
                if !token.is_empty() && token.chars().all(|c| c == token.chars().next().unwrap()) {
                    let width = token.len();
                    match token.chars().next().unwrap() {
                        'r' => {
                            out.push_str(&format!("{:0width$}", row, width = width));
                            i = end + 1;
                            continue;
                        }
                        'c' => {
                            out.push_str(&format!("{:0width$}", col, width = width));
                            i = end + 1;
                            continue;
                        }
                        'p' => {
                            let p = seq.ok_or(StitchError::UnknownFilenamePattern(
                                "{ppp} field requires filename-pattern-type SEQUENTIAL".to_string(),
                            ))?;
                            out.push_str(&format!("{:0width$}", p, width = width));
                            i = end + 1;
                            continue;
                        }
                        't' => {
                            let t = time.ok_or(StitchError::MissingTimeSlice)?;
                            out.push_str(&format!("{:0width$}", t, width = width));
                            i = end + 1;
                            continue;
                        }
                        _ => {}
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_row_and_col_with_matching_width() {
        let s = expand_tokens("img_r{rrr}_c{cc}.tif", 4, 12, None, None).unwrap();
        assert_eq!(s, "img_r004_c12.tif");
    }

    #[test]
    fn missing_time_slice_is_an_error() {
        let err = expand_tokens("img_{rr}_{cc}_{t}.tif", 1, 1, None, None).unwrap_err();
        assert!(matches!(err, StitchError::MissingTimeSlice));
    }

    #[test]
    fn upper_right_origin_flips_columns() {
        assert_eq!(origin_transform(GridOrigin::UpperRight, 0, 0, 3, 5), (0, 4));
        assert_eq!(origin_transform(GridOrigin::LowerRight, 0, 0, 3, 5), (2, 4));
    }

    fn sequential_pattern(numbering_pattern: NumberingPattern) -> FilenamePattern {
        FilenamePattern {
            pattern: "img_{ppp}.tif".to_string(),
            pattern_type: PatternType::Sequential,
            grid_origin: GridOrigin::UpperLeft,
            numbering_pattern,
            start_row: 0,
            start_col: 0,
            start_tile: 0,
        }
    }

    #[test]
    fn horizontal_continuous_numbers_row_major() {
        let pattern = sequential_pattern(NumberingPattern::HorizontalContinuous);
        assert_eq!(pattern.expand(0, 0, 2, 3, None).unwrap(), "img_000.tif");
        assert_eq!(pattern.expand(0, 2, 2, 3, None).unwrap(), "img_002.tif");
        assert_eq!(pattern.expand(1, 0, 2, 3, None).unwrap(), "img_003.tif");
    }

    #[test]
    fn horizontal_combing_reverses_every_other_row() {
        let pattern = sequential_pattern(NumberingPattern::HorizontalCombing);
        // row 0 left-to-right: (0,0)=0, (0,1)=1, (0,2)=2
        // row 1 right-to-left: (1,2)=3, (1,1)=4, (1,0)=5
        assert_eq!(pattern.expand(0, 0, 2, 3, None).unwrap(), "img_000.tif");
        assert_eq!(pattern.expand(0, 2, 2, 3, None).unwrap(), "img_002.tif");
        assert_eq!(pattern.expand(1, 2, 2, 3, None).unwrap(), "img_003.tif");
        assert_eq!(pattern.expand(1, 0, 2, 3, None).unwrap(), "img_005.tif");
    }

    #[test]
    fn vertical_combing_reverses_every_other_column() {
        let pattern = sequential_pattern(NumberingPattern::VerticalCombing);
        // col 0 top-to-bottom: (0,0)=0, (1,0)=1
        // col 1 bottom-to-top: (1,1)=2, (0,1)=3
        assert_eq!(pattern.expand(0, 0, 2, 2, None).unwrap(), "img_000.tif");
        assert_eq!(pattern.expand(1, 0, 2, 2, None).unwrap(), "img_001.tif");
        assert_eq!(pattern.expand(1, 1, 2, 2, None).unwrap(), "img_002.tif");
        assert_eq!(pattern.expand(0, 1, 2, 2, None).unwrap(), "img_003.tif");
    }

    #[test]
    fn row_col_pattern_errors_on_a_ppp_token() {
        let pattern = FilenamePattern {
            pattern: "img_{ppp}.tif".to_string(),
            pattern_type: PatternType::RowCol,
            grid_origin: GridOrigin::UpperLeft,
            numbering_pattern: NumberingPattern::HorizontalCombing,
            start_row: 0,
            start_col: 0,
            start_tile: 0,
        };
        let err = pattern.expand(0, 0, 2, 2, None).unwrap_err();
        assert!(matches!(err, StitchError::UnknownFilenamePattern(_)));
    }
}
