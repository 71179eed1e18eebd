//! Sparse 2-D character canvas with styled serialisation.
//!
//! The compositor writes styled segments at absolute cell positions;
//! the canvas parses them into per-cell entries carrying the SGR state
//! active at that cell, then serialises rows back into a minimal escape
//! stream (opens on style transitions, closes at run ends).
//!
//! Wide glyphs reserve a continuation column; zero-width clusters merge
//! into the cell before them; cells rejected by the clip stack are
//! dropped together with any escape sequences attached to them.

use crate::ansi::parse::{cluster_width, sgr_params, tokens, SgrState, Token};
use crate::compose::clip::ClipStack;
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

/// One written cell.
#[derive(Clone, Debug)]
pub struct CanvasCell {
    /// Grapheme cluster plus any zero-width clusters merged into it.
    pub content: String,
    /// Cells occupied (1 or 2).
    pub width: u8,
    /// SGR state active when the cell was written.
    pub state: SgrState,
    /// Foreign escape sequences attached in front of this cell.
    pub prefix: String,
}

#[derive(Clone, Debug)]
enum Slot {
    Cell(CanvasCell),
    /// Second column of a wide glyph.
    Continuation,
}

/// Sparse canvas mapping `(row, col)` to cells.
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    rows: BTreeMap<i32, BTreeMap<i32, Slot>>,
}

impl Canvas {
    /// Create an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write a styled segment starting at `(x, y)`, clipping each cell
    /// against the active clip stack.
    pub fn write_text(&mut self, x: i32, y: i32, styled: &str, clip: &ClipStack) {
        let mut state = SgrState::default();
        let mut pending_prefix = String::new();
        let mut col = x;
        let mut last_written: Option<i32> = None;

        for token in tokens(styled) {
            match token {
                Token::Escape(esc) => {
                    if sgr_params(esc).is_some() {
                        state.apply_sequence(esc);
                    } else {
                        pending_prefix.push_str(esc);
                    }
                }
                Token::Text(text) => {
                    for cluster in text.graphemes(true) {
                        let width = cluster_width(cluster);
                        if width == 0 {
                            // Combining marks merge into the preceding column.
                            if let Some(prev) = last_written {
                                if let Some(Slot::Cell(cell)) = self
                                    .rows
                                    .get_mut(&y)
                                    .and_then(|row| row.get_mut(&prev))
                                {
                                    cell.content.push_str(cluster);
                                }
                            }
                            continue;
                        }

                        let allowed =
                            (0..width).all(|i| clip.contains(col + i as i32, y));
                        if allowed {
                            self.put(
                                col,
                                y,
                                CanvasCell {
                                    content: cluster.to_string(),
                                    width: width as u8,
                                    state: state.clone(),
                                    prefix: std::mem::take(&mut pending_prefix),
                                },
                            );
                            last_written = Some(col);
                        } else {
                            // Clipped cells discard their attached escapes.
                            pending_prefix.clear();
                            last_written = None;
                        }
                        col += width as i32;
                    }
                }
            }
        }
    }

    /// Place a cell, fixing up any wide glyph it overlaps.
    fn put(&mut self, col: i32, row: i32, cell: CanvasCell) {
        let width = i32::from(cell.width);
        for offset in 0..width {
            self.displace(col + offset, row);
        }

        let row_map = self.rows.entry(row).or_default();
        row_map.insert(col, Slot::Cell(cell));
        for offset in 1..width {
            row_map.insert(col + offset, Slot::Continuation);
        }
    }

    /// Clear the slot at `(col, row)`; if it is half of a wide glyph,
    /// the surviving half becomes a plain space.
    fn displace(&mut self, col: i32, row: i32) {
        let Some(row_map) = self.rows.get_mut(&row) else {
            return;
        };
        match row_map.remove(&col) {
            None => {}
            Some(Slot::Cell(cell)) => {
                if cell.width == 2 {
                    row_map.insert(
                        col + 1,
                        Slot::Cell(CanvasCell {
                            content: " ".to_string(),
                            width: 1,
                            state: cell.state,
                            prefix: String::new(),
                        }),
                    );
                }
            }
            Some(Slot::Continuation) => {
                if let Some(Slot::Cell(origin)) = row_map.get(&(col - 1)).cloned() {
                    row_map.insert(
                        col - 1,
                        Slot::Cell(CanvasCell {
                            content: " ".to_string(),
                            width: 1,
                            state: origin.state,
                            prefix: origin.prefix,
                        }),
                    );
                }
            }
        }
    }

    /// Serialise the canvas into a styled string and its line count.
    ///
    /// Rows are walked left-to-right, emitting style transitions between
    /// runs and closing everything at the end of each row, so the stream
    /// stays valid on terminals that do not track state across lines.
    /// Rows above the last written row are included as empty lines;
    /// trailing empty rows do not exist by construction.
    #[must_use]
    pub fn serialize(&self) -> (String, usize) {
        let Some(&max_row) = self.rows.keys().next_back() else {
            return (String::new(), 0);
        };
        let max_row = max_row.max(0);

        let mut lines = Vec::with_capacity(max_row as usize + 1);
        for row in 0..=max_row {
            lines.push(self.serialize_row(row));
        }
        let height = lines.len();
        (lines.join("\n"), height)
    }

    fn serialize_row(&self, row: i32) -> String {
        let Some(row_map) = self.rows.get(&row) else {
            return String::new();
        };

        let mut out = String::new();
        let mut state = SgrState::default();
        let mut cursor = 0i32;

        for (&col, slot) in row_map {
            if col < 0 {
                continue;
            }
            let Slot::Cell(cell) = slot else {
                continue;
            };
            if col > cursor {
                // Unwritten gap: plain spaces.
                out.push_str(&state.transition_to(&SgrState::default()));
                state = SgrState::default();
                for _ in cursor..col {
                    out.push(' ');
                }
            }
            out.push_str(&state.transition_to(&cell.state));
            state = cell.state.clone();
            out.push_str(&cell.prefix);
            out.push_str(&cell.content);
            cursor = col + i32::from(cell.width);
        }

        out.push_str(&state.close_all());
        out
    }
}
