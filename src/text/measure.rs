//! Pure text measurement for the layout solver.

use crate::ansi::visible_width;
use crate::text::{wrap_text, WrapMode};

/// Measure `text` under a width budget.
///
/// Returns the natural width and line count when nothing overflows,
/// otherwise `min(natural, max_width)` and the reflowed line count.
/// Deterministic and free of side effects; the layout adapter caches
/// results per pass.
///
/// Edge cases: an empty string measures `(0, 0)`; a trailing newline
/// adds a final empty line; escape sequences never contribute width.
#[must_use]
pub fn measure(text: &str, max_width: usize, mode: WrapMode) -> (usize, usize) {
    if text.is_empty() {
        return (0, 0);
    }

    let mut natural = 0usize;
    let mut lines = 0usize;
    for line in text.split('\n') {
        natural = natural.max(visible_width(line));
        lines += 1;
    }

    if natural <= max_width {
        return (natural, lines);
    }

    let wrapped = wrap_text(text, max_width, mode);
    (natural.min(max_width), wrapped.len())
}
