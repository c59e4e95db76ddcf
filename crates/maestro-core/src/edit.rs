//! Source spans and the patch engine used to rewrite manifest files.
//!
//! Spans are 1-indexed with an inclusive start and an exclusive end, matching
//! what the language analyzers report. Patching streams the file character by
//! character so replacements never disturb surrounding bytes, which keeps
//! release commits byte-deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A region of a source file addressed by line and column, both 1-indexed.
/// The start is inclusive, the end exclusive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub const ZERO: Span = Span {
        start_line: 0,
        start_column: 0,
        end_line: 0,
        end_column: 0,
    };

    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn start(&self) -> (usize, usize) {
        (self.start_line, self.start_column)
    }

    pub fn end(&self) -> (usize, usize) {
        (self.end_line, self.end_column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

/// A single replacement: the span is removed and the string inserted in its
/// place. An empty span (end not past the start) is a pure insertion.
pub type Patch = (Span, String);

type Point = (usize, usize);

/// Apply `patches` to `text` and return the patched result.
///
/// When several patches share a start point, the one reaching furthest wins.
/// Patches are expected not to overlap otherwise.
pub fn patch_str(text: &str, patches: &[Patch]) -> String {
    // start -> (end, replacement); BTreeMap keeps application order stable.
    let mut patchmap: BTreeMap<Point, (Point, &str)> = BTreeMap::new();
    for (span, replacement) in patches {
        let start = span.start();
        let end = span.end();
        match patchmap.get(&start) {
            Some((existing_end, _)) if end < *existing_end => {}
            _ => {
                patchmap.insert(start, (end, replacement));
            }
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut skip_until: Option<Point> = None;

    for (point, ch) in enumerate_points(text) {
        if let Some(end) = skip_until {
            if point < end {
                continue;
            }
            skip_until = None;
        }

        if let Some((end, replacement)) = patchmap.get(&point) {
            out.push_str(replacement);
            if *end > point {
                skip_until = Some(*end);
                continue;
            }
        }

        if let Some(ch) = ch {
            out.push(ch);
        }
    }

    out
}

/// Apply `patches` to the file at `path` in place.
pub fn patch_file(path: &Path, patches: &[Patch]) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let patched = patch_str(&text, patches);
    std::fs::write(path, patched)?;
    Ok(())
}

/// Yield every character with its 1-indexed (line, column) point, followed by
/// a final pseudo-EOF point so patches touching the end of input resolve.
fn enumerate_points(text: &str) -> impl Iterator<Item = (Point, Option<char>)> + '_ {
    let mut line = 1usize;
    let mut column = 1usize;
    let mut done = false;

    let mut chars = text.chars();
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        match chars.next() {
            Some(ch) => {
                let point = (line, column);
                if ch == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
                Some((point, Some(ch)))
            }
            None => {
                done = true;
                Some(((line, column), None))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(sl: usize, sc: usize, el: usize, ec: usize) -> Span {
        Span::new(sl, sc, el, ec)
    }

    #[test]
    fn test_patch_single_span() {
        let text = "version: \"1.0.0\"\n";
        let patches = vec![(span(1, 10, 1, 17), "\"2.0.0\"".to_string())];
        assert_eq!(patch_str(text, &patches), "version: \"2.0.0\"\n");
    }

    #[test]
    fn test_patch_replacement_with_different_length() {
        let text = "abc def ghi";
        let patches = vec![(span(1, 5, 1, 8), "longer-text".to_string())];
        assert_eq!(patch_str(text, &patches), "abc longer-text ghi");
    }

    #[test]
    fn test_patch_multiple_spans_one_line() {
        let text = "aaa bbb ccc\n";
        let patches = vec![
            (span(1, 1, 1, 4), "X".to_string()),
            (span(1, 9, 1, 12), "Y".to_string()),
        ];
        assert_eq!(patch_str(text, &patches), "X bbb Y\n");
    }

    #[test]
    fn test_patch_across_lines() {
        let text = "one\ntwo\nthree\n";
        let patches = vec![(span(1, 3, 3, 3), "!".to_string())];
        assert_eq!(patch_str(text, &patches), "on!ree\n");
    }

    #[test]
    fn test_patch_on_later_line() {
        let text = "deps do\n  {:core, \"~> 1.0\"},\nend\n";
        let patches = vec![(span(2, 12, 2, 20), "\"~> 2.0\"".to_string())];
        assert_eq!(
            patch_str(text, &patches),
            "deps do\n  {:core, \"~> 2.0\"},\nend\n"
        );
    }

    #[test]
    fn test_patch_insertion_at_point() {
        let text = "abcdef";
        let patches = vec![(span(1, 4, 1, 4), "-".to_string())];
        assert_eq!(patch_str(text, &patches), "abc-def");
    }

    #[test]
    fn test_patch_insertion_at_start() {
        let text = "abc";
        let patches = vec![(span(1, 1, 1, 1), ">".to_string())];
        assert_eq!(patch_str(text, &patches), ">abc");
    }

    #[test]
    fn test_patch_at_end_of_input() {
        let text = "abc";
        let patches = vec![(span(1, 4, 1, 4), "def".to_string())];
        assert_eq!(patch_str(text, &patches), "abcdef");
    }

    #[test]
    fn test_longest_patch_per_start_wins() {
        let text = "abcdef";
        let patches = vec![
            (span(1, 1, 1, 3), "X".to_string()),
            (span(1, 1, 1, 5), "Y".to_string()),
        ];
        assert_eq!(patch_str(text, &patches), "Yef");
    }

    #[test]
    fn test_no_patches_is_identity() {
        let text = "unchanged\ncontent\n";
        assert_eq!(patch_str(text, &[]), text);
    }

    #[test]
    fn test_patch_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("mix.exs");
        std::fs::write(&file, "version: \"0.1.0\"\n").unwrap();

        patch_file(&file, &[(span(1, 10, 1, 17), "\"0.2.0\"".to_string())]).unwrap();

        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "version: \"0.2.0\"\n"
        );
    }

    #[test]
    fn test_span_display() {
        assert_eq!(span(1, 2, 3, 4).to_string(), "1:2 - 3:4");
    }
}
