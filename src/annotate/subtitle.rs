//! Caption cues and the SubRip (.srt) parser.
//!
//! The parser is a small line-driven state machine: every block is
//! `ordinal`, `start --> end`, then one or more text lines, and blocks are
//! separated by blank lines. A malformed block fails the whole parse so a
//! caption is never dropped silently.

use serde::Serialize;

use super::timecode::parse_timestamp;
use crate::error::{PipelineError, Result};

/// A single caption cue with timing and text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionEntry {
    index: u32,
    start: f64,
    end: f64,
    text: String,
}

impl CaptionEntry {
    /// Create a cue, rejecting windows where `end <= start`.
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Result<Self> {
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || end <= start {
            return Err(PipelineError::InvalidCueWindow { index, start, end });
        }

        Ok(Self {
            index,
            start,
            end,
            text: text.into(),
        })
    }

    /// Ordinal from the source file. Diagnostics only.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Start time in seconds
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Always positive.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Display text, lines joined with `\n`
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Where the parser is inside the current block.
enum BlockState {
    /// Between blocks, skipping blank lines.
    Idle,
    /// Saw the ordinal, the timing line must follow.
    Ordinal { index: u32, first_line: usize },
    /// Saw ordinal and timing, collecting text.
    Text {
        index: u32,
        first_line: usize,
        start: f64,
        end: f64,
        lines: Vec<String>,
    },
}

/// Parse SRT content into caption entries, preserving block order.
pub fn parse_captions(content: &str) -> Result<Vec<CaptionEntry>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut entries = Vec::new();
    let mut state = BlockState::Idle;
    let mut block = 0usize;

    for (lineno, raw) in content.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim_end_matches('\r');
        let blank = line.trim().is_empty();

        state = match state {
            BlockState::Idle if blank => BlockState::Idle,
            BlockState::Idle => {
                block += 1;
                let index = parse_ordinal(line.trim()).ok_or_else(|| {
                    PipelineError::MalformedCaptionBlock {
                        block,
                        line: lineno,
                        reason: format!("expected a positive cue number, got {:?}", line.trim()),
                    }
                })?;
                BlockState::Ordinal {
                    index,
                    first_line: lineno,
                }
            }
            BlockState::Ordinal { first_line, .. } if blank => {
                return Err(PipelineError::MalformedCaptionBlock {
                    block,
                    line: first_line,
                    reason: "block ends before its time range".to_string(),
                });
            }
            BlockState::Ordinal { index, first_line } => {
                let (start, end) = parse_time_range(line).ok_or_else(|| {
                    PipelineError::MalformedCaptionBlock {
                        block,
                        line: lineno,
                        reason: format!("expected 'start --> end', got {:?}", line.trim()),
                    }
                })?;
                BlockState::Text {
                    index,
                    first_line,
                    start: parse_timestamp(start)?,
                    end: parse_timestamp(end)?,
                    lines: Vec::new(),
                }
            }
            BlockState::Text {
                index,
                first_line,
                start,
                end,
                lines,
            } if blank => {
                entries.push(finish_block(block, first_line, index, start, end, lines)?);
                BlockState::Idle
            }
            BlockState::Text {
                index,
                first_line,
                start,
                end,
                mut lines,
            } => {
                lines.push(line.to_string());
                BlockState::Text {
                    index,
                    first_line,
                    start,
                    end,
                    lines,
                }
            }
        };
    }

    // Input may end without a trailing blank line
    match state {
        BlockState::Idle => {}
        BlockState::Ordinal { first_line, .. } => {
            return Err(PipelineError::MalformedCaptionBlock {
                block,
                line: first_line,
                reason: "block ends before its time range".to_string(),
            });
        }
        BlockState::Text {
            index,
            first_line,
            start,
            end,
            lines,
        } => entries.push(finish_block(block, first_line, index, start, end, lines)?),
    }

    Ok(entries)
}

fn finish_block(
    block: usize,
    first_line: usize,
    index: u32,
    start: f64,
    end: f64,
    lines: Vec<String>,
) -> Result<CaptionEntry> {
    if lines.is_empty() {
        return Err(PipelineError::MalformedCaptionBlock {
            block,
            line: first_line,
            reason: "missing caption text".to_string(),
        });
    }
    CaptionEntry::new(index, start, end, lines.join("\n"))
}

fn parse_ordinal(line: &str) -> Option<u32> {
    if !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    line.parse().ok().filter(|&n| n > 0)
}

/// Split "HH:MM:SS,mmm --> HH:MM:SS,mmm" into its two trimmed halves.
fn parse_time_range(line: &str) -> Option<(&str, &str)> {
    let (start, end) = line.split_once("-->")?;
    if end.contains("-->") {
        return None;
    }
    Some((start.trim(), end.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CUES: &str = "1
00:00:01,000 --> 00:00:03,000
Hello world

2
00:00:04,500 --> 00:00:06,000
Second line
";

    #[test]
    fn test_parse_two_cues() {
        let entries = parse_captions(TWO_CUES).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].start(), 1.0);
        assert_eq!(entries[0].end(), 3.0);
        assert_eq!(entries[0].text(), "Hello world");
        assert_eq!(entries[1].start(), 4.5);
        assert_eq!(entries[1].end(), 6.0);
        assert_eq!(entries[1].text(), "Second line");
    }

    #[test]
    fn test_trailing_blank_blocks_ignored() {
        let content = format!("{TWO_CUES}\n\n   \n\n");
        assert_eq!(parse_captions(&content).unwrap().len(), 2);
    }

    #[test]
    fn test_multiline_text_and_crlf() {
        let content = "1\r\n00:00:00,000 --> 00:00:02,000\r\nThis is a test.\r\nWith multiple lines.\r\n\r\n";
        let entries = parse_captions(content).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text(), "This is a test.\nWith multiple lines.");
        assert_eq!(entries[0].lines().count(), 2);
    }

    #[test]
    fn test_source_order_kept_over_ordinals() {
        let content = "7
00:00:05,000 --> 00:00:06,000
later number first

3
00:00:01,000 --> 00:00:02,000
earlier number second
";
        let entries = parse_captions(content).unwrap();
        assert_eq!(entries[0].index(), 7);
        assert_eq!(entries[1].index(), 3);
    }

    #[test]
    fn test_block_without_text_fails() {
        let content = "1
00:00:01,000 --> 00:00:03,000

2
00:00:04,000 --> 00:00:05,000
ok
";
        let err = parse_captions(content).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MalformedCaptionBlock { block: 1, .. }
        ));
    }

    #[test]
    fn test_block_without_text_at_eof_fails() {
        let err = parse_captions("1\n00:00:01,000 --> 00:00:03,000\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedCaptionBlock { .. }));
    }

    #[test]
    fn test_missing_time_range_fails() {
        let err = parse_captions("1\nHello world\n").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MalformedCaptionBlock { block: 1, line: 2, .. }
        ));
    }

    #[test]
    fn test_bad_ordinal_fails() {
        let err = parse_captions("one\n00:00:01,000 --> 00:00:02,000\nx\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedCaptionBlock { .. }));
    }

    #[test]
    fn test_bad_timestamp_surfaces() {
        let err = parse_captions("1\n00:00:01.000 --> 00:00:02,000\nx\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = parse_captions("1\n00:00:03,000 --> 00:00:03,000\nx\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidCueWindow { index: 1, .. }));
    }

    #[test]
    fn test_entry_constructor_invariant() {
        assert!(CaptionEntry::new(1, 2.0, 1.0, "x").is_err());
        assert!(CaptionEntry::new(1, 2.0, 2.0, "x").is_err());
        assert!(CaptionEntry::new(1, f64::NAN, 2.0, "x").is_err());
        let entry = CaptionEntry::new(1, 1.0, 2.5, "x").unwrap();
        assert_eq!(entry.duration(), 1.5);
    }

    #[test]
    fn test_bom_and_empty_input() {
        assert!(parse_captions("").unwrap().is_empty());
        let with_bom = format!("\u{feff}{TWO_CUES}");
        assert_eq!(parse_captions(&with_bom).unwrap().len(), 2);
    }
}
