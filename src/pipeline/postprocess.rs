//! Post-processing: deterministic cleanup of extracted and recognised text.
//!
//! Text layers and tesseract output both carry artefacts that are harmless
//! on screen but wrong in a Word document:
//!
//! - CRLF / CR line endings from Windows-produced PDFs
//! - form feeds (tesseract ends every page with `\x0c`) and other C0 control
//!   characters, which are illegal in the XML inside a `.docx`
//! - zero-width spaces, BOMs and soft hyphens left by PDF producers
//! - trailing whitespace and runs of blank lines from column layouts
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only has to handle
//! `\n`; control characters are removed before trimming so a trailing form
//! feed does not shield the whitespace in front of it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a page's raw text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip control characters other than `\n` and `\t`
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 2+ consecutive blank lines down to one
/// 6. Trim surrounding whitespace
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_control_chars(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Split cleaned text into paragraphs on blank lines.
///
/// Single newlines stay inside a paragraph; the DOCX writer turns them into
/// line breaks.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Flatten a message (e.g. an engine's stderr) to one clean line so it can be
/// embedded in placeholder text.
pub fn single_line(input: &str) -> String {
    let s = strip_control_chars(&normalise_line_endings(input));
    RE_WHITESPACE.replace_all(s.trim(), " ").to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip control characters ─────────────────────────────────────────

fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_form_feed_and_nul() {
        assert_eq!(strip_control_chars("page\x0c\x00 end\tx\n"), "page end\tx\n");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_clean_tesseract_output() {
        let raw = "Invoice 42  \r\nTotal: 10\n\n\n\nThanks\n\x0c";
        assert_eq!(clean_text(raw), "Invoice 42\nTotal: 10\n\nThanks");
    }

    #[test]
    fn test_clean_whitespace_only_is_empty() {
        assert_eq!(clean_text(" \n\t\x0c\n "), "");
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "First line\nstill first\n\nSecond\n \nThird";
        assert_eq!(
            split_paragraphs(text),
            vec!["First line\nstill first", "Second", "Third"]
        );
    }

    #[test]
    fn test_split_paragraphs_empty() {
        assert!(split_paragraphs("").is_empty());
    }

    #[test]
    fn test_single_line() {
        assert_eq!(
            single_line("Error opening data file\r\n  eng.traineddata\n"),
            "Error opening data file eng.traineddata"
        );
    }
}
