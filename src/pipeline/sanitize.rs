//! Sanitizer: make arbitrary model text safe for the fixed-width PDF renderer.
//!
//! The report uses the PDF standard Courier fonts with WinAnsiEncoding, which
//! can only show single-byte Latin characters, and the layout engine lays
//! text out one physical line at a time. Model output routinely contains
//! emoji, smart quotes and unbroken table rows hundreds of characters long.
//! This module folds all of that into something the renderer can always
//! draw. It is lossy: the goal is "renders without error", not "keeps every
//! character".
//!
//! ## Rule Order
//!
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Canonical decomposition (NFD), then drop every character outside the
//!    single-byte set. Decomposing first turns `á` into `a` + a combining
//!    accent, so the base letter survives the filter. Compatibility forms
//!    are left alone: `½`, `µ` and `²` are Latin-1 already and keep their
//!    meaning in quantities like "10 µm".
//! 3. Hard-wrap each line at the configured width; continuation lines are
//!    indented by four spaces.
//!
//! Rules must run in this order: wrapping counts characters, so it has to
//! see the final character set.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::DEFAULT_WRAP_WIDTH;

/// Prefix of every continuation line produced by the wrapper.
pub const CONTINUATION_INDENT: &str = "    ";

const TAB_SIZE: usize = 8;

/// Sanitize `text` at the default 100-column width.
///
/// Idempotent: `sanitize(&sanitize(t)) == sanitize(t)`.
pub fn sanitize(text: &str) -> String {
    sanitize_with_width(text, DEFAULT_WRAP_WIDTH)
}

/// Sanitize optional text; `None` yields an empty string.
pub fn sanitize_opt(text: Option<&str>) -> String {
    text.map(sanitize).unwrap_or_default()
}

/// Sanitize `text`, wrapping lines longer than `width` characters.
pub fn sanitize_with_width(text: &str, width: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let s = normalise_line_endings(text);
    let s = strip_unencodable(&s);
    wrap_lines(&s, width)
}

/// Whether `c` survives the sanitizer's character filter.
///
/// The renderer accepts printable ASCII and the printable upper half of
/// Latin-1, which is also where WinAnsiEncoding agrees with Latin-1. Tabs
/// are kept here and expanded by the wrapper.
pub fn is_encodable(c: char) -> bool {
    c == '\n' || c == '\t' || matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Decompose and drop unencodable characters ───────────────────────

fn strip_unencodable(input: &str) -> String {
    input.nfd().filter(|&c| is_encodable(c)).collect()
}

// ── Rule 3: Wrap long lines ─────────────────────────────────────────────────

fn wrap_lines(input: &str, width: usize) -> String {
    input
        .split('\n')
        .map(|line| wrap_line(line, width).join("\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A run of spaces or a run of anything else.
static RE_CHUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r" +|[^ ]+").unwrap());

/// Wrap a single logical line.
///
/// Breaks happen between words where possible; a word longer than the
/// remaining room is split mid-word. Leading indentation of the first line
/// is kept, whitespace at a break is dropped, and trailing whitespace is
/// always removed. A blank line maps to a single empty line.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let expanded = expand_tabs(line);
    if char_len(&expanded) <= width {
        return vec![expanded.trim_end().to_string()];
    }

    // Reversed so the next chunk is always at the end of the Vec.
    let mut chunks: Vec<String> = RE_CHUNK
        .find_iter(&expanded)
        .map(|m| m.as_str().to_string())
        .collect();
    chunks.reverse();

    let mut lines: Vec<String> = Vec::new();
    while !chunks.is_empty() {
        let indent = if lines.is_empty() {
            ""
        } else {
            CONTINUATION_INDENT
        };
        let avail = width.saturating_sub(indent.len()).max(1);

        // Whitespace at the start of a continuation line is a break point.
        if !lines.is_empty() && chunks.last().is_some_and(|c| is_blank(c)) {
            chunks.pop();
        }

        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;
        while let Some(chunk) = chunks.last() {
            let len = char_len(chunk);
            if current_len + len > avail {
                break;
            }
            current_len += len;
            if let Some(chunk) = chunks.pop() {
                current.push(chunk);
            }
        }

        // Split a chunk that can never fit on a line of its own.
        if let Some(chunk) = chunks.last_mut() {
            if char_len(chunk) > avail {
                let room = avail.saturating_sub(current_len);
                if room > 0 || current.is_empty() {
                    let room = room.max(1);
                    let head: String = chunk.chars().take(room).collect();
                    let tail: String = chunk.chars().skip(room).collect();
                    current.push(head);
                    *chunk = tail;
                }
            }
        }

        while current.last().is_some_and(|c| is_blank(c)) {
            current.pop();
        }
        if !current.is_empty() {
            lines.push(format!("{indent}{}", current.concat()));
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_SIZE);
    let mut col = 0usize;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_SIZE - (col % TAB_SIZE);
            out.extend(std::iter::repeat_n(' ', pad));
            col += pad;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

fn is_blank(chunk: &str) -> bool {
    chunk.chars().all(|c| c == ' ')
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
