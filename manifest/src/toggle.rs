//! The single-line edit that ticks or unticks one file.

use dmlc_types::TickRequest;

use crate::environment::{ManifestFile, include_line};
use crate::order::sort_less;

/// A line-based edit against the text the manifest was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEdit {
    NoChange,
    /// Insert `text` (newline included) before zero-based `line`.
    Insert { line: usize, text: String },
    /// Remove zero-based `line` and its line terminator.
    Delete { line: usize },
}

impl ManifestFile {
    /// The edit that applies `request` to `candidate`.
    ///
    /// `candidate` is a workspace-relative path; forward slashes are
    /// converted. Inserts land before the first include the candidate sorts
    /// before, or at the end of the region.
    #[must_use]
    pub fn toggle(&self, candidate: &str, request: TickRequest) -> TickEdit {
        if !self.has_region() {
            tracing::debug!("No include region; leaving manifest unchanged");
            return TickEdit::NoChange;
        }
        let candidate = candidate.replace('/', "\\");

        let mut insert_at = self.region_end();
        for entry in self.includes() {
            if entry.path == candidate {
                return match request {
                    TickRequest::Tick => TickEdit::NoChange,
                    TickRequest::Untick | TickRequest::Toggle => {
                        TickEdit::Delete { line: entry.line }
                    }
                };
            }
            if sort_less(&candidate, &entry.path) {
                insert_at = entry.line;
                break;
            }
        }

        match request {
            TickRequest::Untick => TickEdit::NoChange,
            TickRequest::Tick | TickRequest::Toggle => TickEdit::Insert {
                line: insert_at,
                text: format!("{}{}", include_line(&candidate), self.newline()),
            },
        }
    }
}

impl TickEdit {
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Apply the edit to `text`, which must be the text the edit was
    /// computed from.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::NoChange => text.to_string(),
            Self::Insert { line, text: insert } => {
                let at = line_start(text, *line).unwrap_or(text.len());
                let mut out = String::with_capacity(text.len() + insert.len() + 2);
                out.push_str(&text[..at]);
                if at == text.len() && !text.is_empty() && !text.ends_with('\n') {
                    out.push_str(if insert.ends_with("\r\n") { "\r\n" } else { "\n" });
                }
                out.push_str(insert);
                out.push_str(&text[at..]);
                out
            }
            Self::Delete { line } => {
                let Some(start) = line_start(text, *line) else {
                    return text.to_string();
                };
                let end = line_start(text, line + 1).unwrap_or(text.len());
                let mut out = String::with_capacity(text.len());
                out.push_str(&text[..start]);
                out.push_str(&text[end..]);
                out
            }
        }
    }
}

/// Byte offset where zero-based `line` starts.
fn line_start(text: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }
    text.match_indices('\n')
        .nth(line - 1)
        .map(|(i, _)| i + 1)
        .filter(|&i| i < text.len())
}
