//! Collected compiler output.

use std::sync::OnceLock;

use regex::Regex;

/// Matches `file:line:severity: message` lines printed by the compiler.
pub const ERROR_LINE_PATTERN: &str = r"^([^:]+):(\d+):([^:]+): (.*)$";

/// How a build's output ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEnd {
    Finished,
    Cancelled,
    /// Output stopped being valid UTF-8; nothing after it was collected.
    DecodeFailed,
}

/// Text of one build as shown in the output panel.
///
/// Carriage returns are dropped on append, since the compiler writes CRLF
/// when run under Wine.
#[derive(Debug, Default)]
pub struct BuildOutput {
    text: String,
    end: Option<BuildEnd>,
}

impl BuildOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.text.extend(text.chars().filter(|&c| c != '\r'));
    }

    pub(crate) fn finish(&mut self, end: BuildEnd) {
        match end {
            BuildEnd::Finished => self.append("-- Finished"),
            BuildEnd::Cancelled => self.append("-- Cancelled"),
            BuildEnd::DecodeFailed => {}
        }
        self.end = Some(end);
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `None` while the compiler may still write output.
    #[must_use]
    pub fn end(&self) -> Option<BuildEnd> {
        self.end
    }

    /// Every error or warning line collected so far.
    #[must_use]
    pub fn messages(&self) -> Vec<CompileMessage> {
        self.text.lines().filter_map(CompileMessage::parse).collect()
    }
}

/// One `file:line:severity: message` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileMessage {
    /// Path relative to the workspace root.
    pub file: String,
    pub line: u32,
    pub severity: String,
    pub message: String,
}

static ERROR_LINE: OnceLock<Regex> = OnceLock::new();

impl CompileMessage {
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let regex =
            ERROR_LINE.get_or_init(|| Regex::new(ERROR_LINE_PATTERN).expect("valid error line regex"));
        let captures = regex.captures(line)?;
        Some(Self {
            file: captures[1].to_string(),
            line: captures[2].parse().ok()?,
            severity: captures[3].to_string(),
            message: captures[4].to_string(),
        })
    }
}
