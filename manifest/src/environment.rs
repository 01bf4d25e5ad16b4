//! Parsing and serialization of `.dme` files.

pub const BEGIN_MARKER: &str = "// BEGIN_INCLUDE";
pub const END_MARKER: &str = "// END_INCLUDE";
pub const INCLUDE_PREFIX: &str = "#include \"";
pub const INCLUDE_SUFFIX: &str = "\"";

/// One `#include` line inside the include region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEntry {
    /// Backslash-separated path as written in the file.
    pub path: String,
    /// Zero-based line number in the source text.
    pub line: usize,
}

/// A parsed `.dme` file.
///
/// The header runs up to and including [`BEGIN_MARKER`]; the footer starts at
/// [`END_MARKER`]. Other lines inside the region are dropped. Parsing never
/// fails: a file without markers simply has no includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    header: Vec<String>,
    includes: Vec<IncludeEntry>,
    footer: Vec<String>,
    has_region: bool,
    /// Line where an insertion at the end of the region goes.
    region_end: usize,
    newline: &'static str,
    trailing_newline: bool,
}

enum Section {
    Header,
    Includes,
    Footer,
}

impl ManifestFile {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let mut manifest = Self {
            header: Vec::new(),
            includes: Vec::new(),
            footer: Vec::new(),
            has_region: false,
            region_end: 0,
            newline,
            trailing_newline: text.ends_with('\n'),
        };

        let mut section = Section::Header;
        let mut line_count = 0;
        for (number, line) in text.lines().enumerate() {
            line_count = number + 1;
            match section {
                Section::Header => {
                    manifest.header.push(line.to_string());
                    if line == BEGIN_MARKER {
                        manifest.has_region = true;
                        section = Section::Includes;
                    }
                }
                Section::Includes => {
                    if line == END_MARKER {
                        manifest.region_end = number;
                        manifest.footer.push(line.to_string());
                        section = Section::Footer;
                    } else if let Some(path) = include_path(line) {
                        manifest.includes.push(IncludeEntry {
                            path: path.to_string(),
                            line: number,
                        });
                    } else {
                        tracing::debug!(line = number, "Ignoring junk line in include region");
                    }
                }
                Section::Footer => manifest.footer.push(line.to_string()),
            }
        }
        if matches!(section, Section::Includes) {
            // No end marker: the region runs to the end of the file.
            manifest.region_end = line_count;
        }
        manifest
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn includes(&self) -> &[IncludeEntry] {
        &self.includes
    }

    #[must_use]
    pub fn footer(&self) -> &[String] {
        &self.footer
    }

    /// Whether the file has a [`BEGIN_MARKER`].
    #[must_use]
    pub fn has_region(&self) -> bool {
        self.has_region
    }

    pub(crate) fn region_end(&self) -> usize {
        self.region_end
    }

    #[must_use]
    pub fn newline(&self) -> &'static str {
        self.newline
    }

    /// Exact, case-sensitive membership.
    #[must_use]
    pub fn is_included(&self, path: &str) -> bool {
        self.includes.iter().any(|entry| entry.path == path)
    }

    /// Reassemble the file. Well-formed input comes back byte for byte.
    #[must_use]
    pub fn serialize(&self) -> String {
        let lines: Vec<String> = self
            .header
            .iter()
            .cloned()
            .chain(self.includes.iter().map(|entry| include_line(&entry.path)))
            .chain(self.footer.iter().cloned())
            .collect();
        let mut out = lines.join(self.newline);
        if self.trailing_newline {
            out.push_str(self.newline);
        }
        out
    }
}

/// `#include "<path>"`
#[must_use]
pub(crate) fn include_line(path: &str) -> String {
    format!("{INCLUDE_PREFIX}{path}{INCLUDE_SUFFIX}")
}

fn include_path(line: &str) -> Option<&str> {
    line.strip_prefix(INCLUDE_PREFIX)?
        .strip_suffix(INCLUDE_SUFFIX)
}
