//! Excerpts of the BYOND reference from a local installation.
//!
//! BYOND ships its reference as two large HTML files: `info.html` with one
//! `<a name=PATH>` anchored section per entry (sections end at the next
//! `<hr`), and `contents.html` with the index as a definition list. Those
//! pages predate modern HTML, so every excerpt goes through
//! [`clean_markup`] before display: definition lists become plain lists,
//! bare `href` values get quoted, and stray `<`/`&` get escaped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::NavLink;

/// Entry sections, relative to a BYOND installation.
pub const INFO_PAGE: &str = "help/ref/info.html";
/// The index, relative to a BYOND installation.
pub const CONTENTS_PAGE: &str = "help/ref/contents.html";
pub const ONLINE_REFERENCE: &str = "https://secure.byond.com/docs/ref/index.html";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("A valid Windows BYOND path must be given to use the reference browser.")]
    NoInstallation,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no index list", path.display())]
    MissingIndex { path: PathBuf },
}

impl ReferenceError {
    /// Whether the host should send the user to the BYOND path setting.
    #[must_use]
    pub fn needs_configuration(&self) -> bool {
        matches!(self, Self::NoInstallation)
    }
}

/// Serves reference pages from the first BYOND installation that has them.
#[derive(Debug, Clone)]
pub struct ReferenceBrowser {
    installs: Vec<PathBuf>,
}

impl ReferenceBrowser {
    #[must_use]
    pub fn new(installs: Vec<PathBuf>) -> Self {
        Self { installs }
    }

    /// The page for `dm_path`, or the index when no path is given.
    pub fn open(&self, dm_path: Option<&str>) -> Result<String, ReferenceError> {
        match dm_path.filter(|path| !path.is_empty()) {
            Some(dm_path) => {
                let contents = self.read_page(INFO_PAGE)?;
                let (body, shown) = extract_entry(&contents, dm_path);
                Ok(format_page(&clean_markup(&body), Some(&shown)))
            }
            None => {
                let path = self.locate(CONTENTS_PAGE)?;
                let contents = read_latin1(&path)?;
                let body = extract_index(&contents).ok_or(ReferenceError::MissingIndex { path })?;
                Ok(format_page(&clean_markup(body), None))
            }
        }
    }

    /// Follows a link clicked inside a reference page. Links that don't
    /// belong to the reference return `None`.
    pub fn navigate(&self, link: &NavLink) -> Option<Result<String, ReferenceError>> {
        match link {
            NavLink::ReferenceEntry(path) | NavLink::DmRef(path) => Some(self.open(Some(path))),
            NavLink::ReferenceIndex => Some(self.open(None)),
            _ => None,
        }
    }

    fn locate(&self, page: &str) -> Result<PathBuf, ReferenceError> {
        dmlc_utils::find_byond_file(&self.installs, &[page]).ok_or(ReferenceError::NoInstallation)
    }

    fn read_page(&self, page: &str) -> Result<String, ReferenceError> {
        read_latin1(&self.locate(page)?)
    }
}

fn read_latin1(path: &Path) -> Result<String, ReferenceError> {
    let bytes = fs::read(path).map_err(|source| ReferenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read reference page");
    Ok(decode_latin1(&bytes))
}

/// ISO-8859-1: every byte is the code point of the same value.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// The section of `info.html` for `dm_path`, and the path as it should be
/// shown in the page header.
///
/// Lookup tries `<a name=PATH>`, then `<a name=PATH toc=` (whose names spell
/// `.` and `?` as `@dt;` and `@qu;`), then the anchor following the first
/// mention of the last path segment, which is where constants documented
/// under another entry live. The section runs from the end of the anchor
/// line to the next `<hr`.
#[must_use]
pub fn extract_entry(contents: &str, dm_path: &str) -> (String, String) {
    let mut path = dm_path.replace('>', "&gt;").replace('<', "&lt;");

    let mut start = contents.find(&format!("<a name={path}>"));
    if start.is_none() {
        start = contents.find(&format!("<a name={path} toc="));
        path = path.replace("@dt;", ".").replace("@qu;", "?");
    }
    if start.is_none() {
        let raw_name = path.rsplit('/').next().unwrap_or_default();
        start = contents
            .find(raw_name)
            .and_then(|at| find_from(contents, at, "<a name="));
    }

    let Some(start) = start else {
        return (format!("No such entry <tt>{path}</tt> in the reference."), path);
    };
    let start = find_from(contents, start, "\n").unwrap_or(contents.len());
    let end = find_from(contents, start, "<hr").unwrap_or(contents.len());
    (contents[start..end].to_string(), path)
}

/// The index list of `contents.html`: from the first `<dl>` up to `</body>`.
#[must_use]
pub fn extract_index(contents: &str) -> Option<&str> {
    let start = contents.find("<dl>")?;
    let end = find_from(contents, start, "</body>")?;
    Some(&contents[start..end])
}

fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    haystack[from..].find(needle).map(|offset| from + offset)
}

struct MarkupRules {
    item_runs: Regex,
    item_end_runs: Regex,
    bare_href: Regex,
    stray_lt: Regex,
    stray_amp: Regex,
    empty_item: Regex,
}

impl MarkupRules {
    fn new() -> Self {
        Self {
            item_runs: Regex::new(r"(<li>\s*)+").expect("valid item regex"),
            item_end_runs: Regex::new(r"(</li>\s*)+").expect("valid item end regex"),
            bare_href: Regex::new(r"<a href=([^>]+)>").expect("valid href regex"),
            stray_lt: Regex::new(r"<([^/a-zA-Z])").expect("valid lt regex"),
            stray_amp: Regex::new(r"&([^&#a-z])").expect("valid amp regex"),
            empty_item: Regex::new(r"<li>\s*</li>").expect("valid empty item regex"),
        }
    }
}

static MARKUP_RULES: OnceLock<MarkupRules> = OnceLock::new();

fn markup_rules() -> &'static MarkupRules {
    MARKUP_RULES.get_or_init(MarkupRules::new)
}

/// Rewrites reference HTML into the small subset a host view renders.
#[must_use]
pub fn clean_markup(body: &str) -> String {
    const LIST_REWRITES: [(&str, &str); 10] = [
        ("<dd><dl>", "<dl>"),
        ("<dl><dt>", "<ul><li>"),
        ("<dl>", "<ul><li>"),
        ("</dl>", "</li></ul>"),
        ("<dd>", "</li><li>"),
        ("<dt>", "</li><li>"),
        ("</dd>", ""),
        ("</dt>", ""),
        ("<xmp>", "<pre>"),
        ("</xmp>", "</pre>"),
    ];

    let rules = markup_rules();
    let mut body = body.to_string();
    for (from, to) in LIST_REWRITES {
        body = body.replace(from, to);
    }
    let body = rules.item_runs.replace_all(&body, "<li>");
    let body = rules.item_end_runs.replace_all(&body, "</li>");
    let body = rules.bare_href.replace_all(&body, r#"<a href="$1">"#);
    let body = body.replace("<<", "&lt;&lt;");
    let body = rules.stray_lt.replace_all(&body, "&lt;$1");
    let body = rules.stray_amp.replace_all(&body, "&amp;$1");
    let body = rules.empty_item.replace_all(&body, "");
    flatten_pre(&body)
}

/// Drops `<pre>` tags, turning the newlines inside each block into `<br>`.
/// An unterminated block is kept as is.
#[must_use]
pub fn flatten_pre(body: &str) -> String {
    const OPEN: &str = "<pre>";
    const CLOSE: &str = "</pre>";

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find(OPEN) {
        let Some(len) = rest[start + OPEN.len()..].find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        let block = &rest[start + OPEN.len()..start + OPEN.len() + len];
        out.push_str(&block.replace('\n', "<br>"));
        rest = &rest[start + OPEN.len() + len + CLOSE.len()..];
    }
    out.push_str(rest);
    out
}

/// Wraps a cleaned body in the reference page with its header bar.
#[must_use]
pub fn format_page(body: &str, dm_path: Option<&str>) -> String {
    let dm_path = dm_path.unwrap_or("/");
    let index = NavLink::ReferenceIndex;
    format!(
        "<!DOCTYPE html>
<html>
<head>
</head>
<body id=\"dm-reference\">
<div style='margin-bottom:10px; background: rgba(128,128,128,0.2);'>
<b><tt>{dm_path}</tt></b> |
<a href=\"{index}\">Index</a> |
<a href=\"{ONLINE_REFERENCE}#{dm_path}\">Online</a>
</div>
{body}
</body>
</html>"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const INFO: &str = "<html><body>\n\
        <a name=/atom/var/name>\n\
        <h2>name var (atom)</h2>\n\
        The name of the object.\n\
        <hr>\n\
        <a name=/operator/@dt; toc=12>\n\
        <h2>. operator</h2>\n\
        Accesses a var.\n\
        <hr>\n\
        <a name=/operator/&lt;&lt;>\n\
        <h2>&lt;&lt; operator</h2>\n\
        <hr>\n\
        <a name=/mob/var/sight>\n\
        Flags: SEE_MOBS and others.\n\
        <hr>\n\
        <a name=/mob/var/see_in_dark>\n\
        Darkness range.\n\
        </body></html>";

    #[test]
    fn entry_by_exact_anchor() {
        let (body, shown) = extract_entry(INFO, "/atom/var/name");
        assert_eq!(shown, "/atom/var/name");
        assert_eq!(
            body,
            "\n<h2>name var (atom)</h2>\nThe name of the object.\n"
        );
    }

    #[test]
    fn entry_by_toc_anchor_decodes_punctuation() {
        let (body, shown) = extract_entry(INFO, "/operator/@dt;");
        assert_eq!(shown, "/operator/.");
        assert!(body.contains(". operator"));
    }

    #[test]
    fn entry_path_is_escaped() {
        let (body, shown) = extract_entry(INFO, "/operator/<<");
        assert_eq!(shown, "/operator/&lt;&lt;");
        assert!(body.contains("&lt;&lt; operator"));
    }

    #[test]
    fn entry_by_raw_name_uses_following_anchor() {
        let (body, _) = extract_entry(INFO, "/mob/var/sight/SEE_MOBS");
        assert_eq!(body, "\nDarkness range.\n</body></html>");
    }

    #[test]
    fn missing_entry() {
        let (body, shown) = extract_entry(INFO, "/proc/nonexistent");
        assert_eq!(shown, "/proc/nonexistent");
        assert_eq!(
            body,
            "No such entry <tt>/proc/nonexistent</tt> in the reference."
        );
    }

    #[test]
    fn index_runs_from_list_to_body_end() {
        let contents = "<html><body><h1>Index</h1><dl><dt>a</dt></dl></body></html>";
        assert_eq!(extract_index(contents), Some("<dl><dt>a</dt></dl>"));
        assert_eq!(extract_index("<html></html>"), None);
    }

    #[test]
    fn definition_lists_become_lists() {
        assert_eq!(
            clean_markup("<dl><dt>a</dt><dd>b</dd></dl>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
        assert_eq!(clean_markup("<ul><li> <li>x</li> </li></ul>"), "<ul><li>x</li></ul>");
    }

    #[test]
    fn hrefs_are_quoted() {
        assert_eq!(
            clean_markup("see <a href=#/proc/sleep>sleep</a>"),
            "see <a href=\"#/proc/sleep\">sleep</a>"
        );
    }

    #[test]
    fn stray_markup_characters_are_escaped() {
        assert_eq!(clean_markup("a << b"), "a &lt;&lt; b");
        assert_eq!(clean_markup("x < 3"), "x &lt; 3");
        assert_eq!(clean_markup("A & B"), "A &amp; B");
        assert_eq!(clean_markup("&amp; &#39;"), "&amp; &#39;");
    }

    #[test]
    fn preformatted_blocks_are_flattened() {
        assert_eq!(clean_markup("a<xmp>x = 1\ny = 2</xmp>b"), "ax = 1<br>y = 2b");
        assert_eq!(flatten_pre("<pre>unterminated\n"), "<pre>unterminated\n");
        assert_eq!(flatten_pre("no blocks\n"), "no blocks\n");
    }

    #[test]
    fn page_template_links_index_and_online() {
        let page = format_page("BODY", Some("/proc/sleep"));
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<body id=\"dm-reference\">"));
        assert!(page.contains("<b><tt>/proc/sleep</tt></b> |"));
        assert!(page.contains("<a href=\"command:dreammaker.openReference\">Index</a> |"));
        assert!(page.contains(
            "<a href=\"https://secure.byond.com/docs/ref/index.html#/proc/sleep\">Online</a>"
        ));
        assert!(page.contains("\nBODY\n"));
        assert!(format_page("", None).contains("<b><tt>/</tt></b>"));
    }

    #[test]
    fn latin1_bytes_map_to_code_points() {
        assert_eq!(decode_latin1(b"caf\xe9"), "café");
    }

    fn install_with_reference() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let refdir = dir.path().join("help/ref");
        fs::create_dir_all(&refdir).unwrap();
        fs::write(refdir.join("info.html"), INFO).unwrap();
        fs::write(
            refdir.join("contents.html"),
            b"<body><dl><dt><a href=info.html#/proc/sleep>sleep</a></dt></dl></body>",
        )
        .unwrap();
        dir
    }

    #[test]
    fn browser_serves_entries_and_index() {
        let install = install_with_reference();
        let browser = ReferenceBrowser::new(vec![install.path().to_path_buf()]);

        let entry = browser.open(Some("/atom/var/name")).unwrap();
        assert!(entry.contains("The name of the object."));

        let index = browser.open(None).unwrap();
        assert!(index.contains("<ul><li><a href=\"info.html#/proc/sleep\">sleep</a></li></ul>"));
        assert!(index.contains("<b><tt>/</tt></b>"));
    }

    #[test]
    fn browser_follows_reference_links_only() {
        let install = install_with_reference();
        let browser = ReferenceBrowser::new(vec![install.path().to_path_buf()]);

        let page = browser
            .navigate(&NavLink::parse("info.html#/atom/var/name"))
            .unwrap()
            .unwrap();
        assert!(page.contains("<b><tt>/atom/var/name</tt></b>"));
        assert!(browser.navigate(&NavLink::ReferenceIndex).is_some());
        assert!(browser.navigate(&NavLink::Expand("/obj".into())).is_none());
    }

    #[test]
    fn browser_without_installation() {
        let empty = tempfile::tempdir().unwrap();
        let browser = ReferenceBrowser::new(vec![empty.path().to_path_buf()]);
        let err = browser.open(Some("/atom")).unwrap_err();
        assert!(err.needs_configuration());
        assert_eq!(
            err.to_string(),
            "A valid Windows BYOND path must be given to use the reference browser."
        );
    }
}
