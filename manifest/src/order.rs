//! DreamMaker's include ordering.
//!
//! Paths are compared segment by segment on `\`, ignoring case. Within one
//! directory, files come before subdirectories; files are ordered by
//! extension and then by name, and directories by name.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    File { extension: String, name: String },
    Dir(String),
}

fn segments(path: &str) -> Vec<Segment> {
    let parts: Vec<&str> = path.split('\\').collect();
    let last = parts.len() - 1;
    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let name = part.to_lowercase();
            if i == last {
                let extension = name.rsplit('.').next().unwrap_or_default().to_string();
                Segment::File { extension, name }
            } else {
                Segment::Dir(name)
            }
        })
        .collect()
}

/// Total order over include paths. Paths that differ only in case compare
/// equal.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    segments(a).cmp(&segments(b))
}

/// Whether `a` belongs strictly before `b` in an include list.
#[must_use]
pub fn sort_less(a: &str, b: &str) -> bool {
    compare(a, b) == Ordering::Less
}
