//! Object tree view.

use std::collections::HashSet;

use dmlc_types::ObjectTreeType;

use crate::NavLink;

/// Shown once the session is initialized but before the first tree arrives.
pub const PLACEHOLDER_LOADING: &str = "Loading...";
/// Shown before the language client has started.
pub const PLACEHOLDER_WAITING: &str = "Tab to a .dm file and back to load the object tree.";

/// Which types of the tree are currently expanded.
///
/// The root (empty name) is always expanded and has no link of its own.
#[derive(Debug, Clone, Default)]
pub struct ObjectTreeState {
    expanded: HashSet<String>,
}

impl ObjectTreeState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_expanded(&self, name: &str) -> bool {
        self.expanded.contains(name)
    }

    /// Applies an `expand:`/`contract:` link. Returns whether the view needs
    /// to be redrawn; other links are not handled here.
    pub fn navigate(&mut self, link: &NavLink) -> bool {
        match link {
            NavLink::Expand(name) => self.expanded.insert(name.clone()),
            NavLink::Contract(name) => self.expanded.remove(name),
            _ => false,
        }
    }

    /// Full view content: the rendered tree, or a placeholder while no tree
    /// has been received.
    #[must_use]
    pub fn render(&self, root: Option<&ObjectTreeType>, initialized: bool) -> String {
        match root {
            Some(root) => render_tree(root, &self.expanded),
            None if initialized => PLACEHOLDER_LOADING.to_string(),
            None => PLACEHOLDER_WAITING.to_string(),
        }
    }
}

/// Renders `root` as nested `<ul><li>` markup, descending only into
/// expanded types.
#[must_use]
pub fn render_tree(root: &ObjectTreeType, expanded: &HashSet<String>) -> String {
    let mut out = String::new();
    render_type(root, expanded, &mut out);
    out
}

fn render_type(ty: &ObjectTreeType, expanded: &HashSet<String>, out: &mut String) {
    out.push_str(&ty.name);
    if ty.children.is_empty() {
        return;
    }

    let open = ty.is_root() || expanded.contains(&ty.name);
    if !ty.is_root() {
        let count = ty.children.len();
        if open {
            let link = NavLink::Contract(ty.name.clone());
            out.push_str(&format!(" [<a href='{link}'>-{count}</a>]"));
        } else {
            let link = NavLink::Expand(ty.name.clone());
            out.push_str(&format!(" [<a href='{link}'>+{count}</a>]"));
        }
    }

    if open {
        out.push_str("<ul>");
        for child in &ty.children {
            out.push_str("<li>");
            render_type(child, expanded, out);
            out.push_str("</li>");
        }
        out.push_str("</ul>");
    }
}
