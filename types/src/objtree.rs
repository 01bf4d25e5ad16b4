//! Object tree payload sent by the language server.

use serde::Deserialize;

/// One type in the DM object tree. The root has an empty name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ObjectTreeType {
    pub name: String,
    /// LSP `SymbolKind`.
    #[serde(default)]
    pub kind: Option<u32>,
    #[serde(default)]
    pub children: Vec<ObjectTreeType>,
}

impl ObjectTreeType {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Number of types in this subtree, including this one.
    #[must_use]
    pub fn type_count(&self) -> usize {
        1 + self.children.iter().map(Self::type_count).sum::<usize>()
    }
}
