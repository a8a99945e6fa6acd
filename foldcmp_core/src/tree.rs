use foldcmp_common::RelativePath;
use std::collections::HashMap;

/// Trie node built from a flat list of relative paths.
///
/// Children keep first-seen order; `index` maps a child name to its position.
/// `original_path` is set on nodes reached by a full input path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    name: String,
    children: Vec<TreeNode>,
    index: HashMap<String, usize>,
    original_path: Option<RelativePath>,
}

/// Display view of a node after collapsing its single-child chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedNode<'a> {
    /// Chain segments joined with `/`
    pub display_name: String,
    /// Deepest node of the chain; its children are the view's children
    pub terminal: &'a TreeNode,
}

impl<'a> CompressedNode<'a> {
    pub fn original_path(&self) -> Option<&'a RelativePath> {
        self.terminal.original_path.as_ref()
    }

    /// No children below the chain: rendered as a file-like row
    pub fn is_leaf(&self) -> bool {
        self.terminal.children.is_empty()
    }

    pub fn children(&self) -> std::slice::Iter<'a, TreeNode> {
        self.terminal.children.iter()
    }
}

/// One flattened row of the compressed tree, in pre-order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedRow {
    pub depth: usize,
    pub display_name: String,
    pub original_path: Option<RelativePath>,
    pub is_folder: bool,
}

impl TreeNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Build a trie under an unnamed sentinel root.
    ///
    /// Paths are sorted first so the child order, and therefore the rendered
    /// order, does not depend on the order results were produced in.
    pub fn build(paths: &[RelativePath]) -> TreeNode {
        let mut sorted: Vec<&RelativePath> = paths.iter().filter(|p| !p.is_root()).collect();
        sorted.sort();
        sorted.dedup();

        let mut root = TreeNode::default();
        for path in sorted {
            let mut current = &mut root;
            for segment in path.segments() {
                let position = match current.index.get(segment) {
                    Some(&position) => position,
                    None => {
                        let position = current.children.len();
                        current.children.push(TreeNode::named(segment));
                        current.index.insert(segment.to_string(), position);
                        position
                    }
                };
                current = &mut current.children[position];
            }
            current.original_path = Some(path.clone());
        }
        root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_path(&self) -> Option<&RelativePath> {
        self.original_path.as_ref()
    }

    /// True when an input path ends at this node
    pub fn is_terminal(&self) -> bool {
        self.original_path.is_some()
    }

    pub fn children(&self) -> std::slice::Iter<'_, TreeNode> {
        self.children.iter()
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.index.get(name).map(|&position| &self.children[position])
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Collapse the chain of single-child descendants below this node.
    ///
    /// The walk stops at a node with zero or several children, and also at a
    /// terminal node, so an input path is never hidden inside a collapsed row.
    /// Pure: calling it on the returned `terminal` yields that same node.
    pub fn compress(&self) -> CompressedNode<'_> {
        let mut segments = vec![self.name.as_str()];
        let mut current = self;
        while current.children.len() == 1 && !current.is_terminal() {
            current = &current.children[0];
            segments.push(current.name.as_str());
        }
        CompressedNode {
            display_name: segments.join("/"),
            terminal: current,
        }
    }

    /// Pre-order rows of the compressed tree below this (sentinel) node
    pub fn rows(&self) -> Vec<CompressedRow> {
        let mut rows = Vec::new();
        for child in &self.children {
            child.push_rows(0, &mut rows);
        }
        rows
    }

    fn push_rows(&self, depth: usize, rows: &mut Vec<CompressedRow>) {
        let view = self.compress();
        rows.push(CompressedRow {
            depth,
            display_name: view.display_name.clone(),
            original_path: view.original_path().cloned(),
            is_folder: !view.is_leaf(),
        });
        for child in view.children() {
            child.push_rows(depth + 1, rows);
        }
    }

    /// Every original path reachable through the compressed view
    pub fn original_paths(&self) -> Vec<RelativePath> {
        self.rows()
            .into_iter()
            .filter_map(|row| row.original_path)
            .collect()
    }
}
