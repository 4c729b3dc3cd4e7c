//! Merged tree of dotted attribute paths
//!
//! All paths of all fields of one entity are merged into a single tree.
//! At every relationship hop the keys of the node are the attributes that
//! must be loaded at that hop. A segment can be both loaded as a terminal
//! and descended into (`area` next to `area.name`); the node keeps both
//! facts. Merging has set semantics: the result does not depend on input
//! order or on repeated paths.

use std::collections::BTreeMap;

/// One level of a merged path tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTree {
    /// Terminal attribute with nothing below it
    Leaf,
    /// Attribute with nested attributes below it
    Node {
        /// True if some path also ends at this segment
        terminal: bool,
        /// Nested attributes, by segment name
        children: BTreeMap<String, PathTree>,
    },
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    /// Creates an empty root node
    pub fn new() -> Self {
        PathTree::Node {
            terminal: false,
            children: BTreeMap::new(),
        }
    }

    /// Merges groups of paths (one group per field) into one tree
    pub fn merge<G, I, P>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut tree = PathTree::new();
        for group in groups {
            for path in group {
                tree.insert(path.as_ref());
            }
        }
        tree
    }

    /// Inserts one dotted path, creating intermediate nodes on demand
    pub fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, init)) = segments.split_last() else {
            return;
        };

        let mut node = self;
        for segment in init {
            node = node
                .children_mut()
                .entry((*segment).to_string())
                .or_insert_with(PathTree::new);
        }

        node.children_mut()
            .entry((*last).to_string())
            .and_modify(PathTree::mark_terminal)
            .or_insert(PathTree::Leaf);
    }

    fn mark_terminal(&mut self) {
        if let PathTree::Node { terminal, .. } = self {
            *terminal = true;
        }
    }

    fn children_mut(&mut self) -> &mut BTreeMap<String, PathTree> {
        if matches!(self, PathTree::Leaf) {
            *self = PathTree::Node {
                terminal: true,
                children: BTreeMap::new(),
            };
        }
        match self {
            PathTree::Node { children, .. } => children,
            PathTree::Leaf => unreachable!("leaf promoted to node above"),
        }
    }

    /// Child for one segment
    pub fn get(&self, segment: &str) -> Option<&PathTree> {
        match self {
            PathTree::Leaf => None,
            PathTree::Node { children, .. } => children.get(segment),
        }
    }

    /// Walks a sequence of segments from this node
    pub fn descend<'a, I>(&self, segments: I) -> Option<&PathTree>
    where
        I: IntoIterator<Item = &'a str>,
    {
        segments
            .into_iter()
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Attribute names required at this level, in sorted order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            PathTree::Leaf => Vec::new(),
            PathTree::Node { children, .. } => children.keys().map(String::as_str).collect(),
        }
    }

    /// True if some path ends here
    pub fn is_terminal(&self) -> bool {
        match self {
            PathTree::Leaf => true,
            PathTree::Node { terminal, .. } => *terminal,
        }
    }

    /// True if nothing has been merged
    pub fn is_empty(&self) -> bool {
        match self {
            PathTree::Leaf => false,
            PathTree::Node { children, .. } => children.is_empty(),
        }
    }

    /// Flattens the tree back into the sorted set of paths it covers
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        if let PathTree::Node { children, .. } = self {
            for (segment, child) in children {
                let path = if prefix.is_empty() {
                    segment.clone()
                } else {
                    format!("{}.{}", prefix, segment)
                };
                if child.is_terminal() {
                    out.push(path.clone());
                }
                child.collect_paths(&path, out);
            }
        }
    }
}

/// Merges groups of paths into one tree
pub fn merge_paths<G, I, P>(groups: G) -> PathTree
where
    G: IntoIterator<Item = I>,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    PathTree::merge(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let tree = merge_paths(Vec::<Vec<&str>>::new());
        assert!(tree.is_empty());
        assert!(tree.paths().is_empty());
    }

    #[test]
    fn test_single_segment_is_leaf() {
        let tree = merge_paths([["name"]]);
        assert_eq!(tree.get("name"), Some(&PathTree::Leaf));
        assert_eq!(tree.keys(), vec!["name"]);
    }

    #[test]
    fn test_nested_paths_share_prefix() {
        let tree = merge_paths([vec!["area.name"], vec!["area.type.name", "area.gid"]]);

        let area = tree.get("area").unwrap();
        assert!(!area.is_terminal());
        assert_eq!(area.keys(), vec!["gid", "name", "type"]);
        assert_eq!(tree.descend(["area", "type"]).unwrap().keys(), vec!["name"]);
    }

    #[test]
    fn test_terminal_and_descent_coexist() {
        let forward = merge_paths([["area"], ["area.name"]]);
        let backward = merge_paths([["area.name"], ["area"]]);

        assert_eq!(forward, backward);
        let area = forward.get("area").unwrap();
        assert!(area.is_terminal());
        assert_eq!(area.keys(), vec!["name"]);
        assert_eq!(forward.paths(), vec!["area", "area.name"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let groups = vec![
            vec!["name", "area.name"],
            vec!["aliases.name", "aliases.type.name"],
            vec!["area"],
        ];
        let once = merge_paths(groups.clone());
        let twice = merge_paths([once.paths()]);
        assert_eq!(once, twice);

        let doubled = merge_paths(groups.iter().chain(groups.iter()).cloned());
        assert_eq!(once, doubled);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = merge_paths([vec!["b.c", "a"], vec!["b", "b.d.e"]]);
        let b = merge_paths([vec!["b.d.e"], vec!["a", "b"], vec!["b.c"]]);
        assert_eq!(a, b);
    }
}
