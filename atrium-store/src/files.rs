//! Folder tree over the flat file list the backend returns.

use std::collections::{HashMap, HashSet};

use atrium_model::File;

pub const ROOT: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    pub file: File,
    pub children: Vec<FileNode>,
}

impl FileNode {
    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn is_folder(&self) -> bool {
        self.file.is_folder()
    }

    /// Number of nodes below this one.
    pub fn descendants(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&FileNode> = self.children.iter().collect();
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }
}

// Backend parent chains can be arbitrarily deep; tear down without recursing.
impl Drop for FileNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Rebuild the tree from `parent` links.
///
/// Records whose parent is missing from the list are treated as roots.
/// Records caught in a parent cycle are dropped. Siblings are ordered
/// folders first, then by name. Depth is bounded only by memory.
pub fn build_tree(files: &[File]) -> Vec<FileNode> {
    let ids: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();
    let mut by_parent: HashMap<Option<&str>, Vec<&File>> = HashMap::new();
    for file in files {
        let parent = file.parent.as_deref().filter(|p| ids.contains(p) && *p != file.id);
        by_parent.entry(parent).or_default().push(file);
    }

    let mut visited = HashSet::new();
    let mut stack = vec![Frame::open(None, &by_parent)];
    while let Some(top) = stack.last_mut() {
        if let Some(file) = top.pending.next() {
            if visited.insert(file.id.as_str()) {
                stack.push(Frame::open(Some(file), &by_parent));
            }
            continue;
        }

        let Some(frame) = stack.pop() else { break };
        let mut children = frame.children;
        sort_siblings(&mut children);
        match (frame.file, stack.last_mut()) {
            (Some(file), Some(parent)) => parent.children.push(FileNode {
                file: file.clone(),
                children,
            }),
            _ => return children,
        }
    }
    Vec::new()
}

/// A folder whose children are still being attached.
struct Frame<'a> {
    file: Option<&'a File>,
    pending: std::vec::IntoIter<&'a File>,
    children: Vec<FileNode>,
}

impl<'a> Frame<'a> {
    fn open(file: Option<&'a File>, by_parent: &HashMap<Option<&'a str>, Vec<&'a File>>) -> Self {
        let key = file.map(|f| f.id.as_str());
        Self {
            file,
            pending: by_parent.get(&key).cloned().unwrap_or_default().into_iter(),
            children: Vec::new(),
        }
    }
}

fn sort_siblings(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name().cmp(b.name()))
    });
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

/// Children of the folder at `path` (`"/Documents/2024"`), or the roots for
/// `"/"`. `None` when no folder lives at that path.
pub fn directory_contents<'a>(roots: &'a [FileNode], path: &str) -> Option<&'a [FileNode]> {
    let mut level = roots;
    for part in segments(path) {
        let folder = level.iter().find(|n| n.is_folder() && n.name() == part)?;
        level = &folder.children;
    }
    Some(level)
}

/// Node at `path`, file or folder.
pub fn find_by_path<'a>(roots: &'a [FileNode], path: &str) -> Option<&'a FileNode> {
    let mut level = roots;
    let mut found = None;
    for part in segments(path) {
        let node = level.iter().find(|n| n.name() == part)?;
        level = &node.children;
        found = Some(node);
    }
    found
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// `"/a/b"` gives `a -> /a`, `b -> /a/b`. The root has no crumbs.
pub fn breadcrumbs(path: &str) -> Vec<Breadcrumb> {
    let mut out = Vec::new();
    let mut acc = String::new();
    for part in segments(path) {
        acc.push('/');
        acc.push_str(part);
        out.push(Breadcrumb {
            name: part.to_string(),
            path: acc.clone(),
        });
    }
    out
}

/// Browser-style back/forward over visited paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<String>,
    index: usize,
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self {
            entries: vec![ROOT.to_string()],
            index: 0,
        }
    }
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Drops any forward entries, then records `path`.
    pub fn navigate(&mut self, path: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(path.into());
        self.index = self.entries.len() - 1;
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn back(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    pub fn forward(&mut self) -> Option<&str> {
        if !self.can_go_forward() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn files() -> Vec<File> {
        serde_json::from_value(json!([
            {"_id": "3", "name": "report.pdf", "type": "file", "path": "/report.pdf"},
            {"_id": "1", "name": "Documents", "type": "folder", "path": "/Documents"},
            {"_id": "5", "name": "2024", "type": "folder", "path": "/Documents/2024", "parent": "1"},
            {"_id": "6", "name": "q1.xlsx", "type": "file", "path": "/Documents/2024/q1.xlsx", "parent": "5"},
            {"_id": "2", "name": "Images", "type": "folder", "path": "/Images"},
            {"_id": "7", "name": "lost.txt", "type": "file", "parent": "gone"}
        ]))
        .unwrap()
    }

    #[test]
    fn tree_puts_folders_first_and_adopts_orphans() {
        let roots = build_tree(&files());
        let names: Vec<&str> = roots.iter().map(FileNode::name).collect();
        assert_eq!(names, vec!["Documents", "Images", "lost.txt", "report.pdf"]);
        assert_eq!(roots[0].descendants(), 2);
    }

    #[test]
    fn cycles_are_dropped() {
        let looped: Vec<File> = serde_json::from_value(json!([
            {"_id": "a", "name": "a", "type": "folder", "parent": "b"},
            {"_id": "b", "name": "b", "type": "folder", "parent": "a"},
            {"_id": "c", "name": "c", "type": "folder", "parent": "c"}
        ]))
        .unwrap();
        let roots = build_tree(&looped);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name(), "c");
    }

    #[test]
    fn deep_parent_chains_do_not_recurse() {
        let depth = 50_000;
        let chain: Vec<File> = (0..depth)
            .map(|i| {
                let parent = (i > 0).then(|| format!("f{}", i - 1));
                serde_json::from_value(json!({
                    "_id": format!("f{i}"),
                    "name": format!("f{i}"),
                    "type": "folder",
                    "parent": parent
                }))
                .unwrap()
            })
            .collect();

        let roots = build_tree(&chain);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].descendants(), depth - 1);
    }

    #[test]
    fn directory_contents_walks_folder_names() {
        let roots = build_tree(&files());
        assert_eq!(directory_contents(&roots, "/").map(<[FileNode]>::len), Some(4));

        let year = directory_contents(&roots, "/Documents/2024").unwrap();
        assert_eq!(year.len(), 1);
        assert_eq!(year[0].name(), "q1.xlsx");

        assert!(directory_contents(&roots, "/report.pdf").is_none());
        assert!(directory_contents(&roots, "/Missing").is_none());
        assert_eq!(find_by_path(&roots, "/Documents/2024/q1.xlsx").map(|n| n.file.id.as_str()), Some("6"));
    }

    #[test]
    fn breadcrumbs_accumulate_paths() {
        let crumbs = breadcrumbs("/Documents/2024/");
        assert_eq!(
            crumbs,
            vec![
                Breadcrumb { name: "Documents".into(), path: "/Documents".into() },
                Breadcrumb { name: "2024".into(), path: "/Documents/2024".into() },
            ]
        );
        assert!(breadcrumbs(ROOT).is_empty());
    }

    #[test]
    fn navigating_truncates_forward_history() {
        let mut history = NavigationHistory::new();
        history.navigate("/Documents");
        history.navigate("/Documents/2024");
        assert_eq!(history.back(), Some("/Documents"));
        assert!(history.can_go_forward());

        history.navigate("/Images");
        assert!(!history.can_go_forward());
        assert_eq!(history.entries(), ["/", "/Documents", "/Images"]);

        assert_eq!(history.back(), Some("/Documents"));
        assert_eq!(history.back(), Some("/"));
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), Some("/Documents"));
    }
}
