use crate::domain::FileNode;
use crate::search::SearchQuery;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandStart {
    Dispatch,
    AlreadyLoaded,
    InFlight,
    NotADirectory,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandFinish {
    Attached(usize),
    Failed,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub path: PathBuf,
    pub name: String,
    pub depth: usize,
    pub is_dir: bool,
    pub is_loaded: bool,
    pub is_loading: bool,
    pub size: u64,
}

pub fn find<'a>(root: &'a FileNode, path: &Path) -> Option<&'a FileNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.path == path {
            return Some(node);
        }
        if let Some(children) = &node.children {
            stack.extend(children.iter().filter(|c| path.starts_with(&c.path)));
        }
    }
    None
}

pub fn find_mut<'a>(root: &'a mut FileNode, path: &Path) -> Option<&'a mut FileNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.path == path {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            stack.extend(children.iter_mut().filter(|c| path.starts_with(&c.path)));
        }
    }
    None
}

pub fn begin_expand(root: &mut FileNode, path: &Path) -> ExpandStart {
    let Some(node) = find_mut(root, path) else {
        return ExpandStart::Missing;
    };
    if !node.is_dir {
        return ExpandStart::NotADirectory;
    }
    if node.children.is_some() {
        return ExpandStart::AlreadyLoaded;
    }
    if node.is_loading {
        return ExpandStart::InFlight;
    }
    node.is_loading = true;
    ExpandStart::Dispatch
}

pub fn finish_expand(
    root: &mut FileNode,
    path: &Path,
    result: Result<Vec<FileNode>, String>,
) -> ExpandFinish {
    let Some(node) = find_mut(root, path) else {
        return ExpandFinish::Stale;
    };
    if !node.is_loading {
        return ExpandFinish::Stale;
    }
    node.is_loading = false;
    match result {
        Ok(children) => {
            let count = children.len();
            node.children = Some(children);
            ExpandFinish::Attached(count)
        }
        Err(_) => ExpandFinish::Failed,
    }
}

pub fn loaded_paths(node: &FileNode) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current.path.clone());
        if let Some(children) = &current.children {
            stack.extend(children.iter().rev());
        }
    }
    out
}

// A filtered row stays visible when a loaded descendant matches.
pub fn visible_rows(
    root: &FileNode,
    expanded: &BTreeSet<PathBuf>,
    query: &SearchQuery,
    show_hidden: bool,
) -> Vec<Row> {
    let Some(top) = &root.children else {
        return Vec::new();
    };

    let keep = if query.is_empty() {
        None
    } else {
        Some(matching_paths(top, query))
    };

    let mut rows = Vec::new();
    let mut stack: Vec<(&FileNode, usize)> = top.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        if !show_hidden && node.name.starts_with('.') {
            continue;
        }
        if let Some(keep) = &keep
            && !keep.contains(&node.path)
        {
            continue;
        }
        rows.push(Row {
            path: node.path.clone(),
            name: node.name.clone(),
            depth,
            is_dir: node.is_dir,
            is_loaded: node.is_loaded(),
            is_loading: node.is_loading,
            size: node.size,
        });
        if expanded.contains(&node.path)
            && let Some(children) = &node.children
        {
            stack.extend(children.iter().rev().map(|c| (c, depth + 1)));
        }
    }
    rows
}

fn matching_paths(top: &[FileNode], query: &SearchQuery) -> BTreeSet<PathBuf> {
    // Pre-order listing with parent links; walking it backwards visits
    // children before their parents.
    let mut order: Vec<(&FileNode, Option<usize>)> = Vec::new();
    let mut stack: Vec<(&FileNode, Option<usize>)> = top.iter().map(|n| (n, None)).collect();
    while let Some((node, parent)) = stack.pop() {
        let idx = order.len();
        order.push((node, parent));
        if let Some(children) = &node.children {
            stack.extend(children.iter().map(|c| (c, Some(idx))));
        }
    }

    let mut visible = vec![false; order.len()];
    for idx in (0..order.len()).rev() {
        let (node, parent) = order[idx];
        if query.matches(&node.name) {
            visible[idx] = true;
        }
        if visible[idx]
            && let Some(parent) = parent
        {
            visible[parent] = true;
        }
    }

    order
        .iter()
        .zip(visible)
        .filter(|(_, keep)| *keep)
        .map(|((node, _), _)| node.path.clone())
        .collect()
}
