use crate::domain::FileNode;
use crate::tree;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Multi(BTreeSet<PathBuf>),
    Single(Option<PathBuf>),
}

impl Selection {
    pub fn multi() -> Self {
        Self::Multi(BTreeSet::new())
    }

    pub fn single() -> Self {
        Self::Single(None)
    }

    pub fn contains(&self, path: &Path) -> bool {
        match self {
            Self::Multi(set) => set.contains(path),
            Self::Single(current) => current.as_deref() == Some(path),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Multi(set) => set.len(),
            Self::Single(current) => usize::from(current.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Multi(set) => set.iter().cloned().collect(),
            Self::Single(current) => current.iter().cloned().collect(),
        }
    }

    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Multi(_) => None,
            Self::Single(current) => current.as_deref(),
        }
    }

    pub fn toggle(&mut self, path: &Path) -> bool {
        match self {
            Self::Multi(set) => {
                if !set.remove(path) {
                    set.insert(path.to_path_buf());
                    return true;
                }
                false
            }
            Self::Single(current) => {
                if current.as_deref() == Some(path) {
                    *current = None;
                    false
                } else {
                    *current = Some(path.to_path_buf());
                    true
                }
            }
        }
    }

    pub fn set(&mut self, path: &Path) {
        match self {
            Self::Multi(set) => {
                set.insert(path.to_path_buf());
            }
            Self::Single(current) => *current = Some(path.to_path_buf()),
        }
    }

    /// Unloaded directories are not fetched and not cascaded into.
    pub fn toggle_recursive(&mut self, node: &FileNode, selected: bool) -> usize {
        match self {
            Self::Multi(set) => {
                let paths = if node.is_dir {
                    tree::loaded_paths(node)
                } else {
                    vec![node.path.clone()]
                };
                let count = paths.len();
                for path in paths {
                    if selected {
                        set.insert(path);
                    } else {
                        set.remove(&path);
                    }
                }
                count
            }
            Self::Single(current) => {
                if selected {
                    *current = Some(node.path.clone());
                } else if current.as_deref() == Some(node.path.as_path()) {
                    *current = None;
                }
                1
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Multi(set) => set.clear(),
            Self::Single(current) => *current = None,
        }
    }
}
