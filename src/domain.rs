use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// One file-system entry as reported by a directory scan.
///
/// `children` is `None` until the directory has been scanned. A scanned
/// directory with no entries holds `Some(vec![])`, so "loaded and empty"
/// never triggers another scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub children: Option<Vec<FileNode>>,
    pub is_loading: bool,
}

impl FileNode {
    pub fn file(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            path,
            is_dir: false,
            size,
            modified: None,
            children: None,
            is_loading: false,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            path,
            is_dir: true,
            size: 0,
            modified: None,
            children: None,
            is_loading: false,
        }
    }

    pub fn with_children(mut self, children: Vec<FileNode>) -> Self {
        if self.is_dir {
            self.children = Some(children);
        }
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyProgress {
    pub current_file: String,
    pub files_done: usize,
    pub total_files: usize,
    pub percentage: f64,
}

impl CopyProgress {
    pub fn start(total_files: usize) -> Self {
        Self {
            current_file: String::new(),
            files_done: 0,
            total_files,
            percentage: 0.0,
        }
    }

    pub fn at(current_file: impl Into<String>, files_done: usize, total_files: usize) -> Self {
        let percentage = if total_files == 0 {
            100.0
        } else {
            files_done as f64 / total_files as f64 * 100.0
        };
        Self {
            current_file: current_file.into(),
            files_done,
            total_files,
            percentage: percentage.clamp(0.0, 100.0),
        }
    }
}

impl fmt::Display for CopyProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%) {}",
            self.files_done, self.total_files, self.percentage, self.current_file
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneSide {
    Left,
    Right,
}

impl PaneSide {
    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "source",
            Self::Right => "destination",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: Instant,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            raised_at: Instant::now(),
        }
    }
}
