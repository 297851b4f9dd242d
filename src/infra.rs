use crate::domain::{CopyProgress, FileNode, file_name_of};
use anyhow::{Context, Result};
use crossterm::clipboard::CopyToClipboard;
use crossterm::execute;
use std::fs;
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("home directory could not be resolved")]
    NoHomeDir,
    #[error("destination directory does not exist: {0}")]
    MissingDestination(PathBuf),
    #[error("destination is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("no valid items to copy")]
    NothingToCopy,
    #[error("cannot copy {source_dir} into itself ({destination})")]
    DestinationInsideSource {
        source_dir: PathBuf,
        destination: PathBuf,
    },
}

pub type FsResult<T> = std::result::Result<T, FsError>;

trait IoContext<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> FsResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> FsResult<T> {
        self.map_err(|source| FsError::Io {
            context: context(),
            source,
        })
    }
}

/// Blocking file-system collaborator. Called from the worker through
/// `spawn_blocking`, never from the UI loop.
pub trait FileSystemClient: Send + Sync {
    fn home_dir(&self) -> FsResult<PathBuf>;
    fn scan_directory(&self, path: &Path) -> FsResult<FileNode>;
    fn copy_files(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        emit: &dyn Fn(CopyProgress),
    ) -> FsResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl FileSystemClient for LocalFileSystem {
    fn home_dir(&self) -> FsResult<PathBuf> {
        dirs::home_dir().ok_or(FsError::NoHomeDir)
    }

    fn scan_directory(&self, path: &Path) -> FsResult<FileNode> {
        tracing::debug!(path = %path.display(), "scanning directory");
        let meta = fs::symlink_metadata(path)
            .io_context(|| format!("failed to stat {}", path.display()))?;
        let mut root = node_from_metadata(path, &meta);
        if !root.is_dir {
            return Ok(root);
        }

        let mut children = Vec::new();
        let entries =
            fs::read_dir(path).io_context(|| format!("failed to read {}", path.display()))?;
        for entry in entries {
            let Ok(entry) = entry else {
                continue;
            };
            let child_path = entry.path();
            let Ok(meta) = fs::symlink_metadata(&child_path) else {
                continue;
            };
            children.push(node_from_metadata(&child_path, &meta));
        }
        sort_entries(&mut children);
        tracing::debug!(path = %path.display(), entries = children.len(), "scan complete");

        root.children = Some(children);
        Ok(root)
    }

    fn copy_files(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        emit: &dyn Fn(CopyProgress),
    ) -> FsResult<()> {
        let dest_meta = fs::metadata(destination)
            .map_err(|_| FsError::MissingDestination(destination.to_path_buf()))?;
        if !dest_meta.is_dir() {
            return Err(FsError::NotADirectory(destination.to_path_buf()));
        }

        let items: Vec<&PathBuf> = sources.iter().filter(|src| src.exists()).collect();
        if items.is_empty() {
            return Err(FsError::NothingToCopy);
        }

        reject_nested_destination(&items, destination)?;

        let total = items.len();
        for (done, src) in items.into_iter().enumerate() {
            let name = file_name_of(src);
            emit(CopyProgress::at(name.clone(), done, total));

            let target = destination.join(&name);
            if src.is_dir() {
                copy_dir(src, &target)?;
            } else {
                copy_file(src, &target)?;
            }
        }

        emit(CopyProgress::at("Complete", total, total));
        Ok(())
    }
}

/// Builds a node from `lstat` data; a symlink counts as a directory when its
/// target is one.
fn node_from_metadata(path: &Path, meta: &fs::Metadata) -> FileNode {
    let is_dir = if meta.file_type().is_symlink() {
        fs::metadata(path).is_ok_and(|target| target.is_dir())
    } else {
        meta.is_dir()
    };
    let mut node = if is_dir {
        FileNode::dir(path)
    } else {
        FileNode::file(path, meta.len())
    };
    node.modified = meta.modified().ok();
    node
}

fn sort_entries(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
}

fn reject_nested_destination(sources: &[&PathBuf], destination: &Path) -> FsResult<()> {
    let dest = fs::canonicalize(destination)
        .io_context(|| format!("failed to resolve {}", destination.display()))?;
    for src in sources.iter().filter(|src| src.is_dir()) {
        let resolved = fs::canonicalize(src)
            .io_context(|| format!("failed to resolve {}", src.display()))?;
        if dest.starts_with(&resolved) {
            return Err(FsError::DestinationInsideSource {
                source_dir: src.to_path_buf(),
                destination: destination.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn copy_file(src: &Path, dest: &Path) -> FsResult<()> {
    fs::copy(src, dest)
        .io_context(|| format!("failed to copy file {}", src.display()))?;
    preserve_mtime(src, dest);
    Ok(())
}

/// Copies a directory tree with a worklist. Symlinks inside the tree are
/// skipped. Directory mtimes are restored last, deepest first, so creating
/// children does not clobber them.
fn copy_dir(src: &Path, dest: &Path) -> FsResult<()> {
    let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];
    let mut created = Vec::new();

    while let Some((from, to)) = pending.pop() {
        fs::create_dir_all(&to)
            .io_context(|| format!("failed to create {}", to.display()))?;
        let entries = fs::read_dir(&from)
            .io_context(|| format!("failed to copy directory {}", from.display()))?;
        for entry in entries {
            let entry = entry.io_context(|| format!("failed to read {}", from.display()))?;
            let file_type = entry
                .file_type()
                .io_context(|| format!("failed to stat {}", entry.path().display()))?;
            let child_to = to.join(entry.file_name());
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                pending.push((entry.path(), child_to));
            } else {
                copy_file(&entry.path(), &child_to)?;
            }
        }
        created.push((from, to));
    }

    for (from, to) in created.iter().rev() {
        preserve_mtime(from, to);
    }
    Ok(())
}

fn preserve_mtime(src: &Path, dest: &Path) {
    if let Ok(mtime) = fs::metadata(src).and_then(|meta| meta.modified())
        && let Err(err) =
            filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime))
    {
        tracing::warn!(path = %dest.display(), %err, "failed to preserve mtime");
    }
}

/// Places `text` on the system clipboard through an OSC 52 escape sequence.
pub fn set_clipboard_text(text: &str) -> Result<()> {
    let mut out = stdout();
    execute!(out, CopyToClipboard::to_clipboard_from(text))
        .context("failed to write clipboard escape sequence")?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}
