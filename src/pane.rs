use crate::domain::{FileNode, PaneSide};
use crate::search::SearchQuery;
use crate::selection::Selection;
use crate::tree::{self, ExpandFinish, ExpandStart, Row};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMove {
    Push,
    Jump(usize),
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub side: PaneSide,
    pub path: PathBuf,
    pub token: u64,
    pub history: HistoryMove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandRequest {
    pub side: PaneSide,
    pub path: PathBuf,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Applied,
    Failed(String),
    Stale,
}

#[derive(Debug, Clone)]
pub struct PaneState {
    pub side: PaneSide,
    pub root: Option<FileNode>,
    pub selection: Selection,
    pub is_loading: bool,
    pub expanded: BTreeSet<PathBuf>,
    pub cursor: usize,
    history: Vec<PathBuf>,
    history_index: Option<usize>,
    nav_token: u64,
    root_generation: u64,
    filter: String,
    regex_filter: bool,
    query: SearchQuery,
}

impl PaneState {
    pub fn new(side: PaneSide, regex_filter: bool) -> Self {
        let selection = match side {
            PaneSide::Left => Selection::multi(),
            PaneSide::Right => Selection::single(),
        };
        Self {
            side,
            root: None,
            selection,
            is_loading: false,
            expanded: BTreeSet::new(),
            cursor: 0,
            history: Vec::new(),
            history_index: None,
            nav_token: 0,
            root_generation: 0,
            filter: String::new(),
            regex_filter,
            query: SearchQuery::default(),
        }
    }

    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    pub fn history_index(&self) -> Option<usize> {
        self.history_index
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.history_index
            .and_then(|idx| self.history.get(idx))
            .map(PathBuf::as_path)
    }

    pub fn can_go_back(&self) -> bool {
        self.history_index.is_some_and(|idx| idx > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.history_index
            .is_some_and(|idx| idx + 1 < self.history.len())
    }

    pub fn navigate_to(
        &mut self,
        path: impl Into<PathBuf>,
        add_to_history: bool,
    ) -> NavigationRequest {
        let history = if add_to_history {
            HistoryMove::Push
        } else {
            HistoryMove::Keep
        };
        self.issue(path.into(), history)
    }

    pub fn go_back(&mut self) -> Option<NavigationRequest> {
        let idx = self.history_index.filter(|idx| *idx > 0)? - 1;
        let path = self.history[idx].clone();
        Some(self.issue(path, HistoryMove::Jump(idx)))
    }

    pub fn go_forward(&mut self) -> Option<NavigationRequest> {
        let idx = self.history_index? + 1;
        let path = self.history.get(idx)?.clone();
        Some(self.issue(path, HistoryMove::Jump(idx)))
    }

    pub fn go_up(&mut self) -> Option<NavigationRequest> {
        let parent = self.current_path()?.parent()?.to_path_buf();
        Some(self.issue(parent, HistoryMove::Push))
    }

    pub fn refresh(&mut self) -> Option<NavigationRequest> {
        let path = self.current_path()?.to_path_buf();
        Some(self.issue(path, HistoryMove::Keep))
    }

    fn issue(&mut self, path: PathBuf, history: HistoryMove) -> NavigationRequest {
        self.nav_token += 1;
        self.is_loading = true;
        NavigationRequest {
            side: self.side,
            path,
            token: self.nav_token,
            history,
        }
    }

    /// Only the most recently issued request is honored.
    pub fn apply_navigation(
        &mut self,
        token: u64,
        history: HistoryMove,
        path: &Path,
        result: Result<FileNode, String>,
    ) -> NavigationOutcome {
        if token != self.nav_token {
            return NavigationOutcome::Stale;
        }
        self.is_loading = false;

        let root = match result {
            Ok(root) if root.is_dir => root,
            Ok(root) => {
                return NavigationOutcome::Failed(format!(
                    "{} is not a directory",
                    root.path.display()
                ));
            }
            Err(message) => return NavigationOutcome::Failed(message),
        };

        match history {
            HistoryMove::Push => {
                let keep = self.history_index.map_or(0, |idx| idx + 1);
                self.history.truncate(keep);
                self.history.push(path.to_path_buf());
                self.history_index = Some(self.history.len() - 1);
            }
            HistoryMove::Jump(idx) if idx < self.history.len() => {
                self.history_index = Some(idx);
            }
            HistoryMove::Jump(_) | HistoryMove::Keep => {}
        }

        self.root = Some(root);
        self.root_generation += 1;
        self.expanded.clear();
        self.cursor = 0;
        NavigationOutcome::Applied
    }

    pub fn request_expand(&mut self, path: &Path) -> Option<ExpandRequest> {
        let root = self.root.as_mut()?;
        match tree::begin_expand(root, path) {
            ExpandStart::Dispatch => {
                self.expanded.insert(path.to_path_buf());
                Some(ExpandRequest {
                    side: self.side,
                    path: path.to_path_buf(),
                    generation: self.root_generation,
                })
            }
            ExpandStart::AlreadyLoaded | ExpandStart::InFlight => {
                self.expanded.insert(path.to_path_buf());
                None
            }
            ExpandStart::NotADirectory | ExpandStart::Missing => None,
        }
    }

    pub fn apply_expansion(
        &mut self,
        generation: u64,
        path: &Path,
        result: Result<Vec<FileNode>, String>,
    ) -> ExpandFinish {
        if generation != self.root_generation {
            return ExpandFinish::Stale;
        }
        let Some(root) = self.root.as_mut() else {
            return ExpandFinish::Stale;
        };
        let finish = tree::finish_expand(root, path, result);
        if finish == ExpandFinish::Failed {
            self.expanded.remove(path);
        }
        finish
    }

    pub fn collapse(&mut self, path: &Path) -> bool {
        let before = self.expanded.len();
        self.expanded.retain(|p| !p.starts_with(path));
        before != self.expanded.len()
    }

    pub fn node(&self, path: &Path) -> Option<&FileNode> {
        tree::find(self.root.as_ref()?, path)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn regex_filter(&self) -> bool {
        self.regex_filter
    }

    pub fn set_filter(&mut self, filter: String) {
        self.query = SearchQuery::parse(&filter, self.regex_filter);
        self.filter = filter;
        self.cursor = 0;
    }

    pub fn toggle_regex_filter(&mut self) {
        self.regex_filter = !self.regex_filter;
        self.query = SearchQuery::parse(&self.filter, self.regex_filter);
    }

    pub fn rows(&self, show_hidden: bool) -> Vec<Row> {
        match &self.root {
            Some(root) => tree::visible_rows(root, &self.expanded, &self.query, show_hidden),
            None => Vec::new(),
        }
    }

    pub fn row_at_cursor(&self, show_hidden: bool) -> Option<Row> {
        self.rows(show_hidden).into_iter().nth(self.cursor)
    }

    pub fn move_cursor(&mut self, delta: isize, show_hidden: bool) {
        let len = self.rows(show_hidden).len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    pub fn clamp_cursor(&mut self, show_hidden: bool) {
        let len = self.rows(show_hidden).len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }
}
