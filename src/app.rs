use crate::config::AppConfig;
use crate::copy::{CopyJob, CopyOrchestrator};
use crate::domain::{FileNode, Notice, NoticeLevel, PaneSide};
use crate::events::ProgressBus;
use crate::pane::{ExpandRequest, NavigationRequest, PaneState};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    None,
    Help,
    /// Search input for the focused pane. `original` is restored on Esc.
    Search {
        value: String,
        original: String,
    },
}

#[derive(Debug, Clone)]
pub enum BackendTask {
    Navigate(NavigationRequest),
    Expand(ExpandRequest),
    Copy(CopyJob),
}

#[derive(Debug, Clone)]
pub enum BackendEvent {
    Navigated {
        request: NavigationRequest,
        result: Result<FileNode, String>,
    },
    Expanded {
        request: ExpandRequest,
        result: Result<Vec<FileNode>, String>,
    },
    CopyFinished {
        job: CopyJob,
        result: Result<(), String>,
    },
}

pub struct App {
    pub config: AppConfig,
    pub focus: PaneSide,
    pub left: PaneState,
    pub right: PaneState,
    pub copy: CopyOrchestrator,
    pub logs: Vec<String>,
    pub notice: Option<Notice>,
    pub modal: ModalState,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig, bus: ProgressBus) -> Self {
        let regex = config.regex_search;
        Self {
            config,
            focus: PaneSide::Left,
            left: PaneState::new(PaneSide::Left, regex),
            right: PaneState::new(PaneSide::Right, regex),
            copy: CopyOrchestrator::new(bus),
            logs: Vec::new(),
            notice: None,
            modal: ModalState::None,
            should_quit: false,
        }
    }

    pub fn pane(&self, side: PaneSide) -> &PaneState {
        match side {
            PaneSide::Left => &self.left,
            PaneSide::Right => &self.right,
        }
    }

    pub fn pane_mut(&mut self, side: PaneSide) -> &mut PaneState {
        match side {
            PaneSide::Left => &mut self.left,
            PaneSide::Right => &mut self.right,
        }
    }

    pub fn focused(&self) -> &PaneState {
        self.pane(self.focus)
    }

    pub fn focused_mut(&mut self) -> &mut PaneState {
        self.pane_mut(self.focus)
    }

    pub fn switch_focus(&mut self) {
        self.focus = self.focus.other();
    }

    pub fn busy(&self) -> bool {
        self.left.is_loading || self.right.is_loading || self.copy.is_copying()
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let show_hidden = self.config.show_hidden;
        self.focused_mut().move_cursor(delta, show_hidden);
    }

    pub fn toggle_hidden(&mut self) {
        self.config.show_hidden = !self.config.show_hidden;
        let show_hidden = self.config.show_hidden;
        self.left.clamp_cursor(show_hidden);
        self.right.clamp_cursor(show_hidden);
    }

    pub fn open_help(&mut self) {
        self.modal = ModalState::Help;
    }

    pub fn open_search(&mut self) {
        let original = self.focused().filter().to_string();
        self.modal = ModalState::Search {
            value: original.clone(),
            original,
        };
    }

    pub fn close_modal(&mut self) {
        self.modal = ModalState::None;
    }

    pub fn log(&mut self, line: String) {
        self.logs.push(line);
        if self.logs.len() > MAX_LOG_LINES {
            let to_trim = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..to_trim);
        }
    }

    /// Shows a toast and records it in the log panel.
    pub fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(message = %notice.message, "notice"),
            NoticeLevel::Success => tracing::info!(message = %notice.message, "success"),
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "error notice"),
        }
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        self.log(format!("[{tag}] {}", notice.message));
        self.notice = Some(notice);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(Notice::new(NoticeLevel::Info, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(Notice::new(NoticeLevel::Error, message));
    }

    pub fn expire_notice(&mut self, now: Instant) {
        let timeout = Duration::from_millis(self.config.notice_timeout_ms);
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| now.duration_since(notice.raised_at) >= timeout)
        {
            self.notice = None;
        }
    }

    /// Newline-separated source selection, for the clipboard.
    pub fn selected_paths_text(&self) -> String {
        self.left
            .selection
            .paths()
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn destination(&self) -> Option<PathBuf> {
        self.right.selection.destination().map(PathBuf::from)
    }
}
