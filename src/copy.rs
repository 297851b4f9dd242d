use crate::domain::{CopyProgress, Notice, NoticeLevel};
use crate::events::{COPY_PROGRESS_EVENT, ProgressBus, Subscription};
use crate::selection::Selection;
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum CopyState {
    Idle,
    ConfirmPending {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    Copying {
        sources: Vec<PathBuf>,
        destination: PathBuf,
        progress: CopyProgress,
        subscription: Subscription<CopyProgress>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    NothingSelected,
    NoDestination,
    Busy,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Refusal::NothingSelected => "no files selected",
            Refusal::NoDestination => "no destination selected",
            Refusal::Busy => "a copy is already in progress",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
}

pub struct CopyOrchestrator {
    state: CopyState,
    bus: ProgressBus,
}

impl CopyOrchestrator {
    pub fn new(bus: ProgressBus) -> Self {
        Self {
            state: CopyState::Idle,
            bus,
        }
    }

    pub fn state(&self) -> &CopyState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, CopyState::Idle)
    }

    pub fn is_copying(&self) -> bool {
        matches!(self.state, CopyState::Copying { .. })
    }

    pub fn progress(&self) -> Option<&CopyProgress> {
        match &self.state {
            CopyState::Copying { progress, .. } => Some(progress),
            _ => None,
        }
    }

    pub fn initiate(
        &mut self,
        sources: &Selection,
        destination: Option<&Path>,
    ) -> Result<(), Refusal> {
        if !self.is_idle() {
            return Err(Refusal::Busy);
        }
        if sources.is_empty() {
            return Err(Refusal::NothingSelected);
        }
        let Some(destination) = destination else {
            return Err(Refusal::NoDestination);
        };
        self.state = CopyState::ConfirmPending {
            sources: sources.paths(),
            destination: destination.to_path_buf(),
        };
        Ok(())
    }

    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, CopyState::ConfirmPending { .. }) {
            self.state = CopyState::Idle;
            return true;
        }
        false
    }

    pub fn confirm(&mut self) -> Option<CopyJob> {
        let CopyState::ConfirmPending {
            sources,
            destination,
        } = mem::replace(&mut self.state, CopyState::Idle)
        else {
            return None;
        };
        let subscription = self.bus.subscribe(COPY_PROGRESS_EVENT);
        let job = CopyJob {
            sources: sources.clone(),
            destination: destination.clone(),
        };
        tracing::info!(
            files = sources.len(),
            destination = %destination.display(),
            listeners = self.bus.subscriber_count(COPY_PROGRESS_EVENT),
            "copy started"
        );
        self.state = CopyState::Copying {
            progress: CopyProgress::start(sources.len()),
            sources,
            destination,
            subscription,
        };
        Some(job)
    }

    pub fn poll_progress(&mut self) -> bool {
        let CopyState::Copying {
            progress,
            subscription,
            ..
        } = &mut self.state
        else {
            return false;
        };
        match subscription.latest() {
            Some(latest) => {
                *progress = latest;
                true
            }
            None => false,
        }
    }

    /// Returns to `Idle`, dropping the subscription, before the outcome is examined.
    pub fn finish(
        &mut self,
        result: Result<(), String>,
        sources: &mut Selection,
    ) -> Option<Notice> {
        let CopyState::Copying {
            sources: copied,
            destination,
            ..
        } = mem::replace(&mut self.state, CopyState::Idle)
        else {
            return None;
        };

        let notice = match result {
            Ok(()) => {
                sources.clear();
                tracing::info!(files = copied.len(), destination = %destination.display(), "copy finished");
                Notice::new(
                    NoticeLevel::Success,
                    format!(
                        "copied {} item(s) to {}",
                        copied.len(),
                        destination.display()
                    ),
                )
            }
            Err(detail) => {
                tracing::error!(destination = %destination.display(), %detail, "copy failed");
                Notice::new(NoticeLevel::Error, format!("copy failed: {detail}"))
            }
        };
        Some(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selected(paths: &[&str]) -> Selection {
        let mut selection = Selection::multi();
        for path in paths {
            selection.set(Path::new(path));
        }
        selection
    }

    #[test]
    fn initiate_requires_selection_and_destination() {
        let mut copy = CopyOrchestrator::new(ProgressBus::new());
        assert_eq!(
            copy.initiate(&Selection::multi(), Some(Path::new("/dst"))),
            Err(Refusal::NothingSelected)
        );
        assert!(copy.is_idle());
        assert_eq!(
            copy.initiate(&selected(&["/a"]), None),
            Err(Refusal::NoDestination)
        );
        assert!(copy.is_idle());
        assert_eq!(Refusal::NothingSelected.to_string(), "no files selected");
        assert_eq!(Refusal::NoDestination.to_string(), "no destination selected");
    }

    #[test]
    fn cancel_returns_to_idle_without_subscribing() {
        let bus = ProgressBus::new();
        let mut copy = CopyOrchestrator::new(bus.clone());
        copy.initiate(&selected(&["/a"]), Some(Path::new("/dst")))
            .expect("pending");
        assert!(matches!(copy.state(), CopyState::ConfirmPending { .. }));
        assert!(copy.cancel());
        assert!(copy.is_idle());
        assert_eq!(bus.subscriber_count(COPY_PROGRESS_EVENT), 0);
        assert!(!copy.cancel());
    }

    #[test]
    fn confirm_subscribes_before_returning_the_job() {
        let bus = ProgressBus::new();
        let mut copy = CopyOrchestrator::new(bus.clone());
        copy.initiate(&selected(&["/b", "/a"]), Some(Path::new("/dst")))
            .expect("pending");
        let job = copy.confirm().expect("job");
        assert_eq!(bus.subscriber_count(COPY_PROGRESS_EVENT), 1);
        assert_eq!(
            job,
            CopyJob {
                sources: vec![PathBuf::from("/a"), PathBuf::from("/b")],
                destination: PathBuf::from("/dst"),
            }
        );
        assert_eq!(copy.progress().map(|p| p.total_files), Some(2));
        assert_eq!(copy.progress().map(|p| p.files_done), Some(0));
        assert_eq!(
            copy.initiate(&selected(&["/c"]), Some(Path::new("/dst"))),
            Err(Refusal::Busy)
        );
    }

    #[test]
    fn progress_events_replace_the_record() {
        let bus = ProgressBus::new();
        let mut copy = CopyOrchestrator::new(bus.clone());
        copy.initiate(&selected(&["/a", "/b"]), Some(Path::new("/dst")))
            .expect("pending");
        copy.confirm().expect("job");

        assert!(!copy.poll_progress());
        bus.emit(COPY_PROGRESS_EVENT, CopyProgress::at("b", 1, 2));
        bus.emit(COPY_PROGRESS_EVENT, CopyProgress::at("a", 0, 2));
        assert!(copy.poll_progress());
        assert_eq!(copy.progress().map(|p| p.current_file.as_str()), Some("a"));
    }

    #[test]
    fn success_clears_selection_and_unsubscribes() {
        let bus = ProgressBus::new();
        let mut copy = CopyOrchestrator::new(bus.clone());
        let mut sources = selected(&["/a"]);
        copy.initiate(&sources, Some(Path::new("/dst"))).expect("pending");
        copy.confirm().expect("job");

        let notice = copy.finish(Ok(()), &mut sources).expect("notice");
        assert_eq!(notice.level, NoticeLevel::Success);
        assert!(copy.is_idle());
        assert!(copy.progress().is_none());
        assert!(sources.is_empty());
        assert_eq!(bus.subscriber_count(COPY_PROGRESS_EVENT), 0);
    }

    #[test]
    fn failure_keeps_selection_and_unsubscribes() {
        let bus = ProgressBus::new();
        let mut copy = CopyOrchestrator::new(bus.clone());
        let mut sources = selected(&["/a"]);
        copy.initiate(&sources, Some(Path::new("/dst"))).expect("pending");
        copy.confirm().expect("job");

        let notice = copy
            .finish(Err("disk full".to_string()), &mut sources)
            .expect("notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("disk full"));
        assert!(copy.is_idle());
        assert_eq!(sources.len(), 1);
        assert_eq!(bus.subscriber_count(COPY_PROGRESS_EVENT), 0);
    }

    #[test]
    fn finish_outside_copying_is_ignored() {
        let mut copy = CopyOrchestrator::new(ProgressBus::new());
        let mut sources = selected(&["/a"]);
        assert!(copy.finish(Ok(()), &mut sources).is_none());
        assert_eq!(sources.len(), 1);
    }
}
