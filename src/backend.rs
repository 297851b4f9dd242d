use crate::app::{BackendEvent, BackendTask};
use crate::copy::CopyJob;
use crate::domain::FileNode;
use crate::events::{COPY_PROGRESS_EVENT, ProgressBus};
use crate::infra::{FileSystemClient, FsResult};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Runs collaborator calls on the blocking pool and answers every task with
/// exactly one event, including when the blocking call panics.
///
/// Scans are handled in order. A copy runs on its own task so the panes stay
/// browsable while it is in progress.
pub(crate) async fn worker_loop(
    client: Arc<dyn FileSystemClient>,
    bus: ProgressBus,
    mut task_rx: UnboundedReceiver<BackendTask>,
    event_tx: UnboundedSender<BackendEvent>,
) {
    while let Some(task) = task_rx.recv().await {
        let event = match task {
            BackendTask::Navigate(request) => {
                let c = client.clone();
                let path = request.path.clone();
                let result = tokio::task::spawn_blocking(move || c.scan_directory(&path)).await;
                BackendEvent::Navigated {
                    request,
                    result: flatten_error(result),
                }
            }
            BackendTask::Expand(request) => {
                let c = client.clone();
                let path = request.path.clone();
                let result = tokio::task::spawn_blocking(move || {
                    c.scan_directory(&path).map(children_of)
                })
                .await;
                let result = flatten_error(result).and_then(|children| {
                    children
                        .ok_or_else(|| format!("{} is not a directory", request.path.display()))
                });
                BackendEvent::Expanded { request, result }
            }
            BackendTask::Copy(job) => {
                tokio::spawn(run_copy(client.clone(), bus.clone(), job, event_tx.clone()));
                continue;
            }
        };

        if event_tx.send(event).is_err() {
            break;
        }
    }
}

async fn run_copy(
    client: Arc<dyn FileSystemClient>,
    bus: ProgressBus,
    job: CopyJob,
    event_tx: UnboundedSender<BackendEvent>,
) {
    let sources = job.sources.clone();
    let destination = job.destination.clone();
    let result = tokio::task::spawn_blocking(move || {
        client.copy_files(&sources, &destination, &|progress| {
            bus.emit(COPY_PROGRESS_EVENT, progress);
        })
    })
    .await;

    let result = flatten_error(result);
    if let Err(message) = &result {
        tracing::warn!(%message, "copy task failed");
    }
    let _ = event_tx.send(BackendEvent::CopyFinished { job, result });
}

fn children_of(node: FileNode) -> Option<Vec<FileNode>> {
    if node.is_dir {
        Some(node.children.unwrap_or_default())
    } else {
        None
    }
}

fn flatten_error<T>(res: Result<FsResult<T>, tokio::task::JoinError>) -> Result<T, String> {
    match res {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(err) => Err(format!("join error: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CopyProgress, PaneSide};
    use crate::infra::FsError;
    use crate::pane::{ExpandRequest, HistoryMove, NavigationRequest};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeFileSystem {
        listings: HashMap<PathBuf, FileNode>,
        copies: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
    }

    impl FakeFileSystem {
        fn with(mut self, node: FileNode) -> Self {
            self.listings.insert(node.path.clone(), node);
            self
        }
    }

    impl FileSystemClient for FakeFileSystem {
        fn home_dir(&self) -> FsResult<PathBuf> {
            Ok(PathBuf::from("/home/me"))
        }

        fn scan_directory(&self, path: &Path) -> FsResult<FileNode> {
            self.listings.get(path).cloned().ok_or_else(|| FsError::Io {
                context: format!("failed to stat {}", path.display()),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }

        fn copy_files(
            &self,
            sources: &[PathBuf],
            destination: &Path,
            emit: &dyn Fn(CopyProgress),
        ) -> FsResult<()> {
            if sources.is_empty() {
                return Err(FsError::NothingToCopy);
            }
            for (done, src) in sources.iter().enumerate() {
                emit(CopyProgress::at(src.display().to_string(), done, sources.len()));
            }
            emit(CopyProgress::at("Complete", sources.len(), sources.len()));
            self.copies
                .lock()
                .expect("lock")
                .push((sources.to_vec(), destination.to_path_buf()));
            Ok(())
        }
    }

    fn nav(path: &str, token: u64) -> NavigationRequest {
        NavigationRequest {
            side: PaneSide::Left,
            path: PathBuf::from(path),
            token,
            history: HistoryMove::Push,
        }
    }

    #[tokio::test]
    async fn scans_answer_with_results_and_errors() {
        let client = FakeFileSystem::default()
            .with(FileNode::dir("/h").with_children(vec![FileNode::file("/h/a", 1)]))
            .with(FileNode::file("/h/a", 1));
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        task_tx.send(BackendTask::Navigate(nav("/h", 1))).expect("send");
        task_tx.send(BackendTask::Navigate(nav("/missing", 2))).expect("send");
        task_tx
            .send(BackendTask::Expand(ExpandRequest {
                side: PaneSide::Right,
                path: PathBuf::from("/h/a"),
                generation: 1,
            }))
            .expect("send");
        drop(task_tx);

        worker_loop(Arc::new(client), ProgressBus::new(), task_rx, event_tx).await;

        match event_rx.recv().await.expect("first event") {
            BackendEvent::Navigated { request, result } => {
                assert_eq!(request.token, 1);
                let root = result.expect("listing");
                assert_eq!(root.children.map(|c| c.len()), Some(1));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match event_rx.recv().await.expect("second event") {
            BackendEvent::Navigated { request, result } => {
                assert_eq!(request.token, 2);
                assert!(result.expect_err("missing").contains("/missing"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match event_rx.recv().await.expect("third event") {
            BackendEvent::Expanded { result, .. } => {
                assert!(result.expect_err("file").contains("not a directory"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn copy_reports_progress_then_finishes() {
        let client = Arc::new(FakeFileSystem::default());
        let bus = ProgressBus::new();
        let mut progress = bus.subscribe(COPY_PROGRESS_EVENT);
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let job = CopyJob {
            sources: vec![PathBuf::from("/a"), PathBuf::from("/b")],
            destination: PathBuf::from("/dst"),
        };
        task_tx.send(BackendTask::Copy(job.clone())).expect("send");
        drop(task_tx);

        let worker = tokio::spawn(worker_loop(client.clone(), bus.clone(), task_rx, event_tx));

        match event_rx.recv().await.expect("copy event") {
            BackendEvent::CopyFinished { job: done, result } => {
                assert_eq!(done, job);
                assert_eq!(result, Ok(()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        worker.await.expect("worker");

        let last = progress.latest().expect("progress");
        assert_eq!(last.current_file, "Complete");
        assert_eq!(last.percentage, 100.0);
        assert_eq!(client.copies.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn copy_failure_carries_the_message() {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        task_tx
            .send(BackendTask::Copy(CopyJob {
                sources: Vec::new(),
                destination: PathBuf::from("/dst"),
            }))
            .expect("send");
        drop(task_tx);

        tokio::spawn(worker_loop(
            Arc::new(FakeFileSystem::default()),
            ProgressBus::new(),
            task_rx,
            event_tx,
        ));

        match event_rx.recv().await.expect("copy event") {
            BackendEvent::CopyFinished { result, .. } => {
                assert_eq!(result, Err("no valid items to copy".to_string()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn flatten_error_formats_all_cases() {
        assert_eq!(flatten_error::<u8>(Ok(Ok(3))), Ok(3));
        let err = flatten_error::<()>(Ok(Err(FsError::NothingToCopy)));
        assert_eq!(err, Err("no valid items to copy".to_string()));
    }
}
