use crate::app::{App, BackendTask};
use crate::domain::PaneSide;
use crate::infra::set_clipboard_text;
use crate::pane::NavigationRequest;
use crate::tree::{self, Row};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn send_task(task_tx: &UnboundedSender<BackendTask>, task: BackendTask) -> Result<()> {
    task_tx
        .send(task)
        .map_err(|err| anyhow::anyhow!("failed to dispatch task: {err}"))
}

fn dispatch_navigation(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    request: Option<NavigationRequest>,
) -> Result<()> {
    let Some(request) = request else {
        return Ok(());
    };
    tracing::debug!(
        pane = request.side.label(),
        path = %request.path.display(),
        token = request.token,
        "navigate"
    );
    app.log(format!(
        "{}: loading {}",
        request.side.label(),
        request.path.display()
    ));
    send_task(task_tx, BackendTask::Navigate(request))
}

pub(crate) fn navigate(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    side: PaneSide,
    path: PathBuf,
) -> Result<()> {
    let request = app.pane_mut(side).navigate_to(path, true);
    dispatch_navigation(app, task_tx, Some(request))
}

pub(crate) fn go_back(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let request = app.focused_mut().go_back();
    dispatch_navigation(app, task_tx, request)
}

pub(crate) fn go_forward(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let request = app.focused_mut().go_forward();
    dispatch_navigation(app, task_tx, request)
}

pub(crate) fn go_up(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let request = app.focused_mut().go_up();
    dispatch_navigation(app, task_tx, request)
}

pub(crate) fn refresh(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    side: PaneSide,
) -> Result<()> {
    let request = app.pane_mut(side).refresh();
    dispatch_navigation(app, task_tx, request)
}

fn cursor_row(app: &App) -> Option<Row> {
    app.focused().row_at_cursor(app.config.show_hidden)
}

/// Makes the directory under the cursor the new root of the focused pane.
pub(crate) fn enter_selected(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let Some(row) = cursor_row(app) else {
        return Ok(());
    };
    if !row.is_dir {
        return Ok(());
    }
    let side = app.focus;
    navigate(app, task_tx, side, row.path)
}

pub(crate) fn expand_selected(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let Some(row) = cursor_row(app) else {
        return Ok(());
    };
    if !row.is_dir {
        return Ok(());
    }
    if let Some(request) = app.focused_mut().request_expand(&row.path) {
        tracing::debug!(path = %request.path.display(), "expand");
        send_task(task_tx, BackendTask::Expand(request))?;
    }
    Ok(())
}

/// Collapses the directory under the cursor, or the nearest expanded
/// ancestor, and leaves the cursor on the collapsed row.
pub(crate) fn collapse_selected(app: &mut App) -> bool {
    let Some(row) = cursor_row(app) else {
        return false;
    };
    let show_hidden = app.config.show_hidden;
    let pane = app.focused_mut();

    let mut current: Option<&Path> = Some(row.path.as_path());
    while let Some(path) = current {
        if pane.expanded.contains(path) {
            let target = path.to_path_buf();
            pane.collapse(&target);
            if let Some(idx) = pane.rows(show_hidden).iter().position(|r| r.path == target) {
                pane.cursor = idx;
            }
            return true;
        }
        current = path.parent();
    }
    false
}

/// Space on a row. The source pane toggles the row and its loaded subtree;
/// the destination pane picks (or unpicks) a directory.
pub(crate) fn toggle_selected(app: &mut App) {
    let Some(row) = cursor_row(app) else {
        return;
    };
    match app.focus {
        PaneSide::Left if !row.is_dir => {
            let selected = app.left.selection.toggle(&row.path);
            tracing::debug!(path = %row.path.display(), selected, "toggle selection");
        }
        PaneSide::Left => {
            let selected = !app.left.selection.contains(&row.path);
            let Some(node) = app.left.root.as_ref().and_then(|root| tree::find(root, &row.path))
            else {
                return;
            };
            let touched = app.left.selection.toggle_recursive(node, selected);
            tracing::debug!(path = %row.path.display(), selected, touched, "toggle selection");
        }
        PaneSide::Right if !row.is_dir => app.info("destination must be a directory"),
        PaneSide::Right if app.right.selection.contains(&row.path) => app.right.selection.clear(),
        PaneSide::Right => app.right.selection.set(&row.path),
    }
}

pub(crate) fn clear_selection(app: &mut App) {
    let pane = app.focused_mut();
    if pane.selection.is_empty() {
        return;
    }
    pane.selection.clear();
    let label = pane.side.label();
    app.log(format!("cleared {label} selection"));
}

pub(crate) fn initiate_copy(app: &mut App) {
    let destination = app.destination();
    if let Err(refusal) = app.copy.initiate(&app.left.selection, destination.as_deref()) {
        app.info(refusal.to_string());
    }
}

pub(crate) fn confirm_copy(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    let Some(job) = app.copy.confirm() else {
        return Ok(());
    };
    app.log(format!(
        "copying {} item(s) to {}",
        job.sources.len(),
        job.destination.display()
    ));
    if let Err(err) = send_task(task_tx, BackendTask::Copy(job)) {
        if let Some(notice) = app.copy.finish(Err(format!("{err:#}")), &mut app.left.selection) {
            app.notify(notice);
        }
    }
    Ok(())
}

pub(crate) fn cancel_copy(app: &mut App) {
    if app.copy.cancel() {
        app.log("copy cancelled".to_string());
    }
}

pub(crate) fn copy_paths_to_clipboard(app: &mut App) {
    if app.left.selection.is_empty() {
        app.info("no files selected");
        return;
    }
    let text = app.selected_paths_text();
    let count = app.left.selection.len();
    match set_clipboard_text(&text) {
        Ok(()) => app.info(format!("copied {count} path(s) to clipboard")),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "clipboard write failed");
            app.error(format!("clipboard unavailable: {err:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::copy::CopyState;
    use crate::domain::FileNode;
    use crate::events::{COPY_PROGRESS_EVENT, ProgressBus};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn loaded_app() -> App {
        let mut app = App::new(AppConfig::default(), ProgressBus::new());
        for side in [PaneSide::Left, PaneSide::Right] {
            let pane = app.pane_mut(side);
            let req = pane.navigate_to("/h", true);
            let root = FileNode::dir("/h").with_children(vec![
                FileNode::dir("/h/docs").with_children(vec![FileNode::file("/h/docs/a.txt", 1)]),
                FileNode::dir("/h/lazy"),
                FileNode::file("/h/notes.md", 2),
            ]);
            pane.apply_navigation(req.token, req.history, &req.path, Ok(root));
        }
        app
    }

    #[test]
    fn enter_on_directory_dispatches_navigation() {
        let mut app = loaded_app();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();

        enter_selected(&mut app, &task_tx).expect("enter");
        let task = task_rx.try_recv().expect("task");
        assert!(matches!(
            task,
            BackendTask::Navigate(NavigationRequest { ref path, .. }) if path == Path::new("/h/docs")
        ));
        assert!(app.left.is_loading);
    }

    #[test]
    fn enter_on_file_does_nothing() {
        let mut app = loaded_app();
        app.move_cursor(2);
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();
        enter_selected(&mut app, &task_tx).expect("enter");
        assert!(task_rx.try_recv().is_err());
    }

    #[test]
    fn expand_loaded_directory_sends_nothing_and_shows_children() {
        let mut app = loaded_app();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();
        expand_selected(&mut app, &task_tx).expect("expand");
        assert!(task_rx.try_recv().is_err());
        assert_eq!(app.left.rows(false).len(), 4);

        app.move_cursor(1);
        assert!(collapse_selected(&mut app));
        assert_eq!(app.left.cursor, 0);
        assert_eq!(app.left.rows(false).len(), 3);
    }

    #[test]
    fn expand_unloaded_directory_dispatches_one_scan() {
        let mut app = loaded_app();
        app.move_cursor(1);
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();
        expand_selected(&mut app, &task_tx).expect("expand");
        expand_selected(&mut app, &task_tx).expect("expand again");
        assert!(matches!(task_rx.try_recv(), Ok(BackendTask::Expand(_))));
        assert!(task_rx.try_recv().is_err());
    }

    #[test]
    fn toggle_on_source_cascades_into_loaded_children() {
        let mut app = loaded_app();
        toggle_selected(&mut app);
        assert_eq!(
            app.left.selection.paths(),
            vec![PathBuf::from("/h/docs"), PathBuf::from("/h/docs/a.txt")]
        );
        toggle_selected(&mut app);
        assert!(app.left.selection.is_empty());
    }

    #[test]
    fn toggle_on_destination_requires_a_directory() {
        let mut app = loaded_app();
        app.switch_focus();
        app.move_cursor(2);
        toggle_selected(&mut app);
        assert!(app.right.selection.is_empty());
        assert!(app.notice.is_some());

        app.move_cursor(-2);
        toggle_selected(&mut app);
        assert_eq!(app.destination(), Some(PathBuf::from("/h/docs")));
    }

    #[test]
    fn copy_guard_raises_notices() {
        let mut app = loaded_app();
        initiate_copy(&mut app);
        assert_eq!(
            app.notice.as_ref().map(|n| n.message.as_str()),
            Some("no files selected")
        );
        assert!(app.copy.is_idle());

        toggle_selected(&mut app);
        initiate_copy(&mut app);
        assert_eq!(
            app.notice.as_ref().map(|n| n.message.as_str()),
            Some("no destination selected")
        );
        assert!(app.copy.is_idle());
    }

    #[test]
    fn confirmed_copy_dispatches_sources_in_order() {
        let bus = ProgressBus::new();
        let mut app = App::new(AppConfig::default(), bus.clone());
        app.left.selection.set(Path::new("/src/b"));
        app.left.selection.set(Path::new("/src/a"));
        app.right.selection.set(Path::new("/dst"));
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();

        initiate_copy(&mut app);
        assert!(matches!(app.copy.state(), CopyState::ConfirmPending { .. }));
        confirm_copy(&mut app, &task_tx).expect("confirm");

        let Ok(BackendTask::Copy(job)) = task_rx.try_recv() else {
            panic!("expected copy task");
        };
        assert_eq!(job.sources, vec![PathBuf::from("/src/a"), PathBuf::from("/src/b")]);
        assert_eq!(job.destination, PathBuf::from("/dst"));
        assert_eq!(bus.subscriber_count(COPY_PROGRESS_EVENT), 1);
    }

    #[test]
    fn copy_dispatch_failure_returns_to_idle() {
        let bus = ProgressBus::new();
        let mut app = App::new(AppConfig::default(), bus.clone());
        app.left.selection.set(Path::new("/src/a"));
        app.right.selection.set(Path::new("/dst"));
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        drop(task_rx);

        initiate_copy(&mut app);
        confirm_copy(&mut app, &task_tx).expect("confirm");
        assert!(app.copy.is_idle());
        assert_eq!(bus.subscriber_count(COPY_PROGRESS_EVENT), 0);
        assert_eq!(app.left.selection.len(), 1);
    }

    #[test]
    fn cancel_leaves_selection_alone() {
        let mut app = loaded_app();
        app.left.selection.set(Path::new("/h/notes.md"));
        app.right.selection.set(Path::new("/h/docs"));
        initiate_copy(&mut app);
        cancel_copy(&mut app);
        assert!(app.copy.is_idle());
        assert_eq!(app.left.selection.len(), 1);
    }

    #[test]
    fn back_is_a_noop_without_history() {
        let mut app = loaded_app();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();
        go_back(&mut app, &task_tx).expect("back");
        assert!(task_rx.try_recv().is_err());
    }
}
