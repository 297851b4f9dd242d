use crate::actions::{
    cancel_copy, clear_selection, collapse_selected, confirm_copy, copy_paths_to_clipboard,
    enter_selected, expand_selected, go_back, go_forward, go_up, initiate_copy, refresh,
    toggle_selected,
};
use crate::app::{App, BackendEvent, BackendTask, ModalState};
use crate::copy::CopyState;
use crate::domain::PaneSide;
use crate::pane::NavigationOutcome;
use crate::tree::ExpandFinish;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn handle_backend_event(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    event: BackendEvent,
) -> Result<()> {
    let show_hidden = app.config.show_hidden;
    match event {
        BackendEvent::Navigated { request, result } => {
            let pane = app.pane_mut(request.side);
            match pane.apply_navigation(request.token, request.history, &request.path, result) {
                NavigationOutcome::Applied => {
                    tracing::info!(
                        pane = request.side.label(),
                        path = %request.path.display(),
                        "navigated"
                    );
                    app.log(format!(
                        "{}: {}",
                        request.side.label(),
                        request.path.display()
                    ));
                }
                NavigationOutcome::Failed(message) => {
                    app.error(format!(
                        "cannot open {}: {message}",
                        request.path.display()
                    ));
                }
                NavigationOutcome::Stale => {
                    tracing::debug!(token = request.token, "dropped stale navigation");
                }
            }
        }
        BackendEvent::Expanded { request, result } => {
            let message = result.as_ref().err().cloned();
            let pane = app.pane_mut(request.side);
            match pane.apply_expansion(request.generation, &request.path, result) {
                ExpandFinish::Attached(count) => {
                    tracing::debug!(path = %request.path.display(), count, "expanded");
                    pane.clamp_cursor(show_hidden);
                }
                ExpandFinish::Failed => {
                    pane.clamp_cursor(show_hidden);
                    app.error(format!(
                        "cannot expand {}: {}",
                        request.path.display(),
                        message.unwrap_or_default()
                    ));
                }
                ExpandFinish::Stale => {
                    tracing::debug!(path = %request.path.display(), "dropped stale expansion");
                }
            }
        }
        BackendEvent::CopyFinished { job, result } => {
            app.copy.poll_progress();
            let succeeded = result.is_ok();
            if let Some(notice) = app.copy.finish(result, &mut app.left.selection) {
                app.notify(notice);
            }
            if succeeded && app.right.is_loading {
                tracing::debug!(
                    destination = %job.destination.display(),
                    "destination pane already loading, refresh skipped"
                );
            } else if succeeded {
                tracing::debug!(destination = %job.destination.display(), "refreshing destination pane");
                refresh(app, task_tx, PaneSide::Right)?;
            }
        }
    }

    Ok(())
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    if matches!(app.copy.state(), CopyState::ConfirmPending { .. }) {
        return handle_confirm_key(app, key, task_tx);
    }

    match app.modal {
        ModalState::None => handle_key_without_modal(app, key, task_tx),
        ModalState::Help => {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                app.close_modal();
            }
            Ok(())
        }
        ModalState::Search { .. } => {
            handle_search_key(app, key);
            Ok(())
        }
    }
}

fn handle_key_without_modal(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Char('/') => app.open_search(),
        KeyCode::Char('r') if key.modifiers == KeyModifiers::CONTROL => {
            let pane = app.focused_mut();
            pane.toggle_regex_filter();
            let mode = if pane.regex_filter() { "regex" } else { "exact" };
            app.log(format!("search mode: {mode}"));
        }
        KeyCode::Esc if !app.focused().filter().is_empty() => {
            app.focused_mut().set_filter(String::new());
        }
        KeyCode::Tab => app.switch_focus(),
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
        KeyCode::PageDown => app.move_cursor(20),
        KeyCode::PageUp => app.move_cursor(-20),
        KeyCode::Char('l') | KeyCode::Right => expand_selected(app, task_tx)?,
        KeyCode::Char('h') | KeyCode::Left => {
            collapse_selected(app);
        }
        KeyCode::Enter => enter_selected(app, task_tx)?,
        KeyCode::Backspace | KeyCode::Char('u') => go_up(app, task_tx)?,
        KeyCode::Char('[') => go_back(app, task_tx)?,
        KeyCode::Char(']') => go_forward(app, task_tx)?,
        KeyCode::Char(' ') => toggle_selected(app),
        KeyCode::Char('x') => clear_selection(app),
        KeyCode::Char('c') => initiate_copy(app),
        KeyCode::Char('Y') => copy_paths_to_clipboard(app),
        KeyCode::Char('.') => app.toggle_hidden(),
        KeyCode::Char('r') => {
            let side = app.focus;
            refresh(app, task_tx, side)?;
        }
        _ => {}
    }
    Ok(())
}

fn handle_confirm_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => confirm_copy(app, task_tx)?,
        KeyCode::Char('n') | KeyCode::Esc => cancel_copy(app),
        _ => {}
    }
    Ok(())
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    let mut immediate_filter: Option<String> = None;
    let mut restore_filter: Option<String> = None;
    let mut finalize = false;

    {
        let ModalState::Search { value, original } = &mut app.modal else {
            return;
        };

        match key.code {
            KeyCode::Esc => {
                restore_filter = Some(original.clone());
                finalize = true;
            }
            KeyCode::Enter => finalize = true,
            KeyCode::Backspace => {
                value.pop();
                immediate_filter = Some(value.clone());
            }
            KeyCode::Char(c)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                    && !key.modifiers.contains(KeyModifiers::SUPER) =>
            {
                value.push(c);
                immediate_filter = Some(value.clone());
            }
            KeyCode::Char('r') if key.modifiers == KeyModifiers::CONTROL => {
                app.focused_mut().toggle_regex_filter();
                return;
            }
            _ => {}
        }
    }

    if let Some(filter) = immediate_filter.or(restore_filter) {
        app.focused_mut().set_filter(filter);
    }
    if finalize {
        app.close_modal();
    }
}
