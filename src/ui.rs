use crate::app::{App, ModalState};
use crate::copy::CopyState;
use crate::domain::{NoticeLevel, PaneSide};
use crate::pane::PaneState;
use crate::tree::Row;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};

pub fn draw(frame: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(outer[0]);

    draw_pane(frame, app, &app.left, panes[0]);
    draw_pane(frame, app, &app.right, panes[1]);
    draw_logs(frame, app, outer[1]);
    draw_status_bar(frame, app, outer[2]);
    draw_modal(frame, app);
}

fn draw_pane(frame: &mut Frame, app: &App, pane: &PaneState, area: Rect) {
    let rows = pane.rows(app.config.show_hidden);
    let items: Vec<ListItem> = rows.iter().map(|row| row_item(pane, row)).collect();

    let border_style = if app.focus == pane.side {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let location = pane
        .current_path()
        .map_or_else(|| "(not loaded)".to_string(), |p| p.display().to_string());
    let mut title = format!(" {}: {} ", side_title(pane.side), location);
    if let Some(idx) = pane.history_index() {
        let back = if pane.can_go_back() { "◀" } else { " " };
        let forward = if pane.can_go_forward() { "▶" } else { " " };
        title.push_str(&format!(
            "{back}{}/{}{forward} ",
            idx + 1,
            pane.history().len()
        ));
    }
    if pane.is_loading {
        title.push_str("[loading] ");
    }
    if !pane.filter().is_empty() {
        let mode = if pane.regex_filter() { "re" } else { "=" };
        title.push_str(&format!("/{} ({mode}) ", pane.filter()));
    }

    let footer = match pane.side {
        PaneSide::Left => format!(" {} selected ", pane.selection.len()),
        PaneSide::Right => pane.selection.destination().map_or_else(
            || " no destination ".to_string(),
            |p| format!(" -> {} ", p.display()),
        ),
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .title_bottom(footer)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    if !rows.is_empty() && app.focus == pane.side {
        state.select(Some(pane.cursor.min(rows.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn side_title(side: PaneSide) -> &'static str {
    match side {
        PaneSide::Left => "Source",
        PaneSide::Right => "Destination",
    }
}

fn row_item(pane: &PaneState, row: &Row) -> ListItem<'static> {
    let mark = match pane.side {
        PaneSide::Left if pane.selection.contains(&row.path) => "[x] ",
        PaneSide::Left => "[ ] ",
        PaneSide::Right if pane.selection.contains(&row.path) => "(*) ",
        PaneSide::Right => "    ",
    };
    let glyph = if !row.is_dir {
        "  "
    } else if row.is_loading {
        "… "
    } else if pane.expanded.contains(&row.path) && row.is_loaded {
        "▾ "
    } else {
        "▸ "
    };

    let indent = "  ".repeat(row.depth);
    let name_style = if row.is_dir {
        Style::default().fg(Color::LightBlue)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::raw(mark),
        Span::raw(indent),
        Span::raw(glyph),
        Span::styled(row.name.clone(), name_style),
    ];
    if !row.is_dir {
        spans.push(Span::styled(
            format!("  {}", human_size(row.size)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .logs
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|line| Line::from(line.as_str()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(" Log ").borders(Borders::ALL))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let busy = app.busy();
    let badge = Span::styled(
        if busy { " BUSY " } else { " IDLE " },
        if busy {
            Style::default().bg(Color::Yellow).fg(Color::Black)
        } else {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        },
    );

    let body = match &app.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Span::styled(
                notice.message.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )
        }
        None => Span::styled(
            "tab pane | j/k move | l/h expand/collapse | enter open | space select | c copy | / search | ? help",
            Style::default().fg(Color::Gray),
        ),
    };

    let text = Line::from(vec![badge, Span::raw("  "), body]);
    let paragraph = Paragraph::new(text).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

fn draw_modal(frame: &mut Frame, app: &App) {
    match app.copy.state() {
        CopyState::ConfirmPending {
            sources,
            destination,
        } => {
            draw_confirm(frame, sources.len(), &destination.display().to_string());
            return;
        }
        CopyState::Copying { progress, .. } => {
            let area = centered_rect(60, 20, frame.area());
            frame.render_widget(Clear, area);
            let gauge = Gauge::default()
                .block(
                    Block::default()
                        .title(" Copying ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::LightBlue)),
                )
                .gauge_style(Style::default().fg(Color::Green))
                .ratio((progress.percentage / 100.0).clamp(0.0, 1.0))
                .label(progress.to_string());
            frame.render_widget(gauge, area);
            return;
        }
        CopyState::Idle => {}
    }

    match &app.modal {
        ModalState::None => {}
        ModalState::Help => {
            let area = centered_rect(60, 70, frame.area());
            frame.render_widget(Clear, area);
            let lines: Vec<Line> = HELP_LINES.iter().map(|line| Line::from(*line)).collect();
            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Keys ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
        ModalState::Search { value, .. } => {
            let area = centered_rect(60, 20, frame.area());
            frame.render_widget(Clear, area);
            let mode = if app.focused().regex_filter() {
                "regex"
            } else {
                "exact"
            };
            let lines = vec![
                Line::from(format!("filter {} pane ({mode})", app.focus.label())),
                Line::from(format!("> {value}")).style(Style::default().fg(Color::Yellow)),
                Line::from("comma separates alternatives | Enter keep | Esc restore | Ctrl+r mode"),
            ];
            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Search ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::LightBlue)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
    }
}

fn draw_confirm(frame: &mut Frame, count: usize, destination: &str) {
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(format!("copy {count} item(s)")),
        Line::from(format!("to: {destination}")),
        Line::from(""),
        Line::from("y / Enter: copy   n / Esc: cancel"),
    ];
    let p = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Confirm Copy ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(p, area);
}

const HELP_LINES: &[&str] = &[
    "Tab          switch pane",
    "j / k        move",
    "l / →        expand directory",
    "h / ←        collapse",
    "Enter        open directory",
    "Backspace u  parent directory",
    "[ / ]        back / forward",
    "Space        select (source) / pick destination",
    "x            clear selection",
    "c            copy selection to destination",
    "Y            copy selected paths to clipboard",
    "/            search, Ctrl+r regex/exact",
    ".            show hidden files",
    "r            refresh",
    "q            quit",
];

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::FileNode;
    use crate::events::ProgressBus;
    use pretty_assertions::assert_eq;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal.draw(|frame| draw(frame, app)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(human_size(12), "12B");
        assert_eq!(human_size(2048), "2.0K");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0M");
    }

    #[test]
    fn panes_show_rows_and_selection_marks() {
        let mut app = App::new(AppConfig::default(), ProgressBus::new());
        let req = app.left.navigate_to("/h", true);
        let root = FileNode::dir("/h").with_children(vec![
            FileNode::dir("/h/docs"),
            FileNode::file("/h/notes.md", 10),
        ]);
        app.left
            .apply_navigation(req.token, req.history, &req.path, Ok(root));
        app.left.selection.set(std::path::Path::new("/h/notes.md"));

        let screen = rendered(&app);
        assert!(screen.contains("Source: /h"));
        assert!(screen.contains("docs"));
        assert!(screen.contains("[x]"));
        assert!(screen.contains("1 selected"));
        assert!(screen.contains("no destination"));
    }

    #[test]
    fn confirm_modal_is_drawn_while_pending() {
        let mut app = App::new(AppConfig::default(), ProgressBus::new());
        app.left.selection.set(std::path::Path::new("/a"));
        app.right.selection.set(std::path::Path::new("/dst"));
        let destination = app.destination();
        app.copy
            .initiate(&app.left.selection, destination.as_deref())
            .expect("pending");

        let screen = rendered(&app);
        assert!(screen.contains("Confirm Copy"));
        assert!(screen.contains("copy 1 item(s)"));
    }
}
