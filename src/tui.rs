use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::ApplicationApi;
use crate::controller::{ApplicationController, Outcome};
use crate::models::{ApplicationRecord, Status, StatusCategory, StatusSummary};
use crate::notify::{Level, MessageLog};

pub type Controller<A> = ApplicationController<A, MessageLog>;

struct ViewState {
    selected: usize,
    list_state: ListState,
}

impl ViewState {
    fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            selected: 0,
            list_state,
        }
    }

    fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
        }
        self.clamp(len);
    }

    fn prev(&mut self, len: usize) {
        self.selected = self.selected.saturating_sub(1);
        self.clamp(len);
    }
}

pub fn run_browse<A: ApplicationApi>(ctl: &mut Controller<A>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, ctl);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<A: ApplicationApi>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ctl: &mut Controller<A>,
) -> Result<()> {
    let mut view = ViewState::new();

    loop {
        view.clamp(ctl.visible().len());
        terminal.draw(|frame| draw(frame, ctl, &mut view))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if !ctl.is_active() {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                break;
            }
            continue;
        }

        // The confirmation dialog takes every key while it is open.
        if ctl.pending_delete().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    ctl.confirm_delete();
                }
                KeyCode::Char('n') | KeyCode::Esc => ctl.cancel_delete(),
                _ => {}
            }
            continue;
        }

        let len = ctl.visible().len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => view.next(len),
            KeyCode::Up | KeyCode::Char('k') => view.prev(len),
            KeyCode::Char('f') => {
                let next = ctl.filter().cycle();
                ctl.set_filter(next);
                view.selected = 0;
            }
            KeyCode::Char('r') => {
                ctl.refresh();
            }
            KeyCode::Char('d') => {
                let id = ctl.visible().get(view.selected).map(|r| r.id.clone());
                if let Some(id) = id {
                    ctl.request_delete(id);
                }
            }
            KeyCode::Char('s') => {
                let record = ctl.visible().get(view.selected).map(|r| (*r).clone());
                if let Some(record) = record {
                    advance_status(ctl, record);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Moves a record to the next pipeline status through the regular edit path.
/// Unknown statuses restart at Applied.
fn advance_status<A: ApplicationApi>(ctl: &mut Controller<A>, record: ApplicationRecord) {
    let next = Status::parse(&record.status)
        .map(Status::next)
        .unwrap_or(Status::Applied);
    let mut draft = record.to_draft();
    draft.set_status(next.as_str());

    ctl.begin_edit(record);
    if ctl.submit(&draft) == Outcome::Failed {
        // No form on screen to keep open.
        ctl.cancel_form();
    }
}

fn category_color(category: StatusCategory) -> Color {
    match category {
        StatusCategory::Applied => Color::Blue,
        StatusCategory::Interview => Color::Yellow,
        StatusCategory::Offer => Color::Green,
        StatusCategory::Rejected => Color::Red,
        StatusCategory::Unknown => Color::Gray,
    }
}

fn draw<A: ApplicationApi>(frame: &mut Frame, ctl: &Controller<A>, view: &mut ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    if !ctl.is_active() {
        draw_welcome(frame, rows[0]);
        let help = Paragraph::new(" Set auth.user in the config file, then run browse again.  q:quit")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, rows[2]);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    let visible = ctl.visible();

    // Left panel: application list
    let items: Vec<ListItem> = visible
        .iter()
        .map(|app| {
            let color = category_color(app.category());
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<10} ", app.status), Style::default().fg(color)),
                Span::raw(format!("{} | {}", app.company, app.position)),
            ]))
        })
        .collect();

    let title = format!(
        " Applications [{}] {} ",
        ctl.filter(),
        StatusSummary::of(visible.iter().copied())
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], &mut view.list_state);

    // Right panel: detail
    let detail = match visible.get(view.selected) {
        Some(app) => build_detail(app),
        None => Text::raw("No applications found for this status."),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail_widget, chunks[1]);

    // Status line: latest notification
    if let Some(notice) = ctl.notifier().latest() {
        let color = match notice.level {
            Level::Success => Color::Green,
            Level::Failure => Color::Red,
        };
        let line = Paragraph::new(format!(" {}", notice.message)).style(Style::default().fg(color));
        frame.render_widget(line, rows[1]);
    }

    let help = Paragraph::new(
        " j/k:navigate  f:filter  s:next status  d:delete  r:refresh  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);

    if ctl.pending_delete().is_some() {
        draw_confirm(frame);
    }
}

fn build_detail(app: &ApplicationRecord) -> Text<'_> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        app.company.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(app.position.as_str()));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status),
        Style::default().fg(category_color(app.category())),
    )));
    lines.push(Line::from(format!("Applied: {}", app.applied_display())));

    if let Some(link) = &app.resume_link {
        lines.push(Line::from(Span::styled(
            format!("Resume: {}", link),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        )));
    }

    if let Some(notes) = &app.notes {
        lines.push(Line::from(""));
        for line in textwrap::fill(notes, 60).lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().add_modifier(Modifier::ITALIC),
            )));
        }
    }

    Text::from(lines)
}

fn draw_welcome(frame: &mut Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "Welcome to apptrack",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Track every job application in one place."),
        Line::from("Log in to see your applications."),
    ]);
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn draw_confirm(frame: &mut Frame) {
    let area = centered(frame.area(), 50, 5);
    let dialog = Paragraph::new(vec![
        Line::from("Are you sure you want to delete this application?"),
        Line::from(""),
        Line::from(Span::styled(
            "y:delete  n:cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(" Confirm "));

    frame.render_widget(Clear, area);
    frame.render_widget(dialog, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_state_clamps_selection() {
        let mut view = ViewState::new();
        view.next(3);
        view.next(3);
        view.next(3);
        assert_eq!(view.selected, 2);

        view.clamp(1);
        assert_eq!(view.selected, 0);
        assert_eq!(view.list_state.selected(), Some(0));

        view.clamp(0);
        assert_eq!(view.list_state.selected(), None);

        view.prev(0);
        assert_eq!(view.selected, 0);
    }

    #[test]
    fn test_centered_fits_inside_area() {
        let area = Rect::new(0, 0, 30, 4);
        let popup = centered(area, 50, 5);
        assert_eq!(popup, Rect::new(0, 0, 30, 4));

        let popup = centered(Rect::new(0, 0, 100, 20), 50, 5);
        assert_eq!(popup, Rect::new(25, 7, 50, 5));
    }

    #[test]
    fn test_category_colors_distinct_for_known_statuses() {
        let colors: Vec<Color> = StatusCategory::ALL.iter().map(|c| category_color(*c)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
