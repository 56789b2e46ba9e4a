use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};

use super::runtime::Dashboard;
use super::state::{DashboardState, SubmitRejection};
use super::types::PageAnalysis;
use super::ui_utils::{
    broken_links_style, centered_rect, link_status_style, open_url_in_browser, phase_style,
    point_in_rect, table_row_index_at, truncate_for_display,
};

const PAGE_JUMP_STEP: usize = 10;
const TICK_RATE: Duration = Duration::from_millis(120);
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(450);
const INPUT_PLACEHOLDER: &str = "Enter website URL";
const MAX_BROKEN_LINK_LINES: usize = 3;

const TABLE_HEADERS: [&str; 7] = [
    "Title",
    "HTML Version",
    "#Internal Links",
    "#External Links",
    "#Broken Links",
    "Login Form",
    "URL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    Input,
    Table,
}

impl Focus {
    fn cycle(self) -> Self {
        match self {
            Focus::Input => Focus::Table,
            Focus::Table => Focus::Input,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Focus::Input => "input",
            Focus::Table => "table",
        }
    }
}

pub(crate) struct UiState {
    api_base: String,
    focus: Focus,
    selected_id: Option<i64>,
    selected_idx: usize,
    table_state: TableState,
    help_mode: bool,
    input_hint: Option<String>,
    notice: Option<String>,
    input_area: Option<Rect>,
    button_area: Option<Rect>,
    table_area: Option<Rect>,
    last_click: Option<(usize, Instant)>,
}

impl UiState {
    pub(crate) fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            focus: Focus::Input,
            selected_id: None,
            selected_idx: 0,
            table_state: TableState::default(),
            help_mode: false,
            input_hint: None,
            notice: None,
            input_area: None,
            button_area: None,
            table_area: None,
            last_click: None,
        }
    }

    // Selection is anchored on the record id, not the row index.
    fn sync_selection(&mut self, pages: &[PageAnalysis]) {
        if pages.is_empty() {
            self.selected_id = None;
            self.selected_idx = 0;
            self.table_state.select(None);
            return;
        }

        let idx = self
            .selected_id
            .and_then(|id| pages.iter().position(|page| page.id == id))
            .unwrap_or_else(|| self.selected_idx.min(pages.len() - 1));
        self.select_index(pages, idx);
    }

    fn select_index(&mut self, pages: &[PageAnalysis], idx: usize) {
        let Some(last) = pages.len().checked_sub(1) else {
            return;
        };
        let idx = idx.min(last);
        self.selected_idx = idx;
        self.selected_id = Some(pages[idx].id);
        self.table_state.select(Some(idx));
    }

    fn move_selection(&mut self, pages: &[PageAnalysis], delta: isize) {
        let idx = self.selected_idx.saturating_add_signed(delta);
        self.select_index(pages, idx);
    }

    fn selected_page<'a>(&self, pages: &'a [PageAnalysis]) -> Option<&'a PageAnalysis> {
        self.selected_id
            .and_then(|id| pages.iter().find(|page| page.id == id))
    }
}

pub(crate) fn draw_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    dashboard: &mut Dashboard,
) -> io::Result<()> {
    let mut ui = UiState::new(dashboard.client().base().as_str());
    dashboard.mount();

    loop {
        dashboard.drain();
        terminal.draw(|f| render(f, dashboard.state(), &mut ui))?;

        if event::poll(TICK_RATE)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(dashboard, &mut ui, key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => handle_mouse(dashboard, &mut ui, mouse),
                _ => {}
            }
        }
    }

    Ok(())
}

pub(crate) fn render(f: &mut Frame, state: &DashboardState, ui: &mut UiState) {
    ui.sync_selection(state.pages());
    ui.input_area = None;
    ui.button_area = None;
    ui.table_area = None;

    let error = state.error_message();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(if error.is_empty() { 0 } else { 1 }),
            Constraint::Min(6),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, chunks[0], state, ui);
    render_form(f, chunks[1], state, ui);
    if !error.is_empty() {
        let notice = Paragraph::new(Line::from(vec![
            Span::styled(
                " ! ",
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        ]));
        f.render_widget(notice, chunks[2]);
    }
    render_table(f, chunks[3], state, ui);
    render_details(f, chunks[4], state, ui);
    render_footer(f, chunks[5], state, ui);

    if ui.help_mode {
        render_help(f);
    }
}

fn render_header(f: &mut Frame, area: Rect, state: &DashboardState, ui: &UiState) {
    let phase = state.phase();
    let metric_label = Style::default().fg(Color::Gray);
    let sep_style = Style::default().fg(Color::DarkGray);
    let synced = state
        .last_synced()
        .map(|ts| ts.format("%H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let line = Line::from(vec![
        Span::styled("State ", metric_label),
        Span::styled(phase.label(), phase_style(phase)),
        Span::styled("  |  ", sep_style),
        Span::styled("Pages ", metric_label),
        Span::styled(
            state.pages().len().to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  |  ", sep_style),
        Span::styled("API ", metric_label),
        Span::styled(ui.api_base.clone(), Style::default().fg(Color::White)),
        Span::styled("  |  ", sep_style),
        Span::styled("Synced ", metric_label),
        Span::styled(synced, Style::default().fg(Color::LightCyan)),
    ]);

    let header = Paragraph::new(line).block(
        Block::default()
            .title("Skyfell Dashboard")
            .borders(Borders::ALL)
            .border_style(phase_style(phase)),
    );
    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, state: &DashboardState, ui: &mut UiState) {
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(16)])
        .split(area);

    let focused = ui.focus == Focus::Input;
    let title = match &ui.input_hint {
        Some(hint) => format!("Website URL - {hint}"),
        None => "Website URL".to_string(),
    };
    let visible_width = parts[0].width.saturating_sub(3) as usize;
    let input = state.url_input();
    let input_line = if input.is_empty() {
        Line::from(Span::styled(
            INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let skip = input.chars().count().saturating_sub(visible_width);
        Line::from(input.chars().skip(skip).collect::<String>())
    };
    let input_widget = Paragraph::new(input_line).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if ui.input_hint.is_some() {
                Style::default().fg(Color::Yellow)
            } else if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            }),
    );
    f.render_widget(input_widget, parts[0]);
    ui.input_area = Some(parts[0]);

    if focused && !ui.help_mode {
        let typed = input.chars().count().min(visible_width) as u16;
        f.set_cursor_position((parts[0].x + 1 + typed, parts[0].y + 1));
    }

    let (label, button_style) = if state.is_loading() {
        ("Crawling...", Style::default().fg(Color::DarkGray))
    } else {
        (
            "Crawl",
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        )
    };
    let button = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(button_style)
        .block(Block::default().borders(Borders::ALL).border_style(
            if state.is_loading() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Blue)
            },
        ));
    f.render_widget(button, parts[1]);
    ui.button_area = Some(parts[1]);
}

fn render_table(f: &mut Frame, area: Rect, state: &DashboardState, ui: &mut UiState) {
    let url_style = Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED);
    let rows = state.pages().iter().map(|page| {
        Row::new(vec![
            Cell::from(page.title.clone()),
            Cell::from(page.html_version.clone()),
            Cell::from(page.internal_links.to_string()),
            Cell::from(page.external_links.to_string()),
            Cell::from(page.broken_links.to_string()).style(broken_links_style(page.broken_links)),
            Cell::from(page.login_form_label()).style(if page.login_form {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }),
            Cell::from(page.url.clone()).style(url_style),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(12),
            Constraint::Length(15),
            Constraint::Length(15),
            Constraint::Length(13),
            Constraint::Length(10),
            Constraint::Min(20),
        ],
    )
    .header(Row::new(TABLE_HEADERS).style(Style::default().add_modifier(Modifier::BOLD)))
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ")
    .block(
        Block::default()
            .title(format!("Analyzed Pages ({})", state.pages().len()))
            .borders(Borders::ALL)
            .border_style(if ui.focus == Focus::Table {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            }),
    )
    .column_spacing(1);

    f.render_stateful_widget(table, area, &mut ui.table_state);
    ui.table_area = Some(area);
}

fn render_details(f: &mut Frame, area: Rect, state: &DashboardState, ui: &UiState) {
    let lines = match ui.selected_page(state.pages()) {
        Some(page) => {
            let headings = page.ordered_headings();
            let headings = if headings.is_empty() {
                "none".to_string()
            } else {
                headings
                    .iter()
                    .map(|(level, count)| format!("{level}={count}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let meta = if page.meta.trim().is_empty() {
                "(none)".to_string()
            } else {
                truncate_for_display(page.meta.trim(), 200)
            };

            let mut lines = vec![
                Line::from(format!("URL: {}", page.url)),
                Line::from(format!("Meta: {meta}")),
                Line::from(format!("Headings: {headings}")),
                Line::from(format!("Broken links: {}", page.broken_links)),
            ];
            for detail in page.broken_link_details.iter().take(MAX_BROKEN_LINK_LINES) {
                let status = if detail.status == 0 {
                    "unreachable".to_string()
                } else {
                    detail.status.to_string()
                };
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(status, link_status_style(detail.status)),
                    Span::raw(" "),
                    Span::raw(detail.href.clone()),
                ]));
            }
            let hidden = page
                .broken_link_details
                .len()
                .saturating_sub(MAX_BROKEN_LINK_LINES);
            if hidden > 0 {
                lines.push(Line::from(Span::styled(
                    format!("  ... and {hidden} more"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines
        }
        None => vec![Line::from(Span::styled(
            "No page selected",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let details = Paragraph::new(lines)
        .block(Block::default().title("Selected Page").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(details, area);
}

fn render_footer(f: &mut Frame, area: Rect, state: &DashboardState, ui: &UiState) {
    let key_style = Style::default().fg(Color::Yellow);
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = vec![
        Span::styled("FOCUS ", dim),
        Span::styled(ui.focus.label(), Style::default().fg(Color::LightCyan)),
        Span::styled("   ", dim),
    ];
    let keys: &[(&str, &str)] = match ui.focus {
        Focus::Input => &[("enter", "crawl"), ("tab", "table"), ("ctrl+c", "quit")],
        Focus::Table => &[
            ("enter/o", "open URL"),
            ("tab", "input"),
            ("?", "help"),
            ("q", "quit"),
        ],
    };
    for (key, action) in keys {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(format!(" {action}  "), dim));
    }
    if state.is_loading() {
        spans.push(Span::styled(
            "submit disabled while crawling  ",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(notice) = &ui.notice {
        spans.push(Span::styled(
            truncate_for_display(notice, 120),
            Style::default().fg(Color::LightRed),
        ));
    }

    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(dim))
        .wrap(Wrap { trim: true });
    f.render_widget(footer, area);
}

fn render_help(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("URL input"),
        Line::from("  type a URL, enter: submit it for analysis"),
        Line::from("  backspace: delete, ctrl+u: clear"),
        Line::from("  tab / esc / down: move to the table"),
        Line::from(""),
        Line::from("Table"),
        Line::from("  up/down or j/k: move selection"),
        Line::from("  pgup/pgdn: jump by 10 rows"),
        Line::from("  g/G or home/end: first/last row"),
        Line::from("  enter or o: open selected URL in the browser"),
        Line::from("  click: select, double click: open"),
        Line::from("  tab or /: back to the URL input"),
        Line::from("  q or esc: quit"),
    ])
    .block(
        Block::default()
            .title("Help (esc to close)")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    )
    .wrap(Wrap { trim: false });
    f.render_widget(help, area);
}

fn submit_from_view(dashboard: &mut Dashboard, ui: &mut UiState) {
    ui.input_hint = match dashboard.submit() {
        Ok(()) => None,
        Err(SubmitRejection::Busy) => Some("crawl in progress".to_string()),
        Err(rejection) => Some(rejection.to_string()),
    };
}

fn open_selected(dashboard: &Dashboard, ui: &mut UiState) {
    if let Some(page) = ui.selected_page(dashboard.state().pages()) {
        ui.notice = match open_url_in_browser(&page.url) {
            Ok(()) => None,
            Err(err) => Some(format!("failed to open link in browser: {err}")),
        };
    }
}

/// Returns `true` when the view should close.
pub(crate) fn handle_key(dashboard: &mut Dashboard, ui: &mut UiState, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if ui.help_mode {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?')) {
            ui.help_mode = false;
        }
        return false;
    }

    match ui.focus {
        Focus::Input => match key.code {
            KeyCode::Enter => submit_from_view(dashboard, ui),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc | KeyCode::Down => {
                ui.focus = ui.focus.cycle();
            }
            KeyCode::Backspace => dashboard.state_mut().pop_input_char(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                dashboard.state_mut().clear_input();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                dashboard.state_mut().push_input_char(ch);
                ui.input_hint = None;
            }
            _ => {}
        },
        Focus::Table => {
            let pages = dashboard.state().pages();
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('/') => {
                    ui.focus = ui.focus.cycle();
                }
                KeyCode::Char('?') => ui.help_mode = true,
                KeyCode::Up | KeyCode::Char('k') => ui.move_selection(pages, -1),
                KeyCode::Down | KeyCode::Char('j') => ui.move_selection(pages, 1),
                KeyCode::PageUp => ui.move_selection(pages, -(PAGE_JUMP_STEP as isize)),
                KeyCode::PageDown => ui.move_selection(pages, PAGE_JUMP_STEP as isize),
                KeyCode::Home | KeyCode::Char('g') => ui.select_index(pages, 0),
                KeyCode::End | KeyCode::Char('G') => ui.select_index(pages, usize::MAX),
                KeyCode::Enter | KeyCode::Char('o') => open_selected(dashboard, ui),
                _ => {}
            }
        }
    }

    false
}

pub(crate) fn handle_mouse(dashboard: &mut Dashboard, ui: &mut UiState, mouse: MouseEvent) {
    if ui.help_mode || !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
        return;
    }

    if let Some(area) = ui.input_area
        && point_in_rect(mouse.column, mouse.row, area)
    {
        ui.focus = Focus::Input;
        return;
    }

    if let Some(area) = ui.button_area
        && point_in_rect(mouse.column, mouse.row, area)
    {
        ui.focus = Focus::Input;
        submit_from_view(dashboard, ui);
        return;
    }

    if let Some(area) = ui.table_area
        && point_in_rect(mouse.column, mouse.row, area)
        && let Some(row_idx) = table_row_index_at(area, mouse.row)
    {
        let idx = ui.table_state.offset() + row_idx;
        if idx >= dashboard.state().pages().len() {
            return;
        }
        ui.focus = Focus::Table;
        ui.select_index(dashboard.state().pages(), idx);

        let now = Instant::now();
        let double_click = ui
            .last_click
            .map(|(prev_idx, prev_time)| {
                prev_idx == idx && now.duration_since(prev_time) <= DOUBLE_CLICK_WINDOW
            })
            .unwrap_or(false);
        if double_click {
            open_selected(dashboard, ui);
        }
        ui.last_click = Some((idx, now));
    }
}
