//! Ratatui console wired to the reconciliation engine.
//!
//! One cooperative loop: draw, poll input, dispatch. Engine handlers are
//! awaited inline, so no two of them ever interleave — the suspension
//! points are exactly the gateway round-trips.

use std::collections::HashSet;
use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::config::{prefs_path, UiPrefs};
use crate::default_data_dir;
use crate::engine::debounce::Debouncer;
use crate::engine::layers::Callout;
use crate::engine::selection::Selection;
use crate::engine::{Engine, SEARCH_DEBOUNCE};
use crate::gateway::Gateway;
use crate::search::CtoHit;
use crate::ui::components::theme::{colors, palette, Theme, ThemePalette};
use crate::ui::components::widgets::{help_lines, search_bar, status_line};
use crate::ui::data::{
    filter_label, flatten_backlog, grid_cell, placement_glyph, BacklogRow, Focus, SearchCorpus,
};

struct App {
    engine: Engine,
    theme: Theme,
    focus: Focus,
    show_help: bool,
    expanded_olts: HashSet<String>,
    expanded_pons: HashSet<(String, String)>,
    backlog_cursor: usize,
    query: String,
    corpus: SearchCorpus,
    cto_hits: Vec<CtoHit>,
    result_cursor: usize,
    debounce: Debouncer,
    marker_cursor: usize,
    should_quit: bool,
}

impl App {
    fn new(gateway: Box<dyn Gateway>, prefs: &UiPrefs) -> Self {
        Self {
            engine: Engine::new(gateway),
            theme: Theme::from_label(prefs.theme.as_deref().unwrap_or("dark")),
            focus: Focus::Backlog,
            show_help: prefs.has_seen_help != Some(true),
            expanded_olts: HashSet::new(),
            expanded_pons: HashSet::new(),
            backlog_cursor: 0,
            query: String::new(),
            corpus: SearchCorpus::Endpoints,
            cto_hits: Vec::new(),
            result_cursor: 0,
            debounce: Debouncer::new(SEARCH_DEBOUNCE),
            marker_cursor: 0,
            should_quit: false,
        }
    }

    fn backlog_rows(&self) -> Vec<BacklogRow> {
        flatten_backlog(
            &self.engine.backlog,
            &self.expanded_olts,
            &self.expanded_pons,
        )
    }

    fn result_count(&self) -> usize {
        match self.corpus {
            SearchCorpus::Endpoints => self.engine.search_results.len(),
            SearchCorpus::Ctos => self.cto_hits.len(),
        }
    }

    async fn on_key(&mut self, key: KeyEvent) {
        // Keys that win everywhere.
        match key.code {
            KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return;
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Backlog => Focus::Map,
                    Focus::Map => Focus::Search,
                    Focus::Search => Focus::Backlog,
                };
                return;
            }
            KeyCode::F(2) => {
                self.corpus = self.corpus.toggled();
                self.result_cursor = 0;
                self.refresh_search().await;
                return;
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else if !self.engine.state.selection.is_idle() {
                    self.engine.reset_selection();
                } else {
                    self.should_quit = true;
                }
                return;
            }
            _ => {}
        }
        if self.show_help {
            return;
        }
        match self.focus {
            Focus::Backlog => self.on_backlog_key(key).await,
            Focus::Map => self.on_map_key(key).await,
            Focus::Search => self.on_search_key(key).await,
        }
    }

    async fn refresh_search(&mut self) {
        match self.corpus {
            SearchCorpus::Ctos => {
                self.cto_hits = self.engine.search_ctos_local(&self.query);
                self.debounce.cancel();
            }
            SearchCorpus::Endpoints => {
                if self.query.trim().is_empty() {
                    self.engine.search_results.clear();
                } else {
                    self.debounce.trigger();
                }
            }
        }
    }

    async fn on_backlog_key(&mut self, key: KeyEvent) {
        let rows = self.backlog_rows();
        if rows.is_empty() {
            return;
        }
        self.backlog_cursor = self.backlog_cursor.min(rows.len() - 1);
        match key.code {
            KeyCode::Up => self.backlog_cursor = self.backlog_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.backlog_cursor = (self.backlog_cursor + 1).min(rows.len() - 1);
            }
            KeyCode::Enter => match rows[self.backlog_cursor].clone() {
                BacklogRow::Olt { olt_id, .. } => {
                    if !self.expanded_olts.remove(&olt_id) {
                        self.expanded_olts.insert(olt_id);
                    }
                }
                BacklogRow::Pon { olt_id, pon_id, .. } => {
                    let key = (olt_id.clone(), pon_id.clone());
                    if self.expanded_pons.remove(&key) {
                        // Collapse only; the cached page stays.
                    } else {
                        self.expanded_pons.insert(key);
                        self.engine.expand_group(&olt_id, &pon_id).await;
                    }
                }
                BacklogRow::Ont {
                    olt_id,
                    pon_id,
                    ont,
                } => {
                    self.engine.select_from_backlog(&ont.id, &olt_id, &pon_id);
                    self.engine.reload_map_layer().await;
                    self.focus = Focus::Map;
                }
                BacklogRow::LoadMore { olt_id, pon_id } => {
                    self.engine.load_more(&olt_id, &pon_id).await;
                }
            },
            KeyCode::Char('a') => {
                if let BacklogRow::Ont { ont, .. } = &rows[self.backlog_cursor] {
                    let id = ont.id.clone();
                    self.engine.select_for_association(&id);
                    self.corpus = SearchCorpus::Ctos;
                    self.focus = Focus::Search;
                    self.refresh_search().await;
                }
            }
            KeyCode::Char('d') => {
                if let BacklogRow::Ont { ont, .. } = rows[self.backlog_cursor].clone() {
                    self.engine.disassociate(&ont.id).await;
                }
            }
            KeyCode::Char('m') => {
                if let BacklogRow::Pon { olt_id, pon_id, .. } | BacklogRow::LoadMore { olt_id, pon_id } =
                    rows[self.backlog_cursor].clone()
                {
                    self.engine.load_more(&olt_id, &pon_id).await;
                }
            }
            KeyCode::Char('r') => {
                if let BacklogRow::Pon { olt_id, pon_id, .. } = rows[self.backlog_cursor].clone() {
                    self.engine.reset_group(&olt_id, &pon_id).await;
                }
            }
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    async fn on_map_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => self.pan(0.0, -0.2).await,
            KeyCode::Right => self.pan(0.0, 0.2).await,
            KeyCode::Up => self.pan(0.2, 0.0).await,
            KeyCode::Down => self.pan(-0.2, 0.0).await,
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(0.5).await,
            KeyCode::Char('-') => self.zoom(2.0).await,
            KeyCode::Char('p') => {
                let center = self.engine.state.viewport.center;
                self.engine.map_clicked(center.lat, center.lon).await;
            }
            KeyCode::Char('n') => {
                let len = self.engine.surfaces.onts.len();
                if len > 0 {
                    self.marker_cursor = (self.marker_cursor + 1) % len;
                    let pos = self
                        .engine
                        .surfaces
                        .onts
                        .iter()
                        .nth(self.marker_cursor)
                        .map(|(_, marker)| marker.position);
                    if let Some(pos) = pos {
                        self.engine.state.viewport.center_on(pos);
                        self.engine.reload_map_layer().await;
                    }
                }
            }
            KeyCode::Enter => {
                if let Some((id, _)) = self.engine.surfaces.onts.iter().nth(self.marker_cursor) {
                    self.engine.surfaces.callout = Some(Callout::Ont(id.clone()));
                }
            }
            KeyCode::Char('g') => {
                // Keyboard drag: move the current marker to the crosshair.
                let id = self
                    .engine
                    .surfaces
                    .onts
                    .iter()
                    .nth(self.marker_cursor)
                    .map(|(id, _)| id.clone());
                if let Some(id) = id {
                    let center = self.engine.state.viewport.center;
                    self.engine.marker_dragged(&id, center.lat, center.lon).await;
                }
            }
            KeyCode::Char('c') => self.engine.surfaces.callout = None,
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    async fn pan(&mut self, dlat: f64, dlon: f64) {
        self.engine.state.viewport.pan(dlat, dlon);
        self.engine.reload_map_layer().await;
    }

    async fn zoom(&mut self, factor: f64) {
        self.engine.state.viewport.zoom(factor);
        self.engine.reload_map_layer().await;
    }

    async fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.query.push(c);
                self.result_cursor = 0;
                self.refresh_search().await;
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.result_cursor = 0;
                self.refresh_search().await;
            }
            KeyCode::Up => self.result_cursor = self.result_cursor.saturating_sub(1),
            KeyCode::Down => {
                let len = self.result_count();
                if len > 0 {
                    self.result_cursor = (self.result_cursor + 1).min(len - 1);
                }
            }
            KeyCode::Enter => self.open_result().await,
            _ => {}
        }
    }

    async fn open_result(&mut self) {
        match self.corpus {
            SearchCorpus::Ctos => {
                let Some(hit) = self.cto_hits.get(self.result_cursor) else {
                    return;
                };
                let uuid = hit.cto.uuid.clone();
                if matches!(self.engine.state.selection, Selection::Associating { .. }) {
                    self.engine.cto_clicked(&uuid).await;
                } else {
                    self.engine.focus_cto(&uuid, Instant::now());
                }
                self.focus = Focus::Map;
            }
            SearchCorpus::Endpoints => {
                let Some(ont) = self.engine.search_results.get(self.result_cursor).cloned()
                else {
                    return;
                };
                self.engine.open_search_result(&ont).await;
                self.focus = Focus::Map;
            }
        }
    }
}

pub async fn run_tui(gateway: Box<dyn Gateway>) -> Result<()> {
    let prefs_file = prefs_path(&default_data_dir());
    let prefs = UiPrefs::load(&prefs_file);
    let mut app = App::new(gateway, &prefs);
    app.engine.refresh_session().await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let prefs = UiPrefs {
        theme: Some(app.theme.label().to_string()),
        has_seen_help: Some(true),
    };
    if let Err(e) = prefs.save(&prefs_file) {
        tracing::warn!(error = %e, "failed to save ui prefs");
    }

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| draw(f, app))?;
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    app.on_key(key).await;
                }
            }
        }
        let now = Instant::now();
        app.engine.tick(now);
        if app.debounce.fire_at(now) && app.corpus == SearchCorpus::Endpoints {
            app.engine.run_endpoint_search(&app.query).await;
            app.result_cursor = 0;
        }
    }
    Ok(())
}

fn draw(f: &mut Frame, app: &mut App) {
    let pal = palette(app.theme);
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(f.area());

    f.render_widget(search_bar(&app.query, pal, app.focus, app.corpus), outer[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
        .split(outer[1]);

    if app.focus == Focus::Search {
        draw_results(f, app, pal, main[0]);
    } else {
        draw_backlog(f, app, pal, main[0]);
    }
    draw_map(f, app, pal, main[1]);

    let status = status_line(
        app.engine.state.selection.mode_label(),
        &filter_label(app.engine.state.filter.as_ref()),
        app.engine.state.selection.selected_ont(),
        app.engine.last_notice(),
        pal,
    );
    f.render_widget(status, outer[2]);

    if app.show_help {
        let area = centered_rect(70, 80, f.area());
        f.render_widget(Clear, area);
        let help = Paragraph::new(help_lines(pal))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(Span::styled("Help", pal.title()))
                    .borders(Borders::ALL),
            );
        f.render_widget(help, area);
    }
}

fn draw_backlog(f: &mut Frame, app: &mut App, pal: ThemePalette, area: Rect) {
    let rows = app.backlog_rows();
    app.backlog_cursor = app.backlog_cursor.min(rows.len().saturating_sub(1));
    let selected_ont = app.engine.state.selection.selected_ont().map(str::to_string);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| match row {
            BacklogRow::Olt {
                name,
                count,
                expanded,
                ..
            } => {
                let arrow = if *expanded { "▾" } else { "▸" };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{arrow} {name}"), pal.title()),
                    Span::styled(format!("  {count}"), Style::default().fg(pal.hint)),
                ]))
            }
            BacklogRow::Pon {
                name,
                count,
                loaded,
                ..
            } => {
                let mark = if *loaded { "·" } else { " " };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("  {name} ")),
                    Span::styled(format!("{count}{mark}"), Style::default().fg(pal.hint)),
                ]))
            }
            BacklogRow::Ont { ont, .. } => {
                let marker = if selected_ont.as_deref() == Some(ont.id.as_str()) {
                    "▶"
                } else {
                    " "
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("   {marker} ")),
                    Span::styled(
                        ont.display_label().to_string(),
                        Style::default().fg(pal.text),
                    ),
                    Span::styled(
                        ont.serial
                            .as_deref()
                            .map(|s| format!("  {s}"))
                            .unwrap_or_default(),
                        Style::default().fg(pal.hint),
                    ),
                ]))
            }
            BacklogRow::LoadMore { .. } => ListItem::new(Line::from(Span::styled(
                "     … load more",
                Style::default().fg(pal.accent),
            ))),
        })
        .collect();

    let total = app.engine.backlog.total_unplaced();
    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(format!("Backlog · {total} unplaced"), pal.title()))
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::Backlog, pal)),
        )
        .highlight_style(pal.selected());
    let mut state = ListState::default().with_selected(Some(app.backlog_cursor));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_results(f: &mut Frame, app: &mut App, pal: ThemePalette, area: Rect) {
    let items: Vec<ListItem> = match app.corpus {
        SearchCorpus::Endpoints => app
            .engine
            .search_results
            .iter()
            .map(|ont| {
                let group = match (&ont.olt_name, &ont.pon_name) {
                    (Some(olt), Some(pon)) => format!("  {olt}/{pon}"),
                    _ => String::new(),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", placement_glyph(ont)),
                        Style::default().fg(if ont.is_unplaced() {
                            colors::STATUS_ERROR
                        } else {
                            colors::STATUS_SUCCESS
                        }),
                    ),
                    Span::raw(ont.display_label().to_string()),
                    Span::styled(group, Style::default().fg(pal.hint)),
                ]))
            })
            .collect(),
        SearchCorpus::Ctos => app
            .cto_hits
            .iter()
            .map(|hit| {
                ListItem::new(Line::from(vec![
                    Span::styled(hit.cto.name.clone(), Style::default().fg(pal.accent_alt)),
                    Span::styled(
                        format!("  {}", hit.cto.uuid),
                        Style::default().fg(pal.hint),
                    ),
                ]))
            })
            .collect(),
    };

    let count = items.len();
    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(format!("Results · {count}"), pal.title()))
                .borders(Borders::ALL)
                .border_style(border_style(true, pal)),
        )
        .highlight_style(pal.selected());
    let mut state = ListState::default().with_selected(Some(app.result_cursor));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_map(f: &mut Frame, app: &App, pal: ThemePalette, area: Rect) {
    let block = Block::default()
        .title(Span::styled(
            format!(
                "Map · {} ONTs · {} CTOs",
                app.engine.surfaces.onts.len(),
                app.engine.surfaces.ctos.len()
            ),
            pal.title(),
        ))
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::Map, pal));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let cols = inner.width;
    let rows = inner.height;
    let bbox = app.engine.state.viewport.bbox();
    let mut glyphs: Vec<Vec<(char, Color)>> =
        vec![vec![(' ', pal.text); cols as usize]; rows as usize];

    let highlight = app
        .engine
        .surfaces
        .highlight
        .as_ref()
        .map(|h| h.cto_uuid.clone());
    // Association links first so markers draw over them.
    for link in app.engine.surfaces.links.values() {
        let steps = 8;
        for i in 1..steps {
            let t = f64::from(i) / f64::from(steps);
            let pos = crate::model::LatLon::new(
                link.from.lat + (link.to.lat - link.from.lat) * t,
                link.from.lon + (link.to.lon - link.from.lon) * t,
            );
            if let Some((x, y)) = grid_cell(&bbox, pos, cols, rows) {
                glyphs[y as usize][x as usize] = ('·', colors::MARKER_LINK);
            }
        }
    }
    for cto in app.engine.surfaces.ctos.values() {
        if let Some((x, y)) = grid_cell(&bbox, cto.position, cols, rows) {
            let lit = highlight.as_deref() == Some(cto.uuid.as_str());
            glyphs[y as usize][x as usize] = if lit {
                ('◉', pal.accent)
            } else {
                ('◇', colors::MARKER_CTO)
            };
        }
    }
    for (idx, (_, marker)) in app.engine.surfaces.onts.iter().enumerate() {
        if let Some((x, y)) = grid_cell(&bbox, marker.position, cols, rows) {
            let current = idx == app.marker_cursor;
            glyphs[y as usize][x as usize] = if current {
                ('●', pal.accent)
            } else {
                ('●', colors::MARKER_ONT)
            };
        }
    }
    // Crosshair marks where `p` places and `g` drags to.
    let (cx, cy) = (cols / 2, rows / 2);
    glyphs[cy as usize][cx as usize] = ('+', pal.accent_alt);

    let lines: Vec<Line> = glyphs
        .into_iter()
        .map(|row| {
            Line::from(
                row.into_iter()
                    .map(|(ch, color)| Span::styled(ch.to_string(), Style::default().fg(color)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);

    if let Some(callout) = &app.engine.surfaces.callout {
        draw_callout(f, app, pal, inner, callout);
    }
}

fn draw_callout(f: &mut Frame, app: &App, pal: ThemePalette, map_area: Rect, callout: &Callout) {
    let mut lines: Vec<Line> = Vec::new();
    match callout {
        Callout::Ont(id) => {
            let Some(marker) = app.engine.surfaces.onts.get(id) else {
                return;
            };
            let ont = &marker.ont;
            lines.push(Line::from(Span::styled(
                format!("ONT {}", ont.display_label()),
                pal.title(),
            )));
            if let Some(serial) = &ont.serial {
                lines.push(Line::from(format!("serial: {serial}")));
            }
            lines.push(Line::from(format!(
                "at {:.5}, {:.5}",
                marker.position.lat, marker.position.lon
            )));
            match &ont.cto_uuid {
                Some(uuid) => lines.push(Line::from(format!("cto: {uuid}"))),
                None => lines.push(Line::from(Span::styled(
                    "no association",
                    Style::default().fg(pal.hint),
                ))),
            }
            if let Some(desc) = &ont.description {
                lines.push(Line::from(Span::styled(
                    desc.clone(),
                    Style::default().fg(pal.hint),
                )));
            }
        }
        Callout::Cto(uuid) => {
            let Some(cto) = app.engine.surfaces.ctos.get(uuid) else {
                return;
            };
            lines.push(Line::from(Span::styled(
                format!("CTO {}", cto.name),
                pal.title(),
            )));
            lines.push(Line::from(uuid.clone()));
            lines.push(Line::from(format!(
                "at {:.5}, {:.5}",
                cto.position.lat, cto.position.lon
            )));
        }
    }

    let height = (lines.len() as u16 + 2).min(map_area.height);
    let area = Rect {
        x: map_area.x,
        y: map_area.y + map_area.height - height,
        width: map_area.width.min(44),
        height,
    };
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn border_style(focused: bool, pal: ThemePalette) -> Style {
    if focused {
        Style::default().fg(pal.accent)
    } else {
        Style::default().fg(pal.hint)
    }
}

/// Centered overlay rectangle, percent-sized.
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
