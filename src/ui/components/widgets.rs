use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::engine::{Notice, NoticeLevel};
use crate::ui::components::theme::{colors, ThemePalette};
use crate::ui::data::{Focus, SearchCorpus};

pub fn search_bar(
    query: &str,
    palette: ThemePalette,
    focus: Focus,
    corpus: SearchCorpus,
) -> Paragraph<'static> {
    let focused = focus == Focus::Search;
    let title = Span::styled(format!("Search · {}", corpus.label()), palette.title());

    let style = if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.hint)
    };
    let cursor = if focused { "▎" } else { "" };
    let first_line = Line::from(Span::styled(format!("/ {query}{cursor}"), style));

    let tips_line = Line::from(vec![
        Span::styled("Tab", Style::default().fg(palette.accent)),
        Span::raw(" pane  "),
        Span::styled("F2", Style::default().fg(palette.hint)),
        Span::raw(" corpus  "),
        Span::styled("F1", Style::default().fg(palette.hint)),
        Span::raw(" help  "),
        Span::styled("Esc", Style::default().fg(palette.hint)),
        Span::raw(" deselect/quit"),
    ]);

    let border_style = if focused {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.hint)
    };

    Paragraph::new(vec![first_line, tips_line])
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .alignment(Alignment::Left)
}

/// Bottom line: active mode, filter, selection and the last notice.
pub fn status_line(
    mode_label: &str,
    filter_label: &str,
    selected: Option<&str>,
    notice: Option<&Notice>,
    palette: ThemePalette,
) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(format!(" {mode_label} "), palette.selected()),
        Span::raw("  "),
        Span::styled(
            filter_label.to_string(),
            Style::default().fg(palette.accent_alt),
        ),
    ];
    if let Some(id) = selected {
        spans.push(Span::raw("  sel: "));
        spans.push(Span::styled(
            id.to_string(),
            Style::default().fg(palette.accent),
        ));
    }
    if let Some(notice) = notice {
        let color = match notice.level {
            NoticeLevel::Info => colors::STATUS_SUCCESS,
            NoticeLevel::Error => colors::STATUS_ERROR,
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(notice.text.clone(), Style::default().fg(color)));
    }
    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::TOP))
}

pub fn help_lines(palette: ThemePalette) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    let add_section = |title: &str, items: &[&str]| -> Vec<Line<'static>> {
        let mut v = Vec::new();
        v.push(Line::from(Span::styled(title.to_string(), palette.title())));
        for item in items {
            v.push(Line::from(format!("  {item}")));
        }
        v.push(Line::from(""));
        v
    };

    lines.extend(add_section(
        "Backlog",
        &[
            "Up/Down move; Enter expands a node or fetches a port's first page",
            "Enter on an endpoint starts placement and syncs the map filter",
            "a associate endpoint | d disassociate | m load more | r reset group",
        ],
    ));
    lines.extend(add_section(
        "Map",
        &[
            "Arrows pan, +/- zoom (reloads the layer when a filter is set)",
            "p places the selected endpoint at the crosshair",
            "n cycles markers; Enter opens the callout; g drags the marker to the crosshair",
        ],
    ));
    lines.extend(add_section(
        "Search",
        &[
            "Type to search; endpoint queries are debounced round-trips",
            "F2 flips to local aggregation-point search",
            "Enter routes a result: place if unplaced, locate otherwise;",
            "picking a CTO while associating issues the association",
        ],
    ));
    lines.extend(add_section(
        "General",
        &["Tab cycles panes | t theme | F1 help | Esc clears selection, then quits"],
    ));
    lines
}
