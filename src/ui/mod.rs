use std::collections::HashMap;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{BulkEditOverlay, ChecklistState, OverlayState, ViewRow};
use crate::bulk::BulkFields;
use crate::config::Palette;
use crate::model::{CheckId, CheckRecord};
use crate::view::{ColumnKey, GroupBy, RowAffordance};

const NAME_WIDTH: usize = 28;
const URL_WIDTH: usize = 36;

/// Screen regions the event loop needs after a frame is drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameLayout {
    /// Table rows below the header line; used to map mouse rows back to view rows.
    pub table_body: Rect,
}

pub fn draw_app(
    frame: &mut Frame,
    state: &ChecklistState,
    table_state: &mut TableState,
    palette: &Palette,
) -> FrameLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    frame.render_widget(
        Paragraph::new(build_search_line(state, palette)),
        vertical[0],
    );

    let now_ms = crate::storage::now_millis();
    let by_id: HashMap<&CheckId, &CheckRecord> = state
        .checks()
        .iter()
        .map(|record| (&record.id, record))
        .collect();
    let columns = state.prefs.columns.visible_columns();
    let markers = state.markers();
    let drag_target = state.drag().target();

    let rows: Vec<Row> = state
        .rows()
        .into_iter()
        .map(|row| match row {
            ViewRow::Header {
                label,
                count,
                collapsed,
                ..
            } => {
                let arrow = if collapsed { "▸" } else { "▾" };
                Row::new(vec![
                    Cell::from(""),
                    Cell::from(arrow),
                    Cell::from(format!("{label} ({count})")),
                ])
                .style(
                    Style::default()
                        .fg(palette.header)
                        .add_modifier(Modifier::BOLD),
                )
            }
            ViewRow::Check { position, id } => match by_id.get(&id) {
                Some(record) => {
                    let selected = state.selection().contains(&id);
                    let affordance = markers.affordance(&id);
                    let dragging = drag_target == Some(position);
                    check_row(record, &columns, selected, affordance, dragging, now_ms, palette)
                }
                None => Row::new(vec![Cell::from(""), Cell::from(""), Cell::from(id.to_string())]),
            },
        })
        .collect();

    let empty = rows.is_empty();
    let mut widths = vec![
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min((NAME_WIDTH + 2) as u16),
    ];
    widths.extend(columns.iter().map(|key| Constraint::Length(column_width(*key))));

    let mut header_cells = vec![Cell::from(select_all_mark(state)), Cell::from(""), Cell::from("Name")];
    header_cells.extend(columns.iter().map(|key| Cell::from(key.title())));
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    );

    let title = match state.prefs.group_by {
        GroupBy::None => format!("Checks · {}", state.prefs.sort_by.label()),
        GroupBy::Folder => format!("Checks by folder · {}", state.prefs.sort_by.label()),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted));
    let inner = block.inner(vertical[1]);

    if empty {
        let hint = if state.checks().is_empty() {
            "No checks yet. Run `checklist import <file>` to load some."
        } else {
            "No checks match the current search."
        };
        frame.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(palette.muted))
                .block(block),
            vertical[1],
        );
    } else {
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(palette.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");
        frame.render_stateful_widget(table, vertical[1], table_state);
    }

    let status = build_status_line(state, palette);
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(palette.muted)),
        vertical[2],
    );

    render_overlay(frame, state, palette);

    FrameLayout {
        table_body: Rect {
            y: inner.y.saturating_add(1),
            height: inner.height.saturating_sub(1),
            ..inner
        },
    }
}

fn select_all_mark(state: &ChecklistState) -> &'static str {
    if state.selection().is_all_selected() {
        "[x]"
    } else if state.selection().is_empty() {
        "[ ]"
    } else {
        "[-]"
    }
}

fn check_row<'a>(
    record: &CheckRecord,
    columns: &[ColumnKey],
    selected: bool,
    affordance: RowAffordance,
    dragging: bool,
    now_ms: i64,
    palette: &Palette,
) -> Row<'a> {
    let glyph = if dragging {
        "↕"
    } else {
        match affordance {
            RowAffordance::Checking => "⟳",
            RowAffordance::FolderMove => "→",
            RowAffordance::Updating => "…",
            RowAffordance::Idle => " ",
        }
    };
    let base = if record.disabled {
        palette.disabled_style()
    } else {
        palette.affordance_style(affordance)
    };
    let name = Line::from(vec![
        Span::styled(
            truncate_to_width(&record.name, NAME_WIDTH),
            base.add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            truncate_to_width(&record.url, URL_WIDTH),
            Style::default().fg(palette.muted),
        ),
    ]);

    let mut cells = vec![
        Cell::from(if selected { "[x]" } else { "[ ]" }),
        Cell::from(Span::styled(glyph, palette.affordance_style(affordance))),
        Cell::from(name),
    ];
    for key in columns {
        let text = cell_text(record, *key, now_ms);
        let cell = match key {
            ColumnKey::Status if record.disabled => {
                Cell::from(Span::styled(text, palette.disabled_style()))
            }
            ColumnKey::Status => Cell::from(Span::styled(text, palette.status_style(record.status))),
            _ => Cell::from(Span::styled(text, base)),
        };
        cells.push(cell);
    }
    let mut row = Row::new(cells);
    if dragging {
        row = row.style(Style::default().add_modifier(Modifier::REVERSED));
    }
    row
}

fn column_width(key: ColumnKey) -> u16 {
    match key {
        ColumnKey::Status => 20,
        ColumnKey::Type => 13,
        ColumnKey::Folder => 16,
        ColumnKey::ResponseTime => 8,
        ColumnKey::LastChecked => 11,
        ColumnKey::CheckFrequency => 6,
        ColumnKey::Region => 16,
        ColumnKey::Ssl => 8,
        ColumnKey::DomainExpiry => 8,
        ColumnKey::CreatedAt => 10,
    }
}

/// Plain text for one optional column of a check row.
pub fn cell_text(record: &CheckRecord, key: ColumnKey, now_ms: i64) -> String {
    match key {
        ColumnKey::Status if record.disabled => "paused".to_string(),
        ColumnKey::Status => record.status.as_str().to_string(),
        ColumnKey::Type => record.check_type.as_ref().to_string(),
        ColumnKey::Folder => record
            .folder_label()
            .map(|folder| truncate_to_width(folder, usize::from(column_width(key))))
            .unwrap_or_else(|| "-".to_string()),
        ColumnKey::ResponseTime => record
            .response_time
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string()),
        ColumnKey::LastChecked => record
            .last_checked
            .map(|at| format_relative(at, now_ms))
            .unwrap_or_else(|| "never".to_string()),
        ColumnKey::CheckFrequency => record
            .check_frequency
            .map(format_interval)
            .unwrap_or_else(|| "-".to_string()),
        ColumnKey::Region => record
            .check_region
            .map(|region| region.as_ref().to_string())
            .unwrap_or_else(|| "auto".to_string()),
        ColumnKey::Ssl => match &record.ssl_certificate {
            None => "-".to_string(),
            Some(ssl) if !ssl.valid => "invalid".to_string(),
            Some(ssl) => ssl
                .days_until_expiry
                .map(|days| format!("{days}d"))
                .unwrap_or_else(|| "valid".to_string()),
        },
        ColumnKey::DomainExpiry => match &record.domain_expiry {
            None => "-".to_string(),
            Some(domain) if !domain.valid => "invalid".to_string(),
            Some(domain) => domain
                .days_until_expiry
                .map(|days| format!("{days}d"))
                .unwrap_or_else(|| "valid".to_string()),
        },
        ColumnKey::CreatedAt => record
            .created_at
            .map(format_date)
            .unwrap_or_else(|| "-".to_string()),
    }
}

pub fn format_relative(at_ms: i64, now_ms: i64) -> String {
    let seconds = (now_ms - at_ms) / 1000;
    if seconds < 0 {
        return "soon".to_string();
    }
    match seconds {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", seconds / 60),
        3_600..=86_399 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}

pub fn format_interval(seconds: u32) -> String {
    if seconds > 0 && seconds % 3_600 == 0 {
        format!("{}h", seconds / 3_600)
    } else if seconds > 0 && seconds % 60 == 0 {
        format!("{}m", seconds / 60)
    } else {
        format!("{seconds}s")
    }
}

fn format_date(epoch_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch_ms.div_euclid(1000))
        .ok()
        .and_then(|dt| dt.format(&format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| "-".to_string())
}

/// Cuts `text` to at most `max` terminal columns, ending with an ellipsis when shortened.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = grapheme.width();
        if used + width + 1 > max {
            break;
        }
        out.push_str(grapheme);
        used += width;
    }
    out.push('…');
    out
}

fn build_search_line(state: &ChecklistState, palette: &Palette) -> Line<'static> {
    if state.search.active {
        Line::from(vec![
            Span::styled("/", Style::default().fg(palette.accent)),
            Span::raw(state.search.query.clone()),
            Span::styled("▌", Style::default().fg(palette.accent)),
        ])
    } else if !state.search.query.is_empty() {
        Line::from(vec![
            Span::styled("Filter: ", Style::default().fg(palette.muted)),
            Span::styled(
                state.search.query.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled("  (Esc clears)", Style::default().fg(palette.muted)),
        ])
    } else {
        Line::from(Span::styled(
            "Press / to search, ? for help",
            Style::default().fg(palette.muted),
        ))
    }
}

fn build_status_line(state: &ChecklistState, palette: &Palette) -> Text<'static> {
    let visible = state.visible_checks().len();
    let total = state.checks().len();
    let selected = state.selection().len();
    let group = match state.prefs.group_by {
        GroupBy::None => "none",
        GroupBy::Folder => "folder",
    };

    let mut spans = vec![
        Span::raw(format!("{visible}/{total} checks")),
        Span::raw(" | Sort: "),
        Span::styled(
            state.prefs.sort_by.label(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Group: "),
        Span::styled(group, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if selected > 0 {
        spans.push(Span::raw(" | Selected: "));
        spans.push(Span::styled(
            selected.to_string(),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if state.drag().is_dragging() {
        spans.push(Span::styled(
            " | Moving",
            Style::default()
                .fg(palette.header)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let mut lines = vec![Line::from(spans)];
    if let Some(message) = &state.status_message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(palette.text),
        )));
    }
    Text::from(lines)
}

fn render_overlay(frame: &mut Frame, state: &ChecklistState, palette: &Palette) {
    let hint_style = Style::default().fg(palette.muted);
    let border_style = Style::default().fg(palette.accent);
    match &state.overlay {
        Some(OverlayState::BulkEdit(overlay)) => {
            let area = centered_rect(60, 50, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(bulk_edit_lines(overlay, palette))
                .block(
                    Block::default()
                        .title(format!("Bulk edit {} checks", overlay.ids.len()))
                        .borders(Borders::ALL)
                        .border_style(border_style),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::FolderPicker(picker)) => {
            let area = centered_rect(50, 50, frame.size());
            frame.render_widget(Clear, area);
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(1)])
                .split(area);
            let items: Vec<ListItem> = picker.labels().map(ListItem::new).collect();
            let list = List::new(items)
                .block(
                    Block::default()
                        .title(format!("Move {} to folder", pluralize(picker.targets().len())))
                        .borders(Borders::ALL)
                        .border_style(border_style),
                )
                .highlight_style(
                    Style::default()
                        .bg(palette.selection_bg)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("▸ ");
            let mut list_state = ListState::default();
            list_state.select(Some(picker.cursor()));
            frame.render_stateful_widget(list, layout[0], &mut list_state);
            frame.render_widget(
                Paragraph::new("Enter to move • n new folder • Esc to cancel").style(hint_style),
                layout[1],
            );
        }
        Some(OverlayState::NewFolder(dialog)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let mut draft = dialog.draft().to_string();
            draft.push('▌');
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    "New folder name",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(draft),
                Line::from(""),
                Line::from(Span::styled("Enter to create • Esc to cancel", hint_style)),
            ])
            .block(
                Block::default()
                    .title("New Folder")
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::ConfirmDelete(overlay)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("Delete {}?", overlay.label),
                    Style::default()
                        .fg(palette.offline)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled("This cannot be undone.", hint_style)),
                Line::from(""),
                Line::from(Span::styled("y / Enter to delete • n / Esc to cancel", hint_style)),
            ])
            .block(
                Block::default()
                    .title("Confirm Delete")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.offline)),
            )
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::Help) => {
            let area = centered_rect(60, 70, frame.size());
            frame.render_widget(Clear, area);
            let lines: Vec<Line> = HELP_ENTRIES
                .iter()
                .map(|(keys, what)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{keys:<12}"),
                            Style::default()
                                .fg(palette.accent)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(*what),
                    ])
                })
                .collect();
            let paragraph = Paragraph::new(lines).block(
                Block::default()
                    .title("Keys")
                    .borders(Borders::ALL)
                    .border_style(border_style),
            );
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

const HELP_ENTRIES: &[(&str, &str)] = &[
    ("j / k", "Move cursor (or held row while moving)"),
    ("space", "Select check"),
    ("a", "Select all visible checks"),
    ("/", "Search (folder: status: type: region: is: checked: created:)"),
    ("s", "Cycle sort order"),
    ("g", "Toggle folder grouping"),
    ("z / Enter", "Collapse or expand folder"),
    ("1-9, 0", "Toggle optional columns"),
    ("m", "Pick up or drop a row (custom order)"),
    ("p", "Pause or resume check"),
    ("P / U", "Pause / resume selected checks"),
    ("c", "Run check now"),
    ("d", "Delete check or selection"),
    ("e", "Bulk edit selected checks"),
    ("f / n", "Move to folder / new folder"),
    ("Ctrl-r", "Reload from storage"),
    ("q", "Quit"),
];

fn bulk_edit_lines(overlay: &BulkEditOverlay, palette: &Palette) -> Vec<Line<'static>> {
    let current = overlay.field();
    let mut lines = Vec::with_capacity(BulkFields::ORDERED.len() + 4);
    for field in BulkFields::ORDERED {
        let enabled = overlay.draft.is_enabled(field);
        let mark = if enabled { "[x] " } else { "[ ] " };
        let mut style = if enabled {
            Style::default().fg(palette.text)
        } else {
            Style::default().fg(palette.muted)
        };
        if field == current {
            style = style.bg(palette.selection_bg).add_modifier(Modifier::BOLD);
        }
        let value = match (&overlay.input, field == current) {
            (Some(input), true) => format!("{input}▌"),
            _ => overlay.draft.value_label(field),
        };
        lines.push(Line::from(vec![
            Span::styled(mark, style),
            Span::styled(format!("{:<28}", field.label()), style),
            Span::styled(value, style),
        ]));
    }
    lines.push(Line::from(""));
    if let Some(error) = &overlay.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(palette.offline),
        )));
    }
    lines.push(Line::from(Span::styled(
        "space include • Enter edit • Ctrl-s apply • Esc cancel",
        Style::default().fg(palette.muted),
    )));
    lines
}

fn pluralize(count: usize) -> String {
    if count == 1 {
        "1 check".to_string()
    } else {
        format!("{count} checks")
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
