use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};

use crate::app::state::{
    AppState, AttachTarget, ComposeField, EditorMode, OverlayState, PasswordPurpose,
};
use crate::app::TextBuffer;
use crate::config::ThemeName;
use crate::drawing::Canvas;
use crate::highlight::{build_highlight_regex, split_matches};
use crate::model::{AttachmentKind, Note, NoteKind, Template};
use crate::storage::KeyValueStore;
use crate::view::{styled_lines, InlineStyle, HANDWRITING_PREVIEW, LOCKED_PREVIEW};

/// Screen regions, shared by rendering and mouse hit-testing.
#[derive(Debug, Clone, Copy)]
pub struct ScreenLayout {
    pub list: Rect,
    pub detail: Rect,
    pub status: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(vertical[0]);
        Self {
            list: columns[0],
            detail: columns[1],
            status: vertical[1],
        }
    }

    /// Drawing area inside the detail pane's border.
    pub fn canvas(&self) -> Rect {
        inner(self.detail)
    }

    /// Canvas pixels: one per column, two per row (half blocks).
    pub fn canvas_size(&self) -> (u32, u32) {
        let canvas = self.canvas();
        (u32::from(canvas.width), u32::from(canvas.height) * 2)
    }

    /// Maps a terminal cell to the canvas pixel under its upper half.
    pub fn canvas_point(&self, column: u16, row: u16) -> Option<(i32, i32)> {
        let canvas = self.canvas();
        let inside = column >= canvas.x
            && column < canvas.x + canvas.width
            && row >= canvas.y
            && row < canvas.y + canvas.height;
        inside.then(|| {
            (
                i32::from(column - canvas.x),
                i32::from(row - canvas.y) * 2,
            )
        })
    }
}

struct Palette {
    base: Style,
    muted: Style,
    accent: Color,
    border: Style,
}

fn palette(theme: ThemeName) -> Palette {
    match theme {
        ThemeName::Light => Palette {
            base: Style::default(),
            muted: Style::default().fg(Color::Gray),
            accent: Color::Blue,
            border: Style::default().fg(Color::Cyan),
        },
        ThemeName::Dark => Palette {
            base: Style::default().fg(Color::White).bg(Color::Black),
            muted: Style::default().fg(Color::DarkGray).bg(Color::Black),
            accent: Color::Magenta,
            border: Style::default().fg(Color::Magenta).bg(Color::Black),
        },
    }
}

pub fn draw_app<S: KeyValueStore>(frame: &mut Frame, state: &AppState<S>, list_state: &mut ListState) {
    let layout = ScreenLayout::new(frame.size());
    let colors = palette(state.theme());
    frame.render_widget(Block::default().style(colors.base), frame.size());

    draw_list(frame, state, list_state, layout.list, &colors);
    match state.mode() {
        EditorMode::Text => draw_preview(frame, state, layout.detail, &colors),
        EditorMode::Handwriting => draw_canvas_pane(frame, state, layout.detail, &colors),
    }

    let status = Paragraph::new(build_status_line(state))
        .block(Block::default().borders(Borders::TOP).border_style(colors.border))
        .style(colors.base);
    frame.render_widget(status, layout.status);

    render_overlay(frame, state, &colors);
}

fn draw_list<S: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<S>,
    list_state: &mut ListState,
    area: Rect,
    colors: &Palette,
) {
    let regex = build_highlight_regex(&state.query().search);
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let rows = state.rows();
    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut title_spans = Vec::new();
        let checkbox = if state.selection().contains(row.id) {
            "[x] "
        } else {
            "[ ] "
        };
        title_spans.push(Span::raw(checkbox));
        if row.note.is_favorite {
            title_spans.push(Span::styled(
                "★ ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if row.note.is_locked && !row.locked_for_display {
            title_spans.push(Span::styled("🔓 ", colors.muted));
        }
        title_spans.extend(highlight_spans(
            &row.display_title(),
            regex.as_ref(),
            highlight_style,
            Style::default().add_modifier(Modifier::BOLD),
        ));

        let meta = Line::from(Span::styled(
            format!(
                "    {} · {} view(s)",
                format_date(row.note.created_at),
                row.note.view_count
            ),
            colors.muted,
        ));
        let preview = Line::from(Span::raw(format!(
            "    {}",
            row.preview(state.preview_chars())
        )));
        items.push(ListItem::new(vec![Line::from(title_spans), meta, preview]));
    }
    if items.is_empty() {
        let message = if state.query().has_filters() {
            "No notes match the current filters."
        } else {
            "No notes yet. Press `n` to write one."
        };
        items.push(ListItem::new(message));
    }

    let mut title = format!("Notes ({}) · {}", rows.len(), state.query().sort.label());
    if state.query().favorites_only {
        title.push_str(" · ★ only");
    }
    if state.all_visible_selected() {
        title.push_str(" · all selected");
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(colors.border),
        )
        .highlight_style(
            Style::default()
                .bg(colors.accent)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    if rows.is_empty() {
        list_state.select(None);
    } else {
        list_state.select(Some(state.cursor()));
    }
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_preview<S: KeyValueStore>(frame: &mut Frame, state: &AppState<S>, area: Rect, colors: &Palette) {
    let block = Block::default()
        .title(format!("Preview · template {}", state.template()))
        .borders(Borders::ALL)
        .border_style(colors.border);

    let Some(row) = state.current_row() else {
        let empty = Paragraph::new(draft_lines(state, colors)).block(block);
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            row.display_title(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(note_meta(row.note), colors.muted)),
        Line::from(""),
    ];
    if row.locked_for_display {
        lines.push(Line::from(LOCKED_PREVIEW));
        lines.push(Line::from(Span::styled(
            "Press Enter or L to unlock the session.",
            colors.muted,
        )));
    } else if row.note.is_handwriting() {
        lines.push(Line::from(HANDWRITING_PREVIEW));
        lines.push(Line::from(Span::styled("Press Enter to view it.", colors.muted)));
    } else {
        lines.extend(formatted_lines(&row.note.content));
    }
    if !row.locked_for_display {
        lines.extend(attachment_lines(row.note, None, colors));
    }
    lines.push(Line::from(""));
    lines.extend(draft_lines(state, colors));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_canvas_pane<S: KeyValueStore>(
    frame: &mut Frame,
    state: &AppState<S>,
    area: Rect,
    colors: &Palette,
) {
    let history = state.drawing().history();
    let title = format!(
        "Canvas · {} · step {}/{} · drag to draw, u undo, r redo, c clear, n save",
        state.template(),
        history.cursor().map(|cursor| cursor + 1).unwrap_or(0),
        history.len()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(colors.border);
    let canvas_area = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        CanvasView::new(state.drawing().canvas(), state.template(), state.theme()),
        canvas_area,
    );
}

fn draft_lines<S: KeyValueStore>(state: &AppState<S>, colors: &Palette) -> Vec<Line<'static>> {
    if state.pending_attachments().is_empty() {
        return Vec::new();
    }
    let names: Vec<&str> = state
        .pending_attachments()
        .iter()
        .map(|attachment| attachment.name.as_str())
        .collect();
    vec![Line::from(Span::styled(
        format!("Next note attachments: {} (x removes the last)", names.join(", ")),
        colors.muted,
    ))]
}

/// Note markup as display lines, keeping bold, italic and underline.
fn formatted_lines(markup: &str) -> Vec<Line<'static>> {
    styled_lines(markup)
        .into_iter()
        .map(|runs| {
            Line::from(
                runs.into_iter()
                    .map(|run| Span::styled(run.text, inline_style(run.style)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

fn inline_style(inline: InlineStyle) -> Style {
    let mut style = Style::default();
    if inline.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if inline.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if inline.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    style
}

fn note_meta(note: &Note) -> String {
    format!(
        "{} · {} · {} view(s){}",
        format_date(note.created_at),
        note.template,
        note.view_count,
        if note.is_favorite { " · ★" } else { "" }
    )
}

fn attachment_lines(note: &Note, cursor: Option<usize>, colors: &Palette) -> Vec<Line<'static>> {
    if note.attachments.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Attachments",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    for (position, attachment) in note.attachments.iter().enumerate() {
        let icon = match attachment.kind {
            AttachmentKind::Image => "🖼",
            AttachmentKind::Audio => "🔊",
        };
        let text = format!("  {icon} {}", attachment.name);
        let line = if cursor == Some(position) {
            Line::from(Span::styled(
                text,
                Style::default()
                    .bg(colors.accent)
                    .fg(Color::Black),
            ))
        } else {
            Line::from(text)
        };
        lines.push(line);
    }
    lines
}

fn build_status_line<S: KeyValueStore>(state: &AppState<S>) -> Text<'static> {
    let total = state.collection().len();
    let visible = state.rows().len();
    let session = if state.session().is_unlocked() {
        Span::styled(
            "Unlocked",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "Locked",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )
    };
    let mode = match state.mode() {
        EditorMode::Text => "Text",
        EditorMode::Handwriting => "Handwriting",
    };

    let mut spans = vec![
        Span::raw(format!("Notes: {visible}/{total}")),
        Span::raw(" | Session: "),
        session,
        Span::raw(format!(" | Mode: {mode} | Theme: {}", state.theme())),
    ];
    if !state.selection().is_empty() {
        spans.push(Span::raw(format!(" | Selected: {}", state.selection().len())));
    }
    if state.is_search_active() || !state.query().search.is_empty() {
        spans.push(Span::raw(" | Search: "));
        let mut query = state.query().search.clone();
        if state.is_search_active() {
            query.push('▌');
        }
        spans.push(Span::styled(
            query,
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }

    let message = state
        .status_message()
        .map(str::to_string)
        .unwrap_or_else(|| "Press ? for keys".to_string());
    Text::from(vec![
        Line::from(spans),
        Line::from(Span::styled(message, Style::default().fg(Color::Gray))),
    ])
}

fn highlight_spans(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    split_matches(text, regex)
        .into_iter()
        .map(|(segment, matched)| {
            let style = if matched { highlight_style } else { base_style };
            Span::styled(segment.to_string(), style)
        })
        .collect()
}

fn format_date(dt: OffsetDateTime) -> String {
    dt.format(&format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

/// Renders `buffer` with a block cursor at its insertion point.
fn with_cursor(buffer: &TextBuffer, focused: bool) -> String {
    let mut display = buffer.as_str().to_string();
    if focused {
        display.insert(buffer.cursor(), '▌');
    }
    display
}

fn render_overlay<S: KeyValueStore>(frame: &mut Frame, state: &AppState<S>, colors: &Palette) {
    match state.overlay() {
        Some(OverlayState::Compose(compose)) => {
            let area = centered_rect(70, 70, frame.size());
            frame.render_widget(Clear, area);
            let heading = match (compose.editing.is_some(), compose.kind) {
                (true, _) => "Edit Note",
                (false, NoteKind::Text) => "New Note",
                (false, NoteKind::Handwriting) => "Save Drawing",
            };
            let title_focused = compose.field == ComposeField::Title;
            let mut lines = vec![
                Line::from(Span::styled("Title", colors.muted)),
                Line::from(with_cursor(&compose.title, title_focused)),
                Line::from(""),
            ];
            if compose.kind == NoteKind::Text {
                lines.push(Line::from(Span::styled("Body", colors.muted)));
                let body = with_cursor(&compose.body, !title_focused);
                lines.extend(body.lines().map(|line| Line::from(line.to_string())));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Tab switch field • Ctrl-b/e/u bold, italic, underline • Ctrl-s save • Esc cancel",
                    colors.muted,
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "Enter save • Esc cancel",
                    colors.muted,
                )));
            }
            let paragraph = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(heading)
                        .borders(Borders::ALL)
                        .border_style(colors.border),
                )
                .style(colors.base)
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::ViewNote(view)) => {
            let Some(note) = state.collection().find(view.note_id) else {
                return;
            };
            let area = centered_rect(80, 80, frame.size());
            frame.render_widget(Clear, area);
            let block = Block::default()
                .title(note.title.clone())
                .borders(Borders::ALL)
                .border_style(colors.border)
                .style(colors.base);
            let body_area = block.inner(area);
            frame.render_widget(block, area);

            let footer_height = 3 + note.attachments.len().min(6) as u16 * 2;
            let sections = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Min(3),
                    Constraint::Length(footer_height),
                ])
                .split(body_area);
            frame.render_widget(
                Paragraph::new(Span::styled(note_meta(note), colors.muted)),
                sections[0],
            );
            if note.kind == NoteKind::Handwriting {
                let (width, height) = (
                    u32::from(sections[1].width),
                    u32::from(sections[1].height) * 2,
                );
                let mut canvas = Canvas::new(width.max(1), height.max(1));
                if let Err(err) = canvas.draw_data_uri(&note.content) {
                    tracing::warn!(?err, id = %note.id, "unreadable drawing");
                }
                frame.render_widget(
                    CanvasView::new(&canvas, note.template, state.theme()),
                    sections[1],
                );
            } else {
                frame.render_widget(
                    Paragraph::new(formatted_lines(&note.content)).wrap(Wrap { trim: false }),
                    sections[1],
                );
            }
            let mut footer = attachment_lines(note, Some(view.attachment_cursor), colors);
            footer.push(Line::from(Span::styled(
                "e edit • a attach • j/k pick • s save attachment • x remove • Esc close",
                colors.muted,
            )));
            frame.render_widget(
                Paragraph::new(footer).wrap(Wrap { trim: false }),
                sections[2],
            );
        }
        Some(OverlayState::Password(prompt)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let heading = match prompt.purpose {
                PasswordPurpose::Unlock => "Unlock Session",
                PasswordPurpose::Change => "Change Password",
            };
            let masked = "•".repeat(prompt.input.as_str().chars().count());
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(prompt.label(), colors.muted)),
                Line::from(format!("{masked}▌")),
                Line::from(""),
                Line::from(Span::styled("Enter submit • Esc cancel", colors.muted)),
            ])
            .block(
                Block::default()
                    .title(heading)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .style(colors.base);
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::ConfirmDelete(pending)) => {
            let area = centered_rect(60, 35, frame.size());
            frame.render_widget(Clear, area);
            let mut lines = vec![
                Line::from(Span::styled(
                    format!("Delete {} note(s)? This cannot be undone.", pending.ids.len()),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            for id in pending.ids.iter().take(5) {
                if let Some(note) = state.collection().find(*id) {
                    let title = if note.is_locked && !state.session().is_unlocked() {
                        format!("🔒 {}", note.title)
                    } else {
                        note.title.clone()
                    };
                    lines.push(Line::from(format!("  • {title}")));
                }
            }
            if pending.ids.len() > 5 {
                lines.push(Line::from(format!("  … and {} more", pending.ids.len() - 5)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter confirm • Esc cancel",
                colors.muted,
            )));
            let paragraph = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title("Confirm Delete")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Red)),
                )
                .style(colors.base)
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::Attach(attach)) => {
            let area = centered_rect(60, 25, frame.size());
            frame.render_widget(Clear, area);
            let target = match attach.target {
                AttachTarget::Draft => "next new note".to_string(),
                AttachTarget::Note(id) => state
                    .collection()
                    .find(id)
                    .map(|note| note.title.clone())
                    .unwrap_or_else(|| id.short()),
            };
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(format!("Attach to {target}"), colors.muted)),
                Line::from(with_cursor(&attach.path, true)),
                Line::from(""),
                Line::from(Span::styled(
                    "Images become image attachments, anything else audio. Enter attach • Esc cancel",
                    colors.muted,
                )),
            ])
            .block(
                Block::default()
                    .title("Attach File")
                    .borders(Borders::ALL)
                    .border_style(colors.border),
            )
            .style(colors.base)
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::Help) => {
            let area = centered_rect(60, 80, frame.size());
            frame.render_widget(Clear, area);
            let keys = [
                ("j/k", "move"),
                ("Enter", "open note"),
                ("n", "new note (text or drawing)"),
                ("Ctrl-b/e/u", "bold, italic, underline in a note body"),
                ("/", "search titles"),
                ("s", "cycle sort order"),
                ("F", "favorites only"),
                ("f", "toggle favorite"),
                ("l", "lock or unlock note"),
                ("L", "lock or unlock session"),
                ("P", "change password"),
                ("Space / A", "select note / all visible"),
                ("D / d", "delete selected / current"),
                ("m", "switch text or handwriting"),
                ("t", "cycle template"),
                ("a / x", "attach file / drop last"),
                ("u r c", "undo, redo, clear canvas"),
                ("T", "toggle theme"),
                ("q", "quit"),
            ];
            let lines: Vec<Line> = keys
                .iter()
                .map(|(key, what)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{key:>10}  "),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(*what),
                    ])
                })
                .collect();
            let paragraph = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title("Keys")
                        .borders(Borders::ALL)
                        .border_style(colors.border),
                )
                .style(colors.base);
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

/// Half-block rendering of a canvas over its template background.
struct CanvasView<'a> {
    canvas: &'a Canvas,
    background: Color,
    guide: Color,
    template: Template,
}

impl<'a> CanvasView<'a> {
    fn new(canvas: &'a Canvas, template: Template, theme: ThemeName) -> Self {
        let (background, guide) = match (template, theme) {
            (Template::Chalkboard, _) => (Color::Rgb(34, 68, 51), Color::Rgb(34, 68, 51)),
            (_, ThemeName::Dark) => (Color::Rgb(30, 30, 30), Color::Rgb(70, 70, 90)),
            (_, ThemeName::Light) => (Color::Rgb(250, 250, 245), Color::Rgb(190, 205, 230)),
        };
        Self {
            canvas,
            background,
            guide,
            template,
        }
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        match self.canvas.pixel(x, y) {
            Some([r, g, b, a]) if a > 0 => Color::Rgb(r, g, b),
            _ => {
                let on_guide = match self.template {
                    Template::Lined => y % 8 == 7,
                    Template::Grid => y % 8 == 7 || x % 8 == 7,
                    Template::Basic | Template::Chalkboard => false,
                };
                if on_guide {
                    self.guide
                } else {
                    self.background
                }
            }
        }
    }
}

impl Widget for CanvasView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for column in 0..area.width {
                let x = u32::from(column);
                let y = u32::from(row) * 2;
                buf.get_mut(area.x + column, area.y + row)
                    .set_char('▀')
                    .set_fg(self.color_at(x, y))
                    .set_bg(self.color_at(x, y + 1));
            }
        }
    }
}

fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

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
    use crate::drawing::INK_BLACK;

    #[test]
    fn canvas_points_map_cells_to_upper_half_pixels() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 100, 40));
        let canvas = layout.canvas();
        assert_eq!(layout.canvas_size(), (u32::from(canvas.width), u32::from(canvas.height) * 2));
        assert_eq!(layout.canvas_point(canvas.x, canvas.y), Some((0, 0)));
        assert_eq!(layout.canvas_point(canvas.x + 3, canvas.y + 2), Some((3, 4)));
        assert_eq!(layout.canvas_point(0, 0), None);
    }

    #[test]
    fn canvas_view_paints_ink_over_template() {
        let mut canvas = Canvas::new(4, 4);
        canvas.stroke((0, 0), (0, 0), INK_BLACK);
        let area = Rect::new(0, 0, 4, 2);
        let mut buffer = Buffer::empty(area);
        CanvasView::new(&canvas, Template::Basic, ThemeName::Light).render(area, &mut buffer);
        let cell = buffer.get(0, 0);
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(0, 0, 0));
        assert_eq!(buffer.get(3, 1).bg, Color::Rgb(250, 250, 245));
    }

    #[test]
    fn formatted_lines_carry_modifiers() {
        let lines = formatted_lines("<b>milk</b> and <i>eggs</i><br><u>now</u>");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 3);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[0].spans[1].content, " and ");
        assert!(lines[0].spans[2].style.add_modifier.contains(Modifier::ITALIC));
        assert!(lines[1].spans[0].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn cursor_marker_lands_at_insertion_point() {
        let mut buffer = TextBuffer::single_line("abc");
        buffer.move_left();
        assert_eq!(with_cursor(&buffer, true), "ab▌c");
        assert_eq!(with_cursor(&buffer, false), "abc");
    }
}
