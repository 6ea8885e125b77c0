//! Layout and drawing: board, HUD sidebar, start/pause/quit/level-end overlays.

use crate::app::{QuitOption, Screen};
use crate::game::Game;
use crate::level::{Level, LevelResult};
use crate::loops::Canvas;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

pub const SIDEBAR_WIDTH: u16 = 22;

/// Board size bounds in cells; the meerkat art is 7x4.
pub const MIN_BOARD_WIDTH: u16 = 16;
pub const MIN_BOARD_HEIGHT: u16 = 8;
pub const MAX_BOARD_WIDTH: u16 = 72;
pub const MAX_BOARD_HEIGHT: u16 = 26;

/// Board fade in/out (TachyonFX).
const FADE_MS: u32 = 350;

/// Largest board (cells) that fits the terminal next to the sidebar, capped at MAX.
/// Tiny terminals go below MIN so everything still fits.
pub fn board_size_for_terminal(term_cols: u16, term_rows: u16) -> (u16, u16) {
    let w = term_cols.saturating_sub(2 + SIDEBAR_WIDTH).min(MAX_BOARD_WIDTH).max(1);
    let h = term_rows.saturating_sub(2).min(MAX_BOARD_HEIGHT).max(1);
    (w, h)
}

/// True if the terminal is big enough for a comfortable board.
pub fn board_is_roomy(w: u16, h: u16) -> bool {
    w >= MIN_BOARD_WIDTH && h >= MIN_BOARD_HEIGHT
}

/// Board + border + sidebar, centered in `area`.
fn active_rect(area: Rect, board_w: u16, board_h: u16) -> Rect {
    let total_w = board_w + 2 + SIDEBAR_WIDTH;
    let total_h = board_h + 2;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    vert[1]
}

/// Outer board rect (with border) and sidebar rect.
fn split_active(area: Rect, board_w: u16, board_h: u16) -> (Rect, Rect) {
    let active = active_rect(area, board_w, board_h);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(board_w + 2),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(active);
    (inner[0], inner[1])
}

/// Inner board rect (no border): where board cell (0, 0) lands on screen.
pub fn board_rect(area: Rect, board_w: u16, board_h: u16) -> Rect {
    let (outer, _) = split_active(area, board_w, board_h);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: board_w.min(outer.width.saturating_sub(2)),
        height: board_h.min(outer.height.saturating_sub(2)),
    }
}

/// Engine canvas over a region of the frame buffer.
struct BufferCanvas<'a> {
    buf: &'a mut Buffer,
    area: Rect,
}

impl Canvas for BufferCanvas<'_> {
    fn width(&self) -> u16 {
        self.area.width
    }

    fn height(&self) -> u16 {
        self.area.height
    }

    fn put(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
            return;
        };
        if x >= self.area.width || y >= self.area.height {
            return;
        }
        if let Some(cell) = self.buf.cell_mut((self.area.x + x, self.area.y + y)) {
            cell.set_char(ch).set_fg(fg);
        }
    }

    fn fill(&mut self, bg: Color) {
        for y in self.area.top()..self.area.bottom() {
            for x in self.area.left()..self.area.right() {
                if let Some(cell) = self.buf.cell_mut((x, y)) {
                    cell.reset();
                    cell.set_bg(bg);
                }
            }
        }
    }
}

/// Fade the board in from the ground colour.
pub fn board_fade(theme: &Theme) -> Effect {
    fx::fade_from(theme.ground, theme.ground, (FADE_MS, Interpolation::Linear))
}

/// Everything the draw pass reads.
pub struct View<'a> {
    pub screen: Screen,
    pub game: &'a Game,
    pub theme: &'a Theme,
    pub best: Option<u32>,
    pub result: Option<&'a LevelResult>,
    pub new_best: bool,
    pub quit_selected: QuitOption,
}

/// Draw the current screen. When `fade` holds an effect it is processed over the board.
pub fn draw(
    frame: &mut Frame,
    view: &View,
    fade: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let board = view.game.board();
    let (board_outer, sidebar) = split_active(area, board.width, board.height);

    draw_board(frame, view, board_outer);
    draw_sidebar(frame, view, sidebar);
    apply_fade(frame, board_outer, fade, fade_process_time, now);

    match view.screen {
        Screen::StartLevel => draw_start_overlay(frame, view, board_outer),
        Screen::Playing => {
            if view.game.is_paused() {
                draw_pause_overlay(frame, view.theme, board_outer);
            }
        }
        Screen::QuitMenu => draw_quit_menu(frame, view.theme, view.quit_selected),
        Screen::LevelEnd => {
            if let Some(result) = view.result {
                draw_level_end(frame, view, result, board_outer);
            }
        }
    }
}

fn apply_fade(
    frame: &mut Frame,
    area: Rect,
    fade: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let Some(effect) = fade else {
        *fade_process_time = None;
        return;
    };
    let delta = fade_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *fade_process_time = Some(now);
    frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
}

fn draw_board(frame: &mut Frame, view: &View, outer: Rect) {
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.ground))
        .title(Span::styled(
            format!(" {} ", view.game.level().title()),
            Style::default().fg(theme.title),
        ));
    let inner = block.inner(outer);
    block.render(outer, frame.buffer_mut());
    let mut canvas = BufferCanvas {
        buf: frame.buffer_mut(),
        area: inner,
    };
    if view.game.is_stopped() {
        canvas.fill(theme.ground);
    } else {
        view.game.paint(&mut canvas);
    }
}

fn sidebar_section(frame: &mut Frame, theme: &Theme, area: Rect, title: &str) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    inner
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let game = view.game;
    let level = game.level();
    let fg_style = Style::default().fg(theme.main_fg);
    let title_style = Style::default().fg(theme.title);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Time (seconds + gauge)
            Constraint::Length(3), // To go
            Constraint::Length(7), // Stats
            Constraint::Fill(1),   // Keys
        ])
        .split(area);

    // --- Time ---
    let time_inner = sidebar_section(frame, theme, chunks[0], "Time");
    let time_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(time_inner);
    Paragraph::new(Line::from(Span::styled(
        format!("{} s", game.timer_text()),
        fg_style,
    )))
    .render(time_layout[0], frame.buffer_mut());
    let ratio = if level.time_limit_ms() > 0 {
        (game.remaining_ms() as f64 / level.time_limit_ms() as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let bar_color = if ratio > 0.5 {
        Color::Green
    } else if ratio > 0.2 {
        Color::Yellow
    } else {
        Color::Red
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(time_layout[1], frame.buffer_mut());

    // --- To go: remaining to target, or +N once beaten ---
    let score_text = game.score_text();
    let (label, style) = if score_text.starts_with('+') {
        (
            "Over target",
            Style::default()
                .fg(theme.over_target)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("To go", fg_style)
    };
    let togo_inner = sidebar_section(frame, theme, chunks[1], label);
    Paragraph::new(Line::from(Span::styled(score_text, style)))
        .render(togo_inner, frame.buffer_mut());

    // --- Stats ---
    let stats_inner = sidebar_section(frame, theme, chunks[2], "Stats");
    let best = view
        .best
        .map_or_else(|| "-".to_string(), |b| b.to_string());
    let (hits, misses) = (game.hits(), game.misses());
    let accuracy = if hits + misses == 0 {
        "-".to_string()
    } else {
        format!("{}%", hits * 100 / (hits + misses))
    };
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(format!("{} / {}", game.score(), level.target_score), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Missed: ", title_style),
            Span::styled(misses.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Up now: ", title_style),
            Span::styled(format!("{} / {}", game.board().occupied(), game.actor_count()), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Accuracy: ", title_style),
            Span::styled(accuracy, fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(best, fg_style),
        ]),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    // --- Keys ---
    let hint = Style::default().fg(theme.inactive_fg);
    let keys = vec![
        Line::from(Span::styled("Click a meerkat!", hint)),
        Line::from(Span::styled("P  pause", hint)),
        Line::from(Span::styled("Q  quit", hint)),
    ];
    Paragraph::new(Text::from(keys)).render(
        Rect {
            y: chunks[3].y + 1,
            height: chunks[3].height.saturating_sub(1),
            ..chunks[3]
        },
        frame.buffer_mut(),
    );
}

/// Centered popup inside `area`.
fn popup_rect(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn popup_block(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.ground))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)))
}

fn level_lines(level: &Level, theme: &Theme) -> Vec<Line<'static>> {
    let fg = Style::default().fg(theme.main_fg);
    vec![
        Line::from(Span::styled(
            format!(" Hit {} meerkats ", level.target_score),
            fg,
        )),
        Line::from(Span::styled(
            format!(" in {} seconds ", level.time_limit_secs),
            fg,
        )),
        Line::from(Span::styled(
            format!(" ({} on the board) ", level.actor_count),
            Style::default().fg(theme.inactive_fg),
        )),
    ]
}

fn draw_start_overlay(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let level = view.game.level();
    let popup = popup_rect(area, 30, 11);
    let mut lines = vec![Line::from("")];
    lines.extend(level_lines(level, theme));
    lines.push(Line::from(""));
    if !level.is_custom() {
        lines.push(Line::from(Span::styled(
            format!(" ← {} / {} → ", level.number, Level::count()),
            Style::default().fg(theme.title),
        )));
    }
    lines.push(Line::from(Span::styled(
        " Enter — Go    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme, &level.title()))
        .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.ground)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_level_end(frame: &mut Frame, view: &View, result: &LevelResult, area: Rect) {
    let theme = view.theme;
    let fg = Style::default().fg(theme.main_fg);
    let popup = popup_rect(area, 32, 13);
    let (title, title_style) = if result.passed() {
        (" Target beaten! ", Style::default().fg(Color::Black).bg(Color::Green))
    } else {
        (" Time's up! ", Style::default().fg(Color::White).bg(Color::Red))
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} / {} ", result.score, result.level.target_score),
            fg,
        )),
        Line::from(Span::styled(format!(" Missed: {} ", result.misses), fg)),
    ];
    if let Some(best) = view.best {
        lines.push(Line::from(Span::styled(format!(" Best: {best} "), fg)));
    }
    if view.new_best {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    let next = if result.passed() && result.level.next().is_some() {
        "N — Next    "
    } else {
        ""
    };
    lines.push(Line::from(Span::styled(format!(" {next}R — Retry "), fg)));
    lines.push(Line::from(Span::styled(" Enter — Levels    Q — Quit ", fg)));
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme, "Meerkat Challenge"))
        .render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let quit_rect = popup_rect(area, 24, 8);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    Clear.render(quit_rect, frame.buffer_mut());
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Levels, " Levels "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.ground)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_size_caps_and_shrinks() {
        assert_eq!(board_size_for_terminal(200, 60), (MAX_BOARD_WIDTH, MAX_BOARD_HEIGHT));
        assert_eq!(board_size_for_terminal(80, 24), (80 - 2 - SIDEBAR_WIDTH, 22));
        assert_eq!(board_size_for_terminal(10, 2), (1, 1));
        assert!(!board_is_roomy(10, 5));
        assert!(board_is_roomy(MIN_BOARD_WIDTH, MIN_BOARD_HEIGHT));
    }

    #[test]
    fn test_board_rect_is_inside_border() {
        let area = Rect::new(0, 0, 100, 30);
        let (w, h) = (40, 20);
        let board = board_rect(area, w, h);
        assert_eq!((board.width, board.height), (w, h));
        let total_w = w + 2 + SIDEBAR_WIDTH;
        assert_eq!(board.x, (100 - total_w) / 2 + 1);
        assert_eq!(board.y, (30 - (h + 2)) / 2 + 1);
    }

    #[test]
    fn test_buffer_canvas_clips_to_area() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 5));
        let mut canvas = BufferCanvas {
            buf: &mut buf,
            area: Rect::new(2, 1, 3, 2),
        };
        canvas.put(0, 0, 'a', Color::White);
        canvas.put(2, 1, 'b', Color::White);
        canvas.put(3, 0, 'x', Color::White);
        canvas.put(-1, 0, 'x', Color::White);
        assert_eq!(buf[(2u16, 1u16)].symbol(), "a");
        assert_eq!(buf[(4u16, 2u16)].symbol(), "b");
        assert_eq!(buf[(5u16, 1u16)].symbol(), " ");
        assert_eq!(buf[(1u16, 1u16)].symbol(), " ");
    }
}
