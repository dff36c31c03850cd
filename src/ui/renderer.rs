/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Glyph)
///   2. Compare each glyph with `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout (rows):
///   0        HUD: clock, score, inventory, sound
///   2        column labels 0..9
///   3..=12   the 10×10 dungeon, row labels A..J
///   14       message bar
///   15       game-over / victory banner
///   17       key help
///
/// The dungeon is dark: only the player's cell (and a slain dragon) is
/// drawn until the game ends, then everything is revealed.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::topology::{Cell, Direction, GRID_SIZE, ROW_LABELS};
use crate::sim::session::format_clock;
use crate::sim::world::{Mode, Snapshot};

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: [u8; 8],   // one UTF-8 scalar (emoji fit in 4 bytes)
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Glyph {
    /// Explicit dark background for every "empty" terminal cell, so the
    /// inter-row gap matches on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 12, g: 12, b: 18 };

    const BLANK: Glyph = Glyph {
        ch: [b' ', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Glyph::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Glyph = Glyph {
        ch: [0; 8],
        ch_len: 0,
        fg: Color::White,
        bg: Glyph::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel used to invalidate the back buffer.
    /// Different from any real glyph, so every position will be diff'd.
    const INVALID: Glyph = Glyph {
        ch: [b'?', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every glyph gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut g = Self::BLANK;
        g.ch = [0; 8];
        g.ch_len = c.encode_utf8(&mut g.ch).len() as u8;
        g.fg = fg;
        g.bg = Self::norm_bg(bg);
        g
    }

    fn from_char_wide(c: char, bg: Color) -> Self {
        let mut g = Self::from_char(c, Color::Reset, bg);
        g.wide = true;
        g
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Glyph::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::from_char(ch, fg, bg));
        }
    }

    /// Paint a whole row with `bg`, then write `s` from the left edge.
    fn band(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Glyph::from_char(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

// ── Frame: what one render call draws ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SoundStatus {
    On,
    Muted,
    /// No audio device, or built without the sound feature.
    Unavailable,
}

pub struct Frame<'a> {
    pub snap: &'a Snapshot,
    pub message: &'a str,
    pub sound: SoundStatus,
    pub gamepad: bool,
    pub help: bool,
}

// ── Renderer ──

/// Each dungeon cell = 3 terminal columns, glyph in the middle.
const CELL_W: usize = 3;
/// Row-label gutter ("A  ").
const GUTTER: usize = 3;

const HUD_ROW: usize = 0;
const HEADER_ROW: usize = 2;
const GRID_ROW: usize = 3;
const MSG_ROW: usize = GRID_ROW + GRID_SIZE + 1;
const BANNER_ROW: usize = MSG_ROW + 1;
const HELP_ROW: usize = BANNER_ROW + 2;

const MIN_W: usize = GUTTER + GRID_SIZE * CELL_W + 2;
const MIN_H: usize = HELP_ROW + 1;

const HUD_BG: Color = Color::Rgb { r: 20, g: 40, b: 20 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const FLOOR_FG: Color = Color::Rgb { r: 60, g: 90, b: 60 };
const LABEL_FG: Color = Color::Rgb { r: 0, g: 160, b: 0 };
const PLAYER_BG: Color = Color::Rgb { r: 0, g: 90, b: 0 };
const AIM_BG: Color = Color::Rgb { r: 120, g: 20, b: 20 };
const SLAIN_BG: Color = Color::Rgb { r: 70, g: 0, b: 0 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    /// Full clear whenever this changes (wide glyphs leave debris otherwise).
    last_scene: Option<(Mode, bool)>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_scene: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, frame: &Frame) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        let scene = (frame.snap.mode, frame.help);
        if self.last_scene != Some(scene) {
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
            self.last_scene = Some(scene);
        }

        self.compose(frame);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every glyph.
        self.back.cells.fill(Glyph::INVALID);
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, never ResetColor (terminal default may differ).
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Glyph::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let g = self.front.get(x, y);
                let prev = self.back.get(x, y);

                // Skip continuation glyphs (right half of wide emoji)
                if g.cont {
                    if g != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = g.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if g == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }

                queue!(self.writer, Print(g.as_str()))?;

                if g.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, frame: &Frame) {
        self.front.clear();

        if self.front.width < MIN_W || self.front.height < MIN_H {
            let note = format!("Terminal too small: need {MIN_W}x{MIN_H}");
            self.front.put_str(0, 0, &note, Color::Red, Color::Reset);
            return;
        }

        self.compose_hud(frame);
        self.compose_grid(frame.snap);
        self.compose_message(frame.message);
        self.compose_banner(frame.snap);
        self.compose_key_help(frame.snap);

        if frame.help {
            self.compose_help_overlay();
        }
    }

    fn compose_hud(&mut self, frame: &Frame) {
        let snap = frame.snap;
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        let arrow = if snap.player.has_arrow {
            "Yes"
        } else if snap.arrow.in_flight() {
            "Lost"
        } else {
            "No"
        };
        let sound = match frame.sound {
            SoundStatus::On => "On",
            SoundStatus::Muted => "Muted",
            SoundStatus::Unavailable => "n/a",
        };
        let pad = if frame.gamepad { "  │ Pad" } else { "" };
        let hud = format!(
            " DRAGON HUNT │ Time {:>5} │ Score {:<4} │ Arrow: {:<4} │ Rope: {:<3} │ Sound: {}{}",
            format_clock(snap.elapsed),
            snap.score,
            arrow,
            yes_no(snap.player.has_rope),
            sound,
            pad,
        );
        self.front.band(HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_grid(&mut self, snap: &Snapshot) {
        for x in 0..GRID_SIZE {
            let col = GUTTER + x * CELL_W + 1;
            self.front.put_str(col, HEADER_ROW, &x.to_string(), LABEL_FG, Color::Reset);
        }

        for y in 0..GRID_SIZE {
            let row = GRID_ROW + y;
            self.front.set(1, row, Glyph::from_char(ROW_LABELS[y], LABEL_FG, Color::Reset));
            for x in 0..GRID_SIZE {
                self.compose_cell(snap, Cell { x, y }, GUTTER + x * CELL_W, row);
            }
        }
    }

    /// Write the visual for dungeon cell `cell` at terminal (col, row).
    fn compose_cell(&mut self, snap: &Snapshot, cell: Cell, col: usize, row: usize) {
        let reveal = !snap.active();

        // Player on top of everything
        if snap.player.pos == cell && !matches!(snap.mode, Mode::Over(_)) {
            let bg = if snap.aiming() { AIM_BG } else { PLAYER_BG };
            let ch = match snap.player.facing {
                Direction::North => '▲',
                Direction::East => '▶',
                Direction::South => '▼',
                Direction::West => '◀',
            };
            self.narrow(col, row, ch, Color::White, bg);
            return;
        }

        if snap.dragon.pos == cell && (reveal || !snap.dragon.alive) {
            let bg = if snap.dragon.alive { Color::Reset } else { SLAIN_BG };
            self.wide(col, row, '🐉', bg);
            return;
        }

        if reveal {
            if snap.player.pos == cell {
                self.wide(col, row, '💀', Color::Reset);
                return;
            }
            if snap.bats.contains(&cell) {
                self.wide(col, row, '🦇', Color::Reset);
                return;
            }
            if snap.pits.contains(&cell) {
                self.narrow(col, row, '●', Color::DarkGrey, Color::Reset);
                return;
            }
            if snap.arrow.lies_at(cell) {
                self.narrow(col, row, '↟', Color::Yellow, Color::Reset);
                return;
            }
            if snap.rope.lies_at(cell) {
                self.narrow(col, row, '§', Color::Rgb { r: 180, g: 120, b: 60 }, Color::Reset);
                return;
            }
        }

        self.narrow(col, row, '·', FLOOR_FG, Color::Reset);
    }

    fn narrow(&mut self, col: usize, row: usize, ch: char, fg: Color, bg: Color) {
        self.front.set(col, row, Glyph::from_char(' ', fg, bg));
        self.front.set(col + 1, row, Glyph::from_char(ch, fg, bg));
        self.front.set(col + 2, row, Glyph::from_char(' ', fg, bg));
    }

    fn wide(&mut self, col: usize, row: usize, ch: char, bg: Color) {
        self.front.set(col, row, Glyph::from_char(' ', Color::White, bg));
        self.front.set(col + 1, row, Glyph::from_char_wide(ch, bg));
        self.front.set(col + 2, row, Glyph::WIDE_CONT);
    }

    fn compose_message(&mut self, message: &str) {
        if message.is_empty() { return; }
        let msg = format!(" ◈ {message} ");
        self.front.band(MSG_ROW, &msg, Color::Black, MSG_BG);
    }

    fn compose_banner(&mut self, snap: &Snapshot) {
        let (text, fg) = match snap.mode {
            Mode::Won => (
                format!(" ★ VICTORY in {} ★  N: play again", format_clock(snap.elapsed)),
                Color::Rgb { r: 255, g: 220, b: 50 },
            ),
            Mode::Over(_) => (
                " ✕ GAME OVER ✕  N: new game".to_string(),
                Color::Rgb { r: 255, g: 60, b: 60 },
            ),
            Mode::Aiming => (
                " AIMING: pick a direction, Esc to cancel".to_string(),
                Color::Rgb { r: 255, g: 120, b: 120 },
            ),
            Mode::Exploring => return,
        };
        self.front.put_str(0, BANNER_ROW, &text, fg, Color::Reset);
    }

    fn compose_key_help(&mut self, snap: &Snapshot) {
        let help = if snap.aiming() {
            " ←→↑↓/WASD Fire  Esc Cancel  M Mute  H Help  Q Quit"
        } else {
            " ←→↑↓/WASD Move  Space Shoot  N New  M Mute  H Help  Q Quit"
        };
        self.front.put_str(0, HELP_ROW, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_help_overlay(&mut self) {
        let bg = Color::Rgb { r: 30, g: 30, b: 40 };
        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let body = Color::Rgb { r: 200, g: 200, b: 200 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };

        let lines: [(&str, Color); 15] = [
            ("HOW TO PLAY", hdr),
            ("", body),
            ("Find the magical arrow, then slay the dragon.", body),
            ("The dungeon wraps around at every edge.", body),
            ("A breeze means a pit is next to you.", body),
            ("Flapping wings mean a bat is next to you.", body),
            ("A roar means the dragon is next to you.", body),
            ("A rope saves you from one pit.", body),
            ("Bats carry you off to a random room.", body),
            ("Your arrow flies the whole row or column.", body),
            ("Miss, and the dragon wakes and moves.", body),
            ("Score: seconds taken / 5.", body),
            ("", body),
            ("Space: aim   then a direction: fire", key_c),
            ("Esc / H: close", key_c),
        ];

        let box_w = 50_usize.min(self.front.width);
        let box_h = lines.len() + 2;
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = GRID_ROW.saturating_sub(1);

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Glyph::from_char(' ', body, bg));
            }
        }
        for (i, (text, fg)) in lines.iter().enumerate() {
            self.front.put_str(box_x + 2, box_y + 1 + i, text, *fg, bg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rules;
    use crate::sim::generator::Layout;
    use crate::sim::world::{Death, World};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn world() -> World {
        let layout = Layout {
            dragon: Cell { x: 5, y: 5 },
            arrow: Cell { x: 8, y: 8 },
            rope: Cell { x: 7, y: 7 },
            pits: vec![Cell { x: 3, y: 3 }],
            bats: vec![Cell { x: 6, y: 2 }],
        };
        World::from_layout(layout, Rules::default(), StdRng::seed_from_u64(1))
    }

    fn composed(snap: &Snapshot, message: &str, help: bool) -> Renderer {
        let mut r = Renderer::new();
        r.resize(80, 24);
        let frame = Frame { snap, message, sound: SoundStatus::Muted, gamepad: false, help };
        r.compose(&frame);
        r
    }

    fn row_text(r: &Renderer, y: usize) -> String {
        (0..r.front.width)
            .map(|x| r.front.get(x, y))
            .filter(|g| !g.cont)
            .map(|g| g.as_str().to_string())
            .collect()
    }

    fn glyph_at(r: &Renderer, cell: Cell) -> String {
        r.front.get(GUTTER + cell.x * CELL_W + 1, GRID_ROW + cell.y).as_str().to_string()
    }

    #[test]
    fn hud_and_message() {
        let w = world();
        let snap = w.snapshot();
        let r = composed(&snap, w.message(), false);
        let hud = row_text(&r, HUD_ROW);
        assert!(hud.contains("Arrow: No "));
        assert!(hud.contains("Sound: Muted"));
        assert!(row_text(&r, MSG_ROW).contains("Find the magical arrow"));
        assert!(row_text(&r, GRID_ROW).starts_with(" A "));
    }

    #[test]
    fn hud_reports_a_landed_arrow() {
        let mut w = world();
        w.arrow.land(Cell { x: 4, y: 0 });
        let snap = w.snapshot();
        let r = composed(&snap, "", false);
        assert!(row_text(&r, HUD_ROW).contains("Arrow: Lost"));
    }

    #[test]
    fn dungeon_stays_dark_while_playing() {
        let w = world();
        let snap = w.snapshot();
        let r = composed(&snap, "", false);
        assert_eq!(glyph_at(&r, Cell::START), "▲");
        assert_eq!(glyph_at(&r, Cell { x: 5, y: 5 }), "·");
        assert_eq!(glyph_at(&r, Cell { x: 3, y: 3 }), "·");
    }

    #[test]
    fn game_over_reveals_everything() {
        let mut w = world();
        w.mode = Mode::Over(Death::Pit);
        let snap = w.snapshot();
        let r = composed(&snap, "", false);
        assert_eq!(glyph_at(&r, Cell { x: 5, y: 5 }), "🐉");
        assert_eq!(glyph_at(&r, Cell { x: 3, y: 3 }), "●");
        assert_eq!(glyph_at(&r, Cell { x: 6, y: 2 }), "🦇");
        assert_eq!(glyph_at(&r, Cell { x: 8, y: 8 }), "↟");
        assert!(row_text(&r, BANNER_ROW).contains("GAME OVER"));
    }

    #[test]
    fn help_overlay_draws_over_grid() {
        let w = world();
        let snap = w.snapshot();
        let r = composed(&snap, "", true);
        let text: String = (0..r.front.height).map(|y| row_text(&r, y)).collect();
        assert!(text.contains("HOW TO PLAY"));
    }

    #[test]
    fn tiny_terminal_gets_a_notice() {
        let w = world();
        let snap = w.snapshot();
        let mut r = Renderer::new();
        r.resize(20, 5);
        let frame = Frame { snap: &snap, message: "", sound: SoundStatus::On, gamepad: false, help: false };
        r.compose(&frame);
        assert!(row_text(&r, 0).starts_with("Terminal too small"));
    }
}
