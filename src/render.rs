use crate::audio::AudioPlayer;
use crate::canvas::PixelCanvas;
use crate::card::{wrap, ButtonId, Card, LineKind};
use crate::surface::Rgba;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

pub const BG: Rgba = Rgba::opaque(20, 10, 18);
pub const ROSE: Rgba = Rgba::opaque(244, 167, 185);
pub const GOLD: Rgba = Rgba::opaque(245, 208, 138);
pub const INK: Rgba = Rgba::opaque(238, 228, 234);
const PANEL: Rgba = Rgba::opaque(40, 22, 34);

/// Pixels fainter than this (0..255) leave their braille dot unset.
const INK_ALPHA: u8 = 16;

pub fn color(c: Rgba) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Cell {
    fn blank(bg: Color) -> Self {
        Self { ch: ' ', fg: bg, bg }
    }
}

pub struct CellBuffer {
    pub w: u16,
    pub h: u16,
    pub cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::blank(color(BG)); (w as usize) * (h as usize)],
        }
    }

    pub fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        if x < self.w && y < self.h {
            Some(self.cells[self.idx(x, y)])
        } else {
            None
        }
    }

    pub fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell::blank(bg));
    }

    /// Pulls every RGB colour toward `toward` by `t`, for the modal backdrop.
    pub fn dim(&mut self, toward: Rgba, t: f32) {
        let fade = |c: Color| match c {
            Color::Rgb { r, g, b } => color(Rgba::opaque(r, g, b).lerp(toward, t)),
            other => other,
        };
        for c in &mut self.cells {
            c.fg = fade(c.fg);
            c.bg = fade(c.bg);
        }
    }
}

pub struct Terminal {
    out: io::Stdout,
    pub cols: u16,
    pub rows: u16,
    prev: CellBuffer,
    pub cur: CellBuffer,
}

impl Terminal {
    pub fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            DisableMouseCapture,
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        // prev no longer matches the screen
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    // Dot mapping:
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Writes one braille character per cell wherever the canvas has ink. The
/// dot colour is the mean of the inked pixels, faded toward `bg` by their
/// mean alpha. Cells without ink are left alone.
pub fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, bg: Rgba) {
    for cy in 0..out.h as u32 {
        for cx in 0..out.w as u32 {
            let mut mask: u8 = 0;
            let mut sum = [0u32; 4];
            let mut ink = 0u32;

            for dy in 0..4 {
                for dx in 0..2 {
                    let p = canvas.pixel(cx * 2 + dx, cy * 4 + dy);
                    if p.a >= INK_ALPHA {
                        mask |= braille_bit(dx, dy);
                        sum[0] += p.r as u32;
                        sum[1] += p.g as u32;
                        sum[2] += p.b as u32;
                        sum[3] += p.a as u32;
                        ink += 1;
                    }
                }
            }
            if ink == 0 {
                continue;
            }

            let mean = Rgba::opaque(
                (sum[0] / ink) as u8,
                (sum[1] / ink) as u8,
                (sum[2] / ink) as u8,
            );
            let alpha = (sum[3] / ink) as f32 / 255.0;
            let fg = bg.lerp(mean, 0.35 + 0.65 * alpha);
            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            out.set(
                cx as u16,
                cy as u16,
                Cell {
                    ch,
                    fg: color(fg),
                    bg: color(bg),
                },
            );
        }
    }
}

pub fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn draw_centered(buf: &mut CellBuffer, y: u16, s: &str, fg: Color, bg: Color) {
    let len = s.chars().count() as u16;
    let x = buf.w.saturating_sub(len) / 2;
    draw_text(buf, x, y, s, fg, bg);
}

/// The visible slice of the card text. Sections that have not been revealed
/// yet are skipped; revealed ones fade in from the background.
pub fn draw_card<A: AudioPlayer>(buf: &mut CellBuffer, card: &Card<A>, now: f64) {
    let lines = card.layout().lines();
    let top = card.scroll_row();
    for row in 0..buf.h {
        let Some(line) = lines.get(top + row as usize) else {
            break;
        };
        let progress = line
            .section
            .map_or(1.0, |s| card.reveal_progress(s, now));
        if progress <= 0.0 {
            continue;
        }
        let tint = |c: Rgba| color(BG.lerp(c, progress));
        match &line.kind {
            LineKind::Blank => {}
            LineKind::Title => draw_centered(buf, row, &line.text, tint(ROSE), color(BG)),
            LineKind::Subtitle => draw_centered(buf, row, &line.text, tint(GOLD), color(BG)),
            LineKind::Heading => draw_centered(buf, row, &line.text, tint(ROSE), color(BG)),
            LineKind::Body => draw_centered(buf, row, &line.text, tint(INK), color(BG)),
            LineKind::Buttons(ids) => draw_buttons(buf, row, card, ids, progress),
        }
    }
}

const BUTTON_GAP: u16 = 4;

/// Start column and label of each button in a row `width` cells wide.
pub(crate) fn button_spans<A: AudioPlayer>(
    width: u16,
    card: &Card<A>,
    ids: &[ButtonId],
) -> Vec<(u16, String, ButtonId)> {
    let labels: Vec<String> = ids
        .iter()
        .map(|&id| format!(" [{}] {} ", id.key_hint(), card.button_label(id)))
        .collect();
    let total: u16 = labels.iter().map(|l| l.chars().count() as u16).sum::<u16>()
        + BUTTON_GAP * (labels.len().saturating_sub(1) as u16);
    let mut x = width.saturating_sub(total) / 2;
    let mut out = Vec::with_capacity(ids.len());
    for (label, &id) in labels.into_iter().zip(ids) {
        let next = x.saturating_add(label.chars().count() as u16 + BUTTON_GAP);
        out.push((x, label, id));
        x = next;
    }
    out
}

/// The button drawn under a screen cell, if any. Rows of sections that are
/// not revealed yet have no buttons.
pub fn button_at<A: AudioPlayer>(card: &Card<A>, col: u16, row: u16) -> Option<ButtonId> {
    let (cols, rows) = card.viewport();
    if row >= rows {
        return None;
    }
    let line = card.layout().lines().get(card.scroll_row() + row as usize)?;
    if line.section.is_some_and(|s| !card.is_revealed(s)) {
        return None;
    }
    let LineKind::Buttons(ids) = &line.kind else {
        return None;
    };
    button_spans(cols, card, ids)
        .into_iter()
        .find(|(x, label, _)| col >= *x && col < x.saturating_add(label.chars().count() as u16))
        .map(|(_, _, id)| id)
}

fn draw_buttons<A: AudioPlayer>(
    buf: &mut CellBuffer,
    row: u16,
    card: &Card<A>,
    ids: &[ButtonId],
    progress: f32,
) {
    let fg = color(BG.lerp(INK, progress));
    let bg = color(BG.lerp(PANEL, progress));
    for (x, label, _) in button_spans(buf.w, card, ids) {
        draw_text(buf, x, row, &label, fg, bg);
    }
}

/// Cell rectangle `(x, y, w, h)` of the modal box for a viewport.
pub fn modal_rect(cols: u16, rows: u16) -> (u16, u16, u16, u16) {
    let w = 60.min(cols.saturating_sub(4)).max(1);
    let h = 14.min(rows.saturating_sub(2)).max(1);
    ((cols - w.min(cols)) / 2, (rows - h.min(rows)) / 2, w, h)
}

pub fn draw_modal<A: AudioPlayer>(buf: &mut CellBuffer, card: &Card<A>) {
    buf.dim(BG, 0.6);

    let (x0, y0, bw, bh) = modal_rect(buf.w, buf.h);
    let fg = color(ROSE);
    let bg = color(PANEL);
    let edge = |buf: &mut CellBuffer, x: u16, y: u16, ch: char| buf.set(x, y, Cell { ch, fg, bg });

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            buf.set(x, y, Cell::blank(bg));
        }
    }
    for x in x0..x0 + bw {
        edge(buf, x, y0, '─');
        edge(buf, x, y0 + bh - 1, '─');
    }
    for y in y0..y0 + bh {
        edge(buf, x0, y, '│');
        edge(buf, x0 + bw - 1, y, '│');
    }
    edge(buf, x0, y0, '┌');
    edge(buf, x0 + bw - 1, y0, '┐');
    edge(buf, x0, y0 + bh - 1, '└');
    edge(buf, x0 + bw - 1, y0 + bh - 1, '┘');

    let content = card.content();
    draw_text(buf, x0 + 2, y0 + 1, &content.promise_title, color(GOLD), bg);
    let mut y = y0 + 3;
    for line in wrap(&content.promise, bw.saturating_sub(4) as usize) {
        if y + 2 >= y0 + bh {
            break;
        }
        draw_text(buf, x0 + 2, y, &line, color(INK), bg);
        y += 1;
    }
    let hint = format!("[Esc] close   [M] {}", card.music().label());
    draw_text(buf, x0 + 2, y0 + bh.saturating_sub(2), &hint, color(ROSE), bg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioError, AudioPlayer};
    use crate::card::CardAction;
    use crate::config::CardContent;
    use crate::surface::Surface;

    struct Mute;

    impl AudioPlayer for Mute {
        fn play(&mut self) -> Result<(), AudioError> {
            Err(AudioError::NoTrack)
        }
        fn pause(&mut self) {}
    }

    fn row_text(buf: &CellBuffer, y: u16) -> String {
        (0..buf.w).filter_map(|x| buf.get(x, y)).map(|c| c.ch).collect()
    }

    #[test]
    fn braille_bits_follow_ink() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.set_fill_color(ROSE);
        canvas.begin_path();
        canvas.move_to(0.0, 0.0);
        canvas.bezier_curve_to(1.0, 0.0, 1.0, 0.0, 1.0, 0.0);
        canvas.bezier_curve_to(1.0, 4.0, 1.0, 4.0, 1.0, 4.0);
        canvas.bezier_curve_to(0.0, 4.0, 0.0, 4.0, 0.0, 4.0);
        canvas.close_path();
        canvas.fill();

        let mut buf = CellBuffer::new(2, 1);
        canvas_to_cells(&canvas, &mut buf, BG);
        // left column of the first cell: dots 1, 2, 3, 7
        assert_eq!(buf.get(0, 0).map(|c| c.ch), Some('\u{2847}'));
        assert_eq!(buf.get(1, 0).map(|c| c.ch), Some(' '));
    }

    #[test]
    fn sections_fade_in_after_reveal() {
        let mut card = Card::new(CardContent::default(), Mute, 80, 24);
        card.apply(CardAction::Reveal);
        let mut t = 0.0;
        while !card.is_revealed(0) {
            t += 16.0;
            card.tick(t);
        }
        let has_heading = |buf: &CellBuffer| (0..24).any(|y| row_text(buf, y).contains("The first hello"));

        let mut buf = CellBuffer::new(80, 24);
        draw_card(&mut buf, &card, t);
        assert!(!has_heading(&buf));

        let mut buf = CellBuffer::new(80, 24);
        draw_card(&mut buf, &card, t + 10_000.0);
        assert!(has_heading(&buf));
    }

    #[test]
    fn hero_shows_title_and_buttons() {
        let card = Card::new(CardContent::default(), Mute, 80, 24);
        let mut buf = CellBuffer::new(80, 24);
        draw_card(&mut buf, &card, 0.0);
        let all: Vec<String> = (0..24).map(|y| row_text(&buf, y)).collect();
        assert!(all.iter().any(|r| r.contains("For You, With Love")));
        assert!(all
            .iter()
            .any(|r| r.contains("[Enter] Reveal our story") && r.contains("[M] Play Our Moment")));
    }

    #[test]
    fn clicks_land_on_drawn_buttons() {
        let card = Card::new(CardContent::default(), Mute, 80, 24);
        let mut buf = CellBuffer::new(80, 24);
        draw_card(&mut buf, &card, 0.0);
        let row = (0..24u16)
            .find(|&y| row_text(&buf, y).contains("[M] Play Our Moment"))
            .unwrap();
        let text = row_text(&buf, row);
        let col = text.chars().position(|c| c == 'M').unwrap() as u16;
        assert_eq!(button_at(&card, col, row), Some(ButtonId::Music));
        let col = text.chars().position(|c| c == 'E').unwrap() as u16;
        assert_eq!(button_at(&card, col, row), Some(ButtonId::Reveal));
        assert_eq!(button_at(&card, 0, row), None);
        assert_eq!(button_at(&card, col, 0), None);
    }

    #[test]
    fn closing_buttons_are_clickable_once_scrolled_in() {
        let mut card = Card::new(CardContent::default(), Mute, 80, 24);
        let last = card.layout().section_count() - 1;
        let ids = [ButtonId::Promise, ButtonId::Yes];
        let doc_row = card
            .layout()
            .lines()
            .iter()
            .position(|l| l.kind == LineKind::Buttons(ids.to_vec()))
            .unwrap();
        card.apply(CardAction::Scroll(i32::MAX / 2));
        let mut t = 0.0;
        while card.scroll_row() + 24 <= doc_row || !card.is_revealed(last) {
            t += 16.0;
            card.tick(t);
        }
        let (x, _, _) = button_spans(80, &card, &ids)[1];
        let row = (doc_row - card.scroll_row()) as u16;
        assert_eq!(button_at(&card, x + 1, row), Some(ButtonId::Yes));
    }

    #[test]
    fn modal_draws_promise_inside_box() {
        let mut card = Card::new(CardContent::default(), Mute, 80, 24);
        card.apply(CardAction::OpenPromise);
        let mut buf = CellBuffer::new(80, 24);
        draw_modal(&mut buf, &card);
        let (x0, y0, w, h) = modal_rect(80, 24);
        assert_eq!(buf.get(x0, y0).map(|c| c.ch), Some('┌'));
        assert_eq!(buf.get(x0 + w - 1, y0 + h - 1).map(|c| c.ch), Some('┘'));
        assert!(row_text(&buf, y0 + 1).contains("A promise"));
    }
}
