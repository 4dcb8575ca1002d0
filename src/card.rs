//! Everything on the card that isn't a particle: the scrolling text, the
//! buttons, the promise modal, the music toggle and scroll reveal.
//!
//! None of this touches the particle fields directly. The one coupling, the
//! "yes" button bursting hearts, comes back out of [`Card::apply`] as an
//! [`Effect`] for the caller to act on.

use crate::audio::AudioPlayer;
use crate::config::CardContent;

/// Fraction of a section that has to be on screen before it is revealed.
pub const REVEAL_THRESHOLD: f32 = 0.2;
pub const REVEAL_FADE_MS: f64 = 600.0;
/// Share of the remaining distance covered per frame by the smooth scroll.
const SCROLL_EASE: f32 = 0.2;
const MAX_TEXT_WIDTH: usize = 72;

pub const YES_LABEL: &str = "Yes";
pub const YES_LABEL_ANSWERED: &str = "Forever Yes";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonId {
    Reveal,
    Music,
    Promise,
    Yes,
}

impl ButtonId {
    /// What pressing or clicking the button does.
    pub fn action(self) -> CardAction {
        match self {
            ButtonId::Reveal => CardAction::Reveal,
            ButtonId::Music => CardAction::ToggleMusic,
            ButtonId::Promise => CardAction::OpenPromise,
            ButtonId::Yes => CardAction::Yes,
        }
    }

    pub fn key_hint(self) -> &'static str {
        match self {
            ButtonId::Reveal => "Enter",
            ButtonId::Music => "M",
            ButtonId::Promise => "P",
            ButtonId::Yes => "Y",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardAction {
    Reveal,
    Scroll(i32),
    OpenPromise,
    CloseModal,
    Yes,
    ToggleMusic,
    Quit,
}

/// Side effects the card asks its owner to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    BurstHearts,
    Quit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modal {
    open: bool,
}

impl Modal {
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn aria_hidden(&self) -> &'static str {
        if self.open {
            "false"
        } else {
            "true"
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MusicState {
    Idle,
    Playing,
    /// The player refused to start; the next toggle tries again.
    Blocked,
}

pub struct MusicToggle<A> {
    player: A,
    state: MusicState,
}

impl<A: AudioPlayer> MusicToggle<A> {
    pub fn new(player: A) -> Self {
        Self {
            player,
            state: MusicState::Idle,
        }
    }

    pub fn toggle(&mut self) {
        if self.state == MusicState::Playing {
            self.player.pause();
            self.state = MusicState::Idle;
            tracing::info!("music paused");
            return;
        }
        match self.player.play() {
            Ok(()) => {
                self.state = MusicState::Playing;
                tracing::info!("music playing");
            }
            Err(e) => {
                self.state = MusicState::Blocked;
                tracing::warn!(error = %e, "music could not start");
            }
        }
    }

    pub fn state(&self) -> MusicState {
        self.state
    }

    pub fn label(&self) -> &'static str {
        match self.state {
            MusicState::Idle => "Play Our Moment",
            MusicState::Playing => "Pause Our Moment",
            MusicState::Blocked => "Tap Again to Play",
        }
    }

    pub fn aria_pressed(&self) -> &'static str {
        if self.state == MusicState::Playing {
            "true"
        } else {
            "false"
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Title,
    Subtitle,
    Heading,
    Body,
    Buttons(Vec<ButtonId>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    pub text: String,
    /// Reveal section this line belongs to, if any.
    pub section: Option<usize>,
}

impl Line {
    fn blank() -> Self {
        Self::new(LineKind::Blank, "", None)
    }

    fn new(kind: LineKind, text: &str, section: Option<usize>) -> Self {
        Self {
            kind,
            text: text.to_string(),
            section,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

/// The card as rows of text for a given viewport.
#[derive(Clone, Debug)]
pub struct Layout {
    lines: Vec<Line>,
    story_top: usize,
    sections: Vec<Span>,
}

impl Layout {
    pub fn build(content: &CardContent, cols: u16, rows: u16) -> Self {
        let width = (cols as usize).saturating_sub(8).clamp(16, MAX_TEXT_WIDTH);
        let rows = rows.max(1) as usize;
        let mut lines = Vec::new();

        // hero fills the first screen
        while lines.len() < rows / 3 {
            lines.push(Line::blank());
        }
        lines.push(Line::new(LineKind::Title, &content.title, None));
        lines.push(Line::blank());
        lines.push(Line::new(LineKind::Subtitle, &content.subtitle, None));
        lines.push(Line::blank());
        lines.push(Line::blank());
        lines.push(Line::new(
            LineKind::Buttons(vec![ButtonId::Reveal, ButtonId::Music]),
            "",
            None,
        ));
        while lines.len() < rows {
            lines.push(Line::blank());
        }

        let story_top = lines.len();
        let mut sections = Vec::new();
        for (i, s) in content.story.iter().enumerate() {
            let start = lines.len();
            lines.push(Line::new(LineKind::Heading, &s.heading, Some(i)));
            lines.push(Line::new(LineKind::Blank, "", Some(i)));
            for w in wrap(&s.body, width) {
                lines.push(Line::new(LineKind::Body, &w, Some(i)));
            }
            sections.push(Span {
                start,
                len: lines.len() - start,
            });
            lines.push(Line::blank());
            lines.push(Line::blank());
        }

        let last = content.story.len();
        let start = lines.len();
        for w in wrap(&content.question, width) {
            lines.push(Line::new(LineKind::Body, &w, Some(last)));
        }
        lines.push(Line::new(LineKind::Blank, "", Some(last)));
        lines.push(Line::new(
            LineKind::Buttons(vec![ButtonId::Promise, ButtonId::Yes]),
            "",
            Some(last),
        ));
        lines.push(Line::new(LineKind::Blank, "", Some(last)));
        lines.push(Line::new(LineKind::Subtitle, &content.closing, Some(last)));
        sections.push(Span {
            start,
            len: lines.len() - start,
        });
        for _ in 0..rows / 3 {
            lines.push(Line::blank());
        }

        Self {
            lines,
            story_top,
            sections,
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn story_top(&self) -> usize {
        self.story_top
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            out.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        let needed = if cur.is_empty() {
            word.chars().count()
        } else {
            cur.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(&word);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

pub struct Card<A> {
    content: CardContent,
    cols: u16,
    rows: u16,
    layout: Layout,
    scroll: f32,
    scroll_target: f32,
    revealed_at: Vec<Option<f64>>,
    modal: Modal,
    music: MusicToggle<A>,
    yes_label: &'static str,
}

impl<A: AudioPlayer> Card<A> {
    pub fn new(content: CardContent, player: A, cols: u16, rows: u16) -> Self {
        let layout = Layout::build(&content, cols, rows);
        let revealed_at = vec![None; layout.section_count()];
        Self {
            content,
            cols,
            rows,
            layout,
            scroll: 0.0,
            scroll_target: 0.0,
            revealed_at,
            modal: Modal::default(),
            music: MusicToggle::new(player),
            yes_label: YES_LABEL,
        }
    }

    /// Re-flows the text. Revealed sections stay revealed.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.layout = Layout::build(&self.content, cols, rows);
        self.revealed_at.resize(self.layout.section_count(), None);
        let max = self.max_scroll();
        self.scroll = self.scroll.min(max);
        self.scroll_target = self.scroll_target.min(max);
    }

    pub fn apply(&mut self, action: CardAction) -> Option<Effect> {
        // the open modal covers the page; only its own controls and global keys work
        if self.modal.is_open()
            && !matches!(
                action,
                CardAction::CloseModal | CardAction::ToggleMusic | CardAction::Quit
            )
        {
            return None;
        }
        match action {
            CardAction::Reveal => {
                self.scroll_target = (self.layout.story_top as f32).min(self.max_scroll());
                None
            }
            CardAction::Scroll(rows) => {
                self.scroll_target = (self.scroll_target + rows as f32).clamp(0.0, self.max_scroll());
                None
            }
            CardAction::OpenPromise => {
                self.set_modal(true);
                None
            }
            CardAction::CloseModal => {
                self.set_modal(false);
                None
            }
            CardAction::Yes => {
                self.yes_label = YES_LABEL_ANSWERED;
                self.set_modal(true);
                Some(Effect::BurstHearts)
            }
            CardAction::ToggleMusic => {
                self.music.toggle();
                None
            }
            CardAction::Quit => Some(Effect::Quit),
        }
    }

    fn set_modal(&mut self, open: bool) {
        let changed = self.modal.is_open() != open;
        self.modal.set_open(open);
        if changed {
            tracing::info!(aria_hidden = self.modal.aria_hidden(), "promise modal");
        }
    }

    /// Per-frame housekeeping: eases the scroll and reveals sections that came
    /// into view.
    pub fn tick(&mut self, now: f64) {
        let diff = self.scroll_target - self.scroll;
        if diff.abs() < 0.05 {
            self.scroll = self.scroll_target;
        } else {
            self.scroll += diff * SCROLL_EASE;
        }

        let top = self.scroll;
        let bottom = top + self.rows as f32;
        for (i, span) in self.layout.sections.iter().enumerate() {
            if self.revealed_at[i].is_some() || span.len == 0 {
                continue;
            }
            let s0 = span.start as f32;
            let s1 = (span.start + span.len) as f32;
            let overlap = (bottom.min(s1) - top.max(s0)).max(0.0);
            if overlap / span.len as f32 >= REVEAL_THRESHOLD {
                self.revealed_at[i] = Some(now);
                tracing::debug!(section = i, "section revealed");
            }
        }
    }

    pub fn max_scroll(&self) -> f32 {
        self.layout.lines.len().saturating_sub(self.rows as usize) as f32
    }

    /// First document row on screen.
    pub fn scroll_row(&self) -> usize {
        self.scroll.round().max(0.0) as usize
    }

    pub fn is_revealed(&self, section: usize) -> bool {
        self.revealed_at.get(section).copied().flatten().is_some()
    }

    /// 0 while hidden, rising to 1 over [`REVEAL_FADE_MS`] once revealed.
    pub fn reveal_progress(&self, section: usize, now: f64) -> f32 {
        match self.revealed_at.get(section).copied().flatten() {
            Some(at) => ((now - at) / REVEAL_FADE_MS).clamp(0.0, 1.0) as f32,
            None => 0.0,
        }
    }

    pub fn button_label(&self, button: ButtonId) -> &str {
        match button {
            ButtonId::Reveal => "Reveal our story",
            ButtonId::Music => self.music.label(),
            ButtonId::Promise => "Read my promise",
            ButtonId::Yes => self.yes_label,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn content(&self) -> &CardContent {
        &self.content
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn music(&self) -> &MusicToggle<A> {
        &self.music
    }

    pub fn viewport(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }
}
