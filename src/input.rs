use crate::audio::AudioPlayer;
use crate::card::{Card, CardAction};
use crate::render::{button_at, modal_rect};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::time::Duration;

const WHEEL_ROWS: i32 = 3;
const PAGE_ROWS: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key { key: KeyCode, mods: KeyModifiers },
    Click { col: u16, row: u16 },
    Wheel(i32),
}

pub fn collect_input_nonblocking() -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    while event::poll(Duration::ZERO)? {
        match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
                out.push(InputEvent::Key {
                    key: k.code,
                    mods: k.modifiers,
                });
            }
            Event::Mouse(m) => match m.kind {
                MouseEventKind::Down(MouseButton::Left) => out.push(InputEvent::Click {
                    col: m.column,
                    row: m.row,
                }),
                MouseEventKind::ScrollUp => out.push(InputEvent::Wheel(-WHEEL_ROWS)),
                MouseEventKind::ScrollDown => out.push(InputEvent::Wheel(WHEEL_ROWS)),
                _ => {}
            },
            // size is polled once per frame
            _ => {}
        }
        if out.len() >= 32 {
            break;
        }
    }
    Ok(out)
}

pub fn map_event_to_action<A: AudioPlayer>(ev: InputEvent, card: &Card<A>) -> Option<CardAction> {
    let modal_open = card.modal().is_open();
    match ev {
        InputEvent::Wheel(rows) => Some(CardAction::Scroll(rows)),
        InputEvent::Click { col, row } => {
            if !modal_open {
                return button_at(card, col, row).map(|b| b.action());
            }
            let (cols, rows) = card.viewport();
            let (x, y, w, h) = modal_rect(cols, rows);
            let inside = col >= x && col < x + w && row >= y && row < y + h;
            // a click on the backdrop dismisses
            (!inside).then_some(CardAction::CloseModal)
        }
        InputEvent::Key { key, mods } => {
            if key == KeyCode::Char('c') && mods.contains(KeyModifiers::CONTROL) {
                return Some(CardAction::Quit);
            }
            match key {
                KeyCode::Char('q') | KeyCode::Char('Q') => Some(CardAction::Quit),
                KeyCode::Esc if modal_open => Some(CardAction::CloseModal),
                KeyCode::Esc => Some(CardAction::Quit),
                KeyCode::Char('x') | KeyCode::Char('X') => Some(CardAction::CloseModal),
                KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => {
                    Some(CardAction::Reveal)
                }
                KeyCode::Char('p') | KeyCode::Char('P') => Some(CardAction::OpenPromise),
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(CardAction::Yes),
                KeyCode::Char('m') | KeyCode::Char('M') => Some(CardAction::ToggleMusic),
                KeyCode::Up | KeyCode::Char('k') => Some(CardAction::Scroll(-1)),
                KeyCode::Down | KeyCode::Char('j') => Some(CardAction::Scroll(1)),
                KeyCode::PageUp => Some(CardAction::Scroll(-PAGE_ROWS)),
                KeyCode::PageDown | KeyCode::Char(' ') => Some(CardAction::Scroll(PAGE_ROWS)),
                KeyCode::Home => Some(CardAction::Scroll(i32::MIN / 2)),
                KeyCode::End => Some(CardAction::Scroll(i32::MAX / 2)),
                _ => None,
            }
        }
    }
}
