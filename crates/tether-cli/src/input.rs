//! Operator input.
//!
//! Two sources produce the same [`InputEvent`]s:
//!
//! - [`TerminalInput`]: raw mode plus crossterm's `EventStream`, feeding a
//!   [`LineEditor`]. Used when stdin and stdout are both terminals.
//! - [`PipedInput`]: newline-delimited lines from stdin.
//!
//! Both are cancel-safe: dropping a pending [`InputSource::next`] future
//! never loses a key or a line, so the runtime can race it in `select!`.

use std::{future::Future, io};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Operator input, independent of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A submitted line
    Line(String),
    /// The draft changed and the prompt row needs a redraw
    Edited,
    /// Ctrl-C
    Interrupt,
    /// End of input (Ctrl-D on an empty line, or stdin closed)
    Eof,
}

/// A source of operator input.
pub trait InputSource {
    /// Wait for the next event. Must be cancel-safe.
    fn next(&mut self) -> impl Future<Output = io::Result<InputEvent>>;

    /// Current draft and cursor (in chars), for sources that edit in place.
    fn draft(&self) -> Option<(&str, usize)> {
        None
    }
}

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home key or Ctrl-A.
    Home,
    /// End key or Ctrl-E.
    End,
    /// Ctrl-U.
    ClearLine,
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D.
    Eof,
}

/// Map a crossterm key press to editor input. Unbound keys map to `None`.
pub fn convert_key(key: KeyEvent) -> Option<KeyInput> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(KeyInput::Interrupt),
            KeyCode::Char('d') => Some(KeyInput::Eof),
            KeyCode::Char('u') => Some(KeyInput::ClearLine),
            KeyCode::Char('a') => Some(KeyInput::Home),
            KeyCode::Char('e') => Some(KeyInput::End),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Delete => Some(KeyInput::Delete),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Right => Some(KeyInput::Right),
        KeyCode::Home => Some(KeyInput::Home),
        KeyCode::End => Some(KeyInput::End),
        _ => None,
    }
}

/// Single-line editor.
///
/// Owns the draft buffer and cursor. The cursor counts chars, not bytes, so
/// multi-byte input edits correctly.
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: String,
    cursor: usize,
}

impl LineEditor {
    /// Create a new empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply one key. Returns `None` if nothing changed.
    pub fn handle_key(&mut self, key: KeyInput) -> Option<InputEvent> {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return None;
                }
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.buffer.remove(at);
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return None;
                }
                let at = self.byte_index(self.cursor);
                self.buffer.remove(at);
            },
            KeyInput::Left => {
                if self.cursor == 0 {
                    return None;
                }
                self.cursor -= 1;
            },
            KeyInput::Right => {
                if self.cursor >= self.len() {
                    return None;
                }
                self.cursor += 1;
            },
            KeyInput::Home => self.cursor = 0,
            KeyInput::End => self.cursor = self.len(),
            KeyInput::ClearLine => self.clear(),
            KeyInput::Enter => {
                let line = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                return Some(InputEvent::Line(line));
            },
            KeyInput::Interrupt => {
                self.clear();
                return Some(InputEvent::Interrupt);
            },
            KeyInput::Eof => {
                if self.buffer.is_empty() {
                    return Some(InputEvent::Eof);
                }
                return self.handle_key(KeyInput::Delete);
            },
        }
        Some(InputEvent::Edited)
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}

/// Raw mode for the lifetime of the guard.
#[derive(Debug)]
pub struct RawModeGuard(());

impl RawModeGuard {
    /// Enable raw mode.
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Interactive terminal input with line editing.
pub struct TerminalInput {
    events: EventStream,
    editor: LineEditor,
    _raw: RawModeGuard,
}

impl TerminalInput {
    /// Put the terminal in raw mode and start reading key events.
    pub fn new() -> io::Result<Self> {
        let raw = RawModeGuard::enable()?;
        Ok(Self { events: EventStream::new(), editor: LineEditor::new(), _raw: raw })
    }
}

impl InputSource for TerminalInput {
    async fn next(&mut self) -> io::Result<InputEvent> {
        loop {
            let Some(event) = self.events.next().await else {
                return Ok(InputEvent::Eof);
            };

            match event? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(event) = convert_key(key).and_then(|k| self.editor.handle_key(k)) {
                        return Ok(event);
                    }
                },
                Event::Resize(..) => return Ok(InputEvent::Edited),
                _ => {},
            }
        }
    }

    fn draft(&self) -> Option<(&str, usize)> {
        Some((self.editor.buffer(), self.editor.cursor()))
    }
}

/// Line input from a non-terminal reader (normally stdin).
pub struct PipedInput<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> PipedInput<R> {
    /// Read lines from `reader`.
    pub fn new(reader: R) -> Self {
        Self { lines: BufReader::new(reader).lines() }
    }
}

impl PipedInput<tokio::io::Stdin> {
    /// Read lines from stdin.
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin> InputSource for PipedInput<R> {
    async fn next(&mut self) -> io::Result<InputEvent> {
        Ok(match self.lines.next_line().await? {
            Some(line) => InputEvent::Line(line),
            None => InputEvent::Eof,
        })
    }
}
