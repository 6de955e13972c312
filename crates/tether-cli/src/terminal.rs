//! Terminal output compositor.
//!
//! [`Compositor`] is the only writer to the terminal. Asynchronous output
//! (server pushes, connection notices) may land while the operator is halfway
//! through a line, so every emit clears the prompt row, prints the timestamped
//! line, and redraws the prompt with the operator's draft intact.
//!
//! All operations queue crossterm commands and flush once. Lines end in
//! `\r\n` because the terminal is in raw mode while the prompt is active.
//!
//! With `ansi` off (output is not a terminal) the compositor writes plain
//! timestamped lines and never draws a prompt.

use std::io::{self, Write};

use chrono::{Local, NaiveTime};
use crossterm::{
    QueueableCommand,
    cursor::{MoveToColumn, MoveToPreviousLine},
    style::{Print, PrintStyledContent, Stylize},
    terminal::{Clear, ClearType},
};
use tether_app::{LineKind, OutputLine};

/// Whether [`Compositor::emit`] redraws the prompt afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reprompt {
    /// Redraw prompt and draft
    Yes,
    /// Leave the prompt row empty; the caller redraws it
    No,
}

/// Time source for line timestamps.
pub type Clock = fn() -> NaiveTime;

fn local_time() -> NaiveTime {
    Local::now().time()
}

/// Prompt row state.
#[derive(Debug, Default)]
struct PromptRow {
    glyph: String,
    draft: String,
    /// Cursor position in `draft`, in chars
    cursor: usize,
    active: bool,
}

/// Where the transient status line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Hidden,
    /// In the prompt row, with no prompt active
    Inline,
    /// In its own row directly above the prompt
    AbovePrompt,
}

/// Single writer for all operator-visible output.
#[derive(Debug)]
pub struct Compositor<W: Write> {
    out: W,
    clock: Clock,
    ansi: bool,
    prompt: PromptRow,
    status: Status,
}

impl<W: Write> Compositor<W> {
    /// Compositor timestamping with local wall-clock time.
    pub fn new(out: W, ansi: bool) -> Self {
        Self::with_clock(out, ansi, local_time)
    }

    /// Compositor with an injected clock.
    pub fn with_clock(out: W, ansi: bool, clock: Clock) -> Self {
        Self { out, clock, ansi, prompt: PromptRow::default(), status: Status::Hidden }
    }

    /// Print a line above the prompt.
    ///
    /// Multi-line text is split; every physical line gets the timestamp.
    pub fn emit(&mut self, line: &OutputLine, reprompt: Reprompt) -> io::Result<()> {
        self.clear_rows()?;

        let stamp = (self.clock)().format("%H:%M:%S").to_string();
        let mut physical = line.text.lines().peekable();
        if physical.peek().is_none() {
            self.write_line(&stamp, line.kind, "")?;
        }
        for part in physical {
            self.write_line(&stamp, line.kind, part)?;
        }

        if reprompt == Reprompt::Yes {
            self.draw_prompt()?;
        }
        self.out.flush()
    }

    /// Echo a submitted input line as permanent output.
    ///
    /// Clears the draft. The prompt stays empty until the next redraw.
    pub fn commit_input(&mut self, line: &str) -> io::Result<()> {
        self.prompt.draft.clear();
        self.prompt.cursor = 0;
        if !self.ansi {
            return Ok(());
        }

        let echo = format!("{}{line}", self.prompt.glyph);
        self.emit(&OutputLine { kind: LineKind::Reply, text: echo }, Reprompt::No)
    }

    /// Show a transient line. The next emit replaces it.
    ///
    /// With a prompt active the line sits directly above the prompt, which is
    /// redrawn with its draft.
    pub fn status(&mut self, text: &str) -> io::Result<()> {
        if !self.ansi {
            return Ok(());
        }

        self.clear_rows()?;
        self.out.queue(PrintStyledContent(text.to_string().dark_grey().italic()))?;
        if self.prompt.active {
            self.out.queue(Print("\r\n"))?;
            self.status = Status::AbovePrompt;
            self.draw_prompt()?;
        } else {
            self.status = Status::Inline;
        }
        self.out.flush()
    }

    /// Activate the prompt with the given glyph and draw it.
    pub fn show_prompt(&mut self, glyph: &str) -> io::Result<()> {
        self.prompt.glyph = glyph.to_string();
        self.prompt.active = self.ansi;
        if self.status == Status::Inline {
            self.status = Status::Hidden;
        }
        self.draw_prompt()?;
        self.out.flush()
    }

    /// Change the prompt glyph, redrawing only if it changed.
    pub fn set_prompt(&mut self, glyph: &str) -> io::Result<()> {
        if self.prompt.glyph == glyph {
            return Ok(());
        }
        self.prompt.glyph = glyph.to_string();
        self.draw_prompt()?;
        self.out.flush()
    }

    /// Deactivate the prompt and clear its row.
    pub fn hide_prompt(&mut self) -> io::Result<()> {
        self.clear_rows()?;
        self.prompt.active = false;
        self.out.flush()
    }

    /// Redraw the prompt row with a new draft.
    pub fn redraw_input(&mut self, draft: &str, cursor: usize) -> io::Result<()> {
        self.prompt.draft = draft.to_string();
        self.prompt.cursor = cursor.min(draft.chars().count());
        self.draw_prompt()?;
        self.out.flush()
    }

    /// Current draft as last drawn.
    pub fn draft(&self) -> &str {
        &self.prompt.draft
    }

    /// Underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn clear_row(&mut self) -> io::Result<()> {
        if self.ansi {
            self.out.queue(MoveToColumn(0))?.queue(Clear(ClearType::CurrentLine))?;
        }
        Ok(())
    }

    /// Clear the prompt row and any status line above it.
    fn clear_rows(&mut self) -> io::Result<()> {
        self.clear_row()?;
        if self.status == Status::AbovePrompt {
            self.out.queue(MoveToPreviousLine(1))?.queue(Clear(ClearType::CurrentLine))?;
        }
        self.status = Status::Hidden;
        Ok(())
    }

    fn write_line(&mut self, stamp: &str, kind: LineKind, text: &str) -> io::Result<()> {
        let newline = if self.ansi { "\r\n" } else { "\n" };
        if !self.ansi {
            let marker = marker(kind);
            write!(self.out, "[{stamp}] {marker}{text}{newline}")?;
            return Ok(());
        }

        self.out.queue(PrintStyledContent(format!("[{stamp}] ").dark_grey()))?;
        let body = format!("{}{text}", marker(kind));
        match kind {
            LineKind::Reply => self.out.queue(Print(body))?,
            LineKind::Notice => self.out.queue(PrintStyledContent(body.cyan()))?,
            LineKind::Error => self.out.queue(PrintStyledContent(body.red()))?,
            LineKind::Diagnostic => self.out.queue(PrintStyledContent(body.dark_grey()))?,
        };
        self.out.queue(Print(newline))?;
        Ok(())
    }

    fn draw_prompt(&mut self) -> io::Result<()> {
        if !self.prompt.active {
            return Ok(());
        }

        self.clear_row()?;
        self.out.queue(Print(&self.prompt.glyph))?.queue(Print(&self.prompt.draft))?;
        let column = self.prompt.glyph.chars().count() + self.prompt.cursor;
        self.out.queue(MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)))?;
        Ok(())
    }
}

fn marker(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Reply => "",
        LineKind::Notice => "* ",
        LineKind::Error => "! ",
        LineKind::Diagnostic => "# ",
    }
}
