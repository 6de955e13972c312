//! Slash commands.

/// Parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/help`, `/h`
    Help,
    /// `/new`, `/n`: start a new conversation thread
    New,
    /// `/monitor`, `/m`: toggle frame tracing
    Monitor,
    /// `/status`, `/s`
    Status,
    /// `/reconnect`, `/r`: reconnect now, skipping any backoff
    Reconnect,
    /// `/quit`, `/q`
    Quit,
    /// Anything else starting with `/`
    Unknown(String),
}

/// Help listing, one entry per line.
pub const HELP: &[&str] = &[
    "/help, /h        show this help",
    "/new, /n         start a new conversation thread",
    "/monitor, /m     toggle monitor mode (trace every frame)",
    "/status, /s      show connection and session status",
    "/reconnect, /r   reconnect now",
    "/quit, /q        exit",
];

impl Command {
    /// Parse a trimmed input line. `None` if it is not a command.
    ///
    /// Only the first word counts; trailing arguments are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('/')?;
        let name = rest.split_whitespace().next().unwrap_or_default();

        let command = match name.to_ascii_lowercase().as_str() {
            "help" | "h" => Self::Help,
            "new" | "n" => Self::New,
            "monitor" | "m" => Self::Monitor,
            "status" | "s" => Self::Status,
            "reconnect" | "r" => Self::Reconnect,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        };
        Some(command)
    }
}
