//! Wire codec
//!
//! Line-based text protocol, one command per line:
//!
//! ```text
//! /<verb> [<username>] <body>
//! ```
//!
//! The bracketed username only appears on server → client broadcasts.
//! A line that does not start with `/<verb>` is an implicit `message`.
//! Username and body are escaped independently so that reserved
//! characters in chat text can never forge protocol syntax.

/// Reserved characters and their escaped forms.
pub const RESERVED_TOKENS: [(char, &str); 6] = [
    ('%', "%25"),
    (':', "%3A"),
    ('[', "%5B"),
    (']', "%5D"),
    (',', "%2C"),
    ('"', "%22"),
];

/// Escape every reserved character.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match RESERVED_TOKENS.iter().find(|(raw, _)| *raw == c) {
            Some((_, encoded)) => out.push_str(encoded),
            None => out.push(c),
        }
    }
    out
}

/// Reverse [`escape`].
///
/// Single left-to-right pass: a `%` that does not start one of the
/// table's tokens is kept literally, and decoded output is never rescanned.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match RESERVED_TOKENS
            .iter()
            .find(|(_, encoded)| tail.starts_with(encoded))
        {
            Some((raw, encoded)) => {
                out.push(*raw);
                rest = &tail[encoded.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// A decoded protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Action token without the leading `/`
    pub verb: String,
    /// Bracketed username, unescaped
    pub username: Option<String>,
    /// Remaining text, unescaped
    pub body: String,
}

impl Command {
    fn implicit_message(line: &str) -> Self {
        Self {
            verb: "message".to_string(),
            username: None,
            body: unescape(line),
        }
    }
}

/// Decode one server → client line.
///
/// Returns `None` for a blank line. Anything else yields a command;
/// lines that do not match `/<verb> ...` become an implicit `message`.
pub fn decode(line: &str) -> Option<Command> {
    parse(line, true)
}

/// Decode one client → server line.
///
/// Clients never send a username field, so a leading `[..]` is part of
/// the body: `/message [afk] back` carries the body `[afk] back`.
pub fn decode_request(line: &str) -> Option<Command> {
    parse(line, false)
}

fn parse(line: &str, with_username: bool) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(after_slash) = line.strip_prefix('/') else {
        return Some(Command::implicit_message(line));
    };

    let verb_end = after_slash
        .find(char::is_whitespace)
        .unwrap_or(after_slash.len());
    let verb = &after_slash[..verb_end];
    if verb.is_empty() {
        return Some(Command::implicit_message(line));
    }

    let mut rest = after_slash[verb_end..].trim_start();
    let mut username = None;

    if with_username {
        if let Some(inner) = rest.strip_prefix('[') {
            if let Some(close) = inner.find(']') {
                username = Some(unescape(&inner[..close]));
                rest = inner[close + 1..].trim_start();
            }
        }
    }

    Some(Command {
        verb: verb.to_string(),
        username,
        body: unescape(rest),
    })
}

/// Encode a server → client line (without the trailing newline).
///
/// Broadcasts pass the origin's username; direct notices pass `None`.
/// An empty body is omitted entirely.
///
/// Whitespace is not escaped, so leading and trailing whitespace of the
/// body does not survive [`decode`]. Bodies from clients are already
/// trimmed by [`decode_request`].
pub fn encode(verb: &str, username: Option<&str>, body: &str) -> String {
    let mut line = format!("/{verb}");

    if let Some(name) = username {
        line.push_str(" [");
        line.push_str(&escape(name));
        line.push(']');
    }

    if !body.is_empty() {
        line.push(' ');
        line.push_str(&escape(body));
    }

    line
}

/// Server → client notice kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Handshake prompt sent right after accept
    Ready,
    /// A session completed the `user` handshake
    Connect,
    /// A session entered a room (body = room)
    Enter,
    /// A session left a room (body = room)
    Leave,
    /// Chat text
    Message,
    /// Acknowledges an `ignore` command
    Ignoring,
    /// A session went away
    Disconnect,
    /// The sender used an unknown verb (body = verb)
    Unrecognized,
}

impl NoticeKind {
    /// Wire verb for this notice
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Ready => "ready",
            NoticeKind::Connect => "connect",
            NoticeKind::Enter => "enter",
            NoticeKind::Leave => "leave",
            NoticeKind::Message => "message",
            NoticeKind::Ignoring => "ignoring",
            NoticeKind::Disconnect => "disconnect",
            NoticeKind::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client → server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Set the username (handshake)
    User(String),
    /// Chat to the current room
    Message(String),
    /// Move to a room
    Enter(String),
    /// Return to the lobby
    Leave,
    /// Suppress broadcasts from a username
    Ignore(String),
    /// Close the session
    Disconnect,
    /// Any other verb
    Unrecognized(String),
}

impl From<Command> for ClientCommand {
    fn from(cmd: Command) -> Self {
        match cmd.verb.as_str() {
            "user" => ClientCommand::User(cmd.body),
            "message" => ClientCommand::Message(cmd.body),
            "enter" => ClientCommand::Enter(cmd.body),
            "leave" => ClientCommand::Leave,
            "ignore" => ClientCommand::Ignore(cmd.body),
            "disconnect" => ClientCommand::Disconnect,
            _ => ClientCommand::Unrecognized(cmd.verb),
        }
    }
}
