//! Terminal client helpers
//!
//! Rendering of server notices with the configured templates, and
//! translation of console input into protocol lines.

use crate::codec::{self, Command};
use crate::config::Templates;

/// Fill each `%v` in `template` with the next argument.
///
/// Surplus placeholders are left as-is; surplus arguments are dropped.
pub fn render(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(pos) = rest.find("%v") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("%v"),
        }
        rest = &rest[pos + 2..];
    }

    out.push_str(rest);
    out
}

/// Human-readable text for a decoded server line
///
/// Returns `None` for verbs the client does not display.
pub fn format_notice(templates: &Templates, cmd: &Command) -> Option<String> {
    let user = cmd.username.as_deref().unwrap_or("");
    let body = cmd.body.as_str();

    let text = match cmd.verb.as_str() {
        "connect" => render(&templates.has_entered_the_lobby_message, &[user]),
        "disconnect" => render(&templates.has_left_the_lobby_message, &[user]),
        "enter" => render(&templates.has_entered_the_room_message, &[user, body]),
        "leave" => render(&templates.has_left_the_room_message, &[user, body]),
        "message" => render(&templates.received_a_message, &[user, body]),
        "ignoring" => render(&templates.ignoring_message, &[body]),
        "unrecognized" => format!("Unrecognized command: /{body}"),
        _ => return None,
    };

    Some(text)
}

/// Protocol line for one line of console input
///
/// Commands (`/...`) pass through; other text becomes an escaped
/// `message`. Blank input sends nothing.
pub fn outbound_line(input: &str) -> Option<String> {
    let input = input.trim();

    if input.is_empty() {
        None
    } else if input.starts_with('/') {
        Some(input.to_string())
    } else {
        Some(codec::encode("message", None, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_positional() {
        assert_eq!(render("%v: %v", &["bob", "hi"]), "bob: hi");
        assert_eq!(render("%v joined %v", &["bob"]), "bob joined %v");
        assert_eq!(render("no args", &["bob"]), "no args");
    }

    #[test]
    fn test_format_message_notice() {
        let templates = Templates::default();
        let cmd = codec::decode("/message [bob] 10%25 off%2C today").unwrap();

        assert_eq!(
            format_notice(&templates, &cmd).as_deref(),
            Some("bob: 10% off, today")
        );
    }

    #[test]
    fn test_format_room_notices() {
        let templates = Templates::default();

        let enter = codec::decode("/enter [carol] vip").unwrap();
        assert_eq!(
            format_notice(&templates, &enter).as_deref(),
            Some("carol has entered the room vip")
        );

        let ignoring = codec::decode("/ignoring dave").unwrap();
        assert_eq!(
            format_notice(&templates, &ignoring).as_deref(),
            Some("You are now ignoring dave")
        );

        let ready = codec::decode("/ready").unwrap();
        assert_eq!(format_notice(&templates, &ready), None);
    }

    #[test]
    fn test_outbound_line() {
        assert_eq!(outbound_line("  "), None);
        assert_eq!(outbound_line("/enter vip").as_deref(), Some("/enter vip"));
        assert_eq!(
            outbound_line("see [this]: ok").as_deref(),
            Some("/message see %5Bthis%5D%3A ok")
        );
    }
}
