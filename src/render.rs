use std::{
    borrow::Cow,
    io::{self, Write},
};

use chrono::Local;
use parley_common::{Message, Scope};

pub fn scope_header(scope: &Scope) -> String {
    match scope {
        Scope::Channel(name) => format!("{} (Group Chat)", capitalize(name)),
        Scope::Direct(peer) => format!("{} (Direct Message)", sanitize(peer)),
    }
}

/// One line per message; the viewer's own messages are marked with `>`.
pub fn message_line(message: &Message, viewer: Option<&str>) -> String {
    if message.is_system() {
        return format!("  * {}", sanitize(&message.body));
    }
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let author = message.author().unwrap_or("?");
    let marker = if viewer == Some(author) { '>' } else { ' ' };
    format!(
        "{time} {marker} {}: {}",
        sanitize(author),
        sanitize(&message.body)
    )
}

pub fn write_conversation(
    out: &mut impl Write,
    scope: &Scope,
    messages: &[Message],
    viewer: Option<&str>,
) -> io::Result<()> {
    writeln!(out, "== {} ==", scope_header(scope))?;
    if messages.is_empty() {
        writeln!(out, "  (no messages yet)")?;
    }
    for message in messages {
        writeln!(out, "{}", message_line(message, viewer))?;
    }
    Ok(())
}

/// Escapes control characters so stored text can't move the cursor or split lines.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| {
                if c.is_control() {
                    c.escape_default().to_string()
                } else {
                    c.to_string()
                }
            })
            .collect(),
    )
}

fn capitalize(name: &str) -> String {
    let name = sanitize(name);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers() {
        assert_eq!(scope_header(&Scope::channel("general")), "General (Group Chat)");
        assert_eq!(scope_header(&Scope::direct("bob")), "bob (Direct Message)");
    }

    #[test]
    fn own_messages_are_marked() {
        let message = Message::user("alice", "hi");
        assert!(message_line(&message, Some("alice")).ends_with("> alice: hi"));
        assert!(message_line(&message, Some("bob")).ends_with("  alice: hi"));
        assert!(message_line(&message, None).ends_with("  alice: hi"));
    }

    #[test]
    fn system_messages_have_no_author_or_time() {
        let message = Message::system("alice joined the chat");
        assert_eq!(message_line(&message, None), "  * alice joined the chat");
    }

    #[test]
    fn control_characters_are_escaped() {
        assert!(matches!(sanitize("plain text"), Cow::Borrowed(_)));
        assert_eq!(sanitize("two\nlines"), "two\\nlines");
        assert_eq!(sanitize("\u{1b}[2Jboom"), "\\u{1b}[2Jboom");
    }

    #[test]
    fn empty_conversation() {
        let mut out = Vec::new();
        write_conversation(&mut out, &Scope::channel("random"), &[], None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "== Random (Group Chat) ==\n  (no messages yet)\n"
        );
    }
}
