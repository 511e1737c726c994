//! Transcript parsing.
//!
//! Turns pasted `role: content` text into an ordered list of messages.
//! Parsing never fails: every input line becomes exactly one message.

use guppshupp::Message;

/// The stock conversation offered when no transcript is at hand.
pub const SAMPLE_TRANSCRIPT: &str = "\
user: I hate waking up early, I'm not a morning person
assistant: That's totally understandable
user: My dog Luna is so annoying sometimes lol
assistant: Dogs can be a handful
user: I work in cybersecurity, lots of stress lately
assistant: That sounds challenging
user: Yeah, especially on Mondays
assistant: Mondays can be tough
user: I love pizza though, that's my go-to comfort food
assistant: Pizza is always a good choice";

/// Parse a transcript, one message per line.
///
/// Each line is split on its first colon. Lines without a colon keep their
/// text as content with an empty role; blank lines become empty messages.
pub fn parse(raw: &str) -> Vec<Message> {
    raw.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Message {
    match line.split_once(':') {
        Some((role, content)) => Message::new(role.trim(), content.trim()),
        None => Message::new("", line.trim()),
    }
}

/// Render messages back into `role: content` lines.
pub fn render(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
