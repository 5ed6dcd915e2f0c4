//! src/platforms/twitch_irc/message.rs

use std::collections::HashMap;

/// A single parsed IRC line from Twitch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl IrcMessage {
    pub fn parse(line: &str) -> Self {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut msg = Self::default();

        // 1) tags
        if let Some(stripped) = rest.strip_prefix('@') {
            let (tags, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
            msg.tags = parse_tags(tags);
            rest = tail.trim_start();
        }

        // 2) prefix
        if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
            msg.prefix = Some(prefix.to_string());
            rest = tail.trim_start();
        }

        // 3) command
        let (command, tail) = rest.split_once(' ').unwrap_or((rest, ""));
        msg.command = command.to_ascii_uppercase();
        rest = tail;

        // 4) params and trailing
        let (params, trailing) = if let Some(text) = rest.strip_prefix(':') {
            ("", Some(text))
        } else if let Some(idx) = rest.find(" :") {
            (&rest[..idx], Some(&rest[idx + 2..]))
        } else {
            (rest, None)
        };
        msg.params = params.split_whitespace().map(str::to_string).collect();
        msg.trailing = trailing.map(str::to_string);

        msg
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        prefix.split_once('!').map(|(nick, _)| nick)
    }

    pub fn channel(&self) -> Option<&str> {
        self.params.first().map(String::as_str).filter(|p| p.starts_with('#'))
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|kv| !kv.is_empty())
        .map(|kv| {
            let (key, value) = kv.split_once('=').unwrap_or((kv, ""));
            (key.to_string(), unescape_tag_value(value))
        })
        .collect()
}

/// Undoes IRCv3 tag value escaping (`\s`, `\:`, `\\`, `\r`, `\n`).
pub fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some(':') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
