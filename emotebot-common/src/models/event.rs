// File: emotebot-common/src/models/event.rs

use std::collections::HashMap;
use std::fmt;

/// IRCv3 tags attached to a chat line, plus the sender's login under
/// `username` when it could be derived from the message prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState(HashMap<String, String>);

impl UserState {
    pub fn new(tags: HashMap<String, String>) -> Self {
        Self(tags)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Display name, if the tag is present and non-empty.
    pub fn display_name(&self) -> Option<&str> {
        self.get("display-name").filter(|s| !s.trim().is_empty())
    }

    /// Lowercase login of the sender.
    pub fn username(&self) -> Option<&str> {
        self.get("username")
            .or_else(|| self.get("login"))
            .filter(|s| !s.is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for UserState
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Action,
    Whisper,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Chat => write!(f, "chat"),
            MessageKind::Action => write!(f, "action"),
            MessageKind::Whisper => write!(f, "whisper"),
        }
    }
}

/// How a subscription was paid for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubMethods {
    /// Plan identifier: `Prime`, `1000`, `2000` or `3000`.
    pub plan: Option<String>,
}

impl SubMethods {
    pub fn from_user_state(user: &UserState) -> Self {
        Self {
            plan: user
                .get("msg-param-sub-plan")
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }
}

/// Everything the chat transport reports back to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Connected {
        address: String,
        port: u16,
    },
    Disconnected {
        reason: String,
    },
    Notice {
        channel: String,
        msg_id: String,
        text: String,
    },
    Message {
        channel: String,
        user: UserState,
        kind: MessageKind,
        text: String,
        is_self: bool,
    },
    Subscription {
        channel: String,
        username: String,
        methods: SubMethods,
        message: Option<String>,
        user: UserState,
    },
    Resub {
        channel: String,
        username: String,
        months: u32,
        message: Option<String>,
        user: UserState,
        methods: SubMethods,
    },
}
