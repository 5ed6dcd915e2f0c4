//! src/platforms/twitch_irc/events.rs
//!
//! Turns parsed IRC lines into the bot's [`ChatEvent`]s.

use emotebot_common::models::{ChatEvent, Endpoint, MessageKind, SubMethods, UserState};

use super::message::IrcMessage;

const ACTION_START: &str = "\u{1}ACTION ";
const ACTION_END: char = '\u{1}';

/// Per-connection facts needed to interpret inbound lines.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub username: String,
    pub endpoint: Endpoint,
}

pub fn to_chat_event(msg: &IrcMessage, session: &SessionInfo) -> Option<ChatEvent> {
    match msg.command.as_str() {
        "001" => Some(ChatEvent::Connected {
            address: session.endpoint.address.clone(),
            port: session.endpoint.port,
        }),
        "NOTICE" => Some(ChatEvent::Notice {
            channel: msg.params.first().cloned().unwrap_or_default(),
            msg_id: msg.tag("msg-id").unwrap_or_default().to_string(),
            text: msg.trailing.clone().unwrap_or_default(),
        }),
        "PRIVMSG" => privmsg_event(msg, session),
        "WHISPER" => whisper_event(msg, session),
        "USERNOTICE" => usernotice_event(msg),
        _ => None,
    }
}

fn user_state(msg: &IrcMessage) -> UserState {
    let mut user = UserState::new(msg.tags.clone());
    if let Some(nick) = msg.nick() {
        user.insert("username", nick.to_lowercase());
    }
    user
}

fn privmsg_event(msg: &IrcMessage, session: &SessionInfo) -> Option<ChatEvent> {
    let channel = msg.channel()?.to_string();
    let raw = msg.trailing.clone().unwrap_or_default();

    let (kind, text) = match raw
        .strip_prefix(ACTION_START)
        .map(|s| s.trim_end_matches(ACTION_END))
    {
        Some(action) => (MessageKind::Action, action.to_string()),
        None => (MessageKind::Chat, raw),
    };

    let user = user_state(msg);
    let is_self = user
        .username()
        .is_some_and(|u| u.eq_ignore_ascii_case(&session.username));

    Some(ChatEvent::Message {
        channel,
        user,
        kind,
        text,
        is_self,
    })
}

fn whisper_event(msg: &IrcMessage, session: &SessionInfo) -> Option<ChatEvent> {
    let user = user_state(msg);
    let from = user.username()?.to_string();
    Some(ChatEvent::Message {
        channel: format!("#{}", from),
        is_self: from.eq_ignore_ascii_case(&session.username),
        user,
        kind: MessageKind::Whisper,
        text: msg.trailing.clone().unwrap_or_default(),
    })
}

fn usernotice_event(msg: &IrcMessage) -> Option<ChatEvent> {
    let channel = msg.channel()?.to_string();
    let user = user_state(msg);
    let username = user
        .get("login")
        .or_else(|| user.display_name())
        .unwrap_or_default()
        .to_string();
    let methods = SubMethods::from_user_state(&user);
    let message = msg.trailing.clone();

    match msg.tag("msg-id")? {
        "sub" => Some(ChatEvent::Subscription {
            channel,
            username,
            methods,
            message,
            user,
        }),
        "resub" => {
            let months = user
                .get("msg-param-cumulative-months")
                .and_then(|m| m.parse().ok())
                .unwrap_or(0);
            Some(ChatEvent::Resub {
                channel,
                username,
                months,
                message,
                user,
                methods,
            })
        }
        _ => None,
    }
}
