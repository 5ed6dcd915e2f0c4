// File: src/services/event_handlers.rs

use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use emotebot_common::models::{ChatEvent, MessageKind, SubMethods, UserState};

use crate::context::BotContext;
use crate::tasks::{
    run_reconnect_loop, spawn_auto_post_task, spawn_live_check_task, AUTO_POST_START_DELAY,
};
use crate::Error;

/// Turns [`ChatEvent`]s into status updates, posts and background loops.
///
/// Per-connection loops hang off a session token that is replaced on every
/// connect and cancelled on every disconnect, so a reconnect never leaves two
/// scheduler chains running for the same channel.
pub struct EventHandler {
    ctx: Arc<BotContext>,
    mention: Regex,
    shutdown: CancellationToken,
    session: Mutex<CancellationToken>,
    reconnect: Mutex<Option<CancellationToken>>,
    fatal_tx: mpsc::UnboundedSender<Error>,
}

impl EventHandler {
    pub fn new(
        ctx: Arc<BotContext>,
        shutdown: CancellationToken,
        fatal_tx: mpsc::UnboundedSender<Error>,
    ) -> Result<Self, Error> {
        let mention = mention_pattern(&ctx.config.identity.username)?;
        let session = shutdown.child_token();
        Ok(Self {
            ctx,
            mention,
            shutdown,
            session: Mutex::new(session),
            reconnect: Mutex::new(None),
            fatal_tx,
        })
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Returns `Ok(true)` when the event led to an action, `Ok(false)` when it
    /// was skipped. Send failures come back as `Err`.
    pub async fn handle(&self, event: ChatEvent) -> Result<bool, Error> {
        match event {
            ChatEvent::Connected { address, port } => {
                self.on_connected(&address, port);
                Ok(true)
            }
            ChatEvent::Disconnected { reason } => Ok(self.on_disconnected(&reason)),
            ChatEvent::Notice { channel, msg_id, text } => {
                debug!(channel = %channel, msg_id = %msg_id, "notice received: {}", text);
                Ok(false)
            }
            ChatEvent::Message { channel, user, kind, text, is_self } => {
                self.on_message(&channel, &user, kind, &text, is_self).await
            }
            ChatEvent::Subscription { channel, username, methods, user, .. } => {
                self.on_subscription(&channel, &username, &methods, &user).await
            }
            ChatEvent::Resub { channel, username, months, user, methods, .. } => {
                self.on_resub(&channel, &username, months, &user, &methods).await
            }
        }
    }

    fn on_connected(&self, address: &str, port: u16) {
        info!("Connected to {}:{}", address, port);
        self.ctx.server.mark_connected(address, port);

        if let Some(reconnect) = self.reconnect.lock().take() {
            reconnect.cancel();
        }

        let session = self.shutdown.child_token();
        let previous = std::mem::replace(&mut *self.session.lock(), session.clone());
        previous.cancel();

        for channel in self.ctx.channels.channels() {
            spawn_live_check_task(&self.ctx, channel.clone(), session.clone());
            spawn_auto_post_task(&self.ctx, channel, AUTO_POST_START_DELAY, session.clone());
        }
    }

    /// Returns whether a reconnect supervisor was started.
    fn on_disconnected(&self, reason: &str) -> bool {
        let was_connected = self.ctx.server.mark_disconnected(reason);
        self.session.lock().cancel();
        warn!("Disconnected from server: {}", reason);

        if !was_connected || self.shutdown.is_cancelled() {
            return false;
        }

        let token = self.shutdown.child_token();
        if let Some(previous) = self.reconnect.lock().replace(token.clone()) {
            previous.cancel();
        }

        let transport = self.ctx.transport.clone();
        let server = self.ctx.server.clone();
        let fatal_tx = self.fatal_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = run_reconnect_loop(transport, server, token).await {
                if fatal_tx.send(e).is_err() {
                    error!("Reconnect gave up but nobody is listening for it");
                }
            }
        });
        true
    }

    async fn on_message(
        &self,
        channel: &str,
        user: &UserState,
        kind: MessageKind,
        text: &str,
        is_self: bool,
    ) -> Result<bool, Error> {
        debug!(channel = %channel, kind = %kind, "message received: {}", text);

        if is_self || kind != MessageKind::Chat {
            return Ok(false);
        }
        if !self.ctx.config.bot.reply_mentions || !contains_mention(&self.mention, text) {
            return Ok(false);
        }

        let prefix = user_prefix(user, user.username());
        self.ctx.poster.post(channel, Some(&prefix)).await?;
        Ok(true)
    }

    async fn on_subscription(
        &self,
        channel: &str,
        username: &str,
        methods: &SubMethods,
        user: &UserState,
    ) -> Result<bool, Error> {
        info!("subscription in {} by {}", channel, username);

        if !self.ctx.config.bot.greet_subs || self.is_self(username) {
            return Ok(false);
        }

        let prefix = sub_prefix(
            &user_prefix(user, Some(username)),
            methods,
            |plan| self.ctx.config.tier_prefix(plan),
        );
        self.ctx.poster.post(channel, Some(&prefix)).await?;
        Ok(true)
    }

    async fn on_resub(
        &self,
        channel: &str,
        username: &str,
        months: u32,
        user: &UserState,
        methods: &SubMethods,
    ) -> Result<bool, Error> {
        info!("resub in {} by {} for {} months", channel, username, months);

        if !self.ctx.config.bot.greet_subs || self.is_self(username) {
            return Ok(false);
        }

        let months = resub_months(user, months);
        let prefix = sub_prefix(
            &user_prefix(user, Some(username)),
            methods,
            |plan| self.ctx.config.tier_prefix(plan),
        );
        let prefix = resub_prefix(prefix, self.ctx.poster.emote(), months);
        self.ctx.poster.post(channel, Some(&prefix)).await?;
        Ok(true)
    }

    fn is_self(&self, username: &str) -> bool {
        username.eq_ignore_ascii_case(&self.ctx.config.identity.username)
    }
}

/// Case-insensitive, whole-word match of the bot's username.
pub fn mention_pattern(username: &str) -> Result<Regex, Error> {
    let pattern = format!(r"(?i)(?:^|\W){}\b", regex::escape(username.trim()));
    Regex::new(&pattern).map_err(|e| Error::Config(format!("bad mention pattern: {e}")))
}

pub fn contains_mention(pattern: &Regex, text: &str) -> bool {
    pattern.is_match(text.trim())
}

/// `@display-name`, else `@fallback`, else empty.
pub fn user_prefix(user: &UserState, fallback: Option<&str>) -> String {
    if let Some(display) = user.display_name() {
        return format!("@{}", display);
    }
    match fallback.map(|f| f.trim().trim_start_matches('#')) {
        Some(name) if !name.is_empty() => format!("@{}", name),
        _ => String::new(),
    }
}

/// Appends the tier text for the sub plan, if the event carries a plan.
pub fn sub_prefix<'a, F>(identity: &str, methods: &SubMethods, tier_prefix: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    match methods.plan.as_deref().filter(|p| !p.is_empty()) {
        Some(plan) => format!("{} {}", identity, tier_prefix(plan).unwrap_or("")),
        None => identity.to_string(),
    }
}

/// Cumulative months when numeric, else streak months, else the event value.
pub fn resub_months(user: &UserState, months: u32) -> u32 {
    ["msg-param-cumulative-months", "msg-param-streak-months"]
        .iter()
        .filter_map(|key| user.get(key))
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
        .find_map(|v| v.parse().ok())
        .unwrap_or(months)
}

/// Adds one extra emote per month beyond the first.
pub fn resub_prefix(prefix: String, emote: &str, months: u32) -> String {
    if months <= 1 {
        return prefix;
    }
    let extra = format!("{} ", emote).repeat(months as usize - 1);
    format!("{} {}", prefix, extra.trim())
}
