// tests/event_handler_tests.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use emotebot_common::models::{ChatEvent, MessageKind, SubMethods, UserState};
use emotebot_core::config::BotConfig;
use emotebot_core::context::BotContext;
use emotebot_core::services::EventHandler;
use emotebot_core::test_utils::helpers::{
    test_config, RecordingTransport, ScriptedStatusApi, LIVE_BODY,
};
use emotebot_core::Error;

const CHANNEL: &str = "#somechannel";

struct Harness {
    handler: EventHandler,
    transport: Arc<RecordingTransport>,
    status_api: Arc<ScriptedStatusApi>,
    fatal_rx: mpsc::UnboundedReceiver<Error>,
    shutdown: CancellationToken,
}

impl Harness {
    fn new(config: BotConfig) -> Result<Self, Error> {
        let transport = Arc::new(RecordingTransport::new());
        let status_api = Arc::new(ScriptedStatusApi::new([LIVE_BODY]));
        let ctx = Arc::new(BotContext::new(config, transport.clone(), status_api.clone()));
        let shutdown = CancellationToken::new();
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let handler = EventHandler::new(ctx, shutdown.clone(), fatal_tx)?;
        Ok(Self {
            handler,
            transport,
            status_api,
            fatal_rx,
            shutdown,
        })
    }

    fn said(&self) -> Vec<String> {
        self.transport.said().into_iter().map(|(_, text)| text).collect()
    }
}

fn chat(text: &str, user: UserState) -> ChatEvent {
    ChatEvent::Message {
        channel: CHANNEL.to_string(),
        user,
        kind: MessageKind::Chat,
        text: text.to_string(),
        is_self: false,
    }
}

fn viewer() -> UserState {
    [("display-name", "Viewer"), ("username", "viewer")]
        .into_iter()
        .collect()
}

fn plan(plan: &str) -> SubMethods {
    SubMethods {
        plan: Some(plan.to_string()),
    }
}

fn connected() -> ChatEvent {
    ChatEvent::Connected {
        address: "irc.chat.twitch.tv".to_string(),
        port: 6697,
    }
}

fn disconnected() -> ChatEvent {
    ChatEvent::Disconnected {
        reason: "Connection closed.".to_string(),
    }
}

#[tokio::test]
async fn mention_gets_an_emote_reply() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;

    assert!(h.handler.handle(chat("hey @EmoteBot check this", viewer())).await?);
    assert_eq!(h.said(), vec!["@Viewer PogChamp"]);

    assert_eq!(h.transport.said()[0].0, CHANNEL);
    Ok(())
}

#[tokio::test]
async fn mention_reply_falls_back_to_username() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let user: UserState = [("username", "viewer")].into_iter().collect();

    h.handler.handle(chat("emotebot hi", user)).await?;
    assert_eq!(h.said(), vec!["@viewer PogChamp"]);
    Ok(())
}

#[tokio::test]
async fn ignored_messages_produce_no_post() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;

    // no whole-word mention
    assert!(!h.handler.handle(chat("robotname nope", viewer())).await?);
    assert!(!h.handler.handle(chat("emotebots are neat", viewer())).await?);

    // own message
    let own = ChatEvent::Message {
        channel: CHANNEL.to_string(),
        user: viewer(),
        kind: MessageKind::Chat,
        text: "emotebot".to_string(),
        is_self: true,
    };
    assert!(!h.handler.handle(own).await?);

    // /me and whispers are not chat
    for kind in [MessageKind::Action, MessageKind::Whisper] {
        let event = ChatEvent::Message {
            channel: CHANNEL.to_string(),
            user: viewer(),
            kind,
            text: "emotebot".to_string(),
            is_self: false,
        };
        assert!(!h.handler.handle(event).await?);
    }

    assert!(h.said().is_empty());
    Ok(())
}

#[tokio::test]
async fn mentions_ignored_when_replies_are_off() -> Result<(), Error> {
    let mut config = test_config()?;
    config.bot.reply_mentions = false;
    let h = Harness::new(config)?;

    assert!(!h.handler.handle(chat("hey emotebot", viewer())).await?);
    assert!(h.said().is_empty());
    Ok(())
}

#[tokio::test]
async fn subscription_is_greeted_with_tier_text() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let user: UserState = [("display-name", "NewSub"), ("login", "newsub")]
        .into_iter()
        .collect();

    let event = ChatEvent::Subscription {
        channel: CHANNEL.to_string(),
        username: "newsub".to_string(),
        methods: plan("1000"),
        message: None,
        user,
    };
    assert!(h.handler.handle(event).await?);
    assert_eq!(h.said(), vec!["@NewSub tier one hype PogChamp"]);
    Ok(())
}

#[tokio::test]
async fn own_subscription_is_ignored() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;

    let event = ChatEvent::Subscription {
        channel: CHANNEL.to_string(),
        username: "EmoteBot".to_string(),
        methods: plan("1000"),
        message: None,
        user: UserState::default(),
    };
    assert!(!h.handler.handle(event).await?);
    assert!(h.said().is_empty());
    Ok(())
}

#[tokio::test]
async fn resub_repeats_the_emote_per_extra_month() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let user: UserState = [
        ("display-name", "Regular"),
        ("msg-param-cumulative-months", "3"),
    ]
    .into_iter()
    .collect();

    let event = ChatEvent::Resub {
        channel: CHANNEL.to_string(),
        username: "regular".to_string(),
        months: 0,
        message: Some("still here".to_string()),
        user,
        methods: plan("Prime"),
    };
    assert!(h.handler.handle(event).await?);

    let said = h.said();
    assert_eq!(said, vec!["@Regular prime hype PogChamp PogChamp PogChamp"]);
    // two in the prefix, one as the emote itself
    assert_eq!(said[0].matches("PogChamp").count(), 3);
    Ok(())
}

#[tokio::test]
async fn subs_ignored_when_greeting_is_off() -> Result<(), Error> {
    let mut config = test_config()?;
    config.bot.greet_subs = false;
    let h = Harness::new(config)?;

    let sub = ChatEvent::Subscription {
        channel: CHANNEL.to_string(),
        username: "newsub".to_string(),
        methods: plan("1000"),
        message: None,
        user: UserState::default(),
    };
    let resub = ChatEvent::Resub {
        channel: CHANNEL.to_string(),
        username: "regular".to_string(),
        months: 5,
        message: None,
        user: UserState::default(),
        methods: plan("2000"),
    };
    assert!(!h.handler.handle(sub).await?);
    assert!(!h.handler.handle(resub).await?);
    assert!(h.said().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_send_is_reported_to_the_caller() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    h.transport.set_fail_say(true);

    let result = h.handler.handle(chat("emotebot", viewer())).await;
    assert!(matches!(result, Err(Error::NotConnected)), "{:?}", result);
    Ok(())
}

#[tokio::test]
async fn notices_change_nothing() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let notice = ChatEvent::Notice {
        channel: CHANNEL.to_string(),
        msg_id: "slow_on".to_string(),
        text: "This room is now in slow mode.".to_string(),
    };
    assert!(!h.handler.handle(notice).await?);
    assert!(!h.handler.context().server.is_connected());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn connect_starts_live_check_and_auto_post() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let ctx = h.handler.context().clone();

    h.handler.handle(connected()).await?;
    let status = ctx.server.snapshot();
    assert!(status.connected());
    assert_eq!(status.address(), Some("irc.chat.twitch.tv"));
    assert_eq!(status.reconnect_try, 0);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(h.status_api.calls(), 1);
    assert!(ctx.channels.is_live(CHANNEL));

    // first post lands 8-12s after start
    sleep(Duration::from_secs(13)).await;
    assert_eq!(h.said(), vec!["PogChamp"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn first_auto_post_tick_waits_for_the_start_delay() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;

    // past the 8-12s window, so the post is already overdue on connect
    sleep(Duration::from_secs(13)).await;
    h.handler.handle(connected()).await?;

    sleep(Duration::from_millis(490)).await;
    assert!(h.handler.context().channels.is_live(CHANNEL));
    assert!(h.said().is_empty());

    sleep(Duration::from_millis(20)).await;
    assert_eq!(h.said(), vec!["PogChamp"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn disconnect_stops_the_session_loops() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let ctx = h.handler.context().clone();

    h.handler.handle(connected()).await?;
    sleep(Duration::from_millis(100)).await;
    assert!(ctx.channels.is_live(CHANNEL));

    assert!(h.handler.handle(disconnected()).await?);

    let calls = h.status_api.calls();
    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.status_api.calls(), calls);
    assert!(h.said().is_empty());
    assert!(!ctx.server.is_connected());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn no_reconnect_after_shutdown() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;

    h.handler.handle(connected()).await?;
    h.shutdown.cancel();
    assert!(!h.handler.handle(disconnected()).await?);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.connect_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn disconnect_before_any_connect_does_not_reconnect() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;

    assert!(!h.handler.handle(disconnected()).await?);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.connect_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_is_retried_until_fatal() -> Result<(), Error> {
    let mut h = Harness::new(test_config()?)?;
    h.transport.set_fail_connect(true);

    h.handler.handle(connected()).await?;
    assert!(h.handler.handle(disconnected()).await?);

    let status = h.handler.context().server.snapshot();
    assert_eq!(status.address(), None);
    assert_eq!(status.disconnect_reason.as_deref(), Some("Connection closed."));

    let fatal = h.fatal_rx.recv().await;
    assert!(matches!(fatal, Some(Error::ReconnectExhausted(10))), "{:?}", fatal);
    assert_eq!(h.transport.connect_count(), 10);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reconnect_supervisor_stops_on_connect() -> Result<(), Error> {
    let h = Harness::new(test_config()?)?;
    let ctx = h.handler.context().clone();

    h.handler.handle(connected()).await?;
    h.handler.handle(disconnected()).await?;
    // the welcome arrives before the supervisor got to run
    h.handler.handle(connected()).await?;

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.connect_count(), 0);
    assert_eq!(ctx.server.snapshot().reconnect_try, 0);
    Ok(())
}
