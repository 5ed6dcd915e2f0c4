// tests/bot_tests.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use emotebot_common::models::ChatEvent;
use emotebot_core::test_utils::helpers::{
    test_config, RecordingTransport, ScriptedStatusApi, OFFLINE_BODY,
};
use emotebot_core::{EmoteBot, Error};

fn status_api() -> Arc<ScriptedStatusApi> {
    Arc::new(ScriptedStatusApi::new([OFFLINE_BODY]))
}

#[tokio::test(start_paused = true)]
async fn run_returns_fatal_error_when_reconnecting_gives_up() -> Result<(), Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport::with_events(tx.clone()));
    let bot = EmoteBot::new(test_config()?, transport.clone(), status_api())?;
    let ctx = bot.context().clone();

    let run = tokio::spawn(bot.run(rx));
    sleep(Duration::from_millis(100)).await;
    assert!(ctx.server.is_connected());
    assert_eq!(transport.connect_count(), 1);

    transport.set_fail_connect(true);
    tx.send(ChatEvent::Disconnected {
        reason: "Connection reset by peer".to_string(),
    })
    .expect("bot stopped listening");

    let result = run.await.expect("bot task panicked");
    assert!(matches!(result, Err(Error::ReconnectExhausted(10))), "{:?}", result);
    assert_eq!(transport.connect_count(), 11);
    assert_eq!(ctx.server.snapshot().reconnect_try, 11);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn run_recovers_when_a_reconnect_succeeds() -> Result<(), Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport::with_events(tx.clone()));
    let bot = EmoteBot::new(test_config()?, transport.clone(), status_api())?;
    let ctx = bot.context().clone();
    let shutdown = bot.shutdown_token();

    let run = tokio::spawn(bot.run(rx));
    sleep(Duration::from_millis(100)).await;

    tx.send(ChatEvent::Disconnected {
        reason: "Connection closed.".to_string(),
    })
    .expect("bot stopped listening");
    sleep(Duration::from_secs(5)).await;

    // the first retry brought the session back
    assert_eq!(transport.connect_count(), 2);
    let status = ctx.server.snapshot();
    assert!(status.connected());
    assert_eq!(status.reconnect_try, 0);

    shutdown.cancel();
    assert!(run.await.expect("bot task panicked").is_ok());
    Ok(())
}

#[tokio::test]
async fn shutdown_token_stops_the_bot() -> Result<(), Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport::with_events(tx));
    let bot = EmoteBot::new(test_config()?, transport, status_api())?;
    let shutdown = bot.shutdown_token();

    let run = tokio::spawn(bot.run(rx));
    shutdown.cancel();
    assert!(run.await.expect("bot task panicked").is_ok());
    Ok(())
}

#[tokio::test]
async fn initial_connect_failure_is_returned() -> Result<(), Error> {
    let (_tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::new(RecordingTransport::new());
    transport.set_fail_connect(true);
    let bot = EmoteBot::new(test_config()?, transport, status_api())?;

    let result = bot.run(rx).await;
    assert!(matches!(result, Err(Error::Platform(_))), "{:?}", result);
    Ok(())
}

#[tokio::test]
async fn closed_event_stream_ends_the_run() -> Result<(), Error> {
    let (tx, rx) = mpsc::unbounded_channel::<ChatEvent>();
    drop(tx);
    let bot = EmoteBot::new(test_config()?, Arc::new(RecordingTransport::new()), status_api())?;

    assert!(bot.run(rx).await.is_ok());
    Ok(())
}
