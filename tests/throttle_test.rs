//! Outbound pacing

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeConnection, RosterAnswer, CHANNEL};
use goxxx::application::messaging::{ReplyMode, ReplyThrottle, ThrottledSink};
use goxxx::domain::entities::OutboundReply;
use goxxx::domain::traits::ReplySink;

const INTERVAL: Duration = Duration::from_secs(2);

fn throttle() -> (Arc<FakeConnection>, Arc<ReplyThrottle>) {
    let connection = FakeConnection::new(&[], RosterAnswer::Never);
    let throttle = Arc::new(ReplyThrottle::new(connection.clone(), CHANNEL, INTERVAL));
    (connection, throttle)
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sends_are_spaced() {
    let (connection, throttle) = throttle();

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let throttle = throttle.clone();
            tokio::spawn(async move {
                throttle
                    .send(&OutboundReply::to_channel(format!("line {}", i)))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let sent = connection.sent();
    assert_eq!(sent.len(), 5);
    for pair in sent.windows(2) {
        assert!(pair[1].at - pair[0].at >= INTERVAL);
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_send_is_immediate() {
    let (connection, throttle) = throttle();
    let start = tokio::time::Instant::now();

    throttle.send(&OutboundReply::to_channel("hello")).await.unwrap();
    assert_eq!(connection.sent()[0].at, start);

    tokio::time::sleep(INTERVAL * 2).await;
    let before = tokio::time::Instant::now();
    throttle.send(&OutboundReply::to_channel("later")).await.unwrap();
    assert_eq!(connection.sent()[1].at, before);
}

#[tokio::test(start_paused = true)]
async fn test_target_routing() {
    let (connection, throttle) = throttle();

    throttle.send(&OutboundReply::to_channel("to all")).await.unwrap();
    throttle.send(&OutboundReply::new("to alice", "alice")).await.unwrap();

    let channel_sink = ThrottledSink::shared(&throttle, ReplyMode::ToChannel);
    channel_sink.send(OutboundReply::new("forced", "bob")).await;

    let nick_sink = ThrottledSink::shared(&throttle, ReplyMode::ToNick);
    nick_sink.send(OutboundReply::to_channel("dropped")).await;
    nick_sink.send(OutboundReply::new("private", "carol")).await;

    let targets: Vec<_> = connection
        .sent()
        .into_iter()
        .map(|line| (line.target, line.text))
        .collect();
    assert_eq!(
        targets,
        vec![
            (CHANNEL.to_string(), "to all".to_string()),
            ("alice".to_string(), "to alice".to_string()),
            (CHANNEL.to_string(), "forced".to_string()),
            ("carol".to_string(), "private".to_string()),
        ]
    );
}
