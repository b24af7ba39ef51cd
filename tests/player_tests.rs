// Integration tests for the player state machine and its progress ticks.

mod common;

use anyhow::Result;
use audio_demo::config::PlayerConfig;
use audio_demo::{event_channel, PlayEvent, PlayState, Player};
use common::{collect_until, FakePlayback};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;

fn player(duration_ms: u64) -> (Player, tokio::sync::mpsc::UnboundedReceiver<PlayEvent>) {
    let (tx, rx) = event_channel();
    let player = Player::new(Arc::new(FakePlayback::new(duration_ms)), &PlayerConfig::default(), tx);
    (player, rx)
}

fn is_terminal(event: &PlayEvent) -> bool {
    matches!(event, PlayEvent::Stopped { .. } | PlayEvent::Error { .. })
}

fn percents(events: &[PlayEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayEvent::Progress(sample) => Some(sample.percent),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_playback_stops_itself_at_100_percent() -> Result<()> {
    let (player, mut rx) = player(1000);

    player.start("clips/a.wav");
    assert_eq!(player.state(), PlayState::Preparing);

    let events = collect_until(&mut rx, is_terminal).await;

    assert!(matches!(&events[0], PlayEvent::Started { path } if path == &PathBuf::from("clips/a.wav")));
    assert!(matches!(events.last(), Some(PlayEvent::Stopped { .. })));

    let percents = percents(&events);
    assert_eq!(percents, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);

    assert!(player.is_stopped());
    assert!(player.current_path().is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)), "no ticks after stop");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_elapsed_and_remaining() -> Result<()> {
    let (player, mut rx) = player(3000);

    player.start("clips/a.wav");
    let events = collect_until(&mut rx, is_terminal).await;

    for event in &events {
        if let PlayEvent::Progress(sample) = event {
            assert!(sample.elapsed_secs + sample.remaining_secs <= 3);
            assert!(sample.elapsed_secs + sample.remaining_secs >= 2);
        }
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_start_same_path_twice_is_noop() -> Result<()> {
    let (player, mut rx) = player(1000);

    player.start("clips/a.wav");
    player.start("clips/a.wav");
    tokio::time::sleep(Duration::from_millis(250)).await;
    player.start("clips/a.wav");

    let events = collect_until(&mut rx, is_terminal).await;
    let started = events
        .iter()
        .filter(|e| matches!(e, PlayEvent::Started { .. }))
        .count();
    assert_eq!(started, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_start_other_path_stops_current() -> Result<()> {
    let (player, mut rx) = player(5000);

    player.start("clips/a.wav");
    assert!(matches!(rx.recv().await, Some(PlayEvent::Started { .. })));

    player.start("clips/b.wav");

    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            PlayEvent::Progress(_) => continue,
            PlayEvent::Started { path } => {
                seen.push(format!("started {}", path.display()));
                break;
            }
            PlayEvent::Stopped { path } => seen.push(format!("stopped {}", path.display())),
            other => panic!("unexpected event {:?}", other),
        }
    }

    assert_eq!(seen, vec!["stopped clips/a.wav", "started clips/b.wav"]);
    assert_eq!(player.current_path(), Some(PathBuf::from("clips/b.wav")));
    assert!(player.is_playing());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pause_suspends_progress_until_resume() -> Result<()> {
    let (player, mut rx) = player(2000);

    player.start("clips/a.wav");
    assert!(matches!(rx.recv().await, Some(PlayEvent::Started { .. })));
    for _ in 0..3 {
        assert!(matches!(rx.recv().await, Some(PlayEvent::Progress(_))));
    }

    player.pause();
    assert!(player.is_paused());
    assert!(matches!(rx.recv().await, Some(PlayEvent::Paused { .. })));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)), "no progress while paused");
    assert!(player.is_paused());

    player.resume();
    assert!(player.is_playing());
    assert!(matches!(rx.recv().await, Some(PlayEvent::Resumed { .. })));

    let events = collect_until(&mut rx, is_terminal).await;
    let percents = percents(&events);
    assert_eq!(percents.first(), Some(&20), "resumes from where it paused");
    assert_eq!(percents.last(), Some(&100));
    assert!(player.is_stopped());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manual_stop_is_terminal() -> Result<()> {
    let (player, mut rx) = player(10_000);

    player.start("clips/a.wav");
    assert!(matches!(rx.recv().await, Some(PlayEvent::Started { .. })));

    player.stop();
    player.stop();

    let events = collect_until(&mut rx, is_terminal).await;
    assert!(matches!(events.last(), Some(PlayEvent::Stopped { .. })));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_ignored_when_stopped() -> Result<()> {
    let (player, mut rx) = player(1000);

    player.pause();
    player.resume();

    assert!(player.is_stopped());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    Ok(())
}

#[tokio::test]
async fn test_prepare_failure_reports_error() -> Result<()> {
    let (tx, mut rx) = event_channel();
    let backend = FakePlayback {
        duration_ms: 1000,
        fail: true,
    };
    let player = Player::new(Arc::new(backend), &PlayerConfig::default(), tx);

    player.start("missing.wav");
    let events = collect_until(&mut rx, is_terminal).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], PlayEvent::Error { path, .. } if path == &PathBuf::from("missing.wav")));
    assert!(player.is_stopped());

    Ok(())
}
