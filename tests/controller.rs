//! Turn controller integration tests
//!
//! Drives the state machine with scripted collaborators, no audio or network.

use std::time::Duration;

use tokio::sync::mpsc;

use parley::intent::VISION_TAG;
use parley::{CycleOutcome, Error, FailureKind, ListenMode, ListenOutcome, Role, SessionState};

mod common;
use common::{PERSONA, controller, heard};

#[tokio::test]
async fn test_wake_then_command_responds() {
    let (mut ctl, log) = controller(
        vec![heard("hey alice"), heard("what's the weather")],
        vec![Ok("Sunny and warm.".to_string())],
        false,
    );

    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    assert_eq!(ctl.step().await, CycleOutcome::Responded);

    assert_eq!(ctl.state(), SessionState::Active);
    let turns = ctl.context().snapshot();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].content(), PERSONA);
    assert_eq!(turns[1].role(), Role::User);
    assert_eq!(turns[1].content(), "what's the weather");
    assert_eq!(turns[2].role(), Role::Assistant);
    assert_eq!(turns[2].content(), "Sunny and warm.");

    // Acknowledgement is spoken before the command is captured
    assert_eq!(
        *log.borrow(),
        vec![
            "listen:wake",
            "speak:How you doing?",
            "listen:command",
            "complete:2",
            "speak:Sunny and warm.",
        ]
    );
}

#[tokio::test]
async fn test_engine_receives_full_transcript() {
    let (mut ctl, _log) = controller(
        vec![heard("alice"), heard("tell me a joke"), heard("why")],
        vec![
            Ok("Why did the chicken cross the road?".to_string()),
            Ok("To get to the other side.".to_string()),
        ],
        false,
    );

    ctl.step().await;
    ctl.step().await;

    let received = ctl.engine().received.borrow();
    assert_eq!(received.len(), 2);
    let last = &received[1];
    assert_eq!(last.len(), 4);
    assert_eq!(last[0].role(), Role::System);
    assert_eq!(last[1].content(), "tell me a joke");
    assert_eq!(last[2].content(), "Why did the chicken cross the road?");
    assert_eq!(last[3].content(), "why");
}

#[tokio::test]
async fn test_active_session_skips_wake_phrase() {
    let (mut ctl, _log) = controller(
        vec![heard("alice"), heard("hello"), heard("how are you")],
        vec![Ok("Hi!".to_string()), Ok("Great.".to_string())],
        false,
    );

    ctl.step().await;
    assert_eq!(ctl.step().await, CycleOutcome::Responded);

    assert_eq!(
        ctl.recognizer().modes,
        vec![ListenMode::Wake, ListenMode::Command, ListenMode::Command]
    );
    assert_eq!(ctl.context().len(), 5);
    assert_eq!(ctl.speaker().spoken, vec!["How you doing?", "Hi!", "Great."]);
}

#[tokio::test]
async fn test_speech_without_wake_phrase_ignored() {
    let (mut ctl, _log) = controller(vec![heard("just talking to myself")], vec![], false);

    assert_eq!(ctl.step().await, CycleOutcome::Idle);
    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    assert_eq!(ctl.context().len(), 1);
    assert!(ctl.speaker().spoken.is_empty());
}

#[tokio::test]
async fn test_restart_from_active_clears_context() {
    let (mut ctl, _log) = controller(
        vec![
            heard("alice"),
            heard("tell me a joke"),
            heard("why"),
            heard("please restart"),
        ],
        vec![Ok("Knock knock.".to_string()), Ok("Because.".to_string())],
        false,
    );

    ctl.step().await;
    ctl.step().await;
    assert_eq!(ctl.context().len(), 5);

    assert_eq!(ctl.step().await, CycleOutcome::Restarted);
    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    assert_eq!(ctl.context().len(), 1);
    assert_eq!(ctl.context().last().content(), PERSONA);
    assert_eq!(
        ctl.speaker().spoken.last().map(String::as_str),
        Some("I just cleared the context window")
    );
}

#[tokio::test]
async fn test_restart_while_awaiting_wake() {
    let (mut ctl, log) = controller(vec![heard("restart")], vec![], false);

    assert_eq!(ctl.step().await, CycleOutcome::Restarted);
    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    assert_eq!(ctl.context().len(), 1);
    assert_eq!(
        *log.borrow(),
        vec!["listen:wake", "speak:I just cleared the context window"]
    );
}

#[tokio::test]
async fn test_restart_beats_wake_phrase() {
    let (mut ctl, _log) = controller(vec![heard("alice restart")], vec![], false);

    assert_eq!(ctl.step().await, CycleOutcome::Restarted);
    assert_eq!(ctl.speaker().spoken, vec!["I just cleared the context window"]);
}

#[tokio::test]
async fn test_wake_service_error_changes_nothing() {
    let (mut ctl, _log) = controller(
        vec![ListenOutcome::ServiceError("503 from STT".to_string())],
        vec![],
        false,
    );

    assert_eq!(
        ctl.step().await,
        CycleOutcome::Failed(FailureKind::RecognitionService)
    );
    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    assert_eq!(ctl.context().len(), 1);
    assert!(ctl.speaker().spoken.is_empty());
}

#[tokio::test]
async fn test_timeout_while_active_returns_to_waiting() {
    let (mut ctl, _log) = controller(
        vec![heard("alice"), heard("hello"), ListenOutcome::TimedOut],
        vec![Ok("Hi there.".to_string())],
        false,
    );

    ctl.step().await;
    assert_eq!(ctl.state(), SessionState::Active);

    assert_eq!(ctl.step().await, CycleOutcome::NoCommand);
    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    // Transcript survives going dormant
    assert_eq!(ctl.context().len(), 3);
    assert_eq!(ctl.speaker().spoken, vec!["How you doing?", "Hi there."]);
}

#[tokio::test]
async fn test_wake_without_command() {
    let (mut ctl, _log) = controller(
        vec![heard("alice"), ListenOutcome::Unintelligible],
        vec![],
        false,
    );

    assert_eq!(ctl.step().await, CycleOutcome::NoCommand);
    assert_eq!(ctl.state(), SessionState::AwaitingWake);
    assert_eq!(ctl.context().len(), 1);
    assert_eq!(ctl.speaker().spoken, vec!["How you doing?"]);
}

#[tokio::test]
async fn test_vision_request_is_tagged() {
    let (mut ctl, _log) = controller(
        vec![heard("alice"), heard("look at this and tell me what it is")],
        vec![Ok("I can't see yet.".to_string())],
        false,
    );

    assert_eq!(ctl.step().await, CycleOutcome::Responded);

    let user = &ctl.context().snapshot()[1];
    assert!(user.content().starts_with(VISION_TAG));
    assert!(user.content().ends_with("look at this and tell me what it is"));
    assert_eq!(ctl.engine().received.borrow()[0][1], *user);
}

#[tokio::test]
async fn test_completion_failure_leaves_context_untouched() {
    let (mut ctl, log) = controller(
        vec![heard("alice"), heard("hello"), heard("are you there")],
        vec![
            Err(Error::Completion("rate limited".to_string())),
            Ok("I'm here.".to_string()),
        ],
        false,
    );

    assert_eq!(
        ctl.step().await,
        CycleOutcome::Failed(FailureKind::CompletionService)
    );
    assert_eq!(ctl.state(), SessionState::Active);
    assert_eq!(ctl.context().len(), 1);
    assert_eq!(ctl.context().last().role(), Role::System);

    // Nothing spoken after the failed completion
    assert_eq!(log.borrow().last().map(String::as_str), Some("complete:2"));
    assert_eq!(ctl.speaker().spoken, vec!["How you doing?"]);

    // The skipped utterance is not resent with the next one
    assert_eq!(ctl.step().await, CycleOutcome::Responded);
    let received = ctl.engine().received.borrow();
    let roles: Vec<Role> = received[1].iter().map(|t| t.role()).collect();
    assert_eq!(roles, vec![Role::System, Role::User]);
    assert_eq!(received[1][1].content(), "are you there");
    assert_eq!(ctl.context().len(), 3);
}

#[tokio::test]
async fn test_synthesis_failure_does_not_stop_cycle() {
    let (mut ctl, log) = controller(
        vec![heard("alice"), heard("hello")],
        vec![Ok("Hi.".to_string())],
        true,
    );

    assert_eq!(ctl.step().await, CycleOutcome::Responded);
    assert_eq!(ctl.context().len(), 3);
    assert_eq!(
        *log.borrow(),
        vec![
            "listen:wake",
            "speak:How you doing?",
            "listen:command",
            "complete:2",
            "speak:Hi.",
        ]
    );
    assert_eq!(ctl.failures().kind(), Some(FailureKind::SynthesisService));
    assert_eq!(ctl.failures().streak(), 2);
}

#[tokio::test]
async fn test_repeated_recognition_failures_tracked() {
    let error = || ListenOutcome::ServiceError("connection refused".to_string());
    let (mut ctl, _log) = controller(
        vec![error(), error(), error(), heard("nobody here")],
        vec![],
        false,
    );

    for _ in 0..3 {
        ctl.step().await;
    }
    assert_eq!(ctl.failures().kind(), Some(FailureKind::RecognitionService));
    assert_eq!(ctl.failures().streak(), 3);

    // A successful recognition ends the streak
    assert_eq!(ctl.step().await, CycleOutcome::Idle);
    assert_eq!(ctl.failures().streak(), 0);
}

#[tokio::test]
async fn test_only_fresh_text_is_spoken() {
    let (mut ctl, _log) = controller(
        vec![
            heard("alice"),
            heard("hello"),
            heard("restart"),
            heard("alice"),
            ListenOutcome::TimedOut,
        ],
        vec![Ok("Hello yourself.".to_string())],
        false,
    );

    for _ in 0..3 {
        ctl.step().await;
    }

    assert_eq!(
        ctl.speaker().spoken,
        vec![
            "How you doing?",
            "Hello yourself.",
            "I just cleared the context window",
            "How you doing?",
        ]
    );
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let (mut ctl, _log) = controller(
        vec![heard("alice"), heard("hello")],
        vec![Ok("Hi.".to_string())],
        false,
    );
    let (tx, mut rx) = mpsc::channel(1);

    // The recognizer blocks forever once its script runs out
    tokio::join!(ctl.run(&mut rx), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).await.unwrap();
    });

    assert_eq!(ctl.state(), SessionState::Active);
    assert_eq!(ctl.context().len(), 3);
    assert_eq!(ctl.speaker().spoken, vec!["How you doing?", "Hi."]);
}

#[tokio::test]
async fn test_run_stops_when_channel_closed() {
    let (mut ctl, log) = controller(vec![heard("alice")], vec![], false);
    let (tx, mut rx) = mpsc::channel::<()>(1);
    drop(tx);

    ctl.run(&mut rx).await;

    assert!(log.borrow().is_empty());
    assert_eq!(ctl.context().len(), 1);
}
