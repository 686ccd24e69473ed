//! End-to-end turns: scripted and command backends, truncation,
//! continuation, write-back and saved history.

use std::fs;

use pbp_decoder::BlockDecoder;
use pbp_driver::{DiskStorage, DriverConfig};
use pbp_encoder::Preamble;
use pbp_session::{
    CommandBackend, ContinuationController, Conversation, HistoryStore, ScriptedBackend, Session, SessionConfig,
    SessionError, TurnOutcome,
};
use pbp_tests::golden;
use pbp_types::FileIdentity;
use pbp_wire::token::CONVERSATION_END;
use pretty_assertions::assert_eq;

const CALC_V2: &str = "def add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return a - b\n";

/// The cut-off part as the controller closes it: complete lines only.
const CLOSED_PART: &str = "{{{START FILE METADATA}}}\nPath: calc.py\nVersion: 2\nPart: 1\n{{{END FILE METADATA}}}\n\
                           def add(a, b):\n    return a + b\n\ndef sub(a, b):\n{{{END OF FILE}}}\n";

fn conversation() -> Conversation {
    let mut conversation = Conversation::new("{{{CONVERSATION_HISTORY START}}}\n", &SessionConfig::default());
    conversation.push_user("add sub to calc.py");
    conversation
}

fn apply() -> DriverConfig {
    DriverConfig {
        apply: true,
        ..DriverConfig::default()
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn truncated_part_is_closed_and_continued() {
    let mut backend = ScriptedBackend::new([golden("truncated.txt"), golden("truncated_rest.txt")]).with_chunk(5);
    let mut controller = ContinuationController::new(5);
    let conversation = conversation();

    let TurnOutcome::Done(turn) = controller.run_turn(&mut backend, &conversation, &mut ()).await else {
        panic!("turn should complete");
    };

    assert_eq!(controller.attempts(), 1);
    assert_eq!(
        turn.assembled_files.get(&FileIdentity::new("calc.py", 2)).map(String::as_str),
        Some(CALC_V2)
    );

    let partial = format!("Here is the module.\n{CLOSED_PART}");
    assert_eq!(turn.full_text, format!("{partial}{}", golden("truncated_rest.txt")));

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], conversation.request_text());
    assert_eq!(requests[1], conversation.continuation_text(&partial));
    assert!(requests[1].ends_with(&format!("{CONVERSATION_END}\n")));

    // The stitched response is itself well formed.
    let decoded = BlockDecoder::decode(&turn.full_text);
    assert!(decoded.problems().is_empty());
    assert!(decoded.open.is_none());
}

#[tokio::test]
async fn chunk_size_does_not_change_the_turn() {
    let mut expected = None;
    for chunk in [1, 2, 3, 17, 64, 1 << 16] {
        let mut backend =
            ScriptedBackend::new([golden("truncated.txt"), golden("truncated_rest.txt")]).with_chunk(chunk);
        let mut controller = ContinuationController::new(5);
        let TurnOutcome::Done(turn) = controller.run_turn(&mut backend, &conversation(), &mut ()).await else {
            panic!("turn should complete with chunks of {chunk}");
        };
        match &expected {
            None => expected = Some(turn),
            Some(first) => assert_eq!(&turn, first, "chunks of {chunk}"),
        }
    }
}

#[tokio::test]
async fn repeated_truncation_trips_the_breaker() {
    let mut backend = ScriptedBackend::new(vec![golden("truncated.txt"); 6]);
    let mut controller = ContinuationController::new(5);
    let conversation = conversation();

    let outcome = controller.run_turn(&mut backend, &conversation, &mut ()).await;
    assert!(matches!(outcome, TurnOutcome::Stuck { attempts: 5 }));
    assert_eq!(backend.requests().len(), 6);
    assert!(controller.has_pending_turn());

    backend.push_response(golden("truncated_rest.txt"));
    let TurnOutcome::Done(turn) = controller.continue_pending(&mut backend, &conversation, &mut ()).await else {
        panic!("manual continuation should complete the turn");
    };
    assert_eq!(backend.requests().len(), 7);
    assert_eq!(
        turn.assembled_files.get(&FileIdentity::new("calc.py", 2)).map(String::as_str),
        Some(CALC_V2)
    );
}

#[tokio::test]
async fn nothing_to_continue_without_a_stuck_turn() {
    let mut backend = ScriptedBackend::new([golden("single_file.txt")]);
    let mut controller = ContinuationController::new(5);
    let outcome = controller.continue_pending(&mut backend, &conversation(), &mut ()).await;
    assert!(matches!(outcome, TurnOutcome::Failed(SessionError::NoPendingTurn)));
    assert!(backend.requests().is_empty());
}

// ── Session ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_turn_writes_files_and_saves_history() {
    let project = tempfile::tempdir().unwrap();
    let history = tempfile::tempdir().unwrap();
    fs::write(project.path().join("calc.py"), "def add(a, b):\n    return a + b\n").unwrap();

    let backend = ScriptedBackend::new([golden("truncated.txt"), golden("truncated_rest.txt")]).with_chunk(11);
    let mut session = Session::new(SessionConfig::default(), apply(), backend, DiskStorage::new(project.path()))
        .with_preamble(Preamble::new("Pair programming.\n"), Vec::new())
        .unwrap()
        .with_history(HistoryStore::for_project(history.path(), project.path()));

    let injected = session.submit("add sub to @calc.py").unwrap();
    assert_eq!(injected, vec![FileIdentity::new("calc.py", 1)]);

    let report = session.run_turn(&mut ()).await;
    assert!(matches!(report.outcome, TurnOutcome::Done(_)));
    assert!(report.problems.is_empty(), "{:?}", report.problems);
    assert_eq!(report.written, ["calc.py"]);
    assert_eq!(fs::read_to_string(project.path().join("calc.py")).unwrap(), CALC_V2);

    let text = session.conversation().text().to_string();
    assert!(text.starts_with("Pair programming.\n{{{CONVERSATION_HISTORY START}}}\n"));
    assert!(text.contains("\n**user:**\n\nadd sub to @calc.py\n"));
    assert!(text.contains(&format!("\n**partner:**\n\nHere is the module.\n{CLOSED_PART}")));
    assert!(text.ends_with("Both functions are in place.\n\n"));

    // A second session over the same project picks the conversation up.
    let mut resumed = Session::new(
        SessionConfig::default(),
        DriverConfig::default(),
        ScriptedBackend::new(Vec::<String>::new()),
        DiskStorage::new(project.path()),
    )
    .with_history(HistoryStore::for_project(history.path(), project.path()));
    assert!(resumed.resume().unwrap());
    assert_eq!(resumed.conversation().text(), text);

    // Compaction drops the v1 copy sent with the question.
    let before = resumed.stats();
    let after = resumed.compact().unwrap();
    assert!(after.characters < before.characters);
    let compacted = resumed.conversation().text();
    assert!(!compacted.contains("Version: 1\n"));
    assert!(compacted.contains("Version: 2\n"));
    assert!(compacted.contains("\n**user:**\n\nadd sub to @calc.py\n"));
}

#[tokio::test]
async fn stuck_session_leaves_disk_and_conversation_alone() {
    let project = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        max_continuations: 1,
        ..SessionConfig::default()
    };
    let backend = ScriptedBackend::new(vec![golden("truncated.txt"); 2]);
    let mut session = Session::new(config, apply(), backend, DiskStorage::new(project.path()));
    session.submit("write calc.py").unwrap();
    let before = session.conversation().clone();

    let report = session.run_turn(&mut ()).await;
    assert!(matches!(report.outcome, TurnOutcome::Stuck { attempts: 1 }));
    assert!(matches!(report.problems.as_slice(), [SessionError::Stuck { attempts: 1 }]));
    assert!(report.written.is_empty());
    assert_eq!(session.conversation(), &before);
    assert!(!project.path().join("calc.py").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn command_backend_streams_a_response_from_a_process() {
    let project = tempfile::tempdir().unwrap();
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/golden/single_file.txt");
    let script = format!("cat > /dev/null; cat '{}'", fixture.display());
    let backend = CommandBackend::new("sh", ["-c", script.as_str()]);

    let mut session = Session::new(SessionConfig::default(), apply(), backend, DiskStorage::new(project.path()));
    session.submit("write a greeting").unwrap();
    let report = session.run_turn(&mut ()).await;

    let TurnOutcome::Done(turn) = &report.outcome else {
        panic!("turn should complete: {:?}", report.outcome);
    };
    assert_eq!(turn.full_text, golden("single_file.txt"));
    assert_eq!(report.written, ["src/greet.py"]);
    let written = fs::read_to_string(project.path().join("src/greet.py")).unwrap();
    assert!(written.starts_with("def greet(name):\n"));
}
