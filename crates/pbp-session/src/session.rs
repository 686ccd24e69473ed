use pbp_driver::{write_back, DriverConfig, Storage};
use pbp_encoder::tree::file_tree_json;
use pbp_encoder::{ContextEncoder, Preamble};
use pbp_types::FileIdentity;

use crate::backend::Backend;
use crate::config::SessionConfig;
use crate::controller::{ContinuationController, TurnObserver, TurnOutcome};
use crate::conversation::{ContextStats, Conversation};
use crate::error::SessionError;
use crate::history_store::HistoryStore;
use crate::references::{find_references, next_version};

/// What happened to a turn once it left the controller.
#[derive(Debug)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Paths written back to storage (apply mode only).
    pub written: Vec<String>,
    /// Failures that did not stop the turn: file writes, history saves.
    pub problems: Vec<SessionError>,
}

/// One chat with one project.
///
/// Owns the conversation, the backend and the project storage. The REPL
/// feeds it user input and observes the decoded turns:
///
/// ```text
///   submit("fix @app.py")      ← user entry + app.py at its next version
///   run_turn(&mut observer)    ← request, continuations, decode
///     Done → partner entry appended, files written (apply), history saved
/// ```
pub struct Session<B, S> {
    config: SessionConfig,
    driver: DriverConfig,
    backend: B,
    storage: S,
    preamble: Preamble,
    seed_paths: Vec<String>,
    conversation: Conversation,
    controller: ContinuationController,
    history: Option<HistoryStore>,
}

impl<B: Backend, S: Storage> Session<B, S> {
    pub fn new(config: SessionConfig, driver: DriverConfig, backend: B, storage: S) -> Self {
        let preamble = Preamble::default();
        let conversation = Conversation::new(preamble.render("", ""), &config);
        Self {
            controller: ContinuationController::new(config.max_continuations),
            config,
            driver,
            backend,
            storage,
            preamble,
            seed_paths: Vec::new(),
            conversation,
            history: None,
        }
    }

    /// Use `preamble` with the files at `seed_paths` as project context,
    /// starting a fresh conversation.
    ///
    /// # Errors
    ///
    /// [`SessionError::Encode`] when a seed file cannot be framed.
    pub fn with_preamble(mut self, preamble: Preamble, seed_paths: Vec<String>) -> Result<Self, SessionError> {
        self.preamble = preamble;
        self.seed_paths = seed_paths;
        self.conversation = Conversation::new(self.render_preamble()?, &self.config);
        Ok(self)
    }

    /// Save the conversation to `store` after every change.
    #[must_use]
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(store);
        self
    }

    /// Replace the conversation with the saved one, if there is any.
    ///
    /// # Errors
    ///
    /// [`SessionError::History`] when the saved file cannot be read.
    pub fn resume(&mut self) -> Result<bool, SessionError> {
        let Some(store) = &self.history else {
            return Ok(false);
        };
        match store.load()? {
            Some(text) => {
                tracing::info!(path = %store.path().display(), bytes = text.len(), "conversation resumed");
                self.conversation = Conversation::new(text, &self.config);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn controller(&self) -> &ContinuationController {
        &self.controller
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn driver_config(&self) -> &DriverConfig {
        &self.driver
    }

    pub fn stats(&self) -> ContextStats {
        self.conversation.stats()
    }

    /// Add a user entry. Files mentioned as `@path` that exist in storage
    /// follow it as file blocks, each at the next version for its path.
    ///
    /// Returns the injected identities.
    ///
    /// # Errors
    ///
    /// [`SessionError::Encode`] for an invalid part limit.
    pub fn submit(&mut self, input: &str) -> Result<Vec<FileIdentity>, SessionError> {
        let mut encoder = ContextEncoder::new();
        if let Some(limit) = self.config.part_limit {
            encoder.split_parts_at(limit)?;
        }

        let mut injected = Vec::new();
        for path in find_references(input) {
            let content = match self.storage.read(&path) {
                Ok(Some(content)) => content,
                Ok(None) => {
                    tracing::warn!(path, "referenced file does not exist");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "referenced file could not be read");
                    continue;
                }
            };
            let version = next_version(self.conversation.text(), &path);
            if let Err(e) = encoder.add_file(&path, version, &content) {
                tracing::warn!(path, error = %e, "referenced file cannot be sent");
                continue;
            }
            tracing::info!(path, version, "referenced file added");
            injected.push(FileIdentity::new(path, version));
        }

        self.conversation.push_user(input);
        self.conversation.push_raw(encoder.as_str());
        Ok(injected)
    }

    /// Ask the model to answer the conversation so far.
    pub async fn run_turn<O: TurnObserver + ?Sized>(&mut self, observer: &mut O) -> TurnReport {
        let outcome = self
            .controller
            .run_turn(&mut self.backend, &self.conversation, observer)
            .await;
        self.conclude(outcome)
    }

    /// Retry a stuck or failed turn (the `$continue` command).
    pub async fn continue_turn<O: TurnObserver + ?Sized>(&mut self, observer: &mut O) -> TurnReport {
        let outcome = self
            .controller
            .continue_pending(&mut self.backend, &self.conversation, observer)
            .await;
        self.conclude(outcome)
    }

    /// Drop the turn in flight. The conversation and written files are
    /// left as they are.
    pub fn cancel(&mut self) {
        self.controller.cancel();
    }

    /// Start over from the preamble.
    ///
    /// # Errors
    ///
    /// Preamble rendering or history save failures.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.controller.cancel();
        self.conversation = Conversation::new(self.render_preamble()?, &self.config);
        tracing::info!("conversation reset");
        self.save()
    }

    /// Re-read the seed files into the preamble, keeping the
    /// conversation.
    ///
    /// # Errors
    ///
    /// Preamble rendering or history save failures.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let preamble = self.render_preamble()?;
        self.conversation.replace_preamble(&preamble);
        tracing::info!(files = self.seed_paths.len(), "preamble refreshed");
        self.save()
    }

    /// Remove superseded file versions from the conversation.
    ///
    /// # Errors
    ///
    /// History save failures.
    pub fn compact(&mut self) -> Result<ContextStats, SessionError> {
        self.conversation.compact();
        self.save()?;
        Ok(self.stats())
    }

    /// Write the conversation to the history file, if there is one.
    ///
    /// # Errors
    ///
    /// [`SessionError::History`].
    pub fn save(&self) -> Result<(), SessionError> {
        match &self.history {
            Some(store) => store.save(self.conversation.text()),
            None => Ok(()),
        }
    }

    fn conclude(&mut self, outcome: TurnOutcome) -> TurnReport {
        let mut report = TurnReport {
            outcome,
            written: Vec::new(),
            problems: Vec::new(),
        };
        let TurnOutcome::Done(turn) = &report.outcome else {
            if let TurnOutcome::Stuck { attempts } = report.outcome {
                report.problems.push(SessionError::Stuck { attempts });
            }
            return report;
        };

        self.conversation.push_partner(&turn.full_text);

        if self.driver.apply {
            for (identity, content) in &turn.assembled_files {
                match write_back(&identity.path, content, &mut self.storage) {
                    Ok(()) => report.written.push(identity.path.clone()),
                    Err(e) => {
                        tracing::error!(%identity, error = %e, "write failed");
                        report.problems.push(e.into());
                    }
                }
            }
        }

        if let Err(e) = self.save() {
            tracing::error!(error = %e, "could not save history");
            report.problems.push(e);
        }

        let stats = self.stats();
        tracing::info!(lines = stats.lines, characters = stats.characters, "context size");
        report
    }

    fn render_preamble(&self) -> Result<String, SessionError> {
        let mut encoder = ContextEncoder::new();
        if let Some(limit) = self.config.part_limit {
            encoder.split_parts_at(limit)?;
        }
        let mut listed = Vec::new();
        for path in &self.seed_paths {
            match self.storage.read(path) {
                Ok(Some(content)) => {
                    encoder.add_file(path, 1, &content)?;
                    listed.push(path.as_str());
                }
                Ok(None) => tracing::warn!(path, "context file does not exist"),
                Err(e) => tracing::warn!(path, error = %e, "context file could not be read"),
            }
        }
        let tree = if listed.is_empty() {
            String::new()
        } else {
            file_tree_json(listed)?
        };
        Ok(self.preamble.render(&tree, encoder.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use pbp_driver::MemoryStorage;
    use pbp_types::FileBlock;

    use super::*;
    use crate::backend::ScriptedBackend;

    fn answer(path: &str, version: u32, content: &str) -> String {
        let mut encoder = ContextEncoder::new();
        encoder.add_text("Updated.\n");
        encoder.add_file(path, version, content).unwrap();
        encoder.finish()
    }

    fn apply() -> DriverConfig {
        DriverConfig {
            apply: true,
            ..DriverConfig::default()
        }
    }

    #[tokio::test]
    async fn referenced_file_goes_out_at_next_version_and_answer_is_applied() {
        let storage = MemoryStorage::new().with_file("app.py", "x = 1\n");
        let backend = ScriptedBackend::new([answer("app.py", 2, "x = 2\n")]);
        let mut session = Session::new(SessionConfig::default(), apply(), backend, storage)
            .with_preamble(Preamble::default(), vec!["app.py".to_string()])
            .unwrap();

        let injected = session.submit("bump @app.py.").unwrap();
        assert_eq!(injected, vec![FileIdentity::new("app.py", 2)]);

        let report = session.run_turn(&mut ()).await;
        assert!(matches!(report.outcome, TurnOutcome::Done(_)));
        assert!(report.problems.is_empty());
        assert_eq!(report.written, vec!["app.py".to_string()]);
        assert_eq!(session.storage().get("app.py"), Some("x = 2\n"));

        let request = &session.backend().requests()[0];
        assert!(request.contains("Path: app.py\nLanguage: python\nVersion: 2\nPart: 1\n"));
        let text = session.conversation().text();
        assert!(text.contains("\n**user:**\n\nbump @app.py.\n"));
        assert!(text.contains("\n**partner:**\n\nUpdated.\n"));
    }

    #[tokio::test]
    async fn without_apply_nothing_is_written() {
        let storage = MemoryStorage::new();
        let backend = ScriptedBackend::new([answer("new.py", 1, "print(1)\n")]);
        let mut session = Session::new(SessionConfig::default(), DriverConfig::default(), backend, storage);
        session.submit("make new.py").unwrap();
        let report = session.run_turn(&mut ()).await;
        let TurnOutcome::Done(turn) = report.outcome else {
            panic!("turn did not finish");
        };
        assert_eq!(turn.assembled_files.len(), 1);
        assert!(report.written.is_empty());
        assert!(session.storage().get("new.py").is_none());
    }

    #[tokio::test]
    async fn write_failures_are_reported_per_file() {
        let storage = MemoryStorage::new().with_read_only("locked.py");
        let mut response = answer("locked.py", 1, "a\n");
        response.push_str(&answer("open.py", 1, "b\n"));
        let backend = ScriptedBackend::new([response]);
        let mut session = Session::new(SessionConfig::default(), apply(), backend, storage);
        session.submit("two files").unwrap();

        let report = session.run_turn(&mut ()).await;
        assert_eq!(report.written, vec!["open.py".to_string()]);
        assert_eq!(report.problems.len(), 1);
        assert!(matches!(report.problems[0], SessionError::Driver(_)));
        assert_eq!(session.storage().get("open.py"), Some("b\n"));
    }

    #[tokio::test]
    async fn stuck_turn_leaves_conversation_untouched() {
        let config = SessionConfig {
            max_continuations: 1,
            ..SessionConfig::default()
        };
        let mut part = String::new();
        FileBlock::part("big.txt", 1, 1, "a\n").encode(&mut part).unwrap();
        let backend = ScriptedBackend::new([part.clone(), part]);
        let mut session = Session::new(config, DriverConfig::default(), backend, MemoryStorage::new());
        session.submit("write big.txt").unwrap();
        let before = session.conversation().text().to_string();

        let report = session.run_turn(&mut ()).await;
        assert!(matches!(report.outcome, TurnOutcome::Stuck { attempts: 1 }));
        assert!(matches!(report.problems.as_slice(), [SessionError::Stuck { attempts: 1 }]));
        assert_eq!(session.conversation().text(), before);
        assert!(session.controller().has_pending_turn());

        session.cancel();
        assert!(!session.controller().has_pending_turn());
        assert_eq!(session.conversation().text(), before);
    }

    #[tokio::test]
    async fn history_is_saved_and_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.txt"));
        let backend = ScriptedBackend::new(["Sure.\n"]);
        let mut session = Session::new(SessionConfig::default(), DriverConfig::default(), backend, MemoryStorage::new())
            .with_history(store.clone());
        session.submit("hello").unwrap();
        session.run_turn(&mut ()).await;

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved, session.conversation().text());

        let mut resumed = Session::new(
            SessionConfig::default(),
            DriverConfig::default(),
            ScriptedBackend::new(Vec::<String>::new()),
            MemoryStorage::new(),
        )
        .with_history(store);
        assert!(resumed.resume().unwrap());
        assert_eq!(resumed.conversation().text(), saved);
    }

    #[test]
    fn refresh_and_reset_rebuild_the_preamble() {
        let storage = MemoryStorage::new().with_file("lib.rs", "pub fn old() {}\n");
        let mut session = Session::new(
            SessionConfig::default(),
            DriverConfig::default(),
            ScriptedBackend::new(Vec::<String>::new()),
            storage,
        )
        .with_preamble(Preamble::new("Files:{{{FILE_REFERENCES}}}"), vec!["lib.rs".to_string()])
        .unwrap();
        session.submit("hi").unwrap();

        session.storage = MemoryStorage::new().with_file("lib.rs", "pub fn new() {}\n");
        session.refresh().unwrap();
        let text = session.conversation().text();
        assert!(text.contains("pub fn new() {}"));
        assert!(!text.contains("pub fn old() {}"));
        assert!(text.contains("**user:**\n\nhi\n"));

        session.reset().unwrap();
        assert!(!session.conversation().text().contains("**user:**"));
        assert!(session.conversation().text().contains("pub fn new() {}"));
    }
}
