use std::collections::VecDeque;
use std::process::Stdio;

use pbp_decoder::{FragmentSource, TextChunks};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::error::BackendError;

/// A model that answers a textual context with a stream of fragments.
///
/// One call is one request. The returned source yields the response
/// text and ends (`None`) at end of turn, whether or not the response
/// was complete.
#[allow(async_fn_in_trait)]
pub trait Backend {
    type Source: FragmentSource<Error = BackendError>;

    async fn request(&mut self, context: &str) -> Result<Self::Source, BackendError>;
}

/// Replays canned responses, one per request, in fixed-size fragments.
///
/// Every request context is recorded for inspection.
#[derive(Clone, Debug)]
pub struct ScriptedBackend {
    responses: VecDeque<String>,
    chunk: usize,
    requests: Vec<String>,
}

impl ScriptedBackend {
    pub fn new<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            chunk: 64,
            requests: Vec::new(),
        }
    }

    /// Fragment size in bytes (never splitting a character).
    #[must_use]
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    /// Queue another response.
    pub fn push_response(&mut self, response: impl Into<String>) {
        self.responses.push_back(response.into());
    }

    /// Contexts received so far, oldest first.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

/// Fragments of one scripted response.
#[derive(Clone, Debug)]
pub struct ScriptedSource(TextChunks);

impl FragmentSource for ScriptedSource {
    type Error = BackendError;

    async fn next_fragment(&mut self) -> Option<Result<String, BackendError>> {
        self.0.next().map(Ok)
    }
}

impl Backend for ScriptedBackend {
    type Source = ScriptedSource;

    async fn request(&mut self, context: &str) -> Result<ScriptedSource, BackendError> {
        self.requests.push(context.to_string());
        let Some(response) = self.responses.pop_front() else {
            return Err(BackendError::Exhausted {
                request: self.requests.len(),
            });
        };
        tracing::debug!(request = self.requests.len(), bytes = response.len(), "replaying scripted response");
        Ok(ScriptedSource(TextChunks::new(response, self.chunk)))
    }
}

/// Runs an external command per request.
///
/// The context is written to the command's stdin and its stdout is
/// streamed back as the response. A non-zero exit is reported as
/// [`BackendError::Exit`] carrying the command's stderr.
#[derive(Clone, Debug)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandBackend {
    pub fn new<I, T>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
        }
    }

    /// Split a whitespace-separated command line. `None` when it is
    /// blank.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words))
    }

    /// Set an environment variable for every spawned command.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Backend for CommandBackend {
    type Source = CommandSource;

    async fn request(&mut self, context: &str) -> Result<CommandSource, BackendError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!(program = %self.program, bytes = context.len(), "backend command started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("backend stdout was not captured"))?;

        let writer = child.stdin.take().map(|mut stdin| {
            let context = context.to_string();
            tokio::spawn(async move {
                stdin.write_all(context.as_bytes()).await?;
                stdin.shutdown().await
            })
        });

        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                if let Err(e) = stderr.read_to_string(&mut text).await {
                    tracing::debug!(error = %e, "could not read backend stderr");
                }
                text
            })
        });

        Ok(CommandSource {
            child,
            stdout,
            writer,
            stderr,
            pending: Vec::new(),
            finished: false,
            exit_error: None,
        })
    }
}

/// Stdout of one running backend command.
#[derive(Debug)]
pub struct CommandSource {
    child: Child,
    stdout: ChildStdout,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    stderr: Option<JoinHandle<String>>,
    /// Bytes of a character split across reads.
    pending: Vec<u8>,
    finished: bool,
    /// A failed exit seen while the last text was still to be yielded.
    exit_error: Option<BackendError>,
}

impl CommandSource {
    /// Take the longest decodable prefix of the pending bytes. Invalid
    /// sequences are replaced rather than held back.
    fn take_text(&mut self, at_end: bool) -> Option<String> {
        let usable = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() && !at_end => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        if usable == 0 {
            return None;
        }
        let bytes: Vec<u8> = self.pending.drain(..usable).collect();
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn exit(&mut self) -> Result<(), BackendError> {
        let status = self.child.wait().await?;
        if let Some(writer) = self.writer.take() {
            if let Ok(Err(e)) = writer.await {
                tracing::debug!(error = %e, "backend did not read the whole request");
            }
        }
        if status.success() {
            return Ok(());
        }
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        Err(BackendError::Exit {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

impl FragmentSource for CommandSource {
    type Error = BackendError;

    async fn next_fragment(&mut self) -> Option<Result<String, BackendError>> {
        if self.finished {
            return self.exit_error.take().map(Err);
        }
        let mut chunk = [0u8; 4096];
        loop {
            match self.stdout.read(&mut chunk).await {
                Ok(0) => {
                    self.finished = true;
                    let tail = self.take_text(true);
                    return match (self.exit().await, tail) {
                        (Ok(()), tail) => tail.map(Ok),
                        (Err(e), Some(tail)) => {
                            self.exit_error = Some(e);
                            Some(Ok(tail))
                        }
                        (Err(e), None) => Some(Err(e)),
                    };
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Some(text) = self.take_text(false) {
                        return Some(Ok(text));
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect<S: FragmentSource<Error = BackendError>>(mut source: S) -> Result<String, BackendError> {
        let mut text = String::new();
        while let Some(fragment) = source.next_fragment().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    #[tokio::test]
    async fn scripted_backend_replays_in_order_and_records_requests() {
        let mut backend = ScriptedBackend::new(["first answer", "second"]).with_chunk(4);
        let first = collect(backend.request("ctx 1").await.unwrap()).await.unwrap();
        let second = collect(backend.request("ctx 2").await.unwrap()).await.unwrap();
        assert_eq!(first, "first answer");
        assert_eq!(second, "second");
        assert_eq!(backend.requests(), ["ctx 1", "ctx 2"]);

        assert!(matches!(
            backend.request("ctx 3").await,
            Err(BackendError::Exhausted { request: 3 })
        ));
    }

    #[tokio::test]
    async fn command_backend_streams_stdout() {
        let mut backend = CommandBackend::new("cat", Vec::<String>::new());
        let source = backend.request("echoed back\nby cat\n").await.unwrap();
        assert_eq!(collect(source).await.unwrap(), "echoed back\nby cat\n");
    }

    #[tokio::test]
    async fn command_backend_reports_failed_exit() {
        let mut backend = CommandBackend::new("sh", ["-c", "echo partial; echo broken >&2; exit 3"]);
        let source = backend.request("").await.unwrap();
        match collect(source).await {
            Err(BackendError::Exit { stderr, .. }) => assert_eq!(stderr, "broken"),
            other => panic!("expected exit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn trailing_bytes_arrive_before_the_exit_error() {
        let mut backend = CommandBackend::new("sh", ["-c", "printf 'ok\\303'; exit 3"]);
        let mut source = backend.request("").await.unwrap();
        let mut text = String::new();
        let mut failure = None;
        while let Some(fragment) = source.next_fragment().await {
            assert!(failure.is_none(), "fragment after the exit error");
            match fragment {
                Ok(fragment) => text.push_str(&fragment),
                Err(e) => failure = Some(e),
            }
        }
        assert_eq!(text, "ok\u{FFFD}");
        assert!(matches!(failure, Some(BackendError::Exit { .. })));
    }

    #[tokio::test]
    async fn command_backend_missing_program() {
        let mut backend = CommandBackend::new("pbp-no-such-backend-program", Vec::<String>::new());
        assert!(matches!(
            backend.request("x").await,
            Err(BackendError::Spawn { .. })
        ));
    }

    #[test]
    fn parse_splits_words() {
        let backend = CommandBackend::parse("  llm  -m  fast ").unwrap();
        assert_eq!(backend.program(), "llm");
        assert_eq!(backend.args, ["-m", "fast"]);
        assert!(CommandBackend::parse("   ").is_none());
    }
}
