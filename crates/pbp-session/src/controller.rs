use std::collections::BTreeMap;

use pbp_decoder::{DecodeError, Emission, FragmentSource, IncrementalDecoder, OpenBlock, PartBuffer, StreamingDecoder};
use pbp_types::{Block, BlockKind, FileBlock, FileIdentity};
use pbp_wire::scan;

use crate::backend::Backend;
use crate::conversation::Conversation;
use crate::error::{BackendError, SessionError};

/// Where the controller is within one logical model turn.
///
/// ```text
///   Idle ──▶ Streaming ──▶ StreamEnded ──▶ Done
///               ▲                │
///               │                ▼
///            Resuming ◀── ContinuationRequired ──▶ (stuck: stays here)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Streaming,
    StreamEnded,
    ContinuationRequired,
    Resuming,
    Done,
}

/// A completed turn: the whole response, across continuations, and every
/// file it delivered completely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FinalizedTurn {
    pub full_text: String,
    pub assembled_files: BTreeMap<FileIdentity, String>,
}

#[derive(Debug)]
pub enum TurnOutcome {
    Done(FinalizedTurn),
    /// Automatic continuation gave up. The turn is kept; see
    /// [`ContinuationController::continue_pending`].
    Stuck { attempts: usize },
    /// The backend failed. The turn is kept as for `Stuck`.
    Failed(SessionError),
}

/// Receives a turn's output as it is decoded. Every method defaults to
/// doing nothing.
pub trait TurnObserver {
    fn on_prose(&mut self, _text: &str) {}

    /// A block started arriving; `label` is its path or language once
    /// known.
    fn on_status(&mut self, _kind: BlockKind, _label: Option<&str>) {}

    /// A complete snippet or terminal log.
    fn on_block(&mut self, _block: &Block) {}

    /// A file whose terminator arrived, reassembled from its parts.
    fn on_file(&mut self, _identity: &FileIdentity, _content: &str) {}

    fn on_rejected(&mut self, _error: &DecodeError) {}

    /// A continuation request is about to be sent.
    fn on_continue(&mut self, _attempt: usize, _max: usize) {}
}

impl TurnObserver for () {}

/// In-flight state of the current turn.
#[derive(Debug, Default)]
struct InFlight {
    decoder: IncrementalDecoder,
    parts: PartBuffer,
    /// Response text so far, with truncated file blocks rewritten closed.
    response: String,
    files: BTreeMap<FileIdentity, String>,
}

/// Drives a model turn to completion across truncated responses.
///
/// A response that ends inside a block, or with a file still missing its
/// terminator, is continued: the conversation is sent again together
/// with the partial response and the new text is decoded as if it had
/// followed without a break. A file block cut off after its header is
/// closed on the spot, keeping only its complete lines, so the model can
/// carry on with the next part.
///
/// At most `max_continuations` requests are issued automatically per
/// turn; after that the turn is reported as stuck and kept for a manual
/// [`continue_pending`](Self::continue_pending).
#[derive(Debug)]
pub struct ContinuationController {
    max_continuations: usize,
    state: ControllerState,
    attempts: usize,
    turn: InFlight,
}

impl ContinuationController {
    pub fn new(max_continuations: usize) -> Self {
        Self {
            max_continuations,
            state: ControllerState::Idle,
            attempts: 0,
            turn: InFlight::default(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Continuations issued for the current turn.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Whether an interrupted turn is waiting to be continued.
    pub fn has_pending_turn(&self) -> bool {
        self.state == ControllerState::ContinuationRequired
    }

    /// Response text received so far in the current turn.
    pub fn partial_response(&self) -> &str {
        &self.turn.response
    }

    /// Run a new turn for `conversation`, which already ends with the
    /// user's entry.
    pub async fn run_turn<B, O>(&mut self, backend: &mut B, conversation: &Conversation, observer: &mut O) -> TurnOutcome
    where
        B: Backend,
        O: TurnObserver + ?Sized,
    {
        self.turn = InFlight::default();
        self.attempts = 0;
        self.drive(backend, conversation, observer, conversation.request_text())
            .await
    }

    /// Resume a stuck or failed turn with a fresh continuation budget.
    pub async fn continue_pending<B, O>(
        &mut self,
        backend: &mut B,
        conversation: &Conversation,
        observer: &mut O,
    ) -> TurnOutcome
    where
        B: Backend,
        O: TurnObserver + ?Sized,
    {
        if !self.has_pending_turn() {
            return TurnOutcome::Failed(SessionError::NoPendingTurn);
        }
        self.attempts = 0;
        let context = conversation.continuation_text(&self.turn.response);
        self.drive(backend, conversation, observer, context).await
    }

    /// Forget the current turn. Finished turns are not affected.
    pub fn cancel(&mut self) {
        if !matches!(self.state, ControllerState::Idle | ControllerState::Done) {
            tracing::info!(state = ?self.state, bytes = self.turn.response.len(), "turn cancelled");
        }
        self.turn = InFlight::default();
        self.attempts = 0;
        self.state = ControllerState::Idle;
    }

    async fn drive<B, O>(
        &mut self,
        backend: &mut B,
        conversation: &Conversation,
        observer: &mut O,
        mut context: String,
    ) -> TurnOutcome
    where
        B: Backend,
        O: TurnObserver + ?Sized,
    {
        loop {
            if let Err(e) = self.stream_response(backend, &context, observer).await {
                tracing::warn!(error = %e, "backend request failed");
                self.state = ControllerState::ContinuationRequired;
                return TurnOutcome::Failed(e.into());
            }

            if self.settle(observer) == ControllerState::Done {
                return TurnOutcome::Done(self.finalize(observer));
            }

            self.state = ControllerState::ContinuationRequired;
            if self.attempts >= self.max_continuations {
                tracing::warn!(attempts = self.attempts, "model appears stuck, automatic continuation stopped");
                return TurnOutcome::Stuck {
                    attempts: self.attempts,
                };
            }

            self.attempts += 1;
            self.state = ControllerState::Resuming;
            tracing::info!(attempt = self.attempts, max = self.max_continuations, "response incomplete, requesting continuation");
            observer.on_continue(self.attempts, self.max_continuations);
            context = conversation.continuation_text(&self.turn.response);
        }
    }

    /// One request: stream the response through the turn's decoder.
    async fn stream_response<B, O>(&mut self, backend: &mut B, context: &str, observer: &mut O) -> Result<(), BackendError>
    where
        B: Backend,
        O: TurnObserver + ?Sized,
    {
        self.state = ControllerState::Streaming;
        let source = backend.request(context).await?;

        let InFlight {
            decoder,
            parts,
            response,
            files,
        } = &mut self.turn;
        let recorded = Recorded {
            inner: source,
            text: response,
        };
        let mut stream = StreamingDecoder::with_decoder(recorded, std::mem::take(decoder)).without_final_flush();

        let mut result = Ok(());
        while let Some(item) = stream.next().await {
            match item {
                Ok(emission) => route(emission, parts, files, observer),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        *decoder = stream.into_decoder();

        self.state = ControllerState::StreamEnded;
        result
    }

    /// Decide what a finished stream means for the turn.
    fn settle<O: TurnObserver + ?Sized>(&mut self, observer: &mut O) -> ControllerState {
        if let Some(open) = self.turn.decoder.open_block() {
            let closed = open.kind == BlockKind::File && open.header_closed && self.close_dangling_file(&open, observer);
            if !closed {
                tracing::info!(kind = %open.kind, offset = open.offset, "response ended inside a block");
                return ControllerState::ContinuationRequired;
            }
        }

        let pending = self.turn.parts.pending();
        if !pending.is_empty() {
            tracing::info!(files = pending.len(), "files still missing their terminator");
            return ControllerState::ContinuationRequired;
        }
        ControllerState::Done
    }

    /// Close a file block cut off after its header.
    ///
    /// A content part keeps its complete lines. A terminator block only
    /// lacked its end token and is complete as it is. The response text
    /// is rewritten to hold the closed block in place of the cut one.
    fn close_dangling_file<O: TurnObserver + ?Sized>(&mut self, open: &OpenBlock, observer: &mut O) -> bool {
        let Ok(mut file) = FileBlock::from_header(&open.metadata(), "") else {
            return false;
        };
        if !file.is_terminator() {
            file.content = open.content[..scan::last_line_end(&open.content)].to_string();
        }

        let mut closed = String::new();
        if let Err(e) = file.encode(&mut closed) {
            tracing::warn!(path = %file.path, error = %e, "cannot close truncated file block");
            return false;
        }

        tracing::info!(
            path = %file.path,
            version = file.version,
            part = file.part,
            kept = file.content.len(),
            dropped = open.content.len() - file.content.len(),
            "closed truncated file block"
        );
        let turn = &mut self.turn;
        turn.decoder.take_open_block();
        turn.response.truncate(open.offset);
        turn.response.push_str(&closed);
        turn.decoder.reset_at(turn.response.len());
        accept_file(&file, &mut turn.parts, &mut turn.files, observer);
        true
    }

    fn finalize<O: TurnObserver + ?Sized>(&mut self, observer: &mut O) -> FinalizedTurn {
        let tail = self.turn.decoder.finish();
        for emission in tail {
            route(emission, &mut self.turn.parts, &mut self.turn.files, observer);
        }
        let turn = std::mem::take(&mut self.turn);
        self.state = ControllerState::Done;
        tracing::debug!(bytes = turn.response.len(), files = turn.files.len(), continuations = self.attempts, "turn complete");
        FinalizedTurn {
            full_text: turn.response,
            assembled_files: turn.files,
        }
    }
}

fn route<O: TurnObserver + ?Sized>(
    emission: Emission,
    parts: &mut PartBuffer,
    files: &mut BTreeMap<FileIdentity, String>,
    observer: &mut O,
) {
    match emission {
        Emission::Prose(text) => observer.on_prose(&text),
        Emission::StatusHint { kind, label } => observer.on_status(kind, label.as_deref()),
        Emission::Block {
            block: Block::File(file),
            ..
        } => accept_file(&file, parts, files, observer),
        Emission::Block { block, .. } => observer.on_block(&block),
        Emission::Rejected { error, .. } => observer.on_rejected(&error),
    }
}

fn accept_file<O: TurnObserver + ?Sized>(
    file: &FileBlock,
    parts: &mut PartBuffer,
    files: &mut BTreeMap<FileIdentity, String>,
    observer: &mut O,
) {
    parts.add_block(file);
    if !file.is_terminator() {
        return;
    }
    let identity = file.identity();
    if let Some(content) = parts.assemble(&identity) {
        tracing::info!(%identity, bytes = content.len(), "file complete");
        observer.on_file(&identity, &content);
        files.insert(identity, content);
    }
}

/// Copies every fragment into the turn's response text.
struct Recorded<'a, S> {
    inner: S,
    text: &'a mut String,
}

impl<S: FragmentSource> FragmentSource for Recorded<'_, S> {
    type Error = S::Error;

    async fn next_fragment(&mut self) -> Option<Result<String, S::Error>> {
        let fragment = self.inner.next_fragment().await;
        if let Some(Ok(text)) = &fragment {
            self.text.push_str(text);
        }
        fragment
    }
}
