use std::collections::VecDeque;
use std::convert::Infallible;

use pbp_wire::scan;

use crate::incremental::{Emission, IncrementalDecoder};

/// A source of text fragments, e.g. a model response arriving over a
/// pipe or a socket.
///
/// `None` marks the end of the turn. Fragment boundaries carry no
/// meaning.
#[allow(async_fn_in_trait)]
pub trait FragmentSource {
  type Error;

  async fn next_fragment(&mut self) -> Option<Result<String, Self::Error>>;
}

/// Replays a fixed text in chunks of at most `chunk` bytes, never
/// splitting a character.
#[derive(Clone, Debug)]
pub struct TextChunks {
  text: String,
  chunk: usize,
  pos: usize,
}

impl TextChunks {
  pub fn new(text: impl Into<String>, chunk: usize) -> Self {
    Self {
      text: text.into(),
      chunk: chunk.max(1),
      pos: 0,
    }
  }
}

impl Iterator for TextChunks {
  type Item = String;

  fn next(&mut self) -> Option<String> {
    if self.pos >= self.text.len() {
      return None;
    }
    let mut end = scan::floor_char_boundary(&self.text, self.pos + self.chunk);
    if end == self.pos {
      end = self.text[self.pos..]
        .char_indices()
        .nth(1)
        .map_or(self.text.len(), |(idx, _)| self.pos + idx);
    }
    let piece = self.text[self.pos..end].to_string();
    self.pos = end;
    Some(piece)
  }
}

impl FragmentSource for TextChunks {
  type Error = Infallible;

  async fn next_fragment(&mut self) -> Option<Result<String, Infallible>> {
    self.next().map(Ok)
  }
}

/// Pulls fragments from a [`FragmentSource`] and yields decoder
/// emissions one at a time.
///
/// When the source ends, any retained partial prose line is flushed and
/// the stream is exhausted. A block still open at that point is left in
/// the inner decoder for the caller to inspect via
/// [`decoder`](Self::decoder).
///
/// # Example
///
/// ```rust
/// use pbp_decoder::{Emission, StreamingDecoder};
/// use pbp_decoder::streaming::TextChunks;
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// rt.block_on(async {
///     let source = TextChunks::new("hello\nworld", 3);
///     let mut stream = StreamingDecoder::new(source);
///     let mut prose = String::new();
///     while let Some(Ok(emission)) = stream.next().await {
///         if let Emission::Prose(text) = emission {
///             prose.push_str(&text);
///         }
///     }
///     assert_eq!(prose, "hello\nworld");
/// });
/// ```
pub struct StreamingDecoder<S> {
  source: S,
  decoder: IncrementalDecoder,
  queue: VecDeque<Emission>,
  state: StreamState,
  flush_at_end: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
  Reading,
  Done,
}

impl<S: FragmentSource> StreamingDecoder<S> {
  #[must_use]
  pub fn new(source: S) -> Self {
    Self::with_decoder(source, IncrementalDecoder::new())
  }

  /// Continue decoding with an existing decoder, e.g. one left inside a
  /// block by the previous response of the same turn.
  #[must_use]
  pub fn with_decoder(source: S, decoder: IncrementalDecoder) -> Self {
    Self {
      source,
      decoder,
      queue: VecDeque::new(),
      state: StreamState::Reading,
      flush_at_end: true,
    }
  }

  /// Keep a trailing partial line buffered when the source ends, for a
  /// source whose text is continued by another one.
  #[must_use]
  pub fn without_final_flush(mut self) -> Self {
    self.flush_at_end = false;
    self
  }

  /// Next emission, `None` once the source is exhausted and everything
  /// has been yielded. Source errors are passed through; the stream can
  /// be polled again afterwards.
  pub async fn next(&mut self) -> Option<Result<Emission, S::Error>> {
    loop {
      if let Some(emission) = self.queue.pop_front() {
        return Some(Ok(emission));
      }
      if self.state == StreamState::Done {
        return None;
      }
      match self.source.next_fragment().await {
        Some(Ok(fragment)) => self.queue.extend(self.decoder.feed(&fragment)),
        Some(Err(e)) => return Some(Err(e)),
        None => {
          self.state = StreamState::Done;
          if self.flush_at_end {
            self.queue.extend(self.decoder.finish());
          }
        }
      }
    }
  }

  pub fn decoder(&self) -> &IncrementalDecoder {
    &self.decoder
  }

  pub fn into_decoder(self) -> IncrementalDecoder {
    self.decoder
  }
}
