//! Async pull loop over a byte-chunk source.
//!
//! Reads one chunk, feeds the assembler, hands out the resulting events, and
//! only then awaits the next chunk. Chunks and the records inside them are
//! therefore processed strictly in order.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};

use crate::domain::AssemblyEvent;

use super::assembler::{Assembler, BoundaryMode};
use super::envelope::{ChatCompletionsEnvelope, EnvelopeDecoder};

/// Lazily produced event sequence for one upstream response.
///
/// Owns its [`Assembler`] exclusively. A source error ends the sequence:
/// the error is returned once, all assembly state is discarded, and no
/// terminal event follows.
pub struct EventStream<S, D = ChatCompletionsEnvelope> {
    source: S,
    assembler: Option<Assembler<D>>,
    pending: VecDeque<AssemblyEvent>,
}

impl<S> EventStream<S> {
    /// Demultiplex a chat-completions stream
    pub fn new(source: S, boundary: BoundaryMode) -> Self {
        Self::with_assembler(source, Assembler::new().with_boundary(boundary))
    }
}

impl<S, D> EventStream<S, D> {
    /// Demultiplex with a preconfigured assembler
    pub fn with_assembler(source: S, assembler: Assembler<D>) -> Self {
        Self {
            source,
            assembler: Some(assembler),
            pending: VecDeque::new(),
        }
    }
}

impl<S, B, E, D> EventStream<S, D>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    D: EnvelopeDecoder,
{
    /// Await the next event.
    ///
    /// Returns `None` once the source has ended and the terminal event (if
    /// any) has been handed out, or after a source error.
    pub async fn next_event(&mut self) -> Option<Result<AssemblyEvent, E>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            let assembler = self.assembler.as_mut()?;
            match self.source.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(assembler.feed(chunk.as_ref()));
                }
                Some(Err(e)) => {
                    self.assembler = None;
                    return Some(Err(e));
                }
                None => {
                    return self
                        .assembler
                        .take()
                        .and_then(|assembler| assembler.finish())
                        .map(Ok);
                }
            }
        }
    }

    /// Adapt into a [`Stream`] of events
    pub fn into_stream(self) -> impl Stream<Item = Result<AssemblyEvent, E>> {
        futures::stream::unfold(self, |mut events| async move {
            let item = events.next_event().await?;
            Some((item, events))
        })
    }
}
