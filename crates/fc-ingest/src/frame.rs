//! The per-device frame chain.
//!
//! A [`Frame`] is a node in a singly linked, append-only chain. It starts out
//! empty, is filled by the reassembler, and is completed exactly once. The
//! completion publishes the frame's data *and* the link to a freshly
//! allocated successor in a single [`OnceLock`] write, so a reader that
//! observes a completed frame always sees its final payload and its `next`
//! pointer. Readers never lock; they wait on the frame's [`Notify`].
//!
//! Links to successors are weak. Completed frames are kept alive by the
//! device's bounded retention window and by readers positioned on them, so
//! a reader that stops polling pins its own frame and nothing after it.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

/// The immutable contents of a completed frame.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Protocol frame number carried by the frame's first chunk.
    pub number: u16,
    /// Position of the frame in its device's chain, starting at 0.
    pub seq: u64,
    /// Set when a chunk gap, reorder or overflow was detected.
    pub damaged: bool,
    /// Reassembled JPEG, truncated to the bytes actually written.
    pub payload: Bytes,
    /// When the final chunk was accepted.
    pub completed_at: DateTime<Utc>,
}

/// A completed frame together with the link to its successor.
pub struct CompletedFrame {
    data: FrameData,
    next: Weak<Frame>,
}

impl CompletedFrame {
    /// The frame's data.
    pub fn data(&self) -> &FrameData {
        &self.data
    }

    /// The successor allocated when this frame completed, unless it has
    /// already fallen out of the retention window.
    pub fn next(&self) -> Option<Arc<Frame>> {
        self.next.upgrade()
    }
}

impl fmt::Debug for CompletedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletedFrame")
            .field("number", &self.data.number)
            .field("seq", &self.data.seq)
            .field("damaged", &self.data.damaged)
            .field("len", &self.data.payload.len())
            .field("next_seq", &(self.data.seq + 1))
            .finish()
    }
}

/// One node of a device's frame chain.
pub struct Frame {
    seq: u64,
    done: OnceLock<CompletedFrame>,
    completed: Notify,
}

impl Frame {
    /// Allocate the first node of a new chain.
    pub(crate) fn head() -> Arc<Self> {
        Self::with_seq(0)
    }

    fn with_seq(seq: u64) -> Arc<Self> {
        Arc::new(Self {
            seq,
            done: OnceLock::new(),
            completed: Notify::new(),
        })
    }

    /// Position of this frame in its device's chain.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether the frame has been completed.
    pub fn is_complete(&self) -> bool {
        self.done.get().is_some()
    }

    /// The completed frame, if completion has happened.
    pub fn get(&self) -> Option<&CompletedFrame> {
        self.done.get()
    }

    /// Wait until the frame is completed.
    pub async fn completed(&self) -> &CompletedFrame {
        loop {
            let notified = self.completed.notified();
            tokio::pin!(notified);
            // Register before checking so a completion between the check and
            // the await cannot be missed.
            notified.as_mut().enable();

            if let Some(done) = self.done.get() {
                return done;
            }
            notified.await;
        }
    }

    /// Publish the frame's final contents, link a new empty successor and
    /// wake every waiting reader. Returns the successor, which the caller
    /// must keep alive.
    ///
    /// Only the reassembler calls this, once per frame.
    pub(crate) fn complete(&self, mut data: FrameData) -> Arc<Frame> {
        data.seq = self.seq;
        let next = Self::with_seq(self.seq + 1);

        if self
            .done
            .set(CompletedFrame {
                data,
                next: Arc::downgrade(&next),
            })
            .is_err()
        {
            tracing::error!(seq = self.seq, "Frame completed twice; keeping first completion");
        }
        self.completed.notify_waiters();

        self.done
            .get()
            .and_then(CompletedFrame::next)
            .unwrap_or(next)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("seq", &self.seq)
            .field("complete", &self.is_complete())
            .finish()
    }
}
