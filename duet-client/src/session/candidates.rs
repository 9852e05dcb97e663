use duet_core::IceCandidate;
use std::collections::VecDeque;

/// Remote candidates that arrived before the remote description was set.
///
/// Once the description is in place the buffered candidates are released in
/// arrival order, each exactly once; later candidates pass straight through.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
    remote_ready: bool,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate if it can be applied now, otherwise buffers it.
    pub fn push(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_ready {
            Some(candidate)
        } else {
            self.pending.push_back(candidate);
            None
        }
    }

    /// Marks the remote description as set and drains the buffer.
    pub fn mark_remote_ready(&mut self) -> Vec<IceCandidate> {
        self.remote_ready = true;
        self.pending.drain(..).collect()
    }

    pub fn is_remote_ready(&self) -> bool {
        self.remote_ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forgets everything; used when the peer connection is replaced.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.remote_ready = false;
    }
}
