/*
[INPUT]:  Caller frames sent while no session is live
[OUTPUT]: FIFO delivery of those frames once a session comes up
[POS]:    WebSocket layer - offline send buffer
[UPDATE]: When delivery ordering rules change
*/

use std::collections::VecDeque;

use super::transport::{Session, TransportError};

/// Unbounded FIFO of encoded frames
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<String>,
}

impl From<VecDeque<String>> for OutboundQueue {
    fn from(frames: VecDeque<String>) -> Self {
        Self { frames }
    }
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, frame: String) {
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Remove and return everything, oldest first
    pub fn take_all(&mut self) -> VecDeque<String> {
        std::mem::take(&mut self.frames)
    }

    /// Put unsent frames back ahead of anything queued since they were taken
    pub fn restore_front(&mut self, mut unsent: VecDeque<String>) {
        unsent.append(&mut self.frames);
        self.frames = unsent;
    }

    /// Send queued frames in order. A frame leaves the queue only after it was sent.
    pub async fn flush(&mut self, session: &mut dyn Session) -> Result<usize, TransportError> {
        let mut sent = 0;
        while let Some(frame) = self.frames.front() {
            session.send(frame.clone()).await?;
            self.frames.pop_front();
            sent += 1;
        }
        Ok(sent)
    }
}
