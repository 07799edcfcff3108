//! Command queue
//!
//! FIFO of requests waiting to be sent or waiting for their response.
//! Each entry pairs a command with its payload, so commands and payloads
//! can never drift out of step.

use std::collections::VecDeque;

use super::Command;

/// A command together with the payload it will be sent with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    /// Command to send
    pub command: Command,
    /// Payload, encoded as 4 hex digits on the wire
    pub payload: u16,
}

/// Ordered queue of pending requests
///
/// Unbounded: requests are appended at the tail and only ever removed
/// from the head.
#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<PendingRequest>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request at the tail
    pub fn enqueue(&mut self, command: Command, payload: u16) {
        self.entries.push_back(PendingRequest { command, payload });
    }

    /// The oldest pending request
    pub fn head(&self) -> Option<PendingRequest> {
        self.entries.front().copied()
    }

    /// Command at the head, or [`Command::None`] when empty
    pub fn head_command(&self) -> Command {
        self.head().map(|r| r.command).unwrap_or(Command::None)
    }

    /// Remove exactly one request from the head
    pub fn drop_head(&mut self) -> Option<PendingRequest> {
        self.entries.pop_front()
    }

    /// Remove every pending request
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pending requests from head to tail
    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = CommandQueue::new();
        queue.enqueue(Command::SetTemp, 4000);
        queue.enqueue(Command::GetTemp, 0);
        queue.enqueue(Command::SetPowerStatus, 1);

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drop_head(),
            Some(PendingRequest {
                command: Command::SetTemp,
                payload: 4000
            })
        );
        assert_eq!(queue.head_command(), Command::GetTemp);
        assert_eq!(queue.drop_head().map(|r| r.payload), Some(0));
        assert_eq!(queue.drop_head().map(|r| r.payload), Some(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut queue = CommandQueue::new();
        for _ in 0..5 {
            queue.enqueue(Command::GetTemp, 0);
        }
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_drop_head_on_empty() {
        let mut queue = CommandQueue::new();
        assert_eq!(queue.drop_head(), None);
        assert_eq!(queue.head_command(), Command::None);
    }

    #[test]
    fn test_clear() {
        let mut queue = CommandQueue::new();
        queue.enqueue(Command::GetOutput, 0);
        queue.enqueue(Command::GetSensorStatus, 0);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.head(), None);
    }
}
