//! Request/response plumbing shared by the serial protocol engines.
//!
//! Both engines keep a strict head-of-line queue: only the front request is
//! ever on the wire. A request leaves the queue when its response sequence
//! completes or when it has been transmitted [`MAX_ATTEMPTS`] times without
//! success.

pub mod driver;

use crate::codec::CodecError;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Total transmissions of one request, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Time to wait for ACK (Z-Wave) or RESPONSE (EnOcean) after a transmission.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(1500);

/// Failure of a single queued request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("request rejected by NACK")]
    Nack,
    #[error("request timed out")]
    Timeout,
    #[error("link closed")]
    Closed,
    #[error("cannot encode request: {0}")]
    Encode(#[from] CodecError),
    /// The serial port failed; `os_code` is the raw OS error when there is one.
    #[error("serial I/O failure ({kind})")]
    Io { kind: io::ErrorKind, os_code: Option<i32> },
}

impl From<&io::Error> for LinkError {
    fn from(error: &io::Error) -> Self {
        LinkError::Io { kind: error.kind(), os_code: error.raw_os_error() }
    }
}

impl LinkError {
    /// Numeric code reported through the error callback.
    pub fn code(&self) -> i32 {
        match self {
            LinkError::Nack => 1,
            LinkError::Timeout => 2,
            LinkError::Closed => 3,
            LinkError::Encode(_) => 4,
            LinkError::Io { .. } => 5,
        }
    }
}

/// Outcome of a receive or timer step, handed to the owning network.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent<R, F> {
    /// Response frame for the head request. For requests that wait for a
    /// transmit confirmation the request is still queued and this is a copy.
    Response { request: R, frame: F },
    /// Delayed confirmation carrying the request's correlation id; the
    /// request has left the queue.
    Confirmation { request: R, frame: F },
    /// Frame that does not belong to the pending request.
    Unsolicited(F),
    /// The request was dropped from the queue.
    Failed { request: R, error: LinkError },
}

/// Callback receiving `(transport, error)` for every failed request.
pub type ErrorHandler = Box<dyn FnMut(&'static str, &LinkError) + Send>;

pub(crate) fn log_error(transport: &'static str, error: &LinkError) {
    tracing::error!(category = transport, code = error.code(), "{}", error);
}

/// What the next timer expiry means for the head request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waiting {
    /// Nothing armed.
    Idle,
    /// The last transmission has not been acknowledged; expiry retransmits.
    Transmission,
    /// The dongle accepted the request; expiry fails it without resending.
    Completion,
}

/// Result of [`RequestQueue::retry`].
#[derive(Debug)]
pub enum Retry<R> {
    Resend,
    Exhausted(R),
}

#[derive(Debug)]
pub struct RequestQueue<R> {
    requests: VecDeque<R>,
    attempts: u32,
    deadline: Option<Instant>,
    waiting: Waiting,
}

impl<R> Default for RequestQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RequestQueue<R> {
    pub fn new() -> Self {
        Self {
            requests: VecDeque::new(),
            attempts: 0,
            deadline: None,
            waiting: Waiting::Idle,
        }
    }

    /// Appends a request; returns true when it became the head and must be
    /// transmitted now.
    pub fn push(&mut self, request: R) -> bool {
        self.requests.push_back(request);
        self.requests.len() == 1
    }

    pub fn front(&self) -> Option<&R> {
        self.requests.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut R> {
        self.requests.front_mut()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.requests.iter()
    }

    /// Removes the head request and clears all per-request state.
    pub fn pop(&mut self) -> Option<R> {
        self.attempts = 0;
        self.disarm();
        self.requests.pop_front()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
    }

    pub fn arm(&mut self, waiting: Waiting, timeout: Duration) {
        self.waiting = waiting;
        self.deadline = Some(Instant::now() + timeout);
    }

    pub fn disarm(&mut self) {
        self.waiting = Waiting::Idle;
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn waiting(&self) -> Waiting {
        self.waiting
    }

    /// Counts a failed transmission of the head request. Once the budget is
    /// spent the head is removed and returned.
    pub fn retry(&mut self) -> Option<Retry<R>> {
        if self.requests.is_empty() {
            return None;
        }
        self.attempts += 1;
        if self.attempts < MAX_ATTEMPTS {
            Some(Retry::Resend)
        } else {
            self.pop().map(Retry::Exhausted)
        }
    }

    /// Empties the queue, e.g. when the link goes away.
    pub fn drain(&mut self) -> Vec<R> {
        self.attempts = 0;
        self.disarm();
        self.requests.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_reports_new_head() {
        let mut queue = RequestQueue::new();
        assert!(queue.push(1));
        assert!(!queue.push(2));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.front(), Some(&2));
    }

    #[test]
    fn test_retry_budget() {
        let mut queue = RequestQueue::new();
        queue.push("a");
        queue.push("b");
        assert!(matches!(queue.retry(), Some(Retry::Resend)));
        assert!(matches!(queue.retry(), Some(Retry::Resend)));
        assert!(matches!(queue.retry(), Some(Retry::Exhausted("a"))));
        assert_eq!(queue.attempts(), 0);
        assert_eq!(queue.front(), Some(&"b"));
    }

    #[test]
    fn test_retry_on_empty_queue() {
        let mut queue: RequestQueue<u8> = RequestQueue::new();
        assert!(queue.retry().is_none());
    }

    #[tokio::test]
    async fn test_arm_and_disarm() {
        let mut queue: RequestQueue<u8> = RequestQueue::new();
        queue.arm(Waiting::Transmission, ACK_TIMEOUT);
        assert!(queue.deadline().is_some());
        assert_eq!(queue.waiting(), Waiting::Transmission);
        queue.disarm();
        assert!(queue.deadline().is_none());
        assert_eq!(queue.waiting(), Waiting::Idle);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LinkError::Nack.code(), 1);
        assert_eq!(LinkError::Timeout.code(), 2);
        assert_eq!(LinkError::Closed.to_string(), "link closed");
    }
}
