//! Transport request queue and synchronization tokens.
//!
//! The interactive side (or a driver callback) appends requests and gets a
//! token back. The scheduling loop pops at most one request per iteration
//! and marks its token complete once the transition has been applied.
//! Completion is tracked as a high-water mark, so polling a token never
//! takes the queue lock.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cadenza_core::RealTime;
use parking_lot::Mutex;

/// Monotonically increasing synchronization token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransportToken(u64);

impl TransportToken {
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportRequestKind {
    Stop,
    Start,
    Record,
    JumpToTime,
    StartAtTime,
    StopAtTime,
    NoChange,
}

/// How a record request engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordMode {
    /// Start recording now (or punch in when already playing).
    #[default]
    Record,
    /// Arm recording; the next start records.
    Armed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRequest {
    pub kind: TransportRequestKind,
    pub time: Option<RealTime>,
    pub mode: RecordMode,
    pub token: TransportToken,
}

struct Pending {
    requests: VecDeque<TransportRequest>,
    last_issued: u64,
}

pub struct TransportQueue {
    pending: Mutex<Pending>,
    completed: AtomicU64,
}

impl TransportQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                requests: VecDeque::new(),
                last_issued: 0,
            }),
            completed: AtomicU64::new(0),
        }
    }

    pub fn push(&self, kind: TransportRequestKind, time: Option<RealTime>, mode: RecordMode) -> TransportToken {
        let mut pending = self.pending.lock();
        pending.last_issued += 1;
        let token = TransportToken(pending.last_issued);
        pending.requests.push_back(TransportRequest {
            kind,
            time,
            mode,
            token,
        });
        token
    }

    pub fn pop(&self) -> Option<TransportRequest> {
        self.pending.lock().requests.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark `token` (and every earlier token) as landed.
    pub fn complete(&self, token: TransportToken) {
        self.completed.fetch_max(token.0, Ordering::AcqRel);
    }

    /// Non-blocking; once true, stays true.
    #[inline]
    pub fn is_complete(&self, token: TransportToken) -> bool {
        self.completed.load(Ordering::Acquire) >= token.0
    }

    /// Drop every pending request, completing their tokens so pollers
    /// do not wait forever.
    pub fn drain(&self) -> usize {
        let mut pending = self.pending.lock();
        let drained = pending.requests.len();
        pending.requests.clear();
        self.completed.fetch_max(pending.last_issued, Ordering::AcqRel);
        drained
    }
}

impl Default for TransportQueue {
    fn default() -> Self {
        Self::new()
    }
}
