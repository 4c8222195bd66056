use std::{
    collections::VecDeque,
    mem,
    sync::{Mutex, MutexGuard, PoisonError}
};

use tokio::sync::oneshot;

use crate::web::Error;

/// What a queued request is woken with: the new access token, or why the session ended.
pub type Delivery = Result<String, String>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    pending: VecDeque<oneshot::Sender<Delivery>>
}

/// How a request that was answered with 401 has to proceed.
pub enum Ticket<'a> {
    /// The stored token already changed since the request was sent; replay with it.
    Replay(String),
    /// No refresh is running. The holder performs it and must settle the lease.
    Leader(RefreshLease<'a>),
    /// A refresh is running; wait for its outcome.
    Follower(oneshot::Receiver<Delivery>)
}

/// Single-flight coordination of token refreshes.
///
/// At most one lease exists at a time. Every request that hits a 401 while it
/// is held gets queued and is woken in arrival order once the lease settles.
#[derive(Default)]
pub struct RefreshGate {
    state: Mutex<RefreshState>
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `sent` is the token the rejected request carried, `current` reads the token
    /// stored right now. Both checks happen under the gate lock, so a token written
    /// by a settling lease is always visible here.
    pub fn enter<F>(&self, sent: Option<&str>, current: F) -> Ticket<'_>
    where
        F: FnOnce() -> Option<String>
    {
        let mut state = self.lock();
        if state.in_flight {
            let (sender, receiver) = oneshot::channel();
            state.pending.push_back(sender);
            return Ticket::Follower(receiver);
        }

        if let Some(current) = current() {
            if sent != Some(current.as_str()) {
                return Ticket::Replay(current);
            }
        }

        state.in_flight = true;
        Ticket::Leader(RefreshLease { gate: self, settled: false })
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Runs `change` under the gate lock, so it never interleaves with a settling lease.
    pub fn exclusive<F, R>(&self, change: F) -> R
    where
        F: FnOnce() -> R
    {
        let _state = self.lock();
        change()
    }

    /// Runs `commit` under the lock, clears the flag and wakes waiters front to back.
    fn settle<F>(&self, commit: F) -> usize
    where
        F: FnOnce() -> Delivery
    {
        let (outcome, waiters) = {
            let mut state = self.lock();
            let outcome = commit();
            state.in_flight = false;
            (outcome, mem::take(&mut state.pending))
        };

        let count = waiters.len();
        for waiter in waiters {
            // The waiting future may have been dropped in the meantime.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Proof of being the one refresh in flight. Dropping it unsettled fails the queue.
pub struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    settled: bool
}

impl RefreshLease<'_> {
    /// Persists the new token through `commit`, then hands it to every waiter.
    /// When `commit` fails the waiters get the failure instead. A `SessionEnded`
    /// reason is passed on as is.
    pub fn succeed<F>(mut self, token: &str, commit: F) -> Result<usize, Error>
    where
        F: FnOnce() -> Result<(), Error>
    {
        self.settled = true;
        let mut failure = None;
        let waiters = self.gate.settle(|| match commit() {
            Ok(()) => Ok(token.to_string()),
            Err(error) => {
                let reason = match &error {
                    Error::SessionEnded(reason) => reason.clone(),
                    _ => format!("Unable to store refreshed token => {}", error.message())
                };
                failure = Some(error);
                Err(reason)
            }
        });

        match failure {
            Some(error) => Err(error),
            None => Ok(waiters)
        }
    }

    /// Runs `clear` once, then fails every waiter with `reason`.
    pub fn fail<F>(mut self, reason: &str, clear: F) -> usize
    where
        F: FnOnce()
    {
        self.settled = true;
        self.gate.settle(|| {
            clear();
            Err(reason.to_string())
        })
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gate.settle(|| Err("Token refresh was cancelled".to_string()));
        }
    }
}
