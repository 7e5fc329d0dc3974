//! One-shot waits
//!
//! `MessageBroker::wait_for_message` registers a subscriber bound to a match
//! policy and an optional deadline, and hands back a `WaitHandle` future.
//!
//! The outcome lives in a `WaitSlot`: a oneshot sender behind a mutex. Every
//! path that can finish a wait (a matching message, the deadline, the broker
//! closing, the handle being dropped) has to take the sender first, so exactly
//! one of them wins and the rest become no-ops.
//!
//! The deadline is fixed when the wait is registered, but only the timer
//! settles a timeout; the subscriber never looks at the clock. Inside a tokio
//! runtime the timer is a spawned task, so an unpolled handle still times out
//! and unsubscribes on schedule. A match published before that task gets to
//! run wins, even with a zero timeout. Registered outside a runtime, the timer
//! starts on the handle's first poll instead.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, Sleep};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broker::engine::{BrokerState, detach, panic_reason};
use crate::broker::message::Message;
use crate::broker::subscriber::{Subscriber, SubscriberId};
use crate::matcher::MatchPolicy;
use crate::utils::{BrokerError, Result};

/// What to wait for, and for how long.
///
/// Built from exactly one policy constructor; the timeout and its message are
/// optional. Without a timeout the wait can only ever resolve.
#[derive(Debug, Clone)]
pub struct WaitOptions<M> {
    policy: MatchPolicy<M>,
    timeout: Option<Duration>,
    timeout_message: Option<String>,
}

impl<M> WaitOptions<M> {
    pub fn new(policy: MatchPolicy<M>) -> Self {
        Self {
            policy,
            timeout: None,
            timeout_message: None,
        }
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        MatchPolicy::regex(pattern).map(Self::new)
    }

    pub fn match_object(template: Value) -> Self {
        Self::new(MatchPolicy::match_object(template))
    }

    pub fn match_schema(schema: &Value) -> Result<Self> {
        MatchPolicy::match_schema(schema).map(Self::new)
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&M) -> bool + Send + Sync + 'static,
    {
        Self::new(MatchPolicy::predicate(predicate))
    }

    /// Build options from an untyped description, as found in JSON or TOML
    /// fixtures. Exactly one of `regex`, `matchObject` and `matchSchema` must
    /// be present.
    pub fn from_spec(spec: WaitSpec) -> Result<Self> {
        let WaitSpec {
            timeout,
            timeout_message,
            regex,
            match_object,
            match_schema,
        } = spec;

        let policy = match (regex, match_object, match_schema) {
            (Some(pattern), None, None) => MatchPolicy::regex(&pattern)?,
            (None, Some(template), None) => MatchPolicy::match_object(template),
            (None, None, Some(schema)) => MatchPolicy::match_schema(&schema)?,
            (None, None, None) => {
                return Err(BrokerError::configuration(
                    "one of regex, matchObject or matchSchema is required",
                ));
            }
            _ => {
                return Err(BrokerError::configuration(
                    "regex, matchObject and matchSchema are mutually exclusive",
                ));
            }
        };

        Ok(Self {
            policy,
            timeout: timeout.map(Duration::from_millis),
            timeout_message,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Replace the default "timeout after ..." text of the timeout error.
    pub fn with_timeout_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_message = Some(message.into());
        self
    }

    pub fn policy(&self) -> &MatchPolicy<M> {
        &self.policy
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Serde form of `WaitOptions`. Predicates cannot be described this way.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WaitSpec {
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub timeout_message: Option<String>,
    pub regex: Option<String>,
    pub match_object: Option<Value>,
    pub match_schema: Option<Value>,
}

#[derive(Debug, Clone)]
struct Deadline {
    at: Instant,
    timeout: Duration,
    message: Option<String>,
}

impl Deadline {
    fn error(&self) -> BrokerError {
        BrokerError::Timeout {
            timeout: self.timeout,
            message: self.message.clone(),
        }
    }
}

pub(crate) struct WaitSlot<M> {
    sender: Mutex<Option<oneshot::Sender<Result<M>>>>,
    timer: Mutex<Option<AbortHandle>>,
}

impl<M> WaitSlot<M> {
    fn new(sender: oneshot::Sender<Result<M>>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
            timer: Mutex::new(None),
        }
    }

    /// Deliver `outcome` unless the wait already finished. Returns whether
    /// this call was the one that finished it.
    pub(crate) fn settle(&self, outcome: Result<M>) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            return false;
        };
        // receiver gone means the handle was dropped; nothing to tell
        let _ = sender.send(outcome);
        self.disarm();
        true
    }

    fn abandon(&self) -> bool {
        let abandoned = self.sender.lock().take().is_some();
        if abandoned {
            self.disarm();
        }
        abandoned
    }

    /// Attach the timer task. A slot that already finished cancels it
    /// straight away.
    fn arm(&self, timer: AbortHandle) {
        let sender = self.sender.lock();
        if sender.is_none() {
            timer.abort();
        } else {
            *self.timer.lock() = Some(timer);
        }
    }

    fn disarm(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }

    fn is_settled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Pending result of `MessageBroker::wait_for_message`.
///
/// Resolves with the first message published after registration that matches
/// the policy, or fails with `BrokerError::Timeout`, `PredicatePanicked` or
/// `Closed`. Dropping the handle unsubscribes the wait.
///
/// When registered inside a tokio runtime the timeout fires, and the wait
/// unsubscribes, whether or not the handle is ever polled. Outside a runtime
/// the timer only starts once the handle is polled.
pub struct WaitHandle<M: Message> {
    id: SubscriberId,
    state: Weak<Mutex<BrokerState<M>>>,
    slot: Arc<WaitSlot<M>>,
    receiver: oneshot::Receiver<Result<M>>,
    deadline: Option<Deadline>,
    timer_spawned: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl<M: Message> WaitHandle<M> {
    pub(crate) fn register(
        state: &Arc<Mutex<BrokerState<M>>>,
        options: WaitOptions<M>,
    ) -> Result<Self> {
        let WaitOptions {
            policy,
            timeout,
            timeout_message,
        } = options;

        let kind = policy.kind();
        if !M::accepts(kind) {
            return Err(BrokerError::configuration(format!(
                "{kind} cannot be used to wait for {} messages",
                M::KIND
            )));
        }

        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(WaitSlot::new(sender));
        let id = Uuid::new_v4();
        let deadline = timeout.map(|timeout| Deadline {
            at: Instant::now() + timeout,
            timeout,
            message: timeout_message,
        });

        let subscriber = {
            let slot = Arc::clone(&slot);
            let state = Arc::downgrade(state);
            Subscriber::with_id(id, move |message: &M| {
                if slot.is_settled() {
                    return;
                }
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| policy.matches(message))) {
                    Ok(false) => return,
                    Ok(true) => Ok(message.clone()),
                    Err(payload) => Err(BrokerError::PredicatePanicked(panic_reason(
                        payload.as_ref(),
                    ))),
                };
                let failure = outcome.as_ref().err().cloned();
                if slot.settle(outcome) {
                    if let Some(state) = state.upgrade() {
                        detach(&state, id);
                    }
                    if let Some(err) = failure {
                        warn!(stream = M::KIND, wait = %id, error = %err, "wait failed");
                    }
                }
            })
        };

        {
            let mut guard = state.lock();
            if guard.closed {
                return Err(BrokerError::Closed);
            }
            guard.subscribers.insert(subscriber);
            guard.waiters.insert(id, Arc::downgrade(&slot));
        }

        let timer_spawned = match (&deadline, Handle::try_current()) {
            (Some(deadline), Ok(runtime)) => {
                let slot_for_timer = Arc::clone(&slot);
                let state = Arc::downgrade(state);
                let deadline = deadline.clone();
                let task = runtime.spawn(async move {
                    time::sleep_until(deadline.at).await;
                    expire(&slot_for_timer, &state, id, &deadline);
                });
                slot.arm(task.abort_handle());
                true
            }
            _ => false,
        };

        debug!(stream = M::KIND, wait = %id, policy = %kind, ?timeout, timer_spawned, "waiting for message");

        Ok(Self {
            id,
            state: Arc::downgrade(state),
            slot,
            receiver,
            deadline,
            timer_spawned,
            sleep: None,
        })
    }

    /// Whether the wait is still undecided.
    pub fn is_pending(&self) -> bool {
        !self.slot.is_settled()
    }
}

/// Settle the wait as timed out, unless something else finished it first.
fn expire<M: Message>(
    slot: &WaitSlot<M>,
    state: &Weak<Mutex<BrokerState<M>>>,
    id: SubscriberId,
    deadline: &Deadline,
) {
    let err = deadline.error();
    if slot.settle(Err(err.clone())) {
        if let Some(state) = state.upgrade() {
            detach(&state, id);
        }
        warn!(stream = M::KIND, wait = %id, error = %err, "wait timed out");
    }
}

impl<M: Message> fmt::Debug for WaitHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitHandle")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .field("timeout", &self.deadline.as_ref().map(|d| d.timeout))
            .finish()
    }
}

impl<M: Message> Future for WaitHandle<M> {
    type Output = Result<M>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Poll::Ready(outcome) = Pin::new(&mut this.receiver).poll(cx) {
            return Poll::Ready(outcome.unwrap_or(Err(BrokerError::Closed)));
        }

        if this.timer_spawned {
            return Poll::Pending;
        }

        if let Some(deadline) = &this.deadline {
            let sleep = this
                .sleep
                .get_or_insert_with(|| Box::pin(time::sleep_until(deadline.at)));
            if sleep.as_mut().poll(cx).is_ready() {
                expire(&this.slot, &this.state, this.id, deadline);
                if let Poll::Ready(outcome) = Pin::new(&mut this.receiver).poll(cx) {
                    return Poll::Ready(outcome.unwrap_or(Err(BrokerError::Closed)));
                }
            }
        }

        Poll::Pending
    }
}

impl<M: Message> Drop for WaitHandle<M> {
    fn drop(&mut self) {
        if self.slot.abandon() {
            if let Some(state) = self.state.upgrade() {
                detach(&state, self.id);
            }
            debug!(stream = M::KIND, wait = %self.id, "wait dropped before completion");
        }
    }
}
