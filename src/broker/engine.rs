//! Broker engine
//!
//! `MessageBroker` is the in-memory event log and fan-out point for one
//! message stream:
//! - every published message is appended to an ordered, never-truncated log
//! - every currently registered subscriber is notified synchronously
//! - `wait_for_message` turns a match policy into a one-shot subscriber
//!
//! Concurrency and usage notes:
//! - The broker is a cheap cloneable handle over shared state; producers and
//!   the test body may each hold a clone.
//! - The state lock is never held while a subscriber runs. `publish` copies the
//!   subscriber list, releases the lock, and re-checks membership before each
//!   call, so callbacks may subscribe or unsubscribe freely, and a subscriber
//!   removed earlier in the same pass is skipped.
//! - That membership check and the call are two steps. When `unsubscribe`
//!   runs on another thread while a `publish` is in flight, the subscriber may
//!   still receive that one message; every `publish` that starts after
//!   `unsubscribe` returns skips it. Waits are not affected: their slot
//!   settles once, whatever the interleaving.
//! - A closed broker keeps recording messages but accepts no new subscribers
//!   or waits.
//! - A message published before a wait is registered is in the log but never
//!   resolves that wait. There is no replay.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::broker::message::Message;
use crate::broker::subscriber::{Subscriber, SubscriberId, SubscriberSet};
use crate::broker::wait::{WaitHandle, WaitOptions, WaitSlot};
use crate::utils::{BrokerError, Result};

pub(crate) struct BrokerState<M> {
    pub(crate) messages: Vec<M>,
    pub(crate) subscribers: SubscriberSet<M>,
    /// Pending waits, so `close` can fail them.
    pub(crate) waiters: HashMap<SubscriberId, Weak<WaitSlot<M>>>,
    pub(crate) closed: bool,
}

impl<M> Default for BrokerState<M> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            subscribers: SubscriberSet::default(),
            waiters: HashMap::new(),
            closed: false,
        }
    }
}

pub struct MessageBroker<M> {
    state: Arc<Mutex<BrokerState<M>>>,
}

impl<M: Message> MessageBroker<M> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
        }
    }

    /// Register `subscriber` for every future `publish`. Registering the same
    /// subscriber (or a clone of it) again has no effect, and so does
    /// subscribing to a closed broker.
    pub fn subscribe(&self, subscriber: &Subscriber<M>) {
        let added = {
            let mut state = self.state.lock();
            if state.closed {
                None
            } else {
                Some(state.subscribers.insert(subscriber.clone()))
            }
        };
        match added {
            Some(true) => debug!(stream = M::KIND, subscriber = %subscriber.id(), "subscribed"),
            Some(false) => {}
            None => warn!(stream = M::KIND, subscriber = %subscriber.id(), "ignoring subscribe on closed broker"),
        }
    }

    /// Remove `subscriber` if present.
    pub fn unsubscribe(&self, subscriber: &Subscriber<M>) {
        if detach(&self.state, subscriber.id()) {
            debug!(stream = M::KIND, subscriber = %subscriber.id(), "unsubscribed");
        }
    }

    /// Append `message` to the log, then notify every subscriber registered at
    /// the time of the call, in subscription order.
    ///
    /// A panicking subscriber is logged and skipped; delivery to the rest of
    /// the pass continues.
    pub fn publish(&self, message: M) {
        let subscribers = {
            let mut state = self.state.lock();
            state.messages.push(message.clone());
            state.subscribers.snapshot()
        };

        debug!(
            stream = M::KIND,
            subscribers = subscribers.len(),
            "publishing message"
        );

        for subscriber in subscribers {
            let still_subscribed = self.state.lock().subscribers.contains(subscriber.id());
            if !still_subscribed {
                continue;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| subscriber.notify(&message)))
            {
                error!(
                    stream = M::KIND,
                    subscriber = %subscriber.id(),
                    reason = %panic_reason(payload.as_ref()),
                    "subscriber panicked"
                );
            }
        }
    }

    /// Copy of the message log, oldest first.
    pub fn messages(&self) -> Vec<M> {
        self.state.lock().messages.clone()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Register a one-shot wait for the first future message matching
    /// `options`.
    ///
    /// Fails immediately, without subscribing anything, if the policy does not
    /// apply to this message type or the broker is closed.
    pub fn wait_for_message(&self, options: WaitOptions<M>) -> Result<WaitHandle<M>> {
        WaitHandle::register(&self.state, options)
    }

    /// `wait_for_message` followed by awaiting the handle.
    pub async fn wait_for(&self, options: WaitOptions<M>) -> Result<M> {
        self.wait_for_message(options)?.await
    }

    /// Drop every subscriber and fail every pending wait with
    /// `BrokerError::Closed`. The log stays readable. Closing twice is a no-op.
    pub fn close(&self) {
        let waiters: Vec<_> = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.subscribers.clear();
            state
                .waiters
                .drain()
                .filter_map(|(_, slot)| slot.upgrade())
                .collect()
        };

        let failed = waiters
            .into_iter()
            .filter(|slot| slot.settle(Err(BrokerError::Closed)))
            .count();

        info!(
            stream = M::KIND,
            pending_waits = failed,
            messages = self.message_count(),
            "broker closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl<M: Message> Default for MessageBroker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for MessageBroker<M> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<M> fmt::Debug for MessageBroker<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MessageBroker")
            .field("messages", &state.messages.len())
            .field("subscribers", &state.subscribers.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Remove a subscriber and, if it was a wait, its slot. Returns whether the
/// subscriber was present.
pub(crate) fn detach<M>(state: &Mutex<BrokerState<M>>, id: SubscriberId) -> bool {
    let mut state = state.lock();
    state.waiters.remove(&id);
    state.subscribers.remove(id)
}

pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        (*reason).to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
