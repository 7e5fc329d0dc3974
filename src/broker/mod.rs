//! The `broker` module is the publish/subscribe core: an ordered message log,
//! live fan-out to subscribers, and the one-shot `wait_for_message` primitive.

pub mod engine;
pub mod message;
pub mod subscriber;
pub mod wait;

pub use engine::MessageBroker;
pub use message::{DataLayerMessage, HitMessage, Message};
pub use subscriber::{Subscriber, SubscriberId};
pub use wait::{WaitHandle, WaitOptions, WaitSpec};
