//! Request/reply protocol spoken with the external reply service
//!
//! Defines the envelope exchanged over the request connection and the
//! topic conventions used for publish/subscribe filtering.

pub mod envelope;
pub mod topics;

pub use envelope::{Envelope, Service, STATUS_OK, STATUS_SUCESSO};
pub use topics::{direct_topic, topic_matches, DIRECT_TOPIC_PREFIX};
