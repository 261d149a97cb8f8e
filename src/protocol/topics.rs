//! Topic composition and prefix matching
//!
//! Topics are opaque byte strings to the fabric. The broker filters by
//! byte-prefix only and never parses topic contents; the naming
//! conventions below exist purely on the client side.

/// Prefix of per-user direct-message topics
pub const DIRECT_TOPIC_PREFIX: &str = "user_";

/// Compose the direct-message topic for a display name
pub fn direct_topic(username: &str) -> String {
    format!("{DIRECT_TOPIC_PREFIX}{username}")
}

/// Whether a subscription filter matches a published topic
///
/// Matching is byte-prefix: an empty filter matches every topic.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    topic.as_bytes().starts_with(filter.as_bytes())
}
