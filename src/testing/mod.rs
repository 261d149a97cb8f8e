//! Testing utilities
//!
//! Mock transport implementations for exercising the client and agent
//! without a broker or reply service on the network.

pub mod mocks;
