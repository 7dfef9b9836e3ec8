//! # Monitor Testing Utils
//!
//! Shared test doubles for the monitor workspace.
//!
//! - **InMemoryStore**: sharded coordination store kept in process memory
//! - **ScriptedSubscriber**: channel subscription fed from the test body
//! - **Recording doubles**: autoscaler, load metrics sink, error reporter, flush policy
//! - **Builders**: wire payloads and identifiers pinned to a chosen shard
//!
//! ```toml
//! [dev-dependencies]
//! monitor-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
