//! End-to-end tests against the public `nova` API.

mod fixtures;
mod pipeline;
