//! Actor-based sampling
//!
//! A sampler runs as an independent async task and is controlled through a
//! cloneable handle over a Tokio mpsc channel.
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the sampler has an mpsc command channel for control messages
//! 2. **Reports**: every tick's output is forwarded to a `ReportSink`
//! 3. **Request/Response**: oneshot channels for on-demand ticks and shutdown
//! 4. **State**: lifecycle and latest report are published through watch channels

pub mod messages;
pub mod sampler;
