//! Fan-out dispatcher and worker pool: the bridge between the shared
//! fan-in sink and the aggregator's input channel.

pub mod fanout;
pub mod worker;

pub use fanout::spawn_fanout;
pub use worker::spawn_worker;
