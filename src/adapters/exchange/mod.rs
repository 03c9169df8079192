pub mod live_source;
pub mod test_source;

pub use live_source::LiveSource;
pub use test_source::TestSource;
