pub mod ingest;
pub mod processor;
pub mod source;
pub mod types;
pub mod yellowstone_source;

pub use ingest::run_ingest_loop;
pub use processor::{DecimalsLookup, StreamProcessor};
pub use source::{AccountUpdateSource, ChannelSource};
pub use types::{classify_by_size, AccountKind, RawAccountUpdate};
pub use yellowstone_source::YellowstoneSource;
