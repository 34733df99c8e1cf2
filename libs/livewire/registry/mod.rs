pub mod registry;

pub use registry::{channel_url, ChannelId, ChannelRegistry};
