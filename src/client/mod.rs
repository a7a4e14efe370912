pub mod http;
pub mod stream;

pub use http::{FetchError, LatestFetcher, TelemetryClient};
pub use stream::{Backoff, MessageHandler, ReconnectPolicy, StreamListener, WarehouseFeed};
