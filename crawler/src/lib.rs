pub mod background;
pub mod link_discovery;
pub mod service;

pub use background::BackgroundCrawl;
pub use link_discovery::{DiscoveredLink, LinkDiscoverer};
pub use service::CrawlService;
