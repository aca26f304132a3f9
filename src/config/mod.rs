pub mod schema;

pub use schema::{BrowserConfig, Config, CrawlConfig, InputType, TargetUrl, Viewport};
