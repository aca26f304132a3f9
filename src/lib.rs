//! # autoscrape
//!
//! Depth-first crawler that looks for a search form, drives it with generated
//! inputs, follows the "next" chain on every result page and stores classified
//! HTML snapshots for later training.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autoscrape::{Config, Crawler, EokaBrowser};
//!
//! # #[tokio::main]
//! # async fn main() -> autoscrape::Result<()> {
//! let config = Config::load("crawl.yaml")?;
//! let mut browser = EokaBrowser::launch(&config.browser, config.crawl.form_submit_wait).await?;
//! let mut crawler = Crawler::new(config.crawl.clone())?;
//! let report = crawler.run(&mut browser, &config.target.url).await?;
//! println!("scraped: {}", report.scraped());
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
mod config;
pub mod crawl;
pub mod input;
pub mod store;

pub use browser::{BrowserControl, EokaBrowser, Navigator, Trail};
pub use config::{BrowserConfig, Config, CrawlConfig, InputType, TargetUrl, Viewport};
pub use crawl::{CrawlOutcome, CrawlReport, Crawler, ScrapeCompleted};
pub use input::{InputAssignment, InputPlan, InputPlans, PlanGenerator};
pub use store::{Category, PageSnapshot, SnapshotStore};

/// Result type for autoscrape operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or crawling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// A backward navigation failed; the browser no longer matches the crawl stack.
    #[error("navigation error: {0}")]
    Navigation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
target:
  url: "https://example.com"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.target.url, "https://example.com");
        assert_eq!(config.crawl.max_depth, Some(10));
        assert_eq!(config.crawl.form_depth, 0);
        assert_eq!(config.crawl.next_match, "next");
        assert!(config.crawl.form_match.is_none());
        assert!(config.crawl.input_type.is_none());
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_parse_browser_config() {
        let yaml = r#"
browser:
  headless: true
  proxy: "http://localhost:8080"
  user_agent: "Custom UA"
  leave_host: true
  viewport:
    width: 1920
    height: 1080
target:
  url: "https://example.com"
"#;
        let config = Config::parse(yaml).unwrap();
        assert!(config.browser.headless);
        assert!(config.browser.leave_host);
        assert_eq!(config.browser.proxy, Some("http://localhost:8080".into()));
        assert_eq!(config.browser.user_agent, Some("Custom UA".into()));
        let viewport = config.browser.viewport.unwrap();
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }

    #[test]
    fn test_parse_crawl_config() {
        let yaml = r#"
target:
  url: "https://example.com"
crawl:
  max_depth: 3
  form_depth: 5
  next_match: "Next page"
  form_match: "search"
  input_type: multi_manual
  input_strings: "0:foo,1:bar;0:baz"
  link_priority: "search"
  form_input_index: 2
  output_dir: "out"
  form_submit_wait: 1
  max_pages: 100
  ignore_links: "logout|sign out"
  result_page_links: "^Details$"
  result_link_depth: 2
"#;
        let config = Config::parse(yaml).unwrap();
        let crawl = &config.crawl;
        assert_eq!(crawl.max_depth, Some(3));
        assert_eq!(crawl.form_depth, 5);
        assert_eq!(crawl.next_match, "Next page");
        assert_eq!(crawl.form_match.as_deref(), Some("search"));
        assert_eq!(crawl.input_type, Some(InputType::MultiManual));
        assert_eq!(crawl.input_strings.as_deref(), Some("0:foo,1:bar;0:baz"));
        assert_eq!(crawl.form_input_index, 2);
        assert_eq!(crawl.max_pages, Some(100));
        assert_eq!(crawl.result_link_depth, 2);
        assert_eq!(
            crawl.output_dir.as_deref(),
            Some(std::path::Path::new("out"))
        );
    }

    #[test]
    fn test_parse_character_iteration() {
        let yaml = r#"
target:
  url: "https://example.com"
crawl:
  form_match: "search"
  input_type: character_iteration
  input_min_length: 2
  form_input_range: "xyz"
  wildcard: "*"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(
            config.crawl.input_type,
            Some(InputType::CharacterIteration)
        );
        assert_eq!(config.crawl.input_min_length, 2);
        assert_eq!(config.crawl.form_input_range.as_deref(), Some("xyz"));
        assert_eq!(config.crawl.wildcard.as_deref(), Some("*"));
    }

    #[test]
    fn test_validation_missing_url() {
        let yaml = r#"
target:
  url: ""
"#;
        let result = Config::parse(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_unknown_input_type() {
        let yaml = r#"
target:
  url: "https://example.com"
crawl:
  input_type: checkbox_sweep
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_validation_list_mode_without_strings() {
        let yaml = r#"
target:
  url: "https://example.com"
crawl:
  input_type: fixed_strings
"#;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("input_strings"), "{}", err);
    }

    #[test]
    fn test_validation_bad_regex() {
        let yaml = r#"
target:
  url: "https://example.com"
crawl:
  ignore_links: "(unclosed"
"#;
        let err = Config::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("ignore_links"), "{}", err);
    }

    #[test]
    fn test_validation_empty_next_match() {
        let yaml = r#"
target:
  url: "https://example.com"
crawl:
  next_match: ""
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_load_example_config() {
        let config = Config::load("configs/example.yaml").unwrap();
        assert_eq!(config.target.url, "https://example.com");
        assert_eq!(config.crawl.input_type, Some(InputType::FixedStrings));
    }
}
