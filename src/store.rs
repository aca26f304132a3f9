//! Classified page snapshots on disk.
//!
//! ```text
//! <output_dir>/screenshots/<unix-millis>.png
//! <output_dir>/<category>/<sha256-hex>.html
//! ```
//!
//! Snapshots are content addressed: the same HTML always lands on the same
//! path, whatever URL it came from.

use crate::browser::{BrowserControl, Navigator};
use crate::config::CrawlConfig;
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Training bucket a page is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    DataPage,
    ErrorPage,
    LinkToDocument,
    LinkToSearch,
    SearchPage,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::DataPage,
        Self::ErrorPage,
        Self::LinkToDocument,
        Self::LinkToSearch,
        Self::SearchPage,
    ];

    /// Directory name under the output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::DataPage => "data_pages",
            Self::ErrorPage => "error_pages",
            Self::LinkToDocument => "links_to_documents",
            Self::LinkToSearch => "links_to_search",
            Self::SearchPage => "search_pages",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataPage => "data_page",
            Self::ErrorPage => "error_page",
            Self::LinkToDocument => "link_to_document",
            Self::LinkToSearch => "link_to_search",
            Self::SearchPage => "search_page",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts either the singular name or the directory name.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.dir_name() == s)
            .ok_or_else(|| Error::Config(format!("unknown snapshot category: {}", s)))
    }
}

/// A page's HTML, where it came from and how it was classified.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub html: String,
    pub url: String,
    pub category: Category,
}

impl PageSnapshot {
    /// Hex SHA-256 of the HTML body; the dedup key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.html.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Writes snapshots and screenshots under an optional output root, and
/// optionally hands captured pages back to the caller.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    root: Option<PathBuf>,
    screenshots: bool,
    retain: bool,
}

impl SnapshotStore {
    pub fn new(root: Option<PathBuf>, screenshots: bool) -> Self {
        Self {
            root,
            screenshots,
            retain: false,
        }
    }

    /// Also return captured pages to the caller.
    pub fn retaining(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.output_dir.clone(), config.save_screenshots)
            .retaining(config.return_data)
    }

    /// Whether pages are captured at all.
    pub fn is_enabled(&self) -> bool {
        self.writes_files() || self.retain
    }

    pub fn writes_files(&self) -> bool {
        self.root.is_some()
    }

    pub fn retains(&self) -> bool {
        self.retain
    }

    /// Persist a snapshot. Returns the path written, `None` when disabled.
    pub fn write(&self, snapshot: &PageSnapshot) -> Result<Option<PathBuf>> {
        let Some(ref root) = self.root else {
            return Ok(None);
        };
        let dir = root.join(snapshot.category.dir_name());
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.html", snapshot.digest()));
        std::fs::write(&path, snapshot.html.as_bytes())?;
        debug!(
            "Saved {} snapshot of {} to {}",
            snapshot.category,
            snapshot.url,
            path.display()
        );
        Ok(Some(path))
    }

    /// Persist a PNG screenshot when screenshots are enabled.
    pub fn write_screenshot(&self, png: &[u8]) -> Result<Option<PathBuf>> {
        let Some(ref root) = self.root else {
            return Ok(None);
        };
        if !self.screenshots {
            return Ok(None);
        }
        let dir = root.join("screenshots");
        std::fs::create_dir_all(&dir)?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let path = dir.join(format!("{}.png", timestamp));
        std::fs::write(&path, png)?;
        debug!("Saved screenshot to {}", path.display());
        Ok(Some(path))
    }

    /// Snapshot the navigator's current page, plus a screenshot if enabled.
    /// Does not touch the browser when the store is disabled.
    pub async fn capture<B: BrowserControl>(
        &self,
        nav: &mut Navigator<B>,
        category: Category,
    ) -> Result<Option<PageSnapshot>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let snapshot = PageSnapshot {
            html: nav.page_html().await?,
            url: nav.page_url().await?,
            category,
        };
        self.write(&snapshot)?;
        self.capture_screenshot(nav).await?;
        Ok(Some(snapshot))
    }

    /// Screenshot only, used between filling and submitting a form.
    pub async fn capture_screenshot<B: BrowserControl>(
        &self,
        nav: &mut Navigator<B>,
    ) -> Result<()> {
        if self.writes_files() && self.screenshots {
            let png = nav.screenshot_png().await?;
            self.write_screenshot(&png)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn snapshot(html: &str, url: &str, category: Category) -> PageSnapshot {
        PageSnapshot {
            html: html.into(),
            url: url.into(),
            category,
        }
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let s = snapshot("", "https://a", Category::DataPage);
        assert_eq!(
            s.digest(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_same_content_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Some(dir.path().to_path_buf()), false);

        let a = store
            .write(&snapshot("<p>x</p>", "https://a/1", Category::DataPage))
            .unwrap();
        let b = store
            .write(&snapshot("<p>x</p>", "https://a/2", Category::DataPage))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(files_in(&dir.path().join("data_pages")).len(), 1);
    }

    #[test]
    fn test_distinct_content_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Some(dir.path().to_path_buf()), false);

        store
            .write(&snapshot("<p>1</p>", "https://a", Category::SearchPage))
            .unwrap();
        store
            .write(&snapshot("<p>2</p>", "https://a", Category::SearchPage))
            .unwrap();
        let files = files_in(&dir.path().join("search_pages"));
        assert_eq!(files.len(), 2);
        assert!(files
            .iter()
            .all(|p| p.extension().and_then(|e| e.to_str()) == Some("html")));
    }

    #[test]
    fn test_disabled_store_writes_nothing() {
        let store = SnapshotStore::default();
        assert!(!store.is_enabled());
        let written = store
            .write(&snapshot("<p>x</p>", "https://a", Category::ErrorPage))
            .unwrap();
        assert!(written.is_none());
        assert!(store.write_screenshot(b"png").unwrap().is_none());
    }

    #[test]
    fn test_screenshots_need_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let off = SnapshotStore::new(Some(dir.path().to_path_buf()), false);
        assert!(off.write_screenshot(b"png").unwrap().is_none());

        let on = SnapshotStore::new(Some(dir.path().to_path_buf()), true);
        let path = on.write_screenshot(b"png").unwrap().unwrap();
        assert!(path.starts_with(dir.path().join("screenshots")));
        assert_eq!(std::fs::read(path).unwrap(), b"png");
    }

    #[test]
    fn test_retaining_without_root_enables_capture() {
        let store = SnapshotStore::new(None, true).retaining(true);
        assert!(store.is_enabled());
        assert!(!store.writes_files());
        assert!(store.retains());
        // nothing to write to
        assert!(store.write_screenshot(b"png").unwrap().is_none());
    }

    #[test]
    fn test_category_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
            assert_eq!(category.dir_name().parse::<Category>().unwrap(), category);
        }
        assert_eq!(Category::LinkToDocument.dir_name(), "links_to_documents");
    }

    #[test]
    fn test_unknown_category_is_config_error() {
        let err = "crawl_pages".parse::<Category>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
