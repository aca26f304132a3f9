//! Following "next" controls across a chain of result pages.

use super::links::{compile_pattern, contains_ignore_case};
use super::CrawlStats;
use crate::browser::{BrowserControl, Navigator};
use crate::config::CrawlConfig;
use crate::store::{Category, SnapshotStore};
use crate::Result;
use regex::Regex;
use tracing::{debug, info};

/// Walks a result chain, snapshotting each page, then returns to where it started.
#[derive(Debug, Clone)]
pub struct PaginationFollower {
    next_match: String,
    form_depth: usize,
    result_links: Option<Regex>,
    result_link_depth: usize,
}

impl PaginationFollower {
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        Ok(Self {
            next_match: config.next_match.clone(),
            form_depth: config.form_depth,
            result_links: compile_pattern("result_page_links", config.result_page_links.as_deref())?,
            result_link_depth: config.result_link_depth,
        })
    }

    /// Follow the chain from the current page. Returns the number of hops.
    ///
    /// Only the first control whose text contains `next_match` is clicked on
    /// each page. A `form_depth` of 0 means the chain runs until no such
    /// control exists or clicking it no longer navigates. Every hop is undone
    /// before returning, whatever the exit path.
    pub(crate) async fn follow<B: BrowserControl>(
        &self,
        nav: &mut Navigator<B>,
        store: &SnapshotStore,
        stats: &mut CrawlStats,
    ) -> Result<usize> {
        debug!("Entering 'next' iteration routine");
        let mut trail = nav.trail();
        loop {
            let hops = trail.advances();
            if self.form_depth > 0 && hops > self.form_depth {
                debug!("Max 'next' form depth reached {}", hops);
                break;
            }

            let buttons = trail.button_vectors().await?;
            debug!("Current 'next' iteration depth {}", hops);
            debug!("Button vectors ({}): {:?}", buttons.len(), buttons);

            // the landing page of this hop
            let snapshot = store.capture(&mut *trail, Category::DataPage).await?;
            stats.record_snapshot(store, snapshot);

            if self.result_links.is_some() {
                self.explore_results(&mut *trail, store, stats, 0).await?;
            }

            let Some(ix) = buttons
                .iter()
                .position(|text| contains_ignore_case(text, &self.next_match))
            else {
                debug!("Next button not found!");
                break;
            };

            debug!("Next button found! Clicking: {}", ix);
            if !trail.select_button(ix, true).await? {
                debug!("'Next' click stayed on the same page, ending chain");
                break;
            }
            let snapshot = store.capture(&mut *trail, Category::DataPage).await?;
            stats.record_snapshot(store, snapshot);
        }

        let hops = trail.advances();
        debug!("Going back from {} 'next' hops", hops);
        trail.rewind().await?;
        Ok(hops)
    }

    /// Click each result link matching `result_page_links`, snapshot it and
    /// recurse, up to `result_link_depth` levels below the result page.
    async fn explore_results<B: BrowserControl>(
        &self,
        nav: &mut Navigator<B>,
        store: &SnapshotStore,
        stats: &mut CrawlStats,
        level: usize,
    ) -> Result<()> {
        let Some(ref pattern) = self.result_links else {
            return Ok(());
        };
        if level >= self.result_link_depth {
            return Ok(());
        }

        let links = nav.link_vectors().await?;
        let matching = links
            .iter()
            .enumerate()
            .filter(|(_, text)| pattern.is_match(text));
        for (ix, text) in matching {
            if stats.exhausted() {
                info!("Maximum pages reached, leaving result links");
                break;
            }
            debug!("Trying to click result link {}: {}", ix, text);
            let mut trail = nav.trail();
            if trail.select_link(ix).await? {
                stats.page_loaded();
                let snapshot = store.capture(&mut *trail, Category::DataPage).await?;
                stats.record_snapshot(store, snapshot);
                Box::pin(self.explore_results(&mut *trail, store, stats, level + 1)).await?;
            }
            trail.rewind().await?;
        }
        Ok(())
    }
}
