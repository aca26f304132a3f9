//! The depth-first crawl.
//!
//! At each page the crawler first looks for a form matching `form_match` and,
//! if one is found, runs every input plan against it: fill, submit, follow the
//! result chain, go back. One scraped form ends the whole crawl. Otherwise the
//! page's links are ranked and each is followed one level deeper, up to
//! `max_depth` when one is set.
//!
//! Every page change is made through a [`Trail`](crate::Trail), so the
//! browser is back where a frame found it before that frame returns, on
//! success, on error and on the early [`ScrapeCompleted`] exit alike.

pub mod links;
mod pagination;

pub use pagination::PaginationFollower;

use crate::browser::{BrowserControl, Navigator};
use crate::config::CrawlConfig;
use crate::input::PlanGenerator;
use crate::store::{Category, PageSnapshot, SnapshotStore};
use crate::Result;
use links::{compile_pattern, contains_ignore_case, LinkFilters};
use regex::Regex;
use std::ops::ControlFlow;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The crawl found its form and ran at least one input plan through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeCompleted {
    /// Index of the scraped form in the page's text-form vector.
    pub form_index: usize,
    /// Input plans submitted.
    pub plans: usize,
}

/// How a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    Scraped(ScrapeCompleted),
    /// Every reachable branch was explored without scraping a form.
    Exhausted,
}

/// Result of a crawl.
#[derive(Debug)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    /// Pages loaded by link clicks, submits and result links.
    pub pages_loaded: usize,
    /// Snapshots written to the store.
    pub snapshots_written: usize,
    /// Every captured page, in crawl order, when `return_data` is set.
    pub pages: Vec<PageSnapshot>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl CrawlReport {
    pub fn scraped(&self) -> bool {
        matches!(self.outcome, CrawlOutcome::Scraped(_))
    }
}

/// Counters shared by the engine and the pagination follower.
#[derive(Debug, Default)]
pub(crate) struct CrawlStats {
    pages_loaded: usize,
    snapshots_written: usize,
    max_pages: Option<usize>,
    pages: Vec<PageSnapshot>,
}

impl CrawlStats {
    fn new(max_pages: Option<usize>) -> Self {
        Self {
            max_pages,
            ..Default::default()
        }
    }

    pub(crate) fn page_loaded(&mut self) {
        self.pages_loaded += 1;
    }

    /// Account for a capture from `store`; `None` means nothing was taken.
    pub(crate) fn record_snapshot(&mut self, store: &SnapshotStore, snapshot: Option<PageSnapshot>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        if store.writes_files() {
            self.snapshots_written += 1;
        }
        if store.retains() {
            self.pages.push(snapshot);
        }
    }

    /// Whether the `max_pages` budget is spent.
    pub(crate) fn exhausted(&self) -> bool {
        self.max_pages.is_some_and(|max| self.pages_loaded >= max)
    }
}

/// Depth-first form crawler.
pub struct Crawler {
    config: CrawlConfig,
    plans: PlanGenerator,
    links: LinkFilters,
    pager: PaginationFollower,
    store: SnapshotStore,
    ignore_extensions: Option<Regex>,
    stats: CrawlStats,
}

impl Crawler {
    /// Build a crawler. Strategy and pattern errors surface here, before
    /// any page is loaded.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            plans: PlanGenerator::from_config(&config)?,
            links: LinkFilters::from_config(&config)?,
            pager: PaginationFollower::from_config(&config)?,
            store: SnapshotStore::from_config(&config),
            ignore_extensions: compile_pattern(
                "ignore_extensions",
                config.ignore_extensions.as_deref(),
            )?,
            stats: CrawlStats::new(config.max_pages),
            config,
        })
    }

    /// Crawl from `base_url`.
    ///
    /// Returns once a form has been scraped or every branch is exhausted,
    /// after all outstanding backward navigations have been performed.
    pub async fn run<B: BrowserControl>(&mut self, browser: B, base_url: &str) -> Result<CrawlReport> {
        let start = Instant::now();
        self.stats = CrawlStats::new(self.config.max_pages);
        let mut nav = Navigator::new(browser);

        let flow = {
            let mut trail = nav.trail();
            trail.initialize(base_url).await?;
            self.visit(&mut *trail, 0).await
        };
        let settled = nav.finish().await;

        let flow = match (flow, settled) {
            (Ok(flow), Ok(_)) => flow,
            (Err(e), Ok(_)) => return Err(e),
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Err(back)) => {
                warn!("Could not unwind after crawl error: {}", back);
                return Err(e);
            }
        };

        let outcome = match flow {
            ControlFlow::Break(done) => CrawlOutcome::Scraped(done),
            ControlFlow::Continue(()) => CrawlOutcome::Exhausted,
        };
        info!("AutoScrape run complete: {:?}", outcome);

        Ok(CrawlReport {
            outcome,
            pages_loaded: self.stats.pages_loaded,
            snapshots_written: self.stats.snapshots_written,
            pages: std::mem::take(&mut self.stats.pages),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Explore the current page at `depth`.
    ///
    /// The advance that brought the browser here belongs to the caller's
    /// trail, which undoes it once this returns.
    async fn visit<B: BrowserControl>(
        &mut self,
        nav: &mut Navigator<B>,
        depth: usize,
    ) -> Result<ControlFlow<ScrapeCompleted>> {
        info!("Crawl depth {}", depth);
        if self.config.max_depth.is_some_and(|max| depth > max) {
            info!("Maximum depth {} reached, returning", depth);
            return Ok(ControlFlow::Continue(()));
        }
        if self.stats.exhausted() {
            info!("Maximum pages reached, returning");
            return Ok(ControlFlow::Continue(()));
        }
        if let Some(ref pattern) = self.ignore_extensions {
            let url = nav.page_url().await?;
            if pattern.is_match(&url) {
                debug!("Ignoring URL matching ignored extension: {}", url);
                return Ok(ControlFlow::Continue(()));
            }
        }

        if let Some(done) = self.scan_forms(nav).await? {
            return Ok(ControlFlow::Break(done));
        }

        let links = nav.link_vectors().await?;
        debug!("Links on page: {:?}", links);
        for (ix, text) in self.links.rank(&links) {
            if self.config.max_depth == Some(depth) {
                debug!("At maximum depth {}, skipping links", depth);
                break;
            }
            if self.stats.exhausted() {
                info!("Maximum pages reached, skipping links");
                break;
            }

            debug!("Attempting to click link {}: {}", ix, text);
            let mut trail = nav.trail();
            if !trail.select_link(ix).await? {
                debug!("Click failed, skipping: {}", text);
                continue;
            }
            self.stats.page_loaded();
            debug!("Link clicked, going a level deeper");
            if let ControlFlow::Break(done) = Box::pin(self.visit(&mut *trail, depth + 1)).await? {
                return Ok(ControlFlow::Break(done));
            }
            trail.rewind().await?;
        }

        debug!("Searching forms and links on page complete");
        Ok(ControlFlow::Continue(()))
    }

    /// Scrape the first form matching `form_match` that takes at least one
    /// input plan.
    async fn scan_forms<B: BrowserControl>(
        &mut self,
        nav: &mut Navigator<B>,
    ) -> Result<Option<ScrapeCompleted>> {
        let Some(form_match) = self.config.form_match.clone() else {
            return Ok(None);
        };

        let forms = nav.form_vectors("text").await?;
        for (ix, text) in forms.iter().enumerate() {
            debug!("Form: {} Text: {}", ix, text);
            if !contains_ignore_case(text, &form_match) {
                continue;
            }

            info!("Found an input form at index {}", ix);
            let snapshot = self.store.capture(nav, Category::SearchPage).await?;
            self.stats.record_snapshot(&self.store, snapshot);

            let plans = self.scrape_form(nav, ix).await?;
            debug!("Completed iteration of form {}", ix);
            if plans > 0 {
                info!("Scrape complete after {} input plans", plans);
                return Ok(Some(ScrapeCompleted {
                    form_index: ix,
                    plans,
                }));
            }
        }
        Ok(None)
    }

    /// Run every input plan through form `form_index`. Returns plans submitted.
    async fn scrape_form<B: BrowserControl>(
        &mut self,
        nav: &mut Navigator<B>,
        form_index: usize,
    ) -> Result<usize> {
        let mut attempted = 0;
        for plan in self.plans.plans() {
            if self.stats.exhausted() {
                info!("Maximum pages reached, stopping input plans");
                break;
            }

            debug!("Input plan: {}", plan);
            for assignment in &plan.assignments {
                debug!(
                    "Inputting {:?} to input {} of form {}",
                    assignment.value, assignment.field_index, form_index
                );
                nav.input(form_index, assignment.field_index, &assignment.value)
                    .await?;
            }
            self.store.capture_screenshot(nav).await?;

            let mut trail = nav.trail();
            trail.submit(form_index).await?;
            self.stats.page_loaded();
            attempted += 1;

            debug!("Beginning iteration of data pages");
            let hops = self
                .pager
                .follow(&mut *trail, &self.store, &mut self.stats)
                .await?;
            debug!("Result chain of {} hops done", hops);
            trail.rewind().await?;
        }
        Ok(attempted)
    }
}
