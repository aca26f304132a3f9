//! Which links to follow, and in what order.

use crate::config::CrawlConfig;
use crate::{Error, Result};
use regex::Regex;

/// Case-insensitive substring test used by every text heuristic.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Compile an optional regex from config, naming the field on failure.
pub(crate) fn compile_pattern(field: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| Error::Config(format!("crawl.{}: {}", field, e)))
        })
        .transpose()
}

/// Link filtering and priority ordering.
#[derive(Debug, Clone, Default)]
pub struct LinkFilters {
    ignore: Option<Regex>,
    only: Option<Regex>,
    priority: Option<String>,
}

impl LinkFilters {
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        Ok(Self {
            ignore: compile_pattern("ignore_links", config.ignore_links.as_deref())?,
            only: compile_pattern("only_links", config.only_links.as_deref())?,
            priority: config.link_priority.clone().filter(|p| !p.is_empty()),
        })
    }

    /// Candidate links as `(index, text)`, in the order to try them.
    ///
    /// Links whose text contains the priority string come first. The sort is
    /// stable, so page order is kept inside each group.
    pub fn rank<'a>(&self, links: &'a [String]) -> Vec<(usize, &'a str)> {
        let mut ranked: Vec<(usize, &str)> = links
            .iter()
            .enumerate()
            .map(|(i, text)| (i, text.as_str()))
            .filter(|(_, text)| !self.ignore.as_ref().is_some_and(|re| re.is_match(text)))
            .filter(|(_, text)| self.only.as_ref().map_or(true, |re| re.is_match(text)))
            .collect();
        if let Some(ref priority) = self.priority {
            ranked.sort_by_key(|(_, text)| !contains_ignore_case(text, priority));
        }
        ranked
    }
}
