//! Paired advance/undo navigation.
//!
//! All browser access during a crawl goes through a [`Navigator`]. Actions
//! that move the browser to a new page (link clicks, button clicks, form
//! submits, the initial load) are only available on a [`Trail`], which counts
//! them. A trail undoes its advances either eagerly via [`Trail::rewind`] or,
//! on any other exit path (`?`, early return, break), when dropped: the backs
//! are queued on the navigator and performed before its next browser action.

use super::BrowserControl;
use crate::{Error, Result};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Owns the browser and the count of backward navigations still owed.
pub struct Navigator<B> {
    browser: B,
    pending_back: usize,
}

impl<B: BrowserControl> Navigator<B> {
    pub fn new(browser: B) -> Self {
        Self {
            browser,
            pending_back: 0,
        }
    }

    /// Open a scope whose advances are undone when it ends.
    pub fn trail(&mut self) -> Trail<'_, B> {
        Trail {
            nav: self,
            advances: 0,
        }
    }

    /// Backward navigations queued by dropped trails, not yet performed.
    pub fn pending_back(&self) -> usize {
        self.pending_back
    }

    /// Perform every queued backward navigation.
    ///
    /// A failed back leaves the remainder queued and is fatal to the crawl.
    pub async fn settle(&mut self) -> Result<()> {
        while self.pending_back > 0 {
            debug!("Going back ({} pending)", self.pending_back);
            self.browser
                .back()
                .await
                .map_err(|e| Error::Navigation(format!("backward navigation failed: {}", e)))?;
            self.pending_back -= 1;
        }
        Ok(())
    }

    pub async fn form_vectors(&mut self, field_type: &str) -> Result<Vec<String>> {
        self.settle().await?;
        self.browser.form_vectors(field_type).await
    }

    pub async fn button_vectors(&mut self) -> Result<Vec<String>> {
        self.settle().await?;
        self.browser.button_vectors().await
    }

    pub async fn link_vectors(&mut self) -> Result<Vec<String>> {
        self.settle().await?;
        self.browser.link_vectors().await
    }

    pub async fn input(&mut self, form_index: usize, field_index: usize, value: &str) -> Result<()> {
        self.settle().await?;
        self.browser.input(form_index, field_index, value).await
    }

    pub async fn page_html(&mut self) -> Result<String> {
        self.settle().await?;
        self.browser.page_html().await
    }

    pub async fn page_url(&mut self) -> Result<String> {
        self.settle().await?;
        self.browser.page_url().await
    }

    pub async fn screenshot_png(&mut self) -> Result<Vec<u8>> {
        self.settle().await?;
        self.browser.screenshot_png().await
    }

    /// Settle and hand the browser back.
    pub async fn finish(mut self) -> Result<B> {
        self.settle().await?;
        Ok(self.browser)
    }
}

/// A navigation scope. Dereferences to the [`Navigator`] it borrows.
pub struct Trail<'n, B> {
    nav: &'n mut Navigator<B>,
    advances: usize,
}

impl<B: BrowserControl> Trail<'_, B> {
    /// Pages this trail has moved forward and not yet undone.
    pub fn advances(&self) -> usize {
        self.advances
    }

    pub async fn initialize(&mut self, base_url: &str) -> Result<()> {
        self.nav.settle().await?;
        self.nav.browser.initialize(base_url).await?;
        self.advances += 1;
        Ok(())
    }

    /// Click a link; only a click that navigated counts as an advance.
    pub async fn select_link(&mut self, index: usize) -> Result<bool> {
        self.nav.settle().await?;
        let clicked = self.nav.browser.select_link(index).await?;
        if clicked {
            self.advances += 1;
        }
        Ok(clicked)
    }

    /// Click a button; as with links, only a navigating click is an advance.
    pub async fn select_button(&mut self, index: usize, iterating_form: bool) -> Result<bool> {
        self.nav.settle().await?;
        let moved = self
            .nav
            .browser
            .select_button(index, iterating_form)
            .await?;
        if moved {
            self.advances += 1;
        }
        Ok(moved)
    }

    pub async fn submit(&mut self, form_index: usize) -> Result<()> {
        self.nav.settle().await?;
        self.nav.browser.submit(form_index).await?;
        self.advances += 1;
        Ok(())
    }

    /// Undo every advance now rather than at drop.
    pub async fn rewind(mut self) -> Result<()> {
        self.nav.pending_back += std::mem::take(&mut self.advances);
        self.nav.settle().await
    }
}

impl<B> Deref for Trail<'_, B> {
    type Target = Navigator<B>;

    fn deref(&self) -> &Navigator<B> {
        self.nav
    }
}

impl<B> DerefMut for Trail<'_, B> {
    fn deref_mut(&mut self) -> &mut Navigator<B> {
        self.nav
    }
}

impl<B> Drop for Trail<'_, B> {
    fn drop(&mut self) {
        if self.advances > 0 {
            debug!("Trail dropped with {} advances, queueing backs", self.advances);
            self.nav.pending_back += self.advances;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records calls; `links` says which link indices navigate.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        links: Vec<bool>,
        /// Button indices whose click stays on the page.
        dead_buttons: Vec<usize>,
        fail_back: bool,
    }

    impl BrowserControl for Recorder {
        async fn initialize(&mut self, base_url: &str) -> Result<()> {
            self.calls.push(format!("initialize {}", base_url));
            Ok(())
        }

        async fn back(&mut self) -> Result<()> {
            if self.fail_back {
                return Err(Error::Navigation("no history".into()));
            }
            self.calls.push("back".into());
            Ok(())
        }

        async fn form_vectors(&mut self, _field_type: &str) -> Result<Vec<String>> {
            self.calls.push("forms".into());
            Ok(Vec::new())
        }

        async fn button_vectors(&mut self) -> Result<Vec<String>> {
            self.calls.push("buttons".into());
            Ok(Vec::new())
        }

        async fn link_vectors(&mut self) -> Result<Vec<String>> {
            self.calls.push("links".into());
            Ok(Vec::new())
        }

        async fn input(&mut self, form: usize, field: usize, value: &str) -> Result<()> {
            self.calls.push(format!("input {} {} {}", form, field, value));
            Ok(())
        }

        async fn submit(&mut self, form: usize) -> Result<()> {
            self.calls.push(format!("submit {}", form));
            Ok(())
        }

        async fn select_button(&mut self, index: usize, _iterating_form: bool) -> Result<bool> {
            self.calls.push(format!("button {}", index));
            Ok(!self.dead_buttons.contains(&index))
        }

        async fn select_link(&mut self, index: usize) -> Result<bool> {
            self.calls.push(format!("link {}", index));
            Ok(self.links.get(index).copied().unwrap_or(false))
        }

        async fn page_html(&mut self) -> Result<String> {
            self.calls.push("html".into());
            Ok(String::new())
        }

        async fn page_url(&mut self) -> Result<String> {
            Ok("about:blank".into())
        }

        async fn screenshot_png(&mut self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn backs(calls: &[String]) -> usize {
        calls.iter().filter(|c| *c == "back").count()
    }

    #[tokio::test]
    async fn test_rewind_goes_back_once_per_advance() {
        let mut browser = Recorder::default();
        let mut nav = Navigator::new(&mut browser);
        {
            let mut trail = nav.trail();
            trail.submit(0).await.unwrap();
            trail.select_button(1, true).await.unwrap();
            trail.select_button(1, true).await.unwrap();
            assert_eq!(trail.advances(), 3);
            trail.rewind().await.unwrap();
        }
        assert_eq!(nav.pending_back(), 0);
        nav.finish().await.unwrap();
        assert_eq!(backs(&browser.calls), 3);
    }

    #[tokio::test]
    async fn test_drop_queues_backs_before_next_action() {
        let mut browser = Recorder::default();
        let mut nav = Navigator::new(&mut browser);
        {
            let mut trail = nav.trail();
            trail.submit(0).await.unwrap();
            trail.select_button(0, true).await.unwrap();
        }
        assert_eq!(nav.pending_back(), 2);
        nav.link_vectors().await.unwrap();
        assert_eq!(nav.pending_back(), 0);
        nav.finish().await.unwrap();
        assert_eq!(
            browser.calls,
            vec!["submit 0", "button 0", "back", "back", "links"]
        );
    }

    #[tokio::test]
    async fn test_early_return_still_undoes() {
        async fn bail<B: BrowserControl>(nav: &mut Navigator<B>) -> Result<()> {
            let mut trail = nav.trail();
            trail.submit(0).await?;
            Err(Error::Config("stop".into()))
        }

        let mut browser = Recorder::default();
        let mut nav = Navigator::new(&mut browser);
        assert!(bail(&mut nav).await.is_err());
        nav.finish().await.unwrap();
        assert_eq!(backs(&browser.calls), 1);
    }

    #[tokio::test]
    async fn test_failed_link_click_is_not_an_advance() {
        let mut browser = Recorder {
            links: vec![false, true],
            ..Default::default()
        };
        let mut nav = Navigator::new(&mut browser);
        {
            let mut trail = nav.trail();
            assert!(!trail.select_link(0).await.unwrap());
            assert_eq!(trail.advances(), 0);
            assert!(trail.select_link(1).await.unwrap());
            assert_eq!(trail.advances(), 1);
        }
        nav.finish().await.unwrap();
        assert_eq!(backs(&browser.calls), 1);
    }

    #[tokio::test]
    async fn test_button_that_stays_put_is_not_an_advance() {
        let mut browser = Recorder {
            dead_buttons: vec![3],
            ..Default::default()
        };
        let mut nav = Navigator::new(&mut browser);
        {
            let mut trail = nav.trail();
            trail.submit(0).await.unwrap();
            assert!(!trail.select_button(3, true).await.unwrap());
            assert!(trail.select_button(1, true).await.unwrap());
            assert_eq!(trail.advances(), 2);
        }
        nav.finish().await.unwrap();
        assert_eq!(backs(&browser.calls), 2);
    }

    #[tokio::test]
    async fn test_nested_trails() {
        let mut browser = Recorder {
            links: vec![true],
            ..Default::default()
        };
        let mut nav = Navigator::new(&mut browser);
        {
            let mut outer = nav.trail();
            outer.initialize("https://example.com").await.unwrap();
            {
                let mut inner = outer.trail();
                inner.select_link(0).await.unwrap();
                inner.rewind().await.unwrap();
            }
            assert_eq!(outer.advances(), 1);
        }
        nav.finish().await.unwrap();
        assert_eq!(
            browser.calls,
            vec!["initialize https://example.com", "link 0", "back", "back"]
        );
    }

    #[tokio::test]
    async fn test_failed_back_is_fatal_and_stays_pending() {
        let mut browser = Recorder {
            fail_back: true,
            ..Default::default()
        };
        let mut nav = Navigator::new(&mut browser);
        {
            let mut trail = nav.trail();
            trail.submit(0).await.unwrap();
        }
        let err = nav.link_vectors().await.unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
        assert_eq!(nav.pending_back(), 1);
    }
}
