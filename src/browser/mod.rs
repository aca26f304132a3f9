//! Browser Control: the page-level operations the crawler drives.
//!
//! Elements are addressed by their position in the vector returned by the
//! matching `*_vectors` call, which is stable until the page changes. Every
//! call blocks (awaits) until the browser has finished the action.

mod chrome;
mod navigator;

pub use chrome::EokaBrowser;
pub use navigator::{Navigator, Trail};

use crate::Result;

/// Operations the crawl engine needs from a browser.
#[allow(async_fn_in_trait)]
pub trait BrowserControl {
    /// Load the start page.
    async fn initialize(&mut self, base_url: &str) -> Result<()>;

    /// One step back in history.
    async fn back(&mut self) -> Result<()>;

    /// Text of every form containing at least one input of `field_type`.
    async fn form_vectors(&mut self, field_type: &str) -> Result<Vec<String>>;

    /// Visible text of every clickable control.
    async fn button_vectors(&mut self) -> Result<Vec<String>>;

    /// Visible text of every followable link.
    async fn link_vectors(&mut self) -> Result<Vec<String>>;

    /// Type `value` into input `field_index` of form `form_index`.
    async fn input(&mut self, form_index: usize, field_index: usize, value: &str) -> Result<()>;

    /// Submit form `form_index` and wait for the result page.
    async fn submit(&mut self, form_index: usize) -> Result<()>;

    /// Click control `index` from [`button_vectors`](Self::button_vectors).
    /// Returns `false` when the click left the browser on the same page,
    /// e.g. a disabled "next" or one that rewrites the page in place.
    async fn select_button(&mut self, index: usize, iterating_form: bool) -> Result<bool>;

    /// Click link `index` from [`link_vectors`](Self::link_vectors).
    /// Returns `false` when nothing navigated (stale or unreachable element).
    async fn select_link(&mut self, index: usize) -> Result<bool>;

    async fn page_html(&mut self) -> Result<String>;

    async fn page_url(&mut self) -> Result<String>;

    async fn screenshot_png(&mut self) -> Result<Vec<u8>>;
}

impl<B: BrowserControl + ?Sized> BrowserControl for &mut B {
    async fn initialize(&mut self, base_url: &str) -> Result<()> {
        (**self).initialize(base_url).await
    }

    async fn back(&mut self) -> Result<()> {
        (**self).back().await
    }

    async fn form_vectors(&mut self, field_type: &str) -> Result<Vec<String>> {
        (**self).form_vectors(field_type).await
    }

    async fn button_vectors(&mut self) -> Result<Vec<String>> {
        (**self).button_vectors().await
    }

    async fn link_vectors(&mut self) -> Result<Vec<String>> {
        (**self).link_vectors().await
    }

    async fn input(&mut self, form_index: usize, field_index: usize, value: &str) -> Result<()> {
        (**self).input(form_index, field_index, value).await
    }

    async fn submit(&mut self, form_index: usize) -> Result<()> {
        (**self).submit(form_index).await
    }

    async fn select_button(&mut self, index: usize, iterating_form: bool) -> Result<bool> {
        (**self).select_button(index, iterating_form).await
    }

    async fn select_link(&mut self, index: usize) -> Result<bool> {
        (**self).select_link(index).await
    }

    async fn page_html(&mut self) -> Result<String> {
        (**self).page_html().await
    }

    async fn page_url(&mut self) -> Result<String> {
        (**self).page_url().await
    }

    async fn screenshot_png(&mut self) -> Result<Vec<u8>> {
        (**self).screenshot_png().await
    }
}
