use crate::domain::model::{ClickEvent, Fragment};
use crate::utils::error::Result;
use async_trait::async_trait;
use url::Url;

/// Typed access to one element of a document.
pub trait ElementHandle: Clone + Send + Sync + 'static {
    fn get_attribute(&self, name: &str) -> Option<String>;

    /// Appends markup after the element's existing content.
    fn append_markup(&self, html: &str);

    fn has_class(&self, class: &str) -> bool;

    /// Short label for logs, e.g. `a#toggle-1`.
    fn describe(&self) -> String {
        "element".to_string()
    }
}

pub trait Document: Send + Sync {
    type Element: ElementHandle;

    /// First element in document order matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>>;

    fn base_url(&self) -> Option<&Url>;
}

#[async_trait]
pub trait FragmentFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<Fragment>;
}

/// Lazy sequence of clicks. `next_click` must be cancel-safe: the dispatcher
/// polls it inside `tokio::select!`.
#[async_trait]
pub trait EventSource<E: ElementHandle>: Send {
    async fn next_click(&mut self) -> Option<ClickEvent<E>>;

    /// Rewinds the source; a no-op for live sources.
    fn restart(&mut self) {}
}
