use crate::config::LoaderConfig;
use crate::domain::model::{ExpansionRequest, Fragment};
use crate::domain::ports::{Document, ElementHandle, FragmentFetcher};
use crate::utils::error::{LoaderError, Result};
use std::sync::Arc;
use url::Url;

/// Resolves a trigger to its target and source URL, fetches the fragment and
/// appends it to the target. Every call appends again; nothing is cached.
pub struct FragmentLoader<D: Document, F: FragmentFetcher> {
    document: D,
    fetcher: Arc<F>,
    config: LoaderConfig,
    base_url_override: Option<Url>,
}

impl<D: Document, F: FragmentFetcher> FragmentLoader<D, F> {
    pub fn new(document: D, fetcher: F, config: LoaderConfig) -> Result<Self> {
        let base_url_override = config
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    LoaderError::config("base_url", format!("Invalid URL `{}`: {}", raw, e))
                })
            })
            .transpose()?;

        Ok(Self {
            document,
            fetcher: Arc::new(fetcher),
            config,
            base_url_override,
        })
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub(crate) fn fetcher(&self) -> Arc<F> {
        Arc::clone(&self.fetcher)
    }

    pub fn is_trigger(&self, element: &D::Element) -> bool {
        element.has_class(&self.config.trigger_class)
    }

    /// Resolves target and source URL without touching the network.
    pub fn prepare(&self, trigger: &D::Element) -> Result<ExpansionRequest<D::Element>> {
        let trigger_label = trigger.describe();

        let target_selector = non_blank(trigger.get_attribute(&self.config.target_attribute))
            .ok_or_else(|| LoaderError::MissingTargetAttribute {
                trigger: trigger_label.clone(),
                attribute: self.config.target_attribute.clone(),
            })?;

        let target = self
            .document
            .query_selector(&target_selector)?
            .ok_or_else(|| LoaderError::TargetNotFound {
                selector: target_selector.clone(),
            })?;

        let raw_source = non_blank(target.get_attribute(&self.config.source_attribute))
            .ok_or_else(|| LoaderError::MissingSourceUrl {
                target: target.describe(),
                attribute: self.config.source_attribute.clone(),
            })?;

        let source_url = self.resolve_source(&raw_source)?;

        tracing::debug!(
            "{} -> {} -> {}",
            trigger_label,
            target_selector,
            source_url
        );

        Ok(ExpansionRequest {
            trigger_label,
            target_selector,
            target,
            source_url,
        })
    }

    /// Appends a fetched fragment after the target's current content.
    pub fn complete(&self, request: &ExpansionRequest<D::Element>, fragment: &Fragment) {
        request.target.append_markup(&fragment.html);
        tracing::info!(
            "Appended {} bytes from {} to {}",
            fragment.html.len(),
            fragment.url,
            request.target_selector
        );
    }

    /// One click handled start to finish.
    pub async fn expand(&self, trigger: &D::Element) -> Result<Fragment> {
        let request = self.prepare(trigger)?;
        let fragment = self.fetcher.fetch(&request.source_url).await?;
        self.complete(&request, &fragment);
        Ok(fragment)
    }

    fn resolve_source(&self, raw: &str) -> Result<Url> {
        let invalid = |reason: String| LoaderError::InvalidSourceUrl {
            value: raw.to_string(),
            reason,
        };

        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base_url_override
                    .as_ref()
                    .or_else(|| self.document.base_url())
                    .ok_or_else(|| invalid("relative URL and no base URL is known".to_string()))?;
                base.join(raw).map_err(|e| invalid(e.to_string()))?
            }
            Err(e) => return Err(invalid(e.to_string())),
        };

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(invalid(format!("unsupported scheme `{}`", scheme))),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
