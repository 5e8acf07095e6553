use crate::utils::error::ErrorCategory;
use serde::Serialize;
use url::Url;

/// A click on some element of the document.
#[derive(Debug, Clone)]
pub struct ClickEvent<E> {
    pub trigger: E,
}

impl<E> ClickEvent<E> {
    pub fn new(trigger: E) -> Self {
        Self { trigger }
    }
}

/// Everything resolved at click time that the append continuation needs.
#[derive(Debug, Clone)]
pub struct ExpansionRequest<E> {
    pub trigger_label: String,
    pub target_selector: String,
    pub target: E,
    pub source_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub url: Url,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Resolve,
    Fetch,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub stage: FailureStage,
    pub category: ErrorCategory,
    pub trigger: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub clicks: usize,
    pub ignored: usize,
    pub requests: usize,
    pub appended: usize,
    pub failures: Vec<FailureRecord>,
}

impl DispatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
