use crate::core::loader::FragmentLoader;
use crate::domain::model::{
    ClickEvent, DispatchReport, ExpansionRequest, FailureRecord, FailureStage, Fragment,
};
use crate::domain::ports::{Document, ElementHandle, EventSource, FragmentFetcher};
use crate::utils::error::{LoaderError, Result};
use std::collections::HashMap;
use tokio::task::{Id, JoinError, JoinSet};

type Completion<E> = (ExpansionRequest<E>, Result<Fragment>);

/// Spawned fetches plus the trigger label of each, so a task that dies
/// without returning its request can still be attributed.
struct InFlight<E> {
    tasks: JoinSet<Completion<E>>,
    labels: HashMap<Id, String>,
}

impl<E: ElementHandle> InFlight<E> {
    fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            labels: HashMap::new(),
        }
    }
}

/// Single dispatch loop over an [`EventSource`]. Fetches run as background
/// tasks; appends happen back on the loop in completion order.
pub struct Dispatcher<D: Document, F: FragmentFetcher> {
    loader: FragmentLoader<D, F>,
}

impl<D: Document, F: FragmentFetcher> Dispatcher<D, F> {
    pub fn new(loader: FragmentLoader<D, F>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &FragmentLoader<D, F> {
        &self.loader
    }

    pub fn into_loader(self) -> FragmentLoader<D, F> {
        self.loader
    }

    /// Runs until the source is exhausted and every in-flight fetch has settled.
    pub async fn run<S>(&self, source: &mut S) -> DispatchReport
    where
        S: EventSource<D::Element> + ?Sized,
    {
        let mut report = DispatchReport::default();
        let mut in_flight = InFlight::new();
        let mut source_open = true;

        loop {
            tokio::select! {
                event = source.next_click(), if source_open => match event {
                    Some(event) => self.on_click(event, &mut in_flight, &mut report),
                    None => {
                        tracing::debug!("Event source exhausted, {} fetches in flight", in_flight.tasks.len());
                        source_open = false;
                    }
                },
                Some(joined) = in_flight.tasks.join_next_with_id(), if !in_flight.tasks.is_empty() => {
                    self.on_complete(joined, &mut in_flight.labels, &mut report);
                }
                else => break,
            }
        }

        tracing::info!(
            "Dispatch finished: {} clicks, {} ignored, {} requests, {} appended, {} failed",
            report.clicks,
            report.ignored,
            report.requests,
            report.appended,
            report.failed()
        );
        report
    }

    fn on_click(
        &self,
        event: ClickEvent<D::Element>,
        in_flight: &mut InFlight<D::Element>,
        report: &mut DispatchReport,
    ) {
        report.clicks += 1;

        if !self.loader.is_trigger(&event.trigger) {
            tracing::debug!("Ignoring click on {}", event.trigger.describe());
            report.ignored += 1;
            return;
        }

        let request = match self.loader.prepare(&event.trigger) {
            Ok(request) => request,
            Err(e) => {
                record_failure(report, FailureStage::Resolve, event.trigger.describe(), &e);
                return;
            }
        };

        report.requests += 1;
        let fetcher = self.loader.fetcher();
        let label = request.trigger_label.clone();
        let handle = in_flight.tasks.spawn(async move {
            let result = fetcher.fetch(&request.source_url).await;
            (request, result)
        });
        in_flight.labels.insert(handle.id(), label);
    }

    fn on_complete(
        &self,
        joined: std::result::Result<(Id, Completion<D::Element>), JoinError>,
        labels: &mut HashMap<Id, String>,
        report: &mut DispatchReport,
    ) {
        match joined {
            Ok((id, (request, Ok(fragment)))) => {
                labels.remove(&id);
                self.loader.complete(&request, &fragment);
                report.appended += 1;
            }
            Ok((id, (request, Err(e)))) => {
                labels.remove(&id);
                record_failure(report, FailureStage::Fetch, request.trigger_label, &e);
            }
            Err(join_error) => {
                let trigger = labels
                    .remove(&join_error.id())
                    .unwrap_or_else(|| "unknown trigger".to_string());
                let e = LoaderError::Task {
                    message: join_error.to_string(),
                };
                record_failure(report, FailureStage::Fetch, trigger, &e);
            }
        }
    }
}

fn record_failure(
    report: &mut DispatchReport,
    stage: FailureStage,
    trigger: String,
    error: &LoaderError,
) {
    tracing::warn!("Expansion from {} failed: {}", trigger, error);
    report.failures.push(FailureRecord {
        stage,
        category: error.category(),
        trigger,
        message: error.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dom::{ElementFixture, ElementRef, MemoryDocument};
    use crate::adapters::events::{ChannelEventSource, ReplayEventSource};
    use crate::config::LoaderConfig;
    use crate::utils::error::ErrorCategory;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    /// Answers calls in order from a script of (delay, body); `None` body fails.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<(Duration, Option<&'static str>)>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<(Duration, Option<&'static str>)>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FragmentFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &Url) -> Result<Fragment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, body) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((Duration::ZERO, Some("")));
            tokio::time::sleep(delay).await;
            match body {
                Some(html) => Ok(Fragment {
                    url: url.clone(),
                    html: html.to_string(),
                }),
                None => Err(LoaderError::HttpStatus {
                    url: url.to_string(),
                    status: 500,
                }),
            }
        }
    }

    fn page() -> (MemoryDocument, ElementRef) {
        let mut document =
            MemoryDocument::new(Some(Url::parse("http://localhost:8000/").unwrap()));
        let trigger = document.insert(
            ElementFixture::new("a")
                .id("toggle-1")
                .class("collapse-icon")
                .attr("href", "#panel-1"),
        );
        document.insert(
            ElementFixture::new("div")
                .id("panel-1")
                .attr("data-src", "/fragments/1.html")
                .content("<h3>Panel</h3>"),
        );
        (document, trigger)
    }

    fn fetch_calls(dispatcher: &Dispatcher<MemoryDocument, ScriptedFetcher>) -> usize {
        dispatcher.loader().fetcher().calls.load(Ordering::SeqCst)
    }

    struct PanickingFetcher;

    #[async_trait]
    impl FragmentFetcher for PanickingFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Fragment> {
            panic!("fetcher blew up");
        }
    }

    fn dispatcher(
        document: MemoryDocument,
        fetcher: ScriptedFetcher,
    ) -> Dispatcher<MemoryDocument, ScriptedFetcher> {
        Dispatcher::new(FragmentLoader::new(document, fetcher, LoaderConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_single_click_appends_fragment() {
        let (document, trigger) = page();
        let fetcher = ScriptedFetcher::new(vec![(Duration::ZERO, Some("<p>hello</p>"))]);
        let dispatcher = dispatcher(document, fetcher);

        let mut source = ReplayEventSource::new(vec![trigger]);
        let report = dispatcher.run(&mut source).await;

        assert_eq!(report.clicks, 1);
        assert_eq!(report.requests, 1);
        assert_eq!(fetch_calls(&dispatcher), 1);
        assert_eq!(report.appended, 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(
            dispatcher.loader().document().content_of("#panel-1").unwrap().as_deref(),
            Some("<h3>Panel</h3><p>hello</p>")
        );
    }

    #[tokio::test]
    async fn test_appends_in_completion_order() {
        let (document, trigger) = page();
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::from_millis(200), Some("<p>first-click</p>")),
            (Duration::ZERO, Some("<p>second-click</p>")),
        ]);
        let dispatcher = dispatcher(document, fetcher);

        let mut source = ReplayEventSource::new(vec![trigger.clone(), trigger]);
        let report = dispatcher.run(&mut source).await;

        assert_eq!(report.requests, 2);
        assert_eq!(fetch_calls(&dispatcher), 2);
        assert_eq!(report.appended, 2);
        assert_eq!(
            dispatcher.loader().document().content_of("#panel-1").unwrap().as_deref(),
            Some("<h3>Panel</h3><p>second-click</p><p>first-click</p>")
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_not_appended() {
        let (document, trigger) = page();
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::ZERO, None),
            (Duration::ZERO, Some("<p>ok</p>")),
        ]);
        let dispatcher = dispatcher(document, fetcher);

        let mut source = ReplayEventSource::new(vec![trigger.clone(), trigger]);
        let report = dispatcher.run(&mut source).await;

        assert_eq!(report.requests, 2);
        assert_eq!(fetch_calls(&dispatcher), 2);
        assert_eq!(report.appended, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].stage, FailureStage::Fetch);
        assert_eq!(report.failures[0].category, ErrorCategory::Network);
        assert_eq!(report.failures[0].trigger, "a#toggle-1");
        assert_eq!(
            dispatcher.loader().document().content_of("#panel-1").unwrap().as_deref(),
            Some("<h3>Panel</h3><p>ok</p>")
        );
    }

    #[tokio::test]
    async fn test_unresolvable_clicks_issue_no_requests() {
        let mut document = MemoryDocument::default();
        let plain = document.insert(ElementFixture::new("a").id("plain").attr("href", "#panel"));
        let dangling = document.insert(
            ElementFixture::new("a")
                .class("collapse-icon")
                .attr("href", "#nowhere"),
        );
        let no_source = document.insert(
            ElementFixture::new("a")
                .class("collapse-icon")
                .attr("href", "#panel"),
        );
        document.insert(ElementFixture::new("div").id("panel"));

        let dispatcher = dispatcher(document, ScriptedFetcher::new(vec![]));
        let mut source = ReplayEventSource::new(vec![plain, dangling, no_source]);
        let report = dispatcher.run(&mut source).await;

        assert_eq!(report.clicks, 3);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.requests, 0);
        assert_eq!(fetch_calls(&dispatcher), 0);
        assert_eq!(report.failed(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| f.stage == FailureStage::Resolve && f.category == ErrorCategory::Resolve));
        assert_eq!(
            dispatcher
                .into_loader()
                .document()
                .content_of("#panel")
                .unwrap()
                .as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_channel_source_drains_in_flight_fetches() {
        let (document, trigger) = page();
        let fetcher = ScriptedFetcher::new(vec![(Duration::from_millis(50), Some("<p>late</p>"))]);
        let dispatcher = dispatcher(document, fetcher);

        let (sender, mut source) = ChannelEventSource::channel();
        assert!(sender.click(trigger));
        drop(sender);

        let report = dispatcher.run(&mut source).await;
        assert_eq!(report.appended, 1);
        assert_eq!(
            dispatcher.loader().document().content_of("#panel-1").unwrap().as_deref(),
            Some("<h3>Panel</h3><p>late</p>")
        );
    }

    #[tokio::test]
    async fn test_restarted_source_appends_again() {
        let (document, trigger) = page();
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::ZERO, Some("<p>a</p>")),
            (Duration::ZERO, Some("<p>b</p>")),
        ]);
        let dispatcher = dispatcher(document, fetcher);

        let mut source = ReplayEventSource::new(vec![trigger]);
        dispatcher.run(&mut source).await;
        source.restart();
        dispatcher.run(&mut source).await;

        assert_eq!(fetch_calls(&dispatcher), 2);

        assert_eq!(
            dispatcher.loader().document().content_of("#panel-1").unwrap().as_deref(),
            Some("<h3>Panel</h3><p>a</p><p>b</p>")
        );
    }

    #[tokio::test]
    async fn test_panicking_fetch_is_recorded() {
        let (document, trigger) = page();
        let loader =
            FragmentLoader::new(document, PanickingFetcher, LoaderConfig::default()).unwrap();
        let dispatcher = Dispatcher::new(loader);

        let mut source = ReplayEventSource::new(vec![trigger]);
        let report = dispatcher.run(&mut source).await;

        assert_eq!(report.requests, 1);
        assert_eq!(report.appended, 0);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].stage, FailureStage::Fetch);
        assert_eq!(report.failures[0].category, ErrorCategory::Runtime);
        assert_eq!(report.failures[0].trigger, "a#toggle-1");
        assert!(report.failures[0].message.contains("fetcher blew up"));
        assert_eq!(
            dispatcher.loader().document().content_of("#panel-1").unwrap().as_deref(),
            Some("<h3>Panel</h3>")
        );
    }
}
