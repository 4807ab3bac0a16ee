use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::feed::{Article, CacheState, NewsCategory};
use crate::storage::NewsCacheCoordinator;

/// Notifications the controller sends to the UI layer.
///
/// `on_error` carries hard failures that warrant a blocking dialog;
/// `on_cache_state_changed` carries the soft "showing cached data" signal
/// for a dismissible banner. The two never fire for the same completion.
pub trait FeedObserver: Send + Sync {
    fn on_articles_updated(&self, articles: &[Article]);
    fn on_loading_changed(&self, is_loading: bool);
    fn on_error(&self, message: &str);
    fn on_cache_state_changed(&self, state: CacheState, message: &str);
}

/// Knobs for the pagination state machine.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Minimum interval between successive load-more fetches.
    pub min_load_interval: Duration,
    /// Category a fresh session starts on.
    pub initial_category: NewsCategory,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_load_interval: Duration::from_secs(2),
            initial_category: NewsCategory::General,
        }
    }
}

/// Session state owned exclusively by the controller. Never shared across
/// categories: a category switch resets the pagination fields wholesale.
struct SessionState {
    current_category: NewsCategory,
    current_page: u32,
    all_articles: Vec<Article>,
    displayed: Vec<Article>,
    is_searching: bool,
    search_query: String,
    is_loading: bool,
    has_more_pages: bool,
    last_load_time: Option<Instant>,
    /// Bumped when a fetch is issued; completions for an older generation
    /// are discarded instead of mutating superseded state.
    generation: u64,
    error_presented: bool,
}

impl SessionState {
    fn new(category: NewsCategory) -> Self {
        Self {
            current_category: category,
            current_page: 1,
            all_articles: Vec::new(),
            displayed: Vec::new(),
            is_searching: false,
            search_query: String::new(),
            is_loading: false,
            has_more_pages: true,
            last_load_time: None,
            generation: 0,
            error_presented: false,
        }
    }
}

/// Pagination and search state machine between the UI and the cache
/// coordinator.
///
/// Public operations are safe to call from the UI task while cache and
/// network I/O run elsewhere; the state lock is never held across an await.
#[derive(Clone)]
pub struct NewsFeedController {
    coordinator: NewsCacheCoordinator,
    settings: SessionSettings,
    state: Arc<RwLock<SessionState>>,
    observers: Arc<RwLock<Vec<Arc<dyn FeedObserver>>>>,
}

impl NewsFeedController {
    pub fn new(coordinator: NewsCacheCoordinator, settings: SessionSettings) -> Self {
        let category = settings.initial_category;
        Self {
            coordinator,
            settings,
            state: Arc::new(RwLock::new(SessionState::new(category))),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn FeedObserver>) {
        self.observers.write().push(observer);
    }

    // Accessors for the UI.

    pub fn displayed_articles(&self) -> Vec<Article> {
        self.state.read().displayed.clone()
    }

    pub fn current_category(&self) -> NewsCategory {
        self.state.read().current_category
    }

    pub fn current_page(&self) -> u32 {
        self.state.read().current_page
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    pub fn is_searching(&self) -> bool {
        self.state.read().is_searching
    }

    pub fn has_more_pages(&self) -> bool {
        self.state.read().has_more_pages
    }

    /// Load page 1 of the current category, replacing the accumulated list.
    pub async fn load_initial(&self) {
        let category = {
            let mut state = self.state.write();
            state.current_page = 1;
            state.all_articles.clear();
            state.displayed.clear();
            state.current_category
        };
        self.fetch(category, 1, true).await;
    }

    /// Switch category. Same category only resets pagination; a new one
    /// resets the whole session and reloads.
    pub async fn select_category(&self, category: NewsCategory) {
        {
            let mut state = self.state.write();
            state.current_page = 1;
            state.has_more_pages = true;
            state.last_load_time = None;

            if category == state.current_category {
                return;
            }

            state.current_category = category;
            state.is_searching = false;
            state.search_query.clear();
        }
        self.load_initial().await;
    }

    /// Fetch the next page unless searching, throttled, already loading, or
    /// the feed is exhausted.
    pub async fn load_more_if_needed(&self) {
        let (category, page) = {
            let mut state = self.state.write();
            if state.is_searching || state.is_loading || !state.has_more_pages {
                return;
            }
            if let Some(last) = state.last_load_time {
                if last.elapsed() < self.settings.min_load_interval {
                    return;
                }
            }
            state.last_load_time = Some(Instant::now());
            state.current_page += 1;
            (state.current_category, state.current_page)
        };
        self.fetch(category, page, false).await;
    }

    /// Drop search state, invalidate the current category's cache so the
    /// reload goes to the network, then reload page 1.
    pub async fn refresh(&self) {
        let category = {
            let mut state = self.state.write();
            state.is_searching = false;
            state.search_query.clear();
            state.current_category
        };
        self.coordinator.clear_category(category).await;
        self.load_initial().await;
    }

    /// Filter the accumulated list by a case-insensitive substring match
    /// over title, description, author, and source name. Pure and
    /// synchronous; never touches the network.
    pub fn search(&self, query: &str) {
        let displayed = {
            let mut state = self.state.write();
            state.search_query = query.trim().to_string();

            if state.search_query.is_empty() {
                state.is_searching = false;
                state.displayed = state.all_articles.clone();
            } else {
                state.is_searching = true;
                state.displayed =
                    Self::filter_articles(&state.all_articles, &state.search_query);
            }
            state.displayed.clone()
        };
        self.notify(|o| o.on_articles_updated(&displayed));
    }

    pub fn cancel_search(&self) {
        self.search("");
    }

    /// The UI dismissed the blocking error dialog; hard errors may be
    /// surfaced again.
    pub fn acknowledge_error(&self) {
        self.state.write().error_presented = false;
    }

    fn filter_articles(articles: &[Article], query: &str) -> Vec<Article> {
        let query = query.to_lowercase();
        articles
            .iter()
            .filter(|a| {
                a.title.to_lowercase().contains(&query)
                    || a.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query))
                    || a.author
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query))
                    || a.source_name.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    async fn fetch(&self, category: NewsCategory, page: u32, is_refreshing: bool) {
        let generation = {
            let mut state = self.state.write();
            state.is_loading = true;
            state.generation += 1;
            state.generation
        };
        self.notify(|o| o.on_loading_changed(true));

        let result = self.coordinator.get_articles(category, page).await;

        // A superseding request (rapid category switch) may have started
        // while this one was in flight; its completion must not clobber the
        // newer session.
        {
            let state = self.state.read();
            if state.generation != generation || state.current_category != category {
                debug!(
                    category = category.as_str(),
                    page, "Discarding stale fetch completion"
                );
                return;
            }
        }

        match result {
            Ok(outcome) => {
                let (displayed, stale, empty_fallback) = {
                    let mut state = self.state.write();
                    state.is_loading = false;

                    if is_refreshing {
                        state.all_articles = outcome.articles.clone();
                    } else {
                        state.all_articles.extend(outcome.articles.iter().cloned());
                    }

                    if outcome.articles.is_empty() {
                        state.has_more_pages = false;
                    }

                    if state.is_searching {
                        state.displayed =
                            Self::filter_articles(&state.all_articles, &state.search_query);
                    } else {
                        state.displayed = state.all_articles.clone();
                    }

                    (
                        state.displayed.clone(),
                        outcome.is_stale(),
                        outcome.articles.is_empty(),
                    )
                };

                self.notify(|o| o.on_loading_changed(false));
                self.notify(|o| o.on_articles_updated(&displayed));

                if stale {
                    if empty_fallback {
                        // A fallback with nothing in it is no fallback.
                        self.emit_error(&FetchError::NoConnectivity.to_string());
                    } else {
                        self.notify(|o| {
                            o.on_cache_state_changed(
                                CacheState::Expired,
                                "Showing cached articles. Check your internet connection.",
                            )
                        });
                    }
                }
            }
            Err(e) => {
                warn!(category = category.as_str(), page, error = %e, "Fetch failed");
                self.state.write().is_loading = false;
                self.notify(|o| o.on_loading_changed(false));
                self.emit_error(&e.to_string());
            }
        }
    }

    /// Hard errors surface at most one at a time: while one is presented,
    /// later ones are dropped until the UI acknowledges it.
    fn emit_error(&self, message: &str) {
        let should_emit = {
            let mut state = self.state.write();
            if state.error_presented {
                false
            } else {
                state.error_presented = true;
                true
            }
        };
        if should_emit {
            self.notify(|o| o.on_error(message));
        }
    }

    fn notify<F: Fn(&dyn FeedObserver)>(&self, f: F) {
        let observers = self.observers.read().clone();
        for observer in observers {
            f(observer.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::client::FeedClient;
    use crate::storage::page_cache::{CachePolicy, PageCacheStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn article(title: &str, author: Option<&str>, source: &str) -> Article {
        Article {
            title: title.to_string(),
            description: Some(format!("About {title}")),
            content: None,
            author: author.map(str::to_string),
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            url_to_image: None,
            published_at: Utc::now(),
            source_name: source.to_string(),
        }
    }

    fn page_of(count: usize, tag: &str) -> Vec<Article> {
        (0..count)
            .map(|n| article(&format!("{tag} {n}"), Some("Reporter"), "Wire"))
            .collect()
    }

    struct ScriptedClient {
        script: Mutex<VecDeque<Result<Vec<Article>, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<Vec<Article>, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedClient for ScriptedClient {
        async fn fetch_page(
            &self,
            _category: NewsCategory,
            _page: u32,
        ) -> Result<Vec<Article>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Loading(bool),
        Updated(usize),
        Error(String),
        CacheStateChanged(CacheState),
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<Event> {
            self.events.lock().clone()
        }

        fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
            self.events.lock().iter().filter(|e| pred(e)).count()
        }
    }

    impl FeedObserver for RecordingObserver {
        fn on_articles_updated(&self, articles: &[Article]) {
            self.events.lock().push(Event::Updated(articles.len()));
        }

        fn on_loading_changed(&self, is_loading: bool) {
            self.events.lock().push(Event::Loading(is_loading));
        }

        fn on_error(&self, message: &str) {
            self.events.lock().push(Event::Error(message.to_string()));
        }

        fn on_cache_state_changed(&self, state: CacheState, _message: &str) {
            self.events.lock().push(Event::CacheStateChanged(state));
        }
    }

    fn controller_with(
        script: Vec<Result<Vec<Article>, FetchError>>,
        settings: SessionSettings,
        policy: CachePolicy,
    ) -> (NewsFeedController, Arc<ScriptedClient>, Arc<RecordingObserver>) {
        let client = ScriptedClient::new(script);
        let store = PageCacheStore::in_memory(policy);
        let coordinator = NewsCacheCoordinator::new(client.clone(), store);
        let controller = NewsFeedController::new(coordinator, settings);
        let observer = Arc::new(RecordingObserver::default());
        controller.subscribe(observer.clone());
        (controller, client, observer)
    }

    fn fast_settings() -> SessionSettings {
        SessionSettings {
            min_load_interval: Duration::from_millis(200),
            initial_category: NewsCategory::General,
        }
    }

    #[tokio::test]
    async fn test_load_initial_populates_and_notifies_once() {
        let (controller, _, observer) = controller_with(
            vec![Ok(page_of(20, "news"))],
            fast_settings(),
            CachePolicy::default(),
        );

        controller.load_initial().await;

        assert_eq!(controller.displayed_articles().len(), 20);
        assert_eq!(
            observer.events(),
            vec![Event::Loading(true), Event::Loading(false), Event::Updated(20)]
        );
    }

    #[tokio::test]
    async fn test_search_filters_all_four_fields_case_insensitively() {
        let articles = vec![
            article("Rust ships new release", Some("Alice"), "TechWire"),
            article("Markets rally", Some("Bob"), "BizDaily"),
            article("Quiet day", Some("carol RUSTON"), "Elsewhere"),
            article("Nothing here", None, "rust-lang blog"),
        ];
        let (controller, _, _) = controller_with(
            vec![Ok(articles)],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;

        controller.search("rust");
        let hits = controller.displayed_articles();
        // Matches title, author, and source name respectively.
        assert_eq!(hits.len(), 3);
        assert!(controller.is_searching());

        controller.search("about markets");
        assert_eq!(controller.displayed_articles().len(), 1);

        controller.search("");
        assert_eq!(controller.displayed_articles().len(), 4);
        assert!(!controller.is_searching());
    }

    #[tokio::test]
    async fn test_search_is_pure_and_restorable() {
        let (controller, _, _) = controller_with(
            vec![Ok(page_of(10, "story"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;

        controller.search("story 3");
        assert_eq!(controller.displayed_articles().len(), 1);

        controller.cancel_search();
        let restored = controller.displayed_articles();
        assert_eq!(restored.len(), 10);
        assert_eq!(restored[0].title, "story 0");
    }

    #[tokio::test]
    async fn test_search_triggers_no_network_call() {
        let (controller, client, _) = controller_with(
            vec![Ok(page_of(5, "a"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        let calls_before = client.calls();

        controller.search("a 1");
        controller.search("zzz");
        controller.cancel_search();

        assert_eq!(client.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_load_more_is_throttled() {
        let (controller, client, _) = controller_with(
            vec![Ok(page_of(5, "p1")), Ok(page_of(5, "p2")), Ok(page_of(5, "p3"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        assert_eq!(controller.current_page(), 1);

        controller.load_more_if_needed().await;
        assert_eq!(controller.current_page(), 2);

        // Within the throttle window: no fetch, no page bump.
        controller.load_more_if_needed().await;
        assert_eq!(controller.current_page(), 2);
        assert_eq!(client.calls(), 2);

        tokio::time::sleep(Duration::from_millis(250)).await;
        controller.load_more_if_needed().await;
        assert_eq!(controller.current_page(), 3);
        assert_eq!(client.calls(), 3);
        assert_eq!(controller.displayed_articles().len(), 15);
    }

    #[tokio::test]
    async fn test_empty_page_stops_pagination() {
        let (controller, client, _) = controller_with(
            vec![Ok(page_of(5, "p1")), Ok(Vec::new())],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        controller.load_more_if_needed().await;
        assert!(!controller.has_more_pages());

        tokio::time::sleep(Duration::from_millis(250)).await;
        controller.load_more_if_needed().await;
        assert_eq!(client.calls(), 2, "exhausted feed must not be fetched again");
    }

    #[tokio::test]
    async fn test_load_more_noop_while_searching() {
        let (controller, client, _) = controller_with(
            vec![Ok(page_of(5, "p1"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        controller.search("p1");

        controller.load_more_if_needed().await;
        assert_eq!(client.calls(), 1);
        assert_eq!(controller.current_page(), 1);
    }

    #[tokio::test]
    async fn test_select_category_resets_session() {
        let (controller, _, _) = controller_with(
            vec![Ok(page_of(5, "general")), Ok(Vec::new()), Ok(page_of(3, "tech"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        controller.load_more_if_needed().await;
        assert!(!controller.has_more_pages());
        assert_eq!(controller.current_page(), 2);

        controller.select_category(NewsCategory::Technology).await;

        assert_eq!(controller.current_category(), NewsCategory::Technology);
        assert_eq!(controller.current_page(), 1);
        assert!(controller.has_more_pages());
        let displayed = controller.displayed_articles();
        assert_eq!(displayed.len(), 3);
        assert!(displayed.iter().all(|a| a.title.starts_with("tech")));
    }

    #[tokio::test]
    async fn test_select_same_category_does_not_reload() {
        let (controller, client, _) = controller_with(
            vec![Ok(page_of(5, "p1"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;

        controller.select_category(NewsCategory::General).await;
        assert_eq!(client.calls(), 1);
        assert_eq!(controller.displayed_articles().len(), 5);
        assert_eq!(controller.current_page(), 1);
    }

    #[tokio::test]
    async fn test_refresh_invalidates_cache_and_refetches() {
        let (controller, client, _) = controller_with(
            vec![Ok(page_of(5, "old")), Ok(page_of(5, "new"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;

        // Without invalidation this would be served from the fresh cache.
        controller.refresh().await;

        assert_eq!(client.calls(), 2);
        assert!(controller
            .displayed_articles()
            .iter()
            .all(|a| a.title.starts_with("new")));
    }

    #[tokio::test]
    async fn test_stale_fallback_is_soft_not_hard() {
        let (controller, _, observer) = controller_with(
            vec![Ok(page_of(5, "p1")), Err(FetchError::NoConnectivity)],
            fast_settings(),
            CachePolicy {
                ttl: Duration::from_millis(20),
                max_cached_pages: 5,
            },
        );
        controller.load_initial().await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        controller.load_initial().await;

        assert_eq!(controller.displayed_articles().len(), 5);
        assert_eq!(
            observer.count(|e| matches!(e, Event::CacheStateChanged(CacheState::Expired))),
            1
        );
        assert_eq!(observer.count(|e| matches!(e, Event::Error(_))), 0);
    }

    #[tokio::test]
    async fn test_offline_without_cache_is_hard_error() {
        let (controller, _, observer) = controller_with(
            vec![Err(FetchError::NoConnectivity)],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;

        assert_eq!(observer.count(|e| matches!(e, Event::Error(_))), 1);
        assert_eq!(
            observer.count(|e| matches!(e, Event::CacheStateChanged(_))),
            0
        );
    }

    #[tokio::test]
    async fn test_hard_errors_deduplicate_until_acknowledged() {
        let (controller, _, observer) = controller_with(
            vec![
                Err(FetchError::Server(500)),
                Err(FetchError::Server(502)),
                Err(FetchError::Server(503)),
            ],
            fast_settings(),
            CachePolicy::default(),
        );

        controller.load_initial().await;
        controller.load_initial().await;
        assert_eq!(observer.count(|e| matches!(e, Event::Error(_))), 1);

        controller.acknowledge_error();
        controller.load_initial().await;
        assert_eq!(observer.count(|e| matches!(e, Event::Error(_))), 2);
    }

    #[tokio::test]
    async fn test_exactly_one_update_per_fetch_completion() {
        let (controller, _, observer) = controller_with(
            vec![Ok(page_of(5, "p1")), Ok(page_of(5, "p2"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        controller.load_more_if_needed().await;

        assert_eq!(observer.count(|e| matches!(e, Event::Updated(_))), 2);
    }

    #[tokio::test]
    async fn test_search_over_accumulated_pages() {
        let (controller, _, _) = controller_with(
            vec![Ok(page_of(5, "alpha")), Ok(page_of(5, "beta"))],
            fast_settings(),
            CachePolicy::default(),
        );
        controller.load_initial().await;
        controller.load_more_if_needed().await;
        assert_eq!(controller.displayed_articles().len(), 10);

        controller.search("alpha");
        assert_eq!(controller.displayed_articles().len(), 5);

        controller.cancel_search();
        assert_eq!(controller.displayed_articles().len(), 10);
    }
}
