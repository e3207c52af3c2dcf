//! Search state and the lifecycle of the single outbound fetch.
//!
//! The controller is owned by one task (the UI loop) and is the only thing
//! that mutates [`SearchState`]. Fetches run on spawned tasks and report back
//! through a channel; the controller applies a report only if it belongs to
//! the fetch that is currently live.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Settings,
    display::location_label,
    model::WeatherReading,
    provider::{FetchError, WeatherProvider},
    storage::{KeyValueStore, LAST_CITY, WEATHER_API_KEY},
};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a city name.";
pub const MISSING_KEY_MESSAGE: &str = "Missing API key. Provide one (it is stored locally) \
     or set REACT_APP_WEATHER_API_KEY / NEXT_PUBLIC_WEATHER_API_KEY.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Live input text.
    pub query: String,
    /// Last submitted city; empty when nothing is committed.
    pub committed_city: String,
    pub result: Option<WeatherReading>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Error,
}

impl SearchState {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Error
        } else if self.result.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    /// One-line status suitable for a screen reader live region.
    pub fn status_announcement(&self) -> String {
        match self.phase() {
            Phase::Loading => "Loading weather…".to_string(),
            Phase::Error => format!("Error: {}", self.error.as_deref().unwrap_or_default()),
            Phase::Success => {
                let name = self
                    .result
                    .as_ref()
                    .map(|r| r.location.name.as_str())
                    .filter(|n| !n.is_empty())
                    .unwrap_or("selected city");
                format!("Weather loaded for {name}")
            }
            Phase::Idle => "Idle".to_string(),
        }
    }
}

/// Report sent by a fetch task when it finishes, for whatever reason.
#[derive(Debug)]
struct FetchCompletion {
    id: u64,
    outcome: Result<WeatherReading, FetchError>,
}

#[derive(Debug)]
struct LiveFetch {
    id: u64,
    city: String,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct SearchController {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn KeyValueStore>,
    settings: Settings,
    state: SearchState,
    show_key_prompt: bool,
    live: Option<LiveFetch>,
    next_fetch_id: u64,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
}

impl SearchController {
    pub fn new(
        settings: Settings,
        provider: Arc<dyn WeatherProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let show_key_prompt = settings.credential.is_empty();

        Self {
            provider,
            store,
            settings,
            state: SearchState::default(),
            show_key_prompt,
            live: None,
            next_fetch_id: 0,
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn status_announcement(&self) -> String {
        self.state.status_announcement()
    }

    pub fn credential_present(&self) -> bool {
        !self.settings.credential.is_empty()
    }

    /// Whether the user should be asked for an API key.
    pub fn show_key_prompt(&self) -> bool {
        self.show_key_prompt
    }

    pub fn has_live_fetch(&self) -> bool {
        self.live.is_some()
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.state.query = text.into();
    }

    /// Restore the last committed city from storage and fetch it.
    pub fn restore(&mut self) {
        let last = match self.store.get(LAST_CITY) {
            Ok(last) => last,
            Err(err) => {
                tracing::warn!("could not read last city: {err:#}");
                None
            }
        };

        if let Some(city) = last.filter(|c| !c.trim().is_empty()) {
            self.state.query = city.clone();
            self.state.committed_city = city;
            self.fetch_committed();
        }
    }

    /// Commit the current query as a search.
    pub fn submit(&mut self) {
        let trimmed = self.state.query.trim().to_string();
        if trimmed.is_empty() {
            self.state.error = Some(EMPTY_QUERY_MESSAGE.to_string());
            self.state.result = None;
            return;
        }

        if self.state.loading {
            self.cancel_live();
        }
        self.state.committed_city = trimmed;
        self.fetch_committed();
    }

    /// Reset to the initial state and forget the last city.
    ///
    /// A fetch that is still running is not cancelled; its report is dropped
    /// when it arrives.
    pub fn clear(&mut self) {
        self.state = SearchState::default();
        self.live = None;

        if let Err(err) = self.store.remove(LAST_CITY) {
            tracing::warn!("could not forget last city: {err:#}");
        }
    }

    /// Store a user-entered API key. Returns `false` when the input is blank.
    pub fn save_credential(&mut self, input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return false;
        }

        if let Err(err) = self.store.set(WEATHER_API_KEY, trimmed) {
            tracing::warn!("could not persist API key: {err:#}");
        }
        self.settings.credential = trimmed.to_string();
        self.show_key_prompt = false;

        self.fetch_committed();
        true
    }

    /// Apply every report that has already arrived. Returns how many changed state.
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next report and apply it. Returns whether it changed state.
    ///
    /// Never resolves if no fetch was ever started.
    pub async fn next_completion(&mut self) -> bool {
        match self.completions_rx.recv().await {
            Some(completion) => self.apply(completion),
            None => false,
        }
    }

    /// Wait until no fetch is live.
    pub async fn settle(&mut self) {
        while self.live.is_some() {
            self.next_completion().await;
        }
    }

    fn cancel_live(&mut self) {
        if let Some(live) = self.live.take() {
            tracing::debug!(fetch_id = live.id, city = %live.city, "cancelling fetch");
            live.cancel.cancel();
        }
    }

    fn fetch_committed(&mut self) {
        let city = self.state.committed_city.clone();
        if city.is_empty() {
            return;
        }

        self.cancel_live();

        if self.settings.credential.is_empty() {
            self.state.loading = false;
            self.state.error = Some(MISSING_KEY_MESSAGE.to_string());
            self.state.result = None;
            return;
        }

        let id = self.next_fetch_id;
        self.next_fetch_id += 1;

        let cancel = CancellationToken::new();
        self.live = Some(LiveFetch { id, city: city.clone(), cancel: cancel.clone() });
        self.state.loading = true;
        self.state.error = None;

        tracing::debug!(fetch_id = id, %city, "starting fetch");

        let provider = Arc::clone(&self.provider);
        let api_key = self.settings.credential.clone();
        let timeout = self.settings.timeout;
        let tx = self.completions_tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                _ = tokio::time::sleep(timeout) => {
                    cancel.cancel();
                    Err(FetchError::Timeout)
                }
                res = provider.current(&api_key, &city) => res,
            };

            // The controller may be gone already.
            let _ = tx.send(FetchCompletion { id, outcome });
        });
    }

    fn apply(&mut self, completion: FetchCompletion) -> bool {
        let live = match self.live.take() {
            Some(live) if live.id == completion.id => live,
            other => {
                self.live = other;
                tracing::debug!(fetch_id = completion.id, "dropping report from abandoned fetch");
                return false;
            }
        };

        self.state.loading = false;

        match completion.outcome {
            Ok(reading) => {
                tracing::debug!(
                    fetch_id = live.id,
                    location = %location_label(&reading),
                    "fetch succeeded"
                );
                self.state.result = Some(reading);
                if let Err(err) = self.store.set(LAST_CITY, &live.city) {
                    tracing::warn!("could not persist last city: {err:#}");
                }
            }
            Err(err) if err.is_silent() => {
                tracing::debug!(fetch_id = live.id, "fetch ended silently: {err}");
            }
            Err(err) => {
                self.state.result = None;
                self.state.error = Some(err.to_string());
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Condition, Location},
        storage::MemoryStore,
    };
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::Mutex, time::Duration};

    fn reading_for(city: &str) -> WeatherReading {
        WeatherReading {
            location: Location {
                name: city.to_string(),
                region: String::new(),
                country: "Testland".into(),
                lat: 1.0,
                lon: 2.0,
            },
            temperature_c: 20.0,
            feels_like_c: 19.0,
            humidity_pct: 50,
            pressure_mb: 1013.0,
            wind_kph: 36.0,
            condition: Condition { text: "Sunny".into(), icon: "//cdn/x.png".into() },
            observed_at: None,
        }
    }

    #[derive(Debug, Default)]
    struct FakeProvider {
        delays: HashMap<String, Duration>,
        failures: HashMap<String, FetchError>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeProvider {
        fn delayed(mut self, city: &str, secs: u64) -> Self {
            self.delays.insert(city.to_string(), Duration::from_secs(secs));
            self
        }

        fn failing(mut self, city: &str, err: FetchError) -> Self {
            self.failures.insert(city.to_string(), err);
            self
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current(&self, api_key: &str, city: &str) -> Result<WeatherReading, FetchError> {
            self.calls.lock().unwrap().push((api_key.to_string(), city.to_string()));
            if let Some(delay) = self.delays.get(city) {
                tokio::time::sleep(*delay).await;
            }
            if let Some(err) = self.failures.get(city) {
                return Err(err.clone());
            }
            Ok(reading_for(city))
        }
    }

    fn settings(key: &str) -> Settings {
        Settings {
            credential: key.to_string(),
            base_url: "http://unused".into(),
            timeout: Duration::from_secs(10),
        }
    }

    fn controller(
        key: &str,
        provider: FakeProvider,
    ) -> (SearchController, Arc<FakeProvider>, Arc<MemoryStore>) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryStore::default());
        let ctl = SearchController::new(settings(key), provider.clone(), store.clone());
        (ctl, provider, store)
    }

    fn search(ctl: &mut SearchController, city: &str) {
        ctl.set_query(city);
        ctl.submit();
    }

    #[tokio::test]
    async fn empty_query_sets_validation_error_without_network() {
        let (mut ctl, provider, _) = controller("KEY", FakeProvider::default());

        search(&mut ctl, "Lagos");
        ctl.settle().await;
        assert!(ctl.state().result.is_some());

        search(&mut ctl, "   ");

        assert_eq!(ctl.state().error.as_deref(), Some(EMPTY_QUERY_MESSAGE));
        assert!(ctl.state().result.is_none());
        assert_eq!(ctl.phase(), Phase::Error);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn successful_search_stores_reading_and_last_city() {
        let (mut ctl, provider, store) = controller("KEY", FakeProvider::default());

        search(&mut ctl, "  Tokyo ");
        assert_eq!(ctl.phase(), Phase::Loading);
        assert_eq!(ctl.status_announcement(), "Loading weather…");

        ctl.settle().await;

        assert_eq!(ctl.phase(), Phase::Success);
        assert_eq!(ctl.state().committed_city, "Tokyo");
        assert_eq!(ctl.state().result.as_ref().unwrap().location.name, "Tokyo");
        assert_eq!(store.get(LAST_CITY).unwrap().as_deref(), Some("Tokyo"));
        assert_eq!(provider.calls(), vec![("KEY".to_string(), "Tokyo".to_string())]);
        assert_eq!(ctl.status_announcement(), "Weather loaded for Tokyo");
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let (mut ctl, provider, _) = controller("", FakeProvider::default());
        assert!(ctl.show_key_prompt());

        search(&mut ctl, "Lagos");

        assert_eq!(ctl.state().error.as_deref(), Some(MISSING_KEY_MESSAGE));
        assert!(!ctl.state().loading);
        assert!(!ctl.has_live_fetch());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_search_cancels_the_previous_one() {
        let provider = FakeProvider::default().delayed("Slowtown", 5).delayed("Fasttown", 1);
        let (mut ctl, provider, store) = controller("KEY", provider);

        search(&mut ctl, "Slowtown");
        tokio::task::yield_now().await;
        search(&mut ctl, "Fasttown");
        ctl.settle().await;

        assert_eq!(ctl.state().result.as_ref().unwrap().location.name, "Fasttown");
        assert_eq!(store.get(LAST_CITY).unwrap().as_deref(), Some("Fasttown"));

        // Let the abandoned task run to the end; nothing may change.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ctl.poll_completions(), 0);
        assert_eq!(ctl.state().result.as_ref().unwrap().location.name, "Fasttown");
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn report_from_abandoned_fetch_is_ignored() {
        let provider = FakeProvider::default().delayed("Slowtown", 5).delayed("Fasttown", 5);
        let (mut ctl, _, _) = controller("KEY", provider);

        search(&mut ctl, "Slowtown");
        search(&mut ctl, "Fasttown");

        // A success that raced past its cancellation.
        ctl.completions_tx
            .send(FetchCompletion { id: 0, outcome: Ok(reading_for("Slowtown")) })
            .unwrap();
        assert_eq!(ctl.poll_completions(), 0);
        assert!(ctl.state().loading);
        assert!(ctl.state().result.is_none());

        ctl.completions_tx
            .send(FetchCompletion {
                id: 0,
                outcome: Err(FetchError::Network("connection reset".into())),
            })
            .unwrap();
        assert_eq!(ctl.poll_completions(), 0);
        assert!(ctl.state().error.is_none());

        ctl.settle().await;
        assert_eq!(ctl.state().result.as_ref().unwrap().location.name, "Fasttown");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_stops_loading_silently() {
        let provider = FakeProvider::default().delayed("Nowhere", 30);
        let (mut ctl, _, store) = controller("KEY", provider);

        search(&mut ctl, "Nowhere");
        ctl.settle().await;

        assert!(!ctl.state().loading);
        assert!(ctl.state().error.is_none());
        assert!(ctl.state().result.is_none());
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(store.get(LAST_CITY).unwrap(), None);
    }

    #[tokio::test]
    async fn provider_error_clears_previous_reading() {
        let provider = FakeProvider::default().failing(
            "Atlantis",
            FetchError::Provider { status: 400, message: "No matching location found.".into() },
        );
        let (mut ctl, _, store) = controller("KEY", provider);

        search(&mut ctl, "Lagos");
        ctl.settle().await;
        search(&mut ctl, "Atlantis");
        ctl.settle().await;

        assert!(ctl.state().result.is_none());
        assert_eq!(ctl.state().error.as_deref(), Some("No matching location found."));
        assert_eq!(ctl.status_announcement(), "Error: No matching location found.");
        assert_eq!(store.get(LAST_CITY).unwrap().as_deref(), Some("Lagos"));

        // Still usable afterwards.
        search(&mut ctl, "Lagos");
        ctl.settle().await;
        assert_eq!(ctl.phase(), Phase::Success);
    }

    #[tokio::test]
    async fn network_error_is_surfaced() {
        let provider =
            FakeProvider::default().failing("Lagos", FetchError::Network("dns failure".into()));
        let (mut ctl, _, _) = controller("KEY", provider);

        search(&mut ctl, "Lagos");
        ctl.settle().await;

        assert_eq!(ctl.state().error.as_deref(), Some("dns failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_state_and_drops_late_report() {
        let provider = FakeProvider::default().delayed("Slowtown", 5);
        let (mut ctl, provider, store) = controller("KEY", provider);
        store.set(LAST_CITY, "Lagos").unwrap();

        search(&mut ctl, "Slowtown");
        ctl.clear();

        assert_eq!(ctl.state(), &SearchState::default());
        assert_eq!(store.get(LAST_CITY).unwrap(), None);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(ctl.poll_completions(), 0);
        assert_eq!(ctl.state(), &SearchState::default());
        assert_eq!(store.get(LAST_CITY).unwrap(), None);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn restore_fetches_last_city_when_key_present() {
        let (mut ctl, provider, store) = controller("KEY", FakeProvider::default());
        store.set(LAST_CITY, "London").unwrap();

        ctl.restore();
        assert_eq!(ctl.state().query, "London");
        assert_eq!(ctl.state().committed_city, "London");

        ctl.settle().await;
        assert_eq!(ctl.state().result.as_ref().unwrap().location.name, "London");
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn restore_without_last_city_stays_idle() {
        let (mut ctl, provider, _) = controller("KEY", FakeProvider::default());

        ctl.restore();

        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.status_announcement(), "Idle");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn saving_a_key_refetches_the_committed_city() {
        let (mut ctl, provider, store) = controller("", FakeProvider::default());
        store.set(LAST_CITY, "London").unwrap();

        ctl.restore();
        assert_eq!(ctl.state().error.as_deref(), Some(MISSING_KEY_MESSAGE));

        assert!(!ctl.save_credential("   "));
        assert!(ctl.show_key_prompt());

        assert!(ctl.save_credential("  NEWKEY "));
        assert!(!ctl.show_key_prompt());
        assert!(ctl.credential_present());
        assert_eq!(store.get(WEATHER_API_KEY).unwrap().as_deref(), Some("NEWKEY"));

        ctl.settle().await;
        assert_eq!(ctl.phase(), Phase::Success);
        assert_eq!(provider.calls(), vec![("NEWKEY".to_string(), "London".to_string())]);
    }

    #[tokio::test]
    async fn saving_a_key_without_committed_city_does_not_fetch() {
        let (mut ctl, provider, _) = controller("", FakeProvider::default());

        assert!(ctl.save_credential("KEY"));

        assert!(!ctl.has_live_fetch());
        assert!(provider.calls().is_empty());
    }
}
