//! Debounced summary prefetching for one browsing context.
//!
//! Eligibility signals are coalesced behind a quiet period; once it elapses the
//! summary comes from the cache or from a single fetch. User requests join the
//! fetch already in flight instead of starting another one, also when the page
//! left its url and came back while that fetch was running.
//!
//! There is no cancellation of a request once sent. If the page navigates while
//! a fetch is running, the result is thrown away when it arrives.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::page::PageSource;
use super::summary_cache::SummaryCache;
use crate::error::SummaryError;
use crate::services::summarizer::Summarizer;

pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Debouncing,
    Fetching,
    Ready,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Eligible,
    CacheHit,
    FetchStarted,
    FetchJoined,
    FetchSucceeded,
    FetchDiscarded,
    FetchFailed,
    Navigated,
}

/// Transition table. `None` means the event does not apply in that state.
pub fn transition(from: Status, event: Event) -> Option<Status> {
    use Event::*;
    use Status::*;
    match (from, event) {
        (_, Navigated) => Some(Stale),
        (Idle | Stale | Debouncing, Eligible) => Some(Debouncing),
        (Idle | Stale | Debouncing, CacheHit) => Some(Ready),
        (Idle | Stale | Debouncing, FetchStarted | FetchJoined) => Some(Fetching),
        (Idle | Stale | Debouncing | Fetching, FetchSucceeded) => Some(Ready),
        (Fetching, FetchDiscarded) => Some(Stale),
        (Fetching, FetchFailed) => Some(Idle),
        _ => None,
    }
}

/// Snapshot published to the UI on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchState {
    pub url: String,
    pub status: Status,
    pub summary: Option<String>,
}

type Outcome = Result<String, SummaryError>;

struct InFlight {
    id: u64,
    result: watch::Receiver<Option<Outcome>>,
}

struct Machine {
    state: PrefetchState,
    timer: Option<JoinHandle<()>>,
    timer_seq: u64,
    /// At most one running fetch per url, kept across navigation so a page
    /// that comes back rejoins it.
    in_flight: HashMap<String, InFlight>,
    fetch_seq: u64,
}

impl Machine {
    fn apply(&mut self, event: Event) -> bool {
        let from = self.state.status;
        let Some(to) = transition(from, event) else {
            return false;
        };
        if from == Status::Debouncing && to != Status::Debouncing {
            if let Some(timer) = self.timer.take() {
                timer.abort();
            }
        }
        debug!(url = %self.state.url, ?from, ?to, ?event, "prefetch transition");
        self.state.status = to;
        true
    }
}

struct Inner {
    page: Arc<dyn PageSource>,
    summarizer: Arc<dyn Summarizer>,
    cache: Arc<SummaryCache>,
    quiet_period: Duration,
    machine: Mutex<Machine>,
    updates: watch::Sender<PrefetchState>,
}

#[derive(Clone)]
pub struct PrefetchScheduler {
    inner: Arc<Inner>,
}

impl PrefetchScheduler {
    pub fn new(page: Arc<dyn PageSource>, summarizer: Arc<dyn Summarizer>, cache: Arc<SummaryCache>) -> Self {
        Self::with_quiet_period(page, summarizer, cache, QUIET_PERIOD)
    }

    pub fn with_quiet_period(
        page: Arc<dyn PageSource>,
        summarizer: Arc<dyn Summarizer>,
        cache: Arc<SummaryCache>,
        quiet_period: Duration,
    ) -> Self {
        let state = PrefetchState { url: page.current_url(), status: Status::Idle, summary: None };
        let (updates, _) = watch::channel(state.clone());
        let machine = Machine { state, timer: None, timer_seq: 0, in_flight: HashMap::new(), fetch_seq: 0 };
        Self {
            inner: Arc::new(Inner { page, summarizer, cache, quiet_period, machine: Mutex::new(machine), updates }),
        }
    }

    /// Follow state changes, e.g. to show a "summary available" banner on Ready.
    pub fn subscribe(&self) -> watch::Receiver<PrefetchState> {
        self.inner.updates.subscribe()
    }

    pub async fn state(&self) -> PrefetchState {
        self.inner.machine.lock().await.state.clone()
    }

    /// The page at `url` passed the content gate. Starts or re-arms the quiet period.
    pub async fn on_eligible(&self, url: &str) {
        let mut m = self.inner.machine.lock().await;
        self.observe_url(&mut m, url);
        if m.apply(Event::Eligible) {
            self.arm_timer(&mut m);
            self.publish(&m);
        }
    }

    /// Explicit user request for the summary of `url`.
    ///
    /// Returns at once when the summary is ready, joins a running fetch, and
    /// otherwise skips the quiet period and fetches now.
    pub async fn trigger(&self, url: &str) -> Result<String, SummaryError> {
        let pending = {
            let mut m = self.inner.machine.lock().await;
            self.observe_url(&mut m, url);

            if let (Status::Ready, Some(summary)) = (m.state.status, m.state.summary.as_ref()) {
                return Ok(summary.clone());
            }
            match self.join_in_flight(&mut m) {
                Some(rx) => rx,
                None => {
                    if let Some(summary) = self.inner.cache.get(url) {
                        self.settle_from_cache(&mut m, summary.clone());
                        return Ok(summary);
                    }
                    self.start_fetch(&mut m)
                }
            }
        };
        await_outcome(pending).await
    }

    /// One-off summary of a text selection. Not cached and independent of the page state.
    pub async fn summarize_selection(&self, text: &str) -> Result<String, SummaryError> {
        self.inner.summarizer.summarize(text).await
    }

    fn observe_url(&self, m: &mut Machine, url: &str) {
        if m.state.url == url {
            return;
        }
        info!(from = %m.state.url, to = %url, "page changed");
        m.apply(Event::Navigated);
        if let Some(timer) = m.timer.take() {
            timer.abort();
        }
        m.state.url = url.to_string();
        m.state.summary = None;
        self.publish(m);
    }

    fn arm_timer(&self, m: &mut Machine) {
        if let Some(timer) = m.timer.take() {
            timer.abort();
        }
        m.timer_seq += 1;
        let seq = m.timer_seq;
        let this = self.clone();
        let quiet = self.inner.quiet_period;
        m.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            this.quiet_period_elapsed(seq).await;
        }));
    }

    async fn quiet_period_elapsed(&self, seq: u64) {
        let mut m = self.inner.machine.lock().await;
        if m.timer_seq != seq || m.state.status != Status::Debouncing {
            return;
        }
        // This task is the timer; detach instead of aborting ourselves.
        drop(m.timer.take());

        if self.join_in_flight(&mut m).is_some() {
            return;
        }
        let url = m.state.url.clone();
        match self.inner.cache.get(&url) {
            Some(summary) => self.settle_from_cache(&mut m, summary),
            None => {
                // Nobody awaits a prefetch; the outcome lands in the state.
                let _ = self.start_fetch(&mut m);
            }
        }
    }

    /// Go back to Fetching on a fetch still running for the current url.
    fn join_in_flight(&self, m: &mut Machine) -> Option<watch::Receiver<Option<Outcome>>> {
        let rx = m.in_flight.get(&m.state.url)?.result.clone();
        if m.apply(Event::FetchJoined) {
            self.publish(m);
        }
        debug!(url = %m.state.url, "joining in-flight fetch");
        Some(rx)
    }

    fn settle_from_cache(&self, m: &mut Machine, summary: String) {
        if m.apply(Event::CacheHit) {
            info!(url = %m.state.url, "summary served from cache");
            m.state.summary = Some(summary);
            self.publish(m);
        }
    }

    fn start_fetch(&self, m: &mut Machine) -> watch::Receiver<Option<Outcome>> {
        m.apply(Event::FetchStarted);
        m.fetch_seq += 1;
        let id = m.fetch_seq;
        let url = m.state.url.clone();
        let (tx, rx) = watch::channel(None);
        m.in_flight.insert(url.clone(), InFlight { id, result: rx.clone() });
        self.publish(m);

        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.fetch().await;
            let outcome = this.finish_fetch(id, &url, outcome).await;
            tx.send_replace(Some(outcome));
        });
        rx
    }

    async fn fetch(&self) -> Outcome {
        let text = self.inner.page.extract_text()?;
        self.inner.summarizer.summarize(&text).await
    }

    async fn finish_fetch(&self, id: u64, url: &str, outcome: Outcome) -> Outcome {
        let mut m = self.inner.machine.lock().await;
        if m.in_flight.get(url).is_some_and(|f| f.id == id) {
            m.in_flight.remove(url);
        }
        let shown = m.state.url == url;
        let still_here = shown && self.inner.page.current_url() == url;

        match outcome {
            Ok(summary) if still_here => {
                if m.apply(Event::FetchSucceeded) {
                    m.state.summary = Some(summary.clone());
                    self.publish(&m);
                }
                drop(m);
                self.inner.cache.put(url, &summary);
                info!(%url, "summary ready");
                Ok(summary)
            }
            Ok(_) => {
                if shown && m.apply(Event::FetchDiscarded) {
                    self.publish(&m);
                }
                info!(%url, "discarding summary for a page that is no longer shown");
                Err(SummaryError::Stale)
            }
            Err(e) => {
                if shown && m.apply(Event::FetchFailed) {
                    self.publish(&m);
                }
                warn!(%url, error = %e, "summary fetch failed");
                Err(e)
            }
        }
    }

    fn publish(&self, m: &Machine) {
        self.inner.updates.send_replace(m.state.clone());
    }
}

async fn await_outcome(mut rx: watch::Receiver<Option<Outcome>>) -> Outcome {
    match rx.wait_for(|o| o.is_some()).await.map(|o| (*o).clone()) {
        Ok(Some(outcome)) => outcome,
        _ => Err(SummaryError::ProviderUnavailable("summary fetch ended without a result".into())),
    }
}
