//! Debounced location search
//!
//! [`SearchSession`] holds the query and candidate list and decides which
//! results may be shown: every issued search gets the next sequence number
//! and only the latest one may publish, whatever order responses arrive in.
//! [`SearchBox`] drives a session from keystrokes, waiting for typing to
//! pause before calling the geocoder.

use crate::geo::{GeoBackend, GeocodingClient, SearchCandidate};
use crate::location::{AddressResolver, LocationAuthority};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Where the search box is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    #[default]
    Idle,
    /// Waiting for typing to pause
    Pending,
    Searching,
    Results,
    /// Nothing found or the provider failed; the user may retry
    NoResults,
}

/// What the search box shows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub query: String,
    pub candidates: Vec<SearchCandidate>,
    pub status: SearchStatus,
    /// Sequence number of the latest issued search
    pub sequence: u64,
}

impl SearchState {
    /// User-facing hint for the current status
    pub fn message(&self) -> Option<&'static str> {
        match self.status {
            SearchStatus::Searching => Some("Searching..."),
            SearchStatus::NoResults => Some("No locations found. Check the spelling or try again."),
            _ => None,
        }
    }
}

/// A search that has been sent to the geocoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub sequence: u64,
    pub query: String,
}

/// Query text, candidates and the sequence bookkeeping between them
#[derive(Debug, Default)]
pub struct SearchSession {
    query: String,
    candidates: Vec<SearchCandidate>,
    status: SearchStatus,
    latest: u64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new query text
    ///
    /// Any change to the text invalidates a search already in flight; a
    /// blank query also clears the candidates. Returns whether a search
    /// should follow.
    pub fn set_query(&mut self, text: &str) -> bool {
        let changed = self.query != text;
        self.query = text.to_string();
        if text.trim().is_empty() {
            self.candidates.clear();
            self.status = SearchStatus::Idle;
            self.invalidate();
            false
        } else {
            if changed {
                self.invalidate();
            }
            self.status = SearchStatus::Pending;
            true
        }
    }

    /// Issue a search for the current query
    pub fn issue(&mut self) -> Option<SearchTicket> {
        if self.query.trim().is_empty() {
            return None;
        }
        self.latest += 1;
        self.status = SearchStatus::Searching;
        Some(SearchTicket {
            sequence: self.latest,
            query: self.query.clone(),
        })
    }

    /// Apply results, unless a newer search has been issued since
    pub fn complete(&mut self, ticket: &SearchTicket, candidates: Vec<SearchCandidate>) -> bool {
        if ticket.sequence != self.latest {
            debug!(
                "Dropping results for '{}' (sequence {}, latest {})",
                ticket.query, ticket.sequence, self.latest
            );
            return false;
        }
        self.status = if candidates.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Results
        };
        self.candidates = candidates;
        true
    }

    /// Take a candidate by id, clearing the list
    ///
    /// The query becomes the candidate's name without starting a new search.
    pub fn select(&mut self, id: &str) -> Option<SearchCandidate> {
        let candidate = self.candidates.iter().find(|c| c.id == id)?.clone();
        self.candidates.clear();
        self.query = candidate.display_name.clone();
        self.status = SearchStatus::Idle;
        self.invalidate();
        Some(candidate)
    }

    /// Reset query and candidates
    pub fn clear(&mut self) {
        self.set_query("");
    }

    pub fn state(&self) -> SearchState {
        SearchState {
            query: self.query.clone(),
            candidates: self.candidates.clone(),
            status: self.status,
            sequence: self.latest,
        }
    }

    /// Make every outstanding ticket stale
    fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// Session plus the channel its state is published on
struct Shared {
    session: Mutex<SearchSession>,
    updates: watch::Sender<SearchState>,
}

impl Shared {
    /// Mutate the session and publish the result in one step
    fn update<T>(&self, f: impl FnOnce(&mut SearchSession) -> T) -> T {
        let mut session = self.lock();
        let out = f(&mut session);
        self.updates.send_replace(session.state());
        out
    }

    fn lock(&self) -> MutexGuard<'_, SearchSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Search box that calls the geocoder once typing pauses
pub struct SearchBox<B> {
    client: Arc<GeocodingClient<B>>,
    debounce: Duration,
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl<B: GeoBackend + 'static> SearchBox<B> {
    pub fn new(client: Arc<GeocodingClient<B>>, debounce: Duration) -> Self {
        let (updates, _) = watch::channel(SearchState::default());
        Self {
            client,
            debounce,
            shared: Arc::new(Shared {
                session: Mutex::new(SearchSession::new()),
                updates,
            }),
            timer: None,
        }
    }

    /// Receiver notified whenever the displayed state changes
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.updates.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.shared.lock().state()
    }

    /// The query text changed
    ///
    /// Restarts the debounce timer; the search is only issued once no
    /// further input arrives within the delay.
    pub fn input(&mut self, text: &str) {
        self.cancel_timer();
        if !self.shared.update(|session| session.set_query(text)) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let client = Arc::clone(&self.client);
        let debounce = self.debounce;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(ticket) = shared.update(SearchSession::issue) else {
                return;
            };
            // Detached so that further typing cannot abort a search already sent
            tokio::spawn(async move {
                let candidates = client.search(&ticket.query).await;
                shared.update(|session| session.complete(&ticket, candidates));
            });
        }));
    }

    /// Select a candidate and hand it to the location authority
    pub fn select<R: AddressResolver + 'static>(
        &mut self,
        id: &str,
        authority: &LocationAuthority<R>,
    ) -> Option<SearchCandidate> {
        self.cancel_timer();
        let candidate = self.shared.update(|session| session.select(id))?;
        authority.apply_search_selection(candidate.coordinate, candidate.display_name.clone());
        Some(candidate)
    }

    pub fn clear(&mut self) {
        self.cancel_timer();
        self.shared.update(SearchSession::clear);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<B> Drop for SearchBox<B> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
