//! Parse cache shared across resolutions.
//!
//! Entries are keyed by `(template name, content identity)`, so an edited
//! template never hits a stale entry. The first caller for a key reserves it
//! with a `Pending` state and parses; concurrent callers wait on the
//! reservation's `Notify` and then read the stored result. Failures are
//! stored too, so every waiter observes the same error and a template is
//! parsed at most once per content identity.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use crate::core::ScaffoldError;
use crate::source::SourceText;
use crate::templating::{ParsedTemplate, parse_template};

type ParseResult = Result<Arc<ParsedTemplate>, ScaffoldError>;

#[derive(Debug, Clone)]
enum ParseState {
    /// Another caller is parsing this key.
    Pending(Arc<Notify>),
    Ready(ParseResult),
}

/// Memoized template parses.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: DashMap<(String, String), ParseState>,
    parses: AtomicUsize,
    hits: AtomicUsize,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` for `name`, or return the stored result for the same
    /// name and content identity.
    pub async fn get_or_parse(&self, name: &str, source: &SourceText) -> ParseResult {
        let key = (name.to_string(), source.content_id.clone());
        let notify = Arc::new(Notify::new());

        loop {
            match self.entries.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    let pending = match entry.get() {
                        ParseState::Ready(result) => {
                            self.hits.fetch_add(1, Ordering::SeqCst);
                            tracing::debug!(template = name, "parse cache hit");
                            return result.clone();
                        }
                        ParseState::Pending(pending) => pending.clone(),
                    };
                    // Register before releasing the entry so the wakeup cannot be missed
                    let notified = pending.notified();
                    drop(entry);
                    tracing::debug!(template = name, "waiting for in-flight parse");
                    notified.await;
                }
                Entry::Vacant(entry) => {
                    entry.insert(ParseState::Pending(notify.clone()));
                    break;
                }
            }
        }

        self.parses.fetch_add(1, Ordering::SeqCst);
        let result = parse_template(name, &source.text).map(Arc::new);
        if let Err(err) = &result {
            tracing::debug!(template = name, error = %err, "caching parse failure");
        }

        self.entries.insert(key.clone(), ParseState::Ready(result.clone()));
        // Older content of the same template can never be requested again
        self.entries.retain(|(entry_name, content_id), state| {
            entry_name != name || *content_id == key.1 || matches!(state, ParseState::Pending(_))
        });
        notify.notify_waiters();
        result
    }

    /// Drop every entry for `name`.
    pub fn invalidate(&self, name: &str) {
        self.entries.retain(|(entry_name, _), _| entry_name != name);
    }

    /// Number of parses actually performed.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
