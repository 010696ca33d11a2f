//! The fetch-retry-paginate loop.
//!
//! For each query the collector walks the provider's result pages, writing
//! every post to the raw dataset the moment it arrives. Per query it runs a
//! small state machine:
//!
//! ```text
//! Start -> Fetching -> (Retrying -> Fetching)* -> Paging -> ... -> Done
//! ```
//!
//! - a successful fetch resets the consecutive-failure counter
//! - a page with no items at all, or with no continuation, ends the query;
//!   a page whose items were all dropped by validation does not
//! - the query stops the moment its target count is written, mid-page if
//!   need be
//! - after `max_retries` consecutive transient failures the query is
//!   abandoned and the run moves on
//! - a fatal provider error ends the query at once, without retrying, and
//!   the run moves on
//!
//! The global sequence number is the writer's row count, so it only advances
//! together with a successful append.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::model::{Cursor, Post, Query, Ranking, Record, ResultPage};
use crate::provider::{SearchProvider, Session};
use crate::storage::RecordWriter;

/// Pacing and retry settings for a collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectPolicy {
    /// Consecutive failed fetches after which a query is abandoned.
    pub max_retries: u32,
    /// Wait before re-attempting a failed fetch.
    pub retry_backoff: Duration,
    /// Wait after each consumed page before requesting the next one.
    pub page_pause: Duration,
    /// Wait between two queries.
    pub query_pause: Duration,
    /// Result ordering requested from the provider.
    pub ranking: Ranking,
}

impl Default for CollectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 30,
            retry_backoff: Duration::from_secs(60),
            page_pause: Duration::from_secs(5),
            query_pause: Duration::from_secs(15),
            ranking: Ranking::Top,
        }
    }
}

impl CollectPolicy {
    /// Same retry budget with every wait set to zero.
    #[must_use]
    pub fn without_pauses(self) -> Self {
        Self {
            retry_backoff: Duration::ZERO,
            page_pause: Duration::ZERO,
            query_pause: Duration::ZERO,
            ..self
        }
    }
}

/// Why a query stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The target count was written.
    TargetReached,
    /// The provider ran out of results first.
    Exhausted,
    /// `max_retries` consecutive fetches failed.
    RetriesExhausted,
    /// The provider returned an error retrying cannot fix.
    Failed,
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetReached => write!(f, "target reached"),
            Self::Exhausted => write!(f, "no more results"),
            Self::RetriesExhausted => write!(f, "abandoned after retries"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-query summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    pub term: String,
    pub target: usize,
    pub collected: usize,
    pub pages: usize,
    /// Failed fetches over the whole query, not just the last streak.
    pub failed_fetches: u32,
    pub outcome: QueryOutcome,
    /// The fatal provider error, for [`QueryOutcome::Failed`].
    pub error: Option<String>,
}

/// Summary of a collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub queries: Vec<QueryReport>,
    pub total: u64,
}

impl CollectReport {
    /// Queries that ended on a fatal provider error.
    pub fn failed(&self) -> impl Iterator<Item = &QueryReport> {
        self.queries
            .iter()
            .filter(|q| q.outcome == QueryOutcome::Failed)
    }
}

/// Next move of one query's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Request the first page, or the page the stored cursor points to.
    Fetch,
    /// Wait out the backoff, then repeat the same request. `failures` is the
    /// current run of consecutive failed fetches.
    Retry { failures: u32 },
    Done(QueryOutcome),
}

/// Mutable state of one query, threaded through its fetch steps.
#[derive(Debug, Default)]
struct QueryWalk {
    cursor: Option<Cursor>,
    collected: usize,
    pages: usize,
    failed_fetches: u32,
    error: Option<String>,
}

/// Drives a provider through a list of queries into a [`RecordWriter`].
pub struct Collector<'a, P: SearchProvider + ?Sized> {
    provider: &'a P,
    session: &'a Session,
    writer: RecordWriter,
    policy: CollectPolicy,
}

impl<'a, P: SearchProvider + ?Sized> Collector<'a, P> {
    pub const fn new(
        provider: &'a P,
        session: &'a Session,
        writer: RecordWriter,
        policy: CollectPolicy,
    ) -> Self {
        Self {
            provider,
            session,
            writer,
            policy,
        }
    }

    /// Records written so far in this run.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.writer.rows_written()
    }

    /// Run every query in order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a record cannot be appended. Records
    /// written before the error stay on disk. Provider errors never fail the
    /// run; they end up in the per-query reports.
    pub async fn collect(mut self, queries: &[Query]) -> Result<CollectReport> {
        let mut report = CollectReport::default();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.policy.query_pause.is_zero() {
                info!(
                    seconds = self.policy.query_pause.as_secs(),
                    "Pausing before next query"
                );
                tokio::time::sleep(self.policy.query_pause).await;
            }
            let query_report = self.collect_query(query).await?;
            report.queries.push(query_report);
        }

        report.total = self.total();
        info!(
            total = report.total,
            failed_queries = report.failed().count(),
            path = %self.writer.path().display(),
            "Collection finished"
        );
        Ok(report)
    }

    /// Walk one query's pages until its target, exhaustion or the retry
    /// budget.
    async fn collect_query(&mut self, query: &Query) -> Result<QueryReport> {
        info!(query = %query.term, target = query.target, "Starting query");

        let mut walk = QueryWalk::default();
        let mut step = if query.target == 0 {
            Step::Done(QueryOutcome::TargetReached)
        } else {
            Step::Fetch
        };

        let outcome = loop {
            let failures = match step {
                Step::Done(outcome) => break outcome,
                Step::Fetch => 0,
                Step::Retry { failures } => {
                    tokio::time::sleep(self.policy.retry_backoff).await;
                    failures
                }
            };
            step = self.fetch_step(query, &mut walk, failures).await?;
            if matches!(
                step,
                Step::Retry { .. }
                    | Step::Done(QueryOutcome::RetriesExhausted | QueryOutcome::Failed)
            ) {
                walk.failed_fetches += 1;
            }
        };

        info!(
            query = %query.term,
            collected = walk.collected,
            target = query.target,
            total = self.total(),
            reason = %outcome,
            "Finished query"
        );
        Ok(QueryReport {
            term: query.term.clone(),
            target: query.target,
            collected: walk.collected,
            pages: walk.pages,
            failed_fetches: walk.failed_fetches,
            outcome,
            error: walk.error,
        })
    }

    /// One fetch attempt plus the writes it yields.
    ///
    /// `failures` is the number of consecutive failed fetches before this
    /// attempt; any success returns a step that starts the count over.
    async fn fetch_step(&mut self, query: &Query, walk: &mut QueryWalk, failures: u32) -> Result<Step> {
        let result = match walk.cursor.as_ref() {
            None => {
                info!(query = %query.term, "Fetching first page");
                self.provider
                    .search(self.session, &query.term, self.policy.ranking)
                    .await
            }
            Some(next) => {
                info!(query = %query.term, "Fetching next page");
                self.provider.next_page(self.session, next).await
            }
        };

        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_transient() => {
                let failures = failures + 1;
                if failures >= self.policy.max_retries {
                    warn!(
                        query = %query.term,
                        attempt = failures,
                        max = self.policy.max_retries,
                        error = %e,
                        "Retry budget exhausted, abandoning query"
                    );
                    return Ok(Step::Done(QueryOutcome::RetriesExhausted));
                }
                warn!(
                    query = %query.term,
                    attempt = failures,
                    max = self.policy.max_retries,
                    backoff_secs = self.policy.retry_backoff.as_secs(),
                    error = %e,
                    "Fetch failed, retrying"
                );
                return Ok(Step::Retry { failures });
            }
            Err(e) => {
                error!(
                    query = %query.term,
                    attempt = failures + 1,
                    error = %e,
                    "Fatal provider error, skipping query"
                );
                walk.error = Some(e.to_string());
                return Ok(Step::Done(QueryOutcome::Failed));
            }
        };

        if page.is_exhausted() {
            info!(query = %query.term, "No more results");
            return Ok(Step::Done(QueryOutcome::Exhausted));
        }

        walk.pages += 1;
        let page_size = page.len();
        let ResultPage {
            posts,
            next,
            skipped,
        } = page;
        for post in posts {
            self.write(query, post)?;
            walk.collected += 1;
            if walk.collected >= query.target {
                break;
            }
        }
        info!(
            query = %query.term,
            page_size,
            skipped,
            collected = walk.collected,
            total = self.total(),
            "Stored page"
        );

        if walk.collected >= query.target {
            return Ok(Step::Done(QueryOutcome::TargetReached));
        }
        let Some(next) = next else {
            info!(query = %query.term, "No continuation, results exhausted");
            return Ok(Step::Done(QueryOutcome::Exhausted));
        };
        walk.cursor = Some(next);

        if !self.policy.page_pause.is_zero() {
            tokio::time::sleep(self.policy.page_pause).await;
        }
        Ok(Step::Fetch)
    }

    /// Number and append one post; the counter moves only after the write.
    fn write(&mut self, query: &Query, post: Post) -> Result<()> {
        let id = post.id.clone();
        let record = Record::from_post(self.total() + 1, &query.term, post);
        self.writer.append(&record)?;
        debug!(id = %id, index = record.index, "Stored post");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_provider_limits() {
        let policy = CollectPolicy::default();
        assert_eq!(policy.max_retries, 30);
        assert_eq!(policy.retry_backoff, Duration::from_secs(60));
        assert_eq!(policy.query_pause, Duration::from_secs(15));
        assert_eq!(policy.page_pause, Duration::from_secs(5));
    }

    #[test]
    fn without_pauses_keeps_retry_budget() {
        let policy = CollectPolicy {
            max_retries: 3,
            ..CollectPolicy::default()
        }
        .without_pauses();
        assert_eq!(policy.max_retries, 3);
        assert!(policy.retry_backoff.is_zero());
        assert!(policy.page_pause.is_zero());
        assert!(policy.query_pause.is_zero());
    }
}
