//! # Album Deduplication
//!
//! Merges remote albums that share a title.
//!
//! ## Overview
//!
//! [`AlbumDeduplicator::run`] pages through an account's albums and keeps a
//! title → survivor map for that run only. When a title shows up again the
//! new album is merged into the current survivor:
//!
//! - the album with strictly more media items survives; on a tie the lower
//!   album ID survives
//! - every item of the loser missing from the survivor is added to it in
//!   batches of at most [`MAX_BATCH_ADD_ITEMS`]
//! - the loser is never deleted; its product URL is reported as a deletion
//!   candidate in the returned [`DedupeReport`]
//!
//! Merges are [`MergeJob`]s on a [`WorkerPool`]. Merges of different titles
//! may overlap; a title with a merge in flight queues further duplicates
//! until the merge reports its survivor, so a third album always merges
//! against the current survivor.
//!
//! ## Failure
//!
//! The first listing or merge error stops the run for that account. Merges
//! already in flight are awaited and nothing is rolled back.

use async_trait::async_trait;
use bridge_traits::photos::{Album, PhotoService};
use core_runtime::logging::redact_if_sensitive;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::albums::ALBUM_PAGE_SIZE;
use crate::coordinator::SessionFactory;
use crate::error::{Result, SyncError};
use crate::pool::{Job, JobId, JobResult, WorkerPool};

/// Maximum media items per batch-add call
pub const MAX_BATCH_ADD_ITEMS: usize = 50;

/// Default number of concurrent merges
pub const DEFAULT_DEDUPE_WORKERS: usize = 1;

/// Result of merging two albums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub title: String,
    pub survivor_id: String,
    pub loser_id: String,
    /// Product URL of the emptied album, to be deleted by the user
    pub deletion_candidate_url: String,
    pub items_migrated: usize,
}

/// What one account's deduplication run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeReport {
    pub account: String,
    pub pages_fetched: usize,
    pub albums_scanned: usize,
    pub merges: Vec<MergeOutcome>,
}

impl DedupeReport {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Default::default()
        }
    }

    pub fn deletion_candidates(&self) -> Vec<&str> {
        self.merges
            .iter()
            .map(|m| m.deletion_candidate_url.as_str())
            .collect()
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Merges two albums through a [`PhotoService`]
#[derive(Clone)]
pub struct AlbumMerger {
    photos: Arc<dyn PhotoService>,
}

impl AlbumMerger {
    pub fn new(photos: Arc<dyn PhotoService>) -> Self {
        Self { photos }
    }

    /// Merge `album_a` and `album_b`, returning the survivor
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SelfMerge`] when both IDs name the same album.
    #[instrument(skip(self))]
    pub async fn merge(&self, album_a: &str, album_b: &str) -> Result<MergeOutcome> {
        if album_a == album_b {
            return Err(SyncError::SelfMerge(album_a.to_string()));
        }

        let a = self.photos.get_album(album_a).await?;
        let b = self.photos.get_album(album_b).await?;
        let items_a = self.media_item_ids(&a.id).await?;
        let items_b = self.media_item_ids(&b.id).await?;

        debug!(
            title = %a.title,
            a_items = items_a.len(),
            b_items = items_b.len(),
            "Merging duplicate albums"
        );

        let (survivor, survivor_items, loser, loser_items) = if a_survives(&a, items_a.len(), &b, items_b.len()) {
            (a, items_a, b, items_b)
        } else {
            (b, items_b, a, items_a)
        };

        let present: HashSet<&str> = survivor_items.iter().map(String::as_str).collect();
        let to_migrate: Vec<String> = loser_items
            .iter()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect();

        self.add_in_batches(&survivor.id, &to_migrate).await?;

        info!(
            title = %survivor.title,
            survivor_id = %survivor.id,
            migrated = to_migrate.len(),
            "Merged duplicate album"
        );

        Ok(MergeOutcome {
            title: survivor.title,
            survivor_id: survivor.id,
            loser_id: loser.id,
            deletion_candidate_url: loser.product_url,
            items_migrated: to_migrate.len(),
        })
    }

    /// List every media item ID in an album, following all pages
    pub async fn media_item_ids(&self, album_id: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .photos
                .search_media_items(album_id, page_token.as_deref())
                .await?;
            ids.extend(page.items.iter().map(|item| item.id.clone()));

            match page.next_cursor() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(ids)
    }

    /// Add `ids` to `album_id` in sequential chunks of [`MAX_BATCH_ADD_ITEMS`]
    ///
    /// Stops at the first failed chunk; earlier chunks stay added.
    pub async fn add_in_batches(&self, album_id: &str, ids: &[String]) -> Result<()> {
        for chunk in ids.chunks(MAX_BATCH_ADD_ITEMS) {
            self.photos.batch_add_media_items(album_id, chunk).await?;
        }
        Ok(())
    }
}

fn a_survives(a: &Album, a_items: usize, b: &Album, b_items: usize) -> bool {
    match a_items.cmp(&b_items) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.id <= b.id,
    }
}

/// One merge scheduled on the pool
pub struct MergeJob {
    id: JobId,
    title: String,
    survivor_id: String,
    candidate_id: String,
    merger: AlbumMerger,
}

impl MergeJob {
    pub fn new(title: String, survivor_id: String, candidate_id: String, merger: AlbumMerger) -> Self {
        Self {
            id: JobId::new(),
            title,
            survivor_id,
            candidate_id,
            merger,
        }
    }
}

#[async_trait]
impl Job for MergeJob {
    type Output = MergeOutcome;

    fn id(&self) -> JobId {
        self.id
    }

    fn label(&self) -> String {
        format!("merge '{}' ({} + {})", self.title, self.survivor_id, self.candidate_id)
    }

    async fn execute(&self, cancel: &CancellationToken) -> Result<MergeOutcome> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.merger.merge(&self.survivor_id, &self.candidate_id).await
    }
}

// ============================================================================
// Deduplicator
// ============================================================================

/// Title collision state for one run
#[derive(Default)]
struct DuplicateMap {
    survivors: HashMap<String, String>,
    seen: HashSet<String>,
    in_flight: HashMap<JobId, String>,
    busy_titles: HashSet<String>,
    waiting: HashMap<String, VecDeque<String>>,
}

pub struct AlbumDeduplicator {
    photos: Arc<dyn PhotoService>,
    merger: AlbumMerger,
}

impl AlbumDeduplicator {
    pub fn new(photos: Arc<dyn PhotoService>) -> Self {
        Self {
            merger: AlbumMerger::new(Arc::clone(&photos)),
            photos,
        }
    }

    /// Deduplicate every album of one account
    ///
    /// `pool` must be started and must not carry results from other callers.
    #[instrument(skip(self, account, pool, cancel), fields(account = %redact_if_sensitive("account", account)))]
    pub async fn run(
        &self,
        account: &str,
        pool: &mut WorkerPool<MergeJob>,
        cancel: &CancellationToken,
    ) -> Result<DedupeReport> {
        let mut report = DedupeReport::new(account);
        let mut map = DuplicateMap::default();

        let listed = self.list_and_merge(&mut report, &mut map, pool, cancel).await;
        let drained = self.drain(&mut report, &mut map, pool, listed.is_ok()).await;
        listed?;
        drained?;

        info!(
            pages = report.pages_fetched,
            albums = report.albums_scanned,
            merges = report.merges.len(),
            "Deduplication finished"
        );
        Ok(report)
    }

    async fn list_and_merge(
        &self,
        report: &mut DedupeReport,
        map: &mut DuplicateMap,
        pool: &mut WorkerPool<MergeJob>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut page_token: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let page = self
                .photos
                .list_albums(ALBUM_PAGE_SIZE, page_token.as_deref())
                .await?;
            report.pages_fetched += 1;

            for album in &page.items {
                report.albums_scanned += 1;
                self.observe(album, map, pool).await?;

                while let Some(result) = pool.try_next_result() {
                    self.complete(result, report, map, pool).await?;
                }
            }
            debug!(parsed = report.albums_scanned, "Parsed albums");

            match page.next_cursor() {
                Some(token) => page_token = Some(token.to_string()),
                None => return Ok(()),
            }
        }
    }

    async fn observe(&self, album: &Album, map: &mut DuplicateMap, pool: &mut WorkerPool<MergeJob>) -> Result<()> {
        // Listings can repeat an album when the library changes mid-run
        if !map.seen.insert(album.id.clone()) {
            debug!(album_id = %album.id, "Album listed twice, skipping");
            return Ok(());
        }

        let Some(survivor) = map.survivors.get(&album.title).cloned() else {
            map.survivors.insert(album.title.clone(), album.id.clone());
            return Ok(());
        };

        if map.busy_titles.contains(&album.title) {
            map.waiting
                .entry(album.title.clone())
                .or_default()
                .push_back(album.id.clone());
            return Ok(());
        }

        self.schedule(album.title.clone(), survivor, album.id.clone(), map, pool)
            .await
    }

    async fn schedule(
        &self,
        title: String,
        survivor_id: String,
        candidate_id: String,
        map: &mut DuplicateMap,
        pool: &mut WorkerPool<MergeJob>,
    ) -> Result<()> {
        let job = MergeJob::new(title.clone(), survivor_id, candidate_id, self.merger.clone());
        let id = job.id();

        pool.submit(job).await?;
        map.in_flight.insert(id, title.clone());
        map.busy_titles.insert(title);
        Ok(())
    }

    async fn complete(
        &self,
        result: JobResult<MergeOutcome>,
        report: &mut DedupeReport,
        map: &mut DuplicateMap,
        pool: &mut WorkerPool<MergeJob>,
    ) -> Result<()> {
        let Some(title) = map.in_flight.remove(&result.id) else {
            warn!(job = %result.label, "Ignoring result of unknown merge");
            return Ok(());
        };
        map.busy_titles.remove(&title);

        let outcome = result.outcome?;
        map.survivors.insert(title.clone(), outcome.survivor_id.clone());
        let survivor_id = outcome.survivor_id.clone();
        report.merges.push(outcome);

        let next = map.waiting.get_mut(&title).and_then(VecDeque::pop_front);
        if let Some(candidate_id) = next {
            self.schedule(title, survivor_id, candidate_id, map, pool).await?;
        }
        Ok(())
    }

    /// Wait for every in-flight merge
    ///
    /// With `keep_merging` set, completions keep scheduling queued duplicates;
    /// after the first error only the remaining in-flight merges are awaited.
    async fn drain(
        &self,
        report: &mut DedupeReport,
        map: &mut DuplicateMap,
        pool: &mut WorkerPool<MergeJob>,
        mut keep_merging: bool,
    ) -> Result<()> {
        let mut first_error = None;

        while !map.in_flight.is_empty() {
            let Some(result) = pool.next_result().await else {
                return Err(SyncError::ResultsClosed {
                    expected: map.in_flight.len(),
                    received: 0,
                });
            };

            if keep_merging {
                if let Err(e) = self.complete(result, report, map, pool).await {
                    error!(error = %e, "Merge failed, waiting for in-flight merges");
                    keep_merging = false;
                    first_error = Some(e);
                }
            } else {
                map.in_flight.remove(&result.id);
                match result.outcome {
                    Ok(outcome) => report.merges.push(outcome),
                    Err(e) => warn!(job = %result.label, error = %e, "Merge failed"),
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Totals of a `dedupe` run across accounts
#[derive(Debug, Default)]
pub struct DedupeSummary {
    pub reports: Vec<DedupeReport>,
    /// Accounts whose run failed, with the error message
    pub failed_accounts: Vec<(String, String)>,
}

impl DedupeSummary {
    pub fn merges(&self) -> usize {
        self.reports.iter().map(|r| r.merges.len()).sum()
    }
}

/// Runs the deduplicator for each account in turn on one shared pool
pub struct DedupeCoordinator {
    sessions: Arc<dyn SessionFactory>,
    worker_count: usize,
}

impl DedupeCoordinator {
    pub fn new(sessions: Arc<dyn SessionFactory>, worker_count: usize) -> Self {
        Self {
            sessions,
            worker_count,
        }
    }

    /// Deduplicate `accounts` sequentially
    ///
    /// Every session is opened before the first merge. A listing or merge
    /// failure is recorded in the summary and the next account still runs.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Session`] when an account cannot be opened.
    #[instrument(skip_all, fields(accounts = accounts.len(), workers = self.worker_count))]
    pub async fn run(&self, accounts: &[&str], cancel: CancellationToken) -> Result<DedupeSummary> {
        info!("Phase 1: Opening account sessions");
        let mut sessions = Vec::with_capacity(accounts.len());
        for account in accounts {
            sessions.push((*account, self.sessions.photo_service(account).await?));
        }

        info!("Phase 2: Deduplicating albums");
        let mut pool = WorkerPool::new(self.worker_count, cancel.clone());
        pool.start()?;
        let mut summary = DedupeSummary::default();

        for (account, photos) in sessions {
            if cancel.is_cancelled() {
                warn!("Cancelled, skipping remaining accounts");
                break;
            }

            let result = AlbumDeduplicator::new(photos)
                .run(account, &mut pool, &cancel)
                .await;

            match result {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(
                        account = %redact_if_sensitive("account", account),
                        error = %e,
                        "Deduplication failed for account"
                    );
                    summary
                        .failed_accounts
                        .push((account.to_string(), e.to_string()));
                }
            }
        }

        pool.stop().await?;
        Ok(summary)
    }
}
