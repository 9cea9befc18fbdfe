use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::client::OrderSource;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{OrderLine, OrderQuery, SyncProgress};

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Splits `total_days` into `ceil(total_days / chunk_days)` sub-windows.
///
/// Every request asks for the full `chunk_days`, including the last one when
/// the split is uneven; only the displayed upper bound is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub total_days: u32,
    pub chunk_days: u32,
}

impl ChunkPlan {
    pub fn new(total_days: u32, chunk_days: u32) -> Self {
        Self { total_days, chunk_days: chunk_days.max(1) }
    }

    pub fn iterations(&self) -> u32 {
        self.total_days.div_ceil(self.chunk_days)
    }

    pub fn offset(&self, index: u32) -> u32 {
        index * self.chunk_days
    }

    /// Progress as reported just before chunk `index` is requested.
    pub fn progress(&self, index: u32) -> SyncProgress {
        let chunk_count = self.iterations();
        let offset_days = self.offset(index);
        let percent_complete = if chunk_count == 0 {
            100
        } else {
            (index as f64 / chunk_count as f64 * 100.0).round() as u32
        };
        SyncProgress {
            offset_days,
            total_days: self.total_days,
            chunk_days: self.chunk_days,
            percent_complete,
            chunk_index: index,
            chunk_count,
            window_end_days: (offset_days + self.chunk_days).min(self.total_days),
        }
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Suspension point between chunk requests. Tests swap in a fake clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// SyncDriver
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SyncOutcome {
    pub chunks: u32,
    /// Lines the backend reported per chunk, summed. Informational only.
    pub lines_received: usize,
    /// The backend's full cached list, reloaded after the last chunk.
    pub orders: Vec<OrderLine>,
}

/// Pulls the historical window from the backend one sub-window at a time.
///
/// Chunks are requested strictly in sequence with a fixed cooldown between
/// them. The backend merges chunk results into its cache; the driver never
/// accumulates chunk payloads itself and finishes by reloading that cache.
/// Any failed chunk aborts the run. Nothing is retried or rolled back.
pub struct SyncDriver<S, Z = TokioSleeper> {
    source: S,
    sleeper: Z,
    plan: ChunkPlan,
    cooldown: Duration,
    clear_first: bool,
    cancel: Arc<AtomicBool>,
}

impl<S: OrderSource> SyncDriver<S, TokioSleeper> {
    pub fn new(source: S, cfg: &Config) -> Self {
        Self {
            source,
            sleeper: TokioSleeper,
            plan: ChunkPlan::new(cfg.sync_total_days, cfg.sync_chunk_days),
            cooldown: cfg.sync_cooldown,
            clear_first: cfg.sync_clear_first,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<S: OrderSource, Z: Sleeper> SyncDriver<S, Z> {
    pub fn with_sleeper<Z2: Sleeper>(self, sleeper: Z2) -> SyncDriver<S, Z2> {
        SyncDriver {
            source: self.source,
            sleeper,
            plan: self.plan,
            cooldown: self.cooldown,
            clear_first: self.clear_first,
            cancel: self.cancel,
        }
    }

    pub fn with_plan(mut self, plan: ChunkPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_clear_first(mut self, clear_first: bool) -> Self {
        self.clear_first = clear_first;
        self
    }

    pub fn plan(&self) -> ChunkPlan {
        self.plan
    }

    /// Setting the returned flag stops the run at its next suspension point.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    /// Run every chunk, then reload the merged list.
    ///
    /// `on_progress` fires once per chunk, before its request is sent, so the
    /// percentage lags the backend by one chunk.
    pub async fn run<F>(&self, mut on_progress: F) -> Result<SyncOutcome>
    where
        F: FnMut(&SyncProgress) + Send,
    {
        let chunks = self.plan.iterations();
        let mut lines_received = 0usize;

        info!(
            total_days = self.plan.total_days,
            chunk_days = self.plan.chunk_days,
            chunks,
            "Sync started: {} days in {} chunks of {} days",
            self.plan.total_days,
            chunks,
            self.plan.chunk_days,
        );

        for index in 0..chunks {
            self.check_cancelled()?;

            let progress = self.plan.progress(index);
            on_progress(&progress);

            let offset = progress.offset_days;
            let query = OrderQuery::SyncChunk {
                days: self.plan.chunk_days,
                offset,
                clear: self.clear_first && index == 0,
            };

            let lines = match self.source.fetch_orders(&query).await {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(chunk = index + 1, offset, "Sync chunk failed: {e}");
                    return Err(AppError::SyncChunk { offset, source: Box::new(e) });
                }
            };
            lines_received += lines.len();
            info!(
                chunk = index + 1,
                chunks,
                offset,
                lines = lines.len(),
                "Sync chunk {}/{} done ({}~{} days back)",
                index + 1,
                chunks,
                offset,
                progress.window_end_days,
            );

            if index + 1 < chunks {
                self.sleeper.sleep(self.cooldown).await;
                self.check_cancelled()?;
            }
        }

        let orders = self.source.fetch_orders(&OrderQuery::Cached).await?;
        info!(
            chunks,
            lines_received,
            cached = orders.len(),
            "Sync complete: {} lines now cached",
            orders.len(),
        );

        Ok(SyncOutcome { chunks, lines_received, orders })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every query; fails the request with the given index (0-based).
    #[derive(Default)]
    struct FakeSource {
        queries: Mutex<Vec<OrderQuery>>,
        fail_at: Option<usize>,
    }

    impl FakeSource {
        fn failing_at(index: usize) -> Self {
            Self { queries: Mutex::new(Vec::new()), fail_at: Some(index) }
        }

        fn queries(&self) -> Vec<OrderQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderSource for FakeSource {
        async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<OrderLine>> {
            let index = {
                let mut queries = self.queries.lock().unwrap();
                queries.push(query.clone());
                queries.len() - 1
            };
            if self.fail_at == Some(index) {
                return Err(AppError::Backend { status: 400, message: "sync failed".to_string() });
            }
            let line = OrderLine {
                order_id: Some(format!("ORDER-{index}")),
                ..Default::default()
            };
            match query {
                OrderQuery::Cached => Ok(vec![line.clone(), line]),
                _ => Ok(vec![line]),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn driver(
        source: &Arc<FakeSource>,
        sleeper: &Arc<RecordingSleeper>,
        total_days: u32,
        chunk_days: u32,
    ) -> SyncDriver<Arc<FakeSource>, Arc<RecordingSleeper>> {
        SyncDriver::new(Arc::clone(source), &test_config())
            .with_sleeper(Arc::clone(sleeper))
            .with_plan(ChunkPlan::new(total_days, chunk_days))
    }

    fn test_config() -> Config {
        Config {
            api_url: "http://test".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            sync_total_days: 90,
            sync_chunk_days: 15,
            sync_cooldown: Duration::from_millis(800),
            sync_clear_first: true,
            http_timeout: Duration::from_secs(30),
            session_file: std::path::PathBuf::from("unused"),
        }
    }

    #[test]
    fn builder_overrides_configured_plan() {
        let source = Arc::new(FakeSource::default());
        let from_config = SyncDriver::new(Arc::clone(&source), &test_config());
        assert_eq!(from_config.plan(), ChunkPlan::new(90, 15));

        let custom = from_config
            .with_sleeper(Arc::new(RecordingSleeper::default()))
            .with_plan(ChunkPlan::new(30, 5));
        assert_eq!(custom.plan().iterations(), 6);
    }

    fn chunk_offsets(queries: &[OrderQuery]) -> Vec<u32> {
        queries
            .iter()
            .filter_map(|q| match q {
                OrderQuery::SyncChunk { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plan_rounds_iterations_up() {
        assert_eq!(ChunkPlan::new(90, 15).iterations(), 6);
        assert_eq!(ChunkPlan::new(90, 5).iterations(), 18);
        assert_eq!(ChunkPlan::new(100, 15).iterations(), 7);
        assert_eq!(ChunkPlan::new(0, 15).iterations(), 0);
    }

    #[test]
    fn last_window_is_clamped_for_display_only() {
        let plan = ChunkPlan::new(100, 15);
        let last = plan.progress(6);
        assert_eq!(last.offset_days, 90);
        assert_eq!(last.window_end_days, 100);
        assert_eq!(last.chunk_days, 15);
    }

    #[tokio::test]
    async fn issues_one_request_per_chunk_then_reloads() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = driver(&source, &sleeper, 90, 15).run(|_| {}).await.unwrap();

        let queries = source.queries();
        assert_eq!(queries.len(), 7, "6 chunks + final reload");
        assert_eq!(chunk_offsets(&queries), vec![0, 15, 30, 45, 60, 75]);
        assert_eq!(queries.last(), Some(&OrderQuery::Cached));
        assert_eq!(outcome.chunks, 6);
        assert_eq!(outcome.lines_received, 6);
        // The reload replaces; chunk payloads are not concatenated.
        assert_eq!(outcome.orders.len(), 2);
    }

    #[tokio::test]
    async fn offsets_stay_below_total_for_uneven_split() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        driver(&source, &sleeper, 100, 15).run(|_| {}).await.unwrap();

        let queries = source.queries();
        let offsets = chunk_offsets(&queries);
        assert_eq!(offsets, vec![0, 15, 30, 45, 60, 75, 90]);
        assert!(offsets.iter().all(|&o| o < 100));
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        for q in &queries {
            if let OrderQuery::SyncChunk { days, .. } = q {
                assert_eq!(*days, 15);
            }
        }
    }

    #[tokio::test]
    async fn only_first_chunk_clears() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        driver(&source, &sleeper, 90, 5).run(|_| {}).await.unwrap();

        let clears: Vec<bool> = source
            .queries()
            .iter()
            .filter_map(|q| match q {
                OrderQuery::SyncChunk { clear, .. } => Some(*clear),
                _ => None,
            })
            .collect();
        assert_eq!(clears.len(), 18);
        assert!(clears[0]);
        assert!(clears[1..].iter().all(|c| !c));
    }

    #[tokio::test]
    async fn clear_can_be_disabled() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        driver(&source, &sleeper, 30, 15)
            .with_clear_first(false)
            .run(|_| {})
            .await
            .unwrap();

        assert!(source.queries().iter().all(|q| !matches!(
            q,
            OrderQuery::SyncChunk { clear: true, .. }
        )));
    }

    #[tokio::test]
    async fn cools_down_between_chunks_but_not_after_last() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        driver(&source, &sleeper, 90, 15)
            .with_cooldown(Duration::from_millis(1500))
            .run(|_| {})
            .await
            .unwrap();

        let slept = sleeper.slept.lock().unwrap().clone();
        assert_eq!(slept, vec![Duration::from_millis(1500); 5]);
    }

    #[tokio::test]
    async fn reports_progress_before_each_chunk() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut seen = Vec::new();

        driver(&source, &sleeper, 90, 15)
            .run(|p| seen.push((p.offset_days, p.percent_complete)))
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![(0, 0), (15, 17), (30, 33), (45, 50), (60, 67), (75, 83)]
        );
    }

    #[tokio::test]
    async fn failure_on_third_chunk_stops_and_names_offset() {
        let source = Arc::new(FakeSource::failing_at(2));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = driver(&source, &sleeper, 90, 15).run(|_| {}).await.unwrap_err();

        assert_eq!(source.queries().len(), 3, "no requests after the failing chunk");
        assert_eq!(err.sync_offset(), Some(30));
        let text = err.to_string();
        assert!(text.contains("30"), "{text}");
        assert!(text.contains("sync failed"), "{text}");
        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_run_issues_nothing() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let driver = driver(&source, &sleeper, 90, 15);
        driver.cancel_token().store(true, Ordering::Relaxed);

        let err = driver.run(|_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert!(source.queries().is_empty());
    }

    #[tokio::test]
    async fn empty_window_only_reloads() {
        let source = Arc::new(FakeSource::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        let outcome = driver(&source, &sleeper, 0, 15).run(|_| {}).await.unwrap();
        assert_eq!(outcome.chunks, 0);
        assert_eq!(source.queries(), vec![OrderQuery::Cached]);
    }
}
