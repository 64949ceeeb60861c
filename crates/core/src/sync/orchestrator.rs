//! Sync run state machine.
//!
//! A run moves through:
//! - before sync: the target may decline
//! - metadata phase (scheduled runs only): vocabularies per category and locale
//! - assets phase: purchase records chunk by chunk from the saved cursor
//! - after sync: completion hooks, then cache cleanup
//!
//! Errors never leave [`SyncOrchestrator::run`]; they end up in the report and
//! in the target's error hooks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthTokenStorage, Authenticator};
use crate::config::Settings;
use crate::mapper::MetadataIdMapper;
use crate::metrics;
use crate::model::{AssetRecord, ContinuationToken, MetadataCategory, MetadataElement};
use crate::queue::RunKind;
use crate::state::ContinuationStorage;
use crate::target::{SyncTarget, SyncTargetCapabilities};
use crate::upstream::{AccessLayer, RetryPolicy, UpstreamApi};

use super::config::SyncConfig;
use super::convert::{check_capabilities, RecordBuilder};
use super::error::SyncError;
use super::types::{SyncOutcome, SyncPhase, SyncReport};

/// Everything a run talks to.
pub struct SyncCollaborators {
    pub settings: Settings,
    pub upstream: Arc<dyn UpstreamApi>,
    pub authenticator: Arc<dyn Authenticator>,
    pub token_storage: Arc<dyn AuthTokenStorage>,
    pub target: Arc<dyn SyncTarget>,
    pub continuation: Arc<dyn ContinuationStorage>,
}

enum Flow {
    Completed,
    Aborted(SyncPhase),
}

/// Drives one sync run at a time. Callers serialize runs through
/// [`crate::queue::ExecutionQueue`].
pub struct SyncOrchestrator {
    settings: Settings,
    upstream: Arc<dyn UpstreamApi>,
    target: Arc<dyn SyncTarget>,
    continuation: Arc<dyn ContinuationStorage>,
    access: AccessLayer,
    config: SyncConfig,
    mapper: Mutex<MetadataIdMapper>,
}

impl SyncOrchestrator {
    pub fn new(collaborators: SyncCollaborators, config: SyncConfig, retry: RetryPolicy) -> Self {
        let SyncCollaborators {
            settings,
            upstream,
            authenticator,
            token_storage,
            target,
            continuation,
        } = collaborators;

        let access = AccessLayer::new(authenticator, token_storage, settings.clone(), retry);

        Self {
            settings,
            upstream,
            target,
            continuation,
            access,
            config,
            mapper: Mutex::new(MetadataIdMapper::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Number of metadata mappings currently cached.
    pub fn mapping_count(&self) -> usize {
        self.mapper().len()
    }

    fn mapper(&self) -> MutexGuard<'_, MetadataIdMapper> {
        self.mapper.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute one run of `kind` and report how it went.
    pub async fn run(&self, kind: RunKind) -> SyncReport {
        let started = Instant::now();
        let mut report = SyncReport::new(kind);
        info!(kind = %kind, "Sync run started");

        match self.target.before_sync(kind).await {
            Ok(true) => {
                let result = self.run_phases(kind, &mut report).await;
                report.outcome = match result {
                    Ok(Flow::Completed) => SyncOutcome::Completed,
                    Ok(Flow::Aborted(phase)) => {
                        info!(kind = %kind, phase = ?phase, "Target declined to continue");
                        SyncOutcome::Aborted { phase }
                    }
                    Err(err) => self.fail(&report, err).await,
                };

                self.target.clear_generic_metadata_caches().await;
            }
            Ok(false) => {
                info!(kind = %kind, "Target declined sync");
                report.outcome = SyncOutcome::Aborted {
                    phase: SyncPhase::BeforeSync,
                };
            }
            Err(e) => {
                report.outcome = self.fail(&report, SyncError::Target(e)).await;
                self.target.clear_generic_metadata_caches().await;
            }
        }
        self.mapper().clear();

        report.phase = match report.outcome {
            SyncOutcome::Completed => SyncPhase::Idle,
            _ => SyncPhase::Aborted,
        };
        report.finished_at = Some(Utc::now());
        report.duration_ms = started.elapsed().as_millis() as u64;

        metrics::SYNC_RUNS
            .with_label_values(&[kind.as_str(), report.outcome.label()])
            .inc();
        metrics::SYNC_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(started.elapsed().as_secs_f64());

        info!(
            kind = %kind,
            outcome = report.outcome.label(),
            chunks = report.chunks,
            delivered = report.delivered(),
            duration_ms = report.duration_ms,
            "Sync run finished"
        );
        report
    }

    async fn fail(&self, report: &SyncReport, err: SyncError) -> SyncOutcome {
        let authentication = err.is_authentication();
        if authentication {
            error!(phase = ?report.phase, "Sync run stopped, authentication failed: {}", err);
            self.target.handle_authenticator_error(&err).await;
        } else {
            error!(phase = ?report.phase, "Sync run failed: {}", err);
            self.target.handle_sync_job_error(&err).await;
        }

        SyncOutcome::Failed {
            phase: report.phase,
            error: err.to_string(),
            authentication,
        }
    }

    async fn run_phases(&self, kind: RunKind, report: &mut SyncReport) -> Result<Flow, SyncError> {
        if kind.includes_metadata() {
            report.phase = SyncPhase::MetadataPhase;
            if !self.target.before_generic_metadata_sync().await? {
                return Ok(Flow::Aborted(SyncPhase::MetadataPhase));
            }
            self.sync_metadata(report).await?;
            if !self.target.after_generic_metadata_sync().await? {
                warn!("Target reported a problem after metadata sync, continuing");
            }
        }

        report.phase = SyncPhase::AssetsPhase;
        if !self.target.before_assets_sync().await? {
            return Ok(Flow::Aborted(SyncPhase::AssetsPhase));
        }
        self.sync_assets(report).await?;

        report.phase = SyncPhase::AfterSync;
        if !self.target.after_assets_sync().await? {
            warn!("Target reported a problem after assets sync");
        }
        if !self.target.after_sync().await? {
            warn!("Target reported a problem after sync");
        }

        Ok(Flow::Completed)
    }

    /// Locales delivered to the target in this run.
    fn locales(&self, capabilities: &SyncTargetCapabilities) -> Vec<String> {
        if capabilities.multi_language {
            self.settings.import_languages.clone()
        } else {
            vec![self.settings.primary_language().to_string()]
        }
    }

    async fn sync_metadata(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        self.mapper().clear();
        let locales = self.locales(&self.target.capabilities());

        for category in MetadataCategory::ALL {
            let mut elements: Vec<MetadataElement> = Vec::new();
            let mut positions: HashMap<String, usize> = HashMap::new();

            for locale in &locales {
                let upstream = &self.upstream;
                let entries = self
                    .access
                    .execute("fetch_metadata", move |token| async move {
                        upstream.fetch_metadata(category, locale, &token).await
                    })
                    .await?;

                for entry in entries {
                    let idx = *positions.entry(entry.key.clone()).or_insert_with(|| {
                        elements.push(MetadataElement::new(entry.key.clone()));
                        elements.len() - 1
                    });
                    elements[idx].values.insert(locale.clone(), entry.value);
                }
            }

            let count = elements.len();
            let imported = self.target.import_metadata(category, elements).await?;
            self.mapper().add_mapping(category, &imported)?;

            debug!(category = %category, count, "Metadata category imported");
            metrics::METADATA_IMPORTED
                .with_label_values(&[category.as_str()])
                .inc_by(imported.len() as u64);
            report.metadata_elements += imported.len();
        }

        info!(
            elements = report.metadata_elements,
            locales = locales.len(),
            "Metadata phase complete"
        );
        Ok(())
    }

    async fn sync_assets(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let capabilities = self.target.capabilities();
        let locales = self.locales(&capabilities);
        let chunk_size = self.config.chunk_size;
        let mut cursor = self.continuation.load()?;

        debug!(cursor = ?cursor.as_ref().map(|c| c.as_str()), "Assets phase starting");

        loop {
            if self.config.max_chunks_per_run > 0 && report.chunks >= self.config.max_chunks_per_run {
                info!(chunks = report.chunks, "Chunk limit reached, continuing next run");
                break;
            }

            let upstream = &self.upstream;
            let current = cursor.as_ref();
            let page = self
                .access
                .execute("fetch_transactions", move |token| async move {
                    upstream.fetch_transactions(current, chunk_size, &token).await
                })
                .await?;

            if page.items.is_empty() {
                debug!("Upstream returned an empty chunk, assets phase complete");
                break;
            }

            let records: Vec<AssetRecord> = {
                let mapper = self.mapper();
                let builder = RecordBuilder::new(&mapper, &locales);
                page.items.iter().map(|tx| builder.build(tx)).collect()
            };
            for record in &records {
                check_capabilities(record, &capabilities)?;
            }

            self.deliver(records, report).await?;
            report.chunks += 1;

            match page.continuation {
                Some(next) if Some(&next) != cursor.as_ref() => {
                    self.continuation.save(&next)?;
                    debug!(chunk = report.chunks, cursor = %next, "Chunk delivered");
                    cursor = Some(next);
                }
                _ => {
                    warn!(chunk = report.chunks, "Upstream did not advance the cursor, stopping");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn is_known(&self, record: &AssetRecord) -> Result<bool, SyncError> {
        if self
            .target
            .target_asset_uuid(&record.transaction_id)
            .await?
            .is_some()
        {
            return Ok(true);
        }

        if record.is_compound() {
            for binary in &record.binaries {
                if self.target.target_binary_uuid(&binary.key()).await?.is_some() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn deliver(&self, records: Vec<AssetRecord>, report: &mut SyncReport) -> Result<(), SyncError> {
        let mut new_simple = Vec::new();
        let mut known_simple = Vec::new();
        let mut new_compound = Vec::new();
        let mut known_compound = Vec::new();

        for record in records {
            let known = self.is_known(&record).await?;
            match (record.is_compound(), known) {
                (false, false) => new_simple.push(record),
                (false, true) => known_simple.push(record),
                (true, false) => new_compound.push(record),
                (true, true) => known_compound.push(record),
            }
        }

        if !new_simple.is_empty() {
            self.target.import_new_assets(&new_simple).await?;
            report.new_assets += new_simple.len();
            Self::count_delivered("new", new_simple.len());
        }
        if !known_simple.is_empty() {
            self.target.update_assets(&known_simple).await?;
            report.updated_assets += known_simple.len();
            Self::count_delivered("update", known_simple.len());
        }
        if !new_compound.is_empty() {
            self.target.import_new_compound_assets(&new_compound).await?;
            report.new_compound_assets += new_compound.len();
            Self::count_delivered("new_compound", new_compound.len());
        }
        if !known_compound.is_empty() {
            self.target.update_compound_assets(&known_compound).await?;
            report.updated_compound_assets += known_compound.len();
            Self::count_delivered("update_compound", known_compound.len());
        }

        Ok(())
    }

    fn count_delivered(mode: &str, count: usize) {
        metrics::ASSETS_DELIVERED
            .with_label_values(&[mode])
            .inc_by(count as u64);
    }

    /// Forget the saved cursor so the next run starts from the beginning.
    pub fn reset_continuation(&self) -> Result<(), SyncError> {
        self.continuation.reset()?;
        info!("Continuation token reset");
        Ok(())
    }

    /// The saved cursor, if any.
    pub fn continuation(&self) -> Result<Option<ContinuationToken>, SyncError> {
        Ok(self.continuation.load()?)
    }
}
