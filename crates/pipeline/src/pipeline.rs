use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, Span, error, info, warn};

use zoo_core::{BLOB_CONTENT_TYPE, Caller, File, Metadata, Model, Provenance, Slot, parse_metadata};
use zoo_store::LockGuard;

use crate::body::{BodyError, read_bounded};
use crate::builder::UploadPipelineBuilder;
use crate::config::UploadConfig;
use crate::context::{Stores, UploadContext};
use crate::error::{
    BoxError, CleanupFailure, ErrorKind, FINALIZE_FAILED, LIST_FAILED, LOOKUP_FAILED, SAVE_FAILED,
    UploadError,
};
use crate::hydrate::{hydrate_files, hydrate_models};
use crate::metrics::UploadMetrics;
use crate::reconcile::Reconciler;
use crate::sweep::{SweepReport, sweep_slot};

/// The validated-later inputs of one upload, as received from the client.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Username of the model owner.
    pub username: String,
    pub slug: String,
    pub framework: String,
    pub filename: String,
    pub framework_version: String,
    pub client_name: String,
    /// Raw JSON of the `metadata` form field; `None` if the field never
    /// arrived, which decodes like an empty field.
    pub metadata: Option<String>,
}

/// A model the caller may upload to, with its plan's size limit.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    model: Model,
    limit: u64,
}

impl UploadTarget {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Maximum accepted file size in bytes.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The committed, hydrated file.
    pub file: File,
    /// Ids of older versions removed by the retention sweep.
    pub swept: Vec<String>,
    /// Cleanup steps that failed without failing the upload.
    pub warnings: Vec<CleanupFailure>,
}

/// Orchestrates uploads against the configured stores.
pub struct UploadPipeline {
    stores: Arc<Stores>,
    config: UploadConfig,
    metrics: Arc<UploadMetrics>,
}

impl std::fmt::Debug for UploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UploadPipeline {
    pub(crate) fn new(stores: Arc<Stores>, config: UploadConfig, metrics: Arc<UploadMetrics>) -> Self {
        Self {
            stores,
            config,
            metrics,
        }
    }

    pub fn builder() -> UploadPipelineBuilder {
        UploadPipelineBuilder::new()
    }

    /// Build the per-request context for `caller`.
    pub fn context(&self, caller: Caller) -> UploadContext {
        UploadContext::new(caller, Arc::clone(&self.stores))
    }

    pub fn metrics(&self) -> &Arc<UploadMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.stores
    }

    /// A reconciler over the same file repository and blob store.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Arc::clone(&self.stores.files),
            Arc::clone(&self.stores.blobs),
            self.config.reconcile_grace,
        )
    }

    /// Upload one new version of `request.filename` into the model named by
    /// `request.username`/`request.slug`, reading the file from `body`.
    ///
    /// The body is only read once the caller is known to own the model, and
    /// is read in full (up to the plan limit) before the slot lock is taken.
    ///
    /// # Errors
    ///
    /// See [`UploadError`]; its [`kind`](UploadError::kind) selects the
    /// failure class.
    pub async fn upload<S, E>(
        &self,
        ctx: &UploadContext,
        request: UploadRequest,
        body: S,
    ) -> Result<UploadOutcome, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Into<BoxError>,
    {
        let target = self.authorize(ctx, &request).await;
        let file = match &target {
            Ok(target) => Some(self.read_file(ctx, target, body).await),
            Err(_) => None,
        };
        self.complete(ctx, request, target, file).await
    }

    /// Resolve the model `request` targets and check the caller owns it.
    ///
    /// Only reads the user and model directories. Callers that collect the
    /// form parts themselves pass the result on to [`complete`](Self::complete).
    ///
    /// # Errors
    ///
    /// Returns the not-found, authorization or upstream variants of
    /// [`UploadError`].
    pub async fn authorize(
        &self,
        ctx: &UploadContext,
        request: &UploadRequest,
    ) -> Result<UploadTarget, UploadError> {
        let span = record_request(ctx, request);
        async {
            let model = resolve_model(&ctx.stores, &request.username, &request.slug).await?;
            if ctx.caller.user_id != model.user_id {
                warn!(model_user_id = %model.user_id, "upload refused: caller does not own the model");
                return Err(UploadError::NotOwner);
            }
            let limit = self.config.policy.max_bytes(model.keep);
            Ok(UploadTarget { model, limit })
        }
        .instrument(span)
        .await
    }

    /// Read a file body into memory, failing as soon as it exceeds the
    /// target's plan limit.
    ///
    /// # Errors
    ///
    /// [`UploadError::PayloadTooLarge`] or [`UploadError::UnreadableBody`].
    pub async fn read_file<S, E>(
        &self,
        ctx: &UploadContext,
        target: &UploadTarget,
        body: S,
    ) -> Result<Bytes, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Into<BoxError>,
    {
        let limit = target.limit;
        async move {
            match read_bounded(body, limit).await {
                Ok(data) => {
                    Span::current().record("file_size_bytes", data.len());
                    Ok(data)
                }
                Err(BodyError::TooLarge) => {
                    warn!(limit, "upload refused: file over plan limit");
                    Err(UploadError::PayloadTooLarge { limit })
                }
                Err(BodyError::Read(e)) => {
                    error!(error = %e, "Could not read uploaded file");
                    Err(UploadError::UnreadableBody(e))
                }
            }
        }
        .instrument(ctx.span.clone())
        .await
    }

    /// Finish an upload from its separately collected parts.
    ///
    /// `target` comes from [`authorize`](Self::authorize) and `file` from
    /// [`read_file`](Self::read_file), `None` when no file part arrived.
    /// Errors are reported in request order: metadata first, then the
    /// target, then the file. A file that failed before the metadata field
    /// was reached is reported as is, since the rest of the body was never
    /// read.
    ///
    /// # Errors
    ///
    /// See [`UploadError`].
    pub async fn complete(
        &self,
        ctx: &UploadContext,
        request: UploadRequest,
        target: Result<UploadTarget, UploadError>,
        file: Option<Result<Bytes, UploadError>>,
    ) -> Result<UploadOutcome, UploadError> {
        self.metrics.increment_started();
        let span = record_request(ctx, &request);

        let result = async {
            let file = match file {
                Some(Err(e)) if request.metadata.is_none() => return Err(e),
                file => file,
            };
            let metadata = parse_metadata(request.metadata.as_deref().unwrap_or_default())
                .map_err(|e| {
                    warn!(error = %e, "Could not decode metadata");
                    UploadError::InvalidMetadata(e)
                })?;
            let target = target?;
            let data = match file {
                Some(read) => read?,
                None => {
                    warn!("Could not get uploaded file");
                    return Err(UploadError::MissingFile);
                }
            };
            self.store(ctx, request, target.model, metadata, data).await
        }
        .instrument(span)
        .await;

        match &result {
            Ok(outcome) => self.metrics.record_committed(outcome.file.size),
            Err(e) => self.count_failure(e),
        }
        result
    }

    fn count_failure(&self, err: &UploadError) {
        if err.kind() == ErrorKind::Upstream {
            self.metrics.increment_failed();
        } else {
            self.metrics.increment_rejected();
        }
    }

    /// Store validated bytes as the newest version of the slot, under the
    /// slot lock.
    async fn store(
        &self,
        ctx: &UploadContext,
        request: UploadRequest,
        model: Model,
        metadata: Metadata,
        data: Bytes,
    ) -> Result<UploadOutcome, UploadError> {
        let slot = Slot::new(model.id.clone(), request.filename.clone());
        let guard = ctx
            .stores
            .lock
            .acquire(&slot.lock_name(), self.config.lock_ttl, self.config.lock_timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not lock file slot");
                UploadError::upstream(SAVE_FAILED, e)
            })?;

        let provenance = Provenance {
            framework: request.framework,
            framework_version: request.framework_version,
            client_name: request.client_name,
        };
        let mut warnings = Vec::new();
        let committed = hold_lease(
            guard.as_ref(),
            self.config.lock_ttl,
            self.commit_version(ctx, &slot, &model, provenance, metadata, data, &mut warnings),
        )
        .await;

        let stored = match committed {
            Ok(file) => {
                let report = sweep_slot(&ctx.stores, &self.metrics, &slot, model.keep).await;
                warnings.extend(report.failures);
                Ok((file, report.deleted))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = guard.release().await {
            warn!(error = %e, "Could not release file slot lock");
            warnings.push(CleanupFailure::LockRelease {
                error: e.to_string(),
            });
        }
        let (mut file, swept) = stored?;

        info!("Upload successful");

        if let Err(e) =
            hydrate_files(ctx.stores.downloads.as_ref(), std::slice::from_mut(&mut file)).await
        {
            warn!(error = %e, "Could not hydrate");
            self.metrics.increment_hydrate_errors();
            warnings.push(CleanupFailure::Hydrate {
                error: e.to_string(),
            });
        }

        Ok(UploadOutcome {
            file,
            swept,
            warnings,
        })
    }

    /// Clear the stale pending file, stage, store and commit.
    #[allow(clippy::too_many_arguments)]
    async fn commit_version(
        &self,
        ctx: &UploadContext,
        slot: &Slot,
        model: &Model,
        provenance: Provenance,
        metadata: Metadata,
        data: Bytes,
        warnings: &mut Vec<CleanupFailure>,
    ) -> Result<File, UploadError> {
        let stores = &ctx.stores;

        let stale = stores.files.delete_pending(slot).await.map_err(|e| {
            error!(error = %e, "Could not delete pending files");
            UploadError::upstream(SAVE_FAILED, e)
        })?;
        if !stale.is_empty() {
            self.metrics.add_stale_pending_removed(stale.len() as u64);
        }
        for old in stale {
            // Bytes may exist if that attempt failed at commit.
            if let Err(e) = stores.blobs.delete(&old.blob_key()).await {
                warn!(error = %e, stale_file_id = %old.id, "Could not delete blob of stale pending file");
                warnings.push(CleanupFailure::StalePendingBlob {
                    file_id: old.id,
                    error: e.to_string(),
                });
            }
        }

        let file = File::new_pending(
            ctx.caller.user_id.clone(),
            model.id.clone(),
            slot.filename.clone(),
            provenance,
            data.len() as u64,
            metadata,
        );
        Span::current().record("file_id", file.id.as_str());

        stores.files.create(&file).await.map_err(|e| {
            error!(error = %e, "Could not save file to database");
            UploadError::upstream(SAVE_FAILED, e)
        })?;

        stores
            .blobs
            .save(&file.blob_key(), data, BLOB_CONTENT_TYPE)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not store the file");
                UploadError::upstream(SAVE_FAILED, e)
            })?;

        stores.files.commit(slot, &file.id).await.map_err(|e| {
            error!(error = %e, "Could not commit pending");
            UploadError::upstream(FINALIZE_FAILED, e)
        })
    }
    /// Run the retention sweep for one slot outside of an upload.
    pub async fn sweep(&self, slot: &Slot, keep: u32) -> SweepReport {
        sweep_slot(&self.stores, &self.metrics, slot, keep).await
    }

    /// Look up a model by owner username and slug, hydrated with download
    /// counters.
    ///
    /// # Errors
    ///
    /// Returns the not-found or upstream variants of [`UploadError`].
    pub async fn model(&self, username: &str, slug: &str) -> Result<Model, UploadError> {
        let mut model = resolve_model(&self.stores, username, slug).await?;
        if let Err(e) =
            hydrate_models(self.stores.downloads.as_ref(), std::slice::from_mut(&mut model)).await
        {
            warn!(error = %e, model_id = %model.id, "Could not hydrate");
            self.metrics.increment_hydrate_errors();
        }
        Ok(model)
    }

    /// The newest committed file for each filename of a model, hydrated.
    ///
    /// # Errors
    ///
    /// Returns the not-found or upstream variants of [`UploadError`].
    pub async fn latest_files(&self, username: &str, slug: &str) -> Result<Vec<File>, UploadError> {
        let model = resolve_model(&self.stores, username, slug).await?;
        let mut files = self
            .stores
            .files
            .latest_by_model(&model.id)
            .await
            .map_err(|e| {
                error!(error = %e, model_id = %model.id, "Could not list files");
                UploadError::upstream(LIST_FAILED, e)
            })?;
        if let Err(e) = hydrate_files(self.stores.downloads.as_ref(), &mut files).await {
            warn!(error = %e, model_id = %model.id, "Could not hydrate");
            self.metrics.increment_hydrate_errors();
        }
        Ok(files)
    }
}

/// Record the client-supplied request fields on the upload span.
fn record_request(ctx: &UploadContext, request: &UploadRequest) -> Span {
    let span = ctx.span.clone();
    span.record("file_username", request.username.as_str());
    span.record("file_model_slug", request.slug.as_str());
    span.record("file_framework", request.framework.as_str());
    span.record("file_framework_version", request.framework_version.as_str());
    span.record("filename", request.filename.as_str());
    span.record("client_name", request.client_name.as_str());
    span
}

/// Drive `work` while renewing `guard` every third of `ttl`.
///
/// If the lease cannot be extended, `work` is dropped where it stands and
/// the upload fails; whatever it staged is cleared by the next attempt.
async fn hold_lease<T>(
    guard: &dyn LockGuard,
    ttl: Duration,
    work: impl Future<Output = Result<T, UploadError>>,
) -> Result<T, UploadError> {
    let period = (ttl / 3).max(Duration::from_millis(1));
    let mut renew = tokio::time::interval_at(Instant::now() + period, period);
    renew.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut work = std::pin::pin!(work);
    loop {
        tokio::select! {
            biased;
            result = &mut work => return result,
            _ = renew.tick() => {
                if let Err(e) = guard.extend(ttl).await {
                    error!(error = %e, "Lost the file slot lock");
                    return Err(UploadError::upstream(SAVE_FAILED, e));
                }
            }
        }
    }
}

async fn resolve_model(stores: &Stores, username: &str, slug: &str) -> Result<Model, UploadError> {
    let user = stores
        .users
        .by_username(username)
        .await
        .map_err(|e| {
            error!(error = %e, "Could not look up user by username");
            UploadError::upstream(LOOKUP_FAILED, e)
        })?
        .ok_or(UploadError::UserNotFound)?;
    Span::current().record("file_user_id", user.id.as_str());

    let model = stores
        .models
        .by_user_id_slug(&user.id, slug)
        .await
        .map_err(|e| {
            error!(error = %e, "Could not look up model by username & slug");
            UploadError::upstream(SAVE_FAILED, e)
        })?
        .ok_or(UploadError::ModelNotFound)?;
    Span::current().record("file_model_id", model.id.as_str());

    Ok(model)
}
