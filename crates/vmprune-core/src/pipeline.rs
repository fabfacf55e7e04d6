use crate::errors::{CleanupError, Result};
use crate::matcher::ImageMatcher;
use crate::models::{RetentionDecision, RunReport};
use crate::platform::{Actuator, InventoryProvider, RunContext};
use crate::ranking::rank;
use crate::reclaim::reclaim;
use crate::retention::RetentionSelector;
use chrono::Utc;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_KEEP_COUNT: i64 = 2;

/// Inputs of a single cleanup run, as handed over by the configuration layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub image_name_pattern: String,
    pub keep_count: i64,
    pub dry_run: bool,
    pub current_artifact_id: Option<String>,
}

impl RunRequest {
    pub fn new(image_name_pattern: impl Into<String>) -> Self {
        Self {
            image_name_pattern: image_name_pattern.into(),
            keep_count: DEFAULT_KEEP_COUNT,
            dry_run: false,
            current_artifact_id: None,
        }
    }

    pub fn keep(mut self, keep_count: i64) -> Self {
        self.keep_count = keep_count;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn current_artifact(mut self, artifact_id: impl Into<String>) -> Self {
        self.current_artifact_id = Some(artifact_id.into());
        self
    }
}

/// A validated `RunRequest`
#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub matcher: ImageMatcher,
    pub selector: RetentionSelector,
    pub dry_run: bool,
    pub current_artifact_id: Option<String>,
}

impl RunPolicy {
    pub fn from_request(request: &RunRequest) -> Result<Self> {
        if request.image_name_pattern.trim().is_empty() {
            return Err(CleanupError::Config(
                "image_name_regex is required".to_string(),
            ));
        }
        if request.keep_count <= 0 {
            return Err(CleanupError::InvalidPolicy(format!(
                "keep count must be a positive integer, got {}",
                request.keep_count
            )));
        }
        let keep_count = usize::try_from(request.keep_count).map_err(|_| {
            CleanupError::InvalidPolicy(format!("keep count {} is too large", request.keep_count))
        })?;

        Ok(Self {
            matcher: ImageMatcher::new(&request.image_name_pattern)?,
            selector: RetentionSelector::new(keep_count)?,
            dry_run: request.dry_run,
            current_artifact_id: request
                .current_artifact_id
                .clone()
                .filter(|id| !id.is_empty()),
        })
    }
}

/// List, match, rank and partition. Touches only the inventory side.
pub async fn decide<P, A>(policy: &RunPolicy, ctx: &RunContext<'_, P, A>) -> Result<RetentionDecision>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
{
    info!("Using image name regexp: {}", policy.matcher.pattern());

    let objects = ctx
        .inventory
        .list_candidates(&ctx.cancel)
        .await
        .map_err(|e| {
            error!("Unable to list virtual machines: {}", e);
            CleanupError::Inventory(e)
        })?;
    debug!("Inventory snapshot holds {} objects", objects.len());

    let images = rank(policy.matcher.collect(&objects));
    debug!("{} objects belong to the image family", images.len());

    let decision = policy
        .selector
        .select(images, policy.current_artifact_id.as_deref());

    info!(
        "Virtual machines selected for deletion: [{}]",
        decision.delete_names().join(", ")
    );
    info!(
        "Virtual machines will be kept: [{}]",
        decision.keep_names().join(", ")
    );

    Ok(decision)
}

/// Run the whole pipeline once.
///
/// Configuration is validated before the inventory is touched. A dry run
/// reports the decision without calling the actuator.
pub async fn run<P, A>(request: &RunRequest, ctx: &RunContext<'_, P, A>) -> Result<RunReport>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
{
    run_with(request, ctx, |_| true).await
}

/// Like [`run`], but `approve` sees the decision before anything is
/// reclaimed. A declined decision is reported as a dry run.
pub async fn run_with<P, A, F>(
    request: &RunRequest,
    ctx: &RunContext<'_, P, A>,
    approve: F,
) -> Result<RunReport>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
    F: FnOnce(&RetentionDecision) -> bool,
{
    let policy = RunPolicy::from_request(request)?;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!("Starting cleanup run {}", run_id);

    let decision = decide(&policy, ctx).await?;

    let dry_run = if policy.dry_run {
        info!("Dry run, nothing will be deleted");
        true
    } else if decision.to_delete.is_empty() {
        false
    } else if !approve(&decision) {
        info!("Run {} declined, nothing will be deleted", run_id);
        true
    } else {
        false
    };

    let results = if dry_run {
        Vec::new()
    } else {
        reclaim(&decision.to_delete, ctx).await?
    };

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        dry_run,
        pattern: policy.matcher.pattern().to_string(),
        keep_count: policy.selector.keep_count(),
        to_delete: decision.delete_names(),
        to_keep: decision.keep_names(),
        results,
    };
    info!(
        "Run {} finished: {} deleted, {} failed",
        run_id,
        report.deleted_count(),
        report.failed_count()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPlatform;
    use crate::models::ImageOutcome;
    use tokio_util::sync::CancellationToken;

    fn family() -> InMemoryPlatform {
        InMemoryPlatform::new()
            .with_template("img-3", "vm-103", "esx01")
            .with_template("img-1", "vm-101", "esx01")
            .with_vm("build-agent", "vm-200", "esx01")
            .with_template("img-5", "vm-105", "esx02")
            .with_vm("img-2", "vm-102", "esx01")
            .with_pool("/DC/host/esx01/Resources")
            .with_pool("/DC/host/esx02/Resources")
    }

    #[tokio::test]
    async fn test_run_deletes_oldest() {
        let platform = family();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());

        let report = run(&RunRequest::new(r"img-(\d+)"), &ctx).await.unwrap();

        assert_eq!(report.to_delete, vec!["img-1", "img-2"]);
        assert_eq!(report.to_keep, vec!["img-3", "img-5"]);
        assert_eq!(report.results.len(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.outcome == ImageOutcome::Deleted));
        assert!(!platform.contains("vm-101"));
        assert!(!platform.contains("vm-102"));
        assert!(platform.contains("vm-103"));
        assert!(platform.contains("vm-200"));
    }

    #[tokio::test]
    async fn test_run_exempts_current_artifact() {
        let platform = family();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());
        let request = RunRequest::new(r"img-(\d+)").current_artifact("img-1");

        let report = run(&request, &ctx).await.unwrap();

        assert_eq!(report.to_delete, vec!["img-2"]);
        assert_eq!(report.to_keep, vec!["img-3", "img-5", "img-1"]);
        assert!(platform.contains("vm-101"));
    }

    #[tokio::test]
    async fn test_dry_run_reports_same_decision_without_actuating() {
        let dry_platform = family();
        let dry_ctx = RunContext::new(&dry_platform, &dry_platform, CancellationToken::new());
        let dry = run(&RunRequest::new(r"img-(\d+)").dry_run(true), &dry_ctx)
            .await
            .unwrap();

        let live_platform = family();
        let live_ctx = RunContext::new(&live_platform, &live_platform, CancellationToken::new());
        let live = run(&RunRequest::new(r"img-(\d+)"), &live_ctx).await.unwrap();

        assert!(dry.dry_run);
        assert!(dry.results.is_empty());
        assert!(dry_platform.actuator_calls().is_empty());
        assert_eq!(dry_platform.pool_listings(), 0);
        assert_eq!(dry.to_delete, live.to_delete);
        assert_eq!(dry.to_keep, live.to_keep);
    }

    #[tokio::test]
    async fn test_declined_run_is_reported_as_dry_run() {
        let platform = family();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());
        let mut seen = Vec::new();

        let report = run_with(&RunRequest::new(r"img-(\d+)"), &ctx, |decision| {
            seen = decision.delete_names();
            false
        })
        .await
        .unwrap();

        assert_eq!(seen, vec!["img-1", "img-2"]);
        assert!(report.dry_run);
        assert!(report.results.is_empty());
        assert!(platform.actuator_calls().is_empty());
    }

    #[tokio::test]
    async fn test_approval_not_asked_for_dry_run_or_empty_batch() {
        let platform = family();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());

        let dry = RunRequest::new(r"img-(\d+)").dry_run(true);
        run_with(&dry, &ctx, |_| panic!("dry runs need no approval"))
            .await
            .unwrap();

        let nothing_to_do = RunRequest::new(r"img-(\d+)").keep(10);
        let report = run_with(&nothing_to_do, &ctx, |_| panic!("empty batch"))
            .await
            .unwrap();
        assert!(!report.dry_run);
        assert!(report.to_delete.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_inventory_access() {
        let platform = family();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());

        let missing = run(&RunRequest::new(""), &ctx).await.unwrap_err();
        assert!(matches!(missing, CleanupError::Config(_)));

        let zero = run(&RunRequest::new(r"img-(\d+)").keep(0), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(zero, CleanupError::InvalidPolicy(_)));

        let negative = run(&RunRequest::new(r"img-(\d+)").keep(-3), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(negative, CleanupError::InvalidPolicy(_)));

        let bad_regex = run(&RunRequest::new(r"img-(\d+"), &ctx).await.unwrap_err();
        assert!(matches!(bad_regex, CleanupError::InvalidPattern(_)));

        assert_eq!(platform.candidate_listings(), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let platform = family().fail_listing();
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());

        let err = run(&RunRequest::new(r"img-(\d+)"), &ctx).await.unwrap_err();

        assert!(matches!(err, CleanupError::Inventory(_)));
        assert!(platform.actuator_calls().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_outcomes_do_not_abort_run() {
        let platform = family()
            .fail_destroy("vm-101")
            .with_orphan_template("img-0", "vm-100");
        let ctx = RunContext::new(&platform, &platform, CancellationToken::new());

        let report = run(&RunRequest::new(r"img-(\d+)"), &ctx).await.unwrap();

        assert_eq!(report.to_delete, vec!["img-0", "img-1", "img-2"]);
        assert!(matches!(
            report.results[0].outcome,
            ImageOutcome::ConversionFailed { .. }
        ));
        assert!(matches!(
            report.results[1].outcome,
            ImageOutcome::DeletionFailed { .. }
        ));
        assert_eq!(report.results[2].outcome, ImageOutcome::Deleted);
        assert_eq!(report.failed_count(), 2);
    }
}
