use crate::errors::{CleanupError, PlatformError, Result};
use crate::models::{HostRef, ImageOutcome, ManagedImage, PerImageResult, ResourcePool};
use crate::platform::{Actuator, InventoryProvider, RunContext};
use log::{debug, error, info, warn};
use regex::Regex;

/// Escape an object name for use as one inventory path segment
pub fn escape_inventory_name(name: &str) -> String {
    name.replace('%', "%25").replace('/', "%2f")
}

/// Find the default resource pool nested under `host_name`.
///
/// A pool qualifies when its inventory path looks like
/// `/<anything>/<host_name>/Resources` optionally followed by `/<anything>`.
/// The first qualifying pool in listing order wins.
pub fn find_host_pool<'p>(host_name: &str, pools: &'p [ResourcePool]) -> Option<&'p ResourcePool> {
    let pattern = format!(
        "^/.+/{}/Resources(/.*)?$",
        regex::escape(&escape_inventory_name(host_name))
    );
    let host_regex = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!("Unable to build pool pattern for host '{}': {}", host_name, e);
            return None;
        }
    };

    pools
        .iter()
        .find(|pool| host_regex.is_match(&pool.inventory_path))
}

/// Converts and destroys images against a single resource pool snapshot
pub struct Reclaimer<'r, 'a, P, A> {
    ctx: &'r RunContext<'a, P, A>,
    pools: Vec<ResourcePool>,
}

impl<'r, 'a, P, A> Reclaimer<'r, 'a, P, A>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
{
    /// Takes the pool snapshot for the batch. Failing here means the batch
    /// cannot begin.
    pub async fn prepare(ctx: &'r RunContext<'a, P, A>) -> Result<Self> {
        let pools = ctx
            .inventory
            .list_resource_pools(&ctx.cancel)
            .await
            .map_err(|e| {
                error!("Unable to get resource pools: {}", e);
                CleanupError::Inventory(e)
            })?;
        debug!("Fetched {} resource pools", pools.len());
        Ok(Self::with_pools(ctx, pools))
    }

    pub fn with_pools(ctx: &'r RunContext<'a, P, A>, pools: Vec<ResourcePool>) -> Self {
        Self { ctx, pools }
    }

    /// Reclaim one image. Never fails; every problem becomes an outcome.
    pub async fn reclaim_one(&self, image: &ManagedImage) -> ImageOutcome {
        let ctx = self.ctx;
        info!("Deleting virtual machine '{}'", image.name);

        let object_info = match ctx.inventory.describe(&image.source_ref, &ctx.cancel).await {
            Ok(object_info) => object_info,
            Err(e) => {
                warn!(
                    "Unable to retrieve information about '{}', skipping deletion: {}",
                    image.name, e
                );
                return ImageOutcome::InfoRetrievalFailed {
                    reason: e.to_string(),
                };
            }
        };

        if object_info.is_template {
            info!(
                "'{}' is a template, trying to convert it to virtual machine",
                image.name
            );
            if let Some(outcome) = self.convert(image).await {
                return outcome;
            }
        }

        match ctx.actuator.destroy(&image.source_ref, &ctx.cancel).await {
            Ok(()) => {
                info!("Deleted '{}'", image.name);
                ImageOutcome::Deleted
            }
            Err(e) => {
                warn!("Error occurred during '{}' deletion: {}", image.name, e);
                ImageOutcome::DeletionFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Returns `Some(outcome)` when the image must not be destroyed
    async fn convert(&self, image: &ManagedImage) -> Option<ImageOutcome> {
        let ctx = self.ctx;

        let host: HostRef = match ctx.inventory.host_of(&image.source_ref, &ctx.cancel).await {
            Ok(host) => host,
            Err(e) => {
                warn!("Unable to resolve host of '{}': {}", image.name, e);
                let reason = if matches!(e, PlatformError::HostResolution(_)) {
                    e.to_string()
                } else {
                    PlatformError::HostResolution(e.to_string()).to_string()
                };
                return Some(ImageOutcome::ConversionFailed { reason });
            }
        };
        info!("Template '{}' is registered on host '{}'", image.name, host.name);

        let Some(pool) = find_host_pool(&host.name, &self.pools) else {
            let available: Vec<&str> = self
                .pools
                .iter()
                .map(|p| p.inventory_path.as_str())
                .collect();
            warn!(
                "Cannot find relevant resource pool on host '{}' for conversion, available pools: [{}]",
                host.name,
                available.join(", ")
            );
            return Some(ImageOutcome::SkippedNoPool {
                reason: format!("no resource pool found on host '{}'", host.name),
            });
        };
        info!("Using resource pool '{}' for conversion", pool.inventory_path);

        match ctx
            .actuator
            .convert_to_vm(&image.source_ref, pool, &host, &ctx.cancel)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!("Error occurred during template '{}' conversion: {}", image.name, e);
                Some(ImageOutcome::ConversionFailed {
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Reclaim every image in order. Only a failed pool listing is fatal.
pub async fn reclaim<P, A>(
    to_delete: &[ManagedImage],
    ctx: &RunContext<'_, P, A>,
) -> Result<Vec<PerImageResult>>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
{
    if to_delete.is_empty() {
        return Ok(Vec::new());
    }

    let reclaimer = Reclaimer::prepare(ctx).await?;
    let mut results = Vec::with_capacity(to_delete.len());

    for image in to_delete {
        let outcome = reclaimer.reclaim_one(image).await;
        results.push(PerImageResult::new(image.name.clone(), outcome));
    }

    Ok(results)
}
