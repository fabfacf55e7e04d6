use crate::client::VsphereClient;
use crate::models::{MarkAsVmSpec, ResourcePoolSummary, VmInfo};
use log::debug;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use vmprune_core::{
    Actuator, HostRef, InventoryObject, InventoryProvider, ObjectInfo, ObjectRef, PlatformError,
    PlatformResult, ResourcePool,
};
use vmprune_utils::InventoryPath;

/// Name vCenter gives the root resource pool of every compute resource
const ROOT_POOL_NAME: &str = "Resources";

/// Race a request against the run's cancellation token
async fn guarded<T, F>(cancel: &CancellationToken, request: F) -> PlatformResult<T>
where
    F: Future<Output = PlatformResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PlatformError::Cancelled),
        result = request => result,
    }
}

/// Inventory paths for the pools of one host, root pool first.
///
/// Standalone hosts live at `/<dc>/host/<host>`; their root pool is
/// `Resources` and child pools are nested below it.
pub fn host_pool_paths(
    datacenter: &str,
    host_name: &str,
    pools: Vec<ResourcePoolSummary>,
) -> Vec<ResourcePool> {
    let root = InventoryPath::from_segments([datacenter, "host", host_name, ROOT_POOL_NAME]);

    let (roots, children): (Vec<_>, Vec<_>) = pools
        .into_iter()
        .partition(|pool| pool.name == ROOT_POOL_NAME);

    roots
        .into_iter()
        .map(|pool| ResourcePool {
            inventory_path: root.to_string(),
            reference: ObjectRef::new(pool.resource_pool),
        })
        .chain(children.into_iter().map(|pool| ResourcePool {
            inventory_path: root.child(pool.name).to_string(),
            reference: ObjectRef::new(pool.resource_pool),
        }))
        .collect()
}

/// Object type of a VM info body. An unreported type is a describe failure,
/// never a plain VM.
pub fn object_info(reference: &ObjectRef, info: &VmInfo) -> PlatformResult<ObjectInfo> {
    match info.template {
        Some(is_template) => Ok(ObjectInfo { is_template }),
        None => Err(PlatformError::Describe(format!(
            "object type of {} ({}) is unknown",
            info.name, reference
        ))),
    }
}

impl VsphereClient {
    async fn candidates(&self) -> PlatformResult<Vec<InventoryObject>> {
        let vms = self.list_vms().await?;
        Ok(vms
            .into_iter()
            .map(|vm| InventoryObject::new(vm.name, ObjectRef::new(vm.vm)))
            .collect())
    }

    async fn resource_pools(&self) -> PlatformResult<Vec<ResourcePool>> {
        let datacenter = self.datacenter().name.clone();
        let mut pools = Vec::new();

        for host in self.list_hosts().await? {
            let host_pools = self.list_host_pools(&host.host).await?;
            pools.extend(host_pool_paths(&datacenter, &host.name, host_pools));
        }

        debug!("Resolved {} resource pool paths", pools.len());
        Ok(pools)
    }

    async fn host(&self, reference: &ObjectRef) -> PlatformResult<HostRef> {
        let info = self
            .get_vm(reference.as_str())
            .await
            .map_err(|e| e.into_platform(PlatformError::HostResolution))?;

        let host_id = info.host.ok_or_else(|| {
            PlatformError::HostResolution(format!("{} is not registered on a host", reference))
        })?;

        let host = self
            .get_host(&host_id)
            .await
            .map_err(|e| e.into_platform(PlatformError::HostResolution))?
            .ok_or_else(|| PlatformError::HostResolution(format!("host {} not found", host_id)))?;

        Ok(HostRef {
            reference: ObjectRef::new(host.host),
            name: host.name,
        })
    }
}

impl InventoryProvider for VsphereClient {
    async fn list_candidates(
        &self,
        cancel: &CancellationToken,
    ) -> PlatformResult<Vec<InventoryObject>> {
        guarded(cancel, self.candidates()).await
    }

    async fn list_resource_pools(
        &self,
        cancel: &CancellationToken,
    ) -> PlatformResult<Vec<ResourcePool>> {
        guarded(cancel, self.resource_pools()).await
    }

    async fn host_of(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> PlatformResult<HostRef> {
        guarded(cancel, self.host(reference)).await
    }

    async fn describe(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> PlatformResult<ObjectInfo> {
        guarded(cancel, async {
            let info = self
                .get_vm(reference.as_str())
                .await
                .map_err(|e| e.into_platform(PlatformError::Describe))?;
            object_info(reference, &info)
        })
        .await
    }
}

impl Actuator for VsphereClient {
    async fn convert_to_vm(
        &self,
        reference: &ObjectRef,
        pool: &ResourcePool,
        host: &HostRef,
        cancel: &CancellationToken,
    ) -> PlatformResult<()> {
        let spec = MarkAsVmSpec {
            resource_pool: pool.reference.to_string(),
            host: host.reference.to_string(),
        };
        guarded(cancel, async {
            self.mark_as_vm(reference.as_str(), &spec)
                .await
                .map_err(|e| e.into_platform(PlatformError::Conversion))
        })
        .await
    }

    async fn destroy(&self, reference: &ObjectRef, cancel: &CancellationToken) -> PlatformResult<()> {
        guarded(cancel, async {
            self.delete_vm(reference.as_str())
                .await
                .map_err(|e| e.into_platform(PlatformError::Destroy))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, name: &str) -> ResourcePoolSummary {
        ResourcePoolSummary {
            resource_pool: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_host_pool_paths_root_first() {
        let pools = host_pool_paths(
            "DC",
            "esx01",
            vec![summary("resgroup-9", "builds"), summary("resgroup-8", "Resources")],
        );

        assert_eq!(pools[0].inventory_path, "/DC/host/esx01/Resources");
        assert_eq!(pools[0].reference, ObjectRef::new("resgroup-8"));
        assert_eq!(pools[1].inventory_path, "/DC/host/esx01/Resources/builds");
    }

    #[test]
    fn test_host_pool_paths_match_core_lookup() {
        let pools = host_pool_paths("DC", "esx01.lab", vec![summary("resgroup-8", "Resources")]);
        let found = vmprune_core::find_host_pool("esx01.lab", &pools).unwrap();
        assert_eq!(found.reference, ObjectRef::new("resgroup-8"));
    }

    #[test]
    fn test_host_with_slash_finds_its_pool() {
        let pools = host_pool_paths("DC", "esx/01", vec![summary("resgroup-8", "Resources")]);
        assert_eq!(pools[0].inventory_path, "/DC/host/esx%2f01/Resources");

        let found = vmprune_core::find_host_pool("esx/01", &pools).unwrap();
        assert_eq!(found.reference, ObjectRef::new("resgroup-8"));
    }

    #[test]
    fn test_object_info_requires_template_flag() {
        let reference = ObjectRef::new("vm-7");
        let info: VmInfo = serde_json::from_value(serde_json::json!({ "name": "img-7" })).unwrap();

        let err = object_info(&reference, &info).unwrap_err();
        assert!(matches!(err, PlatformError::Describe(_)));

        let template: VmInfo =
            serde_json::from_value(serde_json::json!({ "name": "img-7", "template": true }))
                .unwrap();
        assert_eq!(
            object_info(&reference, &template),
            Ok(ObjectInfo { is_template: true })
        );
    }

    #[tokio::test]
    async fn test_guarded_reports_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: PlatformResult<()> =
            guarded(&cancel, std::future::pending::<PlatformResult<()>>()).await;

        assert_eq!(result, Err(PlatformError::Cancelled));
    }

    #[tokio::test]
    async fn test_guarded_passes_through() {
        let cancel = CancellationToken::new();
        let result = guarded(&cancel, async { Ok::<_, PlatformError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
