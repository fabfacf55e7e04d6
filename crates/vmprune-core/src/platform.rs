use crate::errors::PlatformResult;
use crate::models::{HostRef, InventoryObject, ObjectInfo, ObjectRef, ResourcePool};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Read side of the virtualization platform.
///
/// Every call receives the run's cancellation token; implementations are
/// expected to give up with `PlatformError::Cancelled` once it fires.
pub trait InventoryProvider {
    /// Full, unfiltered snapshot of VM-like objects
    fn list_candidates(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = PlatformResult<Vec<InventoryObject>>> + Send;

    fn list_resource_pools(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = PlatformResult<Vec<ResourcePool>>> + Send;

    /// Fails with `PlatformError::HostResolution` when the object has no host
    fn host_of(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> impl Future<Output = PlatformResult<HostRef>> + Send;

    /// Fails with `PlatformError::Describe`
    fn describe(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> impl Future<Output = PlatformResult<ObjectInfo>> + Send;
}

/// Write side of the virtualization platform
pub trait Actuator {
    fn convert_to_vm(
        &self,
        reference: &ObjectRef,
        pool: &ResourcePool,
        host: &HostRef,
        cancel: &CancellationToken,
    ) -> impl Future<Output = PlatformResult<()>> + Send;

    fn destroy(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> impl Future<Output = PlatformResult<()>> + Send;
}

/// Collaborators and cancellation for a single run
pub struct RunContext<'a, P, A> {
    pub inventory: &'a P,
    pub actuator: &'a A,
    pub cancel: CancellationToken,
}

impl<'a, P, A> RunContext<'a, P, A>
where
    P: InventoryProvider + Sync,
    A: Actuator + Sync,
{
    pub fn new(inventory: &'a P, actuator: &'a A, cancel: CancellationToken) -> Self {
        Self {
            inventory,
            actuator,
            cancel,
        }
    }
}
