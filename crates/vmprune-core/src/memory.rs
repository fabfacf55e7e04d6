//! In-memory platform for exercising the pipeline without a vCenter.
//!
//! `InMemoryPlatform` implements both collaborator traits over a literal
//! inventory, records every actuator call, and can be told to fail specific
//! operations for specific objects. Every call honors the cancellation token.

use crate::errors::{PlatformError, PlatformResult};
use crate::models::{HostRef, InventoryObject, ObjectInfo, ObjectRef, ResourcePool};
use crate::platform::{Actuator, InventoryProvider};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Actuator call as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ConvertToVm {
        reference: String,
        pool: String,
        host: String,
    },
    Destroy {
        reference: String,
    },
}

#[derive(Debug, Clone)]
struct FakeObject {
    name: String,
    reference: ObjectRef,
    is_template: bool,
    host: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    objects: Mutex<Vec<FakeObject>>,
    pools: Vec<ResourcePool>,
    failing_describe: HashSet<String>,
    failing_host: HashSet<String>,
    failing_convert: HashSet<String>,
    failing_destroy: HashSet<String>,
    fail_listing: bool,
    fail_pool_listing: bool,
    calls: Mutex<Vec<Call>>,
    candidate_listings: AtomicUsize,
    pool_listings: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn check_cancel(cancel: &CancellationToken) -> PlatformResult<()> {
    if cancel.is_cancelled() {
        Err(PlatformError::Cancelled)
    } else {
        Ok(())
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_object(self, name: &str, id: &str, is_template: bool, host: Option<&str>) -> Self {
        lock(&self.objects).push(FakeObject {
            name: name.to_string(),
            reference: ObjectRef::new(id),
            is_template,
            host: host.map(str::to_string),
        });
        self
    }

    pub fn with_vm(self, name: &str, id: &str, host: &str) -> Self {
        self.with_object(name, id, false, Some(host))
    }

    pub fn with_template(self, name: &str, id: &str, host: &str) -> Self {
        self.with_object(name, id, true, Some(host))
    }

    /// A template whose host cannot be resolved
    pub fn with_orphan_template(self, name: &str, id: &str) -> Self {
        self.with_object(name, id, true, None)
    }

    pub fn with_pool(mut self, inventory_path: &str) -> Self {
        let reference = ObjectRef::new(format!("resgroup-{}", self.pools.len() + 1));
        self.pools.push(ResourcePool {
            inventory_path: inventory_path.to_string(),
            reference,
        });
        self
    }

    pub fn fail_describe(mut self, id: &str) -> Self {
        self.failing_describe.insert(id.to_string());
        self
    }

    pub fn fail_host(mut self, id: &str) -> Self {
        self.failing_host.insert(id.to_string());
        self
    }

    pub fn fail_convert(mut self, id: &str) -> Self {
        self.failing_convert.insert(id.to_string());
        self
    }

    pub fn fail_destroy(mut self, id: &str) -> Self {
        self.failing_destroy.insert(id.to_string());
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn fail_pool_listing(mut self) -> Self {
        self.fail_pool_listing = true;
        self
    }

    pub fn actuator_calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn candidate_listings(&self) -> usize {
        self.candidate_listings.load(Ordering::SeqCst)
    }

    pub fn pool_listings(&self) -> usize {
        self.pool_listings.load(Ordering::SeqCst)
    }

    /// Whether the object still exists
    pub fn contains(&self, id: &str) -> bool {
        lock(&self.objects)
            .iter()
            .any(|object| object.reference.as_str() == id)
    }

    fn find(&self, reference: &ObjectRef) -> Option<FakeObject> {
        lock(&self.objects)
            .iter()
            .find(|object| &object.reference == reference)
            .cloned()
    }
}

impl InventoryProvider for InMemoryPlatform {
    async fn list_candidates(
        &self,
        cancel: &CancellationToken,
    ) -> PlatformResult<Vec<InventoryObject>> {
        check_cancel(cancel)?;
        self.candidate_listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(PlatformError::Listing(
                "unable to retrieve virtual machines".to_string(),
            ));
        }
        Ok(lock(&self.objects)
            .iter()
            .map(|object| InventoryObject::new(object.name.clone(), object.reference.clone()))
            .collect())
    }

    async fn list_resource_pools(
        &self,
        cancel: &CancellationToken,
    ) -> PlatformResult<Vec<ResourcePool>> {
        check_cancel(cancel)?;
        self.pool_listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_pool_listing {
            return Err(PlatformError::Listing(
                "unable to retrieve resource pools".to_string(),
            ));
        }
        Ok(self.pools.clone())
    }

    async fn host_of(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> PlatformResult<HostRef> {
        check_cancel(cancel)?;
        if self.failing_host.contains(reference.as_str()) {
            return Err(PlatformError::HostResolution(format!(
                "no host for {}",
                reference
            )));
        }
        let host = self
            .find(reference)
            .and_then(|object| object.host)
            .ok_or_else(|| PlatformError::HostResolution(format!("no host for {}", reference)))?;
        Ok(HostRef {
            reference: ObjectRef::new(format!("host-{}", host)),
            name: host,
        })
    }

    async fn describe(
        &self,
        reference: &ObjectRef,
        cancel: &CancellationToken,
    ) -> PlatformResult<ObjectInfo> {
        check_cancel(cancel)?;
        if self.failing_describe.contains(reference.as_str()) {
            return Err(PlatformError::Describe(format!(
                "property retrieval failed for {}",
                reference
            )));
        }
        self.find(reference)
            .map(|object| ObjectInfo {
                is_template: object.is_template,
            })
            .ok_or_else(|| PlatformError::Describe(format!("{} not found", reference)))
    }
}

impl Actuator for InMemoryPlatform {
    async fn convert_to_vm(
        &self,
        reference: &ObjectRef,
        pool: &ResourcePool,
        host: &HostRef,
        cancel: &CancellationToken,
    ) -> PlatformResult<()> {
        check_cancel(cancel)?;
        lock(&self.calls).push(Call::ConvertToVm {
            reference: reference.to_string(),
            pool: pool.inventory_path.clone(),
            host: host.name.clone(),
        });
        if self.failing_convert.contains(reference.as_str()) {
            return Err(PlatformError::Conversion(format!(
                "{} is locked by another task",
                reference
            )));
        }
        if let Some(object) = lock(&self.objects)
            .iter_mut()
            .find(|object| &object.reference == reference)
        {
            object.is_template = false;
        }
        Ok(())
    }

    async fn destroy(&self, reference: &ObjectRef, cancel: &CancellationToken) -> PlatformResult<()> {
        check_cancel(cancel)?;
        lock(&self.calls).push(Call::Destroy {
            reference: reference.to_string(),
        });
        if self.failing_destroy.contains(reference.as_str()) {
            return Err(PlatformError::Destroy(format!(
                "{} is powered on",
                reference
            )));
        }
        let mut objects = lock(&self.objects);
        let before = objects.len();
        objects.retain(|object| &object.reference != reference);
        if objects.len() == before {
            return Err(PlatformError::Destroy(format!("{} not found", reference)));
        }
        Ok(())
    }
}
