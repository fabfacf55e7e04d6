use serde::{Deserialize, Serialize};

// Raw vCenter REST response structures

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatacenterSummary {
    pub datacenter: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VmSummary {
    pub vm: String,
    pub name: String,
    #[serde(default)]
    pub power_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VmInfo {
    pub name: String,
    /// Absent when vCenter did not report the object type
    pub template: Option<bool>,
    /// Host the object is registered on, absent for orphaned objects
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostSummary {
    pub host: String,
    pub name: String,
    #[serde(default)]
    pub connection_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourcePoolSummary {
    pub resource_pool: String,
    pub name: String,
}

/// Body of the mark-as-vm action
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarkAsVmSpec {
    pub resource_pool: String,
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vm_info_optional_fields() {
        let info: VmInfo = serde_json::from_value(json!({ "name": "img-1" })).unwrap();
        assert!(info.template.is_none());
        assert!(info.host.is_none());

        let info: VmInfo = serde_json::from_value(json!({
            "name": "img-2",
            "template": true,
            "host": "host-12",
            "power_state": "POWERED_OFF"
        }))
        .unwrap();
        assert_eq!(info.template, Some(true));
        assert_eq!(info.host.as_deref(), Some("host-12"));
    }

    #[test]
    fn test_vm_summary_list() {
        let vms: Vec<VmSummary> = serde_json::from_value(json!([
            { "vm": "vm-1", "name": "img-1", "power_state": "POWERED_OFF" },
            { "vm": "vm-2", "name": "img-2" }
        ]))
        .unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[1].vm, "vm-2");
        assert!(vms[1].power_state.is_none());
    }
}
