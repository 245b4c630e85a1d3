use iron_model::HostInfo;
use sysinfo::System;

/// Collect host facts for the process metadata. Unknown values are left empty.
pub fn host_info() -> HostInfo {
    HostInfo {
        hostname: System::host_name().unwrap_or_default(),
        os: std::env::consts::OS.to_string(),
        platform: System::name().unwrap_or_default(),
        platform_family: System::distribution_id(),
        platform_version: System::os_version().unwrap_or_default(),
    }
}
