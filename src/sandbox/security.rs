//! Resource and privilege limits applied to every sandbox container

use std::collections::HashMap;
use std::path::Path;

use bollard::models::HostConfig;

use crate::{
    config::DockerConfig,
    constants::{CPU_PERIOD_US, CPU_QUOTA_US, DROPPED_CAPABILITIES},
};

/// Isolation settings shared by all runs of one driver
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub pids_limit: i64,
    pub tmpfs_size: String,
    /// Seccomp profile JSON, when a profile file was found
    pub seccomp_profile: Option<String>,
}

impl SecurityPolicy {
    /// Build the policy from configuration, loading the seccomp profile if present
    pub fn from_config(config: &DockerConfig) -> Self {
        Self {
            pids_limit: config.pids_limit,
            tmpfs_size: config.tmpfs_size.clone(),
            seccomp_profile: config
                .seccomp_profile
                .as_deref()
                .and_then(load_seccomp_profile),
        }
    }

    /// Host configuration for one run with the given memory cap
    pub fn host_config(&self, memory_limit_mb: u64) -> HostConfig {
        let memory_bytes = (memory_limit_mb.max(1) * 1024 * 1024) as i64;

        let mut tmpfs = HashMap::new();
        tmpfs.insert(
            "/tmp".to_string(),
            format!("rw,exec,nosuid,size={}", self.tmpfs_size),
        );

        let mut security_opt = vec!["no-new-privileges".to_string()];
        if let Some(profile) = &self.seccomp_profile {
            security_opt.push(format!("seccomp={profile}"));
        }

        HostConfig {
            memory: Some(memory_bytes),
            // Equal to memory: swap disabled
            memory_swap: Some(memory_bytes),
            cpu_period: Some(CPU_PERIOD_US),
            cpu_quota: Some(CPU_QUOTA_US),
            network_mode: Some("none".to_string()),
            pids_limit: Some(self.pids_limit),
            readonly_rootfs: Some(true),
            tmpfs: Some(tmpfs),
            cap_drop: Some(DROPPED_CAPABILITIES.iter().map(|c| c.to_string()).collect()),
            security_opt: Some(security_opt),
            privileged: Some(false),
            ..Default::default()
        }
    }
}

/// Read a seccomp profile; a missing or unreadable file is logged and skipped
pub fn load_seccomp_profile(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(profile) if !profile.trim().is_empty() => Some(profile),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Seccomp profile is empty, running without it");
            None
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Seccomp profile not available, running without it"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn policy() -> SecurityPolicy {
        SecurityPolicy {
            pids_limit: 64,
            tmpfs_size: "100m".to_string(),
            seccomp_profile: None,
        }
    }

    #[test]
    fn test_host_config_isolation() {
        let host = policy().host_config(256);

        assert_eq!(host.memory, Some(256 * 1024 * 1024));
        assert_eq!(host.memory, host.memory_swap);
        assert_eq!(host.network_mode.as_deref(), Some("none"));
        assert_eq!(host.readonly_rootfs, Some(true));
        assert_eq!(host.pids_limit, Some(64));
        assert_eq!(host.cpu_quota, host.cpu_period);

        let tmpfs = host.tmpfs.unwrap();
        let opts = tmpfs.get("/tmp").unwrap();
        assert!(opts.contains("exec"));
        assert!(opts.contains("size=100m"));

        let dropped = host.cap_drop.unwrap();
        for cap in ["NET_ADMIN", "SYS_ADMIN", "SYS_PTRACE", "NET_RAW", "AUDIT_WRITE"] {
            assert!(dropped.iter().any(|c| c == cap), "{cap} not dropped");
        }
        assert_eq!(host.security_opt.unwrap(), vec!["no-new-privileges".to_string()]);
    }

    #[test]
    fn test_seccomp_profile_is_attached() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"defaultAction":"SCMP_ACT_ALLOW"}}"#).unwrap();

        let profile = load_seccomp_profile(file.path());
        assert!(profile.is_some());

        let policy = SecurityPolicy {
            seccomp_profile: profile,
            ..policy()
        };
        let opts = policy.host_config(64).security_opt.unwrap();
        assert!(opts.iter().any(|o| o.starts_with("seccomp={")));
    }

    #[test]
    fn test_missing_seccomp_profile_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(load_seccomp_profile(&missing).is_none());

        let config = DockerConfig {
            seccomp_profile: Some(missing),
            ..DockerConfig::default()
        };
        assert!(SecurityPolicy::from_config(&config).seccomp_profile.is_none());
    }
}
