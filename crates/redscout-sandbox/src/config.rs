//! Configuration types for the sandbox environment.
//!
//! Resource limits and the privilege envelope are fixed once the
//! container is created; nothing here is mutable after `create`.

use serde::{Deserialize, Serialize};

/// Default base image.
pub const DEFAULT_IMAGE: &str = "redscout/runtime";
pub const DEFAULT_TAG: &str = "latest";

/// Elevated capabilities retained after dropping everything.
///
/// SETUID/SETGID are what sudo-backed package installation needs;
/// NET_RAW is what nmap's raw probes need. Everything else stays
/// dropped.
pub const CAPABILITY_ALLOWLIST: &[&str] = &["SETUID", "SETGID", "NET_RAW"];

/// Sandbox configuration. Immutable after container creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Base image name.
    pub image_name: String,

    /// Base image tag.
    pub image_tag: String,

    /// Dedicated network for assessment traffic.
    pub network_name: String,

    /// Memory limit (e.g. "512m", "2g").
    pub memory_limit: String,

    /// Container name prefix; the session id is appended so that
    /// concurrent sessions never collide.
    pub container_prefix: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image_name: DEFAULT_IMAGE.to_string(),
            image_tag: DEFAULT_TAG.to_string(),
            network_name: "redscout-net".to_string(),
            memory_limit: "512m".to_string(),
            container_prefix: "redscout-".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Full image reference.
    pub fn image(&self) -> String {
        format!("{}:{}", self.image_name, self.image_tag)
    }

    /// Container name for a session.
    pub fn container_name(&self, session_id: &str) -> String {
        format!("{}{}", self.container_prefix, session_id)
    }

    /// Memory limit in bytes, if parseable.
    pub fn memory_bytes(&self) -> Option<i64> {
        parse_size(&self.memory_limit).map(|n| n as i64)
    }
}

/// Parse a size string like "2g", "512m", or "512mb" to bytes.
fn parse_size(s: &str) -> Option<u64> {
    let mut s = s.trim().to_uppercase();
    // "MB"/"GB"/"KB" spellings reduce to the single-letter suffix.
    if s.len() > 1
        && s.ends_with('B')
        && matches!(s.as_bytes()[s.len() - 2], b'K' | b'M' | b'G')
    {
        s.pop();
    }
    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    num_str.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("2g"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("512m"), Some(512 * 1024 * 1024));
        assert_eq!(parse_size("1024"), Some(1024));
        assert_eq!(parse_size("invalid"), None);
    }

    #[test]
    fn test_parse_size_accepts_byte_suffix_spellings() {
        assert_eq!(parse_size("512mb"), Some(512 * 1024 * 1024));
        assert_eq!(parse_size("2GB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("64kb"), Some(64 * 1024));
        // A bare "B" still means bytes.
        assert_eq!(parse_size("100B"), Some(100));
    }

    #[test]
    fn test_default_config() {
        let config = SandboxConfig::default();
        assert_eq!(config.image(), "redscout/runtime:latest");
        assert_eq!(config.memory_bytes(), Some(512 * 1024 * 1024));
    }

    #[test]
    fn test_container_name_embeds_session() {
        let config = SandboxConfig::default();
        assert_eq!(config.container_name("a1b2"), "redscout-a1b2");
        // Distinct sessions must never collide.
        assert_ne!(
            config.container_name("one"),
            config.container_name("two")
        );
    }
}
