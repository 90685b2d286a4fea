//! Configuration for the launcher module.

use std::time::Duration;

use crate::config::ToolConfig;

/// Default cap on retained stdout/stderr per stream.
const DEFAULT_CAPTURE_BYTES: usize = 64 * 1024;

/// Runtime options for [`super::ProcessLauncher`].
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Kill the job if it runs longer than this.
    pub timeout: Option<Duration>,
    /// Demote spawned processes to idle CPU and I/O priority.
    pub demote_priority: bool,
    /// Keep at most this many trailing bytes of each output stream.
    pub capture_bytes: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            demote_priority: true,
            capture_bytes: DEFAULT_CAPTURE_BYTES,
        }
    }
}

impl LauncherConfig {
    pub fn from_tool(tool: &ToolConfig) -> Self {
        Self {
            timeout: tool.job_timeout(),
            demote_priority: tool.demote_priority,
            ..Default::default()
        }
    }

    /// Sets the per-job timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables priority demotion.
    pub fn with_demotion(mut self, demote: bool) -> Self {
        self.demote_priority = demote;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LauncherConfig::default();
        assert_eq!(config.timeout, None);
        assert!(config.demote_priority);
        assert_eq!(config.capture_bytes, 64 * 1024);
    }

    #[test]
    fn test_from_tool_config() {
        let tool = ToolConfig {
            job_timeout_secs: 90,
            demote_priority: false,
            ..Default::default()
        };
        let config = LauncherConfig::from_tool(&tool);
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert!(!config.demote_priority);
    }

    #[test]
    fn test_builder() {
        let config = LauncherConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_demotion(false);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(!config.demote_priority);
    }
}
