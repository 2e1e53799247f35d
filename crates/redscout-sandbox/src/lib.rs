//! Isolated execution environment for redscout sessions.
//!
//! Every agent-initiated command runs inside a privilege-constrained
//! Docker container owned by exactly one session. The lifecycle is a
//! small state machine:
//!
//! ```text
//! Uninitialized --create--> Running --destroy--> Stopped (terminal)
//! ```
//!
//! `destroy` is idempotent and re-entrant-safe so that guaranteed
//! teardown paths can fire it unconditionally.

pub mod config;
pub mod docker;
pub mod error;

pub use config::{SandboxConfig, CAPABILITY_ALLOWLIST, DEFAULT_IMAGE, DEFAULT_TAG};
pub use docker::DockerSandbox;
pub use error::{SandboxError, SandboxResult};

use async_trait::async_trait;

/// Fixed non-root execution identity inside the container.
pub const SANDBOX_USER: &str = "scout";

/// Working directory (and home) of the sandbox user.
pub const SANDBOX_HOME: &str = "/home/scout";

/// Cookie store file used by HTTP capabilities that opt into
/// session-scoped state.
pub const COOKIE_JAR_PATH: &str = "/home/scout/.cookie-jar";

/// Nested interpreter environment, provisioned lazily by
/// `activate_runtime`.
pub const VENV_PATH: &str = "/home/scout/.venv";

/// Lifecycle status of a sandbox session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxStatus {
    /// No container exists yet.
    Uninitialized,
    /// Container is up and accepting commands.
    Running,
    /// Container has been destroyed. Terminal.
    Stopped,
}

/// The sandbox boundary consumed by the orchestrator and the tools.
///
/// One implementation talks to Docker; tests substitute in-memory
/// fakes that count lifecycle calls.
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    /// Session this sandbox belongs to.
    fn session_id(&self) -> &str;

    /// Current lifecycle status.
    async fn status(&self) -> SandboxStatus;

    /// Create and start the isolated environment. Failure is fatal
    /// and re-raised to the caller; there is no retry.
    async fn create(&self) -> SandboxResult<()>;

    /// Run a command string through a single inner shell, preserving
    /// pipes, redirects and quoting verbatim. Returns combined output
    /// with non-decodable bytes replaced rather than failing.
    async fn execute(&self, command: &str) -> SandboxResult<String>;

    /// Lazily provision the nested interpreter environment. Safe to
    /// call repeatedly; only the first call has effect.
    async fn activate_runtime(&self) -> SandboxResult<()>;

    /// Stop and remove the environment. Idempotent: tolerates an
    /// already-stopped sandbox without raising a secondary error.
    async fn destroy(&self) -> SandboxResult<()>;

    /// Path of the session cookie store inside the container.
    fn cookie_jar(&self) -> &str {
        COOKIE_JAR_PATH
    }

    /// Path of the nested interpreter environment.
    fn venv_path(&self) -> &str {
        VENV_PATH
    }
}

/// Escape a string for use in shell commands.
pub fn shell_escape(s: &str) -> String {
    // Single quotes, with embedded single quotes spliced out
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("hello"), "'hello'");
        assert_eq!(shell_escape("hello world"), "'hello world'");
        assert_eq!(shell_escape("it's"), "'it'\\''s'");
    }
}
