//! Docker container-based sandbox.
//!
//! One container per session, created from a fixed base image with
//! all privileges dropped except an enumerated allow-list, bounded
//! memory, a dedicated network and a non-root user.

use crate::{
    config::{SandboxConfig, CAPABILITY_ALLOWLIST},
    error::{SandboxError, SandboxResult},
    SandboxRuntime, SandboxStatus, SANDBOX_HOME, SANDBOX_USER,
};
use async_trait::async_trait;
use bollard::{
    container::{Config, CreateContainerOptions, RemoveContainerOptions, StopContainerOptions},
    exec::{CreateExecOptions, StartExecOptions, StartExecResults},
    image::CreateImageOptions,
    models::HostConfig,
    Docker,
};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Docker-backed sandbox session.
pub struct DockerSandbox {
    session_id: String,
    container_name: String,
    docker: Docker,
    config: SandboxConfig,
    container_id: RwLock<Option<String>>,
    status: RwLock<SandboxStatus>,
    /// Guards lazy venv provisioning; true once provisioned.
    venv_ready: Mutex<bool>,
}

impl DockerSandbox {
    /// Connect to the local Docker daemon and prepare a sandbox for
    /// `session_id`. No container exists until `create` is called.
    pub async fn new(config: SandboxConfig, session_id: &str) -> SandboxResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| SandboxError::connection_failed(e.to_string()))?;

        docker
            .ping()
            .await
            .map_err(|e| SandboxError::connection_failed(format!("Docker ping failed: {}", e)))?;

        Ok(Self::with_docker(docker, config, session_id))
    }

    /// Build a sandbox around an existing Docker handle. Performs no
    /// I/O; used by `new` after the daemon ping and by tests.
    fn with_docker(docker: Docker, config: SandboxConfig, session_id: &str) -> Self {
        let container_name = config.container_name(session_id);
        debug!(session_id = %session_id, container = %container_name, "Docker sandbox prepared");

        Self {
            session_id: session_id.to_string(),
            container_name,
            docker,
            config,
            container_id: RwLock::new(None),
            status: RwLock::new(SandboxStatus::Uninitialized),
            venv_ready: Mutex::new(false),
        }
    }

    /// Ensure the base image is available locally.
    async fn ensure_image(&self) -> SandboxResult<()> {
        let image = self.config.image();

        if self.docker.inspect_image(&image).await.is_ok() {
            debug!(image = %image, "image already present");
            return Ok(());
        }

        info!(image = %image, "pulling image");
        let options = CreateImageOptions {
            from_image: image.as_str(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            if let Err(e) = result {
                return Err(SandboxError::image_pull_failed(image.clone(), e.to_string()));
            }
        }

        Ok(())
    }

    /// Container configuration: default-deny privileges with the
    /// enumerated allow-list, bounded memory, dedicated network,
    /// fixed non-root identity.
    fn container_config(&self) -> Config<String> {
        let host_config = HostConfig {
            memory: self.config.memory_bytes(),
            network_mode: Some(self.config.network_name.clone()),
            cap_drop: Some(vec!["ALL".to_string()]),
            cap_add: Some(
                CAPABILITY_ALLOWLIST
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            ),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            auto_remove: Some(false),
            ..Default::default()
        };

        Config {
            image: Some(self.config.image()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            user: Some(SANDBOX_USER.to_string()),
            working_dir: Some(SANDBOX_HOME.to_string()),
            host_config: Some(host_config),
            env: Some(vec![
                "TERM=dumb".to_string(),
                "DEBIAN_FRONTEND=noninteractive".to_string(),
            ]),
            tty: Some(false),
            attach_stdin: Some(false),
            attach_stdout: Some(false),
            attach_stderr: Some(false),
            labels: Some(HashMap::from([
                ("redscout".to_string(), "true".to_string()),
                ("redscout.session.id".to_string(), self.session_id.clone()),
            ])),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SandboxRuntime for DockerSandbox {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn status(&self) -> SandboxStatus {
        *self.status.read().await
    }

    async fn create(&self) -> SandboxResult<()> {
        {
            let status = self.status.read().await;
            if *status == SandboxStatus::Running {
                return Err(SandboxError::AlreadyRunning);
            }
        }

        self.ensure_image().await?;

        let options = CreateContainerOptions {
            name: self.container_name.as_str(),
            platform: None,
        };

        let container = self
            .docker
            .create_container(Some(options), self.container_config())
            .await
            .map_err(|e| SandboxError::create_failed(e.to_string()))?;

        *self.container_id.write().await = Some(container.id.clone());

        if let Err(e) = self
            .docker
            .start_container::<String>(&container.id, None)
            .await
        {
            // A half-created environment must not outlive the failed
            // create call; route it through the shared teardown path.
            warn!(
                session_id = %self.session_id,
                error = %e,
                "container failed to start, removing it"
            );
            if let Err(cleanup) = self.destroy().await {
                warn!(session_id = %self.session_id, error = %cleanup, "cleanup after failed start failed");
            }
            return Err(SandboxError::StartFailed(e.to_string()));
        }

        *self.status.write().await = SandboxStatus::Running;
        info!(
            session_id = %self.session_id,
            container = %self.container_name,
            "sandbox started"
        );

        Ok(())
    }

    async fn execute(&self, command: &str) -> SandboxResult<String> {
        if *self.status.read().await != SandboxStatus::Running {
            return Err(SandboxError::NotRunning);
        }
        let container_id = self.container_id.read().await.clone();
        let container_id = container_id.ok_or(SandboxError::NotRunning)?;

        debug!(session_id = %self.session_id, command = %command, "executing command");

        // The command string is a single argv element of the inner
        // shell, so pipes, redirects and quoting written by the agent
        // survive verbatim.
        let exec_config = CreateExecOptions::<String> {
            cmd: Some(vec![
                "bash".to_string(),
                "-c".to_string(),
                command.to_string(),
            ]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(&container_id, exec_config)
            .await
            .map_err(|e| {
                warn!(session_id = %self.session_id, error = %e, "exec create failed");
                SandboxError::exec_failed(e.to_string())
            })?;

        let start_result = self
            .docker
            .start_exec(&exec.id, Some(StartExecOptions::default()))
            .await
            .map_err(|e| {
                warn!(session_id = %self.session_id, error = %e, "exec start failed");
                SandboxError::exec_failed(e.to_string())
            })?;

        match start_result {
            StartExecResults::Attached { mut output, .. } => {
                // Combined stdout+stderr in arrival order.
                let mut bytes = Vec::new();
                while let Some(chunk) = output.next().await {
                    match chunk {
                        Ok(bollard::container::LogOutput::StdOut { message })
                        | Ok(bollard::container::LogOutput::StdErr { message }) => {
                            bytes.extend_from_slice(&message);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(session_id = %self.session_id, error = %e, "error reading exec output");
                        }
                    }
                }
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            StartExecResults::Detached => Err(SandboxError::exec_failed(
                "unexpected detached exec".to_string(),
            )),
        }
    }

    async fn activate_runtime(&self) -> SandboxResult<()> {
        let mut ready = self.venv_ready.lock().await;
        if *ready {
            return Ok(());
        }

        info!(session_id = %self.session_id, "provisioning nested interpreter");
        self.execute(&format!("python3 -m venv {}", self.venv_path()))
            .await?;
        *ready = true;
        Ok(())
    }

    async fn destroy(&self) -> SandboxResult<()> {
        {
            let mut status = self.status.write().await;
            if *status == SandboxStatus::Stopped {
                debug!(session_id = %self.session_id, "sandbox already stopped");
                return Ok(());
            }
            *status = SandboxStatus::Stopped;
        }

        let container_id = self.container_id.write().await.take();
        if let Some(id) = container_id {
            // Teardown failures must not mask the run's outcome.
            let stop = StopContainerOptions { t: 2 };
            if let Err(e) = self.docker.stop_container(&id, Some(stop)).await {
                warn!(session_id = %self.session_id, error = %e, "error stopping container");
            }

            let remove = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(e) = self.docker.remove_container(&id, Some(remove)).await {
                warn!(session_id = %self.session_id, error = %e, "error removing container");
            }

            info!(session_id = %self.session_id, container = %self.container_name, "sandbox destroyed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Building the client performs no I/O, so these tests run without
    // a Docker daemon. Anything that would talk to the daemon is
    // rejected by the status checks before a request goes out.
    fn offline_sandbox() -> DockerSandbox {
        // `connect_with_local_defaults` fails if the Docker socket file
        // is absent; the HTTP transport builds without touching disk.
        let docker = Docker::connect_with_http("http://localhost:1", 1, bollard::API_DEFAULT_VERSION)
            .expect("docker client");
        DockerSandbox::with_docker(docker, SandboxConfig::default(), "t1")
    }

    #[tokio::test]
    async fn test_execute_requires_running_sandbox() {
        let sandbox = offline_sandbox();
        assert_eq!(sandbox.status().await, SandboxStatus::Uninitialized);
        assert!(matches!(
            sandbox.execute("id").await,
            Err(SandboxError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_destroy_is_safe_before_and_after_start() {
        // The failed-start path in `create` fires `destroy` while the
        // status is still Uninitialized; teardown must succeed there
        // and stay re-entrant afterwards.
        let sandbox = offline_sandbox();
        sandbox.destroy().await.unwrap();
        assert_eq!(sandbox.status().await, SandboxStatus::Stopped);

        sandbox.destroy().await.unwrap();
        assert_eq!(sandbox.status().await, SandboxStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stopped_sandbox_rejects_commands() {
        let sandbox = offline_sandbox();
        sandbox.destroy().await.unwrap();
        assert!(matches!(
            sandbox.execute("id").await,
            Err(SandboxError::NotRunning)
        ));
    }
}
