//! Docker-backed sandbox driver

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bollard::{
    container::{AttachContainerResults, LogOutput},
    models::ContainerCreateBody,
    query_parameters::{
        AttachContainerOptionsBuilder, CreateContainerOptionsBuilder, InspectContainerOptions,
        KillContainerOptions, RemoveContainerOptionsBuilder, StartContainerOptions,
        WaitContainerOptionsBuilder,
    },
    Docker, API_DEFAULT_VERSION,
};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{classify_docker_error, parse_trailers, ExecRequest, ExecResult, Sandbox, SecurityPolicy};
use crate::{
    config::DockerConfig,
    constants::{
        COMPILE_OUTPUT_LIMIT_BYTES, CONTAINER_LABEL, CONTAINER_NAME_PREFIX, KILLED_EXIT_CODE,
        TIMEOUT_EXIT_CODE,
    },
    error::{SandboxError, SandboxErrorKind},
};

/// Extra stdout bytes kept beyond the recipe's own cap, for markers
const CAPTURE_SLACK_BYTES: usize = 4096;

/// Stderr only carries recipe trailers
const STDERR_CAPTURE_BYTES: usize = 16 * 1024;

/// Sandbox driver running each request in a fresh Docker container
#[derive(Clone)]
pub struct DockerSandbox {
    docker: Docker,
    remover: Arc<dyn ContainerRemover>,
    policy: SecurityPolicy,
    capture_limit: usize,
}

impl DockerSandbox {
    /// Create a new driver over an existing client
    pub fn new(docker: Docker, config: &DockerConfig) -> Self {
        let policy = SecurityPolicy::from_config(config);
        if policy.seccomp_profile.is_none() {
            tracing::warn!("No seccomp profile applied to sandbox containers");
        }

        Self {
            remover: Arc::new(docker.clone()),
            docker,
            policy,
            capture_limit: config.output_limit_bytes.max(COMPILE_OUTPUT_LIMIT_BYTES)
                + CAPTURE_SLACK_BYTES,
        }
    }

    /// Connect to the daemon named by `DOCKER_HOST`, or the local socket
    pub fn connect(config: &DockerConfig) -> Result<Docker, SandboxError> {
        let timeout = config.timeout_secs;
        let docker = match config.host.as_deref() {
            Some(host) if host.starts_with("tcp://") || host.starts_with("http://") => {
                Docker::connect_with_http(host, timeout, API_DEFAULT_VERSION)
            }
            Some(host) => Docker::connect_with_socket(
                host.trim_start_matches("unix://"),
                timeout,
                API_DEFAULT_VERSION,
            ),
            None => Docker::connect_with_socket_defaults()
                .map(|docker| docker.with_timeout(Duration::from_secs(timeout))),
        };

        docker.map_err(|e| SandboxError::new(SandboxErrorKind::DaemonUnavailable, e.to_string()))
    }

    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Check that the daemon is reachable
    pub async fn ping(&self) -> Result<(), SandboxError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| SandboxError::new(SandboxErrorKind::DaemonUnavailable, e.to_string()))
    }

    /// Container definition for one request
    fn container_body(&self, request: &ExecRequest) -> ContainerCreateBody {
        let has_stdin = !request.stdin.is_empty();

        let mut labels = HashMap::new();
        labels.insert(CONTAINER_LABEL.to_string(), "true".to_string());

        ContainerCreateBody {
            image: Some(request.image.clone()),
            cmd: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                request.command.clone(),
            ]),
            working_dir: Some("/tmp".to_string()),
            env: Some(vec!["LANG=C.UTF-8".to_string()]),
            attach_stdin: Some(has_stdin),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(has_stdin),
            stdin_once: Some(has_stdin),
            tty: Some(false),
            network_disabled: Some(true),
            labels: Some(labels),
            host_config: Some(self.policy.host_config(request.memory_limit_mb)),
            ..Default::default()
        }
    }

    async fn create(&self, name: &str, request: &ExecRequest) -> Result<ContainerGuard, SandboxError> {
        let options = CreateContainerOptionsBuilder::default().name(name).build();

        self.docker
            .create_container(Some(options), self.container_body(request))
            .await
            .map_err(|e| classify_docker_error(&e))?;

        tracing::debug!(container = %name, image = %request.image, "Sandbox container created");

        Ok(ContainerGuard::new(self.remover.clone(), name))
    }

    /// Attach, start, feed stdin, collect output and wait for exit
    async fn execute(&self, name: &str, request: &ExecRequest) -> Result<ExecResult, SandboxError> {
        let has_stdin = !request.stdin.is_empty();

        let attach_options = AttachContainerOptionsBuilder::default()
            .stdin(has_stdin)
            .stdout(true)
            .stderr(true)
            .stream(true)
            .build();

        let AttachContainerResults { mut output, mut input } = self
            .docker
            .attach_container(name, Some(attach_options))
            .await
            .map_err(|e| api_error("attach", &e))?;

        self.docker
            .start_container(name, None::<StartContainerOptions>)
            .await
            .map_err(|e| api_error("start", &e))?;
        let started = Instant::now();

        if has_stdin {
            if let Err(e) = input.write_all(&request.stdin).await {
                tracing::debug!(container = %name, error = %e, "Failed to write sandbox stdin");
            } else if let Err(e) = input.flush().await {
                tracing::debug!(container = %name, error = %e, "Failed to flush sandbox stdin");
            }
        }

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let deadline = Duration::from_millis(request.wall_timeout_ms);

        let collected = tokio::time::timeout(deadline, async {
            while let Some(chunk) = output.next().await {
                match chunk.map_err(|e| api_error("attach", &e))? {
                    LogOutput::StdOut { message } => {
                        push_capped(&mut stdout, &message, self.capture_limit)
                    }
                    LogOutput::StdErr { message } => {
                        push_capped(&mut stderr, &message, STDERR_CAPTURE_BYTES)
                    }
                    _ => {}
                }
            }
            self.wait_exit_code(name).await
        })
        .await;

        let (exit_code, killed) = match collected {
            Ok(exit) => (exit?, false),
            Err(_) => {
                tracing::debug!(container = %name, "Sandbox exceeded its deadline, killing");
                if let Err(e) = self
                    .docker
                    .kill_container(name, None::<KillContainerOptions>)
                    .await
                {
                    tracing::warn!(container = %name, error = %e, "Failed to kill sandbox container");
                }
                (KILLED_EXIT_CODE, true)
            }
        };
        let wall_time_ms = started.elapsed().as_millis() as u64;

        let oom_killed = match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(info) => info
                .state
                .and_then(|state| state.oom_killed)
                .unwrap_or(false),
            Err(e) => {
                tracing::debug!(container = %name, error = %e, "Failed to inspect sandbox container");
                false
            }
        };

        let trailers = parse_trailers(&String::from_utf8_lossy(&stderr));

        Ok(ExecResult {
            exit_code,
            timed_out: killed || exit_code == TIMEOUT_EXIT_CODE,
            stdout,
            wall_time_ms,
            approx_memory_kb: trailers.memory_kb.unwrap_or(0),
            reported_run_ms: trailers.run_ms,
            oom_killed,
        })
    }

    async fn wait_exit_code(&self, name: &str) -> Result<i64, SandboxError> {
        let options = WaitContainerOptionsBuilder::default()
            .condition("not-running")
            .build();
        let mut wait = self.docker.wait_container(name, Some(options));

        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits surface as this error variant
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(api_error("wait", &e)),
            None => Err(SandboxError::new(
                SandboxErrorKind::Api,
                "wait stream ended without a status",
            )),
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn run(&self, request: ExecRequest) -> Result<ExecResult, SandboxError> {
        let name = format!("{CONTAINER_NAME_PREFIX}{}", Uuid::new_v4());

        let guard = self.create(&name, &request).await?;
        guarded(guard, self.execute(&name, &request)).await
    }
}

/// Await `work`, then remove the container whatever the outcome
///
/// An execution error wins over a cleanup error. If this future is dropped
/// mid-way the guard schedules the removal instead.
async fn guarded<T>(
    guard: ContainerGuard,
    work: impl Future<Output = Result<T, SandboxError>>,
) -> Result<T, SandboxError> {
    let outcome = work.await;
    let cleanup = guard.release().await;

    match (outcome, cleanup) {
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => Err(e),
        (Ok(result), Ok(())) => Ok(result),
    }
}

/// Force-removes containers by name
#[async_trait]
trait ContainerRemover: Send + Sync {
    async fn remove(&self, name: &str) -> Result<(), bollard::errors::Error>;
}

#[async_trait]
impl ContainerRemover for Docker {
    async fn remove(&self, name: &str) -> Result<(), bollard::errors::Error> {
        let options = RemoveContainerOptionsBuilder::default()
            .force(true)
            .v(true)
            .build();
        self.remove_container(name, Some(options)).await
    }
}

/// Scoped ownership of a created container
///
/// `release` removes the container; a guard dropped without release (the
/// caller was cancelled or panicked) schedules the removal on the runtime.
struct ContainerGuard {
    remover: Arc<dyn ContainerRemover>,
    name: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(remover: Arc<dyn ContainerRemover>, name: &str) -> Self {
        Self {
            remover,
            name: name.to_string(),
            armed: true,
        }
    }

    async fn release(mut self) -> Result<(), SandboxError> {
        self.armed = false;

        if let Err(first) = remove_container(self.remover.as_ref(), &self.name).await {
            tracing::warn!(container = %self.name, error = %first, "Retrying sandbox removal");
            remove_container(self.remover.as_ref(), &self.name).await.map_err(|e| {
                tracing::error!(container = %self.name, error = %e, "Failed to remove sandbox container");
                SandboxError::new(SandboxErrorKind::Cleanup, e.to_string())
            })?;
        }

        tracing::debug!(container = %self.name, "Sandbox container removed");
        Ok(())
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let remover = self.remover.clone();
        let name = std::mem::take(&mut self.name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = remove_container(remover.as_ref(), &name).await {
                        tracing::error!(container = %name, error = %e, "Failed to remove abandoned sandbox");
                    }
                });
            }
            Err(_) => {
                tracing::error!(container = %name, "No runtime left to remove sandbox container");
            }
        }
    }
}

/// Force-remove a container; an already missing container counts as removed
async fn remove_container(
    remover: &dyn ContainerRemover,
    name: &str,
) -> Result<(), bollard::errors::Error> {
    match remover.remove(name).await {
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => Ok(()),
        other => other,
    }
}

/// Classify an error raised after the container exists; 404 no longer means a missing image
fn api_error(stage: &str, err: &bollard::errors::Error) -> SandboxError {
    let mut error = classify_docker_error(err);
    if error.kind == SandboxErrorKind::ImageMissing {
        error.kind = SandboxErrorKind::Api;
    }
    error.message = format!("{stage}: {}", error.message);
    error
}

/// Append `chunk` to `buf` without letting it grow past `limit`
fn push_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) {
    let room = limit.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
}
