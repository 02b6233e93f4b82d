//! Sandboxed execution
//!
//! A [`Sandbox`] runs one shell command in a fresh, disposable container and
//! reports what happened. Infrastructure faults come back as [`SandboxError`]
//! values; user-program failures are ordinary [`ExecResult`]s.

pub mod container;
pub mod security;

use async_trait::async_trait;

use crate::{
    constants::{MEMORY_KB_MARKER, RUN_MS_MARKER},
    error::{SandboxError, SandboxErrorKind},
};

pub use container::DockerSandbox;
pub use security::SecurityPolicy;

/// One isolated execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub image: String,
    /// Script passed to `/bin/sh -c`
    pub command: String,
    pub stdin: Vec<u8>,
    /// Wall-clock budget, safety margin included; the container is killed past it
    pub wall_timeout_ms: u64,
    pub memory_limit_mb: u64,
}

/// Outcome of one execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i64,
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub wall_time_ms: u64,
    pub approx_memory_kb: u64,
    /// Run duration measured inside the container, excluding compilation
    pub reported_run_ms: Option<u64>,
    pub oom_killed: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Run a command in a fresh container that no longer exists when this returns
    async fn run(&self, request: ExecRequest) -> Result<ExecResult, SandboxError>;
}

/// Map a Docker client error onto a sandbox fault kind
pub fn classify_docker_error(err: &bollard::errors::Error) -> SandboxError {
    use bollard::errors::Error;

    let kind = match err {
        Error::DockerResponseServerError { status_code: 404, .. } => SandboxErrorKind::ImageMissing,
        Error::IOError { .. }
        | Error::RequestTimeoutError { .. }
        | Error::SocketNotFoundError { .. }
        | Error::HyperResponseError { .. } => SandboxErrorKind::DaemonUnavailable,
        _ => SandboxErrorKind::Api,
    };

    SandboxError::new(kind, err.to_string())
}

/// Trailer values a recipe reports on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trailers {
    pub run_ms: Option<u64>,
    pub memory_kb: Option<u64>,
}

/// Extract the run-time and memory trailers; the last occurrence wins
pub fn parse_trailers(stderr: &str) -> Trailers {
    let mut trailers = Trailers::default();

    for line in stderr.lines() {
        let mut parts = line.split_whitespace();
        let (Some(marker), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };

        if marker == RUN_MS_MARKER {
            trailers.run_ms = Some(value);
        } else if marker == MEMORY_KB_MARKER {
            trailers.memory_kb = Some(value);
        }
    }

    trailers
}
