//! Application-wide constants
//!
//! This module contains all constant values used throughout the judge.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVICE DEFAULTS
// =============================================================================

/// Default health probe host address
pub const DEFAULT_HEALTH_HOST: &str = "0.0.0.0";

/// Default health probe port
pub const DEFAULT_HEALTH_PORT: u16 = 9090;

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "judgeflow=info,sqlx=warn";

// =============================================================================
// SANDBOX DEFAULTS
// =============================================================================

/// Default image for compiled languages
pub const DEFAULT_JUDGE_IMAGE: &str = "judgeflow/judge:latest";

/// Default PID cap per sandbox
pub const DEFAULT_PIDS_LIMIT: i64 = 64;

/// Default size of the writable `/tmp` tmpfs
pub const DEFAULT_TMPFS_SIZE: &str = "100m";

/// Default daemon request timeout in seconds
pub const DEFAULT_DOCKER_TIMEOUT_SECS: u64 = 120;

/// Default number of program output bytes captured by a recipe
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// CPU scheduling period in microseconds
pub const CPU_PERIOD_US: i64 = 100_000;

/// CPU quota per period (one core)
pub const CPU_QUOTA_US: i64 = 100_000;

/// Prefix of every ephemeral sandbox container name
pub const CONTAINER_NAME_PREFIX: &str = "judgeflow-";

/// Label put on every ephemeral sandbox container
pub const CONTAINER_LABEL: &str = "judgeflow.ephemeral";

/// Capabilities dropped from every sandbox
pub const DROPPED_CAPABILITIES: &[&str] = &[
    "NET_ADMIN",
    "SYS_ADMIN",
    "SYS_PTRACE",
    "SYS_MODULE",
    "SYS_RAWIO",
    "SYS_BOOT",
    "SYS_TIME",
    "NET_RAW",
    "AUDIT_CONTROL",
    "AUDIT_READ",
    "AUDIT_WRITE",
    "MKNOD",
    "SETFCAP",
];

// =============================================================================
// RECIPE PROTOCOL
// =============================================================================

/// Exit code reserved by the `timeout` wrapper
pub const TIMEOUT_EXIT_CODE: i64 = 124;

/// Exit code of a SIGKILLed process (OOM kill or forced stop)
pub const KILLED_EXIT_CODE: i64 = 137;

/// Exit code a recipe uses when compilation fails
pub const COMPILE_ERROR_EXIT_CODE: i64 = 200;

/// First stdout line of a recipe whose compilation failed
pub const COMPILE_ERROR_MARKER: &str = "__JUDGEFLOW_COMPILE_ERROR__";

/// Stderr trailer carrying the measured run duration in milliseconds
pub const RUN_MS_MARKER: &str = "__JUDGEFLOW_RUN_MS__";

/// Stderr trailer carrying the peak memory in kilobytes
pub const MEMORY_KB_MARKER: &str = "__JUDGEFLOW_MEM_KB__";

/// Maximum compiler output kept by a recipe
pub const COMPILE_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

// =============================================================================
// JUDGING
// =============================================================================

/// Default number of concurrent judge workers
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default blocking dequeue timeout in seconds
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 5;

/// Default extra wait beyond the in-container deadline
pub const DEFAULT_SAFETY_MARGIN_MS: u64 = 3_000;

/// Default compile step timeout inside a recipe
pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 10_000;

/// Cap on the persisted program output of one case
pub const OUTPUT_CAP_BYTES: usize = 1024;

/// Cap on persisted error messages
pub const ERROR_CAP_BYTES: usize = 1024;

/// Cap on persisted input/expected snapshots
pub const SNAPSHOT_CAP_BYTES: usize = 2048;

/// Maximum accepted source size in bytes
pub const MAX_SOURCE_CODE_SIZE: usize = 64 * 1024;

// =============================================================================
// QUEUES
// =============================================================================

/// Default Redis key prefix for the judge queues
pub const DEFAULT_QUEUE_KEY_PREFIX: &str = "judge:queue:";

/// Queue names
pub mod queues {
    /// Contest submissions
    pub const HIGH_PRIORITY: &str = "high_priority";
    /// Practice submissions
    pub const DEFAULT: &str = "default";
}

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Canonical language identifiers
pub mod languages {
    pub const C: &str = "c";
    pub const CPP: &str = "cpp";
    pub const JAVA: &str = "java";
    pub const PYTHON: &str = "python";
    pub const JAVASCRIPT: &str = "javascript";

    /// All supported language identifiers
    pub const ALL: &[&str] = &[C, CPP, JAVA, PYTHON, JAVASCRIPT];
}

/// Upstream images for interpreted languages
pub mod container_images {
    pub const PYTHON: &str = "python:3.11-slim";
    pub const JAVASCRIPT: &str = "node:20-slim";
}

// =============================================================================
// EXAM SWEEPS
// =============================================================================

/// Default cron expression for the auto-submit sweep (every minute)
pub const DEFAULT_EXAM_SWEEP_CRON: &str = "0 * * * * *";

/// Default cron expression for the auto-unlock sweep
pub const DEFAULT_EXAM_UNLOCK_CRON: &str = "30 * * * * *";

/// Default cooldown before a locked participant is unlocked
pub const DEFAULT_UNLOCK_COOLDOWN_MINUTES: i64 = 10;
