// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Start and stop a `drd-service` child process.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::env::service_env;
use crate::error::{BootstrapError, Result};
use crate::probe::{self, ProbePolicy};

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 3000;
/// How long [`ServiceHandle::stop`] waits after SIGINT before killing.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Describes how to launch a service process.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    program: PathBuf,
    port: u16,
    initializer_directory: Option<PathBuf>,
    database_url: Option<String>,
    probe: ProbePolicy,
    grace_period: Duration,
}

impl Bootstrapper {
    /// Bootstrapper for the `drd-service` executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            port: DEFAULT_PORT,
            initializer_directory: None,
            database_url: None,
            probe: ProbePolicy::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Directory of SQL scripts the service runs at startup.
    pub fn initializer_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.initializer_directory = Some(dir.into());
        self
    }

    /// Database the service uses instead of its default.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn probe_policy(mut self, probe: ProbePolicy) -> Self {
        self.probe = probe;
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Environment variables set on every child process.
    pub fn environment(&self) -> BTreeMap<&'static str, String> {
        let mut env = service_env(self.port, self.initializer_directory.as_deref());
        if let Some(url) = &self.database_url {
            env.insert("DRD_DATABASE_URL", url.clone());
        }
        env
    }

    /// Run `<program> reseed` to completion.
    pub fn reseed(&self) -> Result<()> {
        let status = self
            .command()
            .arg("reseed")
            .stdin(Stdio::null())
            .status()
            .map_err(|source| self.spawn_error(source))?;

        if !status.success() {
            return Err(BootstrapError::Seed { status });
        }
        info!(program = %self.program.display(), "Datastore reseeded");
        Ok(())
    }

    /// Reseed, then launch `<program> serve --port <port>` without waiting
    /// for it to become ready.
    pub fn spawn(&self) -> Result<ServiceHandle> {
        self.reseed()?;

        let child = self
            .command()
            .arg("serve")
            .arg("--port")
            .arg(self.port.to_string())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| self.spawn_error(source))?;

        info!(pid = child.id(), port = self.port, "Service process spawned");

        Ok(ServiceHandle {
            child,
            base_url: self.base_url(),
            probe: self.probe,
            grace_period: self.grace_period,
        })
    }

    /// Spawn and block until the service answers its liveness probe.
    ///
    /// When the probe gives up the child is killed before the error is
    /// returned.
    pub fn start(&self) -> Result<ServiceHandle> {
        let mut handle = self.spawn()?;
        if let Err(e) = handle.await_ready() {
            warn!(error = %e, "Service never became ready, killing it");
            handle.kill();
            return Err(e);
        }
        Ok(handle)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.envs(self.environment());
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> BootstrapError {
        BootstrapError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

/// A running service process owned by the caller.
///
/// Dropping a handle whose process is still running kills the process.
#[derive(Debug)]
pub struct ServiceHandle {
    child: Child,
    base_url: String,
    probe: ProbePolicy,
    grace_period: Duration,
}

impl ServiceHandle {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Block until the liveness probe succeeds or its budget runs out.
    pub fn await_ready(&self) -> Result<()> {
        probe::wait_for_response(&self.base_url, &self.probe)
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Send SIGINT and wait for the process to exit, killing it once the
    /// grace period has passed.
    pub fn stop(mut self) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        let pid = Pid::from_raw(self.child.id() as i32);
        if let Err(errno) = signal::kill(pid, Signal::SIGINT) {
            // ESRCH: it exited between the check and the signal.
            if errno != nix::errno::Errno::ESRCH {
                return Err(std::io::Error::from(errno).into());
            }
        }

        let deadline = Instant::now() + self.grace_period;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait()? {
                info!(pid = pid.as_raw(), %status, "Service process exited");
                return Ok(status);
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }

        warn!(pid = pid.as_raw(), "Service ignored SIGINT, killing it");
        self.child.kill()?;
        Ok(self.child.wait()?)
    }

    fn kill(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.kill();
    }
}
