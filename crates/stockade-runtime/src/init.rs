//! The container's init process.
//!
//! Runs as PID 1 of the new PID namespace, in place of a real supervisor.
//! It moves through four phases:
//!
//! ```text
//! AwaitingSetup --barrier--> Finalizing --root ready--> Running --shutdown--> Stopped
//! ```
//!
//! Any failure before `Running` is fatal to the container.

use std::fmt;
use std::os::fd::RawFd;

use nix::sys::signal::{SigSet, Signal};
use stockade_common::config::ContainerConfig;
use stockade_common::error::{Result, StockadeError};
use stockade_core::filesystem::{mount, root};
use stockade_core::host::Host;
use stockade_core::namespace::uts;
use stockade_core::sync::{self, BarrierReceiver};

/// Phase of the init state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    /// Blocked until the parent finishes privileged setup.
    AwaitingSetup,
    /// Building the isolated root and hostname.
    Finalizing,
    /// Idle, waiting for a shutdown request.
    Running,
    /// Shutdown requested; the process exits cleanly.
    Stopped,
}

impl fmt::Display for InitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingSetup => "awaiting-setup",
            Self::Finalizing => "finalizing",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Source of the request that moves init from `Running` to `Stopped`.
pub trait ShutdownSignal {
    /// Blocks until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting itself fails.
    fn wait(&mut self) -> Result<()>;
}

/// Shutdown on `SIGTERM`.
///
/// The signal is blocked at install time and collected with `sigwait`, so
/// it is queued rather than lost, even for a PID-namespace init (which the
/// kernel shields from default-disposition signals).
#[derive(Debug)]
pub struct TerminationSignal {
    set: SigSet,
}

impl TerminationSignal {
    /// Blocks `SIGTERM` for the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal mask cannot be changed.
    pub fn install() -> Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGTERM);
        set.thread_block()
            .map_err(|e| StockadeError::syscall("block SIGTERM", e.into()))?;
        Ok(Self { set })
    }
}

impl ShutdownSignal for TerminationSignal {
    fn wait(&mut self) -> Result<()> {
        let signal = self
            .set
            .wait()
            .map_err(|e| StockadeError::syscall("sigwait", e.into()))?;
        tracing::info!(%signal, "termination requested");
        Ok(())
    }
}

/// State machine driving one container init.
#[derive(Debug)]
pub struct ContainerInit<'a, H: Host> {
    host: &'a H,
    config: &'a ContainerConfig,
    phase: InitPhase,
}

impl<'a, H: Host> ContainerInit<'a, H> {
    /// Creates an init in [`InitPhase::AwaitingSetup`].
    pub const fn new(host: &'a H, config: &'a ContainerConfig) -> Self {
        Self {
            host,
            config,
            phase: InitPhase::AwaitingSetup,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> InitPhase {
        self.phase
    }

    fn expect_phase(&self, expected: InitPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(StockadeError::Config {
                message: format!("init is {}, expected {expected}", self.phase),
            })
        }
    }

    /// Blocks on the barrier until the parent has written the ID maps and
    /// enrolled the cgroup.
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order or if the barrier breaks.
    pub fn await_setup(&mut self, barrier: BarrierReceiver) -> Result<()> {
        self.expect_phase(InitPhase::AwaitingSetup)?;
        tracing::info!("waiting for parent setup");
        barrier.wait(self.host)?;
        self.phase = InitPhase::Finalizing;
        tracing::info!("setup complete, finalizing environment");
        Ok(())
    }

    /// Makes mounts private, enters the overlay root, mounts `/proc`, and
    /// applies the hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order or any step fails.
    pub fn finalize(&mut self) -> Result<()> {
        self.expect_phase(InitPhase::Finalizing)?;
        mount::make_mounts_private(self.host)?;
        root::enter_root(self.host, &self.config.overlay.merged)?;
        mount::mount_proc(self.host)?;
        uts::set_hostname(self.host, &self.config.hostname)?;
        self.phase = InitPhase::Running;
        tracing::info!(hostname = %self.config.hostname, "container is running");
        Ok(())
    }

    /// Idles until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order or waiting fails.
    pub fn run<S: ShutdownSignal>(&mut self, shutdown: &mut S) -> Result<()> {
        self.expect_phase(InitPhase::Running)?;
        shutdown.wait()?;
        self.phase = InitPhase::Stopped;
        tracing::info!("container stopped");
        Ok(())
    }
}

/// Entry point of the cloned child. Returns the process exit status.
///
/// `inherited_sender` is the child's copy of the barrier's send half; it
/// is closed first so a vanished parent is seen as end-of-file.
pub fn run_child<H: Host>(
    host: &H,
    config: &ContainerConfig,
    barrier: BarrierReceiver,
    inherited_sender: RawFd,
) -> isize {
    let mut init = ContainerInit::new(host, config);
    let result = sync::close_inherited(inherited_sender).and_then(|()| {
        init.await_setup(barrier)?;
        init.finalize()?;
        let mut shutdown = TerminationSignal::install()?;
        init.run(&mut shutdown)
    });
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(phase = %init.phase(), error = %e, "container init failed");
            1
        }
    }
}
