//! In-memory [`Host`] that records every call.
//!
//! Lets the launch, init, and join sequences be asserted as traces without
//! privileges. Pipe I/O is performed for real so the setup barrier can be
//! exercised end to end.

#![allow(clippy::missing_panics_doc)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;
use nix::sched::{CloneCb, CloneFlags};
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::host::{Host, LinuxHost};

/// One observed host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// [`Host::stat`].
    Stat(PathBuf),
    /// [`Host::create_dir`].
    CreateDir(PathBuf),
    /// [`Host::create_dir_all`].
    CreateDirAll(PathBuf),
    /// [`Host::write_file`].
    Write {
        /// Target path.
        path: PathBuf,
        /// Written value.
        contents: String,
    },
    /// [`Host::read_file`].
    Read(PathBuf),
    /// [`Host::remove_dir`].
    RemoveDir(PathBuf),
    /// [`Host::remove_dir_all`].
    RemoveDirAll(PathBuf),
    /// [`Host::mount`].
    Mount {
        /// Mount source.
        source: Option<String>,
        /// Mount point.
        target: PathBuf,
        /// Filesystem type.
        fstype: Option<String>,
        /// Mount flags.
        flags: MsFlags,
        /// Filesystem-specific options.
        data: Option<String>,
    },
    /// [`Host::unmount`].
    Unmount(PathBuf),
    /// [`Host::chroot`].
    Chroot(PathBuf),
    /// [`Host::chdir`].
    Chdir(PathBuf),
    /// [`Host::set_hostname`].
    SetHostname(String),
    /// [`Host::spawn`].
    Spawn(CloneFlags),
    /// [`Host::signal`].
    Signal(Pid, Signal),
    /// [`Host::read_pipe`].
    PipeRead,
    /// [`Host::write_pipe`].
    PipeWrite,
    /// [`Host::open_namespace`].
    OpenNamespace(PathBuf),
    /// [`Host::enter_namespace`].
    EnterNamespace {
        /// Namespace file that was opened.
        path: PathBuf,
        /// `nstype` passed to `setns`.
        kind: CloneFlags,
    },
    /// [`Host::exec`].
    Exec(Vec<String>),
}

type FailureRule = (Box<dyn Fn(&Call) -> bool>, i32);

/// Recording fake of the OS boundary.
pub struct RecordingHost {
    calls: RefCell<Vec<Call>>,
    existing: RefCell<HashSet<PathBuf>>,
    files: RefCell<HashMap<PathBuf, String>>,
    failures: RefCell<Vec<FailureRule>>,
    ids: (u32, u32),
    child_pid: Cell<i32>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHost")
            .field("calls", &self.calls.borrow().len())
            .finish_non_exhaustive()
    }
}

impl RecordingHost {
    /// Creates a host where nothing exists, running as uid/gid 1000.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            existing: RefCell::new(HashSet::new()),
            files: RefCell::new(HashMap::new()),
            failures: RefCell::new(Vec::new()),
            ids: (1000, 1000),
            child_pid: Cell::new(4242),
        }
    }

    /// Sets the uid/gid reported by [`Host::host_ids`].
    #[must_use]
    pub const fn with_ids(mut self, uid: u32, gid: u32) -> Self {
        self.ids = (uid, gid);
        self
    }

    /// Sets the PID returned by the next [`Host::spawn`].
    pub fn set_child_pid(&self, pid: i32) {
        self.child_pid.set(pid);
    }

    /// Marks `path` as existing, for `stat` and `create_dir`.
    pub fn add_path(&self, path: impl Into<PathBuf>) {
        let _ = self.existing.borrow_mut().insert(path.into());
    }

    /// Serves `contents` from [`Host::read_file`] for `path`.
    pub fn set_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let _ = self.files.borrow_mut().insert(path.into(), contents.into());
    }

    /// Makes every call matching `rule` fail with `errno`.
    pub fn fail_when(&self, rule: impl Fn(&Call) -> bool + 'static, errno: i32) {
        self.failures.borrow_mut().push((Box::new(rule), errno));
    }

    /// Makes `open_namespace` on `path` fail with `ENOENT`.
    pub fn missing_namespace(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.fail_when(
            move |c| matches!(c, Call::OpenNamespace(p) if *p == path),
            nix::errno::Errno::ENOENT as i32,
        );
    }

    /// Snapshot of the recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Recorded writes as `(path, contents)` pairs.
    #[must_use]
    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Write { path, contents } => Some((path.clone(), contents.clone())),
                _ => None,
            })
            .collect()
    }

    /// Index of the first recorded call matching `pred`.
    #[must_use]
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.borrow().iter().position(pred)
    }

    fn record(&self, call: Call) -> io::Result<()> {
        let errno = self
            .failures
            .borrow()
            .iter()
            .find(|(rule, _)| rule(&call))
            .map(|(_, errno)| *errno);
        self.calls.borrow_mut().push(call);
        errno.map_or(Ok(()), |e| Err(io::Error::from_raw_os_error(e)))
    }
}

impl Host for RecordingHost {
    type Namespace = PathBuf;

    fn stat(&self, path: &Path) -> io::Result<()> {
        self.record(Call::Stat(path.to_path_buf()))?;
        if self.existing.borrow().contains(path) {
            Ok(())
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::CreateDir(path.to_path_buf()))?;
        if self.existing.borrow_mut().insert(path.to_path_buf()) {
            Ok(())
        } else {
            Err(io::Error::from(io::ErrorKind::AlreadyExists))
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.record(Call::CreateDirAll(path.to_path_buf()))?;
        let _ = self.existing.borrow_mut().insert(path.to_path_buf());
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.record(Call::Write {
            path: path.to_path_buf(),
            contents: contents.to_owned(),
        })
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.record(Call::Read(path.to_path_buf()))?;
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::RemoveDir(path.to_path_buf()))
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.record(Call::RemoveDirAll(path.to_path_buf()))
    }

    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()> {
        self.record(Call::Mount {
            source: source.map(str::to_owned),
            target: target.to_path_buf(),
            fstype: fstype.map(str::to_owned),
            flags,
            data: data.map(str::to_owned),
        })
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        self.record(Call::Unmount(target.to_path_buf()))
    }

    fn chroot(&self, path: &Path) -> io::Result<()> {
        self.record(Call::Chroot(path.to_path_buf()))
    }

    fn chdir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::Chdir(path.to_path_buf()))
    }

    fn set_hostname(&self, name: &str) -> io::Result<()> {
        self.record(Call::SetHostname(name.to_owned()))
    }

    fn host_ids(&self) -> (u32, u32) {
        self.ids
    }

    fn spawn(&self, _stack: &mut [u8], flags: CloneFlags, entry: CloneCb<'_>) -> io::Result<Pid> {
        // The entry would block on the barrier; it is never run here.
        drop(entry);
        self.record(Call::Spawn(flags))?;
        Ok(Pid::from_raw(self.child_pid.get()))
    }

    fn signal(&self, pid: Pid, signal: Signal) -> io::Result<()> {
        self.record(Call::Signal(pid, signal))
    }

    fn read_pipe(&self, pipe: &File, buf: &mut [u8]) -> io::Result<usize> {
        self.record(Call::PipeRead)?;
        LinuxHost.read_pipe(pipe, buf)
    }

    fn write_pipe(&self, pipe: &File, buf: &[u8]) -> io::Result<usize> {
        self.record(Call::PipeWrite)?;
        LinuxHost.write_pipe(pipe, buf)
    }

    fn open_namespace(&self, path: &Path) -> io::Result<PathBuf> {
        // Host PIDs are not visible through the container's procfs.
        let rooted = self.position(|c| matches!(c, Call::Chroot(_))).is_some();
        self.record(Call::OpenNamespace(path.to_path_buf()))?;
        if rooted {
            return Err(io::Error::from_raw_os_error(nix::errno::Errno::ENOENT as i32));
        }
        Ok(path.to_path_buf())
    }

    fn enter_namespace(&self, ns: &PathBuf, kind: CloneFlags) -> io::Result<()> {
        self.record(Call::EnterNamespace {
            path: ns.clone(),
            kind,
        })
    }

    fn exec(&self, argv: &[String]) -> io::Result<()> {
        self.record(Call::Exec(argv.to_vec()))
    }
}
