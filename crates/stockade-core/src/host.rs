//! The operating-system boundary.
//!
//! Every privileged call the runtime makes goes through [`Host`], so the
//! launch, init, and join sequences can be driven against a recording fake
//! in tests and against [`LinuxHost`] in production. Methods return raw
//! [`std::io::Result`]s; callers attach the path or operation name.

use std::fs::File;
use std::io;
use std::path::Path;

use nix::mount::MsFlags;
use nix::sched::{CloneCb, CloneFlags};
use nix::sys::signal::Signal;
use nix::unistd::Pid;

/// Thin, uninterpreted access to the kernel facilities the runtime needs.
pub trait Host {
    /// Handle to an opened `/proc/<pid>/ns/*` file.
    type Namespace;

    /// Succeeds if `path` exists and can be inspected.
    fn stat(&self, path: &Path) -> io::Result<()>;

    /// Creates a single directory with mode 0755.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Creates a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Opens `path` for writing (creating it 0644 if absent) and writes
    /// `contents` in a single call.
    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Reads a small pseudo-file into a string.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Removes an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory tree.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// `mount(2)`.
    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()>;

    /// Lazily detaches the mount at `target`.
    fn unmount(&self, target: &Path) -> io::Result<()>;

    /// `chroot(2)`.
    fn chroot(&self, path: &Path) -> io::Result<()>;

    /// `chdir(2)`.
    fn chdir(&self, path: &Path) -> io::Result<()>;

    /// `sethostname(2)`.
    fn set_hostname(&self, name: &str) -> io::Result<()>;

    /// Real UID and GID of the calling process.
    fn host_ids(&self) -> (u32, u32);

    /// `clone(2)` running `entry` on `stack` in the namespaces named by
    /// `flags`; the child delivers `SIGCHLD` to its parent on exit.
    fn spawn(&self, stack: &mut [u8], flags: CloneFlags, entry: CloneCb<'_>) -> io::Result<Pid>;

    /// Sends `signal` to `pid`.
    fn signal(&self, pid: Pid, signal: Signal) -> io::Result<()>;

    /// Reads from one end of a pipe.
    fn read_pipe(&self, pipe: &File, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes to one end of a pipe.
    fn write_pipe(&self, pipe: &File, buf: &[u8]) -> io::Result<usize>;

    /// Opens a namespace file for a later [`Host::enter_namespace`].
    fn open_namespace(&self, path: &Path) -> io::Result<Self::Namespace>;

    /// `setns(2)`.
    fn enter_namespace(&self, ns: &Self::Namespace, kind: CloneFlags) -> io::Result<()>;

    /// Replaces the process image with `argv[0]`, searching `PATH`.
    ///
    /// Only returns on failure when talking to the real kernel.
    fn exec(&self, argv: &[String]) -> io::Result<()>;
}

/// [`Host`] backed by the running Linux kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxHost;

impl Host for LinuxHost {
    type Namespace = File;

    fn stat(&self, path: &Path) -> io::Result<()> {
        std::fs::metadata(path).map(|_| ())
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::DirBuilderExt;

        std::fs::DirBuilder::new().mode(0o755).create(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(path)?;
        let written = file.write(contents.as_bytes())?;
        if written != contents.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {written} of {} bytes", contents.len()),
            ));
        }
        Ok(())
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()> {
        nix::mount::mount(source, target, fstype, flags, data)?;
        Ok(())
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        nix::mount::umount2(target, nix::mount::MntFlags::MNT_DETACH)?;
        Ok(())
    }

    fn chroot(&self, path: &Path) -> io::Result<()> {
        nix::unistd::chroot(path)?;
        Ok(())
    }

    fn chdir(&self, path: &Path) -> io::Result<()> {
        nix::unistd::chdir(path)?;
        Ok(())
    }

    fn set_hostname(&self, name: &str) -> io::Result<()> {
        nix::unistd::sethostname(name)?;
        Ok(())
    }

    fn host_ids(&self) -> (u32, u32) {
        (
            nix::unistd::getuid().as_raw(),
            nix::unistd::getgid().as_raw(),
        )
    }

    #[allow(unsafe_code)]
    fn spawn(&self, stack: &mut [u8], flags: CloneFlags, entry: CloneCb<'_>) -> io::Result<Pid> {
        let sigchld = Signal::SIGCHLD as i32;
        // SAFETY: without CLONE_VM the child runs on a copy of our address
        // space, so `entry` and `stack` stay valid for it; the caller keeps
        // `stack` alive until this returns.
        let pid = unsafe { nix::sched::clone(entry, stack, flags, Some(sigchld)) }?;
        Ok(pid)
    }

    fn signal(&self, pid: Pid, signal: Signal) -> io::Result<()> {
        nix::sys::signal::kill(pid, signal)?;
        Ok(())
    }

    fn read_pipe(&self, pipe: &File, buf: &mut [u8]) -> io::Result<usize> {
        use std::io::Read;

        let mut reader = pipe;
        reader.read(buf)
    }

    fn write_pipe(&self, pipe: &File, buf: &[u8]) -> io::Result<usize> {
        use std::io::Write;

        let mut writer = pipe;
        writer.write(buf)
    }

    fn open_namespace(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn enter_namespace(&self, ns: &File, kind: CloneFlags) -> io::Result<()> {
        nix::sched::setns(ns, kind)?;
        Ok(())
    }

    fn exec(&self, argv: &[String]) -> io::Result<()> {
        use std::ffi::CString;

        let args = argv
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let Some(program) = args.first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty command",
            ));
        };
        match nix::unistd::execvp(program, &args) {
            Ok(never) => match never {},
            Err(errno) => Err(errno.into()),
        }
    }
}
