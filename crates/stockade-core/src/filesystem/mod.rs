//! Filesystem management for container isolation.
//!
//! Provides the overlay root, mount-propagation and `/proc` setup inside the
//! new mount namespace, and the `chroot` switch shared by init and join.

pub mod mount;
pub mod overlayfs;
pub mod root;
