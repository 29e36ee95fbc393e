//! FUSE filesystem implementation.
//!
//! Implements `fuser::Filesystem` for the kfetch node. Namespace queries are
//! answered by [`NodeLayout`]; `open`, `read`, `write` and `release` on the
//! node are forwarded to the [`Channel`].

use std::{
    ffi::{c_int, OsStr},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use fuser::{
    Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use kfetch_core::domain::SessionHandle;
use kfetch_core::usecases::Channel;
use tracing::{debug, info, warn};

use crate::{error::FuseError, node::NodeLayout};

/// TTL for FUSE attribute caching.
const TTL: Duration = Duration::from_secs(1);

/// FUSE open flag that bypasses the page cache.
///
/// Every `read(2)` on the node must reach the channel and render a fresh
/// report.
const FOPEN_DIRECT_IO: u32 = 1 << 0;

/// The mounted kfetch filesystem.
pub struct KfetchFs {
    channel: Channel,
    layout: NodeLayout,
    /// Sessions of currently open node handles, keyed by FUSE file handle
    sessions: DashMap<u64, SessionHandle>,
    /// Counter for allocating unique file handles
    next_fh: AtomicU64,
}

impl KfetchFs {
    pub fn new(channel: Channel, layout: NodeLayout) -> Self {
        Self {
            channel,
            layout,
            sessions: DashMap::new(),
            next_fh: AtomicU64::new(1),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Number of node handles currently open
    pub fn open_handles(&self) -> usize {
        self.sessions.len()
    }

    /// Allocates a new unique file handle.
    pub fn alloc_fh(&self) -> u64 {
        self.next_fh.fetch_add(1, Ordering::SeqCst)
    }

    /// Acquires the channel for a new open of inode `ino`.
    ///
    /// Returns the file handle the session is stored under.
    pub fn open_node(&self, ino: u64) -> Result<u64, FuseError> {
        self.layout.require_node(ino)?;
        let session = self.channel.open()?;
        let fh = self.alloc_fh();
        debug!(fh, session = session.id(), "Node opened");
        self.sessions.insert(fh, session);
        Ok(fh)
    }

    /// Renders one report for handle `fh` into a buffer of `size` bytes.
    pub fn read_node(&self, fh: u64, size: u32) -> Result<Vec<u8>, FuseError> {
        let session = self.sessions.get(&fh).ok_or(FuseError::BadHandle(fh))?;
        let mut buf = vec![0u8; size as usize];
        let n = self.channel.read_into(session.value(), &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Forwards written bytes for handle `fh` to the channel as a new mask.
    pub fn write_node(&self, fh: u64, data: &[u8]) -> Result<u32, FuseError> {
        let session = self.sessions.get(&fh).ok_or(FuseError::BadHandle(fh))?;
        let accepted = self.channel.write(session.value(), data)?;
        Ok(u32::try_from(accepted).unwrap_or(u32::MAX))
    }

    /// Drops the session stored under `fh`, freeing the channel.
    ///
    /// Called from `flush`, which the kernel sends synchronously from
    /// `close(2)`, and again from `release`. Returns false if no session was
    /// stored under `fh`, which is the normal case for a `release` that
    /// follows a `flush`.
    pub fn release_node(&self, fh: u64) -> bool {
        match self.sessions.remove(&fh) {
            Some((_, session)) => {
                if let Err(e) = self.channel.close(session) {
                    warn!(fh, "close: {}", e);
                }
                true
            }
            None => false,
        }
    }
}

impl Filesystem for KfetchFs {
    #[tracing::instrument(level = "info", skip(self, _req, _config))]
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!(node = self.layout.node_name(), "kfetch filesystem initialized");
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self))]
    fn destroy(&mut self) {
        let open = self.sessions.len();
        if open > 0 {
            warn!(open, "Dropping sessions still open at unmount");
        }
        self.sessions.clear();
        info!("kfetch filesystem destroyed");
    }

    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(parent, name = ?name))]
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.layout.lookup(parent, name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => {
                debug!("lookup: {}", e);
                reply.error(e.into());
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino))]
    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.layout.attr(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.into()),
        }
    }

    /// Accepts truncation of the node so `>` redirection works; nothing is
    /// stored, so the attributes never change.
    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino, size))]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.layout.attr(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.into()),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino, offset))]
    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if let Err(e) = self.layout.require_root(ino) {
            reply.error(e.into());
            return;
        }

        let skip = usize::try_from(offset).unwrap_or(0);
        let entries = self.layout.root_entries();
        for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            // The offset handed back is that of the next entry.
            if reply.add(entry_ino.get(), (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino))]
    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.layout.require_root(ino) {
            Ok(()) => reply.opened(self.alloc_fh(), 0),
            Err(e) => reply.error(e.into()),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino, flags))]
    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.open_node(ino) {
            Ok(fh) => reply.opened(fh, FOPEN_DIRECT_IO),
            Err(e) => {
                debug!("open: {}", e);
                reply.error(e.into());
            }
        }
    }

    /// Offset is ignored: every read renders a complete report.
    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino, fh, offset, size))]
    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_node(fh, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                warn!("read: {}", e);
                reply.error(e.into());
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, _req, data, reply), fields(ino, fh, size = data.len()))]
    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.write_node(fh, data) {
            Ok(written) => reply.written(written),
            Err(e) => {
                warn!("write: {}", e);
                reply.error(e.into());
            }
        }
    }

    /// Ends the session on the first `close(2)` of the handle, so the next
    /// `open(2)` never races the asynchronous `release`. Descriptors
    /// duplicated from one open share its session and lose it together.
    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino, fh))]
    fn flush(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        if self.release_node(fh) {
            debug!(fh, "Session ended at flush");
        }
        reply.ok();
    }

    #[tracing::instrument(level = "debug", skip(self, _req, reply), fields(ino, fh))]
    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        if self.release_node(fh) {
            debug!(fh, "Session ended at release");
        }
        reply.ok();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use kfetch_core::config::ChannelConfig;
    use kfetch_core::ports::{CpuCounts, IFactsProvider, MemoryUsage};

    use super::*;

    struct StubFacts;

    impl IFactsProvider for StubFacts {
        fn kernel_release(&self) -> Result<String> {
            Ok("6.8.0".into())
        }
        fn hostname(&self) -> Result<String> {
            Ok("fusebox".into())
        }
        fn cpu_model(&self) -> Result<String> {
            Ok("Test CPU".into())
        }
        fn cpu_counts(&self) -> Result<CpuCounts> {
            Ok(CpuCounts { online: 1, total: 1 })
        }
        fn memory_mb(&self) -> Result<MemoryUsage> {
            Ok(MemoryUsage {
                free_mb: 1,
                total_mb: 2,
            })
        }
        fn process_count(&self) -> Result<u64> {
            Ok(1)
        }
        fn uptime_minutes(&self) -> Result<u64> {
            Ok(0)
        }
    }

    fn fs() -> KfetchFs {
        let channel = Channel::new(Arc::new(StubFacts), &ChannelConfig::default());
        KfetchFs::new(channel, NodeLayout::with_owner("kfetch", 0, 0))
    }

    #[test]
    fn test_alloc_fh_is_unique() {
        let fs = fs();
        let a = fs.alloc_fh();
        let b = fs.alloc_fh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_second_open_is_busy_until_release() {
        let fs = fs();
        let fh = fs.open_node(2).unwrap();
        assert!(matches!(fs.open_node(2), Err(FuseError::Busy)));
        assert_eq!(fs.open_handles(), 1);

        assert!(fs.release_node(fh));
        assert!(!fs.release_node(fh));
        assert!(fs.open_node(2).is_ok());
    }

    #[test]
    fn test_flush_frees_channel_before_release() {
        let fs = fs();
        let fh = fs.open_node(2).unwrap();

        // close(2) flushes synchronously; the kernel's release comes later.
        assert!(fs.release_node(fh));
        assert_eq!(fs.open_handles(), 0);
        assert_eq!(fs.channel().sessions().ref_count(), 0);

        let next = fs.open_node(2).unwrap();
        assert_ne!(next, fh);

        // The late release of the first handle must not end the new session.
        assert!(!fs.release_node(fh));
        assert_eq!(fs.open_handles(), 1);
        assert!(matches!(fs.open_node(2), Err(FuseError::Busy)));
        assert!(fs.read_node(next, 4096).is_ok());
    }

    #[test]
    fn test_flushed_handle_is_no_longer_readable() {
        let fs = fs();
        let fh = fs.open_node(2).unwrap();
        assert!(fs.release_node(fh));
        assert!(matches!(fs.read_node(fh, 4096), Err(FuseError::BadHandle(_))));
    }

    #[test]
    fn test_open_root_is_rejected() {
        let fs = fs();
        assert!(matches!(fs.open_node(1), Err(FuseError::IsADirectory(_))));
        assert_eq!(fs.channel().sessions().ref_count(), 0);
    }

    #[test]
    fn test_write_then_read_through_handle() {
        let fs = fs();
        let fh = fs.open_node(2).unwrap();

        assert_eq!(fs.write_node(fh, &1i32.to_ne_bytes()).unwrap(), 0);
        let data = fs.read_node(fh, 4096).unwrap();

        assert_eq!(data.last(), Some(&0));
        let text = std::str::from_utf8(&data[..data.len() - 1]).unwrap();
        assert!(text.starts_with("                    fusebox\n"));
        assert!(text.contains("Kernel:\t6.8.0"));
        assert!(!text.contains("CPU:"));
    }

    #[test]
    fn test_short_write_and_small_read_fault() {
        let fs = fs();
        let fh = fs.open_node(2).unwrap();
        assert!(matches!(fs.write_node(fh, b"ab"), Err(FuseError::Fault(_))));
        assert!(matches!(fs.read_node(fh, 16), Err(FuseError::Fault(_))));
    }

    #[test]
    fn test_unknown_handle() {
        let fs = fs();
        assert!(matches!(fs.read_node(42, 4096), Err(FuseError::BadHandle(42))));
        assert!(matches!(fs.write_node(42, &[0; 4]), Err(FuseError::BadHandle(42))));
    }
}
