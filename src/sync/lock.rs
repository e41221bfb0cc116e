//! Reentrant read/write lock with write→read downgrade.
//!
//! Every scene node owns exactly one [`SceneLock`]. The lock is a monitor
//! (a `parking_lot` mutex guarding the counters plus a condition variable)
//! rather than a wrapper around a data-carrying `RwLock`, because nodes need
//! three things standard locks do not offer together:
//!
//! - a writer may re-enter the write role and may also take the read role;
//! - a reader thread may re-enter the read role while a writer is waiting;
//! - the outermost writer can switch to the read role without the lock ever
//!   being free in between, so that change notifications run against the
//!   state the writer produced.
//!
//! The downgrade is one-way. A thread that holds the read role and asks for
//! the write role would wait for itself forever; when that thread is the
//! writer that just downgraded (the typical case: a listener mutating the node
//! that notified it) the request fails with [`SceneError::IllegalState`]
//! instead.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::errors::{Result, SceneError};

#[derive(Debug, Default)]
struct LockState {
    writer: Option<ThreadId>,
    write_nest: u32,
    /// Reads taken by the current writer on top of its write role.
    writer_read_nest: u32,
    /// Reads held by threads that do not hold the write role.
    read_nest: u32,
    last_writer: Option<ThreadId>,
    last_writer_read_nest: u32,
}

/// Reentrant read/write lock owned by a single node.
#[derive(Debug, Default)]
pub struct SceneLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl SceneLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Read role
    // ========================================================================

    /// Acquires the read role, blocking while another thread writes.
    pub fn read_lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer == Some(me) {
            state.writer_read_nest += 1;
            return;
        }
        while state.write_nest != 0 {
            self.released.wait(&mut state);
        }
        state.read_nest += 1;
        if state.last_writer == Some(me) {
            state.last_writer_read_nest += 1;
        }
    }

    /// Releases one level of the read role.
    pub fn read_unlock(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.writer {
            Some(writer) if writer == me => {
                if state.writer_read_nest == 0 {
                    return Err(SceneError::IllegalState(
                        "read_unlock without matching read_lock".into(),
                    ));
                }
                state.writer_read_nest -= 1;
                return Ok(());
            }
            Some(_) => {
                return Err(SceneError::IllegalState(
                    "read_unlock while another thread holds the write lock".into(),
                ));
            }
            None => {}
        }

        if state.read_nest == 0 {
            return Err(SceneError::IllegalState(
                "read_unlock without matching read_lock".into(),
            ));
        }
        state.read_nest -= 1;
        if state.last_writer == Some(me) && state.last_writer_read_nest > 0 {
            state.last_writer_read_nest -= 1;
        }
        if state.read_nest == 0 {
            state.last_writer = None;
            state.last_writer_read_nest = 0;
            self.released.notify_all();
        }
        Ok(())
    }

    // ========================================================================
    // Write role
    // ========================================================================

    /// Acquires the write role, blocking until no other thread reads or
    /// writes.
    ///
    /// Fails when the calling thread still holds reads it obtained by
    /// downgrading: upgrading back to the write role is not supported.
    pub fn write_lock(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer == Some(me) {
            state.write_nest += 1;
            return Ok(());
        }
        if state.last_writer == Some(me) && state.last_writer_read_nest > 0 {
            return Err(SceneError::IllegalState(
                "switching from read back to write lock is not supported".into(),
            ));
        }
        while state.write_nest != 0 || state.read_nest != 0 {
            self.released.wait(&mut state);
        }
        state.writer = Some(me);
        state.write_nest = 1;
        Ok(())
    }

    /// Releases one level of the write role.
    ///
    /// Reads the writer took on top of its write role survive the final
    /// release as ordinary read holds.
    pub fn write_unlock(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer != Some(me) || state.write_nest == 0 {
            return Err(SceneError::IllegalState(
                "write_unlock by a thread that does not hold the write lock".into(),
            ));
        }
        state.write_nest -= 1;
        if state.write_nest == 0 {
            state.writer = None;
            state.read_nest += state.writer_read_nest;
            state.writer_read_nest = 0;
            self.released.notify_all();
        }
        Ok(())
    }

    // ========================================================================
    // Downgrade
    // ========================================================================

    /// Returns `true` when the calling thread holds exactly one level of the
    /// write role and no reads.
    #[must_use]
    pub fn can_switch_to_read(&self) -> bool {
        let me = thread::current().id();
        let state = self.state.lock();
        state.writer == Some(me) && state.write_nest == 1 && state.writer_read_nest == 0
    }

    /// Atomically trades the write role for a single read hold.
    pub fn switch_to_read_lock(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if !(state.writer == Some(me) && state.write_nest == 1 && state.writer_read_nest == 0) {
            return Err(SceneError::IllegalState(format!(
                "cannot switch to read lock (write nest {}, reads {})",
                state.write_nest, state.writer_read_nest
            )));
        }
        state.last_writer = Some(me);
        state.write_nest = 0;
        state.writer = None;
        state.read_nest += 1;
        state.last_writer_read_nest += 1;
        self.released.notify_all();
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns `true` while any thread holds the write role.
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().write_nest != 0
    }

    /// Returns `true` when the calling thread holds the write role.
    #[must_use]
    pub fn is_write_locked_by_current_thread(&self) -> bool {
        self.state.lock().writer == Some(thread::current().id())
    }

    /// Number of read holds, including those a writer took on top of its
    /// write role.
    #[must_use]
    pub fn read_count(&self) -> u32 {
        let state = self.state.lock();
        state.read_nest + state.writer_read_nest
    }

    /// Current write nesting depth.
    #[must_use]
    pub fn write_depth(&self) -> u32 {
        self.state.lock().write_nest
    }

    // ========================================================================
    // RAII
    // ========================================================================

    /// Acquires the read role for the lifetime of the returned guard.
    pub fn read(&self) -> SceneReadGuard<'_> {
        self.read_lock();
        SceneReadGuard { lock: self }
    }

    /// Acquires the write role for the lifetime of the returned guard.
    pub fn write(&self) -> Result<SceneWriteGuard<'_>> {
        self.write_lock()?;
        Ok(SceneWriteGuard { lock: self })
    }
}

/// Read role held until dropped.
#[derive(Debug)]
#[must_use = "the read role is released immediately if the guard is not held"]
pub struct SceneReadGuard<'a> {
    lock: &'a SceneLock,
}

impl Drop for SceneReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.read_unlock() {
            log::error!("Failed to release read guard: {err}");
        }
    }
}

/// Write role held until dropped.
#[derive(Debug)]
#[must_use = "the write role is released immediately if the guard is not held"]
pub struct SceneWriteGuard<'a> {
    lock: &'a SceneLock,
}

impl<'a> SceneWriteGuard<'a> {
    /// Trades the write role for a read role without letting another writer
    /// in. Gives the guard back unchanged if the lock cannot switch (nested
    /// write or reads held on top).
    pub fn downgrade(self) -> std::result::Result<SceneReadGuard<'a>, Self> {
        if self.lock.switch_to_read_lock().is_err() {
            return Err(self);
        }
        let lock = self.lock;
        std::mem::forget(self);
        Ok(SceneReadGuard { lock })
    }
}

impl Drop for SceneWriteGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.write_unlock() {
            log::error!("Failed to release write guard: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_write_reentrancy_fully_releases() {
        let lock = SceneLock::new();
        for depth in 1..=5 {
            for _ in 0..depth {
                lock.write_lock().unwrap();
            }
            assert_eq!(lock.write_depth(), depth);
            for _ in 0..depth {
                lock.write_unlock().unwrap();
            }
            assert!(!lock.is_write_locked());
            assert_eq!(lock.read_count(), 0);
        }
    }

    #[test]
    fn test_writer_may_read() {
        let lock = SceneLock::new();
        lock.write_lock().unwrap();
        lock.read_lock();
        assert!(!lock.can_switch_to_read());
        lock.read_unlock().unwrap();
        assert!(lock.can_switch_to_read());
        lock.write_unlock().unwrap();
    }

    #[test]
    fn test_unbalanced_unlocks_are_rejected() {
        let lock = SceneLock::new();
        assert!(matches!(lock.read_unlock(), Err(SceneError::IllegalState(_))));
        assert!(matches!(lock.write_unlock(), Err(SceneError::IllegalState(_))));

        lock.read_lock();
        lock.read_unlock().unwrap();
        assert!(lock.read_unlock().is_err());
    }

    #[test]
    fn test_switch_requires_single_write_level() {
        let lock = SceneLock::new();
        assert!(lock.switch_to_read_lock().is_err());

        lock.write_lock().unwrap();
        lock.write_lock().unwrap();
        assert!(!lock.can_switch_to_read());
        assert!(lock.switch_to_read_lock().is_err());
        lock.write_unlock().unwrap();

        lock.switch_to_read_lock().unwrap();
        assert!(!lock.is_write_locked());
        assert_eq!(lock.read_count(), 1);
        lock.read_unlock().unwrap();
        assert_eq!(lock.read_count(), 0);
    }

    #[test]
    fn test_upgrade_after_downgrade_is_rejected() {
        let lock = SceneLock::new();
        lock.write_lock().unwrap();
        lock.switch_to_read_lock().unwrap();
        assert!(matches!(lock.write_lock(), Err(SceneError::IllegalState(_))));
        lock.read_unlock().unwrap();

        // Fully released: writing is possible again.
        lock.write_lock().unwrap();
        lock.write_unlock().unwrap();
    }

    #[test]
    fn test_reads_taken_by_writer_survive_write_unlock() {
        let lock = SceneLock::new();
        lock.write_lock().unwrap();
        lock.read_lock();
        lock.write_unlock().unwrap();
        assert!(!lock.is_write_locked());
        assert_eq!(lock.read_count(), 1);
        lock.read_unlock().unwrap();
        assert_eq!(lock.read_count(), 0);
    }

    #[test]
    fn test_foreign_read_unlock_while_writing_fails() {
        let lock = Arc::new(SceneLock::new());
        lock.write_lock().unwrap();
        let other = Arc::clone(&lock);
        let result = std::thread::spawn(move || other.read_unlock()).join().unwrap();
        assert!(matches!(result, Err(SceneError::IllegalState(_))));
        lock.write_unlock().unwrap();
    }

    #[test]
    fn test_downgrade_blocks_writers_until_read_released() {
        let lock = Arc::new(SceneLock::new());
        let guard = lock.write().unwrap();
        let read = guard.downgrade().unwrap();

        let acquired = Arc::new(AtomicBool::new(false));
        let handle = {
            let lock = Arc::clone(&lock);
            let acquired = Arc::clone(&acquired);
            std::thread::spawn(move || {
                let _write = lock.write().unwrap();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(read);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_partial_write_release_keeps_other_threads_out() {
        let lock = Arc::new(SceneLock::new());
        lock.write_lock().unwrap();
        lock.write_lock().unwrap();
        lock.write_unlock().unwrap();
        assert_eq!(lock.write_depth(), 1);

        let read_entered = Arc::new(AtomicBool::new(false));
        let write_entered = Arc::new(AtomicBool::new(false));
        let reader = {
            let lock = Arc::clone(&lock);
            let entered = Arc::clone(&read_entered);
            thread::spawn(move || {
                lock.read_lock();
                entered.store(true, Ordering::SeqCst);
                lock.read_unlock().unwrap();
            })
        };
        let writer = {
            let lock = Arc::clone(&lock);
            let entered = Arc::clone(&write_entered);
            thread::spawn(move || {
                lock.write_lock().unwrap();
                entered.store(true, Ordering::SeqCst);
                lock.write_unlock().unwrap();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!read_entered.load(Ordering::SeqCst));
        assert!(!write_entered.load(Ordering::SeqCst));

        lock.write_unlock().unwrap();
        reader.join().unwrap();
        writer.join().unwrap();
        assert!(read_entered.load(Ordering::SeqCst));
        assert!(write_entered.load(Ordering::SeqCst));
        assert!(!lock.is_write_locked());
        assert_eq!(lock.read_count(), 0);
    }

    #[test]
    fn test_nested_write_guard_cannot_downgrade() {
        let lock = SceneLock::new();
        let outer = lock.write().unwrap();
        let inner = lock.write().unwrap();
        let inner = inner.downgrade().unwrap_err();
        drop(inner);
        let read = outer.downgrade().unwrap();
        drop(read);
        assert_eq!(lock.read_count(), 0);
        assert!(!lock.is_write_locked());
    }
}
