use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// A double-buffered, version-counted block of bits shared between one
/// writer and any number of readers, with no locks on either side.
///
/// The writer always fills the buffer that is not currently designated
/// current, then advances the current index and the version counter. A
/// reader snapshots the version, copies the current buffer, and re-checks
/// the version: if it moved, a write raced the copy and the reader retries.
/// Readers therefore always observe a complete publication, though possibly
/// a stale one.
pub struct SharedValues {
    buffers: [Box<[AtomicU8]>; 2],
    current: AtomicUsize,
    version: AtomicU64,
}

impl std::fmt::Debug for SharedValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedValues(len={}, version={})", self.len(), self.version())
    }
}

impl SharedValues {
    pub fn new(len: usize) -> SharedValues {
        let buffer = || (0..len).map(|_| AtomicU8::new(0)).collect::<Box<[AtomicU8]>>();
        SharedValues {
            buffers: [buffer(), buffer()],
            current: AtomicUsize::new(0),
            version: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Publish a new set of values. Single writer only. Returns the version
    /// that now designates this publication.
    pub fn publish(&self, values: &[bool]) -> u64 {
        let next = self.current.load(Ordering::Relaxed) ^ 1;
        for (slot, &value) in self.buffers[next].iter().zip(values.iter()) {
            slot.store(value as u8, Ordering::Relaxed);
        }
        self.current.store(next, Ordering::Release);
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Copy the most recent complete publication into `out` and return its
    /// version. Never blocks; retries if a write lands mid-copy.
    pub fn read_into(&self, out: &mut Vec<bool>) -> u64 {
        loop {
            let version = self.version.load(Ordering::Acquire);
            let current = self.current.load(Ordering::Acquire);
            out.clear();
            out.extend(self.buffers[current].iter().map(|slot| slot.load(Ordering::Relaxed) != 0));
            if self.version.load(Ordering::Acquire) == version {
                return version;
            }
        }
    }

    pub fn snapshot(&self) -> (Vec<bool>, u64) {
        let mut values = Vec::with_capacity(self.len());
        let version = self.read_into(&mut values);
        (values, version)
    }

    /// Zero both buffers and return the version counter to its initial
    /// value. Writer-side only, between runs.
    pub(crate) fn reset(&self) {
        for buffer in &self.buffers {
            for slot in buffer.iter() {
                slot.store(0, Ordering::Relaxed);
            }
        }
        self.current.store(0, Ordering::Release);
        self.version.store(0, Ordering::Release);
    }
}
