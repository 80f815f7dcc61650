//! Fixed-capacity sliding window of recent loudness readings.
//!
//! [`VolumeHistory`] keeps the last `capacity` RMS values, oldest evicted
//! first.  The trigger decision does **not** read it — it exists purely as
//! an observable side-channel and headroom for future smoothing, so its
//! FIFO behaviour is pinned down by tests.

// ---------------------------------------------------------------------------
// VolumeHistory
// ---------------------------------------------------------------------------

/// Bounded FIFO of the most recent loudness readings.
///
/// # Example
///
/// ```rust
/// use strum_click::audio::VolumeHistory;
///
/// let mut h = VolumeHistory::new(3);
/// for v in [0.1, 0.2, 0.3, 0.4] {
///     h.push(v);
/// }
/// assert_eq!(h.snapshot(), vec![0.2, 0.3, 0.4]); // 0.1 was evicted
/// ```
#[derive(Debug, Clone)]
pub struct VolumeHistory {
    buf: Vec<f32>,
    capacity: usize,
    /// Index of the next write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid readings currently stored (≤ `capacity`).
    len: usize,
}

impl VolumeHistory {
    /// Create a history holding at most `capacity` readings.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "VolumeHistory capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append one reading, evicting the oldest when full.
    pub fn push(&mut self, volume: f32) {
        self.buf[self.write_pos] = volume;
        self.write_pos = (self.write_pos + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Copy of the stored readings in chronological order (oldest first).
    pub fn snapshot(&self) -> Vec<f32> {
        // Before the first wrap valid data starts at 0; once full, the
        // oldest reading sits at `write_pos`.
        let read_pos = if self.len < self.capacity {
            0
        } else {
            self.write_pos
        };

        (0..self.len)
            .map(|i| self.buf[(read_pos + i) % self.capacity])
            .collect()
    }

    /// Most recent reading, if any.
    pub fn latest(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.write_pos + self.capacity - 1) % self.capacity;
        Some(self.buf[idx])
    }

    /// Discard all readings.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of readings currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no readings are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of readings the window can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
