//! Rolling per-channel sample buffers shared between the read loop and the renderer
//!
//! The store holds one ring buffer per channel behind a single [`RwLock`], so a
//! full row update (one value pushed into every channel) and a snapshot are
//! mutually exclusive. Renderers never see a row that has reached some
//! channels but not others.
//!
//! # Capacity
//!
//! While live data flows in, every channel is bounded to `capacity` samples
//! and the oldest sample is evicted first. A playback load swaps in the full
//! recorded history with [`ChannelBufferStore::replace_unbounded`]; the bound
//! is re-armed by the next [`ChannelBufferStore::clear`].

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default number of samples retained per channel
pub const DEFAULT_CAPACITY: usize = 1000;

/// Shared handle to a buffer store
pub type SharedBufferStore = Arc<ChannelBufferStore>;

#[derive(Debug)]
struct StoreInner {
    buffers: Vec<VecDeque<f64>>,
    /// Rows appended (or loaded) since the last clear
    total_rows: u64,
    /// Whether the capacity bound applies to the current contents
    bounded: bool,
}

/// Bounded rolling buffers, one per channel
#[derive(Debug)]
pub struct ChannelBufferStore {
    names: Vec<String>,
    capacity: usize,
    inner: RwLock<StoreInner>,
}

/// Point-in-time copy of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    /// Channel name
    pub name: String,
    /// Samples, oldest first
    pub values: Vec<f64>,
}

impl ChannelSnapshot {
    /// Most recent sample
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the channel has no samples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Min/max over the snapshot, ignoring NaN
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }
}

/// Consistent view of every channel at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Channels in configured order
    pub channels: Vec<ChannelSnapshot>,
    /// Rows appended since the last clear (including evicted ones)
    pub total_rows: u64,
}

impl Snapshot {
    /// Look up a channel by name
    pub fn channel(&self, name: &str) -> Option<&ChannelSnapshot> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Check if every channel is empty
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|c| c.is_empty())
    }
}

impl ChannelBufferStore {
    /// Create a store for the given channels, each bounded to `capacity` samples
    pub fn new(names: Vec<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffers = names
            .iter()
            .map(|_| VecDeque::with_capacity(capacity))
            .collect();
        Self {
            names,
            capacity,
            inner: RwLock::new(StoreInner {
                buffers,
                total_rows: 0,
                bounded: true,
            }),
        }
    }

    /// Create a shared store
    pub fn shared(names: Vec<String>, capacity: usize) -> SharedBufferStore {
        Arc::new(Self::new(names, capacity))
    }

    /// Channel names in configured order
    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.names.len()
    }

    /// Live-acquisition capacity per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one row, one value per channel
    ///
    /// Returns `false` without touching any buffer if the row width does not
    /// match the channel count.
    pub fn append(&self, values: &[f64]) -> bool {
        if values.len() != self.names.len() {
            tracing::debug!(
                "Rejected row of width {} for {} channels",
                values.len(),
                self.names.len()
            );
            return false;
        }

        let mut inner = self.write();
        let bounded = inner.bounded;
        for (buffer, &value) in inner.buffers.iter_mut().zip(values) {
            buffer.push_back(value);
            if bounded {
                while buffer.len() > self.capacity {
                    buffer.pop_front();
                }
            }
        }
        inner.total_rows += 1;
        true
    }

    /// Copy every channel's contents under one read lock
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.read();
        let channels = self
            .names
            .iter()
            .zip(inner.buffers.iter())
            .map(|(name, buffer)| ChannelSnapshot {
                name: name.clone(),
                values: buffer.iter().copied().collect(),
            })
            .collect();
        Snapshot {
            channels,
            total_rows: inner.total_rows,
        }
    }

    /// Rows appended since the last clear, without copying any data
    pub fn total_rows(&self) -> u64 {
        self.read().total_rows
    }

    /// Current number of samples per channel
    pub fn lengths(&self) -> Vec<usize> {
        self.read().buffers.iter().map(VecDeque::len).collect()
    }

    /// Empty every channel and re-arm the capacity bound
    pub fn clear(&self) {
        let mut inner = self.write();
        for buffer in inner.buffers.iter_mut() {
            buffer.clear();
        }
        inner.total_rows = 0;
        inner.bounded = true;
    }

    /// Replace all contents with fully-parsed playback data
    ///
    /// `columns` is indexed by channel in configured order; channels without a
    /// column end up empty. The capacity bound does not apply until the next
    /// [`clear`](Self::clear).
    pub fn replace_unbounded(&self, columns: Vec<Vec<f64>>) {
        let mut columns = columns.into_iter();
        let mut fresh: Vec<VecDeque<f64>> = Vec::with_capacity(self.names.len());
        for _ in &self.names {
            fresh.push(columns.next().map(VecDeque::from).unwrap_or_default());
        }
        let rows = fresh.iter().map(VecDeque::len).max().unwrap_or(0) as u64;

        let mut inner = self.write();
        inner.buffers = fresh;
        inner.total_rows = rows;
        inner.bounded = false;
    }

    /// Whether the capacity bound currently applies
    pub fn is_bounded(&self) -> bool {
        self.read().bounded
    }
}
