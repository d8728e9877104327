//! Shared-memory mirror of the GPU append protocol.
//!
//! Every active cell makes exactly one `fetch_add` of its vertex count on
//! the shared counter and owns the returned range outright. Slots are
//! write-once so that a double reservation or an overrun shows up as an
//! error instead of a silent overwrite.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use crate::surface::indirect::DrawIndirectArgs;
use crate::surface::vertex::Vertex;

/// A broken append invariant, observed by the reference executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendError {
    /// A reservation ends past the end of the vertex buffer.
    OutOfCapacity {
        /// Exclusive end of the reservation.
        end: u64,
        /// Buffer capacity in vertices.
        capacity: u32,
    },
    /// A slot was written twice.
    SlotOverwritten {
        /// The slot index.
        slot: u32,
    },
    /// A slot below `vertex_count` was never written.
    MissingVertex {
        /// The slot index.
        slot: u32,
    },
    /// A writer finished before filling its reservation.
    Underfilled {
        /// The reservation.
        reservation: Reservation,
        /// Vertices actually written.
        written: u32,
    },
    /// A writer tried to write past the end of its reservation.
    Overfilled {
        /// The reservation.
        reservation: Reservation,
    },
}

impl fmt::Display for AppendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfCapacity { end, capacity } => write!(
                f,
                "reservation ending at {end} exceeds capacity {capacity}"
            ),
            Self::SlotOverwritten { slot } => {
                write!(f, "slot {slot} written twice")
            }
            Self::MissingVertex { slot } => {
                write!(f, "slot {slot} reserved but never written")
            }
            Self::Underfilled {
                reservation,
                written,
            } => write!(
                f,
                "reservation {:?} received only {written} vertices",
                reservation.range()
            ),
            Self::Overfilled { reservation } => write!(
                f,
                "write past the end of reservation {:?}",
                reservation.range()
            ),
        }
    }
}

impl std::error::Error for AppendError {}

/// The half-open slot range `[base, base + len)` returned by one fetch-add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Counter value before the add.
    pub base: u32,
    /// Number of slots reserved.
    pub len: u32,
}

impl Reservation {
    /// Exclusive end, widened so an overflowing reservation is still
    /// representable.
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.base) + u64::from(self.len)
    }

    /// Slots as a range.
    #[must_use]
    pub fn range(&self) -> Range<u64> {
        u64::from(self.base)..self.end()
    }

    /// Whether two reservations share a slot.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        u64::from(self.base) < other.end() && u64::from(other.base) < self.end()
    }
}

/// The indirect-args record with atomic fields, as the shader sees it.
#[derive(Debug, Default)]
pub struct AtomicDrawArgs {
    vertex_count: AtomicU32,
    instance_count: AtomicU32,
    first_vertex: AtomicU32,
    first_instance: AtomicU32,
}

impl AtomicDrawArgs {
    /// Args holding `args`, e.g. garbage left by a previous frame.
    #[must_use]
    pub fn new(args: DrawIndirectArgs) -> Self {
        let atomic = Self::default();
        atomic.store(args);
        atomic
    }

    /// Overwrite every field.
    pub fn store(&self, args: DrawIndirectArgs) {
        self.vertex_count.store(args.vertex_count, Ordering::Relaxed);
        self.instance_count
            .store(args.instance_count, Ordering::Relaxed);
        self.first_vertex.store(args.first_vertex, Ordering::Relaxed);
        self.first_instance
            .store(args.first_instance, Ordering::Relaxed);
    }

    /// The `init` write: (0, 1, 0, 0).
    pub fn reset(&self) {
        self.store(DrawIndirectArgs::INITIAL);
    }

    /// Reserve `count` slots. Returns `None` without touching the counter
    /// when `count` is zero.
    ///
    /// Only uniqueness of the returned base matters here, so the add is
    /// relaxed; the end of the pass publishes the vertex writes.
    pub fn reserve(&self, count: u32) -> Option<Reservation> {
        if count == 0 {
            return None;
        }
        let base = self.vertex_count.fetch_add(count, Ordering::Relaxed);
        Some(Reservation { base, len: count })
    }

    /// Current field values.
    #[must_use]
    pub fn snapshot(&self) -> DrawIndirectArgs {
        DrawIndirectArgs {
            vertex_count: self.vertex_count.load(Ordering::Acquire),
            instance_count: self.instance_count.load(Ordering::Acquire),
            first_vertex: self.first_vertex.load(Ordering::Acquire),
            first_instance: self.first_instance.load(Ordering::Acquire),
        }
    }
}

/// Fixed-capacity, write-once vertex storage.
#[derive(Debug)]
pub struct VertexSlots {
    slots: Box<[OnceLock<Vertex>]>,
}

impl VertexSlots {
    /// `capacity` empty slots.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Capacity in vertices.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of slots written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }

    /// Empty every slot for the next pass.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            let _ = slot.take();
        }
    }

    /// Write `vertex` into `slot`.
    ///
    /// # Errors
    ///
    /// [`AppendError::OutOfCapacity`] past the end of the buffer,
    /// [`AppendError::SlotOverwritten`] if the slot already holds a vertex.
    pub fn write(&self, slot: u32, vertex: Vertex) -> Result<(), AppendError> {
        let cell = self.slots.get(slot as usize).ok_or(
            AppendError::OutOfCapacity {
                end: u64::from(slot) + 1,
                capacity: self.capacity(),
            },
        )?;
        cell.set(vertex)
            .map_err(|_| AppendError::SlotOverwritten { slot })
    }

    /// Copy out `[0, count)`, checking that every slot was written.
    ///
    /// # Errors
    ///
    /// [`AppendError::OutOfCapacity`] if `count` exceeds the capacity,
    /// [`AppendError::MissingVertex`] for the first unwritten slot.
    pub fn collect(&self, count: u32) -> Result<Vec<Vertex>, AppendError> {
        if count > self.capacity() {
            return Err(AppendError::OutOfCapacity {
                end: u64::from(count),
                capacity: self.capacity(),
            });
        }
        self.slots[..count as usize]
            .iter()
            .enumerate()
            .map(|(slot, v)| {
                v.get().copied().ok_or(AppendError::MissingVertex {
                    slot: slot as u32,
                })
            })
            .collect()
    }
}

/// Writer that owns one reservation and checks it is filled exactly.
#[derive(Debug)]
pub struct ReservedRange<'a> {
    slots: &'a VertexSlots,
    reservation: Reservation,
    written: u32,
}

impl<'a> ReservedRange<'a> {
    /// Take ownership of `reservation` in `slots`. Nothing is written if
    /// the range does not fit.
    ///
    /// # Errors
    ///
    /// [`AppendError::OutOfCapacity`] if the range ends past the buffer.
    pub fn new(
        slots: &'a VertexSlots,
        reservation: Reservation,
    ) -> Result<Self, AppendError> {
        if reservation.end() > u64::from(slots.capacity()) {
            return Err(AppendError::OutOfCapacity {
                end: reservation.end(),
                capacity: slots.capacity(),
            });
        }
        Ok(Self {
            slots,
            reservation,
            written: 0,
        })
    }

    /// Write the next vertex of the range.
    ///
    /// # Errors
    ///
    /// [`AppendError::Overfilled`] once the range is full, or any error
    /// from [`VertexSlots::write`].
    pub fn push(&mut self, vertex: Vertex) -> Result<(), AppendError> {
        if self.written == self.reservation.len {
            return Err(AppendError::Overfilled {
                reservation: self.reservation,
            });
        }
        self.slots
            .write(self.reservation.base + self.written, vertex)?;
        self.written += 1;
        Ok(())
    }

    /// Close the range.
    ///
    /// # Errors
    ///
    /// [`AppendError::Underfilled`] if fewer than `len` vertices were
    /// pushed.
    pub fn finish(self) -> Result<Reservation, AppendError> {
        if self.written != self.reservation.len {
            return Err(AppendError::Underfilled {
                reservation: self.reservation,
                written: self.written,
            });
        }
        Ok(self.reservation)
    }
}
