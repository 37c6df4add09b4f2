// This module implements the bump-pointer arena that backs every compilation unit.
// An Arena hands out aligned allocations from granule-sized chunks obtained from the
// global allocator and releases everything in one shot when the arena is dropped.
// The cursor (`pos`) and capacity are cumulative byte counts over all chunks, so the
// cursor only ever moves forward for the lifetime of the arena and expansion appends
// a fresh chunk without moving prior allocations — outstanding references stay valid.
// Chunk sizes are always multiples of DEFAULT_GRANULE and the total capacity is capped
// at MAX_ARENA_SIZE; a request that would push past the cap is a fatal condition, as
// is failure to obtain a chunk from the underlying allocator. Arenas hold working
// memory for exactly one compilation unit on one thread and are never shared, which is
// why the interior state uses plain Cells and no locking.

//! Arena allocation for compilation units.
//!
//! Passes and analyses allocate many short-lived objects that all die together
//! when the compilation unit finishes. The arena serves those allocations from
//! a bump cursor and frees the whole batch at teardown; individual allocations
//! are never released and `Drop` of arena-placed values never runs.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::cell::{Cell, RefCell};
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

/// Chunk sizes and the overall capacity are rounded to this many bytes.
pub const DEFAULT_GRANULE: usize = 4096;

/// Hard cap on the total capacity of one arena.
pub const MAX_ARENA_SIZE: usize = 1 << 30;

fn round_up(value: usize, to: usize) -> usize {
    debug_assert!(to.is_power_of_two());
    value
        .checked_add(to - 1)
        .unwrap_or_else(|| panic!("arena: allocation size {value} overflows"))
        & !(to - 1)
}

/// One backing region obtained from the global allocator.
///
/// Chunk bases are granule-aligned, so aligning the in-chunk cursor is enough
/// to satisfy any supported allocation alignment.
struct Chunk {
    base: NonNull<u8>,
    capacity: usize,
    used: usize,
}

/// Bump-pointer memory region serving many same-lifetime allocations.
///
/// The arena is single-threaded by construction: it is neither `Send` nor
/// `Sync`, matching its role as per-unit working memory that is never
/// contended.
pub struct Arena {
    chunks: RefCell<Vec<Chunk>>,
    /// Cumulative bytes reserved, including alignment padding and the unused
    /// tails of retired chunks. Monotone for the arena's whole life.
    pos: Cell<usize>,
    /// Cumulative capacity over all chunks.
    capacity: Cell<usize>,
}

impl Arena {
    /// Create an arena with one granule of capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_GRANULE)
    }

    /// Create an arena whose first chunk holds at least `bytes` bytes.
    ///
    /// The request is rounded up to [`DEFAULT_GRANULE`]. A rounded size above
    /// [`MAX_ARENA_SIZE`] is fatal, as is failure of the underlying allocator.
    pub fn with_capacity(bytes: usize) -> Self {
        let arena = Self {
            chunks: RefCell::new(Vec::new()),
            pos: Cell::new(0),
            capacity: Cell::new(0),
        };
        arena.grow(bytes.max(1));
        arena
    }

    /// Bytes reserved so far. Never decreases and never exceeds `capacity`.
    pub fn pos(&self) -> usize {
        self.pos.get()
    }

    /// Total capacity across all chunks. Always a multiple of the granule.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of backing chunks. Starts at one and grows with expansion.
    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }

    /// Reserve `round_up(bytes, align)` bytes at an `align`-aligned address.
    ///
    /// `align` must be a nonzero power of two no larger than the granule.
    /// When the active chunk cannot fit the request the arena expands by a
    /// fresh chunk at least as large as the previous one; expansion past
    /// [`MAX_ARENA_SIZE`] is fatal. The returned pointer stays valid until the
    /// arena itself is dropped.
    pub fn allocate_aligned(&self, bytes: usize, align: usize) -> NonNull<u8> {
        assert!(
            align.is_power_of_two() && align <= DEFAULT_GRANULE,
            "arena: unsupported alignment {align} (power of two <= {DEFAULT_GRANULE} required)",
        );
        let size = round_up(bytes, align);

        let mut chunks = self.chunks.borrow_mut();
        let active = chunks.last().expect("arena: missing backing chunk");
        if round_up(active.used, align) + size > active.capacity {
            let grow_target = size.max(active.capacity);
            // Retire the tail of the active chunk; pos stays cumulative.
            let active = chunks.last_mut().expect("arena: missing backing chunk");
            let tail = active.capacity - active.used;
            active.used = active.capacity;
            drop(chunks);
            self.pos.set(self.pos.get() + tail);
            self.grow(grow_target);
            chunks = self.chunks.borrow_mut();
        }

        let chunk = chunks.last_mut().expect("arena: missing backing chunk");
        let aligned = round_up(chunk.used, align);
        let padding = aligned - chunk.used;
        // In bounds: `aligned + size <= capacity` was checked above, and a
        // fresh chunk is sized to fit `size` outright.
        let ptr = unsafe { NonNull::new_unchecked(chunk.base.as_ptr().add(aligned)) };
        chunk.used = aligned + size;
        self.pos.set(self.pos.get() + padding + size);
        debug_assert!(self.pos.get() <= self.capacity.get());
        ptr
    }

    /// Typed raw allocation: room for `count` values of `T`.
    ///
    /// Sugar for `allocate_aligned(count * size_of::<T>(), align_of::<T>())`.
    /// The storage is uninitialized.
    pub fn allocate<T>(&self, count: usize) -> NonNull<T> {
        let bytes = mem::size_of::<T>()
            .checked_mul(count)
            .unwrap_or_else(|| panic!("arena: allocation of {count} values overflows"));
        self.allocate_aligned(bytes, mem::align_of::<T>()).cast()
    }

    /// Move `value` into the arena. `Drop` of `T` will never run.
    pub fn alloc<T>(&self, value: T) -> &mut T {
        let ptr = self.allocate::<T>(1);
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Copy a slice into the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> &mut [T] {
        let ptr = self
            .allocate_aligned(mem::size_of_val(src), mem::align_of::<T>())
            .cast::<T>();
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            slice::from_raw_parts_mut(ptr.as_ptr(), src.len())
        }
    }

    /// Copy a string into the arena.
    pub fn alloc_str(&self, src: &str) -> &str {
        let bytes = self.alloc_slice_copy(src.as_bytes());
        unsafe { std::str::from_utf8_unchecked(bytes) }
    }

    /// Append a chunk holding at least `min_bytes` bytes.
    fn grow(&self, min_bytes: usize) {
        let chunk_size = round_up(min_bytes, DEFAULT_GRANULE);
        let total = self.capacity.get() + chunk_size;
        if total > MAX_ARENA_SIZE {
            panic!(
                "arena: backing capacity of {total} bytes exceeds the maximum arena size of \
                 {MAX_ARENA_SIZE} bytes",
            );
        }

        let layout = Layout::from_size_align(chunk_size, DEFAULT_GRANULE)
            .unwrap_or_else(|_| panic!("arena: invalid chunk layout for {chunk_size} bytes"));
        let raw = unsafe { alloc(layout) };
        let Some(base) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };

        if self.chunks.borrow().len() > 0 {
            log::debug!(
                "arena: expanded by {chunk_size} bytes to {total} bytes total",
            );
        }
        self.chunks.borrow_mut().push(Chunk {
            base,
            capacity: chunk_size,
            used: 0,
        });
        self.capacity.set(total);
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        for chunk in self.chunks.borrow_mut().drain(..) {
            // Mirrors the layout used in `grow`.
            let layout =
                unsafe { Layout::from_size_align_unchecked(chunk.capacity, DEFAULT_GRANULE) };
            unsafe { dealloc(chunk.base.as_ptr(), layout) };
        }
    }
}
