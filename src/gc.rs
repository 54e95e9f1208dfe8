//! Mark-and-sweep garbage collection system.
//!
//! Objects live in an arena of reference-counted `GcBox` slots. Guards are the
//! only roots: the mark phase walks `Traceable` edges outward from guarded
//! objects, and the sweep phase resets and pools everything it did not reach.
//! Because edges between objects never count as roots, reference cycles are
//! reclaimed as soon as no guard can reach them.

use crate::prelude::*;

// ============================================================================
// ChunkBitmask - 256-bit bitmask for marking objects within a chunk
// ============================================================================

/// 256-bit bitmask for marking objects within a chunk.
/// Each bit corresponds to an index in the chunk (0-255).
#[derive(Clone, Copy, Default)]
struct ChunkBitmask {
    /// 4 × u64 = 256 bits
    bits: [u64; 4],
}

impl ChunkBitmask {
    #[inline]
    fn set(&mut self, index: usize) {
        if let Some(word) = self.bits.get_mut(index >> 6) {
            *word |= 1 << (index & 63);
        }
    }

    #[inline]
    fn get(&self, index: usize) -> bool {
        self.bits
            .get(index >> 6)
            .is_some_and(|word| word & (1 << (index & 63)) != 0)
    }

    #[inline]
    fn clear(&mut self) {
        self.bits = [0; 4];
    }

    /// Indices below `len` whose bit is clear
    fn iter_unmarked(&self, len: usize) -> impl Iterator<Item = usize> + '_ {
        (0..len.min(CHUNK_CAPACITY)).filter(move |index| !self.get(*index))
    }
}

/// Chunk capacity: objects per mark bitmask
const CHUNK_CAPACITY: usize = 256;

/// Default threshold: collect after this many net allocations
pub const DEFAULT_GC_THRESHOLD: usize = 100;

// ============================================================================
// Traceable / Reset traits
// ============================================================================

/// Trait for types that can be traced by the garbage collector.
///
/// Every `Gc<Self>` an object holds must be reported through `visitor.visit()`.
/// An edge that is not reported is invisible to the collector: the target may
/// be swept while the holder still points at it.
pub trait Traceable: Sized + Default + Reset {
    fn trace(&self, visitor: &mut Visitor<'_, Self>);
}

/// Trait for types that can be reset to a clean state for pooling.
///
/// Sweeping calls `reset()` on every unreachable object. Dropping the object's
/// outgoing `Gc` handles here is what breaks reference cycles.
pub trait Reset: Default {
    fn reset(&mut self);
}

// ============================================================================
// GcBox - the internal storage for GC-managed objects
// ============================================================================

/// Internal storage for a GC-managed object.
pub struct GcBox<T: Traceable> {
    /// Slot index in the space (also the bit position for marking)
    index: usize,

    data: RefCell<T>,

    /// Number of guard entries rooting this object
    root_count: Cell<usize>,

    /// Set once the object has been swept. A pooled box is never revived;
    /// its slot is refilled with a fresh box instead.
    pooled: Cell<bool>,
}

impl<T: Traceable> GcBox<T> {
    fn new(index: usize) -> Self {
        Self {
            index,
            data: RefCell::new(T::default()),
            root_count: Cell::new(0),
            pooled: Cell::new(false),
        }
    }

    fn unroot(&self) {
        self.root_count.set(self.root_count.get().saturating_sub(1));
    }
}

// ============================================================================
// Gc - smart pointer to GC-managed object
// ============================================================================

/// A handle to a GC-managed object.
///
/// Cloning a `Gc` does not root the object. Objects stay alive only while they
/// are reachable from a `Guard`, either directly or through traced edges.
pub struct Gc<T: Traceable> {
    ptr: Rc<GcBox<T>>,
}

impl<T: Traceable> Gc<T> {
    /// Borrow the inner data immutably
    pub fn borrow(&self) -> Ref<'_, T> {
        self.ptr.data.borrow()
    }

    /// Borrow the inner data mutably
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.ptr.data.borrow_mut()
    }

    /// Borrow immutably unless a mutable borrow is outstanding
    pub fn try_borrow(&self) -> Option<Ref<'_, T>> {
        self.ptr.data.try_borrow().ok()
    }

    /// Slot index of this object. Indices are reused after collection.
    pub fn id(&self) -> usize {
        self.ptr.index
    }

    /// Check if two Gc pointers point to the same object
    pub fn ptr_eq(a: &Gc<T>, b: &Gc<T>) -> bool {
        Rc::ptr_eq(&a.ptr, &b.ptr)
    }

    /// False once the collector has swept this object. The data of a swept
    /// object has been reset and no longer means anything.
    pub fn is_alive(&self) -> bool {
        !self.ptr.pooled.get()
    }
}

impl<T: Traceable> Clone for Gc<T> {
    fn clone(&self) -> Self {
        Self {
            ptr: Rc::clone(&self.ptr),
        }
    }
}

impl<T: Traceable> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        Gc::ptr_eq(self, other)
    }
}

impl<T: Traceable> Eq for Gc<T> {}

impl<T: Traceable> core::hash::Hash for Gc<T> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.ptr).hash(state);
    }
}

impl<T: Traceable> fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gc")
            .field("id", &self.ptr.index)
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ============================================================================
// Visitor - edge reporting during the mark phase
// ============================================================================

/// Collects the outgoing edges reported by `Traceable::trace`.
pub struct Visitor<'a, T: Traceable> {
    stack: &'a mut Vec<Rc<GcBox<T>>>,
    marked_chunks: &'a [ChunkBitmask],
}

impl<T: Traceable> Visitor<'_, T> {
    /// Report a reference held by the object being traced.
    pub fn visit(&mut self, gc: &Gc<T>) {
        let child = &gc.ptr;
        if child.pooled.get() {
            return;
        }
        let already_marked = self
            .marked_chunks
            .get(child.index / CHUNK_CAPACITY)
            .is_some_and(|bitmask| bitmask.get(child.index % CHUNK_CAPACITY));
        if !already_marked {
            self.stack.push(Rc::clone(child));
        }
    }

    /// Report an optional reference.
    pub fn visit_opt(&mut self, gc: Option<&Gc<T>>) {
        if let Some(gc) = gc {
            self.visit(gc);
        }
    }
}

// ============================================================================
// Space - the internal memory arena
// ============================================================================

struct Space<T: Traceable> {
    slots: Vec<Rc<GcBox<T>>>,

    /// Indices of slots whose object has been swept
    free_list: Vec<usize>,

    /// One bitmask per CHUNK_CAPACITY slots
    marked_chunks: Vec<ChunkBitmask>,

    /// Reused between cycles to avoid reallocating
    mark_stack: Vec<Rc<GcBox<T>>>,

    /// Net allocations since the last collection
    net_allocs: isize,

    /// 0 = never auto-collect
    gc_threshold: isize,

    collections: usize,
}

impl<T: Traceable> Space<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            marked_chunks: Vec::new(),
            mark_stack: Vec::new(),
            net_allocs: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD as isize,
            collections: 0,
        }
    }

    /// Allocate a new object. The box starts with one root reference which the
    /// calling guard takes over, so an automatic collection triggered here
    /// cannot sweep it.
    fn alloc_internal(&mut self) -> Rc<GcBox<T>> {
        let gc_box = if let Some(index) = self.free_list.pop() {
            let gc_box = Rc::new(GcBox::new(index));
            if let Some(slot) = self.slots.get_mut(index) {
                *slot = Rc::clone(&gc_box);
            }
            gc_box
        } else {
            let index = self.slots.len();
            if index % CHUNK_CAPACITY == 0 {
                self.marked_chunks.push(ChunkBitmask::default());
            }
            let gc_box = Rc::new(GcBox::new(index));
            self.slots.push(Rc::clone(&gc_box));
            gc_box
        };
        gc_box.root_count.set(1);

        self.net_allocs += 1;
        if self.gc_threshold > 0 && self.net_allocs >= self.gc_threshold {
            self.collect();
        }

        gc_box
    }

    /// Mark phase: trace from guard roots to find all reachable objects.
    ///
    /// Returns false if an object could not be traced because it is mutably
    /// borrowed; its edges are unknown, so nothing may be swept this cycle.
    fn mark(&mut self) -> bool {
        for bitmask in &mut self.marked_chunks {
            bitmask.clear();
        }

        let mut stack = mem::take(&mut self.mark_stack);
        stack.clear();

        for gc_box in &self.slots {
            if !gc_box.pooled.get() && gc_box.root_count.get() > 0 {
                stack.push(Rc::clone(gc_box));
            }
        }

        let mut complete = true;
        while let Some(gc_box) = stack.pop() {
            let chunk_idx = gc_box.index / CHUNK_CAPACITY;
            let index_in_chunk = gc_box.index % CHUNK_CAPACITY;
            let Some(bitmask) = self.marked_chunks.get_mut(chunk_idx) else {
                continue;
            };
            if bitmask.get(index_in_chunk) {
                continue;
            }
            bitmask.set(index_in_chunk);

            let Ok(data) = gc_box.data.try_borrow() else {
                complete = false;
                break;
            };
            let mut visitor = Visitor {
                stack: &mut stack,
                marked_chunks: &self.marked_chunks,
            };
            data.trace(&mut visitor);
        }

        stack.clear();
        self.mark_stack = stack;
        complete
    }

    /// Sweep phase: reset and pool all unmarked objects.
    /// Returns number of objects collected.
    fn sweep(&mut self) -> usize {
        let mut collected = 0;
        for (chunk_idx, bitmask) in self.marked_chunks.iter().enumerate() {
            let base = chunk_idx * CHUNK_CAPACITY;
            let len = self.slots.len().saturating_sub(base);
            for index_in_chunk in bitmask.iter_unmarked(len) {
                let index = base + index_in_chunk;
                let Some(gc_box) = self.slots.get(index) else {
                    continue;
                };
                if gc_box.pooled.get() {
                    continue;
                }
                // Someone is still reading it through a stale handle; retry next cycle
                let Ok(mut data) = gc_box.data.try_borrow_mut() else {
                    continue;
                };
                data.reset();
                gc_box.pooled.set(true);
                self.free_list.push(index);
                collected += 1;
            }
        }
        collected
    }

    fn collect(&mut self) -> usize {
        let collected = if self.mark() {
            self.sweep()
        } else {
            tracing::debug!("gc: object borrowed during mark, skipping sweep");
            0
        };
        self.net_allocs = 0;
        self.collections += 1;
        tracing::debug!(
            collected,
            live = self.slots.len() - self.free_list.len(),
            "gc: collection finished"
        );
        collected
    }

    fn stats(&self) -> GcStats {
        let total_objects = self.slots.len();
        GcStats {
            total_objects,
            pooled_objects: self.free_list.len(),
            live_objects: total_objects - self.free_list.len(),
            collections: self.collections,
        }
    }
}

impl<T: Traceable> Drop for Space<T> {
    fn drop(&mut self) {
        // Objects hold Rc edges to each other; reset everything so cycles
        // between live objects do not outlive the heap.
        for gc_box in &self.slots {
            gc_box.pooled.set(true);
            if let Ok(mut data) = gc_box.data.try_borrow_mut() {
                data.reset();
            }
        }
    }
}

// ============================================================================
// Heap - the public wrapper
// ============================================================================

/// A wrapper around the GC space that provides the public API.
/// This is the main entry point for using the GC.
pub struct Heap<T: Traceable> {
    inner: Rc<RefCell<Space<T>>>,
}

impl<T: Traceable> Heap<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Space::new())),
        }
    }

    /// Create a new guard for allocating and rooting objects
    pub fn create_guard(&self) -> Guard<T> {
        Guard {
            space: Rc::downgrade(&self.inner),
            guarded: RefCell::new(Vec::new()),
        }
    }

    pub fn stats(&self) -> GcStats {
        self.inner.borrow().stats()
    }

    /// Force a garbage collection cycle. Returns the number of objects swept.
    pub fn collect(&self) -> usize {
        self.inner.borrow_mut().collect()
    }

    /// Set the GC threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&self, threshold: usize) {
        // Saturate; a wrapped negative value would disable collection
        self.inner.borrow_mut().gc_threshold = isize::try_from(threshold).unwrap_or(isize::MAX);
    }

    pub fn gc_threshold(&self) -> usize {
        self.inner.borrow().gc_threshold.max(0) as usize
    }
}

impl<T: Traceable> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Traceable> Clone for Heap<T> {
    fn clone(&self) -> Self {
        Heap {
            inner: Rc::clone(&self.inner),
        }
    }
}

// ============================================================================
// Guard - root anchor for objects
// ============================================================================

/// A root anchor that keeps objects alive.
///
/// Objects allocated through a guard, or added with `guard()`, are roots
/// until the guard is dropped, cleared, or the object is unguarded.
pub struct Guard<T: Traceable> {
    space: Weak<RefCell<Space<T>>>,
    guarded: RefCell<Vec<Rc<GcBox<T>>>>,
}

impl<T: Traceable> Guard<T> {
    /// Allocate a new default-initialized object rooted by this guard.
    ///
    /// # Panics
    /// Panics if the Heap has been dropped while the guard is still alive.
    pub fn alloc(&self) -> Gc<T> {
        let space = self.space.upgrade().unwrap_or_else(|| {
            #[allow(clippy::panic)]
            {
                panic!("GC error: Heap dropped while guard is still alive")
            }
        });
        let gc_box = space.borrow_mut().alloc_internal();
        self.guarded.borrow_mut().push(Rc::clone(&gc_box));
        Gc { ptr: gc_box }
    }

    /// Add an existing object to this guard's roots.
    pub fn guard(&self, obj: &Gc<T>) {
        if obj.is_alive() {
            obj.ptr.root_count.set(obj.ptr.root_count.get() + 1);
            self.guarded.borrow_mut().push(Rc::clone(&obj.ptr));
        }
    }

    /// Remove one root entry for an object.
    /// Returns true if the object was found and removed.
    pub fn unguard(&self, obj: &Gc<T>) -> bool {
        let mut guarded = self.guarded.borrow_mut();
        if let Some(pos) = guarded.iter().position(|p| Rc::ptr_eq(p, &obj.ptr)) {
            let gc_box = guarded.swap_remove(pos);
            gc_box.unroot();
            return true;
        }
        false
    }

    /// Clear all guarded objects
    pub fn clear(&self) {
        for gc_box in self.guarded.borrow_mut().drain(..) {
            gc_box.unroot();
        }
    }

    pub fn len(&self) -> usize {
        self.guarded.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guarded.borrow().is_empty()
    }
}

impl<T: Traceable> Drop for Guard<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Traceable> fmt::Debug for Guard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("len", &self.len()).finish()
    }
}

// ============================================================================
// GcStats - statistics about the GC
// ============================================================================

/// Statistics about the garbage collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcStats {
    /// Total number of slots (including pooled)
    pub total_objects: usize,
    /// Number of slots available for reuse
    pub pooled_objects: usize,
    pub live_objects: usize,
    /// Completed collection cycles
    pub collections: usize,
}

// ============================================================================
// Tests
// ============================================================================
