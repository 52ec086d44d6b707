#![expect(
    unsafe_code,
    reason = "raw layout arithmetic and manual init/deinit are the whole point of this module",
)]

use std::{alloc, ptr};
use std::alloc::Layout;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ptr::NonNull;


/// A copyable handle to one contiguous allocation holding a header of type `H` at offset 0,
/// followed by `capacity` elements of type `E` starting at [`Self::element_offset`].
///
/// The handle is a plain value: copying it never copies the block, and two handles compare
/// equal iff they address the same allocation (identity equality). Ownership of the
/// underlying memory is single-owner *by convention* — whoever holds the block is expected
/// to run [`deinitialize_header`], [`deinitialize_elements`] (when `E` is non-trivial), and
/// [`deallocate`] exactly once, in that order.
///
/// # Invariants, which may be relied on by unsafe code:
/// - `ptr` addresses either a live allocation of [`Self::layout_for`]`(capacity)` bytes, or,
///   when that layout is zero-sized, a well-aligned dangling address that [`deallocate`]
///   will not pass to the global allocator.
/// - The header slot and every element slot start out *uninitialized*. No slot may be read
///   before the corresponding initialize call, and the block is never reallocated in place —
///   growth is move-then-free into a fresh block.
///
/// [`deinitialize_header`]: RawBlock::deinitialize_header
/// [`deinitialize_elements`]: RawBlock::deinitialize_elements
/// [`deallocate`]: RawBlock::deallocate
/// [`Self::element_offset`]: RawBlock::element_offset
/// [`Self::layout_for`]: RawBlock::layout_for
pub struct RawBlock<H, E> {
    ptr:      NonNull<u8>,
    capacity: usize,
    _marker:  PhantomData<(*const H, *const E)>,
}

impl<H, E> Clone for RawBlock<H, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, E> Copy for RawBlock<H, E> {}

impl<H, E> PartialEq for RawBlock<H, E> {
    /// Identity equality: two handles are equal iff they address the same block.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<H, E> Eq for RawBlock<H, E> {}

impl<H, E> Hash for RawBlock<H, E> {
    /// Identity hash, consistent with the identity equality.
    #[inline]
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.ptr.hash(state);
    }
}

impl<H, E> Debug for RawBlock<H, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RawBlock")
            .field("base", &self.ptr)
            .field("capacity", &self.capacity)
            .finish()
    }
}

// Layout arithmetic.
impl<H, E> RawBlock<H, E> {
    /// Byte offset of the first element slot: `size_of::<H>()` rounded up to `align_of::<E>()`.
    #[inline]
    #[must_use]
    pub const fn element_offset() -> usize {
        let align = align_of::<E>();
        (size_of::<H>() + align - 1) & !(align - 1)
    }

    /// Alignment of the whole block: the stricter of the header's and the elements'.
    #[inline]
    #[must_use]
    pub const fn block_align() -> usize {
        let header = align_of::<H>();
        let element = align_of::<E>();
        if header > element { header } else { element }
    }

    /// The layout of a block with room for `capacity` elements.
    ///
    /// # Panics
    /// Panics if the total size overflows `isize` — a caller bug on the same footing as an
    /// out-of-range subscript, except that this one is cheap enough to always detect.
    #[must_use]
    pub fn layout_for(capacity: usize) -> Layout {
        let bytes = size_of::<E>()
            .checked_mul(capacity)
            .and_then(|elements| elements.checked_add(Self::element_offset()));
        let Some(bytes) = bytes else {
            panic!("header block of {capacity} elements overflows the address space");
        };

        match Layout::from_size_align(bytes, Self::block_align()) {
            Ok(layout) => layout,
            // `block_align` is a real alignment, so only rounding `bytes` up to it can fail.
            Err(_) => panic!("header block of {capacity} elements overflows the address space"),
        }
    }
}

// Allocation and identity.
impl<H, E> RawBlock<H, E> {
    /// Allocate a block with room for `capacity` elements. The header and all element slots
    /// are uninitialized.
    ///
    /// Allocation failure is fatal: this calls [`alloc::handle_alloc_error`] rather than
    /// returning an error, matching the containers' no-recovery contract.
    #[must_use]
    pub fn allocate(capacity: usize) -> Self {
        let layout = Self::layout_for(capacity);

        let ptr = if layout.size() == 0 {
            // A block with a zero-sized header and no elements owns no memory. Hand out a
            // well-aligned dangling address; `deallocate` skips zero-sized layouts to match.
            let raw = ptr::without_provenance_mut::<u8>(Self::block_align());
            // SAFETY: `block_align()` is at least 1, so `raw` is non-null.
            unsafe { NonNull::new_unchecked(raw) }
        } else {
            // SAFETY: `layout` has nonzero size.
            let raw = unsafe { alloc::alloc(layout) };
            let Some(ptr) = NonNull::new(raw) else {
                alloc::handle_alloc_error(layout)
            };
            ptr
        };

        Self {
            ptr,
            capacity,
            _marker: PhantomData,
        }
    }

    /// Reassemble a handle from its parts.
    ///
    /// # Safety
    /// `ptr` must be the base pointer of a block previously produced by
    /// [`RawBlock::allocate`] with this exact `H`, `E`, and `capacity`, and that block must
    /// not have been deallocated.
    #[inline]
    #[must_use]
    pub const unsafe fn from_raw_parts(ptr: NonNull<u8>, capacity: usize) -> Self {
        Self {
            ptr,
            capacity,
            _marker: PhantomData,
        }
    }

    /// The identity of the block: the address of its header slot.
    #[inline]
    #[must_use]
    pub const fn base(self) -> NonNull<u8> {
        self.ptr
    }

    /// How many element slots the block was allocated with.
    #[inline]
    #[must_use]
    pub const fn capacity(self) -> usize {
        self.capacity
    }

    /// Free the block.
    ///
    /// # Safety
    /// The block must still be live, and no handle to it may be used afterwards. The header
    /// (and any initialized non-trivial elements) must already have been deinitialized;
    /// this call only releases memory.
    pub unsafe fn deallocate(self) {
        let layout = Self::layout_for(self.capacity);
        if layout.size() != 0 {
            // SAFETY: per the contract, `self.ptr` is a live allocation of exactly this
            // layout, handed out by `alloc::alloc` in `Self::allocate`.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

// Header slot.
impl<H, E> RawBlock<H, E> {
    /// Typed pointer to the header slot. Obtaining the pointer is always safe; reading
    /// through it is only valid once the header has been initialized.
    #[inline]
    #[must_use]
    pub const fn header_ptr(self) -> *mut H {
        self.ptr.as_ptr().cast::<H>()
    }

    /// Write `header` into the header slot.
    ///
    /// # Safety
    /// The block must be live, and the slot must currently be uninitialized (or moved-from):
    /// the previous contents, if any, are not dropped.
    #[inline]
    pub unsafe fn initialize_header(self, header: H) {
        // SAFETY: the slot is in-bounds and properly aligned by construction; the contract
        // makes overwriting-without-drop a non-issue.
        unsafe { self.header_ptr().write(header) }
    }

    /// Run the header's destructor in place, leaving the slot uninitialized.
    ///
    /// # Safety
    /// The block must be live and the header slot initialized; it must not be read again
    /// before being reinitialized.
    #[inline]
    pub unsafe fn deinitialize_header(self) {
        // SAFETY: in-bounds, aligned, initialized per the contract.
        unsafe { self.header_ptr().drop_in_place() }
    }

    /// Read the header by copy.
    ///
    /// # Safety
    /// The block must be live and the header slot initialized.
    #[inline]
    #[must_use]
    pub unsafe fn read_header(self) -> H
    where
        H: Copy,
    {
        // SAFETY: in-bounds, aligned, initialized per the contract.
        unsafe { *self.header_ptr() }
    }

    /// Overwrite the header. With a trivial `H` there is no destructor to leak, so this
    /// doubles as initialization.
    ///
    /// # Safety
    /// The block must be live.
    #[inline]
    pub unsafe fn write_header(self, header: H)
    where
        H: Copy,
    {
        // SAFETY: in-bounds and aligned per the contract.
        unsafe { self.header_ptr().write(header) }
    }

    /// Move the header out of the block, leaving the slot uninitialized.
    ///
    /// # Safety
    /// Same as [`RawBlock::deinitialize_header`].
    #[inline]
    #[must_use]
    pub unsafe fn take_header(self) -> H {
        // SAFETY: in-bounds, aligned, initialized per the contract; the caller promises not
        // to read the slot again, so the duplicate ownership `read` creates is immediately
        // resolved.
        unsafe { self.header_ptr().read() }
    }

    /// Move-initialize this block's header from `other`'s, leaving `other`'s header slot
    /// conceptually moved-from. No clone code runs.
    ///
    /// # Safety
    /// Both blocks must be live and distinct, `other`'s header must be initialized, and
    /// `self`'s header slot must be uninitialized. `other`'s header must not be used again.
    #[inline]
    pub unsafe fn move_initialize_header(self, other: Self) {
        debug_assert!(self != other, "move-initialize requires two distinct blocks");

        // SAFETY: distinct live blocks, so the one-header copy cannot overlap.
        unsafe { self.header_ptr().copy_from_nonoverlapping(other.header_ptr(), 1) }
    }
}

// Element slots.
impl<H, E> RawBlock<H, E> {
    /// Typed pointer to element slot `index`.
    ///
    /// # Safety
    /// The block must be live and `index` must be at most `capacity` (the one-past-the-end
    /// pointer is representable but must not be read or written).
    #[inline]
    #[must_use]
    pub unsafe fn element_ptr(self, index: usize) -> *mut E {
        debug_assert!(
            index <= self.capacity,
            "element index {index} out of range for capacity {}",
            self.capacity,
        );

        // SAFETY: `index <= capacity` keeps the computed address within (or one past) the
        // allocation, which spans `element_offset() + capacity * size_of::<E>()` bytes.
        unsafe {
            self.ptr
                .as_ptr()
                .add(Self::element_offset())
                .cast::<E>()
                .add(index)
        }
    }

    /// Read element `index`.
    ///
    /// # Safety
    /// The block must be live, `index < capacity`, and the slot initialized.
    #[inline]
    #[must_use]
    pub unsafe fn element(self, index: usize) -> E
    where
        E: Copy,
    {
        debug_assert!(index < self.capacity, "element read out of range");

        // SAFETY: in-bounds, aligned, initialized per the contract.
        unsafe { *self.element_ptr(index) }
    }

    /// Write element `index`. Doubles as initialization, since `E: Copy` has no destructor
    /// for an overwrite to leak.
    ///
    /// # Safety
    /// The block must be live and `index < capacity`.
    #[inline]
    pub unsafe fn set_element(self, index: usize, element: E)
    where
        E: Copy,
    {
        debug_assert!(index < self.capacity, "element write out of range");

        // SAFETY: in-bounds and aligned per the contract.
        unsafe { self.element_ptr(index).write(element) }
    }

    /// Copy-initialize the first `src.len()` element slots from a contiguous source.
    ///
    /// # Safety
    /// The block must be live and `src.len() <= capacity`.
    pub unsafe fn initialize_elements(self, src: &[E])
    where
        E: Copy,
    {
        debug_assert!(src.len() <= self.capacity, "element source exceeds capacity");

        // SAFETY: `src` is a borrowed slice and the destination is freshly allocated
        // storage, so the two regions cannot overlap; the length fits per the contract.
        unsafe {
            self.element_ptr(0)
                .copy_from_nonoverlapping(src.as_ptr(), src.len());
        }
    }

    /// Move-initialize the first `count` element slots from `other`'s, leaving those slots
    /// of `other` conceptually moved-from. No clone code runs.
    ///
    /// # Safety
    /// Both blocks must be live and distinct, `count` must not exceed either capacity,
    /// `other`'s first `count` slots must be initialized, and they must not be used again.
    pub unsafe fn move_initialize_elements(self, other: Self, count: usize) {
        debug_assert!(self != other, "move-initialize requires two distinct blocks");
        debug_assert!(count <= self.capacity && count <= other.capacity);

        // SAFETY: distinct live blocks cannot overlap; `count` fits both per the contract.
        unsafe {
            self.element_ptr(0)
                .copy_from_nonoverlapping(other.element_ptr(0), count);
        }
    }

    /// Run destructors for the first `count` elements, leaving those slots uninitialized.
    ///
    /// The containers in this workspace only store trivial link records, for which this is
    /// a no-op, but the primitive supports any `E`.
    ///
    /// # Safety
    /// The block must be live and its first `count` slots initialized.
    pub unsafe fn deinitialize_elements(self, count: usize) {
        debug_assert!(count <= self.capacity);

        // SAFETY: in-bounds, aligned, initialized per the contract.
        unsafe {
            ptr::slice_from_raw_parts_mut(self.element_ptr(0), count).drop_in_place();
        }
    }
}
