//! Fixed-capacity, zero-initialized storage for bucket slots.
//!
//! A [`BackingArray`] is the storage layer under a fixed-size table: a
//! contiguous run of slots allocated once, never resized, and handed back
//! in one piece when the table is dropped. Slots start zeroed, which is a
//! valid empty value for every slot type used here (see [`ZeroInit`]).
//!
//! Small arrays come from the global allocator. Arrays of at least
//! [`PAGE_ALLOC_THRESHOLD`] bytes are backed by an anonymous private page
//! mapping on unix targets when the `page-alloc` feature is enabled; the
//! kernel hands those pages back pre-zeroed, so growing to a large table
//! costs no explicit zeroing pass. Which path was taken is not observable
//! through the interface, and both paths release through the matching
//! deallocator on drop.

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::ops::Deref;
use core::ops::DerefMut;
use core::ptr;
use core::ptr::NonNull;

use cfg_if::cfg_if;

/// Byte size at which a backing array switches from the global allocator
/// to an anonymous page mapping (when available).
pub const PAGE_ALLOC_THRESHOLD: usize = 4096;

/// Marker for types whose all-zero byte pattern is a valid value.
///
/// # Safety
///
/// Implementors must guarantee that memory of `size_of::<Self>()` bytes
/// containing only zeroes may be treated as an initialized `Self`, and
/// that dropping such a value is sound.
pub unsafe trait ZeroInit {}

/// A fixed-capacity array of `T`, zero-initialized at construction.
///
/// Move-only: the allocation is owned by exactly one array at a time and
/// there is no `Clone`. Element access goes through `Deref<Target = [T]>`.
pub struct BackingArray<T> {
    ptr: NonNull<T>,
    len: usize,
}

// SAFETY: the array exclusively owns its allocation and the `T` values in
// it; sending or sharing it is exactly as safe as for the elements.
unsafe impl<T: Send> Send for BackingArray<T> {}
unsafe impl<T: Sync> Sync for BackingArray<T> {}

cfg_if! {
    if #[cfg(all(unix, feature = "page-alloc"))] {
        #[inline]
        fn use_page_mapping(layout: Layout) -> bool {
            layout.size() >= PAGE_ALLOC_THRESHOLD
        }

        fn page_map(layout: Layout) -> *mut u8 {
            debug_assert!(layout.align() <= PAGE_ALLOC_THRESHOLD);
            // SAFETY: anonymous private mapping with no address hint; the
            // kernel picks the placement and the pages come back zeroed.
            let addr = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    layout.size(),
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            if addr == libc::MAP_FAILED {
                handle_alloc_error(layout);
            }
            addr.cast()
        }

        /// # Safety
        ///
        /// `ptr` must have been returned by `page_map` with this `layout`.
        unsafe fn page_unmap(ptr: *mut u8, layout: Layout) {
            // SAFETY: caller guarantees this is a live mapping of
            // `layout.size()` bytes.
            let rc = unsafe { libc::munmap(ptr.cast(), layout.size()) };
            debug_assert_eq!(rc, 0);
        }
    } else {
        #[inline]
        fn use_page_mapping(_layout: Layout) -> bool {
            false
        }

        fn page_map(_layout: Layout) -> *mut u8 {
            unreachable!("page mapping is not available on this configuration")
        }

        unsafe fn page_unmap(_ptr: *mut u8, _layout: Layout) {
            unreachable!("page mapping is not available on this configuration")
        }
    }
}

impl<T: ZeroInit> BackingArray<T> {
    /// Allocates a zeroed array of `len` slots.
    ///
    /// Allocation failure is reported through
    /// [`handle_alloc_error`], on either path.
    pub fn new(len: usize) -> Self {
        let layout = Layout::array::<T>(len).unwrap();
        if layout.size() == 0 {
            return Self {
                ptr: NonNull::dangling(),
                len,
            };
        }

        let raw = if use_page_mapping(layout) {
            page_map(layout)
        } else {
            // SAFETY: layout has nonzero size.
            let raw = unsafe { alloc::alloc::alloc_zeroed(layout) };
            if raw.is_null() {
                handle_alloc_error(layout);
            }
            raw
        };

        // SAFETY: `raw` is non-null (both paths bail through
        // `handle_alloc_error` otherwise) and points to `len` slots of
        // zeroed memory, which `T: ZeroInit` makes valid values.
        Self {
            ptr: unsafe { NonNull::new_unchecked(raw.cast()) },
            len,
        }
    }
}

impl<T> BackingArray<T> {
    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array has zero slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Deref for BackingArray<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` covers `len` initialized slots for the lifetime of
        // the array (or is dangling with a zero-sized layout, which is a
        // valid empty/ZST slice).
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for BackingArray<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `deref`, plus exclusive access through `&mut self`.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for BackingArray<T> {
    fn drop(&mut self) {
        let layout = Layout::array::<T>(self.len).unwrap();
        // SAFETY: the slots are initialized and owned by this array; after
        // dropping them in place the allocation is released through the
        // same path that produced it (decided by the layout size alone).
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len));
            if layout.size() != 0 {
                if use_page_mapping(layout) {
                    page_unmap(self.ptr.as_ptr().cast(), layout);
                } else {
                    alloc::alloc::dealloc(self.ptr.as_ptr().cast(), layout);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::AtomicUsize;
    use core::sync::atomic::Ordering;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Slot {
        value: u64,
        tag: u64,
    }

    // SAFETY: `Slot` is two plain integers; zeroed memory is a valid value.
    unsafe impl ZeroInit for Slot {}

    #[test]
    fn small_array_is_zeroed() {
        let array: BackingArray<Slot> = BackingArray::new(8);
        assert!(array.len() * core::mem::size_of::<Slot>() < PAGE_ALLOC_THRESHOLD);
        for slot in array.iter() {
            assert_eq!(slot, &Slot { value: 0, tag: 0 });
        }
    }

    #[test]
    fn large_array_is_zeroed() {
        // Comfortably past the page threshold.
        let len = PAGE_ALLOC_THRESHOLD / core::mem::size_of::<Slot>() * 4;
        let array: BackingArray<Slot> = BackingArray::new(len);
        assert_eq!(array.len(), len);
        for slot in array.iter() {
            assert_eq!(slot, &Slot { value: 0, tag: 0 });
        }
    }

    #[test]
    fn threshold_boundary_sizes() {
        let slot_size = core::mem::size_of::<Slot>();
        for len in [
            PAGE_ALLOC_THRESHOLD / slot_size - 1,
            PAGE_ALLOC_THRESHOLD / slot_size,
            PAGE_ALLOC_THRESHOLD / slot_size + 1,
        ] {
            let mut array: BackingArray<Slot> = BackingArray::new(len);
            array[len - 1].value = 7;
            assert_eq!(array[len - 1].value, 7);
            assert_eq!(array[0].value, 0);
        }
    }

    #[test]
    fn indexed_read_write() {
        let mut array: BackingArray<Slot> = BackingArray::new(4);
        array[2] = Slot { value: 10, tag: 20 };
        assert_eq!(array[2], Slot { value: 10, tag: 20 });
        assert_eq!(array[3], Slot { value: 0, tag: 0 });
    }

    #[test]
    fn move_transfers_ownership() {
        let mut array: BackingArray<Slot> = BackingArray::new(4);
        array[0].value = 42;
        let moved = array;
        assert_eq!(moved[0].value, 42);
    }

    #[test]
    fn drop_runs_element_destructors() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Counted {
            live: bool,
        }

        // SAFETY: zeroed means `live == false`, a valid value whose drop
        // does not count.
        unsafe impl ZeroInit for Counted {}

        impl Drop for Counted {
            fn drop(&mut self) {
                if self.live {
                    DROPS.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let mut array: BackingArray<Counted> = BackingArray::new(16);
        for slot in array.iter_mut().take(5) {
            slot.live = true;
        }
        drop(array);
        assert_eq!(DROPS.load(Ordering::Relaxed), 5);
    }
}
