//! Watermark heap with a reserved-stack guard.
//!
//! RAM is split the way the linker lays it out:
//!
//! ```text
//! #  .data  #  .bss  #        heap         #       MSP stack        #
//! #         #        #                     # STACK_RESERVE bytes    #
//! #####################################################################
//! ^ RAM start        ^ heap_start()                   _stack_start --^
//! ```
//!
//! The heap grows upward from the end of static data. The watermark may
//! never cross `_stack_start - STACK_RESERVE`; a growth request that
//! would do so fails and leaves the watermark where it was.

use core::alloc::{GlobalAlloc, Layout};
use core::cell::RefCell;
use core::ptr;

use critical_section::Mutex;

/// Bytes at the top of RAM reserved for the main stack.
///
/// If the stack ever grows past this, increase it.
pub const STACK_RESERVE: usize = 0x400;

#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum HeapError {
    OutOfMemory,
    Underflow,
}

/// A bump region with sbrk semantics: a watermark that moves by signed
/// increments inside `[start, limit]`.
pub struct HeapRegion {
    start: usize,
    limit: usize,
    brk: usize,
}

impl HeapRegion {
    pub const fn new(start: usize, limit: usize) -> Self {
        Self {
            start,
            limit,
            brk: start,
        }
    }

    /// Moves the watermark by `incr` bytes and returns its previous
    /// position. Fails, without moving the watermark, if the move would
    /// cross `limit` (into the reserved stack) or fall below `start`.
    pub fn grow(&mut self, incr: isize) -> Result<usize, HeapError> {
        let next = self
            .brk
            .checked_add_signed(incr)
            .ok_or(HeapError::OutOfMemory)?;
        if next > self.limit {
            return Err(HeapError::OutOfMemory);
        }
        if next < self.start {
            return Err(HeapError::Underflow);
        }
        let prev = self.brk;
        self.brk = next;
        Ok(prev)
    }

    pub fn brk(&self) -> usize {
        self.brk
    }

    pub fn free(&self) -> usize {
        self.limit - self.brk
    }
}

fn align_up(addr: usize, align: usize) -> usize {
    (addr + align - 1) & !(align - 1)
}

/// `GlobalAlloc` over a [`HeapRegion`]. Allocations bump the watermark;
/// `dealloc` is a no-op, space only comes back by lowering the break and
/// nothing does.
pub struct WatermarkHeap {
    region: Mutex<RefCell<Option<HeapRegion>>>,
}

impl WatermarkHeap {
    pub const fn empty() -> Self {
        Self {
            region: Mutex::new(RefCell::new(None)),
        }
    }

    /// Hands the allocator its region. `limit` must already exclude the
    /// reserved stack bytes.
    ///
    /// # Safety
    ///
    /// `start..limit` must be RAM that nothing else will touch for the
    /// lifetime of the allocator. Must be called exactly once, before
    /// the first allocation.
    pub unsafe fn init(&self, start: usize, limit: usize) {
        critical_section::with(|cs| {
            self.region
                .borrow_ref_mut(cs)
                .replace(HeapRegion::new(start, limit));
        });
    }

    /// Bytes left between the watermark and the stack guard.
    pub fn free(&self) -> usize {
        critical_section::with(|cs| {
            self.region
                .borrow_ref(cs)
                .as_ref()
                .map(HeapRegion::free)
                .unwrap_or(0)
        })
    }
}

unsafe impl GlobalAlloc for WatermarkHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        critical_section::with(|cs| {
            let mut region = self.region.borrow_ref_mut(cs);
            let Some(region) = region.as_mut() else {
                return ptr::null_mut();
            };
            let aligned = align_up(region.brk(), layout.align());
            let pad = aligned - region.brk();
            let Ok(total) = isize::try_from(pad + layout.size()) else {
                return ptr::null_mut();
            };
            match region.grow(total) {
                Ok(_) => aligned as *mut u8,
                Err(_) => ptr::null_mut(),
            }
        })
    }

    unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: usize = 0x2000_0400;
    const LIMIT: usize = 0x2000_1400;

    #[test]
    fn grow_returns_previous_watermark() {
        let mut region = HeapRegion::new(START, LIMIT);
        assert_eq!(region.grow(16), Ok(START));
        assert_eq!(region.grow(32), Ok(START + 16));
        assert_eq!(region.brk(), START + 48);
    }

    #[test]
    fn grow_to_exact_limit_is_allowed() {
        let mut region = HeapRegion::new(START, LIMIT);
        assert_eq!(region.grow((LIMIT - START) as isize), Ok(START));
        assert_eq!(region.brk(), LIMIT);
        assert_eq!(region.free(), 0);
    }

    #[test]
    fn grow_past_limit_fails_and_leaves_watermark() {
        let mut region = HeapRegion::new(START, LIMIT);
        region.grow(0x800).unwrap();
        let brk = region.brk();
        assert_eq!(region.grow(0x801), Err(HeapError::OutOfMemory));
        assert_eq!(region.brk(), brk);
        assert_eq!(region.grow(0x800), Ok(brk));
    }

    #[test]
    fn overflowing_increment_fails() {
        let mut region = HeapRegion::new(START, LIMIT);
        assert_eq!(region.grow(isize::MIN), Err(HeapError::OutOfMemory));
        assert_eq!(region.brk(), START);
    }

    #[test]
    fn shrink_releases_space() {
        let mut region = HeapRegion::new(START, LIMIT);
        region.grow(64).unwrap();
        assert_eq!(region.grow(-32), Ok(START + 64));
        assert_eq!(region.brk(), START + 32);
    }

    #[test]
    fn shrink_below_start_fails() {
        let mut region = HeapRegion::new(START, LIMIT);
        region.grow(16).unwrap();
        assert_eq!(region.grow(-17), Err(HeapError::Underflow));
        assert_eq!(region.brk(), START + 16);
    }

    #[test]
    fn align_up_rounds_to_boundary() {
        assert_eq!(align_up(0x1000, 8), 0x1000);
        assert_eq!(align_up(0x1001, 8), 0x1008);
        assert_eq!(align_up(0x1007, 8), 0x1008);
        assert_eq!(align_up(0x1000, 1), 0x1000);
    }

    #[test]
    fn allocations_stay_out_of_the_reserved_region() {
        let arena = [0u8; 256];
        let start = align_up(arena.as_ptr() as usize, 8);
        let limit = start + 64;
        let heap = WatermarkHeap::empty();
        unsafe { heap.init(start, limit) };

        let layout = Layout::from_size_align(32, 8).unwrap();
        let a = unsafe { heap.alloc(layout) };
        let b = unsafe { heap.alloc(layout) };
        for p in [a, b] {
            assert!(!p.is_null());
            assert!((p as usize) >= start);
            assert!((p as usize) + 32 <= limit);
        }

        let c = unsafe { heap.alloc(Layout::from_size_align(1, 1).unwrap()) };
        assert!(c.is_null());
        assert_eq!(heap.free(), 0);
    }

    #[test]
    fn alloc_before_init_returns_null() {
        let heap = WatermarkHeap::empty();
        let p = unsafe { heap.alloc(Layout::from_size_align(8, 8).unwrap()) };
        assert!(p.is_null());
    }
}
