#![no_std]

extern crate alloc;

#[cfg(target_os = "none")]
#[global_allocator]
static HEAP: heap::WatermarkHeap = heap::WatermarkHeap::empty();

/// Claims the RAM between the end of static data and the reserved stack
/// for the allocator. Call once, before the first allocation.
#[cfg(target_os = "none")]
pub fn init_heap() {
    extern "C" {
        static _stack_start: u32;
    }

    unsafe {
        let start = cortex_m_rt::heap_start() as usize;
        let stack_top = core::ptr::addr_of!(_stack_start) as usize;
        HEAP.init(start, stack_top - heap::STACK_RESERVE);
    }
}

/// Bytes left between the heap watermark and the stack guard.
#[cfg(target_os = "none")]
pub fn heap_free() -> usize {
    HEAP.free()
}

pub mod config;
pub mod heap;
pub mod telemetry;
