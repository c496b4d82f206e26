//! Memory module: Allocator Registry + Raw Buffer Primitive
//!
//! Prinsip desain:
//! - Satu primitive: `resize` (allocate, copy prefix, free old)
//! - Handle opaque (index + version), di-resolve setiap call
//! - Exclusive ownership: setiap `MemoryBlock` punya tepat satu owner

mod allocator;
mod block;
mod mapped;
mod resize;

pub use allocator::{
    is_registered, register_allocator, unregister_allocator, AllocatorHandle, CustomAllocator,
    ResizeRequest, FIRST_USER_INDEX,
};
pub use block::MemoryBlock;
pub use resize::{resize, CACHE_LINE_SIZE, MAX_ALLOCATION_BYTES};
