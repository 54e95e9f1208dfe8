//! Built-in function implementations

pub mod array_buffer;
pub mod intl;
pub mod typed_array;

// Re-export public functions from enabled modules
pub use array_buffer::*;
pub use intl::*;
pub use typed_array::*;
