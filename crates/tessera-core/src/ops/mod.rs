//! Element-wise operations over any [`DeviceStorage`](crate::DeviceStorage).
//!
//! Operands are gathered to host memory, combined there and written back to a new
//! storage on the operand's backend via [`DeviceStorage::alike`](crate::DeviceStorage::alike).
mod binary;
mod reduce;
mod score;
mod unary;

pub use binary::*;
pub use reduce::*;
pub use score::*;
pub use unary::*;
