//! Conversion between [`crate::Value`] and the client's wire representation.
//!
//! Parameters go out as [`BindSlot`]s; result cells come back as
//! [`crate::client::WireValue`]s and are decoded by declared column type.

mod bind;
mod decode;

pub use bind::BindSlot;
pub use decode::{decode_cell, decode_outcome};
