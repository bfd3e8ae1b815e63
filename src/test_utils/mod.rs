//! Test doubles for exercising failure paths without a misbehaving server.
//!
//! Available with the `test-utils` feature.

mod faulty;

pub use faulty::{Faults, FaultyDriver};
