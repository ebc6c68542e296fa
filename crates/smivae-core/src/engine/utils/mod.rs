//! Numerical helpers shared by the optimizer and the decoders.

pub mod sampling;
