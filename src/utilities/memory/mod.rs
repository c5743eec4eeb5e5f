//! Memory access primitives shared by the multithreaded stages.

pub mod disjoint_buffer;

pub use disjoint_buffer::DisjointBuffer;
