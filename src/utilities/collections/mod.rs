pub mod index_set;
pub mod lsb_radix_sort;

pub use index_set::IndexSet;
