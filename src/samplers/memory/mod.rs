mod proc_meminfo;

pub use proc_meminfo::init;
