mod proc_stat;

pub use proc_stat::init;
