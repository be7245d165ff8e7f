pub mod collection;
pub mod member;
pub mod work_item;
pub mod workload;
