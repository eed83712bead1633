pub mod broadcaster;
pub mod store;
