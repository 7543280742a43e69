pub mod proxy;
pub mod records;
