pub mod chips;
pub mod keys;
