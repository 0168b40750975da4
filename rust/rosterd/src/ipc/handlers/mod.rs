pub mod admin;
pub mod core;
pub mod kv;
pub mod setup;
pub mod students;
pub mod tabular;
