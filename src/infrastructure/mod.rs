pub mod config;
pub mod parsing;
pub mod portal;
