//! Command line front end for the optical bench instruments

pub mod bench;
pub mod cli;

pub use bench::Bench;
pub use cli::{Args, Command};
