//! Small I/O and hashing helpers shared by services and the CLI.

pub mod compress;
pub mod digest;
