//! Command-line surface for the modelrelay binary.
//!
//! Every flag can also be given through its environment variable, and a
//! `.env` file in the working directory is honored.

pub mod args;

pub use args::Args;
