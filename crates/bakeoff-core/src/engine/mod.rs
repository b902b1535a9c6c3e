pub mod harness;

pub use harness::{Harness, RunPolicy};
