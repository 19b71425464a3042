//! gatevm VM: fetch-decode-execute interpreter with a one-shot unlock latch.

pub mod latch;
pub mod program;
pub mod vm;
