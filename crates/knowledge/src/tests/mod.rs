//! Cross-module tests: sync engine guarantees, access control and the
//! end-to-end answering path.

mod end_to_end;
mod support;
mod sync_engine;
