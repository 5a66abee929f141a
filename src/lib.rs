//! Workspace root crate. The actual functionality lives in `crates/`.
