//! Workspace root package. The protocol lives in `crates/echolock-crypto`
//! (matrix primitives) and `crates/echolock-core` (session state machine);
//! this crate exists only to anchor workspace-wide tooling.
