//! Step definition modules for BDD scenarios.
//!
//! Steps are registered via `#[given]`, `#[when]`, and `#[then]` attribute
//! macros, so the modules only need to be compiled in.

#![expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd macros require Result returns for step functions"
)]

mod fork;
