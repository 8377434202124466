//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required and a simulated millisecond clock.

mod mock_hw;
mod node_tests;
mod session_tests;
