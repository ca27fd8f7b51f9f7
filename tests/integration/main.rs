//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one flow of the
//! listener against mock adapters. All tests run on the host with no real
//! hardware required.

mod command_flow_tests;
mod dispatcher_tests;
mod mock_hw;
