//! Test utilities and mock implementations.

pub mod mocks;

pub use mocks::{MOCK_FEE_LAMPORTS, MockConfig, MockPaymasterRpc, SimulationBehavior};
