pub mod mock;
pub mod simulated;
