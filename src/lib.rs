pub mod config;
pub mod kernel;
pub mod runtime;
pub mod services;

// Re-exported for drivers and tests
pub use kernel::reactor::Reactor;
