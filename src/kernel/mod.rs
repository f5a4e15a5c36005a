//! Deterministic orchestration core. No I/O, no wall clock.

pub mod chat;
pub mod context;
pub mod duplex;
pub mod event;
pub mod fixtures;
pub mod interrupt;
pub mod listening;
pub mod log;
pub mod reactor;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod time;
