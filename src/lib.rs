//! Simulated agents that report one fixed value each, some of them
//! lying, and a client that recovers the honest value by majority vote.
pub mod command;
pub mod constants;
pub mod errors;
pub mod messages;
pub mod nodes;
pub mod persistence;
pub mod transport;
pub mod types;
