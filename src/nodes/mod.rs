pub mod agent;
pub mod cancel;
pub mod collector;
pub mod coordinator;
pub mod policy;
pub mod session;
