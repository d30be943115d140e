pub mod client;
pub mod extract;
pub mod provider;
pub mod task;
