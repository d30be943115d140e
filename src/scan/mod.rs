pub mod ai_estimate;
pub mod dto;
pub mod estimator;
pub mod gate;
pub mod handlers;
pub mod label;
pub mod upload;
