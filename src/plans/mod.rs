pub mod dto;
pub mod handlers;
pub mod prompt;
pub mod repo;
