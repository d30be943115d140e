pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod keys;
pub mod password;
pub mod repo;
