pub mod config;
pub mod llm;
pub mod models;
pub mod repos;
pub mod transcripts;
pub mod youtube;
