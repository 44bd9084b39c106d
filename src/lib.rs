pub mod api;
pub mod app;
pub mod chat;
pub mod cli;
pub mod comedy;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod persona;
