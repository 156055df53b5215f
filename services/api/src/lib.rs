pub mod adapters;
pub mod config;
pub mod error;
pub mod services;
pub mod text_split;
pub mod web;
