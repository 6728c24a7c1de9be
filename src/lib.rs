pub mod bot;
pub mod config;
pub mod daemon;
pub mod status;
pub mod web;
