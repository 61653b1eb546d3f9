#![warn(clippy::pedantic)]

pub mod command_handler;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod lockdown;
pub mod logger;
pub mod manager;
pub mod prefix;
pub mod prefix_config;
pub mod session;
