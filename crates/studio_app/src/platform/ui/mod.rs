pub mod commands;
pub mod config_panel;
pub mod render;
