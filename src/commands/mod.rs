pub mod clear;
pub mod export;
pub mod generate;
pub mod list;
pub mod render;
pub mod show;
pub mod templates;
