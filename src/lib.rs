pub mod block;
pub mod config;
pub mod editor;
pub mod editor_display;
pub mod export;
pub mod logging;
pub mod markdown;
pub mod range;
pub mod render;
pub mod store;
pub mod theme;
