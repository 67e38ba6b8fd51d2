//! 工具模块

pub mod logging;

pub use logging::truncate_text;
