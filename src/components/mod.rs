pub mod color_tool;

pub use color_tool::ColorTool;
