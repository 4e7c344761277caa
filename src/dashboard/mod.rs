pub mod cache;
pub mod canvas;
pub mod display;
pub mod filter;
pub mod layer;
pub mod pipeline;
pub mod style;
