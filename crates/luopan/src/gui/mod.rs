pub mod app;
pub mod window;
