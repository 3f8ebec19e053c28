mod app;
pub use app::App;
mod confirm;
pub mod event;
mod ui;
