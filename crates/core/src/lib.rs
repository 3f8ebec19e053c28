pub mod color;
pub mod engine;
pub mod error;
pub mod logger;
pub mod platform;
pub mod report;
pub mod sampler;
pub mod settings;
pub mod sleep;
pub mod types;
