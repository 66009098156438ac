pub mod analytics;
pub mod api;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod model;

pub use config::{Config, GradingConfig};
pub use error::{Error, Result};
pub use model::{History, Observation, PredictionResult, TrendPredictor, XSource};
