use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub grading: GradingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Grade bounds and targets shared by validation, statistics and the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    #[serde(default = "default_min_grade")]
    pub min_grade: f64,
    #[serde(default = "default_max_grade")]
    pub max_grade: f64,
    #[serde(default = "default_target_average")]
    pub target_average: f64,
    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5001 }
fn default_database_url() -> String { "sqlite://grades.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_min_grade() -> f64 { 6.0 }
fn default_max_grade() -> f64 { 10.0 }
fn default_target_average() -> f64 { 8.0 }
fn default_weak_threshold() -> f64 { 7.0 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            min_grade: default_min_grade(),
            max_grade: default_max_grade(),
            target_average: default_target_average(),
            weak_threshold: default_weak_threshold(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            grading: GradingConfig::default(),
        }
    }
}

impl GradingConfig {
    /// Rejects grades that are not finite or fall outside `[min_grade, max_grade]`.
    pub fn validate_grade(&self, grade: f64) -> Result<f64> {
        if !grade.is_finite() || grade < self.min_grade || grade > self.max_grade {
            return Err(Error::Validation(format!(
                "Grade must be {}-{}",
                self.min_grade, self.max_grade
            )));
        }
        Ok(grade)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.grading;
        if !(g.min_grade.is_finite() && g.max_grade.is_finite()) || g.min_grade > g.max_grade {
            return Err(Error::Config(format!(
                "invalid grade bounds {}..{}",
                g.min_grade, g.max_grade
            )));
        }
        if !g.target_average.is_finite()
            || g.target_average < g.min_grade
            || g.target_average > g.max_grade
        {
            return Err(Error::Config(format!(
                "target average {} outside {}..{}",
                g.target_average, g.min_grade, g.max_grade
            )));
        }
        if !g.weak_threshold.is_finite() {
            return Err(Error::Config(format!(
                "weak threshold {} is not a number",
                g.weak_threshold
            )));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}
