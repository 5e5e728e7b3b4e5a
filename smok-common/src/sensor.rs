use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::state::Unit;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("failed to read thermal zone: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected thermal zone content: {0:?}")]
    Parse(String),
}

#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    async fn celsius(&self) -> Result<f64, SensorError>;
}

/// CPU temperature exposed by the kernel under /sys/class/thermal, in millidegrees Celsius
#[derive(Clone, Debug)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TemperatureSensor for ThermalZone {
    async fn celsius(&self) -> Result<f64, SensorError> {
        let content = fs::read_to_string(&self.path).await?;

        parse_millidegrees(&content)
    }
}

pub fn parse_millidegrees(content: &str) -> Result<f64, SensorError> {
    let content = content.trim();

    content
        .parse::<i64>()
        .map(|millis| millis as f64 / 1000.)
        .map_err(|_| SensorError::Parse(content.to_owned()))
}

/// e.g. "68.0 F"
pub fn format_temperature(celsius: f64, unit: Unit) -> String {
    format!("{:.1} {}", unit.convert(celsius), unit.code())
}
