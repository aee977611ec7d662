//! Настройки кластеризации и API сервера

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};
use crate::types::FeatureColumn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_feature_columns")]
    pub feature_columns: Vec<String>,
    #[serde(default = "default_true")]
    pub scale: bool,
    #[serde(default = "default_true")]
    pub remove_outliers: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_n_runs")]
    pub n_runs: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_k() -> usize { 4 }
fn default_feature_columns() -> Vec<String> {
    ["frequency", "monetary", "unique_skus", "coupon_rate", "total_qty"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_true() -> bool { true }
fn default_seed() -> u64 { 42 }
fn default_n_runs() -> usize { 10 }
fn default_max_iterations() -> u64 { 300 }
fn default_tolerance() -> f64 { 1e-4 }

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            feature_columns: default_feature_columns(),
            scale: true,
            remove_outliers: true,
            seed: default_seed(),
            n_runs: default_n_runs(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl ClusteringConfig {
    pub fn new<S: AsRef<str>>(k: usize, feature_columns: &[S], scale: bool, remove_outliers: bool) -> Self {
        Self {
            k,
            feature_columns: feature_columns.iter().map(|c| c.as_ref().to_string()).collect(),
            scale,
            remove_outliers,
            ..Self::default()
        }
    }

    /// Проверка параметров, не зависящих от данных
    pub fn validate(&self) -> Result<Vec<FeatureColumn>> {
        if self.k < 2 {
            return Err(SegmentationError::ClusteringPrecondition(format!(
                "k must be at least 2, got {}",
                self.k
            )));
        }
        if self.feature_columns.is_empty() {
            return Err(SegmentationError::ClusteringPrecondition(
                "feature_columns must not be empty".to_string(),
            ));
        }
        if self.n_runs == 0 || self.max_iterations == 0 {
            return Err(SegmentationError::ClusteringPrecondition(
                "n_runs and max_iterations must be positive".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(SegmentationError::ClusteringPrecondition(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }

        let columns = FeatureColumn::resolve_all(&self.feature_columns)?;
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(SegmentationError::ClusteringPrecondition(format!(
                    "feature column '{}' listed twice",
                    column
                )));
            }
        }
        Ok(columns)
    }
}

/// Адрес API сервера из окружения
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
        }
    }
}

impl ServerSettings {
    pub const HOST_VAR: &'static str = "SEGMENTATION_HOST";
    pub const PORT_VAR: &'static str = "SEGMENTATION_PORT";

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(host) = lookup(Self::HOST_VAR) {
            settings.host = host
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid {}: {}", Self::HOST_VAR, host))?;
        }
        if let Some(port) = lookup(Self::PORT_VAR) {
            settings.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid {}: {}", Self::PORT_VAR, port))?;
        }
        Ok(settings)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
