/// Модуль предобработки данных

pub mod feature_engineering;
pub mod normalization;
pub mod outliers;

pub use feature_engineering::FeatureBuilder;
pub use normalization::DataNormalizer;
pub use outliers::OutlierFilter;
