use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::DetectionError;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// 跌倒判定の閾値
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DetectionConfig {
    /// 腰中心の垂直速度閾値（正規化座標/秒, 下向きが正）
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f32,
    /// 胴体角度閾値（度, 0=直立）
    #[serde(default = "default_angle_threshold_deg")]
    pub angle_threshold_deg: f32,
    /// 腰の高さ閾値（画面高さ比, 0=上端, 1=下端）
    #[serde(default = "default_height_threshold_factor")]
    pub height_threshold_factor: f32,
    /// 疑似跌倒が継続したら確定するまでの時間（秒）
    #[serde(default = "default_fall_confirm_duration_secs")]
    pub fall_confirm_duration_secs: f64,
    /// ランドマーク可視性の下限
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,
    /// これより長いフレーム間隔では速度を証拠として使わない（秒）
    #[serde(default = "default_max_time_delta_secs")]
    pub max_time_delta_secs: f64,
}

fn default_velocity_threshold() -> f32 { 0.6 }
fn default_angle_threshold_deg() -> f32 { 70.0 }
fn default_height_threshold_factor() -> f32 { 0.8 }
fn default_fall_confirm_duration_secs() -> f64 { 1.2 }
fn default_min_visibility() -> f32 { 0.5 }
fn default_max_time_delta_secs() -> f64 { 1.0 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: default_velocity_threshold(),
            angle_threshold_deg: default_angle_threshold_deg(),
            height_threshold_factor: default_height_threshold_factor(),
            fall_confirm_duration_secs: default_fall_confirm_duration_secs(),
            min_visibility: default_min_visibility(),
            max_time_delta_secs: default_max_time_delta_secs(),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> DetectionError {
    DetectionError::ConfigurationInvalid { field, reason }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), DetectionError> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(field, format!("must be within [{}, {}], got {}", min, max, value)));
    }
    Ok(())
}

/// 可視性は厳密比較（visibility > min）なので 1.0 以上では全関節が不可視になる
fn check_visibility_floor(field: &'static str, value: f64) -> Result<(), DetectionError> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(invalid(field, format!("must be within [0, 1), got {}", value)));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), DetectionError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("must be a finite value > 0, got {}", value)));
    }
    Ok(())
}

impl DetectionConfig {
    /// 値域チェック。誤設定は見逃し・誤報に直結するため起動時に失敗させる
    pub fn validate(&self) -> Result<(), DetectionError> {
        check_positive("velocity_threshold", self.velocity_threshold as f64)?;
        check_range("angle_threshold_deg", self.angle_threshold_deg as f64, 0.0, 180.0)?;
        check_range("height_threshold_factor", self.height_threshold_factor as f64, 0.0, 1.0)?;
        check_positive("fall_confirm_duration_secs", self.fall_confirm_duration_secs)?;
        check_visibility_floor("min_visibility", self.min_visibility as f64)?;
        check_positive("max_time_delta_secs", self.max_time_delta_secs)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReplayConfig {
    /// 記録時刻に合わせてフレーム間でスリープする
    #[serde(default)]
    pub realtime: bool,
    /// 毎フレームのオーバーレイ文字列を表示
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// env_logger のフィルタ文字列（RUST_LOG が優先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// logs/ 以下にもログを書き出す
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 読み込めなければデフォルト設定を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("config {} not loaded ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}
