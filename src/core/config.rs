//! 配置管理模块
//!
//! 提供图形抽象层配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (gal.toml)
//!
//! ```toml
//! [graphics]
//! backend = "gl"      # gl, d3d11 或 headless
//! vsync = true
//! depth_test = true
//! stencil_test = false
//! blend = false
//! cull = true
//! scissor = false
//!
//! [surface]
//! width = 800
//! height = 600
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};
use crate::renderer::types::StateFlags;

/// 图形抽象层配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 表面配置（离屏运行时使用）
    #[serde(default)]
    pub surface: SurfaceConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// 垂直同步
    #[serde(default = "default_true")]
    pub vsync: bool,

    /// 初始启用深度测试
    #[serde(default = "default_true")]
    pub depth_test: bool,

    /// 初始启用模板测试
    #[serde(default)]
    pub stencil_test: bool,

    /// 初始启用混合
    #[serde(default)]
    pub blend: bool,

    /// 初始启用背面剔除
    #[serde(default = "default_true")]
    pub cull: bool,

    /// 初始启用裁剪测试
    #[serde(default)]
    pub scissor: bool,
}

/// 表面配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// 宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 高度
    #[serde(default = "default_height")]
    pub height: u32,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenGL 4.3 后端
    Gl,
    /// Direct3D 11 后端
    D3d11,
    /// 记录原生命令而不执行的后端
    Headless,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_backend() -> BackendKind { BackendKind::Gl }
fn default_true() -> bool { true }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_log_file() -> String { "dist_gal.log".to_string() }

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: true,
            depth_test: true,
            stencil_test: false,
            blend: false,
            cull: true,
            scissor: false,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_file: default_log_file(),
        }
    }
}

impl GraphicsConfig {
    /// 转换为 `ContextDesc` 使用的初始状态位
    pub fn state_flags(&self) -> StateFlags {
        let mut flags = StateFlags::empty();
        flags.set(StateFlags::DEPTH, self.depth_test);
        flags.set(StateFlags::STENCIL, self.stencil_test);
        flags.set(StateFlags::BLEND, self.blend);
        flags.set(StateFlags::CULL, self.cull);
        flags.set(StateFlags::SCISSOR, self.scissor);
        flags
    }
}

impl Config {
    /// 从配置文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--gl` / `--d3d11` / `--headless`: 选择后端
    /// - `--no-vsync`: 关闭垂直同步
    /// - `--width <value>` / `--height <value>`: 表面尺寸
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        for arg in &args {
            match arg.as_str() {
                "--gl" => self.graphics.backend = BackendKind::Gl,
                "--d3d11" => self.graphics.backend = BackendKind::D3d11,
                "--headless" => self.graphics.backend = BackendKind::Headless,
                "--no-vsync" => self.graphics.vsync = false,
                _ => {}
            }
        }

        if let Some(width) = Self::arg_value(&args, "--width") {
            self.surface.width = width;
        }

        if let Some(height) = Self::arg_value(&args, "--height") {
            self.surface.height = height;
        }
    }

    fn arg_value(args: &[String], name: &str) -> Option<u32> {
        let idx = args.iter().position(|a| a == name)?;
        args.get(idx + 1)?.parse().ok()
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.surface.width == 0 || self.surface.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "surface.width/height".to_string(),
                reason: "Surface dimensions must be greater than 0".to_string(),
            }.into());
        }

        if self.graphics.backend == BackendKind::D3d11 && !cfg!(target_os = "windows") {
            return Err(ConfigError::InvalidValue {
                field: "graphics.backend".to_string(),
                reason: "Direct3D 11 backend is only available on Windows".to_string(),
            }.into());
        }

        Ok(())
    }
}

impl BackendKind {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Gl => "OpenGL",
            BackendKind::D3d11 => "Direct3D 11",
            BackendKind::Headless => "Headless",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.surface.width, 800);
        assert_eq!(config.surface.height, 600);
        assert_eq!(config.graphics.backend, BackendKind::Gl);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.surface.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_state_flags_from_config() {
        let config = GraphicsConfig::default();
        let flags = config.state_flags();
        assert!(flags.contains(StateFlags::DEPTH | StateFlags::CULL));
        assert!(!flags.contains(StateFlags::BLEND));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["dist_gal", "--headless", "--no-vsync", "--width", "1280", "--height", "oops"]);
        assert_eq!(config.graphics.backend, BackendKind::Headless);
        assert!(!config.graphics.vsync);
        assert_eq!(config.surface.width, 1280);
        assert_eq!(config.surface.height, 600);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str("[graphics]\nbackend = \"headless\"\nblend = true\n").unwrap();
        assert_eq!(config.graphics.backend, BackendKind::Headless);
        assert!(config.graphics.blend);
        assert!(config.graphics.depth_test);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join("dist_gal_config_roundtrip.toml");
        let mut config = Config::default();
        config.graphics.backend = BackendKind::Headless;
        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.graphics.backend, BackendKind::Headless);
        let _ = std::fs::remove_file(path);
    }
}
