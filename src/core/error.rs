//! 错误处理模块
//!
//! 定义了图形抽象层中使用的统一错误类型，使用 `thiserror` 提供友好的错误消息。
//!
//! # 错误分类
//!
//! - **前置条件违例**：程序员错误（空句柄、越界槽位、缓冲区类型不匹配、写越界），
//!   不走这里，而是通过 `gal_assert!` 记录日志后终止
//! - **后端诊断信息**：着色器编译/链接失败、原生调试回调，只记录日志，不返回错误
//! - **资源不可用**：设备/交换链创建失败、资源分配失败，记录日志后以 `Err` 返回

use thiserror::Error;

/// 图形抽象层统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, GalError>;

/// 图形抽象层的错误类型
#[derive(Debug, Error)]
pub enum GalError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 图形 API 错误
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 日志系统错误
    #[error("Log error: {0}")]
    Log(String),

    /// 初始化错误
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// 设备创建失败
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// 交换链错误
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// 着色器编译失败
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// 资源创建失败
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// 渲染命令执行失败
    #[error("Command execution failed: {0}")]
    CommandExecution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphics_error_display() {
        let err: GalError = GraphicsError::DeviceCreation("no adapter".to_string()).into();
        assert_eq!(err.to_string(), "Graphics error: Device creation failed: no adapter");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: GalError = ConfigError::InvalidValue {
            field: "surface.width".to_string(),
            reason: "must be positive".to_string(),
        }
        .into();
        assert!(matches!(err, GalError::Config(ConfigError::InvalidValue { .. })));
    }
}
