//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//! 图形抽象层没有独立于日志流的用户错误通道，因此这里同时承担两件事：
//!
//! - 初始化订阅者（控制台 / 滚动文件）
//! - 将原生后端的调试消息按严重级别映射到 `tracing` 级别
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_gal::core::log;
//! use dist_gal::core::config::LogLevel;
//!
//! log::init_logger(LogLevel::Info, false, None);
//! dist_gal::gal_info!(width = 800, height = 600, "Context created");
//! ```

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use std::path::Path;

use super::config::LogLevel;

/// 初始化日志系统
///
/// 必须在程序开始时调用一次。
///
/// # 参数
///
/// * `level` - 日志级别
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "dist_gal.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) {
    let filter = match level {
        LogLevel::Trace => EnvFilter::new("trace"),
        LogLevel::Debug => EnvFilter::new("debug"),
        LogLevel::Info => EnvFilter::new("info"),
        LogLevel::Warn => EnvFilter::new("warn"),
        LogLevel::Error => EnvFilter::new("error"),
    };

    if file_output {
        let log_path = log_file_path.unwrap_or("dist_gal.log");
        let path = Path::new(log_path);
        let directory = path.parent().unwrap_or(Path::new("."));
        let filename = path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("dist_gal.log");

        // 每天滚动
        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            directory,
            filename
        );

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(false)  // 文件不需要 ANSI 颜色
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// 图形抽象层日志 - Info 级别
#[macro_export]
macro_rules! gal_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "dist_gal::gal", $($arg)*)
    };
}

/// 图形抽象层日志 - Warn 级别
#[macro_export]
macro_rules! gal_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "dist_gal::gal", $($arg)*)
    };
}

/// 图形抽象层日志 - Error 级别
#[macro_export]
macro_rules! gal_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "dist_gal::gal", $($arg)*)
    };
}

/// 前置条件断言
///
/// 条件不成立时先以 error 级别记录，再终止当前线程。
/// 用于空句柄、越界槽位、缓冲区类型不匹配等程序员错误，永远不做恢复。
#[macro_export]
macro_rules! gal_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            let message = format!($($arg)+);
            tracing::error!(target: "dist_gal::gal", condition = stringify!($cond), "{}", message);
            panic!("precondition violated: {}", message);
        }
    };
}

/// 无条件的前置条件失败，用于需要返回值的分支
#[macro_export]
macro_rules! gal_fail {
    ($($arg:tt)+) => {
        $crate::core::log::precondition_failed(&format!($($arg)+))
    };
}

/// 性能追踪宏
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::span!(tracing::Level::TRACE, $name)
    };
}

/// 原生调试消息的严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    Fatal,
    Error,
    Warning,
    Info,
}

impl DebugSeverity {
    /// 对应的 `tracing` 级别
    pub fn level(self) -> Level {
        match self {
            DebugSeverity::Fatal | DebugSeverity::Error => Level::ERROR,
            DebugSeverity::Warning => Level::WARN,
            DebugSeverity::Info => Level::INFO,
        }
    }
}

/// 记录一条原生后端诊断消息
///
/// 无论严重级别多高都只记录，不中断执行。
pub fn log_backend_message(backend: &str, severity: DebugSeverity, message: &str) {
    match severity {
        DebugSeverity::Fatal => {
            tracing::error!(target: "dist_gal::backend", backend, fatal = true, "{}", message)
        }
        DebugSeverity::Error => tracing::error!(target: "dist_gal::backend", backend, "{}", message),
        DebugSeverity::Warning => tracing::warn!(target: "dist_gal::backend", backend, "{}", message),
        DebugSeverity::Info => tracing::info!(target: "dist_gal::backend", backend, "{}", message),
    }
}

/// 记录并终止
#[track_caller]
pub fn precondition_failed(message: &str) -> ! {
    tracing::error!(target: "dist_gal::gal", "{}", message);
    panic!("precondition violated: {}", message);
}

/// 日志级别转换
impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(DebugSeverity::Fatal.level(), Level::ERROR);
        assert_eq!(DebugSeverity::Warning.level(), Level::WARN);
        assert_eq!(DebugSeverity::Info.level(), Level::INFO);
    }

    #[test]
    fn test_backend_message_never_panics() {
        log_backend_message("test", DebugSeverity::Fatal, "device removed");
    }

    #[test]
    #[should_panic(expected = "precondition violated")]
    fn test_gal_assert_panics() {
        let slot = 40;
        crate::gal_assert!(slot < 16, "slot {} out of range", slot);
    }
}
