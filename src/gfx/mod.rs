//! 图形后端模块
//!
//! 本模块封装了不同图形 API 的底层实现，包括：
//! - OpenGL 4.3：基于 `glow`，由 `backend_gl` 特性开启
//! - Direct3D 11：基于 `windows`，仅 Windows，由 `backend_d3d11` 特性开启
//! - 无头后端：不创建原生对象，只记录调用序列，始终可用
//!
//! 所有后端都实现了统一的 `Backend` trait，
//! 共享层在编译期通过泛型参数选定后端。

pub mod backend;
pub mod glsl;
pub mod gl;
pub mod headless;
#[cfg(all(target_os = "windows", feature = "backend_d3d11"))]
pub mod d3d11;

pub use backend::{NativeSurface, OffscreenSurface};
pub use gl::GlTables;
pub use headless::HeadlessDevice;
#[cfg(feature = "backend_gl")]
pub use gl::GlDevice;
#[cfg(all(target_os = "windows", feature = "backend_d3d11"))]
pub use d3d11::D3d11Device;
