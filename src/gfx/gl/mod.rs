//! OpenGL 后端
//!
//! `translate` 是 GL 词汇表，始终编译，无头后端也复用它；
//! `device` 是基于 `glow` 的 OpenGL 4.3 设备，由 `backend_gl` 特性开启。

pub mod translate;

#[cfg(feature = "backend_gl")]
pub mod device;

pub use translate::GlTables;

#[cfg(feature = "backend_gl")]
pub use device::GlDevice;
