//! dist_gal - 可移植图形抽象层
//!
//! 在 OpenGL 4.3 与 Direct3D 11 之上提供统一的资源、状态与提交接口。
//! 共享层只针对 `Backend` trait 编写一次，后端在编译期通过泛型参数选定。
//!
//! # 模块结构
//!
//! - `core`: 环境功能（日志、配置、错误处理）
//! - `renderer`: 共享层（上下文、缓冲区、纹理、着色器、管线、帧缓冲、同步）
//! - `gfx`: 原生后端（OpenGL、Direct3D 11、无头记录后端）
//!
//! # 使用示例
//!
//! ```no_run
//! use std::rc::Rc;
//! use dist_gal::gfx::{HeadlessDevice, OffscreenSurface};
//! use dist_gal::renderer::{Buffer, BufferDesc, Context, ContextDesc};
//!
//! let desc = ContextDesc::new(Rc::new(OffscreenSurface::new(800, 600)));
//! let ctx: Context<HeadlessDevice> = Context::init(&desc)?;
//! let vertices = Buffer::new(&ctx, &BufferDesc::vertex(84), None)?;
//! # Ok::<(), dist_gal::core::GalError>(())
//! ```

pub mod core;
pub mod renderer;
pub mod gfx;
