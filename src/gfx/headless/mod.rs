//! 无头后端
//!
//! 使用 GL 词汇表，但不创建任何原生对象，只记录调用序列。
//! 适合在没有 GPU 的环境下验证提交协议，以及作为冒烟测试的后端。

mod command;
mod device;

use std::rc::Rc;

pub use command::NativeCall;
pub use device::HeadlessDevice;

use crate::gfx::backend::OffscreenSurface;
use crate::renderer::context::{Context, ContextDesc};

/// 在 800x600 离屏表面上以默认状态创建的无头上下文
pub fn test_context() -> Context<HeadlessDevice> {
    let desc = ContextDesc::new(Rc::new(OffscreenSurface::new(800, 600)));
    match Context::init(&desc) {
        Ok(context) => context,
        Err(e) => crate::gal_fail!("headless context failed to initialise: {}", e),
    }
}
