//! GPU 缓冲区
//!
//! 一个 `Buffer` 包装一个原生缓冲区句柄和创建它的描述符。
//! 语义类型（顶点 / 索引 / uniform / 存储）在第一次 `load` 时固定，之后只能改变内容和逻辑大小。
//!
//! # 生命周期
//!
//! ```text
//! create(ctx) -> load(desc, data) -> [update / upload_data]* -> drop
//! ```
//!
//! 原生句柄在 `Drop` 中释放；`destroy` 只是显式的 drop。

use std::rc::Rc;

use crate::core::error::Result;
use crate::gal_assert;

use super::backend_trait::Backend;
use super::context::Context;
use super::descriptor::BufferDesc;
use super::types::BufferType;

/// GPU 缓冲区
pub struct Buffer<B: Backend> {
    device: Rc<B>,
    native: B::Buffer,
    desc: Option<BufferDesc>,
    /// 当前原生存储的字节数
    capacity: u64,
}

impl<B: Backend> Buffer<B> {
    /// 只分配原生句柄，不分配存储
    pub fn create(ctx: &Context<B>) -> Result<Self> {
        let device = Rc::clone(ctx.device());
        let native = device.create_buffer()?;
        tracing::debug!(backend = device.name(), handle = ?native, "Buffer created");
        Ok(Self {
            device,
            native,
            desc: None,
            capacity: 0,
        })
    }

    /// 创建并加载
    pub fn new(ctx: &Context<B>, desc: &BufferDesc, data: Option<&[u8]>) -> Result<Self> {
        let mut buffer = Self::create(ctx)?;
        buffer.load(desc, data)?;
        Ok(buffer)
    }

    /// 第一次真正分配存储并上传数据，同时固定语义类型
    ///
    /// # 参数
    ///
    /// * `desc` - 大小、类型与使用提示
    /// * `data` - 初始内容，长度不能超过 `desc.size`
    pub fn load(&mut self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<()> {
        if let Some(current) = &self.desc {
            gal_assert!(
                current.kind == desc.kind,
                "buffer kind is fixed at {:?}, cannot load as {:?}",
                current.kind,
                desc.kind
            );
        }
        self.allocate(desc, data)?;
        self.desc = Some(*desc);
        tracing::debug!(kind = ?desc.kind, usage = ?desc.usage, size = desc.size, "Buffer loaded");
        Ok(())
    }

    /// 修改逻辑描述符
    ///
    /// 提供新数据或逻辑大小超过现有存储时整块重新分配；
    /// 否则只记录新的逻辑大小和使用提示，不触碰原生存储。
    pub fn update(&mut self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<()> {
        let current = self.desc();
        gal_assert!(
            current.kind == desc.kind,
            "buffer kind is fixed at {:?}, cannot update to {:?}",
            current.kind,
            desc.kind
        );
        if data.is_some() || desc.size > self.capacity || desc.usage != current.usage {
            self.allocate(desc, data)?;
        }
        self.desc = Some(*desc);
        tracing::trace!(size = desc.size, capacity = self.capacity, "Buffer updated");
        Ok(())
    }

    /// 写入一段子区域
    ///
    /// `offset + data.len()` 超过逻辑大小是前置条件违规，不会发生任何原生写入。
    pub fn upload_data(&mut self, offset: u64, data: &[u8]) {
        let desc = self.desc();
        let end = offset.checked_add(data.len() as u64);
        gal_assert!(
            end.is_some_and(|end| end <= desc.size),
            "upload of {} bytes at offset {} overruns buffer of {} bytes",
            data.len(),
            offset,
            desc.size
        );
        let target = B::translate_buffer_type(desc.kind);
        self.device.buffer_sub_data(&self.native, target, offset as usize, data);
    }

    /// 最近一次 load / update 使用的描述符
    pub fn desc(&self) -> &BufferDesc {
        self.desc
            .as_ref()
            .unwrap_or_else(|| crate::gal_fail!("buffer has not been loaded"))
    }

    pub fn is_loaded(&self) -> bool {
        self.desc.is_some()
    }

    pub fn kind(&self) -> BufferType {
        self.desc().kind
    }

    pub fn size(&self) -> u64 {
        self.desc().size
    }

    /// 原生句柄
    pub fn native(&self) -> &B::Buffer {
        &self.native
    }

    /// 显式释放
    pub fn destroy(self) {}

    fn allocate(&mut self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<()> {
        if let Some(bytes) = data {
            gal_assert!(
                bytes.len() as u64 <= desc.size,
                "initial data of {} bytes exceeds buffer size {}",
                bytes.len(),
                desc.size
            );
        }
        self.device.buffer_storage(
            &self.native,
            B::translate_buffer_type(desc.kind),
            B::translate_buffer_usage(desc.usage),
            desc.size as usize,
            data,
        )?;
        self.capacity = desc.size;
        Ok(())
    }
}

impl<B: Backend> Drop for Buffer<B> {
    fn drop(&mut self) {
        self.device.destroy_buffer(&self.native);
        tracing::debug!(handle = ?self.native, "Buffer destroyed");
    }
}

impl<B: Backend> std::fmt::Debug for Buffer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("native", &self.native)
            .field("desc", &self.desc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{test_context, NativeCall};
    use crate::renderer::types::BufferUsage;

    #[test]
    fn test_load_round_trips_desc() {
        let ctx = test_context();
        let desc = BufferDesc::new(64, BufferType::Uniform, BufferUsage::DynamicDraw);
        let buffer = Buffer::new(&ctx, &desc, None).unwrap();
        assert_eq!(buffer.desc(), &desc);
    }

    #[test]
    fn test_upload_within_bounds() {
        let ctx = test_context();
        let mut buffer = Buffer::new(&ctx, &BufferDesc::vertex(16), None).unwrap();
        buffer.upload_data(8, &[1u8; 8]);
        let calls = ctx.device().calls();
        assert!(calls
            .iter()
            .any(|c| matches!(c, NativeCall::BufferSubData { offset: 8, size: 8, .. })));
    }

    #[test]
    fn test_overrun_never_writes() {
        let ctx = test_context();
        let mut buffer = Buffer::new(&ctx, &BufferDesc::vertex(16), None).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buffer.upload_data(12, &[0u8; 8]);
        }));
        assert!(result.is_err());
        assert!(!ctx
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, NativeCall::BufferSubData { .. })));
    }

    #[test]
    #[should_panic(expected = "overruns buffer")]
    fn test_overrun_is_precondition_violation() {
        let ctx = test_context();
        let mut buffer = Buffer::new(&ctx, &BufferDesc::index(4), None).unwrap();
        buffer.upload_data(0, &[0u8; 5]);
    }

    #[test]
    #[should_panic(expected = "buffer kind is fixed")]
    fn test_kind_is_fixed() {
        let ctx = test_context();
        let mut buffer = Buffer::new(&ctx, &BufferDesc::vertex(16), None).unwrap();
        buffer.update(&BufferDesc::index(16), None).unwrap();
    }

    #[test]
    fn test_update_without_data_keeps_storage() {
        let ctx = test_context();
        let mut buffer = Buffer::new(&ctx, &BufferDesc::vertex(64), None).unwrap();
        let before = ctx.device().calls().len();
        buffer.update(&BufferDesc::vertex(32), None).unwrap();
        assert_eq!(ctx.device().calls().len(), before);
        assert_eq!(buffer.size(), 32);

        buffer.update(&BufferDesc::vertex(128), None).unwrap();
        assert!(matches!(
            ctx.device().calls().last(),
            Some(NativeCall::BufferData { size: 128, .. })
        ));
    }

    #[test]
    fn test_drop_releases_handle() {
        let ctx = test_context();
        let buffer = Buffer::new(&ctx, &BufferDesc::vertex(4), None).unwrap();
        let name = *buffer.native();
        buffer.destroy();
        assert!(ctx
            .device()
            .calls()
            .iter()
            .any(|c| *c == NativeCall::DeleteBuffer { buffer: name }));
    }
}
