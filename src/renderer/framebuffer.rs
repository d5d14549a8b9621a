//! 离屏帧缓冲
//!
//! 最多 `FRAMEBUFFER_ATTACHMENTS_MAX` 个颜色附件按顺序挂到原生颜色槽位，
//! 外加可选的深度和 / 或模板附件。清除掩码在创建时预先计算好。
//! 原生完整性检查失败只记录警告。

use std::rc::{Rc, Weak};

use crate::core::error::Result;
use crate::gal_assert;

use super::backend_trait::{Backend, DepthAttachmentPoint};
use super::context::Context;
use super::descriptor::{BlitRegion, FramebufferDesc};
use super::texture::Texture;
use super::types::{ClearFlags, FRAMEBUFFER_ATTACHMENTS_MAX};

/// 帧缓冲附件
pub struct FramebufferAttachments<'a, B: Backend> {
    pub colors: &'a [&'a Texture<B>],
    pub depth: Option<&'a Texture<B>>,
    pub stencil: Option<&'a Texture<B>>,
}

impl<'a, B: Backend> FramebufferAttachments<'a, B> {
    pub fn colors(colors: &'a [&'a Texture<B>]) -> Self {
        Self {
            colors,
            depth: None,
            stencil: None,
        }
    }

    pub fn with_depth(mut self, depth: &'a Texture<B>) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_stencil(mut self, stencil: &'a Texture<B>) -> Self {
        self.stencil = Some(stencil);
        self
    }
}

pub(crate) struct FramebufferState<B: Backend> {
    device: Rc<B>,
    pub(crate) native: B::Framebuffer,
    pub(crate) id: u32,
    pub(crate) clear_flags: ClearFlags,
}

impl<B: Backend> Drop for FramebufferState<B> {
    fn drop(&mut self) {
        self.device.destroy_framebuffer(&self.native);
        tracing::debug!(id = self.id, handle = ?self.native, "Framebuffer destroyed");
    }
}

/// 离屏渲染目标
pub struct Framebuffer<B: Backend> {
    state: Rc<FramebufferState<B>>,
    desc: FramebufferDesc,
    color_count: u32,
    complete: bool,
}

impl<B: Backend> Framebuffer<B> {
    /// 挂载附件并检查完整性
    ///
    /// # 参数
    ///
    /// * `desc` - 清除掩码
    /// * `attachments` - 颜色附件按顺序占用颜色槽位 0..n
    pub fn create(ctx: &Context<B>, desc: &FramebufferDesc, attachments: FramebufferAttachments<'_, B>) -> Result<Self> {
        gal_assert!(
            attachments.colors.len() <= FRAMEBUFFER_ATTACHMENTS_MAX,
            "{} color attachments exceed the limit of {}",
            attachments.colors.len(),
            FRAMEBUFFER_ATTACHMENTS_MAX
        );

        let device = Rc::clone(ctx.device());
        let native = device.create_framebuffer()?;

        for (index, texture) in attachments.colors.iter().enumerate() {
            gal_assert!(
                !texture.ty().is_render_target(),
                "color attachment {} is a depth/stencil target",
                index
            );
            device.attach_color(&native, index as u32, texture.native(), texture.target());
        }

        for texture in attachments.depth.into_iter().chain(attachments.stencil) {
            let format = texture.desc().format;
            gal_assert!(
                texture.ty().is_render_target() || format.is_depth() || format.has_stencil(),
                "{:?} texture with format {:?} cannot be a depth/stencil attachment",
                texture.ty(),
                format
            );
            let point = DepthAttachmentPoint::for_texture(texture.ty(), format);
            device.attach_depth_stencil(&native, texture.native(), texture.target(), point);
        }

        device.set_draw_buffers(&native, attachments.colors.len() as u32);

        let has_attachment =
            !attachments.colors.is_empty() || attachments.depth.is_some() || attachments.stencil.is_some();
        let complete = has_attachment && device.framebuffer_complete(&native);
        if !complete {
            crate::gal_warn!(
                colors = attachments.colors.len(),
                depth = attachments.depth.is_some(),
                stencil = attachments.stencil.is_some(),
                "Framebuffer is incomplete"
            );
        }

        let id = ctx.next_framebuffer_id();
        device.bind_target(ctx.current_native_target().as_deref().map(|s| &s.native));

        tracing::debug!(
            id,
            colors = attachments.colors.len(),
            clear = ?desc.clear_flags,
            complete,
            "Framebuffer created"
        );

        Ok(Self {
            state: Rc::new(FramebufferState {
                device,
                native,
                id,
                clear_flags: desc.clear_flags,
            }),
            desc: *desc,
            color_count: attachments.colors.len() as u32,
            complete,
        })
    }

    /// 区域拷贝
    ///
    /// 任意一侧为 `None` 表示默认后缓冲，两侧不能同时为 `None`。
    /// 拷贝结束后恢复 `ctx` 当前的渲染目标。
    pub fn copy(
        ctx: &Context<B>,
        src: Option<&Framebuffer<B>>,
        dst: Option<&Framebuffer<B>>,
        regions: &[BlitRegion],
        mask: ClearFlags,
    ) {
        gal_assert!(
            src.is_some() || dst.is_some(),
            "framebuffer copy needs at least one off-screen side"
        );
        let device = ctx.device();
        let native_mask = B::translate_clear_flags(mask);
        for region in regions {
            device.blit(
                src.map(|f| &f.state.native),
                dst.map(|f| &f.state.native),
                *region,
                native_mask,
            );
        }
        device.bind_target(ctx.current_native_target().as_deref().map(|s| &s.native));
        tracing::trace!(
            src = src.map_or(0, Framebuffer::id),
            dst = dst.map_or(0, Framebuffer::id),
            regions = regions.len(),
            "Framebuffer blit"
        );
    }

    pub fn desc(&self) -> &FramebufferDesc {
        &self.desc
    }

    /// 渲染目标标识，0 保留给默认后缓冲
    pub fn id(&self) -> u32 {
        self.state.id
    }

    pub fn color_count(&self) -> u32 {
        self.color_count
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn native(&self) -> &B::Framebuffer {
        &self.state.native
    }

    pub fn destroy(self) {}

    pub(crate) fn downgrade(&self) -> Weak<FramebufferState<B>> {
        Rc::downgrade(&self.state)
    }
}

impl<B: Backend> std::fmt::Debug for Framebuffer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.state.id)
            .field("native", &self.state.native)
            .field("desc", &self.desc)
            .field("complete", &self.complete)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{test_context, HeadlessDevice, NativeCall};
    use crate::renderer::descriptor::{Rect, TextureDesc};
    use crate::renderer::types::{TextureFormat, TextureType};

    fn color_target(ctx: &Context<HeadlessDevice>) -> Texture<HeadlessDevice> {
        Texture::new(ctx, &TextureDesc::new_2d(16, 16, TextureFormat::Rgba8), None).unwrap()
    }

    #[test]
    fn test_create_assigns_ids_and_slots() {
        let ctx = test_context();
        let a = color_target(&ctx);
        let b = color_target(&ctx);
        let depth = Texture::new(
            &ctx,
            &TextureDesc::new_2d(16, 16, TextureFormat::Depth24Stencil8).with_type(TextureType::DepthStencilTarget),
            None,
        )
        .unwrap();

        let desc = FramebufferDesc {
            clear_flags: ClearFlags::COLOR | ClearFlags::DEPTH,
        };
        let first = Framebuffer::create(&ctx, &desc, FramebufferAttachments::colors(&[&a, &b]).with_depth(&depth)).unwrap();
        let second = Framebuffer::create(&ctx, &desc, FramebufferAttachments::colors(&[&a])).unwrap();

        assert!(first.is_complete());
        assert_ne!(first.id(), 0);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.desc(), &desc);
        assert_eq!(first.color_count(), 2);

        let calls = ctx.device().calls();
        assert!(calls
            .iter()
            .any(|c| matches!(c, NativeCall::FramebufferTexture { attachment: glow::COLOR_ATTACHMENT1, .. })));
        assert!(calls.iter().any(|c| matches!(
            c,
            NativeCall::FramebufferRenderbuffer { attachment: glow::DEPTH_STENCIL_ATTACHMENT, .. }
        )));
        assert!(calls.iter().any(|c| matches!(c, NativeCall::DrawBuffers { count: 2, .. })));
    }

    #[test]
    fn test_empty_framebuffer_is_incomplete() {
        let ctx = test_context();
        let framebuffer =
            Framebuffer::create(&ctx, &FramebufferDesc::default(), FramebufferAttachments::colors(&[])).unwrap();
        assert!(!framebuffer.is_complete());
    }

    #[test]
    #[should_panic(expected = "color attachments exceed")]
    fn test_attachment_limit() {
        let ctx = test_context();
        let texture = color_target(&ctx);
        let colors = vec![&texture; FRAMEBUFFER_ATTACHMENTS_MAX + 1];
        let _ = Framebuffer::create(&ctx, &FramebufferDesc::default(), FramebufferAttachments::colors(&colors));
    }

    #[test]
    fn test_copy_blits_every_region() {
        let ctx = test_context();
        let texture = color_target(&ctx);
        let framebuffer =
            Framebuffer::create(&ctx, &FramebufferDesc::default(), FramebufferAttachments::colors(&[&texture])).unwrap();
        let region = BlitRegion {
            src: Rect::new(0, 0, 16, 16),
            dst: Rect::new(0, 0, 8, 8),
        };
        Framebuffer::copy(&ctx, Some(&framebuffer), None, &[region, region], ClearFlags::COLOR);

        let blits = ctx
            .device()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, NativeCall::BlitFramebuffer { dst: 0, .. }))
            .count();
        assert_eq!(blits, 2);
    }

    #[test]
    #[should_panic(expected = "at least one off-screen side")]
    fn test_copy_rejects_two_backbuffers() {
        let ctx = test_context();
        Framebuffer::copy(&ctx, None, None, &[], ClearFlags::COLOR);
    }
}
