//! 纹理与立方体贴图
//!
//! 纹理类型在 `create` 时固定；像素格式和尺寸在 `load` 时设置，
//! `upload_data` 每次都重新分配存储再传输像素，调用方不能假设旧存储被复用。
//!
//! # 加载步骤
//!
//! 1. 通过翻译表解析格式（GPU 存储格式、传输格式、传输元素类型）
//! 2. 设置过滤 / 寻址 / 比较 / 边框颜色（渲染目标跳过）
//! 3. 按通道数选择像素对齐（4 通道为 4，其余为 1）
//! 4. 分配 `width × height × depth` 的存储
//! 5. 有数据时传输像素，并在 `mips > 1` 时重新生成 mip 链

use std::rc::Rc;

use crate::core::error::Result;
use crate::gal_assert;

use super::backend_trait::{Backend, Extent3d};
use super::context::Context;
use super::descriptor::{CubemapDesc, TextureDesc};
use super::translate::NativePixelFormat;
use super::types::{TextureFormat, TextureType};

/// 立方体贴图的面数
pub const CUBEMAP_FACES: u32 = 6;

/// 像素行对齐
pub fn unpack_alignment(format: TextureFormat) -> u32 {
    if format.channels() == 4 {
        4
    } else {
        1
    }
}

/// GPU 纹理
pub struct Texture<B: Backend> {
    device: Rc<B>,
    native: B::Texture,
    ty: TextureType,
    target: B::TextureTarget,
    desc: Option<TextureDesc>,
}

impl<B: Backend> Texture<B> {
    /// 按类型分配原生对象
    ///
    /// 深度 / 模板 / 深度模板目标对应 renderbuffer 类对象，而不是可采样图像。
    pub fn create(ctx: &Context<B>, ty: TextureType) -> Result<Self> {
        let device = Rc::clone(ctx.device());
        let target = B::translate_texture_type(ty);
        let native = device.create_texture(target, ty)?;
        tracing::debug!(backend = device.name(), ty = ?ty, handle = ?native, "Texture created");
        Ok(Self {
            device,
            native,
            ty,
            target,
            desc: None,
        })
    }

    /// 创建并加载
    pub fn new(ctx: &Context<B>, desc: &TextureDesc, data: Option<&[u8]>) -> Result<Self> {
        let mut texture = Self::create(ctx, desc.ty)?;
        texture.load(desc, data)?;
        Ok(texture)
    }

    /// 设置格式与采样参数，分配存储，可选地上传像素
    ///
    /// # 参数
    ///
    /// * `desc` - 类型必须与创建时一致
    /// * `data` - 完整的像素数据，至少 `desc.data_size()` 字节
    pub fn load(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<()> {
        gal_assert!(
            desc.ty == self.ty,
            "texture was created as {:?}, cannot load as {:?}",
            self.ty,
            desc.ty
        );
        self.desc = Some(*desc);
        self.apply_sampling();
        self.store(data)?;
        tracing::debug!(
            width = desc.width,
            height = desc.height,
            depth = desc.depth,
            format = ?desc.format,
            has_data = data.is_some(),
            "Texture loaded"
        );
        Ok(())
    }

    /// 只更新采样参数（过滤、寻址、比较、边框颜色），不触碰存储
    pub fn update(&mut self, desc: &TextureDesc) {
        let current = self.desc_mut();
        current.filter = desc.filter;
        current.wrap = desc.wrap;
        current.compare = desc.compare;
        current.border_color = desc.border_color;
        self.apply_sampling();
    }

    /// 以新的尺寸重新分配存储并上传像素
    ///
    /// 类型不使用的维度记为 1。
    pub fn upload_data(&mut self, width: u32, height: u32, depth: u32, data: Option<&[u8]>) -> Result<()> {
        let ty = self.ty;
        let current = self.desc_mut();
        current.width = width;
        current.height = if ty.is_one_dimensional() { 1 } else { height };
        current.depth = if ty.is_layered() { depth } else { 1 };
        self.store(data)?;
        tracing::trace!(width, height, depth, "Texture storage respecified");
        Ok(())
    }

    /// 最近一次 load / update / upload_data 之后的描述符
    pub fn desc(&self) -> &TextureDesc {
        self.desc
            .as_ref()
            .unwrap_or_else(|| crate::gal_fail!("texture has not been loaded"))
    }

    pub fn ty(&self) -> TextureType {
        self.ty
    }

    pub fn target(&self) -> B::TextureTarget {
        self.target
    }

    pub fn native(&self) -> &B::Texture {
        &self.native
    }

    pub fn native_format(&self) -> NativePixelFormat<B::PixelFormat> {
        B::translate_format(self.desc().format)
    }

    pub fn destroy(self) {}

    fn desc_mut(&mut self) -> &mut TextureDesc {
        self.desc
            .as_mut()
            .unwrap_or_else(|| crate::gal_fail!("texture has not been loaded"))
    }

    fn apply_sampling(&self) {
        if self.ty.is_render_target() {
            return;
        }
        let desc = self.desc();
        let sampling = B::translate_sampling(desc.filter, desc.wrap, desc.compare, desc.border_color);
        self.device
            .texture_parameters(&self.native, self.target, sampling, desc.mips.max(1));
    }

    /// 原生存储的尺寸
    fn extent(&self) -> Extent3d {
        let desc = self.desc();
        Extent3d {
            width: desc.width,
            height: if self.ty.is_one_dimensional() { 1 } else { desc.height },
            depth: if self.ty.is_layered() { desc.depth.max(1) } else { 1 },
        }
    }

    fn store(&self, data: Option<&[u8]>) -> Result<()> {
        let desc = self.desc();
        let format = B::translate_format(desc.format);
        let extent = self.extent();
        let required = extent.width as usize
            * extent.height as usize
            * extent.depth as usize
            * desc.format.bytes_per_pixel() as usize;
        if let Some(pixels) = data {
            gal_assert!(
                pixels.len() >= required,
                "texture data of {} bytes is smaller than {}x{}x{} {:?} ({} bytes)",
                pixels.len(),
                extent.width,
                extent.height,
                extent.depth,
                desc.format,
                required
            );
        }

        self.device
            .allocate_texture(&self.native, self.target, &format, extent, desc.mips.max(1))?;

        if let Some(pixels) = data {
            self.device.transfer_pixels(
                &self.native,
                self.target,
                &format,
                extent,
                unpack_alignment(desc.format),
                0,
                &pixels[..required],
            );
            if desc.mips > 1 {
                self.device.generate_mipmaps(&self.native, self.target);
            }
        }
        Ok(())
    }
}

impl<B: Backend> Drop for Texture<B> {
    fn drop(&mut self) {
        self.device.destroy_texture(&self.native);
        tracing::debug!(handle = ?self.native, "Texture destroyed");
    }
}

impl<B: Backend> std::fmt::Debug for Texture<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("native", &self.native)
            .field("ty", &self.ty)
            .field("desc", &self.desc)
            .finish()
    }
}

/// 立方体贴图
///
/// 每个面作为立方体目标的第 `i` 层上传；提供的面数必须等于 `faces_count`。
pub struct Cubemap<B: Backend> {
    device: Rc<B>,
    native: B::Texture,
    target: B::TextureTarget,
    desc: Option<CubemapDesc>,
}

impl<B: Backend> Cubemap<B> {
    pub fn create(ctx: &Context<B>) -> Result<Self> {
        let device = Rc::clone(ctx.device());
        let target = B::cubemap_target();
        let native = device.create_texture(target, TextureType::Texture2D)?;
        tracing::debug!(backend = device.name(), handle = ?native, "Cubemap created");
        Ok(Self {
            device,
            native,
            target,
            desc: None,
        })
    }

    pub fn new(ctx: &Context<B>, desc: &CubemapDesc, faces: &[&[u8]]) -> Result<Self> {
        let mut cubemap = Self::create(ctx)?;
        cubemap.load(desc, faces)?;
        Ok(cubemap)
    }

    /// 设置采样参数、分配 6 个面的存储并逐面上传
    pub fn load(&mut self, desc: &CubemapDesc, faces: &[&[u8]]) -> Result<()> {
        self.desc = Some(*desc);
        let sampling = B::translate_sampling(desc.filter, desc.wrap, None, [0.0; 4]);
        self.device
            .texture_parameters(&self.native, self.target, sampling, desc.mips.max(1));
        self.store(faces)?;
        tracing::debug!(
            width = desc.width,
            height = desc.height,
            faces = desc.faces_count,
            "Cubemap loaded"
        );
        Ok(())
    }

    /// 以新的尺寸重新分配并上传所有面
    pub fn upload_data(&mut self, width: u32, height: u32, faces: &[&[u8]]) -> Result<()> {
        let desc = self
            .desc
            .as_mut()
            .unwrap_or_else(|| crate::gal_fail!("cubemap has not been loaded"));
        desc.width = width;
        desc.height = height;
        self.store(faces)
    }

    pub fn desc(&self) -> &CubemapDesc {
        self.desc
            .as_ref()
            .unwrap_or_else(|| crate::gal_fail!("cubemap has not been loaded"))
    }

    pub fn target(&self) -> B::TextureTarget {
        self.target
    }

    pub fn native(&self) -> &B::Texture {
        &self.native
    }

    pub fn destroy(self) {}

    fn store(&self, faces: &[&[u8]]) -> Result<()> {
        let desc = self.desc();
        gal_assert!(
            desc.faces_count <= CUBEMAP_FACES,
            "cubemap faces_count {} exceeds {}",
            desc.faces_count,
            CUBEMAP_FACES
        );
        gal_assert!(
            faces.len() == desc.faces_count as usize,
            "cubemap expects {} faces, {} supplied",
            desc.faces_count,
            faces.len()
        );

        let face_size = desc.face_size();
        for (layer, face) in faces.iter().enumerate() {
            gal_assert!(
                face.len() >= face_size,
                "cubemap face {} has {} bytes, expected {}",
                layer,
                face.len(),
                face_size
            );
        }

        let format = B::translate_format(desc.format);
        let extent = Extent3d {
            width: desc.width,
            height: desc.height,
            depth: CUBEMAP_FACES,
        };
        self.device
            .allocate_texture(&self.native, self.target, &format, extent, desc.mips.max(1))?;

        for (layer, face) in faces.iter().enumerate() {
            self.device.transfer_pixels(
                &self.native,
                self.target,
                &format,
                Extent3d { depth: 1, ..extent },
                unpack_alignment(desc.format),
                layer as u32,
                &face[..face_size],
            );
        }
        if !faces.is_empty() && desc.mips > 1 {
            self.device.generate_mipmaps(&self.native, self.target);
        }
        Ok(())
    }
}

impl<B: Backend> Drop for Cubemap<B> {
    fn drop(&mut self) {
        self.device.destroy_texture(&self.native);
        tracing::debug!(handle = ?self.native, "Cubemap destroyed");
    }
}

impl<B: Backend> std::fmt::Debug for Cubemap<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cubemap")
            .field("native", &self.native)
            .field("desc", &self.desc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{test_context, NativeCall};
    use crate::renderer::types::{CompareFunc, TextureFilter, TextureWrap};

    #[test]
    fn test_alignment_by_channels() {
        assert_eq!(unpack_alignment(TextureFormat::Rgba8), 4);
        assert_eq!(unpack_alignment(TextureFormat::Rgb8), 1);
        assert_eq!(unpack_alignment(TextureFormat::R32F), 1);
    }

    #[test]
    fn test_load_round_trips_desc() {
        let ctx = test_context();
        let desc = TextureDesc {
            compare: Some(CompareFunc::LessEqual),
            border_color: [1.0, 0.0, 0.0, 1.0],
            ..TextureDesc::new_2d(8, 4, TextureFormat::Rgba16F)
        };
        let texture = Texture::new(&ctx, &desc, None).unwrap();
        assert_eq!(texture.desc(), &desc);
    }

    #[test]
    fn test_reload_reports_new_dimensions() {
        let ctx = test_context();
        let desc = TextureDesc::new_2d(4, 4, TextureFormat::R8);
        let mut texture = Texture::new(&ctx, &desc, Some(&[0u8; 16])).unwrap();

        texture.upload_data(8, 2, 1, Some(&[0u8; 16])).unwrap();
        assert_eq!((texture.desc().width, texture.desc().height), (8, 2));

        let allocations = ctx
            .device()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, NativeCall::TexStorage { .. }))
            .count();
        assert_eq!(allocations, 2);
    }

    #[test]
    fn test_one_dimensional_ignores_height() {
        let ctx = test_context();
        let desc = TextureDesc::new_2d(8, 0, TextureFormat::Rgba8).with_type(TextureType::Texture1D);
        let texture = Texture::new(&ctx, &desc, Some(&[7u8; 32])).unwrap();
        assert_eq!(texture.desc(), &desc);

        let uploads: Vec<NativeCall> = ctx
            .device()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, NativeCall::TexSubImage { .. }))
            .collect();
        assert_eq!(uploads.len(), 1);
        assert!(matches!(
            uploads[0],
            NativeCall::TexSubImage { width: 8, height: 1, depth: 1, size: 32, .. }
        ));
    }

    #[test]
    fn test_upload_data_clamps_unused_dimensions() {
        let ctx = test_context();
        let mut flat = Texture::new(&ctx, &TextureDesc::new_2d(2, 2, TextureFormat::R8), None).unwrap();
        flat.upload_data(4, 4, 9, None).unwrap();
        assert_eq!((flat.desc().height, flat.desc().depth), (4, 1));

        let line_desc = TextureDesc::new_2d(4, 1, TextureFormat::R8).with_type(TextureType::Image1D);
        let mut line = Texture::new(&ctx, &line_desc, None).unwrap();
        line.upload_data(16, 3, 2, None).unwrap();
        assert_eq!((line.desc().width, line.desc().height, line.desc().depth), (16, 1, 1));

        let volume_desc = TextureDesc::new_2d(2, 2, TextureFormat::R8).with_type(TextureType::Texture3D);
        let mut volume = Texture::new(&ctx, &volume_desc, None).unwrap();
        volume.upload_data(2, 2, 5, None).unwrap();
        assert_eq!(volume.desc().depth, 5);
    }

    #[test]
    fn test_short_pixel_data_issues_no_native_work() {
        let ctx = test_context();
        let mut texture = Texture::new(&ctx, &TextureDesc::new_2d(4, 4, TextureFormat::Rgba8), None).unwrap();
        ctx.device().clear_calls();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = texture.upload_data(4, 4, 1, Some(&[0u8; 8]));
        }));
        assert!(result.is_err());
        assert!(ctx.device().calls().is_empty());
    }

    #[test]
    fn test_mips_regenerated_only_with_data() {
        let ctx = test_context();
        let desc = TextureDesc::new_2d(2, 2, TextureFormat::Rgba8).with_mips(2);
        let mut texture = Texture::new(&ctx, &desc, None).unwrap();
        assert!(!ctx.device().calls().iter().any(|c| matches!(c, NativeCall::GenerateMipmap { .. })));

        texture.upload_data(2, 2, 1, Some(&[255u8; 16])).unwrap();
        assert!(ctx.device().calls().iter().any(|c| matches!(c, NativeCall::GenerateMipmap { .. })));
    }

    #[test]
    fn test_update_changes_sampling_only() {
        let ctx = test_context();
        let mut texture = Texture::new(&ctx, &TextureDesc::new_2d(2, 2, TextureFormat::Rgba8), None).unwrap();
        let update = TextureDesc::new_2d(64, 64, TextureFormat::R8)
            .with_sampling(TextureFilter::Nearest, TextureWrap::Repeat);
        texture.update(&update);

        assert_eq!(texture.desc().filter, TextureFilter::Nearest);
        assert_eq!(texture.desc().wrap, TextureWrap::Repeat);
        assert_eq!(texture.desc().width, 2);
        assert_eq!(texture.desc().format, TextureFormat::Rgba8);
    }

    #[test]
    #[should_panic(expected = "cannot load as")]
    fn test_type_is_fixed() {
        let ctx = test_context();
        let mut texture = Texture::create(&ctx, TextureType::Texture2D).unwrap();
        let desc = TextureDesc::new_2d(2, 2, TextureFormat::Rgba8).with_type(TextureType::Image2D);
        texture.load(&desc, None).unwrap();
    }

    #[test]
    fn test_cubemap_uploads_each_face() {
        let ctx = test_context();
        let desc = CubemapDesc {
            width: 2,
            height: 2,
            ..CubemapDesc::default()
        };
        let face = [0u8; 16];
        let faces = [&face[..]; 6];
        let cubemap = Cubemap::new(&ctx, &desc, &faces).unwrap();
        assert_eq!(cubemap.desc(), &desc);

        let layers: Vec<u32> = ctx
            .device()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                NativeCall::TexSubImage { layer, .. } => Some(layer),
                _ => None,
            })
            .collect();
        assert_eq!(layers, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic(expected = "cubemap expects 6 faces")]
    fn test_cubemap_face_count_mismatch() {
        let ctx = test_context();
        let face = [0u8; 4];
        Cubemap::new(&ctx, &CubemapDesc::default(), &[&face[..]; 5]).unwrap();
    }
}
