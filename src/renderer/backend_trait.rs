//! 统一的设备后端接口
//!
//! 本模块定义了所有原生后端（OpenGL、Direct3D 11、无头记录后端）都必须实现的能力集合。
//! 共享层（`Context`、资源对象、管线）只针对 `Backend` 编写一次，
//! 后端在编译期通过泛型参数选定，不在共享代码中做条件编译。
//!
//! # 设计理念
//!
//! - **翻译在共享层完成**：共享层先用 `Translate` 把可移植值翻译成原生值，再交给设备方法
//! - **句柄归资源所有**：设备只负责创建 / 销毁原生句柄，释放时机由资源对象的 `Drop` 决定
//! - **内部可变**：所有方法都接收 `&self`，单线程契约下后端自行使用 `Cell` / `RefCell`
//!
//! # 示例
//!
//! ```ignore
//! let device = HeadlessDevice::init(surface, true)?;
//! let buffer = device.create_buffer()?;
//! device.buffer_storage(&buffer, target, usage, 64, Some(&bytes))?;
//! ```

use std::fmt::Debug;
use std::rc::Rc;

use crate::core::error::Result;
use crate::gfx::backend::NativeSurface;

use super::descriptor::{BlitRegion, Rect};
use super::shader::ShaderQueryDesc;
use super::translate::{NativeBlend, NativePixelFormat, NativeSampling, StencilFaceOps, Translate};
use super::types::{ShaderStage, StateKind, TextureFormat, TextureType, UniformType};
use super::vertex::CompiledLayout;

/// 设备上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// 2D 纹理最大边长
    pub max_texture_size: u32,
    /// 计算调度每个维度的最大工作组数
    pub max_compute_work_groups: [u32; 3],
    /// 顶点属性个数上限
    pub max_vertex_attributes: u32,
    /// uniform 缓冲绑定点个数上限
    pub max_uniform_buffer_bindings: u32,
}

/// 纹理存储的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// 程序构建所需的各阶段源码
///
/// 两种模式互斥：计算程序只有一个阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStages<'a> {
    Graphics { vertex: &'a str, pixel: &'a str },
    Compute { compute: &'a str },
}

/// 编译 / 链接结果
///
/// 失败不是致命错误，诊断文本保留给调用方查看。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: bool,
    pub log: String,
}

impl LinkReport {
    pub fn success() -> Self {
        Self {
            linked: true,
            log: String::new(),
        }
    }

    pub fn failure(log: impl Into<String>) -> Self {
        Self {
            linked: false,
            log: log.into(),
        }
    }
}

/// 深度 / 模板附件挂载点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthAttachmentPoint {
    Depth,
    Stencil,
    DepthStencil,
}

impl DepthAttachmentPoint {
    /// 按纹理类型选择挂载点；可采样纹理按像素格式判断
    pub fn for_texture(ty: TextureType, format: TextureFormat) -> Self {
        match ty {
            TextureType::DepthTarget => DepthAttachmentPoint::Depth,
            TextureType::StencilTarget => DepthAttachmentPoint::Stencil,
            TextureType::DepthStencilTarget => DepthAttachmentPoint::DepthStencil,
            _ if format.is_depth() && format.has_stencil() => DepthAttachmentPoint::DepthStencil,
            _ if format.has_stencil() => DepthAttachmentPoint::Stencil,
            _ => DepthAttachmentPoint::Depth,
        }
    }
}

/// 输入装配读取的缓冲区
pub struct InputStreams<'a, B: Backend> {
    /// 绑定 0
    pub vertex: &'a B::Buffer,
    /// 绑定 1
    pub instance: Option<&'a B::Buffer>,
    pub index: Option<&'a B::Buffer>,
}

/// 原生设备能力集合
///
/// 方法按资源类别分组；每个资源类别都有 create / 变更 / destroy 三段。
pub trait Backend: Translate + Sized + 'static {
    type Buffer: Debug;
    type Texture: Debug;
    type Shader: Debug;
    type InputAssembly: Debug;
    type Framebuffer: Debug;

    /// 后端名称，用于日志
    fn name(&self) -> &'static str;

    /// 创建设备与交换链
    ///
    /// # 参数
    ///
    /// * `surface` - 窗口系统提供的原生表面
    /// * `vsync` - 是否开启垂直同步
    ///
    /// # 返回值
    ///
    /// 设备创建失败时返回 `GraphicsError::DeviceCreation` / `SwapchainError`
    fn init(surface: Rc<dyn NativeSurface>, vsync: bool) -> Result<Self>;

    fn limits(&self) -> DeviceLimits;

    // ---- 全局状态 ----

    fn set_capability(&self, state: StateKind, enabled: bool);
    fn apply_depth_state(&self, func: Self::Compare, write_mask: bool);
    fn apply_stencil_state(
        &self,
        front: StencilFaceOps<Self::Compare, Self::StencilOp>,
        back: StencilFaceOps<Self::Compare, Self::StencilOp>,
        reference: i32,
        read_mask: u32,
        write_mask: u32,
    );
    fn apply_blend_state(&self, blend: NativeBlend<Self::BlendFactor, Self::BlendOp>);
    fn apply_cull_state(&self, mode: Self::CullMode, front_face: Self::Winding);
    fn set_viewport(&self, rect: Rect);
    fn set_scissor_rect(&self, rect: Rect);

    /// 切换渲染目标，`None` 表示默认后缓冲
    fn bind_target(&self, target: Option<&Self::Framebuffer>);
    fn clear(
        &self,
        target: Option<&Self::Framebuffer>,
        mask: Self::ClearMask,
        color: [f32; 4],
        depth: f32,
        stencil: i32,
    );

    // ---- 缓冲区 ----

    fn create_buffer(&self) -> Result<Self::Buffer>;
    /// 重新分配整块存储，`data` 为空时内容未定义
    fn buffer_storage(
        &self,
        buffer: &Self::Buffer,
        target: Self::BufferTarget,
        usage: Self::BufferUsage,
        size: usize,
        data: Option<&[u8]>,
    ) -> Result<()>;
    fn buffer_sub_data(&self, buffer: &Self::Buffer, target: Self::BufferTarget, offset: usize, data: &[u8]);
    fn destroy_buffer(&self, buffer: &Self::Buffer);

    // ---- 纹理 ----

    fn create_texture(&self, target: Self::TextureTarget, ty: TextureType) -> Result<Self::Texture>;
    fn texture_parameters(
        &self,
        texture: &Self::Texture,
        target: Self::TextureTarget,
        sampling: NativeSampling<Self::Filter, Self::Wrap, Self::Compare>,
        mips: u32,
    );
    /// 分配存储；尺寸可能与上次不同，旧存储一律作废
    fn allocate_texture(
        &self,
        texture: &Self::Texture,
        target: Self::TextureTarget,
        format: &NativePixelFormat<Self::PixelFormat>,
        extent: Extent3d,
        mips: u32,
    ) -> Result<()>;
    /// 传输像素；`layer` 为立方体贴图的面索引，其他目标为 0
    fn transfer_pixels(
        &self,
        texture: &Self::Texture,
        target: Self::TextureTarget,
        format: &NativePixelFormat<Self::PixelFormat>,
        extent: Extent3d,
        alignment: u32,
        layer: u32,
        data: &[u8],
    );
    fn generate_mipmaps(&self, texture: &Self::Texture, target: Self::TextureTarget);
    fn destroy_texture(&self, texture: &Self::Texture);

    // ---- 着色器 ----

    fn create_shader(&self) -> Result<Self::Shader>;
    fn build_program(&self, shader: &Self::Shader, stages: &ShaderStages<'_>) -> LinkReport;
    /// 反射最近一次成功链接的程序
    fn reflect(&self, shader: &Self::Shader) -> ShaderQueryDesc;
    fn use_shader(&self, shader: &Self::Shader);
    fn bind_uniform_buffer(
        &self,
        shader: &Self::Shader,
        stage: ShaderStage,
        buffer: &Self::Buffer,
        target: Self::BufferTarget,
        bind_point: u32,
    );
    /// `location` 已保证不为 -1
    fn upload_uniform(
        &self,
        shader: &Self::Shader,
        location: i32,
        ty: UniformType,
        count: u32,
        data: &[u8],
    );
    fn destroy_shader(&self, shader: &Self::Shader);

    // ---- 资源绑定 ----

    fn bind_texture(&self, unit: u32, target: Self::TextureTarget, texture: &Self::Texture);
    fn bind_image(
        &self,
        unit: u32,
        texture: &Self::Texture,
        format: Self::PixelFormat,
        access: Self::ImageAccess,
    );

    // ---- 输入装配 ----

    fn create_input_assembly(&self) -> Result<Self::InputAssembly>;
    fn configure_input_assembly(
        &self,
        assembly: &Self::InputAssembly,
        layout: &CompiledLayout<Self::VertexFormat>,
        streams: InputStreams<'_, Self>,
    );
    fn bind_input_assembly(&self, assembly: &Self::InputAssembly);
    fn destroy_input_assembly(&self, assembly: &Self::InputAssembly);

    // ---- 提交 ----

    /// 非索引绘制，`instances` 为 1 时走普通绘制
    fn draw(&self, mode: Self::Primitive, first: u32, count: u32, instances: u32);
    /// 索引绘制，`first` 以索引为单位
    fn draw_indexed(
        &self,
        mode: Self::Primitive,
        format: Self::IndexFormat,
        index_size: u32,
        first: u32,
        count: u32,
        instances: u32,
    );
    fn dispatch(&self, x: u32, y: u32, z: u32);
    fn memory_barrier(&self, mask: Self::BarrierMask);
    /// 唯一允许阻塞的提交点
    fn present(&self, vsync: bool) -> Result<()>;

    // ---- 帧缓冲 ----

    fn create_framebuffer(&self) -> Result<Self::Framebuffer>;
    fn attach_color(
        &self,
        framebuffer: &Self::Framebuffer,
        index: u32,
        texture: &Self::Texture,
        target: Self::TextureTarget,
    );
    fn attach_depth_stencil(
        &self,
        framebuffer: &Self::Framebuffer,
        texture: &Self::Texture,
        target: Self::TextureTarget,
        point: DepthAttachmentPoint,
    );
    fn set_draw_buffers(&self, framebuffer: &Self::Framebuffer, count: u32);
    fn framebuffer_complete(&self, framebuffer: &Self::Framebuffer) -> bool;
    /// 最近点过滤的区域拷贝
    fn blit(
        &self,
        src: Option<&Self::Framebuffer>,
        dst: Option<&Self::Framebuffer>,
        region: BlitRegion,
        mask: Self::ClearMask,
    );
    fn destroy_framebuffer(&self, framebuffer: &Self::Framebuffer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_attachment_point() {
        assert_eq!(
            DepthAttachmentPoint::for_texture(TextureType::DepthStencilTarget, TextureFormat::Depth24Stencil8),
            DepthAttachmentPoint::DepthStencil
        );
        assert_eq!(
            DepthAttachmentPoint::for_texture(TextureType::Texture2D, TextureFormat::Depth32F),
            DepthAttachmentPoint::Depth
        );
        assert_eq!(
            DepthAttachmentPoint::for_texture(TextureType::StencilTarget, TextureFormat::Stencil8),
            DepthAttachmentPoint::Stencil
        );
    }
}
