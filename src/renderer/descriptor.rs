//! 资源与状态描述符
//!
//! 描述符是纯数据：只包含创建/加载资源所需的可移植字段。
//! CPU 侧数据（顶点、像素、源码以外的字节流）以及其它资源的引用
//! 都作为单独参数传入，因此资源的 `desc()` 可以原样返回加载时的描述符。
//!
//! # 描述符一览
//!
//! - **状态**：`DepthDesc`、`StencilDesc`、`BlendDesc`、`CullDesc`
//! - **资源**：`BufferDesc`、`TextureDesc`、`CubemapDesc`、`ShaderDesc`、
//!   `PipelineDesc`、`FramebufferDesc`

use super::types::*;

/// 矩形区域（视口、裁剪、拷贝区域）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// 深度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthDesc {
    /// 深度比较函数
    pub func: CompareFunc,
    /// 是否写入深度
    pub write_mask: bool,
}

impl Default for DepthDesc {
    fn default() -> Self {
        Self {
            func: CompareFunc::Less,
            write_mask: true,
        }
    }
}

/// 单面的模板配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceDesc {
    pub func: CompareFunc,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl Default for StencilFaceDesc {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// 模板状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilDesc {
    pub front: StencilFaceDesc,
    pub back: StencilFaceDesc,
    /// 参考值
    pub reference: i32,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl Default for StencilDesc {
    fn default() -> Self {
        Self {
            front: StencilFaceDesc::default(),
            back: StencilFaceDesc::default(),
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
        }
    }
}

/// 混合状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendDesc {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_rgb: BlendOp,
    pub op_alpha: BlendOp,
    /// 常量混合颜色
    pub constant_color: [f32; 4],
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self {
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            op_rgb: BlendOp::Add,
            op_alpha: BlendOp::Add,
            constant_color: [0.0; 4],
        }
    }
}

impl BlendDesc {
    /// 常规的 alpha 混合
    pub fn alpha() -> Self {
        Self {
            src_rgb: BlendFactor::SrcAlpha,
            dst_rgb: BlendFactor::OneMinusSrcAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
            ..Self::default()
        }
    }
}

/// 剔除状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CullDesc {
    pub mode: CullMode,
    pub front_face: Winding,
}

impl Default for CullDesc {
    fn default() -> Self {
        Self {
            mode: CullMode::Back,
            front_face: Winding::CounterClockwise,
        }
    }
}

/// 缓冲区描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// 逻辑大小（字节）
    pub size: u64,
    /// 语义类型
    pub kind: BufferType,
    /// 使用提示
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn new(size: u64, kind: BufferType, usage: BufferUsage) -> Self {
        Self { size, kind, usage }
    }

    /// 静态顶点缓冲
    pub fn vertex(size: u64) -> Self {
        Self::new(size, BufferType::Vertex, BufferUsage::StaticDraw)
    }

    /// 静态索引缓冲
    pub fn index(size: u64) -> Self {
        Self::new(size, BufferType::Index, BufferUsage::StaticDraw)
    }

    /// 动态 uniform 缓冲
    pub fn uniform(size: u64) -> Self {
        Self::new(size, BufferType::Uniform, BufferUsage::DynamicDraw)
    }
}

/// 纹理描述符
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    /// 3D 纹理的深度或数组层数
    pub depth: u32,
    /// mip 级数，大于 1 时在上传像素后重新生成
    pub mips: u32,
    pub ty: TextureType,
    pub format: TextureFormat,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    /// 设置后启用比较采样
    pub compare: Option<CompareFunc>,
    pub border_color: [f32; 4],
    /// 作为图像绑定时的访问方式
    pub access: ImageAccess,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            mips: 1,
            ty: TextureType::Texture2D,
            format: TextureFormat::Rgba8,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::ClampToEdge,
            compare: None,
            border_color: [0.0; 4],
            access: ImageAccess::ReadOnly,
        }
    }
}

impl TextureDesc {
    /// 2D 纹理
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..Self::default()
        }
    }

    pub fn with_type(mut self, ty: TextureType) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_sampling(mut self, filter: TextureFilter, wrap: TextureWrap) -> Self {
        self.filter = filter;
        self.wrap = wrap;
        self
    }

    pub fn with_mips(mut self, mips: u32) -> Self {
        self.mips = mips;
        self
    }

    /// CPU 侧完整像素数据的字节数
    pub fn data_size(&self) -> usize {
        self.width as usize * self.height as usize * self.depth.max(1) as usize
            * self.format.bytes_per_pixel() as usize
    }
}

/// 立方体贴图描述符
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubemapDesc {
    pub width: u32,
    pub height: u32,
    pub mips: u32,
    pub format: TextureFormat,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    /// 提供像素数据的面数（不超过 6）
    pub faces_count: u32,
}

impl Default for CubemapDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            mips: 1,
            format: TextureFormat::Rgba8,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::ClampToEdge,
            faces_count: 6,
        }
    }
}

impl CubemapDesc {
    /// 单个面的字节数
    pub fn face_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel() as usize
    }
}

/// 着色器源码
///
/// `compute_source` 设置时只构建计算程序，顶点/像素源码被忽略；
/// 否则顶点和像素源码都必须提供。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderDesc<'a> {
    pub vertex_source: Option<&'a str>,
    pub pixel_source: Option<&'a str>,
    pub compute_source: Option<&'a str>,
}

impl<'a> ShaderDesc<'a> {
    pub fn graphics(vertex_source: &'a str, pixel_source: &'a str) -> Self {
        Self {
            vertex_source: Some(vertex_source),
            pixel_source: Some(pixel_source),
            compute_source: None,
        }
    }

    pub fn compute(compute_source: &'a str) -> Self {
        Self {
            compute_source: Some(compute_source),
            ..Self::default()
        }
    }
}

/// 一个顶点绑定上的属性列表（按声明顺序排布）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayoutDesc {
    pub attributes: Vec<LayoutType>,
}

impl VertexLayoutDesc {
    pub fn new(attributes: impl Into<Vec<LayoutType>>) -> Self {
        Self {
            attributes: attributes.into(),
        }
    }
}

/// 管线描述符（缓冲区引用通过 `PipelineBuffers` 单独传入）
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub vertices_count: u32,
    pub indices_count: u32,
    pub indices_type: IndexType,
    /// 绑定 0 为逐顶点流，绑定 1 为逐实例流
    pub layouts: Vec<VertexLayoutDesc>,
    pub draw_mode: DrawMode,
    pub depth_mask: bool,
    pub stencil_ref: i32,
    pub blend_factor: [f32; 4],
}

impl Default for PipelineDesc {
    fn default() -> Self {
        Self {
            vertices_count: 0,
            indices_count: 0,
            indices_type: IndexType::U32,
            layouts: Vec::new(),
            draw_mode: DrawMode::Triangles,
            depth_mask: true,
            stencil_ref: 0,
            blend_factor: [0.0; 4],
        }
    }
}

impl PipelineDesc {
    pub fn new(vertices_count: u32, layout: VertexLayoutDesc) -> Self {
        Self {
            vertices_count,
            layouts: vec![layout],
            ..Self::default()
        }
    }

    pub fn with_indices(mut self, indices_count: u32, indices_type: IndexType) -> Self {
        self.indices_count = indices_count;
        self.indices_type = indices_type;
        self
    }

    pub fn with_instance_layout(mut self, layout: VertexLayoutDesc) -> Self {
        self.layouts.push(layout);
        self
    }

    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }
}

/// 帧缓冲描述符（附件通过 `FramebufferAttachments` 单独传入）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDesc {
    /// 该帧缓冲作为目标时 `clear` 作用的缓冲区
    pub clear_flags: ClearFlags,
}

impl Default for FramebufferDesc {
    fn default() -> Self {
        Self {
            clear_flags: ClearFlags::COLOR,
        }
    }
}

/// 一个拷贝区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRegion {
    pub src: Rect,
    pub dst: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_data_size() {
        let desc = TextureDesc::new_2d(4, 2, TextureFormat::Rgb8);
        assert_eq!(desc.data_size(), 24);

        let volume = TextureDesc {
            depth: 3,
            ..TextureDesc::new_2d(2, 2, TextureFormat::R32F)
        };
        assert_eq!(volume.data_size(), 48);
    }

    #[test]
    fn test_pipeline_builder() {
        let desc = PipelineDesc::new(4, VertexLayoutDesc::new([LayoutType::Float3]))
            .with_indices(6, IndexType::U16)
            .with_draw_mode(DrawMode::TriangleStrip);
        assert_eq!(desc.indices_count, 6);
        assert_eq!(desc.layouts.len(), 1);
        assert_eq!(desc.draw_mode, DrawMode::TriangleStrip);
    }

    #[test]
    fn test_shader_desc_modes() {
        let compute = ShaderDesc::compute("void main() {}");
        assert!(compute.vertex_source.is_none());
        let graphics = ShaderDesc::graphics("vs", "ps");
        assert!(graphics.compute_source.is_none());
    }
}
