//! 可移植词汇表
//!
//! 客户端代码只使用本模块中的枚举描述资源和状态，
//! 每个后端再通过 `Translate` 把它们翻译为原生常量。
//!
//! 所有上限都是硬性断言边界：超出时触发前置条件断言，不做静默截断。

use bitflags::bitflags;

/// 同时绑定的纹理（以及图像）槽位上限
pub const TEXTURES_MAX: usize = 16;
/// 同时绑定的立方体贴图槽位上限
pub const CUBEMAPS_MAX: usize = 4;
/// 帧缓冲颜色附件上限
pub const FRAMEBUFFER_ATTACHMENTS_MAX: usize = 8;
/// 顶点绑定上限（0 = 逐顶点流，1 = 逐实例流）
pub const VERTEX_LAYOUTS_MAX: usize = 2;
/// 所有绑定合计的顶点属性上限
pub const VERTEX_ATTRIBUTES_MAX: usize = 16;
/// Uniform / 存储缓冲绑定点上限
pub const UNIFORM_BUFFERS_MAX: usize = 14;
/// 计算调度每个维度的工作组数量上限
pub const MAX_COMPUTE_WORK_GROUPS_COUNT: u32 = 65535;

/// 缓冲区语义类型，创建后固定不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    Vertex,
    Index,
    Uniform,
    ShaderStorage,
}

impl BufferType {
    /// 能否通过 `attach_uniform` 挂到着色器绑定点
    pub fn is_shader_bindable(self) -> bool {
        matches!(self, BufferType::Uniform | BufferType::ShaderStorage)
    }
}

/// 缓冲区使用提示（更新频率 × 访问方向）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StaticRead,
    DynamicRead,
}

/// 图元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// 索引元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// 单个索引的字节数
    pub fn size(self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// 顶点属性类型：float/byte/ubyte/short/ushort/int/uint 的 1~4 分量变体
///
/// 不包含矩阵类型。矩阵属性需要调用方按列逐个提供布局项。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutType {
    Float1, Float2, Float3, Float4,
    Byte1, Byte2, Byte3, Byte4,
    UByte1, UByte2, UByte3, UByte4,
    Short1, Short2, Short3, Short4,
    UShort1, UShort2, UShort3, UShort4,
    Int1, Int2, Int3, Int4,
    UInt1, UInt2, UInt3, UInt4,
}

impl LayoutType {
    /// 分量个数
    pub fn components(self) -> u32 {
        use LayoutType::*;
        match self {
            Float1 | Byte1 | UByte1 | Short1 | UShort1 | Int1 | UInt1 => 1,
            Float2 | Byte2 | UByte2 | Short2 | UShort2 | Int2 | UInt2 => 2,
            Float3 | Byte3 | UByte3 | Short3 | UShort3 | Int3 | UInt3 => 3,
            Float4 | Byte4 | UByte4 | Short4 | UShort4 | Int4 | UInt4 => 4,
        }
    }

    /// 单个分量的字节数
    pub fn component_size(self) -> u32 {
        use LayoutType::*;
        match self {
            Byte1 | Byte2 | Byte3 | Byte4 | UByte1 | UByte2 | UByte3 | UByte4 => 1,
            Short1 | Short2 | Short3 | Short4 | UShort1 | UShort2 | UShort3 | UShort4 => 2,
            Float1 | Float2 | Float3 | Float4 | Int1 | Int2 | Int3 | Int4 | UInt1 | UInt2 | UInt3
            | UInt4 => 4,
        }
    }

    /// 整个属性的字节数
    pub fn byte_size(self) -> u32 {
        self.components() * self.component_size()
    }

    /// 是否以整数形式送入着色器
    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            LayoutType::Float1 | LayoutType::Float2 | LayoutType::Float3 | LayoutType::Float4
        )
    }
}

/// 纹理类型标签
///
/// 最后三种是渲染目标，对应原生的 renderbuffer 类对象而不是可采样图像。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Texture1D,
    Texture2D,
    Texture3D,
    Texture2DArray,
    Image1D,
    Image2D,
    Image3D,
    DepthTarget,
    StencilTarget,
    DepthStencilTarget,
}

impl TextureType {
    /// 是否为深度/模板渲染目标
    pub fn is_render_target(self) -> bool {
        matches!(
            self,
            TextureType::DepthTarget | TextureType::StencilTarget | TextureType::DepthStencilTarget
        )
    }

    /// 是否用于图像读写（image load/store）
    pub fn is_image(self) -> bool {
        matches!(self, TextureType::Image1D | TextureType::Image2D | TextureType::Image3D)
    }

    /// 是否只使用 width 维度
    pub fn is_one_dimensional(self) -> bool {
        matches!(self, TextureType::Texture1D | TextureType::Image1D)
    }

    /// 是否使用 depth 维度
    pub fn is_layered(self) -> bool {
        matches!(
            self,
            TextureType::Texture3D | TextureType::Texture2DArray | TextureType::Image3D
        )
    }
}

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    R16F,
    Rg16F,
    Rgb16F,
    Rgba16F,
    R32F,
    Rg32F,
    Rgb32F,
    Rgba32F,
    R32Ui,
    Depth16,
    Depth24,
    Depth32F,
    Stencil8,
    Depth24Stencil8,
}

impl TextureFormat {
    /// 通道数
    pub fn channels(self) -> u32 {
        use TextureFormat::*;
        match self {
            R8 | R16F | R32F | R32Ui | Depth16 | Depth24 | Depth32F | Stencil8 => 1,
            Rg8 | Rg16F | Rg32F | Depth24Stencil8 => 2,
            Rgb8 | Rgb16F | Rgb32F => 3,
            Rgba8 | Rgba16F | Rgba32F => 4,
        }
    }

    /// 每像素字节数（CPU 侧传输布局）
    pub fn bytes_per_pixel(self) -> u32 {
        use TextureFormat::*;
        match self {
            R8 | Stencil8 => 1,
            Rg8 | R16F | Depth16 => 2,
            Rgb8 => 3,
            Rgba8 | Rg16F | R32F | R32Ui | Depth24 | Depth32F | Depth24Stencil8 => 4,
            Rgb16F => 6,
            Rgba16F | Rg32F => 8,
            Rgb32F => 12,
            Rgba32F => 16,
        }
    }

    /// 是否包含深度分量
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16
                | TextureFormat::Depth24
                | TextureFormat::Depth32F
                | TextureFormat::Depth24Stencil8
        )
    }

    /// 是否包含模板分量
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::Stencil8 | TextureFormat::Depth24Stencil8)
    }
}

/// 纹理过滤方式（缩小过滤；放大过滤由其推导）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    /// 放大过滤是否使用线性插值
    pub fn mag_linear(self) -> bool {
        matches!(
            self,
            TextureFilter::Linear | TextureFilter::LinearMipmapNearest | TextureFilter::LinearMipmapLinear
        )
    }

    /// 缩小过滤是否采样 mip 链
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, TextureFilter::Nearest | TextureFilter::Linear)
    }
}

/// 纹理寻址方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// 比较函数（深度测试、模板测试、阴影采样）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// 模板操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

/// 混合因子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

/// 混合方程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// 剔除面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    Front,
    Back,
}

/// 正面的顶点环绕方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

/// 可开关的全局状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Depth,
    Stencil,
    Blend,
    Cull,
    Scissor,
}

impl StateKind {
    /// 对应的状态位
    pub fn flag(self) -> StateFlags {
        match self {
            StateKind::Depth => StateFlags::DEPTH,
            StateKind::Stencil => StateFlags::STENCIL,
            StateKind::Blend => StateFlags::BLEND,
            StateKind::Cull => StateFlags::CULL,
            StateKind::Scissor => StateFlags::SCISSOR,
        }
    }

    /// 全部状态
    pub const ALL: [StateKind; 5] = [
        StateKind::Depth,
        StateKind::Stencil,
        StateKind::Blend,
        StateKind::Cull,
        StateKind::Scissor,
    ];
}

bitflags! {
    /// `Context` 创建时启用的状态集合
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u32 {
        const DEPTH = 1 << 0;
        const STENCIL = 1 << 1;
        const BLEND = 1 << 2;
        const CULL = 1 << 3;
        const SCISSOR = 1 << 4;
    }
}

bitflags! {
    /// 清除 / 拷贝作用的缓冲区
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// 图像读写访问方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
}

/// 反射得到的 uniform / 属性类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Bool,
    Mat2,
    Mat3,
    Mat4,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DShadow,
    Sampler2DArray,
    Image1D,
    Image2D,
    Image3D,
    Unknown,
}

impl UniformType {
    /// 分量个数（采样器 / 图像按一个整数槽位计）
    pub fn components(self) -> u32 {
        use UniformType::*;
        match self {
            Float | Int | UInt | Bool => 1,
            Vec2 | IVec2 | UVec2 => 2,
            Vec3 | IVec3 | UVec3 => 3,
            Vec4 | IVec4 | UVec4 | Mat2 => 4,
            Mat3 => 9,
            Mat4 => 16,
            Sampler1D | Sampler2D | Sampler3D | SamplerCube | Sampler2DShadow | Sampler2DArray
            | Image1D | Image2D | Image3D => 1,
            Unknown => 0,
        }
    }

    /// 单个元素上传时的字节数
    pub fn byte_size(self) -> usize {
        self.components() as usize * 4
    }

    /// 分量是否为浮点
    pub fn is_float(self) -> bool {
        use UniformType::*;
        matches!(self, Float | Vec2 | Vec3 | Vec4 | Mat2 | Mat3 | Mat4)
    }

    /// 分量是否为无符号整数
    pub fn is_unsigned(self) -> bool {
        matches!(self, UniformType::UInt | UniformType::UVec2 | UniformType::UVec3 | UniformType::UVec4)
    }

    /// 是否为采样器或图像（上传槽位号）
    pub fn is_opaque(self) -> bool {
        use UniformType::*;
        matches!(
            self,
            Sampler1D | Sampler2D | Sampler3D | SamplerCube | Sampler2DShadow | Sampler2DArray | Image1D
                | Image2D | Image3D
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(LayoutType::Float3.byte_size(), 12);
        assert_eq!(LayoutType::UByte4.byte_size(), 4);
        assert_eq!(LayoutType::Short3.byte_size(), 6);
        assert!(LayoutType::Int2.is_integer());
        assert!(!LayoutType::Float1.is_integer());
    }

    #[test]
    fn test_texture_format_properties() {
        assert_eq!(TextureFormat::Rgb8.channels(), 3);
        assert_eq!(TextureFormat::Rgba32F.bytes_per_pixel(), 16);
        assert!(TextureFormat::Depth24Stencil8.is_depth());
        assert!(TextureFormat::Depth24Stencil8.has_stencil());
        assert!(!TextureFormat::Depth32F.has_stencil());
    }

    #[test]
    fn test_texture_type_classes() {
        assert!(TextureType::DepthStencilTarget.is_render_target());
        assert!(TextureType::Image2D.is_image());
        assert!(TextureType::Texture2DArray.is_layered());
        assert!(!TextureType::Texture2D.is_layered());
        assert!(TextureType::Image1D.is_one_dimensional());
        assert!(!TextureType::Texture2D.is_one_dimensional());
    }

    #[test]
    fn test_state_kind_flags_cover_all() {
        let all = StateKind::ALL.iter().fold(StateFlags::empty(), |acc, s| acc | s.flag());
        assert_eq!(all, StateFlags::all());
    }

    #[test]
    fn test_uniform_type_sizes() {
        assert_eq!(UniformType::Mat4.byte_size(), 64);
        assert_eq!(UniformType::Vec3.components(), 3);
        assert!(UniformType::Sampler2D.is_opaque());
        assert!(UniformType::UVec2.is_unsigned());
    }
}
