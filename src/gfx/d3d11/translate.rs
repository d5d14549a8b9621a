//! Direct3D 11 词汇表
//!
//! D3D11 用状态对象和视图描述代替 GL 的枚举开关，因此部分类别的原生值
//! 不是单个常量：清除 / 屏障 / 图像访问直接沿用可移植位集，
//! 绕序是光栅化描述中的 `FrontCounterClockwise` 布尔值。
//!
//! 像素格式三元组的含义与 GL 不同：
//! `internal` 是资源格式（深度格式为 typeless），`transfer` 是着色器资源视图格式，
//! `element` 是渲染目标 / 深度模板视图格式。

use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::bidirectional_table;
use crate::renderer::sync::BarrierFlags;
use crate::renderer::translate::{NativePixelFormat, NativeVertexFormat, Translate};
use crate::renderer::types::*;

use super::device::D3d11Device;

/// 反射得到的 HLSL 变量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3dVariableType {
    pub class: D3D_SHADER_VARIABLE_CLASS,
    pub base: D3D_SHADER_VARIABLE_TYPE,
    pub rows: u32,
    pub columns: u32,
}

impl D3dVariableType {
    const fn scalar(base: D3D_SHADER_VARIABLE_TYPE) -> Self {
        Self { class: D3D_SVC_SCALAR, base, rows: 1, columns: 1 }
    }

    const fn vector(base: D3D_SHADER_VARIABLE_TYPE, columns: u32) -> Self {
        Self { class: D3D_SVC_VECTOR, base, rows: 1, columns }
    }

    const fn matrix(n: u32) -> Self {
        Self { class: D3D_SVC_MATRIX_COLUMNS, base: D3D_SVT_FLOAT, rows: n, columns: n }
    }

    const fn object(base: D3D_SHADER_VARIABLE_TYPE) -> Self {
        Self { class: D3D_SVC_OBJECT, base, rows: 0, columns: 0 }
    }

    /// 行主序矩阵与列主序矩阵按同一种可移植类型处理
    pub fn normalized(self) -> Self {
        if self.class == D3D_SVC_MATRIX_ROWS {
            Self { class: D3D_SVC_MATRIX_COLUMNS, ..self }
        } else {
            self
        }
    }
}

bidirectional_table! {
    pub fn bind_flag / buffer_type_of (BufferType => D3D11_BIND_FLAG) {
        BufferType::Vertex => D3D11_BIND_VERTEX_BUFFER,
        BufferType::Index => D3D11_BIND_INDEX_BUFFER,
        BufferType::Uniform => D3D11_BIND_CONSTANT_BUFFER,
        BufferType::ShaderStorage => D3D11_BIND_UNORDERED_ACCESS,
    }
}

bidirectional_table! {
    /// 读回类用途在 D3D11 中没有对应的 GPU 端提示，全部落到默认用途
    pub fn usage / buffer_usage_of (BufferUsage => D3D11_USAGE) {
        BufferUsage::StaticDraw => D3D11_USAGE_DEFAULT,
        BufferUsage::DynamicDraw => D3D11_USAGE_DYNAMIC,
        BufferUsage::StaticRead => D3D11_USAGE_DEFAULT,
        BufferUsage::DynamicRead => D3D11_USAGE_DEFAULT,
    }
}

bidirectional_table! {
    pub fn topology / draw_mode_of (DrawMode => D3D_PRIMITIVE_TOPOLOGY) {
        DrawMode::Points => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        DrawMode::Lines => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        DrawMode::LineStrip => D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        DrawMode::Triangles => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        DrawMode::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

bidirectional_table! {
    pub fn index_format / index_type_of (IndexType => DXGI_FORMAT) {
        IndexType::U16 => DXGI_FORMAT_R16_UINT,
        IndexType::U32 => DXGI_FORMAT_R32_UINT,
    }
}

bidirectional_table! {
    /// 渲染目标没有着色器资源视图
    pub fn view_dimension / texture_type_of (TextureType => D3D_SRV_DIMENSION) {
        TextureType::Texture1D => D3D_SRV_DIMENSION_TEXTURE1D,
        TextureType::Texture2D => D3D_SRV_DIMENSION_TEXTURE2D,
        TextureType::Texture3D => D3D_SRV_DIMENSION_TEXTURE3D,
        TextureType::Texture2DArray => D3D_SRV_DIMENSION_TEXTURE2DARRAY,
        TextureType::Image1D => D3D_SRV_DIMENSION_TEXTURE1D,
        TextureType::Image2D => D3D_SRV_DIMENSION_TEXTURE2D,
        TextureType::Image3D => D3D_SRV_DIMENSION_TEXTURE3D,
        TextureType::DepthTarget => D3D_SRV_DIMENSION_UNKNOWN,
        TextureType::StencilTarget => D3D_SRV_DIMENSION_UNKNOWN,
        TextureType::DepthStencilTarget => D3D_SRV_DIMENSION_UNKNOWN,
    }
}

bidirectional_table! {
    /// 资源格式
    pub fn resource_format / texture_format_of (TextureFormat => DXGI_FORMAT) {
        TextureFormat::R8 => DXGI_FORMAT_R8_UNORM,
        TextureFormat::Rg8 => DXGI_FORMAT_R8G8_UNORM,
        TextureFormat::Rgb8 => DXGI_FORMAT_R8G8B8A8_UNORM,
        TextureFormat::Rgba8 => DXGI_FORMAT_R8G8B8A8_UNORM,
        TextureFormat::R16F => DXGI_FORMAT_R16_FLOAT,
        TextureFormat::Rg16F => DXGI_FORMAT_R16G16_FLOAT,
        TextureFormat::Rgb16F => DXGI_FORMAT_R16G16B16A16_FLOAT,
        TextureFormat::Rgba16F => DXGI_FORMAT_R16G16B16A16_FLOAT,
        TextureFormat::R32F => DXGI_FORMAT_R32_FLOAT,
        TextureFormat::Rg32F => DXGI_FORMAT_R32G32_FLOAT,
        TextureFormat::Rgb32F => DXGI_FORMAT_R32G32B32_FLOAT,
        TextureFormat::Rgba32F => DXGI_FORMAT_R32G32B32A32_FLOAT,
        TextureFormat::R32Ui => DXGI_FORMAT_R32_UINT,
        TextureFormat::Depth16 => DXGI_FORMAT_R16_TYPELESS,
        TextureFormat::Depth24 => DXGI_FORMAT_R24G8_TYPELESS,
        TextureFormat::Depth32F => DXGI_FORMAT_R32_TYPELESS,
        TextureFormat::Stencil8 => DXGI_FORMAT_R24G8_TYPELESS,
        TextureFormat::Depth24Stencil8 => DXGI_FORMAT_R24G8_TYPELESS,
    }
}

bidirectional_table! {
    pub fn filter / texture_filter_of (TextureFilter => D3D11_FILTER) {
        TextureFilter::Nearest => D3D11_FILTER_MIN_MAG_MIP_POINT,
        TextureFilter::Linear => D3D11_FILTER_MIN_MAG_LINEAR_MIP_POINT,
        TextureFilter::NearestMipmapNearest => D3D11_FILTER_MIN_MAG_MIP_POINT,
        TextureFilter::LinearMipmapNearest => D3D11_FILTER_MIN_MAG_LINEAR_MIP_POINT,
        TextureFilter::NearestMipmapLinear => D3D11_FILTER_MIN_MAG_POINT_MIP_LINEAR,
        TextureFilter::LinearMipmapLinear => D3D11_FILTER_MIN_MAG_MIP_LINEAR,
    }
}

bidirectional_table! {
    /// 深度比较采样
    pub fn comparison_filter / comparison_filter_of (TextureFilter => D3D11_FILTER) {
        TextureFilter::Nearest => D3D11_FILTER_COMPARISON_MIN_MAG_MIP_POINT,
        TextureFilter::Linear => D3D11_FILTER_COMPARISON_MIN_MAG_LINEAR_MIP_POINT,
        TextureFilter::NearestMipmapNearest => D3D11_FILTER_COMPARISON_MIN_MAG_MIP_POINT,
        TextureFilter::LinearMipmapNearest => D3D11_FILTER_COMPARISON_MIN_MAG_LINEAR_MIP_POINT,
        TextureFilter::NearestMipmapLinear => D3D11_FILTER_COMPARISON_MIN_MAG_POINT_MIP_LINEAR,
        TextureFilter::LinearMipmapLinear => D3D11_FILTER_COMPARISON_MIN_MAG_MIP_LINEAR,
    }
}

bidirectional_table! {
    pub fn address_mode / texture_wrap_of (TextureWrap => D3D11_TEXTURE_ADDRESS_MODE) {
        TextureWrap::Repeat => D3D11_TEXTURE_ADDRESS_WRAP,
        TextureWrap::MirroredRepeat => D3D11_TEXTURE_ADDRESS_MIRROR,
        TextureWrap::ClampToEdge => D3D11_TEXTURE_ADDRESS_CLAMP,
        TextureWrap::ClampToBorder => D3D11_TEXTURE_ADDRESS_BORDER,
    }
}

bidirectional_table! {
    pub fn comparison_func / compare_func_of (CompareFunc => D3D11_COMPARISON_FUNC) {
        CompareFunc::Never => D3D11_COMPARISON_NEVER,
        CompareFunc::Less => D3D11_COMPARISON_LESS,
        CompareFunc::Equal => D3D11_COMPARISON_EQUAL,
        CompareFunc::LessEqual => D3D11_COMPARISON_LESS_EQUAL,
        CompareFunc::Greater => D3D11_COMPARISON_GREATER,
        CompareFunc::NotEqual => D3D11_COMPARISON_NOT_EQUAL,
        CompareFunc::GreaterEqual => D3D11_COMPARISON_GREATER_EQUAL,
        CompareFunc::Always => D3D11_COMPARISON_ALWAYS,
    }
}

bidirectional_table! {
    /// GL 的 INCR / DECR 是饱和运算，对应 D3D11 的 `_SAT` 版本
    pub fn stencil_op / stencil_op_of (StencilOp => D3D11_STENCIL_OP) {
        StencilOp::Keep => D3D11_STENCIL_OP_KEEP,
        StencilOp::Zero => D3D11_STENCIL_OP_ZERO,
        StencilOp::Replace => D3D11_STENCIL_OP_REPLACE,
        StencilOp::Increment => D3D11_STENCIL_OP_INCR_SAT,
        StencilOp::IncrementWrap => D3D11_STENCIL_OP_INCR,
        StencilOp::Decrement => D3D11_STENCIL_OP_DECR_SAT,
        StencilOp::DecrementWrap => D3D11_STENCIL_OP_DECR,
        StencilOp::Invert => D3D11_STENCIL_OP_INVERT,
    }
}

bidirectional_table! {
    pub fn blend / blend_factor_of (BlendFactor => D3D11_BLEND) {
        BlendFactor::Zero => D3D11_BLEND_ZERO,
        BlendFactor::One => D3D11_BLEND_ONE,
        BlendFactor::SrcColor => D3D11_BLEND_SRC_COLOR,
        BlendFactor::OneMinusSrcColor => D3D11_BLEND_INV_SRC_COLOR,
        BlendFactor::DstColor => D3D11_BLEND_DEST_COLOR,
        BlendFactor::OneMinusDstColor => D3D11_BLEND_INV_DEST_COLOR,
        BlendFactor::SrcAlpha => D3D11_BLEND_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => D3D11_BLEND_INV_SRC_ALPHA,
        BlendFactor::DstAlpha => D3D11_BLEND_DEST_ALPHA,
        BlendFactor::OneMinusDstAlpha => D3D11_BLEND_INV_DEST_ALPHA,
        BlendFactor::ConstantColor => D3D11_BLEND_BLEND_FACTOR,
        BlendFactor::OneMinusConstantColor => D3D11_BLEND_INV_BLEND_FACTOR,
        BlendFactor::SrcAlphaSaturate => D3D11_BLEND_SRC_ALPHA_SAT,
    }
}

bidirectional_table! {
    pub fn blend_op / blend_op_of (BlendOp => D3D11_BLEND_OP) {
        BlendOp::Add => D3D11_BLEND_OP_ADD,
        BlendOp::Subtract => D3D11_BLEND_OP_SUBTRACT,
        BlendOp::ReverseSubtract => D3D11_BLEND_OP_REV_SUBTRACT,
        BlendOp::Min => D3D11_BLEND_OP_MIN,
        BlendOp::Max => D3D11_BLEND_OP_MAX,
    }
}

bidirectional_table! {
    pub fn cull_mode / cull_mode_of (CullMode => D3D11_CULL_MODE) {
        CullMode::Front => D3D11_CULL_FRONT,
        CullMode::Back => D3D11_CULL_BACK,
    }
}

bidirectional_table! {
    /// `FrontCounterClockwise`
    pub fn front_counter_clockwise / winding_of (Winding => bool) {
        Winding::Clockwise => false,
        Winding::CounterClockwise => true,
    }
}

bidirectional_table! {
    /// 采样器 / 图像在常量缓冲之外，类别为 `D3D_SVC_OBJECT`。
    /// HLSL 没有独立的阴影采样类型，反查时得到 `Sampler2D`
    pub fn variable_type / uniform_type_of (UniformType => D3dVariableType) {
        UniformType::Float => D3dVariableType::scalar(D3D_SVT_FLOAT),
        UniformType::Vec2 => D3dVariableType::vector(D3D_SVT_FLOAT, 2),
        UniformType::Vec3 => D3dVariableType::vector(D3D_SVT_FLOAT, 3),
        UniformType::Vec4 => D3dVariableType::vector(D3D_SVT_FLOAT, 4),
        UniformType::Int => D3dVariableType::scalar(D3D_SVT_INT),
        UniformType::IVec2 => D3dVariableType::vector(D3D_SVT_INT, 2),
        UniformType::IVec3 => D3dVariableType::vector(D3D_SVT_INT, 3),
        UniformType::IVec4 => D3dVariableType::vector(D3D_SVT_INT, 4),
        UniformType::UInt => D3dVariableType::scalar(D3D_SVT_UINT),
        UniformType::UVec2 => D3dVariableType::vector(D3D_SVT_UINT, 2),
        UniformType::UVec3 => D3dVariableType::vector(D3D_SVT_UINT, 3),
        UniformType::UVec4 => D3dVariableType::vector(D3D_SVT_UINT, 4),
        UniformType::Bool => D3dVariableType::scalar(D3D_SVT_BOOL),
        UniformType::Mat2 => D3dVariableType::matrix(2),
        UniformType::Mat3 => D3dVariableType::matrix(3),
        UniformType::Mat4 => D3dVariableType::matrix(4),
        UniformType::Sampler1D => D3dVariableType::object(D3D_SVT_TEXTURE1D),
        UniformType::Sampler2D => D3dVariableType::object(D3D_SVT_TEXTURE2D),
        UniformType::Sampler3D => D3dVariableType::object(D3D_SVT_TEXTURE3D),
        UniformType::SamplerCube => D3dVariableType::object(D3D_SVT_TEXTURECUBE),
        UniformType::Sampler2DShadow => D3dVariableType::object(D3D_SVT_TEXTURE2D),
        UniformType::Sampler2DArray => D3dVariableType::object(D3D_SVT_TEXTURE2DARRAY),
        UniformType::Image1D => D3dVariableType::object(D3D_SVT_RWTEXTURE1D),
        UniformType::Image2D => D3dVariableType::object(D3D_SVT_RWTEXTURE2D),
        UniformType::Image3D => D3dVariableType::object(D3D_SVT_RWTEXTURE3D),
        UniformType::Unknown => D3dVariableType::object(D3D_SVT_VOID),
    }
}

/// 绑定描述中的资源维度转成反射类型
pub fn resource_variable_type(input: D3D_SHADER_INPUT_TYPE, dimension: D3D_SRV_DIMENSION) -> D3dVariableType {
    let base = match (input == D3D_SIT_UAV_RWTYPED, dimension) {
        (false, D3D_SRV_DIMENSION_TEXTURE1D) => D3D_SVT_TEXTURE1D,
        (false, D3D_SRV_DIMENSION_TEXTURE2D) => D3D_SVT_TEXTURE2D,
        (false, D3D_SRV_DIMENSION_TEXTURE3D) => D3D_SVT_TEXTURE3D,
        (false, D3D_SRV_DIMENSION_TEXTURECUBE) => D3D_SVT_TEXTURECUBE,
        (false, D3D_SRV_DIMENSION_TEXTURE2DARRAY) => D3D_SVT_TEXTURE2DARRAY,
        (true, D3D_SRV_DIMENSION_TEXTURE1D) => D3D_SVT_RWTEXTURE1D,
        (true, D3D_SRV_DIMENSION_TEXTURE2D) => D3D_SVT_RWTEXTURE2D,
        (true, D3D_SRV_DIMENSION_TEXTURE3D) => D3D_SVT_RWTEXTURE3D,
        _ => D3D_SVT_VOID,
    };
    D3dVariableType::object(base)
}

/// 输入签名中的分量类型与掩码转成反射类型
pub fn signature_variable_type(component: D3D_REGISTER_COMPONENT_TYPE, mask: u8) -> D3dVariableType {
    let base = match component {
        D3D_REGISTER_COMPONENT_SINT32 => D3D_SVT_INT,
        D3D_REGISTER_COMPONENT_UINT32 => D3D_SVT_UINT,
        D3D_REGISTER_COMPONENT_FLOAT32 => D3D_SVT_FLOAT,
        _ => return D3dVariableType::object(D3D_SVT_VOID),
    };
    match mask.count_ones() {
        1 => D3dVariableType::scalar(base),
        n => D3dVariableType::vector(base, n),
    }
}

/// 顶点属性格式
///
/// DXGI 没有 3 分量的 8 / 16 位格式，这些类型读取 4 分量格式；
/// 步长仍按 3 分量计算，多读的分量被着色器忽略。
pub fn vertex_format(ty: LayoutType) -> NativeVertexFormat<DXGI_FORMAT> {
    use LayoutType::*;
    let format = match ty {
        Float1 => DXGI_FORMAT_R32_FLOAT,
        Float2 => DXGI_FORMAT_R32G32_FLOAT,
        Float3 => DXGI_FORMAT_R32G32B32_FLOAT,
        Float4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
        Byte1 => DXGI_FORMAT_R8_SINT,
        Byte2 => DXGI_FORMAT_R8G8_SINT,
        Byte3 | Byte4 => DXGI_FORMAT_R8G8B8A8_SINT,
        UByte1 => DXGI_FORMAT_R8_UINT,
        UByte2 => DXGI_FORMAT_R8G8_UINT,
        UByte3 | UByte4 => DXGI_FORMAT_R8G8B8A8_UINT,
        Short1 => DXGI_FORMAT_R16_SINT,
        Short2 => DXGI_FORMAT_R16G16_SINT,
        Short3 | Short4 => DXGI_FORMAT_R16G16B16A16_SINT,
        UShort1 => DXGI_FORMAT_R16_UINT,
        UShort2 => DXGI_FORMAT_R16G16_UINT,
        UShort3 | UShort4 => DXGI_FORMAT_R16G16B16A16_UINT,
        Int1 => DXGI_FORMAT_R32_SINT,
        Int2 => DXGI_FORMAT_R32G32_SINT,
        Int3 => DXGI_FORMAT_R32G32B32_SINT,
        Int4 => DXGI_FORMAT_R32G32B32A32_SINT,
        UInt1 => DXGI_FORMAT_R32_UINT,
        UInt2 => DXGI_FORMAT_R32G32_UINT,
        UInt3 => DXGI_FORMAT_R32G32B32_UINT,
        UInt4 => DXGI_FORMAT_R32G32B32A32_UINT,
    };
    NativeVertexFormat {
        format,
        components: ty.components(),
        size: ty.byte_size(),
        integer: ty.is_integer(),
    }
}

/// (资源格式, 着色器资源视图格式, 渲染目标 / 深度模板视图格式)
pub fn pixel_format(format: TextureFormat) -> NativePixelFormat<DXGI_FORMAT> {
    use TextureFormat::*;
    let internal = resource_format(format);
    let (transfer, element) = match format {
        Depth16 => (DXGI_FORMAT_R16_UNORM, DXGI_FORMAT_D16_UNORM),
        Depth24 | Depth24Stencil8 => (DXGI_FORMAT_R24_UNORM_X8_TYPELESS, DXGI_FORMAT_D24_UNORM_S8_UINT),
        Depth32F => (DXGI_FORMAT_R32_FLOAT, DXGI_FORMAT_D32_FLOAT),
        Stencil8 => (DXGI_FORMAT_X24_TYPELESS_G8_UINT, DXGI_FORMAT_D24_UNORM_S8_UINT),
        _ => (internal, internal),
    };
    NativePixelFormat {
        internal,
        transfer,
        element,
        channels: format.channels(),
        bytes_per_pixel: format.bytes_per_pixel(),
    }
}

/// 资源格式是否比源数据多出一个 alpha 分量
pub fn expands_to_rgba(format: &NativePixelFormat<DXGI_FORMAT>) -> bool {
    format.channels == 3
        && matches!(
            format.internal,
            DXGI_FORMAT_R8G8B8A8_UNORM | DXGI_FORMAT_R16G16B16A16_FLOAT
        )
}

impl Translate for D3d11Device {
    type BufferTarget = D3D11_BIND_FLAG;
    type BufferUsage = D3D11_USAGE;
    type Primitive = D3D_PRIMITIVE_TOPOLOGY;
    type IndexFormat = DXGI_FORMAT;
    type VertexFormat = DXGI_FORMAT;
    type TextureTarget = D3D_SRV_DIMENSION;
    type PixelFormat = DXGI_FORMAT;
    type Filter = D3D11_FILTER;
    type Wrap = D3D11_TEXTURE_ADDRESS_MODE;
    type Compare = D3D11_COMPARISON_FUNC;
    type StencilOp = D3D11_STENCIL_OP;
    type BlendFactor = D3D11_BLEND;
    type BlendOp = D3D11_BLEND_OP;
    type CullMode = D3D11_CULL_MODE;
    type Winding = bool;
    type ClearMask = ClearFlags;
    type BarrierMask = BarrierFlags;
    type ImageAccess = ImageAccess;
    type ReflectedType = D3dVariableType;

    fn translate_buffer_type(kind: BufferType) -> D3D11_BIND_FLAG {
        bind_flag(kind)
    }

    fn translate_buffer_usage(usage: BufferUsage) -> D3D11_USAGE {
        self::usage(usage)
    }

    fn translate_draw_mode(mode: DrawMode) -> D3D_PRIMITIVE_TOPOLOGY {
        topology(mode)
    }

    fn translate_index_type(ty: IndexType) -> DXGI_FORMAT {
        index_format(ty)
    }

    fn translate_layout_type(ty: LayoutType) -> NativeVertexFormat<DXGI_FORMAT> {
        vertex_format(ty)
    }

    fn translate_texture_type(ty: TextureType) -> D3D_SRV_DIMENSION {
        view_dimension(ty)
    }

    fn cubemap_target() -> D3D_SRV_DIMENSION {
        D3D_SRV_DIMENSION_TEXTURECUBE
    }

    fn translate_format(format: TextureFormat) -> NativePixelFormat<DXGI_FORMAT> {
        pixel_format(format)
    }

    fn translate_filter(filter: TextureFilter, comparison: bool) -> D3D11_FILTER {
        if comparison {
            comparison_filter(filter)
        } else {
            self::filter(filter)
        }
    }

    fn translate_wrap(wrap: TextureWrap) -> D3D11_TEXTURE_ADDRESS_MODE {
        address_mode(wrap)
    }

    fn translate_compare_func(func: CompareFunc) -> D3D11_COMPARISON_FUNC {
        comparison_func(func)
    }

    fn translate_stencil_op(op: StencilOp) -> D3D11_STENCIL_OP {
        stencil_op(op)
    }

    fn translate_blend_factor(factor: BlendFactor) -> D3D11_BLEND {
        blend(factor)
    }

    fn translate_blend_op(op: BlendOp) -> D3D11_BLEND_OP {
        blend_op(op)
    }

    fn translate_cull_mode(mode: CullMode) -> D3D11_CULL_MODE {
        cull_mode(mode)
    }

    fn translate_winding(winding: Winding) -> bool {
        front_counter_clockwise(winding)
    }

    fn translate_clear_flags(flags: ClearFlags) -> ClearFlags {
        flags
    }

    fn translate_barrier(flags: BarrierFlags) -> BarrierFlags {
        flags
    }

    fn translate_image_access(access: ImageAccess) -> ImageAccess {
        access
    }

    fn reflect_uniform_type(native: D3dVariableType) -> UniformType {
        uniform_type_of(native.normalized()).unwrap_or(UniformType::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats_split_views() {
        let format = pixel_format(TextureFormat::Depth24Stencil8);
        assert_eq!(format.internal, DXGI_FORMAT_R24G8_TYPELESS);
        assert_eq!(format.transfer, DXGI_FORMAT_R24_UNORM_X8_TYPELESS);
        assert_eq!(format.element, DXGI_FORMAT_D24_UNORM_S8_UINT);
        assert!(!expands_to_rgba(&format));
        assert!(expands_to_rgba(&pixel_format(TextureFormat::Rgb8)));
    }

    #[test]
    fn test_row_major_matrix_reflects_as_mat4() {
        let row_major = D3dVariableType {
            class: D3D_SVC_MATRIX_ROWS,
            ..D3dVariableType::matrix(4)
        };
        assert_eq!(D3d11Device::reflect_uniform_type(row_major), UniformType::Mat4);
        assert_eq!(
            D3d11Device::reflect_uniform_type(signature_variable_type(D3D_REGISTER_COMPONENT_FLOAT32, 0b0111)),
            UniformType::Vec3
        );
    }

    #[test]
    fn test_saturating_stencil_ops() {
        assert_eq!(stencil_op(StencilOp::Increment), D3D11_STENCIL_OP_INCR_SAT);
        assert_eq!(stencil_op_of(D3D11_STENCIL_OP_INCR), Some(StencilOp::IncrementWrap));
    }
}
