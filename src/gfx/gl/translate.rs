//! OpenGL 词汇表
//!
//! 每个枚举类别一张 `bidirectional_table!`，常量全部来自 `glow`。
//! 这些表不依赖 GL 上下文，始终参与编译；`impl_gl_translate!` 把它们挂到
//! 任何使用 GL 词汇的类型上（GL 设备、无头记录设备、`GlTables`）。

use crate::bidirectional_table;
use crate::renderer::backend_trait::DepthAttachmentPoint;
use crate::renderer::sync::BarrierFlags;
use crate::renderer::translate::{NativePixelFormat, NativeVertexFormat};
use crate::renderer::types::*;

bidirectional_table! {
    pub fn buffer_target / buffer_type_of (BufferType => u32) {
        BufferType::Vertex => glow::ARRAY_BUFFER,
        BufferType::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferType::Uniform => glow::UNIFORM_BUFFER,
        BufferType::ShaderStorage => glow::SHADER_STORAGE_BUFFER,
    }
}

bidirectional_table! {
    pub fn buffer_usage / buffer_usage_of (BufferUsage => u32) {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StaticRead => glow::STATIC_READ,
        BufferUsage::DynamicRead => glow::DYNAMIC_READ,
    }
}

bidirectional_table! {
    pub fn primitive / draw_mode_of (DrawMode => u32) {
        DrawMode::Points => glow::POINTS,
        DrawMode::Lines => glow::LINES,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

bidirectional_table! {
    pub fn index_format / index_type_of (IndexType => u32) {
        IndexType::U16 => glow::UNSIGNED_SHORT,
        IndexType::U32 => glow::UNSIGNED_INT,
    }
}

bidirectional_table! {
    /// 渲染目标映射为 renderbuffer；图像与同维度的纹理共用目标
    pub fn texture_target / texture_type_of (TextureType => u32) {
        TextureType::Texture1D => glow::TEXTURE_1D,
        TextureType::Texture2D => glow::TEXTURE_2D,
        TextureType::Texture3D => glow::TEXTURE_3D,
        TextureType::Texture2DArray => glow::TEXTURE_2D_ARRAY,
        TextureType::Image1D => glow::TEXTURE_1D,
        TextureType::Image2D => glow::TEXTURE_2D,
        TextureType::Image3D => glow::TEXTURE_3D,
        TextureType::DepthTarget => glow::RENDERBUFFER,
        TextureType::StencilTarget => glow::RENDERBUFFER,
        TextureType::DepthStencilTarget => glow::RENDERBUFFER,
    }
}

bidirectional_table! {
    pub fn internal_format / texture_format_of (TextureFormat => u32) {
        TextureFormat::R8 => glow::R8,
        TextureFormat::Rg8 => glow::RG8,
        TextureFormat::Rgb8 => glow::RGB8,
        TextureFormat::Rgba8 => glow::RGBA8,
        TextureFormat::R16F => glow::R16F,
        TextureFormat::Rg16F => glow::RG16F,
        TextureFormat::Rgb16F => glow::RGB16F,
        TextureFormat::Rgba16F => glow::RGBA16F,
        TextureFormat::R32F => glow::R32F,
        TextureFormat::Rg32F => glow::RG32F,
        TextureFormat::Rgb32F => glow::RGB32F,
        TextureFormat::Rgba32F => glow::RGBA32F,
        TextureFormat::R32Ui => glow::R32UI,
        TextureFormat::Depth16 => glow::DEPTH_COMPONENT16,
        TextureFormat::Depth24 => glow::DEPTH_COMPONENT24,
        TextureFormat::Depth32F => glow::DEPTH_COMPONENT32F,
        TextureFormat::Stencil8 => glow::STENCIL_INDEX8,
        TextureFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
    }
}

bidirectional_table! {
    /// 缩小过滤
    pub fn min_filter / texture_filter_of (TextureFilter => u32) {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }
}

bidirectional_table! {
    pub fn wrap_mode / texture_wrap_of (TextureWrap => u32) {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER,
    }
}

bidirectional_table! {
    pub fn compare_func / compare_func_of (CompareFunc => u32) {
        CompareFunc::Never => glow::NEVER,
        CompareFunc::Less => glow::LESS,
        CompareFunc::Equal => glow::EQUAL,
        CompareFunc::LessEqual => glow::LEQUAL,
        CompareFunc::Greater => glow::GREATER,
        CompareFunc::NotEqual => glow::NOTEQUAL,
        CompareFunc::GreaterEqual => glow::GEQUAL,
        CompareFunc::Always => glow::ALWAYS,
    }
}

bidirectional_table! {
    pub fn stencil_op / stencil_op_of (StencilOp => u32) {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::Increment => glow::INCR,
        StencilOp::IncrementWrap => glow::INCR_WRAP,
        StencilOp::Decrement => glow::DECR,
        StencilOp::DecrementWrap => glow::DECR_WRAP,
        StencilOp::Invert => glow::INVERT,
    }
}

bidirectional_table! {
    pub fn blend_factor / blend_factor_of (BlendFactor => u32) {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => glow::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
    }
}

bidirectional_table! {
    pub fn blend_equation / blend_op_of (BlendOp => u32) {
        BlendOp::Add => glow::FUNC_ADD,
        BlendOp::Subtract => glow::FUNC_SUBTRACT,
        BlendOp::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => glow::MIN,
        BlendOp::Max => glow::MAX,
    }
}

bidirectional_table! {
    pub fn cull_face / cull_mode_of (CullMode => u32) {
        CullMode::Front => glow::FRONT,
        CullMode::Back => glow::BACK,
    }
}

bidirectional_table! {
    pub fn front_face / winding_of (Winding => u32) {
        Winding::Clockwise => glow::CW,
        Winding::CounterClockwise => glow::CCW,
    }
}

bidirectional_table! {
    pub fn image_access / image_access_of (ImageAccess => u32) {
        ImageAccess::ReadOnly => glow::READ_ONLY,
        ImageAccess::WriteOnly => glow::WRITE_ONLY,
        ImageAccess::ReadWrite => glow::READ_WRITE,
    }
}

bidirectional_table! {
    /// 反射方向使用反向函数 `uniform_type_of`
    pub fn gl_uniform_type / uniform_type_of (UniformType => u32) {
        UniformType::Float => glow::FLOAT,
        UniformType::Vec2 => glow::FLOAT_VEC2,
        UniformType::Vec3 => glow::FLOAT_VEC3,
        UniformType::Vec4 => glow::FLOAT_VEC4,
        UniformType::Int => glow::INT,
        UniformType::IVec2 => glow::INT_VEC2,
        UniformType::IVec3 => glow::INT_VEC3,
        UniformType::IVec4 => glow::INT_VEC4,
        UniformType::UInt => glow::UNSIGNED_INT,
        UniformType::UVec2 => glow::UNSIGNED_INT_VEC2,
        UniformType::UVec3 => glow::UNSIGNED_INT_VEC3,
        UniformType::UVec4 => glow::UNSIGNED_INT_VEC4,
        UniformType::Bool => glow::BOOL,
        UniformType::Mat2 => glow::FLOAT_MAT2,
        UniformType::Mat3 => glow::FLOAT_MAT3,
        UniformType::Mat4 => glow::FLOAT_MAT4,
        UniformType::Sampler1D => glow::SAMPLER_1D,
        UniformType::Sampler2D => glow::SAMPLER_2D,
        UniformType::Sampler3D => glow::SAMPLER_3D,
        UniformType::SamplerCube => glow::SAMPLER_CUBE,
        UniformType::Sampler2DShadow => glow::SAMPLER_2D_SHADOW,
        UniformType::Sampler2DArray => glow::SAMPLER_2D_ARRAY,
        UniformType::Image1D => glow::IMAGE_1D,
        UniformType::Image2D => glow::IMAGE_2D,
        UniformType::Image3D => glow::IMAGE_3D,
        UniformType::Unknown => glow::NONE,
    }
}

bidirectional_table! {
    /// `glEnable` / `glDisable` 的开关
    pub fn capability / state_kind_of (StateKind => u32) {
        StateKind::Depth => glow::DEPTH_TEST,
        StateKind::Stencil => glow::STENCIL_TEST,
        StateKind::Blend => glow::BLEND,
        StateKind::Cull => glow::CULL_FACE,
        StateKind::Scissor => glow::SCISSOR_TEST,
    }
}

bidirectional_table! {
    pub fn depth_attachment / depth_attachment_point_of (DepthAttachmentPoint => u32) {
        DepthAttachmentPoint::Depth => glow::DEPTH_ATTACHMENT,
        DepthAttachmentPoint::Stencil => glow::STENCIL_ATTACHMENT,
        DepthAttachmentPoint::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
    }
}

/// 第 `index` 个颜色附件
pub fn color_attachment(index: u32) -> u32 {
    glow::COLOR_ATTACHMENT0 + index
}

/// 顶点属性的 GL 元素类型与分量信息
pub fn vertex_format(ty: LayoutType) -> NativeVertexFormat<u32> {
    use LayoutType::*;
    let element = match ty {
        Float1 | Float2 | Float3 | Float4 => glow::FLOAT,
        Byte1 | Byte2 | Byte3 | Byte4 => glow::BYTE,
        UByte1 | UByte2 | UByte3 | UByte4 => glow::UNSIGNED_BYTE,
        Short1 | Short2 | Short3 | Short4 => glow::SHORT,
        UShort1 | UShort2 | UShort3 | UShort4 => glow::UNSIGNED_SHORT,
        Int1 | Int2 | Int3 | Int4 => glow::INT,
        UInt1 | UInt2 | UInt3 | UInt4 => glow::UNSIGNED_INT,
    };
    NativeVertexFormat {
        format: element,
        components: ty.components(),
        size: ty.byte_size(),
        integer: ty.is_integer(),
    }
}

/// 像素格式的 (存储格式, 传输格式, 元素类型)
pub fn pixel_format(format: TextureFormat) -> NativePixelFormat<u32> {
    use TextureFormat::*;
    let (transfer, element) = match format {
        R8 => (glow::RED, glow::UNSIGNED_BYTE),
        Rg8 => (glow::RG, glow::UNSIGNED_BYTE),
        Rgb8 => (glow::RGB, glow::UNSIGNED_BYTE),
        Rgba8 => (glow::RGBA, glow::UNSIGNED_BYTE),
        R16F => (glow::RED, glow::HALF_FLOAT),
        Rg16F => (glow::RG, glow::HALF_FLOAT),
        Rgb16F => (glow::RGB, glow::HALF_FLOAT),
        Rgba16F => (glow::RGBA, glow::HALF_FLOAT),
        R32F => (glow::RED, glow::FLOAT),
        Rg32F => (glow::RG, glow::FLOAT),
        Rgb32F => (glow::RGB, glow::FLOAT),
        Rgba32F => (glow::RGBA, glow::FLOAT),
        R32Ui => (glow::RED_INTEGER, glow::UNSIGNED_INT),
        Depth16 => (glow::DEPTH_COMPONENT, glow::UNSIGNED_SHORT),
        Depth24 => (glow::DEPTH_COMPONENT, glow::UNSIGNED_INT),
        Depth32F => (glow::DEPTH_COMPONENT, glow::FLOAT),
        Stencil8 => (glow::STENCIL_INDEX, glow::UNSIGNED_BYTE),
        Depth24Stencil8 => (glow::DEPTH_STENCIL, glow::UNSIGNED_INT_24_8),
    };
    NativePixelFormat {
        internal: internal_format(format),
        transfer,
        element,
        channels: format.channels(),
        bytes_per_pixel: format.bytes_per_pixel(),
    }
}

/// 清除位
pub fn clear_mask(flags: ClearFlags) -> u32 {
    let mut mask = 0;
    if flags.contains(ClearFlags::COLOR) {
        mask |= glow::COLOR_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::DEPTH) {
        mask |= glow::DEPTH_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::STENCIL) {
        mask |= glow::STENCIL_BUFFER_BIT;
    }
    mask
}

/// 屏障位
pub fn barrier_bits(flags: BarrierFlags) -> u32 {
    const BITS: [(BarrierFlags, u32); 9] = [
        (BarrierFlags::VERTEX_ATTRIB_ARRAY, glow::VERTEX_ATTRIB_ARRAY_BARRIER_BIT),
        (BarrierFlags::ELEMENT_ARRAY, glow::ELEMENT_ARRAY_BARRIER_BIT),
        (BarrierFlags::UNIFORM, glow::UNIFORM_BARRIER_BIT),
        (BarrierFlags::TEXTURE_FETCH, glow::TEXTURE_FETCH_BARRIER_BIT),
        (BarrierFlags::SHADER_IMAGE_ACCESS, glow::SHADER_IMAGE_ACCESS_BARRIER_BIT),
        (BarrierFlags::TEXTURE_UPDATE, glow::TEXTURE_UPDATE_BARRIER_BIT),
        (BarrierFlags::BUFFER_UPDATE, glow::BUFFER_UPDATE_BARRIER_BIT),
        (BarrierFlags::FRAMEBUFFER, glow::FRAMEBUFFER_BARRIER_BIT),
        (BarrierFlags::SHADER_STORAGE, glow::SHADER_STORAGE_BARRIER_BIT),
    ];
    BITS.iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .fold(0, |mask, (_, bit)| mask | bit)
}

/// GLSL 类型名到 GL 类型枚举，未知类型为 `GL_NONE`
pub fn glsl_type(name: &str) -> u32 {
    match name {
        "float" => glow::FLOAT,
        "vec2" => glow::FLOAT_VEC2,
        "vec3" => glow::FLOAT_VEC3,
        "vec4" => glow::FLOAT_VEC4,
        "int" => glow::INT,
        "ivec2" => glow::INT_VEC2,
        "ivec3" => glow::INT_VEC3,
        "ivec4" => glow::INT_VEC4,
        "uint" => glow::UNSIGNED_INT,
        "uvec2" => glow::UNSIGNED_INT_VEC2,
        "uvec3" => glow::UNSIGNED_INT_VEC3,
        "uvec4" => glow::UNSIGNED_INT_VEC4,
        "bool" => glow::BOOL,
        "mat2" => glow::FLOAT_MAT2,
        "mat3" => glow::FLOAT_MAT3,
        "mat4" => glow::FLOAT_MAT4,
        "sampler1D" => glow::SAMPLER_1D,
        "sampler2D" => glow::SAMPLER_2D,
        "sampler3D" => glow::SAMPLER_3D,
        "samplerCube" => glow::SAMPLER_CUBE,
        "sampler2DShadow" => glow::SAMPLER_2D_SHADOW,
        "sampler2DArray" => glow::SAMPLER_2D_ARRAY,
        "image1D" => glow::IMAGE_1D,
        "image2D" => glow::IMAGE_2D,
        "image3D" => glow::IMAGE_3D,
        _ => glow::NONE,
    }
}

/// 为使用 GL 词汇的类型实现 `Translate`
#[macro_export]
macro_rules! impl_gl_translate {
    ($target:ty) => {
        impl $crate::renderer::translate::Translate for $target {
            type BufferTarget = u32;
            type BufferUsage = u32;
            type Primitive = u32;
            type IndexFormat = u32;
            type VertexFormat = u32;
            type TextureTarget = u32;
            type PixelFormat = u32;
            type Filter = u32;
            type Wrap = u32;
            type Compare = u32;
            type StencilOp = u32;
            type BlendFactor = u32;
            type BlendOp = u32;
            type CullMode = u32;
            type Winding = u32;
            type ClearMask = u32;
            type BarrierMask = u32;
            type ImageAccess = u32;
            type ReflectedType = u32;

            fn translate_buffer_type(kind: $crate::renderer::types::BufferType) -> u32 {
                $crate::gfx::gl::translate::buffer_target(kind)
            }
            fn translate_buffer_usage(usage: $crate::renderer::types::BufferUsage) -> u32 {
                $crate::gfx::gl::translate::buffer_usage(usage)
            }
            fn translate_draw_mode(mode: $crate::renderer::types::DrawMode) -> u32 {
                $crate::gfx::gl::translate::primitive(mode)
            }
            fn translate_index_type(ty: $crate::renderer::types::IndexType) -> u32 {
                $crate::gfx::gl::translate::index_format(ty)
            }
            fn translate_layout_type(
                ty: $crate::renderer::types::LayoutType,
            ) -> $crate::renderer::translate::NativeVertexFormat<u32> {
                $crate::gfx::gl::translate::vertex_format(ty)
            }
            fn translate_texture_type(ty: $crate::renderer::types::TextureType) -> u32 {
                $crate::gfx::gl::translate::texture_target(ty)
            }
            fn cubemap_target() -> u32 {
                glow::TEXTURE_CUBE_MAP
            }
            fn translate_format(
                format: $crate::renderer::types::TextureFormat,
            ) -> $crate::renderer::translate::NativePixelFormat<u32> {
                $crate::gfx::gl::translate::pixel_format(format)
            }
            fn translate_filter(filter: $crate::renderer::types::TextureFilter, _comparison: bool) -> u32 {
                $crate::gfx::gl::translate::min_filter(filter)
            }
            fn translate_wrap(wrap: $crate::renderer::types::TextureWrap) -> u32 {
                $crate::gfx::gl::translate::wrap_mode(wrap)
            }
            fn translate_compare_func(func: $crate::renderer::types::CompareFunc) -> u32 {
                $crate::gfx::gl::translate::compare_func(func)
            }
            fn translate_stencil_op(op: $crate::renderer::types::StencilOp) -> u32 {
                $crate::gfx::gl::translate::stencil_op(op)
            }
            fn translate_blend_factor(factor: $crate::renderer::types::BlendFactor) -> u32 {
                $crate::gfx::gl::translate::blend_factor(factor)
            }
            fn translate_blend_op(op: $crate::renderer::types::BlendOp) -> u32 {
                $crate::gfx::gl::translate::blend_equation(op)
            }
            fn translate_cull_mode(mode: $crate::renderer::types::CullMode) -> u32 {
                $crate::gfx::gl::translate::cull_face(mode)
            }
            fn translate_winding(winding: $crate::renderer::types::Winding) -> u32 {
                $crate::gfx::gl::translate::front_face(winding)
            }
            fn translate_clear_flags(flags: $crate::renderer::types::ClearFlags) -> u32 {
                $crate::gfx::gl::translate::clear_mask(flags)
            }
            fn translate_barrier(flags: $crate::renderer::sync::BarrierFlags) -> u32 {
                $crate::gfx::gl::translate::barrier_bits(flags)
            }
            fn translate_image_access(access: $crate::renderer::types::ImageAccess) -> u32 {
                $crate::gfx::gl::translate::image_access(access)
            }
            fn reflect_uniform_type(native: u32) -> $crate::renderer::types::UniformType {
                $crate::gfx::gl::translate::uniform_type_of(native)
                    .unwrap_or($crate::renderer::types::UniformType::Unknown)
            }
        }
    };
}

/// 不带设备的 GL 词汇表，布局编译等纯计算场景使用
#[derive(Debug, Clone, Copy, Default)]
pub struct GlTables;

crate::impl_gl_translate!(GlTables);

/// 放大过滤，从缩小过滤推导
pub fn mag_filter(min: u32) -> u32 {
    match texture_filter_of(min) {
        Some(filter) if !filter.mag_linear() => glow::NEAREST,
        _ => glow::LINEAR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::translate::Translate;

    #[test]
    fn test_forward_and_reverse_agree() {
        for format in [TextureFormat::Rgba8, TextureFormat::Depth24Stencil8, TextureFormat::R32Ui] {
            assert_eq!(texture_format_of(internal_format(format)), Some(format));
        }
        for func in [CompareFunc::Never, CompareFunc::GreaterEqual] {
            assert_eq!(compare_func_of(compare_func(func)), Some(func));
        }
        assert_eq!(blend_op_of(glow::FUNC_REVERSE_SUBTRACT), Some(BlendOp::ReverseSubtract));
    }

    #[test]
    fn test_many_to_one_reverse_returns_first() {
        assert_eq!(texture_type_of(glow::TEXTURE_2D), Some(TextureType::Texture2D));
        assert_eq!(texture_type_of(glow::RENDERBUFFER), Some(TextureType::DepthTarget));
    }

    #[test]
    fn test_reflection_uses_reverse_table() {
        assert_eq!(GlTables::reflect_uniform_type(glow::FLOAT_MAT4), UniformType::Mat4);
        assert_eq!(GlTables::reflect_uniform_type(glow::IMAGE_2D), UniformType::Image2D);
        assert_eq!(GlTables::reflect_uniform_type(0xDEAD), UniformType::Unknown);
        assert_eq!(GlTables::reflect_uniform_type(glsl_type("samplerCube")), UniformType::SamplerCube);
    }

    #[test]
    fn test_vertex_format() {
        let format = vertex_format(LayoutType::UShort3);
        assert_eq!(format.format, glow::UNSIGNED_SHORT);
        assert_eq!(format.components, 3);
        assert_eq!(format.size, 6);
        assert!(format.integer);
    }

    #[test]
    fn test_pixel_format() {
        let format = pixel_format(TextureFormat::Rgb16F);
        assert_eq!(format.internal, glow::RGB16F);
        assert_eq!(format.transfer, glow::RGB);
        assert_eq!(format.element, glow::HALF_FLOAT);
        assert_eq!(format.bytes_per_pixel, 6);
    }

    #[test]
    fn test_bit_masks() {
        assert_eq!(
            clear_mask(ClearFlags::COLOR | ClearFlags::STENCIL),
            glow::COLOR_BUFFER_BIT | glow::STENCIL_BUFFER_BIT
        );
        assert_eq!(
            barrier_bits(BarrierFlags::image_to_sampler()),
            glow::SHADER_IMAGE_ACCESS_BARRIER_BIT | glow::TEXTURE_FETCH_BARRIER_BIT
        );
        assert_eq!(barrier_bits(BarrierFlags::empty()), 0);
    }

    #[test]
    fn test_mag_filter() {
        assert_eq!(mag_filter(glow::NEAREST_MIPMAP_LINEAR), glow::NEAREST);
        assert_eq!(mag_filter(glow::LINEAR_MIPMAP_NEAREST), glow::LINEAR);
    }
}
