//! 枚举翻译表
//!
//! 可移植词汇（`types` 模块）到各后端原生常量的映射。
//! 每个枚举类别只声明一张表：`bidirectional_table!` 从同一份映射列表同时生成
//! 正向（可移植 → 原生）和反向（原生 → 可移植）函数，反射时使用反向查找。
//!
//! 后端通过实现 `Translate` trait 暴露自己的表，共享层（布局编译器、纹理加载、
//! 绘制提交）只通过该 trait 取得原生值，自身不包含任何原生常量。

use std::fmt::Debug;

use super::descriptor::{BlendDesc, StencilFaceDesc};
use super::sync::BarrierFlags;
use super::types::*;

/// 从一份映射列表生成正向与反向查找函数
///
/// 正向是穷尽的 `match`，漏写变体会编译失败；反向返回 `Option`，
/// 遇到多对一映射时返回列表中第一个匹配项。
#[macro_export]
macro_rules! bidirectional_table {
    (
        $(#[$meta:meta])*
        $vis:vis fn $forward:ident / $reverse:ident ($portable:ty => $native:ty) {
            $($from:path => $to:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis fn $forward(value: $portable) -> $native {
            match value {
                $($from => $to,)+
            }
        }

        #[allow(dead_code)]
        $vis fn $reverse(value: $native) -> Option<$portable> {
            $(
                if value == $to {
                    return Some($from);
                }
            )+
            None
        }
    };
}

/// 顶点属性的原生描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeVertexFormat<V> {
    /// 原生元素类型 / 格式
    pub format: V,
    /// 分量个数
    pub components: u32,
    /// 整个属性的字节数
    pub size: u32,
    /// 是否走整数属性通道
    pub integer: bool,
}

/// 像素格式的原生描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativePixelFormat<P> {
    /// GPU 存储格式
    pub internal: P,
    /// CPU 传输格式
    pub transfer: P,
    /// CPU 传输元素类型
    pub element: P,
    /// 通道数
    pub channels: u32,
    /// CPU 侧每像素字节数
    pub bytes_per_pixel: u32,
}

/// 单面的模板操作（原生值）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilFaceOps<C, O> {
    pub func: C,
    pub fail: O,
    pub depth_fail: O,
    pub pass: O,
}

/// 采样参数（原生值）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeSampling<F, W, C> {
    pub filter: F,
    pub wrap: W,
    pub compare: Option<C>,
    pub border_color: [f32; 4],
}

/// 混合状态（原生值）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeBlend<F, O> {
    pub src_rgb: F,
    pub dst_rgb: F,
    pub src_alpha: F,
    pub dst_alpha: F,
    pub op_rgb: O,
    pub op_alpha: O,
    pub constant_color: [f32; 4],
}

/// 后端的原生词汇表
///
/// 所有方法都是无状态的纯函数。
pub trait Translate {
    type BufferTarget: Copy + Debug + PartialEq;
    type BufferUsage: Copy + Debug + PartialEq;
    type Primitive: Copy + Debug + PartialEq;
    type IndexFormat: Copy + Debug + PartialEq;
    type VertexFormat: Copy + Debug + PartialEq;
    type TextureTarget: Copy + Debug + PartialEq;
    type PixelFormat: Copy + Debug + PartialEq;
    type Filter: Copy + Debug + PartialEq;
    type Wrap: Copy + Debug + PartialEq;
    type Compare: Copy + Debug + PartialEq;
    type StencilOp: Copy + Debug + PartialEq;
    type BlendFactor: Copy + Debug + PartialEq;
    type BlendOp: Copy + Debug + PartialEq;
    type CullMode: Copy + Debug + PartialEq;
    type Winding: Copy + Debug + PartialEq;
    type ClearMask: Copy + Debug + PartialEq;
    type BarrierMask: Copy + Debug + PartialEq;
    type ImageAccess: Copy + Debug + PartialEq;
    /// 反射时原生 API 给出的类型标签
    type ReflectedType: Copy + Debug;

    fn translate_buffer_type(kind: BufferType) -> Self::BufferTarget;
    fn translate_buffer_usage(usage: BufferUsage) -> Self::BufferUsage;
    fn translate_draw_mode(mode: DrawMode) -> Self::Primitive;
    fn translate_index_type(ty: IndexType) -> Self::IndexFormat;
    fn translate_layout_type(ty: LayoutType) -> NativeVertexFormat<Self::VertexFormat>;
    fn translate_texture_type(ty: TextureType) -> Self::TextureTarget;
    /// 立方体贴图没有独立的 `TextureType` 标签，单独给出其目标
    fn cubemap_target() -> Self::TextureTarget;
    fn translate_format(format: TextureFormat) -> NativePixelFormat<Self::PixelFormat>;
    /// `comparison` 为真时返回比较采样版本（仅对象模型后端区分）
    fn translate_filter(filter: TextureFilter, comparison: bool) -> Self::Filter;
    fn translate_wrap(wrap: TextureWrap) -> Self::Wrap;
    fn translate_compare_func(func: CompareFunc) -> Self::Compare;
    fn translate_stencil_op(op: StencilOp) -> Self::StencilOp;
    fn translate_blend_factor(factor: BlendFactor) -> Self::BlendFactor;
    fn translate_blend_op(op: BlendOp) -> Self::BlendOp;
    fn translate_cull_mode(mode: CullMode) -> Self::CullMode;
    fn translate_winding(winding: Winding) -> Self::Winding;
    fn translate_clear_flags(flags: ClearFlags) -> Self::ClearMask;
    fn translate_barrier(flags: BarrierFlags) -> Self::BarrierMask;
    fn translate_image_access(access: ImageAccess) -> Self::ImageAccess;

    /// 反向：原生反射类型 → 可移植类型
    fn reflect_uniform_type(native: Self::ReflectedType) -> UniformType;

    /// 把可移植混合描述整体翻译为原生值
    fn translate_blend(desc: &BlendDesc) -> NativeBlend<Self::BlendFactor, Self::BlendOp> {
        NativeBlend {
            src_rgb: Self::translate_blend_factor(desc.src_rgb),
            dst_rgb: Self::translate_blend_factor(desc.dst_rgb),
            src_alpha: Self::translate_blend_factor(desc.src_alpha),
            dst_alpha: Self::translate_blend_factor(desc.dst_alpha),
            op_rgb: Self::translate_blend_op(desc.op_rgb),
            op_alpha: Self::translate_blend_op(desc.op_alpha),
            constant_color: desc.constant_color,
        }
    }

    /// 单面模板操作
    fn translate_stencil_face(
        face: &StencilFaceDesc,
    ) -> StencilFaceOps<Self::Compare, Self::StencilOp> {
        StencilFaceOps {
            func: Self::translate_compare_func(face.func),
            fail: Self::translate_stencil_op(face.fail),
            depth_fail: Self::translate_stencil_op(face.depth_fail),
            pass: Self::translate_stencil_op(face.pass),
        }
    }

    /// 把可移植采样参数整体翻译为原生值
    fn translate_sampling(
        filter: TextureFilter,
        wrap: TextureWrap,
        compare: Option<CompareFunc>,
        border_color: [f32; 4],
    ) -> NativeSampling<Self::Filter, Self::Wrap, Self::Compare> {
        NativeSampling {
            filter: Self::translate_filter(filter, compare.is_some()),
            wrap: Self::translate_wrap(wrap),
            compare: compare.map(Self::translate_compare_func),
            border_color,
        }
    }
}

#[cfg(test)]
mod tests {
    crate::bidirectional_table! {
        fn to_code / from_code (super::CompareFunc => u32) {
            super::CompareFunc::Never => 10,
            super::CompareFunc::Less => 11,
            super::CompareFunc::Equal => 12,
            super::CompareFunc::LessEqual => 13,
            super::CompareFunc::Greater => 14,
            super::CompareFunc::NotEqual => 15,
            super::CompareFunc::GreaterEqual => 16,
            super::CompareFunc::Always => 17,
        }
    }

    #[test]
    fn test_table_is_bidirectional() {
        use super::CompareFunc;
        for func in [CompareFunc::Never, CompareFunc::LessEqual, CompareFunc::Always] {
            assert_eq!(from_code(to_code(func)), Some(func));
        }
        assert_eq!(from_code(99), None);
    }
}
