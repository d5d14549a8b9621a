//! 顶点布局编译器
//!
//! 把每个绑定的属性类型列表编译成输入装配阶段需要的数据：
//! 每个属性的字节偏移、原生格式、着色器位置，以及每个绑定的步长和步进方式。
//!
//! # 算法
//!
//! 按声明顺序遍历一个绑定内的属性，属性偏移等于该绑定当前累计的步长，
//! 放置完毕后累计值就是该绑定的步长；下一个绑定从 0 重新累计。
//! 着色器位置在所有绑定之间连续编号。
//!
//! 矩阵属性不会被自动展开，需要调用方按列逐个声明。
//!
//! # 内存布局示例
//!
//! ```text
//! [Float3, Float4]  ->  offset 0, offset 12, stride 28
//! ```

use bytemuck::{Pod, Zeroable};

use super::descriptor::VertexLayoutDesc;
use super::translate::{NativeVertexFormat, Translate};
use super::types::{LayoutType, VERTEX_ATTRIBUTES_MAX, VERTEX_LAYOUTS_MAX};

/// 绑定的步进方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRate {
    /// 绑定 0：逐顶点
    PerVertex,
    /// 绑定 1：逐实例，除数为 1
    PerInstance,
}

impl StepRate {
    /// 原生实例除数
    pub fn divisor(self) -> u32 {
        match self {
            StepRate::PerVertex => 0,
            StepRate::PerInstance => 1,
        }
    }
}

/// 编译后的单个属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledAttribute<V> {
    /// 着色器输入位置
    pub location: u32,
    /// 所属绑定
    pub binding: u32,
    /// 相对绑定起始的字节偏移
    pub offset: u32,
    pub layout: LayoutType,
    pub format: NativeVertexFormat<V>,
}

/// 编译后的单个绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledBinding {
    pub stride: u32,
    pub step: StepRate,
    /// 在 `CompiledLayout::attributes` 中的区间
    pub first_attribute: usize,
    pub attribute_count: usize,
}

/// 编译结果，供后端配置输入装配对象
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLayout<V> {
    pub bindings: Vec<CompiledBinding>,
    pub attributes: Vec<CompiledAttribute<V>>,
}

impl<V> CompiledLayout<V> {
    /// 某个绑定上的属性
    pub fn binding_attributes(&self, binding: usize) -> &[CompiledAttribute<V>] {
        match self.bindings.get(binding) {
            Some(b) => &self.attributes[b.first_attribute..b.first_attribute + b.attribute_count],
            None => &[],
        }
    }

    /// 某个绑定的步长，绑定不存在时为 0
    pub fn stride(&self, binding: usize) -> u32 {
        self.bindings.get(binding).map_or(0, |b| b.stride)
    }
}

/// 编译顶点布局
///
/// # 参数
///
/// * `layouts` - 每个绑定一个属性列表，最多 `VERTEX_LAYOUTS_MAX` 个
///
/// # 返回值
///
/// 属性偏移与绑定步长；相同输入总是得到相同输出
pub fn compile_layout<T: Translate>(layouts: &[VertexLayoutDesc]) -> CompiledLayout<T::VertexFormat> {
    crate::gal_assert!(
        layouts.len() <= VERTEX_LAYOUTS_MAX,
        "{} vertex layouts exceed the limit of {}",
        layouts.len(),
        VERTEX_LAYOUTS_MAX
    );
    let total: usize = layouts.iter().map(|l| l.attributes.len()).sum();
    crate::gal_assert!(
        total <= VERTEX_ATTRIBUTES_MAX,
        "{} vertex attributes exceed the limit of {}",
        total,
        VERTEX_ATTRIBUTES_MAX
    );

    let mut bindings = Vec::with_capacity(layouts.len());
    let mut attributes = Vec::with_capacity(total);

    for (binding, layout) in layouts.iter().enumerate() {
        let first_attribute = attributes.len();
        let mut stride = 0u32;

        for &ty in &layout.attributes {
            let format = T::translate_layout_type(ty);
            attributes.push(CompiledAttribute {
                location: attributes.len() as u32,
                binding: binding as u32,
                offset: stride,
                layout: ty,
                format,
            });
            stride += format.size;
        }

        bindings.push(CompiledBinding {
            stride,
            step: if binding == 0 { StepRate::PerVertex } else { StepRate::PerInstance },
            first_attribute,
            attribute_count: layout.attributes.len(),
        });
    }

    tracing::trace!(
        bindings = bindings.len(),
        attributes = attributes.len(),
        stride0 = bindings.first().map_or(0, |b: &CompiledBinding| b.stride),
        "Vertex layout compiled"
    );

    CompiledLayout { bindings, attributes }
}

/// 位置 + 颜色顶点
///
/// 对应布局 `[Float3, Float4]`，步长 28 字节。
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl ColorVertex {
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    /// 与内存布局一致的顶点布局描述
    pub fn layout() -> VertexLayoutDesc {
        VertexLayoutDesc::new([LayoutType::Float3, LayoutType::Float4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::gl::translate::GlTables;

    #[test]
    fn test_offsets_are_prefix_sums() {
        let layout = VertexLayoutDesc::new([
            LayoutType::Float3,
            LayoutType::UByte4,
            LayoutType::Short2,
            LayoutType::Float2,
        ]);
        let compiled = compile_layout::<GlTables>(&[layout]);

        let offsets: Vec<u32> = compiled.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16, 20]);
        assert_eq!(compiled.stride(0), 28);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let layouts = [
            ColorVertex::layout(),
            VertexLayoutDesc::new([LayoutType::Float4, LayoutType::Float4]),
        ];
        let first = compile_layout::<GlTables>(&layouts);
        let second = compile_layout::<GlTables>(&layouts);
        assert_eq!(first, second);
    }

    #[test]
    fn test_instance_binding_restarts_offsets() {
        let layouts = [
            ColorVertex::layout(),
            VertexLayoutDesc::new([LayoutType::Float2, LayoutType::Int1]),
        ];
        let compiled = compile_layout::<GlTables>(&layouts);

        assert_eq!(compiled.stride(0), 28);
        assert_eq!(compiled.stride(1), 12);
        assert_eq!(compiled.bindings[1].step, StepRate::PerInstance);

        let instance = compiled.binding_attributes(1);
        assert_eq!(instance[0].offset, 0);
        assert_eq!(instance[1].offset, 8);
        assert_eq!(instance[0].location, 2);
        assert!(instance[1].format.integer);
    }

    #[test]
    fn test_color_vertex_matches_layout() {
        let compiled = compile_layout::<GlTables>(&[ColorVertex::layout()]);
        assert_eq!(compiled.stride(0) as usize, std::mem::size_of::<ColorVertex>());
    }

    #[test]
    #[should_panic(expected = "vertex layouts exceed")]
    fn test_too_many_bindings() {
        let layout = VertexLayoutDesc::new([LayoutType::Float1]);
        compile_layout::<GlTables>(&[layout.clone(), layout.clone(), layout]);
    }

    #[test]
    #[should_panic(expected = "vertex attributes exceed")]
    fn test_too_many_attributes() {
        let layout = VertexLayoutDesc::new(vec![LayoutType::Float1; VERTEX_ATTRIBUTES_MAX + 1]);
        compile_layout::<GlTables>(&[layout]);
    }
}
