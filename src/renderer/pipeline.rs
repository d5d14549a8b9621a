//! 管线：几何输入
//!
//! 管线把一个顶点缓冲（必需）、可选的索引缓冲和实例缓冲、以及编译好的顶点布局
//! 组合成一个原生输入装配对象。管线不持有着色器，也不拥有它引用的缓冲区：
//! 同一条管线可以在不同帧搭配不同的着色器绘制。

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use crate::core::error::Result;
use crate::gal_assert;

use super::backend_trait::{Backend, InputStreams};
use super::context::Context;
use super::descriptor::PipelineDesc;
use super::resource::Buffer;
use super::types::BufferType;
use super::vertex::{compile_layout, CompiledLayout};

/// 管线引用的缓冲区
pub struct PipelineBuffers<'a, B: Backend> {
    pub vertex: &'a Buffer<B>,
    pub index: Option<&'a Buffer<B>>,
    pub instance: Option<&'a Buffer<B>>,
}

impl<'a, B: Backend> PipelineBuffers<'a, B> {
    pub fn vertex(vertex: &'a Buffer<B>) -> Self {
        Self {
            vertex,
            index: None,
            instance: None,
        }
    }

    pub fn with_index(mut self, index: &'a Buffer<B>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_instance(mut self, instance: &'a Buffer<B>) -> Self {
        self.instance = Some(instance);
        self
    }

    fn validate(&self) {
        gal_assert!(
            self.vertex.kind() == BufferType::Vertex,
            "pipeline vertex buffer must be a vertex buffer, got {:?}",
            self.vertex.kind()
        );
        if let Some(index) = self.index {
            gal_assert!(
                index.kind() == BufferType::Index,
                "pipeline index buffer must be an index buffer, got {:?}",
                index.kind()
            );
        }
        if let Some(instance) = self.instance {
            gal_assert!(
                instance.kind() == BufferType::Vertex,
                "pipeline instance buffer must be a vertex buffer, got {:?}",
                instance.kind()
            );
        }
    }

    fn streams(&self) -> InputStreams<'a, B> {
        InputStreams {
            vertex: self.vertex.native(),
            instance: self.instance.map(Buffer::native),
            index: self.index.map(Buffer::native),
        }
    }
}

/// 管线的共享状态，`Context` 通过弱引用读取
pub struct PipelineState<B: Backend> {
    device: Rc<B>,
    pub(crate) native: B::InputAssembly,
    pub(crate) desc: PipelineDesc,
    pub(crate) layout: CompiledLayout<B::VertexFormat>,
    pub(crate) has_index: bool,
    pub(crate) has_instance: bool,
}

impl<B: Backend> Drop for PipelineState<B> {
    fn drop(&mut self) {
        self.device.destroy_input_assembly(&self.native);
        tracing::debug!(handle = ?self.native, "Pipeline destroyed");
    }
}

/// 渲染管线
pub struct Pipeline<B: Backend> {
    state: Rc<RefCell<PipelineState<B>>>,
}

impl<B: Backend> Pipeline<B> {
    /// 编译布局并配置输入装配
    ///
    /// 绑定 0 从顶点缓冲按步长读取；存在实例缓冲时绑定 1 以除数 1 读取；
    /// 存在索引缓冲时作为元素来源。
    pub fn create(ctx: &Context<B>, desc: &PipelineDesc, buffers: PipelineBuffers<'_, B>) -> Result<Self> {
        buffers.validate();
        gal_assert!(
            !desc.layouts.is_empty(),
            "pipeline requires at least the per-vertex layout"
        );
        gal_assert!(
            buffers.instance.is_none() || desc.layouts.len() > 1,
            "instance buffer supplied without an instance layout"
        );

        let device = Rc::clone(ctx.device());
        let layout = compile_layout::<B>(&desc.layouts);
        let native = device.create_input_assembly()?;
        device.configure_input_assembly(&native, &layout, buffers.streams());

        tracing::debug!(
            backend = device.name(),
            vertices = desc.vertices_count,
            indices = desc.indices_count,
            indexed = buffers.index.is_some(),
            instanced = buffers.instance.is_some(),
            stride = layout.stride(0),
            "Pipeline created"
        );

        Ok(Self {
            state: Rc::new(RefCell::new(PipelineState {
                device,
                native,
                desc: desc.clone(),
                layout,
                has_index: buffers.index.is_some(),
                has_instance: buffers.instance.is_some(),
            })),
        })
    }

    /// 替换缓冲区引用、计数与绘制模式，不重新编译布局
    pub fn update(&self, desc: &PipelineDesc, buffers: PipelineBuffers<'_, B>) {
        buffers.validate();
        let mut state = self.state.borrow_mut();
        gal_assert!(
            buffers.instance.is_none() || state.layout.bindings.len() > 1,
            "instance buffer supplied without an instance layout"
        );
        state.device.configure_input_assembly(&state.native, &state.layout, buffers.streams());

        let layouts = std::mem::take(&mut state.desc.layouts);
        state.desc = PipelineDesc {
            layouts,
            ..desc.clone()
        };
        state.has_index = buffers.index.is_some();
        state.has_instance = buffers.instance.is_some();
        tracing::trace!(draw_mode = ?desc.draw_mode, "Pipeline updated");
    }

    /// 当前描述符（布局为创建时的布局）
    pub fn desc(&self) -> Ref<'_, PipelineDesc> {
        Ref::map(self.state.borrow(), |s| &s.desc)
    }

    pub fn layout(&self) -> Ref<'_, CompiledLayout<B::VertexFormat>> {
        Ref::map(self.state.borrow(), |s| &s.layout)
    }

    pub fn is_indexed(&self) -> bool {
        self.state.borrow().has_index
    }

    pub fn is_instanced(&self) -> bool {
        self.state.borrow().has_instance
    }

    /// 只释放输入装配对象，不释放引用的缓冲区
    pub fn destroy(self) {}

    pub(crate) fn downgrade(&self) -> Weak<RefCell<PipelineState<B>>> {
        Rc::downgrade(&self.state)
    }

    pub(crate) fn ptr_eq(&self, other: &Weak<RefCell<PipelineState<B>>>) -> bool {
        std::ptr::eq(Rc::as_ptr(&self.state), other.as_ptr())
    }
}

impl<B: Backend> std::fmt::Debug for Pipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Pipeline")
            .field("native", &state.native)
            .field("desc", &state.desc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{test_context, NativeCall};
    use crate::renderer::descriptor::{BufferDesc, VertexLayoutDesc};
    use crate::renderer::types::{DrawMode, IndexType, LayoutType};
    use crate::renderer::vertex::ColorVertex;

    #[test]
    fn test_create_configures_bindings() {
        let ctx = test_context();
        let vertices = Buffer::new(&ctx, &BufferDesc::vertex(84), None).unwrap();
        let instances = Buffer::new(&ctx, &BufferDesc::vertex(32), None).unwrap();
        let desc = PipelineDesc::new(3, ColorVertex::layout())
            .with_instance_layout(VertexLayoutDesc::new([LayoutType::Float4]));
        let pipeline = Pipeline::create(
            &ctx,
            &desc,
            PipelineBuffers::vertex(&vertices).with_instance(&instances),
        )
        .unwrap();

        assert_eq!(&*pipeline.desc(), &desc);
        assert!(pipeline.is_instanced());
        assert!(!pipeline.is_indexed());

        let calls = ctx.device().calls();
        let divisors: Vec<(u32, u32)> = calls
            .iter()
            .filter_map(|c| match c {
                NativeCall::VertexAttribDivisor { index, divisor } => Some((*index, *divisor)),
                _ => None,
            })
            .collect();
        assert_eq!(divisors, vec![(0, 0), (1, 0), (2, 1)]);
        assert!(calls
            .iter()
            .any(|c| matches!(c, NativeCall::VertexAttribPointer { index: 1, stride: 28, offset: 12, .. })));
    }

    #[test]
    fn test_update_keeps_layout() {
        let ctx = test_context();
        let vertices = Buffer::new(&ctx, &BufferDesc::vertex(112), None).unwrap();
        let indices = Buffer::new(&ctx, &BufferDesc::index(12), None).unwrap();
        let pipeline = Pipeline::create(
            &ctx,
            &PipelineDesc::new(4, ColorVertex::layout()),
            PipelineBuffers::vertex(&vertices),
        )
        .unwrap();

        let update = PipelineDesc {
            layouts: Vec::new(),
            ..PipelineDesc::default()
        }
        .with_indices(6, IndexType::U16)
        .with_draw_mode(DrawMode::Lines);
        pipeline.update(&update, PipelineBuffers::vertex(&vertices).with_index(&indices));

        assert!(pipeline.is_indexed());
        assert_eq!(pipeline.desc().draw_mode, DrawMode::Lines);
        assert_eq!(pipeline.desc().layouts, vec![ColorVertex::layout()]);
        assert_eq!(pipeline.layout().stride(0), 28);
    }

    #[test]
    #[should_panic(expected = "must be a vertex buffer")]
    fn test_rejects_non_vertex_buffer() {
        let ctx = test_context();
        let uniform = Buffer::new(&ctx, &BufferDesc::uniform(16), None).unwrap();
        let _ = Pipeline::create(
            &ctx,
            &PipelineDesc::new(3, ColorVertex::layout()),
            PipelineBuffers::vertex(&uniform),
        );
    }

    #[test]
    fn test_destroy_leaves_buffers() {
        let ctx = test_context();
        let vertices = Buffer::new(&ctx, &BufferDesc::vertex(84), None).unwrap();
        let pipeline = Pipeline::create(
            &ctx,
            &PipelineDesc::new(3, ColorVertex::layout()),
            PipelineBuffers::vertex(&vertices),
        )
        .unwrap();
        pipeline.destroy();

        let calls = ctx.device().calls();
        assert!(calls.iter().any(|c| matches!(c, NativeCall::DeleteVertexArray { .. })));
        assert!(!calls.iter().any(|c| matches!(c, NativeCall::DeleteBuffer { .. })));
        assert!(vertices.is_loaded());
    }
}
