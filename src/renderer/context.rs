//! 渲染上下文
//!
//! `Context` 拥有后端设备、全局渲染状态（深度 / 模板 / 混合 / 剔除 / 裁剪）、
//! 当前绑定的管线（弱引用，上下文不拥有管线）和当前渲染目标标识（0 为默认后缓冲），
//! 并提供提交协议：
//!
//! ```text
//! use_pipeline -> use_bindings -> draw / dispatch -> memory_barrier -> present
//! ```
//!
//! # 绘制就绪状态机
//!
//! ```text
//! Uninitialized --init--> Ready --use_pipeline--> PipelineBound --use_bindings--> Drawable
//!       ^                                                                            |
//!       +-------------------------------- shutdown ---------------------------------+
//! ```
//!
//! 状态设置器立即重新应用原生状态，下一次绘制即可观察到；
//! 抽象层不做任何隐式重排或批处理。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::config::GraphicsConfig;
use crate::core::error::Result;
use crate::gal_assert;
use crate::gfx::backend::NativeSurface;

use super::backend_trait::{Backend, DeviceLimits};
use super::descriptor::{BlendDesc, CullDesc, DepthDesc, Rect, StencilDesc};
use super::framebuffer::{Framebuffer, FramebufferState};
use super::pipeline::{Pipeline, PipelineState};
use super::shader::{Shader, ShaderMode};
use super::sync::BarrierFlags;
use super::texture::{Cubemap, Texture};
use super::types::*;

/// 上下文创建参数
#[derive(Clone)]
pub struct ContextDesc {
    /// 窗口系统提供的原生表面
    pub window: Rc<dyn NativeSurface>,
    /// 初始启用的状态
    pub state_flags: StateFlags,
    pub depth: DepthDesc,
    pub stencil: StencilDesc,
    pub cull: CullDesc,
    pub blend: BlendDesc,
    pub has_vsync: bool,
}

impl ContextDesc {
    /// 默认状态：开启深度测试与背面剔除
    pub fn new(window: Rc<dyn NativeSurface>) -> Self {
        Self {
            window,
            state_flags: StateFlags::DEPTH | StateFlags::CULL,
            depth: DepthDesc::default(),
            stencil: StencilDesc::default(),
            cull: CullDesc::default(),
            blend: BlendDesc::default(),
            has_vsync: true,
        }
    }

    /// 按配置文件中的图形配置填充开关与垂直同步
    pub fn from_config(window: Rc<dyn NativeSurface>, config: &GraphicsConfig) -> Self {
        Self {
            state_flags: config.state_flags(),
            has_vsync: config.vsync,
            ..Self::new(window)
        }
    }
}

impl std::fmt::Debug for ContextDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextDesc")
            .field("window_size", &self.window.size())
            .field("state_flags", &self.state_flags)
            .field("depth", &self.depth)
            .field("stencil", &self.stencil)
            .field("cull", &self.cull)
            .field("blend", &self.blend)
            .field("has_vsync", &self.has_vsync)
            .finish()
    }
}

/// 绘制就绪阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPhase {
    Uninitialized,
    Ready,
    PipelineBound,
    Drawable,
}

/// 一次 `use_bindings` 绑定的资源
///
/// 纹理与图像各自最多 `TEXTURES_MAX` 个，立方体贴图最多 `CUBEMAPS_MAX` 个，
/// 槽位由调用方指定。
pub struct BindingDesc<'a, B: Backend> {
    pub shader: &'a Shader<B>,
    pub textures: Vec<(u32, &'a Texture<B>)>,
    pub images: Vec<(u32, &'a Texture<B>)>,
    pub cubemaps: Vec<(u32, &'a Cubemap<B>)>,
}

impl<'a, B: Backend> BindingDesc<'a, B> {
    pub fn new(shader: &'a Shader<B>) -> Self {
        Self {
            shader,
            textures: Vec::new(),
            images: Vec::new(),
            cubemaps: Vec::new(),
        }
    }

    pub fn texture(mut self, slot: u32, texture: &'a Texture<B>) -> Self {
        self.textures.push((slot, texture));
        self
    }

    pub fn image(mut self, slot: u32, image: &'a Texture<B>) -> Self {
        self.images.push((slot, image));
        self
    }

    pub fn cubemap(mut self, slot: u32, cubemap: &'a Cubemap<B>) -> Self {
        self.cubemaps.push((slot, cubemap));
        self
    }
}

/// 渲染上下文
pub struct Context<B: Backend> {
    device: Rc<B>,
    window: Rc<dyn NativeSurface>,
    limits: DeviceLimits,
    initialized: bool,
    has_vsync: bool,

    enabled: StateFlags,
    depth: DepthDesc,
    stencil: StencilDesc,
    cull: CullDesc,
    blend: BlendDesc,
    viewport: Rect,
    scissor: Rect,

    target: Option<Weak<FramebufferState<B>>>,
    target_id: u32,
    pipeline: Option<Weak<RefCell<PipelineState<B>>>>,
    shader_mode: Option<ShaderMode>,
    framebuffer_ids: Cell<u32>,
}

impl<B: Backend> Context<B> {
    /// 创建设备并应用初始状态
    ///
    /// # 返回值
    ///
    /// 设备或交换链创建失败时记录错误并返回 `Err`，不做重试
    pub fn init(desc: &ContextDesc) -> Result<Self> {
        let _span = crate::span_trace!("context_init").entered();

        let device = match B::init(Rc::clone(&desc.window), desc.has_vsync) {
            Ok(device) => Rc::new(device),
            Err(e) => {
                crate::gal_error!(error = %e, "Failed to initialise graphics device");
                return Err(e);
            }
        };

        let (width, height) = desc.window.size();
        let viewport = Rect::new(0, 0, width as i32, height as i32);
        let limits = device.limits();

        let context = Self {
            device,
            window: Rc::clone(&desc.window),
            limits,
            initialized: true,
            has_vsync: desc.has_vsync,
            enabled: desc.state_flags,
            depth: desc.depth,
            stencil: desc.stencil,
            cull: desc.cull,
            blend: desc.blend,
            viewport,
            scissor: viewport,
            target: None,
            target_id: 0,
            pipeline: None,
            shader_mode: None,
            framebuffer_ids: Cell::new(1),
        };

        for kind in StateKind::ALL {
            context.device.set_capability(kind, desc.state_flags.contains(kind.flag()));
        }
        context.apply_depth();
        context.apply_stencil();
        context.apply_blend();
        context.apply_cull();
        context.device.set_viewport(viewport);
        context.device.set_scissor_rect(viewport);
        context.device.bind_target(None);

        crate::gal_info!(
            backend = context.device.name(),
            width,
            height,
            vsync = desc.has_vsync,
            states = ?desc.state_flags,
            "Context initialised"
        );
        Ok(context)
    }

    /// 释放绑定并回到未初始化状态
    ///
    /// 原生设备在最后一个引用它的资源释放后销毁。
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.pipeline = None;
        self.target = None;
        self.target_id = 0;
        self.shader_mode = None;
        self.initialized = false;
        crate::gal_info!(backend = self.device.name(), "Context shut down");
    }

    // ---- 全局状态 ----

    /// 开关一种全局状态
    pub fn set_state(&mut self, state: StateKind, enabled: bool) {
        self.ensure_initialized();
        self.enabled.set(state.flag(), enabled);
        self.device.set_capability(state, enabled);
        tracing::trace!(state = ?state, enabled, "State toggled");
    }

    pub fn is_enabled(&self, state: StateKind) -> bool {
        self.enabled.contains(state.flag())
    }

    pub fn set_depth_state(&mut self, desc: &DepthDesc) {
        self.ensure_initialized();
        self.depth = *desc;
        self.apply_depth();
    }

    pub fn set_stencil_state(&mut self, desc: &StencilDesc) {
        self.ensure_initialized();
        self.stencil = *desc;
        self.apply_stencil();
    }

    pub fn set_cull_state(&mut self, desc: &CullDesc) {
        self.ensure_initialized();
        self.cull = *desc;
        self.apply_cull();
    }

    pub fn set_blend_state(&mut self, desc: &BlendDesc) {
        self.ensure_initialized();
        self.blend = *desc;
        self.apply_blend();
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.ensure_initialized();
        self.viewport = Rect::new(x, y, width, height);
        self.device.set_viewport(self.viewport);
    }

    pub fn set_scissor_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.ensure_initialized();
        self.scissor = Rect::new(x, y, width, height);
        self.device.set_scissor_rect(self.scissor);
    }

    // ---- 渲染目标 ----

    /// 切换渲染目标，`None` 为默认后缓冲
    ///
    /// 同时切换 `clear` 使用的清除掩码。
    pub fn set_target(&mut self, target: Option<&Framebuffer<B>>) {
        self.ensure_initialized();
        self.target = target.map(Framebuffer::downgrade);
        self.target_id = target.map_or(0, Framebuffer::id);
        self.device.bind_target(target.map(Framebuffer::native));
        tracing::trace!(target = self.target_id, "Render target set");
    }

    /// 用当前目标的清除掩码清除
    ///
    /// 掩码取自最近一次 `set_target`，先清除再切换目标会清到上一个目标。
    pub fn clear(&self, r: f32, g: f32, b: f32, a: f32) {
        self.ensure_initialized();
        let target = self.current_native_target();
        let flags = match &target {
            Some(state) => state.clear_flags,
            None => self.default_clear_flags(),
        };
        self.device.clear(
            target.as_deref().map(|s| &s.native),
            B::translate_clear_flags(flags),
            [r, g, b, a],
            1.0,
            0,
        );
    }

    // ---- 绑定 ----

    /// 绑定着色器以及纹理、图像、立方体贴图
    pub fn use_bindings(&mut self, bindings: &BindingDesc<'_, B>) {
        self.ensure_initialized();
        let shader = bindings.shader;
        gal_assert!(shader.mode().is_some(), "cannot bind a shader that was never loaded");
        gal_assert!(
            bindings.textures.len() <= TEXTURES_MAX,
            "{} textures exceed the limit of {}",
            bindings.textures.len(),
            TEXTURES_MAX
        );
        gal_assert!(
            bindings.images.len() <= TEXTURES_MAX,
            "{} images exceed the limit of {}",
            bindings.images.len(),
            TEXTURES_MAX
        );
        gal_assert!(
            bindings.cubemaps.len() <= CUBEMAPS_MAX,
            "{} cubemaps exceed the limit of {}",
            bindings.cubemaps.len(),
            CUBEMAPS_MAX
        );

        self.device.use_shader(shader.native());

        for &(slot, texture) in &bindings.textures {
            gal_assert!((slot as usize) < TEXTURES_MAX, "texture slot {} out of range", slot);
            gal_assert!(
                !texture.ty().is_render_target(),
                "texture slot {} holds a render target, which cannot be sampled",
                slot
            );
            self.device.bind_texture(slot, texture.target(), texture.native());
        }

        for &(slot, image) in &bindings.images {
            gal_assert!((slot as usize) < TEXTURES_MAX, "image slot {} out of range", slot);
            gal_assert!(
                !image.ty().is_render_target(),
                "image slot {} holds a render target, which cannot be bound as an image",
                slot
            );
            let format = image.native_format().internal;
            let access = B::translate_image_access(image.desc().access);
            self.device.bind_image(slot, image.native(), format, access);
        }

        for &(slot, cubemap) in &bindings.cubemaps {
            gal_assert!((slot as usize) < CUBEMAPS_MAX, "cubemap slot {} out of range", slot);
            self.device
                .bind_texture(TEXTURES_MAX as u32 + slot, cubemap.target(), cubemap.native());
        }

        self.shader_mode = shader.mode();
        tracing::trace!(
            shader = ?shader.native(),
            textures = bindings.textures.len(),
            images = bindings.images.len(),
            cubemaps = bindings.cubemaps.len(),
            "Bindings applied"
        );
    }

    /// 记录绑定的管线并配置输入装配
    ///
    /// 管线的 `depth_mask`、`stencil_ref`、`blend_factor` 覆盖到当前状态上并重新应用。
    pub fn use_pipeline(&mut self, pipeline: &Pipeline<B>) {
        self.ensure_initialized();
        {
            let desc = pipeline.desc();
            self.depth.write_mask = desc.depth_mask;
            self.stencil.reference = desc.stencil_ref;
            self.blend.constant_color = desc.blend_factor;
        }
        self.apply_depth();
        self.apply_stencil();
        self.apply_blend();

        let already_bound = self
            .pipeline
            .as_ref()
            .is_some_and(|bound| pipeline.ptr_eq(bound));
        if !already_bound {
            self.pipeline = Some(pipeline.downgrade());
        }
        if let Some(state) = self.bound_pipeline() {
            self.device.bind_input_assembly(&state.borrow().native);
        }
    }

    // ---- 提交 ----

    /// 按管线的绘制模式绘制
    ///
    /// 管线带索引缓冲时走索引路径（数量为 `indices_count`），否则绘制 `vertices_count` 个顶点。
    pub fn draw(&self, start_element: u32) {
        self.submit(start_element, 1);
    }

    /// 实例化绘制
    pub fn draw_instanced(&self, start_element: u32, instance_count: u32) {
        gal_assert!(instance_count > 0, "instanced draw needs at least one instance");
        self.submit(start_element, instance_count);
    }

    /// 计算调度
    ///
    /// 每个维度必须在 `1..=min(MAX_COMPUTE_WORK_GROUPS_COUNT, 设备上限)` 之内。
    pub fn dispatch(&self, x: u32, y: u32, z: u32) {
        self.ensure_initialized();
        gal_assert!(self.bound_pipeline().is_some(), "dispatch without a bound pipeline");
        gal_assert!(
            self.shader_mode == Some(ShaderMode::Compute),
            "dispatch requires a bound compute shader, found {:?}",
            self.shader_mode
        );
        for (axis, (count, device_max)) in [x, y, z]
            .into_iter()
            .zip(self.limits.max_compute_work_groups)
            .enumerate()
        {
            let max = MAX_COMPUTE_WORK_GROUPS_COUNT.min(device_max);
            gal_assert!(
                (1..=max).contains(&count),
                "work group count {} on axis {} is outside 1..={}",
                count,
                axis,
                max
            );
        }
        self.device.dispatch(x, y, z);
        tracing::trace!(x, y, z, "Dispatch");
    }

    /// 显式内存屏障
    ///
    /// 计算写入的资源在被后续绘制或调度读取前必须由调用方插入屏障，抽象层不推断。
    pub fn memory_barrier(&self, flags: BarrierFlags) {
        self.ensure_initialized();
        self.device.memory_barrier(B::translate_barrier(flags));
        tracing::trace!(flags = ?flags, "Memory barrier");
    }

    /// 呈现；开启垂直同步时可能阻塞
    pub fn present(&self) -> Result<()> {
        self.ensure_initialized();
        self.device.present(self.has_vsync)
    }

    // ---- 查询 ----

    pub fn phase(&self) -> ContextPhase {
        if !self.initialized {
            ContextPhase::Uninitialized
        } else if self.bound_pipeline().is_none() {
            ContextPhase::Ready
        } else if self.shader_mode.is_none() {
            ContextPhase::PipelineBound
        } else {
            ContextPhase::Drawable
        }
    }

    pub fn depth_state(&self) -> &DepthDesc {
        &self.depth
    }

    pub fn stencil_state(&self) -> &StencilDesc {
        &self.stencil
    }

    pub fn blend_state(&self) -> &BlendDesc {
        &self.blend
    }

    pub fn cull_state(&self) -> &CullDesc {
        &self.cull
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn scissor_rect(&self) -> Rect {
        self.scissor
    }

    /// 当前渲染目标标识，0 为默认后缓冲
    pub fn current_target(&self) -> u32 {
        self.target_id
    }

    pub fn has_vsync(&self) -> bool {
        self.has_vsync
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    pub fn window(&self) -> &Rc<dyn NativeSurface> {
        &self.window
    }

    pub fn device(&self) -> &Rc<B> {
        &self.device
    }

    pub(crate) fn next_framebuffer_id(&self) -> u32 {
        let id = self.framebuffer_ids.get();
        self.framebuffer_ids.set(id + 1);
        id
    }

    /// 当前离屏目标；目标已被释放时触发前置条件断言
    pub(crate) fn current_native_target(&self) -> Option<Rc<FramebufferState<B>>> {
        self.target.as_ref().map(|weak| {
            weak.upgrade()
                .unwrap_or_else(|| crate::gal_fail!("render target {} was destroyed while bound", self.target_id))
        })
    }

    fn default_clear_flags(&self) -> ClearFlags {
        let mut flags = ClearFlags::COLOR;
        if self.enabled.contains(StateFlags::DEPTH) {
            flags |= ClearFlags::DEPTH;
        }
        if self.enabled.contains(StateFlags::STENCIL) {
            flags |= ClearFlags::STENCIL;
        }
        flags
    }

    fn bound_pipeline(&self) -> Option<Rc<RefCell<PipelineState<B>>>> {
        self.pipeline.as_ref().and_then(Weak::upgrade)
    }

    fn ensure_initialized(&self) {
        gal_assert!(self.initialized, "context used after shutdown");
    }

    fn submit(&self, start_element: u32, instances: u32) {
        self.ensure_initialized();
        let pipeline = self
            .bound_pipeline()
            .unwrap_or_else(|| crate::gal_fail!("draw without a bound pipeline"));
        gal_assert!(
            self.shader_mode == Some(ShaderMode::Graphics),
            "draw requires a bound graphics shader, found {:?}",
            self.shader_mode
        );

        let state = pipeline.borrow();
        let mode = B::translate_draw_mode(state.desc.draw_mode);
        if state.has_index {
            let ty = state.desc.indices_type;
            self.device.draw_indexed(
                mode,
                B::translate_index_type(ty),
                ty.size(),
                start_element,
                state.desc.indices_count,
                instances,
            );
        } else {
            self.device
                .draw(mode, start_element, state.desc.vertices_count, instances);
        }
        tracing::trace!(
            indexed = state.has_index,
            start = start_element,
            instances,
            "Draw"
        );
    }

    fn apply_depth(&self) {
        self.device
            .apply_depth_state(B::translate_compare_func(self.depth.func), self.depth.write_mask);
    }

    fn apply_stencil(&self) {
        self.device.apply_stencil_state(
            B::translate_stencil_face(&self.stencil.front),
            B::translate_stencil_face(&self.stencil.back),
            self.stencil.reference,
            self.stencil.read_mask,
            self.stencil.write_mask,
        );
    }

    fn apply_blend(&self) {
        self.device.apply_blend_state(B::translate_blend(&self.blend));
    }

    fn apply_cull(&self) {
        self.device
            .apply_cull_state(B::translate_cull_mode(self.cull.mode), B::translate_winding(self.cull.front_face));
    }
}

impl<B: Backend> Drop for Context<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::OffscreenSurface;
    use crate::gfx::headless::{test_context, HeadlessDevice, NativeCall};
    use crate::renderer::descriptor::{
        BufferDesc, FramebufferDesc, PipelineDesc, ShaderDesc, StencilFaceDesc, TextureDesc,
    };
    use crate::renderer::framebuffer::FramebufferAttachments;
    use crate::renderer::pipeline::PipelineBuffers;
    use crate::renderer::resource::Buffer;
    use crate::renderer::vertex::ColorVertex;

    const VS: &str = "#version 430\nlayout(location = 0) in vec3 a_position;\nlayout(location = 1) in vec4 a_color;\nvoid main() {}\n";
    const PS: &str = "#version 430\nout vec4 o_color;\nvoid main() {}\n";
    const CS: &str = "#version 430\nlayout(local_size_x = 16, local_size_y = 16) in;\nvoid main() {}\n";

    fn triangle(ctx: &Context<HeadlessDevice>) -> (Buffer<HeadlessDevice>, Pipeline<HeadlessDevice>) {
        let vertices = Buffer::new(ctx, &BufferDesc::vertex(84), None).unwrap();
        let pipeline = Pipeline::create(
            ctx,
            &PipelineDesc::new(3, ColorVertex::layout()),
            PipelineBuffers::vertex(&vertices),
        )
        .unwrap();
        (vertices, pipeline)
    }

    #[test]
    fn test_init_applies_initial_state() {
        let ctx = test_context();
        assert_eq!(ctx.phase(), ContextPhase::Ready);
        assert!(ctx.is_enabled(StateKind::Depth));
        assert_eq!(ctx.current_target(), 0);
        assert_eq!(ctx.viewport(), Rect::new(0, 0, 800, 600));
        assert!(ctx
            .device()
            .calls()
            .contains(&NativeCall::Enable { cap: glow::DEPTH_TEST }));
    }

    #[test]
    fn test_from_config() {
        let config = GraphicsConfig {
            vsync: false,
            blend: true,
            ..GraphicsConfig::default()
        };
        let desc = ContextDesc::from_config(Rc::new(OffscreenSurface::new(64, 64)), &config);
        assert!(!desc.has_vsync);
        assert!(desc.state_flags.contains(StateFlags::BLEND));
    }

    #[test]
    fn test_phase_transitions() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();

        ctx.use_pipeline(&pipeline);
        assert_eq!(ctx.phase(), ContextPhase::PipelineBound);
        ctx.use_bindings(&BindingDesc::new(&shader));
        assert_eq!(ctx.phase(), ContextPhase::Drawable);

        ctx.shutdown();
        assert_eq!(ctx.phase(), ContextPhase::Uninitialized);
    }

    #[test]
    fn test_destroyed_pipeline_unbinds() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        ctx.use_pipeline(&pipeline);
        pipeline.destroy();
        assert_eq!(ctx.phase(), ContextPhase::Ready);
    }

    #[test]
    #[should_panic(expected = "draw without a bound pipeline")]
    fn test_draw_without_pipeline() {
        let ctx = test_context();
        ctx.draw(0);
    }

    #[test]
    #[should_panic(expected = "requires a bound graphics shader")]
    fn test_draw_without_shader() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        ctx.use_pipeline(&pipeline);
        ctx.draw(0);
    }

    #[test]
    fn test_pipeline_overrides_dynamic_state() {
        let mut ctx = test_context();
        let vertices = Buffer::new(&ctx, &BufferDesc::vertex(84), None).unwrap();
        let desc = PipelineDesc {
            depth_mask: false,
            stencil_ref: 3,
            blend_factor: [0.5; 4],
            ..PipelineDesc::new(3, ColorVertex::layout())
        };
        let pipeline = Pipeline::create(&ctx, &desc, PipelineBuffers::vertex(&vertices)).unwrap();
        ctx.use_pipeline(&pipeline);

        assert!(!ctx.depth_state().write_mask);
        assert_eq!(ctx.stencil_state().reference, 3);
        assert_eq!(ctx.blend_state().constant_color, [0.5; 4]);
        assert!(ctx
            .device()
            .calls()
            .contains(&NativeCall::DepthMask { enabled: false }));
    }

    #[test]
    fn test_state_setters_reapply() {
        let mut ctx = test_context();
        ctx.set_depth_state(&DepthDesc {
            func: CompareFunc::GreaterEqual,
            write_mask: true,
        });
        ctx.set_state(StateKind::Blend, true);
        ctx.set_blend_state(&BlendDesc::alpha());

        let calls = ctx.device().calls();
        assert!(calls.contains(&NativeCall::DepthFunc { func: glow::GEQUAL }));
        assert!(calls.contains(&NativeCall::Enable { cap: glow::BLEND }));
        assert!(calls.iter().any(|c| matches!(
            c,
            NativeCall::BlendFuncSeparate { src_rgb: glow::SRC_ALPHA, dst_rgb: glow::ONE_MINUS_SRC_ALPHA, .. }
        )));
        assert_eq!(ctx.blend_state(), &BlendDesc::alpha());
    }

    #[test]
    fn test_stencil_state_reapplies_both_faces() {
        let mut ctx = test_context();
        ctx.device().clear_calls();
        let face = StencilFaceDesc {
            func: CompareFunc::Equal,
            pass: StencilOp::Replace,
            ..StencilFaceDesc::default()
        };
        ctx.set_stencil_state(&StencilDesc {
            front: face,
            back: face,
            reference: 1,
            read_mask: 0x0f,
            write_mask: 0xf0,
        });

        let calls = ctx.device().calls();
        for face in [glow::FRONT, glow::BACK] {
            assert!(calls.contains(&NativeCall::StencilFuncSeparate {
                face,
                func: glow::EQUAL,
                reference: 1,
                mask: 0x0f,
            }));
            assert!(calls.contains(&NativeCall::StencilOpSeparate {
                face,
                fail: glow::KEEP,
                depth_fail: glow::KEEP,
                pass: glow::REPLACE,
            }));
        }
        assert!(calls.contains(&NativeCall::StencilMask { mask: 0xf0 }));
        assert_eq!(ctx.stencil_state().reference, 1);
    }

    #[test]
    fn test_cull_state_reapplies() {
        let mut ctx = test_context();
        ctx.device().clear_calls();
        ctx.set_cull_state(&CullDesc {
            mode: CullMode::Front,
            front_face: Winding::Clockwise,
        });

        assert_eq!(
            ctx.device().calls(),
            vec![
                NativeCall::CullFace { mode: glow::FRONT },
                NativeCall::FrontFace { winding: glow::CW },
            ]
        );
        assert_eq!(ctx.cull_state().mode, CullMode::Front);
    }

    #[test]
    fn test_scissor_rect_reapplies() {
        let mut ctx = test_context();
        ctx.device().clear_calls();
        ctx.set_scissor_rect(10, 20, 30, 40);
        assert_eq!(
            ctx.device().calls(),
            vec![NativeCall::Scissor {
                rect: Rect::new(10, 20, 30, 40)
            }]
        );
    }

    #[test]
    fn test_draw_instanced_without_indices() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        ctx.use_pipeline(&pipeline);
        ctx.use_bindings(&BindingDesc::new(&shader));
        ctx.device().clear_calls();
        ctx.draw_instanced(0, 4);

        assert_eq!(
            ctx.device().draw_calls(),
            vec![NativeCall::DrawArraysInstanced {
                mode: glow::TRIANGLES,
                first: 0,
                count: 3,
                instances: 4,
            }]
        );
    }

    #[test]
    fn test_draw_instanced_with_indices() {
        let mut ctx = test_context();
        let vertices = Buffer::new(&ctx, &BufferDesc::vertex(112), None).unwrap();
        let indices = Buffer::new(&ctx, &BufferDesc::index(12), None).unwrap();
        let pipeline = Pipeline::create(
            &ctx,
            &PipelineDesc::new(4, ColorVertex::layout()).with_indices(6, IndexType::U16),
            PipelineBuffers::vertex(&vertices).with_index(&indices),
        )
        .unwrap();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        ctx.use_pipeline(&pipeline);
        ctx.use_bindings(&BindingDesc::new(&shader));
        ctx.device().clear_calls();
        ctx.draw_instanced(0, 4);

        assert_eq!(
            ctx.device().draw_calls(),
            vec![NativeCall::DrawElementsInstanced {
                mode: glow::TRIANGLES,
                format: glow::UNSIGNED_SHORT,
                count: 6,
                offset: 0,
                instances: 4,
            }]
        );
    }

    #[test]
    fn test_present_swaps_with_vsync_interval() {
        let ctx = test_context();
        ctx.device().clear_calls();
        ctx.present().unwrap();
        assert_eq!(ctx.device().calls(), vec![NativeCall::SwapBuffers { interval: 1 }]);

        let desc = ContextDesc {
            has_vsync: false,
            ..ContextDesc::new(Rc::new(OffscreenSurface::new(64, 64)))
        };
        let ctx: Context<HeadlessDevice> = Context::init(&desc).unwrap();
        ctx.device().clear_calls();
        ctx.present().unwrap();
        assert_eq!(ctx.device().calls(), vec![NativeCall::SwapBuffers { interval: 0 }]);
    }

    #[test]
    fn test_clear_uses_target_mask() {
        let mut ctx = test_context();
        ctx.clear(0.0, 0.0, 0.0, 1.0);

        let texture = Texture::new(&ctx, &TextureDesc::new_2d(4, 4, TextureFormat::Rgba8), None).unwrap();
        let framebuffer = Framebuffer::create(
            &ctx,
            &FramebufferDesc::default(),
            FramebufferAttachments::colors(&[&texture]),
        )
        .unwrap();
        ctx.set_target(Some(&framebuffer));
        assert_eq!(ctx.current_target(), framebuffer.id());
        ctx.clear(1.0, 0.0, 0.0, 1.0);

        let masks: Vec<u32> = ctx
            .device()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                NativeCall::Clear { mask, .. } => Some(mask),
                _ => None,
            })
            .collect();
        assert_eq!(
            masks,
            vec![glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT, glow::COLOR_BUFFER_BIT]
        );

        ctx.set_target(None);
        assert_eq!(ctx.current_target(), 0);
    }

    #[test]
    fn test_cubemaps_bind_after_texture_units() {
        let mut ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        let face = [0u8; 4];
        let cubemap = Cubemap::new(&ctx, &Default::default(), &[&face[..]; 6]).unwrap();
        ctx.use_bindings(&BindingDesc::new(&shader).cubemap(1, &cubemap));
        assert!(ctx.device().calls().iter().any(|c| matches!(
            c,
            NativeCall::BindTexture { unit, target: glow::TEXTURE_CUBE_MAP, .. } if *unit == TEXTURES_MAX as u32 + 1
        )));
    }

    #[test]
    #[should_panic(expected = "texture slot 16 out of range")]
    fn test_texture_slot_limit() {
        let mut ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        let texture = Texture::new(&ctx, &TextureDesc::new_2d(1, 1, TextureFormat::Rgba8), None).unwrap();
        ctx.use_bindings(&BindingDesc::new(&shader).texture(TEXTURES_MAX as u32, &texture));
    }

    #[test]
    #[should_panic(expected = "outside 1..=")]
    fn test_dispatch_rejects_zero_groups() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        let shader = Shader::new(&ctx, &ShaderDesc::compute(CS)).unwrap();
        ctx.use_pipeline(&pipeline);
        ctx.use_bindings(&BindingDesc::new(&shader));
        ctx.dispatch(4, 0, 1);
    }

    #[test]
    #[should_panic(expected = "outside 1..=")]
    fn test_dispatch_rejects_oversized_groups() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        let shader = Shader::new(&ctx, &ShaderDesc::compute(CS)).unwrap();
        ctx.use_pipeline(&pipeline);
        ctx.use_bindings(&BindingDesc::new(&shader));
        ctx.dispatch(MAX_COMPUTE_WORK_GROUPS_COUNT + 1, 1, 1);
    }

    #[test]
    #[should_panic(expected = "requires a bound compute shader")]
    fn test_dispatch_rejects_graphics_shader() {
        let mut ctx = test_context();
        let (_vertices, pipeline) = triangle(&ctx);
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        ctx.use_pipeline(&pipeline);
        ctx.use_bindings(&BindingDesc::new(&shader));
        ctx.dispatch(1, 1, 1);
    }

    #[test]
    #[should_panic(expected = "context used after shutdown")]
    fn test_use_after_shutdown() {
        let mut ctx = test_context();
        ctx.shutdown();
        ctx.set_viewport(0, 0, 1, 1);
    }
}
