//! 无头记录设备
//!
//! 不持有任何 GPU 资源：每个设备方法只分配名字并把调用追加到日志中。
//! 着色器反射通过扫描 GLSL 源码完成，链接规则只检查入口函数与计算工作组声明。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::core::error::Result;
use crate::gfx::backend::NativeSurface;
use crate::gfx::gl::translate as gl;
use crate::gfx::glsl::{self, GlslInterface};
use crate::renderer::backend_trait::{
    Backend, DepthAttachmentPoint, DeviceLimits, Extent3d, InputStreams, LinkReport, ShaderStages,
};
use crate::renderer::descriptor::{BlitRegion, Rect};
use crate::renderer::shader::{ShaderBlock, ShaderQueryDesc, ShaderVariable};
use crate::renderer::translate::{NativeBlend, NativePixelFormat, NativeSampling, StencilFaceOps, Translate};
use crate::renderer::types::{
    ShaderStage, StateKind, TextureType, UniformType, MAX_COMPUTE_WORK_GROUPS_COUNT, UNIFORM_BUFFERS_MAX,
    VERTEX_ATTRIBUTES_MAX,
};
use crate::renderer::vertex::CompiledLayout;

use super::command::NativeCall;

/// 记录原生调用而不执行的设备
pub struct HeadlessDevice {
    surface: Rc<dyn NativeSurface>,
    next_name: Cell<u32>,
    calls: RefCell<Vec<NativeCall>>,
    programs: RefCell<HashMap<u32, ShaderQueryDesc>>,
    attachments: RefCell<HashMap<u32, u32>>,
}

crate::impl_gl_translate!(HeadlessDevice);

impl HeadlessDevice {
    /// 到目前为止记录的全部调用
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.borrow().clone()
    }

    /// 只保留绘制调用
    pub fn draw_calls(&self) -> Vec<NativeCall> {
        self.calls.borrow().iter().filter(|c| c.is_draw()).cloned().collect()
    }

    /// 清空调用日志
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: NativeCall) {
        tracing::trace!(target: "dist_gal::headless", call = ?call);
        self.calls.borrow_mut().push(call);
    }

    fn allocate_name(&self) -> u32 {
        let name = self.next_name.get();
        self.next_name.set(name + 1);
        name
    }
}

impl std::fmt::Debug for HeadlessDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessDevice")
            .field("surface_size", &self.surface.size())
            .field("calls", &self.calls.borrow().len())
            .finish()
    }
}

/// 按 GL 规则链接：每个阶段都要有 `main`，计算阶段还要声明工作组尺寸
fn link(stages: &ShaderStages<'_>) -> std::result::Result<ShaderQueryDesc, String> {
    match *stages {
        ShaderStages::Graphics { vertex, pixel } => {
            let vertex = glsl::scan(vertex);
            let pixel = glsl::scan(pixel);
            for (name, stage) in [("vertex", &vertex), ("pixel", &pixel)] {
                if !stage.has_main {
                    return Err(format!("error: {} stage has no entry point main()", name));
                }
            }
            Ok(reflect_stages(&[&vertex, &pixel], Some(&vertex), [0; 3]))
        }
        ShaderStages::Compute { compute } => {
            let compute = glsl::scan(compute);
            if !compute.has_main {
                return Err("error: compute stage has no entry point main()".to_string());
            }
            let local_size = compute
                .local_size
                .ok_or_else(|| "error: compute stage does not declare a work group size".to_string())?;
            Ok(reflect_stages(&[&compute], None, local_size))
        }
    }
}

fn reflect_stages(
    stages: &[&GlslInterface],
    vertex: Option<&GlslInterface>,
    work_group_size: [u32; 3],
) -> ShaderQueryDesc {
    let variable = |decl: &glsl::GlslDeclaration, location: i32| {
        let ty = HeadlessDevice::reflect_uniform_type(gl::glsl_type(&decl.ty));
        ShaderVariable {
            name: decl.name.clone(),
            ty,
            components: ty.components(),
            array_size: decl.array_size,
            location,
        }
    };

    let attributes: Vec<ShaderVariable> = vertex
        .map(|stage| {
            stage
                .inputs
                .iter()
                .enumerate()
                .map(|(i, input)| variable(input, input.location.unwrap_or(i as i32)))
                .collect()
        })
        .unwrap_or_default();

    let mut uniforms: Vec<ShaderVariable> = Vec::new();
    let mut next_location = 0i32;
    let mut uniform_blocks: Vec<ShaderBlock> = Vec::new();
    for stage in stages {
        for uniform in &stage.uniforms {
            if uniforms.iter().any(|u| u.name == uniform.name) {
                continue;
            }
            let location = uniform.location.unwrap_or(next_location);
            next_location = next_location.max(location) + uniform.array_size as i32;
            uniforms.push(variable(uniform, location));
        }
        for block in &stage.blocks {
            if uniform_blocks.iter().any(|b| b.name == block.name) {
                continue;
            }
            uniform_blocks.push(ShaderBlock {
                name: block.name.clone(),
                index: uniform_blocks.len() as u32,
                size: block.size,
            });
        }
    }

    ShaderQueryDesc {
        attributes,
        uniforms,
        uniform_blocks,
        work_group_size,
    }
}

impl Backend for HeadlessDevice {
    type Buffer = u32;
    type Texture = u32;
    type Shader = u32;
    type InputAssembly = u32;
    type Framebuffer = u32;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn init(surface: Rc<dyn NativeSurface>, _vsync: bool) -> Result<Self> {
        Ok(Self {
            surface,
            next_name: Cell::new(1),
            calls: RefCell::new(Vec::new()),
            programs: RefCell::new(HashMap::new()),
            attachments: RefCell::new(HashMap::new()),
        })
    }

    fn limits(&self) -> DeviceLimits {
        DeviceLimits {
            max_texture_size: 16384,
            max_compute_work_groups: [MAX_COMPUTE_WORK_GROUPS_COUNT; 3],
            max_vertex_attributes: VERTEX_ATTRIBUTES_MAX as u32,
            max_uniform_buffer_bindings: UNIFORM_BUFFERS_MAX as u32,
        }
    }

    fn set_capability(&self, state: StateKind, enabled: bool) {
        let cap = gl::capability(state);
        self.record(if enabled {
            NativeCall::Enable { cap }
        } else {
            NativeCall::Disable { cap }
        });
    }

    fn apply_depth_state(&self, func: u32, write_mask: bool) {
        self.record(NativeCall::DepthFunc { func });
        self.record(NativeCall::DepthMask { enabled: write_mask });
    }

    fn apply_stencil_state(
        &self,
        front: StencilFaceOps<u32, u32>,
        back: StencilFaceOps<u32, u32>,
        reference: i32,
        read_mask: u32,
        write_mask: u32,
    ) {
        for (face, ops) in [(glow::FRONT, front), (glow::BACK, back)] {
            self.record(NativeCall::StencilFuncSeparate {
                face,
                func: ops.func,
                reference,
                mask: read_mask,
            });
            self.record(NativeCall::StencilOpSeparate {
                face,
                fail: ops.fail,
                depth_fail: ops.depth_fail,
                pass: ops.pass,
            });
        }
        self.record(NativeCall::StencilMask { mask: write_mask });
    }

    fn apply_blend_state(&self, blend: NativeBlend<u32, u32>) {
        self.record(NativeCall::BlendFuncSeparate {
            src_rgb: blend.src_rgb,
            dst_rgb: blend.dst_rgb,
            src_alpha: blend.src_alpha,
            dst_alpha: blend.dst_alpha,
        });
        self.record(NativeCall::BlendEquationSeparate {
            rgb: blend.op_rgb,
            alpha: blend.op_alpha,
        });
        self.record(NativeCall::BlendColor {
            color: blend.constant_color,
        });
    }

    fn apply_cull_state(&self, mode: u32, front_face: u32) {
        self.record(NativeCall::CullFace { mode });
        self.record(NativeCall::FrontFace { winding: front_face });
    }

    fn set_viewport(&self, rect: Rect) {
        self.record(NativeCall::Viewport { rect });
    }

    fn set_scissor_rect(&self, rect: Rect) {
        self.record(NativeCall::Scissor { rect });
    }

    fn bind_target(&self, target: Option<&u32>) {
        self.record(NativeCall::BindFramebuffer {
            framebuffer: target.copied().unwrap_or(0),
        });
    }

    fn clear(&self, target: Option<&u32>, mask: u32, color: [f32; 4], depth: f32, stencil: i32) {
        self.record(NativeCall::Clear {
            framebuffer: target.copied().unwrap_or(0),
            mask,
            color,
            depth,
            stencil,
        });
    }

    fn create_buffer(&self) -> Result<u32> {
        let buffer = self.allocate_name();
        self.record(NativeCall::GenBuffer { buffer });
        Ok(buffer)
    }

    fn buffer_storage(&self, buffer: &u32, target: u32, usage: u32, size: usize, data: Option<&[u8]>) -> Result<()> {
        self.record(NativeCall::BufferData {
            buffer: *buffer,
            target,
            usage,
            size,
            initialized: data.is_some(),
        });
        Ok(())
    }

    fn buffer_sub_data(&self, buffer: &u32, target: u32, offset: usize, data: &[u8]) {
        self.record(NativeCall::BufferSubData {
            buffer: *buffer,
            target,
            offset,
            size: data.len(),
        });
    }

    fn destroy_buffer(&self, buffer: &u32) {
        self.record(NativeCall::DeleteBuffer { buffer: *buffer });
    }

    fn create_texture(&self, target: u32, _ty: TextureType) -> Result<u32> {
        let texture = self.allocate_name();
        self.record(NativeCall::GenTexture { texture, target });
        Ok(texture)
    }

    fn texture_parameters(&self, texture: &u32, target: u32, sampling: NativeSampling<u32, u32, u32>, mips: u32) {
        self.record(NativeCall::TexParameters {
            texture: *texture,
            target,
            min_filter: sampling.filter,
            mag_filter: gl::mag_filter(sampling.filter),
            wrap: sampling.wrap,
            compare: sampling.compare,
            max_level: mips.saturating_sub(1),
        });
    }

    fn allocate_texture(
        &self,
        texture: &u32,
        target: u32,
        format: &NativePixelFormat<u32>,
        extent: Extent3d,
        mips: u32,
    ) -> Result<()> {
        self.record(NativeCall::TexStorage {
            texture: *texture,
            target,
            internal: format.internal,
            width: extent.width,
            height: extent.height,
            depth: extent.depth,
            mips,
        });
        Ok(())
    }

    fn transfer_pixels(
        &self,
        texture: &u32,
        target: u32,
        _format: &NativePixelFormat<u32>,
        extent: Extent3d,
        alignment: u32,
        layer: u32,
        data: &[u8],
    ) {
        self.record(NativeCall::TexSubImage {
            texture: *texture,
            target,
            layer,
            width: extent.width,
            height: extent.height,
            depth: extent.depth,
            alignment,
            size: data.len(),
        });
    }

    fn generate_mipmaps(&self, texture: &u32, target: u32) {
        self.record(NativeCall::GenerateMipmap {
            texture: *texture,
            target,
        });
    }

    fn destroy_texture(&self, texture: &u32) {
        self.record(NativeCall::DeleteTexture { texture: *texture });
    }

    fn create_shader(&self) -> Result<u32> {
        let program = self.allocate_name();
        self.record(NativeCall::CreateProgram { program });
        Ok(program)
    }

    fn build_program(&self, shader: &u32, stages: &ShaderStages<'_>) -> LinkReport {
        let report = match link(stages) {
            Ok(query) => {
                self.programs.borrow_mut().insert(*shader, query);
                LinkReport::success()
            }
            Err(log) => {
                self.programs.borrow_mut().remove(shader);
                LinkReport::failure(log)
            }
        };
        self.record(NativeCall::LinkProgram {
            program: *shader,
            linked: report.linked,
        });
        report
    }

    fn reflect(&self, shader: &u32) -> ShaderQueryDesc {
        self.programs.borrow().get(shader).cloned().unwrap_or_default()
    }

    fn use_shader(&self, shader: &u32) {
        self.record(NativeCall::UseProgram { program: *shader });
    }

    fn bind_uniform_buffer(&self, shader: &u32, _stage: ShaderStage, buffer: &u32, target: u32, bind_point: u32) {
        self.record(NativeCall::BindBufferBase {
            program: *shader,
            target,
            index: bind_point,
            buffer: *buffer,
        });
    }

    fn upload_uniform(&self, shader: &u32, location: i32, ty: UniformType, count: u32, _data: &[u8]) {
        self.record(NativeCall::Uniform {
            program: *shader,
            location,
            ty,
            count,
        });
    }

    fn destroy_shader(&self, shader: &u32) {
        self.programs.borrow_mut().remove(shader);
        self.record(NativeCall::DeleteProgram { program: *shader });
    }

    fn bind_texture(&self, unit: u32, target: u32, texture: &u32) {
        self.record(NativeCall::BindTexture {
            unit,
            target,
            texture: *texture,
        });
    }

    fn bind_image(&self, unit: u32, texture: &u32, format: u32, access: u32) {
        self.record(NativeCall::BindImageTexture {
            unit,
            texture: *texture,
            format,
            access,
        });
    }

    fn create_input_assembly(&self) -> Result<u32> {
        let vao = self.allocate_name();
        self.record(NativeCall::GenVertexArray { vao });
        Ok(vao)
    }

    fn configure_input_assembly(&self, assembly: &u32, layout: &CompiledLayout<u32>, streams: InputStreams<'_, Self>) {
        self.record(NativeCall::BindVertexArray { vao: *assembly });
        for (index, binding) in layout.bindings.iter().enumerate() {
            let buffer = if index == 0 { Some(streams.vertex) } else { streams.instance };
            for attribute in layout.binding_attributes(index) {
                let Some(buffer) = buffer else {
                    self.record(NativeCall::DisableVertexAttrib {
                        index: attribute.location,
                    });
                    continue;
                };
                self.record(NativeCall::VertexAttribPointer {
                    index: attribute.location,
                    buffer: *buffer,
                    components: attribute.format.components,
                    element: attribute.format.format,
                    stride: binding.stride,
                    offset: attribute.offset,
                    integer: attribute.format.integer,
                });
                self.record(NativeCall::VertexAttribDivisor {
                    index: attribute.location,
                    divisor: binding.step.divisor(),
                });
            }
        }
        if let Some(index) = streams.index {
            self.record(NativeCall::BindIndexBuffer {
                vao: *assembly,
                buffer: *index,
            });
        }
    }

    fn bind_input_assembly(&self, assembly: &u32) {
        self.record(NativeCall::BindVertexArray { vao: *assembly });
    }

    fn destroy_input_assembly(&self, assembly: &u32) {
        self.record(NativeCall::DeleteVertexArray { vao: *assembly });
    }

    fn draw(&self, mode: u32, first: u32, count: u32, instances: u32) {
        self.record(if instances == 1 {
            NativeCall::DrawArrays { mode, first, count }
        } else {
            NativeCall::DrawArraysInstanced {
                mode,
                first,
                count,
                instances,
            }
        });
    }

    fn draw_indexed(&self, mode: u32, format: u32, index_size: u32, first: u32, count: u32, instances: u32) {
        let offset = first as usize * index_size as usize;
        self.record(if instances == 1 {
            NativeCall::DrawElements {
                mode,
                format,
                count,
                offset,
            }
        } else {
            NativeCall::DrawElementsInstanced {
                mode,
                format,
                count,
                offset,
                instances,
            }
        });
    }

    fn dispatch(&self, x: u32, y: u32, z: u32) {
        self.record(NativeCall::DispatchCompute { x, y, z });
    }

    fn memory_barrier(&self, mask: u32) {
        self.record(NativeCall::MemoryBarrier { bits: mask });
    }

    fn present(&self, vsync: bool) -> Result<()> {
        self.surface.swap_buffers();
        self.record(NativeCall::SwapBuffers {
            interval: i32::from(vsync),
        });
        Ok(())
    }

    fn create_framebuffer(&self) -> Result<u32> {
        let framebuffer = self.allocate_name();
        self.attachments.borrow_mut().insert(framebuffer, 0);
        self.record(NativeCall::GenFramebuffer { framebuffer });
        Ok(framebuffer)
    }

    fn attach_color(&self, framebuffer: &u32, index: u32, texture: &u32, _target: u32) {
        *self.attachments.borrow_mut().entry(*framebuffer).or_insert(0) += 1;
        self.record(NativeCall::FramebufferTexture {
            framebuffer: *framebuffer,
            attachment: gl::color_attachment(index),
            texture: *texture,
        });
    }

    fn attach_depth_stencil(&self, framebuffer: &u32, texture: &u32, target: u32, point: DepthAttachmentPoint) {
        *self.attachments.borrow_mut().entry(*framebuffer).or_insert(0) += 1;
        let attachment = gl::depth_attachment(point);
        self.record(if target == glow::RENDERBUFFER {
            NativeCall::FramebufferRenderbuffer {
                framebuffer: *framebuffer,
                attachment,
                renderbuffer: *texture,
            }
        } else {
            NativeCall::FramebufferTexture {
                framebuffer: *framebuffer,
                attachment,
                texture: *texture,
            }
        });
    }

    fn set_draw_buffers(&self, framebuffer: &u32, count: u32) {
        self.record(NativeCall::DrawBuffers {
            framebuffer: *framebuffer,
            count,
        });
    }

    fn framebuffer_complete(&self, framebuffer: &u32) -> bool {
        self.attachments
            .borrow()
            .get(framebuffer)
            .is_some_and(|count| *count > 0)
    }

    fn blit(&self, src: Option<&u32>, dst: Option<&u32>, region: BlitRegion, mask: u32) {
        self.record(NativeCall::BlitFramebuffer {
            src: src.copied().unwrap_or(0),
            dst: dst.copied().unwrap_or(0),
            src_rect: region.src,
            dst_rect: region.dst,
            mask,
        });
    }

    fn destroy_framebuffer(&self, framebuffer: &u32) {
        self.attachments.borrow_mut().remove(framebuffer);
        self.record(NativeCall::DeleteFramebuffer {
            framebuffer: *framebuffer,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::OffscreenSurface;

    fn device() -> HeadlessDevice {
        match HeadlessDevice::init(Rc::new(OffscreenSurface::new(4, 4)), false) {
            Ok(device) => device,
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_names_are_unique() {
        let device = device();
        let a = device.create_buffer().unwrap();
        let b = device.create_texture(glow::TEXTURE_2D, TextureType::Texture2D).unwrap();
        assert_ne!(a, b);
        assert_eq!(device.calls().len(), 2);
    }

    #[test]
    fn test_link_rules() {
        let device = device();
        let program = device.create_shader().unwrap();

        let report = device.build_program(&program, &ShaderStages::Compute { compute: "void main() {}" });
        assert!(!report.linked);
        assert!(report.log.contains("work group size"));
        assert_eq!(device.reflect(&program), ShaderQueryDesc::default());

        let report = device.build_program(
            &program,
            &ShaderStages::Compute {
                compute: "layout(local_size_x = 32) in; void main() {}",
            },
        );
        assert!(report.linked);
        assert_eq!(device.reflect(&program).work_group_size, [32, 1, 1]);
    }

    #[test]
    fn test_uniforms_shared_across_stages() {
        let device = device();
        let program = device.create_shader().unwrap();
        let stages = ShaderStages::Graphics {
            vertex: "in vec3 a_position; uniform mat4 u_mvp; uniform float u_time; void main() {}",
            pixel: "uniform float u_time; uniform sampler2D u_albedo; void main() {}",
        };
        assert!(device.build_program(&program, &stages).linked);

        let query = device.reflect(&program);
        assert_eq!(query.uniforms_count(), 3);
        assert_eq!(query.uniform_location("u_mvp"), 0);
        assert_eq!(query.uniform_location("u_time"), 1);
        assert_eq!(query.uniforms[2].ty, UniformType::Sampler2D);
        assert_eq!(query.attributes[0].ty, UniformType::Vec3);
    }

    #[test]
    fn test_instanced_draw_variant() {
        let device = device();
        device.draw(glow::TRIANGLES, 0, 3, 1);
        device.draw(glow::TRIANGLES, 0, 3, 4);
        device.draw_indexed(glow::TRIANGLES, glow::UNSIGNED_SHORT, 2, 3, 6, 1);
        assert_eq!(
            device.draw_calls(),
            vec![
                NativeCall::DrawArrays { mode: glow::TRIANGLES, first: 0, count: 3 },
                NativeCall::DrawArraysInstanced { mode: glow::TRIANGLES, first: 0, count: 3, instances: 4 },
                NativeCall::DrawElements { mode: glow::TRIANGLES, format: glow::UNSIGNED_SHORT, count: 6, offset: 6 },
            ]
        );
    }
}
