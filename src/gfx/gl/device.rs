//! OpenGL 4.3 设备
//!
//! 基于 `glow`。GL 是即时模式、按绑定点工作的 API：每个方法先绑定对象再修改它，
//! 共享层传入的原生值直接就是 GL 常量。
//!
//! 深度 / 模板渲染目标是 renderbuffer，其余纹理是 texture 对象，
//! 两者统一包装在 `GlTexture` 中。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glow::HasContext;

use crate::core::error::{GraphicsError, Result};
use crate::core::log::{log_backend_message, DebugSeverity};
use crate::gfx::backend::NativeSurface;
use crate::gfx::glsl;
use crate::renderer::backend_trait::{
    Backend, DepthAttachmentPoint, DeviceLimits, Extent3d, InputStreams, LinkReport, ShaderStages,
};
use crate::renderer::descriptor::{BlitRegion, Rect};
use crate::renderer::shader::{ShaderBlock, ShaderQueryDesc, ShaderVariable};
use crate::renderer::translate::{NativeBlend, NativePixelFormat, NativeSampling, StencilFaceOps, Translate};
use crate::renderer::types::{ShaderStage, StateKind, TextureType, UniformType};
use crate::renderer::vertex::CompiledLayout;

use super::translate as gl;

/// GL 纹理或 renderbuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlTexture {
    Texture(glow::NativeTexture),
    Renderbuffer(glow::NativeRenderbuffer),
}

/// OpenGL 设备
pub struct GlDevice {
    gl: glow::Context,
    surface: Rc<dyn NativeSurface>,
    /// 计算程序的工作组尺寸，GL 反射接口不提供，链接时从源码读出
    work_groups: RefCell<HashMap<glow::NativeProgram, [u32; 3]>>,
}

crate::impl_gl_translate!(GlDevice);

impl std::fmt::Debug for GlDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlDevice")
            .field("surface_size", &self.surface.size())
            .finish()
    }
}

fn debug_severity(severity: u32) -> DebugSeverity {
    match severity {
        glow::DEBUG_SEVERITY_HIGH => DebugSeverity::Error,
        glow::DEBUG_SEVERITY_MEDIUM | glow::DEBUG_SEVERITY_LOW => DebugSeverity::Warning,
        _ => DebugSeverity::Info,
    }
}

fn resource_error(what: &str, e: String) -> crate::core::error::GalError {
    crate::gal_error!(error = %e, "Failed to create GL {}", what);
    GraphicsError::ResourceCreation(format!("{}: {}", what, e)).into()
}

impl GlDevice {
    fn texture(texture: &GlTexture) -> Option<glow::NativeTexture> {
        match *texture {
            GlTexture::Texture(t) => Some(t),
            GlTexture::Renderbuffer(_) => None,
        }
    }

    /// 编译单个阶段，失败时返回信息日志
    unsafe fn compile(&self, stage: u32, source: &str) -> std::result::Result<glow::NativeShader, String> {
        let shader = self.gl.create_shader(stage)?;
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if self.gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(shader);
            self.gl.delete_shader(shader);
            Err(log)
        }
    }

    unsafe fn reflect_program(&self, program: glow::NativeProgram) -> ShaderQueryDesc {
        let gl = &self.gl;

        let attributes = (0..gl.get_active_attributes(program))
            .filter_map(|i| gl.get_active_attribute(program, i))
            .filter(|a| !a.name.starts_with("gl_"))
            .map(|a| {
                let ty = Self::reflect_uniform_type(a.atype);
                let location = gl.get_attrib_location(program, &a.name).map_or(-1, |l| l as i32);
                ShaderVariable {
                    name: a.name,
                    ty,
                    components: ty.components(),
                    array_size: a.size as u32,
                    location,
                }
            })
            .collect();

        let uniforms = (0..gl.get_active_uniforms(program))
            .filter_map(|i| gl.get_active_uniform(program, i))
            .filter_map(|u| {
                // 块成员没有独立位置
                let location = gl.get_uniform_location(program, &u.name)?;
                let ty = Self::reflect_uniform_type(u.utype);
                Some(ShaderVariable {
                    name: u.name.trim_end_matches("[0]").to_string(),
                    ty,
                    components: ty.components(),
                    array_size: u.size as u32,
                    location: location.0 as i32,
                })
            })
            .collect();

        let blocks = gl.get_program_parameter_i32(program, glow::ACTIVE_UNIFORM_BLOCKS).max(0) as u32;
        let uniform_blocks = (0..blocks)
            .map(|index| ShaderBlock {
                name: gl.get_active_uniform_block_name(program, index),
                index,
                size: gl
                    .get_active_uniform_block_parameter_i32(program, index, glow::UNIFORM_BLOCK_DATA_SIZE)
                    .max(0) as u32,
            })
            .collect();

        ShaderQueryDesc {
            attributes,
            uniforms,
            uniform_blocks,
            work_group_size: self.work_groups.borrow().get(&program).copied().unwrap_or([0; 3]),
        }
    }
}

impl Backend for GlDevice {
    type Buffer = glow::NativeBuffer;
    type Texture = GlTexture;
    type Shader = glow::NativeProgram;
    type InputAssembly = glow::NativeVertexArray;
    type Framebuffer = glow::NativeFramebuffer;

    fn name(&self) -> &'static str {
        "OpenGL"
    }

    fn init(surface: Rc<dyn NativeSurface>, vsync: bool) -> Result<Self> {
        let mut gl = unsafe { glow::Context::from_loader_function(|name| surface.get_proc_address(name)) };

        let version = gl.version();
        if (version.major, version.minor) < (4, 3) {
            return Err(GraphicsError::DeviceCreation(format!(
                "OpenGL 4.3 required, driver reports {}.{} ({})",
                version.major, version.minor, version.vendor_info
            ))
            .into());
        }

        unsafe {
            gl.enable(glow::DEBUG_OUTPUT);
            gl.debug_message_callback(|_source, _ty, _id, severity, message| {
                log_backend_message("OpenGL", debug_severity(severity), message);
            });
        }
        surface.set_swap_interval(i32::from(vsync));

        tracing::info!(
            major = version.major,
            minor = version.minor,
            vendor = %version.vendor_info,
            "OpenGL device created"
        );

        Ok(Self {
            gl,
            surface,
            work_groups: RefCell::new(HashMap::new()),
        })
    }

    fn limits(&self) -> DeviceLimits {
        unsafe {
            let count = |i| self.gl.get_parameter_indexed_i32(glow::MAX_COMPUTE_WORK_GROUP_COUNT, i).max(0) as u32;
            DeviceLimits {
                max_texture_size: self.gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE).max(0) as u32,
                max_compute_work_groups: [count(0), count(1), count(2)],
                max_vertex_attributes: self.gl.get_parameter_i32(glow::MAX_VERTEX_ATTRIBS).max(0) as u32,
                max_uniform_buffer_bindings: self.gl.get_parameter_i32(glow::MAX_UNIFORM_BUFFER_BINDINGS).max(0)
                    as u32,
            }
        }
    }

    fn set_capability(&self, state: StateKind, enabled: bool) {
        let cap = gl::capability(state);
        unsafe {
            if enabled {
                self.gl.enable(cap);
            } else {
                self.gl.disable(cap);
            }
        }
    }

    fn apply_depth_state(&self, func: u32, write_mask: bool) {
        unsafe {
            self.gl.depth_func(func);
            self.gl.depth_mask(write_mask);
        }
    }

    fn apply_stencil_state(
        &self,
        front: StencilFaceOps<u32, u32>,
        back: StencilFaceOps<u32, u32>,
        reference: i32,
        read_mask: u32,
        write_mask: u32,
    ) {
        unsafe {
            for (face, ops) in [(glow::FRONT, front), (glow::BACK, back)] {
                self.gl.stencil_func_separate(face, ops.func, reference, read_mask);
                self.gl.stencil_op_separate(face, ops.fail, ops.depth_fail, ops.pass);
            }
            self.gl.stencil_mask(write_mask);
        }
    }

    fn apply_blend_state(&self, blend: NativeBlend<u32, u32>) {
        let [r, g, b, a] = blend.constant_color;
        unsafe {
            self.gl
                .blend_func_separate(blend.src_rgb, blend.dst_rgb, blend.src_alpha, blend.dst_alpha);
            self.gl.blend_equation_separate(blend.op_rgb, blend.op_alpha);
            self.gl.blend_color(r, g, b, a);
        }
    }

    fn apply_cull_state(&self, mode: u32, front_face: u32) {
        unsafe {
            self.gl.cull_face(mode);
            self.gl.front_face(front_face);
        }
    }

    fn set_viewport(&self, rect: Rect) {
        unsafe { self.gl.viewport(rect.x, rect.y, rect.width, rect.height) }
    }

    fn set_scissor_rect(&self, rect: Rect) {
        unsafe { self.gl.scissor(rect.x, rect.y, rect.width, rect.height) }
    }

    fn bind_target(&self, target: Option<&glow::NativeFramebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, target.copied()) }
    }

    fn clear(&self, target: Option<&glow::NativeFramebuffer>, mask: u32, color: [f32; 4], depth: f32, stencil: i32) {
        let [r, g, b, a] = color;
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, target.copied());
            self.gl.clear_color(r, g, b, a);
            self.gl.clear_depth_f32(depth);
            self.gl.clear_stencil(stencil);
            self.gl.clear(mask);
        }
    }

    fn create_buffer(&self) -> Result<glow::NativeBuffer> {
        unsafe { self.gl.create_buffer() }.map_err(|e| resource_error("buffer", e))
    }

    fn buffer_storage(
        &self,
        buffer: &glow::NativeBuffer,
        target: u32,
        usage: u32,
        size: usize,
        data: Option<&[u8]>,
    ) -> Result<()> {
        unsafe {
            self.gl.bind_buffer(target, Some(*buffer));
            match data {
                Some(bytes) if bytes.len() == size => self.gl.buffer_data_u8_slice(target, bytes, usage),
                Some(bytes) => {
                    self.gl.buffer_data_size(target, size as i32, usage);
                    self.gl.buffer_sub_data_u8_slice(target, 0, &bytes[..bytes.len().min(size)]);
                }
                None => self.gl.buffer_data_size(target, size as i32, usage),
            }
        }
        Ok(())
    }

    fn buffer_sub_data(&self, buffer: &glow::NativeBuffer, target: u32, offset: usize, data: &[u8]) {
        unsafe {
            self.gl.bind_buffer(target, Some(*buffer));
            self.gl.buffer_sub_data_u8_slice(target, offset as i32, data);
        }
    }

    fn destroy_buffer(&self, buffer: &glow::NativeBuffer) {
        unsafe { self.gl.delete_buffer(*buffer) }
    }

    fn create_texture(&self, target: u32, ty: TextureType) -> Result<GlTexture> {
        unsafe {
            if ty.is_render_target() && target == glow::RENDERBUFFER {
                self.gl
                    .create_renderbuffer()
                    .map(GlTexture::Renderbuffer)
                    .map_err(|e| resource_error("renderbuffer", e))
            } else {
                self.gl
                    .create_texture()
                    .map(GlTexture::Texture)
                    .map_err(|e| resource_error("texture", e))
            }
        }
    }

    fn texture_parameters(
        &self,
        texture: &GlTexture,
        target: u32,
        sampling: NativeSampling<u32, u32, u32>,
        mips: u32,
    ) {
        let Some(texture) = Self::texture(texture) else {
            return;
        };
        unsafe {
            self.gl.bind_texture(target, Some(texture));
            self.gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, sampling.filter as i32);
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, gl::mag_filter(sampling.filter) as i32);
            for axis in [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T, glow::TEXTURE_WRAP_R] {
                self.gl.tex_parameter_i32(target, axis, sampling.wrap as i32);
            }
            self.gl
                .tex_parameter_f32_slice(target, glow::TEXTURE_BORDER_COLOR, &sampling.border_color);
            match sampling.compare {
                Some(func) => {
                    self.gl.tex_parameter_i32(
                        target,
                        glow::TEXTURE_COMPARE_MODE,
                        glow::COMPARE_REF_TO_TEXTURE as i32,
                    );
                    self.gl.tex_parameter_i32(target, glow::TEXTURE_COMPARE_FUNC, func as i32);
                }
                None => self.gl.tex_parameter_i32(target, glow::TEXTURE_COMPARE_MODE, glow::NONE as i32),
            }
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MAX_LEVEL, mips.saturating_sub(1) as i32);
        }
    }

    fn allocate_texture(
        &self,
        texture: &GlTexture,
        target: u32,
        format: &NativePixelFormat<u32>,
        extent: Extent3d,
        mips: u32,
    ) -> Result<()> {
        let (width, height, depth) = (extent.width as i32, extent.height as i32, extent.depth as i32);
        let levels = mips.max(1) as i32;
        unsafe {
            match *texture {
                GlTexture::Renderbuffer(rb) => {
                    self.gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rb));
                    self.gl
                        .renderbuffer_storage(glow::RENDERBUFFER, format.internal, width, height);
                }
                GlTexture::Texture(t) => {
                    self.gl.bind_texture(target, Some(t));
                    match target {
                        glow::TEXTURE_1D => {
                            self.gl.tex_image_1d(
                                target,
                                0,
                                format.internal as i32,
                                width,
                                0,
                                format.transfer,
                                format.element,
                                None,
                            );
                        }
                        glow::TEXTURE_3D | glow::TEXTURE_2D_ARRAY => {
                            self.gl.tex_image_3d(
                                target,
                                0,
                                format.internal as i32,
                                width,
                                height,
                                depth,
                                0,
                                format.transfer,
                                format.element,
                                None,
                            );
                        }
                        glow::TEXTURE_CUBE_MAP => {
                            for face in 0..6 {
                                self.gl.tex_image_2d(
                                    glow::TEXTURE_CUBE_MAP_POSITIVE_X + face,
                                    0,
                                    format.internal as i32,
                                    width,
                                    height,
                                    0,
                                    format.transfer,
                                    format.element,
                                    None,
                                );
                            }
                        }
                        _ => {
                            self.gl.tex_image_2d(
                                target,
                                0,
                                format.internal as i32,
                                width,
                                height,
                                0,
                                format.transfer,
                                format.element,
                                None,
                            );
                        }
                    }
                    self.gl.tex_parameter_i32(target, glow::TEXTURE_MAX_LEVEL, levels - 1);
                }
            }
        }
        Ok(())
    }

    fn transfer_pixels(
        &self,
        texture: &GlTexture,
        target: u32,
        format: &NativePixelFormat<u32>,
        extent: Extent3d,
        alignment: u32,
        layer: u32,
        data: &[u8],
    ) {
        let Some(texture) = Self::texture(texture) else {
            crate::gal_warn!("Pixel transfer into a renderbuffer ignored");
            return;
        };
        let (width, height, depth) = (extent.width as i32, extent.height as i32, extent.depth as i32);
        let pixels = glow::PixelUnpackData::Slice(data);
        unsafe {
            self.gl.bind_texture(target, Some(texture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment as i32);
            match target {
                glow::TEXTURE_1D => {
                    self.gl.tex_image_1d(
                        target,
                        0,
                        format.internal as i32,
                        width,
                        0,
                        format.transfer,
                        format.element,
                        Some(data),
                    );
                }
                glow::TEXTURE_3D | glow::TEXTURE_2D_ARRAY => {
                    self.gl.tex_sub_image_3d(
                        target,
                        0,
                        0,
                        0,
                        0,
                        width,
                        height,
                        depth,
                        format.transfer,
                        format.element,
                        pixels,
                    );
                }
                glow::TEXTURE_CUBE_MAP => {
                    self.gl.tex_sub_image_2d(
                        glow::TEXTURE_CUBE_MAP_POSITIVE_X + layer,
                        0,
                        0,
                        0,
                        width,
                        height,
                        format.transfer,
                        format.element,
                        pixels,
                    );
                }
                _ => {
                    self.gl.tex_sub_image_2d(
                        target,
                        0,
                        0,
                        0,
                        width,
                        height,
                        format.transfer,
                        format.element,
                        pixels,
                    );
                }
            }
        }
    }

    fn generate_mipmaps(&self, texture: &GlTexture, target: u32) {
        if let Some(texture) = Self::texture(texture) {
            unsafe {
                self.gl.bind_texture(target, Some(texture));
                self.gl.generate_mipmap(target);
            }
        }
    }

    fn destroy_texture(&self, texture: &GlTexture) {
        unsafe {
            match *texture {
                GlTexture::Texture(t) => self.gl.delete_texture(t),
                GlTexture::Renderbuffer(rb) => self.gl.delete_renderbuffer(rb),
            }
        }
    }

    fn create_shader(&self) -> Result<glow::NativeProgram> {
        unsafe { self.gl.create_program() }.map_err(|e| resource_error("program", e))
    }

    fn build_program(&self, shader: &glow::NativeProgram, stages: &ShaderStages<'_>) -> LinkReport {
        let program = *shader;
        let sources: Vec<(u32, &str)> = match *stages {
            ShaderStages::Graphics { vertex, pixel } => {
                vec![(glow::VERTEX_SHADER, vertex), (glow::FRAGMENT_SHADER, pixel)]
            }
            ShaderStages::Compute { compute } => vec![(glow::COMPUTE_SHADER, compute)],
        };

        unsafe {
            for attached in self.gl.get_attached_shaders(program) {
                self.gl.detach_shader(program, attached);
            }

            let mut compiled = Vec::with_capacity(sources.len());
            for (stage, source) in &sources {
                match self.compile(*stage, source) {
                    Ok(s) => compiled.push(s),
                    Err(log) => {
                        for s in compiled {
                            self.gl.delete_shader(s);
                        }
                        log_backend_message("OpenGL", DebugSeverity::Error, &log);
                        return LinkReport::failure(log);
                    }
                }
            }

            for s in &compiled {
                self.gl.attach_shader(program, *s);
            }
            self.gl.link_program(program);
            for s in compiled {
                self.gl.detach_shader(program, s);
                self.gl.delete_shader(s);
            }

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                log_backend_message("OpenGL", DebugSeverity::Error, &log);
                self.work_groups.borrow_mut().remove(&program);
                return LinkReport::failure(log);
            }
        }

        match *stages {
            ShaderStages::Compute { compute } => {
                // glow 0.13 不提供 glGetProgramiv，无法查询 GL_COMPUTE_WORK_GROUP_SIZE，
                // 链接成功后从源码的 local_size 声明取得
                let size = glsl::scan(compute).local_size.unwrap_or([1, 1, 1]);
                self.work_groups.borrow_mut().insert(program, size);
            }
            ShaderStages::Graphics { .. } => {
                self.work_groups.borrow_mut().remove(&program);
            }
        }
        LinkReport::success()
    }

    fn reflect(&self, shader: &glow::NativeProgram) -> ShaderQueryDesc {
        unsafe { self.reflect_program(*shader) }
    }

    fn use_shader(&self, shader: &glow::NativeProgram) {
        unsafe { self.gl.use_program(Some(*shader)) }
    }

    fn bind_uniform_buffer(
        &self,
        _shader: &glow::NativeProgram,
        _stage: ShaderStage,
        buffer: &glow::NativeBuffer,
        target: u32,
        bind_point: u32,
    ) {
        unsafe { self.gl.bind_buffer_base(target, bind_point, Some(*buffer)) }
    }

    fn upload_uniform(&self, shader: &glow::NativeProgram, location: i32, ty: UniformType, count: u32, data: &[u8]) {
        let location = glow::NativeUniformLocation(location as u32);
        let loc = Some(&location);
        unsafe {
            self.gl.use_program(Some(*shader));
            if ty.is_float() {
                let v: Vec<f32> = bytemuck::pod_collect_to_vec(data);
                match ty {
                    UniformType::Float => self.gl.uniform_1_f32_slice(loc, &v),
                    UniformType::Vec2 => self.gl.uniform_2_f32_slice(loc, &v),
                    UniformType::Vec3 => self.gl.uniform_3_f32_slice(loc, &v),
                    UniformType::Vec4 => self.gl.uniform_4_f32_slice(loc, &v),
                    UniformType::Mat2 => self.gl.uniform_matrix_2_f32_slice(loc, false, &v),
                    UniformType::Mat3 => self.gl.uniform_matrix_3_f32_slice(loc, false, &v),
                    _ => self.gl.uniform_matrix_4_f32_slice(loc, false, &v),
                }
            } else if ty.is_unsigned() {
                let v: Vec<u32> = bytemuck::pod_collect_to_vec(data);
                match ty.components() {
                    1 => self.gl.uniform_1_u32_slice(loc, &v),
                    2 => self.gl.uniform_2_u32_slice(loc, &v),
                    3 => self.gl.uniform_3_u32_slice(loc, &v),
                    _ => self.gl.uniform_4_u32_slice(loc, &v),
                }
            } else if ty != UniformType::Unknown {
                let v: Vec<i32> = bytemuck::pod_collect_to_vec(data);
                match ty.components() {
                    1 => self.gl.uniform_1_i32_slice(loc, &v),
                    2 => self.gl.uniform_2_i32_slice(loc, &v),
                    3 => self.gl.uniform_3_i32_slice(loc, &v),
                    _ => self.gl.uniform_4_i32_slice(loc, &v),
                }
            } else {
                crate::gal_warn!(location = location.0, count, "Upload of unknown uniform type skipped");
            }
        }
    }

    fn destroy_shader(&self, shader: &glow::NativeProgram) {
        self.work_groups.borrow_mut().remove(shader);
        unsafe { self.gl.delete_program(*shader) }
    }

    fn bind_texture(&self, unit: u32, target: u32, texture: &GlTexture) {
        if let Some(texture) = Self::texture(texture) {
            unsafe {
                self.gl.active_texture(glow::TEXTURE0 + unit);
                self.gl.bind_texture(target, Some(texture));
            }
        }
    }

    fn bind_image(&self, unit: u32, texture: &GlTexture, format: u32, access: u32) {
        if let Some(texture) = Self::texture(texture) {
            unsafe { self.gl.bind_image_texture(unit, texture, 0, true, 0, access, format) }
        }
    }

    fn create_input_assembly(&self) -> Result<glow::NativeVertexArray> {
        unsafe { self.gl.create_vertex_array() }.map_err(|e| resource_error("vertex array", e))
    }

    fn configure_input_assembly(
        &self,
        assembly: &glow::NativeVertexArray,
        layout: &CompiledLayout<u32>,
        streams: InputStreams<'_, Self>,
    ) {
        unsafe {
            self.gl.bind_vertex_array(Some(*assembly));
            for (index, binding) in layout.bindings.iter().enumerate() {
                let buffer = if index == 0 { Some(streams.vertex) } else { streams.instance };
                self.gl.bind_buffer(glow::ARRAY_BUFFER, buffer.copied());
                for attribute in layout.binding_attributes(index) {
                    let location = attribute.location;
                    if buffer.is_none() {
                        self.gl.disable_vertex_attrib_array(location);
                        continue;
                    }
                    let format = attribute.format;
                    self.gl.enable_vertex_attrib_array(location);
                    if format.integer {
                        self.gl.vertex_attrib_pointer_i32(
                            location,
                            format.components as i32,
                            format.format,
                            binding.stride as i32,
                            attribute.offset as i32,
                        );
                    } else {
                        self.gl.vertex_attrib_pointer_f32(
                            location,
                            format.components as i32,
                            format.format,
                            false,
                            binding.stride as i32,
                            attribute.offset as i32,
                        );
                    }
                    self.gl.vertex_attrib_divisor(location, binding.step.divisor());
                }
            }
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, streams.index.copied());
            self.gl.bind_vertex_array(None);
        }
    }

    fn bind_input_assembly(&self, assembly: &glow::NativeVertexArray) {
        unsafe { self.gl.bind_vertex_array(Some(*assembly)) }
    }

    fn destroy_input_assembly(&self, assembly: &glow::NativeVertexArray) {
        unsafe { self.gl.delete_vertex_array(*assembly) }
    }

    fn draw(&self, mode: u32, first: u32, count: u32, instances: u32) {
        unsafe {
            if instances == 1 {
                self.gl.draw_arrays(mode, first as i32, count as i32);
            } else {
                self.gl
                    .draw_arrays_instanced(mode, first as i32, count as i32, instances as i32);
            }
        }
    }

    fn draw_indexed(&self, mode: u32, format: u32, index_size: u32, first: u32, count: u32, instances: u32) {
        let offset = (first * index_size) as i32;
        unsafe {
            if instances == 1 {
                self.gl.draw_elements(mode, count as i32, format, offset);
            } else {
                self.gl
                    .draw_elements_instanced(mode, count as i32, format, offset, instances as i32);
            }
        }
    }

    fn dispatch(&self, x: u32, y: u32, z: u32) {
        unsafe { self.gl.dispatch_compute(x, y, z) }
    }

    fn memory_barrier(&self, mask: u32) {
        unsafe { self.gl.memory_barrier(mask) }
    }

    fn present(&self, vsync: bool) -> Result<()> {
        self.surface.set_swap_interval(i32::from(vsync));
        self.surface.swap_buffers();
        Ok(())
    }

    fn create_framebuffer(&self) -> Result<glow::NativeFramebuffer> {
        unsafe { self.gl.create_framebuffer() }.map_err(|e| resource_error("framebuffer", e))
    }

    fn attach_color(&self, framebuffer: &glow::NativeFramebuffer, index: u32, texture: &GlTexture, target: u32) {
        let Some(texture) = Self::texture(texture) else {
            return;
        };
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(*framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                gl::color_attachment(index),
                target,
                Some(texture),
                0,
            );
        }
    }

    fn attach_depth_stencil(
        &self,
        framebuffer: &glow::NativeFramebuffer,
        texture: &GlTexture,
        target: u32,
        point: DepthAttachmentPoint,
    ) {
        let attachment = gl::depth_attachment(point);
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(*framebuffer));
            match *texture {
                GlTexture::Renderbuffer(rb) => {
                    self.gl
                        .framebuffer_renderbuffer(glow::FRAMEBUFFER, attachment, glow::RENDERBUFFER, Some(rb));
                }
                GlTexture::Texture(t) => {
                    self.gl
                        .framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, target, Some(t), 0);
                }
            }
        }
    }

    fn set_draw_buffers(&self, framebuffer: &glow::NativeFramebuffer, count: u32) {
        let buffers: Vec<u32> = (0..count).map(gl::color_attachment).collect();
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(*framebuffer));
            if buffers.is_empty() {
                self.gl.draw_buffer(glow::NONE);
            } else {
                self.gl.draw_buffers(&buffers);
            }
        }
    }

    fn framebuffer_complete(&self, framebuffer: &glow::NativeFramebuffer) -> bool {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(*framebuffer));
            self.gl.check_framebuffer_status(glow::FRAMEBUFFER) == glow::FRAMEBUFFER_COMPLETE
        }
    }

    fn blit(
        &self,
        src: Option<&glow::NativeFramebuffer>,
        dst: Option<&glow::NativeFramebuffer>,
        region: BlitRegion,
        mask: u32,
    ) {
        let (s, d) = (region.src, region.dst);
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, src.copied());
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, dst.copied());
            self.gl.blit_framebuffer(
                s.x,
                s.y,
                s.x + s.width,
                s.y + s.height,
                d.x,
                d.y,
                d.x + d.width,
                d.y + d.height,
                mask,
                glow::NEAREST,
            );
        }
    }

    fn destroy_framebuffer(&self, framebuffer: &glow::NativeFramebuffer) {
        unsafe { self.gl.delete_framebuffer(*framebuffer) }
    }
}
