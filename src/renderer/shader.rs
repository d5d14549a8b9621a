//! 着色器程序与反射
//!
//! 一个 `Shader` 是一个链接好的 GPU 程序：要么由顶点 + 像素源码构建，要么只由计算源码构建。
//! 模式在第一次 `load` 时固定，之后重新加载必须使用同一模式。
//!
//! 编译 / 链接失败只记录警告，不是致命错误：失败的着色器仍然可以绑定和使用，
//! 只是输出未定义。反射数据在第一次 `query` 时惰性生成，每次重新链接都会作废。

use std::cell::OnceCell;
use std::rc::Rc;

use crate::core::error::Result;
use crate::gal_assert;

use super::backend_trait::{Backend, LinkReport, ShaderStages};
use super::context::Context;
use super::descriptor::ShaderDesc;
use super::resource::Buffer;
use super::types::{ShaderStage, UniformType, UNIFORM_BUFFERS_MAX};

/// 程序模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderMode {
    Graphics,
    Compute,
}

/// 一个活动属性或 uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariable {
    pub name: String,
    pub ty: UniformType,
    /// 单个元素的分量数
    pub components: u32,
    /// 数组长度，非数组为 1
    pub array_size: u32,
    /// 解析出的位置；`$Globals` 模拟下为程序 uniform 表的下标
    pub location: i32,
}

/// 一个活动 uniform 块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBlock {
    pub name: String,
    /// 块索引
    pub index: u32,
    /// 数据大小（字节）
    pub size: u32,
}

/// 反射结果
///
/// 链接失败时所有列表为空，工作组尺寸为 0。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderQueryDesc {
    pub attributes: Vec<ShaderVariable>,
    pub uniforms: Vec<ShaderVariable>,
    pub uniform_blocks: Vec<ShaderBlock>,
    /// 仅计算程序非零
    pub work_group_size: [u32; 3],
}

impl ShaderQueryDesc {
    pub fn attributes_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn uniforms_count(&self) -> usize {
        self.uniforms.len()
    }

    pub fn uniform_blocks_count(&self) -> usize {
        self.uniform_blocks.len()
    }

    /// 按名字查找 uniform 位置，找不到时返回 -1
    pub fn uniform_location(&self, name: &str) -> i32 {
        self.uniforms
            .iter()
            .find(|u| u.name == name)
            .map_or(-1, |u| u.location)
    }

    pub fn attribute_location(&self, name: &str) -> i32 {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map_or(-1, |a| a.location)
    }
}

/// 着色器程序
pub struct Shader<B: Backend> {
    device: Rc<B>,
    native: B::Shader,
    mode: Option<ShaderMode>,
    link: LinkReport,
    reflection: OnceCell<ShaderQueryDesc>,
}

impl<B: Backend> Shader<B> {
    pub fn create(ctx: &Context<B>) -> Result<Self> {
        let device = Rc::clone(ctx.device());
        let native = device.create_shader()?;
        tracing::debug!(backend = device.name(), handle = ?native, "Shader created");
        Ok(Self {
            device,
            native,
            mode: None,
            link: LinkReport::default(),
            reflection: OnceCell::new(),
        })
    }

    /// 创建并加载
    pub fn new(ctx: &Context<B>, desc: &ShaderDesc<'_>) -> Result<Self> {
        let mut shader = Self::create(ctx)?;
        shader.load(desc);
        Ok(shader)
    }

    /// 编译并链接
    ///
    /// 设置了 `compute_source` 时只构建计算程序，忽略顶点 / 像素源码；
    /// 否则两者都必须提供。返回是否链接成功。
    pub fn load(&mut self, desc: &ShaderDesc<'_>) -> bool {
        let (mode, stages) = match desc.compute_source {
            Some(compute) => (ShaderMode::Compute, ShaderStages::Compute { compute }),
            None => {
                let (vertex, pixel) = match (desc.vertex_source, desc.pixel_source) {
                    (Some(vertex), Some(pixel)) => (vertex, pixel),
                    _ => crate::gal_fail!("graphics shader requires both vertex and pixel sources"),
                };
                (ShaderMode::Graphics, ShaderStages::Graphics { vertex, pixel })
            }
        };

        if let Some(current) = self.mode {
            gal_assert!(
                current == mode,
                "shader mode is fixed at {:?}, cannot reload as {:?}",
                current,
                mode
            );
        }
        self.mode = Some(mode);

        self.link = self.device.build_program(&self.native, &stages);
        self.reflection = OnceCell::new();

        if self.link.linked {
            tracing::debug!(mode = ?mode, handle = ?self.native, "Shader linked");
        } else {
            crate::gal_warn!(mode = ?mode, handle = ?self.native, log = %self.link.log, "Shader failed to link");
        }
        self.link.linked
    }

    /// 反射活动属性、uniform、uniform 块以及计算工作组尺寸
    ///
    /// 结果被缓存直到下一次重新链接；链接失败时返回全零的描述。
    pub fn query(&self) -> &ShaderQueryDesc {
        self.reflection.get_or_init(|| {
            if !self.link.linked {
                return ShaderQueryDesc::default();
            }
            let mut query = self.device.reflect(&self.native);
            if self.mode == Some(ShaderMode::Compute) {
                query.attributes.clear();
            } else {
                query.work_group_size = [0; 3];
            }
            tracing::trace!(
                attributes = query.attributes_count(),
                uniforms = query.uniforms_count(),
                blocks = query.uniform_blocks_count(),
                "Shader reflected"
            );
            query
        })
    }

    /// 按名字查找 uniform 位置
    pub fn uniform_location(&self, name: &str) -> i32 {
        self.query().uniform_location(name)
    }

    /// 把 uniform 或存储缓冲挂到绑定点
    pub fn attach_uniform(&self, stage: ShaderStage, buffer: &Buffer<B>, bind_point: u32) {
        gal_assert!(
            buffer.kind().is_shader_bindable(),
            "only uniform or shader-storage buffers can be attached, got {:?}",
            buffer.kind()
        );
        gal_assert!(
            (bind_point as usize) < UNIFORM_BUFFERS_MAX,
            "bind point {} exceeds the limit of {}",
            bind_point,
            UNIFORM_BUFFERS_MAX
        );
        self.device.bind_uniform_buffer(
            &self.native,
            stage,
            buffer.native(),
            B::translate_buffer_type(buffer.kind()),
            bind_point,
        );
    }

    /// 按位置上传单个 uniform
    pub fn upload_uniform(&self, location: i32, ty: UniformType, data: &[u8]) {
        self.upload_uniform_array(location, ty, 1, data);
    }

    /// 按位置上传 uniform 数组
    ///
    /// 位置为 -1（未找到）时只警告，不做任何事。
    pub fn upload_uniform_array(&self, location: i32, ty: UniformType, count: u32, data: &[u8]) {
        if location == -1 {
            crate::gal_warn!(ty = ?ty, handle = ?self.native, "Uniform location not found, upload skipped");
            return;
        }
        let required = ty.byte_size() * count as usize;
        gal_assert!(
            data.len() >= required,
            "uniform {:?}[{}] needs {} bytes, {} supplied",
            ty,
            count,
            required,
            data.len()
        );
        self.device
            .upload_uniform(&self.native, location, ty, count, &data[..required]);
    }

    pub fn mode(&self) -> Option<ShaderMode> {
        self.mode
    }

    pub fn is_linked(&self) -> bool {
        self.link.linked
    }

    /// 最近一次链接的诊断文本
    pub fn link_log(&self) -> &str {
        &self.link.log
    }

    pub fn native(&self) -> &B::Shader {
        &self.native
    }

    pub fn destroy(self) {}
}

impl<B: Backend> Drop for Shader<B> {
    fn drop(&mut self) {
        self.device.destroy_shader(&self.native);
        tracing::debug!(handle = ?self.native, "Shader destroyed");
    }
}

impl<B: Backend> std::fmt::Debug for Shader<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("native", &self.native)
            .field("mode", &self.mode)
            .field("linked", &self.link.linked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{test_context, NativeCall};
    use crate::renderer::descriptor::BufferDesc;

    const VS: &str = r#"
        #version 430
        layout(location = 0) in vec3 a_position;
        layout(location = 1) in vec4 a_color;
        uniform mat4 u_mvp;
        out vec4 v_color;
        void main() {
            v_color = a_color;
            gl_Position = u_mvp * vec4(a_position, 1.0);
        }
    "#;

    const PS: &str = r#"
        #version 430
        in vec4 v_color;
        uniform float u_alpha;
        layout(std140, binding = 0) uniform Frame { vec4 tint; };
        out vec4 o_color;
        void main() { o_color = v_color * tint * u_alpha; }
    "#;

    const CS: &str = r#"
        #version 430
        layout(local_size_x = 8, local_size_y = 4, local_size_z = 1) in;
        layout(rgba8, binding = 0) uniform writeonly image2D u_target;
        void main() {}
    "#;

    #[test]
    fn test_graphics_reflection() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        assert!(shader.is_linked());

        let query = shader.query();
        assert_eq!(query.attributes_count(), 2);
        assert_eq!(query.attribute_location("a_color"), 1);
        assert_ne!(shader.uniform_location("u_mvp"), -1);
        assert_eq!(query.uniform_blocks_count(), 1);
        assert_eq!(query.work_group_size, [0, 0, 0]);
    }

    #[test]
    fn test_compute_reflection() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::compute(CS)).unwrap();
        assert_eq!(shader.mode(), Some(ShaderMode::Compute));

        let query = shader.query();
        assert_eq!(query.attributes_count(), 0);
        assert_eq!(query.work_group_size, [8, 4, 1]);
    }

    #[test]
    fn test_compute_source_wins() {
        let ctx = test_context();
        let desc = ShaderDesc {
            vertex_source: Some(VS),
            pixel_source: Some(PS),
            compute_source: Some(CS),
        };
        let shader = Shader::new(&ctx, &desc).unwrap();
        assert_eq!(shader.mode(), Some(ShaderMode::Compute));
    }

    #[test]
    fn test_link_failure_is_not_fatal() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics("#version 430\n", PS)).unwrap();
        assert!(!shader.is_linked());
        assert!(!shader.link_log().is_empty());
        assert_eq!(shader.query(), &ShaderQueryDesc::default());
    }

    #[test]
    #[should_panic(expected = "shader mode is fixed")]
    fn test_mode_is_fixed() {
        let ctx = test_context();
        let mut shader = Shader::new(&ctx, &ShaderDesc::compute(CS)).unwrap();
        shader.load(&ShaderDesc::graphics(VS, PS));
    }

    #[test]
    fn test_relink_invalidates_reflection() {
        let ctx = test_context();
        let mut shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        assert_eq!(shader.query().attributes_count(), 2);

        let vs = "#version 430\nlayout(location = 0) in vec2 a_uv;\nvoid main() {}\n";
        shader.load(&ShaderDesc::graphics(vs, PS));
        assert_eq!(shader.query().attributes_count(), 1);
    }

    #[test]
    fn test_missing_uniform_is_skipped() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        let before = shader.query().clone();
        let calls = ctx.device().calls().len();

        shader.upload_uniform(-1, UniformType::Vec4, &[0u8; 16]);

        assert_eq!(ctx.device().calls().len(), calls);
        assert_eq!(shader.query(), &before);
        assert!(shader.is_linked());
    }

    #[test]
    fn test_upload_uniform_by_location() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        let location = shader.uniform_location("u_alpha");
        shader.upload_uniform(location, UniformType::Float, bytemuck::bytes_of(&0.5f32));
        assert!(ctx
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, NativeCall::Uniform { location: l, count: 1, .. } if *l == location)));
    }

    #[test]
    #[should_panic(expected = "only uniform or shader-storage")]
    fn test_attach_rejects_vertex_buffer() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        let buffer = Buffer::new(&ctx, &BufferDesc::vertex(16), None).unwrap();
        shader.attach_uniform(ShaderStage::Vertex, &buffer, 0);
    }

    #[test]
    #[should_panic(expected = "bind point")]
    fn test_attach_rejects_bind_point_overflow() {
        let ctx = test_context();
        let shader = Shader::new(&ctx, &ShaderDesc::graphics(VS, PS)).unwrap();
        let buffer = Buffer::new(&ctx, &BufferDesc::uniform(16), None).unwrap();
        shader.attach_uniform(ShaderStage::Pixel, &buffer, UNIFORM_BUFFERS_MAX as u32);
    }
}
