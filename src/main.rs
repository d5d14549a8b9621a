//! dist_gal - 图形抽象层冒烟程序
//!
//! 在离屏表面上创建上下文，依次提交三个场景并输出原生调用序列：
//!
//! - 三角形：3 个顶点的非索引绘制
//! - 索引四边形：4 个顶点、6 个索引
//! - 计算：存储缓冲 + 调度 + 内存屏障
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 命令行覆盖
//! cargo run -- --headless --width 320 --height 240
//! ```
//!
//! OpenGL 与 Direct3D 11 后端需要宿主窗口系统提供原生表面，
//! 冒烟程序只有离屏表面，因此始终以无头后端运行。

use std::rc::Rc;

use anyhow::Context as _;
use tracing::{info, warn};

use dist_gal::core::config::{BackendKind, Config};
use dist_gal::core::log;
use dist_gal::gfx::{HeadlessDevice, OffscreenSurface};
use dist_gal::renderer::vertex::ColorVertex;
use dist_gal::renderer::{
    BarrierFlags, BindingDesc, Buffer, BufferDesc, BufferType, BufferUsage, Context, ContextDesc, IndexType,
    LayoutType, Pipeline, PipelineBuffers, PipelineDesc, Shader, ShaderDesc, ShaderStage, VertexLayoutDesc,
};

const VERTEX_SHADER: &str = "#version 430
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;
out vec4 v_color;
void main() {
    v_color = a_color;
    gl_Position = vec4(a_position, 1.0);
}
";

const PIXEL_SHADER: &str = "#version 430
in vec4 v_color;
out vec4 o_color;
void main() {
    o_color = v_color;
}
";

const COMPUTE_SHADER: &str = "#version 430
layout(local_size_x = 64) in;
layout(std430, binding = 0) buffer Values { float values[]; };
void main() {
    values[gl_GlobalInvocationID.x] *= 2.0;
}
";

fn triangle_vertices() -> [ColorVertex; 3] {
    [
        ColorVertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0, 1.0]),
        ColorVertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0, 1.0]),
        ColorVertex::new([0.0, 0.5, 0.0], [0.0, 0.0, 1.0, 1.0]),
    ]
}

fn draw_triangle(ctx: &mut Context<HeadlessDevice>) -> anyhow::Result<()> {
    let data = triangle_vertices();
    let bytes: &[u8] = bytemuck::cast_slice(&data);
    let vertices = Buffer::new(ctx, &BufferDesc::vertex(bytes.len() as u64), Some(bytes))?;
    let shader = Shader::new(ctx, &ShaderDesc::graphics(VERTEX_SHADER, PIXEL_SHADER))?;
    anyhow::ensure!(shader.is_linked(), "triangle shader failed to link: {}", shader.link_log());

    let pipeline = Pipeline::create(
        ctx,
        &PipelineDesc::new(3, ColorVertex::layout()),
        PipelineBuffers::vertex(&vertices),
    )?;

    ctx.clear(0.1, 0.1, 0.1, 1.0);
    ctx.use_pipeline(&pipeline);
    ctx.use_bindings(&BindingDesc::new(&shader));
    ctx.draw(0);
    ctx.present()?;
    Ok(())
}

fn draw_indexed_quad(ctx: &mut Context<HeadlessDevice>) -> anyhow::Result<()> {
    let positions: [f32; 8] = [-0.5, -0.5, 0.5, -0.5, 0.5, 0.5, -0.5, 0.5];
    let indices: [u16; 6] = [0, 1, 2, 2, 3, 0];
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&positions);
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);

    let vertices = Buffer::new(ctx, &BufferDesc::vertex(vertex_bytes.len() as u64), Some(vertex_bytes))?;
    let index = Buffer::new(ctx, &BufferDesc::index(index_bytes.len() as u64), Some(index_bytes))?;
    let shader = Shader::new(ctx, &ShaderDesc::graphics(VERTEX_SHADER, PIXEL_SHADER))?;

    let desc = PipelineDesc::new(4, VertexLayoutDesc::new(vec![LayoutType::Float2])).with_indices(6, IndexType::U16);
    let pipeline = Pipeline::create(ctx, &desc, PipelineBuffers::vertex(&vertices).with_index(&index))?;

    ctx.use_pipeline(&pipeline);
    ctx.use_bindings(&BindingDesc::new(&shader));
    ctx.draw(0);
    ctx.present()?;
    Ok(())
}

fn run_compute(ctx: &mut Context<HeadlessDevice>) -> anyhow::Result<()> {
    let values = vec![1.0f32; 256];
    let bytes: &[u8] = bytemuck::cast_slice(&values);
    let storage = Buffer::new(
        ctx,
        &BufferDesc::new(bytes.len() as u64, BufferType::ShaderStorage, BufferUsage::DynamicDraw),
        Some(bytes),
    )?;
    let vertices = Buffer::new(ctx, &BufferDesc::vertex(84), None)?;
    let pipeline = Pipeline::create(
        ctx,
        &PipelineDesc::new(3, ColorVertex::layout()),
        PipelineBuffers::vertex(&vertices),
    )?;
    let shader = Shader::new(ctx, &ShaderDesc::compute(COMPUTE_SHADER))?;
    anyhow::ensure!(shader.is_linked(), "compute shader failed to link: {}", shader.link_log());

    ctx.use_pipeline(&pipeline);
    ctx.use_bindings(&BindingDesc::new(&shader));
    shader.attach_uniform(ShaderStage::Compute, &storage, 0);
    ctx.dispatch(4, 1, 1);
    ctx.memory_barrier(BarrierFlags::SHADER_STORAGE);
    Ok(())
}

fn report(ctx: &Context<HeadlessDevice>, scenario: &str) {
    let device = ctx.device();
    for call in device.draw_calls() {
        info!(scenario, call = ?call, "Submitted");
    }
    info!(scenario, total = device.calls().len(), "Native calls recorded");
    device.clear_calls();
}

fn main() -> anyhow::Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("gal.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args());

    // 3. 验证配置
    config.validate().context("invalid configuration")?;

    // 4. 初始化日志系统
    let log_file = config
        .logging
        .file_output
        .then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "dist_gal smoke run starting");

    if config.graphics.backend != BackendKind::Headless {
        warn!(
            requested = config.graphics.backend.name(),
            "No host window available, running on the headless backend"
        );
    }

    // 5. 创建上下文
    let surface = Rc::new(OffscreenSurface::new(config.surface.width, config.surface.height));
    let desc = ContextDesc::from_config(surface, &config.graphics);
    let mut ctx: Context<HeadlessDevice> = Context::init(&desc).context("failed to create context")?;
    info!(
        width = config.surface.width,
        height = config.surface.height,
        vsync = ctx.has_vsync(),
        "Context ready"
    );
    ctx.device().clear_calls();

    // 6. 依次提交各场景
    draw_triangle(&mut ctx).context("triangle scenario")?;
    report(&ctx, "triangle");

    draw_indexed_quad(&mut ctx).context("indexed quad scenario")?;
    report(&ctx, "indexed_quad");

    run_compute(&mut ctx).context("compute scenario")?;
    report(&ctx, "compute");

    ctx.shutdown();
    info!("dist_gal smoke run finished");
    Ok(())
}
