//! 提交协议的端到端测试
//!
//! 全部运行在无头后端上，通过记录下来的原生调用序列验证共享层的行为。

use dist_gal::gfx::gl::translate::{barrier_bits, index_format, primitive};
use dist_gal::gfx::headless::{test_context, HeadlessDevice, NativeCall};
use dist_gal::renderer::vertex::ColorVertex;
use dist_gal::renderer::{
    BarrierFlags, BindingDesc, Buffer, BufferDesc, Context, DrawMode, ImageAccess, IndexType, LayoutType, Pipeline,
    PipelineBuffers, PipelineDesc, Shader, ShaderDesc, Texture, TextureDesc, TextureFormat, TextureType,
    VertexLayoutDesc,
};

const PASS_THROUGH_VS: &str = "#version 430
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;
out vec4 v_color;
void main() {
    v_color = a_color;
    gl_Position = vec4(a_position, 1.0);
}
";

const PASS_THROUGH_PS: &str = "#version 430
in vec4 v_color;
out vec4 o_color;
void main() {
    o_color = v_color;
}
";

const SAMPLE_PS: &str = "#version 430
uniform sampler2D u_source;
out vec4 o_color;
void main() {
    o_color = texture(u_source, vec2(0.5));
}
";

const WRITE_IMAGE_CS: &str = "#version 430
layout(local_size_x = 8, local_size_y = 8) in;
layout(rgba32f, binding = 0) uniform image2D u_target;
void main() {
    imageStore(u_target, ivec2(gl_GlobalInvocationID.xy), vec4(1.0));
}
";

fn triangle_buffer(ctx: &Context<HeadlessDevice>) -> Buffer<HeadlessDevice> {
    let vertices = [
        ColorVertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0, 1.0]),
        ColorVertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0, 1.0]),
        ColorVertex::new([0.0, 0.5, 0.0], [0.0, 0.0, 1.0, 1.0]),
    ];
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);
    Buffer::new(ctx, &BufferDesc::vertex(bytes.len() as u64), Some(bytes)).unwrap()
}

#[test]
fn test_triangle_issues_single_draw() {
    let mut ctx = test_context();
    let vertices = triangle_buffer(&ctx);
    let shader = Shader::new(&ctx, &ShaderDesc::graphics(PASS_THROUGH_VS, PASS_THROUGH_PS)).unwrap();
    assert!(shader.is_linked(), "{}", shader.link_log());
    let pipeline = Pipeline::create(
        &ctx,
        &PipelineDesc::new(3, ColorVertex::layout()).with_draw_mode(DrawMode::Triangles),
        PipelineBuffers::vertex(&vertices),
    )
    .unwrap();

    ctx.device().clear_calls();
    ctx.use_pipeline(&pipeline);
    ctx.use_bindings(&BindingDesc::new(&shader));
    ctx.draw(0);

    assert_eq!(
        ctx.device().draw_calls(),
        vec![NativeCall::DrawArrays {
            mode: primitive(DrawMode::Triangles),
            first: 0,
            count: 3,
        }]
    );
}

#[test]
fn test_indexed_quad_takes_index_path() {
    let mut ctx = test_context();
    let positions: [f32; 8] = [-0.5, -0.5, 0.5, -0.5, 0.5, 0.5, -0.5, 0.5];
    let indices: [u16; 6] = [0, 1, 2, 2, 3, 0];
    let vertices = Buffer::new(
        &ctx,
        &BufferDesc::vertex(32),
        Some(bytemuck::cast_slice(&positions)),
    )
    .unwrap();
    let index = Buffer::new(&ctx, &BufferDesc::index(12), Some(bytemuck::cast_slice(&indices))).unwrap();
    let shader = Shader::new(&ctx, &ShaderDesc::graphics(PASS_THROUGH_VS, PASS_THROUGH_PS)).unwrap();
    let pipeline = Pipeline::create(
        &ctx,
        &PipelineDesc::new(4, VertexLayoutDesc::new(vec![LayoutType::Float2])).with_indices(6, IndexType::U16),
        PipelineBuffers::vertex(&vertices).with_index(&index),
    )
    .unwrap();
    assert!(pipeline.is_indexed());

    ctx.device().clear_calls();
    ctx.use_pipeline(&pipeline);
    ctx.use_bindings(&BindingDesc::new(&shader));
    ctx.draw(0);

    let draws = ctx.device().draw_calls();
    assert_eq!(
        draws,
        vec![NativeCall::DrawElements {
            mode: primitive(DrawMode::Triangles),
            format: index_format(IndexType::U16),
            count: 6,
            offset: 0,
        }]
    );
    assert!(!draws.iter().any(|c| matches!(c, NativeCall::DrawArrays { .. })));
}

/// 计算写图像，随后采样同一张图像绘制，返回绘制调用
fn compute_then_sample(barrier: bool) -> (Vec<NativeCall>, Vec<NativeCall>) {
    let mut ctx = test_context();
    let vertices = triangle_buffer(&ctx);
    let pipeline = Pipeline::create(
        &ctx,
        &PipelineDesc::new(3, ColorVertex::layout()),
        PipelineBuffers::vertex(&vertices),
    )
    .unwrap();
    let mut image_desc = TextureDesc::new_2d(64, 64, TextureFormat::Rgba32F).with_type(TextureType::Image2D);
    image_desc.access = ImageAccess::WriteOnly;
    let image = Texture::new(&ctx, &image_desc, None).unwrap();
    let compute = Shader::new(&ctx, &ShaderDesc::compute(WRITE_IMAGE_CS)).unwrap();
    let sample = Shader::new(&ctx, &ShaderDesc::graphics(PASS_THROUGH_VS, SAMPLE_PS)).unwrap();
    assert!(compute.is_linked(), "{}", compute.link_log());

    ctx.device().clear_calls();
    ctx.use_pipeline(&pipeline);
    ctx.use_bindings(&BindingDesc::new(&compute).image(0, &image));
    ctx.dispatch(8, 8, 1);
    if barrier {
        ctx.memory_barrier(BarrierFlags::SHADER_IMAGE_ACCESS | BarrierFlags::TEXTURE_FETCH);
    }
    ctx.use_bindings(&BindingDesc::new(&sample).texture(0, &image));
    ctx.draw(0);

    (ctx.device().draw_calls(), ctx.device().calls())
}

#[test]
fn test_compute_without_barrier_does_not_crash() {
    let (draws, calls) = compute_then_sample(false);
    assert_eq!(draws.len(), 1);
    assert!(calls.contains(&NativeCall::DispatchCompute { x: 8, y: 8, z: 1 }));
    assert!(!calls.iter().any(|c| matches!(c, NativeCall::MemoryBarrier { .. })));
}

#[test]
fn test_barrier_does_not_change_draws() {
    let (without, _) = compute_then_sample(false);
    let (with, calls) = compute_then_sample(true);
    assert_eq!(without, with);

    let bits = barrier_bits(BarrierFlags::SHADER_IMAGE_ACCESS | BarrierFlags::TEXTURE_FETCH);
    let dispatch = calls
        .iter()
        .position(|c| matches!(c, NativeCall::DispatchCompute { .. }))
        .unwrap();
    let barrier = calls
        .iter()
        .position(|c| *c == NativeCall::MemoryBarrier { bits })
        .unwrap();
    let draw = calls.iter().position(|c| c.is_draw()).unwrap();
    assert!(dispatch < barrier && barrier < draw);
}

#[test]
fn test_descriptors_round_trip() {
    let ctx = test_context();

    let buffer_desc = BufferDesc::uniform(256);
    let buffer = Buffer::new(&ctx, &buffer_desc, None).unwrap();
    assert_eq!(*buffer.desc(), buffer_desc);

    let texture_desc = TextureDesc::new_2d(16, 8, TextureFormat::Rgba8).with_mips(3);
    let texture = Texture::new(&ctx, &texture_desc, None).unwrap();
    assert_eq!(*texture.desc(), texture_desc);

    let vertices = triangle_buffer(&ctx);
    let pipeline_desc = PipelineDesc::new(3, ColorVertex::layout()).with_draw_mode(DrawMode::LineStrip);
    let pipeline = Pipeline::create(&ctx, &pipeline_desc, PipelineBuffers::vertex(&vertices)).unwrap();
    assert_eq!(*pipeline.desc(), pipeline_desc);
}

#[test]
#[should_panic(expected = "overruns buffer")]
fn test_buffer_overrun_is_rejected() {
    let ctx = test_context();
    let mut buffer = Buffer::new(&ctx, &BufferDesc::vertex(16), None).unwrap();
    buffer.upload_data(12, &[0u8; 8]);
}
