//! 无头后端记录的原生调用
//!
//! 每个变体对应一次 GL 风格的原生调用，字段使用 GL 常量，
//! 便于测试直接与 `glow` 常量比较。

use crate::renderer::descriptor::Rect;
use crate::renderer::types::UniformType;

/// 一次原生调用
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    // 全局状态
    Enable { cap: u32 },
    Disable { cap: u32 },
    DepthFunc { func: u32 },
    DepthMask { enabled: bool },
    StencilFuncSeparate { face: u32, func: u32, reference: i32, mask: u32 },
    StencilOpSeparate { face: u32, fail: u32, depth_fail: u32, pass: u32 },
    StencilMask { mask: u32 },
    BlendFuncSeparate { src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32 },
    BlendEquationSeparate { rgb: u32, alpha: u32 },
    BlendColor { color: [f32; 4] },
    CullFace { mode: u32 },
    FrontFace { winding: u32 },
    Viewport { rect: Rect },
    Scissor { rect: Rect },
    BindFramebuffer { framebuffer: u32 },
    Clear { framebuffer: u32, mask: u32, color: [f32; 4], depth: f32, stencil: i32 },

    // 缓冲区
    GenBuffer { buffer: u32 },
    BufferData { buffer: u32, target: u32, usage: u32, size: usize, initialized: bool },
    BufferSubData { buffer: u32, target: u32, offset: usize, size: usize },
    DeleteBuffer { buffer: u32 },

    // 纹理
    GenTexture { texture: u32, target: u32 },
    TexParameters { texture: u32, target: u32, min_filter: u32, mag_filter: u32, wrap: u32, compare: Option<u32>, max_level: u32 },
    TexStorage { texture: u32, target: u32, internal: u32, width: u32, height: u32, depth: u32, mips: u32 },
    TexSubImage { texture: u32, target: u32, layer: u32, width: u32, height: u32, depth: u32, alignment: u32, size: usize },
    GenerateMipmap { texture: u32, target: u32 },
    DeleteTexture { texture: u32 },
    BindTexture { unit: u32, target: u32, texture: u32 },
    BindImageTexture { unit: u32, texture: u32, format: u32, access: u32 },

    // 程序
    CreateProgram { program: u32 },
    LinkProgram { program: u32, linked: bool },
    UseProgram { program: u32 },
    BindBufferBase { program: u32, target: u32, index: u32, buffer: u32 },
    Uniform { program: u32, location: i32, ty: UniformType, count: u32 },
    DeleteProgram { program: u32 },

    // 输入装配
    GenVertexArray { vao: u32 },
    BindVertexArray { vao: u32 },
    VertexAttribPointer { index: u32, buffer: u32, components: u32, element: u32, stride: u32, offset: u32, integer: bool },
    VertexAttribDivisor { index: u32, divisor: u32 },
    DisableVertexAttrib { index: u32 },
    BindIndexBuffer { vao: u32, buffer: u32 },
    DeleteVertexArray { vao: u32 },

    // 提交
    DrawArrays { mode: u32, first: u32, count: u32 },
    DrawArraysInstanced { mode: u32, first: u32, count: u32, instances: u32 },
    DrawElements { mode: u32, format: u32, count: u32, offset: usize },
    DrawElementsInstanced { mode: u32, format: u32, count: u32, offset: usize, instances: u32 },
    DispatchCompute { x: u32, y: u32, z: u32 },
    MemoryBarrier { bits: u32 },
    SwapBuffers { interval: i32 },

    // 帧缓冲
    GenFramebuffer { framebuffer: u32 },
    FramebufferTexture { framebuffer: u32, attachment: u32, texture: u32 },
    FramebufferRenderbuffer { framebuffer: u32, attachment: u32, renderbuffer: u32 },
    DrawBuffers { framebuffer: u32, count: u32 },
    BlitFramebuffer { src: u32, dst: u32, src_rect: Rect, dst_rect: Rect, mask: u32 },
    DeleteFramebuffer { framebuffer: u32 },
}

impl NativeCall {
    /// 是否为绘制调用
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            NativeCall::DrawArrays { .. }
                | NativeCall::DrawArraysInstanced { .. }
                | NativeCall::DrawElements { .. }
                | NativeCall::DrawElementsInstanced { .. }
        )
    }
}
