//! 固定功能状态
//!
//! GL 逐项开关的状态在 D3D11 中被打包进三个不可变状态对象。
//! 设备先在这里累积影子状态，提交前只在脏时重建状态对象。

use windows::Win32::Graphics::Direct3D11::*;

use crate::renderer::translate::{NativeBlend, StencilFaceOps};
use crate::renderer::types::StateKind;

/// 深度 / 模板 / 混合 / 光栅化的影子状态
#[derive(Debug, Clone)]
pub struct FixedFunctionState {
    pub depth_test: bool,
    pub stencil_test: bool,
    pub blend: bool,
    pub cull: bool,
    pub scissor: bool,

    pub depth_func: D3D11_COMPARISON_FUNC,
    pub depth_write: bool,

    pub front: StencilFaceOps<D3D11_COMPARISON_FUNC, D3D11_STENCIL_OP>,
    pub back: StencilFaceOps<D3D11_COMPARISON_FUNC, D3D11_STENCIL_OP>,
    pub stencil_ref: u32,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,

    pub blend_state: NativeBlend<D3D11_BLEND, D3D11_BLEND_OP>,

    pub cull_mode: D3D11_CULL_MODE,
    pub front_ccw: bool,

    /// 自上次重建以来是否有修改
    pub dirty: bool,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        let keep = StencilFaceOps {
            func: D3D11_COMPARISON_ALWAYS,
            fail: D3D11_STENCIL_OP_KEEP,
            depth_fail: D3D11_STENCIL_OP_KEEP,
            pass: D3D11_STENCIL_OP_KEEP,
        };
        Self {
            depth_test: false,
            stencil_test: false,
            blend: false,
            cull: false,
            scissor: false,
            depth_func: D3D11_COMPARISON_LESS,
            depth_write: true,
            front: keep,
            back: keep,
            stencil_ref: 0,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            blend_state: NativeBlend {
                src_rgb: D3D11_BLEND_ONE,
                dst_rgb: D3D11_BLEND_ZERO,
                src_alpha: D3D11_BLEND_ONE,
                dst_alpha: D3D11_BLEND_ZERO,
                op_rgb: D3D11_BLEND_OP_ADD,
                op_alpha: D3D11_BLEND_OP_ADD,
                constant_color: [0.0; 4],
            },
            cull_mode: D3D11_CULL_BACK,
            front_ccw: true,
            dirty: true,
        }
    }
}

fn stencil_face(ops: &StencilFaceOps<D3D11_COMPARISON_FUNC, D3D11_STENCIL_OP>) -> D3D11_DEPTH_STENCILOP_DESC {
    D3D11_DEPTH_STENCILOP_DESC {
        StencilFailOp: ops.fail,
        StencilDepthFailOp: ops.depth_fail,
        StencilPassOp: ops.pass,
        StencilFunc: ops.func,
    }
}

impl FixedFunctionState {
    pub fn set_capability(&mut self, state: StateKind, enabled: bool) {
        let flag = match state {
            StateKind::Depth => &mut self.depth_test,
            StateKind::Stencil => &mut self.stencil_test,
            StateKind::Blend => &mut self.blend,
            StateKind::Cull => &mut self.cull,
            StateKind::Scissor => &mut self.scissor,
        };
        *flag = enabled;
        self.dirty = true;
    }

    pub fn depth_stencil_desc(&self) -> D3D11_DEPTH_STENCIL_DESC {
        D3D11_DEPTH_STENCIL_DESC {
            DepthEnable: self.depth_test.into(),
            DepthWriteMask: if self.depth_write {
                D3D11_DEPTH_WRITE_MASK_ALL
            } else {
                D3D11_DEPTH_WRITE_MASK_ZERO
            },
            DepthFunc: self.depth_func,
            StencilEnable: self.stencil_test.into(),
            StencilReadMask: self.stencil_read_mask,
            StencilWriteMask: self.stencil_write_mask,
            FrontFace: stencil_face(&self.front),
            BackFace: stencil_face(&self.back),
        }
    }

    /// 所有颜色附件共用同一组混合参数
    pub fn blend_desc(&self) -> D3D11_BLEND_DESC {
        let b = &self.blend_state;
        let target = D3D11_RENDER_TARGET_BLEND_DESC {
            BlendEnable: self.blend.into(),
            SrcBlend: b.src_rgb,
            DestBlend: b.dst_rgb,
            BlendOp: b.op_rgb,
            SrcBlendAlpha: b.src_alpha,
            DestBlendAlpha: b.dst_alpha,
            BlendOpAlpha: b.op_alpha,
            RenderTargetWriteMask: D3D11_COLOR_WRITE_ENABLE_ALL.0 as u8,
        };
        D3D11_BLEND_DESC {
            AlphaToCoverageEnable: false.into(),
            IndependentBlendEnable: false.into(),
            RenderTarget: [target; 8],
        }
    }

    pub fn rasterizer_desc(&self) -> D3D11_RASTERIZER_DESC {
        D3D11_RASTERIZER_DESC {
            FillMode: D3D11_FILL_SOLID,
            CullMode: if self.cull { self.cull_mode } else { D3D11_CULL_NONE },
            FrontCounterClockwise: self.front_ccw.into(),
            DepthClipEnable: true.into(),
            ScissorEnable: self.scissor.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_cull_maps_to_none() {
        let mut state = FixedFunctionState::default();
        assert_eq!(state.rasterizer_desc().CullMode, D3D11_CULL_NONE);
        state.set_capability(StateKind::Cull, true);
        assert_eq!(state.rasterizer_desc().CullMode, D3D11_CULL_BACK);
        assert!(state.dirty);
    }

    #[test]
    fn test_depth_write_mask() {
        let mut state = FixedFunctionState::default();
        state.depth_write = false;
        assert_eq!(state.depth_stencil_desc().DepthWriteMask, D3D11_DEPTH_WRITE_MASK_ZERO);
    }
}
