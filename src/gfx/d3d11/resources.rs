//! 原生资源记录
//!
//! D3D11 设备用与 GL 相同的整数名字作为句柄，名字对应的记录保存在设备的表中。
//! 这样重新分配存储（缓冲 / 纹理）时只替换记录里的 COM 对象，
//! 输入装配和帧缓冲通过名字引用资源，提交时才解析成视图。

use std::collections::HashMap;

use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::renderer::backend_trait::Extent3d;
use crate::renderer::shader::ShaderQueryDesc;
use crate::renderer::types::{ShaderStage, TextureType, UniformType};
use crate::renderer::vertex::CompiledLayout;

/// 缓冲区及其 CPU 影子副本
///
/// 常量缓冲不允许局部更新，动态缓冲只能整体映射，
/// 局部写入先落到影子副本上再整体提交。
pub struct BufferRecord {
    pub native: Option<ID3D11Buffer>,
    pub bind: D3D11_BIND_FLAG,
    pub usage: D3D11_USAGE,
    pub shadow: Vec<u8>,
    /// 存储缓冲的原始视图
    pub uav: Option<ID3D11UnorderedAccessView>,
    pub srv: Option<ID3D11ShaderResourceView>,
}

impl BufferRecord {
    pub fn new() -> Self {
        Self {
            native: None,
            bind: D3D11_BIND_VERTEX_BUFFER,
            usage: D3D11_USAGE_DEFAULT,
            shadow: Vec::new(),
            uav: None,
            srv: None,
        }
    }
}

/// 纹理资源、视图与采样器
pub struct TextureRecord {
    pub ty: TextureType,
    pub dimension: D3D_SRV_DIMENSION,
    pub resource: Option<ID3D11Resource>,
    pub srv: Option<ID3D11ShaderResourceView>,
    pub uav: Option<ID3D11UnorderedAccessView>,
    pub rtv: Option<ID3D11RenderTargetView>,
    pub dsv: Option<ID3D11DepthStencilView>,
    pub sampler: Option<ID3D11SamplerState>,
    pub extent: Extent3d,
    pub mips: u32,
    pub can_generate_mips: bool,
}

impl TextureRecord {
    pub fn new(ty: TextureType, dimension: D3D_SRV_DIMENSION) -> Self {
        Self {
            ty,
            dimension,
            resource: None,
            srv: None,
            uav: None,
            rtv: None,
            dsv: None,
            sampler: None,
            extent: Extent3d {
                width: 0,
                height: 0,
                depth: 0,
            },
            mips: 1,
            can_generate_mips: false,
        }
    }

    /// 释放旧存储及其视图，采样器保留
    pub fn release_storage(&mut self) {
        self.resource = None;
        self.srv = None;
        self.uav = None;
        self.rtv = None;
        self.dsv = None;
        self.can_generate_mips = false;
    }
}

/// 某个阶段的 `$Globals` 常量缓冲
pub struct StageGlobals {
    pub stage: ShaderStage,
    pub register: u32,
    pub buffer: ID3D11Buffer,
    pub shadow: Vec<u8>,
    pub dirty: bool,
}

/// 程序的一个 uniform 在各阶段 `$Globals` 中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    /// (阶段下标, 字节偏移)
    pub offsets: Vec<(usize, u32)>,
    /// 采样器 / 图像：寄存器固定，上传无效
    pub opaque: bool,
}

/// 链接好的程序
#[derive(Default)]
pub struct ProgramRecord {
    pub vertex: Option<ID3D11VertexShader>,
    pub pixel: Option<ID3D11PixelShader>,
    pub compute: Option<ID3D11ComputeShader>,
    /// 创建输入布局需要顶点着色器的输入签名
    pub vertex_bytecode: Vec<u8>,
    pub query: ShaderQueryDesc,
    /// 按 uniform 位置索引
    pub uniforms: Vec<UniformSlot>,
    /// 按阶段顺序排列，没有 `$Globals` 的阶段为 `None`
    pub globals: Vec<Option<StageGlobals>>,
}

/// 输入装配：编译好的布局 + 引用的缓冲名字 + 按程序缓存的输入布局
pub struct AssemblyRecord {
    pub layout: CompiledLayout<DXGI_FORMAT>,
    pub vertex: Option<u32>,
    pub instance: Option<u32>,
    pub index: Option<u32>,
    pub input_layouts: HashMap<u32, ID3D11InputLayout>,
}

impl AssemblyRecord {
    pub fn new() -> Self {
        Self {
            layout: CompiledLayout {
                bindings: Vec::new(),
                attributes: Vec::new(),
            },
            vertex: None,
            instance: None,
            index: None,
            input_layouts: HashMap::new(),
        }
    }
}

/// 帧缓冲的附件表，记录纹理名字
#[derive(Debug, Default, Clone)]
pub struct FramebufferRecord {
    /// (附件序号, 纹理名字)
    pub colors: Vec<(u32, u32)>,
    pub depth: Option<u32>,
    pub draw_count: u32,
}

impl FramebufferRecord {
    pub fn color(&self, index: u32) -> Option<u32> {
        self.colors.iter().find(|(i, _)| *i == index).map(|(_, t)| *t)
    }
}

pub fn round_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// 按 HLSL 常量缓冲打包规则写入 uniform
///
/// 矩阵每列占一个 16 字节寄存器；数组元素也各自从寄存器边界开始。
/// 返回 `false` 表示有部分数据落在缓冲之外被丢弃。
pub fn pack_constants(shadow: &mut [u8], offset: usize, ty: UniformType, count: u32, data: &[u8]) -> bool {
    let (columns, column_bytes) = match ty {
        UniformType::Mat2 => (2, 8),
        UniformType::Mat3 => (3, 12),
        UniformType::Mat4 => (4, 16),
        _ => (1, ty.byte_size()),
    };
    let element_stride = if columns > 1 {
        columns * 16
    } else if count > 1 {
        round_up(column_bytes, 16)
    } else {
        column_bytes
    };

    let mut fits = true;
    for element in 0..count as usize {
        for column in 0..columns {
            let src = (element * columns + column) * column_bytes;
            let dst = offset + element * element_stride + column * 16;
            match (shadow.get_mut(dst..dst + column_bytes), data.get(src..src + column_bytes)) {
                (Some(target), Some(source)) => target.copy_from_slice(source),
                _ => fits = false,
            }
        }
    }
    fits
}

/// 把逐行对齐的 RGB 像素展开成紧密排列的 RGBA
///
/// # 参数
///
/// * `component_bytes` - 单个分量的字节数
/// * `alpha` - 补上的 alpha 分量（小端字节）
pub fn expand_rows(
    data: &[u8],
    width: usize,
    rows: usize,
    src_pitch: usize,
    component_bytes: usize,
    alpha: &[u8],
) -> Vec<u8> {
    let src_pixel = component_bytes * 3;
    let mut out = Vec::with_capacity(width * rows * (src_pixel + alpha.len()));
    for row in 0..rows {
        let start = row * src_pitch;
        let Some(line) = data.get(start..start + width * src_pixel) else {
            break;
        };
        for pixel in line.chunks_exact(src_pixel) {
            out.extend_from_slice(pixel);
            out.extend_from_slice(alpha);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mat3_columns_start_on_registers() {
        let mut shadow = vec![0u8; 48];
        let data: Vec<u8> = (0..36).collect();
        assert!(pack_constants(&mut shadow, 0, UniformType::Mat3, 1, &data));
        assert_eq!(&shadow[0..12], &data[0..12]);
        assert_eq!(&shadow[16..28], &data[12..24]);
        assert_eq!(&shadow[32..44], &data[24..36]);
        assert_eq!(&shadow[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_float_array_is_padded() {
        let mut shadow = vec![0u8; 32];
        let data = [1u8, 1, 1, 1, 2, 2, 2, 2];
        assert!(pack_constants(&mut shadow, 0, UniformType::Float, 2, &data));
        assert_eq!(&shadow[16..20], &[2, 2, 2, 2]);
        assert!(!pack_constants(&mut shadow, 24, UniformType::Vec4, 1, &[0; 16]));
    }

    #[test]
    fn test_expand_rows_skips_padding() {
        // 2x2 RGB8，行按 4 字节对齐后每行 8 字节
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let out = expand_rows(&data, 2, 2, 8, 1, &[255]);
        assert_eq!(
            out,
            vec![1, 2, 3, 255, 4, 5, 6, 255, 7, 8, 9, 255, 10, 11, 12, 255]
        );
    }

    #[test]
    fn test_framebuffer_color_lookup() {
        let record = FramebufferRecord {
            colors: vec![(1, 7), (0, 3)],
            depth: None,
            draw_count: 2,
        };
        assert_eq!(record.color(0), Some(3));
        assert_eq!(record.color(2), None);
    }
}
