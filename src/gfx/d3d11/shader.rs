//! HLSL 编译与反射
//!
//! 每个阶段以 `main` 为入口、按 Shader Model 5.0 编译。
//! 反射结果先按阶段收集，再合并成一个程序级的 `ShaderQueryDesc`：
//!
//! - 属性来自顶点阶段的输入签名，`TEXCOORD{n}` 的位置为 n
//! - 散装 uniform 来自各阶段的 `$Globals`，同名变量合并为一个位置，
//!   位置是程序 uniform 表的下标，表中记录每个阶段的字节偏移
//! - 纹理 / 图像按寄存器号绑定，同样占一个位置，但上传无效
//! - 其他常量缓冲是 uniform 块，块索引为寄存器号

use std::collections::HashMap;

use windows::core::*;
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;

use crate::renderer::shader::{ShaderBlock, ShaderQueryDesc, ShaderVariable};
use crate::renderer::translate::Translate;
use crate::renderer::types::ShaderStage;

use super::device::D3d11Device;
use super::resources::UniformSlot;
use super::translate::{resource_variable_type, signature_variable_type, D3dVariableType};

const GLOBALS: &str = "$Globals";

/// 单个阶段的反射结果
#[derive(Debug, Clone, Default)]
pub struct StageReflection {
    pub inputs: Vec<ShaderVariable>,
    /// (变量, `$Globals` 中的字节偏移)
    pub globals: Vec<(ShaderVariable, u32)>,
    pub globals_size: u32,
    pub globals_register: Option<u32>,
    /// 位置为寄存器号
    pub resources: Vec<ShaderVariable>,
    pub blocks: Vec<ShaderBlock>,
    pub thread_group: [u32; 3],
}

fn blob_bytes(blob: &ID3DBlob) -> Vec<u8> {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()).to_vec() }
}

fn blob_text(blob: &ID3DBlob) -> String {
    String::from_utf8_lossy(&blob_bytes(blob))
        .trim_end_matches('\0')
        .to_string()
}

/// 编译目标
pub fn target(stage: ShaderStage) -> PCSTR {
    match stage {
        ShaderStage::Vertex => s!("vs_5_0"),
        ShaderStage::Pixel => s!("ps_5_0"),
        ShaderStage::Compute => s!("cs_5_0"),
    }
}

/// 编译一个阶段，失败时返回编译器输出
pub fn compile(stage: ShaderStage, source: &str) -> std::result::Result<Vec<u8>, String> {
    let mut flags = D3DCOMPILE_ENABLE_STRICTNESS;
    if cfg!(debug_assertions) {
        flags |= D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION;
    }

    let mut blob = None;
    let mut error_blob = None;
    let result = unsafe {
        D3DCompile(
            source.as_ptr() as _,
            source.len(),
            None,
            None,
            None,
            s!("main"),
            target(stage),
            flags,
            0,
            &mut blob,
            Some(&mut error_blob),
        )
    };
    let log = error_blob.as_ref().map(blob_text).unwrap_or_default();

    match (result, blob) {
        (Ok(()), Some(blob)) => {
            if !log.is_empty() {
                tracing::warn!(stage = ?stage, "{}", log);
            }
            Ok(blob_bytes(&blob))
        }
        (Err(e), _) if log.is_empty() => Err(format!("{:?} stage failed to compile: {:?}", stage, e)),
        (Err(_), _) => Err(log),
        (Ok(()), None) => Err(format!("{:?} stage produced no bytecode", stage)),
    }
}

fn variable(name: String, ty: D3dVariableType, array_size: u32, location: i32) -> ShaderVariable {
    let ty = D3d11Device::reflect_uniform_type(ty);
    ShaderVariable {
        name,
        ty,
        components: ty.components(),
        array_size: array_size.max(1),
        location,
    }
}

/// 反射一个阶段的字节码
pub fn reflect(stage: ShaderStage, bytecode: &[u8]) -> Result<StageReflection> {
    unsafe {
        let mut raw = std::ptr::null_mut();
        D3DReflect(
            bytecode.as_ptr() as _,
            bytecode.len(),
            &ID3D11ShaderReflection::IID,
            &mut raw,
        )?;
        let reflection = ID3D11ShaderReflection::from_raw(raw);

        let mut desc = D3D11_SHADER_DESC::default();
        reflection.GetDesc(&mut desc)?;

        let mut out = StageReflection::default();

        if stage == ShaderStage::Vertex {
            for index in 0..desc.InputParameters {
                let mut param = D3D11_SIGNATURE_PARAMETER_DESC::default();
                reflection.GetInputParameterDesc(index, &mut param)?;
                if param.SystemValueType != D3D_NAME_UNDEFINED {
                    continue;
                }
                let semantic = param.SemanticName.to_string().unwrap_or_default();
                let location = if semantic.eq_ignore_ascii_case("TEXCOORD") {
                    param.SemanticIndex as i32
                } else {
                    param.Register as i32
                };
                out.inputs.push(variable(
                    format!("{}{}", semantic, param.SemanticIndex),
                    signature_variable_type(param.ComponentType, param.Mask),
                    1,
                    location,
                ));
            }
        }

        let mut block_sizes = HashMap::new();
        for index in 0..desc.ConstantBuffers {
            let Some(buffer) = reflection.GetConstantBufferByIndex(index) else {
                continue;
            };
            let mut buffer_desc = D3D11_SHADER_BUFFER_DESC::default();
            buffer.GetDesc(&mut buffer_desc)?;
            let name = buffer_desc.Name.to_string().unwrap_or_default();

            if name != GLOBALS {
                block_sizes.insert(name, buffer_desc.Size);
                continue;
            }

            out.globals_size = buffer_desc.Size;
            for var_index in 0..buffer_desc.Variables {
                let Some(var) = buffer.GetVariableByIndex(var_index) else {
                    continue;
                };
                let mut var_desc = D3D11_SHADER_VARIABLE_DESC::default();
                var.GetDesc(&mut var_desc)?;
                // 未被引用的变量不算活动 uniform
                if var_desc.uFlags & (D3D_SVF_USED.0 as u32) == 0 {
                    continue;
                }
                let Some(var_type) = var.GetType() else {
                    continue;
                };
                let mut type_desc = D3D11_SHADER_TYPE_DESC::default();
                var_type.GetDesc(&mut type_desc)?;
                let ty = D3dVariableType {
                    class: type_desc.Class,
                    base: type_desc.Type,
                    rows: type_desc.Rows,
                    columns: type_desc.Columns,
                };
                out.globals.push((
                    variable(
                        var_desc.Name.to_string().unwrap_or_default(),
                        ty,
                        type_desc.Elements,
                        -1,
                    ),
                    var_desc.StartOffset,
                ));
            }
        }

        for index in 0..desc.BoundResources {
            let mut bind = D3D11_SHADER_INPUT_BIND_DESC::default();
            reflection.GetResourceBindingDesc(index, &mut bind)?;
            let name = bind.Name.to_string().unwrap_or_default();
            match bind.Type {
                D3D_SIT_CBUFFER if name == GLOBALS => out.globals_register = Some(bind.BindPoint),
                D3D_SIT_CBUFFER => out.blocks.push(ShaderBlock {
                    size: block_sizes.get(&name).copied().unwrap_or(0),
                    name,
                    index: bind.BindPoint,
                }),
                D3D_SIT_TEXTURE | D3D_SIT_UAV_RWTYPED => out.resources.push(variable(
                    name,
                    resource_variable_type(bind.Type, bind.Dimension),
                    bind.BindCount,
                    bind.BindPoint as i32,
                )),
                _ => {}
            }
        }

        if stage == ShaderStage::Compute {
            let [x, y, z] = &mut out.thread_group;
            reflection.GetThreadGroupSize(Some(x), Some(y), Some(z));
        }

        Ok(out)
    }
}

/// 合并各阶段的反射结果
///
/// # 返回值
///
/// 程序级反射结果，以及按 uniform 位置索引的槽位表
pub fn merge(stages: &[(ShaderStage, StageReflection)]) -> (ShaderQueryDesc, Vec<UniformSlot>) {
    let mut query = ShaderQueryDesc::default();
    let mut slots: Vec<UniformSlot> = Vec::new();

    for (stage_index, (stage, reflection)) in stages.iter().enumerate() {
        if *stage == ShaderStage::Vertex {
            query.attributes = reflection.inputs.clone();
        }
        if *stage == ShaderStage::Compute {
            query.work_group_size = reflection.thread_group;
        }

        for (var, offset) in &reflection.globals {
            match query.uniforms.iter().position(|u| u.name == var.name) {
                Some(existing) => slots[existing].offsets.push((stage_index, *offset)),
                None => {
                    query.uniforms.push(ShaderVariable {
                        location: query.uniforms.len() as i32,
                        ..var.clone()
                    });
                    slots.push(UniformSlot {
                        offsets: vec![(stage_index, *offset)],
                        opaque: false,
                    });
                }
            }
        }

        for resource in &reflection.resources {
            if query.uniforms.iter().any(|u| u.name == resource.name) {
                continue;
            }
            query.uniforms.push(ShaderVariable {
                location: query.uniforms.len() as i32,
                ..resource.clone()
            });
            slots.push(UniformSlot {
                offsets: Vec::new(),
                opaque: true,
            });
        }

        for block in &reflection.blocks {
            if !query.uniform_blocks.iter().any(|b| b.name == block.name) {
                query.uniform_blocks.push(block.clone());
            }
        }
    }

    (query, slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::types::UniformType;

    fn global(name: &str, ty: UniformType, offset: u32) -> (ShaderVariable, u32) {
        (
            ShaderVariable {
                name: name.to_string(),
                ty,
                components: ty.components(),
                array_size: 1,
                location: -1,
            },
            offset,
        )
    }

    #[test]
    fn test_merge_shares_locations_across_stages() {
        let vertex = StageReflection {
            globals: vec![global("u_mvp", UniformType::Mat4, 0), global("u_time", UniformType::Float, 64)],
            ..Default::default()
        };
        let pixel = StageReflection {
            globals: vec![global("u_time", UniformType::Float, 0)],
            ..Default::default()
        };
        let (query, slots) = merge(&[(ShaderStage::Vertex, vertex), (ShaderStage::Pixel, pixel)]);

        assert_eq!(query.uniform_location("u_mvp"), 0);
        assert_eq!(query.uniform_location("u_time"), 1);
        assert_eq!(slots[1].offsets, vec![(0, 64), (1, 0)]);
    }
}
