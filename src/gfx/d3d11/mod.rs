//! Direct3D 11 后端
//!
//! 仅在 Windows 上、开启 `backend_d3d11` 特性时编译。
//!
//! - `translate`：可移植词汇到 D3D11 / DXGI 常量的翻译表
//! - `state`：固定功能状态的影子副本与状态对象描述
//! - `resources`：按名字索引的原生资源记录
//! - `shader`：HLSL 编译与反射
//! - `device`：`Backend` 实现

mod translate;
mod state;
mod resources;
mod shader;
mod device;

pub use device::D3d11Device;
pub use translate::D3dVariableType;
