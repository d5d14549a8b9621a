//! 可移植渲染层
//!
//! 本模块提供与具体图形 API 无关的资源与提交接口。
//! 客户端代码只面对这里的类型，通过泛型参数 `B: Backend` 选择原生后端，
//! 后端实现位于 `gfx` 模块，按 API 分类组织。
//!
//! # 架构设计
//!
//! - `types` / `descriptor`：可移植词汇与描述符
//! - `translate`：可移植词汇到原生常量的双向表契约
//! - `backend_trait`：原生设备能力集合
//! - `vertex`：顶点布局编译器
//! - `resource` / `texture` / `shader` / `pipeline` / `framebuffer`：资源对象
//! - `sync`：内存屏障位
//! - `context`：全局状态与提交协议

pub mod types;
pub mod descriptor;
pub mod translate;
pub mod backend_trait;
pub mod vertex;
pub mod resource;
pub mod texture;
pub mod shader;
pub mod pipeline;
pub mod framebuffer;
pub mod sync;
pub mod context;

pub use backend_trait::{Backend, DeviceLimits};
pub use context::{BindingDesc, Context, ContextDesc, ContextPhase};
pub use descriptor::*;
pub use framebuffer::{Framebuffer, FramebufferAttachments};
pub use pipeline::{Pipeline, PipelineBuffers};
pub use resource::Buffer;
pub use shader::{Shader, ShaderMode, ShaderQueryDesc};
pub use sync::BarrierFlags;
pub use texture::{Cubemap, Texture};
pub use types::*;
