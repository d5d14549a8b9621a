//! Direct3D 11 设备
//!
//! D3D11 是对象模型 API：资源在创建时就确定了尺寸和用途，状态被打包成不可变对象，
//! 绘制时才把视图绑定到各阶段的寄存器。为了在这种模型上提供与 GL 相同的
//! “创建名字、随后重新分配存储”语义，设备把每个句柄实现为一个整数名字，
//! 名字对应的记录保存在设备内部的表中。
//!
//! # 与 GL 语义的差异
//!
//! - 散装 uniform 写入每个阶段 `$Globals` 的影子副本，绘制 / 调度前统一提交
//! - 输入布局依赖顶点着色器签名，按（输入装配, 程序）懒创建并缓存
//! - 采样器与纹理共用单元号；立方体贴图单元映射到采样器寄存器 12 之后
//! - 图像只能绑定到计算阶段
//! - 区域拷贝只支持等尺寸颜色拷贝

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::c_void;
use std::rc::Rc;

use raw_window_handle::RawWindowHandle;
use windows::core::*;
use windows::Win32::Foundation::{HMODULE, HWND, RECT};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use crate::core::error::{GalError, GraphicsError, Result};
use crate::core::log::{log_backend_message, DebugSeverity};
use crate::gfx::backend::NativeSurface;
use crate::renderer::backend_trait::{
    Backend, DepthAttachmentPoint, DeviceLimits, Extent3d, InputStreams, LinkReport, ShaderStages,
};
use crate::renderer::descriptor::{BlitRegion, Rect};
use crate::renderer::shader::ShaderQueryDesc;
use crate::renderer::sync::BarrierFlags;
use crate::renderer::translate::{NativeBlend, NativePixelFormat, NativeSampling, StencilFaceOps};
use crate::renderer::types::{
    ClearFlags, ImageAccess, ShaderStage, StateKind, TextureType, UniformType, TEXTURES_MAX,
};
use crate::renderer::vertex::{CompiledLayout, StepRate};

use super::resources::*;
use super::shader::{self, StageReflection};
use super::state::FixedFunctionState;
use super::translate::expands_to_rgba;

const BACKEND: &str = "Direct3D 11";

/// 计算阶段可同时绑定的 UAV 个数
const CS_UAV_SLOTS: usize = 8;

/// 立方体贴图采样器的第一个寄存器
const CUBEMAP_SAMPLER_BASE: u32 = 12;

/// 交换链后缓冲及其深度模板缓冲
struct Backbuffer {
    color: ID3D11Resource,
    rtv: ID3D11RenderTargetView,
    dsv: ID3D11DepthStencilView,
}

/// Direct3D 11 设备
pub struct D3d11Device {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain1,
    info_queue: Option<ID3D11InfoQueue>,
    surface: Rc<dyn NativeSurface>,
    backbuffer: Backbuffer,

    next_name: Cell<u32>,
    buffers: RefCell<HashMap<u32, BufferRecord>>,
    textures: RefCell<HashMap<u32, TextureRecord>>,
    programs: RefCell<HashMap<u32, ProgramRecord>>,
    assemblies: RefCell<HashMap<u32, AssemblyRecord>>,
    framebuffers: RefCell<HashMap<u32, FramebufferRecord>>,

    state: RefCell<FixedFunctionState>,
    current_program: Cell<Option<u32>>,
    current_assembly: Cell<Option<u32>>,
    current_target: Cell<Option<u32>>,
}

impl std::fmt::Debug for D3d11Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3d11Device")
            .field("surface_size", &self.surface.size())
            .field("buffers", &self.buffers.borrow().len())
            .field("textures", &self.textures.borrow().len())
            .field("programs", &self.programs.borrow().len())
            .finish()
    }
}

fn resource_error(what: &str, e: Error) -> GalError {
    crate::gal_error!(error = ?e, "Failed to create D3D11 {}", what);
    GraphicsError::ResourceCreation(format!("{}: {:?}", what, e)).into()
}

fn message_severity(severity: D3D11_MESSAGE_SEVERITY) -> DebugSeverity {
    match severity {
        D3D11_MESSAGE_SEVERITY_CORRUPTION => DebugSeverity::Fatal,
        D3D11_MESSAGE_SEVERITY_ERROR => DebugSeverity::Error,
        D3D11_MESSAGE_SEVERITY_WARNING => DebugSeverity::Warning,
        _ => DebugSeverity::Info,
    }
}

unsafe fn create_device(flags: D3D11_CREATE_DEVICE_FLAG) -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device = None;
    let mut context = None;
    D3D11CreateDevice(
        None,
        D3D_DRIVER_TYPE_HARDWARE,
        HMODULE::default(),
        flags,
        Some(&[D3D_FEATURE_LEVEL_11_0]),
        D3D11_SDK_VERSION,
        Some(&mut device),
        None,
        Some(&mut context),
    )
    .map_err(|e| GraphicsError::DeviceCreation(format!("{:?}", e)))?;
    match (device, context) {
        (Some(device), Some(context)) => Ok((device, context)),
        _ => Err(GraphicsError::DeviceCreation("D3D11CreateDevice returned no device".to_string()).into()),
    }
}

unsafe fn create_backbuffer(
    device: &ID3D11Device,
    swap_chain: &IDXGISwapChain1,
    width: u32,
    height: u32,
) -> Result<Backbuffer> {
    let swapchain_error = |e: Error| GalError::from(GraphicsError::SwapchainError(format!("{:?}", e)));

    let color: ID3D11Texture2D = swap_chain.GetBuffer(0).map_err(swapchain_error)?;
    let mut rtv = None;
    device
        .CreateRenderTargetView(&color, None, Some(&mut rtv))
        .map_err(swapchain_error)?;

    let depth_desc = D3D11_TEXTURE2D_DESC {
        Width: width,
        Height: height,
        MipLevels: 1,
        ArraySize: 1,
        Format: DXGI_FORMAT_D24_UNORM_S8_UINT,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Usage: D3D11_USAGE_DEFAULT,
        BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
        ..Default::default()
    };
    let mut depth = None;
    device
        .CreateTexture2D(&depth_desc, None, Some(&mut depth))
        .map_err(swapchain_error)?;
    let depth = depth.ok_or_else(|| GraphicsError::SwapchainError("no depth buffer".to_string()))?;
    let mut dsv = None;
    device
        .CreateDepthStencilView(&depth, None, Some(&mut dsv))
        .map_err(swapchain_error)?;

    match (rtv, dsv) {
        (Some(rtv), Some(dsv)) => Ok(Backbuffer {
            color: color.cast().map_err(swapchain_error)?,
            rtv,
            dsv,
        }),
        _ => Err(GraphicsError::SwapchainError("backbuffer views unavailable".to_string()).into()),
    }
}

/// 纹理类型与格式决定的绑定标志
fn texture_bind_flags(
    ty: TextureType,
    dimension: D3D_SRV_DIMENSION,
    format: &NativePixelFormat<DXGI_FORMAT>,
    mips: u32,
) -> (u32, u32) {
    let is_depth = format.element != format.internal;
    if ty.is_render_target() {
        return (D3D11_BIND_DEPTH_STENCIL.0 as u32, 0);
    }
    if ty.is_image() {
        return ((D3D11_BIND_UNORDERED_ACCESS.0 | D3D11_BIND_SHADER_RESOURCE.0) as u32, 0);
    }

    let mut bind = D3D11_BIND_SHADER_RESOURCE.0;
    let mut misc = 0;
    if is_depth {
        bind |= D3D11_BIND_DEPTH_STENCIL.0;
    } else if matches!(dimension, D3D_SRV_DIMENSION_TEXTURE2D | D3D_SRV_DIMENSION_TEXTURECUBE)
        && format.internal != DXGI_FORMAT_R32G32B32_FLOAT
    {
        bind |= D3D11_BIND_RENDER_TARGET.0;
        if mips > 1 {
            misc |= D3D11_RESOURCE_MISC_GENERATE_MIPS.0;
        }
    }
    if dimension == D3D_SRV_DIMENSION_TEXTURECUBE {
        misc |= D3D11_RESOURCE_MISC_TEXTURECUBE.0;
    }
    (bind as u32, misc as u32)
}

impl D3d11Device {
    fn allocate_name(&self) -> u32 {
        let name = self.next_name.get() + 1;
        self.next_name.set(name);
        name
    }

    fn buffer_native(&self, name: Option<u32>) -> Option<ID3D11Buffer> {
        name.and_then(|n| self.buffers.borrow().get(&n).and_then(|b| b.native.clone()))
    }

    /// 解析渲染目标的视图，`None` 为后缓冲
    fn target_views(
        &self,
        target: Option<u32>,
    ) -> (Vec<Option<ID3D11RenderTargetView>>, Option<ID3D11DepthStencilView>) {
        let Some(name) = target else {
            return (vec![Some(self.backbuffer.rtv.clone())], Some(self.backbuffer.dsv.clone()));
        };
        let framebuffers = self.framebuffers.borrow();
        let textures = self.textures.borrow();
        let Some(record) = framebuffers.get(&name) else {
            return (Vec::new(), None);
        };
        let colors = (0..record.draw_count)
            .map(|i| record.color(i).and_then(|t| textures.get(&t)).and_then(|t| t.rtv.clone()))
            .collect();
        let depth = record.depth.and_then(|t| textures.get(&t)).and_then(|t| t.dsv.clone());
        (colors, depth)
    }

    /// 区域拷贝的源 / 目标资源：帧缓冲的 0 号颜色附件或后缓冲
    fn color_resource(&self, target: Option<u32>) -> Option<ID3D11Resource> {
        match target {
            None => Some(self.backbuffer.color.clone()),
            Some(name) => {
                let texture = self.framebuffers.borrow().get(&name)?.color(0)?;
                self.textures.borrow().get(&texture)?.resource.clone()
            }
        }
    }

    /// 状态对象只在影子状态变化后重建
    fn flush_state(&self) {
        let mut state = self.state.borrow_mut();
        if !state.dirty {
            return;
        }
        unsafe {
            let mut depth_stencil = None;
            let mut blend = None;
            let mut rasterizer = None;
            let created = self
                .device
                .CreateDepthStencilState(&state.depth_stencil_desc(), Some(&mut depth_stencil))
                .and_then(|_| self.device.CreateBlendState(&state.blend_desc(), Some(&mut blend)))
                .and_then(|_| {
                    self.device
                        .CreateRasterizerState(&state.rasterizer_desc(), Some(&mut rasterizer))
                });
            if let Err(e) = created {
                crate::gal_error!(error = ?e, "Failed to create D3D11 state objects");
                return;
            }
            self.context
                .OMSetDepthStencilState(depth_stencil.as_ref(), state.stencil_ref);
            self.context
                .OMSetBlendState(blend.as_ref(), Some(&state.blend_state.constant_color), u32::MAX);
            self.context.RSSetState(rasterizer.as_ref());
        }
        state.dirty = false;
    }

    /// 提交脏的 `$Globals` 影子副本
    fn flush_globals(&self) {
        let Some(program) = self.current_program.get() else {
            return;
        };
        let mut programs = self.programs.borrow_mut();
        let Some(record) = programs.get_mut(&program) else {
            return;
        };
        for globals in record.globals.iter_mut().flatten() {
            if globals.dirty {
                unsafe {
                    self.context
                        .UpdateSubresource(&globals.buffer, 0, None, globals.shadow.as_ptr() as *const c_void, 0, 0);
                }
                globals.dirty = false;
            }
        }
    }

    fn create_input_layout(
        &self,
        layout: &CompiledLayout<DXGI_FORMAT>,
        bytecode: &[u8],
    ) -> Result<ID3D11InputLayout> {
        let elements: Vec<D3D11_INPUT_ELEMENT_DESC> = layout
            .attributes
            .iter()
            .map(|attribute| {
                let step = layout
                    .bindings
                    .get(attribute.binding as usize)
                    .map_or(StepRate::PerVertex, |b| b.step);
                D3D11_INPUT_ELEMENT_DESC {
                    SemanticName: s!("TEXCOORD"),
                    SemanticIndex: attribute.location,
                    Format: attribute.format.format,
                    InputSlot: attribute.binding,
                    AlignedByteOffset: attribute.offset,
                    InputSlotClass: match step {
                        StepRate::PerVertex => D3D11_INPUT_PER_VERTEX_DATA,
                        StepRate::PerInstance => D3D11_INPUT_PER_INSTANCE_DATA,
                    },
                    InstanceDataStepRate: step.divisor(),
                }
            })
            .collect();

        let mut input_layout = None;
        unsafe {
            self.device
                .CreateInputLayout(
                    &elements,
                    bytecode.as_ptr() as *const c_void,
                    bytecode.len(),
                    Some(&mut input_layout),
                )
                .map_err(|e| resource_error("input layout", e))?;
        }
        input_layout.ok_or_else(|| GraphicsError::ResourceCreation("input layout".to_string()).into())
    }

    /// 绘制前：状态对象、输入布局、顶点缓冲与 `$Globals`
    fn prepare_draw(&self) {
        self.flush_state();

        if let (Some(assembly), Some(program)) = (self.current_assembly.get(), self.current_program.get()) {
            let cached = self
                .assemblies
                .borrow()
                .get(&assembly)
                .and_then(|a| a.input_layouts.get(&program).cloned());
            let input_layout = match cached {
                Some(layout) => Some(layout),
                None => {
                    let programs = self.programs.borrow();
                    let mut assemblies = self.assemblies.borrow_mut();
                    match (assemblies.get_mut(&assembly), programs.get(&program)) {
                        (Some(record), Some(program_record)) if !record.layout.attributes.is_empty() => {
                            match self.create_input_layout(&record.layout, &program_record.vertex_bytecode) {
                                Ok(layout) => {
                                    record.input_layouts.insert(program, layout.clone());
                                    Some(layout)
                                }
                                Err(_) => None,
                            }
                        }
                        _ => None,
                    }
                }
            };

            let assemblies = self.assemblies.borrow();
            if let Some(record) = assemblies.get(&assembly) {
                let streams = [record.vertex, record.instance];
                let count = record.layout.bindings.len().min(streams.len());
                let buffers: Vec<Option<ID3D11Buffer>> =
                    streams[..count].iter().map(|name| self.buffer_native(*name)).collect();
                let strides: Vec<u32> = (0..count).map(|i| record.layout.stride(i)).collect();
                let offsets = vec![0u32; count];
                unsafe {
                    self.context.IASetInputLayout(input_layout.as_ref());
                    self.context.IASetVertexBuffers(
                        0,
                        count as u32,
                        Some(buffers.as_ptr()),
                        Some(strides.as_ptr()),
                        Some(offsets.as_ptr()),
                    );
                }
            }
        }

        self.flush_globals();
    }

    /// 把调试层积累的消息转发到日志
    fn drain_messages(&self) {
        let Some(queue) = &self.info_queue else {
            return;
        };
        unsafe {
            for index in 0..queue.GetNumStoredMessages() {
                let mut length = 0usize;
                if queue.GetMessage(index, None, &mut length).is_err() || length == 0 {
                    continue;
                }
                // D3D11_MESSAGE 需要按指针对齐
                let mut storage = vec![0u64; length.div_ceil(8)];
                let message = storage.as_mut_ptr() as *mut D3D11_MESSAGE;
                if queue.GetMessage(index, Some(message), &mut length).is_err() {
                    continue;
                }
                let message = &*message;
                let text = std::slice::from_raw_parts(message.pDescription, message.DescriptionByteLength);
                let text = String::from_utf8_lossy(text);
                log_backend_message(BACKEND, message_severity(message.Severity), text.trim_end_matches('\0'));
            }
            queue.ClearStoredMessages();
        }
    }

    fn create_views(&self, record: &mut TextureRecord, format: &NativePixelFormat<DXGI_FORMAT>, bind: u32) -> Result<()> {
        let Some(resource) = record.resource.clone() else {
            return Ok(());
        };
        let mips = record.mips.max(1);
        let extent = record.extent;

        unsafe {
            if bind & (D3D11_BIND_SHADER_RESOURCE.0 as u32) != 0 && record.dimension != D3D_SRV_DIMENSION_UNKNOWN {
                let anonymous = match record.dimension {
                    D3D_SRV_DIMENSION_TEXTURE1D => D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture1D: D3D11_TEX1D_SRV {
                            MostDetailedMip: 0,
                            MipLevels: mips,
                        },
                    },
                    D3D_SRV_DIMENSION_TEXTURE3D => D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture3D: D3D11_TEX3D_SRV {
                            MostDetailedMip: 0,
                            MipLevels: mips,
                        },
                    },
                    D3D_SRV_DIMENSION_TEXTURE2DARRAY => D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture2DArray: D3D11_TEX2D_ARRAY_SRV {
                            MostDetailedMip: 0,
                            MipLevels: mips,
                            FirstArraySlice: 0,
                            ArraySize: extent.depth.max(1),
                        },
                    },
                    D3D_SRV_DIMENSION_TEXTURECUBE => D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                        TextureCube: D3D11_TEXCUBE_SRV {
                            MostDetailedMip: 0,
                            MipLevels: mips,
                        },
                    },
                    _ => D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture2D: D3D11_TEX2D_SRV {
                            MostDetailedMip: 0,
                            MipLevels: mips,
                        },
                    },
                };
                let desc = D3D11_SHADER_RESOURCE_VIEW_DESC {
                    Format: format.transfer,
                    ViewDimension: record.dimension,
                    Anonymous: anonymous,
                };
                self.device
                    .CreateShaderResourceView(&resource, Some(&desc), Some(&mut record.srv))
                    .map_err(|e| resource_error("shader resource view", e))?;
            }

            if bind & (D3D11_BIND_UNORDERED_ACCESS.0 as u32) != 0 {
                let (dimension, anonymous) = match record.dimension {
                    D3D_SRV_DIMENSION_TEXTURE1D => (
                        D3D11_UAV_DIMENSION_TEXTURE1D,
                        D3D11_UNORDERED_ACCESS_VIEW_DESC_0 {
                            Texture1D: D3D11_TEX1D_UAV { MipSlice: 0 },
                        },
                    ),
                    D3D_SRV_DIMENSION_TEXTURE3D => (
                        D3D11_UAV_DIMENSION_TEXTURE3D,
                        D3D11_UNORDERED_ACCESS_VIEW_DESC_0 {
                            Texture3D: D3D11_TEX3D_UAV {
                                MipSlice: 0,
                                FirstWSlice: 0,
                                WSize: extent.depth.max(1),
                            },
                        },
                    ),
                    _ => (
                        D3D11_UAV_DIMENSION_TEXTURE2D,
                        D3D11_UNORDERED_ACCESS_VIEW_DESC_0 {
                            Texture2D: D3D11_TEX2D_UAV { MipSlice: 0 },
                        },
                    ),
                };
                let desc = D3D11_UNORDERED_ACCESS_VIEW_DESC {
                    Format: format.internal,
                    ViewDimension: dimension,
                    Anonymous: anonymous,
                };
                self.device
                    .CreateUnorderedAccessView(&resource, Some(&desc), Some(&mut record.uav))
                    .map_err(|e| resource_error("unordered access view", e))?;
            }

            if bind & (D3D11_BIND_RENDER_TARGET.0 as u32) != 0 {
                self.device
                    .CreateRenderTargetView(&resource, None, Some(&mut record.rtv))
                    .map_err(|e| resource_error("render target view", e))?;
            }

            if bind & (D3D11_BIND_DEPTH_STENCIL.0 as u32) != 0 {
                let desc = D3D11_DEPTH_STENCIL_VIEW_DESC {
                    Format: format.element,
                    ViewDimension: D3D11_DSV_DIMENSION_TEXTURE2D,
                    Flags: 0,
                    Anonymous: D3D11_DEPTH_STENCIL_VIEW_DESC_0 {
                        Texture2D: D3D11_TEX2D_DSV { MipSlice: 0 },
                    },
                };
                self.device
                    .CreateDepthStencilView(&resource, Some(&desc), Some(&mut record.dsv))
                    .map_err(|e| resource_error("depth stencil view", e))?;
            }
        }
        Ok(())
    }

    fn create_globals(&self, stage: ShaderStage, reflection: &StageReflection) -> Result<Option<StageGlobals>> {
        let Some(register) = reflection.globals_register else {
            return Ok(None);
        };
        if reflection.globals_size == 0 {
            return Ok(None);
        }
        let size = round_up(reflection.globals_size as usize, 16);
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: size as u32,
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
            ..Default::default()
        };
        let mut buffer = None;
        unsafe {
            self.device
                .CreateBuffer(&desc, None, Some(&mut buffer))
                .map_err(|e| resource_error("globals buffer", e))?;
        }
        Ok(buffer.map(|buffer| StageGlobals {
            stage,
            register,
            buffer,
            shadow: vec![0; size],
            dirty: true,
        }))
    }

    /// 编译、创建并反射所有阶段
    fn link(&self, stages: &ShaderStages<'_>) -> std::result::Result<ProgramRecord, String> {
        let sources: Vec<(ShaderStage, &str)> = match *stages {
            ShaderStages::Graphics { vertex, pixel } => vec![(ShaderStage::Vertex, vertex), (ShaderStage::Pixel, pixel)],
            ShaderStages::Compute { compute } => vec![(ShaderStage::Compute, compute)],
        };

        let mut record = ProgramRecord::default();
        let mut reflections = Vec::with_capacity(sources.len());
        for (stage, source) in sources {
            let bytecode = shader::compile(stage, source)?;
            let created = unsafe {
                let ptr = bytecode.as_ptr() as *const c_void;
                match stage {
                    ShaderStage::Vertex => self.device.CreateVertexShader(ptr, bytecode.len(), None, Some(&mut record.vertex)),
                    ShaderStage::Pixel => self.device.CreatePixelShader(ptr, bytecode.len(), None, Some(&mut record.pixel)),
                    ShaderStage::Compute => {
                        self.device
                            .CreateComputeShader(ptr, bytecode.len(), None, Some(&mut record.compute))
                    }
                }
            };
            created.map_err(|e| format!("{:?} shader creation failed: {:?}", stage, e))?;

            let reflection =
                shader::reflect(stage, &bytecode).map_err(|e| format!("{:?} reflection failed: {:?}", stage, e))?;
            let globals = self.create_globals(stage, &reflection).map_err(|e| e.to_string())?;
            record.globals.push(globals);
            if stage == ShaderStage::Vertex {
                record.vertex_bytecode = bytecode;
            }
            reflections.push((stage, reflection));
        }

        let (query, uniforms) = shader::merge(&reflections);
        record.query = query;
        record.uniforms = uniforms;
        Ok(record)
    }
}

impl Backend for D3d11Device {
    type Buffer = u32;
    type Texture = u32;
    type Shader = u32;
    type InputAssembly = u32;
    type Framebuffer = u32;

    fn name(&self) -> &'static str {
        BACKEND
    }

    fn init(surface: Rc<dyn NativeSurface>, vsync: bool) -> Result<Self> {
        let hwnd = match surface.window_handle() {
            Some(RawWindowHandle::Win32(handle)) => HWND(handle.hwnd.get() as *mut c_void),
            _ => {
                return Err(
                    GraphicsError::SwapchainError("Direct3D 11 requires a Win32 window handle".to_string()).into(),
                )
            }
        };
        let (width, height) = surface.size();

        unsafe {
            #[cfg(debug_assertions)]
            let (device, context) = match create_device(D3D11_CREATE_DEVICE_BGRA_SUPPORT | D3D11_CREATE_DEVICE_DEBUG) {
                Ok(created) => created,
                Err(e) => {
                    tracing::warn!(error = %e, "D3D11 debug layer unavailable");
                    create_device(D3D11_CREATE_DEVICE_BGRA_SUPPORT)?
                }
            };
            #[cfg(not(debug_assertions))]
            let (device, context) = create_device(D3D11_CREATE_DEVICE_BGRA_SUPPORT)?;

            let device_error = |e: Error| GalError::from(GraphicsError::DeviceCreation(format!("{:?}", e)));
            let dxgi_device: IDXGIDevice = device.cast().map_err(device_error)?;
            let adapter = dxgi_device.GetAdapter().map_err(device_error)?;
            let factory: IDXGIFactory2 = adapter.GetParent().map_err(device_error)?;

            let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
                Width: width,
                Height: height,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    ..Default::default()
                },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                BufferCount: 2,
                SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
                ..Default::default()
            };
            let swap_chain = factory
                .CreateSwapChainForHwnd(&device, hwnd, &swap_chain_desc, None, None)
                .map_err(|e| GraphicsError::SwapchainError(format!("{:?}", e)))?;

            let backbuffer = create_backbuffer(&device, &swap_chain, width, height)?;
            context.OMSetRenderTargets(Some(&[Some(backbuffer.rtv.clone())]), &backbuffer.dsv);

            let info_queue = if cfg!(debug_assertions) {
                device.cast::<ID3D11InfoQueue>().ok()
            } else {
                None
            };

            tracing::info!(width, height, vsync, buffers = 2, "Direct3D 11 device created");

            Ok(Self {
                device,
                context,
                swap_chain,
                info_queue,
                surface,
                backbuffer,
                next_name: Cell::new(0),
                buffers: RefCell::new(HashMap::new()),
                textures: RefCell::new(HashMap::new()),
                programs: RefCell::new(HashMap::new()),
                assemblies: RefCell::new(HashMap::new()),
                framebuffers: RefCell::new(HashMap::new()),
                state: RefCell::new(FixedFunctionState::default()),
                current_program: Cell::new(None),
                current_assembly: Cell::new(None),
                current_target: Cell::new(None),
            })
        }
    }

    fn limits(&self) -> DeviceLimits {
        DeviceLimits {
            max_texture_size: D3D11_REQ_TEXTURE2D_U_OR_V_DIMENSION,
            max_compute_work_groups: [D3D11_CS_DISPATCH_MAX_THREAD_GROUPS_PER_DIMENSION; 3],
            max_vertex_attributes: D3D11_IA_VERTEX_INPUT_RESOURCE_SLOT_COUNT,
            max_uniform_buffer_bindings: D3D11_COMMONSHADER_CONSTANT_BUFFER_API_SLOT_COUNT,
        }
    }

    fn set_capability(&self, state: StateKind, enabled: bool) {
        self.state.borrow_mut().set_capability(state, enabled);
    }

    fn apply_depth_state(&self, func: D3D11_COMPARISON_FUNC, write_mask: bool) {
        let mut state = self.state.borrow_mut();
        state.depth_func = func;
        state.depth_write = write_mask;
        state.dirty = true;
    }

    fn apply_stencil_state(
        &self,
        front: StencilFaceOps<D3D11_COMPARISON_FUNC, D3D11_STENCIL_OP>,
        back: StencilFaceOps<D3D11_COMPARISON_FUNC, D3D11_STENCIL_OP>,
        reference: i32,
        read_mask: u32,
        write_mask: u32,
    ) {
        let mut state = self.state.borrow_mut();
        state.front = front;
        state.back = back;
        state.stencil_ref = reference.max(0) as u32;
        state.stencil_read_mask = read_mask as u8;
        state.stencil_write_mask = write_mask as u8;
        state.dirty = true;
    }

    fn apply_blend_state(&self, blend: NativeBlend<D3D11_BLEND, D3D11_BLEND_OP>) {
        let mut state = self.state.borrow_mut();
        state.blend_state = blend;
        state.dirty = true;
    }

    fn apply_cull_state(&self, mode: D3D11_CULL_MODE, front_face: bool) {
        let mut state = self.state.borrow_mut();
        state.cull_mode = mode;
        state.front_ccw = front_face;
        state.dirty = true;
    }

    fn set_viewport(&self, rect: Rect) {
        let viewport = D3D11_VIEWPORT {
            TopLeftX: rect.x as f32,
            TopLeftY: rect.y as f32,
            Width: rect.width as f32,
            Height: rect.height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe { self.context.RSSetViewports(Some(&[viewport])) }
    }

    fn set_scissor_rect(&self, rect: Rect) {
        let scissor = RECT {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width,
            bottom: rect.y + rect.height,
        };
        unsafe { self.context.RSSetScissorRects(Some(&[scissor])) }
    }

    fn bind_target(&self, target: Option<&u32>) {
        let target = target.copied();
        self.current_target.set(target);
        let (colors, depth) = self.target_views(target);
        unsafe {
            self.context.OMSetRenderTargets(Some(colors.as_slice()), depth.as_ref());
        }
    }

    fn clear(&self, target: Option<&u32>, mask: ClearFlags, color: [f32; 4], depth: f32, stencil: i32) {
        let (colors, depth_view) = self.target_views(target.copied());
        unsafe {
            if mask.contains(ClearFlags::COLOR) {
                for view in colors.iter().flatten() {
                    self.context.ClearRenderTargetView(view, &color);
                }
            }
            let mut flags = 0u32;
            if mask.contains(ClearFlags::DEPTH) {
                flags |= D3D11_CLEAR_DEPTH.0 as u32;
            }
            if mask.contains(ClearFlags::STENCIL) {
                flags |= D3D11_CLEAR_STENCIL.0 as u32;
            }
            if let (Some(view), true) = (depth_view, flags != 0) {
                self.context.ClearDepthStencilView(&view, flags, depth, stencil as u8);
            }
        }
    }

    fn create_buffer(&self) -> Result<u32> {
        let name = self.allocate_name();
        self.buffers.borrow_mut().insert(name, BufferRecord::new());
        Ok(name)
    }

    fn buffer_storage(
        &self,
        buffer: &u32,
        target: D3D11_BIND_FLAG,
        usage: D3D11_USAGE,
        size: usize,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let mut buffers = self.buffers.borrow_mut();
        let Some(record) = buffers.get_mut(buffer) else {
            crate::gal_fail!("buffer {} does not exist", buffer);
        };

        let storage = target == D3D11_BIND_UNORDERED_ACCESS;
        let aligned = match target {
            D3D11_BIND_CONSTANT_BUFFER => round_up(size, 16),
            D3D11_BIND_UNORDERED_ACCESS => round_up(size, 4),
            _ => size,
        };
        let usage = if storage { D3D11_USAGE_DEFAULT } else { usage };

        record.bind = target;
        record.usage = usage;
        record.native = None;
        record.uav = None;
        record.srv = None;
        record.shadow = vec![0; aligned];
        if let Some(bytes) = data {
            let n = bytes.len().min(size);
            record.shadow[..n].copy_from_slice(&bytes[..n]);
        }
        if aligned == 0 {
            return Ok(());
        }

        let (bind, misc) = if storage {
            (
                (D3D11_BIND_UNORDERED_ACCESS.0 | D3D11_BIND_SHADER_RESOURCE.0) as u32,
                D3D11_RESOURCE_MISC_BUFFER_ALLOW_RAW_VIEWS.0 as u32,
            )
        } else {
            (target.0 as u32, 0)
        };
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: aligned as u32,
            Usage: usage,
            BindFlags: bind,
            CPUAccessFlags: if usage == D3D11_USAGE_DYNAMIC {
                D3D11_CPU_ACCESS_WRITE.0 as u32
            } else {
                0
            },
            MiscFlags: misc,
            StructureByteStride: 0,
        };
        let initial = D3D11_SUBRESOURCE_DATA {
            pSysMem: record.shadow.as_ptr() as *const c_void,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        };

        unsafe {
            self.device
                .CreateBuffer(&desc, Some(&initial), Some(&mut record.native))
                .map_err(|e| resource_error("buffer", e))?;

            if let (true, Some(native)) = (storage, record.native.clone()) {
                let elements = (aligned / 4) as u32;
                let uav_desc = D3D11_UNORDERED_ACCESS_VIEW_DESC {
                    Format: DXGI_FORMAT_R32_TYPELESS,
                    ViewDimension: D3D11_UAV_DIMENSION_BUFFER,
                    Anonymous: D3D11_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Buffer: D3D11_BUFFER_UAV {
                            FirstElement: 0,
                            NumElements: elements,
                            Flags: D3D11_BUFFER_UAV_FLAG_RAW.0 as u32,
                        },
                    },
                };
                self.device
                    .CreateUnorderedAccessView(&native, Some(&uav_desc), Some(&mut record.uav))
                    .map_err(|e| resource_error("buffer unordered access view", e))?;

                let srv_desc = D3D11_SHADER_RESOURCE_VIEW_DESC {
                    Format: DXGI_FORMAT_R32_TYPELESS,
                    ViewDimension: D3D_SRV_DIMENSION_BUFFEREX,
                    Anonymous: D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                        BufferEx: D3D11_BUFFEREX_SRV {
                            FirstElement: 0,
                            NumElements: elements,
                            Flags: D3D11_BUFFEREX_SRV_FLAG_RAW.0 as u32,
                        },
                    },
                };
                self.device
                    .CreateShaderResourceView(&native, Some(&srv_desc), Some(&mut record.srv))
                    .map_err(|e| resource_error("buffer shader resource view", e))?;
            }
        }
        Ok(())
    }

    fn buffer_sub_data(&self, buffer: &u32, _target: D3D11_BIND_FLAG, offset: usize, data: &[u8]) {
        let mut buffers = self.buffers.borrow_mut();
        let Some(record) = buffers.get_mut(buffer) else {
            return;
        };
        let Some(window) = record.shadow.get_mut(offset..offset + data.len()) else {
            crate::gal_warn!(offset, len = data.len(), "D3D11 buffer write outside storage ignored");
            return;
        };
        window.copy_from_slice(data);
        let Some(native) = &record.native else {
            return;
        };

        unsafe {
            if record.usage == D3D11_USAGE_DYNAMIC {
                let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
                if let Err(e) = self.context.Map(native, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped)) {
                    crate::gal_error!(error = ?e, "Failed to map D3D11 buffer");
                    return;
                }
                std::ptr::copy_nonoverlapping(record.shadow.as_ptr(), mapped.pData as *mut u8, record.shadow.len());
                self.context.Unmap(native, 0);
            } else if record.bind == D3D11_BIND_CONSTANT_BUFFER {
                // 常量缓冲不支持局部更新
                self.context
                    .UpdateSubresource(native, 0, None, record.shadow.as_ptr() as *const c_void, 0, 0);
            } else {
                let region = D3D11_BOX {
                    left: offset as u32,
                    top: 0,
                    front: 0,
                    right: (offset + data.len()) as u32,
                    bottom: 1,
                    back: 1,
                };
                self.context
                    .UpdateSubresource(native, 0, Some(&region), data.as_ptr() as *const c_void, 0, 0);
            }
        }
    }

    fn destroy_buffer(&self, buffer: &u32) {
        self.buffers.borrow_mut().remove(buffer);
    }

    fn create_texture(&self, target: D3D_SRV_DIMENSION, ty: TextureType) -> Result<u32> {
        let name = self.allocate_name();
        self.textures.borrow_mut().insert(name, TextureRecord::new(ty, target));
        Ok(name)
    }

    fn texture_parameters(
        &self,
        texture: &u32,
        _target: D3D_SRV_DIMENSION,
        sampling: NativeSampling<D3D11_FILTER, D3D11_TEXTURE_ADDRESS_MODE, D3D11_COMPARISON_FUNC>,
        mips: u32,
    ) {
        let mut textures = self.textures.borrow_mut();
        let Some(record) = textures.get_mut(texture) else {
            return;
        };
        let desc = D3D11_SAMPLER_DESC {
            Filter: sampling.filter,
            AddressU: sampling.wrap,
            AddressV: sampling.wrap,
            AddressW: sampling.wrap,
            MipLODBias: 0.0,
            MaxAnisotropy: 1,
            ComparisonFunc: sampling.compare.unwrap_or(D3D11_COMPARISON_NEVER),
            BorderColor: sampling.border_color,
            MinLOD: 0.0,
            MaxLOD: if mips <= 1 { 0.0 } else { D3D11_FLOAT32_MAX },
        };
        record.sampler = None;
        if let Err(e) = unsafe { self.device.CreateSamplerState(&desc, Some(&mut record.sampler)) } {
            crate::gal_error!(error = ?e, "Failed to create D3D11 sampler");
        }
    }

    fn allocate_texture(
        &self,
        texture: &u32,
        target: D3D_SRV_DIMENSION,
        format: &NativePixelFormat<DXGI_FORMAT>,
        extent: Extent3d,
        mips: u32,
    ) -> Result<()> {
        let mut textures = self.textures.borrow_mut();
        let Some(record) = textures.get_mut(texture) else {
            crate::gal_fail!("texture {} does not exist", texture);
        };
        record.release_storage();
        record.dimension = target;
        record.extent = extent;
        record.mips = mips.max(1);

        let (bind, misc) = texture_bind_flags(record.ty, target, format, record.mips);
        let resource_format = if record.ty.is_render_target() {
            format.element
        } else {
            format.internal
        };
        let sample = DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        };

        unsafe {
            let resource: Option<ID3D11Resource> = match target {
                D3D_SRV_DIMENSION_TEXTURE1D => {
                    let desc = D3D11_TEXTURE1D_DESC {
                        Width: extent.width,
                        MipLevels: record.mips,
                        ArraySize: 1,
                        Format: resource_format,
                        Usage: D3D11_USAGE_DEFAULT,
                        BindFlags: bind,
                        CPUAccessFlags: 0,
                        MiscFlags: misc,
                    };
                    let mut created = None;
                    self.device
                        .CreateTexture1D(&desc, None, Some(&mut created))
                        .map_err(|e| resource_error("texture", e))?;
                    created.and_then(|t| t.cast().ok())
                }
                D3D_SRV_DIMENSION_TEXTURE3D => {
                    let desc = D3D11_TEXTURE3D_DESC {
                        Width: extent.width,
                        Height: extent.height,
                        Depth: extent.depth.max(1),
                        MipLevels: record.mips,
                        Format: resource_format,
                        Usage: D3D11_USAGE_DEFAULT,
                        BindFlags: bind,
                        CPUAccessFlags: 0,
                        MiscFlags: misc,
                    };
                    let mut created = None;
                    self.device
                        .CreateTexture3D(&desc, None, Some(&mut created))
                        .map_err(|e| resource_error("texture", e))?;
                    created.and_then(|t| t.cast().ok())
                }
                _ => {
                    let array_size = match target {
                        D3D_SRV_DIMENSION_TEXTURECUBE => 6,
                        D3D_SRV_DIMENSION_TEXTURE2DARRAY => extent.depth.max(1),
                        _ => 1,
                    };
                    let desc = D3D11_TEXTURE2D_DESC {
                        Width: extent.width,
                        Height: extent.height,
                        MipLevels: record.mips,
                        ArraySize: array_size,
                        Format: resource_format,
                        SampleDesc: sample,
                        Usage: D3D11_USAGE_DEFAULT,
                        BindFlags: bind,
                        CPUAccessFlags: 0,
                        MiscFlags: misc,
                    };
                    let mut created = None;
                    self.device
                        .CreateTexture2D(&desc, None, Some(&mut created))
                        .map_err(|e| resource_error("texture", e))?;
                    created.and_then(|t| t.cast().ok())
                }
            };
            record.resource = resource;
        }

        record.can_generate_mips = misc & (D3D11_RESOURCE_MISC_GENERATE_MIPS.0 as u32) != 0;
        self.create_views(record, format, bind)
    }

    fn transfer_pixels(
        &self,
        texture: &u32,
        _target: D3D_SRV_DIMENSION,
        format: &NativePixelFormat<DXGI_FORMAT>,
        extent: Extent3d,
        alignment: u32,
        layer: u32,
        data: &[u8],
    ) {
        let textures = self.textures.borrow();
        let Some(record) = textures.get(texture) else {
            return;
        };
        let Some(resource) = &record.resource else {
            return;
        };

        let width = extent.width as usize;
        let rows = (extent.height.max(1) * extent.depth.max(1)) as usize;
        let bpp = format.bytes_per_pixel as usize;
        let src_pitch = round_up(width * bpp, alignment as usize);

        let (pixels, pitch) = if expands_to_rgba(format) {
            let component = bpp / 3;
            let alpha: &[u8] = if component == 2 { &[0x00, 0x3c] } else { &[0xff] };
            let expanded = expand_rows(data, width, rows, src_pitch, component, alpha);
            (expanded, width * (bpp + component))
        } else {
            (data.to_vec(), src_pitch)
        };

        let slice_pitch = pitch * extent.height.max(1) as usize;
        unsafe {
            if record.dimension == D3D_SRV_DIMENSION_TEXTURE2DARRAY {
                for (slice, bytes) in pixels.chunks(slice_pitch).enumerate() {
                    let subresource = slice as u32 * record.mips;
                    self.context.UpdateSubresource(
                        resource,
                        subresource,
                        None,
                        bytes.as_ptr() as *const c_void,
                        pitch as u32,
                        slice_pitch as u32,
                    );
                }
            } else {
                self.context.UpdateSubresource(
                    resource,
                    layer * record.mips,
                    None,
                    pixels.as_ptr() as *const c_void,
                    pitch as u32,
                    slice_pitch as u32,
                );
            }
        }
    }

    fn generate_mipmaps(&self, texture: &u32, _target: D3D_SRV_DIMENSION) {
        let textures = self.textures.borrow();
        let Some(record) = textures.get(texture) else {
            return;
        };
        match (&record.srv, record.can_generate_mips) {
            (Some(srv), true) => unsafe { self.context.GenerateMips(srv) },
            _ => crate::gal_warn!(texture, "D3D11 texture format cannot generate mipmaps"),
        }
    }

    fn destroy_texture(&self, texture: &u32) {
        self.textures.borrow_mut().remove(texture);
    }

    fn create_shader(&self) -> Result<u32> {
        let name = self.allocate_name();
        self.programs.borrow_mut().insert(name, ProgramRecord::default());
        Ok(name)
    }

    fn build_program(&self, shader: &u32, stages: &ShaderStages<'_>) -> LinkReport {
        match self.link(stages) {
            Ok(record) => {
                for assembly in self.assemblies.borrow_mut().values_mut() {
                    assembly.input_layouts.remove(shader);
                }
                self.programs.borrow_mut().insert(*shader, record);
                LinkReport::success()
            }
            Err(log) => {
                log_backend_message(BACKEND, DebugSeverity::Error, &log);
                LinkReport::failure(log)
            }
        }
    }

    fn reflect(&self, shader: &u32) -> ShaderQueryDesc {
        self.programs
            .borrow()
            .get(shader)
            .map(|p| p.query.clone())
            .unwrap_or_default()
    }

    fn use_shader(&self, shader: &u32) {
        self.current_program.set(Some(*shader));
        let programs = self.programs.borrow();
        let Some(record) = programs.get(shader) else {
            return;
        };
        unsafe {
            self.context.VSSetShader(record.vertex.as_ref(), None);
            self.context.PSSetShader(record.pixel.as_ref(), None);
            self.context.CSSetShader(record.compute.as_ref(), None);
            for globals in record.globals.iter().flatten() {
                let buffers = [Some(globals.buffer.clone())];
                match globals.stage {
                    ShaderStage::Vertex => self.context.VSSetConstantBuffers(globals.register, Some(&buffers)),
                    ShaderStage::Pixel => self.context.PSSetConstantBuffers(globals.register, Some(&buffers)),
                    ShaderStage::Compute => self.context.CSSetConstantBuffers(globals.register, Some(&buffers)),
                }
            }
        }
    }

    fn bind_uniform_buffer(
        &self,
        _shader: &u32,
        stage: ShaderStage,
        buffer: &u32,
        target: D3D11_BIND_FLAG,
        bind_point: u32,
    ) {
        let buffers = self.buffers.borrow();
        let Some(record) = buffers.get(buffer) else {
            return;
        };
        unsafe {
            if target == D3D11_BIND_UNORDERED_ACCESS {
                match stage {
                    ShaderStage::Compute => {
                        self.context
                            .CSSetUnorderedAccessViews(bind_point, 1, Some(&record.uav), None)
                    }
                    ShaderStage::Vertex => self.context.VSSetShaderResources(bind_point, Some(&[record.srv.clone()])),
                    ShaderStage::Pixel => self.context.PSSetShaderResources(bind_point, Some(&[record.srv.clone()])),
                }
            } else {
                let native = [record.native.clone()];
                match stage {
                    ShaderStage::Vertex => self.context.VSSetConstantBuffers(bind_point, Some(&native)),
                    ShaderStage::Pixel => self.context.PSSetConstantBuffers(bind_point, Some(&native)),
                    ShaderStage::Compute => self.context.CSSetConstantBuffers(bind_point, Some(&native)),
                }
            }
        }
    }

    fn upload_uniform(&self, shader: &u32, location: i32, ty: UniformType, count: u32, data: &[u8]) {
        let mut programs = self.programs.borrow_mut();
        let Some(record) = programs.get_mut(shader) else {
            return;
        };
        let Some(slot) = usize::try_from(location).ok().and_then(|l| record.uniforms.get(l)) else {
            crate::gal_warn!(location, "D3D11 uniform location out of range");
            return;
        };
        if slot.opaque {
            return;
        }
        for &(stage, offset) in &slot.offsets {
            if let Some(Some(globals)) = record.globals.get_mut(stage) {
                if !pack_constants(&mut globals.shadow, offset as usize, ty, count, data) {
                    crate::gal_warn!(location, "D3D11 uniform upload truncated");
                }
                globals.dirty = true;
            }
        }
    }

    fn destroy_shader(&self, shader: &u32) {
        self.programs.borrow_mut().remove(shader);
        for assembly in self.assemblies.borrow_mut().values_mut() {
            assembly.input_layouts.remove(shader);
        }
        if self.current_program.get() == Some(*shader) {
            self.current_program.set(None);
        }
    }

    fn bind_texture(&self, unit: u32, _target: D3D_SRV_DIMENSION, texture: &u32) {
        let textures = self.textures.borrow();
        let Some(record) = textures.get(texture) else {
            return;
        };
        // 采样器寄存器只有 16 个，立方体贴图单元挤在末尾
        let textures_max = TEXTURES_MAX as u32;
        let sampler_slot = if unit < textures_max {
            unit
        } else {
            unit - textures_max + CUBEMAP_SAMPLER_BASE
        };
        let views = [record.srv.clone()];
        let samplers = [record.sampler.clone()];
        unsafe {
            self.context.VSSetShaderResources(unit, Some(&views));
            self.context.PSSetShaderResources(unit, Some(&views));
            self.context.CSSetShaderResources(unit, Some(&views));
            self.context.VSSetSamplers(sampler_slot, Some(&samplers));
            self.context.PSSetSamplers(sampler_slot, Some(&samplers));
            self.context.CSSetSamplers(sampler_slot, Some(&samplers));
        }
    }

    fn bind_image(&self, unit: u32, texture: &u32, _format: DXGI_FORMAT, _access: ImageAccess) {
        let textures = self.textures.borrow();
        let Some(record) = textures.get(texture) else {
            return;
        };
        if record.uav.is_none() {
            crate::gal_warn!(texture, "D3D11 texture has no unordered access view");
        }
        unsafe {
            self.context
                .CSSetUnorderedAccessViews(unit, 1, Some(&record.uav), None);
        }
    }

    fn create_input_assembly(&self) -> Result<u32> {
        let name = self.allocate_name();
        self.assemblies.borrow_mut().insert(name, AssemblyRecord::new());
        Ok(name)
    }

    fn configure_input_assembly(
        &self,
        assembly: &u32,
        layout: &CompiledLayout<DXGI_FORMAT>,
        streams: InputStreams<'_, Self>,
    ) {
        let mut assemblies = self.assemblies.borrow_mut();
        let Some(record) = assemblies.get_mut(assembly) else {
            return;
        };
        record.layout = layout.clone();
        record.vertex = Some(*streams.vertex);
        record.instance = streams.instance.copied();
        record.index = streams.index.copied();
        record.input_layouts.clear();
    }

    fn bind_input_assembly(&self, assembly: &u32) {
        self.current_assembly.set(Some(*assembly));
    }

    fn destroy_input_assembly(&self, assembly: &u32) {
        self.assemblies.borrow_mut().remove(assembly);
        if self.current_assembly.get() == Some(*assembly) {
            self.current_assembly.set(None);
        }
    }

    fn draw(&self, mode: D3D_PRIMITIVE_TOPOLOGY, first: u32, count: u32, instances: u32) {
        self.prepare_draw();
        unsafe {
            self.context.IASetPrimitiveTopology(mode);
            if instances == 1 {
                self.context.Draw(count, first);
            } else {
                self.context.DrawInstanced(count, instances, first, 0);
            }
        }
    }

    fn draw_indexed(
        &self,
        mode: D3D_PRIMITIVE_TOPOLOGY,
        format: DXGI_FORMAT,
        _index_size: u32,
        first: u32,
        count: u32,
        instances: u32,
    ) {
        self.prepare_draw();
        let index = self
            .current_assembly
            .get()
            .and_then(|a| self.assemblies.borrow().get(&a).and_then(|r| r.index));
        let index = self.buffer_native(index);
        unsafe {
            self.context.IASetIndexBuffer(index.as_ref(), format, 0);
            self.context.IASetPrimitiveTopology(mode);
            if instances == 1 {
                self.context.DrawIndexed(count, first, 0);
            } else {
                self.context.DrawIndexedInstanced(count, instances, first, 0, 0);
            }
        }
    }

    fn dispatch(&self, x: u32, y: u32, z: u32) {
        self.flush_globals();
        unsafe { self.context.Dispatch(x, y, z) }
    }

    fn memory_barrier(&self, mask: BarrierFlags) {
        if mask.is_empty() {
            return;
        }
        // 解绑计算阶段的 UAV，后续读取才能看到写入
        let empty: [Option<ID3D11UnorderedAccessView>; CS_UAV_SLOTS] = Default::default();
        unsafe {
            self.context
                .CSSetUnorderedAccessViews(0, CS_UAV_SLOTS as u32, Some(empty.as_ptr()), None);
        }
    }

    fn present(&self, vsync: bool) -> Result<()> {
        let result = unsafe { self.swap_chain.Present(u32::from(vsync), DXGI_PRESENT(0)).ok() };
        self.drain_messages();
        result.map_err(|e| GraphicsError::SwapchainError(format!("Present failed: {:?}", e)))?;

        // 翻转模型呈现后解除后缓冲绑定
        if self.current_target.get().is_none() {
            self.bind_target(None);
        }
        Ok(())
    }

    fn create_framebuffer(&self) -> Result<u32> {
        let name = self.allocate_name();
        self.framebuffers.borrow_mut().insert(name, FramebufferRecord::default());
        Ok(name)
    }

    fn attach_color(&self, framebuffer: &u32, index: u32, texture: &u32, _target: D3D_SRV_DIMENSION) {
        let mut framebuffers = self.framebuffers.borrow_mut();
        let Some(record) = framebuffers.get_mut(framebuffer) else {
            return;
        };
        record.colors.retain(|(i, _)| *i != index);
        record.colors.push((index, *texture));
    }

    fn attach_depth_stencil(
        &self,
        framebuffer: &u32,
        texture: &u32,
        _target: D3D_SRV_DIMENSION,
        _point: DepthAttachmentPoint,
    ) {
        if let Some(record) = self.framebuffers.borrow_mut().get_mut(framebuffer) {
            record.depth = Some(*texture);
        }
    }

    fn set_draw_buffers(&self, framebuffer: &u32, count: u32) {
        if let Some(record) = self.framebuffers.borrow_mut().get_mut(framebuffer) {
            record.draw_count = count;
        }
    }

    fn framebuffer_complete(&self, framebuffer: &u32) -> bool {
        let framebuffers = self.framebuffers.borrow();
        let textures = self.textures.borrow();
        let Some(record) = framebuffers.get(framebuffer) else {
            return false;
        };
        let colors_ok = record
            .colors
            .iter()
            .all(|(_, t)| textures.get(t).is_some_and(|t| t.rtv.is_some()));
        let depth_ok = record
            .depth
            .map_or(true, |t| textures.get(&t).is_some_and(|t| t.dsv.is_some()));
        (!record.colors.is_empty() || record.depth.is_some()) && colors_ok && depth_ok
    }

    fn blit(&self, src: Option<&u32>, dst: Option<&u32>, region: BlitRegion, mask: ClearFlags) {
        if mask.intersects(ClearFlags::DEPTH | ClearFlags::STENCIL) {
            crate::gal_warn!("D3D11 depth / stencil blits are not supported");
        }
        if !mask.contains(ClearFlags::COLOR) {
            return;
        }
        let (s, d) = (region.src, region.dst);
        if s.width != d.width || s.height != d.height {
            crate::gal_warn!(?s, ?d, "D3D11 blits cannot scale, copy skipped");
            return;
        }
        let (Some(source), Some(destination)) = (self.color_resource(src.copied()), self.color_resource(dst.copied()))
        else {
            crate::gal_warn!("D3D11 blit without color attachment");
            return;
        };
        let source_box = D3D11_BOX {
            left: s.x.max(0) as u32,
            top: s.y.max(0) as u32,
            front: 0,
            right: (s.x + s.width).max(0) as u32,
            bottom: (s.y + s.height).max(0) as u32,
            back: 1,
        };
        unsafe {
            self.context.CopySubresourceRegion(
                &destination,
                0,
                d.x.max(0) as u32,
                d.y.max(0) as u32,
                0,
                &source,
                0,
                Some(&source_box),
            );
        }
    }

    fn destroy_framebuffer(&self, framebuffer: &u32) {
        self.framebuffers.borrow_mut().remove(framebuffer);
        if self.current_target.get() == Some(*framebuffer) {
            self.current_target.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::types::TextureFormat;
    use crate::renderer::translate::Translate;

    #[test]
    fn test_render_target_types_bind_depth_only() {
        let format = D3d11Device::translate_format(TextureFormat::Depth24Stencil8);
        let (bind, misc) = texture_bind_flags(TextureType::DepthStencilTarget, D3D_SRV_DIMENSION_UNKNOWN, &format, 1);
        assert_eq!(bind, D3D11_BIND_DEPTH_STENCIL.0 as u32);
        assert_eq!(misc, 0);
    }

    #[test]
    fn test_mipmapped_color_texture_can_generate_mips() {
        let format = D3d11Device::translate_format(TextureFormat::Rgba8);
        let (bind, misc) = texture_bind_flags(TextureType::Texture2D, D3D_SRV_DIMENSION_TEXTURE2D, &format, 4);
        assert_ne!(bind & D3D11_BIND_RENDER_TARGET.0 as u32, 0);
        assert_ne!(misc & D3D11_RESOURCE_MISC_GENERATE_MIPS.0 as u32, 0);

        let cube = texture_bind_flags(TextureType::Texture2D, D3D_SRV_DIMENSION_TEXTURECUBE, &format, 1);
        assert_ne!(cube.1 & D3D11_RESOURCE_MISC_TEXTURECUBE.0 as u32, 0);
    }

    #[test]
    fn test_image_types_bind_unordered_access() {
        let format = D3d11Device::translate_format(TextureFormat::Rgba32F);
        let (bind, _) = texture_bind_flags(TextureType::Image2D, D3D_SRV_DIMENSION_TEXTURE2D, &format, 1);
        assert_ne!(bind & D3D11_BIND_UNORDERED_ACCESS.0 as u32, 0);
    }
}
