//! 原生表面接口
//!
//! 窗口系统是外部协作方：它创建窗口、处理尺寸变化和输入事件。
//! 图形抽象层只需要表面的尺寸、原生窗口句柄，以及 GL 系后端所需的
//! 函数加载和缓冲交换能力，这些都通过 `NativeSurface` 暴露。

use std::ffi::c_void;

use raw_window_handle::RawWindowHandle;

/// 窗口系统提供给后端的原生表面
///
/// 所有方法都在拥有图形上下文的线程上调用。
///
/// # 设计理念
///
/// - **最小接口**：只暴露后端创建设备和呈现所需的能力
/// - **默认实现**：离屏表面只需提供尺寸
pub trait NativeSurface {
    /// 表面尺寸（像素）
    fn size(&self) -> (u32, u32);

    /// 原生窗口句柄
    ///
    /// 对象模型后端（Direct3D 11）用它创建交换链；离屏表面返回 `None`。
    fn window_handle(&self) -> Option<RawWindowHandle> {
        None
    }

    /// 查询 GL 函数地址
    ///
    /// # 参数
    ///
    /// * `name` - 函数名，例如 `glDrawArrays`
    ///
    /// # 返回值
    ///
    /// 函数指针，不可用时为空指针
    fn get_proc_address(&self, _name: &str) -> *const c_void {
        std::ptr::null()
    }

    /// 交换前后缓冲（GL 系后端），开启垂直同步时可能阻塞
    fn swap_buffers(&self) {}

    /// 设置交换间隔，0 关闭垂直同步
    fn set_swap_interval(&self, _interval: i32) {}
}

/// 只有尺寸的离屏表面
///
/// 用于无头后端和不需要呈现的场景。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenSurface {
    width: u32,
    height: u32,
}

impl OffscreenSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl NativeSurface for OffscreenSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offscreen_defaults() {
        let surface = OffscreenSurface::new(320, 240);
        assert_eq!(surface.size(), (320, 240));
        assert!(surface.window_handle().is_none());
        assert!(surface.get_proc_address("glClear").is_null());
    }
}
