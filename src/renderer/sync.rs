//! GPU 内存屏障
//!
//! 计算通道写入的图像 / 缓冲区，在被后续绘制或调度读取之前，
//! 必须由调用方通过 `Context::memory_barrier` 显式插入屏障。
//! 抽象层不推断、也不校验需要哪些屏障。
//!
//! # 使用场景
//!
//! ```text
//! dispatch(写 image)  ->  memory_barrier(SHADER_IMAGE_ACCESS | TEXTURE_FETCH)  ->  draw(采样同一纹理)
//! ```

use bitflags::bitflags;

bitflags! {
    /// 屏障作用的访问类别
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BarrierFlags: u32 {
        /// 作为顶点属性读取
        const VERTEX_ATTRIB_ARRAY = 1 << 0;
        /// 作为索引读取
        const ELEMENT_ARRAY = 1 << 1;
        /// 作为 uniform 缓冲读取
        const UNIFORM = 1 << 2;
        /// 通过采样器读取
        const TEXTURE_FETCH = 1 << 3;
        /// image load/store
        const SHADER_IMAGE_ACCESS = 1 << 4;
        /// 纹理上传 / 回读
        const TEXTURE_UPDATE = 1 << 5;
        /// 缓冲上传 / 回读
        const BUFFER_UPDATE = 1 << 6;
        /// 作为帧缓冲附件
        const FRAMEBUFFER = 1 << 7;
        /// 存储缓冲读写
        const SHADER_STORAGE = 1 << 8;
    }
}

impl BarrierFlags {
    /// 计算写入图像后被采样读取所需的屏障
    pub fn image_to_sampler() -> Self {
        BarrierFlags::SHADER_IMAGE_ACCESS | BarrierFlags::TEXTURE_FETCH
    }

    /// 计算写入存储缓冲后被当作顶点数据读取所需的屏障
    pub fn storage_to_vertex() -> Self {
        BarrierFlags::SHADER_STORAGE | BarrierFlags::VERTEX_ATTRIB_ARRAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(BarrierFlags::image_to_sampler().contains(BarrierFlags::TEXTURE_FETCH));
        assert!(BarrierFlags::storage_to_vertex().contains(BarrierFlags::SHADER_STORAGE));
        assert!(!BarrierFlags::image_to_sampler().contains(BarrierFlags::FRAMEBUFFER));
    }
}
