//! 驱动错误类型
//!
//! SDIO 传输层沿用负 errno（`Result<_, i32>`），进入协议引擎后统一转换为 [`CoreError`]。

use axerrno::AxError;

/// 负 errno 常量（与 Linux errno 数值一致）
pub mod errno {
    pub const EIO: i32 = -5;
    pub const ENOMEM: i32 = -12;
    pub const EBUSY: i32 = -16;
    pub const ENODEV: i32 = -19;
    pub const EINVAL: i32 = -22;
    pub const E2BIG: i32 = -7;
    pub const ENOSYS: i32 = -38;
    pub const ENODATA: i32 = -61;
    pub const EBADMSG: i32 = -74;
    pub const EPROTO: i32 = -71;
    pub const ETIMEDOUT: i32 = -110;
}

/// 有界轮询的等待点，超时时随 [`CoreError::Timeout`] 上报
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPoint {
    /// 写端口位图一直没有空闲端口
    WritePort,
    /// 固件下载：CARD_IO_READY | DN_LD_CARD_RDY 未置位，或下一块长度一直为 0
    FwChunkReady,
    /// 固件下载完成后 FW_STATUS 未出现 0xFEDC
    FwReady,
}

/// 固件下载失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwFailure {
    /// 芯片请求奇数长度块，表示上一块 CRC 校验失败
    OddChunk(u16),
    /// 注册表中找不到固件镜像
    ImageMissing,
    /// 固件镜像为空
    EmptyImage,
}

/// 协议引擎错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// 总线传输失败（携带 SdioOps 返回的负 errno）
    Io(i32),
    /// 读取控制端口基址失败
    UnknownIoPort,
    /// 写主机中断屏蔽寄存器失败
    IntMaskFailed,
    /// 读寄存器块或清中断状态失败
    IntStatusFailed,
    /// 从数据端口读包失败
    InvalidRxBuffer,
    /// 数据帧发送失败
    SendDataFailed,
    /// 命令响应 result 非 0
    InvalidCmdResponse { cmd: u16, result: u8 },
    /// TLV 链长度越界
    MalformedTlv,
    /// 帧头/帧体长度不足
    MalformedFrame,
    FirmwareFailed(FwFailure),
    Timeout(WaitPoint),
    /// 共享发送缓冲正被占用（重入编码）
    Busy,
    /// 命令参数超过发送缓冲
    PayloadTooLarge,
    InvalidState,
    InvalidParam,
}

impl CoreError {
    /// 对应的负 errno，用于日志及 i32 风格接口
    pub fn errno(self) -> i32 {
        match self {
            CoreError::Io(e) if e < 0 => e,
            CoreError::Io(_)
            | CoreError::IntMaskFailed
            | CoreError::IntStatusFailed
            | CoreError::InvalidRxBuffer
            | CoreError::SendDataFailed => errno::EIO,
            CoreError::UnknownIoPort => errno::ENODEV,
            CoreError::InvalidCmdResponse { .. } => errno::EPROTO,
            CoreError::MalformedTlv | CoreError::MalformedFrame => errno::EBADMSG,
            CoreError::FirmwareFailed(FwFailure::ImageMissing) => errno::ENODATA,
            CoreError::FirmwareFailed(_) => errno::EIO,
            CoreError::Timeout(_) => errno::ETIMEDOUT,
            CoreError::Busy => errno::EBUSY,
            CoreError::PayloadTooLarge => errno::E2BIG,
            CoreError::InvalidState | CoreError::InvalidParam => errno::EINVAL,
        }
    }
}

impl From<CoreError> for AxError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Io(_)
            | CoreError::IntMaskFailed
            | CoreError::IntStatusFailed
            | CoreError::InvalidRxBuffer
            | CoreError::SendDataFailed
            | CoreError::FirmwareFailed(_) => AxError::Io,
            CoreError::UnknownIoPort => AxError::NotFound,
            CoreError::InvalidCmdResponse { .. }
            | CoreError::MalformedTlv
            | CoreError::MalformedFrame => AxError::InvalidData,
            CoreError::Timeout(_) => AxError::WouldBlock,
            CoreError::Busy => AxError::ResourceBusy,
            CoreError::PayloadTooLarge => AxError::NoMemory,
            CoreError::InvalidState => AxError::BadState,
            CoreError::InvalidParam => AxError::InvalidInput,
        }
    }
}
