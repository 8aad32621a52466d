//! 引导命令链
//!
//! FUNC_INIT → MAC_CONTROL → GET_HW_SPEC → MAC_ADDR，每一步由上一条命令的响应推进。
//! 状态机本身不做 I/O，只在 `next_cmd` 中给出下一条要发的命令，由引擎取走发送。

use bsp::HostCmdId;

/// 引导阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    Idle,
    AwaitFuncInit,
    AwaitMacControl,
    AwaitHwSpec,
    AwaitMacAddr,
    Ready,
    Failed,
}

/// 推进结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStep {
    /// 已排入下一条命令
    Next(HostCmdId),
    /// MAC_ADDR 响应到达，链完成
    Done,
    /// 响应不属于引导链
    NotMine,
}

#[derive(Debug, Clone)]
pub struct Bootstrap {
    stage: BootStage,
    /// 下一条待发命令
    pub next_cmd: Option<HostCmdId>,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub const fn new() -> Self {
        Self {
            stage: BootStage::Idle,
            next_cmd: None,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn is_ready(&self) -> bool {
        self.stage == BootStage::Ready
    }

    /// 开始引导：排入 FUNC_INIT
    pub fn start(&mut self) {
        self.stage = BootStage::AwaitFuncInit;
        self.next_cmd = Some(HostCmdId::FuncInit);
    }

    pub fn take_next_cmd(&mut self) -> Option<HostCmdId> {
        self.next_cmd.take()
    }

    /// 收到 OK 响应后推进
    pub fn advance(&mut self, rsp: HostCmdId) -> BootStep {
        let (expect, next) = match self.stage {
            BootStage::AwaitFuncInit => (HostCmdId::FuncInit, BootStage::AwaitMacControl),
            BootStage::AwaitMacControl => (HostCmdId::MacControl, BootStage::AwaitHwSpec),
            BootStage::AwaitHwSpec => (HostCmdId::GetHwSpec, BootStage::AwaitMacAddr),
            BootStage::AwaitMacAddr => (HostCmdId::MacAddr, BootStage::Ready),
            _ => return BootStep::NotMine,
        };
        if rsp != expect {
            return BootStep::NotMine;
        }
        self.stage = next;
        let cmd = match next {
            BootStage::AwaitMacControl => HostCmdId::MacControl,
            BootStage::AwaitHwSpec => HostCmdId::GetHwSpec,
            BootStage::AwaitMacAddr => HostCmdId::MacAddr,
            _ => {
                self.next_cmd = None;
                return BootStep::Done;
            }
        };
        log::info!(target: "wireless::fdrv", "bootstrap: {:?} ok, next {:?}", rsp, cmd);
        self.next_cmd = Some(cmd);
        BootStep::Next(cmd)
    }

    /// 非 OK 响应或发送失败：链中止，不自动重试
    pub fn fail(&mut self) {
        if self.stage != BootStage::Ready {
            self.stage = BootStage::Failed;
        }
        self.next_cmd = None;
    }

    /// FUNC_SHUTDOWN 之后回到初始状态
    pub fn reset(&mut self) {
        self.stage = BootStage::Idle;
        self.next_cmd = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order() {
        let mut b = Bootstrap::new();
        assert_eq!(b.advance(HostCmdId::FuncInit), BootStep::NotMine);
        b.start();
        assert_eq!(b.take_next_cmd(), Some(HostCmdId::FuncInit));
        assert_eq!(b.advance(HostCmdId::FuncInit), BootStep::Next(HostCmdId::MacControl));
        assert_eq!(b.advance(HostCmdId::MacControl), BootStep::Next(HostCmdId::GetHwSpec));
        assert_eq!(b.advance(HostCmdId::GetHwSpec), BootStep::Next(HostCmdId::MacAddr));
        assert_eq!(b.next_cmd, Some(HostCmdId::MacAddr));
        assert_eq!(b.advance(HostCmdId::MacAddr), BootStep::Done);
        assert!(b.is_ready());
        assert_eq!(b.next_cmd, None);
    }

    #[test]
    fn out_of_order_response_is_ignored() {
        let mut b = Bootstrap::new();
        b.start();
        assert_eq!(b.advance(HostCmdId::GetHwSpec), BootStep::NotMine);
        assert_eq!(b.stage(), BootStage::AwaitFuncInit);
        b.fail();
        assert_eq!(b.stage(), BootStage::Failed);
        b.reset();
        assert_eq!(b.stage(), BootStage::Idle);
    }
}
