//! BSP 同步原语
//!
//! - **power_lock**（spin::Mutex）：串行化复位 → 固件下载 → 引导命令链这一整段上电序列
//! - **PollBudget**：所有硬件等待点（写端口、固件块就绪、固件就绪签名）都走有界轮询，
//!   次数耗尽返回 `CoreError::Timeout`，不再无限忙等

use crate::error::{CoreError, WaitPoint};

/// 上电/引导互斥锁
static POWER_LOCK: spin::Mutex<()> = spin::Mutex::new(());

/// 忙等延时的每毫秒循环数（无精确时钟时的启发式近似）
pub const LOOPS_PER_MS: u32 = 1000;

/// 忙等约 us 微秒
#[inline]
pub fn delay_spin_us(us: u32) {
    let limit = us.saturating_mul(LOOPS_PER_MS) / 1000;
    for _ in 0..limit {
        core::hint::spin_loop();
    }
}

/// 获取上电锁，返回 guard，析构时释放
#[inline]
pub fn power_lock() -> spin::MutexGuard<'static, ()> {
    POWER_LOCK.lock()
}

/// 有界轮询预算：最多 `max_tries` 次，每次失败后忙等 `spin_us` 微秒
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub max_tries: u32,
    pub spin_us: u32,
}

impl PollBudget {
    pub const fn new(max_tries: u32, spin_us: u32) -> Self {
        Self { max_tries, spin_us }
    }

    /// 反复调用 `probe`，直到其返回 `Ok(Some(v))`；`Ok(None)` 表示条件未满足需再试，
    /// `Err` 立即透传。预算耗尽返回 `CoreError::Timeout(point)`。
    pub fn poll<T>(
        &self,
        point: WaitPoint,
        mut probe: impl FnMut() -> Result<Option<T>, CoreError>,
    ) -> Result<T, CoreError> {
        for attempt in 0..self.max_tries {
            if let Some(v) = probe()? {
                if attempt > 0 {
                    log::trace!(target: "wireless::bsp", "poll {:?} ok after {} retries", point, attempt);
                }
                return Ok(v);
            }
            if self.spin_us > 0 {
                delay_spin_us(self.spin_us);
            }
        }
        log::warn!(target: "wireless::bsp", "poll {:?} timeout after {} tries", point, self.max_tries);
        Err(CoreError::Timeout(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_succeeds_within_budget() {
        let budget = PollBudget::new(5, 0);
        let mut calls = 0;
        let v = budget.poll(WaitPoint::FwReady, || {
            calls += 1;
            Ok(if calls == 3 { Some(calls) } else { None })
        });
        assert_eq!(v, Ok(3));
    }

    #[test]
    fn poll_times_out_and_propagates_errors() {
        let budget = PollBudget::new(4, 0);
        let mut calls = 0;
        let r: Result<(), _> = budget.poll(WaitPoint::WritePort, || {
            calls += 1;
            Ok(None)
        });
        assert_eq!(r, Err(CoreError::Timeout(WaitPoint::WritePort)));
        assert_eq!(calls, 4);

        let r: Result<(), _> = budget.poll(WaitPoint::FwChunkReady, || Err(CoreError::Io(-5)));
        assert_eq!(r, Err(CoreError::Io(-5)));
    }
}
