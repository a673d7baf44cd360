//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + 乱数部分で ULID を作る

use crate::domain::ids::{StatId, TaskId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はタスクと統計行の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（admission と worker の両方から使う）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_stat_id(&self) -> StatId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// FixedClock を渡すと timestamp 部分が固定される（乱数部分は毎回異なる）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_stat_id(&self) -> StatId {
        StatId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_task_id();
        let id2 = id_gen.generate_task_id();

        assert_ne!(id1, id2);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let task_id = id_gen.generate_task_id();
        let stat_id = id_gen.generate_stat_id();

        assert_eq!(
            task_id.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
        assert_eq!(
            stat_id.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
        assert!(stat_id.to_string().starts_with("stat-"));
    }
}
