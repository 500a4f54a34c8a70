use chrono::{DateTime, Local, Utc};
use log::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::store::PhraseDb;

pub const FREE_DAILY_LIMIT: u32 = 3;

/// Gates creation of new phrases. Reviewing existing phrases is never gated.
pub trait UsageQuota {
    fn can_proceed(&self) -> Result<bool>;
    fn record_use(&mut self) -> Result<()>;
    /// Allowance per day, reported when a creation is refused
    fn limit(&self) -> u32;
}

/// Per-calendar-day allowance of new phrases, lifted entirely when
/// `unlimited` is set.
pub struct DailyQuota<'a, C: Clock> {
    db: &'a PhraseDb,
    clock: C,
    limit: u32,
    unlimited: bool,
}

impl<'a, C: Clock> DailyQuota<'a, C> {
    pub fn new(db: &'a PhraseDb, clock: C, limit: u32, unlimited: bool) -> Self {
        Self {
            db,
            clock,
            limit,
            unlimited,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn used_today(&self) -> Result<u32> {
        self.db.usage_on(&day_key(self.clock.now()))
    }

    /// `None` when unlimited
    pub fn remaining_today(&self) -> Result<Option<u32>> {
        if self.is_unlimited() {
            return Ok(None);
        }
        Ok(Some(self.limit.saturating_sub(self.used_today()?)))
    }
}

impl<C: Clock> UsageQuota for DailyQuota<'_, C> {
    fn can_proceed(&self) -> Result<bool> {
        Ok(self.unlimited || self.used_today()? < self.limit)
    }

    fn record_use(&mut self) -> Result<()> {
        let used = self.db.record_usage(&day_key(self.clock.now()))?;
        debug!("usage today: {used}/{}", self.limit);
        Ok(())
    }

    fn limit(&self) -> u32 {
        self.limit
    }
}

/// Calendar day in local time, the boundary learners expect the limit to
/// reset on.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%Y-%m-%d").to_string()
}
