use std::{
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use tracing::debug;

use crate::{calendar::Calendar, error::CalendarError, time_types::NtpSeconds};

/// Source of the "current time" that era resolution is anchored to.
///
/// This needs to be a trait as the daemon reads the host clock while tests
/// and replays need a clock that stands still.
pub trait ReferenceClock: Send + Sync {
    fn now(&self) -> NtpSeconds;
}

impl<T: ReferenceClock + ?Sized> ReferenceClock for Arc<T> {
    fn now(&self) -> NtpSeconds {
        (**self).now()
    }
}

impl<T: ReferenceClock + ?Sized> ReferenceClock for &T {
    fn now(&self) -> NtpSeconds {
        (**self).now()
    }
}

/// The host's realtime clock.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemReference;

impl ReferenceClock for SystemReference {
    fn now(&self) -> NtpSeconds {
        NtpSeconds::from_system_time(SystemTime::now())
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedReference {
    time: NtpSeconds,
}

impl FixedReference {
    pub const fn new(time: NtpSeconds) -> FixedReference {
        FixedReference { time }
    }

    pub fn from_calendar(calendar: &Calendar) -> Result<FixedReference, CalendarError> {
        Ok(FixedReference::new(calendar.to_ntp_seconds()?))
    }

    /// Clock stopped at the given date and time.
    pub fn from_date(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<FixedReference, CalendarError> {
        FixedReference::from_calendar(&Calendar::new(year, month, day, hour, minute, second)?)
    }

    pub const fn time(&self) -> NtpSeconds {
        self.time
    }
}

impl ReferenceClock for FixedReference {
    fn now(&self) -> NtpSeconds {
        self.time
    }
}

pub type ActiveClock = Option<Arc<dyn ReferenceClock>>;

#[derive(Default)]
struct ReferenceSlot {
    installed: ActiveClock,
    /// Clocks of live overrides, most recent last.
    overrides: Vec<(u64, Arc<dyn ReferenceClock>)>,
    next_override: u64,
}

impl ReferenceSlot {
    fn active(&self) -> Option<&Arc<dyn ReferenceClock>> {
        self.overrides
            .last()
            .map(|(_, clock)| clock)
            .or(self.installed.as_ref())
    }
}

/// A reference clock slot that can be swapped while converters are using it.
///
/// Clones share the slot. While nothing is installed the host clock is
/// used. Overrides take precedence over the installed clock and each one
/// is removed by its own guard, in whatever order the guards are dropped.
/// Readers hold the lock for the duration of a `now()` call, so a change
/// is either fully visible to a resolution or not at all.
#[derive(Clone, Default)]
pub struct SharedReference {
    slot: Arc<RwLock<ReferenceSlot>>,
}

impl Debug for SharedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedReference")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl SharedReference {
    pub fn new() -> SharedReference {
        SharedReference::default()
    }

    fn write(&self) -> RwLockWriteGuard<'_, ReferenceSlot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, ReferenceSlot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the installed clock, returning the previous one. `None` goes
    /// back to the host clock once no override is active.
    pub fn install(&self, clock: ActiveClock) -> ActiveClock {
        debug!(installed = clock.is_some(), "replacing reference clock");
        std::mem::replace(&mut self.write().installed, clock)
    }

    /// Freeze the reference at `time`, or go back to the host clock for `None`.
    pub fn set_reference_time(&self, time: Option<&Calendar>) -> Result<(), CalendarError> {
        let clock = match time {
            Some(calendar) => {
                Some(Arc::new(FixedReference::from_calendar(calendar)?) as Arc<dyn ReferenceClock>)
            }
            None => None,
        };
        self.install(clock);
        Ok(())
    }

    pub fn reset(&self) {
        self.install(None);
    }

    /// Whether anything other than the host clock is in use.
    pub fn is_installed(&self) -> bool {
        self.read().active().is_some()
    }

    /// Use `clock` until the returned guard is dropped.
    pub fn override_with(&self, clock: Arc<dyn ReferenceClock>) -> ReferenceOverride {
        let mut slot = self.write();
        let id = slot.next_override;
        slot.next_override += 1;
        slot.overrides.push((id, clock));
        debug!(id, "overriding reference clock");

        ReferenceOverride {
            shared: self.clone(),
            id,
        }
    }

    /// Freeze the reference at the given date and time until the guard is
    /// dropped.
    pub fn fix_time(
        &self,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<ReferenceOverride, CalendarError> {
        let fixed = FixedReference::from_date(year, month, day, hour, minute, second)?;
        Ok(self.override_with(Arc::new(fixed)))
    }
}

impl ReferenceClock for SharedReference {
    fn now(&self) -> NtpSeconds {
        let slot = self.read();
        match slot.active() {
            Some(clock) => clock.now(),
            None => SystemReference.now(),
        }
    }
}

/// Removes its override when dropped, including when a test panics while
/// holding it.
#[must_use = "the override ends when the guard is dropped"]
pub struct ReferenceOverride {
    shared: SharedReference,
    id: u64,
}

impl Debug for ReferenceOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceOverride")
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for ReferenceOverride {
    fn drop(&mut self) {
        debug!(id = self.id, "ending reference clock override");
        self.shared
            .write()
            .overrides
            .retain(|(id, _)| *id != self.id);
    }
}
