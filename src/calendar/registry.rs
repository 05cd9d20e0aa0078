use super::effective::EffectiveCalendar;
use super::{CalendarError, CalendarId, WorkCalendar};
use crate::metadata::TimeDefaults;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Owns every calendar of a project and the links between them.
///
/// Calendars refer to their parent by id. The registry keeps the reverse
/// index so that a change to one calendar can invalidate the caches of
/// every calendar derived from it.
#[derive(Debug, Clone, Default)]
pub struct CalendarRegistry {
    calendars: HashMap<CalendarId, WorkCalendar>,
    derived: HashMap<CalendarId, Vec<CalendarId>>,
    defaults: TimeDefaults,
}

impl CalendarRegistry {
    pub fn new(defaults: TimeDefaults) -> Self {
        Self {
            calendars: HashMap::new(),
            derived: HashMap::new(),
            defaults,
        }
    }

    /// A registry holding only the Standard calendar under `id`.
    pub fn with_standard_calendar(defaults: TimeDefaults, id: CalendarId) -> Self {
        let mut registry = Self::new(defaults);
        registry.calendars.insert(id, WorkCalendar::standard(id));
        registry
    }

    pub fn defaults(&self) -> &TimeDefaults {
        &self.defaults
    }

    /// Replaces the project defaults. Every cached value may depend on
    /// them, so all caches are dropped.
    pub fn set_defaults(&mut self, defaults: TimeDefaults) {
        self.defaults = defaults;
        for calendar in self.calendars.values() {
            calendar.clear_cache();
        }
        debug!(calendars = self.calendars.len(), "time defaults changed, calendar caches cleared");
    }

    /// Adds or replaces a calendar. Returns the calendar previously
    /// registered under the same id.
    pub fn insert(
        &mut self,
        mut calendar: WorkCalendar,
    ) -> Result<Option<WorkCalendar>, CalendarError> {
        let id = calendar.id();
        if let Some(parent) = calendar.parent() {
            self.check_parent(id, parent)?;
        }
        calendar.mark_dirty();
        let parent = calendar.parent();
        let previous = self.calendars.insert(id, calendar);
        if let Some(old_parent) = previous.as_ref().and_then(WorkCalendar::parent) {
            self.unlink(old_parent, id);
        }
        if let Some(parent) = parent {
            self.derived.entry(parent).or_default().push(id);
        }
        self.invalidate_derived(id);
        debug!(calendar = id, ?parent, "calendar registered");
        Ok(previous)
    }

    /// Removes a calendar that no other calendar derives from.
    pub fn remove(&mut self, id: CalendarId) -> Result<WorkCalendar, CalendarError> {
        if self.derived.get(&id).is_some_and(|children| !children.is_empty()) {
            return Err(CalendarError::CalendarInUse(id));
        }
        let calendar = self
            .calendars
            .remove(&id)
            .ok_or(CalendarError::UnknownCalendar(id))?;
        if let Some(parent) = calendar.parent() {
            self.unlink(parent, id);
        }
        self.derived.remove(&id);
        Ok(calendar)
    }

    pub fn get(&self, id: CalendarId) -> Option<&WorkCalendar> {
        self.calendars.get(&id)
    }

    pub fn contains(&self, id: CalendarId) -> bool {
        self.calendars.contains_key(&id)
    }

    /// The calendar with `id`, resolved against its ancestors.
    pub fn calendar(&self, id: CalendarId) -> Result<EffectiveCalendar<'_>, CalendarError> {
        let calendar = self.get(id).ok_or(CalendarError::UnknownCalendar(id))?;
        Ok(EffectiveCalendar::new(self, calendar))
    }

    /// Mutates a registered calendar. This is the only mutable access to a
    /// registered calendar; afterwards the calendar and everything derived
    /// from it are invalidated.
    pub fn update<R>(
        &mut self,
        id: CalendarId,
        f: impl FnOnce(&mut WorkCalendar) -> R,
    ) -> Result<R, CalendarError> {
        let calendar = self
            .calendars
            .get_mut(&id)
            .ok_or(CalendarError::UnknownCalendar(id))?;
        let result = f(calendar);
        calendar.mark_dirty();
        self.invalidate_derived(id);
        Ok(result)
    }

    /// Re-parents a calendar, rejecting self-references and cycles.
    pub fn set_parent(
        &mut self,
        id: CalendarId,
        parent: Option<CalendarId>,
    ) -> Result<(), CalendarError> {
        let current = self
            .calendars
            .get(&id)
            .ok_or(CalendarError::UnknownCalendar(id))?
            .parent();
        if let Some(parent) = parent {
            self.check_parent(id, parent)?;
        }
        if let Some(old_parent) = current {
            self.unlink(old_parent, id);
        }
        if let Some(parent) = parent {
            self.derived.entry(parent).or_default().push(id);
        }
        if let Some(calendar) = self.calendars.get_mut(&id) {
            calendar.set_parent_id(parent);
        }
        self.invalidate_derived(id);
        Ok(())
    }

    /// Ids of calendars whose parent is `id`.
    pub fn derived_calendars(&self, id: CalendarId) -> &[CalendarId] {
        self.derived.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkCalendar> {
        self.calendars.values()
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }

    fn check_parent(&self, id: CalendarId, parent: CalendarId) -> Result<(), CalendarError> {
        if parent == id {
            return Err(CalendarError::InvalidParent { calendar: id, parent });
        }
        if !self.calendars.contains_key(&parent) {
            return Err(CalendarError::UnknownCalendar(parent));
        }
        let mut ancestor = Some(parent);
        let mut steps = 0;
        while let Some(current) = ancestor {
            if current == id || steps > self.calendars.len() {
                return Err(CalendarError::InvalidParent { calendar: id, parent });
            }
            ancestor = self.calendars.get(&current).and_then(WorkCalendar::parent);
            steps += 1;
        }
        Ok(())
    }

    fn unlink(&mut self, parent: CalendarId, child: CalendarId) {
        if let Some(children) = self.derived.get_mut(&parent) {
            children.retain(|&c| c != child);
        }
    }

    fn invalidate_derived(&self, id: CalendarId) {
        let mut visited = HashSet::from([id]);
        let mut stack = self.derived_calendars(id).to_vec();
        while let Some(child) = stack.pop() {
            if !visited.insert(child) {
                continue;
            }
            if let Some(calendar) = self.calendars.get(&child) {
                calendar.clear_cache();
            }
            stack.extend_from_slice(self.derived_calendars(child));
        }
        if visited.len() > 1 {
            debug!(
                calendar = id,
                derived = visited.len() - 1,
                "derived calendar caches invalidated"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn registry() -> CalendarRegistry {
        let mut registry = CalendarRegistry::new(TimeDefaults::default());
        registry.insert(WorkCalendar::standard(1)).unwrap();
        registry
    }

    #[test]
    fn rejects_self_and_unknown_parents() {
        let mut registry = registry();
        let err = registry.insert(WorkCalendar::derived(2, "Self", 2)).unwrap_err();
        assert_eq!(err, CalendarError::InvalidParent { calendar: 2, parent: 2 });
        let err = registry.insert(WorkCalendar::derived(3, "Orphan", 99)).unwrap_err();
        assert_eq!(err, CalendarError::UnknownCalendar(99));
    }

    #[test]
    fn rejects_parent_cycles() {
        let mut registry = registry();
        registry.insert(WorkCalendar::derived(2, "Child", 1)).unwrap();
        registry.insert(WorkCalendar::derived(3, "Grandchild", 2)).unwrap();
        let err = registry.set_parent(1, Some(3)).unwrap_err();
        assert_eq!(err, CalendarError::InvalidParent { calendar: 1, parent: 3 });
        assert_eq!(registry.get(1).unwrap().parent(), None);
    }

    #[test]
    fn remove_refuses_while_derived_calendars_exist() {
        let mut registry = registry();
        registry.insert(WorkCalendar::derived(2, "Child", 1)).unwrap();
        assert_eq!(registry.remove(1).unwrap_err(), CalendarError::CalendarInUse(1));
        registry.remove(2).unwrap();
        assert!(registry.derived_calendars(1).is_empty());
        registry.remove(1).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn update_invalidates_derived_caches() {
        let mut registry = registry();
        registry.insert(WorkCalendar::derived(2, "Child", 1)).unwrap();
        registry.insert(WorkCalendar::derived(3, "Grandchild", 2)).unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        registry.calendar(3).unwrap().start_time(monday);
        assert!(registry.get(3).unwrap().has_cached_values());

        registry.update(1, |c| c.set_name("Renamed")).unwrap();
        assert!(!registry.get(3).unwrap().has_cached_values());
    }

    #[test]
    fn set_parent_moves_derived_index() {
        let mut registry = registry();
        registry.insert(WorkCalendar::standard(2)).unwrap();
        registry.insert(WorkCalendar::derived(3, "Child", 1)).unwrap();
        registry.set_parent(3, Some(2)).unwrap();
        assert!(registry.derived_calendars(1).is_empty());
        assert_eq!(registry.derived_calendars(2), &[3]);
        assert_eq!(registry.get(3).unwrap().parent(), Some(2));
    }
}
