//! Record lifecycle policy.
//!
//! # Responsibility
//! - Define the soft-delete/active filter vocabulary (`alive`, `dead`,
//!   `active`, `inactive`) once, for in-memory collections and SQL scopes.
//! - Apply soft and hard deletes to in-memory collections.
//!
//! # Invariants
//! - Filters are conjunctions of flag predicates; chaining narrows.
//! - Filtering preserves the caller's ordering.
//! - `active ⊆ alive`; `alive` and `dead` partition any collection.
//! - Absence is not an error at this layer.

use crate::model::base::{BaseFields, UserId};
use crate::model::entity::Entity;

/// Lifecycle flag column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    IsActive,
    IsDeleted,
}

impl Flag {
    pub fn column(self) -> &'static str {
        match self {
            Self::IsActive => "is_active",
            Self::IsDeleted => "is_deleted",
        }
    }

    fn read(self, base: &BaseFields) -> bool {
        match self {
            Self::IsActive => base.is_active,
            Self::IsDeleted => base.is_deleted,
        }
    }
}

/// Equality predicate on one lifecycle flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagPredicate {
    pub flag: Flag,
    pub value: bool,
}

/// Conjunction of lifecycle predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleFilter {
    predicates: Vec<FlagPredicate>,
}

impl LifecycleFilter {
    /// Matches every record, deleted ones included.
    pub fn all() -> Self {
        Self::default()
    }

    /// Records that are not soft deleted.
    pub fn alive(self) -> Self {
        self.with(Flag::IsDeleted, false)
    }

    /// Soft-deleted records.
    pub fn dead(self) -> Self {
        self.with(Flag::IsDeleted, true)
    }

    /// Active, non-deleted records.
    pub fn active(self) -> Self {
        self.with(Flag::IsActive, true).with(Flag::IsDeleted, false)
    }

    /// Deactivated records that are not deleted.
    pub fn inactive(self) -> Self {
        self.with(Flag::IsActive, false).with(Flag::IsDeleted, false)
    }

    /// Adds every predicate of `other`.
    pub fn and(mut self, other: &LifecycleFilter) -> Self {
        for predicate in &other.predicates {
            self = self.with(predicate.flag, predicate.value);
        }
        self
    }

    pub fn predicates(&self) -> &[FlagPredicate] {
        &self.predicates
    }

    pub fn matches(&self, base: &BaseFields) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.flag.read(base) == predicate.value)
    }

    fn with(mut self, flag: Flag, value: bool) -> Self {
        let predicate = FlagPredicate { flag, value };
        if !self.predicates.contains(&predicate) {
            self.predicates.push(predicate);
        }
        self
    }
}

/// Lifecycle filters over in-memory collections.
pub trait Lifecycle<E: Entity> {
    fn scoped(&self, filter: &LifecycleFilter) -> Vec<&E>;

    fn alive(&self) -> Vec<&E> {
        self.scoped(&LifecycleFilter::all().alive())
    }

    fn dead(&self) -> Vec<&E> {
        self.scoped(&LifecycleFilter::all().dead())
    }

    fn active(&self) -> Vec<&E> {
        self.scoped(&LifecycleFilter::all().active())
    }

    fn inactive(&self) -> Vec<&E> {
        self.scoped(&LifecycleFilter::all().inactive())
    }
}

impl<E: Entity> Lifecycle<E> for [E] {
    fn scoped(&self, filter: &LifecycleFilter) -> Vec<&E> {
        self.iter()
            .filter(|item| filter.matches(item.base()))
            .collect()
    }
}

/// Soft deletes every record matching `filter`.
///
/// Returns the number of records newly deleted; already deleted records keep
/// their original stamp.
pub fn soft_delete<E: Entity>(
    items: &mut [E],
    filter: &LifecycleFilter,
    actor: Option<UserId>,
    now: i64,
) -> usize {
    items
        .iter_mut()
        .filter(|item| filter.matches(item.base()))
        .map(|item| item.base_mut().soft_delete(actor, now))
        .filter(|changed| *changed)
        .count()
}

/// Removes every record matching `filter` from the collection.
pub fn hard_delete<E: Entity>(items: &mut Vec<E>, filter: &LifecycleFilter) -> usize {
    let before = items.len();
    items.retain(|item| !filter.matches(item.base()));
    before - items.len()
}

/// Returns the single item matching `predicate`, or `None` when zero or
/// several items match.
pub fn get_or_none<E, P>(items: &[E], predicate: P) -> Option<&E>
where
    P: Fn(&E) -> bool,
{
    let mut matches = items.iter().filter(|item| predicate(*item));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::{Flag, LifecycleFilter};
    use crate::model::base::BaseFields;

    #[test]
    fn chained_filters_accumulate_without_duplicates() {
        let filter = LifecycleFilter::all().alive().active();
        assert_eq!(filter.predicates().len(), 2);
        assert!(filter
            .predicates()
            .iter()
            .any(|predicate| predicate.flag == Flag::IsActive && predicate.value));
    }

    #[test]
    fn contradictory_filters_match_nothing() {
        let filter = LifecycleFilter::all().dead().active();
        let mut base = BaseFields::new();
        assert!(!filter.matches(&base));
        base.soft_delete(None, base.created_at);
        assert!(!filter.matches(&base));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let mut base = BaseFields::new();
        assert!(LifecycleFilter::all().matches(&base));
        base.soft_delete(None, base.created_at);
        assert!(LifecycleFilter::all().matches(&base));
    }
}
