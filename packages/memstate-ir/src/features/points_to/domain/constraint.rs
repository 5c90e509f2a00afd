//! Points-to Constraints
//!
//! Constraint forms issued by the constraint generator:
//! - POINTS_TO: p = &o             → pts(p) ⊇ {o}
//! - SUPERSET:  a = b              → pts(a) ⊇ pts(b)
//! - LOAD:      v = *a             → ∀o ∈ pts(a): pts(v) ⊇ pts(o)
//! - STORE:     *a = v             → ∀o ∈ pts(a): pts(o) ⊇ pts(v)
//! - CALL:      r = f(args)        → bind args/results to every callee in pts(f)
//! - EXTERNAL:  p = <external>     → pts(p) ⊇ pts(E)
//! - UNKNOWN:   p = <unknown>      → pts(p) ⊇ pts(U)
//! - ESCAPES:   <external> = p    → pts(E) ⊇ pts(p)

use serde::{Deserialize, Serialize};

use super::entity::EntityIndex;

/// Constraint kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    PointsTo,
    Superset,
    Load,
    Store,
    Call,
    PointsToExternal,
    PointsToUnknown,
    Escapes,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::PointsTo => "POINTS_TO",
            ConstraintKind::Superset => "SUPERSET",
            ConstraintKind::Load => "LOAD",
            ConstraintKind::Store => "STORE",
            ConstraintKind::Call => "CALL",
            ConstraintKind::PointsToExternal => "EXTERNAL",
            ConstraintKind::PointsToUnknown => "UNKNOWN",
            ConstraintKind::Escapes => "ESCAPES",
        }
    }
}

/// A single constraint over entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// pts(pointer) ⊇ {pointee}
    PointsTo {
        pointer: EntityIndex,
        pointee: EntityIndex,
    },

    /// pts(superset) ⊇ pts(subset)
    Superset {
        superset: EntityIndex,
        subset: EntityIndex,
    },

    /// value = *address
    Load {
        value: EntityIndex,
        address: EntityIndex,
    },

    /// *address = value
    Store {
        address: EntityIndex,
        value: EntityIndex,
    },

    /// results = (*callee)(arguments); non-pointer positions are `None`
    Call {
        callee: EntityIndex,
        arguments: Vec<Option<EntityIndex>>,
        results: Vec<Option<EntityIndex>>,
    },

    PointsToExternal { pointer: EntityIndex },

    PointsToUnknown { pointer: EntityIndex },

    /// Everything `pointer` points to becomes reachable from outside the unit
    Escapes { pointer: EntityIndex },
}

impl Constraint {
    #[inline]
    pub fn points_to(pointer: EntityIndex, pointee: EntityIndex) -> Self {
        Constraint::PointsTo { pointer, pointee }
    }

    #[inline]
    pub fn superset(superset: EntityIndex, subset: EntityIndex) -> Self {
        Constraint::Superset { superset, subset }
    }

    #[inline]
    pub fn load(value: EntityIndex, address: EntityIndex) -> Self {
        Constraint::Load { value, address }
    }

    #[inline]
    pub fn store(address: EntityIndex, value: EntityIndex) -> Self {
        Constraint::Store { address, value }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::PointsTo { .. } => ConstraintKind::PointsTo,
            Constraint::Superset { .. } => ConstraintKind::Superset,
            Constraint::Load { .. } => ConstraintKind::Load,
            Constraint::Store { .. } => ConstraintKind::Store,
            Constraint::Call { .. } => ConstraintKind::Call,
            Constraint::PointsToExternal { .. } => ConstraintKind::PointsToExternal,
            Constraint::PointsToUnknown { .. } => ConstraintKind::PointsToUnknown,
            Constraint::Escapes { .. } => ConstraintKind::Escapes,
        }
    }
}

/// Ordered collection of constraints with per-kind counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    counts: ConstraintCounts,
}

/// Per-kind constraint counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintCounts {
    pub points_to: usize,
    pub superset: usize,
    pub load: usize,
    pub store: usize,
    pub call: usize,
    pub external: usize,
    pub unknown: usize,
    pub escapes: usize,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: Constraint) {
        match constraint.kind() {
            ConstraintKind::PointsTo => self.counts.points_to += 1,
            ConstraintKind::Superset => self.counts.superset += 1,
            ConstraintKind::Load => self.counts.load += 1,
            ConstraintKind::Store => self.counts.store += 1,
            ConstraintKind::Call => self.counts.call += 1,
            ConstraintKind::PointsToExternal => self.counts.external += 1,
            ConstraintKind::PointsToUnknown => self.counts.unknown += 1,
            ConstraintKind::Escapes => self.counts.escapes += 1,
        }
        self.constraints.push(constraint);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn counts(&self) -> ConstraintCounts {
        self.counts
    }
}

impl Extend<Constraint> for ConstraintSet {
    fn extend<T: IntoIterator<Item = Constraint>>(&mut self, iter: T) {
        for constraint in iter {
            self.add(constraint);
        }
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = Constraint>>(iter: T) -> Self {
        let mut set = ConstraintSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}
