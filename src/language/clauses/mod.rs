//! Clause kinds: the keyword-identified syntax extensions of the specification
//! language, together with the capability flags that govern which state
//! expressions may appear inside them.

use bitflags::bitflags;
use std::fmt;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

mod registry;

pub use registry::{ClauseRegistry, ClauseRegistryBuilder, RegistryError};

bitflags! {
    /// Which state expressions a clause kind admits in its body.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StateCapabilities: u8 {
        /// `\old(e)` / `\past(e)` without a label.
        const UNLABELED_PREV = 1 << 0;
        /// `\pre(e)`, the state on entry to the enclosing method.
        const PREV_ENTRY = 1 << 1;
        /// `\old(e, L)` / `\past(e, L)` anchored at a label.
        const LABELED_PREV = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
pub enum StateKeyword {
    #[strum(serialize = "\\old")]
    Old,
    #[strum(serialize = "\\pre")]
    Pre,
    #[strum(serialize = "\\past")]
    Past,
}

impl StateKeyword {
    pub fn is_entry(self) -> bool {
        matches!(self, StateKeyword::Pre)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TypeClauseKeyword {
    Invariant,
    Constraint,
    Axiom,
    Initially,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum MethodSpecKeyword {
    Requires,
    Ensures,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum StatementKeyword {
    Assert,
    Assume,
}

/// The closed set of clause kinds known to the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    State(StateKeyword),
    TypeClause(TypeClauseKeyword),
    MethodSpec(MethodSpecKeyword),
    Statement(StatementKeyword),
    /// Ghost declarations inside method bodies.
    Declaration,
}

impl ClauseKind {
    pub const DECLARATION_KEYWORD: &'static str = "ghost";

    pub fn all() -> impl Iterator<Item = ClauseKind> {
        StateKeyword::iter()
            .map(ClauseKind::State)
            .chain(TypeClauseKeyword::iter().map(ClauseKind::TypeClause))
            .chain(MethodSpecKeyword::iter().map(ClauseKind::MethodSpec))
            .chain(StatementKeyword::iter().map(ClauseKind::Statement))
            .chain(std::iter::once(ClauseKind::Declaration))
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ClauseKind::State(kw) => kw.into(),
            ClauseKind::TypeClause(kw) => kw.into(),
            ClauseKind::MethodSpec(kw) => kw.into(),
            ClauseKind::Statement(kw) => kw.into(),
            ClauseKind::Declaration => Self::DECLARATION_KEYWORD,
        }
    }

    pub fn default_capabilities(self) -> StateCapabilities {
        match self {
            ClauseKind::State(_) => StateCapabilities::empty(),
            // A type clause may talk about the pre-state of a constructor or
            // method, but there is no invocation to anchor a label at.
            ClauseKind::TypeClause(_) => StateCapabilities::UNLABELED_PREV,
            ClauseKind::MethodSpec(MethodSpecKeyword::Requires) => StateCapabilities::empty(),
            ClauseKind::MethodSpec(MethodSpecKeyword::Ensures) => {
                StateCapabilities::UNLABELED_PREV | StateCapabilities::PREV_ENTRY
            }
            ClauseKind::Statement(_) => StateCapabilities::all(),
            ClauseKind::Declaration => StateCapabilities::empty(),
        }
    }

    pub fn default_arity(self) -> Arity {
        match self {
            ClauseKind::State(StateKeyword::Pre) => Arity::Exactly(1),
            ClauseKind::State(_) => Arity::Between(1, 2),
            _ => Arity::Declaration,
        }
    }

    pub fn is_method_spec(self) -> bool {
        matches!(self, ClauseKind::MethodSpec(_))
    }

    pub fn is_declaration(self) -> bool {
        matches!(self, ClauseKind::Declaration)
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How many arguments an invocation-style clause takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
    /// Declaration-level clauses take a body, not an argument list.
    Declaration,
}

impl Arity {
    pub fn admits(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::Declaration => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(1) => f.write_str("one argument"),
            Arity::Exactly(n) => write!(f, "{n} arguments"),
            Arity::Between(lo, hi) => write!(f, "{lo} or {hi} arguments"),
            Arity::Declaration => f.write_str("a declaration body"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClauseKindDescriptor {
    pub keyword: &'static str,
    pub kind: ClauseKind,
    pub arity: Arity,
    pub capabilities: StateCapabilities,
}

impl ClauseKindDescriptor {
    pub fn of(kind: ClauseKind) -> Self {
        Self {
            keyword: kind.keyword(),
            kind,
            arity: kind.default_arity(),
            capabilities: kind.default_capabilities(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: StateCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn accepts_unlabeled_prev_state(&self) -> bool {
        self.capabilities.contains(StateCapabilities::UNLABELED_PREV)
    }

    pub fn accepts_prev_entry_state(&self) -> bool {
        self.capabilities.contains(StateCapabilities::PREV_ENTRY)
    }

    pub fn accepts_labeled_prev_state(&self) -> bool {
        self.capabilities.contains(StateCapabilities::LABELED_PREV)
    }

    pub fn state_keyword(&self) -> Option<StateKeyword> {
        match self.kind {
            ClauseKind::State(kw) => Some(kw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn keywords_round_trip_through_strum() {
        assert_eq!(ClauseKind::State(StateKeyword::Old).keyword(), "\\old");
        assert_eq!(StateKeyword::from_str("\\past"), Ok(StateKeyword::Past));
        assert_eq!(
            TypeClauseKeyword::from_str("initially"),
            Ok(TypeClauseKeyword::Initially)
        );
        assert_eq!(ClauseKind::Declaration.keyword(), "ghost");
    }

    #[test]
    fn type_clauses_allow_only_unlabeled_old() {
        for kw in TypeClauseKeyword::iter() {
            let desc = ClauseKindDescriptor::of(ClauseKind::TypeClause(kw));
            assert!(desc.accepts_unlabeled_prev_state());
            assert!(!desc.accepts_labeled_prev_state());
            assert!(!desc.accepts_prev_entry_state());
        }
    }

    #[test]
    fn entry_keyword_takes_exactly_one_argument() {
        let pre = ClauseKind::State(StateKeyword::Pre).default_arity();
        assert!(pre.admits(1));
        assert!(!pre.admits(2));
        let old = ClauseKind::State(StateKeyword::Old).default_arity();
        assert!(old.admits(1) && old.admits(2));
        assert!(!old.admits(0) && !old.admits(3));
    }

    #[test]
    fn every_kind_has_a_distinct_keyword() {
        let mut seen = std::collections::HashSet::new();
        for kind in ClauseKind::all() {
            assert!(seen.insert(kind.keyword()), "duplicate {}", kind);
        }
        assert_eq!(seen.len(), 12);
    }
}
