use super::{ClauseKind, ClauseKindDescriptor};
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("keyword `{0}` is already registered")]
    DuplicateKeyword(String),
    #[error("no clause kind is registered for `{0}`")]
    NotFound(String),
}

/// Collects descriptors before the registry is frozen.
#[derive(Debug, Default)]
pub struct ClauseRegistryBuilder {
    by_keyword: HashMap<&'static str, ClauseKindDescriptor>,
    order: Vec<&'static str>,
}

impl ClauseRegistryBuilder {
    pub fn register(
        &mut self,
        descriptor: ClauseKindDescriptor,
    ) -> Result<&mut Self, RegistryError> {
        if self.by_keyword.contains_key(descriptor.keyword) {
            return Err(RegistryError::DuplicateKeyword(descriptor.keyword.to_string()));
        }
        debug!(
            "registering clause kind `{}` ({:?}, {:?})",
            descriptor.keyword, descriptor.kind, descriptor.capabilities
        );
        self.by_keyword.insert(descriptor.keyword, descriptor);
        self.order.push(descriptor.keyword);
        Ok(self)
    }

    pub fn build(self) -> ClauseRegistry {
        ClauseRegistry {
            by_keyword: self.by_keyword,
            order: self.order,
        }
    }
}

/// Keyword table shared by the parser and the checker.
///
/// Read-only once built, so one registry can back any number of concurrent
/// compilations.
#[derive(Debug, Clone)]
pub struct ClauseRegistry {
    by_keyword: HashMap<&'static str, ClauseKindDescriptor>,
    order: Vec<&'static str>,
}

impl ClauseRegistry {
    pub fn builder() -> ClauseRegistryBuilder {
        ClauseRegistryBuilder::default()
    }

    /// Every built-in clause kind under its literal keyword.
    pub fn standard() -> Self {
        let mut builder = Self::builder();
        for kind in ClauseKind::all() {
            if let Err(err) = builder.register(ClauseKindDescriptor::of(kind)) {
                unreachable!("built-in clause keywords are distinct: {err}");
            }
        }
        builder.build()
    }

    pub fn lookup(&self, keyword: &str) -> Result<&ClauseKindDescriptor, RegistryError> {
        self.get(keyword)
            .ok_or_else(|| RegistryError::NotFound(keyword.to_string()))
    }

    pub fn get(&self, keyword: &str) -> Option<&ClauseKindDescriptor> {
        self.by_keyword.get(keyword)
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ClauseKindDescriptor> {
        self.order
            .iter()
            .filter_map(|keyword| self.by_keyword.get(keyword))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::clauses::{StateCapabilities, StateKeyword, TypeClauseKeyword};

    #[test]
    fn duplicate_keyword_is_rejected() {
        let mut builder = ClauseRegistry::builder();
        builder
            .register(ClauseKindDescriptor::of(ClauseKind::State(StateKeyword::Old)))
            .unwrap();
        let err = builder
            .register(ClauseKindDescriptor::of(ClauseKind::State(StateKeyword::Old)))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKeyword("\\old".into()));
    }

    #[test]
    fn lookup_reports_missing_keyword() {
        let registry = ClauseRegistry::standard();
        assert_eq!(
            registry.lookup("\\forall").unwrap_err(),
            RegistryError::NotFound("\\forall".into())
        );
        let invariant = registry.lookup("invariant").unwrap();
        assert_eq!(
            invariant.kind,
            ClauseKind::TypeClause(TypeClauseKeyword::Invariant)
        );
    }

    #[test]
    fn standard_registry_preserves_registration_order() {
        let registry = ClauseRegistry::standard();
        let keywords: Vec<_> = registry.iter().map(|d| d.keyword).collect();
        assert_eq!(&keywords[..3], &["\\old", "\\pre", "\\past"]);
        assert_eq!(keywords.last(), Some(&"ghost"));
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn custom_capabilities_survive_registration() {
        let mut builder = ClauseRegistry::builder();
        builder
            .register(
                ClauseKindDescriptor::of(ClauseKind::TypeClause(TypeClauseKeyword::Axiom))
                    .with_capabilities(StateCapabilities::empty()),
            )
            .unwrap();
        let registry = builder.build();
        assert!(!registry.lookup("axiom").unwrap().accepts_unlabeled_prev_state());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClauseRegistry>();

        let registry = ClauseRegistry::standard();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| registry.lookup("\\pre").map(|d| d.kind)))
                .collect();
            for handle in handles {
                assert_eq!(
                    handle.join().unwrap(),
                    Ok(ClauseKind::State(StateKeyword::Pre))
                );
            }
        });
    }
}
