//! Scoped attribution context.
//!
//! Every push goes through [`ContextScope`], which pops on drop, so a frame
//! can never outlive the check that created it.

use crate::language::{ast::Identifier, clauses::ClauseKindDescriptor};
use log::trace;
use std::ops::{Deref, DerefMut};

/// The program point a state expression refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum StateLabel {
    /// Entry to the enclosing method.
    Entry,
    Named(Identifier),
}

impl StateLabel {
    pub fn is_entry(&self) -> bool {
        matches!(self, StateLabel::Entry)
    }

    pub fn name(&self) -> &str {
        match self {
            StateLabel::Entry => "",
            StateLabel::Named(ident) => &ident.name,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributionContext {
    pub current_clause_kind: Option<ClauseKindDescriptor>,
    /// `None` means the current state.
    pub current_label: Option<StateLabel>,
}

#[derive(Debug, Default)]
pub struct ContextStack {
    base: AttributionContext,
    frames: Vec<AttributionContext>,
    pushes: usize,
    pops: usize,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &AttributionContext {
        self.frames.last().unwrap_or(&self.base)
    }

    /// Number of frames pushed above the base frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_count(&self) -> usize {
        self.pushes
    }

    pub fn pop_count(&self) -> usize {
        self.pops
    }

    fn push_copy(&mut self) {
        let copy = self.current().clone();
        self.frames.push(copy);
        self.pushes += 1;
        trace!("context push -> depth {}", self.frames.len());
    }

    fn pop(&mut self) {
        if self.frames.pop().is_some() {
            self.pops += 1;
        }
        trace!("context pop -> depth {}", self.frames.len());
    }

    fn top_mut(&mut self) -> &mut AttributionContext {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.base,
        }
    }
}

pub trait ContextHost {
    fn contexts(&self) -> &ContextStack;

    fn contexts_mut(&mut self) -> &mut ContextStack;
}

impl ContextHost for ContextStack {
    fn contexts(&self) -> &ContextStack {
        self
    }

    fn contexts_mut(&mut self) -> &mut ContextStack {
        self
    }
}

/// A pushed copy of the enclosing context, popped when the scope is dropped.
///
/// The scope dereferences to the host, so checking continues through it while
/// the frame is live.
pub struct ContextScope<'a, H: ContextHost + ?Sized> {
    host: &'a mut H,
}

impl<'a, H: ContextHost + ?Sized> ContextScope<'a, H> {
    pub fn enter(host: &'a mut H) -> Self {
        host.contexts_mut().push_copy();
        Self { host }
    }

    pub fn with_clause_kind(host: &'a mut H, descriptor: ClauseKindDescriptor) -> Self {
        let mut scope = Self::enter(host);
        scope.context_mut().current_clause_kind = Some(descriptor);
        scope
    }

    pub fn context(&self) -> &AttributionContext {
        self.host.contexts().current()
    }

    pub fn context_mut(&mut self) -> &mut AttributionContext {
        self.host.contexts_mut().top_mut()
    }
}

impl<H: ContextHost + ?Sized> Deref for ContextScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: ContextHost + ?Sized> DerefMut for ContextScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: ContextHost + ?Sized> Drop for ContextScope<'_, H> {
    fn drop(&mut self) {
        self.host.contexts_mut().pop();
    }
}
