use crate::core::Activity;
use crate::core::validation::ValidationResult;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentDirection {
    In,
    Out,
}

/// One entry of a unit's public argument surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub direction: ArgumentDirection,
    pub required: bool,
    pub bound: bool,
    pub type_name: &'static str,
}

/// Everything a unit declared during one registration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub arguments: Vec<ArgumentDescriptor>,
    pub implementation_variables: Vec<String>,
    pub implementation_children: Vec<String>,
    pub delegates: Vec<String>,
    pub validation: ValidationResult,
}

/// Collects a unit's declarations during the host's registration pass.
///
/// Units only write into the sink; they never execute anything from
/// `cache_metadata`. The host walks the declared children and delegates
/// afterwards, each with a sink derived from its parent's.
#[derive(Default)]
pub struct MetadataSink {
    metadata: Metadata,
    children: Vec<Arc<dyn Activity>>,
    delegate_bound: HashSet<Uuid>,
}

impl MetadataSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh sink for one of `parent`'s children. Slots supplied by an
    /// enclosing delegate handler stay supplied below it.
    pub fn for_child(parent: &MetadataSink) -> Self {
        MetadataSink {
            delegate_bound: parent.delegate_bound.clone(),
            ..Self::default()
        }
    }

    pub fn add_argument(&mut self, argument: ArgumentDescriptor) {
        self.metadata.arguments.push(argument);
    }

    pub fn add_implementation_variable(&mut self, name: impl Into<String>) {
        self.metadata.implementation_variables.push(name.into());
    }

    pub fn add_implementation_child(&mut self, child: Arc<dyn Activity>) {
        self.metadata
            .implementation_children
            .push(child.display_name().to_string());
        self.children.push(child);
    }

    /// Declares a unit that runs as a delegate-handler body of the current unit.
    pub fn add_delegate(&mut self, body: Arc<dyn Activity>) {
        self.metadata.delegates.push(body.display_name().to_string());
        self.children.push(body);
    }

    /// Marks slots as supplied by a delegate handler, so they count as bound.
    pub fn bind_delegate_arguments(&mut self, slots: impl IntoIterator<Item = Uuid>) {
        self.delegate_bound.extend(slots);
    }

    pub fn is_delegate_bound(&self, slot: &Uuid) -> bool {
        self.delegate_bound.contains(slot)
    }

    pub fn add_validation_error(&mut self, msg: impl Into<String>) {
        self.metadata.validation.add_error(msg);
    }

    pub fn add_validation_warning(&mut self, msg: impl Into<String>) {
        self.metadata.validation.add_warning(msg);
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Children and delegate bodies, in declaration order.
    pub fn children(&self) -> &[Arc<dyn Activity>] {
        &self.children
    }

    pub fn into_metadata(self) -> Metadata {
        self.metadata
    }
}
