mod declared;
mod forcing;

use std::fmt::{Display, Formatter};

use log::trace;
use thiserror::Error;

use crate::model::identity::{ComponentSelector, ModuleVersionSelector};

pub use declared::{DeclaredSubstitutionRule, SubstitutionSource};
pub use forcing::ModuleForcingRule;

/// Why a dependency ended up pointing at its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionReason {
    Requested,
    Root,
    Forced,
    ConflictResolution,
    SelectedByRule,
    ConflictResolutionByRule,
    CompositeBuild,
}

impl SelectionReason {
    /// Stable key for machine consumption.
    pub fn key(&self) -> &'static str {
        match self {
            SelectionReason::Requested => "requested",
            SelectionReason::Root => "root",
            SelectionReason::Forced => "forced",
            SelectionReason::ConflictResolution => "conflict-resolution",
            SelectionReason::SelectedByRule => "selected-by-rule",
            SelectionReason::ConflictResolutionByRule => "conflict-resolution-by-rule",
            SelectionReason::CompositeBuild => "composite-build",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SelectionReason::Requested => "requested",
            SelectionReason::Root => "root",
            SelectionReason::Forced => "forced",
            SelectionReason::ConflictResolution => "conflict resolution",
            SelectionReason::SelectedByRule => "selected by rule",
            SelectionReason::ConflictResolutionByRule => "selected by rule and conflict resolution",
            SelectionReason::CompositeBuild => "composite build substitution",
        }
    }
}

impl Display for SelectionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// The substitution state of one dependency edge while rules run over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRequest {
    old_requested: ModuleVersionSelector,
    requested: ComponentSelector,
    selection_reason: Option<SelectionReason>,
}

impl SubstitutionRequest {
    pub fn new(old_requested: ModuleVersionSelector) -> Self {
        let requested = ComponentSelector::from(&old_requested);
        Self::with_target(old_requested, requested)
    }

    pub fn with_target(old_requested: ModuleVersionSelector, requested: ComponentSelector) -> Self {
        SubstitutionRequest {
            old_requested,
            requested,
            selection_reason: None,
        }
    }

    /// The dependency as declared. Rules can't change it.
    pub fn old_requested(&self) -> &ModuleVersionSelector {
        &self.old_requested
    }

    pub fn requested(&self) -> &ComponentSelector {
        &self.requested
    }

    pub fn selection_reason(&self) -> Option<SelectionReason> {
        self.selection_reason
    }

    pub fn is_updated(&self) -> bool {
        self.selection_reason.is_some()
    }

    pub fn use_target(&mut self, target: ComponentSelector, reason: SelectionReason) {
        trace!(
            "Substituting {} with {} ({})",
            self.requested,
            target,
            reason.key()
        );
        self.requested = target;
        self.selection_reason = Some(reason);
    }

    pub fn into_outcome(self) -> SubstitutionOutcome {
        SubstitutionOutcome {
            declared: self.old_requested,
            target: self.requested,
            reason: self.selection_reason.unwrap_or(SelectionReason::Requested),
        }
    }
}

/// What a dependency edge resolves against once every rule has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionOutcome {
    pub declared: ModuleVersionSelector,
    pub target: ComponentSelector,
    pub reason: SelectionReason,
}

pub trait DependencySubstitutionRule: Send + Sync {
    /// Identifies the rule in failure reports.
    fn name(&self) -> &str;

    fn execute(&self, request: &mut SubstitutionRequest) -> anyhow::Result<()>;
}

/// Adapts a closure into a named rule.
pub struct FnRule<F> {
    name: String,
    action: F,
}

impl<F> FnRule<F>
where
    F: Fn(&mut SubstitutionRequest) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, action: F) -> Self {
        FnRule {
            name: name.into(),
            action,
        }
    }
}

impl<F> DependencySubstitutionRule for FnRule<F>
where
    F: Fn(&mut SubstitutionRequest) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, request: &mut SubstitutionRequest) -> anyhow::Result<()> {
        (self.action)(request)
    }
}

#[derive(Error, Debug)]
pub enum SubstitutionError {
    #[error("Substitution rule `{rule}` failed for {requested}: {cause:#}")]
    RuleFailed {
        rule: String,
        requested: ModuleVersionSelector,
        cause: anyhow::Error,
    },
}

/// Rules applied to every module dependency edge, in registration order.
#[derive(Default)]
pub struct SubstitutionRules {
    rules: Vec<Box<dyn DependencySubstitutionRule>>,
}

impl SubstitutionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: impl DependencySubstitutionRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn extend(&mut self, other: SubstitutionRules) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Runs each rule over `request` in order. The first failure stops the
    /// pipeline; effects of the rules that already ran stay in place.
    pub fn apply(&self, request: &mut SubstitutionRequest) -> Result<(), SubstitutionError> {
        for rule in &self.rules {
            rule.execute(request)
                .map_err(|cause| SubstitutionError::RuleFailed {
                    rule: rule.name().to_string(),
                    requested: request.old_requested().clone(),
                    cause,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::bail;

    use super::*;

    use pretty_assertions::assert_eq;

    fn declared() -> ModuleVersionSelector {
        ModuleVersionSelector::new("org.example", "lib", "1.0")
    }

    #[test]
    fn new_request_targets_declared_module() {
        let request = SubstitutionRequest::new(declared());
        assert_eq!(
            request.requested(),
            &ComponentSelector::module("org.example", "lib", "1.0")
        );
        assert_eq!(request.selection_reason(), None);
        assert!(!request.is_updated());
    }

    #[test]
    fn later_rules_observe_earlier_rewrites() {
        let mut rules = SubstitutionRules::new();
        rules.push(FnRule::new("to-project", |request: &mut SubstitutionRequest| {
            request.use_target(ComponentSelector::project(":lib"), SelectionReason::SelectedByRule);
            Ok(())
        }));
        rules.push(FnRule::new("check", |request: &mut SubstitutionRequest| {
            assert_eq!(request.requested(), &ComponentSelector::project(":lib"));
            request.use_target(
                ComponentSelector::library(":lib", "lib"),
                SelectionReason::CompositeBuild,
            );
            Ok(())
        }));

        let mut request = SubstitutionRequest::new(declared());
        rules.apply(&mut request).unwrap();

        assert_eq!(request.requested(), &ComponentSelector::library(":lib", "lib"));
        assert_eq!(request.selection_reason(), Some(SelectionReason::CompositeBuild));
        assert_eq!(request.old_requested(), &declared());
    }

    #[test]
    fn failing_rule_stops_pipeline_and_is_named() {
        let mut rules = SubstitutionRules::new();
        rules.push(FnRule::new("first", |request: &mut SubstitutionRequest| {
            request.use_target(
                ComponentSelector::module("org.example", "lib", "1.1"),
                SelectionReason::SelectedByRule,
            );
            Ok(())
        }));
        rules.push(FnRule::new("broken", |_: &mut SubstitutionRequest| {
            bail!("no target for this module")
        }));

        let mut request = SubstitutionRequest::new(declared());
        let error = rules.apply(&mut request).unwrap_err();

        match &error {
            SubstitutionError::RuleFailed {
                rule, requested, ..
            } => {
                assert_eq!(rule, "broken");
                assert_eq!(requested, &declared());
            }
        }
        assert_eq!(
            error.to_string(),
            "Substitution rule `broken` failed for org.example:lib:1.0: no target for this module"
        );
        assert_eq!(
            request.requested(),
            &ComponentSelector::module("org.example", "lib", "1.1")
        );
    }

    #[test]
    fn rules_after_failure_do_not_run() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let mut rules = SubstitutionRules::new();
        rules.push(FnRule::new("broken", |_: &mut SubstitutionRequest| {
            bail!("boom")
        }));
        rules.push(FnRule::new("counting", move |_: &mut SubstitutionRequest| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let mut request = SubstitutionRequest::new(declared());
        assert!(rules.apply(&mut request).is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(rules.names().collect::<Vec<_>>(), vec!["broken", "counting"]);
    }

    #[test]
    fn untouched_request_resolves_as_requested() {
        let outcome = SubstitutionRequest::new(declared()).into_outcome();
        assert_eq!(outcome.reason, SelectionReason::Requested);
        assert_eq!(outcome.target, ComponentSelector::from(&declared()));
    }
}
