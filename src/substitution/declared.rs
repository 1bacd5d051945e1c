use std::fmt::{Display, Formatter};

use crate::model::identity::{ComponentSelector, ModuleComponentSelector, ModuleIdentifier};

use super::{DependencySubstitutionRule, SelectionReason, SubstitutionRequest};

/// Which module targets a declared substitution applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubstitutionSource {
    /// Any version of the module.
    Module(ModuleIdentifier),
    /// Exactly this version of the module.
    ModuleVersion(ModuleComponentSelector),
}

impl SubstitutionSource {
    fn matches(&self, target: &ModuleComponentSelector) -> bool {
        match self {
            SubstitutionSource::Module(module) => {
                module.group == target.group && module.name == target.name
            }
            SubstitutionSource::ModuleVersion(selector) => selector == target,
        }
    }
}

impl Display for SubstitutionSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubstitutionSource::Module(module) => write!(f, "{}", module),
            SubstitutionSource::ModuleVersion(selector) => write!(f, "{}", selector),
        }
    }
}

/// A user-declared `substitute X with Y`. Matches against the current target,
/// so it layers over whatever earlier rules already did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSubstitutionRule {
    name: String,
    from: SubstitutionSource,
    to: ComponentSelector,
}

impl DeclaredSubstitutionRule {
    pub fn new(from: SubstitutionSource, to: ComponentSelector) -> Self {
        DeclaredSubstitutionRule {
            name: format!("substitute {} with {}", from, to),
            from,
            to,
        }
    }

    pub fn from(&self) -> &SubstitutionSource {
        &self.from
    }

    pub fn to(&self) -> &ComponentSelector {
        &self.to
    }
}

impl DependencySubstitutionRule for DeclaredSubstitutionRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, request: &mut SubstitutionRequest) -> anyhow::Result<()> {
        let matched = request
            .requested()
            .as_module()
            .is_some_and(|target| self.from.matches(target));
        if matched {
            request.use_target(self.to.clone(), SelectionReason::SelectedByRule);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        model::identity::ModuleVersionSelector,
        substitution::{ModuleForcingRule, SubstitutionRules},
    };

    use pretty_assertions::assert_eq;

    #[test]
    fn substitutes_any_version_of_module() {
        let rule = DeclaredSubstitutionRule::new(
            SubstitutionSource::Module(ModuleIdentifier::new("org.legacy", "util")),
            ComponentSelector::module("org.example", "util", "3.1"),
        );
        let mut request =
            SubstitutionRequest::new(ModuleVersionSelector::new("org.legacy", "util", "0.9"));

        rule.execute(&mut request).unwrap();

        assert_eq!(
            request.requested(),
            &ComponentSelector::module("org.example", "util", "3.1")
        );
        assert_eq!(request.selection_reason(), Some(SelectionReason::SelectedByRule));
        assert_eq!(rule.name(), "substitute org.legacy:util with org.example:util:3.1");
    }

    #[test]
    fn exact_version_source_ignores_other_versions() {
        let rule = DeclaredSubstitutionRule::new(
            SubstitutionSource::ModuleVersion(ModuleComponentSelector::new("g", "n", "1.0")),
            ComponentSelector::project(":n"),
        );
        let mut other = SubstitutionRequest::new(ModuleVersionSelector::new("g", "n", "1.1"));
        rule.execute(&mut other).unwrap();
        assert!(!other.is_updated());

        let mut exact = SubstitutionRequest::new(ModuleVersionSelector::new("g", "n", "1.0"));
        rule.execute(&mut exact).unwrap();
        assert_eq!(exact.requested(), &ComponentSelector::project(":n"));
    }

    #[test]
    fn project_substitution_is_not_undone_by_forcing() {
        let mut rules = SubstitutionRules::new();
        rules.push(DeclaredSubstitutionRule::new(
            SubstitutionSource::Module(ModuleIdentifier::new("g", "n")),
            ComponentSelector::project(":n"),
        ));
        rules.push(ModuleForcingRule::new([ModuleVersionSelector::new("g", "n", "9.9")]));

        let mut request = SubstitutionRequest::new(ModuleVersionSelector::new("g", "n", "1.0"));
        rules.apply(&mut request).unwrap();

        assert_eq!(request.requested(), &ComponentSelector::project(":n"));
        assert_eq!(request.selection_reason(), Some(SelectionReason::SelectedByRule));
    }

    #[test]
    fn forced_module_can_be_substituted_afterwards() {
        let mut rules = SubstitutionRules::new();
        rules.push(ModuleForcingRule::new([ModuleVersionSelector::new("g", "n", "2.0")]));
        rules.push(DeclaredSubstitutionRule::new(
            SubstitutionSource::ModuleVersion(ModuleComponentSelector::new("g", "n", "2.0")),
            ComponentSelector::module("g", "n-fixed", "2.0.1"),
        ));

        let mut request = SubstitutionRequest::new(ModuleVersionSelector::new("g", "n", "1.0"));
        rules.apply(&mut request).unwrap();

        assert_eq!(
            request.requested(),
            &ComponentSelector::module("g", "n-fixed", "2.0.1")
        );
    }
}
