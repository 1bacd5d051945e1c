use std::collections::HashMap;

use crate::model::identity::{ComponentSelector, ModuleIdentifier, ModuleVersionSelector};

use super::{DependencySubstitutionRule, SelectionReason, SubstitutionRequest};

/// Pins modules to a configured version regardless of what was requested.
pub struct ModuleForcingRule {
    // `None` when nothing is forced, so the rule costs no lookup per edge.
    forced_modules: Option<HashMap<ModuleIdentifier, String>>,
}

impl ModuleForcingRule {
    pub fn new(forced_modules: impl IntoIterator<Item = ModuleVersionSelector>) -> Self {
        let forced_modules = forced_modules
            .into_iter()
            .map(|module| (module.module(), module.version))
            .collect::<HashMap<_, _>>();

        ModuleForcingRule {
            forced_modules: (!forced_modules.is_empty()).then_some(forced_modules),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.forced_modules.is_none()
    }

    pub fn forced_version(&self, module: &ModuleIdentifier) -> Option<&str> {
        self.forced_modules
            .as_ref()
            .and_then(|forced| forced.get(module))
            .map(String::as_str)
    }
}

impl DependencySubstitutionRule for ModuleForcingRule {
    fn name(&self) -> &str {
        "force"
    }

    fn execute(&self, request: &mut SubstitutionRequest) -> anyhow::Result<()> {
        let Some(forced_modules) = &self.forced_modules else {
            return Ok(());
        };
        // Keyed off the declared module, not whatever an earlier rule rewrote it to.
        let key = request.old_requested().module();
        let Some(version) = forced_modules.get(&key) else {
            return Ok(());
        };
        let targets_module = match request.requested() {
            ComponentSelector::Module(_) => true,
            ComponentSelector::Project(_) | ComponentSelector::Library(_) => false,
        };
        if targets_module {
            request.use_target(
                ComponentSelector::module(key.group, key.name, version),
                SelectionReason::Forced,
            );
        }
        Ok(())
    }
}
