use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::plan::{
    ActionCatalog, GlucoseHeuristic, MergePolicy, NormalizingTransition, PlanResult, Planner,
    PlannerConfig, RuleSet, STANDARD_NORMALIZING,
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlannerSettings {
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default = "standard_rule_sets")]
    pub rule_sets: Vec<RuleSet>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlannerSection {
    #[serde(default)]
    pub merge_policy: MergePolicy,
    #[serde(default)]
    pub max_expansions: Option<usize>,
    #[serde(default = "standard_normalizing")]
    pub normalizing_actions: Vec<String>,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            max_expansions: None,
            normalizing_actions: standard_normalizing(),
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            planner: PlannerSection::default(),
            rule_sets: standard_rule_sets(),
        }
    }
}

impl PlannerSettings {
    pub fn build_catalog(&self) -> PlanResult<ActionCatalog> {
        ActionCatalog::new(self.rule_sets.clone(), self.planner.merge_policy)
    }

    pub fn build_transition(&self) -> NormalizingTransition {
        NormalizingTransition::with_actions(self.planner.normalizing_actions.iter().cloned())
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_expansions: self.planner.max_expansions,
        }
    }

    pub fn build_planner(&self) -> PlanResult<Planner> {
        Ok(Planner::new(
            self.build_catalog()?,
            self.build_transition(),
            GlucoseHeuristic,
        )
        .with_config(self.planner_config()))
    }
}

fn standard_rule_sets() -> Vec<RuleSet> {
    vec![RuleSet::glucose(), RuleSet::risk()]
}

fn standard_normalizing() -> Vec<String> {
    STANDARD_NORMALIZING.iter().map(|name| name.to_string()).collect()
}

/// Loads planner tables and rejects any the search cannot handle. Unknown
/// keys are errors so a misspelled section never falls back to defaults.
pub fn load_planner_settings<P: AsRef<Path>>(path: P) -> Result<PlannerSettings> {
    let path = path.as_ref();
    let settings: PlannerSettings = read_toml(path)?;
    settings.build_catalog()?;
    debug!(
        target: "config",
        path = %path.display(),
        rule_sets = settings.rule_sets.len(),
        merge_policy = settings.planner.merge_policy.as_str(),
        "planner settings loaded"
    );
    Ok(settings)
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let owned = || path.to_path_buf();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: owned(),
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        source,
        path: owned(),
    })
}
