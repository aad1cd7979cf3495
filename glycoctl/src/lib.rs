use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use glyco_core::plan::{
    Action, ActionSource, GlucoseHeuristic, Heuristic, ZeroHeuristic, NO_ACTION,
};
use glyco_core::{
    evaluate, load_planner_settings, EvaluationReport, Glucose, GroundTruth, PatientState,
    PlanOutcome, Planner, PlannerSettings, Risk, SearchReport,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] glyco_core::ConfigError),
    #[error("planner error: {0}")]
    Plan(#[from] glyco_core::PlanError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    CheckFailed(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Glucose action planner", long_about = None)]
pub struct Cli {
    /// Path to planner.toml; built-in rule tables are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Emit debug logs on stderr
    #[arg(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for the cheapest action plan from a patient state
    Plan(StateArgs),
    /// List candidate actions the catalog offers for a state
    Actions(StateArgs),
    /// Score primary recommendations against the reference ground truth
    Evaluate,
    /// Validate rule tables and goal reachability for every state
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// Glucose category (low | normal | high)
    #[arg(long, value_parser = parse_glucose)]
    pub glucose: Glucose,
    /// Risk category (low | medium | high)
    #[arg(long, value_parser = parse_risk)]
    pub risk: Risk,
}

impl StateArgs {
    fn state(&self) -> PatientState {
        PatientState::new(self.glucose, self.risk)
    }
}

fn parse_glucose(value: &str) -> std::result::Result<Glucose, String> {
    value.parse().map_err(|err: glyco_core::PlanError| err.to_string())
}

fn parse_risk(value: &str) -> std::result::Result<Risk, String> {
    value.parse().map_err(|err: glyco_core::PlanError| err.to_string())
}

pub fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Plan(args) => {
            let report = context.plan(args);
            render(&PlanView(report), cli.format)?;
        }
        Commands::Actions(args) => {
            let list = context.actions(args);
            render(&list, cli.format)?;
        }
        Commands::Evaluate => {
            let report = context.evaluate();
            render(&EvaluationView(report), cli.format)?;
        }
        Commands::Check => {
            let report = context.check();
            render(&report, cli.format)?;
            if report
                .iter()
                .any(|entry| entry.status == CheckStatus::Error)
            {
                return Err(AppError::CheckFailed(
                    "one or more checks failed".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn render<T: Serialize + DisplayFallback>(value: &T, format: OutputFormat) -> Result<()> {
    let output = match format {
        OutputFormat::Text => value.display(),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
    };
    println!("{output}");
    Ok(())
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug)]
struct AppContext {
    settings: PlannerSettings,
    source: String,
    planner: Planner,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let (settings, source) = match &cli.config {
            Some(path) => (
                load_planner_settings(path)?,
                path.display().to_string(),
            ),
            None => (PlannerSettings::default(), "built-in".to_string()),
        };
        let planner = settings.build_planner()?;
        debug!(target: "glycoctl", source = %source, "planner ready");
        Ok(Self {
            settings,
            source,
            planner,
        })
    }

    fn plan(&self, args: &StateArgs) -> SearchReport {
        self.planner.search(args.state())
    }

    fn actions(&self, args: &StateArgs) -> ActionList {
        let state = args.state();
        ActionList {
            state,
            merge_policy: self.settings.planner.merge_policy.as_str().to_string(),
            actions: self.planner.catalog().actions(&state),
        }
    }

    fn evaluate(&self) -> EvaluationReport {
        evaluate(&self.planner, &GroundTruth::reference())
    }

    fn check(&self) -> Vec<HealthEntry> {
        let mut entries = vec![HealthEntry::new(
            CheckStatus::Ok,
            "tables",
            format!(
                "{} rule set(s) from {}, merge policy {}",
                self.settings.rule_sets.len(),
                self.source,
                self.settings.planner.merge_policy.as_str()
            ),
        )];

        let catalog = self.planner.catalog();
        let transition = self.planner.transition();
        let declared = catalog.declared_actions();
        for action in &declared {
            if !transition.is_normalizing(&action.name) {
                entries.push(HealthEntry::new(
                    CheckStatus::Warn,
                    format!("action:{}", action.name),
                    "never changes the state",
                ));
            }
        }
        for name in transition.normalizing() {
            if !declared.iter().any(|action| action.name == name) {
                entries.push(HealthEntry::new(
                    CheckStatus::Warn,
                    format!("normalizing:{name}"),
                    "not offered by any rule",
                ));
            }
        }

        entries.extend(self.admissibility(&declared));

        for state in PatientState::all() {
            let name = format!("state:{}/{}", state.glucose, state.risk);
            let report = self.planner.search(state);
            let (status, detail) = match report.outcome {
                PlanOutcome::AlreadyAtGoal => (CheckStatus::Ok, "already at goal".to_string()),
                PlanOutcome::Found(plan) => (
                    CheckStatus::Ok,
                    format!("{} (cost {})", plan.action_names().join(", "), plan.total_cost),
                ),
                PlanOutcome::Unreachable if report.stats.budget_exhausted => {
                    (CheckStatus::Error, "expansion budget exhausted".to_string())
                }
                PlanOutcome::Unreachable => (CheckStatus::Error, "goal unreachable".to_string()),
            };
            entries.push(HealthEntry::new(status, name, detail));
        }
        entries
    }

    /// The search is only optimal while the heuristic never exceeds the true
    /// remaining cost, which needs every step to cost at least one.
    fn admissibility(&self, declared: &[Action]) -> Vec<HealthEntry> {
        let mut entries = Vec::new();
        match declared.iter().min_by_key(|action| action.cost) {
            Some(cheapest) if cheapest.cost == 0 => entries.push(HealthEntry::new(
                CheckStatus::Error,
                "heuristic:min_cost",
                format!("{} costs 0", cheapest.name),
            )),
            Some(cheapest) => entries.push(HealthEntry::new(
                CheckStatus::Ok,
                "heuristic:min_cost",
                format!("cheapest step {} costs {}", cheapest.name, cheapest.cost),
            )),
            None => {}
        }

        let overshoots = self.heuristic_overshoots(&GlucoseHeuristic);
        if overshoots.is_empty() {
            entries.push(HealthEntry::new(
                CheckStatus::Ok,
                "heuristic:admissible",
                "estimate never exceeds the optimal cost",
            ));
        }
        for (state, estimate, optimal) in overshoots {
            entries.push(HealthEntry::new(
                CheckStatus::Error,
                format!("heuristic:{}/{}", state.glucose, state.risk),
                format!("estimate {estimate} exceeds optimal cost {optimal}"),
            ));
        }
        entries
    }

    /// States where `heuristic` overestimates, as (state, estimate, optimal)
    /// with the optimal cost taken from uniform-cost search.
    fn heuristic_overshoots<H: Heuristic>(&self, heuristic: &H) -> Vec<(PatientState, u32, u32)> {
        let uniform = self.planner.clone().with_heuristic(ZeroHeuristic);
        PatientState::all()
            .filter_map(|state| {
                let optimal = match uniform.search(state).outcome {
                    PlanOutcome::AlreadyAtGoal => 0,
                    PlanOutcome::Found(plan) => plan.total_cost,
                    PlanOutcome::Unreachable => return None,
                };
                let estimate = heuristic.estimate(&state);
                (estimate > optimal).then_some((state, estimate, optimal))
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct PlanView(SearchReport);

impl DisplayFallback for PlanView {
    fn display(&self) -> String {
        let report = &self.0;
        let mut lines = vec![format!("Start: {}", report.start)];
        match &report.outcome {
            PlanOutcome::AlreadyAtGoal => {
                lines.push("Glucose is already normal; nothing to do".to_string())
            }
            PlanOutcome::Unreachable => lines.push("No plan reaches normal glucose".to_string()),
            PlanOutcome::Found(plan) => {
                lines.push(format!("Plan (total cost {}):", plan.total_cost));
                for (idx, step) in plan.steps.iter().enumerate() {
                    lines.push(format!("  {}. {} (cost {})", idx + 1, step.name, step.cost));
                }
            }
        }
        lines.push(format!(
            "Expanded {} state(s), generated {} successor(s)",
            report.stats.expanded, report.stats.generated
        ));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ActionList {
    state: PatientState,
    merge_policy: String,
    actions: Vec<Action>,
}

impl DisplayFallback for ActionList {
    fn display(&self) -> String {
        if self.actions.is_empty() {
            return format!("No actions offered for {}", self.state);
        }
        let mut lines = vec![format!("{} ({})", self.state, self.merge_policy)];
        for action in &self.actions {
            lines.push(format!("  - {} | cost={}", action.name, action.cost));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct EvaluationView(EvaluationReport);

impl DisplayFallback for EvaluationView {
    fn display(&self) -> String {
        let report = &self.0;
        let mut lines = vec![
            format!("Accuracy: {:.2}%", report.accuracy * 100.0),
            format!("Weighted F1: {:.4}", report.weighted_f1),
            format!("Correct: {}/{}", report.correct, report.total),
            "Labels:".to_string(),
        ];
        for score in &report.labels {
            lines.push(format!(
                "  - {} | precision={:.2} recall={:.2} f1={:.2} support={}",
                score.label, score.precision, score.recall, score.f1, score.support
            ));
        }
        lines.push("Cases:".to_string());
        for case in &report.cases {
            let mark = if case.correct { "OK" } else { "MISS" };
            let predicted = if case.predicted == NO_ACTION {
                "<none>"
            } else {
                case.predicted.as_str()
            };
            lines.push(format!(
                "  [{mark}] {} expected={} predicted={}",
                case.state, case.expected, predicted
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct HealthEntry {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl HealthEntry {
    fn new(status: CheckStatus, name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warn => "WARN",
            CheckStatus::Error => "ERROR",
        })
    }
}

impl fmt::Display for HealthEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.status, self.name, self.detail)
    }
}

impl DisplayFallback for Vec<HealthEntry> {
    fn display(&self) -> String {
        self.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["glycoctl"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn status_of(entries: &[HealthEntry], name: &str) -> Option<CheckStatus> {
        entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.status)
    }

    struct Overeager;

    impl Heuristic for Overeager {
        fn estimate(&self, _state: &PatientState) -> u32 {
            5
        }
    }

    #[test]
    fn parses_state_arguments() {
        let parsed = cli(&["plan", "--glucose", "high", "--risk", "low"]);
        match parsed.command {
            Commands::Plan(args) => {
                assert_eq!(args.state(), PatientState::new(Glucose::High, Risk::Low))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_categories_before_planning() {
        let err = Cli::try_parse_from(["glycoctl", "plan", "--glucose", "sky", "--risk", "low"])
            .unwrap_err();
        assert!(err.to_string().contains("unknown glucose category"));
    }

    #[test]
    fn plan_view_lists_steps() {
        let parsed = cli(&["plan", "--glucose", "high", "--risk", "low"]);
        let context = AppContext::new(&parsed).unwrap();
        let Commands::Plan(args) = &parsed.command else {
            panic!("expected plan command");
        };
        let view = PlanView(context.plan(args));
        let text = view.display();
        assert!(text.contains("1. avoid_sugar (cost 1)"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["outcome"], "found");
    }

    #[test]
    fn actions_follow_catalog_order() {
        let parsed = cli(&["actions", "--glucose", "normal", "--risk", "high"]);
        let context = AppContext::new(&parsed).unwrap();
        let Commands::Actions(args) = &parsed.command else {
            panic!("expected actions command");
        };
        let list = context.actions(args);
        let names: Vec<&str> = list.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["walk", "avoid_sugar", "check_glucose"]);
    }

    #[test]
    fn check_passes_for_builtin_tables() {
        let parsed = cli(&["check"]);
        let context = AppContext::new(&parsed).unwrap();
        let entries = context.check();
        assert!(!entries
            .iter()
            .any(|entry| entry.status == CheckStatus::Error));
        assert_eq!(
            status_of(&entries, "action:light_exercise"),
            Some(CheckStatus::Warn)
        );
        assert!(run(parsed).is_ok());
    }

    #[test]
    fn check_reports_heuristic_admissibility() {
        let context = AppContext::new(&cli(&["check"])).unwrap();
        let entries = context.check();
        assert_eq!(
            status_of(&entries, "heuristic:min_cost"),
            Some(CheckStatus::Ok)
        );
        assert_eq!(
            status_of(&entries, "heuristic:admissible"),
            Some(CheckStatus::Ok)
        );
        assert!(context.heuristic_overshoots(&GlucoseHeuristic).is_empty());
    }

    #[test]
    fn overestimating_heuristic_is_detected() {
        let context = AppContext::new(&cli(&["check"])).unwrap();
        let overshoots = context.heuristic_overshoots(&Overeager);
        assert_eq!(overshoots.len(), 9);
        assert!(overshoots.contains(&(PatientState::new(Glucose::Normal, Risk::Low), 5, 0)));
        assert!(overshoots.contains(&(PatientState::new(Glucose::High, Risk::Low), 5, 1)));
    }

    #[test]
    fn health_entries_render_one_per_line() {
        let entries = vec![
            HealthEntry::new(CheckStatus::Ok, "tables", "2 rule set(s)"),
            HealthEntry::new(CheckStatus::Error, "state:low/low", "goal unreachable"),
        ];
        assert_eq!(
            entries.display(),
            "[OK] tables - 2 rule set(s)\n[ERROR] state:low/low - goal unreachable"
        );
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[1]["status"], "error");
    }

    #[test]
    fn check_flags_unreachable_states_from_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("planner.toml");
        fs::write(
            &path,
            r#"
[[rule_sets]]
name = "glucose_only_high"
[[rule_sets.rules]]
when = { glucose = "high" }
actions = [{ name = "avoid_sugar", cost = 1 }]
"#,
        )
        .unwrap();
        let parsed = cli(&["--config", path.to_str().unwrap(), "check"]);
        let context = AppContext::new(&parsed).unwrap();
        let entries = context.check();
        let failing: Vec<&str> = entries
            .iter()
            .filter(|entry| entry.status == CheckStatus::Error)
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(
            failing,
            vec!["state:low/low", "state:low/medium", "state:low/high"]
        );
        assert!(matches!(run(parsed), Err(AppError::CheckFailed(_))));
    }

    #[test]
    fn invalid_config_surfaces_as_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("planner.toml");
        fs::write(
            &path,
            r#"
[[rule_sets]]
name = "free"
[[rule_sets.rules]]
actions = [{ name = "walk", cost = 0 }]
"#,
        )
        .unwrap();
        let parsed = cli(&["--config", path.to_str().unwrap(), "evaluate"]);
        assert!(matches!(run(parsed), Err(AppError::Config(_))));
    }

    #[test]
    fn evaluation_view_reports_scores() {
        let parsed = cli(&["--format", "json", "evaluate"]);
        let context = AppContext::new(&parsed).unwrap();
        let view = EvaluationView(context.evaluate());
        assert!(view.display().contains("Correct: 3/9"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["total"], 9);
    }
}
