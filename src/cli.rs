//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_history_adapter::{CsvHistoryAdapter, DEFAULT_HISTORY_PATH};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_rule_store::{JsonRuleStore, DEFAULT_RULES_PATH};
use crate::domain::bindings::VariableBindings;
use crate::domain::config_validation::{parse_tiers, validate_config};
use crate::domain::error::{FormulaError, RuleforgeError};
use crate::domain::formula::{evaluate_formula, is_valid_formula, normalize, parse};
use crate::domain::order_plan::{OrderPlan, Planner};
use crate::domain::position_size::{
    PositionSize, PositionSizeRequest, PositionSizer, DEFAULT_VOLUME_CAP_FRACTION,
};
use crate::domain::risk_ladder::{RiskLadder, STANDARD_STREAK_LENGTH, STANDARD_TIERS};
use crate::domain::rule_apply::{Level, LevelSource, MarketContext};
use crate::domain::trading_rule::{EntrySide, TradingRule};
use crate::domain::whitelist::{AliasPolicy, Whitelist};
use crate::ports::config_port::ConfigPort;
use crate::ports::rule_store::RuleStore;
use crate::ports::trade_history_port::TradeHistoryPort;

#[derive(Parser, Debug)]
#[command(name = "ruleforge", about = "Trading rule formulas, risk ladder and position sizing")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a formula
    Eval {
        #[arg(allow_hyphen_values = true)]
        formula: String,
        /// Variable binding, e.g. --var entry=100
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, f64)>,
    },
    /// Check that a formula parses and evaluates against sample values
    Check {
        #[arg(allow_hyphen_values = true)]
        formula: String,
    },
    /// List stored trading rules
    Rules {
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Make a rule the selected default
    Select {
        name: String,
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Show the current risk ladder tier
    Risk {
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Size a position from explicit prices
    Size {
        #[arg(long)]
        entry: f64,
        #[arg(long)]
        stop: f64,
        /// Percent of buying power to risk
        #[arg(long)]
        risk: f64,
        #[arg(long)]
        buying_power: f64,
        /// Average daily volume
        #[arg(long)]
        volume: Option<f64>,
        #[arg(long)]
        partial: Option<f64>,
    },
    /// Build a full order plan from a rule, the trade history and market values
    Plan {
        #[arg(long)]
        entry: f64,
        #[arg(long)]
        low: f64,
        #[arg(long)]
        high: f64,
        #[arg(long)]
        atr: f64,
        #[arg(long)]
        buying_power: f64,
        #[arg(long, default_value = "long", value_parser = parse_side)]
        side: EntrySide,
        /// Rule name; the selected rule when omitted
        #[arg(long)]
        rule: Option<String>,
        #[arg(long)]
        volume: Option<f64>,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

/// Everything the commands need from the configuration file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub planner: Planner,
    pub rules_path: PathBuf,
    pub history_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            planner: Planner::default(),
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
        }
    }
}

pub fn parse_var(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{text}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{text}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

pub fn parse_side(text: &str) -> Result<EntrySide, String> {
    EntrySide::parse(text).ok_or_else(|| format!("unknown side '{text}', expected long or short"))
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match cli.config.as_ref() {
        Some(path) => match load_settings(path) {
            Ok(s) => s,
            Err(code) => return code,
        },
        None => Settings::default(),
    };

    match cli.command {
        Command::Eval { formula, vars } => run_eval(&settings, &formula, &vars),
        Command::Check { formula } => run_check(&settings, &formula),
        Command::Rules { rules } => run_rules(&rules_path(&settings, rules.as_ref())),
        Command::Select { name, rules } => {
            run_select(&rules_path(&settings, rules.as_ref()), &name)
        }
        Command::Risk { history } => run_risk(&settings, &history_path(&settings, history.as_ref())),
        Command::Size {
            entry,
            stop,
            risk,
            buying_power,
            volume,
            partial,
        } => run_size(
            &settings,
            &PositionSizeRequest {
                entry_price: entry,
                stop_loss: stop,
                risk_percent: risk,
                buying_power,
                average_daily_volume: volume,
                partial_fill_percent: partial,
            },
        ),
        Command::Plan {
            entry,
            low,
            high,
            atr,
            buying_power,
            side,
            rule,
            volume,
            rules,
            history,
        } => run_plan(
            &settings,
            &MarketContext {
                entry_price: entry,
                side,
                low,
                high,
                atr,
            },
            buying_power,
            volume,
            rule.as_deref(),
            &rules_path(&settings, rules.as_ref()),
            &history_path(&settings, history.as_ref()),
        ),
    }
}

fn report(err: &RuleforgeError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RuleforgeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        report(&err)
    })
}

pub fn load_settings(path: &PathBuf) -> Result<Settings, ExitCode> {
    let adapter = load_config(path)?;
    if let Err(e) = validate_config(&adapter) {
        return Err(report(&e));
    }
    build_settings(&adapter).map_err(|e| report(&e))
}

pub fn build_whitelist(adapter: &dyn ConfigPort) -> Whitelist {
    if adapter.get_bool("formula", "collapse_entry_aliases", true) {
        Whitelist::with_alias_policy(AliasPolicy::CollapseToEntry)
    } else {
        Whitelist::with_alias_policy(AliasPolicy::Distinct)
    }
}

pub fn build_ladder(adapter: &dyn ConfigPort) -> Result<RiskLadder, RuleforgeError> {
    let tiers = match adapter.get_string("risk", "tiers") {
        Some(text) => parse_tiers(&text).map_err(|reason| RuleforgeError::ConfigInvalid {
            section: "risk".into(),
            key: "tiers".into(),
            reason,
        })?,
        None => STANDARD_TIERS.to_vec(),
    };
    let streak = adapter.get_int("risk", "streak_length", i64::from(STANDARD_STREAK_LENGTH));
    u32::try_from(streak)
        .ok()
        .and_then(|streak| RiskLadder::new(tiers, streak))
        .ok_or_else(|| RuleforgeError::ConfigInvalid {
            section: "risk".into(),
            key: "streak_length".into(),
            reason: "streak_length must be a whole number of at least 1".into(),
        })
}

pub fn build_settings(adapter: &dyn ConfigPort) -> Result<Settings, RuleforgeError> {
    let sizer = PositionSizer::new(adapter.get_double(
        "sizing",
        "volume_cap_fraction",
        DEFAULT_VOLUME_CAP_FRACTION,
    ));
    let planner = Planner::new(build_whitelist(adapter), build_ladder(adapter)?, sizer);

    Ok(Settings {
        planner,
        rules_path: adapter
            .get_string("store", "rules_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH)),
        history_path: adapter
            .get_string("store", "history_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH)),
    })
}

fn rules_path(settings: &Settings, flag: Option<&PathBuf>) -> PathBuf {
    flag.cloned().unwrap_or_else(|| settings.rules_path.clone())
}

fn history_path(settings: &Settings, flag: Option<&PathBuf>) -> PathBuf {
    flag.cloned().unwrap_or_else(|| settings.history_path.clone())
}

/// Error positions index the normalized formula, so the caret is drawn under it.
pub fn formula_error_report(formula: &str, error: &FormulaError) -> String {
    format!("error:\n{}", error.display_with_context(&normalize(formula)))
}

pub fn run_eval(settings: &Settings, formula: &str, vars: &[(String, f64)]) -> ExitCode {
    let bindings: VariableBindings = vars.iter().map(|(n, v)| (n.as_str(), *v)).collect();
    match evaluate_formula(formula, &bindings, &settings.planner.whitelist) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", formula_error_report(formula, &e));
            (&RuleforgeError::from(e)).into()
        }
    }
}

pub fn run_check(settings: &Settings, formula: &str) -> ExitCode {
    let whitelist = &settings.planner.whitelist;
    match is_valid_formula(formula, whitelist).and_then(|()| parse(formula, whitelist)) {
        Ok(expr) => {
            println!("ok: {expr}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", formula_error_report(formula, &e));
            (&RuleforgeError::from(e)).into()
        }
    }
}

pub fn format_rules(rules: &[TradingRule]) -> String {
    let mut lines = Vec::new();
    for rule in rules {
        let marker = if rule.selected { "*" } else { " " };
        lines.push(format!("{marker} {}", rule.name));
        lines.push(format!("    stop loss:     {}", rule.stop_loss));
        lines.push(format!("    profit target: {}", rule.profit_taking));
        lines.push(format!("    trailing stop: {}", rule.trailing_stop));
        lines.push(format!("    partial:       {}%", rule.partial_pct));
        if !rule.exit_rule.is_empty() {
            lines.push(format!("    exit rule:     {}", rule.exit_rule));
        }
    }
    to_text(lines)
}

fn to_text(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

pub fn run_rules(path: &Path) -> ExitCode {
    match JsonRuleStore::new(path).load_rules() {
        Ok(rules) => {
            print!("{}", format_rules(&rules));
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

pub fn run_select(path: &Path, name: &str) -> ExitCode {
    match JsonRuleStore::new(path).select(name) {
        Ok(()) => {
            println!("selected: {name}");
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

pub fn run_risk(settings: &Settings, path: &Path) -> ExitCode {
    let outcomes = match CsvHistoryAdapter::new(path).outcomes() {
        Ok(o) => o,
        Err(e) => return report(&e),
    };
    let ladder = &settings.planner.ladder;
    let state = ladder.replay(&outcomes);
    println!("trades:             {}", outcomes.len());
    println!("tier:               {} of {}", state.tier + 1, ladder.tiers().len());
    println!("consecutive wins:   {}", state.consecutive_wins);
    println!("consecutive losses: {}", state.consecutive_losses);
    println!("risk percent:       {}%", ladder.risk_percent(&state));
    ExitCode::SUCCESS
}

pub fn format_position(size: &PositionSize) -> String {
    let mut lines = vec![
        format!("quantity:        {}", size.quantity),
        format!("amount invested: {:.2}", size.amount_invested),
        format!("amount at risk:  {:.2}", size.amount_at_risk),
        format!("risk percent:    {}%", size.risk_percent),
    ];
    if let Some(note) = &size.cap_note {
        lines.push(format!("note:            {note}"));
    }
    to_text(lines)
}

pub fn run_size(settings: &Settings, request: &PositionSizeRequest) -> ExitCode {
    match settings.planner.sizer.calculate(request) {
        Ok(size) => {
            print!("{}", format_position(&size));
            ExitCode::SUCCESS
        }
        Err(e) => report(&e.into()),
    }
}

fn format_level<F: std::fmt::Debug>(label: &str, level: &Level<F>) -> String {
    match &level.source {
        LevelSource::Formula => format!("{label:<15}{:.4}", level.value),
        LevelSource::Default => format!("{label:<15}{:.4} (default)", level.value),
        LevelSource::Fallback { strategy, error } => {
            format!("{label:<15}{:.4} (fallback {strategy:?}: {error})", level.value)
        }
    }
}

pub fn format_plan(plan: &OrderPlan) -> String {
    let mut lines = vec![
        format!("rule:          {}", plan.rule_name),
        format!(
            "entry:         {:.4} {:?}",
            plan.market.entry_price, plan.market.side
        ),
        format_level("stop loss:", &plan.levels.stop_loss),
        format_level("profit target:", &plan.levels.profit_target),
        format_level("trailing stop:", &plan.levels.trailing_stop),
        format!("ladder tier:   {}", plan.ladder.tier + 1),
        format!("partial:       {}%", plan.partial_pct),
    ];
    if !plan.exit_rule.is_empty() {
        lines.push(format!("exit rule:     {}", plan.exit_rule));
    }
    to_text(lines) + &format_position(&plan.position)
}

pub fn run_plan(
    settings: &Settings,
    market: &MarketContext,
    buying_power: f64,
    volume: Option<f64>,
    rule_name: Option<&str>,
    rules_path: &Path,
    history_path: &Path,
) -> ExitCode {
    let store = JsonRuleStore::new(rules_path);
    let rule = match rule_name {
        Some(name) => store.find(name),
        None => store.selected(),
    };
    let rule = match rule {
        Ok(r) => r,
        Err(e) => return report(&e),
    };

    let history = match CsvHistoryAdapter::new(history_path).outcomes() {
        Ok(h) => h,
        Err(e) => return report(&e),
    };

    match settings
        .planner
        .plan(&rule, market, &history, buying_power, volume)
    {
        Ok(plan) => {
            print!("{}", format_plan(&plan));
            ExitCode::SUCCESS
        }
        Err(e) => report(&e.into()),
    }
}
