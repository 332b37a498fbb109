//! YRFI CLI - run the first-inning prediction pipeline stage by stage

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use yrfi::data::{self, BoxScoreStore};
use yrfi::evaluation::{AccuracyReport, AccuracySummary, ValueBet};
use yrfi::pipeline::Pipeline;
use yrfi::{MatchupScope, PipelineConfig, Prediction};

#[derive(Parser)]
#[command(name = "yrfi")]
#[command(author, version, about = "YRFI/NRFI prediction pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Directory holding input and stage CSV files
    #[arg(long, env = "YRFI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to the trained model JSON
    #[arg(long, env = "YRFI_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Drop odds rows with unrecognized team names instead of failing
    #[arg(long)]
    lenient_teams: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the rolling-feature training table
    Training,

    /// Build the pregame feature table for a date
    Features {
        /// Game date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Include every historical game, not just the target date
        #[arg(long)]
        all_known: bool,
    },

    /// Train the model with a chronological holdout
    Train {
        /// Read the saved training table instead of rebuilding it
        #[arg(long)]
        from_file: bool,
    },

    /// Predict YRFI probabilities for a date
    Predict {
        /// Game date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Include every historical game, not just the target date
        #[arg(long)]
        all_known: bool,

        /// Read the saved feature table instead of rebuilding it
        #[arg(long)]
        from_file: bool,
    },

    /// Compare saved predictions to market odds
    Value {
        /// Minimum expected value per unit staked
        #[arg(long)]
        min_ev: Option<f64>,

        /// Number of bets to show
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Grade saved predictions against box scores
    Accuracy {
        /// Selected date (YYYY-MM-DD, default: latest prediction date)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Run every stage from box scores to value bets
    Run {
        /// Game date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Include every historical game, not just the target date
        #[arg(long)]
        all_known: bool,
    },

    /// List recognized team names
    Teams,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(model) = cli.model.clone() {
        config.model_path = model;
    }
    if cli.lenient_teams {
        config.strict_team_names = false;
    }

    init_tracing(&config.log_level);

    println!("{}", format!("YRFI CLI v{}", env!("CARGO_PKG_VERSION")).cyan().bold());
    println!();

    let pipeline = Pipeline::new(config).context("Invalid configuration")?;

    if cli.interactive {
        run_interactive(&pipeline)?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Training => build_training(&pipeline)?,
            Commands::Features { date, all_known } => {
                build_features(&pipeline, date.unwrap_or_else(today), scope(all_known))?
            }
            Commands::Train { from_file } => train_model(&pipeline, from_file)?,
            Commands::Predict {
                date,
                all_known,
                from_file,
            } => predict(&pipeline, date.unwrap_or_else(today), scope(all_known), from_file)?,
            Commands::Value { min_ev, top } => value_bets(&pipeline, min_ev, top)?,
            Commands::Accuracy { date } => accuracy(&pipeline, date)?,
            Commands::Run { date, all_known } => {
                run_all(&pipeline, date.unwrap_or_else(today), scope(all_known))?
            }
            Commands::Teams => list_teams(&pipeline),
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn scope(all_known: bool) -> MatchupScope {
    if all_known {
        MatchupScope::AllKnown
    } else {
        MatchupScope::TargetDate
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn load_box_scores(pipeline: &Pipeline) -> Result<BoxScoreStore> {
    let path = pipeline.config().box_scores_path();
    pipeline
        .load_box_scores()
        .with_context(|| format!("Failed to load box scores from {:?}", path))
}

fn build_training(pipeline: &Pipeline) -> Result<()> {
    let pb = spinner("Building rolling features...")?;
    let store = load_box_scores(pipeline)?;
    let rows = pipeline
        .build_training_table(&store)
        .context("Failed to build training table")?;
    let path = pipeline.config().training_path();
    data::write_training_table(&path, &rows)
        .with_context(|| format!("Failed to write training table to {:?}", path))?;
    pb.finish_and_clear();

    let positives = rows.iter().filter(|r| r.yrfi).count();
    println!(
        "{} {} training rows from {} games ({:.1}% YRFI)",
        "Built".green(),
        rows.len(),
        store.len(),
        positives as f64 / rows.len().max(1) as f64 * 100.0
    );
    println!("Saved to {}", path.display());
    Ok(())
}

fn build_features(pipeline: &Pipeline, date: NaiveDate, scope: MatchupScope) -> Result<()> {
    let pb = spinner("Building pregame features...")?;
    let store = load_box_scores(pipeline)?;
    let odds = pipeline.load_market_odds().context("Failed to load market odds")?;
    let table = pipeline
        .build_inference_table(&store, &odds, date, scope)
        .with_context(|| format!("Failed to build features for {}", date))?;
    let path = pipeline.config().features_path();
    data::write_feature_table(&path, &table.matchups)
        .with_context(|| format!("Failed to write feature table to {:?}", path))?;
    pb.finish_and_clear();

    if table.target.fell_back() {
        println!(
            "{} no data for {}, using {}",
            "Note:".yellow(),
            table.target.requested,
            table.target.resolved
        );
    }
    println!(
        "{} {} matchups for {}",
        "Built".green(),
        table.matchups.len(),
        table.target.resolved
    );
    println!("Saved to {}", path.display());
    Ok(())
}

fn train_model(pipeline: &Pipeline, from_file: bool) -> Result<()> {
    let pb = spinner("Training model...")?;
    let rows = if from_file {
        let path = pipeline.config().training_path();
        data::load_training_table(&path)
            .with_context(|| format!("Failed to load training table from {:?}", path))?
    } else {
        let store = load_box_scores(pipeline)?;
        pipeline
            .build_training_table(&store)
            .context("Failed to build training table")?
    };
    let report = pipeline.train(&rows).context("Training failed")?;
    let model_path = &pipeline.config().model_path;
    report
        .model
        .save(model_path)
        .with_context(|| format!("Failed to save model to {:?}", model_path))?;
    pb.finish_and_clear();

    let m = &report.holdout;
    println!("{}", "Holdout evaluation".yellow().bold());
    println!("{}", "-".repeat(40));
    println!("Train rows:     {}", report.train_rows);
    println!("Holdout rows:   {}", report.holdout_rows);
    println!("Base rate:      {:.3}", m.base_rate);
    println!("Accuracy:       {:.3}", m.accuracy);
    println!("Precision:      {:.3}", m.precision);
    println!("Recall:         {:.3}", m.recall);
    match m.roc_auc {
        Some(auc) => println!("ROC AUC:        {:.3}", auc),
        None => println!("ROC AUC:        n/a (single class)"),
    }
    println!("Log loss:       {:.4}", m.log_loss);
    println!("Brier:          {:.4}", m.brier);
    println!();
    println!("Model saved to {}", model_path.display());
    Ok(())
}

fn predict(
    pipeline: &Pipeline,
    date: NaiveDate,
    scope: MatchupScope,
    from_file: bool,
) -> Result<()> {
    let pb = spinner("Scoring matchups...")?;
    let matchups = if from_file {
        let path = pipeline.config().features_path();
        data::load_feature_table(&path)
            .with_context(|| format!("Failed to load feature table from {:?}", path))?
    } else {
        let store = load_box_scores(pipeline)?;
        let odds = pipeline.load_market_odds().context("Failed to load market odds")?;
        let table = pipeline
            .build_inference_table(&store, &odds, date, scope)
            .with_context(|| format!("Failed to build features for {}", date))?;
        let path = pipeline.config().features_path();
        data::write_feature_table(&path, &table.matchups)
            .with_context(|| format!("Failed to write feature table to {:?}", path))?;
        table.matchups
    };

    let model = pipeline.load_model().context("Failed to load model")?;
    let predictions = pipeline
        .predict(model.as_ref(), &matchups)
        .context("Prediction failed")?;
    let path = pipeline.config().predictions_path();
    data::write_predictions(&path, &matchups, &predictions)
        .with_context(|| format!("Failed to write predictions to {:?}", path))?;
    pb.finish_and_clear();

    println!("{} ({})", "YRFI predictions".yellow().bold(), model.name());
    print_predictions(&predictions);
    println!();
    println!("Saved to {}", path.display());
    Ok(())
}

fn value_bets(pipeline: &Pipeline, min_ev: Option<f64>, top: usize) -> Result<()> {
    let path = pipeline.config().predictions_path();
    let predictions = data::load_predictions(&path)
        .with_context(|| format!("Failed to load predictions from {:?}", path))?;
    let odds = pipeline.load_market_odds().context("Failed to load market odds")?;

    let bets = match min_ev {
        Some(min_ev) => yrfi::evaluation::find_value_bets(&predictions, &odds, min_ev),
        None => pipeline.value_bets(&predictions, &odds),
    };
    let out = pipeline.config().value_bets_path();
    data::write_value_bets(&out, &bets)
        .with_context(|| format!("Failed to write value bets to {:?}", out))?;

    println!("{}", "Top +EV opportunities".yellow().bold());
    print_value_bets(&bets, top);
    println!();
    println!("Saved to {}", out.display());
    Ok(())
}

fn accuracy(pipeline: &Pipeline, date: Option<NaiveDate>) -> Result<()> {
    let path = pipeline.config().predictions_path();
    let predictions = data::load_predictions(&path)
        .with_context(|| format!("Failed to load predictions from {:?}", path))?;
    let store = load_box_scores(pipeline)?;

    let Some(date) = date.or_else(|| predictions.iter().map(|p| p.game_date).max()) else {
        println!("{}", "No predictions to grade.".yellow());
        return Ok(());
    };

    let report = pipeline.grade(&predictions, &store, date);
    print_accuracy(&report);
    Ok(())
}

fn run_all(pipeline: &Pipeline, date: NaiveDate, scope: MatchupScope) -> Result<()> {
    let pb = spinner("Running pipeline...")?;
    let summary = pipeline
        .run(date, scope)
        .with_context(|| format!("Pipeline run for {} failed", date))?;
    pb.finish_and_clear();

    println!("{}", "Pipeline complete".green().bold());
    println!("{}", "-".repeat(40));
    println!("Box scores:     {}", summary.box_scores);
    println!("Odds rows:      {}", summary.odds_rows);
    println!("Training rows:  {}", summary.training_rows);
    println!("Holdout acc.:   {:.3}", summary.holdout.accuracy);
    if summary.requested_date != summary.resolved_date {
        println!(
            "Date:           {} (requested {})",
            summary.resolved_date, summary.requested_date
        );
    } else {
        println!("Date:           {}", summary.resolved_date);
    }
    println!("Matchups:       {}", summary.matchups);
    println!("Value bets:     {}", summary.value_bets);
    println!();

    let path = pipeline.config().predictions_path();
    let predictions = data::load_predictions(&path)
        .with_context(|| format!("Failed to load predictions from {:?}", path))?;
    print_predictions(&predictions);
    Ok(())
}

fn list_teams(pipeline: &Pipeline) {
    println!(
        "{:<24} {:<6} {:<12} {}",
        "Team", "Abbr", "Nickname", "Aliases"
    );
    println!("{}", "-".repeat(70));
    let mut teams = pipeline.registry().teams().to_vec();
    teams.sort_by_key(|t| t.name);
    for team in teams {
        println!(
            "{:<24} {:<6} {:<12} {}",
            team.name,
            team.abbreviation,
            team.nickname,
            team.aliases.join(", ").dimmed()
        );
    }
}

fn print_predictions(predictions: &[Prediction]) {
    if predictions.is_empty() {
        println!("{}", "No predictions.".yellow());
        return;
    }

    let mut sorted: Vec<&Prediction> = predictions.iter().collect();
    sorted.sort_by(|a, b| b.yrfi_prob.total_cmp(&a.yrfi_prob));

    println!(
        "{:<10} {:<22} {:<22} {:>5} {:>7} {:<6} {:>7} {:<6}",
        "Date", "Away", "Home", "Total", "YRFI", "", "NRFI", ""
    );
    println!("{}", "-".repeat(94));

    for p in sorted {
        let yrfi = format!("{:>6.1}%", p.yrfi_prob * 100.0);
        let yrfi = if p.yrfi_prob >= 0.6 {
            yrfi.green()
        } else if p.yrfi_prob <= 0.4 {
            yrfi.red()
        } else {
            yrfi.normal()
        };
        println!(
            "{:<10} {:<22} {:<22} {:>5} {} {:<6} {:>6.1}% {:<6}",
            p.game_date,
            p.away_team,
            p.home_team,
            p.total.map(|t| format!("{:.1}", t)).unwrap_or_else(|| "-".to_string()),
            yrfi,
            p.yrfi_tier().fireballs(),
            p.nrfi_prob() * 100.0,
            p.nrfi_tier().fireballs()
        );
    }
}

fn print_value_bets(bets: &[ValueBet], top: usize) {
    if bets.is_empty() {
        println!("{}", "No value bets found.".yellow());
        return;
    }

    println!(
        "{:<10} {:<22} {:<22} {:<5} {:>7} {:>6} {:>7} {:>7}",
        "Date", "Away", "Home", "Side", "Model", "Odds", "Market", "EV"
    );
    println!("{}", "-".repeat(92));

    for bet in bets.iter().take(top) {
        println!(
            "{:<10} {:<22} {:<22} {:<5} {:>6.1}% {:>+6} {:>6.1}% {}",
            bet.game_date,
            bet.away_team,
            bet.home_team,
            bet.side,
            bet.model_prob * 100.0,
            bet.odds,
            bet.market_prob * 100.0,
            format!("{:>+7.3}", bet.model_ev).green()
        );
    }

    if bets.len() > top {
        println!("{}", format!("... and {} more", bets.len() - top).dimmed());
    }
}

fn print_summary(label: &str, summary: &AccuracySummary) {
    let accuracy = summary
        .accuracy()
        .map(|a| format!("{:.1}%", a * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "{:<12} {:>4} correct / {:>4} graded  {:>7}  ({} pending)",
        label,
        summary.correct,
        summary.graded(),
        accuracy.bold(),
        summary.pending
    );
}

fn print_accuracy(report: &AccuracyReport) {
    println!("{} {}", "Accuracy as of".yellow().bold(), report.date);
    println!("{}", "-".repeat(60));
    print_summary("Daily", &report.daily);
    print_summary("Cumulative", &report.cumulative);
    println!();

    if report.tiers.is_empty() {
        println!("{}", "No graded predictions yet.".dimmed());
        return;
    }

    println!("{}", "By YRFI tier".yellow().bold());
    println!(
        "{:<6} {:>14} {:>8} {:>10} {:>6} {:>9}",
        "Tier", "Daily", "Correct", "Incorrect", "Total", "Accuracy"
    );
    println!("{}", "-".repeat(58));
    for tier in &report.tiers {
        let daily = report
            .daily_tier(tier.tier)
            .map(|d| format!("{}/{} {:.0}%", d.correct, d.total, d.accuracy * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:>14} {:>8} {:>10} {:>6} {:>8.1}%",
            tier.tier.level(),
            daily,
            tier.correct,
            tier.incorrect,
            tier.total,
            tier.accuracy * 100.0
        );
    }
}

fn run_interactive(pipeline: &Pipeline) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();

    loop {
        let options = vec![
            "Run full pipeline",
            "Predict a date",
            "Value bets",
            "Accuracy dashboard",
            "List teams",
            "Quit",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 | 1 => {
                let date: NaiveDate = Input::with_theme(&theme)
                    .with_prompt("Game date (YYYY-MM-DD)")
                    .default(today())
                    .interact_text()?;

                let all_known = Select::with_theme(&theme)
                    .with_prompt("Which games?")
                    .items(&["Target date only", "All known games"])
                    .default(0)
                    .interact()?
                    == 1;

                println!();
                let result = if selection == 0 {
                    run_all(pipeline, date, scope(all_known))
                } else {
                    predict(pipeline, date, scope(all_known), false)
                };
                if let Err(e) = result {
                    println!("{} {:#}", "Error:".red(), e);
                }
                println!();
            }
            2 => {
                let min_ev: f64 = Input::with_theme(&theme)
                    .with_prompt("Minimum EV")
                    .default(pipeline.config().min_ev)
                    .interact_text()?;

                println!();
                if let Err(e) = value_bets(pipeline, Some(min_ev), 10) {
                    println!("{} {:#}", "Error:".red(), e);
                }
                println!();
            }
            3 => {
                let date: NaiveDate = Input::with_theme(&theme)
                    .with_prompt("Selected date (YYYY-MM-DD)")
                    .default(today())
                    .interact_text()?;

                println!();
                if let Err(e) = accuracy(pipeline, Some(date)) {
                    println!("{} {:#}", "Error:".red(), e);
                }
                println!();
            }
            4 => {
                println!();
                list_teams(pipeline);
                println!();
            }
            5 => {
                println!("Goodbye!");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
