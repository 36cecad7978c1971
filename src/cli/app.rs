use super::input::{read_edits, read_entities, read_json};
use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use sitetrack::{
    ActualsGrid, ActualsSchema, CellValue, EntityKind, GridConfig, RawActuals, RecordingSink,
    normalize, sanitize,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "sitetrack",
    version,
    about = "Reconcile planned vs. actual values of projects, tasks and activities"
)]
pub struct Cli {
    /// JSON config file; `SITETRACK_*` variables are used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print rows with derived durations, remaining days and variances
    Report(ReportArgs),
    /// Sanitize one raw actuals object into an update payload
    Sanitize(SanitizeArgs),
    /// Load entities, apply an edit script and commit into a dry-run sink
    Replay(ReplayArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Project,
    Task,
    Activity,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Project => EntityKind::Project,
            KindArg::Task => EntityKind::Task,
            KindArg::Activity => EntityKind::Activity,
        }
    }
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// JSON array of entities
    #[arg(long)]
    input: PathBuf,

    #[arg(long, value_enum, default_value = "task")]
    kind: KindArg,

    /// Reference time for remaining days (defaults to the current time)
    #[arg(long)]
    now: Option<String>,
}

#[derive(Args, Debug)]
struct SanitizeArgs {
    /// JSON object with raw actuals
    #[arg(long)]
    input: PathBuf,

    #[arg(long, value_enum, default_value = "task")]
    kind: KindArg,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// JSON array of entities
    #[arg(long)]
    input: PathBuf,

    /// JSON array of `{ "row_id", "field", "value" }` edits
    #[arg(long)]
    edits: PathBuf,

    #[arg(long, value_enum, default_value = "task")]
    kind: KindArg,

    /// Row ids the dry-run sink rejects
    #[arg(long = "fail")]
    fail: Vec<String>,

    #[arg(long)]
    now: Option<String>,
}

pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load_config()?;
        let output = match self.cli.command {
            Command::Report(args) => report(config, args)?,
            Command::Sanitize(args) => sanitize_file(args)?,
            Command::Replay(args) => replay(config, args).await?,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn load_config(&self) -> anyhow::Result<GridConfig> {
        match &self.cli.config {
            Some(path) => GridConfig::from_json_file(path)
                .with_context(|| format!("load config from '{}'", path.display())),
            None => GridConfig::from_env().context("read SITETRACK_* environment"),
        }
    }
}

fn parse_now(raw: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => match CellValue::from(raw).as_datetime() {
            Some(now) => Ok(now),
            None => bail!("invalid --now '{raw}'"),
        },
    }
}

fn report(config: GridConfig, args: ReportArgs) -> anyhow::Result<serde_json::Value> {
    let now = parse_now(args.now.as_deref())?;
    let schema = ActualsSchema::for_kind(args.kind.into());
    let mut grid = ActualsGrid::with_config(schema, config, RecordingSink::new())?;
    grid.load(read_entities(&args.input)?);
    Ok(serde_json::to_value(grid.view(now))?)
}

fn sanitize_file(args: SanitizeArgs) -> anyhow::Result<serde_json::Value> {
    let schema = ActualsSchema::for_kind(args.kind.into());
    let raw: RawActuals = read_json(&args.input)?;
    let payload = sanitize(&schema, &normalize(&schema, Some(&raw)));
    Ok(payload.into_json())
}

async fn replay(config: GridConfig, args: ReplayArgs) -> anyhow::Result<serde_json::Value> {
    let now = parse_now(args.now.as_deref())?;
    let schema = ActualsSchema::for_kind(args.kind.into());
    let sink = args
        .fail
        .iter()
        .fold(RecordingSink::new(), |sink, id| sink.failing_on(id.as_str()));

    let mut grid = ActualsGrid::with_config(schema, config, sink)?;
    grid.load(read_entities(&args.input)?);
    let applied = grid.apply_edits(read_edits(&args.edits)?)?;
    info!(applied, dirty = grid.dirty_count(), "edit script applied");

    let report = grid.commit().await;
    Ok(json!({
        "requests": grid.sink().requests(),
        "report": report,
        "rows": grid.view(now),
    }))
}
