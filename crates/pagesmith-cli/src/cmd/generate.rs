use super::EngineArgs;
use crate::output::{print_json, print_list};
use anyhow::Context;
use clap::Args;
use pagesmith_core::{GenerationSource, Round, RoundContext};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Target directory for the generated site
    #[arg(long)]
    pub dir: PathBuf,

    /// Task identifier
    #[arg(long)]
    pub task: String,

    /// Round number (1 creates, 2+ updates in place)
    #[arg(long, default_value = "1")]
    pub round: u32,

    /// What the app should do
    #[arg(long)]
    pub brief: String,

    /// Acceptance check (repeatable)
    #[arg(long = "check")]
    pub checks: Vec<String>,

    /// Attachment name, path or data: URI (repeatable)
    #[arg(long = "attachment")]
    pub attachments: Vec<String>,

    /// Optional template hint passed through to the model
    #[arg(long)]
    pub template: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    let round = Round::new(args.round)?;
    let ctx = RoundContext::new(&args.task, round, &args.brief)
        .with_checks(args.checks)
        .with_attachments(args.attachments)
        .with_template(args.template);
    let generator = args.engine.generator()?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt
        .block_on(generator.generate(&ctx, &args.dir))
        .with_context(|| format!("round {round} failed for {}", args.dir.display()))?;

    if json {
        return print_json(&outcome);
    }

    let source = match outcome.source {
        GenerationSource::Llm => "model",
        GenerationSource::Fallback => "fallback",
    };
    println!(
        "Round {round} of '{}' generated by {source} after {} attempt(s) in {}",
        args.task,
        outcome.attempts,
        args.dir.display()
    );
    print_list("Files written", &outcome.files);
    Ok(())
}
