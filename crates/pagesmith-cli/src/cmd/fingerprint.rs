use crate::output::{print_json, print_list};
use clap::Args;
use pagesmith_core::DesignFingerprint;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Site directory to inspect
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

pub fn run(args: FingerprintArgs, json: bool) -> anyhow::Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("{} is not a directory", args.dir.display());
    }
    let fp = DesignFingerprint::extract(&args.dir);

    if json {
        return print_json(&fp);
    }
    if fp.is_empty() {
        println!("No design tokens found in {}", args.dir.display());
        return Ok(());
    }
    print_list("Colors", &fp.colors);
    print_list("CSS variables", &fp.css_vars);
    print_list("Element ids", &fp.ids);
    print_list("Functions", &fp.functions);
    print_list("Endpoints", &fp.endpoints);
    Ok(())
}
