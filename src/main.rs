extern crate mswh;

use clap::Parser;
use mswh::output::FileOutput;
use mswh::run_project;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct MswhArgs {
    input_file: String,
    /// Directory for the result files, defaulting to the directory of the input file
    #[arg(long, short)]
    output_dir: Option<String>,
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = MswhArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let input_path = Path::new(args.input_file.as_str());
    let input_file_stem = input_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("mswh");
    let output_dir = match args.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let output = FileOutput::new(output_dir, format!("{input_file_stem}_{{}}.csv"));

    info!("running project from {}", args.input_file);
    match run_project(BufReader::new(File::open(input_path)?), &output) {
        Ok(results) => {
            info!(
                "{} project simulated, solar fraction {:.3}",
                results.archetype, results.project.solar_fraction
            );
            Ok(())
        }
        Err(err) => {
            error!("{err}");
            Err(err.into())
        }
    }
}
