use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use voice_clip_leveler::{
    Deployer, OutputFormat, ProjectConfig, SymphoniaCodec, analyze_folder, configure_thread_pool,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML project file with analysis, deploy and character gain settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// number of threads to use, default to CPU core count
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report per-character safe gain ceilings without writing audio.
    ///
    /// Undecodable clips are logged and left out of the profiles; they do
    /// not change the exit status.
    Analyze {
        /// directory of source clips
        input: PathBuf,

        /// character the other ceilings are expressed relative to
        #[arg(short, long)]
        reference: Option<String>,

        /// safe gain in dB assumed for silent clips
        #[arg(long)]
        max_gain_db: Option<f64>,
    },
    /// Apply character gains and write converted clips
    Deploy {
        /// directory of source clips
        input: PathBuf,

        /// destination directory, created if absent
        output: PathBuf,

        /// re-render clips whose output already exists
        #[arg(long)]
        overwrite: bool,

        /// output sample rate in Hz
        #[arg(short, long)]
        sample_rate: Option<u32>,

        /// keep the source channel layout instead of downmixing to mono
        #[arg(long)]
        stereo: bool,

        /// output format: wav, ogg or mp3
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },
}

fn main() -> Result<()> {
    _ = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .parse_filters("symphonia=error")
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            ProjectConfig::load(path)?
        }
        None => ProjectConfig::default(),
    };
    configure_thread_pool(cli.threads);

    match cli.command {
        Command::Analyze {
            input,
            reference,
            max_gain_db,
        } => {
            let mut options = config.analysis_options(input);
            if reference.is_some() {
                options.reference = reference;
            }
            if let Some(db) = max_gain_db {
                options.max_gain_db = db;
            }

            info!("Starting analysis with options:");
            info!("  Input Directory: {:?}", options.input_dir);
            match &options.reference {
                Some(r) => info!("  Reference Character: {}", r),
                None => info!("  Reference Character: none"),
            }
            info!("  Silent Clip Gain Cap: {:.1} dB", options.max_gain_db);
            info!("---");

            let report = analyze_folder(&options, &SymphoniaCodec).context("Analysis failed")?;
            report.log_summary();
            for (path, reason) in &report.failures {
                warn!("Skipped undecodable {:?}: {}", path, reason);
            }
            Ok(())
        }
        Command::Deploy {
            input,
            output,
            overwrite,
            sample_rate,
            stereo,
            format,
        } => {
            let mut options = config.deploy_options(input, output);
            options.overwrite |= overwrite;
            if let Some(rate) = sample_rate {
                options.sample_rate = rate;
            }
            if stereo {
                options.mono = false;
            }
            if let Some(format) = format {
                options.format = format;
            }

            info!("Starting deployment with options:");
            info!("  Input Directory: {:?}", options.input_dir);
            info!("  Output Directory: {:?}", options.output_dir);
            info!("  Overwrite: {}", options.overwrite);
            info!("  Sample Rate: {} Hz", options.sample_rate);
            info!("  Mono: {}", options.mono);
            info!("  Format: {}", options.format);
            info!("  Character Entries: {}", config.characters.len());
            info!("---");

            let deployer = Deployer::new(options, config.characters, SymphoniaCodec);
            let report = deployer.run()?;
            match report.ensure_success() {
                Ok(()) => {
                    info!("Deployment finished successfully!");
                    Ok(())
                }
                Err(e) => {
                    error!("Deployment failed: {}", e);
                    for (path, reason) in report.failures() {
                        error!("  {:?}: {}", path, reason);
                    }
                    Err(e)?
                }
            }
        }
    }
}
