//! asset-optimizer - 3D asset optimization pipeline
//!
//! Exports procedural geometry, compresses glTF models, transcodes textures
//! to KTX2 and runs the whole sequence with manifests and a report.

use anyhow::{Context, Result, bail};
use asset_optimizer::batch::FilePattern;
use asset_optimizer::compress::ModelCompressor;
use asset_optimizer::config::{
    AstcQuality, Bc7Quality, CompressOptions, ExportFormat, ExportOptions, PipelineOptions,
    TARGET_REDUCTION_PERCENT, TextureOptions,
};
use asset_optimizer::export::GeometryExporter;
use asset_optimizer::pipeline::PipelineOrchestrator;
use asset_optimizer::stats::{format_bytes, format_percent, reduction_percent, write_json};
use asset_optimizer::texture::{TextureTranscoder, generate_texture_manifest};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "asset-optimizer")]
#[command(about = "3D asset optimization pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the procedural geometry catalog to glTF/GLB
    Export {
        /// Output directory
        output_dir: PathBuf,

        /// Output container
        #[arg(long, value_enum, default_value = "glb")]
        format: ExportFormat,

        /// Include animations in export
        #[arg(long)]
        include_animations: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compress a glTF/GLB file or every model in a directory
    Compress {
        /// Input file or directory
        input: PathBuf,

        /// Output file or directory
        output: PathBuf,

        /// Disable Meshopt compression
        #[arg(long)]
        no_meshopt: bool,

        /// Disable Draco compression
        #[arg(long)]
        no_draco: bool,

        /// Disable KTX2 texture compression
        #[arg(long)]
        no_ktx2: bool,

        /// Quality level (0.0-1.0)
        #[arg(long, default_value_t = 0.8)]
        quality: f32,

        /// Compression level (0-10)
        #[arg(long, default_value_t = 6)]
        level: u8,

        /// Enable geometry simplification
        #[arg(long)]
        simplify: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Transcode an image or a directory of images to KTX2
    Textures {
        /// Input image or directory
        input: PathBuf,

        /// Output directory
        output_dir: PathBuf,

        /// ETC1S quality level (1-255)
        #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u8).range(1..))]
        quality: u8,

        /// ASTC quality
        #[arg(long, value_enum, default_value = "medium")]
        astc_quality: AstcQuality,

        /// BC7-slot quality
        #[arg(long, value_enum, default_value = "medium")]
        bc7_quality: Bc7Quality,

        /// Disable mipmap generation
        #[arg(long)]
        no_mipmaps: bool,

        /// Only generate the universal ETC1S format
        #[arg(long)]
        single_format: bool,

        /// Kill an encoder run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run export, compression, texture transcoding and reporting
    Optimize {
        /// Pipeline config file (TOML); flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input assets directory
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Temporary directory
        #[arg(long)]
        temp: Option<PathBuf>,

        /// Quality level (0.0-1.0)
        #[arg(long)]
        quality: Option<f32>,

        /// Disable Meshopt compression
        #[arg(long)]
        no_meshopt: bool,

        /// Disable KTX2 texture compression
        #[arg(long)]
        no_ktx2: bool,

        /// Enable Draco compression (alternative to Meshopt)
        #[arg(long)]
        enable_draco: bool,

        /// Don't clean temporary files
        #[arg(long)]
        keep_temp: bool,

        /// Disable verbose output
        #[arg(short, long)]
        quiet: bool,
    },
}

impl Commands {
    fn log_level(&self) -> Level {
        match self {
            Commands::Export { verbose, .. }
            | Commands::Compress { verbose, .. }
            | Commands::Textures { verbose, .. } => {
                if *verbose {
                    Level::DEBUG
                } else {
                    Level::INFO
                }
            }
            Commands::Optimize { quiet: true, .. } => Level::WARN,
            Commands::Optimize { .. } => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Initialize logging; stdout carries only the summaries
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.command.log_level().into()),
        )
        .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Export {
            output_dir,
            format,
            include_animations,
            verbose,
        } => {
            let exporter = GeometryExporter::new(ExportOptions {
                format,
                include_animations,
                verbose,
            });
            let outcome = exporter
                .export_all(&output_dir)
                .context("Export failed")?;

            let total: u64 = outcome.succeeded.iter().map(|r| r.size).sum();
            println!();
            println!("Export Summary:");
            println!("  Files exported: {}", outcome.succeeded.len());
            println!("  Total size: {}", format_bytes(total));
            println!("  Output directory: {}", output_dir.display());
            if verbose {
                println!();
                println!("File Details:");
                for record in &outcome.succeeded {
                    println!("  {}: {}", record.name, format_bytes(record.size));
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Compress {
            input,
            output,
            no_meshopt,
            no_draco,
            no_ktx2,
            quality,
            level,
            simplify,
            verbose,
        } => {
            let options = CompressOptions {
                enable_meshopt: !no_meshopt,
                enable_draco: !no_draco,
                enable_ktx2: !no_ktx2,
                enable_simplify: simplify,
                quality_level: quality,
                compression_level: level,
                verbose,
            };
            options.validate()?;
            compress(options, &input, &output)
        }

        Commands::Textures {
            input,
            output_dir,
            quality,
            astc_quality,
            bc7_quality,
            no_mipmaps,
            single_format,
            timeout,
            verbose,
        } => {
            let options = TextureOptions {
                quality,
                astc_quality,
                bc7_quality,
                enable_mipmaps: !no_mipmaps,
                enable_multiformat: !single_format,
                verbose,
                timeout: timeout.map(Duration::from_secs),
            };
            transcode(options, &input, &output_dir)
        }

        Commands::Optimize {
            config,
            input,
            output,
            temp,
            quality,
            no_meshopt,
            no_ktx2,
            enable_draco,
            keep_temp,
            quiet,
        } => {
            let mut options = match &config {
                Some(path) => PipelineOptions::load(path)?,
                None => PipelineOptions::default(),
            };
            if let Some(input) = input {
                options.input_dir = input;
            }
            if let Some(output) = output {
                options.output_dir = output;
            }
            if let Some(temp) = temp {
                options.temp_dir = temp;
            }
            if let Some(quality) = quality {
                options.quality = quality;
            }
            options.enable_meshopt &= !no_meshopt;
            options.enable_ktx2 &= !no_ktx2;
            options.enable_draco |= enable_draco;
            options.clean_temp &= !keep_temp;
            options.verbose &= !quiet;

            let report = PipelineOrchestrator::new(options)
                .optimize()
                .context("Optimization failed")?;

            if !report.summary.target_achieved {
                tracing::warn!(
                    "Target reduction of >={}% was not achieved.",
                    TARGET_REDUCTION_PERCENT
                );
                tracing::warn!(
                    "Consider adjusting quality settings or enabling additional compression options."
                );
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn compress(options: CompressOptions, input: &Path, output: &Path) -> Result<ExitCode> {
    let verbose = options.verbose;
    let compressor = ModelCompressor::new(options);

    let metadata = std::fs::metadata(input)
        .with_context(|| format!("Cannot read input {}", input.display()))?;
    let jobs = if metadata.is_dir() {
        compressor
            .process_directory(input, output, &FilePattern::models())
            .succeeded
    } else {
        vec![
            compressor
                .process_file(input, output)
                .with_context(|| format!("Failed to compress {}", input.display()))?,
        ]
    };

    let report = compressor.generate_report(&jobs);
    println!();
    println!("Compression Report:");
    println!("  Files processed: {}", report.summary.files_processed);
    println!("  Original size: {}", report.summary.original_size);
    println!("  Compressed size: {}", report.summary.compressed_size);
    println!("  Total reduction: {}", report.summary.total_reduction);
    println!("  Compression ratio: {}", report.summary.compression_ratio);
    if verbose && report.files.len() > 1 {
        println!();
        println!("File Details:");
        for file in &report.files {
            println!(
                "  {}: {} -> {} ({})",
                file.file, file.original_size, file.compressed_size, file.reduction
            );
        }
    }

    let report_dir = output.parent().unwrap_or(Path::new("."));
    let report_path = report_dir.join("compression-report.json");
    write_json(&report_path, &report)?;
    println!();
    println!("Report saved to: {}", report_path.display());
    Ok(ExitCode::SUCCESS)
}

fn transcode(options: TextureOptions, input: &Path, output_dir: &Path) -> Result<ExitCode> {
    let transcoder = TextureTranscoder::new(options);
    if !transcoder.check_dependencies() {
        return Ok(ExitCode::FAILURE);
    }

    let metadata = std::fs::metadata(input)
        .with_context(|| format!("Cannot read input {}", input.display()))?;
    let results = if metadata.is_dir() {
        transcoder
            .process_directory(input, output_dir, &FilePattern::images())
            .succeeded
    } else if FilePattern::images().matches(input) {
        vec![
            transcoder
                .convert_image(input, output_dir)
                .with_context(|| format!("Failed to convert {}", input.display()))?,
        ]
    } else {
        bail!("Unsupported image format: {}", input.display());
    };

    let manifest_path = output_dir.join("texture-manifest.json");
    write_json(
        &manifest_path,
        &generate_texture_manifest(&results, &manifest_path),
    )?;

    let original: u64 = results.iter().map(|r| r.original_size).sum();
    let compressed: u64 = results.iter().map(|r| r.compressed_size()).sum();
    println!();
    println!("KTX2 Conversion Report:");
    println!("  Files processed: {}", results.len());
    println!("  Original size: {}", format_bytes(original));
    println!("  Compressed size: {}", format_bytes(compressed));
    println!(
        "  Average reduction: {}",
        format_percent(reduction_percent(original, compressed))
    );
    println!("  Texture manifest: {}", manifest_path.display());
    Ok(ExitCode::SUCCESS)
}
