use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use vlm_bake::BakeConfig;

#[derive(Parser)]
#[command(name = "vlm-bake")]
#[command(about = "Render-group partitioning, lightmap pruning and UV nesting for baked tables", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress progress output (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Settings shared by every stage.
#[derive(Args)]
struct ProjectArgs {
    /// Project file; cached artifacts go to "{project} - Bakes" next to it
    #[arg(short, long)]
    project: PathBuf,

    /// Light render height in pixels
    #[arg(long, default_value = "4096")]
    render_height: u32,

    /// Render width over height
    #[arg(long, default_value = "0.5")]
    aspect_ratio: f32,

    /// Ignore cached masks and renders
    #[arg(long)]
    force: bool,
}

impl ProjectArgs {
    fn config(&self) -> BakeConfig {
        BakeConfig {
            project_path: Some(self.project.clone()),
            render_height: self.render_height,
            render_aspect_ratio: self.aspect_ratio,
            force: self.force,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Partition the OBJ files of a directory into render groups
    Groups {
        /// Directory of OBJ files (projected UVs as texture coordinates)
        input: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,

        /// Object mask height in pixels
        #[arg(long, default_value = "1024")]
        mask_height: u32,
    },
    /// Prune a lightmap mesh against cached renders of a scenario
    Prune {
        /// Input OBJ file
        input: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,

        /// Lighting scenario name
        #[arg(short, long)]
        scenario: String,

        /// Number of render groups
        #[arg(short, long, default_value = "1")]
        groups: usize,

        /// Influence threshold
        #[arg(long, default_value = "0.02")]
        threshold: f32,
    },
    /// Nest the UV islands of a directory of OBJ files onto nestmap pages
    Nest {
        /// Directory of OBJ files
        input: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,

        /// Nestmap page size in pixels
        #[arg(long, default_value = "4096")]
        tex_size: u32,

        /// Island padding in pixels
        #[arg(long, default_value = "3")]
        padding: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging (suppressed if --quiet)
    if !cli.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let result = match cli.command {
        Commands::Groups {
            input,
            project,
            mask_height,
        } => {
            let config = BakeConfig {
                mask_height,
                ..project.config()
            };
            vlm_bake::group_objects(&input, &config).map(|objects| {
                if !cli.quiet {
                    let groups = objects.iter().map(|o| o.render_group).max().unwrap_or(-1) + 1;
                    eprintln!(
                        "Success: {} objects in {} render groups",
                        objects.len(),
                        groups
                    );
                    for object in &objects {
                        eprintln!("  {} -> group {}", object.name, object.render_group);
                    }
                }
            })
        }
        Commands::Prune {
            input,
            project,
            scenario,
            groups,
            threshold,
        } => {
            let config = BakeConfig {
                lm_threshold: threshold,
                ..project.config()
            };
            vlm_bake::prune_mesh(&input, &scenario, groups, &config).map(|report| {
                if !cli.quiet {
                    match &report.output {
                        Some(path) => eprintln!(
                            "Success: {} kept {} of {} faces (hdr range {}) -> {}",
                            report.object.name,
                            report.outcome.kept,
                            report.outcome.kept + report.outcome.removed,
                            report.outcome.hdr_range,
                            path.display()
                        ),
                        None => eprintln!(
                            "Success: {} discarded (hdr range {})",
                            report.object.name, report.outcome.hdr_range
                        ),
                    }
                }
            })
        }
        Commands::Nest {
            input,
            project,
            tex_size,
            padding,
        } => {
            let config = BakeConfig {
                tex_size,
                nest_padding: padding,
                ..project.config()
            };
            vlm_bake::nest_objects(&input, &config).map(|(objects, outcome)| {
                if !cli.quiet {
                    eprintln!(
                        "Success: {} objects nested on {} pages ({} split)",
                        objects.len(),
                        outcome.page_count(),
                        outcome.splits.len()
                    );
                }
            })
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
