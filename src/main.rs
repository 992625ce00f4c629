use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sitebake::config::{
	Assignment, LayerSource, LoadedProject, PROJECT_FILE_NAME, SetPolicy, discover_project,
	load_layers, merge_layers, project_layers, render_layer, set_layer_values,
};
use sitebake::logging::init_logging;
use sitebake::pipeline::BuildPipeline;
use sitebake::substitute::{check_references, count_references};

#[derive(Parser)]
#[command(name = "sitebake")]
#[command(
	author,
	version,
	about = "Build a deployable site tree from templates and layered TOML configuration"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Run as if started in DIR
	#[arg(short = 'C', long, value_name = "DIR", global = true)]
	project_dir: Option<PathBuf>,

	/// Increase log verbosity (-v, -vv, -vvv)
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,

	/// Only log errors
	#[arg(short, long, global = true)]
	quiet: bool,
}

#[derive(Args)]
struct LayerArgs {
	/// Layer files, lowest priority first (replaces the project's layers)
	#[arg(short = 'f', long = "config-files", value_name = "FILE", num_args = 1..)]
	config_files: Vec<PathBuf>,

	/// Skip layer files that don't exist instead of failing
	#[arg(long)]
	skip_missing: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Assemble the build tree and substitute placeholders
	Build {
		/// Delete the build tree first
		#[arg(long)]
		clean: bool,

		#[command(flatten)]
		layers: LayerArgs,
	},
	/// Count placeholder references per key in the source and static trees
	Refs {
		/// Scan the build tree instead
		#[arg(long)]
		build: bool,
	},
	/// Report placeholders in the source and static trees that the layers can't resolve
	Check {
		#[command(flatten)]
		layers: LayerArgs,
	},
	/// Layer file commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
	/// Create a template .sitebake.toml in the current directory
	Init {
		/// Overwrite an existing .sitebake.toml
		#[arg(long)]
		force: bool,
	},
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the merged configuration and the layers it came from
	Show {
		#[command(flatten)]
		layers: LayerArgs,
	},
	/// Set dotted keys in a layer file, keeping its other values
	Set {
		/// Layer file to update (created if missing)
		file: PathBuf,

		#[arg(required = true, value_name = "KEY=VALUE")]
		assignments: Vec<String>,

		/// Store true/false as booleans and whole numbers as integers
		#[arg(long)]
		typed: bool,

		/// Replace values that are in the way of a nested key
		#[arg(long)]
		coerce: bool,
	},
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = init_logging(cli.verbose, cli.quiet) {
		eprintln!("warning: {e}");
	}

	match run(cli) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run(cli: Cli) -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let start_dir = match cli.project_dir {
		Some(dir) => cwd.join(dir),
		None => cwd,
	};

	match cli.command {
		Commands::Build { clean, layers } => handle_build(&start_dir, clean, &layers),
		Commands::Refs { build } => handle_refs(&start_dir, build),
		Commands::Check { layers } => handle_check(&start_dir, &layers),
		Commands::Config { action } => match action {
			ConfigAction::Show { layers } => handle_config_show(&start_dir, &layers),
			ConfigAction::Set {
				file,
				assignments,
				typed,
				coerce,
			} => handle_config_set(&start_dir, &file, &assignments, typed, coerce),
		},
		Commands::Init { force } => handle_init(&start_dir, force),
	}
}

fn load_project(start_dir: &Path) -> Result<LoadedProject> {
	discover_project(start_dir).context("Failed to load project configuration")
}

/// CLI layers replace the project's layers and resolve against the start directory.
fn resolve_layers(start_dir: &Path, project: &LoadedProject, args: &LayerArgs) -> Vec<LayerSource> {
	let mut sources = if args.config_files.is_empty() {
		project_layers(project)
	} else {
		args.config_files
			.iter()
			.map(|path| LayerSource::required(start_dir.join(path)))
			.collect()
	};

	if args.skip_missing {
		for source in &mut sources {
			source.required = false;
		}
	}

	sources
}

fn handle_build(start_dir: &Path, clean: bool, args: &LayerArgs) -> Result<ExitCode> {
	let project = load_project(start_dir)?;
	let pipeline = BuildPipeline::from_project(&project).context("Invalid project configuration")?;
	let layers = resolve_layers(start_dir, &project, args);

	let report = pipeline.run(&layers, clean).context("Build failed")?;

	println!(
		"Built {} ({} files copied, {} layers, {} placeholders in {} files)",
		pipeline.paths().build.display(),
		report.assembly.files_copied,
		report.layers,
		report.substitution.substitutions,
		report.substitution.files_rewritten,
	);
	Ok(ExitCode::SUCCESS)
}

fn handle_refs(start_dir: &Path, build: bool) -> Result<ExitCode> {
	let project = load_project(start_dir)?;
	let config = &project.config;
	let paths = config.site_paths(&project.root);
	let roots: Vec<&Path> = if build {
		vec![paths.build.as_path()]
	} else {
		paths.inputs().to_vec()
	};
	let syntax = config.syntax().context("Invalid placeholder marker")?;

	let counts = count_references(&roots, &config.extensions(), &syntax)
		.with_context(|| format!("Failed to scan {}", describe(&roots)))?;

	if counts.is_empty() {
		println!("No placeholders found in {}", describe(&roots));
		return Ok(ExitCode::SUCCESS);
	}

	for (key, count) in &counts {
		println!("{count:>5}  {key}");
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_check(start_dir: &Path, args: &LayerArgs) -> Result<ExitCode> {
	let project = load_project(start_dir)?;
	let config = &project.config;
	let paths = config.site_paths(&project.root);
	let syntax = config.syntax().context("Invalid placeholder marker")?;

	let layers = load_layers(&resolve_layers(start_dir, &project, args))
		.context("Failed to load configuration layers")?;
	let merged = merge_layers(layers.into_iter().map(|layer| layer.document));

	let roots = paths.inputs();
	let unresolved = check_references(&roots, &config.extensions(), &syntax, &merged)
		.with_context(|| format!("Failed to scan {}", describe(&roots)))?;

	if unresolved.is_empty() {
		println!("All placeholders in {} resolve", describe(&roots));
		return Ok(ExitCode::SUCCESS);
	}

	for reference in &unresolved {
		println!(
			"{}:{}: {} ({})",
			reference.file.display(),
			reference.offset,
			reference.key,
			reference.reason
		);
	}
	eprintln!("{} unresolved placeholder(s)", unresolved.len());
	Ok(ExitCode::FAILURE)
}

fn describe(roots: &[&Path]) -> String {
	roots
		.iter()
		.map(|root| root.display().to_string())
		.collect::<Vec<_>>()
		.join(" and ")
}

fn handle_config_show(start_dir: &Path, args: &LayerArgs) -> Result<ExitCode> {
	let project = load_project(start_dir)?;
	let layers = load_layers(&resolve_layers(start_dir, &project, args))
		.context("Failed to load configuration layers")?;

	if layers.is_empty() {
		println!("No configuration layers found.");
		return Ok(ExitCode::SUCCESS);
	}

	println!("# Layers (lowest priority first):");
	for layer in &layers {
		println!("#   {}", layer.path.display());
	}
	println!();

	let merged = merge_layers(layers.into_iter().map(|layer| layer.document));
	let rendered =
		render_layer(&merged, Path::new("<merged>")).context("Failed to render configuration")?;
	print!("{rendered}");

	Ok(ExitCode::SUCCESS)
}

fn handle_config_set(
	start_dir: &Path,
	file: &Path,
	raw_assignments: &[String],
	typed: bool,
	coerce: bool,
) -> Result<ExitCode> {
	let project = load_project(start_dir)?;
	let policy = if coerce {
		SetPolicy::Coerce
	} else {
		project.config.set_policy.into()
	};

	let assignments = raw_assignments
		.iter()
		.map(|raw| {
			Assignment::parse(raw, typed).with_context(|| format!("Invalid assignment: {raw}"))
		})
		.collect::<Result<Vec<_>>>()?;

	let path = start_dir.join(file);
	set_layer_values(&path, &assignments, policy)
		.with_context(|| format!("Failed to update {}", path.display()))?;

	println!("Updated {} ({} keys)", path.display(), assignments.len());
	Ok(ExitCode::SUCCESS)
}

fn handle_init(start_dir: &Path, force: bool) -> Result<ExitCode> {
	let project_path = start_dir.join(PROJECT_FILE_NAME);

	if project_path.exists() && !force {
		anyhow::bail!("{PROJECT_FILE_NAME} already exists. Use --force to overwrite.");
	}

	std::fs::write(&project_path, generate_init_template())
		.with_context(|| format!("Failed to write {}", project_path.display()))?;

	println!("Created {PROJECT_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

fn generate_init_template() -> &'static str {
	r#"# sitebake project file. Paths are relative to this directory.

source-dir = "website_source"
static-dir = "static_files"
build-dir = "website_build"
static-subpath = "site/static"

# Placeholders look like (TOKENMARK(appearance.primary_color))
marker = "TOKENMARK"

# Extra extensions to scan, on top of the built-in list
extensions = []

# What to do when a value itself contains a placeholder:
# "reject", "literal" or "recursive" (bounded by max-depth)
expansion = "reject"
max-depth = 8

# "strict" refuses to replace a value with a table in `config set`
set-policy = "strict"

# Lowest priority first
layers = [
    "config.toml",
    { path = "server_secrets.toml", required = false },
]
"#
}
