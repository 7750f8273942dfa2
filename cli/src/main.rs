use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::Report;

use adl_lang::backend::astgen::AstGen;
use adl_lang::backend::CodeGen;
use adl_lang::passes::{LoadedAdl, LoaderOptions, ModuleLoader};
use adl_lang::writer::FileWriter;

#[derive(Parser)]
#[command(name = "adlc")]
#[command(about = "Compiler for the Algebraic Data Language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CompileArgs {
    /// Add a directory to the module search path
    #[arg(short = 'I', long = "searchdir", value_name = "DIR")]
    search_dir: Vec<PathBuf>,

    /// Merge annotations from sidecar files with this extension (repeatable)
    #[arg(long = "merge-adlext", value_name = "EXT")]
    merge_adlext: Vec<String>,

    /// Print progress information to stderr
    #[arg(long)]
    verbose: bool,

    /// ADL source files to compile
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, resolve and check modules without generating output
    Check {
        #[command(flatten)]
        args: CompileArgs,
    },
    /// Write the resolved AST of each module as JSON
    Ast {
        #[command(flatten)]
        args: CompileArgs,

        /// Root directory for generated files
        #[arg(short = 'O', long = "outputdir", value_name = "DIR")]
        output_dir: PathBuf,

        /// Skip rewriting output files whose content is unchanged
        #[arg(long = "no-overwrite")]
        no_overwrite: bool,

        /// Write a manifest of generated files to this path
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { args } => {
            let adl = load(&args);
            if args.verbose {
                eprintln!("checked {} module(s)", adl.modules.len());
            }
        }
        Commands::Ast {
            args,
            output_dir,
            no_overwrite,
            manifest,
        } => {
            let adl = load(&args);
            let mut writer = FileWriter::new(&output_dir)
                .with_no_overwrite(no_overwrite)
                .with_manifest(manifest);
            AstGen
                .generate(&adl, &mut writer)
                .map_err(|e| Report::msg(e.render(&adl.sources)))?;
            if args.verbose {
                eprintln!("wrote {} file(s) under {}", writer.manifest().len(), output_dir.display());
            }
            writer
                .close()
                .map_err(|e| Report::msg(e.render(&adl.sources)))?;
        }
    }

    Ok(())
}

/// Load every root file; the first error is printed as a single diagnostic
/// line and terminates the process.
fn load(args: &CompileArgs) -> LoadedAdl {
    let options = LoaderOptions {
        search_path: args.search_dir.clone(),
        merge_exts: args.merge_adlext.clone(),
    };
    let mut loader = ModuleLoader::new(options);

    for file in &args.files {
        if args.verbose {
            eprintln!("loading {}", file.display());
        }
        if let Err(err) = loader.load_root_file(file) {
            fail(&err.render(loader.sources()));
        }
    }

    let adl = loader.into_loaded();
    for warning in &adl.warnings {
        eprintln!("warning: {}", warning.message);
    }
    adl
}

fn fail(diagnostic: &str) -> ! {
    eprintln!("{}", diagnostic);
    std::process::exit(1);
}
