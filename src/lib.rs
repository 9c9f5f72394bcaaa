pub mod config;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod plugin;
pub mod preprocess;
pub mod registrar;
pub mod rewrite;
pub mod scanner;

pub use config::{NamespaceConfig, Options, SelectorProcessor, Source};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use extractor::{SelectorSet, extract};
pub use plugin::{Plugin, SelectorMap, register_variants};
pub use preprocess::{Preprocessor, Stylesheets};
pub use registrar::{EncodedVariant, VariantSink};

use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceArgs {
    pub config: Option<String>,
    pub source: Vec<String>,
    pub ignore: Vec<String>,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Variants {
        sources: SourceArgs,
    },
    Build {
        sources: SourceArgs,
        content: Vec<String>,
        out: Option<String>,
        minify: bool,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
}

impl From<Error> for CliError {
    fn from(err: Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Variants { sources } => run_variants(sources),
        Command::Build {
            sources,
            content,
            out,
            minify,
        } => run_build(sources, content, out, minify),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(cmd) = iter.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "variants" => parse_variants_args(iter.collect()),
        "build" => parse_build_args(iter.collect()),
        "-h" | "--help" | "help" => Ok(Command::Help),
        _ => Err(CliError {
            message: format!("unknown command: {}", cmd),
        }),
    }
}

fn parse_variants_args(args: Vec<String>) -> Result<Command, CliError> {
    let mut sources = SourceArgs::default();
    let mut idx = 0;

    while idx < args.len() {
        if !parse_source_flag(&args, &mut idx, &mut sources, "variants")? {
            return Err(CliError {
                message: format!("variants does not accept argument: {}", args[idx]),
            });
        }
        idx += 1;
    }

    Ok(Command::Variants { sources })
}

fn parse_build_args(args: Vec<String>) -> Result<Command, CliError> {
    let mut sources = SourceArgs::default();
    let mut content = Vec::new();
    let mut out = None;
    let mut minify = false;
    let mut idx = 0;

    while idx < args.len() {
        if parse_source_flag(&args, &mut idx, &mut sources, "build")? {
            idx += 1;
            continue;
        }
        match args[idx].as_str() {
            "--out" | "--output" | "-o" => {
                out = Some(flag_value(&args, &mut idx, "build", "--output")?);
            }
            "--minify" => {
                minify = true;
            }
            value => {
                content.push(value.to_string());
            }
        }
        idx += 1;
    }

    if content.is_empty() {
        return Err(CliError {
            message: "build requires at least one content path or glob pattern".to_string(),
        });
    }

    Ok(Command::Build {
        sources,
        content,
        out,
        minify,
    })
}

/// Consumes a flag shared by every command; `false` when `args[idx]` is not one.
fn parse_source_flag(
    args: &[String],
    idx: &mut usize,
    sources: &mut SourceArgs,
    command: &str,
) -> Result<bool, CliError> {
    match args[*idx].as_str() {
        "--config" | "-c" => sources.config = Some(flag_value(args, idx, command, "--config")?),
        "--source" | "-s" => sources.source.push(flag_value(args, idx, command, "--source")?),
        "--ignore" | "-I" => sources.ignore.push(flag_value(args, idx, command, "--ignore")?),
        "--prefix" | "-p" => sources.prefix = Some(flag_value(args, idx, command, "--prefix")?),
        "--namespace" | "-n" => {
            sources.namespace = Some(flag_value(args, idx, command, "--namespace")?)
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn flag_value(
    args: &[String],
    idx: &mut usize,
    command: &str,
    flag: &str,
) -> Result<String, CliError> {
    *idx += 1;
    args.get(*idx).cloned().ok_or_else(|| CliError {
        message: format!("{} requires a value for {}", command, flag),
    })
}

/// Config file first, then command-line overrides.
pub fn resolve_options(sources: &SourceArgs) -> Result<Options, CliError> {
    let mut options = match sources.config.as_deref() {
        Some(path) => config::load(Path::new(path))?,
        None => Options::default(),
    };
    if !sources.source.is_empty() {
        options.source = Source::Many(sources.source.clone());
    }
    options.ignore.extend(sources.ignore.iter().cloned());
    if let Some(prefix) = sources.prefix.as_ref() {
        options.prefix = prefix.clone();
    }
    if let Some(namespace) = sources.namespace.as_ref() {
        options.namespace = namespace.clone();
    }
    Ok(options)
}

fn run_variants(sources: SourceArgs) -> Result<(), CliError> {
    let options = resolve_options(&sources)?;
    let variants = Plugin::new(options).variants()?;
    for variant in &variants {
        println!(
            "{}\t{}\t{}",
            variant.name, variant.self_form, variant.descendant_form
        );
    }
    eprintln!("found {} variants", variants.len());
    Ok(())
}

fn run_build(
    sources: SourceArgs,
    content: Vec<String>,
    out: Option<String>,
    minify: bool,
) -> Result<(), CliError> {
    let options = resolve_options(&sources)?;
    let mut generator = generator::Generator::new(generator::GeneratorConfig {
        minify,
        colors: options.colors.clone(),
    });
    let registered = Plugin::new(options).apply(&mut generator)?;

    let mut content_ignore = Vec::new();
    if let Some(out_path) = out.as_ref() {
        content_ignore.push(out_path.clone());
    }
    let classes = scanner::scan_content(&content, &content_ignore, Path::new("."))?;
    let result = generator.generate(&classes);
    let mut css = String::from(result.css);
    if !minify && !css.is_empty() {
        css.push('\n');
    }

    if let Some(out_path) = out {
        fs::write(&out_path, css).map_err(|err| CliError {
            message: format!("failed to write output {}: {}", out_path, err),
        })?;
    } else {
        print!("{}", css);
    }

    eprintln!(
        "registered {} variants, generated {} of {} classes",
        registered,
        result.class_count,
        classes.len()
    );

    Ok(())
}

fn print_help() {
    println!("muuc");
    println!();
    println!("Developer commands for inspecting one variant pass. Hosts embed the");
    println!("library API (`muuc::Plugin`, `muuc::register_variants`) instead.");
    println!();
    println!("USAGE:");
    println!(
        "  muuc variants [--config <path>] [--source <glob>]... [--ignore <glob>]... [--prefix <p>] [--namespace <ns>]"
    );
    println!(
        "  muuc build [--config <path>] [--source <glob>]... [--ignore <glob>]... [--prefix <p>] [--namespace <ns>] [--minify] [--output <path>] <content-glob...>"
    );
    println!();
    println!("EXAMPLES:");
    println!("  muuc variants -s node_modules/element-plus/theme-chalk/el-input.css");
    println!(
        "  muuc variants -s \"theme-chalk/el-*.css\" -I \"**/el-var.css\" -n ep -p lui"
    );
    println!("  muuc build -c muuc.toml -o dist/variants.css \"src/**/*.{{html,vue}}\"");
}
