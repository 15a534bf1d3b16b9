//! toolbox CLI

use anyhow::Context;
use clap::{CommandFactory, Parser};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use toolbox::cli::{Cli, Commands, FormArgs, OutputFormat};
use toolbox::config::Config;
use toolbox::content::{self, Catalog};
use toolbox::descriptor::ToolDescriptor;
use toolbox::{logic, plugin, render, style};
use toolbox::{FileHandle, FormState, RunResult, ToolRunner};

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load().context("failed to load config")?;
    if let Some(dir) = &cli.content_dir {
        config.content_dir = Some(PathBuf::from(dir));
    }

    match cli.command {
        Commands::Tools => {
            let catalog = load_catalog(&config).await?;
            match cli.output {
                OutputFormat::Json => {
                    let tools: Vec<Value> = catalog.list().iter()
                        .map(|t| json!({
                            "id": t.id,
                            "title": t.title,
                            "description": t.description,
                            "logic": t.logic,
                            "logicDescription": logic_description(t),
                        }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&tools)?);
                }
                OutputFormat::Text => {
                    for tool in catalog.list() {
                        println!("{}", style::tool_entry(&tool.id, &tool.title));
                    }
                }
            }
        }

        Commands::Describe { id } => {
            let catalog = load_catalog(&config).await?;
            let tool = find_tool(&catalog, &id)?;
            match cli.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(tool)?),
                OutputFormat::Text => print!("{}", describe(tool)),
            }
        }

        Commands::Run { id, form, use_output, rerun, rerun_with } => {
            let catalog = load_catalog(&config).await?;
            let tool = find_tool(&catalog, &id)?.clone();
            let save_dir = save_dir(&form, &config);
            let mut state = form_state(&tool, &form).await?;
            let runner = ToolRunner::new(tool);

            let result = runner.submit(&mut state).await;
            let mut report = json!({"result": result});
            if !emit(&runner, &result, cli.output, save_dir.as_deref()).await? {
                fail_with(&report, cli.output)?;
            }

            if let Some(output_id) = use_output {
                let value = result.outputs.get(&output_id).cloned().unwrap_or(Value::Null);
                let updated = state.use_as_input(runner.descriptor(), &output_id, &value);
                report["reverse"] = json!({"output": output_id, "input": updated, "values": state.values});
                if cli.output == OutputFormat::Text {
                    match &updated {
                        Some(input) => println!("{}", style::kv(&format!("{input} <-"), &output_id)),
                        None => println!("{}", style::dim(&format!("no reverse mapping for '{output_id}'"))),
                    }
                }

                if updated.is_some() && (rerun || !rerun_with.is_empty()) {
                    for (key, value) in rerun_with {
                        state.set(key, value);
                    }
                    let second = runner.submit(&mut state).await;
                    report["rerun"] = json!(second);
                    if !emit(&runner, &second, cli.output, save_dir.as_deref()).await? {
                        fail_with(&report, cli.output)?;
                    }
                }
            }

            if cli.output == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }

        Commands::Plugin { src, form } => {
            let timeout = Duration::from_secs(config.plugin_timeout_secs);
            let loaded = match plugin::load_plugin(src.as_deref(), timeout).await {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("{}", style::error_line(&e.to_string()));
                    std::process::exit(1);
                }
            };
            let save_dir = save_dir(&form, &config);
            let mut state = form_state(&loaded.descriptor, &form).await?;
            let runner = loaded.into_runner();

            let result = runner.submit(&mut state).await;
            let ok = emit(&runner, &result, cli.output, save_dir.as_deref()).await?;
            if cli.output == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            if !ok {
                std::process::exit(1);
            }
        }

        Commands::Validate { paths } => {
            let mut failed = 0;
            for path in &paths {
                match validate_path(Path::new(path)).await {
                    Ok(tools) => {
                        for tool in &tools {
                            println!("{} {}", style::color("ok", style::GREEN), tool.id);
                            let key = tool.logic.as_deref().unwrap_or_default();
                            if let Err(e) = logic::resolve(key) {
                                let known: Vec<&str> = logic::all_logic().iter().map(|m| m.name()).collect();
                                println!(
                                    "  {} {} (known: {})",
                                    style::color("warning:", style::YELLOW),
                                    e,
                                    known.join(", ")
                                );
                            }
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}", style::error_line(&e.to_string()));
                    }
                }
            }
            if failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Man { output_dir } => {
            let dir = Path::new(&output_dir);
            std::fs::create_dir_all(dir)?;
            let cmd = Cli::command();
            let mut buf = Vec::new();
            clap_mangen::Man::new(cmd.clone()).render(&mut buf)?;
            std::fs::write(dir.join("toolbox.1"), buf)?;
            for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
                let name: &'static str = format!("toolbox-{}", sub.get_name()).leak();
                let mut buf = Vec::new();
                clap_mangen::Man::new(sub.clone().name(name)).render(&mut buf)?;
                std::fs::write(dir.join(format!("{name}.1")), buf)?;
            }
            println!("Man pages written to {}", dir.display());
        }

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "toolbox", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::builtin()?;
    if let Some(dir) = &config.content_dir {
        catalog.merge(Catalog::load_dir(dir).await?)?;
    }
    Ok(catalog)
}

fn find_tool<'a>(catalog: &'a Catalog, id: &str) -> anyhow::Result<&'a ToolDescriptor> {
    catalog.get(id).with_context(|| {
        let known: Vec<&str> = catalog.list().iter().map(|t| t.id.as_str()).collect();
        format!("Unknown tool '{id}' (available: {})", known.join(", "))
    })
}

fn save_dir(form: &FormArgs, config: &Config) -> Option<PathBuf> {
    form.save_dir.as_ref().map(PathBuf::from).or_else(|| config.save_dir.clone())
}

async fn form_state(tool: &ToolDescriptor, form: &FormArgs) -> anyhow::Result<FormState> {
    let mut state = FormState::for_descriptor(tool);
    for (key, value) in &form.inputs {
        state.set(key.clone(), value.clone());
    }
    for (key, path) in &form.files {
        let file = FileHandle::open(path).await?;
        state.files.insert(key.clone(), file);
    }
    Ok(state)
}

async fn validate_path(path: &Path) -> anyhow::Result<Vec<ToolDescriptor>> {
    if path.is_dir() {
        let catalog = Catalog::load_dir(path).await?;
        if catalog.is_empty() {
            tracing::warn!(dir = %path.display(), "No *.json descriptors found");
        }
        Ok(catalog.list().to_vec())
    } else {
        Ok(vec![content::load_file(path).await?])
    }
}

/// Print the JSON report (if requested) and exit non-zero
fn fail_with(report: &Value, output: OutputFormat) -> anyhow::Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    std::process::exit(1);
}

/// Print one run in text mode and save downloads; returns whether it succeeded
async fn emit(runner: &ToolRunner, result: &RunResult, output: OutputFormat, save_dir: Option<&Path>) -> anyhow::Result<bool> {
    if !result.success {
        if output == OutputFormat::Text {
            eprintln!("{}", style::error_line(result.error.as_deref().unwrap_or_default()));
        }
        return Ok(false);
    }

    let fields = render::render_result(runner.descriptor(), &result.outputs);
    if output == OutputFormat::Text {
        print!("{}", render::to_text(&fields));
    }
    if let Some(dir) = save_dir {
        for path in render::save_downloads(&fields, dir).await? {
            if output == OutputFormat::Text {
                println!("{}", style::kv("saved", &path.display().to_string()));
            }
        }
    }
    Ok(true)
}

/// What the tool's logic module does, if its key resolves
fn logic_description(tool: &ToolDescriptor) -> Option<&'static str> {
    logic::resolve(tool.logic.as_deref()?).ok().map(|m| m.description())
}

fn describe(tool: &ToolDescriptor) -> String {
    let mut out = vec![style::bold(&tool.title), tool.description.clone(), String::new()];
    if let Some(key) = &tool.logic {
        let about = logic_description(tool).unwrap_or("unknown logic module");
        out.push(style::kv("logic", &format!("{key} - {about}")));
        out.push(String::new());
    }

    out.push(style::section("Inputs"));
    for input in &tool.inputs {
        let mut line = format!("{} ({}{})", input.label, input.kind, if input.required { ", required" } else { "" });
        if let Some(default) = &input.default_value {
            line.push_str(&format!(" default={}", default.as_form_value()));
        }
        if let (Some(min), Some(max)) = (input.min, input.max) {
            line.push_str(&format!(" range={min}..={max}"));
        }
        if !input.options.is_empty() {
            let options: Vec<&str> = input.options.iter().map(|o| o.value.as_str()).collect();
            line.push_str(&format!(" options=[{}]", options.join("|")));
        }
        if !input.accept.is_empty() {
            line.push_str(&format!(" accept={}", input.accept.join(",")));
        }
        out.push(style::kv(&input.id, &line));
    }

    out.push(style::section("Outputs"));
    for output in &tool.outputs {
        let mark = if tool.reversible && output.reversible { " [reversible]" } else { "" };
        out.push(style::kv(&output.id, &format!("{} ({}){}", output.label, output.kind, mark)));
    }

    if tool.reversible && !tool.reverse_mapping.is_empty() {
        out.push(style::section("Reverse mapping"));
        for mapping in &tool.reverse_mapping {
            out.push(style::kv(&mapping.from, &format!("{} {}", style::arrow(), mapping.to)));
        }
    }
    out.push(String::new());
    out.join("\n")
}
