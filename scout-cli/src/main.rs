//! Scout CLI - Command-line interface for deterministic code search

use clap::{Parser, Subcommand};
use scout_core::{
    Config, ErrorEnvelope, SearchEngine, SearchRequest, SearchResult, StructuralAnalysis,
    StructuralAnalyzer, WalkOptions,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Deterministic code-structure search and analysis", long_about = None)]
struct Cli {
    /// Override project root detection
    #[arg(long, global = true, env = "SCOUT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .codescout.toml
    Init,

    /// Find the files most relevant to a free-text query
    Search {
        /// What to look for (e.g., "docker compose setup")
        query: String,

        /// Extra glob to include, relative to the root (repeatable)
        #[arg(long)]
        scope: Vec<String>,

        /// Override the configured result limit
        #[arg(long)]
        max_files: Option<usize>,

        /// Override the configured relevance threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Include file contents in the output
        #[arg(long)]
        content: bool,

        /// Skip structural analysis (text overlap only)
        #[arg(long)]
        no_structure: bool,

        /// Abort the search after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Show the structure extracted from one file
    Analyze {
        /// File to analyze
        file: PathBuf,
    },

    /// List dependencies declared by every manifest in the project
    Deps,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => cmd_init(cli.root),
        Commands::Search {
            query,
            scope,
            max_files,
            threshold,
            content,
            no_structure,
            timeout_ms,
        } => cmd_search(
            cli.root,
            SearchFlags {
                query,
                scope,
                max_files,
                threshold,
                content,
                no_structure,
                timeout_ms,
            },
            cli.json,
        ),
        Commands::Analyze { file } => cmd_analyze(&file, cli.json),
        Commands::Deps => cmd_deps(cli.root, cli.json),
    };

    if let Err(e) = result {
        if cli.json {
            let envelope = ErrorEnvelope::from(&e);
            match serde_json::to_string_pretty(&envelope) {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

struct SearchFlags {
    query: String,
    scope: Vec<String>,
    max_files: Option<usize>,
    threshold: Option<f64>,
    content: bool,
    no_structure: bool,
    timeout_ms: Option<u64>,
}

fn cmd_init(root: Option<PathBuf>) -> scout_core::Result<()> {
    use colored::Colorize;

    let project_root = detect_project_root(root)?;
    let path = Config::init(&project_root)?;

    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

fn cmd_search(root: Option<PathBuf>, flags: SearchFlags, json: bool) -> scout_core::Result<()> {
    let project_root = detect_project_root(root)?;
    let config = Config::load_for_project(&project_root)?;

    let mut request = SearchRequest::from_config(flags.query, &project_root, &config.search);
    if !flags.scope.is_empty() {
        request.scope = Some(flags.scope);
    }
    if let Some(max_files) = flags.max_files {
        request.max_files = max_files;
    }
    if let Some(threshold) = flags.threshold {
        request.relevance_threshold = threshold;
    }
    request.include_content = flags.content;
    request.enable_structural_analysis = !flags.no_structure;
    request.timeout = flags.timeout_ms.map(Duration::from_millis);

    let engine = SearchEngine::with_config(config);
    let result = engine.search(&request)?;
    print_search_result(&result, json)
}

/// Print search results in text or JSON format
fn print_search_result(result: &SearchResult, json: bool) -> scout_core::Result<()> {
    use colored::Colorize;

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    for m in &result.matches {
        let summary = m
            .summary
            .as_ref()
            .map(|s| {
                format!(
                    " [{}, {} fn, {} imports{}]",
                    s.language.as_str(),
                    s.function_count,
                    s.import_count,
                    if s.has_infrastructure { ", infra" } else { "" }
                )
            })
            .unwrap_or_default();
        println!("{:.1} {}{}", m.relevance, m.path.cyan(), summary.dimmed());
        if let Some(content) = &m.content {
            println!("{}", content);
            println!();
        }
    }

    if !result.intents.is_empty() {
        let intents: Vec<&str> = result.intents.iter().map(|i| i.as_str()).collect();
        println!("{}: {}", "Intents".yellow(), intents.join(", "));
    }
    println!(
        "({} matches of {} files, keywords: {}, {}ms)",
        result.matches.len(),
        result.total_files,
        result.keywords.join(" "),
        result.elapsed.as_millis()
    );
    Ok(())
}

fn cmd_analyze(file: &std::path::Path, json: bool) -> scout_core::Result<()> {
    use colored::Colorize;

    let analyzer = StructuralAnalyzer::with_default_backend();
    let analysis = analyzer.analyze_file(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let quality = match &analysis {
        StructuralAnalysis::Grammar(_) => "grammar",
        StructuralAnalysis::Fallback(_) => "fallback",
    };
    let structure = analysis.structure();
    println!(
        "{} ({}, {})",
        file.display().to_string().cyan(),
        structure.language.as_str(),
        quality
    );

    for import in &structure.imports {
        let origin = if import.is_external { "external" } else { "local" };
        println!(
            "{}: {} ({}) line {}",
            "import".blue(),
            import.module,
            origin,
            import.location.start_line
        );
    }
    for export in &structure.exports {
        let default = if export.is_default { " default" } else { "" };
        println!(
            "{}: {} {:?}{} line {}",
            "export".green(),
            export.name,
            export.kind,
            default,
            export.location.start_line
        );
    }
    for function in &structure.functions {
        let tag = if function.is_security_sensitive {
            " [security]".red().to_string()
        } else {
            String::new()
        };
        println!(
            "{}: {} lines {}-{}{}",
            "fn".magenta(),
            function.name,
            function.location.start_line,
            function.location.end_line,
            tag
        );
    }
    for class in &structure.classes {
        println!(
            "{}: {} {:?} lines {}-{}{}",
            "class".yellow(),
            class.name,
            class.kind,
            class.location.start_line,
            class.location.end_line,
            if class.exported { " (exported)" } else { "" }
        );
        if !class.methods.is_empty() {
            println!("  methods: {}", class.methods.join(", "));
        }
        if !class.properties.is_empty() {
            println!("  properties: {}", class.properties.join(", "));
        }
    }
    for resource in &structure.infrastructure {
        println!(
            "{}: {}/{}{} line {}",
            "infra".cyan(),
            resource.provider,
            resource.kind,
            resource
                .name
                .as_ref()
                .map(|n| format!(" {}", n))
                .unwrap_or_default(),
            resource.location.start_line
        );
    }
    Ok(())
}

fn cmd_deps(root: Option<PathBuf>, json: bool) -> scout_core::Result<()> {
    use colored::Colorize;

    let project_root = detect_project_root(root)?;
    let config = Config::load_for_project(&project_root)?;
    let analyzer = StructuralAnalyzer::fallback_only();
    let deps = analyzer.project_dependencies(&project_root, WalkOptions::from_config(&config))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&deps)?);
        return Ok(());
    }

    let mut current_source: Option<&str> = None;
    for dep in &deps {
        if current_source != Some(dep.source.as_str()) {
            println!("{}", dep.source.cyan());
            current_source = Some(dep.source.as_str());
        }
        println!("  {} {} ({:?})", dep.name, dep.version.dimmed(), dep.kind);
    }
    println!("({} dependencies)", deps.len());
    Ok(())
}

/// Walk up from the current directory looking for a config file or VCS root
fn detect_project_root(override_path: Option<PathBuf>) -> scout_core::Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    let mut current = std::env::current_dir()?;
    loop {
        if current.join(scout_core::config::CONFIG_FILE_NAME).exists()
            || current.join(".git").exists()
        {
            return Ok(current);
        }
        if !current.pop() {
            return Ok(std::env::current_dir()?);
        }
    }
}
