use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use vcc::partition::StageCert;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    Report,
    Plan,
    CostTree,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "vcc",
    version,
    about = "Vireo Compiler Collection — cost analysis and lane partitioning for .vio designs"
)]
struct Cli {
    /// Input .vio source file
    source: PathBuf,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Report)]
    emit: EmitStage,

    /// Number of execution lanes to partition onto
    #[arg(long, default_value_t = 2)]
    lanes: usize,

    /// Cost model overrides (JSON file)
    #[arg(long)]
    cost_model: Option<PathBuf>,

    /// Restrict cost-tree output to one process
    #[arg(long)]
    process: Option<String>,

    /// Print compiler phases and timing
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!("vcc: source = {}", cli.source.display());
        eprintln!("vcc: emit   = {:?}", cli.emit);
        eprintln!("vcc: lanes  = {}", cli.lanes);
    }

    // ── Load cost model ──
    let model = match &cli.cost_model {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("vcc: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            };
            match vcc::cost_model::CostModel::from_json_str(&text) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("vcc: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            }
        }
        None => vcc::cost_model::CostModel::default(),
    };

    // ── Read and parse source ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("vcc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    let t = Instant::now();
    let parse_result = vcc::parser::parse(&source);
    if !parse_result.errors.is_empty() {
        for err in &parse_result.errors {
            eprintln!("vcc: parse error: {}", err);
        }
        std::process::exit(1);
    }
    let ast = match parse_result.design {
        Some(d) => d,
        None => {
            eprintln!("vcc: parse failed with no output");
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!(
            "vcc: parse complete, {:.1}ms",
            t.elapsed().as_secs_f64() * 1000.0
        );
        eprintln!("vcc: parsed {} declarations", ast.decls.len());
    }

    // ── Lower to simulation IR ──
    let t = Instant::now();
    let lower_result = vcc::lower::lower(&ast);
    for diag in &lower_result.diagnostics {
        eprintln!("vcc: {}", diag);
    }
    let design = match lower_result.design {
        Some(d) => d,
        None => std::process::exit(1),
    };

    if cli.verbose {
        eprintln!(
            "vcc: lower complete, {:.1}ms",
            t.elapsed().as_secs_f64() * 1000.0
        );
        eprintln!(
            "vcc: lowered {} signals, {} routines, {} processes",
            design.signals.len(),
            design.funcs.len(),
            design.processes.len(),
        );
    }

    if let Some(name) = &cli.process {
        if !design.processes.iter().any(|p| &p.name == name) {
            eprintln!("vcc: error: no process named `{}`", name);
            std::process::exit(2);
        }
    }

    // ── Partition onto lanes ──
    let t = Instant::now();
    let partition_result = vcc::partition::partition(&design, &model, cli.lanes);
    for diag in &partition_result.diagnostics {
        eprintln!("vcc: {}", diag);
    }
    let plan = match partition_result.plan {
        Some(p) => p,
        None => std::process::exit(1),
    };

    if cli.verbose {
        eprintln!(
            "vcc: partition complete, {:.1}ms",
            t.elapsed().as_secs_f64() * 1000.0
        );
        if let Some(cert) = &partition_result.cert {
            for (name, ok) in cert.obligations() {
                eprintln!("vcc: cert {}: {}", name, if ok { "pass" } else { "FAIL" });
            }
        }
    }

    // ── Emit ──
    let text = match cli.emit {
        EmitStage::Report => {
            let report = vcc::report::build_report(&source, &design, &plan);
            vcc::report::render_text(&report)
        }
        EmitStage::Json => {
            let report = vcc::report::build_report(&source, &design, &plan);
            match serde_json::to_string_pretty(&report) {
                Ok(mut s) => {
                    s.push('\n');
                    s
                }
                Err(e) => {
                    eprintln!("vcc: error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        EmitStage::Plan => plan.to_string(),
        EmitStage::CostTree => {
            match vcc::report::render_cost_trees(&design, &model, cli.process.as_deref()) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("vcc: error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &text) {
                eprintln!("vcc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
        }
        None => print!("{}", text),
    }
}
