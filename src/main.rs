use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use log::info;

use robdd::bdd::{Bdd, BddConfig};
use robdd::dot::to_dot;
use robdd::program::decode;
use robdd::script::parse_script;

#[derive(Parser)]
#[command(author, version, about = "Compile boolean scripts to shared ROBDDs and count solutions")]
struct Cli {
    /// Input script
    script: PathBuf,

    /// Optional Graphviz output file
    output: Option<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Node table size in bits (2^bits slots)
    #[arg(long, default_value_t = 22)]
    table_bits: usize,

    /// Computed cache size in bits (2^bits slots)
    #[arg(long, default_value_t = 20)]
    cache_bits: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let source = fs::read_to_string(&cli.script)?;
    let program = match parse_script(&source) {
        Ok(program) => program,
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
    };

    let time_total = Instant::now();

    let config = BddConfig::default()
        .with_storage_bits(cli.table_bits)
        .with_cache_bits(cli.cache_bits)
        .with_threads(cli.threads);
    let bdd = Bdd::with_config(program.num_inputs(), config);
    info!(
        "compiling {} instructions over {} inputs on {} threads",
        program.instrs.len(),
        program.num_inputs(),
        bdd.num_threads()
    );

    let roots = decode(&bdd, &program);
    for (name, root) in &roots {
        println!("{}: {} solutions", name, bdd.solution_count(*root));
    }
    println!("Done in {:.3} s", time_total.elapsed().as_secs_f64());
    info!(
        "{} nodes, cache hits/misses: {}/{}",
        bdd.num_nodes(),
        bdd.cache().hits(),
        bdd.cache().misses()
    );

    if let Some(path) = &cli.output {
        let graph = to_dot(&bdd, &roots, &program.inputs, program.title.as_deref())?;
        fs::write(path, graph)?;
        info!("graph written to {}", path.display());
    }

    Ok(())
}
