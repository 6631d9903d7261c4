use clap::{Parser, ValueEnum};
use kasm_lib::{contig, reader, AssemblyConfig, Kmer, KmerBits, RunMode};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "kasm")]
#[command(version = "0.1.0")]
#[command(about = "Distributed contig assembly from k-mer fragments", long_about = None)]
struct Cli {
    /// Input file with one `<kmer> <bwd><fwd>` record per line
    input: PathBuf,

    /// Output behavior
    #[arg(value_enum, default_value = "silent")]
    mode: Mode,

    /// Number of ranks to run (one share-nothing worker thread each)
    #[arg(short = 'n', long, default_value_t = 1)]
    ranks: u32,

    /// Seed for the partition hash function
    #[arg(long, default_value_t = kasm_lib::constants::DEFAULT_SEED)]
    seed: u64,

    /// Slot-table over-provisioning relative to K/N (must be >= 1.2)
    #[arg(long, default_value_t = kasm_lib::constants::DEFAULT_RESERVE_FACTOR)]
    reserve_factor: f64,

    /// Send pool sizing as a fraction of K/N
    #[arg(long, default_value_t = kasm_lib::constants::DEFAULT_BUFFER_FACTOR)]
    buffer_factor: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Summary counters only
    Silent,
    /// Per-phase and per-rank diagnostics
    Verbose,
    /// Write test_<rank>.dat contig files
    Test,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Silent => RunMode::Silent,
            Mode::Verbose => RunMode::Verbose,
            Mode::Test => RunMode::Test,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = AssemblyConfig {
        input: cli.input.clone(),
        mode: cli.mode.into(),
        seed: cli.seed,
        reserve_factor: cli.reserve_factor,
        buffer_factor: cli.buffer_factor,
    };
    config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
    if cli.ranks == 0 {
        anyhow::bail!("rank count must be positive");
    }

    let k = reader::kmer_size(&config.input)?;
    kasm_lib::dispatch_on_k!(k, K => assemble_with_k::<K>(&config, cli.ranks))
}

fn assemble_with_k<const K: usize>(config: &AssemblyConfig, ranks: u32) -> anyhow::Result<()>
where
    Kmer<K>: KmerBits,
{
    if config.mode == RunMode::Verbose {
        config.print();
    }

    let reports = kasm_lib::run_threaded::<K>(config, ranks)?;

    if config.mode == RunMode::Test {
        for report in &reports {
            let path = format!("test_{}.dat", report.rank);
            contig::write_contigs(&path, &report.contigs)?;
            info!("Rank {} wrote {} contigs to {}", report.rank, report.contigs.len(), path);
        }
        return Ok(());
    }

    let total_contigs: usize = reports.iter().map(|r| r.contigs.len()).sum();
    let total_contig_kmers: u64 = reports.iter().map(|r| r.contig_kmers()).sum();
    let slowest = reports
        .iter()
        .map(|r| r.timings.total)
        .max()
        .unwrap_or_default();

    println!("Reconstructed {} contigs ({} k-mers) across {} ranks", total_contigs, total_contig_kmers, ranks);
    println!("Assembled in {:.3}s", slowest.as_secs_f64());

    if config.mode == RunMode::Verbose {
        for report in &reports {
            println!(
                "  rank {}: {} contigs, {} start nodes, {} local / {} remote inserts, {} lookups sent / {} served",
                report.rank,
                report.contigs.len(),
                report.walk_stats.cursors,
                report.insert_stats.local_inserts,
                report.insert_stats.remote_posts,
                report.walk_stats.lookup_reqs_sent,
                report.walk_stats.lookup_reqs_served,
            );
        }
    }

    Ok(())
}
