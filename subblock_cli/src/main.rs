use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use serde::Serialize;

use subblock_codecs::Algorithm;
use subblock_core::{
    BlockCodec, Body, Compression, CompressionOptions, Contents, PerformanceReport, Reader, Writer,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "subblock",
    about = "Parallel block compression: compress, decompress, inspect, and benchmark subblock containers",
    version
)]
struct Cli {
    /// Log engine decisions to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a subblock container
    Compress {
        /// Source file to compress ("-" reads stdin)
        input: PathBuf,
        /// Destination container
        output: PathBuf,
        /// Algorithm: deflate | lz4 | lz4hc | zstd
        #[arg(short, long, default_value = "deflate")]
        algorithm: String,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Restore the original bytes from a container
    Decompress {
        /// Source container
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Print header metadata and subblock table statistics
    Inspect {
        /// Container to inspect
        file: PathBuf,
        /// Print per-subblock details
        #[arg(long)]
        subblocks: bool,
    },
    /// Compress and uncompress a file in memory with every algorithm
    Bench {
        /// File to benchmark
        file: PathBuf,
        /// Print the results as JSON instead of a table
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        tuning: Tuning,
    },
}

/// Options shared by `compress` and `bench`. Flags override `--config`.
#[derive(clap::Args)]
struct Tuning {
    /// JSON file with compression options
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compression level (0 or out of range selects the algorithm default)
    #[arg(short, long)]
    level: Option<i32>,
    /// Bytes per subblock (out of range selects the largest block)
    #[arg(short, long)]
    subblock_size: Option<u64>,
    /// Shuffle stride in bytes, e.g. 4 for f32 data (1..=128)
    #[arg(short, long)]
    item_size: Option<u32>,
    /// Disable byte shuffling
    #[arg(long)]
    no_shuffle: bool,
    /// Disable per-subblock checksums
    #[arg(long)]
    no_checksums: bool,
    /// Worker threads (1 disables parallelism)
    #[arg(short, long)]
    threads: Option<u32>,
}

impl Tuning {
    fn options(&self) -> anyhow::Result<CompressionOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {:?}", path))?;
                serde_json::from_str(&text).with_context(|| format!("parsing config file {:?}", path))?
            }
            None => CompressionOptions::default(),
        };

        if let Some(level) = self.level {
            options = options.with_level(level);
        }
        if let Some(size) = self.subblock_size {
            options = options.with_subblock_size(size);
        }
        if let Some(item_size) = self.item_size {
            options = options.with_item_size(item_size);
        }
        if self.no_shuffle {
            options = options.with_shuffle(false);
        }
        if self.no_checksums {
            options = options.with_checksums(false);
        }
        if let Some(threads) = self.threads {
            options = options.with_parallel(threads > 1, threads);
        }
        Ok(options)
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.to_str() == Some("-") {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path).with_context(|| format!("reading input file {:?}", path))
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    let _ = builder.try_init();
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: PathBuf, algorithm: &str, tuning: &Tuning) -> anyhow::Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let options = tuning.options()?;
    let raw = read_input(&input)?;

    let engine = Compression::new(algorithm, options.clone());
    let t0 = Instant::now();
    let (subblocks, report) = engine.compress_with_report(&raw)?;

    let body = if subblocks.is_empty() {
        if !raw.is_empty() {
            warn!("{} did not reduce {:?}; storing it verbatim", algorithm, input);
        }
        Body::Verbatim(&raw)
    } else {
        Body::Subblocks(&subblocks)
    };
    let header = body.header(algorithm.id(), &options);

    let written = Writer::create(&output)
        .with_context(|| format!("creating output file {:?}", output))?
        .finish(&header, body)?;
    let elapsed = t0.elapsed();
    info!("wrote {} bytes to {:?}", written, output);

    eprintln!("  algorithm   : {}", algorithm);
    eprintln!("  subblocks   : {}", subblocks.len());
    eprintln!("  threads     : {}", report.threads_used);
    eprintln!("  raw size    : {}", human_bytes(raw.len() as u64));
    eprintln!("  container   : {}", human_bytes(written));
    eprintln!("  reduction   : {:.2}%", report.size_reduction * 100.0);
    eprintln!("  throughput  : {:.1} MiB/s", report.throughput_mib_s);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let reader = Reader::open(&input).with_context(|| format!("opening container {:?}", input))?;
    let algorithm = Algorithm::from_id(reader.header().algorithm)?;
    let engine = Compression::new(algorithm, reader.options());

    let t0 = Instant::now();
    let raw = match reader.read_contents()? {
        Contents::Verbatim(raw) => raw,
        Contents::Subblocks(subblocks) => engine.uncompress(&subblocks)?,
    };
    let elapsed = t0.elapsed();

    if output.to_str() == Some("-") {
        let mut out = io::stdout().lock();
        out.write_all(&raw)?;
        out.flush()?;
    } else {
        let mut out = File::create(&output).with_context(|| format!("creating output file {:?}", output))?;
        out.write_all(&raw)?;
    }

    eprintln!("  algorithm   : {}", algorithm);
    eprintln!("  raw size    : {}", human_bytes(raw.len() as u64));
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((raw.len() as f64 / elapsed.as_secs_f64().max(1e-9)) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_subblocks: bool) -> anyhow::Result<()> {
    let reader = Reader::open(&file).with_context(|| format!("opening container {:?}", file))?;
    let header = reader.header();
    let algorithm = Algorithm::from_id(header.algorithm)?;
    let file_size = std::fs::metadata(&file)?.len();
    let options = reader.options();

    println!("=== Subblock container: {:?} ===", file);
    println!();
    println!("  format version : {}", header.version);
    println!("  algorithm      : {} (id={})", algorithm, header.algorithm);
    println!("  layout         : {}", if reader.is_verbatim() { "verbatim" } else { "subblocks" });
    println!("  subblock count : {}", header.subblock_count);
    println!("  raw size       : {}", human_bytes(reader.raw_size()));
    println!("  payload        : {}", human_bytes(reader.payload_size()));
    println!("  file on disk   : {}", human_bytes(file_size));
    println!("  ratio          : {:.2}x", reader.ratio());
    println!("  checksums      : {}", options.checksums);
    println!(
        "  shuffle        : {}",
        if options.shuffles() { format!("item size {}", options.item_size) } else { "off".to_string() }
    );
    println!("  flags          : 0x{:04x}", header.flags);

    if show_subblocks && !reader.is_verbatim() {
        println!();
        println!(
            "  {:>8}  {:>14}  {:>12}  {:>12}  {:>6}  {:>16}",
            "subblock", "raw offset", "payload", "raw", "stored", "checksum"
        );
        println!("  {}", "-".repeat(76));
        let mut offset = 0u64;
        for (i, e) in reader.entries().iter().enumerate() {
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>12}  {:>6}  {:016x}",
                i,
                offset,
                human_bytes(e.payload_len),
                human_bytes(e.uncompressed_size),
                if e.payload_len == e.uncompressed_size { "yes" } else { "no" },
                e.checksum
            );
            offset += e.uncompressed_size;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct BenchRow {
    algorithm: Algorithm,
    level: i32,
    subblocks: usize,
    compress: PerformanceReport,
    uncompress: Option<PerformanceReport>,
}

fn run_bench(file: PathBuf, json: bool, tuning: &Tuning) -> anyhow::Result<()> {
    let raw = read_input(&file)?;
    if raw.is_empty() {
        anyhow::bail!("{:?} is empty", file);
    }
    let options = tuning.options()?;
    info!("benchmarking {} with {:?}", human_bytes(raw.len() as u64), options);

    let mut rows = Vec::with_capacity(Algorithm::ALL.len());
    let mut scratch = vec![0u8; raw.len()];
    for algorithm in Algorithm::ALL {
        let engine = Compression::new(algorithm, options.clone());
        let (subblocks, compress) = engine.compress_with_report(&raw)?;

        let uncompress = if subblocks.is_empty() {
            None
        } else {
            let (written, report) = engine.uncompress_into_with_report(&subblocks, &mut scratch)?;
            if written != raw.len() || scratch != raw {
                anyhow::bail!("{} round trip does not reproduce the input", algorithm);
            }
            Some(report)
        };

        rows.push(BenchRow {
            algorithm,
            level: options.effective_level(&algorithm),
            subblocks: subblocks.len(),
            compress,
            uncompress,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!("=== Subblock compression benchmark: {} ===", human_bytes(raw.len() as u64));
    println!(
        "  {:>8}  {:>5}  {:>9}  {:>10}  {:>14}  {:>16}  {:>7}",
        "algo", "level", "subblocks", "reduction", "compress MiB/s", "uncompress MiB/s", "threads"
    );
    println!("  {}", "-".repeat(80));
    for row in &rows {
        let uncompress = row
            .uncompress
            .map_or_else(|| "stored".to_string(), |r| format!("{:.1}", r.throughput_mib_s));
        println!(
            "  {:>8}  {:>5}  {:>9}  {:>9.2}%  {:>14.1}  {:>16}  {:>7}",
            row.algorithm.to_string(),
            row.level,
            row.subblocks,
            row.compress.size_reduction * 100.0,
            row.compress.throughput_mib_s,
            uncompress,
            row.compress.threads_used
        );
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Compress {
            input,
            output,
            algorithm,
            tuning,
        } => run_compress(input, output, &algorithm, &tuning),
        Commands::Decompress { input, output } => run_decompress(input, output),
        Commands::Inspect { file, subblocks } => run_inspect(file, subblocks),
        Commands::Bench { file, json, tuning } => run_bench(file, json, &tuning),
    }
}
