//! # Trajectory Inspector
//!
//! Command-line tool to convert between raw point files and codec payloads,
//! and to see how a payload splits across the codec tiers.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::process::ExitCode;

use summit_trace::store::{read_points, write_points};
use summit_trace::{codec, EncodeStats, TraceResult};

fn print_usage() {
    println!("Usage: trajectory_inspector <command> [args]");
    println!();
    println!("Commands:");
    println!("  encode <points.strk> <out.bin>   Encode a raw point file");
    println!("  decode <in.bin> <points.strk>    Decode a payload to a raw point file");
    println!("  inspect <in.bin>                 Show per-tier record counts");
}

fn print_tiers(stats: &EncodeStats) {
    println!("┌─ RECORDS ──────────────────────────────────────┐");
    println!("│ Baseline:   {:>8} × 12 bytes", stats.baseline);
    println!("│ Quarter:    {:>8} ×  3 bytes", stats.quarter);
    println!("│ Half:       {:>8} ×  7 bytes", stats.half);
    println!("│ Absolute:   {:>8} × 13 bytes", stats.absolute);
    if stats.elided > 0 {
        println!("│ Elided:     {:>8} ×  0 bytes", stats.elided);
    }
    println!("│ Points:     {:>8}", stats.points_written());
    println!("│ Stream:     {:>8} bytes", stats.byte_len());
    println!("└────────────────────────────────────────────────┘");
}

fn run_encode(input: &str, output: &str) -> TraceResult<()> {
    let points = read_points(&mut BufReader::new(File::open(input)?))?;
    let (bytes, stats) = codec::encode_with_stats(&points);
    std::fs::write(output, &bytes)?;

    println!("Encoded {} points: {} -> {} bytes", points.len(), points.len() * 12, bytes.len());
    print_tiers(&stats);
    Ok(())
}

fn run_decode(input: &str, output: &str) -> TraceResult<()> {
    let bytes = std::fs::read(input)?;
    let points = codec::decode(&bytes)?;

    let mut writer = BufWriter::new(File::create(output)?);
    write_points(&mut writer, &points)?;
    writer.flush()?;

    println!("Decoded {} bytes into {} points", bytes.len(), points.len());
    Ok(())
}

fn run_inspect(input: &str) -> TraceResult<()> {
    let bytes = std::fs::read(input)?;
    let stats = codec::inspect(&bytes)?;

    println!("Payload: {input} ({} bytes)", bytes.len());
    print_tiers(&stats);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    let result = match (command, args.get(2), args.get(3)) {
        (Some("encode"), Some(input), Some(output)) => run_encode(input, output),
        (Some("decode"), Some(input), Some(output)) => run_decode(input, output),
        (Some("inspect"), Some(input), _) => run_inspect(input),
        _ => {
            print_usage();
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
