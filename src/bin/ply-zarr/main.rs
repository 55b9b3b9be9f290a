//! ply-zarr CLI - convert PLY meshes to and from Zarr groups.

use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use ply_zarr::prelude::*;
use ply_zarr::ply::{read_ply_with_header, serialize};

/// Parsed command line: positional arguments plus write settings.
struct Args {
    positional: Vec<String>,
    options: WriteOptions,
    level: &'static str,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args {
        positional: Vec::new(),
        options: WriteOptions::default(),
        level: "info",
    };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => args.level = "debug",
            "-vv" | "--trace" => args.level = "trace",
            "-q" | "--quiet" => args.level = "error",
            "--level" => {
                let value = iter.next().context("--level needs a value")?;
                let level: i32 = value.parse().with_context(|| format!("bad level '{}'", value))?;
                args.options.compression = Compression::from_level(level);
            }
            "--chunk-bytes" => {
                let value = iter.next().context("--chunk-bytes needs a value")?;
                let bytes: usize = value
                    .parse()
                    .with_context(|| format!("bad chunk size '{}'", value))?;
                args.options = args.options.with_chunk_bytes(bytes);
            }
            _ => args.positional.push(arg.clone()),
        }
    }
    Ok(args)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() {
    let raw: Vec<String> = env::args().collect();
    let prog = raw.first().map(String::as_str).unwrap_or("ply-zarr").to_string();

    let args = match parse_args(raw.get(1..).unwrap_or(&[])) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:#}", e);
            print_usage(&prog);
            std::process::exit(2);
        }
    };
    init_tracing(args.level);

    if let Err(e) = run(&prog, &args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(prog: &str, args: &Args) -> Result<()> {
    let pos: Vec<&str> = args.positional.iter().map(String::as_str).collect();
    match pos.as_slice() {
        [] | ["help" | "h" | "-h" | "--help", ..] => print_usage(prog),
        ["convert" | "c", input, output] => cmd_convert(Path::new(input), Path::new(output), &args.options)?,
        ["export" | "e", input, output] => cmd_export(Path::new(input), Path::new(output))?,
        ["batch" | "b", out_dir, inputs @ ..] if !inputs.is_empty() => {
            cmd_batch(Path::new(out_dir), inputs, &args.options)?
        }
        ["info" | "i", store] => cmd_info(Path::new(store))?,
        ["header", input] => cmd_header(Path::new(input))?,
        [command, ..] => {
            print_usage(prog);
            bail!("unknown command or wrong arguments: {}", command);
        }
    }
    Ok(())
}

fn print_usage(prog: &str) {
    println!("ply-zarr - Store PLY meshes in Zarr groups");
    println!();
    println!("Usage: {} [options] <command> <args>", prog);
    println!();
    println!("Commands:");
    println!("  c, convert <in.ply> <out.zarr>     Write a PLY mesh to a store");
    println!("  e, export <in.zarr> <out.ply>      Write a stored mesh as ASCII PLY");
    println!("  b, batch <out_dir> <in.ply>...     Convert many files in parallel");
    println!("  i, info <store>                    Show header, bounds and layout");
    println!("     header <file.ply>               Print the attributes JSON of a PLY header");
    println!("  h, help                            Show this help");
    println!();
    println!("Options:");
    println!("  --level N        zlib level, 0 disables compression (default 1)");
    println!("  --chunk-bytes N  Target chunk size in bytes (default 1048576)");
    println!("  -v, --verbose    Debug output");
    println!("  -vv, --trace     Trace output (very verbose)");
    println!("  -q, --quiet      Errors only");
    println!();
    println!("RUST_LOG overrides the verbosity flags.");
}

fn open_ply(path: &Path) -> Result<(Header, Mesh)> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read_ply_with_header(BufReader::new(file)).with_context(|| format!("cannot read {}", path.display()))
}

fn convert(input: &Path, output: &Path, options: &WriteOptions) -> Result<Header> {
    let (ply_header, mesh) = open_ply(input)?;
    debug!(points = mesh.num_points(), cells = mesh.num_cells(), "parsed {}", input.display());

    let mut options = options.clone();
    options.comments.extend(ply_header.comments);
    let store = create_directory_store(output)?;
    let group = Group::create(store, "")?;
    let header = write_with(&group, &mesh, &options)
        .with_context(|| format!("cannot write {}", output.display()))?;
    Ok(header)
}

fn cmd_convert(input: &Path, output: &Path, options: &WriteOptions) -> Result<()> {
    let header = convert(input, output, options)?;
    info!("{} -> {}", input.display(), output.display());
    for (name, element) in &header.elements {
        println!("{} {}", name, element.size);
    }
    Ok(())
}

fn cmd_export(input: &Path, output: &Path) -> Result<()> {
    let group = open_store(input)?;
    let file = File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    to_ply(&group, BufWriter::new(file))?;
    info!("{} -> {}", input.display(), output.display());
    Ok(())
}

/// Store name for `input`: the file name with a trailing `.ply` replaced by `.zarr`.
fn store_name(input: &Path) -> Result<String> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("cannot name a store after {}", input.display()))?;
    let base = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".ply") => &name[..cut],
        _ => name,
    };
    Ok(format!("{}.zarr", base))
}

/// Pair every input with its store below `out_dir`; two inputs may not share a store.
fn batch_outputs(out_dir: &Path, inputs: &[&str]) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut seen: HashMap<PathBuf, &str> = HashMap::new();
    let mut pairs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = out_dir.join(store_name(Path::new(input))?);
        if let Some(other) = seen.insert(output.clone(), *input) {
            bail!("{} and {} would both write {}", other, input, output.display());
        }
        pairs.push((PathBuf::from(input), output));
    }
    Ok(pairs)
}

fn cmd_batch(out_dir: &Path, inputs: &[&str], options: &WriteOptions) -> Result<()> {
    let pairs = batch_outputs(out_dir, inputs)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let results: Vec<(PathBuf, Result<Header>)> = pairs
        .par_iter()
        .map(|(input, output)| (input.clone(), convert(input, output, options)))
        .collect();

    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(header) => {
                let sizes: Vec<String> = header
                    .elements
                    .iter()
                    .map(|(name, e)| format!("{} {}", name, e.size))
                    .collect();
                println!("{}: {}", input.display(), sizes.join(", "));
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {:#}", input.display(), e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} files failed", failed, results.len());
    }
    Ok(())
}

fn open_store(path: &Path) -> Result<Group> {
    let store = open_directory_store(path)?;
    Group::open(store, "").with_context(|| format!("{} is not a store", path.display()))
}

fn cmd_info(path: &Path) -> Result<()> {
    let group = open_store(path)?;
    let header = read_header(&group)?;

    println!("Store: {}", path.display());
    println!("Format: {}", header.format);
    for comment in &header.comments {
        println!("Comment: {}", comment);
    }
    println!();
    for (name, element) in &header.elements {
        println!("Element {} ({})", name, element.size);
        for property in &element.properties {
            println!("  {}", property);
        }
    }

    let mesh = read(&group)?;
    println!();
    println!("Points: {} ({}D)", mesh.num_points(), mesh.dim);
    for block in &mesh.cells {
        println!("Cells:  {} {}", block.len(), block.cell_type);
    }
    if let Some((lo, hi)) = mesh.bounds() {
        let size = hi - lo;
        println!("Bounds: [{:.4}, {:.4}, {:.4}] - [{:.4}, {:.4}, {:.4}]", lo.x, lo.y, lo.z, hi.x, hi.y, hi.z);
        println!("Size:   [{:.4}, {:.4}, {:.4}]", size.x, size.y, size.z);
    }
    println!();
    print!("{}", group.tree()?);
    Ok(())
}

fn cmd_header(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let header = Header::parse_ply(&mut BufReader::new(file))?;
    println!("{}", serde_json::to_string_pretty(&serialize(&header))?);
    Ok(())
}
