use std::{fs::OpenOptions, io::Write, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use fatchain::{FatReader, FatVolume, OffsetDevice, RootDirectory};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Read files from FAT12/16/32 images")]
pub struct Args {
    /// The disk or partition image
    image: PathBuf,
    /// Sector of the image where the FAT volume starts
    #[arg(long, default_value_t = 0)]
    offset: u32,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Print the volume geometry
    Info,
    /// List a directory, the root by default
    Ls { path: Option<String> },
    /// Write a file to stdout
    Cat { path: String },
    /// Print a file's directory entry and handle state
    Stat { path: String },
}

type Volume = FatVolume<OffsetDevice<std::fs::File>>;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Warn
        })
        .init()
        .context("failed to initialize logging")?;

    let image = OpenOptions::new()
        .read(true)
        .open(&args.image)
        .with_context(|| format!("failed to open {}", args.image.display()))?;
    let mut fs = FatVolume::mount(OffsetDevice::new(image, args.offset))
        .with_context(|| format!("failed to mount {}", args.image.display()))?;

    match args.cmd {
        Command::Info => info(&fs),
        Command::Ls { path } => ls(&mut fs, path.as_deref().unwrap_or("/")),
        Command::Cat { path } => cat(&mut fs, &path),
        Command::Stat { path } => stat(&mut fs, &path),
    }
}

/// Walks the directories of `path` from the root and returns its last component
fn enter_parent<'a>(fs: &mut Volume, path: &'a str) -> anyhow::Result<Option<&'a str>> {
    fs.root_dir();
    let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            return Ok(Some(component));
        }
        fs.change_dir(component)
            .with_context(|| format!("cannot enter {component}"))?;
    }
    Ok(None)
}

fn info(fs: &Volume) -> anyhow::Result<()> {
    let geometry = fs.geometry();
    println!("Type:                {}", geometry.fat_type);
    println!("Volume start:        sector {}", fs.device().start());
    println!("Sectors per cluster: {}", geometry.sectors_per_cluster);
    println!(
        "FATs:                {} x {} sectors at {}",
        geometry.fat_count, geometry.sectors_per_fat, geometry.fat_start
    );
    match geometry.root {
        RootDirectory::Fixed { start, sectors } => {
            println!("Root directory:      {sectors} sectors at {start}")
        }
        RootDirectory::Cluster(cluster) => println!("Root directory:      cluster {cluster}"),
    }
    println!("Data region:         sector {}", geometry.data_start);
    println!("Clusters:            {}", geometry.cluster_count);
    Ok(())
}

fn ls(fs: &mut Volume, path: &str) -> anyhow::Result<()> {
    if let Some(last) = enter_parent(fs, path)? {
        fs.change_dir(last)
            .with_context(|| format!("cannot list {path}"))?;
    }
    let mut stdout = std::io::stdout().lock();
    let mut result = Ok(());
    fs.read_dir(|entry| {
        if result.is_ok() {
            result = writeln!(stdout, "{entry}");
        }
    })
    .with_context(|| format!("failed to read {path}"))?;
    result.context("failed to write listing")
}

fn cat(fs: &mut Volume, path: &str) -> anyhow::Result<()> {
    let name = enter_parent(fs, path)?.with_context(|| format!("{path} is not a file"))?;
    let file = fs
        .open(name)
        .with_context(|| format!("cannot open {path}"))?;
    let mut reader = FatReader::new(fs, file);
    let mut stdout = std::io::stdout().lock();
    std::io::copy(&mut reader, &mut stdout).with_context(|| format!("failed to read {path}"))?;
    stdout.flush()?;
    Ok(())
}

fn stat(fs: &mut Volume, path: &str) -> anyhow::Result<()> {
    let name = enter_parent(fs, path)?.with_context(|| format!("{path} has no entry"))?;
    let info = fs
        .entry_info(name)
        .with_context(|| format!("cannot find {path}"))?;
    println!("{info}");
    println!("Size:            {} bytes", info.size);
    println!("First cluster:   {:#x}", info.first_cluster);
    if !info.is_directory() {
        let file = fs.open(name).with_context(|| format!("cannot open {path}"))?;
        println!("{}", file.status());
    }
    Ok(())
}
