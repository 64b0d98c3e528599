use clap::Parser;
use ppclink::{
    assemble_all, collect_fragment, dolphin_document, find_sources, riivolution_document,
    split_blocks, write_outputs, Build, Error, PpcAs, Region, Status, Symbols,
};
use std::fs;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Target region: NTSC-U, PAL, NTSC-J, NTSC-K, NTSC-W (or USA/EUR/JPN/KOR/TAW)
    region: String,

    /// Directory scanned recursively for *.s fragments
    #[clap(short, long, default_value = "source")]
    source: PathBuf,

    /// Directory holding per-region symbol tables (<Region>.txt)
    #[clap(long, default_value = "symbols")]
    symbols: PathBuf,

    /// Output directory
    #[clap(short, long, default_value = "build")]
    build: PathBuf,

    /// External assembler binary
    #[clap(long, default_value = "powerpc-eabi-as")]
    assembler: PathBuf,

    /// Patch set name, used in output file names and Dolphin sections
    #[clap(short, long, default_value = "ppclink")]
    name: String,

    /// Three-character game code; the Dolphin ini is named <code><letter>01.ini
    #[clap(long, default_value = "SB3")]
    game: String,

    /// Optional directory of extra files copied next to the generated patches
    #[clap(long)]
    resources: Option<PathBuf>,

    /// List discovered fragments
    #[clap(short, long)]
    list: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        e.print_diag();
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let region = Region::parse(&args.region)?;
    println!("Targeting: {}", region);

    println!("1. Locate Source Fragments");
    let files = find_sources(&args.source)?;
    println!("  - found {} fragments", files.len());
    if args.list {
        for file in &files {
            println!("  {}", file.display());
        }
    }

    println!("2. Load Symbols for {}", region);
    let symbols = Symbols::load_for(&args.symbols, region)?;
    println!("  - loaded {} symbols", symbols.len());

    println!("3. Read Fragments");
    let mut build = Build::new();
    for path in &files {
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| Error::FileRead(name.clone(), e))?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if collect_fragment(&mut build, &symbols, region, &name, &lines)? == Status::Skip {
            println!("  - {} ignored", name);
        }
    }
    build.freeze();
    println!(
        "  - {} lines, {} labels, {} variables",
        build.code.len(),
        build.labels.len(),
        build.variables.len()
    );

    println!("4. Relocate Blocks");
    let blocks = split_blocks(&build, &symbols)?;
    println!("  - {} blocks", blocks.len());

    println!("5. Assemble");
    let work_dir = args.build.join("_tmp").join(region.full());
    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)
            .map_err(|e| Error::FileWrite(work_dir.display().to_string(), e))?;
    }
    fs::create_dir_all(&work_dir)
        .map_err(|e| Error::FileWrite(work_dir.display().to_string(), e))?;
    let encoder = PpcAs {
        assembler: args.assembler.clone(),
        work_dir: work_dir.clone(),
    };
    let patches = assemble_all(&blocks, &encoder, &build.trash)?;
    let _ = fs::remove_dir_all(&work_dir);

    println!("6. Write Patches");
    let riivolution = riivolution_document(&patches);
    let dolphin = dolphin_document(&patches, &args.name);
    write_outputs(
        &args.build,
        region,
        &args.name,
        &args.game,
        &riivolution,
        &dolphin,
    )?;

    if let Some(resources) = &args.resources {
        println!("7. Copy Additional Resources");
        for kind in ["Riivolution", "Dolphin"] {
            let dest = args
                .build
                .join(format!("{}_{}", region.full(), kind))
                .join(&args.name);
            ppclink::copy_resources(resources, &dest)?;
        }
    }

    println!("Build finished, check {}", args.build.display());
    Ok(())
}
