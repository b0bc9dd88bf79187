//! layoutchunk CLI - layout-aware document chunking tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use layoutchunk::{
    process_batch, render, ChunkOptions, ChunkRecord, ChunkStats, ContentList, ContentListParser,
    CropScope, Delimiter, DocumentInput, JsonFormat, PageRasters, ParseOptions, Pipeline,
    SectionLayout,
};

#[derive(Parser)]
#[command(name = "layoutchunk")]
#[command(version)]
#[command(about = "Chunk layout-analyzed documents for retrieval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk one analyzer content list
    Chunk {
        /// Content list file, or analyzer output directory
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Document stem when INPUT is an output directory
        #[arg(long)]
        stem: Option<String>,

        /// Analyzer method subdirectory when INPUT is an output directory
        #[arg(long, default_value = "auto")]
        method: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Also write a plain text rendering
        #[arg(long)]
        text: bool,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Chunk several content lists in parallel
    ///
    /// Page images of each document are read from `<pages>/<name>/`.
    Batch {
        /// Content list files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "chunks")]
        output: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Print the position tags found in a text file
    Tags {
        /// Input text file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Crop the regions of a position tag out of page rasters
    Crop {
        /// Tag text; a literal "\t" stands for a tab
        #[arg(value_name = "TAG")]
        tag: String,

        /// Directory of page images
        #[arg(long, value_name = "DIR")]
        pages: PathBuf,

        /// Index of the first rendered page
        #[arg(long, default_value = "0")]
        page_from: usize,

        /// Output image file
        #[arg(short, long, value_name = "FILE", default_value = "crop.png")]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct ChunkArgs {
    /// Directory of rendered page images
    #[arg(long, value_name = "DIR", env = "LAYOUTCHUNK_PAGES")]
    pages: Option<PathBuf>,

    /// Index of the first rendered page
    #[arg(long, default_value = "0", env = "LAYOUTCHUNK_PAGE_FROM")]
    page_from: usize,

    /// Token budget per chunk
    #[arg(long, default_value = "128", env = "LAYOUTCHUNK_TOKEN_BUDGET")]
    token_budget: usize,

    /// Overlap between chunks, in percent
    #[arg(long, default_value = "0", env = "LAYOUTCHUNK_OVERLAP",
          value_parser = clap::value_parser!(u8).range(0..=100))]
    overlap: u8,

    /// Delimiter; backtick-quoted markers select hard splitting
    #[arg(long, env = "LAYOUTCHUNK_DELIMITER")]
    delimiter: Option<String>,

    /// Split chunks into child records on these markers
    #[arg(long, env = "LAYOUTCHUNK_CHILD_DELIMITER")]
    child_delimiter: Option<String>,

    /// Context tokens attached to tables
    #[arg(long, default_value = "0", env = "LAYOUTCHUNK_TABLE_CONTEXT")]
    table_context: usize,

    /// Context tokens attached to figures
    #[arg(long, default_value = "0", env = "LAYOUTCHUNK_IMAGE_CONTEXT")]
    image_context: usize,

    /// One chunk per unit, no merging
    #[arg(long)]
    per_unit: bool,

    /// Section layout
    #[arg(long, value_enum, default_value = "raw")]
    layout: LayoutMode,

    /// Which units get a cropped image
    #[arg(long, value_enum, default_value = "visual")]
    crop: CropMode,

    /// Skip malformed blocks instead of failing
    #[arg(long)]
    lenient: bool,

    /// Normalize text to Unicode NFC
    #[arg(long)]
    normalize: bool,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LayoutMode {
    /// Text and tag side by side
    Raw,
    /// Text, kind and tag
    Manual,
    /// Tag inline after the text
    Paper,
}

impl From<LayoutMode> for SectionLayout {
    fn from(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Raw => SectionLayout::Raw,
            LayoutMode::Manual => SectionLayout::Manual,
            LayoutMode::Paper => SectionLayout::Paper,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CropMode {
    /// No cropping
    Off,
    /// Figures and tables
    Visual,
    /// Every unit
    All,
}

impl From<CropMode> for CropScope {
    fn from(mode: CropMode) -> Self {
        match mode {
            CropMode::Off => CropScope::Off,
            CropMode::Visual => CropScope::Visual,
            CropMode::All => CropScope::All,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

impl ChunkArgs {
    fn chunk_options(&self) -> CliResult<ChunkOptions> {
        let mut options = ChunkOptions::new()
            .with_token_budget(self.token_budget)
            .with_overlap(self.overlap)
            .with_table_context(self.table_context)
            .with_image_context(self.image_context);

        if let Some(ref text) = self.delimiter {
            options = options.with_delimiter(text.parse::<Delimiter>()?);
        }
        if let Some(ref text) = self.child_delimiter {
            options = options.with_child_delimiter(text.parse::<Delimiter>()?);
        }
        if self.per_unit {
            options = options.per_unit();
        }
        options.validate()?;
        Ok(options)
    }

    fn parse_options(&self) -> ParseOptions {
        let mut options = ParseOptions::new()
            .with_layout(self.layout.into())
            .with_crop_scope(self.crop.into())
            .with_normalization(self.normalize);
        if self.lenient {
            options = options.lenient();
        }
        options
    }

    fn rasters(&self) -> CliResult<PageRasters> {
        match self.pages {
            Some(ref dir) => Ok(PageRasters::load_dir(dir)?.with_page_from(self.page_from)),
            None => Ok(PageRasters::default()),
        }
    }

    fn json_format(&self) -> JsonFormat {
        if self.compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chunk {
            input,
            stem,
            method,
            output,
            text,
            chunking,
        } => cmd_chunk(
            &input,
            stem.as_deref(),
            &method,
            output.as_deref(),
            text,
            &chunking,
        ),
        Commands::Batch {
            inputs,
            output,
            chunking,
        } => cmd_batch(&inputs, &output, &chunking),
        Commands::Tags { input } => cmd_tags(&input),
        Commands::Crop {
            tag,
            pages,
            page_from,
            output,
        } => cmd_crop(&tag, &pages, page_from, &output),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn open_content_list(
    input: &Path,
    stem: Option<&str>,
    method: &str,
    options: &ParseOptions,
) -> CliResult<ContentList> {
    let parser = if input.is_dir() {
        let stem = match stem {
            Some(stem) => stem.to_string(),
            None => input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or("cannot infer document stem; pass --stem")?,
        };
        ContentListParser::locate(input, &stem, method, options.clone())?
    } else {
        ContentListParser::open_with_options(input, options.clone())?
    };
    Ok(parser.parse()?)
}

fn document_name(input: &Path) -> String {
    let name = input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    name.strip_suffix("_content_list")
        .map(String::from)
        .unwrap_or(name)
}

fn cmd_chunk(
    input: &Path,
    stem: Option<&str>,
    method: &str,
    output: Option<&Path>,
    text: bool,
    args: &ChunkArgs,
) -> CliResult<()> {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        PathBuf::from(format!("{}_chunks", document_name(input)))
    });
    fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new(4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Reading content list...");
    let chunk_options = args.chunk_options()?;
    let parse_options = args.parse_options();
    let content = open_content_list(input, stem, method, &parse_options)?;
    pb.inc(1);

    pb.set_message("Loading page rasters...");
    let rasters = args.rasters()?;
    log::debug!("loaded {} page rasters", rasters.len());
    pb.inc(1);

    pb.set_message("Chunking...");
    let mut records = Pipeline::new(chunk_options, parse_options).records(&content, &rasters)?;
    pb.inc(1);

    pb.set_message("Writing output...");
    let image_count = write_images(&mut records, &output_dir.join("images"))?;
    fs::write(
        output_dir.join("chunks.json"),
        render::to_json(&records, args.json_format())?,
    )?;
    if text {
        fs::write(output_dir.join("chunks.txt"), render::to_text(&records))?;
    }
    pb.inc(1);

    pb.finish_with_message("Done!");

    print_stats(&ChunkStats::from_records(&records));
    println!("\n{}", "Output files:".green().bold());
    println!("  {} chunks.json", "├─".dimmed());
    if text {
        println!("  {} chunks.txt", "├─".dimmed());
    }
    println!("  {} images/ ({} files)", "└─".dimmed(), image_count);

    Ok(())
}

fn cmd_batch(inputs: &[PathBuf], output: &Path, args: &ChunkArgs) -> CliResult<()> {
    let chunk_options = args.chunk_options()?;
    let parse_options = args.parse_options();

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Reading content lists...");
    let mut documents = Vec::with_capacity(inputs.len());
    for input in inputs {
        let content = ContentListParser::open_with_options(input, parse_options.clone())?.parse()?;
        let name = document_name(input);
        let rasters = document_rasters(
            args.pages.as_deref(),
            &name,
            args.page_from,
            inputs.len() == 1,
        )?;
        documents.push(DocumentInput::new(name, content, rasters));
        pb.inc(1);
    }

    pb.set_message("Chunking...");
    let counter = layoutchunk::EstimateCounter;
    let results = process_batch(&documents, &chunk_options, &parse_options, &counter);
    pb.finish_with_message("Done!");

    fs::create_dir_all(output)?;
    let mut failed = 0;
    for result in results {
        match result {
            Ok(doc) => {
                let mut records =
                    render::build_records(&doc.chunks.chunks, chunk_options.child_delimiter.as_ref());
                let doc_dir = output.join(&doc.name);
                write_images(&mut records, &doc_dir.join("images"))?;
                fs::write(
                    doc_dir.join("chunks.json"),
                    render::to_json(&records, args.json_format())?,
                )?;
                println!(
                    "{} {} ({} records)",
                    "Chunked".green(),
                    doc.name,
                    records.len()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", "Failed".red(), e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} documents failed", failed, inputs.len()).into());
    }
    Ok(())
}

/// Load the page images of one batch document from `<pages>/<name>/`.
///
/// A batch of one may also use the pages directory itself. A document
/// without its own directory is chunked without rasters.
fn document_rasters(
    pages: Option<&Path>,
    name: &str,
    page_from: usize,
    lone: bool,
) -> CliResult<PageRasters> {
    let Some(pages) = pages else {
        return Ok(PageRasters::default());
    };

    let dir = pages.join(name);
    if dir.is_dir() {
        return Ok(PageRasters::load_dir(&dir)?.with_page_from(page_from));
    }
    if lone {
        return Ok(PageRasters::load_dir(pages)?.with_page_from(page_from));
    }
    log::warn!(
        "no page images for {} under {}, chunking without rasters",
        name,
        pages.display()
    );
    Ok(PageRasters::default())
}

/// Save record images as PNG files and link them from the records.
fn write_images(records: &mut [ChunkRecord], dir: &Path) -> CliResult<usize> {
    fs::create_dir_all(dir)?;
    let mut count = 0;
    for (i, record) in records.iter_mut().enumerate() {
        let Some(ref image) = record.image else {
            continue;
        };
        let filename = format!("chunk_{:04}.png", i);
        image.save(dir.join(&filename))?;
        record.img_id = Some(format!("images/{}", filename));
        count += 1;
    }
    Ok(count)
}

fn print_stats(stats: &ChunkStats) {
    println!();
    println!("{}", "Chunk Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Records".bold(), stats.record_count);
    println!("{}: {}", "Child records".bold(), stats.child_count);
    println!("{}: {}", "Images".bold(), stats.image_count);
    println!("{}: {}", "Pages".bold(), stats.page_count);
    println!("{}: {}", "Tokens".bold(), stats.token_count);
}

fn cmd_tags(input: &Path) -> CliResult<()> {
    let text = fs::read_to_string(input)?;
    let regions = layoutchunk::extract_positions(&text);

    if regions.is_empty() {
        println!("{}", "No position tags found".yellow());
        return Ok(());
    }

    println!("{}", "Position Tags".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for region in &regions {
        let pages = region
            .pages
            .iter()
            .map(|p| (p + 1).to_string())
            .collect::<Vec<_>>()
            .join("-");
        println!(
            "{} {:>6}  x: {:.1}..{:.1}  y: {:.1}..{:.1}",
            "page".dimmed(),
            pages,
            region.x0,
            region.x1,
            region.top,
            region.bottom
        );
    }
    println!("\n{} {} tags", "Found".green().bold(), regions.len());

    Ok(())
}

fn cmd_crop(tag: &str, pages: &Path, page_from: usize, output: &Path) -> CliResult<()> {
    let tag = tag.replace("\\t", "\t");
    let rasters = PageRasters::load_dir(pages)?.with_page_from(page_from);

    let result = layoutchunk::raster::crop(&tag, &rasters)
        .ok_or("nothing to crop: no tag decoded or no region on a rendered page")?;
    result.image.save(output)?;

    println!(
        "{} {} ({}x{}, {} regions)",
        "Saved to".green(),
        output.display(),
        result.image.width(),
        result.image.height(),
        result.positions.len()
    );
    Ok(())
}

fn cmd_version() {
    println!(
        "{} {}",
        "layoutchunk".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("Layout-aware document chunking tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_page(dir: &Path, name: &str, width: u32) {
        fs::create_dir_all(dir).unwrap();
        RgbImage::from_pixel(width, 50, Rgb([255, 255, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_batch_documents_use_their_own_pages() {
        let pages = tempfile::tempdir().unwrap();
        write_page(&pages.path().join("a"), "page_0001.png", 40);
        write_page(&pages.path().join("b"), "page_0001.png", 80);
        write_page(&pages.path().join("b"), "page_0002.png", 80);

        let a = document_rasters(Some(pages.path()), "a", 0, false).unwrap();
        let b = document_rasters(Some(pages.path()), "b", 0, false).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert_eq!(a.size(0), Some((40, 50)));
        assert_eq!(b.size(0), Some((80, 50)));
    }

    #[test]
    fn test_batch_document_without_pages_is_not_cropped() {
        let pages = tempfile::tempdir().unwrap();
        write_page(pages.path(), "page_0001.png", 40);

        let shared = document_rasters(Some(pages.path()), "other", 0, false).unwrap();
        assert!(shared.is_empty());
    }

    #[test]
    fn test_single_document_uses_pages_directory() {
        let pages = tempfile::tempdir().unwrap();
        write_page(pages.path(), "page_0001.png", 40);

        let rasters = document_rasters(Some(pages.path()), "doc", 2, true).unwrap();
        assert_eq!(rasters.len(), 1);
        assert!(rasters.page(2).is_some());
        assert!(document_rasters(None, "doc", 0, true).unwrap().is_empty());
    }

    #[test]
    fn test_document_name_strips_suffix() {
        assert_eq!(document_name(Path::new("out/report_content_list.json")), "report");
        assert_eq!(document_name(Path::new("notes.json")), "notes");
    }
}
