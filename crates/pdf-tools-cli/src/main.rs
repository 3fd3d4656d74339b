use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use pdf_binder::{
    AssemblyOptions, Container, FrontMatter, HeaderAlignment, Hierarchy, PaperSize,
    ProjectProfile, UploadedFile,
};
use std::path::{Path, PathBuf};

mod logger;

#[derive(Parser)]
#[command(name = "pdft", about = "PDF tools CLI", version)]
struct Cli {
    /// More output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind folders of PDF/JPEG files into one document with a table of contents
    Assemble {
        #[command(flatten)]
        inputs: Inputs,

        /// Directory the result is written into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Output file name, without extension
        #[arg(short, long)]
        name: Option<String>,

        /// Left header document number
        #[arg(long)]
        left: Option<String>,

        /// Second header document number
        #[arg(long)]
        center: Option<String>,

        /// Placement of the second header
        #[arg(long, value_enum)]
        align: Option<AlignArg>,

        /// Rotate headers and footers on landscape pages
        #[arg(long)]
        smart_placement: bool,

        /// Output paper size
        #[arg(long, value_enum)]
        paper: Option<PaperArg>,

        /// Always use portrait output pages
        #[arg(long)]
        portrait_only: bool,

        /// Also stamp the table of contents pages
        #[arg(long)]
        stamp_toc: bool,

        /// Heading of the table of contents
        #[arg(long)]
        toc_heading: Option<String>,

        /// Standard cover template with `unitname` and `date` form fields
        #[arg(long)]
        cover: Option<PathBuf>,

        /// Date written into the standard cover (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// PDF prepended after the cover
        #[arg(long)]
        front_page: Option<PathBuf>,

        /// Project profile (JSON) supplying name and document numbers
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Options file (JSON); flags given on the command line win
        #[arg(long)]
        config: Option<PathBuf>,

        /// Show statistics only, don't generate PDF
        #[arg(long)]
        stats_only: bool,
    },

    /// Print the section tree the inputs produce
    Tree {
        #[command(flatten)]
        inputs: Inputs,

        /// List the files of every section
        #[arg(long)]
        files: bool,
    },
}

#[derive(Args)]
struct Inputs {
    /// Input folder(s); each becomes a top-level section
    #[arg(required_unless_present = "file", num_args = 1..)]
    input: Vec<PathBuf>,

    /// Loose PDF/JPEG files, collected in a shared section
    #[arg(short, long, num_args = 1..)]
    file: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignArg {
    Right,
    Center,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
        }
    }
}

impl From<AlignArg> for HeaderAlignment {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Right => Self::Right,
            AlignArg::Center => Self::Center,
        }
    }
}

/// Read every input folder and loose file into one hierarchy
async fn load_inputs(inputs: &Inputs) -> Result<Hierarchy> {
    let mut hierarchy = Hierarchy::new();

    for dir in &inputs.input {
        let files = pdf_binder::load_directory(dir)
            .await
            .with_context(|| format!("Failed to read folder {}", dir.display()))?;
        let report = hierarchy.ingest(files);
        for path in &report.rejected {
            println!("  Skipped {} (not PDF/JPEG)", path);
        }
    }

    let mut loose = Vec::new();
    for path in &inputs.file {
        let bytes = pdf_binder::load_bytes(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} is not a file", path.display()))?;
        loose.push(UploadedFile::new(name, pdf_binder::mime_type_for(path), bytes));
    }
    let report = hierarchy.ingest(loose);
    for path in &report.rejected {
        println!("  Skipped {} (not PDF/JPEG)", path);
    }

    Ok(hierarchy)
}

async fn read_optional(path: Option<&Path>) -> Result<Option<std::sync::Arc<[u8]>>> {
    match path {
        Some(path) => {
            let bytes = pdf_binder::load_bytes(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Some(bytes))
        }
        None => Ok(None),
    }
}

fn print_tree(containers: &[Container], level: usize, files: bool) {
    for container in containers {
        let indent = "  ".repeat(level);
        let hidden = if container.show_in_toc { "" } else { " (hidden)" };
        println!(
            "{}{} [{} files]{}",
            indent,
            container.title,
            container.files.len(),
            hidden
        );
        if files {
            for file in &container.files {
                println!("{}  - {}", indent, file.name);
            }
        }
        print_tree(&container.children, level + 1, files);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    logger::StderrLogger::new(level)
        .init()
        .context("Failed to install logger")?;

    match cli.command {
        Commands::Tree { inputs, files } => {
            let hierarchy = load_inputs(&inputs).await?;
            if hierarchy.is_empty() {
                bail!("No PDF or JPEG files found");
            }
            print_tree(hierarchy.sections(), 0, files);
        }

        Commands::Assemble {
            inputs,
            output_dir,
            name,
            left,
            center,
            align,
            smart_placement,
            paper,
            portrait_only,
            stamp_toc,
            toc_heading,
            cover,
            date,
            front_page,
            profile,
            config,
            stats_only,
        } => {
            // Options file, then profile, then explicit flags
            let mut options = match &config {
                Some(path) => AssemblyOptions::load(path)
                    .await
                    .with_context(|| format!("Failed to load options {}", path.display()))?,
                None => AssemblyOptions::default(),
            };
            if let Some(path) = &profile {
                let profile = ProjectProfile::load(path)
                    .await
                    .with_context(|| format!("Failed to load profile {}", path.display()))?;
                profile.apply(&mut options);
            }
            if let Some(name) = name {
                options.output_name = name;
            }
            if let Some(left) = left {
                options.document_number_left = left;
            }
            if let Some(center) = center {
                options.document_number_center = center;
            }
            if let Some(align) = align {
                options.header_alignment = align.into();
            }
            if let Some(paper) = paper {
                options.paper_size = paper.into();
            }
            if let Some(heading) = toc_heading {
                options.toc_heading = heading;
            }
            if date.is_some() {
                options.cover_date = date;
            }
            options.smart_placement |= smart_placement;
            options.stamp_toc_pages |= stamp_toc;
            if portrait_only {
                options.match_source_orientation = false;
            }
            options.validate().context("Invalid options")?;

            let hierarchy = load_inputs(&inputs).await?;

            let stats = pdf_binder::calculate_statistics(&hierarchy, &options);
            println!("Assembly Statistics:");
            println!("  Sections: {}", stats.sections);
            println!("  Containers: {}", stats.containers);
            println!("  PDF files: {}", stats.pdf_files);
            println!("  JPEG files: {}", stats.jpeg_files);
            if let Some(level) = stats.max_level {
                println!("  Deepest level: {}", level);
            }
            println!("  Table of contents pages: {}", stats.toc_pages);
            if stats.hidden_page_numbers > 0 {
                println!("  Hidden page numbers: {}", stats.hidden_page_numbers);
            }

            if stats_only {
                return Ok(());
            }

            let front_matter = FrontMatter {
                standard_cover: read_optional(cover.as_deref()).await?,
                extra_front_page: read_optional(front_page.as_deref()).await?,
            };

            let document = pdf_binder::assemble(&hierarchy, &front_matter, &options)
                .await
                .context("Assembly failed")?;
            let path = pdf_binder::save_document(&document, &output_dir)
                .await
                .with_context(|| format!("Failed to write into {}", output_dir.display()))?;
            println!(
                "Assembled {} pages ({} table of contents) → {}",
                document.page_count,
                document.toc_pages.len(),
                path.display()
            );
        }
    }

    Ok(())
}
