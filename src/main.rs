use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use canvas_pdf::{
    CaptureOptions, DirectorySink, ExportController, ExportNotice, ExportSettings,
    FitMode, ImageEncoding, Orientation, PageFormat, PageGeometry, SnapshotRasterizer,
    load_record, paginate, parse_hex_color, sanitize_title,
};

#[derive(Parser)]
#[command(name = "canvas-pdf")]
#[command(about = "Export a rendered document view to a paginated PDF or plain text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rasterize a snapshot of the document view and paginate it into a PDF
    Pdf {
        /// Rendered snapshot of the view (PNG or JPEG)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Document XML providing the title
        #[arg(short, long)]
        document: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        page: PageArgs,

        /// Capture scale factor (>= 1)
        #[arg(long, default_value_t = 2.0)]
        scale: f32,

        /// Background fill as hex RGB
        #[arg(long, default_value = "ffffff", value_parser = parse_color)]
        background: [u8; 3],

        /// Natural width of the view in pixels (defaults to the snapshot width)
        #[arg(long)]
        width: Option<u32>,

        /// Natural height of the view in pixels (defaults to the snapshot height)
        #[arg(long)]
        height: Option<u32>,

        /// Embed the raster as JPEG at this quality instead of lossless
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        jpeg: Option<u8>,
    },

    /// Write the document title and body as plain text
    Text {
        /// Document XML
        #[arg(short, long)]
        document: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print the page slices for a raster of the given size
    Plan {
        /// Raster width in pixels
        #[arg(long)]
        width: u32,

        /// Raster height in pixels
        #[arg(long)]
        height: u32,

        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Page format (a3, a4, a5, letter, legal)
    #[arg(long, default_value = "a4")]
    format: PageFormat,

    #[arg(long)]
    landscape: bool,

    /// Uniform page margin in millimetres
    #[arg(long, default_value_t = 25.4)]
    margin_mm: f64,

    /// Scale to the content width (width) or fit the whole page (page)
    #[arg(long, default_value = "width")]
    fit: FitMode,
}

impl PageArgs {
    fn geometry(&self) -> Result<PageGeometry, canvas_pdf::ExportError> {
        let orientation = if self.landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        PageGeometry::for_format(self.format, orientation, self.margin_mm)
            .map(|g| g.with_fit(self.fit))
    }
}

fn parse_color(s: &str) -> Result<[u8; 3], String> {
    parse_hex_color(s).ok_or_else(|| format!("'{s}' is not a hex RGB color"))
}

fn report(notice: ExportNotice) -> ExitCode {
    match notice {
        ExportNotice::Saved { path, pages, .. } => {
            match pages {
                Some(n) => println!("{} ({n} pages)", path.display()),
                None => println!("{}", path.display()),
            }
            ExitCode::SUCCESS
        }
        ExportNotice::Failed { message, detail, .. } => {
            eprintln!("{message}\n  {detail}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Pdf {
            snapshot,
            document,
            out_dir,
            page,
            scale,
            background,
            width,
            height,
            jpeg,
        } => {
            let record = match load_record(&document) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let geometry = match page.geometry() {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let settings = ExportSettings {
                geometry,
                capture: CaptureOptions {
                    scale,
                    background,
                    width_hint: width,
                    height_hint: height,
                },
                encoding: jpeg
                    .map(|quality| ImageEncoding::Jpeg { quality })
                    .unwrap_or_default(),
            };
            let controller = ExportController::new(settings).with_file_stem(sanitize_title);
            let mut sink = DirectorySink::new(out_dir);
            report(controller.export_pdf(&SnapshotRasterizer, snapshot.as_path(), &record, &mut sink))
        }
        Command::Text { document, out_dir } => {
            let record = match load_record(&document) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let controller =
                ExportController::new(ExportSettings::default()).with_file_stem(sanitize_title);
            let mut sink = DirectorySink::new(out_dir);
            report(controller.export_text(&record, &mut sink))
        }
        Command::Plan {
            width,
            height,
            page,
        } => {
            let plan = match page.geometry().and_then(|g| paginate(width, height, &g)) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            };
            println!(
                "ratio {:.6}, scaled {:.2} x {:.2} mm, {} pages",
                plan.image.ratio,
                plan.image.width,
                plan.image.height,
                plan.page_count()
            );
            for (i, slice) in plan.slices.iter().enumerate() {
                println!(
                    "  page {:>3}: offset {:>9.2} mm  height {:>7.2} mm",
                    i + 1,
                    slice.offset,
                    slice.draw_height
                );
            }
            ExitCode::SUCCESS
        }
    }
}
