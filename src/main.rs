use std::fs::File;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfpane::pdf::{ContainerPair, FixedSurface, Size, engines};
use pdfpane::shell::{ensure_pdf, format_bytes};
use pdfpane::{PagingMode, PdfViewerBlock, Source, ViewerEvent, panic_handler, settings};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Single,
    Continuous,
}

impl From<Mode> for PagingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => PagingMode::SinglePage,
            Mode::Continuous => PagingMode::Continuous,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Fit {
    Width,
    Height,
}

#[derive(Parser)]
#[command(name = "pdfpane", version)]
#[command(about = "Open a PDF headlessly and report page and zoom state")]
struct Cli {
    /// Path to a PDF file or an http(s) URL
    source: String,

    /// Paging mode (defaults to the configured one)
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Page to show (1-indexed, clamped to the document)
    #[arg(long)]
    page: Option<usize>,

    /// Zoom factor, 1.0 = 100%
    #[arg(long)]
    scale: Option<f32>,

    /// Fit the current page after loading
    #[arg(long, value_enum)]
    fit: Option<Fit>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 800.0)]
    width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 1000.0)]
    height: f32,

    /// Seconds to wait for the document
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// More log output in pdfpane.log (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Poll until `done` accepts an event or the deadline passes
fn pump(
    block: &mut PdfViewerBlock,
    deadline: Instant,
    mut done: impl FnMut(&ViewerEvent) -> bool,
) -> bool {
    while Instant::now() < deadline {
        if block.poll().iter().any(&mut done) {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    false
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create("pdfpane.log").context("Failed to create pdfpane.log")?,
    )?;

    panic_handler::initialize_panic_handler();
    info!("Starting pdfpane");

    settings::load_settings();
    let mut config = settings::viewer_config();
    if let Some(mode) = cli.mode {
        config = config.with_mode(mode.into());
    }

    let source = Source::from_location(&cli.source);
    let (name, size) = match &source {
        Source::File(path) => {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            ensure_pdf(name.as_deref())?;
            let size = std::fs::metadata(path)
                .map(|meta| format_bytes(meta.len()))
                .ok()
                .filter(|s| !s.is_empty());
            (name, size)
        }
        Source::Url(url) => (url.rsplit('/').next().map(str::to_string), None),
        _ => (None, None),
    };

    let engine = engines::default_engine().context("No PDF engine compiled in")?;
    let mut block = PdfViewerBlock::new(engine, config);

    let viewport = Size::new(cli.width, cli.height);
    let scroll = Arc::new(FixedSurface::new(Some(viewport)));
    let content = Arc::new(FixedSurface::new(Some(viewport)));
    block.attach(ContainerPair::new(scroll, content));
    block.set_window_size(Some(viewport));

    if let Some(scale) = cli.scale {
        block.edit_scale_input(&(scale * 100.0).to_string());
        block.commit_scale_input();
    }

    block.open(source, name, size);
    let deadline = Instant::now() + Duration::from_secs(cli.timeout);
    let ready = pump(&mut block, deadline, |event| {
        matches!(
            event,
            ViewerEvent::DocumentReady(_) | ViewerEvent::LoadFailed(_)
        )
    });

    if let Some(message) = block.error() {
        bail!("{message}");
    }
    if !ready {
        bail!("Timed out waiting for {}", cli.source);
    }

    if let Some(page) = cli.page {
        block.edit_page_input(&page.to_string());
        block.commit_page_input();
    }

    if let Some(fit) = cli.fit {
        let requested = match fit {
            Fit::Width => block.fit_width(),
            Fit::Height => block.fit_height(),
        };
        if let Some(id) = requested {
            let resolved = pump(&mut block, deadline, |event| {
                matches!(event, ViewerEvent::FitResolved { id: done, .. } if *done == id)
            });
            if !resolved {
                warn!("Fit {id:?} did not resolve before the deadline");
            }
        }
    }
    // settle the writes issued above, then let the current page render
    let _ = block.poll();
    while block.controller().is_rendering() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
        let _ = block.poll();
    }

    println!("{}", block.display_name());
    if let Some(label) = block.page_label() {
        println!("{label}");
    }
    println!("page {} of {}", block.page(), block.total_pages());
    println!("zoom {}%", block.scale_text());
    if let Some(rendered) = block.controller().rendered() {
        println!(
            "rendered page {} at {:.0}x{:.0}",
            rendered.page, rendered.size.width, rendered.size.height
        );
    }

    block.unmount();
    info!("Done");
    Ok(())
}
