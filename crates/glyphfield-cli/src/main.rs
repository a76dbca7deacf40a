//! glyphfield command line.
//!
//! Runs the atlas pipeline headless so layouts can be checked without a GPU.
//!
//! ## Usage
//!
//! ```bash
//! # Pack printable ASCII for a font config and print the atlas layout
//! glyphfield plan fonts/body.ron
//!
//! # Pack a range, lay out some text, emit JSON
//! glyphfield plan fonts/body.ron --first 32 --last 255 --text "Hello" --json
//!
//! # Look at one glyph's outline, edge colors and stream sizes
//! glyphfield inspect /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf g
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use glyphfield::outline::{OutlineSource, SegmentKind};
use glyphfield::{
    AtlasStats, Context, Font, FontConfig, GlyphIndexEntry, GlyphQuad, RecordingBackend,
    TextStyle, TtfOutlines,
};

/// MSDF atlas planning and outline inspection.
#[derive(Parser, Debug)]
#[command(name = "glyphfield")]
#[command(about = "MSDF atlas planning and outline inspection")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a glyph range headless and print where every glyph lands
    Plan {
        /// RON font config
        config: PathBuf,

        /// First code point to generate
        #[arg(long, default_value_t = 32)]
        first: u32,

        /// Last code point to generate
        #[arg(long, default_value_t = 126)]
        last: u32,

        /// Lay out this text and print its quads
        #[arg(long)]
        text: Option<String>,

        /// Text size, screen units per outline unit
        #[arg(long, default_value_t = 1.0)]
        size: f32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print one glyph's outline structure
    Inspect {
        /// TrueType/OpenType font file
        font: PathBuf,

        /// Character to inspect
        glyph: char,

        /// Outline units per em
        #[arg(long, default_value_t = 16.0)]
        em_size: f32,

        /// Face within a collection
        #[arg(long, default_value_t = 0)]
        face: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct PlacedGlyph {
    glyph_id: u32,
    character: Option<char>,
    advance: Option<f32>,
    entry: GlyphIndexEntry,
}

#[derive(Serialize)]
struct PlanReport {
    font_source: PathBuf,
    texture_size: u32,
    range: f32,
    scale: f32,
    vertical_advance: f32,
    stats: AtlasStats,
    glyphs: Vec<PlacedGlyph>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    quads: Vec<GlyphQuad>,
}

#[derive(Serialize)]
struct SegmentReport {
    degree: u8,
    color: &'static str,
    points: Vec<[f32; 2]>,
}

#[derive(Serialize)]
struct InspectReport {
    glyph: char,
    width: f32,
    height: f32,
    bearing_x: f32,
    bearing_y: f32,
    advance: f32,
    vertical_advance: f32,
    meta_bytes: usize,
    point_bytes: usize,
    contours: Vec<Vec<SegmentReport>>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Plan {
            config,
            first,
            last,
            text,
            size,
            json,
        } => cmd_plan(config, first, last, text.as_deref(), size, json),
        Command::Inspect {
            font,
            glyph,
            em_size,
            face,
            json,
        } => cmd_inspect(font, glyph, em_size, face, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_plan(
    config_path: PathBuf,
    first: u32,
    last: u32,
    text: Option<&str>,
    size: f32,
    json: bool,
) -> Result<()> {
    let config = FontConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let backend = Rc::new(RecordingBackend::new());
    let ctx = Context::create(backend).context("compiling shader programs")?;
    let mut font = Font::load(&ctx, &config).context("creating font")?;
    let generated = font
        .generate(first..=last)
        .with_context(|| format!("generating U+{first:04X}..=U+{last:04X}"))?;
    tracing::info!("Generated {} glyphs", generated);

    let quads = match text {
        Some(text) => {
            let style = TextStyle {
                size,
                ..TextStyle::default()
            };
            let instances = font.layout_line(text, 0.0, font.vertical_advance() * size, &style);
            font.quads(&instances)
        }
        None => Vec::new(),
    };

    let report = PlanReport {
        font_source: config.font_source.clone(),
        texture_size: font.texture_size(),
        range: font.range(),
        scale: font.scale(),
        vertical_advance: font.vertical_advance(),
        stats: font.atlas_stats(),
        glyphs: font
            .glyphs()
            .into_iter()
            .map(|(glyph_id, entry)| PlacedGlyph {
                glyph_id,
                character: char::from_u32(glyph_id),
                advance: font.horizontal_advance(glyph_id),
                entry,
            })
            .collect(),
        quads,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}  {}px atlas, range {}, scale {}",
        report.font_source.display(),
        report.texture_size,
        report.range,
        report.scale
    );
    println!(
        "{} glyphs in {} rows, {:.1}% used, cursor at ({}, {})",
        report.stats.glyphs,
        report.stats.rows,
        report.stats.utilization * 100.0,
        report.stats.cursor.0,
        report.stats.cursor.1
    );
    println!();
    println!("{:>8}  {:>4}  {:>12}  {:>12}  {:>8}", "id", "char", "atlas", "footprint", "advance");
    for glyph in &report.glyphs {
        let e = &glyph.entry;
        println!(
            "{:>8}  {:>4}  {:>12}  {:>12}  {:>8.2}",
            format!("U+{:04X}", glyph.glyph_id),
            glyph.character.filter(|c| !c.is_control()).map(String::from).unwrap_or_default(),
            format!("{},{}", e.atlas_x, e.atlas_y),
            format!("{:.1}x{:.1}", e.footprint_w, e.footprint_h),
            glyph.advance.unwrap_or(0.0)
        );
    }
    if !report.quads.is_empty() {
        println!();
        for quad in &report.quads {
            let (min, max) = quad.bounds();
            println!(
                "U+{:04X}  ({:.1}, {:.1}) .. ({:.1}, {:.1})  uv ({:.4}, {:.4}) .. ({:.4}, {:.4})",
                quad.glyph_id,
                min[0],
                min[1],
                max[0],
                max[1],
                quad.uv_min[0],
                quad.uv_min[1],
                quad.uv_max[0],
                quad.uv_max[1]
            );
        }
    }
    Ok(())
}

fn cmd_inspect(font_path: PathBuf, glyph: char, em_size: f32, face: u32, json: bool) -> Result<()> {
    if !(em_size.is_finite() && em_size > 0.0) {
        bail!("--em-size must be > 0, got {em_size}");
    }
    let outlines = TtfOutlines::open(&font_path, face, em_size)
        .with_context(|| format!("opening {}", font_path.display()))?;
    let (shape, metrics) = outlines.shape(glyph as u32)?;
    let sizes = outlines.buffer_sizes(glyph as u32)?;

    let report = InspectReport {
        glyph,
        width: metrics.width,
        height: metrics.height,
        bearing_x: metrics.bearing_x,
        bearing_y: metrics.bearing_y,
        advance: metrics.advance,
        vertical_advance: outlines.vertical_advance(),
        meta_bytes: sizes.meta,
        point_bytes: sizes.points,
        contours: shape
            .contours
            .iter()
            .map(|contour| {
                contour
                    .segments
                    .iter()
                    .map(|segment| SegmentReport {
                        degree: segment.degree(),
                        color: segment.color.name(),
                        points: segment.points().iter().map(|p| [p.x, p.y]).collect(),
                    })
                    .collect()
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("'{}' U+{:04X}", glyph, glyph as u32);
    println!(
        "  bbox {:.2}x{:.2}, bearing ({:.2}, {:.2}), advance {:.2}, line {:.2}",
        report.width,
        report.height,
        report.bearing_x,
        report.bearing_y,
        report.advance,
        report.vertical_advance
    );
    println!(
        "  streams: {} meta bytes, {} point bytes",
        report.meta_bytes, report.point_bytes
    );
    for (i, contour) in shape.contours.iter().enumerate() {
        println!("  contour {} ({} segments)", i, contour.segments.len());
        for segment in &contour.segments {
            let kind = match segment.kind {
                SegmentKind::Linear(_) => "line",
                SegmentKind::Quadratic(_) => "quad",
                SegmentKind::Cubic(_) => "cubic",
            };
            let start = segment.start();
            let end = segment.end();
            println!(
                "    {:<5} {:<7} ({:.2}, {:.2}) -> ({:.2}, {:.2})",
                kind,
                segment.color.name(),
                start.x,
                start.y,
                end.x,
                end.y
            );
        }
    }
    Ok(())
}
