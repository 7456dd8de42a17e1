mod app;
mod demo;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pictor_engine::device::GpuInit;
use pictor_engine::export::{export, ExportFormat, ExportOptions};
use pictor_engine::logging::{init_logging, LoggingConfig};
use pictor_engine::window::{Runtime, RuntimeConfig};
use pictor_engine::{Color, EngineConfig, SharedDocument};
use pictor_import::{import_blocking, source_for, Importer};

use app::StudioApp;

/// Pictor Studio - vector document viewer and exporter
#[derive(Parser, Debug)]
#[command(name = "pictor-studio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, short, default_value = "pictor.json")]
    config: PathBuf,

    /// Log filter, e.g. "debug" or "pictor_engine=trace"; overrides the config file
    #[arg(long)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a window on a document (a demo scene when no source is given)
    View {
        /// File path or http(s) URL of a source document
        source: Option<String>,

        #[arg(long, default_value = "Pictor Studio")]
        title: String,
    },
    /// Import a document and write it in a static format
    Export {
        /// File path or http(s) URL of a source document
        source: String,

        output: PathBuf,

        /// Output format; guessed from the output extension when absent
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Output pixels per document unit
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Background color as #rrggbb
        #[arg(long)]
        background: Option<String>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Svg,
    Pdf,
    Png,
    Jpeg,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Svg => ExportFormat::Svg,
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpeg => ExportFormat::Jpeg,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = EngineConfig::try_load(&cli.config);
    let config = loaded.as_ref().map(Clone::clone).unwrap_or_default();
    init_logging(match &cli.log {
        Some(filter) => LoggingConfig::with_filter(filter.clone()),
        None => config.logging.to_logging_config(),
    });
    if let Err(e) = &loaded {
        log::warn!("using default configuration: {e:#}");
    }

    match cli.command {
        Command::View { source, title } => view(config, source, title),
        Command::Export {
            source,
            output,
            format,
            scale,
            background,
        } => {
            let format = match format {
                Some(f) => f.into(),
                None => output
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(ExportFormat::from_extension)
                    .with_context(|| format!("cannot guess format of {}; pass --format", output.display()))?,
            };
            let options = ExportOptions {
                scale,
                background: background.as_deref().map(parse_hex_color).transpose()?,
                tolerance: config.render.flatten_tolerance,
                ..ExportOptions::default()
            };
            export_file(&config, &source, &output, format, options)
        }
    }
}

fn view(config: EngineConfig, source: Option<String>, title: String) -> Result<()> {
    let doc = SharedDocument::default();
    let rt = tokio::runtime::Runtime::new().context("failed to start import runtime")?;

    match source {
        Some(location) => {
            let importer = Importer::new(doc.clone());
            let _guard = rt.enter();
            let handle = importer.spawn(source_for(&location, &config.import));
            rt.spawn(async move {
                match handle.wait().await {
                    Ok(report) => log::info!("{location}: {} nodes at r{}", report.created.len(), report.revision),
                    Err(e) => log::error!("{location}: {e}"),
                }
            });
        }
        None => demo::populate(&doc)?,
    }

    let runtime_config = RuntimeConfig {
        title,
        ..RuntimeConfig::default()
    };
    Runtime::run(runtime_config, doc, config.render, GpuInit::default(), StudioApp::new())
}

fn export_file(
    config: &EngineConfig,
    location: &str,
    output: &Path,
    format: ExportFormat,
    mut options: ExportOptions,
) -> Result<()> {
    let doc = SharedDocument::default();
    let report = import_blocking(&doc, source_for(location, &config.import).as_ref())
        .with_context(|| format!("importing {location}"))?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if options.background.is_none() {
        options.background = report.background;
    }

    let bytes = export(&doc.snapshot(), format, &options).with_context(|| format!("exporting {format:?}"))?;
    std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    log::info!("wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

fn parse_hex_color(s: &str) -> Result<Color> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid color {s:?}, expected #rrggbb");
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff8000").unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(parse_hex_color("00ff00").unwrap(), Color::rgb(0, 255, 0));
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn export_defaults_to_the_scene_background() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("pictor-studio-{}.json", std::process::id()));
        let output = dir.join(format!("pictor-studio-{}.svg", std::process::id()));
        std::fs::write(
            &input,
            r#"{ "document": {
                "scenes": { "s": { "children": ["r"], "backgroundColor": { "r": 240, "g": 240, "b": 240 } } },
                "nodes": { "r": { "type": "rectangle", "width": 8, "height": 8,
                                  "fill": { "type": "solid", "color": { "r": 0, "g": 0, "b": 0 } } } } } }"#,
        )
        .unwrap();

        let location = input.display().to_string();
        let config = EngineConfig::default();
        export_file(&config, &location, &output, ExportFormat::Svg, ExportOptions::default()).unwrap();
        let scene_bg = std::fs::read_to_string(&output).unwrap();

        let options = ExportOptions {
            background: Some(Color::rgb(255, 0, 0)),
            ..ExportOptions::default()
        };
        export_file(&config, &location, &output, ExportFormat::Svg, options).unwrap();
        let explicit_bg = std::fs::read_to_string(&output).unwrap();

        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&output).unwrap();
        assert!(scene_bg.contains(r##"<rect width="8" height="8" fill="#f0f0f0"/>"##));
        assert!(explicit_bg.contains(r##"fill="#ff0000""##));
        assert!(!explicit_bg.contains("#f0f0f0"));
    }

    #[test]
    fn cli_parses_export() {
        let cli = Cli::try_parse_from(["pictor-studio", "export", "in.json", "out.pdf", "--scale", "2"]).unwrap();
        let Command::Export { scale, format, .. } = cli.command else {
            panic!("expected export");
        };
        assert_eq!(scale, 2.0);
        assert!(format.is_none());
    }
}
