use std::process::ExitCode;

use dbdiagram::{DiagramConfig, DiagramView};
use tracing::{debug, error, info};

const DEFAULT_VIEWPORT: (f64, f64) = (1280.0, 800.0);

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "no .env loaded");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        eprintln!("usage: dbdiagram <schema.dbml> [width height]");
        return ExitCode::from(2);
    };
    let (width, height) = match (args.get(1), args.get(2)) {
        (Some(w), Some(h)) => match (w.parse::<f64>(), h.parse::<f64>()) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                eprintln!("invalid viewport size: {w} {h}");
                return ExitCode::from(2);
            }
        },
        _ => DEFAULT_VIEWPORT,
    };

    let config = match DiagramConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, path = %path, "failed to read schema");
            return ExitCode::FAILURE;
        }
    };

    let mut view = DiagramView::new(dbml::Parser::new(), config);
    view.set_viewport_size(width, height);
    view.on_content_changed(&text, 0);
    view.flush();

    if let Some(record) = view.error() {
        match serde_json::to_string_pretty(record) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "failed to encode parse error"),
        }
        return ExitCode::FAILURE;
    }

    view.apply_auto_layout();
    view.apply_scale_to_fit();

    let frame = view.render_frame();
    info!(
        tables = frame.tables.len(),
        table_groups = frame.table_groups.len(),
        refs = frame.refs.len(),
        zoom_percent = frame.zoom_percent,
        "diagram laid out"
    );
    match serde_json::to_string_pretty(&frame) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to encode render frame");
            ExitCode::FAILURE
        }
    }
}
