//! Subgrab - Subtitle Downloader
//!
//! A desktop application that queues subtitle searches by title and downloads
//! the best match as SRT. Built with Rust and egui.

use eframe::egui;

use subgrab::{info, error};
use subgrab::{setup_logging, shutdown_logging, SubtitleDownloader, APP_VERSION, MIN_WINDOW_SIZE, WINDOW_SIZE};

/// Configure the application window
fn configure_window() -> eframe::NativeOptions {
    let viewport_builder = egui::ViewportBuilder::default()
        .with_inner_size(WINDOW_SIZE)
        .with_decorations(true)
        .with_resizable(true)
        .with_min_inner_size(MIN_WINDOW_SIZE); // Keep the job table and buttons visible

    eframe::NativeOptions {
        viewport: viewport_builder,
        centered: true,
        ..Default::default()
    }
}

/// Apply Dracula theme
fn configure_visuals(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();

    // Dracula theme accent colors
    visuals.override_text_color = Some(egui::Color32::from_rgb(248, 248, 242)); // #f8f8f2 (light gray)
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(189, 147, 249); // #bd93f9 (purple)
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(139, 233, 253); // #8be9fd (cyan)
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(68, 71, 90); // #44475a (darker gray)
    visuals.selection.bg_fill = egui::Color32::from_rgb(189, 147, 249); // #bd93f9 (purple)
    visuals.hyperlink_color = egui::Color32::from_rgb(139, 233, 253); // #8be9fd (cyan)
    visuals.warn_fg_color = egui::Color32::from_rgb(255, 184, 108); // #ffb86c (orange)
    visuals.error_fg_color = egui::Color32::from_rgb(255, 85, 85); // #ff5555 (red)
    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(68, 71, 90); // #44475a
    visuals.widgets.active.fg_stroke.color = egui::Color32::from_rgb(248, 248, 242); // #f8f8f2 (white text on purple)
    visuals.widgets.hovered.fg_stroke.color = egui::Color32::from_rgb(40, 42, 54); // #282a36 (dark text on cyan)

    ctx.set_visuals(visuals);
}

fn main() {
    if let Err(e) = setup_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }
    info!("Starting Subgrab v{}", APP_VERSION);
    info!("Initializing GUI with window size: {}x{}", WINDOW_SIZE[0], WINDOW_SIZE[1]);

    let result = eframe::run_native(
        "Subgrab",
        configure_window(),
        Box::new(|cc| {
            configure_visuals(&cc.egui_ctx);
            info!("GUI initialized successfully");
            Box::new(SubtitleDownloader::new(cc))
        }),
    );

    if let Err(e) = result {
        error!("Failed to start eframe: {}", e);
        eprintln!("Failed to start eframe: {}", e);
    }

    shutdown_logging();
}
