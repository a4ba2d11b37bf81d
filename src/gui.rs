//! GUI rendering components for the Subgrab subtitle downloader
//!
//! This module contains all the UI rendering methods and components.

use std::path::PathBuf;

use eframe::egui;

use crate::{
    config::APP_VERSION,
    data_structures::{JobStatus, SubtitleDownloader},
    helper_functions::Utils,
    info, warn,
};

const PURPLE: egui::Color32 = egui::Color32::from_rgb(189, 147, 249);
const GREEN: egui::Color32 = egui::Color32::from_rgb(80, 250, 123);
const YELLOW: egui::Color32 = egui::Color32::from_rgb(241, 250, 140);
const ORANGE: egui::Color32 = egui::Color32::from_rgb(255, 184, 108);
const PINK: egui::Color32 = egui::Color32::from_rgb(255, 121, 198);
const RED: egui::Color32 = egui::Color32::from_rgb(255, 85, 85);
const CYAN: egui::Color32 = egui::Color32::from_rgb(139, 233, 253);

fn status_color(status: JobStatus) -> egui::Color32 {
    match status {
        JobStatus::Queued => YELLOW,
        JobStatus::Searching | JobStatus::Downloading | JobStatus::Converting => PURPLE,
        JobStatus::Downloaded => GREEN,
        JobStatus::NotFound => ORANGE,
        JobStatus::Partial => PINK,
        JobStatus::Error => RED,
    }
}

/// Three-quarter arc rotating at a constant speed
fn draw_spinner(ui: &mut egui::Ui) {
    let time = ui.ctx().input(|i| i.time) as f32;
    let rotation_speed = 2.0; // radians per second
    let angle = (time * rotation_speed) % (2.0 * std::f32::consts::PI);
    let center = ui.cursor().min + egui::vec2(8.0, 8.0);
    let radius = 6.0;
    let painter = ui.painter();
    let end_angle = angle + std::f32::consts::PI * 1.5;
    let segments = 16;
    let angle_step = (end_angle - angle) / segments as f32;
    for i in 0..segments {
        let a1 = angle + i as f32 * angle_step;
        let a2 = angle + (i + 1) as f32 * angle_step;
        let p1 = center + egui::vec2(radius * a1.cos(), radius * a1.sin());
        let p2 = center + egui::vec2(radius * a2.cos(), radius * a2.sin());
        painter.line_segment([p1, p2], egui::Stroke::new(2.0, PURPLE));
    }
    ui.add_space(20.0);
}

/// Path label that underlines on hover; returns true when clicked
fn path_link(ui: &mut egui::Ui, text: &str) -> bool {
    let response = ui.add(egui::Label::new(egui::RichText::new(text).color(CYAN)).sense(egui::Sense::click()));
    if response.hovered() {
        let rect = response.rect;
        let y = rect.bottom() - 1.0;
        ui.painter().line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            egui::Stroke::new(1.5, CYAN),
        );
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
    response.on_hover_text("Open containing folder").clicked()
}

impl SubtitleDownloader {
    /// Render the application header
    pub fn render_header(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("Subgrab v{} - Subtitle Downloader", APP_VERSION))
                    .color(PURPLE)
                    .heading(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(version) = &self.python_version {
                    ui.label(egui::RichText::new(version).weak());
                }
            });
        });
        ui.add_space(5.0);
    }

    /// Render Python and subliminal status with the install action
    pub fn render_dependency_status(&mut self, ui: &mut egui::Ui) {
        if !self.dependency_checked {
            ui.horizontal(|ui| {
                draw_spinner(ui);
                ui.label("Checking for Python and Subliminal...");
            });
            return;
        }

        if self.python_version.is_none() {
            ui.label(egui::RichText::new("❌ Python 3 not found").color(RED));
            #[cfg(windows)]
            ui.label("Install Python 3 from python.org, then restart Subgrab.");
            #[cfg(target_os = "macos")]
            ui.label("Install Python 3 from python.org or with Homebrew: 'brew install python3'");
            #[cfg(not(any(windows, target_os = "macos")))]
            ui.label("Install Python 3 and python3-pip using your package manager, then restart Subgrab.");
            return;
        }

        if self.installing_subliminal {
            ui.horizontal(|ui| {
                draw_spinner(ui);
                ui.label("Installing Subliminal...");
            });
        } else if !self.subliminal_installed {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("❌ Subliminal not found").color(ORANGE));
                if ui.button("Install Subliminal").clicked() {
                    self.start_subliminal_install();
                }
            });
        }
    }

    /// Render the query and language fields
    pub fn render_query_input(&mut self, ui: &mut egui::Ui) {
        let mut submit = false;
        ui.horizontal(|ui| {
            ui.label("Search:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.query_input)
                    .hint_text("Show S01E01, Movie 2019 or a file name")
                    .desired_width(ui.available_width() - 170.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
                response.request_focus();
            }

            ui.label("Language:");
            ui.add(
                egui::TextEdit::singleline(&mut self.language_input)
                    .hint_text(self.settings.default_language.as_str())
                    .desired_width(60.0),
            )
            .on_hover_text("ISO 639 code such as eng, fre or pt-BR; blank uses the default");
        });
        if submit {
            self.submit();
        }
    }

    /// Render queue control buttons
    pub fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Add & Start").clicked() {
                self.submit();
            }
            if ui.button("Choose Default Download Folder").clicked() {
                self.choose_folder();
            }
            if ui.button("Clear Queue").clicked() {
                self.clear_queue();
            }
            if ui
                .add_enabled(self.is_busy(), egui::Button::new("Stop After Current"))
                .clicked()
            {
                self.stop_after_current();
            }
            let unfinished = self.unfinished_jobs();
            if unfinished > 0 {
                ui.label(egui::RichText::new(format!("{} job(s) in queue", unfinished)).color(YELLOW));
            }
        });
    }

    /// Render one row per job with its live status
    pub fn render_job_table(&mut self, ui: &mut egui::Ui) {
        if self.rows.is_empty() {
            ui.label(egui::RichText::new("No jobs yet").weak());
            return;
        }

        let mut open: Option<PathBuf> = None;
        egui::ScrollArea::vertical()
            .id_source("jobs")
            .max_height((ui.available_height() - 120.0).max(120.0))
            .auto_shrink([false, true])
            .show(ui, |ui| {
                egui::Grid::new("job_table")
                    .num_columns(4)
                    .striped(true)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        ui.strong("#");
                        ui.strong("Query");
                        ui.strong("Status");
                        ui.strong("Details");
                        ui.end_row();

                        for row in &self.rows {
                            ui.label(row.id.0.to_string());
                            ui.label(Utils::truncate_string(&row.query, 40));
                            ui.label(egui::RichText::new(row.status.label()).color(status_color(row.status)));
                            match &row.saved_path {
                                Some(path) => {
                                    let text = format!("📄 {}", Utils::get_file_name(path));
                                    if path_link(ui, &text) {
                                        open = Some(path.clone());
                                    }
                                }
                                None => {
                                    ui.label(Utils::truncate_string(&row.message, 80));
                                }
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(path) = open {
            self.open_folder_of(&path);
        }
    }

    /// Render files downloaded this session
    pub fn render_downloads(&mut self, ui: &mut egui::Ui) {
        let mut open: Option<PathBuf> = None;
        egui::CollapsingHeader::new(format!("Downloaded files ({})", self.downloads.len()))
            .default_open(true)
            .show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_source("downloads")
                    .max_height(100.0)
                    .show(ui, |ui| {
                        for path in &self.downloads {
                            if path_link(ui, &path.display().to_string()) {
                                open = Some(path.clone());
                            }
                        }
                    });
            });
        if let Some(path) = open {
            self.open_folder_of(&path);
        }
    }

    /// Render status with a spinner while the worker is running
    pub fn render_status(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.is_busy() {
                draw_spinner(ui);
            }
            ui.label(&self.status);
        });
        ui.label(
            egui::RichText::new(format!(
                "Download folder: {}",
                self.settings.download_directory.display()
            ))
            .weak(),
        );
    }
}

impl eframe::App for SubtitleDownloader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.poll_dependency_check();
        self.poll_install();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.render_status(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_header(ui);
            self.render_dependency_status(ui);
            ui.separator();
            self.render_query_input(ui);
            self.render_controls(ui);
            ui.separator();
            self.render_job_table(ui);
            ui.separator();
            self.render_downloads(ui);
        });

        if self.is_busy() || self.installing_subliminal || !self.dependency_checked {
            // Smooth spinner
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(1000));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.is_busy() {
            warn!("Closing with a job in progress; {} job(s) still queued", self.runner.pending_count());
        }
        info!("Application closed by user");
        info!("");
        info!("---------------------------------------------------------------");
        info!("");
    }
}
