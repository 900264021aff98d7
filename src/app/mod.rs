use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context};
use tracing::{debug, info, warn};

use crate::layout::QuadtreeCell;
use crate::settings::Settings;
use crate::view::{FrameLoop, GraphView, ViewEvent};
use crate::workspace::{GraphLoader, LoadedGraph};

mod render;
mod ui;

/// Repaint cadence while a load is in flight or the layout is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const IDLE_REPAINT: Duration = Duration::from_millis(500);

pub struct CodeGraphApp {
    root: PathBuf,
    settings: Settings,
    settings_path: Option<PathBuf>,
    loader: GraphLoader,
    state: AppState,
}

enum AppState {
    Loading,
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    view: GraphView,
    frame_loop: FrameLoop,
    root: PathBuf,
    stats: LoadStats,
    /// Last reload failure, shown while the previous graph stays up.
    status: Option<String>,
    search: String,
    label_zoom_threshold: f32,
    show_quadtree_overlay: bool,
    quadtree_cells: Vec<QuadtreeCell>,
    pointer_captured: bool,
    needs_fit: bool,
}

#[derive(Clone, Copy, Debug)]
struct LoadStats {
    files: usize,
    unreadable: usize,
    truncated: bool,
    elapsed: Duration,
}

impl LoadStats {
    fn from_loaded(loaded: &LoadedGraph) -> Self {
        Self {
            files: loaded.file_count,
            unreadable: loaded.unreadable,
            truncated: loaded.truncated,
            elapsed: loaded.elapsed,
        }
    }
}

impl CodeGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        root: PathBuf,
        settings: Settings,
        settings_path: Option<PathBuf>,
    ) -> Self {
        let mut app = Self {
            root,
            settings,
            settings_path,
            loader: GraphLoader::new(),
            state: AppState::Loading,
        };
        app.request_load();
        app
    }

    fn request_load(&mut self) {
        self.loader
            .request(self.root.clone(), self.settings.scan.clone());
    }

    fn receive_loaded(&mut self) {
        let Some(result) = self.loader.poll() else {
            return;
        };

        match result {
            Ok(loaded) => {
                info!(
                    "loaded {} nodes and {} edges in {:.2?}",
                    loaded.graph.node_count(),
                    loaded.graph.edge_count(),
                    loaded.elapsed
                );
                if let AppState::Ready(model) = &mut self.state {
                    model.replace_graph(loaded);
                } else {
                    self.state = AppState::Ready(Box::new(ViewModel::new(loaded, &self.settings)));
                }
            }
            Err(error) => {
                warn!("graph load failed: {error}");
                if let AppState::Ready(model) = &mut self.state {
                    model.status = Some(error);
                } else {
                    self.state = AppState::Error(error);
                }
            }
        }
    }

    fn handle_event(&mut self, event: ViewEvent) {
        match &event {
            ViewEvent::NodeActivated { id, origin } => {
                debug!("activated {id}");
                if let Err(error) = open_in_editor(origin) {
                    warn!("{error:#}");
                }
            }
            ViewEvent::SelectionCleared => debug!("selection cleared"),
            ViewEvent::FunctionNodesToggled(_) | ViewEvent::TypeColorChanged { .. } => {}
        }

        if self.settings.apply_event(&event) {
            self.persist_settings();
        }
    }

    fn persist_settings(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        match self.settings.save(path) {
            Ok(()) => debug!("saved settings to {}", path.display()),
            Err(error) => warn!("{error:#}"),
        }
    }
}

impl eframe::App for CodeGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.receive_loaded();

        let mut reload_requested = false;
        let mut events = Vec::new();
        let is_loading = self.loader.is_loading();

        match &mut self.state {
            AppState::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Scanning {}...", self.root.display()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the workspace graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    let retry = ui.add_enabled(!is_loading, egui::Button::new("Retry"));
                    if retry.clicked() {
                        reload_requested = true;
                    }
                });
            }
            AppState::Ready(model) => {
                model.show(ctx, &mut reload_requested, is_loading);
                events = model.view.drain_events();
            }
        }

        if reload_requested {
            if matches!(self.state, AppState::Error(_)) {
                self.state = AppState::Loading;
            }
            self.request_load();
        }
        for event in events {
            self.handle_event(event);
        }

        if self.loader.is_loading() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let AppState::Ready(model) = &mut self.state {
            model.frame_loop.destroy();
        }
    }
}

/// Opens `path` with the platform's default handler.
fn open_in_editor(path: &Path) -> Result<()> {
    let mut command = opener_command();
    command.arg(path);
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to open {}", path.display()))?;
    thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(target_os = "macos")]
fn opener_command() -> Command {
    Command::new("open")
}

#[cfg(target_os = "windows")]
fn opener_command() -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command() -> Command {
    Command::new("xdg-open")
}
