//! barmeter - animated audio level meter with a stream control panel
//!
//! The window hosts a stream form that issues pipeline control messages
//! (`set_uri`, `stop`, `quit`) and shows one animated level meter per
//! viewer. Levels come from the default audio input device, or from
//! built-in oscillators when no device is available.

use std::time::{Duration, Instant};

use eframe::egui;

mod audio;
mod board;
mod control;
mod meter;
mod pipeline;
mod render;
mod settings;

use board::{MeterBoard, ViewerId};
use control::{ControlMessage, NativeReply, StreamMode};
use meter::{LevelMeter, MeterConfig};
use pipeline::Pipeline;
use render::{DisplayList, MeterView};
use settings::AppSettings;

/// The single viewer fed by the local level source
const LOCAL_VIEWER: ViewerId = ViewerId(0);

/// Repaint cadence while a source is running, to pick up new snapshots
const SOURCE_POLL: Duration = Duration::from_millis(16);

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting barmeter");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 420.0])
            .with_title("barmeter"),
        ..Default::default()
    };

    eframe::run_native(
        "barmeter",
        options,
        Box::new(|cc| Ok(Box::new(MeterApp::new(cc)))),
    )
}

/// Main application state
struct MeterApp {
    settings: AppSettings,
    pipeline: Pipeline,
    board: MeterBoard<DisplayList>,
    status: String,
    last_command: String,
}

impl MeterApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();

        let config = settings.meter_config().unwrap_or_else(|e| {
            log::warn!("{}, using the default meter", e);
            MeterConfig::default()
        });
        let mut board = MeterBoard::new();
        board.open(LOCAL_VIEWER, LevelMeter::new(config, DisplayList::new()));

        let pipeline = Pipeline::new(&settings);

        Self {
            settings,
            pipeline,
            board,
            status: "Ready".to_string(),
            last_command: String::new(),
        }
    }

    fn run(&mut self, mode: StreamMode, ctx: &egui::Context) {
        let address = self.settings.stream_address();
        let message = ControlMessage::set_uri(mode, &address, self.settings.relay_addr.clone());
        self.send(message, ctx);
    }

    fn send(&mut self, message: ControlMessage, ctx: &egui::Context) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                self.handle_reply(&NativeReply::Error(e.to_string()));
                return;
            }
        };
        log::info!("Command: {}", json);

        let reply = NativeReply::parse(&self.pipeline.handle(&json));
        self.last_command = json;
        self.handle_reply(&reply);

        match message {
            ControlMessage::SetUri { .. } => self.settings.save(),
            ControlMessage::Stop => {}
            ControlMessage::Quit => {
                if self.board.close(LOCAL_VIEWER).is_some() {
                    log::debug!("Meter surface released");
                }
                self.settings.save();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn handle_reply(&mut self, reply: &NativeReply) {
        if let NativeReply::Error(message) = reply {
            log::error!("Pipeline error: {}", message);
        }
        self.status = reply.status_text();
    }

    /// Feed the newest snapshot to the meter and run due animation ticks
    fn pump(&mut self, ctx: &egui::Context) {
        let now = Instant::now();

        if let Some(snapshot) = self.pipeline.poll(now) {
            if let Err(e) = self.board.push(LOCAL_VIEWER, &snapshot) {
                log::warn!("Dropped snapshot: {}", e);
            }
        }
        self.board.poll();

        if self.pipeline.is_running() {
            ctx.request_repaint_after(SOURCE_POLL);
        }
        if let Some(deadline) = self.board.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }
}

impl eframe::App for MeterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump(ctx);

        let mut command = None;

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("barmeter");
                ui.separator();
                ui.label(&self.status);
                ui.separator();
                ui.label(format!("{} meter(s)", self.board.len()));
            });
        });

        // Stream form
        egui::SidePanel::left("stream_panel")
            .min_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Stream");
                ui.separator();

                egui::Grid::new("stream_form").num_columns(2).show(ui, |ui| {
                    ui.label("Source");
                    ui.text_edit_singleline(&mut self.settings.source_addr);
                    ui.end_row();

                    ui.label("Multicast group");
                    ui.text_edit_singleline(&mut self.settings.multicast_addr);
                    ui.end_row();

                    ui.label("Port");
                    ui.add(egui::DragValue::new(&mut self.settings.multicast_port));
                    ui.end_row();

                    ui.label("AMT relay");
                    ui.text_edit_singleline(&mut self.settings.relay_addr);
                    ui.end_row();
                });

                ui.separator();

                ui.horizontal(|ui| {
                    for &mode in StreamMode::ALL {
                        if ui.button(mode.name()).clicked() {
                            command = Some(Command::Run(mode));
                        }
                    }
                });

                ui.horizontal(|ui| {
                    if ui.button("⏹ Stop").clicked() {
                        command = Some(Command::Send(ControlMessage::Stop));
                    }
                    if ui.button("Quit").clicked() {
                        command = Some(Command::Send(ControlMessage::Quit));
                    }
                });

                if !self.last_command.is_empty() {
                    ui.separator();
                    ui.collapsing("Last command", |ui| {
                        ui.monospace(&self.last_command);
                    });
                }
            });

        // Meters
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.board.is_empty() {
                ui.label("No meters open");
            }
            for (id, viewer) in self.board.iter() {
                ui.small(format!(
                    "{}: {} channels, {} snapshots",
                    id,
                    viewer.channel_count(),
                    viewer.snapshots()
                ));
                if viewer.has_data() {
                    MeterView::show(ui, viewer.meter().surface());
                } else {
                    ui.label("Waiting for level data...");
                }
                ui.separator();
            }
        });

        match command {
            Some(Command::Run(mode)) => self.run(mode, ctx),
            Some(Command::Send(message)) => self.send(message, ctx),
            None => {}
        }
    }
}

/// A button press, dispatched after the panels are drawn
enum Command {
    Run(StreamMode),
    Send(ControlMessage),
}
