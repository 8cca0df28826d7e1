#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use std::path::PathBuf;
#[cfg(feature = "gui")]
use std::sync::mpsc::{channel, Receiver, TryRecvError};
#[cfg(feature = "gui")]
use std::thread;
#[cfg(feature = "gui")]
use std::time::Instant;

#[cfg(feature = "gui")]
use stepmap::{
    decode_track, format_time, AudioOutput, BeatmapEditor, DecodedTrack, Direction, EditorError,
    KeyCapture, Note,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let initial = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 760.0])
            .with_drag_and_drop(true)
            .with_title("STEPMAP - Step Editor"),
        ..Default::default()
    };

    eframe::run_native(
        "STEPMAP",
        options,
        Box::new(move |_cc| Ok(Box::new(EditorApp::new(initial)))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
type DecodeResult = (String, Result<DecodedTrack, EditorError>);

#[cfg(feature = "gui")]
enum Command {
    Note(Direction),
    TogglePlayback,
}

#[cfg(feature = "gui")]
struct EditorApp {
    editor: BeatmapEditor<AudioOutput>,
    keys: KeyCapture,
    decoding: Option<Receiver<DecodeResult>>,

    // UI state
    audio_path: String,
    export_path: String,
}

#[cfg(feature = "gui")]
impl EditorApp {
    fn new(initial: Option<PathBuf>) -> Self {
        let mut app = Self {
            editor: BeatmapEditor::new(AudioOutput::default()),
            keys: KeyCapture::new(),
            decoding: None,
            audio_path: String::new(),
            export_path: "pattern.lua".to_string(),
        };
        if let Some(path) = initial {
            app.audio_path = path.display().to_string();
            app.start_load(path);
        }
        app
    }

    /// Read and decode off the UI thread; `poll_decode` picks up the result
    fn start_load(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        thread::spawn(move || {
            let result = std::fs::read(&path)
                .map_err(|e| EditorError::Decode(format!("{}: {}", path.display(), e)))
                .and_then(|bytes| decode_track(bytes, extension.as_deref()));
            let _ = sender.send((file_name, result));
        });

        self.decoding = Some(receiver);
        self.editor.set_status("Decoding...");
    }

    fn poll_decode(&mut self) {
        let Some(receiver) = &self.decoding else {
            return;
        };

        match receiver.try_recv() {
            Ok((file_name, Ok(track))) => {
                self.editor.install_track(&file_name, track);
                self.decoding = None;
            }
            Ok((_, Err(err))) => {
                self.editor.set_status(err.to_string());
                self.decoding = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.decoding = None,
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        let now = Instant::now();
        let mut commands = Vec::new();
        ctx.input(|i| {
            for event in &i.events {
                if let egui::Event::Key {
                    key,
                    pressed: true,
                    repeat,
                    ..
                } = event
                {
                    let direction = match key {
                        egui::Key::ArrowLeft => Some(Direction::Left),
                        egui::Key::ArrowDown => Some(Direction::Down),
                        egui::Key::ArrowUp => Some(Direction::Up),
                        egui::Key::ArrowRight => Some(Direction::Right),
                        egui::Key::Space if !repeat => {
                            commands.push(Command::TogglePlayback);
                            None
                        }
                        _ => None,
                    };
                    if let Some(direction) = direction {
                        if self.keys.accept(direction, *repeat, now) {
                            commands.push(Command::Note(direction));
                        }
                    }
                }
            }
        });

        for command in commands {
            let _ = match command {
                Command::Note(direction) => self.editor.register_key_press(direction).map(|_| ()),
                Command::TogglePlayback => self.editor.toggle_playback(),
            };
        }
    }

    fn save_pattern(&mut self) {
        if let Ok(doc) = self.editor.export_pattern() {
            if let Err(e) = std::fs::write(&self.export_path, doc) {
                self.editor
                    .set_status(format!("Could not write {}: {}", self.export_path, e));
            }
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.poll_decode();
        self.editor.update();
        self.handle_keys(ctx);

        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.audio_path = path.display().to_string();
            self.start_load(path);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("STEPMAP - Step Editor");
            ui.add_space(10.0);

            // Track selection
            ui.horizontal(|ui| {
                ui.label("Audio file:");
                ui.text_edit_singleline(&mut self.audio_path);
                let busy = self.decoding.is_some();
                if ui.add_enabled(!busy, egui::Button::new("Load")).clicked() {
                    let path = PathBuf::from(self.audio_path.trim());
                    self.start_load(path);
                }
            });

            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                let label = if self.editor.is_playing() {
                    "⏸ Pause"
                } else {
                    "▶ Play"
                };
                if ui.button(label).clicked() {
                    let _ = self.editor.toggle_playback();
                }
                if ui.button("⏹ Stop").clicked() {
                    self.editor.stop();
                    self.keys.reset();
                }

                ui.add_space(20.0);

                ui.label("Save as:");
                ui.text_edit_singleline(&mut self.export_path);
                if ui.button("💾 Save").clicked() {
                    self.save_pattern();
                }
            });

            ui.add_space(10.0);

            ui.horizontal(|ui| {
                let duration = self.editor.duration().unwrap_or(0.0);
                ui.monospace(format!(
                    "{} / {}",
                    format_time(self.editor.current_time()),
                    format_time(duration)
                ));
                ui.add_space(20.0);
                ui.label(self.editor.status());
            });

            ui.separator();

            let notes: Vec<Note> = self.editor.snapshot().to_vec();
            let current = self.editor.current_notes();
            let upcoming = self.editor.upcoming_note();
            let mut delete = None;

            if notes.is_empty() {
                ui.label("No notes yet. Use arrow keys to add notes.");
            } else {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for (i, note) in notes.iter().enumerate() {
                            ui.horizontal(|ui| {
                                let text = format!(
                                    "{}   {}",
                                    format_time(note.time()),
                                    note.direction().label().to_uppercase()
                                );
                                let row = if current.contains(&i) {
                                    ui.colored_label(egui::Color32::from_rgb(100, 200, 100), text)
                                } else {
                                    ui.monospace(text)
                                };
                                if upcoming == Some(i) {
                                    row.scroll_to_me(Some(egui::Align::Center));
                                }
                                if ui.small_button("×").clicked() {
                                    delete = Some(i);
                                }
                            });
                        }
                    });
            }

            if let Some(index) = delete {
                let _ = self.editor.delete_note(index);
            }

            // Info
            ui.separator();
            ui.label("Arrow keys place notes, space toggles playback");
            if !self.editor.clock().backend().has_device() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No audio output device - timing from the system clock",
                );
            }
        });
    }
}
