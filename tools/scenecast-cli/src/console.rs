//! Line-oriented command console over a [`Studio`].

use std::io::Write;
use std::time::{Duration, Instant};

use scenecast_capture_engine::{NotificationLevel, RecordingState, Studio};
use scenecast_platform_core::WindowHandle;
use scenecast_scene_model::{SourceKind, TextObject, TransformField};

const HELP: &str = "\
Commands:
  record | pause | resume | stop     control the recording
  status                             show recording and scene state
  scenes                             list scenes
  scene <n>                          switch to scene n
  new-scene <name>                   add a scene
  source <screen|window|camera>      choose the active source
  windows                            list capturable windows
  window <id>                        capture a window from the list
  refresh                            re-read the selected window position
  transform <source> <scale|x|y> <v> edit a source transform
  text <x> <y> <words...>            add a text overlay
  audio <on|off>                     record microphone with the video
  voice                              start/stop a voice-only recording
  help                               this text
  quit                               exit";

/// Redraw period of the full-screen status display.
const REDRAW_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Record,
    Pause,
    Resume,
    Stop,
    Scenes,
    Scene(usize),
    NewScene(String),
    Source(SourceKind),
    Windows,
    Window(WindowHandle),
    Refresh,
    Transform {
        kind: SourceKind,
        field: TransformField,
        value: String,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
    },
    Audio(bool),
    Voice,
    Quit,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("help" | "?", []) => Command::Help,
        ("status", []) => Command::Status,
        ("record" | "start", []) => Command::Record,
        ("pause", []) => Command::Pause,
        ("resume", []) => Command::Resume,
        ("stop", []) => Command::Stop,
        ("scenes", []) => Command::Scenes,
        ("scene", [n]) => Command::Scene(parse_number(n)?),
        ("new-scene", words) if !words.is_empty() => Command::NewScene(words.join(" ")),
        ("source", [kind]) => Command::Source(parse_source(kind)?),
        ("windows", []) => Command::Windows,
        ("window", [id]) => Command::Window(parse_number(id)?),
        ("refresh", []) => Command::Refresh,
        ("transform", [kind, field, value]) => Command::Transform {
            kind: parse_source(kind)?,
            field: parse_field(field)?,
            value: value.to_string(),
        },
        ("text", [x, y, words @ ..]) if !words.is_empty() => Command::Text {
            x: parse_number(x)?,
            y: parse_number(y)?,
            text: words.join(" "),
        },
        ("audio", ["on"]) => Command::Audio(true),
        ("audio", ["off"]) => Command::Audio(false),
        ("voice", []) => Command::Voice,
        ("quit" | "exit" | "q", []) => Command::Quit,
        _ => return Err(format!("unrecognized command `{}` (try `help`)", line.trim())),
    };
    Ok(Some(command))
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("`{raw}` is not a number"))
}

fn parse_source(raw: &str) -> Result<SourceKind, String> {
    match raw.to_ascii_lowercase().as_str() {
        "screen" | "fullscreen" => Ok(SourceKind::Screen),
        "window" => Ok(SourceKind::Window),
        "camera" | "webcam" => Ok(SourceKind::Camera),
        other => Err(format!("unknown source `{other}`")),
    }
}

fn parse_field(raw: &str) -> Result<TransformField, String> {
    match raw.to_ascii_lowercase().as_str() {
        "scale" => Ok(TransformField::Scale),
        "x" | "offset_x" => Ok(TransformField::OffsetX),
        "y" | "offset_y" => Ok(TransformField::OffsetY),
        other => Err(format!("unknown transform field `{other}`")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Console {
    studio: Studio,
    fullscreen: bool,
    awaiting_exit: bool,
    preview_frames: u64,
    last_redraw: Option<Instant>,
}

impl Console {
    pub fn new(studio: Studio, fullscreen: bool) -> Self {
        Self {
            studio,
            fullscreen,
            awaiting_exit: false,
            preview_frames: 0,
            last_redraw: None,
        }
    }

    pub fn start(&mut self) {
        self.studio.start_preview();
        println!("SceneCast ready. Type `help` for commands.");
        self.print_notifications();
    }

    /// UI timer: consume preview frames and surface notifications.
    pub fn tick(&mut self) {
        if self.studio.poll_preview() {
            self.preview_frames += 1;
        }
        self.print_notifications();

        if self.fullscreen && !self.awaiting_exit {
            let due = self
                .last_redraw
                .map_or(true, |at| at.elapsed() >= REDRAW_INTERVAL);
            if due {
                self.redraw();
                self.last_redraw = Some(Instant::now());
            }
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Flow {
        if self.awaiting_exit {
            self.awaiting_exit = false;
            let confirmed = matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes");
            return self.exit(confirmed);
        }

        match parse_command(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Flow::Continue,
            Err(message) => {
                eprintln!("{message}");
                Flow::Continue
            }
        }
    }

    /// Ctrl+C: ask like `quit`; a second Ctrl+C while asking confirms.
    pub fn handle_interrupt(&mut self) -> Flow {
        if self.awaiting_exit {
            self.awaiting_exit = false;
            return self.exit(true);
        }
        println!();
        self.execute(Command::Quit)
    }

    /// Stdin closed: nobody is left to answer, so stop and save.
    pub fn handle_eof(&mut self) -> Flow {
        self.exit(true)
    }

    pub fn finish(&mut self) {
        self.print_notifications();
        tracing::info!(preview_frames = self.preview_frames, "SceneCast exiting");
    }

    fn exit(&mut self, confirmed: bool) -> Flow {
        let exited = self.studio.request_exit(|| confirmed);
        self.print_notifications();
        if exited {
            Flow::Exit
        } else {
            println!("Still recording.");
            Flow::Continue
        }
    }

    fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::Help => println!("{HELP}"),
            Command::Status => self.print_status(),
            Command::Record => {
                if let Some(path) = self.studio.start_recording() {
                    println!("Recording to {}", path.display());
                }
            }
            Command::Pause => {
                self.studio.pause_recording();
            }
            Command::Resume => {
                self.studio.resume_recording();
            }
            Command::Stop => {
                self.studio.stop_recording();
            }
            Command::Scenes => self.print_scenes(),
            Command::Scene(index) => {
                if self.studio.select_scene(index) {
                    println!("Scene: {}", self.studio.active_scene().name);
                }
            }
            Command::NewScene(name) => {
                let index = self.studio.add_scene(name);
                println!("Added scene {index}");
            }
            Command::Source(kind) => {
                self.studio.edit_scene(|scene| scene.select_source(kind));
                println!("Source: {kind:?}");
            }
            Command::Windows => {
                for window in self.studio.list_windows() {
                    println!(
                        "{:>10}  {:>5}x{:<5} {} ({})",
                        window.handle,
                        window.rect.width(),
                        window.rect.height(),
                        window.title,
                        window.process
                    );
                }
            }
            Command::Window(handle) => {
                if self.studio.select_window(handle) {
                    println!("Capturing window {handle}");
                }
            }
            Command::Refresh => {
                if self.studio.refresh_window_rect() {
                    println!("Window position updated");
                }
            }
            Command::Transform { kind, field, value } => {
                let applied = self
                    .studio
                    .edit_scene(|scene| scene.apply_transform_edit(kind, field, &value));
                if !applied {
                    eprintln!("Ignored `{value}` for {kind:?} {field:?}");
                }
            }
            Command::Text { x, y, text } => {
                let index = self.studio.edit_scene(|scene| scene.add_text(TextObject::new(text, x, y)));
                println!("Added text {index}");
            }
            Command::Audio(enabled) => {
                self.studio.edit_scene(|scene| scene.audio_enabled = enabled);
                println!("Audio {}", if enabled { "on" } else { "off" });
            }
            Command::Voice => {
                if self.studio.is_voice_recording() {
                    self.studio.stop_voice();
                } else if let Some(path) = self.studio.start_voice() {
                    println!("Voice recording to {}", path.display());
                }
            }
            Command::Quit => {
                if self.studio.recording_state() != RecordingState::Idle {
                    print!("A recording is in progress. Stop it and exit? [y/N] ");
                    let _ = std::io::stdout().flush();
                    self.awaiting_exit = true;
                    return Flow::Continue;
                }
                return self.exit(true);
            }
        }
        self.print_notifications();
        Flow::Continue
    }

    fn print_notifications(&self) {
        for notification in self.studio.notifications().try_iter() {
            match notification.level {
                NotificationLevel::Info => println!("{}", notification.message),
                NotificationLevel::Warning => eprintln!("warning: {}", notification.message),
                NotificationLevel::Error => eprintln!("error: {}", notification.message),
            }
        }
    }

    fn print_status(&self) {
        let scene = self.studio.active_scene();
        let state = match self.studio.recording_state() {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
        };
        println!("Recording: {state} {}", self.studio.elapsed_text());
        println!(
            "Scene: {} (source {:?}, {} text, audio {})",
            scene.name,
            scene.active_source(),
            scene.text_objects.len(),
            if scene.audio_enabled { "on" } else { "off" }
        );
        if let Some(title) = &scene.window_title {
            println!("Window: {title}");
        }
        if self.studio.is_voice_recording() {
            println!("Voice: recording");
        }
        println!("Preview frames: {}", self.preview_frames);
    }

    fn print_scenes(&self) {
        let book = self.studio.store().snapshot();
        for (index, scene) in book.scenes.iter().enumerate() {
            let marker = if index == book.active { '*' } else { ' ' };
            println!("{marker} {index}: {}", scene.name);
        }
    }

    fn redraw(&self) {
        // Clear the terminal and home the cursor.
        print!("\x1b[2J\x1b[H");
        self.print_status();
        print!("> ");
        let _ = std::io::stdout().flush();
    }
}
