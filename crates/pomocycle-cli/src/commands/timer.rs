use std::str::FromStr;

use clap::Subcommand;
use pomocycle_core::{Event, PauseReason, Remaining, TimerService, TimerSnapshot, WriteBehindStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::{controller_over, open_controller, open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start the current phase (reloads it when nothing is left)
    Start,
    /// Pause the timer
    Pause,
    /// Resume without reloading the duration
    Resume,
    /// Reload the full duration of the current phase and run
    Restart,
    /// Back to an idle work phase with no completed cycles
    Reset,
    /// Switch to the next phase
    Toggle {
        /// Start the next phase right away
        #[arg(long)]
        start: bool,
    },
    /// Zero the completed-cycle counter
    ResetCycles,
    /// Run the timer in the foreground, reading commands from stdin
    Run {
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TimerAction) -> CliResult {
    if let TimerAction::Run { json } = action {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let result = runtime.block_on(foreground(json));
        // A pending stdin read would otherwise hold up the shutdown.
        runtime.shutdown_background();
        return result;
    }

    let mut controller = open_controller();
    match action {
        TimerAction::Status | TimerAction::Run { .. } => {}
        TimerAction::Start => controller.start(),
        TimerAction::Pause => {
            controller.pause(PauseReason::User);
        }
        TimerAction::Resume => controller.resume(),
        TimerAction::Restart => controller.restart(),
        TimerAction::Reset => controller.reset(),
        TimerAction::Toggle { start } => {
            controller.switch_phase(start);
        }
        TimerAction::ResetCycles => controller.reset_cycles(),
    }

    let snapshot = controller.request_current_state();
    controller.dispose();
    print_json(&snapshot)
}

/// Line commands accepted by `timer run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineCommand {
    Start,
    Pause,
    Resume,
    Toggle,
    Restart,
    Reset,
    /// Switch phase and start it
    Next,
    /// Switch phase, stay paused
    Skip,
    State,
    ResetCycles,
    Quit,
}

impl FromStr for LineCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Ok(Self::Start),
            "pause" | "p" => Ok(Self::Pause),
            "resume" | "r" => Ok(Self::Resume),
            "toggle" | "t" => Ok(Self::Toggle),
            "restart" => Ok(Self::Restart),
            "reset" => Ok(Self::Reset),
            "next" | "n" => Ok(Self::Next),
            "skip" => Ok(Self::Skip),
            "state" | "status" => Ok(Self::State),
            "reset-cycles" => Ok(Self::ResetCycles),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!(
                "unknown command '{other}' (start, pause, resume, toggle, restart, reset, next, skip, state, reset-cycles, quit)"
            )),
        }
    }
}

fn apply(service: &TimerService, command: LineCommand) {
    match command {
        LineCommand::Start => service.start(),
        LineCommand::Pause => {
            service.pause(PauseReason::User);
        }
        LineCommand::Resume => service.resume(),
        LineCommand::Toggle => service.toggle_pause(),
        LineCommand::Restart => service.restart(),
        LineCommand::Reset => service.reset(),
        LineCommand::Next => {
            service.switch_phase(true);
        }
        LineCommand::Skip => {
            service.switch_phase(false);
        }
        LineCommand::State => {
            service.request_current_state();
        }
        LineCommand::ResetCycles => service.reset_cycles(),
        LineCommand::Quit => {}
    }
}

async fn foreground(json: bool) -> CliResult {
    let store = WriteBehindStore::spawn(open_store())?;
    let controller = controller_over(store);
    let service = TimerService::new(controller, Handle::current());

    // Subscribers run under the service lock; hand events to the render loop.
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Event>();
    service.subscribe(move |event| {
        let _ = events_tx.send(event.clone());
    });

    if !json {
        eprintln!("commands: start, pause, resume, toggle, restart, reset, next, skip, state, reset-cycles, quit");
    }
    service.request_current_state();

    let mut renderer = Renderer::new(json);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => renderer.render(&event)?,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                service.update_activity();
                match line.parse::<LineCommand>() {
                    Ok(LineCommand::Quit) => break,
                    Ok(command) => {
                        tracing::debug!(?command, "stdin command");
                        apply(&service, command);
                    }
                    Err(message) => eprintln!("{message}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    service.shutdown();
    while let Ok(event) = events_rx.try_recv() {
        renderer.render(&event)?;
    }
    Ok(())
}

/// `MM:SS`, or `H:MM:SS` once hours are involved.
fn format_remaining(remaining: &Remaining) -> String {
    if remaining.hours > 0 {
        format!("{}:{:02}:{:02}", remaining.hours, remaining.minutes, remaining.seconds)
    } else {
        format!("{:02}:{:02}", remaining.minutes, remaining.seconds)
    }
}

fn run_state(snapshot: &TimerSnapshot) -> &'static str {
    if snapshot.running {
        "running"
    } else if snapshot.is_phase_exhausted() {
        "ready"
    } else {
        "paused"
    }
}

fn status_line(snapshot: &TimerSnapshot) -> String {
    format!(
        "{} {} [{}] cycle {}/{} | today: {} cycles, {} min work, {} min break",
        snapshot.phase.label(),
        format_remaining(&snapshot.remaining),
        run_state(snapshot),
        snapshot.cycle_count,
        snapshot.cycles_before_long_break,
        snapshot.today.completed_work_cycles,
        snapshot.today.total_work_minutes,
        snapshot.today.total_break_minutes,
    )
}

/// Prints events either as JSON lines or as human-readable lines.
struct Renderer {
    json: bool,
    last: Option<TimerSnapshot>,
}

impl Renderer {
    fn new(json: bool) -> Self {
        Self { json, last: None }
    }

    fn render(&mut self, event: &Event) -> CliResult {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }
        match event {
            Event::Tick { remaining } => println!("{}", format_remaining(remaining)),
            Event::PhaseCompleted {
                phase,
                awaiting_confirmation,
                ..
            } => {
                if *awaiting_confirmation {
                    println!("{} finished. Type 'next' to continue.", phase.label());
                } else {
                    println!("{} finished.", phase.label());
                }
            }
            Event::PhaseChanged { phase, cycle_count } => {
                println!("Now: {} (cycle {cycle_count})", phase.label());
            }
            Event::TimerPaused { reason } => match reason {
                PauseReason::User => println!("Paused."),
                PauseReason::Inactivity => println!("Paused after inactivity."),
            },
            Event::PersistenceWarning { .. } => {}
            Event::StateChanged { snapshot } => {
                // Ticks already show the countdown; only print state changes.
                let changed = self.last.as_ref().map_or(true, |last| {
                    last.phase != snapshot.phase
                        || last.running != snapshot.running
                        || last.cycle_count != snapshot.cycle_count
                        || last.today != snapshot.today
                        || (!snapshot.running && last.remaining != snapshot.remaining)
                });
                if changed {
                    println!("{}", status_line(snapshot));
                }
                self.last = Some(snapshot.clone());
            }
        }
        Ok(())
    }
}
