use std::cell::RefCell;
use std::fs::File;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use log::{error, info};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

use paneldeck::core::app::{App, Timing};
use paneldeck::core::config;
use paneldeck::core::page::{Page, Screen, action};
use paneldeck::panel::{PanelLink, SerialChannel};

#[derive(Parser)]
#[command(name = "paneldeck", about = "Page-stack navigator for serial touchscreen panels")]
struct Args {
    /// Serial device the panel is attached to
    #[arg(short, long)]
    port: Option<String>,

    /// Line speed in baud
    #[arg(short, long)]
    baud: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    init_logging();

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let resolved = config::resolve(&config, args.port.as_deref(), args.baud);
    info!("Connecting to {} at {} baud", resolved.port, resolved.baud);

    let channel = match SerialChannel::open(&resolved.port, resolved.baud) {
        Ok(channel) => channel,
        Err(e) => {
            error!("failed to open {}: {e}", resolved.port);
            return ExitCode::FAILURE;
        }
    };

    let timing = Timing {
        boot_drain: resolved.boot_drain,
        settle_drain: resolved.settle_drain,
    };
    let mut app = App::new(PanelLink::new(Box::new(channel)), timing);
    app.push_page(Page::from_screen(&StartScreen));

    match app.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("panel link failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Panel chatter and diagnostics go to the terminal at info level; the
/// full debug trace (every outgoing line) goes to paneldeck.log.
fn init_logging() {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        log_config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Ok(log_file) = File::create("paneldeck.log") {
        loggers.push(WriteLogger::new(LevelFilter::Debug, log_config, log_file));
    }
    let _ = CombinedLogger::init(loggers);
}

// ============================================================================
// Screens
// ============================================================================

/// Landing screen. The first button swaps in the exit confirmation; the
/// second gives press feedback and pushes the info screen.
struct StartScreen;

impl Screen for StartScreen {
    fn populate(&self, page: &mut Page) {
        page.add_button(
            1,
            1,
            2,
            2,
            "0001",
            Some(action(|app, index| {
                app.set_image(index, "0001")?;
                let previous = Rc::new(RefCell::new(None));
                let confirm = Page::from_screen(&ConfirmExitScreen {
                    previous: previous.clone(),
                });
                let replaced = app.change_page(confirm);
                *previous.borrow_mut() = replaced;
                Ok(())
            })),
        );
        page.add_button(
            1,
            3,
            2,
            2,
            "0002",
            Some(action(|app, index| {
                app.set_image(index, "0004")?;
                app.push_page(Page::from_screen(&InfoScreen));
                Ok(())
            })),
        );
    }
}

/// Exit confirmation. Yes pops the only page, which empties the stack
/// and ends the run loop; no restores the page that was swapped out.
struct ConfirmExitScreen {
    previous: Rc<RefCell<Option<Page>>>,
}

impl Screen for ConfirmExitScreen {
    fn populate(&self, page: &mut Page) {
        page.add_button(
            1,
            1,
            2,
            2,
            "0001",
            Some(action(|app, _| {
                app.pop_page(1);
                Ok(())
            })),
        );
        let previous = self.previous.clone();
        page.add_button(
            4,
            1,
            2,
            2,
            "0002",
            Some(action(move |app, _| {
                if let Some(original) = previous.borrow_mut().take() {
                    app.change_page(original);
                }
                Ok(())
            })),
        );
    }
}

/// Full-width banner button that pops back to the start screen.
struct InfoScreen;

impl Screen for InfoScreen {
    fn populate(&self, page: &mut Page) {
        page.add_button(
            1,
            1,
            5,
            1,
            "0009",
            Some(action(|app, _| {
                app.pop_page(1);
                Ok(())
            })),
        );
    }
}
