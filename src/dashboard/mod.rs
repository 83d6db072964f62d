//! Terminal dashboard: selections, the render sequence and the command loop.

pub mod commands;
pub mod console;
pub mod figure;
pub mod session;
pub mod surface;
pub mod table;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::errors::AppError;

pub use commands::{parse_command, Command, HELP};
pub use console::ConsoleSurface;
pub use session::DashboardSession;
pub use surface::DisplaySurface;

fn list_indices<S: DisplaySurface + ?Sized>(
    session: &DashboardSession,
    surface: &mut S,
) -> Result<(), AppError> {
    for (i, option) in session.state().catalog.options().iter().enumerate() {
        let marker = if option == session.selected() { '*' } else { ' ' };
        surface.text(&format!("{} {}. {} ({})", marker, i + 1, option.name, option.ticker))?;
    }
    surface.text(&format!(
        "Months of prediction: {}, alignment: {}",
        session.horizon().months(),
        session.alignment()
    ))?;
    Ok(())
}

/// Render once, then re-render after every command that changes a selection
/// until `quit` or end of input.
pub async fn run_interactive<R, S>(
    session: &mut DashboardSession,
    input: R,
    surface: &mut S,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    S: DisplaySurface + ?Sized,
{
    session.run(surface).await?;
    surface.text("\nType 'help' for commands.")?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                surface.error(&e.to_string())?;
                continue;
            }
        };
        debug!("Command: {:?}", command);

        let changed = match command {
            Command::Quit => break,
            Command::Help => {
                surface.text(HELP)?;
                false
            }
            Command::List => {
                list_indices(session, surface)?;
                false
            }
            Command::Index(query) => match session.select_index(&query) {
                Ok(_) => true,
                Err(e) => {
                    surface.error(&e.to_string())?;
                    false
                }
            },
            Command::Months(months) => match session.set_months(months) {
                Ok(()) => true,
                Err(e) => {
                    surface.error(&e.to_string())?;
                    false
                }
            },
            Command::Alignment(alignment) => {
                session.set_alignment(alignment);
                true
            }
            Command::Clear => {
                let summary = session.clear_cache();
                info!("{}", summary);
                surface.text(&summary)?;
                true
            }
            Command::Refresh => {
                let dropped = session.refresh();
                info!("Refresh {}: cached entry dropped = {}", session.selected().ticker, dropped);
                true
            }
        };

        if changed {
            session.run(surface).await?;
        }
    }

    Ok(())
}
