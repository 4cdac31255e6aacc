//! Screen clearing and the ASCII banner.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

/// Application version shown under the banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Startup banner.
pub const BANNER: &str = r"
 ██████╗ ███████╗██╗███╗   ██╗████████╗   ███████╗ ██████╗
██╔═══██╗██╔════╝██║████╗  ██║╚══██╔══╝   ██╔════╝██╔════╝
██║   ██║███████╗██║██╔██╗ ██║   ██║█████╗█████╗  ██║
██║   ██║╚════██║██║██║╚██╗██║   ██║╚════╝██╔══╝  ██║
╚██████╔╝███████║██║██║ ╚████║   ██║      ███████╗╚██████╗
 ╚═════╝ ╚══════╝╚═╝╚═╝  ╚═══╝   ╚═╝      ╚══════╝ ╚═════╝
";

/// How each screen is redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    /// Print the banner after clearing.
    pub show_banner: bool,
    /// Emit terminal clear sequences. Off when stdout is not a terminal.
    pub clear: bool,
}

impl Screen {
    pub fn new(show_banner: bool, clear: bool) -> Self {
        Self { show_banner, clear }
    }

    /// Start a fresh screen: clear the terminal and redraw the banner.
    pub fn reset<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.clear {
            queue!(
                out,
                Clear(ClearType::All),
                Clear(ClearType::Purge),
                MoveTo(0, 0)
            )?;
        }
        if self.show_banner {
            write!(out, "{BANNER}")?;
            write!(out, "\nversión: {VERSION}\n\n")?;
        }
        out.flush()
    }
}
