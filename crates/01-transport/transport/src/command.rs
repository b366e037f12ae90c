//! Input commands carried from the UI thread to the engine thread.

use smallvec::SmallVec;

/// Key code the engine treats as "abort the current prompt".
pub const ESC: char = '\u{1b}';

/// Key code returned to the engine when no key input is available.
pub const NO_INPUT: u32 = 0;

/// Menu item identifiers picked by the user, in selection order.
pub type MenuSelection = SmallVec<[i32; 8]>;

/// Discriminant of a [`Command`], used for logging and head inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Key,
    DirKey,
    Position,
    Line,
    MenuSelection,
    SaveState,
    Abort,
}

/// One input event queued for the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain keystroke.
    Key(char),
    /// Keystroke produced by a directional control (d-pad, swipe).
    DirKey(char),
    /// Map click in engine coordinates.
    Position { x: i32, y: i32 },
    /// Text answer to a prompt.
    Line(String),
    /// Result of a menu interaction.
    MenuSelection(MenuSelection),
    /// Request for an engine-side snapshot.
    SaveState,
    /// Unwind the current prompt.
    Abort,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Key(_) => CommandKind::Key,
            Command::DirKey(_) => CommandKind::DirKey,
            Command::Position { .. } => CommandKind::Position,
            Command::Line(_) => CommandKind::Line,
            Command::MenuSelection(_) => CommandKind::MenuSelection,
            Command::SaveState => CommandKind::SaveState,
            Command::Abort => CommandKind::Abort,
        }
    }

    /// Key code this command produces on the engine's byte pull, if any.
    ///
    /// `Abort` maps to [`ESC`]; structured commands have no key code.
    pub fn key_code(&self) -> Option<u32> {
        match self {
            Command::Key(c) | Command::DirKey(c) => Some(u32::from(*c)),
            Command::Abort => Some(u32::from(ESC)),
            _ => None,
        }
    }

    /// True for commands that the engine takes through a dedicated prompt pull.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Command::Position { .. } | Command::Line(_) | Command::MenuSelection(_)
        )
    }
}
