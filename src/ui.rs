use crate::controller::CapturePhase;
use std::str::FromStr;

/// User actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenCamera,
    TakePhoto,
    Retake,
    /// Print the captured still as a data URL
    Show,
    Quit,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown command {0:?}")]
pub struct UnknownCommand(String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "o" => Ok(Command::OpenCamera),
            "snap" | "take" | "s" => Ok(Command::TakePhoto),
            "retake" | "r" => Ok(Command::Retake),
            "show" => Ok(Command::Show),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// One-line list of the controls available in `phase`
pub fn prompt(phase: CapturePhase) -> &'static str {
    match phase {
        CapturePhase::Idle => "[open] open camera   [quit]",
        CapturePhase::Previewing => "[snap] take photo   [quit]",
        CapturePhase::Captured => "[retake] take another   [show] print image   [quit]",
    }
}
