//! Inbound commands to the application service.
//!
//! Local requests (serial console, test harness) that do not arrive as
//! Matter attribute writes. The [`AppService`](super::service::AppService)
//! runs them through the same paths a write or the button would.
//!
//! Console syntax, case-insensitive:
//!
//! ```text
//! speed <level>        osc on|off        cycle        decommission
//! ```

use core::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Target speed level; clamped to SpeedMax.
    RequestSpeed(u8),

    RequestOscillation(bool),

    /// Same as a short button press.
    CycleSpeed,

    /// Same as a long button hold.
    Decommission,
}

impl FromStr for AppCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(Error::Command("empty line"))?;
        let arg = words.next();
        if words.next().is_some() {
            return Err(Error::Command("too many arguments"));
        }

        match (verb.to_ascii_lowercase().as_str(), arg) {
            ("speed", Some(level)) => level
                .parse()
                .map(Self::RequestSpeed)
                .map_err(|_| Error::Command("speed takes a level 0..=255")),
            ("osc" | "oscillation", Some(state)) => match state.to_ascii_lowercase().as_str() {
                "on" | "1" => Ok(Self::RequestOscillation(true)),
                "off" | "0" => Ok(Self::RequestOscillation(false)),
                _ => Err(Error::Command("osc takes on or off")),
            },
            ("cycle", None) => Ok(Self::CycleSpeed),
            ("decommission", None) => Ok(Self::Decommission),
            ("speed" | "osc" | "oscillation", None) => Err(Error::Command("missing argument")),
            _ => Err(Error::Command("unknown command")),
        }
    }
}
