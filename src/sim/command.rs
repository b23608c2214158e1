//! Actuator command vocabulary for the occupancy-driven override scripts.

use std::fmt;

use serde::Serialize;

/// What to write to an actuator point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Force the equipment into its unoccupied state.
    Override,
    /// Hand control back to the local controller.
    Release,
}

/// Equipment a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorDomain {
    /// Dedicated outdoor air system, shut off while unoccupied.
    Doas,
    /// AHU outdoor air dampers, closed for recirculation at night.
    NightRecirc,
}

impl ActuatorDomain {
    /// Point label written for `command`.
    pub fn label(self, command: Command) -> &'static str {
        match (self, command) {
            (ActuatorDomain::Doas, Command::Override) => "DOAS_Off",
            (ActuatorDomain::NightRecirc, Command::Override) => "Dampers_Closed",
            (_, Command::Release) => "Release_Control",
        }
    }

    /// Command for the current occupancy and AHU status, or `None` when
    /// nothing should be written.
    pub fn decide(self, occupied: bool, ahu_active: bool) -> Option<Command> {
        if occupied {
            return Some(Command::Release);
        }
        match self {
            ActuatorDomain::Doas => Some(Command::Override),
            ActuatorDomain::NightRecirc => ahu_active.then_some(Command::Override),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Override => write!(f, "override"),
            Command::Release => write!(f, "release"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doas_is_switched_off_when_unoccupied() {
        let d = ActuatorDomain::Doas;
        assert_eq!(d.decide(false, false), Some(Command::Override));
        assert_eq!(d.decide(true, false), Some(Command::Release));
        assert_eq!(d.label(Command::Override), "DOAS_Off");
    }

    #[test]
    fn night_recirc_needs_running_ahu() {
        let d = ActuatorDomain::NightRecirc;
        assert_eq!(d.decide(false, false), None);
        assert_eq!(d.decide(false, true), Some(Command::Override));
        assert_eq!(d.decide(true, true), Some(Command::Release));
        assert_eq!(d.label(Command::Override), "Dampers_Closed");
        assert_eq!(d.label(Command::Release), "Release_Control");
    }
}
