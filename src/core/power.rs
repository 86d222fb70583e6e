//! Power state of the machine

use tracing::info;

#[derive(Debug)]
pub struct PowerController {
    on: bool,
    cycles: u32,
}

impl Default for PowerController {
    fn default() -> Self {
        PowerController { on: true, cycles: 0 }
    }
}

impl PowerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Completed off/on cycles since start-up
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn power_off(&mut self) {
        if self.on {
            self.on = false;
            info!("Power off");
        }
    }

    pub fn power_on(&mut self) {
        if !self.on {
            self.on = true;
            self.cycles += 1;
            info!(cycle = self.cycles, "Power on");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_cycle() {
        let mut power = PowerController::new();
        assert!(power.is_on());

        power.power_on();
        assert_eq!(power.cycles(), 0);

        power.power_off();
        assert!(!power.is_on());
        power.power_on();
        assert!(power.is_on());
        assert_eq!(power.cycles(), 1);
    }
}
