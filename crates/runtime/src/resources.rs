//! Energy, thermal, and call-budget accounting.
//!
//! Grounded on `examples/original_source/src/computer.c`'s
//! `nn_removeEnergy`/`nn_addEnergy`/`nn_addHeat`/`nn_removeHeat`/
//! `nn_callCost`, with the `total_call_budget`/`call_budget` split and
//! per-component normalized ledger supplemented from
//! `examples/original_source/rewrite/neonucleus.c`'s
//! `nn_setCallBudget`/`nn_componentsOverused`/`nn_costComponent` (see
//! SPEC_FULL.md §4.6).
//!
//! This type does not know about `ComputerState`: it reports, via `bool`
//! return values, whether a state transition (BLACKOUT / OVERWORKED /
//! OVERHEATING) is now due, and leaves applying that transition to the
//! caller (`Computer`), which is the single owner of its own state field.

use nn_core::constants::NN_OVERHEAT_MIN;

/// Energy, thermal, and call-budget counters for a single Computer.
pub struct ResourceAccounting {
    energy: f64,
    max_energy: f64,

    temperature: f64,
    thermal_coefficient: f64,
    room_temperature: f64,

    call_cost_used: f64,
    call_budget: f64,
    total_call_budget: f64,
}

impl ResourceAccounting {
    pub fn new(max_energy: f64, room_temperature: f64, total_call_budget: f64) -> Self {
        ResourceAccounting {
            energy: max_energy,
            max_energy,
            temperature: room_temperature,
            thermal_coefficient: 1.0,
            room_temperature,
            call_cost_used: 0.0,
            call_budget: total_call_budget,
            total_call_budget,
        }
    }

    // --- energy ---

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn max_energy(&self) -> f64 {
        self.max_energy
    }

    pub fn set_energy_info(&mut self, current: f64, max: f64) {
        self.max_energy = max;
        self.energy = current.clamp(0.0, max);
    }

    /// Clamps at zero. Returns `true` if energy reached zero (the caller
    /// should transition to BLACKOUT).
    pub fn remove_energy(&mut self, amount: f64) -> bool {
        if self.energy < amount {
            self.energy = 0.0;
            true
        } else {
            self.energy -= amount;
            false
        }
    }

    /// Clamped at `max_energy`. No state-transition side effect, matching
    /// the reference implementation (leaving BLACKOUT is the host's call).
    pub fn add_energy(&mut self, amount: f64) {
        self.energy = (self.energy + amount).min(self.max_energy);
    }

    // --- thermals ---

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn thermal_coefficient(&self) -> f64 {
        self.thermal_coefficient
    }

    pub fn room_temperature(&self) -> f64 {
        self.room_temperature
    }

    pub fn set_temperature(&mut self, value: f64) {
        self.temperature = value.max(self.room_temperature);
    }

    pub fn set_thermal_coefficient(&mut self, value: f64) {
        self.thermal_coefficient = value;
    }

    pub fn set_room_temperature(&mut self, value: f64) {
        self.room_temperature = value;
        self.temperature = self.temperature.max(self.room_temperature);
    }

    /// Scales `delta` by the thermal coefficient, clamps to at least room
    /// temperature. Returns `true` if the Computer is now OVERHEATING.
    pub fn add_heat(&mut self, delta: f64) -> bool {
        let scaled = delta * self.thermal_coefficient;
        self.temperature = (self.temperature + scaled).max(self.room_temperature);
        self.is_overheating()
    }

    /// Not scaled by the thermal coefficient: this asymmetry is carried
    /// over intentionally from the reference implementation (see
    /// SPEC_FULL.md §9), not an oversight.
    pub fn remove_heat(&mut self, delta: f64) {
        self.temperature = (self.temperature - delta).max(self.room_temperature);
    }

    pub fn is_overheating(&self) -> bool {
        self.temperature > NN_OVERHEAT_MIN
    }

    // --- call budget ---

    pub fn call_budget_remaining(&self) -> f64 {
        self.call_budget
    }

    pub fn total_call_budget(&self) -> f64 {
        self.total_call_budget
    }

    pub fn call_cost_used(&self) -> f64 {
        self.call_cost_used
    }

    pub fn set_call_budget(&mut self, total: f64) {
        self.total_call_budget = total;
    }

    /// Resets both the per-tick cost total and the remaining budget to the
    /// configured ceiling. Called once per tick.
    pub fn reset_call_budget(&mut self) {
        self.call_cost_used = 0.0;
        self.call_budget = self.total_call_budget;
    }

    /// Charges `amount` cost units. Returns `true` if this charge has now
    /// exhausted the budget (the caller should transition to OVERWORKED).
    pub fn call_cost(&mut self, amount: f64) -> bool {
        self.call_cost_used += amount;
        self.call_budget = (self.call_budget - amount).max(0.0);
        self.call_budget <= 0.0
    }

    /// Forces the remaining budget to zero outright, as an indirect method
    /// call does: the architecture's next cost-check yields cooperatively.
    pub fn zero_remaining_budget(&mut self) {
        self.call_budget = 0.0;
    }

    pub fn is_overworked(&self) -> bool {
        self.total_call_budget != 0.0 && self.call_budget <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_energy_clamps_and_signals_blackout() {
        let mut r = ResourceAccounting::new(100.0, 30.0, 256.0);
        assert!(!r.remove_energy(60.0));
        assert_eq!(r.energy(), 40.0);
        assert!(r.remove_energy(50.0));
        assert_eq!(r.energy(), 0.0);
    }

    #[test]
    fn add_heat_never_reports_below_room_temperature() {
        let mut r = ResourceAccounting::new(100.0, 30.0, 256.0);
        r.add_heat(-1000.0);
        assert!(r.temperature() >= r.room_temperature());
    }

    #[test]
    fn add_heat_scaled_remove_heat_not_scaled() {
        let mut r = ResourceAccounting::new(100.0, 30.0, 256.0);
        r.set_thermal_coefficient(2.0);
        r.add_heat(10.0);
        assert_eq!(r.temperature(), 50.0); // 30 + 10*2
        r.remove_heat(10.0);
        assert_eq!(r.temperature(), 40.0); // unscaled subtraction
    }

    #[test]
    fn overheat_threshold_is_strict() {
        let mut r = ResourceAccounting::new(100.0, 30.0, 256.0);
        r.set_temperature(100.0);
        assert!(!r.is_overheating());
        r.add_heat(0.01);
        assert!(r.is_overheating());
    }

    #[test]
    fn call_cost_exhausts_budget_and_reset_restores_it() {
        let mut r = ResourceAccounting::new(100.0, 30.0, 2.0);
        assert!(!r.call_cost(1.0));
        assert!(r.call_cost(1.0));
        assert!(r.is_overworked());
        r.reset_call_budget();
        assert!(!r.is_overworked());
    }

    #[test]
    fn zero_remaining_budget_forces_overworked() {
        let mut r = ResourceAccounting::new(100.0, 30.0, 256.0);
        r.zero_remaining_budget();
        assert!(r.is_overworked());
    }
}
