// Damped spring follower used to low-pass raw input signals.

/// One-dimensional spring that chases a target value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    stiffness: f32,
    damping: f32,
    value: f32,
    velocity: f32,
}

impl Spring {
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Spring {
            stiffness: stiffness.max(0.0),
            damping: damping.max(0.0),
            value: 0.0,
            velocity: 0.0,
        }
    }

    /// Critically damped (unit mass): fastest settle without overshoot.
    pub fn critical(stiffness: f32) -> Self {
        let stiffness = stiffness.max(0.0);
        Spring::new(stiffness, 2.0 * stiffness.sqrt())
    }

    /// Spring for a body of `mass`, folded into unit-mass coefficients.
    pub fn with_mass(stiffness: f32, damping: f32, mass: f32) -> Self {
        let mass = if mass > 0.0 { mass } else { 1.0 };
        Spring::new(stiffness / mass, damping / mass)
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advance towards `target` by `dt` seconds. Large steps are split so the
    /// semi-implicit integration stays stable.
    pub fn update(&mut self, target: f32, dt: f32) -> f32 {
        if !target.is_finite() || !(dt > 0.0) {
            return self.value;
        }
        const MAX_STEP: f32 = 1.0 / 120.0;
        let steps = (dt / MAX_STEP).ceil().max(1.0) as u32;
        let h = dt / steps as f32;
        for _ in 0..steps {
            let accel = self.stiffness * (target - self.value) - self.damping * self.velocity;
            self.velocity += accel * h;
            self.value += self.velocity * h;
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.snap_to(0.0);
    }

    /// Jump to `value` at rest.
    pub fn snap_to(&mut self, value: f32) {
        if value.is_finite() {
            self.value = value;
        }
        self.velocity = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_on_target() {
        let mut spring = Spring::critical(40.0);
        for _ in 0..600 {
            spring.update(10.0, 1.0 / 60.0);
        }
        assert!((spring.value() - 10.0).abs() < 0.01);
    }

    #[test]
    fn critical_spring_does_not_overshoot() {
        let mut spring = Spring::critical(40.0);
        for _ in 0..600 {
            let v = spring.update(1.0, 1.0 / 60.0);
            assert!(v <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn light_mass_is_overdamped() {
        let mut heavy = Spring::with_mass(150.0, 15.0, 1.0);
        let mut light = Spring::with_mass(150.0, 15.0, 0.1);
        let (mut heavy_peak, mut light_peak) = (0.0f32, 0.0f32);
        for _ in 0..120 {
            heavy_peak = heavy_peak.max(heavy.update(1.0, 1.0 / 60.0));
            light_peak = light_peak.max(light.update(1.0, 1.0 / 60.0));
        }
        assert!(heavy_peak > 1.05);
        assert!(light_peak <= 1.0 + 1e-4);
        assert!((light.value() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn non_finite_target_is_ignored() {
        let mut spring = Spring::critical(40.0);
        spring.update(5.0, 0.1);
        let before = spring.value();
        assert_eq!(spring.update(f32::NAN, 0.1), before);
    }
}
