//! Threshold alert state machine.
//!
//! Pure logic: the caller supplies a reading and the current settings and
//! receives the notifications to deliver. Delivery is the caller's job.
//!
//! Two policies are supported:
//!
//! - [`AlertPolicy::EdgeTriggered`] fires once when a quantity enters the
//!   alarmed condition and once when it leaves it (recovery).
//! - [`AlertPolicy::CountThreshold`] fires once after `count` consecutive
//!   exceedances and stays latched until a non-exceeding reading resets it.
//!   It never sends recovery messages. A reading exactly at a threshold
//!   does not count as an exceedance under this policy.

use std::fmt;

use crate::reading::Reading;
use crate::settings::{AlertPolicyKind, Settings};

/// How exceedances turn into notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    EdgeTriggered,
    CountThreshold { count: u32 },
}

impl AlertPolicy {
    fn kind(self) -> AlertPolicyKind {
        match self {
            AlertPolicy::EdgeTriggered => AlertPolicyKind::Edge,
            AlertPolicy::CountThreshold { .. } => AlertPolicyKind::Count,
        }
    }

    /// Whether `value` is past `threshold`. `above` selects the direction.
    fn exceeds(self, value: f64, threshold: f64, above: bool) -> bool {
        match (self, above) {
            (AlertPolicy::EdgeTriggered, true) => value >= threshold,
            (AlertPolicy::EdgeTriggered, false) => value <= threshold,
            (AlertPolicy::CountThreshold { .. }, true) => value > threshold,
            (AlertPolicy::CountThreshold { .. }, false) => value < threshold,
        }
    }
}

/// A monitored quantity with its own alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    HighTemperature,
    LowTemperature,
    HighCo2,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [
        Quantity::HighTemperature,
        Quantity::LowTemperature,
        Quantity::HighCo2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quantity::HighTemperature => "high_temp",
            Quantity::LowTemperature => "low_temp",
            Quantity::HighCo2 => "high_co2",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an alarm state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The quantity entered the alarmed condition.
    Alarm,
    /// The quantity returned to normal.
    Recovery,
}

/// A message to deliver to the notification channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub quantity: Quantity,
    pub transition: Transition,
    pub message: String,
}

/// Alarm state of a single quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmState {
    /// Currently in alarm (edge policy) or alert already sent (count policy).
    armed: bool,
    /// Consecutive exceedances; only advanced under the count policy.
    consecutive: u32,
}

impl AlarmState {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Record one observation and return the transition it causes, if any.
    fn observe(&mut self, exceeded: bool, policy: AlertPolicy) -> Option<Transition> {
        match policy {
            AlertPolicy::EdgeTriggered => {
                if exceeded == self.armed {
                    return None;
                }
                self.armed = exceeded;
                Some(if exceeded {
                    Transition::Alarm
                } else {
                    Transition::Recovery
                })
            }
            AlertPolicy::CountThreshold { count } => {
                if !exceeded {
                    *self = AlarmState::default();
                    return None;
                }
                self.consecutive = self.consecutive.saturating_add(1);
                if self.consecutive >= count && !self.armed {
                    self.armed = true;
                    Some(Transition::Alarm)
                } else {
                    None
                }
            }
        }
    }
}

/// Per-quantity alarm states owned by the monitoring loop.
#[derive(Debug, Default)]
pub struct AlertStateMachine {
    high_temp: AlarmState,
    low_temp: AlarmState,
    high_co2: AlarmState,
    /// Policy used on the previous evaluation; a change resets every state.
    last_policy: Option<AlertPolicyKind>,
}

impl AlertStateMachine {
    /// All quantities start out of alarm.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, quantity: Quantity) -> AlarmState {
        match quantity {
            Quantity::HighTemperature => self.high_temp,
            Quantity::LowTemperature => self.low_temp,
            Quantity::HighCo2 => self.high_co2,
        }
    }

    pub fn is_armed(&self, quantity: Quantity) -> bool {
        self.state(quantity).is_armed()
    }

    /// Evaluate one reading against the thresholds in `settings`.
    ///
    /// Non-finite readings are ignored and leave every state untouched.
    pub fn evaluate(&mut self, reading: &Reading, settings: &Settings) -> Vec<Notification> {
        if !reading.is_finite() {
            return Vec::new();
        }

        let policy = settings.policy();
        if self.last_policy.is_some_and(|kind| kind != policy.kind()) {
            self.reset();
        }
        self.last_policy = Some(policy.kind());

        let temp_f = reading.temperature_fahrenheit();
        let co2 = reading.co2_ppm;
        let location = settings.location_name.as_str();
        let mut notifications = Vec::new();

        let checks = [
            (
                Quantity::HighTemperature,
                temp_f,
                settings.temp_high_threshold,
                policy.exceeds(temp_f, settings.temp_high_threshold, true),
            ),
            (
                Quantity::LowTemperature,
                temp_f,
                settings.temp_low_threshold,
                policy.exceeds(temp_f, settings.temp_low_threshold, false),
            ),
            (
                Quantity::HighCo2,
                co2,
                settings.co2_threshold,
                policy.exceeds(co2, settings.co2_threshold, true),
            ),
        ];

        for (quantity, value, threshold, exceeded) in checks {
            if let Some(transition) = self.state_mut(quantity).observe(exceeded, policy) {
                notifications.push(Notification {
                    quantity,
                    transition,
                    message: format_message(location, quantity, transition, threshold, value),
                });
            }
        }

        notifications
    }

    /// Return every quantity to "not armed".
    pub fn reset(&mut self) {
        self.high_temp = AlarmState::default();
        self.low_temp = AlarmState::default();
        self.high_co2 = AlarmState::default();
    }

    fn state_mut(&mut self, quantity: Quantity) -> &mut AlarmState {
        match quantity {
            Quantity::HighTemperature => &mut self.high_temp,
            Quantity::LowTemperature => &mut self.low_temp,
            Quantity::HighCo2 => &mut self.high_co2,
        }
    }
}

/// Human-readable notification text.
fn format_message(
    location: &str,
    quantity: Quantity,
    transition: Transition,
    threshold: f64,
    value: f64,
) -> String {
    match (quantity, transition) {
        (Quantity::HighTemperature, Transition::Alarm) => format!(
            "ALERT: {location} temperature above {threshold:.1}°F (currently {value:.1}°F)"
        ),
        (Quantity::HighTemperature, Transition::Recovery) => format!(
            "RECOVERED: {location} temperature back below {threshold:.1}°F (currently {value:.1}°F)"
        ),
        (Quantity::LowTemperature, Transition::Alarm) => format!(
            "ALERT: {location} temperature below {threshold:.1}°F (currently {value:.1}°F)"
        ),
        (Quantity::LowTemperature, Transition::Recovery) => format!(
            "RECOVERED: {location} temperature back above {threshold:.1}°F (currently {value:.1}°F)"
        ),
        (Quantity::HighCo2, Transition::Alarm) => format!(
            "ALERT: {location} CO2 above {threshold:.0} ppm (currently {value:.0} ppm)"
        ),
        (Quantity::HighCo2, Transition::Recovery) => format!(
            "RECOVERED: {location} CO2 back below {threshold:.0} ppm (currently {value:.0} ppm)"
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::settings::tests::sample;

    fn reading_f(temp_f: f64) -> Reading {
        Reading::from_fahrenheit(temp_f, 40.0, 600.0)
    }

    fn count_policy(count: u32) -> Settings {
        let mut updates = BTreeMap::new();
        updates.insert("alert_policy".to_string(), "count".to_string());
        updates.insert("alert_repeat_count".to_string(), count.to_string());
        sample().apply_updates(&updates).unwrap()
    }

    #[test]
    fn one_notification_per_transition() {
        let settings = sample(); // high threshold 85°F
        let mut machine = AlertStateMachine::new();

        let fired: Vec<Vec<Notification>> = [71.0, 90.0, 91.0, 90.0, 70.0]
            .into_iter()
            .map(|t| machine.evaluate(&reading_f(t), &settings))
            .collect();

        assert!(fired[0].is_empty());
        assert_eq!(fired[1].len(), 1);
        assert_eq!(fired[1][0].quantity, Quantity::HighTemperature);
        assert_eq!(fired[1][0].transition, Transition::Alarm);
        assert!(fired[2].is_empty());
        assert!(fired[3].is_empty());
        assert_eq!(fired[4].len(), 1);
        assert_eq!(fired[4][0].transition, Transition::Recovery);
        assert_eq!(fired.iter().map(Vec::len).sum::<usize>(), 2);
    }

    #[test]
    fn repeated_exceedance_fires_once() {
        let settings = sample();
        let mut machine = AlertStateMachine::new();
        let total: usize = (0..20)
            .map(|_| machine.evaluate(&reading_f(95.0), &settings).len())
            .sum();
        assert_eq!(total, 1);
        assert!(machine.is_armed(Quantity::HighTemperature));
    }

    #[test]
    fn threshold_comparisons_are_inclusive() {
        let settings = sample(); // low threshold 50°F, CO2 1000 ppm
        let mut machine = AlertStateMachine::new();

        let low = machine.evaluate(&reading_f(50.0), &settings);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].quantity, Quantity::LowTemperature);

        let co2 = machine.evaluate(&Reading::from_fahrenheit(60.0, 40.0, 1000.0), &settings);
        let quantities: Vec<_> = co2.iter().map(|n| (n.quantity, n.transition)).collect();
        assert!(quantities.contains(&(Quantity::HighCo2, Transition::Alarm)));
        assert!(quantities.contains(&(Quantity::LowTemperature, Transition::Recovery)));
    }

    #[test]
    fn messages_name_location_and_threshold() {
        let settings = sample();
        let mut machine = AlertStateMachine::new();
        let alert = machine.evaluate(&reading_f(90.0), &settings);
        assert_eq!(
            alert[0].message,
            "ALERT: Server Room temperature above 85.0°F (currently 90.0°F)"
        );
        let recovery = machine.evaluate(&reading_f(70.0), &settings);
        assert_eq!(
            recovery[0].message,
            "RECOVERED: Server Room temperature back below 85.0°F (currently 70.0°F)"
        );
    }

    #[test]
    fn non_finite_reading_is_ignored() {
        let settings = sample();
        let mut machine = AlertStateMachine::new();
        let nan = Reading::new(f64::NAN, 40.0, f64::NAN);
        assert!(machine.evaluate(&nan, &settings).is_empty());
        for q in Quantity::ALL {
            assert_eq!(machine.state(q), AlarmState::default());
        }
    }

    #[test]
    fn threshold_change_applies_on_next_evaluation() {
        let mut machine = AlertStateMachine::new();
        assert!(machine.evaluate(&reading_f(80.0), &sample()).is_empty());

        let mut updates = BTreeMap::new();
        updates.insert("temp_high_threshold".to_string(), "75".to_string());
        let lowered = sample().apply_updates(&updates).unwrap();
        let fired = machine.evaluate(&reading_f(80.0), &lowered);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].quantity, Quantity::HighTemperature);
    }

    #[test]
    fn count_policy_fires_after_consecutive_exceedances() {
        let settings = count_policy(3);
        let mut machine = AlertStateMachine::new();

        assert!(machine.evaluate(&reading_f(90.0), &settings).is_empty());
        assert!(machine.evaluate(&reading_f(90.0), &settings).is_empty());
        let third = machine.evaluate(&reading_f(90.0), &settings);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].transition, Transition::Alarm);

        // Latched until a non-exceedance.
        assert!(machine.evaluate(&reading_f(90.0), &settings).is_empty());
        assert_eq!(machine.state(Quantity::HighTemperature).consecutive(), 4);
    }

    #[test]
    fn count_policy_resets_without_recovery_message() {
        let settings = count_policy(2);
        let mut machine = AlertStateMachine::new();

        machine.evaluate(&reading_f(90.0), &settings);
        assert_eq!(machine.evaluate(&reading_f(90.0), &settings).len(), 1);
        assert!(machine.evaluate(&reading_f(70.0), &settings).is_empty());
        assert_eq!(
            machine.state(Quantity::HighTemperature),
            AlarmState::default()
        );

        // Interrupted run does not fire.
        machine.evaluate(&reading_f(90.0), &settings);
        machine.evaluate(&reading_f(70.0), &settings);
        assert!(machine.evaluate(&reading_f(90.0), &settings).is_empty());
        assert_eq!(machine.evaluate(&reading_f(90.0), &settings).len(), 1);
    }

    #[test]
    fn count_policy_comparisons_are_strict() {
        let settings = count_policy(1);
        let mut machine = AlertStateMachine::new();

        let at_threshold = Reading::from_fahrenheit(60.0, 40.0, 1000.0);
        assert!(machine.evaluate(&at_threshold, &settings).is_empty());
        assert_eq!(machine.state(Quantity::HighCo2).consecutive(), 0);

        let above = Reading::from_fahrenheit(60.0, 40.0, 1000.5);
        let fired = machine.evaluate(&above, &settings);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].quantity, Quantity::HighCo2);
    }

    #[test]
    fn policy_change_resets_states() {
        let mut machine = AlertStateMachine::new();
        machine.evaluate(&reading_f(90.0), &sample());
        assert!(machine.is_armed(Quantity::HighTemperature));

        let settings = count_policy(5);
        assert!(machine.evaluate(&reading_f(90.0), &settings).is_empty());
        assert!(!machine.is_armed(Quantity::HighTemperature));
        assert_eq!(machine.state(Quantity::HighTemperature).consecutive(), 1);
    }
}
