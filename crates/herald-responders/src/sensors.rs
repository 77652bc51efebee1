//! Sensor reports and their interpretation as events.
//!
//! Interpretation thresholds:
//!
//! | Sensor | Condition | Event | Priority |
//! |---|---|---|---|
//! | seismic | magnitude > 6.0 | `MAJOR_EARTHQUAKE` | 5 |
//! | seismic | magnitude > 4.0 | `EARTHQUAKE_DETECTED` | 3 |
//! | fire | temperature > 100 or smoke > 0.7 | `FIRE_DETECTED` | 4 |
//! | gas | concentration > 0.5 | `GAS_LEAK_DETECTED` | 4 |
//! | structural | damage > 0.7 | `BUILDING_COLLAPSE` | 5 |
//! | structural | damage > 0.4 | `STRUCTURAL_DAMAGE` | 3 |
//! | medical | injured > 0 | `MEDICAL_EMERGENCY` | 5 if critical, else 3 |
//!
//! Readings below every threshold produce no event.

use core::fmt;

use chrono::{DateTime, Utc};
use herald_types::Event;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::Position;

/// Event type tags produced by interpretation.
pub mod events {
    /// Magnitude above 6.0.
    pub const MAJOR_EARTHQUAKE: &str = "MAJOR_EARTHQUAKE";
    /// Magnitude above 4.0.
    pub const EARTHQUAKE_DETECTED: &str = "EARTHQUAKE_DETECTED";
    /// Heat or smoke above threshold.
    pub const FIRE_DETECTED: &str = "FIRE_DETECTED";
    /// Gas concentration above threshold.
    pub const GAS_LEAK_DETECTED: &str = "GAS_LEAK_DETECTED";
    /// Structural damage above 0.7.
    pub const BUILDING_COLLAPSE: &str = "BUILDING_COLLAPSE";
    /// Structural damage above 0.4.
    pub const STRUCTURAL_DAMAGE: &str = "STRUCTURAL_DAMAGE";
    /// At least one injured person.
    pub const MEDICAL_EMERGENCY: &str = "MEDICAL_EMERGENCY";
}

/// Casualty severity reported by medical sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor injuries.
    Low,
    /// Moderate injuries.
    Medium,
    /// Serious injuries.
    High,
    /// Life-threatening injuries.
    Critical,
}

impl Severity {
    const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Lowercase tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a lowercase tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|severity| severity.as_str() == tag)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensor measurement, by sensor kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor_type", rename_all = "lowercase")]
pub enum Reading {
    /// Ground motion.
    Seismic {
        /// Richter magnitude.
        magnitude: f64,
    },
    /// Heat and smoke.
    Fire {
        /// Degrees Celsius.
        temperature: f64,
        /// Smoke density in `[0, 1]`.
        smoke_level: f64,
    },
    /// Airborne gas.
    Gas {
        /// Concentration in `[0, 1]`.
        concentration: f64,
        /// Gas formula, such as `CO`.
        gas_type: String,
    },
    /// Building integrity.
    Structural {
        /// Damage in `[0, 1]`.
        damage_level: f64,
        /// People trapped inside.
        trapped_people: u32,
    },
    /// Casualties.
    Medical {
        /// People injured.
        injured_count: u32,
        /// Worst severity observed.
        severity: Severity,
        /// Whether the area must be evacuated.
        needs_evacuation: bool,
    },
}

/// One report from a sensor in the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    /// Reporting sensor.
    pub sensor_id: String,
    /// Where the reading was taken.
    pub location: Position,
    /// The measurement.
    pub reading: Reading,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl SensorReport {
    /// A report stamped now.
    pub fn new(sensor_id: impl Into<String>, location: Position, reading: Reading) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            location,
            reading,
            timestamp: Utc::now(),
        }
    }

    /// Turn the reading into an event, if any threshold is crossed.
    pub fn interpret(&self) -> Option<Event> {
        let location = self.location.to_value();
        match &self.reading {
            Reading::Seismic { magnitude } => {
                let (event_type, priority) = if *magnitude > 6.0 {
                    (events::MAJOR_EARTHQUAKE, 5)
                } else if *magnitude > 4.0 {
                    (events::EARTHQUAKE_DETECTED, 3)
                } else {
                    return None;
                };
                Some(
                    Event::new(event_type, priority)
                        .with("location", location)
                        .with("magnitude", *magnitude)
                        .with("sensor_id", self.sensor_id.as_str()),
                )
            }
            Reading::Fire {
                temperature,
                smoke_level,
            } => (*temperature > 100.0 || *smoke_level > 0.7).then(|| {
                let severity = if *temperature > 150.0 { "high" } else { "medium" };
                Event::new(events::FIRE_DETECTED, 4)
                    .with("location", location)
                    .with("temperature", *temperature)
                    .with("smoke_level", *smoke_level)
                    .with("severity", severity)
            }),
            Reading::Gas {
                concentration,
                gas_type,
            } => (*concentration > 0.5).then(|| {
                Event::new(events::GAS_LEAK_DETECTED, 4)
                    .with("location", location)
                    .with("concentration", *concentration)
                    .with("gas_type", gas_type.as_str())
            }),
            Reading::Structural {
                damage_level,
                trapped_people,
            } => {
                if *damage_level > 0.7 {
                    Some(
                        Event::new(events::BUILDING_COLLAPSE, 5)
                            .with("location", location)
                            .with("damage_level", *damage_level)
                            .with("trapped_people", *trapped_people),
                    )
                } else if *damage_level > 0.4 {
                    Some(
                        Event::new(events::STRUCTURAL_DAMAGE, 3)
                            .with("location", location)
                            .with("damage_level", *damage_level),
                    )
                } else {
                    None
                }
            }
            Reading::Medical {
                injured_count,
                severity,
                needs_evacuation,
            } => (*injured_count > 0).then(|| {
                let priority = if *severity == Severity::Critical { 5 } else { 3 };
                Event::new(events::MEDICAL_EMERGENCY, priority)
                    .with("location", location)
                    .with("injured_count", *injured_count)
                    .with("severity", severity.as_str())
                    .with("needs_evacuation", *needs_evacuation)
            }),
        }
    }
}

/// Seeded source of random sensor reports, keeping every event it
/// produced.
#[derive(Debug, Clone)]
pub struct SensorNetwork {
    rng: SmallRng,
    history: Vec<Event>,
}

impl SensorNetwork {
    /// A network whose reports are reproducible from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            history: Vec::new(),
        }
    }

    /// Draw one random report somewhere in the 100 x 100 zone.
    pub fn random_report(&mut self) -> SensorReport {
        let location = Position::new(
            self.rng.random_range(0..=100),
            self.rng.random_range(0..=100),
        );
        let reading = random_reading(&mut self.rng);
        let sensor_id = format!("SENSOR_{}", self.rng.random_range(1000..=9999));
        SensorReport::new(sensor_id, location, reading)
    }

    /// Interpret `report`, remembering any event it produced.
    pub fn process(&mut self, report: &SensorReport) -> Option<Event> {
        let event = report.interpret()?;
        debug!(sensor = %report.sensor_id, event = %event, "Sensor threshold crossed");
        self.history.push(event.clone());
        Some(event)
    }

    /// Draw and interpret `steps` reports; returns the events produced.
    pub fn simulate(&mut self, steps: usize) -> Vec<Event> {
        (0..steps)
            .filter_map(|_| {
                let report = self.random_report();
                self.process(&report)
            })
            .collect()
    }

    /// Every event produced so far.
    pub fn history(&self) -> &[Event] {
        &self.history
    }
}

fn random_reading(rng: &mut impl Rng) -> Reading {
    match rng.random_range(0..5_u8) {
        0 => Reading::Seismic {
            magnitude: rng.random_range(3.0..7.5),
        },
        1 => Reading::Fire {
            temperature: rng.random_range(20.0..200.0),
            smoke_level: rng.random_range(0.0..1.0),
        },
        2 => Reading::Gas {
            concentration: rng.random_range(0.0..1.0),
            gas_type: String::from(["CO", "CH4", "CO2"].get(rng.random_range(0..3)).copied().unwrap_or("CO")),
        },
        3 => Reading::Structural {
            damage_level: rng.random_range(0.0..1.0),
            trapped_people: rng.random_range(0..=10),
        },
        _ => Reading::Medical {
            injured_count: rng.random_range(1..=20),
            severity: Severity::ALL
                .get(rng.random_range(0..Severity::ALL.len()))
                .copied()
                .unwrap_or(Severity::Low),
            needs_evacuation: rng.random_bool(0.5),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn report(reading: Reading) -> SensorReport {
        SensorReport::new("SENSOR_1000", Position::new(10, 20), reading)
    }

    #[test]
    fn seismic_thresholds() {
        let major = report(Reading::Seismic { magnitude: 6.5 }).interpret().unwrap();
        assert_eq!(major.event_type(), events::MAJOR_EARTHQUAKE);
        assert_eq!(major.priority(), 5);
        assert_eq!(major.get("location"), Some(&json!([10, 20])));

        let minor = report(Reading::Seismic { magnitude: 4.5 }).interpret().unwrap();
        assert_eq!(minor.event_type(), events::EARTHQUAKE_DETECTED);
        assert_eq!(minor.priority(), 3);

        assert!(report(Reading::Seismic { magnitude: 4.0 }).interpret().is_none());
    }

    #[test]
    fn fire_triggers_on_heat_or_smoke() {
        let hot = report(Reading::Fire {
            temperature: 160.0,
            smoke_level: 0.1,
        })
        .interpret()
        .unwrap();
        assert_eq!(hot.priority(), 4);
        assert_eq!(hot.get_str("severity"), Some("high"));

        let smoky = report(Reading::Fire {
            temperature: 40.0,
            smoke_level: 0.8,
        })
        .interpret()
        .unwrap();
        assert_eq!(smoky.get_str("severity"), Some("medium"));

        assert!(
            report(Reading::Fire {
                temperature: 100.0,
                smoke_level: 0.7,
            })
            .interpret()
            .is_none()
        );
    }

    #[test]
    fn gas_and_structural_thresholds() {
        let leak = report(Reading::Gas {
            concentration: 0.6,
            gas_type: String::from("CH4"),
        })
        .interpret()
        .unwrap();
        assert_eq!(leak.event_type(), events::GAS_LEAK_DETECTED);
        assert_eq!(leak.get_str("gas_type"), Some("CH4"));

        let collapse = report(Reading::Structural {
            damage_level: 0.9,
            trapped_people: 4,
        })
        .interpret()
        .unwrap();
        assert_eq!(collapse.event_type(), events::BUILDING_COLLAPSE);
        assert_eq!(collapse.get_i64("trapped_people"), Some(4));

        let damage = report(Reading::Structural {
            damage_level: 0.5,
            trapped_people: 4,
        })
        .interpret()
        .unwrap();
        assert_eq!(damage.event_type(), events::STRUCTURAL_DAMAGE);
        assert_eq!(damage.priority(), 3);
        assert!(damage.get("trapped_people").is_none());
    }

    #[test]
    fn medical_priority_follows_severity() {
        let critical = report(Reading::Medical {
            injured_count: 3,
            severity: Severity::Critical,
            needs_evacuation: true,
        })
        .interpret()
        .unwrap();
        assert_eq!(critical.priority(), 5);

        let moderate = report(Reading::Medical {
            injured_count: 3,
            severity: Severity::Medium,
            needs_evacuation: false,
        })
        .interpret()
        .unwrap();
        assert_eq!(moderate.priority(), 3);

        assert!(
            report(Reading::Medical {
                injured_count: 0,
                severity: Severity::Critical,
                needs_evacuation: true,
            })
            .interpret()
            .is_none()
        );
    }

    #[test]
    fn same_seed_same_reports() {
        let mut a = SensorNetwork::new(7);
        let mut b = SensorNetwork::new(7);
        for _ in 0..20 {
            let ra = a.random_report();
            let rb = b.random_report();
            assert_eq!(ra.location, rb.location);
            assert_eq!(ra.reading, rb.reading);
            assert_eq!(ra.sensor_id, rb.sensor_id);
        }
    }

    #[test]
    fn simulate_records_history() {
        let mut network = SensorNetwork::new(42);
        let produced = network.simulate(50);
        assert_eq!(produced.len(), network.history().len());
        assert!(!produced.is_empty());
        assert!(produced.iter().all(|e| (3..=5).contains(&e.priority())));
    }

    #[test]
    fn reports_serialise_with_a_type_tag() {
        let wire = serde_json::to_value(report(Reading::Seismic { magnitude: 5.0 })).unwrap();
        assert_eq!(
            wire.get("reading").and_then(|r| r.get("sensor_type")),
            Some(&json!("seismic"))
        );
        assert_eq!(wire.get("location"), Some(&json!([10, 20])));
    }
}
