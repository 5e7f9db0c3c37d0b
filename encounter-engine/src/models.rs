use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{EncounterError, EncounterResult};

/// Encounter lifecycle status
///
/// `pending -> arrived -> in_consultation -> completed`; any non-terminal
/// status may move to `canceled`. Completed and canceled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Pending,
    Arrived,
    InConsultation,
    Completed,
    Canceled,
}

impl EncounterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncounterStatus::Pending => "pending",
            EncounterStatus::Arrived => "arrived",
            EncounterStatus::InConsultation => "in_consultation",
            EncounterStatus::Completed => "completed",
            EncounterStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EncounterStatus::Completed | EncounterStatus::Canceled)
    }

    /// Waiting-room candidate statuses (the queue projection's input set).
    pub fn is_waiting_eligible(&self) -> bool {
        matches!(self, EncounterStatus::Arrived | EncounterStatus::InConsultation)
    }
}

impl fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EncounterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EncounterStatus::Pending),
            "arrived" => Ok(EncounterStatus::Arrived),
            "in_consultation" => Ok(EncounterStatus::InConsultation),
            "completed" => Ok(EncounterStatus::Completed),
            "canceled" => Ok(EncounterStatus::Canceled),
            other => Err(format!("unknown encounter status: {}", other)),
        }
    }
}

/// Encounter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EncounterType {
    General,
    Specialized,
}

impl EncounterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncounterType::General => "general",
            EncounterType::Specialized => "specialized",
        }
    }
}

impl std::str::FromStr for EncounterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(EncounterType::General),
            "specialized" => Ok(EncounterType::Specialized),
            other => Err(format!("unknown encounter type: {}", other)),
        }
    }
}

/// Clinical priority tier
///
/// Wire names are kept from the clinic network's triage vocabulary.
/// Ordering is derived so that `Urgente > Alta > Normal`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    Alta,
    Urgente,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Alta => "alta",
            Priority::Urgente => "urgente",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Priority::Normal),
            "alta" => Ok(Priority::Alta),
            "urgente" => Ok(Priority::Urgente),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// One scheduled or walk-in clinical visit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Encounter {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub encounter_type: EncounterType,
    pub priority: Priority,
    pub status: EncounterStatus,
    pub arrived_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub expected_amount: Decimal,
    /// Optimistic-concurrency token; bumped by the store on every commit.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for scheduling an encounter ahead of the visit
#[derive(Debug, Clone)]
pub struct NewEncounter {
    pub institution_id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub encounter_type: EncounterType,
    pub priority: Priority,
    pub expected_amount: Decimal,
    pub notes: Option<String>,
}

/// Input for registering a walk-in with no prior scheduled encounter
#[derive(Debug, Clone)]
pub struct WalkInRegistration {
    pub institution_id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub encounter_type: EncounterType,
    pub priority: Priority,
    pub expected_amount: Decimal,
}

impl Encounter {
    /// Create a scheduled encounter in `pending`.
    pub fn schedule(new: NewEncounter, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id: new.institution_id,
            patient_id: new.patient_id,
            physician_id: new.physician_id,
            scheduled_date: new.scheduled_date,
            encounter_type: new.encounter_type,
            priority: new.priority,
            status: EncounterStatus::Pending,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            notes: new.notes,
            expected_amount: new.expected_amount,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a walk-in encounter directly in `arrived`.
    pub fn walk_in(reg: WalkInRegistration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id: reg.institution_id,
            patient_id: reg.patient_id,
            physician_id: reg.physician_id,
            scheduled_date: now.date_naive(),
            encounter_type: reg.encounter_type,
            priority: reg.priority,
            status: EncounterStatus::Arrived,
            arrived_at: Some(now),
            started_at: None,
            completed_at: None,
            notes: None,
            expected_amount: reg.expected_amount,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// `pending -> arrived`, stamping the arrival time.
    pub fn register_arrival(&mut self, now: DateTime<Utc>) -> EncounterResult<()> {
        if self.status != EncounterStatus::Pending {
            return Err(EncounterError::AlreadyArrived);
        }
        self.status = EncounterStatus::Arrived;
        self.arrived_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// `arrived -> in_consultation`, stamping the start time.
    pub fn start_consultation(&mut self, now: DateTime<Utc>) -> EncounterResult<()> {
        if self.status != EncounterStatus::Arrived {
            return Err(EncounterError::InvalidTransition {
                from: self.status,
                to: EncounterStatus::InConsultation,
            });
        }
        self.status = EncounterStatus::InConsultation;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// `in_consultation -> completed`, stamping the completion time.
    pub fn complete(&mut self, now: DateTime<Utc>) -> EncounterResult<()> {
        if self.status != EncounterStatus::InConsultation {
            return Err(EncounterError::InvalidTransition {
                from: self.status,
                to: EncounterStatus::Completed,
            });
        }
        self.status = EncounterStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Any non-terminal status -> `canceled`. A canceled encounter never
    /// carries a completion timestamp.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> EncounterResult<()> {
        if self.status.is_terminal() {
            return Err(EncounterError::InvalidTransition {
                from: self.status,
                to: EncounterStatus::Canceled,
            });
        }
        self.status = EncounterStatus::Canceled;
        self.updated_at = now;
        Ok(())
    }

    /// Replace the free-text notes; permitted in any non-terminal status.
    pub fn set_notes(&mut self, notes: Option<String>, now: DateTime<Utc>) -> EncounterResult<()> {
        if self.status.is_terminal() {
            return Err(EncounterError::InvalidTransition { from: self.status, to: self.status });
        }
        self.notes = notes;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn scheduled() -> Encounter {
        Encounter::schedule(
            NewEncounter {
                institution_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                physician_id: Uuid::new_v4(),
                scheduled_date: Utc::now().date_naive(),
                encounter_type: EncounterType::General,
                priority: Priority::Normal,
                expected_amount: dec!(350.00),
                notes: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_full_lifecycle_stamps_timestamps() {
        let now = Utc::now();
        let mut enc = scheduled();
        assert_eq!(enc.status, EncounterStatus::Pending);
        assert!(enc.arrived_at.is_none());

        enc.register_arrival(now).unwrap();
        assert_eq!(enc.status, EncounterStatus::Arrived);
        assert!(enc.arrived_at.is_some());
        assert!(enc.started_at.is_none());

        enc.start_consultation(now).unwrap();
        assert_eq!(enc.status, EncounterStatus::InConsultation);
        assert!(enc.started_at.is_some());
        assert!(enc.completed_at.is_none());

        enc.complete(now).unwrap();
        assert_eq!(enc.status, EncounterStatus::Completed);
        assert!(enc.completed_at.is_some());
    }

    #[test]
    fn test_arrival_is_not_idempotent() {
        let now = Utc::now();
        let mut enc = scheduled();
        enc.register_arrival(now).unwrap();
        assert!(matches!(enc.register_arrival(now), Err(EncounterError::AlreadyArrived)));
    }

    #[test]
    fn test_start_requires_arrival() {
        let now = Utc::now();
        let mut enc = scheduled();
        let err = enc.start_consultation(now).unwrap_err();
        assert!(matches!(
            err,
            EncounterError::InvalidTransition { from: EncounterStatus::Pending, .. }
        ));
    }

    #[test]
    fn test_double_start_leaves_state_unchanged() {
        let now = Utc::now();
        let mut enc = scheduled();
        enc.register_arrival(now).unwrap();
        enc.start_consultation(now).unwrap();
        let snapshot_started_at = enc.started_at;

        let err = enc.start_consultation(now).unwrap_err();
        assert!(matches!(err, EncounterError::InvalidTransition { .. }));
        assert_eq!(enc.status, EncounterStatus::InConsultation);
        assert_eq!(enc.started_at, snapshot_started_at);
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        let now = Utc::now();

        let mut pending = scheduled();
        pending.cancel(now).unwrap();
        assert_eq!(pending.status, EncounterStatus::Canceled);
        assert!(pending.completed_at.is_none());

        let mut in_consult = scheduled();
        in_consult.register_arrival(now).unwrap();
        in_consult.start_consultation(now).unwrap();
        in_consult.cancel(now).unwrap();
        assert_eq!(in_consult.status, EncounterStatus::Canceled);
        assert!(in_consult.completed_at.is_none());
    }

    #[test]
    fn test_cancel_is_terminal() {
        let now = Utc::now();
        let mut enc = scheduled();
        enc.cancel(now).unwrap();
        assert!(matches!(enc.cancel(now), Err(EncounterError::InvalidTransition { .. })));
        assert!(matches!(enc.complete(now), Err(EncounterError::InvalidTransition { .. })));
    }

    #[test]
    fn test_notes_blocked_after_terminal() {
        let now = Utc::now();
        let mut enc = scheduled();
        enc.set_notes(Some("allergic to penicillin".to_string()), now).unwrap();
        assert_eq!(enc.notes.as_deref(), Some("allergic to penicillin"));

        enc.cancel(now).unwrap();
        assert!(enc.set_notes(Some("late edit".to_string()), now).is_err());
        assert_eq!(enc.notes.as_deref(), Some("allergic to penicillin"));
    }

    #[test]
    fn test_walk_in_arrives_immediately() {
        let now = Utc::now();
        let enc = Encounter::walk_in(
            WalkInRegistration {
                institution_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                physician_id: Uuid::new_v4(),
                encounter_type: EncounterType::General,
                priority: Priority::Urgente,
                expected_amount: dec!(0),
            },
            now,
        );
        assert_eq!(enc.status, EncounterStatus::Arrived);
        assert_eq!(enc.arrived_at, Some(now));
        assert_eq!(enc.scheduled_date, now.date_naive());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Urgente > Priority::Alta);
        assert!(Priority::Alta > Priority::Normal);
    }
}
