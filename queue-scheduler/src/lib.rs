//! Waiting-room queue projection
//!
//! A pure read-side view over the active encounters of one institution.
//! The projection never mutates state; any action taken on an entry goes
//! back through the encounter engine. Running it twice on unchanged input
//! yields an identical order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use encounter_engine::{Encounter, EncounterStatus, Priority};
use ledger_engine::ChargeOrderStatus;

/// Projection input: an encounter paired with the status of its charge
/// order, when one exists.
#[derive(Debug, Clone)]
pub struct QueueCandidate {
    pub encounter: Encounter,
    pub order_status: Option<ChargeOrderStatus>,
}

/// One row of the waiting-room display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaitingRoomEntry {
    /// 1-based position in the visible queue
    pub position: u32,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub priority: Priority,
    pub status: EncounterStatus,
    pub arrived_at: Option<DateTime<Utc>>,
    pub waited_minutes: i64,
    /// The patient still owes on an open charge order. Display-only; it
    /// does not gate the consultation transition.
    pub billing_hold: bool,
}

/// Count of encounters per status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: EncounterStatus,
    pub count: u64,
}

/// Count of waiting-eligible encounters per priority tier
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: u64,
}

/// Aggregate counts for the waiting-room dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueGroups {
    pub by_status: Vec<StatusCount>,
    pub by_priority: Vec<PriorityCount>,
}

const ALL_STATUSES: [EncounterStatus; 5] = [
    EncounterStatus::Pending,
    EncounterStatus::Arrived,
    EncounterStatus::InConsultation,
    EncounterStatus::Completed,
    EncounterStatus::Canceled,
];

const ALL_PRIORITIES: [Priority; 3] = [Priority::Urgente, Priority::Alta, Priority::Normal];

/// Build the ordered waiting-room queue.
///
/// Candidates outside {arrived, in_consultation} are dropped. Order is
/// priority descending, then arrival time ascending (FIFO within a tier),
/// with the encounter id as a final tie-break so the projection is stable
/// across runs.
pub fn project_queue(candidates: &[QueueCandidate], now: DateTime<Utc>) -> Vec<WaitingRoomEntry> {
    let mut waiting: Vec<&QueueCandidate> = candidates
        .iter()
        .filter(|c| c.encounter.status.is_waiting_eligible())
        .collect();

    waiting.sort_by(|a, b| {
        b.encounter
            .priority
            .cmp(&a.encounter.priority)
            .then_with(|| arrival_key(&a.encounter).cmp(&arrival_key(&b.encounter)))
            .then_with(|| a.encounter.id.cmp(&b.encounter.id))
    });

    waiting
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let encounter = &candidate.encounter;
            let waited_minutes = encounter
                .arrived_at
                .map(|arrived| (now - arrived).num_minutes().max(0))
                .unwrap_or(0);
            WaitingRoomEntry {
                position: idx as u32 + 1,
                encounter_id: encounter.id,
                patient_id: encounter.patient_id,
                physician_id: encounter.physician_id,
                priority: encounter.priority,
                status: encounter.status,
                arrived_at: encounter.arrived_at,
                waited_minutes,
                billing_hold: billing_hold(candidate),
            }
        })
        .collect()
}

/// Aggregate counts: statuses across the whole input set, priorities
/// across the waiting-eligible subset.
pub fn group_counts(candidates: &[QueueCandidate]) -> QueueGroups {
    let by_status = ALL_STATUSES
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: candidates.iter().filter(|c| c.encounter.status == *status).count() as u64,
        })
        .collect();

    let by_priority = ALL_PRIORITIES
        .iter()
        .map(|priority| PriorityCount {
            priority: *priority,
            count: candidates
                .iter()
                .filter(|c| {
                    c.encounter.status.is_waiting_eligible() && c.encounter.priority == *priority
                })
                .count() as u64,
        })
        .collect();

    QueueGroups { by_status, by_priority }
}

fn arrival_key(encounter: &Encounter) -> DateTime<Utc> {
    encounter.arrived_at.unwrap_or(encounter.created_at)
}

fn billing_hold(candidate: &QueueCandidate) -> bool {
    candidate.encounter.status == EncounterStatus::Arrived
        && matches!(
            candidate.order_status,
            Some(ChargeOrderStatus::Open) | Some(ChargeOrderStatus::PartiallyPaid)
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use encounter_engine::{EncounterType, NewEncounter, WalkInRegistration};
    use rust_decimal_macros::dec;

    fn candidate(priority: Priority, arrived_offset_min: i64, now: DateTime<Utc>) -> QueueCandidate {
        let mut encounter = Encounter::walk_in(
            WalkInRegistration {
                institution_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                physician_id: Uuid::new_v4(),
                encounter_type: EncounterType::General,
                priority,
                expected_amount: dec!(0),
            },
            now - Duration::minutes(arrived_offset_min),
        );
        encounter.priority = priority;
        QueueCandidate { encounter, order_status: None }
    }

    #[test]
    fn test_priority_beats_arrival_order() {
        let now = Utc::now();
        let early_normal = candidate(Priority::Normal, 90, now);
        let late_urgent = candidate(Priority::Urgente, 5, now);
        let mid_alta = candidate(Priority::Alta, 30, now);

        let queue = project_queue(
            &[early_normal.clone(), late_urgent.clone(), mid_alta.clone()],
            now,
        );
        assert_eq!(queue.len(), 3);
        assert_eq!(queue[0].encounter_id, late_urgent.encounter.id);
        assert_eq!(queue[1].encounter_id, mid_alta.encounter.id);
        assert_eq!(queue[2].encounter_id, early_normal.encounter.id);
        assert_eq!(queue[0].position, 1);
        assert_eq!(queue[2].position, 3);
    }

    #[test]
    fn test_fifo_within_tier() {
        let now = Utc::now();
        let first = candidate(Priority::Normal, 60, now);
        let second = candidate(Priority::Normal, 20, now);

        let queue = project_queue(&[second.clone(), first.clone()], now);
        assert_eq!(queue[0].encounter_id, first.encounter.id);
        assert_eq!(queue[1].encounter_id, second.encounter.id);
        assert_eq!(queue[0].waited_minutes, 60);
        assert_eq!(queue[1].waited_minutes, 20);
    }

    #[test]
    fn test_projection_is_reproducible() {
        let now = Utc::now();
        let candidates: Vec<QueueCandidate> = (0..10)
            .map(|i| {
                let tier = match i % 3 {
                    0 => Priority::Normal,
                    1 => Priority::Alta,
                    _ => Priority::Urgente,
                };
                candidate(tier, i * 3, now)
            })
            .collect();

        let first: Vec<Uuid> = project_queue(&candidates, now).iter().map(|e| e.encounter_id).collect();
        let second: Vec<Uuid> = project_queue(&candidates, now).iter().map(|e| e.encounter_id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_waiting_statuses_are_excluded() {
        let now = Utc::now();
        let mut done = candidate(Priority::Normal, 45, now);
        done.encounter.start_consultation(now).unwrap();
        done.encounter.complete(now).unwrap();
        let waiting = candidate(Priority::Normal, 10, now);

        let queue = project_queue(&[done, waiting.clone()], now);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].encounter_id, waiting.encounter.id);
    }

    #[test]
    fn test_billing_hold_flags_arrived_with_open_order() {
        let now = Utc::now();
        let mut unpaid = candidate(Priority::Normal, 10, now);
        unpaid.order_status = Some(ChargeOrderStatus::Open);
        let mut settled = candidate(Priority::Normal, 20, now);
        settled.order_status = Some(ChargeOrderStatus::Paid);
        let mut in_consult = candidate(Priority::Normal, 30, now);
        in_consult.encounter.start_consultation(now).unwrap();
        in_consult.order_status = Some(ChargeOrderStatus::PartiallyPaid);

        let queue = project_queue(&[unpaid.clone(), settled.clone(), in_consult.clone()], now);
        let find = |id: Uuid| queue.iter().find(|e| e.encounter_id == id).unwrap();
        assert!(find(unpaid.encounter.id).billing_hold);
        assert!(!find(settled.encounter.id).billing_hold);
        assert!(!find(in_consult.encounter.id).billing_hold);
    }

    #[test]
    fn test_group_counts() {
        let now = Utc::now();
        let mut completed = candidate(Priority::Normal, 50, now);
        completed.encounter.start_consultation(now).unwrap();
        completed.encounter.complete(now).unwrap();
        let pending = {
            let encounter = Encounter::schedule(
                NewEncounter {
                    institution_id: Uuid::new_v4(),
                    patient_id: Uuid::new_v4(),
                    physician_id: Uuid::new_v4(),
                    scheduled_date: now.date_naive(),
                    encounter_type: EncounterType::General,
                    priority: Priority::Normal,
                    expected_amount: dec!(0),
                    notes: None,
                },
                now,
            );
            QueueCandidate { encounter, order_status: None }
        };
        let urgent = candidate(Priority::Urgente, 5, now);
        let normal = candidate(Priority::Normal, 15, now);

        let groups = group_counts(&[completed, pending, urgent, normal]);

        let status_count = |status: EncounterStatus| {
            groups.by_status.iter().find(|c| c.status == status).unwrap().count
        };
        assert_eq!(status_count(EncounterStatus::Arrived), 2);
        assert_eq!(status_count(EncounterStatus::Pending), 1);
        assert_eq!(status_count(EncounterStatus::Completed), 1);
        assert_eq!(status_count(EncounterStatus::Canceled), 0);

        let priority_count = |priority: Priority| {
            groups.by_priority.iter().find(|c| c.priority == priority).unwrap().count
        };
        assert_eq!(priority_count(Priority::Urgente), 1);
        assert_eq!(priority_count(Priority::Normal), 1);
        assert_eq!(priority_count(Priority::Alta), 0);
    }
}
