use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AssignmentId, PaymentSplit, SessionId, StudentId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    AssignmentCreated {
        assignment_id: AssignmentId,
        student_id: StudentId,
        session_id: SessionId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    AssignmentDeactivated {
        assignment_id: AssignmentId,
        timestamp: DateTime<Utc>,
    },
    AssignmentSettled {
        assignment_id: AssignmentId,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        assignment_id: AssignmentId,
        amount: Money,
        split: PaymentSplit,
        payment_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    // late fee events
    LateFeeAccrued {
        assignment_id: AssignmentId,
        amount: Money,
        days_late: u32,
        timestamp: DateTime<Utc>,
    },
    LateFeeWaived {
        assignment_id: AssignmentId,
        amount: Money,
        remaining_outstanding: Money,
        timestamp: DateTime<Utc>,
    },

    // discount and funding events
    DiscountApplied {
        assignment_id: AssignmentId,
        amount: Money,
        discount_name: String,
        timestamp: DateTime<Utc>,
    },
    FundingCoverageRecalculated {
        assignment_id: AssignmentId,
        old_coverage: Money,
        new_coverage: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
