pub mod assignment;
pub mod decimal;
pub mod discount;
pub mod errors;
pub mod events;
pub mod funding;
pub mod late_fee;
pub mod ledger;
pub mod payments;
pub mod store;
pub mod types;
pub mod waiver;

// re-export key types
pub use assignment::{net_principal, FeeAssignment, FeeStructure};
pub use decimal::{Money, Rate};
pub use discount::{compute_discount, DiscountApplication};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use funding::{recompute_coverage, Coverage, FundingArrangement, PartialCoverage};
pub use late_fee::{accrual_increment, LateFeeCalculation};
pub use ledger::FeeLedger;
pub use payments::{
    PaymentAllocation, PaymentAllocator, PaymentRecord, PaymentRequest,
};
pub use store::{LedgerStore, MemoryLedgerStore};
pub use types::{
    ActorId, AdjustmentKind, AssignmentId, DiscountDefinition, DiscountId, DiscountKind,
    DiscountSnapshot, FeeAdjustment, FeeStructureId, LateFeeCap, LateFeePolicy, PaymentMode,
    PaymentSplit, SessionId, StudentId,
};
pub use waiver::{compute_waiver, WaiverApplication};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
