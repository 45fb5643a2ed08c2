//! fwup workflow orchestration.
//!
//! This crate holds the firmware-update wizard: the install step coordinator
//! that follows a device event stream, its progress state and presentation,
//! and the memo form used by the send flow. Event sources are injected from
//! `fwup-device`.

pub mod memo;
pub mod progress;
pub mod step_coordinator;
pub mod view;
pub mod wizard;

pub use memo::{
    AccountBridge, HederaBridge, HederaTransaction, MemoForm, SummaryNavigator, SummaryRoute,
};
pub use progress::ProgressState;
pub use step_coordinator::{step_after_download, CoordinatorPhase, PollStatus, StepCoordinator};
pub use view::InstallView;
pub use wizard::{FirmwareUpdateWizard, StepId, StepOutcome, WizardContext, WizardHost};
