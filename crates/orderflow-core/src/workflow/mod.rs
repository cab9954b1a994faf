//! Workflow engine: pure decisions over an order's confirmation flags.
//!
//! A [`WorkflowDefinition`] is an ordered list of steps, each owning one flag.
//! Dispatch steps are completed by sending a document, confirmation steps by
//! an operator recording the customer's answer, and creation steps (extended
//! variant only) are marked together with the dispatch of their document.
//!
//! Nothing here performs I/O and every function is total: any combination of
//! flags, including ones normal operation never produces, has an answer.

use orderflow_types::{Action, DocumentKind, OrderStatus, Workflow, WorkflowFlag};
use std::fmt;

/// How a step's flag becomes true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
	/// Set once the document has been emailed.
	Dispatch(DocumentKind),
	/// Set by an operator.
	Confirmation,
	/// Set alongside the dispatch of the same document.
	Creation(DocumentKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
	pub flag: WorkflowFlag,
	pub kind: StepKind,
	/// Flag that must be true before this step's document may be produced.
	pub permitted_by: Option<WorkflowFlag>,
}

impl Step {
	const fn new(flag: WorkflowFlag, kind: StepKind, permitted_by: Option<WorkflowFlag>) -> Self {
		Self {
			flag,
			kind,
			permitted_by,
		}
	}

	fn document(&self) -> Option<DocumentKind> {
		match self.kind {
			StepKind::Dispatch(kind) | StepKind::Creation(kind) => Some(kind),
			StepKind::Confirmation => None,
		}
	}
}

/// Where an order stands in its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentStep {
	/// `index` is 1-based; `flag` is the first unset flag.
	Pending { index: usize, flag: WorkflowFlag },
	Complete,
}

impl CurrentStep {
	pub fn index(&self) -> Option<usize> {
		match self {
			CurrentStep::Pending { index, .. } => Some(*index),
			CurrentStep::Complete => None,
		}
	}

	pub fn flag(&self) -> Option<WorkflowFlag> {
		match self {
			CurrentStep::Pending { flag, .. } => Some(*flag),
			CurrentStep::Complete => None,
		}
	}
}

impl fmt::Display for CurrentStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CurrentStep::Pending { index, flag } => write!(f, "step {} ({})", index, flag),
			CurrentStep::Complete => f.write_str("complete"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefinition {
	steps: Vec<Step>,
}

impl WorkflowDefinition {
	/// contract sent, contract accepted, manual sent, manual acknowledged,
	/// warranty released.
	pub fn standard() -> Self {
		use StepKind::*;
		use WorkflowFlag::*;

		Self {
			steps: vec![
				Step::new(ContractSent, Dispatch(DocumentKind::Contract), None),
				Step::new(ContractAccepted, Confirmation, None),
				Step::new(
					ManualSent,
					Dispatch(DocumentKind::Manual),
					Some(ContractAccepted),
				),
				Step::new(ManualAcknowledged, Confirmation, None),
				Step::new(
					WarrantyReleased,
					Dispatch(DocumentKind::Warranty),
					Some(ManualAcknowledged),
				),
			],
		}
	}

	/// The standard steps with a creation step before every dispatch.
	pub fn extended() -> Self {
		use StepKind::*;
		use WorkflowFlag::*;

		Self {
			steps: vec![
				Step::new(ContractCreated, Creation(DocumentKind::Contract), None),
				Step::new(ContractSent, Dispatch(DocumentKind::Contract), None),
				Step::new(ContractAccepted, Confirmation, None),
				Step::new(
					ManualCreated,
					Creation(DocumentKind::Manual),
					Some(ContractAccepted),
				),
				Step::new(
					ManualSent,
					Dispatch(DocumentKind::Manual),
					Some(ContractAccepted),
				),
				Step::new(ManualAcknowledged, Confirmation, None),
				Step::new(
					WarrantyCreated,
					Creation(DocumentKind::Warranty),
					Some(ManualAcknowledged),
				),
				Step::new(
					WarrantyReleased,
					Dispatch(DocumentKind::Warranty),
					Some(ManualAcknowledged),
				),
			],
		}
	}

	pub fn steps(&self) -> &[Step] {
		&self.steps
	}

	/// The last flag of the workflow; setting it concludes the order.
	pub fn terminal_flag(&self) -> WorkflowFlag {
		self.steps
			.last()
			.map(|step| step.flag)
			.unwrap_or(WorkflowFlag::WarrantyReleased)
	}

	/// First unset flag in step order. Flags set past a gap are ignored.
	pub fn current_step(&self, workflow: &Workflow) -> CurrentStep {
		self.steps
			.iter()
			.enumerate()
			.find(|(_, step)| !workflow.is_set(step.flag))
			.map(|(i, step)| CurrentStep::Pending {
				index: i + 1,
				flag: step.flag,
			})
			.unwrap_or(CurrentStep::Complete)
	}

	/// Whether the documents for `action` may be produced and sent.
	pub fn can_perform(&self, workflow: &Workflow, action: Action) -> bool {
		let document = action.document();
		self.steps
			.iter()
			.find(|step| step.kind == StepKind::Dispatch(document))
			.is_some_and(|step| step.permitted_by.is_none_or(|flag| workflow.is_set(flag)))
	}

	/// [`can_perform`](Self::can_perform) for an action given by name. Names
	/// other than `sendContract`, `sendManual` and `sendWarranty` are refused.
	pub fn can_perform_named(&self, workflow: &Workflow, action: &str) -> bool {
		action
			.parse::<Action>()
			.is_ok_and(|action| self.can_perform(workflow, action))
	}

	/// `CONCLUDED` when the terminal flag went from unset in `before` to set
	/// in `after`, unless already concluded; `current` otherwise.
	pub fn next_status(
		&self,
		before: &Workflow,
		after: &Workflow,
		current: OrderStatus,
	) -> OrderStatus {
		let terminal = self.terminal_flag();
		if !before.is_set(terminal) && after.is_set(terminal) && current != OrderStatus::Concluded
		{
			OrderStatus::Concluded
		} else {
			current
		}
	}

	/// Status implied by a workflow edited by hand: concluded exactly when the
	/// terminal flag is set. A suspension is kept.
	pub fn reconcile_status(&self, workflow: &Workflow, current: OrderStatus) -> OrderStatus {
		match (current, workflow.is_set(self.terminal_flag())) {
			(OrderStatus::Suspended, _) => OrderStatus::Suspended,
			(_, true) => OrderStatus::Concluded,
			(_, false) => OrderStatus::InProgress,
		}
	}

	/// Flags set when `kind` is dispatched: its dispatch flag and, in the
	/// extended variant, its creation flag.
	pub fn flags_for_document(&self, kind: DocumentKind) -> Vec<WorkflowFlag> {
		self.steps
			.iter()
			.filter(|step| step.document() == Some(kind))
			.map(|step| step.flag)
			.collect()
	}

	/// Flags an operator may record by hand.
	pub fn confirmation_flags(&self) -> Vec<WorkflowFlag> {
		self.steps
			.iter()
			.filter(|step| step.kind == StepKind::Confirmation)
			.map(|step| step.flag)
			.collect()
	}
}

impl Default for WorkflowDefinition {
	fn default() -> Self {
		Self::standard()
	}
}

/// `SUSPENDED` resumes to `IN_PROGRESS`; anything else is suspended.
pub fn toggle_suspend(status: OrderStatus) -> OrderStatus {
	match status {
		OrderStatus::Suspended => OrderStatus::InProgress,
		_ => OrderStatus::Suspended,
	}
}
