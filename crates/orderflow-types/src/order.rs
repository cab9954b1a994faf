//! Order records and the confirmation flags that drive their lifecycle.
//!
//! An order is one sales transaction for a piece of water-treatment
//! equipment. Its descriptive fields are only changed by explicit edits, while
//! the workflow flags record which documents have been dispatched and which
//! confirmations have been received.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A sales order tracked through the documentation workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Opaque unique identifier assigned at creation.
	pub id: String,
	/// Customer and equipment details.
	#[serde(flatten)]
	pub details: OrderDetails,
	/// Aggregate status of the order.
	pub status: OrderStatus,
	/// Confirmation flags.
	#[serde(default)]
	pub workflow: Workflow,
	/// Unix seconds of the last persisted mutation.
	#[serde(default)]
	pub updated_at: u64,
}

impl Order {
	/// Creates a fresh order: all flags unset and `IN_PROGRESS`.
	pub fn new(id: impl Into<String>, details: OrderDetails) -> Self {
		Self {
			id: id.into(),
			details,
			status: OrderStatus::InProgress,
			workflow: Workflow::default(),
			updated_at: 0,
		}
	}

	pub fn is_suspended(&self) -> bool {
		self.status == OrderStatus::Suspended
	}
}

/// Descriptive attributes of an order.
///
/// This is also the body accepted when creating or editing an order, so it
/// carries nothing the workflow owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
	pub company_name: String,
	pub legal_representative: String,
	pub address: String,
	pub postal_code: String,
	pub city: String,
	/// Tax identifier of the customer.
	pub vat_number: String,
	/// Recipient of every document dispatched for this order.
	pub contact_email: String,
	pub model: EquipmentModel,
	pub serial_number: String,
	pub condition: Condition,
	pub contract_type: ContractType,
	pub price: Decimal,
	pub created_on: NaiveDate,
}

/// Aggregate status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	InProgress,
	/// Manual override, orthogonal to the flags.
	Suspended,
	/// Set once the terminal flag is true.
	Concluded,
}

impl OrderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::InProgress => "IN_PROGRESS",
			OrderStatus::Suspended => "SUSPENDED",
			OrderStatus::Concluded => "CONCLUDED",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Commercial arrangement under which the equipment is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
	/// Leasing through Grenke; documented by a usage agreement.
	Grenke,
	New,
	Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentModel {
	Leo2,
	Leo3,
	Leo4,
	Leo5,
	Titano,
}

impl fmt::Display for EquipmentModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			EquipmentModel::Leo2 => "Leo2",
			EquipmentModel::Leo3 => "Leo3",
			EquipmentModel::Leo4 => "Leo4",
			EquipmentModel::Leo5 => "Leo5",
			EquipmentModel::Titano => "Titano",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
	New,
	Used,
}

impl fmt::Display for Condition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Condition::New => f.write_str("New"),
			Condition::Used => f.write_str("Used"),
		}
	}
}

impl fmt::Display for ContractType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ContractType::Grenke => f.write_str("Grenke"),
			ContractType::New => f.write_str("New"),
			ContractType::Used => f.write_str("Used"),
		}
	}
}

/// The documents produced during the lifecycle, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
	Contract,
	Manual,
	Warranty,
}

impl DocumentKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			DocumentKind::Contract => "contract",
			DocumentKind::Manual => "manual",
			DocumentKind::Warranty => "warranty",
		}
	}

	/// The action that dispatches this document.
	pub fn action(&self) -> Action {
		match self {
			DocumentKind::Contract => Action::SendContract,
			DocumentKind::Manual => Action::SendManual,
			DocumentKind::Warranty => Action::SendWarranty,
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Contract, Self::Manual, Self::Warranty].into_iter()
	}
}

impl fmt::Display for DocumentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for DocumentKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"contract" => Ok(Self::Contract),
			"manual" => Ok(Self::Manual),
			"warranty" => Ok(Self::Warranty),
			other => Err(format!("unknown document kind '{}'", other)),
		}
	}
}

/// An operation that produces and dispatches a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
	SendContract,
	SendManual,
	SendWarranty,
}

impl Action {
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::SendContract => "sendContract",
			Action::SendManual => "sendManual",
			Action::SendWarranty => "sendWarranty",
		}
	}

	pub fn document(&self) -> DocumentKind {
		match self {
			Action::SendContract => DocumentKind::Contract,
			Action::SendManual => DocumentKind::Manual,
			Action::SendWarranty => DocumentKind::Warranty,
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sendContract" => Ok(Self::SendContract),
			"sendManual" => Ok(Self::SendManual),
			"sendWarranty" => Ok(Self::SendWarranty),
			other => Err(format!("unknown action '{}'", other)),
		}
	}
}

/// A boolean confirmation flag of the workflow.
///
/// The five canonical flags are always present on the wire. The `*Created`
/// flags belong to the extended workflow and only show up once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowFlag {
	ContractCreated,
	ContractSent,
	ContractAccepted,
	ManualCreated,
	ManualSent,
	ManualAcknowledged,
	WarrantyCreated,
	WarrantyReleased,
}

impl WorkflowFlag {
	/// Flags of the five-step workflow, in order.
	pub const CANONICAL: [WorkflowFlag; 5] = [
		WorkflowFlag::ContractSent,
		WorkflowFlag::ContractAccepted,
		WorkflowFlag::ManualSent,
		WorkflowFlag::ManualAcknowledged,
		WorkflowFlag::WarrantyReleased,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			WorkflowFlag::ContractCreated => "contractCreated",
			WorkflowFlag::ContractSent => "contractSent",
			WorkflowFlag::ContractAccepted => "contractAccepted",
			WorkflowFlag::ManualCreated => "manualCreated",
			WorkflowFlag::ManualSent => "manualSent",
			WorkflowFlag::ManualAcknowledged => "manualAcknowledged",
			WorkflowFlag::WarrantyCreated => "warrantyCreated",
			WorkflowFlag::WarrantyReleased => "warrantyReleased",
		}
	}

	pub fn is_canonical(&self) -> bool {
		Self::CANONICAL.contains(self)
	}
}

impl fmt::Display for WorkflowFlag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for WorkflowFlag {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"contractCreated" => Ok(Self::ContractCreated),
			"contractSent" => Ok(Self::ContractSent),
			"contractAccepted" => Ok(Self::ContractAccepted),
			"manualCreated" => Ok(Self::ManualCreated),
			"manualSent" => Ok(Self::ManualSent),
			"manualAcknowledged" => Ok(Self::ManualAcknowledged),
			"warrantyCreated" => Ok(Self::WarrantyCreated),
			"warrantyReleased" => Ok(Self::WarrantyReleased),
			other => Err(format!("unknown workflow flag '{}'", other)),
		}
	}
}

/// The set of confirmation flags that are currently true.
///
/// Serialized as a map of flag name to boolean. Flags missing from a stored
/// record read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workflow {
	set: BTreeSet<WorkflowFlag>,
}

impl Workflow {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_set(&self, flag: WorkflowFlag) -> bool {
		self.set.contains(&flag)
	}

	pub fn set(&mut self, flag: WorkflowFlag) {
		self.set.insert(flag);
	}

	pub fn clear(&mut self, flag: WorkflowFlag) {
		self.set.remove(&flag);
	}

	/// Returns a copy with `flag` set.
	pub fn with(mut self, flag: WorkflowFlag) -> Self {
		self.set(flag);
		self
	}

	/// Flags currently true, in workflow order.
	pub fn flags(&self) -> impl Iterator<Item = WorkflowFlag> + '_ {
		self.set.iter().copied()
	}
}

impl FromIterator<WorkflowFlag> for Workflow {
	fn from_iter<I: IntoIterator<Item = WorkflowFlag>>(iter: I) -> Self {
		Self {
			set: iter.into_iter().collect(),
		}
	}
}

impl Serialize for Workflow {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map: BTreeMap<WorkflowFlag, bool> = WorkflowFlag::CANONICAL
			.iter()
			.map(|flag| (*flag, false))
			.collect();
		for flag in &self.set {
			map.insert(*flag, true);
		}
		map.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Workflow {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let map = BTreeMap::<WorkflowFlag, bool>::deserialize(deserializer)?;
		Ok(map
			.into_iter()
			.filter_map(|(flag, value)| value.then_some(flag))
			.collect())
	}
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
	pub total: usize,
	pub in_progress: usize,
	pub suspended: usize,
	pub concluded: usize,
}

impl OrderStats {
	pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
		orders
			.into_iter()
			.fold(OrderStats::default(), |mut stats, order| {
				stats.total += 1;
				match order.status {
					OrderStatus::InProgress => stats.in_progress += 1,
					OrderStatus::Suspended => stats.suspended += 1,
					OrderStatus::Concluded => stats.concluded += 1,
				}
				stats
			})
	}
}
