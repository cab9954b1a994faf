use crate::{Condition, ContractType, EquipmentModel, Order, OrderDetails};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Details of a leasing customer buying a new Leo3.
pub fn sample_details() -> OrderDetails {
	OrderDetails {
		company_name: "Acque Chiare Srl".to_string(),
		legal_representative: "Maria Rossi".to_string(),
		address: "Via Roma 1".to_string(),
		postal_code: "20100".to_string(),
		city: "Milano".to_string(),
		vat_number: "IT01234567890".to_string(),
		contact_email: "ufficio@acquechiare.it".to_string(),
		model: EquipmentModel::Leo3,
		serial_number: "L3-0042".to_string(),
		condition: Condition::New,
		contract_type: ContractType::Grenke,
		price: Decimal::new(249_900, 2),
		created_on: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap_or_default(),
	}
}

/// A fresh order built from [`sample_details`].
pub fn sample_order(id: &str) -> Order {
	Order::new(id, sample_details())
}
