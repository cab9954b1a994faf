//! Placeholder values and template filling.
//!
//! Templates reference order fields as `{{companyName}}`, `{{ vatNumber }}`
//! and so on. Names match case-insensitively; unknown placeholders are left
//! untouched so a typo shows up in the output instead of disappearing.

use orderflow_types::Order;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Placeholder name to value for `order`.
pub fn replacements(order: &Order) -> BTreeMap<&'static str, String> {
	let details = &order.details;
	BTreeMap::from([
		("createdOn", details.created_on.format("%d/%m/%Y").to_string()),
		("contractType", details.contract_type.to_string()),
		("companyName", details.company_name.clone()),
		("legalRepresentative", details.legal_representative.clone()),
		("address", details.address.clone()),
		("postalCode", details.postal_code.clone()),
		("city", details.city.clone()),
		("vatNumber", details.vat_number.clone()),
		("contactEmail", details.contact_email.clone()),
		("model", details.model.to_string()),
		("serialNumber", details.serial_number.clone()),
		("condition", details.condition.to_string()),
		("price", format!("{:.2}", details.price)),
	])
}

fn placeholder() -> &'static Regex {
	static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
	PLACEHOLDER.get_or_init(|| {
		#[allow(clippy::expect_used)]
		Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
	})
}

/// Substitutes every known `{{name}}` in `template`.
pub fn fill(template: &str, values: &BTreeMap<&'static str, String>) -> String {
	let lookup: BTreeMap<String, &str> = values
		.iter()
		.map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
		.collect();

	placeholder()
		.replace_all(template, |caps: &Captures| {
			match lookup.get(&caps[1].to_ascii_lowercase()) {
				Some(value) => value.to_string(),
				None => caps[0].to_string(),
			}
		})
		.into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_types::testing::sample_order;

	#[test]
	fn test_values_for_order() {
		let values = replacements(&sample_order("a"));
		assert_eq!(values["createdOn"], "14/03/2025");
		assert_eq!(values["price"], "2499.00");
		assert_eq!(values["model"], "Leo3");
		assert_eq!(values["contractType"], "Grenke");
	}

	#[test]
	fn test_fill_is_case_insensitive() {
		let values = replacements(&sample_order("a"));
		let filled = fill(
			"{{COMPANYNAME}} ({{ vatNumber }}) - {{serialnumber}}",
			&values,
		);
		assert_eq!(filled, "Acque Chiare Srl (IT01234567890) - L3-0042");
	}

	#[test]
	fn test_unknown_placeholder_kept() {
		let values = replacements(&sample_order("a"));
		assert_eq!(fill("Dear {{nickname}}", &values), "Dear {{nickname}}");
	}
}
