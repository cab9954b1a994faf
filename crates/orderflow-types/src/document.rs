//! Documents produced by the generator and messages handed to the sender.

use crate::{DocumentKind, Order};
use std::fmt;

/// MIME type of exported PDF documents.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A generated document ready to be attached to an email.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
	pub kind: DocumentKind,
	pub filename: String,
	pub mime_type: String,
	pub content: Vec<u8>,
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("kind", &self.kind)
			.field("filename", &self.filename)
			.field("mime_type", &self.mime_type)
			.field("size", &self.content.len())
			.finish()
	}
}

/// Human readable title of a document for the given order.
///
/// The contract title depends on the contract type: leasing customers sign a
/// usage agreement, everybody else a B2B contract.
pub fn document_title(order: &Order, kind: DocumentKind) -> &'static str {
	match kind {
		DocumentKind::Contract => match order.details.contract_type {
			crate::ContractType::Grenke => "ACCORDO DI UTILIZZO",
			_ => "CONTRATTO B2B",
		},
		DocumentKind::Manual => "Manuale",
		DocumentKind::Warranty => "GARANZIA_CE",
	}
}

/// Base name of a document: `<TITLE> - <company> - <YYYY-MM-DD>`.
pub fn document_name(order: &Order, kind: DocumentKind, date: chrono::NaiveDate) -> String {
	format!(
		"{} - {} - {}",
		document_title(order, kind),
		order.details.company_name,
		date.format("%Y-%m-%d")
	)
}

/// An outgoing email with attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
	pub from: String,
	pub to: String,
	/// Blind copies, typically the sender's own mailbox.
	pub bcc: Vec<String>,
	pub subject: String,
	pub body: String,
	pub attachments: Vec<Document>,
}

impl EmailMessage {
	/// Composes the dispatch email for a document of `order`.
	pub fn for_document(
		order: &Order,
		document: Document,
		from: impl Into<String>,
		bcc: Vec<String>,
	) -> Self {
		let subject = format!(
			"{} - {}",
			document_title(order, document.kind),
			order.details.company_name
		);
		let body = match document.kind {
			DocumentKind::Contract => format!(
				"Dear {},\n\nplease find attached the contract for your {} water treatment system. \
				 Kindly return it signed.\n\nBest regards.",
				order.details.legal_representative, order.details.model
			),
			DocumentKind::Manual => format!(
				"Dear {},\n\nplease find attached the operating manual for your {} (serial {}). \
				 Kindly return it countersigned.\n\nBest regards.",
				order.details.legal_representative, order.details.model, order.details.serial_number
			),
			DocumentKind::Warranty => format!(
				"Dear {},\n\nplease find attached the CE warranty certificate for your {} (serial {}).\
				 \n\nBest regards.",
				order.details.legal_representative, order.details.model, order.details.serial_number
			),
		};

		Self {
			from: from.into(),
			to: order.details.contact_email.clone(),
			bcc,
			subject,
			body,
			attachments: vec![document],
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::sample_details;
	use crate::ContractType;
	use chrono::NaiveDate;

	#[test]
	fn test_contract_title_follows_contract_type() {
		let mut order = Order::new("a", sample_details());
		assert_eq!(
			document_title(&order, DocumentKind::Contract),
			"ACCORDO DI UTILIZZO"
		);
		order.details.contract_type = ContractType::Used;
		assert_eq!(document_title(&order, DocumentKind::Contract), "CONTRATTO B2B");
	}

	#[test]
	fn test_document_name() {
		let order = Order::new("a", sample_details());
		let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
		assert_eq!(
			document_name(&order, DocumentKind::Warranty, date),
			"GARANZIA_CE - Acque Chiare Srl - 2025-04-02"
		);
	}

	#[test]
	fn test_email_for_document_targets_contact() {
		let order = Order::new("a", sample_details());
		let document = Document {
			kind: DocumentKind::Manual,
			filename: "Manuale.pdf".to_string(),
			mime_type: PDF_MIME_TYPE.to_string(),
			content: vec![1, 2, 3],
		};
		let message = EmailMessage::for_document(
			&order,
			document,
			"office@example.com",
			vec!["office@example.com".into()],
		);
		assert_eq!(message.to, "ufficio@acquechiare.it");
		assert_eq!(message.subject, "Manuale - Acque Chiare Srl");
		assert!(message.body.contains("L3-0042"));
		assert_eq!(message.attachments.len(), 1);
	}
}
