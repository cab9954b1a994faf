//! JSON form of an email shared by the http and outbox backends.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use orderflow_types::EmailMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMessage {
	pub from: String,
	pub to: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub bcc: Vec<String>,
	pub subject: String,
	pub text: String,
	pub attachments: Vec<WireAttachment>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAttachment {
	pub filename: String,
	pub content_type: String,
	/// Standard base64 of the file bytes.
	pub content: String,
}

impl From<&EmailMessage> for WireMessage {
	fn from(message: &EmailMessage) -> Self {
		Self {
			from: message.from.clone(),
			to: message.to.clone(),
			bcc: message.bcc.clone(),
			subject: message.subject.clone(),
			text: message.body.clone(),
			attachments: message
				.attachments
				.iter()
				.map(|document| WireAttachment {
					filename: document.filename.clone(),
					content_type: document.mime_type.clone(),
					content: STANDARD.encode(&document.content),
				})
				.collect(),
		}
	}
}
