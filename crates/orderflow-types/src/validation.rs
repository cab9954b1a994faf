//! Validation of backend configuration tables.
//!
//! Every storage, document, email and auth backend describes the TOML table it
//! accepts as a [`Schema`]. The builder validates the table before calling the
//! backend's factory, so factories can assume well-typed input.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	/// Qualifies the field name with the table it was found in.
	fn nested_in(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", parent, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
			other => other,
		}
	}
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	Array(Box<FieldType>),
	Table(Schema),
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
			FieldType::Array(_) => "array",
			FieldType::Table(_) => "table",
		}
	}
}

/// Extra check run after the type check; returns a message on failure.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks presence of required fields, then types and custom validators of
	/// every present field. Nested tables are validated recursively.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config.as_table().ok_or_else(|| mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn check_type(
	field: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	match expected {
		FieldType::String if value.is_str() => Ok(()),
		FieldType::Boolean if value.is_bool() => Ok(()),
		FieldType::Integer { min, max } => {
			let n = value
				.as_integer()
				.ok_or_else(|| mismatch(field, expected.name(), value))?;
			if let Some(min) = min.filter(|min| n < *min) {
				return Err(ValidationError::InvalidValue {
					field: field.to_string(),
					message: format!("Value {} is less than minimum {}", n, min),
				});
			}
			if let Some(max) = max.filter(|max| n > *max) {
				return Err(ValidationError::InvalidValue {
					field: field.to_string(),
					message: format!("Value {} is greater than maximum {}", n, max),
				});
			}
			Ok(())
		},
		FieldType::Array(inner) => {
			let items = value
				.as_array()
				.ok_or_else(|| mismatch(field, expected.name(), value))?;
			items.iter().enumerate().try_for_each(|(i, item)| {
				check_type(&format!("{}[{}]", field, i), item, inner)
			})
		},
		FieldType::Table(schema) => schema.validate(value).map_err(|e| e.nested_in(field)),
		_ => Err(mismatch(field, expected.name(), value)),
	}
}

/// Implemented by each backend to describe its configuration table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(src: &str) -> toml::Value {
		toml::from_str(src).unwrap()
	}

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("directory", FieldType::String)],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(600),
					},
				),
				Field::new("bcc", FieldType::Array(Box::new(FieldType::String))),
				Field::new("endpoint", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(s) if s.starts_with("http") => Ok(()),
						_ => Err("must be an http(s) URL".to_string()),
					}
				}),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config = parse(
			r#"
			directory = "/tmp/out"
			timeout_seconds = 30
			bcc = ["office@example.com"]
			endpoint = "https://mail.example.com"
			"#,
		);
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let err = schema().validate(&parse("timeout_seconds = 3")).unwrap_err();
		assert_eq!(err, ValidationError::MissingField("directory".to_string()));
	}

	#[test]
	fn test_integer_bounds() {
		let err = schema()
			.validate(&parse("directory = \"x\"\ntimeout_seconds = 0"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "timeout_seconds"));
	}

	#[test]
	fn test_array_element_type() {
		let err = schema()
			.validate(&parse("directory = \"x\"\nbcc = [\"a\", 3]"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "bcc[1]"));
	}

	#[test]
	fn test_custom_validator() {
		let err = schema()
			.validate(&parse("directory = \"x\"\nendpoint = \"ftp://x\""))
			.unwrap_err();
		assert!(err.to_string().contains("http(s) URL"));
	}

	#[test]
	fn test_nested_table_errors_are_qualified() {
		let outer = Schema::new(
			vec![Field::new(
				"templates",
				FieldType::Table(Schema::new(
					vec![Field::new("manual", FieldType::String)],
					vec![],
				)),
			)],
			vec![],
		);
		let err = outer.validate(&parse("[templates]\ncontract = \"c\"")).unwrap_err();
		assert_eq!(
			err,
			ValidationError::MissingField("templates.manual".to_string())
		);
	}
}
