//! Argument extraction for flat `key value...` nodes.

use kdl::{KdlNode, KdlValue};

use crate::error::{ConfigError, Result};

fn positional(node: &KdlNode) -> Result<Vec<&KdlValue>> {
	let key = node.name().value();
	node.entries()
		.iter()
		.map(|entry| match entry.name() {
			Some(prop) => Err(ConfigError::invalid(key, format!("unexpected property `{}`", prop.value()))),
			None => Ok(entry.value()),
		})
		.collect()
}

fn single(node: &KdlNode) -> Result<&KdlValue> {
	let key = node.name().value();
	match positional(node)?.as_slice() {
		[value] => Ok(*value),
		values => Err(ConfigError::invalid(key, format!("expected one value, got {}", values.len()))),
	}
}

/// All positional arguments as strings.
pub(crate) fn string_args(node: &KdlNode) -> Result<Vec<String>> {
	let key = node.name().value();
	positional(node)?
		.into_iter()
		.map(|v| {
			v.as_string()
				.map(String::from)
				.ok_or_else(|| ConfigError::invalid(key, format!("expected string, got {v}")))
		})
		.collect()
}

pub(crate) fn string_arg(node: &KdlNode) -> Result<String> {
	let value = single(node)?;
	value
		.as_string()
		.map(String::from)
		.ok_or_else(|| ConfigError::invalid(node.name().value(), format!("expected string, got {value}")))
}

pub(crate) fn bool_arg(node: &KdlNode) -> Result<bool> {
	let value = single(node)?;
	value
		.as_bool()
		.ok_or_else(|| ConfigError::invalid(node.name().value(), format!("expected #true or #false, got {value}")))
}

pub(crate) fn u64_arg(node: &KdlNode) -> Result<u64> {
	let key = node.name().value();
	let value = single(node)?;
	let int = value
		.as_integer()
		.ok_or_else(|| ConfigError::invalid(key, format!("expected integer, got {value}")))?;
	u64::try_from(int).map_err(|_| ConfigError::invalid(key, format!("{int} is out of range")))
}
