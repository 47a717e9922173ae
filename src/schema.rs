use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::str::FromStr;

use chrono::NaiveDate;

use smartstring::alias::{String as SmartString};

use super::error::{Error, Result, SchemaMismatch};
use super::table::Value;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
	Text,
	Float,
	Int,
	Flag,
	Date,
}

impl ColumnType {
	/// Map a pandas-style dtype tag onto a column type.
	pub fn from_tag(tag: &str) -> Option<Self> {
		match tag {
			"object" | "string" | "str" => Some(Self::Text),
			"float64" | "float32" | "Float64" | "Float32" => Some(Self::Float),
			"int64" | "int32" | "Int64" | "Int32" => Some(Self::Int),
			"bool" | "boolean" => Some(Self::Flag),
			"datetime64[ns]" | "datetime64" => Some(Self::Date),
			_ => None,
		}
	}

	pub fn is_numeric(&self) -> bool {
		match self {
			Self::Float | Self::Int => true,
			_ => false,
		}
	}

	/// Parse one raw CSV cell. `None` means the text does not fit the type.
	pub fn parse(&self, raw: &str) -> Option<Value> {
		if is_missing(raw) {
			return Some(Value::Missing)
		}
		match self {
			Self::Text => Some(Value::Text(raw.into())),
			Self::Float => {
				let v = raw.trim().parse::<f64>().ok()?;
				if v.is_nan() {
					Some(Value::Missing)
				} else {
					Some(Value::Float(v))
				}
			},
			Self::Int => match raw.trim().parse::<i64>() {
				Ok(v) => Some(Value::Int(v)),
				// nullable integer columns round-trip through floats
				Err(_) => {
					let v = raw.trim().parse::<f64>().ok()?;
					// i64::MAX as f64 rounds up to 2^63, which is out of range
					if v.fract() != 0.0 || !(v >= i64::MIN as f64 && v < i64::MAX as f64) {
						return None
					}
					Some(Value::Int(v as i64))
				},
			},
			Self::Flag => match raw.trim() {
				"True" | "true" | "TRUE" | "1" | "1.0" => Some(Value::Flag(true)),
				"False" | "false" | "FALSE" | "0" | "0.0" => Some(Value::Flag(false)),
				_ => None,
			},
			Self::Date => parse_date(raw).map(Value::Date),
		}
	}
}

impl fmt::Display for ColumnType {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Self::Text => "text",
			Self::Float => "float",
			Self::Int => "int",
			Self::Flag => "flag",
			Self::Date => "date",
		})
	}
}

fn is_missing(raw: &str) -> bool {
	match raw.trim() {
		"" | "nan" | "NaN" | "NA" | "<NA>" | "NaT" => true,
		_ => false,
	}
}

/// Accepts plain ISO dates as well as full timestamps, of which only the date
/// part is kept.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
	let s = s.trim();
	if s.len() == 10 {
		NaiveDate::from_str(&s.replace("/", "-")).ok()
	} else if s.len() >= 19 {
		NaiveDate::from_str(&s.get(..10)?.replace("/", "-")).ok()
	} else {
		None
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
	pub name: SmartString,
	pub kind: ColumnType,
}

impl Column {
	pub fn new<S: Into<SmartString>>(name: S, kind: ColumnType) -> Self {
		Self{name: name.into(), kind}
	}
}


/// The column-name to type-tag mapping from the metadata sidecar.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
	tags: HashMap<SmartString, SmartString>,
}

impl TypeMap {
	pub fn from_reader<R: io::Read>(r: R) -> Result<Self> {
		let raw: HashMap<String, String> = serde_json::from_reader(r)?;
		Ok(raw.into_iter().collect())
	}

	pub fn tag(&self, column: &str) -> Option<&str> {
		self.tags.get(column).map(|t| t.as_str())
	}

	/// Force a column to text, so that it can be parsed separately.
	pub fn override_text(&mut self, column: &str) {
		if let Some(tag) = self.tags.get_mut(column) {
			*tag = "object".into();
		}
	}

	pub fn len(&self) -> usize {
		self.tags.len()
	}

	/// Resolve the CSV header against the metadata. Every header column must be
	/// typed and every typed column must be present.
	pub fn resolve<'x, I: IntoIterator<Item = &'x str>>(&self, header: I) -> Result<Vec<Column>> {
		let mut seen = HashSet::new();
		let mut columns = Vec::new();
		for name in header {
			if !seen.insert(name) {
				return Err(SchemaMismatch::DuplicateColumn(name.into()).into())
			}
			let tag = match self.tag(name) {
				Some(tag) => tag,
				None => return Err(SchemaMismatch::UntypedColumn(name.into()).into()),
			};
			let kind = match ColumnType::from_tag(tag) {
				Some(kind) => kind,
				None => return Err(SchemaMismatch::UnknownTypeTag{
					column: name.into(),
					tag: tag.into(),
				}.into()),
			};
			columns.push(Column::new(name, kind));
		}
		let mut missing: Vec<&SmartString> = self.tags.keys().filter(|k| !seen.contains(k.as_str())).collect();
		missing.sort();
		if let Some(name) = missing.first() {
			return Err(SchemaMismatch::MissingColumn((*name).clone()).into())
		}
		Ok(columns)
	}
}

impl<K: Into<SmartString>, V: Into<SmartString>> std::iter::FromIterator<(K, V)> for TypeMap {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self{
			tags: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}


pub fn parse_error(column: &str, line: u64, value: &str) -> Error {
	Error::Parse{
		column: column.into(),
		line,
		value: value.into(),
	}
}
