use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub type StateCode = u32;
pub type CountyCode = u32;


/// County FIPS code, always rendered as five zero-padded digits.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fips(u32);

impl Fips {
	pub const MAX: u32 = 99_999;

	pub fn new(code: u32) -> Option<Self> {
		if code > Self::MAX {
			return None
		}
		Some(Self(code))
	}

	pub fn code(&self) -> u32 {
		self.0
	}

	/// The two leading digits.
	pub fn state(&self) -> StateCode {
		self.0 / 1000
	}

	/// The three trailing digits.
	pub fn county(&self) -> CountyCode {
		self.0 % 1000
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFipsError {
	Empty,
	TooLong,
	NotNumeric,
}

impl fmt::Display for ParseFipsError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Empty => f.write_str("empty FIPS code"),
			Self::TooLong => f.write_str("FIPS code longer than five digits"),
			Self::NotNumeric => f.write_str("FIPS code is not numeric"),
		}
	}
}

impl std::error::Error for ParseFipsError {}

impl FromStr for Fips {
	type Err = ParseFipsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		// float-typed exports write 1001.0
		let s = match s.split_once('.') {
			Some((int, frac)) if frac.bytes().all(|b| b == b'0') => int,
			Some(_) => return Err(ParseFipsError::NotNumeric),
			None => s,
		};
		if s.is_empty() {
			return Err(ParseFipsError::Empty)
		}
		if !s.bytes().all(|b| b.is_ascii_digit()) {
			return Err(ParseFipsError::NotNumeric)
		}
		let digits = s.trim_start_matches('0');
		if digits.len() > 5 {
			return Err(ParseFipsError::TooLong)
		}
		if digits.is_empty() {
			return Ok(Self(0))
		}
		// cannot fail: at most five ascii digits
		Ok(Self(digits.parse::<u32>().map_err(|_| ParseFipsError::NotNumeric)?))
	}
}

impl fmt::Display for Fips {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:05}", self.0)
	}
}

impl<'de> Deserialize<'de> for Fips {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where D: Deserializer<'de>
	{
		let s = String::deserialize(deserializer)?;
		FromStr::from_str(&s).map_err(de::Error::custom)
	}
}

impl Serialize for Fips {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where S: Serializer
	{
		serializer.collect_str(self)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pads_to_five_digits() {
		let fips: Fips = "1001".parse().unwrap();
		assert_eq!(fips.to_string(), "01001");
		assert_eq!(fips.state(), 1);
		assert_eq!(fips.county(), 1);
	}

	#[test]
	fn accepts_float_rendering() {
		assert_eq!("53033.0".parse::<Fips>().unwrap(), Fips(53033));
		assert_eq!("06037.00".parse::<Fips>().unwrap().to_string(), "06037");
	}

	#[test]
	fn rejects_garbage() {
		assert_eq!("".parse::<Fips>(), Err(ParseFipsError::Empty));
		assert_eq!("12a45".parse::<Fips>(), Err(ParseFipsError::NotNumeric));
		assert_eq!("1001.5".parse::<Fips>(), Err(ParseFipsError::NotNumeric));
		assert_eq!("123456".parse::<Fips>(), Err(ParseFipsError::TooLong));
	}

	#[test]
	fn serde_uses_padded_string() {
		let fips = Fips::new(1001).unwrap();
		assert_eq!(serde_json::to_string(&fips).unwrap(), "\"01001\"");
		let back: Fips = serde_json::from_str("\"01001\"").unwrap();
		assert_eq!(back, fips);
	}
}
