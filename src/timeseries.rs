use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use num_traits::Float;

use chrono::NaiveDate;


pub trait TimeSeriesKey: Hash + Eq + Clone + std::fmt::Debug {}
impl<T: Hash + Eq + Clone + std::fmt::Debug> TimeSeriesKey for T {}


/// Values which have a designated marker for "no observation".
pub trait Gap: Copy {
	fn gap() -> Self;
	fn is_gap(&self) -> bool;
}

impl Gap for f64 {
	fn gap() -> Self {
		f64::NAN
	}

	fn is_gap(&self) -> bool {
		self.is_nan()
	}
}

impl Gap for Option<bool> {
	fn gap() -> Self {
		None
	}

	fn is_gap(&self) -> bool {
		self.is_none()
	}
}

// observation masks: absent unless set
impl Gap for bool {
	fn gap() -> Self {
		false
	}

	fn is_gap(&self) -> bool {
		!*self
	}
}


/// Sorted, deduplicated dates shared by every series of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateAxis {
	dates: Vec<NaiveDate>,
}

impl DateAxis {
	pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
		let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
		dates.sort_unstable();
		dates.dedup();
		Self{dates}
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.dates.len()
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.dates.is_empty()
	}

	pub fn dates(&self) -> &[NaiveDate] {
		&self.dates[..]
	}

	pub fn first(&self) -> Option<NaiveDate> {
		self.dates.first().copied()
	}

	pub fn last(&self) -> Option<NaiveDate> {
		self.dates.last().copied()
	}

	#[inline(always)]
	pub fn get(&self, i: usize) -> Option<NaiveDate> {
		self.dates.get(i).copied()
	}

	#[inline(always)]
	pub fn position(&self, date: NaiveDate) -> Option<usize> {
		self.dates.binary_search(&date).ok()
	}

	/// True if positions `from..=to` are consecutive calendar days. Because the
	/// axis is strictly increasing, checking the span suffices.
	pub fn is_daily(&self, from: usize, to: usize) -> bool {
		match (self.get(from), self.get(to)) {
			(Some(a), Some(b)) if from <= to => (b - a).num_days() == (to - from) as i64,
			_ => false,
		}
	}
}


/// One fixed-length row of values per key, all aligned to the same
/// [`DateAxis`]. Keys keep their insertion order.
#[derive(Debug, Clone)]
pub struct TimeSeries<K: TimeSeriesKey, V: Gap> {
	axis: Arc<DateAxis>,
	keys: Vec<K>,
	index: HashMap<K, usize>,
	time_series: Vec<Vec<V>>,
}

impl<K: TimeSeriesKey, V: Gap> TimeSeries<K, V> {
	pub fn new(axis: Arc<DateAxis>) -> Self {
		Self{
			axis,
			keys: Vec::new(),
			index: HashMap::new(),
			time_series: Vec::new(),
		}
	}

	#[inline(always)]
	pub fn axis(&self) -> &Arc<DateAxis> {
		&self.axis
	}

	/// Length of every row.
	#[inline(always)]
	pub fn len(&self) -> usize {
		self.axis.len()
	}

	#[inline(always)]
	pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
		self.axis.position(date)
	}

	#[inline(always)]
	pub fn index_date(&self, i: usize) -> Option<NaiveDate> {
		self.axis.get(i)
	}

	pub fn num_keys(&self) -> usize {
		self.keys.len()
	}

	pub fn keys(&self) -> std::slice::Iter<'_, K> {
		self.keys.iter()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> + '_ {
		self.keys.iter().zip(self.time_series.iter().map(|v| &v[..]))
	}

	pub fn get_or_create(&mut self, k: K) -> &mut [V] {
		let index = self.get_index_or_create(k);
		&mut self.time_series[index][..]
	}

	pub fn get_index_or_create(&mut self, k: K) -> usize {
		match self.index.get(&k) {
			Some(v) => *v,
			None => {
				let v = self.time_series.len();
				self.time_series.push(vec![V::gap(); self.axis.len()]);
				self.keys.push(k.clone());
				self.index.insert(k, v);
				v
			},
		}
	}

	pub fn get_index(&self, k: &K) -> Option<usize> {
		Some(*self.index.get(k)?)
	}

	pub fn get(&self, k: &K) -> Option<&[V]> {
		let index = self.get_index(k)?;
		Some(&self.time_series[index][..])
	}

	pub fn get_value(&self, k: &K, i: usize) -> Option<V> {
		self.get(k)?.get(i).copied()
	}

	/// Value at the final axis position.
	pub fn last_value(&self, k: &K) -> Option<V> {
		let i = self.len().checked_sub(1)?;
		self.get_value(k, i)
	}

	/// Build a new series with the same keys and axis, row by row.
	pub fn map_rows<U: Gap, F: Fn(&K, &[V], &mut [U])>(&self, f: F) -> TimeSeries<K, U> {
		let mut result = TimeSeries::<K, U>::new(self.axis.clone());
		for (k, src) in self.iter() {
			let dst = result.get_or_create(k.clone());
			f(k, src, dst);
		}
		result
	}
}

impl<K: TimeSeriesKey, V: Gap + Float> TimeSeries<K, V> {
	/// Replace each value by its difference to the value `offset` positions
	/// earlier. The first `offset` positions become gaps.
	pub fn diff(&mut self, offset: usize) {
		for vec in self.time_series.iter_mut() {
			for i in (0..vec.len()).rev() {
				vec[i] = if i >= offset {
					vec[i] - vec[i - offset]
				} else {
					V::gap()
				};
			}
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn day(d: u32) -> NaiveDate {
		NaiveDate::from_ymd(2021, 1, d)
	}

	#[test]
	fn axis_is_sorted_and_unique() {
		let axis = DateAxis::from_dates(vec![day(3), day(1), day(3), day(2)]);
		assert_eq!(axis.dates(), &[day(1), day(2), day(3)]);
		assert_eq!(axis.position(day(2)), Some(1));
		assert_eq!(axis.position(day(9)), None);
	}

	#[test]
	fn axis_detects_missing_days() {
		let axis = DateAxis::from_dates(vec![day(1), day(2), day(4), day(5)]);
		assert!(axis.is_daily(0, 1));
		assert!(axis.is_daily(2, 3));
		assert!(!axis.is_daily(0, 3));
		assert!(!axis.is_daily(3, 9));
	}

	#[test]
	fn new_rows_are_gap_filled() {
		let axis = Arc::new(DateAxis::from_dates(vec![day(1), day(2), day(3)]));
		let mut ts = TimeSeries::<&str, f64>::new(axis);
		ts.get_or_create("a")[1] = 4.0;
		let row = ts.get(&"a").unwrap();
		assert_eq!(row.len(), 3);
		assert!(row[0].is_nan());
		assert_eq!(row[1], 4.0);
		assert!(ts.last_value(&"a").unwrap().is_nan());
		assert_eq!(ts.get(&"b"), None);
	}

	#[test]
	fn keys_keep_insertion_order() {
		let axis = Arc::new(DateAxis::from_dates(vec![day(1)]));
		let mut ts = TimeSeries::<u32, Option<bool>>::new(axis);
		ts.get_or_create(7);
		ts.get_or_create(3);
		ts.get_or_create(7);
		assert_eq!(ts.keys().copied().collect::<Vec<_>>(), vec![7, 3]);
	}

	#[test]
	fn diff_gaps_the_leading_window() {
		let axis = Arc::new(DateAxis::from_dates((1..=5).map(day)));
		let mut ts = TimeSeries::<u32, f64>::new(axis);
		ts.get_or_create(1).copy_from_slice(&[1.0, 3.0, 6.0, 10.0, 15.0]);
		ts.diff(2);
		let row = ts.get(&1).unwrap();
		assert!(row[0].is_nan() && row[1].is_nan());
		assert_eq!(&row[2..], &[5.0, 7.0, 9.0]);
	}
}
