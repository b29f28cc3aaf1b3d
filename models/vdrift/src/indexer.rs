use std::{
	collections::HashMap,
	hash::Hash
};

use ultraviolet::vec::{
	Vec2,
	Vec3
};

use vdk_core::{
	dequantize,
	quantize
};

/// Decimal digits kept when comparing attribute values
pub const DIGITS: i32 = 5;

/// An attribute value that can be deduplicated by [`Indexer`]
pub trait Quantize: Copy {
	type Key: Eq + Hash;

	/// Returns the lookup key and the rounded value stored in its place
	fn quantize(&self) -> (Self::Key, Self);
}

impl Quantize for Vec2 {
	type Key = [i64; 2];

	fn quantize(&self) -> ([i64; 2], Vec2) {
		let key = [quantize(self.x, DIGITS), quantize(self.y, DIGITS)];

		(key, Vec2::new(dequantize(key[0], DIGITS), dequantize(key[1], DIGITS)))
	}
}

impl Quantize for Vec3 {
	type Key = [i64; 3];

	fn quantize(&self) -> ([i64; 3], Vec3) {
		let key = [quantize(self.x, DIGITS), quantize(self.y, DIGITS), quantize(self.z, DIGITS)];

		(key, Vec3::new(dequantize(key[0], DIGITS), dequantize(key[1], DIGITS),
			dequantize(key[2], DIGITS)))
	}
}

/// Assigns dense indices to attribute values in first-seen order.
///
/// Values that are equal after rounding to [`DIGITS`] decimals share an index, and the rounded value is
/// what ends up in [`Indexer::values`].
#[derive(Clone, Debug)]
pub struct Indexer<T>
where
	T: Quantize,
{
	map: HashMap<T::Key, usize>,
	list: Vec<T>,
}

impl<T> Indexer<T>
where
	T: Quantize,
{
	pub fn new() -> Indexer<T> {
		Indexer {
			map: HashMap::new(),
			list: vec![],
		}
	}

	/// Returns the index of `value`, allocating the next one if it hasn't been seen yet
	pub fn get(&mut self, value: T) -> usize {
		let (key, fixed) = value.quantize();
		let next = self.list.len();
		let index = *self.map.entry(key).or_insert(next);

		if index == next {
			self.list.push(fixed);
		}

		index
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	pub fn values(&self) -> &[T] {
		&self.list
	}

	pub fn into_values(self) -> Vec<T> {
		self.list
	}
}

impl<T> Default for Indexer<T>
where
	T: Quantize,
{
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use ultraviolet::vec::{
		Vec2,
		Vec3
	};

	use super::Indexer;

	#[test]
	fn test_first_seen_order() {
		let mut idx = Indexer::new();
		assert_eq!(idx.get(Vec3::new(1.0, 0.0, 0.0)), 0);
		assert_eq!(idx.get(Vec3::new(0.0, 1.0, 0.0)), 1);
		assert_eq!(idx.get(Vec3::new(1.0, 0.0, 0.0)), 0);
		assert_eq!(idx.get(Vec3::new(0.0, 0.0, 1.0)), 2);
		assert_eq!(idx.len(), 3);
	}

	#[test]
	fn test_rounding_merges() {
		let mut idx = Indexer::new();
		let a = idx.get(Vec2::new(0.123451, 0.5));
		let b = idx.get(Vec2::new(0.1234549, 0.5000001));
		let c = idx.get(Vec2::new(0.12347, 0.5));
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(idx.values()[0], Vec2::new(0.12345, 0.5));
	}

	#[test]
	fn test_signed_zero() {
		let mut idx = Indexer::new();
		assert_eq!(idx.get(Vec3::new(0.0, -0.0, 0.0)), idx.get(Vec3::new(-0.000001, 0.0, 0.0)));
	}
}
