// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use derive_more::{Display, TryFrom};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

use crate::{schema::ParamType, strings::StringRef};

/// The 8-bit tag of an on-disk param
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, TryFrom, Sequence, Serialize, Deserialize)]
#[try_from(repr)]
pub enum ValueReferenceType {
	Direct = 0,
	String = 1,
	Curve = 2,
	Random = 3,
	ArrangeParam = 4,
	Bitfield = 5,
	RandomPowHalf2 = 6,
	RandomPowHalf3 = 7,
	RandomPowHalf4 = 8,
	RandomPowHalf1Point5 = 9,
	RandomPow2 = 10,
	RandomPow3 = 11,
	RandomPow4 = 12,
	RandomPow1Point5 = 13,
	RandomPowComplement2 = 14,
	RandomPowComplement3 = 15,
	RandomPowComplement4 = 16,
	RandomPowComplement1Point5 = 17,
}

/// Distribution used when drawing from a random range
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, Sequence, Serialize, Deserialize)]
pub enum RandomKind {
	Uniform,
	PowHalf2,
	PowHalf3,
	PowHalf4,
	PowHalf1Point5,
	Pow2,
	Pow3,
	Pow4,
	Pow1Point5,
	PowComplement2,
	PowComplement3,
	PowComplement4,
	PowComplement1Point5,
}

impl RandomKind {
	pub fn reference_type(self) -> ValueReferenceType {
		use ValueReferenceType as T;
		match self {
			RandomKind::Uniform => T::Random,
			RandomKind::PowHalf2 => T::RandomPowHalf2,
			RandomKind::PowHalf3 => T::RandomPowHalf3,
			RandomKind::PowHalf4 => T::RandomPowHalf4,
			RandomKind::PowHalf1Point5 => T::RandomPowHalf1Point5,
			RandomKind::Pow2 => T::RandomPow2,
			RandomKind::Pow3 => T::RandomPow3,
			RandomKind::Pow4 => T::RandomPow4,
			RandomKind::Pow1Point5 => T::RandomPow1Point5,
			RandomKind::PowComplement2 => T::RandomPowComplement2,
			RandomKind::PowComplement3 => T::RandomPowComplement3,
			RandomKind::PowComplement4 => T::RandomPowComplement4,
			RandomKind::PowComplement1Point5 => T::RandomPowComplement1Point5,
		}
	}

	pub fn from_reference_type(reference_type: ValueReferenceType) -> Option<Self> {
		enum_iterator::all::<RandomKind>().find(|kind| kind.reference_type() == reference_type)
	}
}

/// A resolved param value. Indices refer into the tables of the owning resource.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ParamValue {
	Direct(usize),
	String(StringRef),
	Curve(usize),
	Random(RandomKind, usize),
	ArrangeParam(usize),
	/// 24-bit immediate
	Bitfield(u32),
}

impl ParamValue {
	pub fn reference_type(&self) -> ValueReferenceType {
		match self {
			ParamValue::Direct(_) => ValueReferenceType::Direct,
			ParamValue::String(_) => ValueReferenceType::String,
			ParamValue::Curve(_) => ValueReferenceType::Curve,
			ParamValue::Random(kind, _) => kind.reference_type(),
			ParamValue::ArrangeParam(_) => ValueReferenceType::ArrangeParam,
			ParamValue::Bitfield(_) => ValueReferenceType::Bitfield,
		}
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Param {
	/// Index of the define this param fills
	pub slot: usize,
	pub value: ParamValue,
}

/// Sparse set of params, stored on disk as a presence mask followed by the present values
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
	pub params: Vec<Param>,
}

impl ParamSet {
	pub fn new(params: impl IntoIterator<Item = Param>) -> Self {
		Self {
			params: params.into_iter().collect(),
		}
	}

	pub fn get(&self, slot: usize) -> Option<&Param> {
		self.params.iter().find(|param| param.slot == slot)
	}

	pub fn len(&self) -> usize {
		self.params.len()
	}

	pub fn is_empty(&self) -> bool {
		self.params.is_empty()
	}

	/// Params in the order they are stored
	pub fn sorted(&self) -> Vec<&Param> {
		let mut sorted = self.params.iter().collect::<Vec<_>>();
		sorted.sort_by_key(|param| param.slot);
		sorted
	}

	/// Presence mask with one bit per slot, `None` if a slot does not fit in `bits`
	pub fn mask(&self, bits: u32) -> Option<u64> {
		self.params.iter().try_fold(0u64, |mask, param| {
			(param.slot < bits as usize).then(|| mask | 1 << param.slot)
		})
	}
}

/// A cell of the direct value table, typed by the first define that refers to it
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DirectValue {
	Int(i32),
	Float(f32),
	Bool(bool),
	Enum(u32),
	Bitfield(u32),
	/// never referenced, or referenced through a string define
	Untyped(u32),
}

impl DirectValue {
	pub fn from_raw(param_type: Option<ParamType>, raw: u32) -> Self {
		match param_type {
			Some(ParamType::Int) => DirectValue::Int(raw as i32),
			Some(ParamType::Float) => DirectValue::Float(f32::from_bits(raw)),
			Some(ParamType::Bool) if raw <= 1 => DirectValue::Bool(raw != 0),
			Some(ParamType::Enum) => DirectValue::Enum(raw),
			Some(ParamType::Bitfield) => DirectValue::Bitfield(raw),
			_ => DirectValue::Untyped(raw),
		}
	}

	pub fn raw(&self) -> u32 {
		match *self {
			DirectValue::Int(value) => value as u32,
			DirectValue::Float(value) => value.to_bits(),
			DirectValue::Bool(value) => value as u32,
			DirectValue::Enum(value) | DirectValue::Bitfield(value) | DirectValue::Untyped(value) => value,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn random_kinds_map_to_tags() {
		assert_eq!(enum_iterator::cardinality::<RandomKind>(), 13);
		for kind in enum_iterator::all::<RandomKind>() {
			assert_eq!(RandomKind::from_reference_type(kind.reference_type()), Some(kind));
		}
		assert_eq!(RandomKind::from_reference_type(ValueReferenceType::Curve), None);
		assert_eq!(
			ParamValue::Random(RandomKind::PowComplement1Point5, 0).reference_type() as u8,
			17
		);
	}

	#[test]
	fn mask_from_slots() {
		let set = ParamSet::new([
			Param {
				slot: 3,
				value: ParamValue::Bitfield(1),
			},
			Param {
				slot: 1,
				value: ParamValue::Direct(0),
			},
		]);
		assert_eq!(set.mask(64), Some(0b1010));
		assert_eq!(set.mask(3), None);
		assert_eq!(set.sorted()[0].slot, 1);
	}

	#[test]
	fn direct_values_keep_their_bits() {
		assert_eq!(DirectValue::from_raw(Some(ParamType::Int), u32::MAX), DirectValue::Int(-1));
		assert_eq!(DirectValue::from_raw(Some(ParamType::Bool), 1), DirectValue::Bool(true));
		assert_eq!(DirectValue::from_raw(Some(ParamType::Bool), 7), DirectValue::Untyped(7));
		assert_eq!(DirectValue::from_raw(None, 9).raw(), 9);
		assert_eq!(DirectValue::Float(1.5).raw(), 1.5f32.to_bits());
	}
}
