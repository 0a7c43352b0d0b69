// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Resource to model.
//!
//! Tables are walked in file order. Offsets into tables that have already been walked are resolved
//! on the spot; params are first read as [`RawParam`]s and only resolved once the arrange group
//! region, which lives after the users, has been read.

mod user;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, trace};

use crate::{
	accessor::ResourceAccessor,
	error::{Error, Result},
	model::{
		ArrangeGroupParam, ArrangeGroupParams, BlendCondition, Condition, ConditionValue, Curve, CurvePoint,
		DirectValue, Param, ParamSet, ParamValue, RandomCondition, RandomKind, RandomRange, Resource,
		SequenceCondition, SwitchCondition, User, ValueReferenceType,
	},
	profile::Profile,
	res::{
		condition::{
			BlendType, CompareType, PropertyType, ResBlendCondition, ResRandomCondition, ResSequenceCondition,
			ResSwitchCondition, CONDITION_TAG_SIZE,
		},
		container::ContainerType,
		ResParam,
	},
	schema::{ParamCategory, ParamSchema, ParamType},
	strings::{StringPool, StringRef},
};

/// A param as stored on disk, before its payload is resolved
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RawParam {
	pub slot: usize,
	pub reference_type: ValueReferenceType,
	pub value: u32,
}

impl RawParam {
	fn from_res(slot: usize, param: ResParam) -> Result<Self> {
		let tag = param.reference_type();
		Ok(Self {
			slot,
			reference_type: ValueReferenceType::try_from(tag).map_err(|_| Error::InvalidTag {
				kind: "value reference type",
				value: tag as u32,
			})?,
			value: param.value(),
		})
	}
}

/// Decodes a resource buffer of the given profile into its model
pub fn decode(data: &[u8], profile: Profile) -> Result<Resource> {
	let accessor = ResourceAccessor::load(data, profile)?;
	Decoder::new(accessor)?.decode()
}

pub(crate) struct Decoder<'a> {
	accessor: ResourceAccessor<'a>,
	profile: Profile,
	schema: ParamSchema,
	strings: StringPool,
	string_offsets: HashMap<u64, StringRef>,
	asset_param_offsets: HashMap<u64, usize>,
	trigger_param_offsets: HashMap<u64, usize>,
	condition_offsets: HashMap<u64, usize>,
	arrange_offsets: BTreeSet<u64>,
}

impl<'a> Decoder<'a> {
	fn new(accessor: ResourceAccessor<'a>) -> Result<Self> {
		let schema = ParamSchema::initialize(&accessor)?;
		let mut strings = StringPool::new();
		let string_offsets = strings.intern_table(accessor.name_table(), accessor.name_table_pos())?;
		trace!(strings = strings.len(), "interned name table");
		Ok(Self {
			profile: accessor.profile(),
			accessor,
			schema,
			strings,
			string_offsets,
			asset_param_offsets: HashMap::new(),
			trigger_param_offsets: HashMap::new(),
			condition_offsets: HashMap::new(),
			arrange_offsets: BTreeSet::new(),
		})
	}

	fn decode(mut self) -> Result<Resource> {
		let header = self.accessor.header().clone();

		let local_property_names = (0..header.num_local_property_name_refs as usize)
			.map(|i| {
				let offset = self.accessor.local_property_name_offset(i).ok_or(Error::OutOfBounds {
					table: "local property name",
					index: i as u64,
					count: header.num_local_property_name_refs as u64,
				})?;
				self.string(offset)
			})
			.collect::<Result<Vec<_>>>()?;
		let local_property_enum_names = (0..header.num_local_property_enum_name_refs as usize)
			.map(|i| {
				let offset = self.accessor.local_property_enum_name_offset(i).ok_or(Error::OutOfBounds {
					table: "local property enum name",
					index: i as u64,
					count: header.num_local_property_enum_name_refs as u64,
				})?;
				self.string(offset)
			})
			.collect::<Result<Vec<_>>>()?;

		let curves = (0..header.num_curves as usize)
			.map(|i| self.curve(i))
			.collect::<Result<Vec<_>>>()?;
		let random_calls = (0..header.num_random as usize)
			.map(|i| {
				let random = self.accessor.random_call(i).ok_or(Error::OutOfBounds {
					table: "random",
					index: i as u64,
					count: header.num_random as u64,
				})?;
				Ok(RandomRange {
					min: random.min,
					max: random.max,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		let raw_direct_values = (0..header.num_direct_values as usize)
			.map(|i| {
				self.accessor.direct_value(i).ok_or(Error::OutOfBounds {
					table: "direct value",
					index: i as u64,
					count: header.num_direct_values as u64,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		let raw_asset_params = self.asset_params(header.num_asset_params as usize)?;
		let raw_trigger_params = self.trigger_overwrite_params(header.num_trigger_overwrite_params as usize)?;
		let conditions = self.conditions()?;

		let mut users = BTreeMap::new();
		let mut raw_user_params = vec![];
		for index in 0..header.num_users as usize {
			let hash = self.accessor.user_hash(index).ok_or(Error::OutOfBounds {
				table: "user",
				index: index as u64,
				count: header.num_users as u64,
			})?;
			let (user, params) = self.user(index)?;
			debug!(
				hash = format_args!("{hash:#010x}"),
				calls = user.asset_calls.len(),
				containers = user.containers.len(),
				"decoded user"
			);
			users.insert(hash, user);
			raw_user_params.push((hash, params));
		}

		let (arrange_group_params, arrange_indices) = self.arrange_group_params()?;

		// final pass: resolve the provisional params now that every table is known
		let mut resolver = ParamResolver {
			schema: &self.schema,
			string_offsets: &self.string_offsets,
			arrange_indices: &arrange_indices,
			direct_types: vec![None; raw_direct_values.len()],
			num_curves: curves.len(),
			num_random: random_calls.len(),
		};
		let asset_params = raw_asset_params
			.iter()
			.map(|params| resolver.resolve_set(ParamCategory::Asset, params))
			.collect::<Result<Vec<_>>>()?;
		let trigger_overwrite_params = raw_trigger_params
			.iter()
			.map(|params| resolver.resolve_set(ParamCategory::Trigger, params))
			.collect::<Result<Vec<_>>>()?;
		for (hash, params) in raw_user_params {
			let values = params
				.iter()
				.map(|param| resolver.resolve(ParamCategory::User, param))
				.collect::<Result<Vec<_>>>()?;
			if let Some(user) = users.get_mut(&hash) {
				user.params = values;
			}
		}

		let direct_values = raw_direct_values
			.into_iter()
			.zip(resolver.direct_types)
			.map(|(raw, param_type)| DirectValue::from_raw(param_type, raw))
			.collect();

		Ok(Resource {
			version: header.version,
			schema: self.schema,
			strings: self.strings,
			local_property_names,
			local_property_enum_names,
			direct_values,
			random_calls,
			curves,
			asset_params,
			trigger_overwrite_params,
			arrange_group_params,
			conditions,
			users,
		})
	}

	fn string(&self, offset: u64) -> Result<StringRef> {
		self.string_offsets
			.get(&offset)
			.copied()
			.ok_or(Error::UnresolvedOffset {
				table: "name table",
				offset,
			})
	}

	fn curve(&self, index: usize) -> Result<Curve> {
		let res = self.accessor.curve(index).ok_or(Error::OutOfBounds {
			table: "curve",
			index: index as u64,
			count: self.accessor.header().num_curves as u64,
		})?;
		let points = (0..res.point_count as usize)
			.map(|i| {
				let index = res.point_base_index as usize + i;
				let point = self.accessor.curve_point(index).ok_or(Error::OutOfBounds {
					table: "curve point",
					index: index as u64,
					count: self.accessor.header().num_curve_points as u64,
				})?;
				Ok(CurvePoint {
					x: point.x,
					y: point.y,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(Curve {
			property_name: self.string(res.property_name_offset.0)?,
			property_index: res.property_index,
			curve_type: res.curve_type,
			is_global: res.is_global != 0,
			unknown: res.unknown,
			unknown2: res.unknown2,
			points,
		})
	}

	/// Expands a presence mask into params, one per set bit in ascending order
	fn expand_mask(&mut self, category: ParamCategory, mask: u64, values: &[ResParam]) -> Result<Vec<RawParam>> {
		let count = self.schema.count(category);
		let mut params = Vec::with_capacity(values.len());
		let mut remaining = mask;
		for value in values {
			let slot = remaining.trailing_zeros() as usize;
			if slot >= count {
				return Err(Error::UnknownParam { category, slot, count });
			}
			remaining &= remaining - 1;
			let param = RawParam::from_res(slot, *value)?;
			if param.reference_type == ValueReferenceType::ArrangeParam {
				self.arrange_offsets.insert(param.value as u64);
			}
			params.push(param);
		}
		Ok(params)
	}

	fn asset_params(&mut self, count: usize) -> Result<Vec<Vec<RawParam>>> {
		let mut offset = 0;
		let mut sets = Vec::with_capacity(count);
		for index in 0..count {
			let res = self.accessor.asset_param(offset).ok_or(Error::UnresolvedOffset {
				table: "asset param",
				offset,
			})?;
			sets.push(self.expand_mask(ParamCategory::Asset, res.mask, &res.params)?);
			self.asset_param_offsets.insert(offset, index);
			offset += res.size();
		}
		trace!(sets = count, size = offset, "read asset params");
		Ok(sets)
	}

	fn trigger_overwrite_params(&mut self, count: usize) -> Result<Vec<Vec<RawParam>>> {
		let mut offset = 0;
		let mut sets = Vec::with_capacity(count);
		for index in 0..count {
			let res = self.accessor.trigger_overwrite_param(offset).ok_or(Error::UnresolvedOffset {
				table: "trigger overwrite param",
				offset,
			})?;
			sets.push(self.expand_mask(ParamCategory::Trigger, res.mask as u64, &res.params)?);
			self.trigger_param_offsets.insert(offset, index);
			offset += res.size();
		}
		trace!(sets = count, size = offset, "read trigger overwrite params");
		Ok(sets)
	}

	fn conditions(&mut self) -> Result<Vec<Condition>> {
		let base = self.accessor.condition_table_pos();
		let end = self.accessor.name_table_pos();
		let mut conditions = vec![];
		let mut offset = 0;
		while base + offset < end {
			let pos = base + offset;
			let tag = self.accessor.read_at::<u32>(pos, ())?;
			let container_type = ContainerType::try_from(tag)
				.ok()
				.filter(|kind| kind.is_supported(self.profile))
				.ok_or(Error::InvalidTag {
					kind: "condition",
					value: tag,
				})?;
			let payload = pos + CONDITION_TAG_SIZE;
			let (condition, size) = match container_type {
				ContainerType::Switch => {
					let res = self.accessor.read_at::<ResSwitchCondition>(payload, self.profile)?;
					let condition = self.switch_condition(&res)?;
					let size = ResSwitchCondition::size(self.profile, condition.property_type == PropertyType::Enum);
					(Condition::Switch(condition), size)
				}
				ContainerType::Random | ContainerType::Random2 => {
					let res = self.accessor.read_at::<ResRandomCondition>(payload, ())?;
					let condition = RandomCondition { weight: res.weight };
					let condition = if container_type == ContainerType::Random {
						Condition::Random(condition)
					} else {
						Condition::Random2(condition)
					};
					(condition, CONDITION_TAG_SIZE + 4)
				}
				ContainerType::Blend => {
					let res = self.accessor.read_at::<ResBlendCondition>(payload, ())?;
					let blend_type = |value: u8| {
						BlendType::try_from(value).map_err(|_| Error::InvalidTag {
							kind: "blend type",
							value: value as u32,
						})
					};
					let condition = BlendCondition {
						min: res.min,
						max: res.max,
						blend_type_to_max: blend_type(res.blend_type_to_max)?,
						blend_type_to_min: blend_type(res.blend_type_to_min)?,
					};
					(Condition::Blend(condition), CONDITION_TAG_SIZE + 12)
				}
				ContainerType::Sequence => {
					let res = self.accessor.read_at::<ResSequenceCondition>(payload, ())?;
					let condition = SequenceCondition {
						continue_on_fade: res.continue_on_fade,
					};
					(Condition::Sequence(condition), CONDITION_TAG_SIZE + 4)
				}
				ContainerType::Grid => (Condition::Grid, CONDITION_TAG_SIZE),
				ContainerType::Jump => (Condition::Jump, CONDITION_TAG_SIZE),
			};
			self.condition_offsets.insert(offset, conditions.len());
			conditions.push(condition);
			offset += size;
		}
		trace!(conditions = conditions.len(), "read condition table");
		Ok(conditions)
	}

	fn switch_condition(&self, res: &ResSwitchCondition) -> Result<SwitchCondition> {
		let property_type = PropertyType::try_from(res.property_type).map_err(|_| Error::InvalidTag {
			kind: "property type",
			value: res.property_type,
		})?;
		let compare_type = CompareType::try_from(res.compare_type).map_err(|_| Error::InvalidTag {
			kind: "compare type",
			value: res.compare_type,
		})?;
		let (value, enum_name) = match (property_type, res.enum_name_offset) {
			(PropertyType::Enum, Some(offset)) => (
				ConditionValue::from_raw(property_type, res.value),
				Some(self.string(offset.0)?),
			),
			// the enum name offset takes the place of the value
			(PropertyType::Enum, None) => (ConditionValue::Int(0), Some(self.string(res.value as u64)?)),
			_ => (ConditionValue::from_raw(property_type, res.value), None),
		};
		Ok(SwitchCondition {
			property_type,
			compare_type,
			is_global: res.is_global,
			action_hash: res.action_hash,
			value,
			enum_name,
		})
	}

	fn condition_index(&self, offset: u64) -> Result<Option<usize>> {
		if crate::res::is_null_offset(offset) {
			return Ok(None);
		}
		self.condition_offsets
			.get(&offset)
			.copied()
			.map(Some)
			.ok_or(Error::UnresolvedOffset {
				table: "condition",
				offset,
			})
	}

	fn trigger_overwrite_index(&self, offset: u64) -> Result<Option<usize>> {
		if crate::res::is_null_offset(offset) {
			return Ok(None);
		}
		self.trigger_param_offsets
			.get(&offset)
			.copied()
			.map(Some)
			.ok_or(Error::UnresolvedOffset {
				table: "trigger overwrite param",
				offset,
			})
	}

	fn arrange_group_params(&self) -> Result<(Vec<ArrangeGroupParams>, HashMap<u64, usize>)> {
		let mut params = Vec::with_capacity(self.arrange_offsets.len());
		let mut indices = HashMap::new();
		for &offset in &self.arrange_offsets {
			let res = self.accessor.arrange_group_params(offset).ok_or(Error::UnresolvedOffset {
				table: "arrange group param",
				offset,
			})?;
			let groups = res
				.groups
				.iter()
				.map(|group| {
					Ok(ArrangeGroupParam {
						group_name: self.string(group.group_name_offset)?,
						limit_type: group.limit_type,
						limit_threshold: group.limit_threshold,
						unknown: group.unknown,
					})
				})
				.collect::<Result<Vec<_>>>()?;
			indices.insert(offset, params.len());
			params.push(ArrangeGroupParams { groups });
		}
		Ok((params, indices))
	}
}

struct ParamResolver<'r> {
	schema: &'r ParamSchema,
	string_offsets: &'r HashMap<u64, StringRef>,
	arrange_indices: &'r HashMap<u64, usize>,
	direct_types: Vec<Option<ParamType>>,
	num_curves: usize,
	num_random: usize,
}

impl ParamResolver<'_> {
	fn resolve_set(&mut self, category: ParamCategory, params: &[RawParam]) -> Result<ParamSet> {
		params
			.iter()
			.map(|param| {
				Ok(Param {
					slot: param.slot,
					value: self.resolve(category, param)?,
				})
			})
			.collect::<Result<Vec<_>>>()
			.map(ParamSet::new)
	}

	fn resolve(&mut self, category: ParamCategory, param: &RawParam) -> Result<ParamValue> {
		let declared = self.schema.param_type(category, param.slot).ok_or(Error::UnknownParam {
			category,
			slot: param.slot,
			count: self.schema.count(category),
		})?;
		let index = param.value as usize;
		let bounded = |table: &'static str, count: usize| {
			if index < count {
				Ok(index)
			} else {
				Err(Error::OutOfBounds {
					table,
					index: index as u64,
					count: count as u64,
				})
			}
		};
		Ok(match param.reference_type {
			ValueReferenceType::Direct => {
				let index = bounded("direct value", self.direct_types.len())?;
				self.direct_types[index].get_or_insert(declared);
				ParamValue::Direct(index)
			}
			ValueReferenceType::String => {
				if declared != ParamType::String {
					return Err(Error::SchemaMismatch {
						category,
						slot: param.slot,
						declared,
						referenced: "string",
					});
				}
				let offset = param.value as u64;
				ParamValue::String(*self.string_offsets.get(&offset).ok_or(Error::UnresolvedOffset {
					table: "name table",
					offset,
				})?)
			}
			ValueReferenceType::Curve => ParamValue::Curve(bounded("curve", self.num_curves)?),
			ValueReferenceType::ArrangeParam => {
				let offset = param.value as u64;
				ParamValue::ArrangeParam(*self.arrange_indices.get(&offset).ok_or(Error::UnresolvedOffset {
					table: "arrange group param",
					offset,
				})?)
			}
			ValueReferenceType::Bitfield => ParamValue::Bitfield(param.value),
			random => {
				let kind = RandomKind::from_reference_type(random).ok_or(Error::InvalidTag {
					kind: "value reference type",
					value: random as u32,
				})?;
				ParamValue::Random(kind, bounded("random", self.num_random)?)
			}
		})
	}
}
