// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Model to resource.
//!
//! Encoding runs in two passes. [`Layout`] sizes every section and assigns all offsets up front, the
//! write pass then emits the sections in file order and checks that each one starts where the layout
//! put it.

mod layout;

use std::io::Cursor;

use binrw::{BinWrite, Endian};
use tracing::debug;

use self::layout::{Layout, UserLayout};
use crate::{
	error::{narrow, Error, Result},
	hash,
	model::{
		condition::PropertyType, ActionTriggerStart, AssetCallTarget, Condition, Container, ContainerKind, Param,
		ParamSet, ParamValue, Resource, SwitchContainer, User,
	},
	profile::Profile,
	res::{
		condition::{ResBlendCondition, ResRandomCondition, ResSequenceCondition, ResSwitchCondition},
		container::{GridFlags, ResContainerBase, ResGridContainerParam, ResSwitchContainerParam},
		user::{
			ActionTriggerFlags, ResAction, ResActionSlot, ResActionTrigger, ResAlwaysTrigger, ResAssetCallTable,
			ResProperty, ResPropertyTrigger, ResUserHeader,
		},
		ResArrangeGroupParam, ResArrangeGroupParams, ResAssetParam, ResCurveCallTable, ResCurvePoint, ResParam,
		ResParamDefine, ResParamDefineTableHeader, ResRandomCallTable, ResTriggerOverwriteParam, TargetPointer,
		NULL_OFFSET,
	},
	schema::{ParamCategory, ParamType},
	strings::{StringPool, StringRef},
};

const MAX_PARAM_VALUE: u32 = 0xFF_FFFF;

/// Encodes a model into a resource buffer of the given profile
pub fn encode(resource: &Resource, profile: Profile) -> Result<Vec<u8>> {
	let layout = Layout::calculate(resource, profile)?;
	let mut encoder = Encoder {
		resource,
		profile,
		layout: &layout,
		writer: Cursor::new(Vec::with_capacity(layout.file_size() as usize)),
	};
	encoder.write_resource()?;
	let data = encoder.writer.into_inner();
	debug!(
		version = resource.version,
		users = resource.users.len(),
		size = data.len(),
		"encoded resource"
	);
	Ok(data)
}

struct Encoder<'a> {
	resource: &'a Resource,
	profile: Profile,
	layout: &'a Layout,
	writer: Cursor<Vec<u8>>,
}

impl Encoder<'_> {
	fn write<T>(&mut self, value: &T) -> Result<()>
	where
		T: for<'b> BinWrite<Args<'b> = ()>,
	{
		value.write_options(&mut self.writer, Endian::Little, ())?;
		Ok(())
	}

	fn write_args<T>(&mut self, value: &T) -> Result<()>
	where
		T: for<'b> BinWrite<Args<'b> = Profile>,
	{
		value.write_options(&mut self.writer, Endian::Little, self.profile)?;
		Ok(())
	}

	fn position(&self) -> u64 {
		self.writer.position()
	}

	fn expect_position(&self, section: &'static str, expected: u64) -> Result<()> {
		let actual = self.position();
		if actual != expected {
			return Err(Error::LayoutMismatch {
				section,
				expected,
				actual,
			});
		}
		Ok(())
	}

	/// Zero fills up to `pos`
	fn pad_to(&mut self, section: &'static str, pos: u64) -> Result<()> {
		let actual = self.position();
		if actual > pos {
			return Err(Error::LayoutMismatch {
				section,
				expected: pos,
				actual,
			});
		}
		self.writer.get_mut().resize(pos as usize, 0);
		self.writer.set_position(pos);
		Ok(())
	}

	fn string_offset(&self, string: StringRef) -> Result<u64> {
		self.layout
			.string_offsets
			.get(string.index())
			.copied()
			.ok_or(Error::UnresolvedReference {
				table: "string",
				index: string.index(),
			})
	}

	fn name_pointer(&self, string: StringRef) -> Result<TargetPointer> {
		self.string_offset(string).map(TargetPointer)
	}

	fn optional_offset(&self, table: &'static str, offsets: &[u64], index: Option<usize>) -> Result<u64> {
		match index {
			None => Ok(NULL_OFFSET),
			Some(index) => offsets
				.get(index)
				.copied()
				.ok_or(Error::UnresolvedReference { table, index }),
		}
	}

	fn condition_offset(&self, index: Option<usize>) -> Result<u64> {
		self.optional_offset("condition", &self.layout.condition_offsets, index)
	}

	fn trigger_overwrite_offset(&self, index: Option<usize>) -> Result<u64> {
		self.optional_offset("trigger overwrite param", &self.layout.trigger_param_offsets, index)
	}

	fn write_resource(&mut self) -> Result<()> {
		let layout = self.layout;
		let resource = self.resource;
		let header = &layout.header;

		self.write_args(header)?;
		for user in &layout.users {
			self.write(&user.hash)?;
		}
		self.pad_to("user offset table", layout.user_offset_table_pos)?;
		for user in &layout.users {
			self.write_args(&TargetPointer(user.offset))?;
		}
		self.pad_to("param define table", layout.pdt_pos)?;

		self.write_param_define_table()?;
		self.pad_to("asset param table", layout.asset_param_table_pos)?;

		for set in &resource.asset_params {
			let (mask, params) = self.param_block(ParamCategory::Asset, set)?;
			self.write(&ResAssetParam { mask, params })?;
		}
		self.expect_position("trigger overwrite table", header.trigger_overwrite_table_pos.0)?;
		for set in &resource.trigger_overwrite_params {
			let (mask, params) = self.param_block(ParamCategory::Trigger, set)?;
			self.write(&ResTriggerOverwriteParam {
				mask: mask as u32,
				params,
			})?;
		}

		self.expect_position("local property table", header.local_property_name_ref_table_pos.0)?;
		for name in &resource.local_property_names {
			self.write_args(&self.name_pointer(*name)?)?;
		}
		self.expect_position("local property enum table", layout.local_property_enum_ref_table_pos)?;
		for name in &resource.local_property_enum_names {
			self.write_args(&self.name_pointer(*name)?)?;
		}

		self.expect_position("direct value table", layout.direct_value_table_pos)?;
		for value in &resource.direct_values {
			self.write(&value.raw())?;
		}
		self.expect_position("random table", layout.random_table_pos)?;
		for random in &resource.random_calls {
			self.write(&ResRandomCallTable {
				min: random.min,
				max: random.max,
			})?;
		}

		self.expect_position("curve table", layout.curve_table_pos)?;
		let mut point_base_index = 0usize;
		for curve in &resource.curves {
			self.write_args(&ResCurveCallTable {
				point_base_index: narrow("curve point index", point_base_index)?,
				point_count: narrow("curve point count", curve.points.len())?,
				curve_type: curve.curve_type,
				is_global: curve.is_global as u16,
				property_name_offset: self.name_pointer(curve.property_name)?,
				unknown: curve.unknown,
				property_index: curve.property_index,
				unknown2: curve.unknown2,
			})?;
			point_base_index += curve.points.len();
		}
		self.expect_position("curve point table", layout.curve_point_table_pos)?;
		for point in resource.curves.iter().flat_map(|curve| &curve.points) {
			self.write(&ResCurvePoint { x: point.x, y: point.y })?;
		}

		self.expect_position("ex region", header.ex_region_pos.0)?;
		for params in &resource.arrange_group_params {
			let groups = params
				.groups
				.iter()
				.map(|group| {
					Ok(ResArrangeGroupParam {
						group_name_offset: self.string_offset(group.group_name)?,
						limit_type: group.limit_type,
						limit_threshold: group.limit_threshold,
						unknown: group.unknown,
					})
				})
				.collect::<Result<Vec<_>>>()?;
			self.write(&ResArrangeGroupParams::new(groups))?;
		}

		for (user_layout, user) in layout.users.iter().zip(resource.users.values()) {
			self.write_user(user_layout, user)?;
		}

		self.expect_position("condition table", header.condition_table_pos.0)?;
		for condition in &resource.conditions {
			self.write_condition(condition)?;
		}

		self.expect_position("name table", header.name_table_pos.0)?;
		self.write_string_table(&resource.strings)?;
		self.pad_to("end of file", layout.file_size())
	}

	fn write_string_table(&mut self, strings: &StringPool) -> Result<()> {
		let writer = self.writer.get_mut();
		for (_, string) in strings.sorted() {
			writer.extend_from_slice(string.as_bytes());
			writer.push(0);
		}
		let end = writer.len() as u64;
		self.writer.set_position(end);
		Ok(())
	}

	fn write_param_define_table(&mut self) -> Result<()> {
		let layout = self.layout;
		let Some(pdt) = &layout.pdt else {
			return Ok(());
		};
		let resource = self.resource;
		let schema = &resource.schema;
		self.write(pdt)?;
		for define in schema
			.user_params
			.iter()
			.chain(&schema.asset_params)
			.chain(&schema.trigger_params)
		{
			let name_offset = layout
				.pdt_string_offsets
				.get(define.name.index())
				.copied()
				.ok_or(Error::UnresolvedReference {
					table: "param define string",
					index: define.name.index(),
				})?;
			self.write(&ResParamDefine {
				name_offset,
				param_type: define.param_type() as u32,
				default_value: define.default.to_raw(&layout.pdt_string_offsets)?,
			})?;
		}
		self.write_string_table(&schema.strings)?;
		self.expect_position(
			"param define name table",
			layout.pdt_pos
				+ ResParamDefineTableHeader::SIZE
				+ ResParamDefine::SIZE * schema.num_defines() as u64
				+ layout.pdt_names_size,
		)
	}

	/// Presence mask and the present values in slot order
	fn param_block(&self, category: ParamCategory, set: &ParamSet) -> Result<(u64, Vec<ResParam>)> {
		let bits = match category {
			ParamCategory::Trigger => u32::BITS,
			_ => u64::BITS,
		};
		let mask = set
			.mask(bits)
			.ok_or(Error::Unsupported("param slot beyond the presence mask"))?;
		let params = set
			.sorted()
			.into_iter()
			.map(|param| self.param(category, param))
			.collect::<Result<Vec<_>>>()?;
		Ok((mask, params))
	}

	fn param(&self, category: ParamCategory, param: &Param) -> Result<ResParam> {
		let schema = &self.resource.schema;
		let declared = schema.param_type(category, param.slot).ok_or(Error::UnknownParam {
			category,
			slot: param.slot,
			count: schema.count(category),
		})?;
		let resource = self.resource;
		let bounded = |table: &'static str, index: usize, count: usize| {
			if index < count {
				Ok(index as u64)
			} else {
				Err(Error::UnresolvedReference { table, index })
			}
		};
		let value = match param.value {
			ParamValue::Direct(index) => bounded("direct value", index, resource.direct_values.len())?,
			ParamValue::String(string) => {
				if declared != ParamType::String {
					return Err(Error::SchemaMismatch {
						category,
						slot: param.slot,
						declared,
						referenced: "string",
					});
				}
				self.string_offset(string)?
			}
			ParamValue::Curve(index) => bounded("curve", index, resource.curves.len())?,
			ParamValue::Random(_, index) => bounded("random", index, resource.random_calls.len())?,
			ParamValue::ArrangeParam(index) => self
				.layout
				.arrange_offsets
				.get(index)
				.copied()
				.ok_or(Error::UnresolvedReference {
					table: "arrange group param",
					index,
				})?,
			ParamValue::Bitfield(value) => value as u64,
		};
		if value > MAX_PARAM_VALUE as u64 {
			return Err(Error::Overflow {
				field: "param value",
				value: value as i64,
			});
		}
		Ok(ResParam::from_parts(param.value.reference_type() as u8, value as u32))
	}

	fn asset_call_offset(&self, user: &User, index: usize) -> Result<u64> {
		if index >= user.asset_calls.len() {
			return Err(Error::UnresolvedReference {
				table: "asset call",
				index,
			});
		}
		Ok(ResAssetCallTable::size(self.profile) * index as u64)
	}

	fn write_user(&mut self, user_layout: &UserLayout, user: &User) -> Result<()> {
		let resource = self.resource;
		self.expect_position("user", user_layout.offset)?;

		self.write(&ResUserHeader {
			is_setup: 0,
			local_property_count: narrow("local property count", user.local_properties.len())?,
			unknown: user.unknown.unwrap_or_default(),
			call_count: narrow("asset call count", user.asset_calls.len())?,
			asset_count: narrow("asset count", user.asset_count())?,
			random_container_count: narrow("random container count", user.random_container_count())?,
			action_slot_count: narrow("action slot count", user.action_slots.len())?,
			action_count: narrow("action count", user.actions.len())?,
			action_trigger_count: narrow("action trigger count", user.action_triggers.len())?,
			property_count: narrow("property count", user.properties.len())?,
			property_trigger_count: narrow("property trigger count", user.property_triggers.len())?,
			always_trigger_count: narrow("always trigger count", user.always_triggers.len())?,
			trigger_table_offset: user_layout.trigger_table_offset,
		})?;
		for name in &user.local_properties {
			self.write_args(&self.name_pointer(*name)?)?;
		}
		for (slot, value) in user.params.iter().enumerate() {
			let param = self.param(ParamCategory::User, &Param { slot, value: *value })?;
			self.write(&param)?;
		}
		for id in &user_layout.sorted_asset_ids {
			self.write(id)?;
		}
		if user_layout.sorted_asset_ids.len() % 2 == 1 {
			self.write(&0u16)?;
		}

		let mut asset_index = 0usize;
		for call in &user.asset_calls {
			let (index, param_offset) = match call.target {
				AssetCallTarget::Asset(asset) if !call.is_container() => {
					let offset = self.layout.asset_param_offsets.get(asset).copied().ok_or(
						Error::UnresolvedReference {
							table: "asset param",
							index: asset,
						},
					)?;
					asset_index += 1;
					(narrow::<i16, _>("asset index", asset_index - 1)?, offset)
				}
				AssetCallTarget::Container(container) if call.is_container() => {
					let offset = user_layout.container_offsets.get(container).copied().ok_or(
						Error::UnresolvedReference {
							table: "container",
							index: container,
						},
					)?;
					(-1, offset)
				}
				_ => return Err(Error::Inconsistent("asset call flag does not match its target")),
			};
			let key_name = resource.strings.resolve(call.key_name)?;
			self.write_args(&ResAssetCallTable {
				key_name_offset: self.name_pointer(call.key_name)?,
				asset_index: index,
				flag: call.flag,
				duration: call.duration,
				parent_index: call.parent_index,
				guid: call.guid,
				key_name_hash: hash::name_hash(key_name),
				param_offset: TargetPointer(param_offset),
				condition_offset: TargetPointer(self.condition_offset(call.condition)?),
			})?;
		}

		self.expect_position("container table", user_layout.offset + user_layout.container_table_offset)?;
		for container in &user.containers {
			self.write_container(container)?;
		}

		self.expect_position("trigger table", user_layout.offset + user_layout.trigger_table_offset)?;
		for slot in &user.action_slots {
			self.write_args(&ResActionSlot {
				name_offset: self.name_pointer(slot.name)?,
				action_start: slot.action_start,
				action_end: slot.action_start.wrapping_add(slot.action_count),
			})?;
		}
		for action in &user.actions {
			self.write_args(&ResAction {
				name_offset: self.name_pointer(action.name)?,
				trigger_start: action.trigger_start,
				trigger_end: action.trigger_start.wrapping_add(action.trigger_count),
				enable_match_start: action.enable_match_start.unwrap_or_default(),
			})?;
		}
		for trigger in &user.action_triggers {
			let start = match trigger.start {
				ActionTriggerStart::Frame(frame) => frame as u32 as u64,
				ActionTriggerStart::PreviousAction(name) => self.string_offset(name)?,
			};
			self.write(&ResActionTrigger {
				guid: trigger.guid,
				unknown: trigger.unknown,
				asset_call_offset: self.asset_call_offset(user, trigger.asset_call)?,
				start,
				end_frame: trigger.end_frame,
				flags: ActionTriggerFlags::new()
					.with_trigger_once(trigger.trigger_once)
					.with_fade(trigger.fade)
					.with_always_trigger(trigger.always_trigger)
					.with_name_match(trigger.name_match()),
				overwrite_hash: trigger.overwrite_hash,
				overwrite_param_offset: self.trigger_overwrite_offset(trigger.trigger_overwrite)?,
			})?;
		}
		for property in &user.properties {
			self.write_args(&ResProperty {
				name_offset: self.name_pointer(property.name)?,
				is_global: property.is_global as u32,
				trigger_start: property.trigger_start,
				trigger_end: property.trigger_start.wrapping_add(property.trigger_count),
			})?;
		}
		for trigger in &user.property_triggers {
			self.write(&ResPropertyTrigger {
				guid: trigger.guid,
				flag: trigger.flag,
				overwrite_hash: trigger.overwrite_hash,
				asset_call_offset: self.asset_call_offset(user, trigger.asset_call)?,
				condition_offset: self.condition_offset(trigger.condition)?,
				overwrite_param_offset: self.trigger_overwrite_offset(trigger.trigger_overwrite)?,
			})?;
		}
		for trigger in &user.always_triggers {
			self.write(&ResAlwaysTrigger {
				guid: trigger.guid,
				flag: trigger.flag,
				overwrite_hash: trigger.overwrite_hash,
				asset_call_offset: self.asset_call_offset(user, trigger.asset_call)?,
				overwrite_param_offset: self.trigger_overwrite_offset(trigger.trigger_overwrite)?,
			})?;
		}

		self.expect_position("end of user", user_layout.offset + user_layout.size)
	}

	fn switch_container_param(&self, switch: &SwitchContainer) -> Result<ResSwitchContainerParam> {
		Ok(ResSwitchContainerParam {
			action_slot_name_offset: self.name_pointer(switch.action_slot_name)?,
			watch_property_id: switch.watch_property_id,
			property_index: switch.property_index,
			is_global: switch.is_global,
			is_action_trigger: switch.is_action_trigger.unwrap_or_default(),
		})
	}

	fn write_container(&mut self, container: &Container) -> Result<()> {
		let flags = container.flags.unwrap_or_default();
		self.write_args(&ResContainerBase {
			container_type: container.container_type() as u32,
			is_not_blend_all: flags.is_not_blend_all,
			is_need_observe: flags.is_need_observe,
			child_start: container.child_start,
			child_end: container.child_start.wrapping_add(container.child_count),
		})?;
		match &container.kind {
			ContainerKind::Switch(switch) | ContainerKind::Blend(Some(switch)) => {
				let param = self.switch_container_param(switch)?;
				self.write_args(&param)
			}
			ContainerKind::Grid(grid) => {
				let param = ResGridContainerParam {
					property_name_offset1: self.name_pointer(grid.property_name1)?,
					property_name_offset2: self.name_pointer(grid.property_name2)?,
					property_index1: grid.property_index1,
					property_index2: grid.property_index2,
					flags: GridFlags::new()
						.with_is_property1_global(grid.is_global1)
						.with_is_property2_global(grid.is_global2),
					property_value_count1: narrow("grid value count", grid.values1.len())?,
					property_value_count2: narrow("grid value count", grid.values2.len())?,
					values1: grid.values1.clone(),
					values2: grid.values2.clone(),
					indices: grid.indices.clone(),
				};
				self.write_args(&param)
			}
			ContainerKind::Random
			| ContainerKind::Random2
			| ContainerKind::Blend(None)
			| ContainerKind::Sequence
			| ContainerKind::Jump => Ok(()),
		}
	}

	fn write_condition(&mut self, condition: &Condition) -> Result<()> {
		self.write(&(condition.container_type() as u32))?;
		match condition {
			Condition::Switch(switch) => {
				let is_enum = switch.property_type == PropertyType::Enum;
				let enum_name_offset = switch.enum_name.map(|name| self.string_offset(name)).transpose()?;
				let compact = self.profile.compact_tags();
				let value = match enum_name_offset {
					// the enum name takes the place of the value
					Some(offset) if is_enum && !compact => narrow("switch condition enum name", offset)?,
					_ => switch.value.raw(),
				};
				if !compact && switch.action_hash > u16::MAX as u32 {
					return Err(Error::Overflow {
						field: "switch condition action hash",
						value: switch.action_hash as i64,
					});
				}
				self.write_args(&ResSwitchCondition {
					property_type: switch.property_type as u32,
					compare_type: switch.compare_type as u32,
					is_global: switch.is_global,
					action_hash: switch.action_hash,
					value,
					enum_name_offset: enum_name_offset.filter(|_| compact).map(TargetPointer),
				})
			}
			Condition::Random(random) | Condition::Random2(random) => {
				self.write(&ResRandomCondition { weight: random.weight })
			}
			Condition::Blend(blend) => self.write(&ResBlendCondition {
				min: blend.min,
				max: blend.max,
				blend_type_to_max: blend.blend_type_to_max as u8,
				blend_type_to_min: blend.blend_type_to_min as u8,
			}),
			Condition::Sequence(sequence) => self.write(&ResSequenceCondition {
				continue_on_fade: sequence.continue_on_fade,
			}),
			Condition::Grid | Condition::Jump => Ok(()),
		}
	}
}
