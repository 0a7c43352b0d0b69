// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Layout pass of the encoder: sizes every section and assigns its offset without writing anything.

use itertools::Itertools;
use tracing::trace;

use crate::{
	error::{narrow, Error, Result},
	model::{
		condition::PropertyType, AssetCallTarget, Condition, Container, ContainerKind, ParamSet, ParamValue, Resource,
		User,
	},
	profile::Profile,
	res::{
		condition::{ResSwitchCondition, CONDITION_TAG_SIZE},
		container::{ResContainerBase, ResGridContainerParam, ResSwitchContainerParam},
		user::{
			ResAction, ResActionSlot, ResActionTrigger, ResAlwaysTrigger, ResAssetCallTable, ResProperty,
			ResPropertyTrigger, ResUserHeader,
		},
		ResArrangeGroupParams, ResCurveCallTable, ResCurvePoint, ResParam, ResParamDefine, ResParamDefineTableHeader,
		ResRandomCallTable, ResourceHeader, TargetPointer,
	},
	schema::ParamCategory,
};

#[derive(Clone, Debug, Default)]
pub(crate) struct UserLayout {
	pub hash: u32,
	/// absolute
	pub offset: u64,
	pub size: u64,
	/// relative to the user
	pub container_table_offset: u64,
	/// relative to the container table
	pub container_offsets: Vec<u64>,
	/// relative to the user
	pub trigger_table_offset: u64,
	pub sorted_asset_ids: Vec<u16>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Layout {
	pub header: ResourceHeader,
	pub user_offset_table_pos: u64,
	pub pdt_pos: u64,
	pub pdt: Option<ResParamDefineTableHeader>,
	pub pdt_string_offsets: Vec<u64>,
	pub pdt_names_size: u64,
	pub asset_param_table_pos: u64,
	pub local_property_enum_ref_table_pos: u64,
	pub direct_value_table_pos: u64,
	pub random_table_pos: u64,
	pub curve_table_pos: u64,
	pub curve_point_table_pos: u64,
	pub users: Vec<UserLayout>,

	/// Indexed by `StringRef`, relative to the name table
	pub string_offsets: Vec<u64>,
	pub name_table_size: u64,
	/// Relative to the asset param table
	pub asset_param_offsets: Vec<u64>,
	/// Relative to the trigger overwrite table
	pub trigger_param_offsets: Vec<u64>,
	/// Relative to the ex region
	pub arrange_offsets: Vec<u64>,
	/// Relative to the condition table
	pub condition_offsets: Vec<u64>,
}

/// Assigns each entry of a table the running offset, returning the offsets and the table size
fn running_offsets(sizes: impl IntoIterator<Item = Result<u64>>) -> Result<(Vec<u64>, u64)> {
	let mut offsets = vec![];
	let mut size = 0;
	for entry in sizes {
		offsets.push(size);
		size += entry?;
	}
	Ok((offsets, size))
}

fn check_param_set(set: &ParamSet, category: ParamCategory, schema_count: usize, bits: u32) -> Result<()> {
	for param in &set.params {
		if param.slot >= schema_count {
			return Err(Error::UnknownParam {
				category,
				slot: param.slot,
				count: schema_count,
			});
		}
	}
	let mask = set.mask(bits).ok_or(Error::Unsupported("param slot beyond the presence mask"))?;
	if mask.count_ones() as usize != set.len() {
		return Err(Error::Inconsistent("param set fills a slot twice"));
	}
	Ok(())
}

pub(crate) fn condition_size(condition: &Condition, profile: Profile) -> Result<u64> {
	if !condition.container_type().is_supported(profile) {
		return Err(Error::Unsupported("condition kind"));
	}
	Ok(match condition {
		Condition::Switch(switch) => {
			let is_enum = switch.property_type == PropertyType::Enum;
			if is_enum != switch.enum_name.is_some() {
				return Err(Error::Inconsistent("switch conditions carry an enum name iff they compare an enum"));
			}
			ResSwitchCondition::size(profile, is_enum)
		}
		Condition::Random(_) | Condition::Random2(_) | Condition::Sequence(_) => CONDITION_TAG_SIZE + 4,
		Condition::Blend(_) => CONDITION_TAG_SIZE + 12,
		Condition::Grid | Condition::Jump => CONDITION_TAG_SIZE,
	})
}

pub(crate) fn container_size(container: &Container, profile: Profile) -> Result<u64> {
	if !container.container_type().is_supported(profile) {
		return Err(Error::Unsupported("container kind"));
	}
	if !profile.has_container_flags() && container.flags.is_some() {
		return Err(Error::Unsupported("container flags"));
	}
	let base = ResContainerBase::size(profile);
	Ok(match &container.kind {
		ContainerKind::Switch(switch) => {
			if !profile.compact_tags() && switch.is_action_trigger.is_some() {
				return Err(Error::Unsupported("switch container action trigger flag"));
			}
			base + ResSwitchContainerParam::size(profile)
		}
		ContainerKind::Blend(payload) => {
			let not_blend_all = container.flags.is_some_and(|flags| flags.is_not_blend_all);
			if payload.is_some() != not_blend_all {
				return Err(Error::Inconsistent(
					"blend containers watch a property iff they do not blend all children",
				));
			}
			match payload {
				Some(switch) => {
					if !profile.compact_tags() && switch.is_action_trigger.is_some() {
						return Err(Error::Unsupported("switch container action trigger flag"));
					}
					base + ResSwitchContainerParam::size(profile)
				}
				None => base,
			}
		}
		ContainerKind::Grid(grid) => {
			let count1 = narrow::<u8, _>("grid value count", grid.values1.len())? as usize;
			let count2 = narrow::<u8, _>("grid value count", grid.values2.len())? as usize;
			if grid.indices.len() != count1 * count2 {
				return Err(Error::Inconsistent("grid index table is not values1 x values2"));
			}
			base + ResGridContainerParam::size(profile, count1, count2)
		}
		ContainerKind::Random | ContainerKind::Random2 | ContainerKind::Sequence | ContainerKind::Jump => base,
	})
}

/// Fails unless every index below `count` is among `reached`.
///
/// Containers and arrange groups are only found again through the entries pointing at them.
fn check_reached(reached: impl IntoIterator<Item = usize>, count: usize, message: &'static str) -> Result<()> {
	let mut seen = vec![false; count];
	for index in reached {
		if let Some(slot) = seen.get_mut(index) {
			*slot = true;
		}
	}
	if seen.contains(&false) {
		return Err(Error::Inconsistent(message));
	}
	Ok(())
}

/// Every param value of the resource, across users, asset param sets and trigger overwrites
fn param_values(resource: &Resource) -> impl Iterator<Item = ParamValue> + '_ {
	let sets = resource
		.asset_params
		.iter()
		.chain(&resource.trigger_overwrite_params)
		.flat_map(|set| set.params.iter().map(|param| param.value));
	let users = resource.users.values().flat_map(|user| user.params.iter().copied());
	sets.chain(users)
}

/// Order of the sorted asset id table: key name, then condition, then position
pub(crate) fn sorted_asset_ids(resource: &Resource, user: &User) -> Result<Vec<u16>> {
	let keys = user
		.asset_calls
		.iter()
		.enumerate()
		.map(|(index, call)| {
			let name = resource.strings.resolve(call.key_name)?;
			let condition = call.condition.map_or(-1, |c| c as i64);
			Ok((name.as_bytes(), condition, index))
		})
		.collect::<Result<Vec<_>>>()?;
	keys.into_iter()
		.sorted()
		.map(|(_, _, index)| narrow("asset call index", index))
		.collect()
}

impl UserLayout {
	fn calculate(resource: &Resource, hash: u32, user: &User, profile: Profile) -> Result<Self> {
		if user.params.len() != resource.schema.user_params.len() {
			return Err(Error::Inconsistent("user params must fill every user param define"));
		}
		if !profile.has_user_extra() && user.unknown.is_some() {
			return Err(Error::Unsupported("user extra field"));
		}
		if !profile.compact_tags() && user.actions.iter().any(|action| action.enable_match_start.is_some()) {
			return Err(Error::Unsupported("action match start flag"));
		}
		check_reached(
			user.asset_calls.iter().filter_map(|call| match call.target {
				AssetCallTarget::Container(index) => Some(index),
				AssetCallTarget::Asset(_) => None,
			}),
			user.containers.len(),
			"every container must be the target of an asset call",
		)?;

		let ptr = profile.pointer_size();
		let calls = user.asset_calls.len() as u64;
		let container_table_offset = ResUserHeader::SIZE
			+ ptr * user.local_properties.len() as u64
			+ ResParam::SIZE * user.params.len() as u64
			+ 2 * (calls + calls % 2)
			+ ResAssetCallTable::size(profile) * calls;
		let (container_offsets, containers_size) =
			running_offsets(user.containers.iter().map(|container| container_size(container, profile)))?;
		let trigger_table_offset = container_table_offset + containers_size;
		let size = trigger_table_offset
			+ ResActionSlot::size(profile) * user.action_slots.len() as u64
			+ ResAction::size(profile) * user.actions.len() as u64
			+ ResActionTrigger::SIZE * user.action_triggers.len() as u64
			+ ResProperty::size(profile) * user.properties.len() as u64
			+ ResPropertyTrigger::SIZE * user.property_triggers.len() as u64
			+ ResAlwaysTrigger::SIZE * user.always_triggers.len() as u64;

		Ok(Self {
			hash,
			offset: 0,
			size,
			container_table_offset,
			container_offsets,
			trigger_table_offset,
			sorted_asset_ids: sorted_asset_ids(resource, user)?,
		})
	}
}

impl Layout {
	pub fn calculate(resource: &Resource, profile: Profile) -> Result<Self> {
		profile
			.system_kind(resource.version)
			.ok_or(Error::UnknownVersion(resource.version))?;
		let ptr = profile.pointer_size();
		let schema = &resource.schema;

		let (string_offsets, name_table_size) = resource.strings.table_layout();
		let (pdt_string_offsets, pdt_names_size) = schema.strings.table_layout();

		let (condition_offsets, condition_table_size) = running_offsets(
			resource
				.conditions
				.iter()
				.map(|condition| condition_size(condition, profile)),
		)?;

		check_reached(
			param_values(resource).filter_map(|value| match value {
				ParamValue::ArrangeParam(index) => Some(index),
				_ => None,
			}),
			resource.arrange_group_params.len(),
			"every arrange group param must be referenced by a param",
		)?;
		for set in &resource.asset_params {
			check_param_set(set, ParamCategory::Asset, schema.asset_params.len(), u64::BITS)?;
		}
		for set in &resource.trigger_overwrite_params {
			check_param_set(set, ParamCategory::Trigger, schema.trigger_params.len(), u32::BITS)?;
		}
		let (asset_param_offsets, asset_param_table_size) = running_offsets(
			resource
				.asset_params
				.iter()
				.map(|set| Ok(8 + ResParam::SIZE * set.len() as u64)),
		)?;
		let (trigger_param_offsets, trigger_param_table_size) = running_offsets(
			resource
				.trigger_overwrite_params
				.iter()
				.map(|set| Ok(4 + ResParam::SIZE * set.len() as u64)),
		)?;
		let (arrange_offsets, arrange_size) = running_offsets(
			resource
				.arrange_group_params
				.iter()
				.map(|params| Ok(ResArrangeGroupParams::size(params.groups.len()))),
		)?;

		let num_users = resource.users.len() as u64;
		let user_offset_table_pos = profile.align(profile.header_size() + 4 * num_users);
		let pdt_pos = profile.align(user_offset_table_pos + ptr * num_users);

		// an empty resource ends where the define table would start
		let (pdt, asset_param_table_pos) = if resource.is_empty() {
			(None, pdt_pos)
		} else {
			let size = profile.align(
				ResParamDefineTableHeader::SIZE + ResParamDefine::SIZE * schema.num_defines() as u64 + pdt_names_size,
			);
			let num_asset_params = schema.asset_params.len();
			let header = ResParamDefineTableHeader {
				size: narrow("param define table size", size)?,
				num_user_params: narrow("user param count", schema.user_params.len())?,
				num_asset_params: narrow("asset param count", num_asset_params)?,
				num_user_asset_params: narrow(
					"user asset param count",
					num_asset_params.saturating_sub(schema.system_asset_param_count),
				)?,
				num_trigger_params: narrow("trigger param count", schema.trigger_params.len())?,
			};
			(Some(header), pdt_pos + size)
		};

		let trigger_overwrite_table_pos = asset_param_table_pos + asset_param_table_size;
		let local_property_name_ref_table_pos = trigger_overwrite_table_pos + trigger_param_table_size;
		let local_property_enum_ref_table_pos =
			local_property_name_ref_table_pos + ptr * resource.local_property_names.len() as u64;
		let direct_value_table_pos =
			local_property_enum_ref_table_pos + ptr * resource.local_property_enum_names.len() as u64;
		let random_table_pos = direct_value_table_pos + 4 * resource.direct_values.len() as u64;
		let curve_table_pos = random_table_pos + ResRandomCallTable::SIZE * resource.random_calls.len() as u64;
		let curve_point_table_pos = curve_table_pos + ResCurveCallTable::size(profile) * resource.curves.len() as u64;
		let num_curve_points = resource.num_curve_points();
		let ex_region_pos = curve_point_table_pos + ResCurvePoint::SIZE * num_curve_points as u64;

		let mut pos = ex_region_pos + arrange_size;
		let mut users = Vec::with_capacity(resource.users.len());
		for (&hash, user) in &resource.users {
			let mut user_layout = UserLayout::calculate(resource, hash, user, profile)?;
			user_layout.offset = pos;
			pos += user_layout.size;
			users.push(user_layout);
		}

		let condition_table_pos = pos;
		let name_table_pos = condition_table_pos + condition_table_size;
		let file_size = profile.align(name_table_pos + name_table_size);

		let header = ResourceHeader {
			file_size: narrow("file size", file_size)?,
			version: resource.version,
			num_params: narrow("asset param value count", resource.num_asset_param_values())?,
			num_asset_params: narrow("asset param count", resource.asset_params.len())?,
			num_trigger_overwrite_params: narrow(
				"trigger overwrite param count",
				resource.trigger_overwrite_params.len(),
			)?,
			trigger_overwrite_table_pos: TargetPointer(trigger_overwrite_table_pos),
			local_property_name_ref_table_pos: TargetPointer(local_property_name_ref_table_pos),
			num_local_property_name_refs: narrow("local property count", resource.local_property_names.len())?,
			num_local_property_enum_name_refs: narrow(
				"local property enum count",
				resource.local_property_enum_names.len(),
			)?,
			num_direct_values: narrow("direct value count", resource.direct_values.len())?,
			num_random: narrow("random count", resource.random_calls.len())?,
			num_curves: narrow("curve count", resource.curves.len())?,
			num_curve_points: narrow("curve point count", num_curve_points)?,
			ex_region_pos: TargetPointer(ex_region_pos),
			num_users: narrow("user count", resource.users.len())?,
			condition_table_pos: TargetPointer(condition_table_pos),
			name_table_pos: TargetPointer(name_table_pos),
		};

		trace!(
			size = file_size,
			users = users.len(),
			conditions = condition_offsets.len(),
			"calculated layout"
		);

		Ok(Self {
			header,
			user_offset_table_pos,
			pdt_pos,
			pdt,
			pdt_string_offsets,
			pdt_names_size,
			asset_param_table_pos,
			local_property_enum_ref_table_pos,
			direct_value_table_pos,
			random_table_pos,
			curve_table_pos,
			curve_point_table_pos,
			users,
			string_offsets,
			name_table_size,
			asset_param_offsets,
			trigger_param_offsets,
			arrange_offsets,
			condition_offsets,
		})
	}

	pub fn file_size(&self) -> u64 {
		self.header.file_size as u64
	}
}
