// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use super::{Decoder, RawParam};
use crate::{
	error::{Error, Result},
	hash,
	model::{
		Action, ActionSlot, ActionTrigger, ActionTriggerStart, AlwaysTrigger, AssetCall, AssetCallTarget, Container,
		ContainerFlags, ContainerKind, GridContainer, Property, PropertyTrigger, SwitchContainer, User,
		ValueReferenceType,
	},
	res::{
		container::{ContainerType, ResContainerBase, ResGridContainerParam, ResSwitchContainerParam},
		user::{
			ResAction, ResActionSlot, ResActionTrigger, ResAlwaysTrigger, ResAssetCallTable, ResProperty,
			ResPropertyTrigger, ResUserHeader,
		},
		ResParam, TargetPointer,
	},
};

impl Decoder<'_> {
	/// Rejects table positions past the end of the file, before any count is added to them
	fn table_pos<T>(&self, pos: u64) -> Result<u64> {
		if pos > self.accessor.file_size() {
			return Err(Error::UnresolvedOffset {
				table: std::any::type_name::<T>(),
				offset: pos,
			});
		}
		Ok(pos)
	}

	/// Reads `count` consecutive records starting at `pos`
	fn records<T>(&self, pos: u64, count: usize, size: u64) -> Result<Vec<T>>
	where
		T: for<'b> binrw::BinRead<Args<'b> = crate::profile::Profile>,
	{
		let pos = self.table_pos::<T>(pos)?;
		(0..count as u64)
			.map(|i| self.accessor.read_at::<T>(pos + size * i, self.profile))
			.collect()
	}

	fn fixed_records<T>(&self, pos: u64, count: usize, size: u64) -> Result<Vec<T>>
	where
		T: for<'b> binrw::BinRead<Args<'b> = ()>,
	{
		let pos = self.table_pos::<T>(pos)?;
		(0..count as u64)
			.map(|i| self.accessor.read_at::<T>(pos + size * i, ()))
			.collect()
	}

	pub(super) fn user(&mut self, index: usize) -> Result<(User, Vec<RawParam>)> {
		let num_users = self.accessor.header().num_users as u64;
		let out_of_bounds = || Error::OutOfBounds {
			table: "user",
			index: index as u64,
			count: num_users,
		};
		let user_pos = self.accessor.user_offset(index).ok_or_else(out_of_bounds)?;
		let header = self.accessor.read_at::<ResUserHeader>(user_pos, ())?;
		let ptr = self.profile.pointer_size();

		let mut pos = user_pos + ResUserHeader::SIZE;
		let local_properties = self
			.records::<TargetPointer>(pos, header.local_property_count as usize, ptr)?
			.into_iter()
			.map(|offset| self.string(offset.0))
			.collect::<Result<Vec<_>>>()?;
		pos += ptr * header.local_property_count as u64;

		let num_user_params = self.schema.user_params.len();
		let params = self
			.fixed_records::<ResParam>(pos, num_user_params, ResParam::SIZE)?
			.into_iter()
			.enumerate()
			.map(|(slot, param)| RawParam::from_res(slot, param))
			.collect::<Result<Vec<_>>>()?;
		for param in &params {
			if param.reference_type == ValueReferenceType::ArrangeParam {
				self.arrange_offsets.insert(param.value as u64);
			}
		}
		pos += ResParam::SIZE * num_user_params as u64;

		// sorted asset ids are derived data, skip them along with their padding
		let call_count = header.call_count as usize;
		pos += 2 * (call_count + call_count % 2) as u64;

		let call_size = ResAssetCallTable::size(self.profile);
		let res_calls = self.records::<ResAssetCallTable>(pos, call_count, call_size)?;
		let container_base = pos + call_size * call_count as u64;

		let container_offsets = res_calls
			.iter()
			.filter(|call| call.is_container())
			.map(|call| call.param_offset.0)
			.collect::<BTreeSet<_>>();
		let container_indices = container_offsets
			.iter()
			.enumerate()
			.map(|(i, offset)| (*offset, i))
			.collect::<HashMap<_, _>>();

		let asset_calls = res_calls
			.iter()
			.map(|call| self.asset_call(call, &container_indices))
			.collect::<Result<Vec<_>>>()?;
		let containers = container_offsets
			.iter()
			.map(|&offset| {
				let pos = container_base.checked_add(offset).ok_or(Error::UnresolvedOffset {
					table: "container",
					offset,
				})?;
				self.container(pos)
			})
			.collect::<Result<Vec<_>>>()?;

		let mut pos = user_pos
			.checked_add(header.trigger_table_offset)
			.ok_or(Error::UnresolvedOffset {
				table: "trigger table",
				offset: header.trigger_table_offset,
			})?;
		let action_slots = self
			.records::<ResActionSlot>(pos, header.action_slot_count as usize, ResActionSlot::size(self.profile))?
			.into_iter()
			.map(|slot| {
				Ok(ActionSlot {
					name: self.string(slot.name_offset.0)?,
					action_start: slot.action_start,
					action_count: slot.action_end.wrapping_sub(slot.action_start),
				})
			})
			.collect::<Result<Vec<_>>>()?;
		pos += ResActionSlot::size(self.profile) * header.action_slot_count as u64;

		let actions = self
			.records::<ResAction>(pos, header.action_count as usize, ResAction::size(self.profile))?
			.into_iter()
			.map(|action| {
				Ok(Action {
					name: self.string(action.name_offset.0)?,
					trigger_start: action.trigger_start,
					trigger_count: action.trigger_end.wrapping_sub(action.trigger_start),
					enable_match_start: self.profile.compact_tags().then_some(action.enable_match_start),
				})
			})
			.collect::<Result<Vec<_>>>()?;
		pos += ResAction::size(self.profile) * header.action_count as u64;

		let action_triggers = self
			.fixed_records::<ResActionTrigger>(pos, header.action_trigger_count as usize, ResActionTrigger::SIZE)?
			.into_iter()
			.map(|trigger| {
				let start = if trigger.flags.name_match() {
					ActionTriggerStart::PreviousAction(self.string(trigger.start)?)
				} else {
					ActionTriggerStart::Frame(trigger.start_frame())
				};
				Ok(ActionTrigger {
					guid: trigger.guid,
					unknown: trigger.unknown,
					asset_call: self.asset_call_index(trigger.asset_call_offset, call_count)?,
					start,
					end_frame: trigger.end_frame,
					trigger_once: trigger.flags.trigger_once(),
					fade: trigger.flags.fade(),
					always_trigger: trigger.flags.always_trigger(),
					overwrite_hash: trigger.overwrite_hash,
					trigger_overwrite: self.trigger_overwrite_index(trigger.overwrite_param_offset)?,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		pos += ResActionTrigger::SIZE * header.action_trigger_count as u64;

		let properties = self
			.records::<ResProperty>(pos, header.property_count as usize, ResProperty::size(self.profile))?
			.into_iter()
			.map(|property| {
				Ok(Property {
					name: self.string(property.name_offset.0)?,
					is_global: property.is_global != 0,
					trigger_start: property.trigger_start,
					trigger_count: property.trigger_end.wrapping_sub(property.trigger_start),
				})
			})
			.collect::<Result<Vec<_>>>()?;
		pos += ResProperty::size(self.profile) * header.property_count as u64;

		let property_triggers = self
			.fixed_records::<ResPropertyTrigger>(pos, header.property_trigger_count as usize, ResPropertyTrigger::SIZE)?
			.into_iter()
			.map(|trigger| {
				Ok(PropertyTrigger {
					guid: trigger.guid,
					flag: trigger.flag,
					overwrite_hash: trigger.overwrite_hash,
					asset_call: self.asset_call_index(trigger.asset_call_offset, call_count)?,
					condition: self.condition_index(trigger.condition_offset)?,
					trigger_overwrite: self.trigger_overwrite_index(trigger.overwrite_param_offset)?,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		pos += ResPropertyTrigger::SIZE * header.property_trigger_count as u64;

		let always_triggers = self
			.fixed_records::<ResAlwaysTrigger>(pos, header.always_trigger_count as usize, ResAlwaysTrigger::SIZE)?
			.into_iter()
			.map(|trigger| {
				Ok(AlwaysTrigger {
					guid: trigger.guid,
					flag: trigger.flag,
					overwrite_hash: trigger.overwrite_hash,
					asset_call: self.asset_call_index(trigger.asset_call_offset, call_count)?,
					trigger_overwrite: self.trigger_overwrite_index(trigger.overwrite_param_offset)?,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		let user = User {
			local_properties,
			params: vec![],
			asset_calls,
			containers,
			action_slots,
			actions,
			action_triggers,
			properties,
			property_triggers,
			always_triggers,
			unknown: self.profile.has_user_extra().then_some(header.unknown),
		};
		// stored counts are derived from the asset calls and rewritten by the encoder
		if user.asset_count() != header.asset_count as usize {
			warn!(
				stored = header.asset_count,
				counted = user.asset_count(),
				"user asset count does not match its asset calls"
			);
		}
		Ok((user, params))
	}

	fn asset_call(&self, call: &ResAssetCallTable, containers: &HashMap<u64, usize>) -> Result<AssetCall> {
		let key_name = self.string(call.key_name_offset.0)?;
		// the encoder hashes the key name again, so a stale hash is only reported
		if let Ok(name) = self.strings.resolve(key_name) {
			if hash::name_hash(name) != call.key_name_hash {
				warn!(name, stored = call.key_name_hash, "asset call key name hash mismatch");
			}
		}
		let target = if call.is_container() {
			AssetCallTarget::Container(containers.get(&call.param_offset.0).copied().ok_or(
				Error::UnresolvedOffset {
					table: "container",
					offset: call.param_offset.0,
				},
			)?)
		} else {
			AssetCallTarget::Asset(
				self.asset_param_offsets
					.get(&call.param_offset.0)
					.copied()
					.ok_or(Error::UnresolvedOffset {
						table: "asset param",
						offset: call.param_offset.0,
					})?,
			)
		};
		Ok(AssetCall {
			key_name,
			flag: call.flag,
			duration: call.duration,
			parent_index: call.parent_index,
			guid: call.guid,
			condition: self.condition_index(call.condition_offset.0)?,
			target,
		})
	}

	/// Asset calls are referenced by their offset into the user's asset call table
	fn asset_call_index(&self, offset: u64, call_count: usize) -> Result<usize> {
		let size = ResAssetCallTable::size(self.profile);
		let index = (offset / size) as usize;
		if offset % size != 0 || index >= call_count {
			return Err(Error::UnresolvedOffset {
				table: "asset call",
				offset,
			});
		}
		Ok(index)
	}

	fn container(&self, pos: u64) -> Result<Container> {
		let base = self.accessor.read_at::<ResContainerBase>(pos, self.profile)?;
		let container_type = ContainerType::try_from(base.container_type)
			.ok()
			.filter(|kind| kind.is_supported(self.profile))
			.ok_or(Error::InvalidTag {
				kind: "container",
				value: base.container_type,
			})?;
		let payload = pos + ResContainerBase::size(self.profile);
		let kind = match container_type {
			ContainerType::Switch => ContainerKind::Switch(self.switch_container(payload)?),
			ContainerType::Random => ContainerKind::Random,
			ContainerType::Random2 => ContainerKind::Random2,
			ContainerType::Blend if self.profile.compact_tags() && base.is_not_blend_all => {
				ContainerKind::Blend(Some(self.switch_container(payload)?))
			}
			ContainerType::Blend => ContainerKind::Blend(None),
			ContainerType::Sequence => ContainerKind::Sequence,
			ContainerType::Grid => {
				let grid = self.accessor.read_at::<ResGridContainerParam>(payload, self.profile)?;
				ContainerKind::Grid(GridContainer {
					property_name1: self.string(grid.property_name_offset1.0)?,
					property_name2: self.string(grid.property_name_offset2.0)?,
					property_index1: grid.property_index1,
					property_index2: grid.property_index2,
					is_global1: grid.flags.is_property1_global(),
					is_global2: grid.flags.is_property2_global(),
					values1: grid.values1,
					values2: grid.values2,
					indices: grid.indices,
				})
			}
			ContainerType::Jump => ContainerKind::Jump,
		};
		Ok(Container {
			child_start: base.child_start,
			child_count: base.child_end.wrapping_sub(base.child_start),
			flags: self.profile.has_container_flags().then_some(ContainerFlags {
				is_not_blend_all: base.is_not_blend_all,
				is_need_observe: base.is_need_observe,
			}),
			kind,
		})
	}

	fn switch_container(&self, pos: u64) -> Result<SwitchContainer> {
		let res = self.accessor.read_at::<ResSwitchContainerParam>(pos, self.profile)?;
		Ok(SwitchContainer {
			action_slot_name: self.string(res.action_slot_name_offset.0)?,
			watch_property_id: res.watch_property_id,
			property_index: res.property_index,
			is_global: res.is_global,
			is_action_trigger: self.profile.compact_tags().then_some(res.is_action_trigger),
		})
	}
}
