// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

mod common;

use common::{all_profiles, round_trip, sample};
use xlink::{
	accessor::ResourceAccessor,
	hash::name_hash,
	model::{
		condition::{CompareType, PropertyType},
		container::ContainerType,
		AssetCall, AssetCallTarget, Condition, ConditionValue, ContainerKind, Param, ParamSet, ParamValue,
		SwitchCondition, User,
	},
	res::condition::ResSwitchCondition,
	schema::{DefaultValue, ParamCategory, ParamDefine},
	Error, PointerWidth, Profile, Resource, SystemKind,
};

fn header_only(profile: Profile, version: u32) -> Vec<u8> {
	let size = profile.header_size();
	let mut data = b"XLNK".to_vec();
	data.extend((size as u32).to_le_bytes());
	data.extend(version.to_le_bytes());
	data.resize(size as usize, 0);
	// every table position points at the end of the header
	let positions: &[usize] = if profile.is_wide() {
		&[0x18, 0x20, 0x40, 0x50, 0x58]
	} else {
		&[0x18, 0x1C, 0x38, 0x40, 0x44]
	};
	let width = profile.pointer_size() as usize;
	for &pos in positions {
		data[pos..pos + width].copy_from_slice(&size.to_le_bytes()[..width]);
	}
	data
}

#[test]
fn header_only_buffer_is_an_empty_resource() {
	for profile in all_profiles() {
		for system in enum_iterator::all::<SystemKind>() {
			let data = header_only(profile, profile.version(system));
			let resource = xlink::decode(&data, profile).unwrap();
			assert!(resource.is_empty(), "{profile}");
			assert_eq!(resource, Resource::new(profile, system));

			let encoded = xlink::encode(&resource, profile).unwrap();
			assert_eq!(encoded.len() as u64, profile.header_size());
			assert_eq!(&encoded[0..4], b"XLNK");
			assert_eq!(u32::from_le_bytes(encoded[8..12].try_into().unwrap()), profile.version(system));
			assert_eq!(encoded, data);
		}
	}
}

fn switch_resource(profile: Profile, property_type: PropertyType) -> Resource {
	let mut resource = Resource::new(profile, SystemKind::ELink);
	let enum_name = resource.strings.intern("WeatherType");
	resource.conditions.push(Condition::Switch(SwitchCondition {
		property_type,
		compare_type: CompareType::Equal,
		is_global: true,
		action_hash: 0,
		value: ConditionValue::Int(if profile.compact_tags() { 4 } else { 0 }),
		enum_name: (property_type == PropertyType::Enum).then_some(enum_name),
	}));
	resource
}

fn condition_table_size(data: &[u8], profile: Profile) -> u64 {
	let accessor = ResourceAccessor::load(data, profile).unwrap();
	accessor.name_table_pos() - accessor.condition_table_pos()
}

#[test]
fn enum_switch_conditions_cost_one_pointer_more() {
	for profile in all_profiles().into_iter().filter(|profile| profile.compact_tags()) {
		let (enum_data, decoded) = round_trip(&switch_resource(profile, PropertyType::Enum), profile);
		let (int_data, _) = round_trip(&switch_resource(profile, PropertyType::S32), profile);
		assert_eq!(
			condition_table_size(&enum_data, profile),
			condition_table_size(&int_data, profile) + profile.pointer_size()
		);
		assert_eq!(
			condition_table_size(&enum_data, profile),
			ResSwitchCondition::size(profile, true)
		);

		let Condition::Switch(switch) = &decoded.conditions[0] else {
			panic!("expected a switch condition");
		};
		assert_eq!(decoded.string(switch.enum_name.unwrap()), Some("WeatherType"));
		assert_eq!(switch.value, ConditionValue::Int(4));
	}
}

#[test]
fn blitz_enum_switch_conditions_keep_the_name_in_the_value() {
	let profile = Profile::BLITZ;
	let (data, decoded) = round_trip(&switch_resource(profile, PropertyType::Enum), profile);
	assert_eq!(condition_table_size(&data, profile), 0x14);
	let Condition::Switch(switch) = &decoded.conditions[0] else {
		panic!("expected a switch condition");
	};
	assert_eq!(decoded.string(switch.enum_name.unwrap()), Some("WeatherType"));
}

#[test]
fn container_calls_resolve_through_container_offsets() {
	for profile in all_profiles() {
		let (_, decoded) = round_trip(&sample(profile, SystemKind::ELink), profile);
		let user = decoded.user("Player").unwrap();
		let root = &user.asset_calls[1];
		assert!(root.is_container());
		assert_eq!(root.target, AssetCallTarget::Container(0));
		let container = &user.containers[0];
		assert!(matches!(container.kind, ContainerKind::Switch(_)));
		for child in container.children() {
			let call = &user.asset_calls[child as usize];
			assert!(!call.is_container());
			assert!(call.condition.is_some());
		}
	}
}

fn masked_resource(slots: &[usize]) -> Resource {
	let mut resource = Resource::new(Profile::TOTK, SystemKind::SLink);
	resource.strings.intern("Masked");
	for i in 0..4 {
		let name = resource.schema.strings.intern(&format!("Param{i}"));
		resource.schema.asset_params.push(ParamDefine {
			name,
			default: DefaultValue::Bitfield(0),
		});
	}
	resource.asset_params.push(ParamSet::new(slots.iter().map(|&slot| Param {
		slot,
		value: ParamValue::Bitfield(slot as u32 * 0x10),
	})));
	resource
}

#[test]
fn sparse_masks_keep_their_slots() {
	let profile = Profile::TOTK;
	let (data, decoded) = round_trip(&masked_resource(&[3, 1]), profile);
	let set = &decoded.asset_params[0];
	assert_eq!(set.params.iter().map(|param| param.slot).collect::<Vec<_>>(), [1, 3]);
	assert_eq!(set.get(3).unwrap().value, ParamValue::Bitfield(0x30));

	let accessor = ResourceAccessor::load(&data, profile).unwrap();
	assert_eq!(accessor.asset_param(0).unwrap().mask, 0b1010);
	assert_eq!(accessor.header().num_params, 2);
}

#[test]
fn key_hashes_are_crc32_of_the_key_names() {
	for profile in all_profiles() {
		let (data, decoded) = round_trip(&sample(profile, SystemKind::SLink), profile);
		let accessor = ResourceAccessor::load(&data, profile).unwrap();
		assert_eq!(accessor.user_hash(0), Some(name_hash("Player")));
		let user = decoded.user("Player").unwrap();
		for (i, call) in user.asset_calls.iter().enumerate() {
			let stored = accessor.asset_call(0, i).unwrap();
			assert_eq!(stored.key_name_hash, name_hash(decoded.string(call.key_name).unwrap()));
			let expected_index = if call.is_container() {
				-1
			} else {
				user.asset_calls[..i].iter().filter(|call| !call.is_container()).count() as i16
			};
			assert_eq!(stored.asset_index, expected_index);
		}
		assert!(accessor.asset_call(0, user.asset_calls.len()).is_none());
	}
}

#[test]
fn sorted_asset_ids_follow_key_condition_and_position() {
	let profile = Profile::THUNDER;
	let resource = sample(profile, SystemKind::ELink);
	// key names: Se_Jump, Root, Se_Walk, Se_Jump with conditions None, None, 0, 1
	let (data, _) = round_trip(&resource, profile);
	let accessor = ResourceAccessor::load(&data, profile).unwrap();
	assert_eq!(accessor.sorted_asset_ids(0).unwrap(), [1, 0, 3, 2]);

	// files whose lookup table was ordered differently decode to the same model and are rewritten in
	// this order, so they do not reencode byte exact
	let ids_pos = accessor.user_offset(0).unwrap() as usize
		+ 0x38
		+ profile.pointer_size() as usize
		+ 4 * accessor.param_define_table().unwrap().num_user_params as usize;
	let mut shuffled = data.clone();
	shuffled[ids_pos..ids_pos + 8].copy_from_slice(&[0, 0, 1, 0, 2, 0, 3, 0]);
	let decoded = xlink::decode(&shuffled, profile).unwrap();
	assert_eq!(decoded, xlink::decode(&data, profile).unwrap());
	assert_eq!(xlink::encode(&decoded, profile).unwrap(), data);
	assert_ne!(shuffled, data);
}

#[test]
fn inconsistent_models_are_rejected() {
	let profile = Profile::TOTK;
	let base = sample(profile, SystemKind::SLink);
	let player = name_hash("Player");

	let mut flag = base.clone();
	flag.users.get_mut(&player).unwrap().asset_calls[0].flag = 1;
	assert!(matches!(xlink::encode(&flag, profile), Err(Error::Inconsistent(_))));

	let mut dangling = base.clone();
	dangling.users.get_mut(&player).unwrap().asset_calls[2].condition = Some(99);
	assert!(matches!(
		xlink::encode(&dangling, profile),
		Err(Error::UnresolvedReference { table: "condition", .. })
	));

	let mut string_slot = base.clone();
	let se_jump = string_slot.strings.find("Se_Jump").unwrap();
	string_slot.asset_params[0].params[0].value = ParamValue::String(se_jump);
	assert!(matches!(
		xlink::encode(&string_slot, profile),
		Err(Error::SchemaMismatch {
			category: ParamCategory::Asset,
			slot: 0,
			..
		})
	));

	let mut wide_value = base.clone();
	wide_value.trigger_overwrite_params[1].params[0].value = ParamValue::Bitfield(0x100_0000);
	assert!(matches!(xlink::encode(&wide_value, profile), Err(Error::Overflow { .. })));

	let mut unknown_slot = base.clone();
	unknown_slot.trigger_overwrite_params[0].params[0].slot = 5;
	assert!(matches!(
		xlink::encode(&unknown_slot, profile),
		Err(Error::UnknownParam { slot: 5, .. })
	));

	let mut missing_user_param = base.clone();
	missing_user_param.users.get_mut(&player).unwrap().params.clear();
	assert!(matches!(
		xlink::encode(&missing_user_param, profile),
		Err(Error::Inconsistent(_))
	));
}

#[test]
fn unreachable_containers_and_arrange_groups_are_rejected() {
	let profile = Profile::TOTK;
	let mut resource = sample(profile, SystemKind::ELink);
	common::add_container_user(&mut resource, profile, "Switcher", ContainerType::Switch);
	let user = resource.user_mut("Switcher").unwrap();
	let orphan = user.containers[0].clone();
	user.containers.push(orphan);
	assert!(matches!(xlink::encode(&resource, profile), Err(Error::Inconsistent(_))));

	let user = resource.user_mut("Switcher").unwrap();
	let mut call = user.asset_calls[0].clone();
	call.guid = 103;
	call.target = AssetCallTarget::Container(1);
	user.asset_calls.push(call);
	let (_, decoded) = round_trip(&resource, profile);
	let user = decoded.user("Switcher").unwrap();
	assert_eq!(user.containers.len(), 2);
	assert_eq!(user.asset_calls[3].target, AssetCallTarget::Container(1));

	let mut arrange = sample(profile, SystemKind::ELink);
	let group = arrange.arrange_group_params[0].clone();
	arrange.arrange_group_params.push(group);
	assert!(matches!(xlink::encode(&arrange, profile), Err(Error::Inconsistent(_))));

	arrange.user_mut("Player").unwrap().params[0] = ParamValue::ArrangeParam(1);
	let (_, decoded) = round_trip(&arrange, profile);
	assert_eq!(decoded.arrange_group_params.len(), 2);
	assert_eq!(decoded.user("Player").unwrap().params[0], ParamValue::ArrangeParam(1));
}

#[test]
fn offsets_past_the_file_are_errors() {
	let profile = Profile::TOTK;
	let write_u64 = |data: &mut Vec<u8>, pos: usize, value: u64| {
		data[pos..pos + 8].copy_from_slice(&value.to_le_bytes());
	};

	let mut header = header_only(profile, profile.version(SystemKind::ELink));
	write_u64(&mut header, 0x20, u64::MAX - 4);
	header[0x28..0x2C].copy_from_slice(&1u32.to_le_bytes());
	assert!(matches!(
		xlink::decode(&header, profile),
		Err(Error::UnresolvedOffset {
			table: "local property table",
			..
		})
	));

	let (data, _) = round_trip(&sample(profile, SystemKind::ELink), profile);
	let accessor = ResourceAccessor::load(&data, profile).unwrap();
	let user_pos = accessor.user_offset(0).unwrap() as usize;
	let num_user_params = accessor.param_define_table().unwrap().num_user_params as usize;

	let mut user_offset = data.clone();
	let user_offset_table = (profile.header_size() as usize + 4).next_multiple_of(8);
	write_u64(&mut user_offset, user_offset_table, u64::MAX);
	assert!(matches!(
		xlink::decode(&user_offset, profile),
		Err(Error::OutOfBounds { table: "user", .. })
	));

	let mut trigger_table = data.clone();
	write_u64(&mut trigger_table, user_pos + 0x30, u64::MAX);
	assert!(matches!(
		xlink::decode(&trigger_table, profile),
		Err(Error::UnresolvedOffset {
			table: "trigger table",
			..
		})
	));

	// one local property, then the user params and four sorted asset ids
	let calls_pos = user_pos + 0x38 + 8 + 4 * num_user_params + 8;
	let mut container = data.clone();
	write_u64(&mut container, calls_pos + 0x30 + 0x20, u64::MAX - 8);
	assert!(matches!(
		xlink::decode(&container, profile),
		Err(Error::UnresolvedOffset { table: "container", .. })
	));
}

#[test]
fn stale_key_hashes_are_recomputed() {
	let profile = Profile::TOTK;
	let (data, decoded) = round_trip(&sample(profile, SystemKind::ELink), profile);
	let accessor = ResourceAccessor::load(&data, profile).unwrap();
	let num_user_params = accessor.param_define_table().unwrap().num_user_params as usize;
	let calls_pos = accessor.user_offset(0).unwrap() as usize + 0x38 + 8 + 4 * num_user_params + 8;

	let mut stale = data.clone();
	stale[calls_pos + 0x18..calls_pos + 0x1C].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
	let reread = xlink::decode(&stale, profile).unwrap();
	assert_eq!(reread, decoded);
	assert_eq!(xlink::encode(&reread, profile).unwrap(), data);
}

#[test]
fn profile_only_fields_are_rejected_elsewhere() {
	let totk = sample(Profile::TOTK, SystemKind::ELink);
	let mut blitz = totk.clone();
	blitz.version = Profile::BLITZ.version(SystemKind::ELink);
	assert!(matches!(xlink::encode(&blitz, Profile::BLITZ), Err(Error::Unsupported(_))));
	assert!(matches!(
		xlink::encode(&totk, Profile::BLITZ),
		Err(Error::UnknownVersion(0x24))
	));

	let mut grid = sample(Profile::BLITZ, SystemKind::ELink);
	common::add_container_user(&mut grid, Profile::THUNDER, "Grid", ContainerType::Grid);
	grid.user_mut("Grid").unwrap().containers[0].flags = None;
	grid.user_mut("Grid").unwrap().unknown = None;
	assert!(matches!(xlink::encode(&grid, Profile::BLITZ), Err(Error::Unsupported(_))));
}

#[test]
fn corrupt_condition_tags_are_structural_errors() {
	let profile = Profile::TOTK.with_pointer_width(PointerWidth::Bits32);
	let (mut data, _) = round_trip(&sample(profile, SystemKind::ELink), profile);
	let pos = ResourceAccessor::load(&data, profile).unwrap().condition_table_pos() as usize;
	data[pos] = 9;
	assert!(matches!(
		xlink::decode(&data, profile),
		Err(Error::InvalidTag { kind: "condition", value: 9 })
	));
}

#[test]
fn user_names_hash_to_their_keys() {
	let mut resource = Resource::new(Profile::TOTK, SystemKind::ELink);
	let hash = resource.insert_user("Link", User::default());
	assert_eq!(hash, crc32fast::hash(b"Link"));
	let call = AssetCall {
		key_name: resource.strings.intern("Se_Link"),
		flag: 0,
		duration: 0,
		parent_index: -1,
		guid: 0,
		condition: None,
		target: AssetCallTarget::Asset(0),
	};
	assert!(!call.is_container());
}
