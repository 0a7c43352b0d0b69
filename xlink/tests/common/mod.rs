// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use xlink::{
	model::{
		condition::{BlendType, CompareType, PropertyType},
		container::ContainerType,
		Action, ActionSlot, ActionTrigger, ActionTriggerStart, AlwaysTrigger, ArrangeGroupParam, ArrangeGroupParams,
		AssetCall, AssetCallTarget, BlendCondition, Condition, ConditionValue, Container, ContainerFlags,
		ContainerKind, Curve, CurvePoint, DirectValue, GridContainer, Param, ParamSet, ParamValue, Property,
		PropertyTrigger, RandomCondition, RandomKind, RandomRange, SequenceCondition, SwitchCondition,
		SwitchContainer, User,
	},
	schema::{DefaultValue, ParamDefine},
	PointerWidth, Profile, Resource, SystemKind, Target,
};

pub fn all_profiles() -> Vec<Profile> {
	enum_iterator::all::<Target>()
		.flat_map(|target| {
			enum_iterator::all::<PointerWidth>().map(move |width| Profile::new(target).with_pointer_width(width))
		})
		.collect()
}

pub fn round_trip(resource: &Resource, profile: Profile) -> (Vec<u8>, Resource) {
	let first = xlink::encode(resource, profile).unwrap_or_else(|err| panic!("{profile}: {err}"));
	let decoded = xlink::decode(&first, profile).unwrap_or_else(|err| panic!("{profile}: {err}"));
	let second = xlink::encode(&decoded, profile).unwrap_or_else(|err| panic!("{profile}: {err}"));
	assert_eq!(first, second, "{profile}: re-encoding changed the bytes");
	let redecoded = xlink::decode(&second, profile).unwrap_or_else(|err| panic!("{profile}: {err}"));
	assert_eq!(decoded, redecoded, "{profile}: re-decoding changed the model");
	(first, decoded)
}

fn define(resource: &mut Resource, name: &str, default: DefaultValue) -> ParamDefine {
	ParamDefine {
		name: resource.schema.strings.intern(name),
		default,
	}
}

/// A resource that touches every table, with one user whose root call is a switch container
pub fn sample(profile: Profile, system: SystemKind) -> Resource {
	let compact = profile.compact_tags();
	let mut resource = Resource::new(profile, system);

	let bank_default = resource.schema.strings.intern("DefaultBank");
	resource.schema.user_params = vec![define(&mut resource, "Priority", DefaultValue::Int(-1))];
	resource.schema.asset_params = vec![
		define(&mut resource, "Volume", DefaultValue::Float(1.0)),
		define(&mut resource, "Pitch", DefaultValue::Float(1.0)),
		define(&mut resource, "Bank", DefaultValue::String(bank_default)),
		define(&mut resource, "Delay", DefaultValue::Int(0)),
	];
	resource.schema.trigger_params = vec![
		define(&mut resource, "Volume", DefaultValue::Float(1.0)),
		define(&mut resource, "Loop", DefaultValue::Bool(false)),
	];
	resource.schema.system_asset_param_count = 1;

	let strings = &mut resource.strings;
	let speed = strings.intern("Speed");
	let mode = strings.intern("Mode");
	let mode_type = strings.intern("ModeType");
	let height = strings.intern("Height");
	let se_jump = strings.intern("Se_Jump");
	let se_walk = strings.intern("Se_Walk");
	let root = strings.intern("Root");
	let main = strings.intern("Main");
	let jump = strings.intern("Jump");
	let walk = strings.intern("Walk");
	let group = strings.intern("Group");

	resource.local_property_names = vec![speed, mode];
	resource.local_property_enum_names = vec![mode_type];
	resource.direct_values = vec![DirectValue::Float(0.5), DirectValue::Int(-3), DirectValue::Bool(true)];
	resource.random_calls = vec![RandomRange { min: 0.8, max: 1.2 }];
	resource.curves = vec![Curve {
		property_name: speed,
		property_index: 0,
		curve_type: 1,
		is_global: false,
		unknown: 0,
		unknown2: 0,
		points: vec![CurvePoint { x: 0.0, y: 0.0 }, CurvePoint { x: 1.0, y: 2.0 }],
	}];
	resource.asset_params = vec![
		ParamSet::new([
			Param {
				slot: 0,
				value: ParamValue::Direct(0),
			},
			Param {
				slot: 2,
				value: ParamValue::String(se_jump),
			},
			Param {
				slot: 3,
				value: ParamValue::Direct(1),
			},
		]),
		ParamSet::new([
			Param {
				slot: 0,
				value: ParamValue::Curve(0),
			},
			Param {
				slot: 1,
				value: ParamValue::Random(RandomKind::Pow2, 0),
			},
		]),
		ParamSet::new([Param {
			slot: 3,
			value: ParamValue::ArrangeParam(0),
		}]),
	];
	resource.trigger_overwrite_params = vec![
		ParamSet::new([Param {
			slot: 1,
			value: ParamValue::Direct(2),
		}]),
		ParamSet::new([Param {
			slot: 0,
			value: ParamValue::Bitfield(0x12),
		}]),
	];
	resource.arrange_group_params = vec![ArrangeGroupParams {
		groups: vec![ArrangeGroupParam {
			group_name: group,
			limit_type: 1,
			limit_threshold: 2,
			unknown: 0,
		}],
	}];
	resource.conditions = vec![
		Condition::Switch(SwitchCondition {
			property_type: PropertyType::S32,
			compare_type: CompareType::Equal,
			is_global: false,
			action_hash: 0,
			value: ConditionValue::Int(1),
			enum_name: None,
		}),
		Condition::Switch(SwitchCondition {
			property_type: PropertyType::Enum,
			compare_type: CompareType::NotEqual,
			is_global: true,
			action_hash: 0,
			value: ConditionValue::Int(if compact { 2 } else { 0 }),
			enum_name: Some(mode_type),
		}),
	];

	let user = User {
		local_properties: vec![height],
		params: vec![ParamValue::Direct(1)],
		asset_calls: vec![
			AssetCall {
				key_name: se_jump,
				flag: 0,
				duration: 0,
				parent_index: -1,
				guid: 1,
				condition: None,
				target: AssetCallTarget::Asset(0),
			},
			AssetCall {
				key_name: root,
				flag: 1,
				duration: -1,
				parent_index: -1,
				guid: 2,
				condition: None,
				target: AssetCallTarget::Container(0),
			},
			AssetCall {
				key_name: se_walk,
				flag: 0,
				duration: 30,
				parent_index: 1,
				guid: 3,
				condition: Some(0),
				target: AssetCallTarget::Asset(1),
			},
			AssetCall {
				key_name: se_jump,
				flag: 0,
				duration: 0,
				parent_index: 1,
				guid: 4,
				condition: Some(1),
				target: AssetCallTarget::Asset(2),
			},
		],
		containers: vec![Container {
			child_start: 2,
			child_count: 2,
			flags: compact.then_some(ContainerFlags::default()),
			kind: ContainerKind::Switch(switch_container(profile, mode)),
		}],
		action_slots: vec![ActionSlot {
			name: main,
			action_start: 0,
			action_count: 1,
		}],
		actions: vec![Action {
			name: jump,
			trigger_start: 0,
			trigger_count: 2,
			enable_match_start: compact.then_some(true),
		}],
		action_triggers: vec![
			ActionTrigger {
				guid: 5,
				unknown: 0,
				asset_call: 0,
				start: ActionTriggerStart::Frame(-1),
				end_frame: 10,
				trigger_once: true,
				fade: false,
				always_trigger: false,
				overwrite_hash: 0,
				trigger_overwrite: Some(0),
			},
			ActionTrigger {
				guid: 6,
				unknown: 0,
				asset_call: 3,
				start: ActionTriggerStart::PreviousAction(walk),
				end_frame: -1,
				trigger_once: false,
				fade: true,
				always_trigger: false,
				overwrite_hash: 7,
				trigger_overwrite: None,
			},
		],
		properties: vec![Property {
			name: speed,
			is_global: false,
			trigger_start: 0,
			trigger_count: 1,
		}],
		property_triggers: vec![PropertyTrigger {
			guid: 8,
			flag: 0,
			overwrite_hash: 0,
			asset_call: 1,
			condition: Some(0),
			trigger_overwrite: Some(1),
		}],
		always_triggers: vec![AlwaysTrigger {
			guid: 9,
			flag: 0,
			overwrite_hash: 0,
			asset_call: 0,
			trigger_overwrite: None,
		}],
		unknown: profile.has_user_extra().then_some(3),
	};
	resource.insert_user("Player", user);
	resource
}

pub fn switch_container(profile: Profile, watched: xlink::strings::StringRef) -> SwitchContainer {
	SwitchContainer {
		action_slot_name: watched,
		watch_property_id: 1,
		property_index: 1,
		is_global: true,
		is_action_trigger: profile.compact_tags().then_some(false),
	}
}

/// A container of the given kind as the profile stores it, watching `watched` where it needs to
pub fn container_of(profile: Profile, kind: ContainerType, watched: xlink::strings::StringRef) -> Container {
	let compact = profile.compact_tags();
	let mut flags = compact.then_some(ContainerFlags::default());
	let kind = match kind {
		ContainerType::Switch => ContainerKind::Switch(switch_container(profile, watched)),
		ContainerType::Random => ContainerKind::Random,
		ContainerType::Random2 => ContainerKind::Random2,
		ContainerType::Blend if compact => {
			flags = Some(ContainerFlags {
				is_not_blend_all: true,
				is_need_observe: true,
			});
			ContainerKind::Blend(Some(switch_container(profile, watched)))
		}
		ContainerType::Blend => ContainerKind::Blend(None),
		ContainerType::Sequence => ContainerKind::Sequence,
		ContainerType::Grid => ContainerKind::Grid(GridContainer {
			property_name1: watched,
			property_name2: watched,
			property_index1: 0,
			property_index2: -1,
			is_global1: false,
			is_global2: true,
			values1: vec![0, 1],
			values2: vec![7],
			indices: vec![0, 1],
		}),
		ContainerType::Jump => ContainerKind::Jump,
	};
	Container {
		child_start: 1,
		child_count: 2,
		flags,
		kind,
	}
}

pub fn condition_of(kind: ContainerType, index: i32) -> Condition {
	match kind {
		ContainerType::Switch => Condition::Switch(SwitchCondition {
			property_type: PropertyType::S32,
			compare_type: CompareType::GreaterThanOrEqual,
			is_global: false,
			action_hash: 0,
			value: ConditionValue::Int(index),
			enum_name: None,
		}),
		ContainerType::Random => Condition::Random(RandomCondition { weight: 0.25 }),
		ContainerType::Random2 => Condition::Random2(RandomCondition { weight: 0.75 }),
		ContainerType::Blend => Condition::Blend(BlendCondition {
			min: 0.0,
			max: 1.0,
			blend_type_to_max: BlendType::Multiply,
			blend_type_to_min: BlendType::SetToOne,
		}),
		ContainerType::Sequence => Condition::Sequence(SequenceCondition { continue_on_fade: index }),
		ContainerType::Grid => Condition::Grid,
		ContainerType::Jump => Condition::Jump,
	}
}

/// Adds a user whose root call is a container of `kind` with two conditioned children
pub fn add_container_user(resource: &mut Resource, profile: Profile, name: &str, kind: ContainerType) {
	let watched = resource.strings.intern("Watched");
	let key = resource.strings.intern(name);
	let first_condition = resource.conditions.len();
	resource.conditions.push(condition_of(kind, 0));
	resource.conditions.push(condition_of(kind, 1));
	if resource.asset_params.is_empty() {
		resource.asset_params.push(ParamSet::default());
	}

	let child = |guid: u32, condition: usize| AssetCall {
		key_name: key,
		flag: 0,
		duration: 0,
		parent_index: 0,
		guid,
		condition: Some(condition),
		target: AssetCallTarget::Asset(0),
	};
	let user = User {
		params: vec![ParamValue::Bitfield(0); resource.schema.user_params.len()],
		asset_calls: vec![
			AssetCall {
				key_name: key,
				flag: 1,
				duration: 0,
				parent_index: -1,
				guid: 100,
				condition: None,
				target: AssetCallTarget::Container(0),
			},
			child(101, first_condition),
			child(102, first_condition + 1),
		],
		containers: vec![container_of(profile, kind, watched)],
		unknown: profile.has_user_extra().then_some(0),
		..Default::default()
	};
	resource.insert_user(name, user);
}
