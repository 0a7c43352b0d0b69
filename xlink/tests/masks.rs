// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use proptest::prop_assert_eq;
use test_strategy::proptest;
use xlink::{
	accessor::ResourceAccessor,
	model::{Param, ParamSet, ParamValue},
	schema::{DefaultValue, ParamDefine},
	Profile, Resource, SystemKind,
};

fn bitfield_resource(profile: Profile, asset_mask: u64, trigger_mask: u32, payload: u32) -> Resource {
	let mut resource = Resource::new(profile, SystemKind::ELink);
	resource.strings.intern("Unused");
	let name = resource.schema.strings.intern("Flags");
	let define = ParamDefine {
		name,
		default: DefaultValue::Bitfield(0),
	};
	resource.schema.asset_params = vec![define.clone(); 64];
	resource.schema.trigger_params = vec![define; 32];

	let params = |mask: u64| {
		ParamSet::new((0..64).filter(|bit| mask & 1 << bit != 0).map(|slot| Param {
			slot,
			value: ParamValue::Bitfield((payload ^ slot as u32) & 0xFF_FFFF),
		}))
	};
	resource.asset_params.push(params(asset_mask));
	resource.trigger_overwrite_params.push(params(trigger_mask as u64));
	resource
}

#[proptest]
fn masks_survive_a_round_trip(asset_mask: u64, trigger_mask: u32, #[strategy(0u32..0x100_0000)] payload: u32) {
	for profile in [Profile::TOTK, Profile::BLITZ] {
		let resource = bitfield_resource(profile, asset_mask, trigger_mask, payload);
		let data = xlink::encode(&resource, profile).unwrap();
		let decoded = xlink::decode(&data, profile).unwrap();

		for (set, mask) in [
			(&decoded.asset_params[0], asset_mask),
			(&decoded.trigger_overwrite_params[0], trigger_mask as u64),
		] {
			prop_assert_eq!(set.len() as u32, mask.count_ones());
			let slots = set.params.iter().map(|param| param.slot).collect::<Vec<_>>();
			let mut ascending = slots.clone();
			ascending.sort_unstable();
			ascending.dedup();
			prop_assert_eq!(slots, ascending);
			prop_assert_eq!(set.mask(64), Some(mask));
		}
		prop_assert_eq!(&decoded.asset_params, &resource.asset_params);
		prop_assert_eq!(&decoded.trigger_overwrite_params, &resource.trigger_overwrite_params);

		let accessor = ResourceAccessor::load(&data, profile).unwrap();
		prop_assert_eq!(accessor.asset_param(0).unwrap().mask, asset_mask);
		prop_assert_eq!(accessor.trigger_overwrite_param(0).unwrap().mask, trigger_mask);
		prop_assert_eq!(xlink::encode(&decoded, profile).unwrap(), data);
	}
}
