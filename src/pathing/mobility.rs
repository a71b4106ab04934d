//! Mobility classes describe which terrain an agent type can traverse and how
//! fast, every path is planned for exactly one class
//!

use bevy::prelude::*;

/// ID of a [MobilityClass] within a [MobilityRegistry]
#[derive(
	serde::Deserialize, serde::Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect,
)]
pub struct MobilityClassId(u16);

impl MobilityClassId {
	/// Create a new instance of [MobilityClassId]
	pub fn new(index: u16) -> Self {
		MobilityClassId(index)
	}
	/// Get the registry index
	pub fn get(&self) -> usize {
		self.0 as usize
	}
}

/// A movement capability profile mapping terrain surface types to speed
/// modifiers
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Reflect)]
pub struct MobilityClass {
	/// Human readable label used in logging
	name: String,
	/// Speed modifier per surface type, indexed by the surface byte of the
	/// terrain. `0.0` means impassable, `1.0` full speed
	speed_mods: Vec<f32>,
}

impl MobilityClass {
	/// Create a new instance of [MobilityClass]
	pub fn new(name: &str, speed_mods: Vec<f32>) -> Self {
		if speed_mods.is_empty() {
			panic!("Mobility class '{name}' has no speed modifiers");
		}
		for speed_mod in speed_mods.iter() {
			if *speed_mod < 0.0 {
				panic!("Mobility class '{name}' has a negative speed modifier {speed_mod}");
			}
		}
		MobilityClass {
			name: name.to_string(),
			speed_mods,
		}
	}
	/// Get the label of the class
	pub fn get_name(&self) -> &str {
		&self.name
	}
	/// Speed modifier of a surface type. Unlisted surfaces are impassable
	pub fn speed_mod(&self, surface: u8) -> f32 {
		self.speed_mods.get(surface as usize).copied().unwrap_or(0.0)
	}
	/// Whether a surface type can be traversed at all
	pub fn is_passable(&self, surface: u8) -> bool {
		self.speed_mod(surface) > 0.0
	}
}

/// The set of [MobilityClass] definitions of a simulation, fixed at setup.
/// Coarse levels precompute data per class so the registry cannot grow once
/// the planner has been built
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, Reflect)]
pub struct MobilityRegistry {
	/// The registered classes, a [MobilityClassId] indexes into this list
	classes: Vec<MobilityClass>,
}

impl MobilityRegistry {
	/// Create a new instance of [MobilityRegistry]
	pub fn new(classes: Vec<MobilityClass>) -> Self {
		if classes.is_empty() {
			panic!("A planner needs at least one mobility class");
		}
		MobilityRegistry { classes }
	}
	/// Get the registered classes
	pub fn get_classes(&self) -> &[MobilityClass] {
		&self.classes
	}
	/// Number of registered classes
	pub fn len(&self) -> usize {
		self.classes.len()
	}
	/// Whether the registry is empty, never true for a built registry
	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}
	/// Lookup a class by id
	pub fn class(&self, id: MobilityClassId) -> &MobilityClass {
		&self.classes[id.get()]
	}
	/// Lookup a class by id, [None] for ids the registry never held
	pub fn get(&self, id: MobilityClassId) -> Option<&MobilityClass> {
		self.classes.get(id.get())
	}
	/// Iterate the classes with their ids
	pub fn iter(&self) -> impl Iterator<Item = (MobilityClassId, &MobilityClass)> {
		self.classes
			.iter()
			.enumerate()
			.map(|(i, c)| (MobilityClassId::new(i as u16), c))
	}
}
