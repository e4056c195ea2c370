pub mod characteristic;
pub mod dice;
pub mod modifiers;
pub mod profile;
pub mod rng;
pub mod target;

pub use characteristic::Characteristic;
pub use dice::{Amount, Die, MIN_THRESHOLD};
pub use modifiers::{
    catalog, ConditionalBonus, Exploding, Leader, Modifier, ModifierEffect, ModifierId,
    ModifierMetadata, MortalWounds, RerollScope, TargetEffect, TargetModifier, Trigger,
};
pub use profile::WeaponProfile;
pub use rng::DiceRng;
pub use target::Target;
