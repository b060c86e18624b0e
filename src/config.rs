use std::{collections::BTreeMap, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    battle::{
        ability::AbilityDefinition,
        component::{BaseStats, Combatant, EnergyGain, Stats},
        effect::EffectDefinition,
        AbilityId, EffectId, Id, Team,
    },
    error::{Error, Result},
    map::Position,
};

/// The canonical rule set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub actions_per_turn: u32,
    pub dash_damage: u32,
    /// Share of max power restored on every turn reset, in percent.
    pub regen_percent: u32,
    pub base_movement: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            actions_per_turn: 3,
            dash_damage: 15,
            regen_percent: 20,
            base_movement: 3,
        }
    }
}

/// Lookup of configured definitions.
pub trait Definitions: fmt::Debug + Send + Sync {
    fn ability(&self, id: &AbilityId) -> Option<&AbilityDefinition>;
    fn effect(&self, id: &EffectId) -> Option<&EffectDefinition>;
    fn character(&self, name: &str) -> Option<&CharacterDefinition>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterDefinition {
    pub name: String,
    pub class: String,
    pub stats: BaseStats,

    #[serde(default)]
    pub max_energy: u32,

    #[serde(default)]
    pub energy_gain: EnergyGain,

    pub abilities: Vec<AbilityId>,
}

impl CharacterDefinition {
    pub fn spawn(
        &self,
        id: Id,
        team: Team,
        position: Position,
        definitions: &dyn Definitions,
    ) -> Result<Combatant> {
        let stats: Stats = self.stats.into();
        let mut combatant = Combatant::new(id, &self.name, team, position, stats)
            .with_class(&self.class)
            .with_energy(self.max_energy)
            .with_energy_gain(self.energy_gain);
        for ability_id in &self.abilities {
            let ability = definitions
                .ability(ability_id)
                .ok_or_else(|| Error::UnknownAbility {
                    character: self.name.clone(),
                    ability: ability_id.clone(),
                })?;
            combatant = combatant.with_ability(ability.clone());
        }
        Ok(combatant)
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(default)]
    abilities: Vec<AbilityDefinition>,

    #[serde(default)]
    effects: Vec<EffectDefinition>,

    #[serde(default)]
    characters: Vec<CharacterDefinition>,
}

/// All the definitions a battle can refer to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    abilities: BTreeMap<AbilityId, AbilityDefinition>,
    effects: BTreeMap<EffectId, EffectDefinition>,
    characters: BTreeMap<String, CharacterDefinition>,
}

impl Catalog {
    /// Parses and validates a RON catalog.
    ///
    /// Every reference to an ability or a named effect must resolve.
    pub fn from_ron_str(s: &str) -> Result<Self> {
        let raw: RawCatalog = ron::de::from_str(s)?;
        let mut catalog = Catalog::default();
        for effect in raw.effects {
            catalog.effects.insert(effect.id.clone(), effect);
        }
        for ability in raw.abilities {
            catalog.add_ability(ability)?;
        }
        for character in raw.characters {
            catalog.add_character(character)?;
        }
        debug!(
            "Catalog: {} abilities, {} effects, {} characters",
            catalog.abilities.len(),
            catalog.effects.len(),
            catalog.characters.len()
        );
        Ok(catalog)
    }

    pub fn add_effect(&mut self, effect: EffectDefinition) {
        self.effects.insert(effect.id.clone(), effect);
    }

    pub fn add_ability(&mut self, ability: AbilityDefinition) -> Result {
        if let Some(effect) = ability
            .referenced_effects()
            .find(|&id| !self.effects.contains_key(id))
        {
            return Err(Error::UnknownEffect {
                ability: ability.id.clone(),
                effect: effect.clone(),
            });
        }
        self.abilities.insert(ability.id.clone(), ability);
        Ok(())
    }

    pub fn add_character(&mut self, character: CharacterDefinition) -> Result {
        if let Some(ability) = character
            .abilities
            .iter()
            .find(|&id| !self.abilities.contains_key(id))
        {
            return Err(Error::UnknownAbility {
                character: character.name.clone(),
                ability: ability.clone(),
            });
        }
        self.characters.insert(character.name.clone(), character);
        Ok(())
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.abilities.values()
    }

    pub fn effects(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.effects.values()
    }

    pub fn characters(&self) -> impl Iterator<Item = &CharacterDefinition> {
        self.characters.values()
    }

    /// Builds a combatant from the named character.
    pub fn spawn(&self, name: &str, id: Id, team: Team, position: Position) -> Result<Combatant> {
        let character = self
            .character(name)
            .ok_or_else(|| Error::UnknownCharacter(name.into()))?;
        character.spawn(id, team, position, self)
    }
}

impl Definitions for Catalog {
    fn ability(&self, id: &AbilityId) -> Option<&AbilityDefinition> {
        self.abilities.get(id)
    }

    fn effect(&self, id: &EffectId) -> Option<&EffectDefinition> {
        self.effects.get(id)
    }

    fn character(&self, name: &str) -> Option<&CharacterDefinition> {
        self.characters.get(name)
    }
}
