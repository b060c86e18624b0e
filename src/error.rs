use std::{error, fmt};

use crate::battle::{AbilityId, EffectId};

#[derive(Debug, derive_more::From)]
pub enum Error {
    RonDeserializeError(ron::de::Error),

    #[from(ignore)]
    UnknownAbility {
        character: String,
        ability: AbilityId,
    },

    #[from(ignore)]
    UnknownEffect {
        ability: AbilityId,
        effect: EffectId,
    },

    #[from(ignore)]
    UnknownCharacter(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::RonDeserializeError(ref e) => write!(f, "Can't deserialize the catalog: {}", e),
            Error::UnknownAbility { character, ability } => {
                write!(f, "Character '{}' refers to unknown ability '{}'", character, ability)
            }
            Error::UnknownEffect { ability, effect } => {
                write!(f, "Ability '{}' refers to unknown effect '{}'", ability, effect)
            }
            Error::UnknownCharacter(ref name) => write!(f, "No character named '{}'", name),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::RonDeserializeError(ref e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T = ()> = std::result::Result<T, Error>;
