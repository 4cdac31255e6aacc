//! # Provinces
//!
//! The two-digit prefix of a cédula names the province of issuance. Codes
//! 01-24 follow the official alphabetical-era numbering; code 30 is used for
//! Ecuadorians registered abroad.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Province of issuance encoded in the first two digits of a cédula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Province {
    Azuay,
    Bolivar,
    Canar,
    Carchi,
    Cotopaxi,
    Chimborazo,
    ElOro,
    Esmeraldas,
    Guayas,
    Imbabura,
    Loja,
    LosRios,
    Manabi,
    MoronaSantiago,
    Napo,
    Pastaza,
    Pichincha,
    Tungurahua,
    ZamoraChinchipe,
    Galapagos,
    Sucumbios,
    Orellana,
    SantoDomingo,
    SantaElena,
    /// Registered at a consulate abroad (code 30).
    Exterior,
}

const BY_CODE: [Province; 24] = [
    Province::Azuay,
    Province::Bolivar,
    Province::Canar,
    Province::Carchi,
    Province::Cotopaxi,
    Province::Chimborazo,
    Province::ElOro,
    Province::Esmeraldas,
    Province::Guayas,
    Province::Imbabura,
    Province::Loja,
    Province::LosRios,
    Province::Manabi,
    Province::MoronaSantiago,
    Province::Napo,
    Province::Pastaza,
    Province::Pichincha,
    Province::Tungurahua,
    Province::ZamoraChinchipe,
    Province::Galapagos,
    Province::Sucumbios,
    Province::Orellana,
    Province::SantoDomingo,
    Province::SantaElena,
];

/// Code reserved for registrations abroad.
pub const EXTERIOR_CODE: u8 = 30;

impl Province {
    /// Map a two-digit code to its province. Returns `None` outside 1-24 and 30.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1..=24 => Some(BY_CODE[usize::from(code) - 1]),
            EXTERIOR_CODE => Some(Self::Exterior),
            _ => None,
        }
    }

    /// The two-digit code.
    pub fn code(self) -> u8 {
        match self {
            Self::Exterior => EXTERIOR_CODE,
            other => BY_CODE
                .iter()
                .position(|p| *p == other)
                .map_or(0, |i| i as u8 + 1),
        }
    }

    /// Display name in Spanish.
    pub fn name(self) -> &'static str {
        match self {
            Self::Azuay => "Azuay",
            Self::Bolivar => "Bolívar",
            Self::Canar => "Cañar",
            Self::Carchi => "Carchi",
            Self::Cotopaxi => "Cotopaxi",
            Self::Chimborazo => "Chimborazo",
            Self::ElOro => "El Oro",
            Self::Esmeraldas => "Esmeraldas",
            Self::Guayas => "Guayas",
            Self::Imbabura => "Imbabura",
            Self::Loja => "Loja",
            Self::LosRios => "Los Ríos",
            Self::Manabi => "Manabí",
            Self::MoronaSantiago => "Morona Santiago",
            Self::Napo => "Napo",
            Self::Pastaza => "Pastaza",
            Self::Pichincha => "Pichincha",
            Self::Tungurahua => "Tungurahua",
            Self::ZamoraChinchipe => "Zamora Chinchipe",
            Self::Galapagos => "Galápagos",
            Self::Sucumbios => "Sucumbíos",
            Self::Orellana => "Orellana",
            Self::SantoDomingo => "Santo Domingo de los Tsáchilas",
            Self::SantaElena => "Santa Elena",
            Self::Exterior => "Exterior",
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
