// src/schema/dims.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed, ordered set of canonical category labels.
pub trait Dimension: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Name the dimension is exposed under in output metadata.
    const NAME: &'static str;
    /// Every category, in canonical order.
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.label() == label)
    }
}

macro_rules! dimension {
    (
        $(#[$meta:meta])*
        $name:ident = $dim:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Dimension for $name {
            const NAME: &'static str = $dim;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

dimension! {
    /// Adult age bands.
    AgeGroup = "ageGroup" {
        A18To24 => "18-24",
        A25To34 => "25-34",
        A35To44 => "35-44",
        A45To54 => "45-54",
        A55To64 => "55-64",
        A65Plus => "65+",
    }
}

dimension! {
    Sex = "sex" {
        Male => "Male",
        Female => "Female",
    }
}

dimension! {
    /// Race/ethnicity. Hispanic origin takes precedence over race.
    RaceEth = "raceEth" {
        White => "White",
        Black => "Black",
        Hispanic => "Hispanic",
        Asian => "Asian",
        Other => "Other",
    }
}

dimension! {
    /// Highest educational attainment, population aged 25+.
    Education = "education" {
        NoHighSchool => "No HS",
        HighSchool => "HS",
        SomeCollege => "Some college",
        Bachelors => "BA/BS",
        PostGrad => "Post-grad",
    }
}

dimension! {
    CensusRegion = "censusRegion" {
        Northeast => "Northeast",
        Midwest => "Midwest",
        South => "South",
        West => "West",
        Territories => "Territories",
    }
}

impl Sex {
    /// Numeric code handed to the downstream model (Census person-record coding).
    pub fn code(&self) -> u8 {
        match self {
            Sex::Male => 1,
            Sex::Female => 2,
        }
    }
}
