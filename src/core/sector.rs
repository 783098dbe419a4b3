use std::fmt;

/// The fixed sector choices offered when authoring a facility, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sector {
    Water,
    Energy,
    Education,
    Health,
}

pub const SECTOR_CHOICES: [Sector; 4] = [
    Sector::Water,
    Sector::Energy,
    Sector::Education,
    Sector::Health,
];

impl Sector {
    /// Value written into the answer.
    pub fn value(self) -> &'static str {
        match self {
            Sector::Water => "water",
            Sector::Energy => "energy",
            Sector::Education => "education",
            Sector::Health => "health",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sector::Water => "Water",
            Sector::Energy => "Energy",
            Sector::Education => "Education",
            Sector::Health => "Health",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        SECTOR_CHOICES.into_iter().find(|s| s.value() == value)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// How a stored sector value is presented: one of the fixed choices, the
/// freeform "other" path, or nothing chosen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorClass {
    Unset,
    Fixed(Sector),
    Other(String),
}

impl SectorClass {
    pub fn classify(value: Option<&str>) -> Self {
        match value {
            None | Some("") => SectorClass::Unset,
            Some(v) => match Sector::from_value(v) {
                Some(sector) => SectorClass::Fixed(sector),
                None => SectorClass::Other(v.to_string()),
            },
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, SectorClass::Other(_))
    }
}
