//! Story genres accepted by the story-generation backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Genre requested when a new story is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    /// `action`
    Action,
    /// `adventure`
    Adventure,
    /// `comedy`
    Comedy,
    /// `drama`
    Drama,
    /// `fantasy`
    Fantasy,
    /// `horror`
    Horror,
    /// `mystery`
    Mystery,
    /// `romance`
    Romance,
    /// `science fiction`, the only wire name containing a space.
    #[serde(rename = "science fiction")]
    ScienceFiction,
    /// `thriller`
    Thriller,
}

impl Genre {
    /// Wire name of the genre.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Adventure => "adventure",
            Self::Comedy => "comedy",
            Self::Drama => "drama",
            Self::Fantasy => "fantasy",
            Self::Horror => "horror",
            Self::Mystery => "mystery",
            Self::Romance => "romance",
            Self::ScienceFiction => "science fiction",
            Self::Thriller => "thriller",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
