//! This module provides the Gene struct, representing a gene
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use derive_builder::Builder;

/// Structure Representing a Gene
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Used to identify the gene
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable Gene Name
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Whether the gene is annotated as essential
    #[builder(default = "false")]
    pub essential: bool,
}

impl Gene {
    pub fn new(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            essential: false,
        }
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Hash for Gene {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
