//! This module provides the metabolite struct representing a metabolite

use std::hash::Hash;

use derive_builder::Builder;

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(setter(into, strip_option), default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(setter(into, strip_option), default = "None")]
    pub formula: Option<String>,
}

impl Metabolite {
    /// Create a metabolite with only an id and compartment
    pub fn new(id: &str, compartment: Option<&str>) -> Self {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: compartment.map(str::to_string),
            charge: 0,
            formula: None,
        }
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state); // Hash by id
                             // If the metabolite has an associated compartment, also hash by that
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}
