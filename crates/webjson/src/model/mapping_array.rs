use std::fmt;

use serde::{Deserialize, Serialize};

/// A named list of strings, `{"elements": [...]}` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingArray {
    #[serde(default)]
    elements: Option<Vec<String>>,
}

impl MappingArray {
    pub fn new(elements: Vec<String>) -> Self {
        Self {
            elements: Some(elements),
        }
    }

    pub fn elements(&self) -> Option<&[String]> {
        self.elements.as_deref()
    }

    pub fn set_elements(&mut self, elements: Option<Vec<String>>) {
        self.elements = elements;
    }

    /// Iterates the elements; yields nothing when they are absent.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().flatten().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a MappingArray {
    type Item = &'a str;
    type IntoIter = Box<dyn Iterator<Item = &'a str> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Display for MappingArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.elements {
            None => f.write_str("-NONE-"),
            Some(elements) => f.write_str(&elements.join(", ")),
        }
    }
}
