use std::collections::HashMap;

use rand::Rng;

use crate::ids::TemplateId;
use crate::template::Template;
use crate::weighted::{select_weighted, total_weight};

/// Error type for catalog construction.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    DuplicateId(TemplateId),
    InvalidWeight { id: TemplateId, weight: f64 },
    EmptyName(TemplateId),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate template id {}", id),
            Self::InvalidWeight { id, weight } => {
                write!(f, "{} has invalid spawn weight {}", id, weight)
            }
            Self::EmptyName(id) => write!(f, "{} has an empty name", id),
        }
    }
}

impl std::error::Error for CatalogError {}

/// The read-only set of templates available to a spawner.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
    index: HashMap<TemplateId, usize>,
    total_weight: f64,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<Template>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            if template.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(template.id));
            }
            if !template.weight.is_finite() || template.weight < 0.0 {
                return Err(CatalogError::InvalidWeight {
                    id: template.id,
                    weight: template.weight,
                });
            }
            if index.insert(template.id, i).is_some() {
                return Err(CatalogError::DuplicateId(template.id));
            }
        }

        let total_weight = total_weight(&templates, |t| t.weight);
        Ok(Self {
            templates,
            index,
            total_weight,
        })
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.index.get(&id).map(|&i| &self.templates[i])
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Weighted pick over the whole catalog; falls back to the first template.
    pub fn pick(&self, rng: &mut impl Rng) -> Option<&Template> {
        select_weighted(&self.templates, self.total_weight, |t| t.weight, rng)
            .or_else(|| self.templates.first())
    }

    /// Largest same-kind radius declared by any template.
    pub fn max_same_kind_radius(&self) -> f64 {
        self.templates
            .iter()
            .filter_map(|t| t.same_kind_radius)
            .fold(0.0, f64::max)
    }
}
