use super::field::Field;
use serde::{Deserialize, Serialize};

/// Table level options of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Explicit storage table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_table: Option<String>,
    /// Sets of field names whose combined values must be unique
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_together: Vec<Vec<String>>,
}

impl ModelOptions {
    pub fn db_table(mut self, table: &str) -> Self {
        self.db_table = Some(table.to_owned());
        self
    }

    pub fn unique_together(mut self, fields: &[&str]) -> Self {
        self.unique_together
            .push(fields.iter().map(|f| (*f).to_owned()).collect());
        self
    }
}

/// The shape of one model at some point of the transition history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    pub name: String,
    pub fields: Vec<Field>,
    pub options: ModelOptions,
}

impl ModelState {
    /// The key under which the model is stored in a project state
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Storage table name of this model inside the given app
    pub fn db_table(&self, app_label: &str) -> String {
        match &self.options.db_table {
            Some(table) => table.clone(),
            None => default_db_table(app_label, &self.name),
        }
    }

    /// Returns true if any field of this model references another model
    pub fn has_relations(&self) -> bool {
        self.fields.iter().any(|f| f.relation().is_some())
    }

    /// Maps a set of field names onto their column names
    pub fn columns_of(&self, fields: &[String]) -> Vec<String> {
        fields
            .iter()
            .map(|name| match self.field(name) {
                Some(field) => field.column(),
                None => name.clone(),
            })
            .collect()
    }
}

pub fn default_db_table(app_label: &str, model_name: &str) -> String {
    format!("{}_{}", app_label, model_name.to_lowercase())
}
