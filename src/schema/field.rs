//! Field definitions of a model
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to dependent rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Delete the dependent rows as well
    Cascade,
    /// Clear the reference on the dependent rows
    SetNull,
    /// Refuse to delete the referenced row
    Protect,
}

impl OnDelete {
    /// The SQL referential action
    pub fn as_sql(self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Protect => "RESTRICT",
        }
    }
}

/// The target side of a foreign key or one-to-one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Name of the referenced model, compared case-insensitively
    pub to: String,
    pub on_delete: OnDelete,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// 32 bit auto incrementing integer
    Auto,
    /// 64 bit auto incrementing integer
    BigAuto,
    Char { max_length: u32 },
    Text,
    Boolean,
    Date,
    Integer,
    ForeignKey(Relation),
    OneToOne(Relation),
}

/// Default value of a field, used to fill existing rows when the field is added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDefault {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Bool(b) => write!(f, "{}", b),
            FieldDefault::Int(i) => write!(f, "{}", i),
            FieldDefault::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// A single field of a model
///
/// Use the constructors together with the builder methods to describe fields the way they are
/// declared in a transition:
///
/// ```
/// use roombook_schema::schema::{Field, OnDelete};
///
/// let field = Field::foreign_key("user", "UserRoomBooking", OnDelete::SetNull)
///     .null()
///     .related_name("policies");
///
/// assert_eq!(field.column(), "user_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub null: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
}

impl Field {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            null: false,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    pub fn auto(name: &str) -> Self {
        Self::new(name, FieldKind::Auto).primary_key()
    }

    pub fn big_auto(name: &str) -> Self {
        Self::new(name, FieldKind::BigAuto).primary_key()
    }

    pub fn char(name: &str, max_length: u32) -> Self {
        Self::new(name, FieldKind::Char { max_length })
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn foreign_key(name: &str, to: &str, on_delete: OnDelete) -> Self {
        Self::new(
            name,
            FieldKind::ForeignKey(Relation {
                to: to.to_owned(),
                on_delete,
                related_name: None,
            }),
        )
    }

    /// A one-to-one field. The column is unique, or the primary key if marked as such.
    pub fn one_to_one(name: &str, to: &str, on_delete: OnDelete) -> Self {
        let mut field = Self::new(
            name,
            FieldKind::OneToOne(Relation {
                to: to.to_owned(),
                on_delete,
                related_name: None,
            }),
        );
        field.unique = true;
        field
    }

    pub fn null(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, default: impl Into<FieldDefault>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn related_name(mut self, related_name: &str) -> Self {
        if let FieldKind::ForeignKey(relation) | FieldKind::OneToOne(relation) = &mut self.kind {
            relation.related_name = Some(related_name.to_owned());
        }
        self
    }

    /// Returns the relation if this field references another model
    pub fn relation(&self) -> Option<&Relation> {
        match &self.kind {
            FieldKind::ForeignKey(relation) | FieldKind::OneToOne(relation) => Some(relation),
            _ => None,
        }
    }

    pub(crate) fn relation_mut(&mut self) -> Option<&mut Relation> {
        match &mut self.kind {
            FieldKind::ForeignKey(relation) | FieldKind::OneToOne(relation) => Some(relation),
            _ => None,
        }
    }

    /// Name of the column backing this field
    ///
    /// Relation fields are stored as `<name>_id`.
    pub fn column(&self) -> String {
        if self.relation().is_some() {
            format!("{}_id", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self.kind, FieldKind::Auto | FieldKind::BigAuto)
    }
}

impl From<bool> for FieldDefault {
    fn from(value: bool) -> Self {
        FieldDefault::Bool(value)
    }
}

impl From<i64> for FieldDefault {
    fn from(value: i64) -> Self {
        FieldDefault::Int(value)
    }
}

impl From<&str> for FieldDefault {
    fn from(value: &str) -> Self {
        FieldDefault::Text(value.to_owned())
    }
}
