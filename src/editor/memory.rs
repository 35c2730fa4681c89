//! In-memory relational store
//!
//! Holds rows and enforces primary keys, not-null, uniqueness and foreign keys including their
//! on-delete actions. Structural changes arrive through the [`SchemaEditor`] implementation.
use super::{ApplyError, SchemaEditor};
use crate::schema::{
    Field, FieldDefault, FieldKind, ModelState, OnDelete, ProjectState, SchemaError,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("table `{0}` already exists")]
    TableExists(String),
    #[error("table `{0}` does not exist")]
    TableNotFound(String),
    #[error("column `{table}.{column}` already exists")]
    ColumnExists { table: String, column: String },
    #[error("column `{table}.{column}` does not exist")]
    ColumnNotFound { table: String, column: String },
    #[error("`{table}` is still referenced by `{by}`")]
    Referenced { table: String, by: String },
    #[error("null value in column `{table}.{column}` violates not-null constraint")]
    NotNull { table: String, column: String },
    #[error("duplicate key value violates unique constraint on `{table}` ({})", .columns.join(", "))]
    Unique { table: String, columns: Vec<String> },
    #[error("`{table}.{column}` references a missing row in `{target}`")]
    ForeignKey {
        table: String,
        column: String,
        target: String,
    },
    #[error("row of `{table}` is protected by `{by}`")]
    Protected { table: String, by: String },
    #[error("value of `{table}.{column}` has the wrong type")]
    TypeMismatch { table: String, column: String },
    #[error("value of `{table}.{column}` exceeds {max} characters")]
    TooLong {
        table: String,
        column: String,
        max: u32,
    },
    #[error("no row of `{table}` matches the key")]
    RowNotFound { table: String },
    #[error("sequence of `{table}.{column}` is exhausted")]
    SequenceExhausted { table: String, column: String },
}

/// A single stored value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Date(d) => write!(f, "{}", d),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<&FieldDefault> for Value {
    fn from(value: &FieldDefault) -> Self {
        match value {
            FieldDefault::Bool(b) => Value::Bool(*b),
            FieldDefault::Int(i) => Value::Int(*i),
            FieldDefault::Text(s) => Value::Text(s.clone()),
        }
    }
}

pub type Row = BTreeMap<String, Value>;

/// Builds a row from column/value pairs
pub fn row<const N: usize>(values: [(&str, Value); N]) -> Row {
    values
        .into_iter()
        .map(|(column, value)| (column.to_owned(), value))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInt,
    Varchar(u32),
    Text,
    Boolean,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default: Option<Value>,
    pub references: Option<ForeignKey>,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("INTEGER"),
            ColumnType::BigInt => f.write_str("BIGINT"),
            ColumnType::Varchar(max) => write!(f, "VARCHAR({})", max),
            ColumnType::Text => f.write_str("TEXT"),
            ColumnType::Boolean => f.write_str("BOOLEAN"),
            ColumnType::Date => f.write_str("DATE"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;

        if !self.nullable {
            f.write_str(" NOT NULL")?;
        }
        if self.auto_increment {
            f.write_str(" AUTO INCREMENT")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        if let Some(fk) = &self.references {
            write!(
                f,
                " REFERENCES {}({}) ON DELETE {}",
                fk.table,
                fk.column,
                fk.on_delete.as_sql()
            )?;
        }

        Ok(())
    }
}

impl Column {
    fn check(&self, table: &str, value: &Value) -> Result<()> {
        let matches = match (self.ty, value) {
            (_, Value::Null) => true,
            (ColumnType::Integer, Value::Int(i)) => i32::try_from(*i).is_ok(),
            (ColumnType::BigInt, Value::Int(_)) => true,
            (ColumnType::Varchar(max), Value::Text(s)) => {
                if s.chars().count() > max as usize {
                    return Err(StoreError::TooLong {
                        table: table.to_owned(),
                        column: self.name.clone(),
                        max,
                    });
                }
                true
            }
            (ColumnType::Text, Value::Text(_)) => true,
            (ColumnType::Boolean, Value::Bool(_)) => true,
            (ColumnType::Date, Value::Date(_)) => true,
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            Err(StoreError::TypeMismatch {
                table: table.to_owned(),
                column: self.name.clone(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    primary_key: String,
    unique_together: Vec<Vec<String>>,
    rows: Vec<Row>,
    /// `None` once a key of `i64::MAX` was stored
    next_id: Option<i64>,
}

impl Table {
    pub fn new(columns: Vec<Column>, primary_key: &str) -> Self {
        Self {
            columns,
            primary_key: primary_key.to_owned(),
            unique_together: Vec::new(),
            rows: Vec::new(),
            next_id: Some(1),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn unique_together(&self) -> &[Vec<String>] {
        &self.unique_together
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the first set of columns whose values repeat across two rows
    fn duplicate(&self) -> Option<Vec<String>> {
        let single = self
            .columns
            .iter()
            .filter(|c| c.unique || c.name == self.primary_key)
            .map(|c| vec![c.name.clone()]);

        single
            .chain(self.unique_together.iter().cloned())
            .find(|set| {
                let mut seen = Vec::new();
                self.rows.iter().any(|row| match tuple(row, set) {
                    Some(values) if seen.contains(&values) => true,
                    Some(values) => {
                        seen.push(values);
                        false
                    }
                    None => false,
                })
            })
    }
}

/// The values of `columns` in `row`, or `None` if any of them is null
fn tuple(row: &Row, columns: &[String]) -> Option<Vec<Value>> {
    columns
        .iter()
        .map(|c| row.get(c).filter(|v| !v.is_null()).cloned())
        .collect()
}

/// Tables holding rows, keyed by table name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDatabase {
    tables: BTreeMap<String, Table>,
}

impl MemoryDatabase {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn table_or_err(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_owned()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_owned()))
    }

    /// Returns the row whose primary key equals `key`
    pub fn get(&self, table: &str, key: &Value) -> Option<&Row> {
        let table = self.tables.get(table)?;
        table
            .rows
            .iter()
            .find(|row| row.get(&table.primary_key) == Some(key))
    }

    /// Every `(table, column, foreign key)` referencing `target`
    fn referrers(&self, target: &str) -> Vec<(String, String, ForeignKey)> {
        self.tables
            .iter()
            .flat_map(|(name, table)| {
                table.columns.iter().filter_map(move |c| match &c.references {
                    Some(fk) if fk.table == target => {
                        Some((name.clone(), c.name.clone(), fk.clone()))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    pub fn create_table(&mut self, name: &str, table: Table) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(StoreError::TableExists(name.to_owned()));
        }

        for fk in table.columns.iter().filter_map(|c| c.references.as_ref()) {
            if fk.table != name && !self.tables.contains_key(&fk.table) {
                return Err(StoreError::TableNotFound(fk.table.clone()));
            }
        }

        log::trace!("create table {}", name);
        self.tables.insert(name.to_owned(), table);

        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.table_or_err(name)?;

        if let Some((table, column, _)) = self
            .referrers(name)
            .into_iter()
            .find(|(table, _, _)| table != name)
        {
            return Err(StoreError::Referenced {
                table: name.to_owned(),
                by: format!("{}.{}", table, column),
            });
        }

        log::trace!("drop table {}", name);
        self.tables.remove(name);

        Ok(())
    }

    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<()> {
        if self.tables.contains_key(new) {
            return Err(StoreError::TableExists(new.to_owned()));
        }

        let table = self
            .tables
            .remove(old)
            .ok_or_else(|| StoreError::TableNotFound(old.to_owned()))?;
        self.tables.insert(new.to_owned(), table);

        for table in self.tables.values_mut() {
            for fk in table.columns.iter_mut().filter_map(|c| c.references.as_mut()) {
                if fk.table == old {
                    fk.table = new.to_owned();
                }
            }
        }

        Ok(())
    }

    pub fn add_column(&mut self, table_name: &str, column: Column) -> Result<()> {
        let table = self.table_or_err(table_name)?;

        if table.column(&column.name).is_some() {
            return Err(StoreError::ColumnExists {
                table: table_name.to_owned(),
                column: column.name,
            });
        }

        let fill = column.default.clone().unwrap_or(Value::Null);
        if !table.rows.is_empty() {
            if fill.is_null() && !column.nullable {
                return Err(StoreError::NotNull {
                    table: table_name.to_owned(),
                    column: column.name,
                });
            }

            column.check(table_name, &fill)?;

            if !fill.is_null() {
                if column.unique && table.rows.len() > 1 {
                    return Err(StoreError::Unique {
                        table: table_name.to_owned(),
                        columns: vec![column.name],
                    });
                }

                if let Some(fk) = &column.references {
                    self.check_reference(table_name, &column.name, fk, &fill)?;
                }
            }
        }

        let table = self.table_mut(table_name)?;
        for row in &mut table.rows {
            row.insert(column.name.clone(), fill.clone());
        }
        table.columns.push(column);

        Ok(())
    }

    pub fn drop_column(&mut self, table_name: &str, column: &str) -> Result<()> {
        let table = self.table_or_err(table_name)?;

        if table.column(column).is_none() {
            return Err(StoreError::ColumnNotFound {
                table: table_name.to_owned(),
                column: column.to_owned(),
            });
        }

        if let Some((other, other_column, _)) = self
            .referrers(table_name)
            .into_iter()
            .find(|(_, _, fk)| fk.column == column)
        {
            return Err(StoreError::Referenced {
                table: format!("{}.{}", table_name, column),
                by: format!("{}.{}", other, other_column),
            });
        }

        let table = self.table_mut(table_name)?;
        table.columns.retain(|c| c.name != column);
        table
            .unique_together
            .retain(|set| !set.iter().any(|c| c == column));
        for row in &mut table.rows {
            row.remove(column);
        }

        Ok(())
    }

    pub fn rename_column(&mut self, table_name: &str, old: &str, new: &str) -> Result<()> {
        let table = self.table_mut(table_name)?;

        if table.column(new).is_some() {
            return Err(StoreError::ColumnExists {
                table: table_name.to_owned(),
                column: new.to_owned(),
            });
        }

        let column = table
            .columns
            .iter_mut()
            .find(|c| c.name == old)
            .ok_or_else(|| StoreError::ColumnNotFound {
                table: table_name.to_owned(),
                column: old.to_owned(),
            })?;
        column.name = new.to_owned();

        if table.primary_key == old {
            table.primary_key = new.to_owned();
        }

        for set in &mut table.unique_together {
            for column in set.iter_mut().filter(|c| c.as_str() == old) {
                *column = new.to_owned();
            }
        }

        for row in &mut table.rows {
            if let Some(value) = row.remove(old) {
                row.insert(new.to_owned(), value);
            }
        }

        for table in self.tables.values_mut() {
            for fk in table.columns.iter_mut().filter_map(|c| c.references.as_mut()) {
                if fk.table == table_name && fk.column == old {
                    fk.column = new.to_owned();
                }
            }
        }

        Ok(())
    }

    /// Replaces the unique column sets, rejecting sets already violated by stored rows
    pub fn set_unique_together(&mut self, table_name: &str, sets: Vec<Vec<String>>) -> Result<()> {
        let table = self.table_mut(table_name)?;

        for column in sets.iter().flatten() {
            if table.column(column).is_none() {
                return Err(StoreError::ColumnNotFound {
                    table: table_name.to_owned(),
                    column: column.clone(),
                });
            }
        }

        let previous = std::mem::replace(&mut table.unique_together, sets);

        if let Some(columns) = table.duplicate() {
            table.unique_together = previous;
            return Err(StoreError::Unique {
                table: table_name.to_owned(),
                columns,
            });
        }

        Ok(())
    }

    fn check_reference(
        &self,
        table: &str,
        column: &str,
        fk: &ForeignKey,
        value: &Value,
    ) -> Result<()> {
        let target = self.table_or_err(&fk.table)?;

        if target.rows.iter().any(|row| row.get(&fk.column) == Some(value)) {
            Ok(())
        } else {
            Err(StoreError::ForeignKey {
                table: table.to_owned(),
                column: column.to_owned(),
                target: fk.table.clone(),
            })
        }
    }

    /// Inserts a row and returns its primary key
    ///
    /// Omitted serial columns are generated, other omitted columns take their default or null.
    pub fn insert(&mut self, table_name: &str, values: Row) -> Result<Value> {
        let table = self.table_or_err(table_name)?;

        if let Some(unknown) = values.keys().find(|k| table.column(k).is_none()) {
            return Err(StoreError::ColumnNotFound {
                table: table_name.to_owned(),
                column: unknown.clone(),
            });
        }

        let mut next_id = table.next_id;
        let mut row = Row::new();

        for column in &table.columns {
            let value = match values.get(&column.name) {
                Some(value) => value.clone(),
                None if column.auto_increment => match next_id {
                    Some(id) => Value::Int(id),
                    None => {
                        return Err(StoreError::SequenceExhausted {
                            table: table_name.to_owned(),
                            column: column.name.clone(),
                        })
                    }
                },
                None => column.default.clone().unwrap_or(Value::Null),
            };

            if column.auto_increment {
                if let (Some(current), Value::Int(id)) = (next_id, &value) {
                    next_id = id.checked_add(1).map(|next| current.max(next));
                }
            }

            if value.is_null() {
                if !column.nullable {
                    return Err(StoreError::NotNull {
                        table: table_name.to_owned(),
                        column: column.name.clone(),
                    });
                }
            } else {
                column.check(table_name, &value)?;

                if let Some(fk) = &column.references {
                    // self references may point at the row being inserted
                    let own_key = fk.table == table_name
                        && values.get(&fk.column).map_or(false, |v| v == &value);
                    if !own_key {
                        self.check_reference(table_name, &column.name, fk, &value)?;
                    }
                }
            }

            row.insert(column.name.clone(), value);
        }

        let key = row.get(&table.primary_key).cloned().unwrap_or(Value::Null);

        let table = self.table_mut(table_name)?;
        table.rows.push(row);

        if let Some(columns) = table.duplicate() {
            table.rows.pop();
            return Err(StoreError::Unique {
                table: table_name.to_owned(),
                columns,
            });
        }

        table.next_id = next_id;

        Ok(key)
    }

    /// Deletes the row with the given primary key, applying the on-delete actions of every
    /// reference to it
    ///
    /// Returns the number of deleted rows, including cascaded ones. Either all actions succeed or
    /// the database is left untouched.
    pub fn delete(&mut self, table_name: &str, key: &Value) -> Result<usize> {
        let primary_key = self.table_or_err(table_name)?.primary_key.clone();

        let mut scratch = self.clone();
        let deleted = scratch.delete_where(table_name, &primary_key, key)?;

        if deleted == 0 {
            return Err(StoreError::RowNotFound {
                table: table_name.to_owned(),
            });
        }

        *self = scratch;

        Ok(deleted)
    }

    fn delete_where(&mut self, table_name: &str, column: &str, value: &Value) -> Result<usize> {
        if value.is_null() {
            return Ok(0);
        }

        let table = self.table_mut(table_name)?;
        let (doomed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(&mut table.rows)
            .into_iter()
            .partition(|row| row.get(column) == Some(value));
        table.rows = kept;

        let mut deleted = doomed.len();

        for (other, other_column, fk) in self.referrers(table_name) {
            for row in &doomed {
                let key = match row.get(&fk.column) {
                    Some(key) if !key.is_null() => key,
                    _ => continue,
                };

                match fk.on_delete {
                    OnDelete::Cascade => deleted += self.delete_where(&other, &other_column, key)?,
                    OnDelete::SetNull => {
                        for dependant in &mut self.table_mut(&other)?.rows {
                            if dependant.get(&other_column) == Some(key) {
                                dependant.insert(other_column.clone(), Value::Null);
                            }
                        }
                    }
                    OnDelete::Protect => {
                        let protected = self
                            .table_or_err(&other)?
                            .rows
                            .iter()
                            .any(|dependant| dependant.get(&other_column) == Some(key));
                        if protected {
                            return Err(StoreError::Protected {
                                table: table_name.to_owned(),
                                by: format!("{}.{}", other, other_column),
                            });
                        }
                    }
                }
            }
        }

        Ok(deleted)
    }
}

/// The column type used to store references to `field`
fn key_type(field: &Field, state: &ProjectState) -> std::result::Result<ColumnType, SchemaError> {
    Ok(match &field.kind {
        FieldKind::Auto | FieldKind::Integer => ColumnType::Integer,
        FieldKind::BigAuto => ColumnType::BigInt,
        FieldKind::Char { max_length } => ColumnType::Varchar(*max_length),
        FieldKind::Text => ColumnType::Text,
        FieldKind::Boolean => ColumnType::Boolean,
        FieldKind::Date => ColumnType::Date,
        FieldKind::ForeignKey(relation) | FieldKind::OneToOne(relation) => {
            let (_, pk) = state.relation_target(&relation.to)?;
            if pk == field {
                return Err(SchemaError::PrimaryKey(relation.to.clone()));
            }
            key_type(pk, state)?
        }
    })
}

fn column_for(field: &Field, state: &ProjectState) -> std::result::Result<Column, SchemaError> {
    let references = match field.relation() {
        Some(relation) => {
            let (table, pk) = state.relation_target(&relation.to)?;
            Some(ForeignKey {
                table,
                column: pk.column(),
                on_delete: relation.on_delete,
            })
        }
        None => None,
    };

    Ok(Column {
        name: field.column(),
        ty: key_type(field, state)?,
        nullable: field.null,
        auto_increment: field.is_auto(),
        unique: field.unique || field.primary_key,
        default: field.default.as_ref().map(Value::from),
        references,
    })
}

impl SchemaEditor for MemoryDatabase {
    fn create_table(
        &mut self,
        table: &str,
        model: &ModelState,
        state: &ProjectState,
    ) -> std::result::Result<(), ApplyError> {
        let columns = model
            .fields
            .iter()
            .map(|f| column_for(f, state))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let primary_key = model
            .primary_key()
            .map(Field::column)
            .ok_or_else(|| SchemaError::PrimaryKey(model.name.clone()))?;

        let mut data = Table::new(columns, &primary_key);
        data.unique_together = model
            .options
            .unique_together
            .iter()
            .map(|set| model.columns_of(set))
            .collect();

        Ok(MemoryDatabase::create_table(self, table, data)?)
    }

    fn delete_table(&mut self, table: &str) -> std::result::Result<(), ApplyError> {
        Ok(self.drop_table(table)?)
    }

    fn rename_table(&mut self, old: &str, new: &str) -> std::result::Result<(), ApplyError> {
        Ok(MemoryDatabase::rename_table(self, old, new)?)
    }

    fn add_column(
        &mut self,
        table: &str,
        field: &Field,
        state: &ProjectState,
    ) -> std::result::Result<(), ApplyError> {
        let column = column_for(field, state)?;
        Ok(MemoryDatabase::add_column(self, table, column)?)
    }

    fn remove_column(&mut self, table: &str, field: &Field) -> std::result::Result<(), ApplyError> {
        Ok(self.drop_column(table, &field.column())?)
    }

    fn rename_column(
        &mut self,
        table: &str,
        old: &Field,
        new: &Field,
    ) -> std::result::Result<(), ApplyError> {
        Ok(MemoryDatabase::rename_column(
            self,
            table,
            &old.column(),
            &new.column(),
        )?)
    }

    fn alter_unique_together(
        &mut self,
        table: &str,
        _old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> std::result::Result<(), ApplyError> {
        Ok(self.set_unique_together(table, new.to_vec())?)
    }
}
