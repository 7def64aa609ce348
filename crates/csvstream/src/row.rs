use std::{collections::HashMap, ops::Index, slice, sync::Arc};

/// Column names read from the first row of a session.
///
/// Shared by every [`Row`] of the session and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Builds a header from column names. On duplicates, the first column
    /// with a given name wins.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    /// Column names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of the column called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the header has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the column names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// One CSV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
    header: Option<Arc<Header>>,
}

impl Row {
    /// Creates a row from its fields and the session header, if any.
    #[must_use]
    pub fn new(fields: Vec<String>, header: Option<Arc<Header>>) -> Self {
        Self { fields, header }
    }

    /// The field at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// The field in the column called `name`.
    ///
    /// Returns `None` if there is no header or no such column, and `Some("")`
    /// if the column exists but this row is shorter than the header.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        let index = self.header.as_ref()?.index_of(name)?;
        Some(self.get(index).unwrap_or(""))
    }

    /// The session header.
    #[must_use]
    pub fn header(&self) -> Option<&Arc<Header>> {
        self.header.as_ref()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the fields.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// The fields as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.fields
    }

    /// Consumes the row, returning its fields.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.fields
    }
}

impl Index<usize> for Row {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.fields[index]
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
