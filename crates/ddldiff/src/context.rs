//! Ambient naming information threaded through recursive diff calls.

/// Read-only qualification data for the entity currently being diffed.
///
/// A fresh root context is created for every top-level diff; composite
/// entities derive narrower contexts for their children instead of mutating
/// the one they were handed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context<'a> {
    schema: &'a str,
    parent: Option<&'a str>,
}

impl<'a> Context<'a> {
    /// Context qualifying names with `schema`.
    pub fn new(schema: &'a str) -> Self {
        Self {
            schema,
            parent: None,
        }
    }

    /// Context for the top of a catalog, outside any schema.
    pub fn root() -> Self {
        Self::default()
    }

    /// Enclosing schema name (empty at the root).
    pub fn schema(&self) -> &'a str {
        self.schema
    }

    /// Enclosing table or type name, if any.
    pub fn parent(&self) -> Option<&'a str> {
        self.parent
    }

    /// Enclosing table or type name, empty when there is none.
    pub fn parent_name(&self) -> &'a str {
        self.parent.unwrap_or_default()
    }

    /// Derive the context used for the children of a schema.
    pub fn with_schema<'b>(&self, schema: &'b str) -> Context<'b> {
        Context {
            schema,
            parent: None,
        }
    }

    /// Derive the context used for the children of a table or type.
    pub fn with_parent<'b>(&self, parent: &'b str) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            schema: self.schema,
            parent: Some(parent),
        }
    }
}
