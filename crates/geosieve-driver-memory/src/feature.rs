use crate::geom::{self, Shape};

use geosieve_core::{
    stmt::{RecordId, Value},
    Result,
};

use geo::Geometry;
use indexmap::IndexMap;

/// One row of an in-memory dataset.
#[derive(Debug, Clone)]
pub struct Feature {
    pub(crate) id: RecordId,
    pub(crate) shape: Option<Shape>,
    pub(crate) attributes: IndexMap<String, Value>,
}

impl Feature {
    /// A feature with no geometry and no attributes.
    pub fn new(id: i64) -> Feature {
        Feature {
            id: RecordId(id),
            shape: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn geometry(mut self, geometry: impl Into<Geometry>) -> Self {
        self.shape = Some(Shape::new(geometry.into()));
        self
    }

    /// Sets the geometry from well-known text.
    pub fn wkt(self, text: &str) -> Result<Self> {
        Ok(self.geometry(geom::parse_wkt(text)?))
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Attribute value, `NULL` when absent.
    pub(crate) fn get(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }
}
