use super::Serializer;

use geosieve_core::{
    driver::{BackendKind, Capability, Registry},
    schema::Schema,
    Result,
};

impl<'a> Serializer<'a> {
    pub fn new(schema: &'a Schema, capability: &'static Capability) -> Serializer<'a> {
        Serializer { schema, capability }
    }

    /// Serializer for `kind`, as described by `registry`.
    pub fn for_backend(
        schema: &'a Schema,
        registry: &Registry,
        kind: BackendKind,
    ) -> Result<Serializer<'a>> {
        Ok(Serializer::new(schema, registry.capabilities_for(kind)?))
    }

    pub fn postgresql(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, &Capability::POSTGRESQL)
    }

    pub fn spatialite(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, &Capability::SPATIALITE)
    }

    pub fn generic_vector(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, &Capability::GENERIC_VECTOR)
    }

    pub fn in_memory(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, &Capability::IN_MEMORY)
    }
}
