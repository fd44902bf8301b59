use crate::{Error, Result};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifies a family of backends sharing one capability descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Postgresql,
    Spatialite,
    GenericVector,
    InMemory,
}

/// The shape of native filter text a backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL with PostGIS.
    Postgis,

    /// SQLite with the Spatialite extension.
    Spatialite,

    /// Host expression language evaluated feature by feature.
    Expression,
}

/// How the backend stores a materialized reference geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    MaterializedView,
    Table,
    Memory,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialIndex {
    Gist,
    RTree,

    /// Precomputed per-feature bounding boxes.
    Envelope,
    None,
}

/// Backend-independent names for the functions a filter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalFn {
    Intersects,
    Contains,
    Within,
    Touches,
    Crosses,
    Overlaps,
    Disjoint,
    Equals,
    BboxIntersects,
    Buffer,
    Transform,
    IsEmpty,
    GeomFromText,
    Envelope,
    MakeValid,
    Aggregate,
    Lower,
    Upper,
    Length,
    Abs,
    ILike,
}

/// How a canonical function is spelled natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFn {
    /// Called as `name(arg, ...)`.
    Function(&'static str),

    /// Placed between two operands, `lhs op rhs`.
    Operator(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastSyntax {
    /// `CAST(expr AS type)`
    Sql,

    /// `type(expr)`
    Function,
}

#[derive(Debug)]
pub struct TypeNames {
    pub cast: CastSyntax,
    pub integer: &'static str,
    pub real: &'static str,
    pub text: &'static str,

    /// `None` when the dialect cannot cast to boolean.
    pub boolean: Option<&'static str>,
}

/// Static description of what a backend kind supports.
#[derive(Debug)]
pub struct Capability {
    pub kind: BackendKind,

    pub dialect: Dialect,

    /// When true, the backend executes SQL text. Otherwise it receives
    /// structured filter operations.
    pub sql: bool,

    /// The backend can persist a buffered reference geometry as an indexed
    /// object and query against it.
    pub materialized_artifacts: bool,

    pub artifact_kind: ArtifactKind,

    pub spatial_index: SpatialIndex,

    /// Artifact DDL runs atomically.
    pub transactional_ddl: bool,

    /// More than one job may run against this backend at once. When false,
    /// the engine serializes every job on the backend.
    pub parallel_execution: bool,

    /// Comparisons between mismatched types are rejected, so literals are
    /// cast to the column's declared type.
    pub strict_types: bool,

    /// Projected CRS used to buffer geometries stored in geographic
    /// coordinates.
    pub metric_srid: u32,

    /// Expression used for "the current feature's geometry", when the
    /// dialect does not reference a column for it.
    pub feature_geometry: Option<&'static str>,

    pub types: TypeNames,

    pub functions: &'static [(CanonicalFn, NativeFn)],
}

use CanonicalFn::*;
use NativeFn::{Function, Operator};

impl Capability {
    /// PostgreSQL with PostGIS.
    pub const POSTGRESQL: Self = Self {
        kind: BackendKind::Postgresql,
        dialect: Dialect::Postgis,
        sql: true,
        materialized_artifacts: true,
        artifact_kind: ArtifactKind::MaterializedView,
        spatial_index: SpatialIndex::Gist,
        transactional_ddl: true,
        parallel_execution: true,
        strict_types: true,
        metric_srid: 3857,
        feature_geometry: None,
        types: TypeNames::POSTGRESQL,
        functions: &[
            (Intersects, Function("ST_Intersects")),
            (Contains, Function("ST_Contains")),
            (Within, Function("ST_Within")),
            (Touches, Function("ST_Touches")),
            (Crosses, Function("ST_Crosses")),
            (Overlaps, Function("ST_Overlaps")),
            (Disjoint, Function("ST_Disjoint")),
            (Equals, Function("ST_Equals")),
            (BboxIntersects, Operator("&&")),
            (Buffer, Function("ST_Buffer")),
            (Transform, Function("ST_Transform")),
            (IsEmpty, Function("ST_IsEmpty")),
            (GeomFromText, Function("ST_GeomFromText")),
            (Envelope, Function("ST_Envelope")),
            (MakeValid, Function("ST_MakeValid")),
            (Lower, Function("lower")),
            (Upper, Function("upper")),
            (Length, Function("char_length")),
            (Abs, Function("abs")),
            (ILike, Operator("ILIKE")),
        ],
    };

    /// SQLite with Spatialite. A single file cannot serve concurrent
    /// writers, so jobs are serialized.
    pub const SPATIALITE: Self = Self {
        kind: BackendKind::Spatialite,
        dialect: Dialect::Spatialite,
        artifact_kind: ArtifactKind::Table,
        spatial_index: SpatialIndex::RTree,
        parallel_execution: false,
        strict_types: false,
        types: TypeNames::SQLITE,
        functions: &[
            (Intersects, Function("Intersects")),
            (Contains, Function("Contains")),
            (Within, Function("Within")),
            (Touches, Function("Touches")),
            (Crosses, Function("Crosses")),
            (Overlaps, Function("Overlaps")),
            (Disjoint, Function("Disjoint")),
            (Equals, Function("Equals")),
            (BboxIntersects, Function("MbrIntersects")),
            (Buffer, Function("ST_Buffer")),
            (Transform, Function("Transform")),
            (IsEmpty, Function("IsEmpty")),
            (GeomFromText, Function("GeomFromText")),
            (Envelope, Function("Envelope")),
            (MakeValid, Function("MakeValid")),
            (Lower, Function("lower")),
            (Upper, Function("upper")),
            (Length, Function("length")),
            (Abs, Function("abs")),
            // LIKE is already case-insensitive for ASCII in SQLite
            (ILike, Operator("LIKE")),
        ],
        ..Self::POSTGRESQL
    };

    /// File-based vector layers driven through the host's expression engine.
    pub const GENERIC_VECTOR: Self = Self {
        kind: BackendKind::GenericVector,
        dialect: Dialect::Expression,
        sql: false,
        materialized_artifacts: false,
        artifact_kind: ArtifactKind::None,
        spatial_index: SpatialIndex::None,
        transactional_ddl: false,
        parallel_execution: false,
        strict_types: false,
        metric_srid: 3857,
        feature_geometry: Some("$geometry"),
        types: TypeNames::EXPRESSION,
        functions: &[
            (Intersects, Function("intersects")),
            (Contains, Function("contains")),
            (Within, Function("within")),
            (Touches, Function("touches")),
            (Crosses, Function("crosses")),
            (Overlaps, Function("overlaps")),
            (Disjoint, Function("disjoint")),
            (Equals, Function("equals")),
            (BboxIntersects, Function("bbox")),
            (Buffer, Function("buffer")),
            (Transform, Function("transform")),
            (IsEmpty, Function("is_empty")),
            (GeomFromText, Function("geom_from_wkt")),
            (Envelope, Function("bounds")),
            (MakeValid, Function("make_valid")),
            (Aggregate, Function("aggregate")),
            (Lower, Function("lower")),
            (Upper, Function("upper")),
            (Length, Function("length")),
            (Abs, Function("abs")),
            (ILike, Operator("ILIKE")),
        ],
    };

    /// Features held in process memory.
    pub const IN_MEMORY: Self = Self {
        kind: BackendKind::InMemory,
        materialized_artifacts: true,
        artifact_kind: ArtifactKind::Memory,
        spatial_index: SpatialIndex::Envelope,
        parallel_execution: true,
        functions: &[
            (Intersects, Function("intersects")),
            (Contains, Function("contains")),
            (Within, Function("within")),
            (Touches, Function("touches")),
            (Crosses, Function("crosses")),
            (Overlaps, Function("overlaps")),
            (Disjoint, Function("disjoint")),
            (Equals, Function("equals")),
            (BboxIntersects, Function("bbox_intersects")),
            (Buffer, Function("buffer")),
            (Transform, Function("transform")),
            (IsEmpty, Function("is_empty")),
            (GeomFromText, Function("geom_from_wkt")),
            (Envelope, Function("envelope")),
            (Aggregate, Function("aggregate")),
            (Lower, Function("lower")),
            (Upper, Function("upper")),
            (Length, Function("length")),
            (Abs, Function("abs")),
            (ILike, Operator("ILIKE")),
        ],
        ..Self::GENERIC_VECTOR
    };

    /// Looks up the native spelling of a canonical function.
    pub fn native_fn(&self, func: CanonicalFn) -> Option<NativeFn> {
        self.functions
            .iter()
            .find(|(canonical, _)| *canonical == func)
            .map(|(_, native)| *native)
    }

    /// True when the backend has an index that can answer bounding-box
    /// candidate queries.
    pub fn has_spatial_index(&self) -> bool {
        self.spatial_index != SpatialIndex::None
    }
}

impl TypeNames {
    pub const POSTGRESQL: TypeNames = TypeNames {
        cast: CastSyntax::Sql,
        integer: "bigint",
        real: "double precision",
        text: "text",
        boolean: Some("boolean"),
    };

    pub const SQLITE: TypeNames = TypeNames {
        cast: CastSyntax::Sql,
        integer: "INTEGER",
        real: "REAL",
        text: "TEXT",
        // SQLite has no boolean storage class; booleans are 0/1 integers.
        boolean: Some("INTEGER"),
    };

    pub const EXPRESSION: TypeNames = TypeNames {
        cast: CastSyntax::Function,
        integer: "to_int",
        real: "to_real",
        text: "to_string",
        boolean: None,
    };
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Postgresql => "postgresql",
            BackendKind::Spatialite => "spatialite",
            BackendKind::GenericVector => "generic_vector",
            BackendKind::InMemory => "in_memory",
        }
    }
}

impl core::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<BackendKind> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "postgis" => Ok(BackendKind::Postgresql),
            "spatialite" | "sqlite" => Ok(BackendKind::Spatialite),
            "generic_vector" | "ogr" => Ok(BackendKind::GenericVector),
            "in_memory" | "memory" => Ok(BackendKind::InMemory),
            _ => Err(Error::unsupported_backend(s)),
        }
    }
}

/// Maps backend kinds to their capability descriptors.
///
/// Every backend-specific decision in the engine goes through a descriptor
/// from here; nothing branches on the backend's identity directly.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: IndexMap<BackendKind, &'static Capability>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry with the four built-in descriptors.
    pub fn builtin() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(&Capability::POSTGRESQL)
            .register(&Capability::SPATIALITE)
            .register(&Capability::GENERIC_VECTOR)
            .register(&Capability::IN_MEMORY);
        registry
    }

    /// Registers a descriptor, replacing any previous one for the same kind.
    pub fn register(&mut self, capability: &'static Capability) -> &mut Self {
        self.descriptors.insert(capability.kind, capability);
        self
    }

    pub fn capabilities_for(&self, kind: BackendKind) -> Result<&'static Capability> {
        self.descriptors
            .get(&kind)
            .copied()
            .ok_or_else(|| Error::unsupported_backend(kind))
    }

    /// Native spelling of `func` for `kind`.
    pub fn translate_fn(&self, kind: BackendKind, func: CanonicalFn) -> Result<NativeFn> {
        self.capabilities_for(kind)?.native_fn(func).ok_or_else(|| {
            Error::expression_translation(format!("{kind} has no mapping for {func:?}"))
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.descriptors.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatialite_inherits_postgres_defaults() {
        let cap = &Capability::SPATIALITE;
        assert!(cap.sql);
        assert!(cap.materialized_artifacts);
        assert!(cap.transactional_ddl);
        assert!(!cap.parallel_execution);
        assert_eq!(cap.metric_srid, 3857);
    }

    #[test]
    fn registry_lookup() {
        let registry = Registry::builtin();
        let cap = registry.capabilities_for(BackendKind::InMemory).unwrap();
        assert_eq!(cap.artifact_kind, ArtifactKind::Memory);

        let native = registry
            .translate_fn(BackendKind::Postgresql, CanonicalFn::BboxIntersects)
            .unwrap();
        assert_eq!(native, NativeFn::Operator("&&"));
    }

    #[test]
    fn unknown_backend_kind() {
        let err = "oracle".parse::<BackendKind>().unwrap_err();
        assert!(err.is_unsupported_backend());

        let err = Registry::new()
            .capabilities_for(BackendKind::Postgresql)
            .unwrap_err();
        assert!(err.is_unsupported_backend());
    }

    #[test]
    fn missing_function_mapping() {
        let err = Registry::builtin()
            .translate_fn(BackendKind::Postgresql, CanonicalFn::Aggregate)
            .unwrap_err();
        assert!(err.is_expression_translation());
    }

    #[test]
    fn backend_kind_round_trips_through_str() {
        for kind in Registry::builtin().kinds() {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
    }
}
