use super::Statement;

use geosieve_core::{
    driver::{ArtifactKind, Capability},
    schema::DatasetId,
    stmt::ExprSpatial,
};

/// A DDL step on a materialized artifact.
#[derive(Debug, Clone)]
pub struct ArtifactDdl {
    /// Dataset whose CRS the artifact uses
    pub target: DatasetId,

    pub name: String,

    pub action: ArtifactAction,
}

#[derive(Debug, Clone)]
pub enum ArtifactAction {
    /// Create the artifact from the predicate's buffered reference
    Create(ExprSpatial),

    /// Register the geometry column with the spatial metadata tables
    RegisterGeometry,

    CreateIndex,

    /// Refresh planner statistics
    Analyze,

    DisableIndex,

    DiscardGeometry,

    /// Drop the R-tree table backing the spatial index
    DropIndexTable,

    Drop,
}

impl Statement {
    /// Statements that (re)create an indexed artifact. The artifact is
    /// dropped first, so re-running after a partial failure is safe.
    pub fn materialize(
        capability: &Capability,
        target: impl Into<DatasetId>,
        name: impl Into<String>,
        spatial: ExprSpatial,
    ) -> Vec<Statement> {
        let target = target.into();
        let name = name.into();
        let ddl = |action| -> Statement {
            ArtifactDdl {
                target: target.clone(),
                name: name.clone(),
                action,
            }
            .into()
        };

        let mut stmts = Statement::release(capability, target.clone(), name.clone());
        match capability.artifact_kind {
            ArtifactKind::MaterializedView => stmts.extend([
                ddl(ArtifactAction::Create(spatial)),
                ddl(ArtifactAction::CreateIndex),
                ddl(ArtifactAction::Analyze),
            ]),
            ArtifactKind::Table => stmts.extend([
                ddl(ArtifactAction::Create(spatial)),
                ddl(ArtifactAction::RegisterGeometry),
                ddl(ArtifactAction::CreateIndex),
            ]),
            ArtifactKind::Memory | ArtifactKind::None => {}
        }
        stmts
    }

    /// Statements that drop an artifact if it exists.
    pub fn release(
        capability: &Capability,
        target: impl Into<DatasetId>,
        name: impl Into<String>,
    ) -> Vec<Statement> {
        let target = target.into();
        let name = name.into();
        let ddl = |action| -> Statement {
            ArtifactDdl {
                target: target.clone(),
                name: name.clone(),
                action,
            }
            .into()
        };

        match capability.artifact_kind {
            ArtifactKind::MaterializedView => vec![ddl(ArtifactAction::Drop)],
            ArtifactKind::Table => vec![
                ddl(ArtifactAction::DisableIndex),
                ddl(ArtifactAction::DiscardGeometry),
                ddl(ArtifactAction::DropIndexTable),
                ddl(ArtifactAction::Drop),
            ],
            ArtifactKind::Memory | ArtifactKind::None => vec![],
        }
    }
}

impl From<ArtifactDdl> for Statement {
    fn from(value: ArtifactDdl) -> Self {
        Statement::Artifact(value)
    }
}
