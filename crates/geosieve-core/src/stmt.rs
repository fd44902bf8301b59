mod bindings;
pub use bindings::{ArtifactBinding, Bindings};

mod expr;
pub use expr::Expr;

mod expr_and;
pub use expr_and::ExprAnd;

mod expr_binary_op;
pub use expr_binary_op::ExprBinaryOp;

mod expr_cast;
pub use expr_cast::ExprCast;

mod expr_column;
pub use expr_column::ExprColumn;

mod expr_func;
pub use expr_func::ExprFunc;

mod expr_in_list;
pub use expr_in_list::ExprInList;

mod expr_is_null;
pub use expr_is_null::ExprIsNull;

mod expr_like;
pub use expr_like::ExprLike;

mod expr_not;
pub use expr_not::ExprNot;

mod expr_or;
pub use expr_or::ExprOr;

mod expr_spatial;
pub use expr_spatial::ExprSpatial;

mod geometry_ref;
pub use geometry_ref::GeometryRef;

mod op_binary;
pub use op_binary::BinaryOp;

mod record_id;
pub use record_id::RecordId;

mod request;
pub use request::{CombineOp, FilterRequest, SpatialPredicate};

mod spatial_relation;
pub use spatial_relation::SpatialRelation;

mod ty;
pub use ty::Type;

mod value;
pub use value::Value;

pub mod visit;
pub use visit::Visit;

pub mod visit_mut;
pub use visit_mut::VisitMut;
