//! # cmdforge
//!
//! A backend-agnostic command construction engine.
//!
//! One data-access operation (select, insert, update or delete) is described
//! through a small set of builder calls and then rendered to wire-level text
//! plus ordered arguments for one of three target languages:
//!
//! - **Relational SQL** via [`SqlCommandBuilder`] and a SQL [`Dialect`]
//!   ([`StandardDialect`], [`MySqlDialect`], [`PostgresDialect`], [`OracleDialect`])
//! - **Document store** (MongoDB shell) via [`DocumentCommandBuilder`] and [`MongoDialect`]
//! - **Search endpoint** (Elasticsearch REST) via [`SearchCommandBuilder`] and [`ElasticDialect`]
//!
//! ## Rules
//!
//! - **Construction order**: no condition after GROUP BY / ORDER BY, no GROUP BY after ORDER BY
//! - **Argument order** always equals placeholder order in the rendered text
//! - **Safe defaults**: UPDATE/DELETE need a filter unless explicitly allowed
//! - **Explicit gaps**: constructs a backend cannot express raise [`CmdError::Unsupported`]
//! - **Graceful inserts**: conflict strategies a dialect lacks degrade to a plain insert
//!
//! ## Example
//!
//! ```ignore
//! use cmdforge::{Qb, PostgresDialect};
//!
//! let mut q = Qb::sql("users");
//! q.select(&["id", "name"])
//!     .eq("status", "active")
//!     .or()
//!     .group(|g| {
//!         g.gt("age", 18).in_list("role", ["admin", "owner"]);
//!     })
//!     .order_by_desc("created_at");
//!
//! let stmt = q.build_select(&PostgresDialect, false)?;
//! assert_eq!(
//!     stmt.sql,
//!     "SELECT id, name FROM users WHERE status = ? OR ( age > ? AND role IN ( ? , ? ) ) ORDER BY created_at DESC"
//! );
//! assert_eq!(stmt.args.len(), 4);
//! ```

pub mod command;
pub mod condition;
pub mod dialect;
pub mod error;
pub mod fluent;
pub mod segment;
pub mod value;

pub use command::{
    BoundStatement, ClauseState, CommandBuilder, ConflictStrategy, Doc, DocumentCommandBuilder,
    Endpoint, EndpointPaths, GroupFn, NullsOrder, Operation, OrderType, SearchCommandBuilder,
    SqlCommandBuilder, Target, TypedPaths, TypelessPaths,
};
pub use condition::{
    BetweenPredicate, ConditionLogic, ConditionType, InPredicate, LikeStyle, Predicate,
};
pub use dialect::{
    Dialect, DialectKind, ElasticDialect, Family, MongoDialect, MySqlDialect, OracleDialect,
    PostgresDialect, StandardDialect,
};
pub use error::{CmdError, CmdResult};
pub use fluent::Qb;
pub use segment::{MergeSegment, RenderCtx, Segment};
pub use value::{ArgList, Value};
