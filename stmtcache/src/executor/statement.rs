use crate::cache::SharedCache;
use crate::core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named parameter values for one statement execution.
/// Callable statements write their OUT values back into it.
pub type Parameters = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlCommandType {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementType {
    Statement,
    Prepared,
    Callable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    pub property: String,
    pub mode: ParameterMode,
}

impl ParameterMapping {
    pub fn input(property: &str) -> Self {
        Self {
            property: property.to_string(),
            mode: ParameterMode::In,
        }
    }

    pub fn output(property: &str) -> Self {
        Self {
            property: property.to_string(),
            mode: ParameterMode::Out,
        }
    }

    pub fn in_out(property: &str) -> Self {
        Self {
            property: property.to_string(),
            mode: ParameterMode::InOut,
        }
    }

    pub fn is_input(&self) -> bool {
        self.mode != ParameterMode::Out
    }

    pub fn is_output(&self) -> bool {
        self.mode != ParameterMode::In
    }
}

/// A registered statement: identity, SQL text, parameter layout and cache
/// behavior. Produced by the mapping layer; only what caching needs is kept.
#[derive(Clone)]
pub struct MappedStatement {
    id: String,
    namespace: String,
    sql: String,
    command_type: SqlCommandType,
    statement_type: StatementType,
    parameter_mappings: Vec<ParameterMapping>,
    flush_cache_required: bool,
    use_cache: bool,
    cache: Option<SharedCache>,
}

impl MappedStatement {
    /// Start a statement. Namespace defaults to the id up to its last `.`.
    pub fn builder(id: &str, sql: &str, command_type: SqlCommandType) -> MappedStatementBuilder {
        let is_select = command_type == SqlCommandType::Select;
        let namespace = id.rsplit_once('.').map_or(id, |(ns, _)| ns);
        MappedStatementBuilder {
            statement: MappedStatement {
                id: id.to_string(),
                namespace: namespace.to_string(),
                sql: sql.to_string(),
                command_type,
                statement_type: StatementType::Prepared,
                parameter_mappings: Vec::new(),
                flush_cache_required: !is_select,
                use_cache: is_select,
                cache: None,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn command_type(&self) -> SqlCommandType {
        self.command_type
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn is_flush_cache_required(&self) -> bool {
        self.flush_cache_required
    }

    pub fn is_use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn cache(&self) -> Option<&SharedCache> {
        self.cache.as_ref()
    }

    pub fn set_cache(&mut self, cache: Option<SharedCache>) {
        self.cache = cache;
    }

    pub fn is_callable(&self) -> bool {
        self.statement_type == StatementType::Callable
    }

    pub fn has_out_params(&self) -> bool {
        self.parameter_mappings.iter().any(ParameterMapping::is_output)
    }

    /// Values of IN and INOUT parameters in mapping order; missing ones are null
    pub fn bound_values(&self, params: &Parameters) -> Vec<Value> {
        self.parameter_mappings
            .iter()
            .filter(|m| m.is_input())
            .map(|m| params.get(&m.property).cloned().unwrap_or_default())
            .collect()
    }

    /// OUT and INOUT entries currently held in `params`
    pub fn output_values(&self, params: &Parameters) -> Parameters {
        self.parameter_mappings
            .iter()
            .filter(|m| m.is_output())
            .filter_map(|m| params.get(&m.property).map(|v| (m.property.clone(), v.clone())))
            .collect()
    }
}

impl fmt::Debug for MappedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedStatement")
            .field("id", &self.id)
            .field("command_type", &self.command_type)
            .field("statement_type", &self.statement_type)
            .field("flush_cache_required", &self.flush_cache_required)
            .field("use_cache", &self.use_cache)
            .field("cache", &self.cache.as_ref().map(|c| c.id().to_string()))
            .finish()
    }
}

pub struct MappedStatementBuilder {
    statement: MappedStatement,
}

impl MappedStatementBuilder {
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.statement.namespace = namespace.to_string();
        self
    }

    pub fn statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement.statement_type = statement_type;
        self
    }

    pub fn parameter(mut self, mapping: ParameterMapping) -> Self {
        self.statement.parameter_mappings.push(mapping);
        self
    }

    pub fn flush_cache(mut self, flush: bool) -> Self {
        self.statement.flush_cache_required = flush;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.statement.use_cache = use_cache;
        self
    }

    pub fn cache(mut self, cache: SharedCache) -> Self {
        self.statement.cache = Some(cache);
        self
    }

    pub fn build(self) -> MappedStatement {
        self.statement
    }
}
