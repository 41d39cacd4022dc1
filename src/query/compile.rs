//! Compilation of a [`QueryObject`] into a single parameterized statement.
//!
//! Clauses are emitted in a fixed order: SELECT list, FROM and JOINs,
//! WHERE, ORDER BY, then LIMIT/OFFSET. The WHERE clause uses the tree
//! filter when one exists and the flat condition list otherwise; OR groups
//! are ANDed onto either.
//!
//! Flat-condition values go through [`Value::to_param`] before binding.
//! Tree literals are bound raw by the expression compiler.

use crate::expression::compile_expression;
use crate::query::condition::{Condition, FilterValue, OrGroup};
use crate::query::iqo::QueryObject;
use crate::value::Value;

/// A full statement together with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compile the full SELECT for a query
pub fn compile(table: &str, iqo: &QueryObject) -> CompiledQuery {
    let mut sql = format!("SELECT {} FROM {}", select_list(table, iqo), table);
    sql.push_str(&join_clauses(table, iqo));

    let mut params = Vec::new();
    if let Some(predicate) = where_predicate(table, iqo, iqo.has_joins(), &mut params) {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);
    }

    if !iqo.ordering.is_empty() {
        let ordering: Vec<String> = iqo
            .ordering
            .iter()
            .map(|order| format!("{} {}", order.field, order.direction.as_str()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&ordering.join(", "));
    }

    if let Some(limit) = iqo.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = iqo.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    CompiledQuery { sql, params }
}

/// Compile a `COUNT(*)` over the base predicate.
///
/// Ordering, paging and joins are left out; only WHERE state counts.
pub fn compile_count(table: &str, iqo: &QueryObject) -> CompiledQuery {
    let mut sql = format!("SELECT COUNT(*) AS count FROM {}", table);
    let mut params = Vec::new();
    if let Some(predicate) = where_predicate(table, iqo, false, &mut params) {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);
    }
    CompiledQuery { sql, params }
}

/// Column alias carrying the base table's id in incremental statements
pub const WATERMARK_ALIAS: &str = "__watermark_id";

/// Compile the `(row_count, max_id)` fingerprint over the filtered set.
///
/// Joins are kept so a predicate on a joined column stays valid; the id is
/// then qualified with the base table.
pub fn compile_fingerprint(table: &str, iqo: &QueryObject, id_column: &str) -> CompiledQuery {
    let max_id = if iqo.has_joins() {
        qualify(table, id_column)
    } else {
        id_column.to_string()
    };
    let mut sql = format!(
        "SELECT COUNT(*) AS row_count, MAX({}) AS max_id FROM {}",
        max_id, table
    );
    sql.push_str(&join_clauses(table, iqo));

    let mut params = Vec::new();
    if let Some(predicate) = where_predicate(table, iqo, iqo.has_joins(), &mut params) {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);
    }
    CompiledQuery { sql, params }
}

/// Compile the query for rows past a watermark, oldest first.
///
/// Keeps the select list, joins and predicate of the query but replaces its
/// ordering and ignores paging. The base id is also projected as
/// [`WATERMARK_ALIAS`] since a joined table's `id` can shadow it.
pub fn compile_incremental(
    table: &str,
    iqo: &QueryObject,
    id_column: &str,
    watermark: i64,
) -> CompiledQuery {
    let qualified_id = qualify(table, id_column);
    let mut sql = format!(
        "SELECT {}, {} AS {} FROM {}",
        select_list(table, iqo),
        qualified_id,
        WATERMARK_ALIAS,
        table
    );
    sql.push_str(&join_clauses(table, iqo));

    let mut params = Vec::new();
    match where_predicate(table, iqo, iqo.has_joins(), &mut params) {
        Some(predicate) => {
            sql.push_str(&format!(" WHERE ({}) AND {} > ?", predicate, qualified_id))
        }
        None => sql.push_str(&format!(" WHERE {} > ?", qualified_id)),
    }
    params.push(Value::Integer(watermark));

    sql.push_str(&format!(" ORDER BY {} ASC", qualified_id));
    CompiledQuery { sql, params }
}

fn select_list(table: &str, iqo: &QueryObject) -> String {
    let mut items: Vec<String> = if iqo.selected_columns.is_empty() {
        vec![format!("{}.*", table)]
    } else {
        iqo.selected_columns
            .iter()
            .map(|column| qualify(table, column))
            .collect()
    };

    for join in &iqo.joins {
        if join.columns.is_empty() {
            items.push(format!("{}.*", join.table));
        } else {
            items.extend(join.columns.iter().map(|column| {
                format!("{}.{} AS {}_{}", join.table, column, join.table, column)
            }));
        }
    }
    items.join(", ")
}

fn join_clauses(table: &str, iqo: &QueryObject) -> String {
    iqo.joins
        .iter()
        .map(|join| {
            format!(
                " JOIN {} ON {}.{} = {}.{}",
                join.table, table, join.from_column, join.table, join.to_column
            )
        })
        .collect()
}

/// Build the predicate without the `WHERE` keyword, pushing its parameters
fn where_predicate(
    table: &str,
    iqo: &QueryObject,
    qualify_bare: bool,
    params: &mut Vec<Value>,
) -> Option<String> {
    let mut clauses = Vec::new();

    if let Some(expr) = &iqo.expression_filter {
        let compiled = compile_expression(expr);
        clauses.push(compiled.sql);
        params.extend(compiled.params);
    } else {
        for condition in &iqo.conditions {
            clauses.push(condition_sql(table, condition, qualify_bare, params));
        }
    }

    for group in &iqo.or_groups {
        if let Some(clause) = or_group_sql(table, group, qualify_bare, params) {
            clauses.push(clause);
        }
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn or_group_sql(
    table: &str,
    group: &OrGroup,
    qualify_bare: bool,
    params: &mut Vec<Value>,
) -> Option<String> {
    if group.conditions.is_empty() {
        return None;
    }
    let branches: Vec<String> = group
        .conditions
        .iter()
        .map(|condition| condition_sql(table, condition, qualify_bare, params))
        .collect();
    Some(format!("({})", branches.join(" OR ")))
}

fn condition_sql(
    table: &str,
    condition: &Condition,
    qualify_bare: bool,
    params: &mut Vec<Value>,
) -> String {
    let field = if qualify_bare {
        qualify(table, &condition.field)
    } else {
        condition.field.clone()
    };

    match &condition.value {
        FilterValue::Equality(Value::Null) => format!("{} IS NULL", field),
        FilterValue::Equality(value) | FilterValue::Range(_, value) => {
            params.push(value.to_param());
            format!("{} {} ?", field, condition.operator())
        }
        // Empty set: nothing can match
        FilterValue::InSet(values) if values.is_empty() => "1 = 0".to_string(),
        FilterValue::InSet(values) => {
            params.extend(values.iter().map(Value::to_param));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{} IN ({})", field, placeholders)
        }
    }
}

/// Prefix a bare column name with the table; already-qualified names pass
fn qualify(table: &str, column: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", table, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionBuilder;
    use crate::query::condition::{JoinSpec, OrderBy, RangeOp, SortDirection};
    use chrono::{TimeZone, Utc};

    fn users() -> QueryObject {
        QueryObject::new()
    }

    #[test]
    fn test_empty_query() {
        let compiled = compile("t", &users());
        assert_eq!(compiled.sql, "SELECT t.* FROM t");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_selected_columns_are_qualified() {
        let mut iqo = users();
        iqo.selected_columns = vec!["id".into(), "name".into(), "posts.title".into()];
        assert_eq!(
            compile("users", &iqo).sql,
            "SELECT users.id, users.name, posts.title FROM users"
        );
    }

    #[test]
    fn test_flat_conditions() {
        let mut iqo = users();
        iqo.conditions = vec![
            Condition::eq("name", "alice"),
            Condition::range("age", RangeOp::Gte, 18),
            Condition::in_set("role", ["admin", "staff"]),
        ];
        let compiled = compile("users", &iqo);
        assert_eq!(
            compiled.sql,
            "SELECT users.* FROM users WHERE name = ? AND age >= ? AND role IN (?, ?)"
        );
        assert_eq!(
            compiled.params,
            vec![
                Value::from("alice"),
                Value::Integer(18),
                Value::from("admin"),
                Value::from("staff"),
            ]
        );
    }

    #[test]
    fn test_empty_in_is_always_false() {
        let mut iqo = users();
        iqo.conditions = vec![Condition::new("id", FilterValue::InSet(vec![]))];
        let compiled = compile("users", &iqo);
        assert_eq!(compiled.sql, "SELECT users.* FROM users WHERE 1 = 0");
        assert!(!compiled.sql.contains("IN ()"));
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_null_equality() {
        let mut iqo = users();
        iqo.conditions = vec![Condition::eq("deleted_at", Value::Null)];
        assert_eq!(
            compile("users", &iqo).sql,
            "SELECT users.* FROM users WHERE deleted_at IS NULL"
        );
    }

    #[test]
    fn test_param_transform_on_flat_conditions() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut iqo = users();
        iqo.conditions = vec![
            Condition::range("created_at", RangeOp::Gt, ts),
            Condition::eq("active", true),
        ];
        iqo.or_groups = vec![OrGroup::new(vec![
            Condition::eq("verified", false),
            Condition::in_set("flag", [true]),
        ])];
        let compiled = compile("users", &iqo);
        assert_eq!(
            compiled.params,
            vec![
                Value::from("2024-05-01T08:00:00.000Z"),
                Value::Integer(1),
                Value::Integer(0),
                Value::Integer(1),
            ]
        );
    }

    #[test]
    fn test_or_groups() {
        let mut iqo = users();
        iqo.conditions = vec![Condition::eq("active", 1)];
        iqo.or_groups = vec![
            OrGroup::new(vec![Condition::eq("role", "admin"), Condition::eq("role", "staff")]),
            OrGroup::new(vec![Condition::range("age", RangeOp::Lt, 30)]),
        ];
        let compiled = compile("users", &iqo);
        assert_eq!(
            compiled.sql,
            "SELECT users.* FROM users WHERE active = ? AND (role = ? OR role = ?) AND (age < ?)"
        );
        assert_eq!(compiled.params.len(), 4);
    }

    #[test]
    fn test_or_group_alone_introduces_where() {
        let mut iqo = users();
        iqo.or_groups = vec![OrGroup::new(vec![Condition::eq("a", 1), Condition::eq("b", 2)])];
        assert_eq!(
            compile("t", &iqo).sql,
            "SELECT t.* FROM t WHERE (a = ? OR b = ?)"
        );
    }

    #[test]
    fn test_expression_filter_supersedes_conditions() {
        let f = ExpressionBuilder::new();
        let mut iqo = users();
        iqo.conditions = vec![Condition::eq("name", "ignored-literal")];
        iqo.expression_filter = Some(f.gt(f.column("age"), f.value(21)));
        let compiled = compile("users", &iqo);
        assert_eq!(compiled.sql, "SELECT users.* FROM users WHERE (\"age\" > ?)");
        assert_eq!(compiled.params, vec![Value::Integer(21)]);
        assert!(!compiled.sql.contains("name"));
        assert!(!compiled
            .params
            .contains(&Value::from("ignored-literal")));
    }

    #[test]
    fn test_expression_filter_with_or_group() {
        let f = ExpressionBuilder::new();
        let mut iqo = users();
        iqo.expression_filter = Some(f.eq(f.column("a"), f.value(1)));
        iqo.or_groups = vec![OrGroup::new(vec![Condition::eq("b", true)])];
        let compiled = compile("t", &iqo);
        assert_eq!(compiled.sql, "SELECT t.* FROM t WHERE (\"a\" = ?) AND (b = ?)");
        assert_eq!(compiled.params, vec![Value::Integer(1), Value::Integer(1)]);
    }

    #[test]
    fn test_joins() {
        let mut iqo = users();
        iqo.joins = vec![
            JoinSpec::new("profiles", "profile_id", "id").with_columns(["bio", "avatar"]),
            JoinSpec::new("teams", "team_id", "id"),
        ];
        iqo.conditions = vec![Condition::eq("id", 7), Condition::eq("teams.name", "core")];
        let compiled = compile("users", &iqo);
        assert_eq!(
            compiled.sql,
            "SELECT users.*, profiles.bio AS profiles_bio, profiles.avatar AS profiles_avatar, teams.* \
             FROM users JOIN profiles ON users.profile_id = profiles.id \
             JOIN teams ON users.team_id = teams.id \
             WHERE users.id = ? AND teams.name = ?"
        );
    }

    #[test]
    fn test_ordering_and_paging() {
        let mut iqo = users();
        iqo.ordering = vec![
            OrderBy {
                field: "age".into(),
                direction: SortDirection::Desc,
            },
            OrderBy {
                field: "name".into(),
                direction: SortDirection::Asc,
            },
        ];
        iqo.limit = Some(10);
        iqo.offset = Some(20);
        assert_eq!(
            compile("users", &iqo).sql,
            "SELECT users.* FROM users ORDER BY age DESC, name ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_count_excludes_ordering_paging_and_joins() {
        let mut iqo = users();
        iqo.conditions = vec![Condition::eq("active", true)];
        iqo.joins = vec![JoinSpec::new("teams", "team_id", "id")];
        iqo.ordering = vec![OrderBy {
            field: "name".into(),
            direction: SortDirection::Asc,
        }];
        iqo.limit = Some(5);
        iqo.offset = Some(5);

        let compiled = compile_count("users", &iqo);
        assert_eq!(
            compiled.sql,
            "SELECT COUNT(*) AS count FROM users WHERE active = ?"
        );
        assert_eq!(compiled.params, vec![Value::Integer(1)]);
        for clause in ["ORDER BY", "LIMIT", "OFFSET", "JOIN"] {
            assert!(!compiled.sql.contains(clause));
        }
    }

    #[test]
    fn test_fingerprint() {
        let compiled = compile_fingerprint("events", &users(), "id");
        assert_eq!(
            compiled.sql,
            "SELECT COUNT(*) AS row_count, MAX(id) AS max_id FROM events"
        );

        let mut iqo = users();
        iqo.conditions = vec![Condition::eq("kind", "click")];
        iqo.limit = Some(3);
        let compiled = compile_fingerprint("events", &iqo, "id");
        assert_eq!(
            compiled.sql,
            "SELECT COUNT(*) AS row_count, MAX(id) AS max_id FROM events WHERE kind = ?"
        );
    }

    #[test]
    fn test_fingerprint_keeps_joins() {
        let mut iqo = users();
        iqo.joins = vec![JoinSpec::new("teams", "team_id", "id")];
        iqo.conditions = vec![Condition::eq("teams.name", "core"), Condition::eq("kind", "click")];
        iqo.ordering = vec![OrderBy {
            field: "kind".into(),
            direction: SortDirection::Asc,
        }];
        let compiled = compile_fingerprint("events", &iqo, "id");
        assert_eq!(
            compiled.sql,
            "SELECT COUNT(*) AS row_count, MAX(events.id) AS max_id FROM events \
             JOIN teams ON events.team_id = teams.id \
             WHERE teams.name = ? AND events.kind = ?"
        );
        assert_eq!(
            compiled.params,
            vec![Value::from("core"), Value::from("click")]
        );
    }

    #[test]
    fn test_incremental_with_unprojected_join() {
        let mut iqo = users();
        iqo.joins = vec![JoinSpec::new("teams", "team_id", "id")];
        let compiled = compile_incremental("events", &iqo, "id", 7);
        assert_eq!(
            compiled.sql,
            "SELECT events.*, teams.*, events.id AS __watermark_id FROM events \
             JOIN teams ON events.team_id = teams.id \
             WHERE events.id > ? ORDER BY events.id ASC"
        );
        assert_eq!(compiled.params, vec![Value::Integer(7)]);
    }

    #[test]
    fn test_incremental() {
        let compiled = compile_incremental("events", &users(), "id", 9);
        assert_eq!(
            compiled.sql,
            "SELECT events.*, events.id AS __watermark_id FROM events \
             WHERE events.id > ? ORDER BY events.id ASC"
        );
        assert_eq!(compiled.params, vec![Value::Integer(9)]);

        let mut iqo = users();
        iqo.conditions = vec![Condition::eq("kind", "click"), Condition::eq("user", 3)];
        iqo.ordering = vec![OrderBy {
            field: "kind".into(),
            direction: SortDirection::Desc,
        }];
        iqo.limit = Some(1);
        let compiled = compile_incremental("events", &iqo, "id", 42);
        assert_eq!(
            compiled.sql,
            "SELECT events.*, events.id AS __watermark_id FROM events \
             WHERE (kind = ? AND user = ?) AND events.id > ? \
             ORDER BY events.id ASC"
        );
        assert_eq!(
            compiled.params,
            vec![Value::from("click"), Value::Integer(3), Value::Integer(42)]
        );
    }
}
