//! Selective eager-load planner
//!
//! Walks every field path of an entity from the root table:
//! 1. Resolve the segment against the current table
//! 2. Columns are loaded as-is
//! 3. Relationships get a load strategy from their kind
//! 4. At each hop, every column not named at that level of the merged
//!    path tree is deferred, except primary keys, `*_id` columns and
//!    `position`
//! 5. Descend into the relationship target
//!
//! Directives for shared prefixes are built once; the result does not
//! depend on field order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use super::errors::{PlannerError, PlannerResult};
use super::path_tree::PathTree;
use super::plan::{CompiledPlan, LoadDirective, LoadStrategy};
use crate::entity::SearchField;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{Attribute, Catalog, TableDef};

/// Ordering column some collections are sorted by in the store
pub const POSITION_COLUMN: &str = "position";

/// Suffix of foreign key attributes
pub const FOREIGN_KEY_SUFFIX: &str = "_id";

const PATH_PATTERN: &str = r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)*$";

fn path_pattern() -> Result<&'static Regex, String> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(PATH_PATTERN))
        .as_ref()
        .map_err(|e| e.to_string())
}

/// Checks that a path is `segment(.segment)*`
pub fn validate_path(path: &str) -> PlannerResult<()> {
    let pattern = path_pattern().map_err(|e| PlannerError::invalid_path(path, e))?;
    if pattern.is_match(path) {
        Ok(())
    } else {
        Err(PlannerError::invalid_path(
            path,
            "expected dot-separated identifiers",
        ))
    }
}

/// Splits a table's columns into loaded and deferred sets.
///
/// `required` holds the attribute names named at this hop of the merged
/// path tree. Primary keys and `*_id` columns are kept for joins and
/// secondary queries; `position` is kept because ordered collections sort
/// on it.
pub fn defer_everything_but(
    table: &TableDef,
    required: &[&str],
) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut loaded = BTreeSet::new();
    let mut deferred = BTreeSet::new();

    for column in &table.columns {
        let name = column.name.as_str();
        let keep = required.contains(&name)
            || table.is_primary_key(name)
            || name.ends_with(FOREIGN_KEY_SUFFIX)
            || name == POSITION_COLUMN;

        if keep {
            loaded.insert(name.to_string());
        } else {
            deferred.insert(name.to_string());
        }
    }

    (loaded, deferred)
}

/// Compiles field paths into eager-load plans against a catalog
pub struct QueryPlanner<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryPlanner<'a> {
    /// Creates a new planner
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Compiles the plan for one entity rooted at `root`.
    ///
    /// Deterministic: the same fields always produce the same plan.
    pub fn compile(
        &self,
        entity: &str,
        root: &str,
        fields: &[SearchField],
    ) -> PlannerResult<CompiledPlan> {
        let root_table = self
            .catalog
            .table(root)
            .ok_or_else(|| PlannerError::unknown_table(root))?;

        for field in fields {
            if field.paths().is_empty() {
                return Err(PlannerError::empty_field(field.name()));
            }
            for path in field.paths() {
                validate_path(path)?;
            }
        }

        let merged = PathTree::merge(fields.iter().map(SearchField::paths));

        let mut directives = BTreeMap::new();
        for field in fields {
            for path in field.paths() {
                self.plan_path(root_table, path, &merged, &mut directives)?;
            }
        }

        for directive in directives.values() {
            log_directive(entity, directive);
        }

        Ok(CompiledPlan::new(entity, root, directives))
    }

    fn plan_path(
        &self,
        root: &TableDef,
        path: &str,
        merged: &PathTree,
        directives: &mut BTreeMap<String, LoadDirective>,
    ) -> PlannerResult<()> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut table = root;
        let mut node = Some(merged);

        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            node = node.and_then(|n| n.get(segment));

            match table.resolve(segment) {
                None => {
                    return Err(PlannerError::unknown_attribute(&table.name, segment, path));
                }
                Some(Attribute::Column(_)) => {
                    if !last {
                        return Err(PlannerError::not_a_relationship(
                            &table.name,
                            segment,
                            path,
                        ));
                    }
                }
                Some(Attribute::Relationship(rel)) => {
                    let target = self
                        .catalog
                        .table(&rel.target)
                        .ok_or_else(|| PlannerError::unknown_table(&rel.target))?;

                    let hop = segments[..=i].join(".");
                    if !directives.contains_key(&hop) {
                        let required = node.map(PathTree::keys).unwrap_or_default();
                        let (loaded, deferred) = defer_everything_but(target, &required);
                        directives.insert(
                            hop.clone(),
                            LoadDirective {
                                path: hop,
                                table: target.name.clone(),
                                strategy: LoadStrategy::for_relation(&rel.kind),
                                loaded,
                                deferred,
                            },
                        );
                    }

                    table = target;
                }
            }
        }

        Ok(())
    }
}

fn log_directive(entity: &str, directive: &LoadDirective) {
    let deferred = directive
        .deferred
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    log_event_with_fields(
        Event::PlanDirective,
        &[
            ("deferred", deferred.as_str()),
            ("entity", entity),
            ("path", directive.path.as_str()),
            ("strategy", directive.strategy.as_str()),
            ("table", directive.table.as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::errors::PlannerErrorCode;
    use crate::schema::TableDef;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            TableDef::new("artist")
                .with_columns(["id", "gid", "name", "comment"])
                .with_mapped_column("area_id", "area")
                .many_to_one("area", "area", "area_id")
                .one_to_many("aliases", "artist_alias", "artist_id")
                .many_to_many("tags", "tag", "artist_tag", "artist_id", "tag_id"),
            TableDef::new("area")
                .with_columns(["id", "gid", "name", "comment", "ended"])
                .with_mapped_column("type_id", "type")
                .many_to_one("type", "area_type", "type_id"),
            TableDef::new("area_type").with_columns(["id", "name", "description"]),
            TableDef::new("artist_alias")
                .with_columns(["id", "name", "locale", "position"])
                .with_mapped_column("artist_id", "artist"),
            TableDef::new("tag").with_columns(["id", "name", "ref_count"]),
            TableDef::new("artist_tag")
                .with_primary_key(["artist_id", "tag_id"])
                .with_columns(["artist_id", "tag_id", "count"]),
        ])
        .unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_many_to_one_is_joined() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![
            SearchField::new("name", ["name"]),
            SearchField::new("area", ["area.name"]),
        ];

        let plan = planner.compile("artist", "artist", &fields).unwrap();
        let area = plan.directive("area").unwrap();

        assert_eq!(area.strategy, LoadStrategy::Join);
        assert_eq!(area.loaded, set(&["id", "name", "type_id"]));
        assert_eq!(area.deferred, set(&["comment", "ended", "gid"]));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_one_to_many_is_batched() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![SearchField::new("alias", ["aliases.name"])];

        let plan = planner.compile("artist", "artist", &fields).unwrap();
        let aliases = plan.directive("aliases").unwrap();

        assert_eq!(aliases.strategy, LoadStrategy::BatchedSecondaryQuery);
        // position and the foreign key survive deferral
        assert_eq!(aliases.loaded, set(&["artist_id", "id", "name", "position"]));
        assert_eq!(aliases.deferred, set(&["locale"]));
    }

    #[test]
    fn test_many_to_many_uses_default() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![SearchField::new("tag", ["tags.name"])];

        let plan = planner.compile("artist", "artist", &fields).unwrap();
        assert_eq!(plan.directive("tags").unwrap().strategy, LoadStrategy::Default);
        assert!(plan.is_deferred("tags", "ref_count"));
    }

    #[test]
    fn test_nested_hops() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![
            SearchField::new("area", ["area.name"]),
            SearchField::new("area_type", ["area.type.name"]),
        ];

        let plan = planner.compile("artist", "artist", &fields).unwrap();
        let area = plan.directive("area").unwrap();
        let area_type = plan.directive("area.type").unwrap();

        // `type` is named at the area level, so its key column is kept
        assert!(area.loads("type_id"));
        assert_eq!(area_type.loaded, set(&["id", "name"]));
        assert_eq!(area_type.deferred, set(&["description"]));
    }

    #[test]
    fn test_terminal_relationship_loads_keys_only() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![SearchField::new("area", ["area"])];

        let plan = planner.compile("artist", "artist", &fields).unwrap();
        let area = plan.directive("area").unwrap();
        assert_eq!(area.loaded, set(&["id", "type_id"]));
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let a = vec![
            SearchField::new("area", ["area.name"]),
            SearchField::new("alias", ["aliases.name", "aliases.locale"]),
            SearchField::new("area_id", ["area"]),
        ];
        let b: Vec<_> = a.iter().rev().cloned().collect();

        assert_eq!(
            planner.compile("artist", "artist", &a).unwrap(),
            planner.compile("artist", "artist", &b).unwrap()
        );
    }

    #[test]
    fn test_unknown_attribute_is_fatal() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![SearchField::new("area", ["area.nmae"])];

        let err = planner.compile("artist", "artist", &fields).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::SearchPlanUnknownAttribute);
        assert_eq!(err.path(), Some("area.nmae"));
    }

    #[test]
    fn test_descending_through_column_is_fatal() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![SearchField::new("bad", ["name.first"])];

        let err = planner.compile("artist", "artist", &fields).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::SearchPlanNotARelationship);
    }

    #[test]
    fn test_unknown_root_is_fatal() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let err = planner
            .compile("work", "work", &[SearchField::new("name", ["name"])])
            .unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::SearchPlanUnknownTable);
    }

    #[test]
    fn test_path_syntax() {
        assert!(validate_path("area.type.name").is_ok());
        assert!(validate_path("name").is_ok());
        for bad in ["", "area.", ".name", "area..name", "area name", "1area", "Area"] {
            let err = validate_path(bad).unwrap_err();
            assert_eq!(err.code(), PlannerErrorCode::SearchPlanInvalidPath, "{bad}");
        }
    }

    #[test]
    fn test_empty_field_is_fatal() {
        let catalog = catalog();
        let planner = QueryPlanner::new(&catalog);
        let fields = vec![SearchField::new("name", Vec::<String>::new())];
        let err = planner.compile("artist", "artist", &fields).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::SearchPlanEmptyField);
    }
}
