//! Built-in entities over the MusicBrainz catalog

use serde_json::Value;

use super::entity::SearchEntity;
use super::field::SearchField;
use super::registry::EntityRegistry;
use crate::planner::PlannerResult;
use crate::schema::Catalog;

/// Index schema version the built-in entities are written for
pub const SCHEMA_VERSION: f32 = 1.5;

/// Normalises the database's boolean spellings (`t`/`f`, 0/1) to JSON booleans
pub fn boolean(value: Value) -> Value {
    match value {
        Value::String(s) => match s.as_str() {
            "t" | "true" | "1" => Value::Bool(true),
            "f" | "false" | "0" => Value::Bool(false),
            _ => Value::String(s),
        },
        Value::Number(n) => Value::Bool(n.as_i64().map(|v| v != 0).unwrap_or(false)),
        other => other,
    }
}

/// Renders numeric label codes as strings
pub fn label_code(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}

fn field(name: &str, path: &str) -> SearchField {
    SearchField::new(name, [path])
}

fn area(catalog: &Catalog) -> PlannerResult<SearchEntity> {
    SearchEntity::new(
        "area",
        "area",
        vec![
            field("mbid", "gid"),
            field("area", "name"),
            field("alias", "aliases.name"),
            field("type", "type.name"),
            field("comment", "comment"),
            field("ended", "ended").with_transform(boolean),
        ],
        SCHEMA_VERSION,
        catalog,
    )
}

fn artist(catalog: &Catalog) -> PlannerResult<SearchEntity> {
    SearchEntity::new(
        "artist",
        "artist",
        vec![
            field("mbid", "gid"),
            field("artist", "name"),
            field("sortname", "sort_name"),
            field("alias", "aliases.name"),
            field("type", "type.name"),
            field("gender", "gender.name"),
            field("area", "area.name"),
            field("beginarea", "begin_area.name"),
            field("endarea", "end_area.name"),
            field("comment", "comment"),
            field("ended", "ended").with_transform(boolean),
            field("tag", "tags.name"),
        ],
        SCHEMA_VERSION,
        catalog,
    )
}

fn label(catalog: &Catalog) -> PlannerResult<SearchEntity> {
    SearchEntity::new(
        "label",
        "label",
        vec![
            field("mbid", "gid"),
            field("label", "name"),
            field("code", "label_code").with_transform(label_code),
            field("type", "type.name"),
            field("area", "area.name"),
            field("comment", "comment"),
            field("ended", "ended").with_transform(boolean),
        ],
        SCHEMA_VERSION,
        catalog,
    )
}

fn place(catalog: &Catalog) -> PlannerResult<SearchEntity> {
    SearchEntity::new(
        "place",
        "place",
        vec![
            field("mbid", "gid"),
            field("place", "name"),
            field("address", "address"),
            field("type", "type.name"),
            field("area", "area.name"),
            field("comment", "comment"),
            field("ended", "ended").with_transform(boolean),
        ],
        SCHEMA_VERSION,
        catalog,
    )
}

/// Built-in entities in declaration order: area, artist, label, place
pub fn entities(catalog: &Catalog) -> PlannerResult<Vec<SearchEntity>> {
    Ok(vec![
        area(catalog)?,
        artist(catalog)?,
        label(catalog)?,
        place(catalog)?,
    ])
}

/// Registry of the built-in entities
pub fn registry(catalog: &Catalog) -> PlannerResult<EntityRegistry> {
    EntityRegistry::new(entities(catalog)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::LoadStrategy;
    use crate::schema::musicbrainz;
    use serde_json::json;

    #[test]
    fn test_builtin_entities_compile() {
        let catalog = musicbrainz::catalog().unwrap();
        let registry = registry(&catalog).unwrap();
        assert_eq!(registry.names(), vec!["area", "artist", "label", "place"]);
    }

    #[test]
    fn test_artist_plan_strategies() {
        let catalog = musicbrainz::catalog().unwrap();
        let registry = registry(&catalog).unwrap();
        let plan = registry.get("artist").unwrap().plan();

        assert_eq!(plan.directive("area").unwrap().strategy, LoadStrategy::Join);
        assert_eq!(
            plan.directive("aliases").unwrap().strategy,
            LoadStrategy::BatchedSecondaryQuery
        );
        assert_eq!(plan.directive("tags").unwrap().strategy, LoadStrategy::Default);
        assert!(plan.is_deferred("area", "comment"));
        assert!(!plan.is_deferred("area", "name"));
    }

    #[test]
    fn test_boolean_transform() {
        assert_eq!(boolean(json!("t")), json!(true));
        assert_eq!(boolean(json!("f")), json!(false));
        assert_eq!(boolean(json!(1)), json!(true));
        assert_eq!(boolean(json!(true)), json!(true));
        assert_eq!(boolean(json!("maybe")), json!("maybe"));
    }

    #[test]
    fn test_label_code_transform() {
        assert_eq!(label_code(json!(7)), json!("7"));
        assert_eq!(label_code(json!("LC-7")), json!("LC-7"));
    }
}
